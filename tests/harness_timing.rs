use pretty_assertions::assert_eq;
use q4dot::config::BenchConfig;
use q4dot::harness::{self, speedup, Timing};
use q4dot::kernel::{self, Kernel};
use q4dot::synth::Operands;

fn tiny_config() -> BenchConfig {
    BenchConfig { n: 256, iterations: 20, warmup: 2, sweep_iterations: 10, sweep_sizes: vec![64, 100, 256], ..BenchConfig::default() }
}

#[test]
fn timing_reports_last_result_and_average() {
    let ops = Operands::pattern(512);
    let t = harness::time_kernel(Kernel::Accelerated, &ops, 10, 1);
    assert_eq!(t.iterations, 10);
    assert_eq!(t.result, kernel::dot(Kernel::Accelerated, ops.n, &ops.x, &ops.y));
    assert!((t.ns_per_call - t.total_ns as f64 / 10.0).abs() < 1e-6);
}

#[test]
fn throughput_and_speedup_math() {
    let t = Timing { kernel: Kernel::Baseline, iterations: 1, total_ns: 200, ns_per_call: 200.0, result: 0.0 };
    assert_eq!(t.gb_per_s(128 * 52), 128.0 * 52.0 / 200.0);
    assert_eq!(speedup(300.0, 200.0), 1.5);
    assert_eq!(speedup(300.0, 0.0), 0.0);
}

#[test]
fn bench_report_carries_agreement_and_bytes() {
    let cfg = tiny_config();
    let r = harness::bench(&cfg);
    assert_eq!(r.n, 256);
    assert_eq!(r.blocks, 8);
    assert_eq!(r.bytes_per_call, 8 * 52);
    assert!(r.agreement.pass);
    assert_eq!(r.baseline.kernel, Kernel::Baseline);
    assert_eq!(r.accelerated.kernel, Kernel::Accelerated);
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["accelerated"]["kernel"], "accelerated");
}

#[test]
fn sweep_visits_each_size_in_order() {
    let mut cfg = tiny_config();
    cfg.random = true;
    let rows = harness::sweep(&cfg, false);
    let ns: Vec<usize> = rows.iter().map(|r| r.n).collect();
    assert_eq!(ns, vec![64, 96, 256]);
    assert!(rows.iter().all(|r| r.baseline_ns >= 0.0 && r.accelerated_ns >= 0.0));
}

#[test]
fn report_labels_which_error_decides_status() {
    let cfg = tiny_config();
    let r = harness::bench(&cfg);
    let text = harness::render_report(&r, &cfg);
    let mass_line = text.lines().find(|l| l.contains("Rel to mass")).unwrap();
    assert!(mass_line.contains("decides status"), "{}", mass_line);
    assert!(mass_line.contains(&format!("{:.2e}", r.agreement.rel_err_mass)));
    let rel_line = text.lines().find(|l| l.contains("Rel error")).unwrap();
    assert!(rel_line.contains("informational"), "{}", rel_line);
    assert!(text.contains("Status:      PASS"));
}
