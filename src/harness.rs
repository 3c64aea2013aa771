//! Timing loop and size sweep for the two kernels.

use crate::config::BenchConfig;
use crate::kernel::{self, Kernel};
use crate::synth::Operands;
use crate::verify::{self, Agreement};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde::Serialize;
use std::fmt::Write as _;
use std::hint::black_box;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Timing {
    pub kernel: Kernel,
    pub iterations: usize,
    pub total_ns: u128,
    pub ns_per_call: f64,
    pub result: f32,
}

impl Timing {
    /// Bytes per nanosecond is GB/s.
    pub fn gb_per_s(&self, bytes_per_call: usize) -> f64 {
        if self.ns_per_call > 0.0 { bytes_per_call as f64 / self.ns_per_call } else { 0.0 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub n: usize,
    pub blocks: usize,
    pub bytes_per_call: usize,
    pub simd_path: &'static str,
    pub agreement: Agreement,
    pub baseline: Timing,
    pub accelerated: Timing,
    pub speedup: f64,
    pub improvement_pct: f64,
    pub baseline_gb_s: f64,
    pub accelerated_gb_s: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepRow {
    pub n: usize,
    pub baseline_ns: f64,
    pub accelerated_ns: f64,
    pub speedup: f64,
}

pub fn speedup(baseline_ns: f64, accelerated_ns: f64) -> f64 {
    if accelerated_ns > 0.0 { baseline_ns / accelerated_ns } else { 0.0 }
}

/// Average ns per call over `iterations`, after `warmup` untimed calls.
pub fn time_kernel(kernel: Kernel, ops: &Operands, iterations: usize, warmup: usize) -> Timing {
    let mut result = 0.0f32;
    for _ in 0..warmup {
        kernel::dot_into(kernel, ops.n, &mut result, black_box(&ops.x), black_box(&ops.y));
        black_box(result);
    }
    let t0 = Instant::now();
    for _ in 0..iterations {
        kernel::dot_into(kernel, ops.n, &mut result, black_box(&ops.x), black_box(&ops.y));
        black_box(result);
    }
    let total_ns = t0.elapsed().as_nanos();
    let ns_per_call = total_ns as f64 / iterations.max(1) as f64;
    Timing { kernel, iterations, total_ns, ns_per_call, result }
}

/// Correctness check followed by timing both kernels on the same operands.
pub fn compare(ops: &Operands, cfg: &BenchConfig) -> BenchReport {
    let agreement = verify::check_operands(ops, cfg.tolerance);
    let baseline = time_kernel(Kernel::Baseline, ops, cfg.iterations, cfg.warmup);
    let accelerated = time_kernel(Kernel::Accelerated, ops, cfg.iterations, cfg.warmup);
    let bytes_per_call = ops.bytes();
    let s = speedup(baseline.ns_per_call, accelerated.ns_per_call);
    info!("n={} baseline {:.1} ns, accelerated {:.1} ns, {:.2}x", ops.n, baseline.ns_per_call, accelerated.ns_per_call, s);
    BenchReport {
        n: ops.n,
        blocks: ops.blocks(),
        bytes_per_call,
        simd_path: kernel::simd::detect().name(),
        agreement,
        baseline,
        accelerated,
        speedup: s,
        improvement_pct: (s - 1.0) * 100.0,
        baseline_gb_s: baseline.gb_per_s(bytes_per_call),
        accelerated_gb_s: accelerated.gb_per_s(bytes_per_call),
    }
}

fn operands_for(n: usize, cfg: &BenchConfig) -> Operands {
    if cfg.random { Operands::random(n, cfg.seed) } else { Operands::pattern(n) }
}

/// Time both kernels across `cfg.sweep_sizes`. Sizes run one after another.
pub fn sweep(cfg: &BenchConfig, progress: bool) -> Vec<SweepRow> {
    let pb = if progress { ProgressBar::new(cfg.sweep_sizes.len() as u64) } else { ProgressBar::hidden() };
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} n={msg}") {
        pb.set_style(style);
    }
    let warmup = cfg.warmup.min(1000);
    let mut rows = Vec::with_capacity(cfg.sweep_sizes.len());
    for &n in &cfg.sweep_sizes {
        let ops = operands_for(n, cfg);
        pb.set_message(ops.n.to_string());
        let b = time_kernel(Kernel::Baseline, &ops, cfg.sweep_iterations, warmup);
        let a = time_kernel(Kernel::Accelerated, &ops, cfg.sweep_iterations, warmup);
        rows.push(SweepRow { n: ops.n, baseline_ns: b.ns_per_call, accelerated_ns: a.ns_per_call, speedup: speedup(b.ns_per_call, a.ns_per_call) });
        pb.inc(1);
    }
    pb.finish_and_clear();
    rows
}

pub fn bench(cfg: &BenchConfig) -> BenchReport {
    compare(&operands_for(cfg.n, cfg), cfg)
}

/// Text form of a [`BenchReport`] for the `bench` command.
/// `Status` is decided by the mass-relative error; the driver-style figure is informational.
pub fn render_report(r: &BenchReport, cfg: &BenchConfig) -> String {
    let a = &r.agreement;
    let mut out = String::new();
    let _ = writeln!(out, "Benchmark: q4_0 dot product (n={}, {} blocks, {} path)", r.n, r.blocks, r.simd_path);
    let _ = writeln!(out, "Iterations: {} (warmup: {})\n", cfg.iterations, cfg.warmup);
    let _ = writeln!(out, "Correctness check:");
    let _ = writeln!(out, "  Baseline:    {:.6}", a.baseline);
    let _ = writeln!(out, "  Accelerated: {:.6}", a.accelerated);
    let _ = writeln!(out, "  Abs diff:    {:.2e}", a.abs_diff);
    let _ = writeln!(out, "  Rel error:   {:.2e} (vs |baseline|, informational)", a.rel_err);
    let _ = writeln!(out, "  Rel to mass: {:.2e} (decides status, tolerance {:.1e})", a.rel_err_mass, a.tolerance);
    let _ = writeln!(out, "  Status:      {}\n", a.status());
    let _ = writeln!(out, "Results (avg per call):");
    let _ = writeln!(out, "  Baseline:    {:8.1} ns", r.baseline.ns_per_call);
    let _ = writeln!(out, "  Accelerated: {:8.1} ns", r.accelerated.ns_per_call);
    let _ = writeln!(out, "  Speedup:     {:.2}x", r.speedup);
    let _ = writeln!(out, "  Improvement: {:.1}%\n", r.improvement_pct);
    let _ = writeln!(out, "Throughput:");
    let _ = writeln!(out, "  Baseline:    {:.2} GB/s", r.baseline_gb_s);
    let _ = writeln!(out, "  Accelerated: {:.2} GB/s", r.accelerated_gb_s);
    out
}
