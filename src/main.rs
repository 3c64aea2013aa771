use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use q4dot::config::{parse_sizes, BenchConfig};
use q4dot::harness;
use q4dot::synth::Operands;
use q4dot::verify;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "q4dot", version, about = "Check and time q4_0 x q8_0 dot-product kernels")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(ClapArgs, Debug, Clone)]
struct Data {
    /// Seeded random operands instead of the fixed pattern
    #[arg(long)]
    random: bool,

    /// RNG seed (implies --random)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check baseline/accelerated agreement at each size
    Verify {
        /// Comma separated element counts
        #[arg(long, default_value = "32,64,96,128,160,224,4096,65536")]
        sizes: String,

        /// Maximum relative error
        #[arg(long)]
        tolerance: Option<f64>,

        #[command(flatten)]
        data: Data,
    },
    /// Time both kernels at one size
    Bench {
        /// Elements per vector (rounded down to a multiple of 32)
        #[arg(long)]
        n: Option<usize>,

        #[arg(long)]
        iterations: Option<usize>,

        #[arg(long)]
        warmup: Option<usize>,

        /// Write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        #[command(flatten)]
        data: Data,
    },
    /// Time both kernels across a range of sizes
    Sweep {
        /// Comma separated element counts
        #[arg(long)]
        sizes: Option<String>,

        #[arg(long)]
        iterations: Option<usize>,

        /// Write the rows as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        #[command(flatten)]
        data: Data,
    },
}

fn apply_data(cfg: &mut BenchConfig, data: &Data) {
    if data.random { cfg.random = true; }
    if let Some(seed) = data.seed { cfg.seed = seed; cfg.random = true; }
}

fn sizes_arg(s: &str) -> Result<Vec<usize>> {
    match parse_sizes(s) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("invalid size list '{}'", s),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("serialize report")?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut cfg = BenchConfig::from_env().context("read Q4DOT_* environment")?;

    match args.cmd {
        Cmd::Verify { sizes, tolerance, data } => {
            apply_data(&mut cfg, &data);
            if let Some(t) = tolerance { cfg.tolerance = t; }
            let sizes = sizes_arg(&sizes)?;
            let (random, seed) = (cfg.random, cfg.seed);
            let make = |n: usize| if random { Operands::random(n, seed) } else { Operands::pattern(n) };
            cfg.validate()?;
            let rows = verify::check_sizes(&sizes, cfg.tolerance, make);
            for a in &rows {
                println!("{}", a.row());
            }
            if let Some(d) = verify::first_divergence(&rows) {
                return Err(d).context("accelerated kernel rejected");
            }
        }
        Cmd::Bench { n, iterations, warmup, json, data } => {
            apply_data(&mut cfg, &data);
            if let Some(v) = n { cfg.n = v; }
            if let Some(v) = iterations { cfg.iterations = v; }
            if let Some(v) = warmup { cfg.warmup = v; }
            cfg.validate()?;
            let r = harness::bench(&cfg);
            print!("{}", harness::render_report(&r, &cfg));
            if let Some(p) = json.as_ref() { write_json(p, &r)?; }
            if let Err(d) = r.agreement.into_result() {
                return Err(d).context("accelerated kernel rejected");
            }
        }
        Cmd::Sweep { sizes, iterations, json, data } => {
            apply_data(&mut cfg, &data);
            if let Some(s) = sizes.as_deref() { cfg.sweep_sizes = sizes_arg(s)?; }
            if let Some(v) = iterations { cfg.sweep_iterations = v; }
            cfg.validate()?;
            let rows = harness::sweep(&cfg, true);
            println!("{:>8}  {:>10}  {:>10}  {:>8}", "n", "base(ns)", "accel(ns)", "speedup");
            for r in &rows {
                println!("{:>8}  {:>10.1}  {:>10.1}  {:>7.2}x", r.n, r.baseline_ns, r.accelerated_ns, r.speedup);
            }
            if let Some(p) = json.as_ref() { write_json(p, &rows)?; }
        }
    }
    Ok(())
}
