//! Agreement check between the baseline and accelerated kernels.

use crate::block::{BlockQ4_0, BlockQ8_0, QK4_0};
use crate::kernel::{self, Kernel};
use crate::synth::Operands;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Maximum relative error accepted between the two kernels.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Error)]
#[error("kernels diverge at n={n}: baseline={baseline} accelerated={accelerated} (abs {abs_diff:.3e}, rel {rel_err:.3e})")]
pub struct Divergence {
    pub n: usize,
    pub baseline: f32,
    pub accelerated: f32,
    pub abs_diff: f64,
    pub rel_err: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Agreement {
    pub n: usize,
    pub baseline: f32,
    pub accelerated: f32,
    pub abs_diff: f64,
    /// `abs_diff / (|baseline| + 1e-10)`, as printed by the benchmark driver.
    pub rel_err: f64,
    /// `abs_diff` relative to the larger of `|baseline|` and the summed block magnitudes.
    pub rel_err_mass: f64,
    pub tolerance: f64,
    pub pass: bool,
}

impl Agreement {
    pub fn status(&self) -> &'static str {
        if self.pass { "PASS" } else { "FAIL" }
    }

    /// One line per size for the `verify` command.
    pub fn row(&self) -> String {
        format!(
            "{:>8}  baseline {:>14.6}  accelerated {:>14.6}  rel {:.2e}  {}",
            self.n, self.baseline, self.accelerated, self.rel_err_mass, self.status()
        )
    }

    pub fn into_result(self) -> Result<Self, Divergence> {
        if self.pass {
            return Ok(self);
        }
        Err(Divergence {
            n: self.n,
            baseline: self.baseline,
            accelerated: self.accelerated,
            abs_diff: self.abs_diff,
            rel_err: self.rel_err_mass,
        })
    }
}

/// Absolute sum of per-block contributions; the scale against which rounding is judged.
pub fn magnitude(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> f64 {
    kernel::block_contributions(n, x, y).iter().map(|c| c.abs() as f64).sum()
}

pub fn check(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0], tolerance: f64) -> Agreement {
    let baseline = kernel::dot(Kernel::Baseline, n, x, y);
    let accelerated = kernel::dot(Kernel::Accelerated, n, x, y);
    let abs_diff = (baseline as f64 - accelerated as f64).abs();
    let rel_err = abs_diff / (baseline.abs() as f64 + 1e-10);
    let denom = (baseline.abs() as f64).max(magnitude(n, x, y));
    let rel_err_mass = if denom > 0.0 { abs_diff / denom } else { abs_diff };
    // NaN never passes
    let pass = rel_err_mass <= tolerance;
    if !pass {
        warn!("n={} baseline={} accelerated={} rel={:.3e} exceeds {:.1e}", n, baseline, accelerated, rel_err_mass, tolerance);
    }
    Agreement { n, baseline, accelerated, abs_diff, rel_err, rel_err_mass, tolerance, pass }
}

pub fn check_operands(ops: &Operands, tolerance: f64) -> Agreement {
    check(ops.n, &ops.x, &ops.y, tolerance)
}

/// Check each size on its own operands in parallel. Every size gets a row,
/// passing or not; use [`first_divergence`] to reject the accelerated kernel.
pub fn check_sizes<F>(sizes: &[usize], tolerance: f64, make: F) -> Vec<Agreement>
where
    F: Fn(usize) -> Operands + Sync,
{
    let results: Vec<Agreement> = sizes
        .par_iter()
        .map(|&n| {
            let n = (n / QK4_0).max(1) * QK4_0;
            check_operands(&make(n), tolerance)
        })
        .collect();
    let passed = results.iter().filter(|a| a.pass).count();
    info!("agreement: {}/{} sizes within {:.1e}", passed, results.len(), tolerance);
    results
}

pub fn first_divergence(rows: &[Agreement]) -> Option<Divergence> {
    rows.iter().find(|a| !a.pass).cloned().and_then(|a| a.into_result().err())
}
