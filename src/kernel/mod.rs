//! q4_0 x q8_0 dot-product kernels.
//!
//! Both kernels compute `sum_k sumi_k * (dx_k * dy_k)` over block pairs and differ
//! only in accumulation order. f32 addition is not associative, so results agree
//! to a small relative error, not bit-for-bit.
//!
//! Preconditions (checked only in debug builds): `n % 32 == 0`, `n > 0`, and both
//! slices hold at least `n / 32` blocks.

pub mod accelerated;
pub mod baseline;
pub mod simd;

use crate::block::{BlockQ4_0, BlockQ8_0, QK4_0};
use anyhow::bail;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Baseline,
    Accelerated,
}

impl Kernel {
    pub const ALL: [Kernel; 2] = [Kernel::Baseline, Kernel::Accelerated];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Baseline => "baseline",
            Kernel::Accelerated => "accelerated",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Kernel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" | "original" => Ok(Kernel::Baseline),
            "accelerated" | "optimized" => Ok(Kernel::Accelerated),
            other => bail!("unknown kernel '{}': use 'baseline' or 'accelerated'", other),
        }
    }
}

#[inline]
pub fn dot(kernel: Kernel, n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> f32 {
    match kernel {
        Kernel::Baseline => baseline::vec_dot_q4_0_q8_0(n, x, y),
        Kernel::Accelerated => accelerated::vec_dot_q4_0_q8_0(n, x, y),
    }
}

/// Same as [`dot`], writing the scalar to a caller-owned slot.
#[inline]
pub fn dot_into(kernel: Kernel, n: usize, s: &mut f32, x: &[BlockQ4_0], y: &[BlockQ8_0]) {
    *s = dot(kernel, n, x, y);
}

/// Dequantize every element and accumulate in f64. Slow; for checking the kernels.
pub fn reference_dot(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> f64 {
    let nb = n / QK4_0;
    let mut sum = 0.0f64;
    for (bx, by) in x[..nb].iter().zip(&y[..nb]) {
        let dx = bx.dequantize();
        let dy = by.dequantize();
        for j in 0..QK4_0 {
            sum += dx[j] as f64 * dy[j] as f64;
        }
    }
    sum
}

/// Per-block f32 contributions `sumi * (dx * dy)`, in block order.
pub fn block_contributions(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> Vec<f32> {
    let nb = n / QK4_0;
    x[..nb]
        .iter()
        .zip(&y[..nb])
        .map(|(bx, by)| {
            let sumi: i32 = bx.values().iter().zip(&by.qs).map(|(&a, &b)| a as i32 * b as i32).sum();
            sumi as f32 * (bx.scale() * by.scale())
        })
        .collect()
}
