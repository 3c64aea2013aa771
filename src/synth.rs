//! Synthetic q4_0 / q8_0 operands for benchmarks and agreement checks.

use crate::block::{BlockQ4_0, BlockQ8_0, QK4_0, QK8_0};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;

/// Scale range used by the random generator.
pub const SCALE_MIN: f32 = 0.01;
pub const SCALE_MAX: f32 = 10.0;

/// Deterministic weight blocks: `d = 0.1 + 0.001 * (i % 100)`, `qs[j] = (7i + 13j) % 256`.
pub fn pattern_q4_0(nb: usize) -> Vec<BlockQ4_0> {
    (0..nb)
        .map(|i| {
            let mut qs = [0u8; QK4_0 / 2];
            for (j, q) in qs.iter_mut().enumerate() {
                *q = ((i * 7 + j * 13) % 256) as u8;
            }
            BlockQ4_0::new(0.1 + 0.001 * (i % 100) as f32, qs)
        })
        .collect()
}

/// Deterministic activation blocks: `d = 0.05 + 0.002 * (i % 50)`, `qs[j] = (11i + 17j) % 256 - 128`.
pub fn pattern_q8_0(nb: usize) -> Vec<BlockQ8_0> {
    (0..nb)
        .map(|i| {
            let mut qs = [0i8; QK8_0];
            for (j, q) in qs.iter_mut().enumerate() {
                *q = (((i * 11 + j * 17) % 256) as i32 - 128) as i8;
            }
            BlockQ8_0::new(0.05 + 0.002 * (i % 50) as f32, qs)
        })
        .collect()
}

/// Uniform nibbles over the full byte range, scales uniform in [SCALE_MIN, SCALE_MAX).
pub fn random_q4_0(nb: usize, rng: &mut SmallRng) -> Vec<BlockQ4_0> {
    let scale = Uniform::new(SCALE_MIN, SCALE_MAX);
    (0..nb)
        .map(|_| {
            let mut qs = [0u8; QK4_0 / 2];
            rng.fill(&mut qs[..]);
            BlockQ4_0::new(rng.sample(&scale), qs)
        })
        .collect()
}

/// Uniform int8 over [-128, 127], scales uniform in [SCALE_MIN, SCALE_MAX).
pub fn random_q8_0(nb: usize, rng: &mut SmallRng) -> Vec<BlockQ8_0> {
    let scale = Uniform::new(SCALE_MIN, SCALE_MAX);
    (0..nb)
        .map(|_| {
            let mut qs = [0i8; QK8_0];
            for q in qs.iter_mut() { *q = rng.gen::<i8>(); }
            BlockQ8_0::new(rng.sample(&scale), qs)
        })
        .collect()
}

/// A matched weight/activation pair for `n` elements.
#[derive(Debug, Clone)]
pub struct Operands {
    pub n: usize,
    pub x: Vec<BlockQ4_0>,
    pub y: Vec<BlockQ8_0>,
}

impl Operands {
    pub fn pattern(n: usize) -> Self {
        let n = round_len(n);
        let nb = n / QK4_0;
        Self { n, x: pattern_q4_0(nb), y: pattern_q8_0(nb) }
    }

    pub fn random(n: usize, seed: u64) -> Self {
        let n = round_len(n);
        let nb = n / QK4_0;
        let mut rng = SmallRng::seed_from_u64(seed);
        let x = random_q4_0(nb, &mut rng);
        let y = random_q8_0(nb, &mut rng);
        Self { n, x, y }
    }

    pub fn blocks(&self) -> usize { self.n / QK4_0 }

    /// Bytes read by one kernel call.
    pub fn bytes(&self) -> usize {
        self.blocks() * (std::mem::size_of::<BlockQ4_0>() + std::mem::size_of::<BlockQ8_0>())
    }
}

/// Round down to a multiple of 32, never below one block.
pub fn round_len(n: usize) -> usize {
    (n / QK4_0).max(1) * QK4_0
}
