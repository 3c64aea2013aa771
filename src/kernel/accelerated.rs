//! Throughput variant of the q4_0 x q8_0 dot product.
//!
//! Four blocks per iteration into four independent totals, with a prefetch
//! hint [`PREFETCH_BLOCKS`] ahead. Tuned for vectors between L1 and L2 size;
//! small vectors may see no gain over the baseline.

use crate::block::{BlockQ4_0, BlockQ8_0, QK4_0};
use crate::kernel::simd::{self, SimdPath};

/// Prefetch distance in blocks (8 q4_0 blocks = 144 bytes, 8 q8_0 blocks = 272 bytes).
pub const PREFETCH_BLOCKS: usize = 8;

pub fn vec_dot_q4_0_q8_0(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> f32 {
    vec_dot_q4_0_q8_0_with(simd::detect(), n, x, y)
}

/// Run with an explicit block-sum path. Unavailable paths fall back to portable.
pub fn vec_dot_q4_0_q8_0_with(path: SimdPath, n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> f32 {
    debug_assert!(n % QK4_0 == 0, "n must be a multiple of {}", QK4_0);
    debug_assert!(x.len() >= n / QK4_0 && y.len() >= n / QK4_0);
    match path {
        #[cfg(all(feature = "simd-avx2", target_arch = "x86_64"))]
        SimdPath::Avx2 if path.is_available() => unsafe { dot_avx2(n, x, y) },
        #[cfg(all(feature = "simd-neon", target_arch = "aarch64"))]
        SimdPath::Neon if path.is_available() => unsafe { dot_neon(n, x, y) },
        _ => unrolled(n, x, y, simd::portable::block_sumi),
    }
}

#[cfg(all(feature = "simd-avx2", target_arch = "x86_64"))]
#[target_feature(enable = "avx2")]
unsafe fn dot_avx2(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> f32 {
    unrolled(n, x, y, |a, b| unsafe { simd::avx2::block_sumi(a, b) })
}

#[cfg(all(feature = "simd-neon", target_arch = "aarch64"))]
#[target_feature(enable = "neon")]
unsafe fn dot_neon(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> f32 {
    unrolled(n, x, y, |a, b| unsafe { simd::neon::block_sumi(a, b) })
}

#[inline(always)]
fn unrolled<F>(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0], block_sumi: F) -> f32
where
    F: Fn(&BlockQ4_0, &BlockQ8_0) -> i32,
{
    let nb = n / QK4_0;
    let contrib = |i: usize| block_sumi(&x[i], &y[i]) as f32 * (x[i].d.to_f32() * y[i].d.to_f32());

    let mut sumv0 = 0.0f32;
    let mut sumv1 = 0.0f32;
    let mut sumv2 = 0.0f32;
    let mut sumv3 = 0.0f32;
    let mut ib = 0usize;

    while ib + 3 < nb {
        if ib + PREFETCH_BLOCKS < nb {
            simd::prefetch(&x[ib + PREFETCH_BLOCKS]);
            simd::prefetch(&y[ib + PREFETCH_BLOCKS]);
        }
        // a q8_0 block is 34 bytes, so two blocks ahead spill into the next line
        if ib + PREFETCH_BLOCKS + 2 < nb {
            simd::prefetch(&y[ib + PREFETCH_BLOCKS + 2]);
        }
        sumv0 += contrib(ib);
        sumv1 += contrib(ib + 1);
        sumv2 += contrib(ib + 2);
        sumv3 += contrib(ib + 3);
        ib += 4;
    }
    let mut sumf = (sumv0 + sumv1) + (sumv2 + sumv3);

    let mut sv0 = 0.0f32;
    let mut sv1 = 0.0f32;
    while ib + 1 < nb {
        sv0 += contrib(ib);
        sv1 += contrib(ib + 1);
        ib += 2;
    }
    sumf += sv0 + sv1;

    while ib < nb {
        sumf += contrib(ib);
        ib += 1;
    }
    sumf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_available_path_gives_identical_bits() {
        let x: Vec<BlockQ4_0> = (0..13u8)
            .map(|i| BlockQ4_0::new(0.25 + i as f32 * 0.125, core::array::from_fn(|j| i.wrapping_mul(31).wrapping_add(j as u8 * 17))))
            .collect();
        let y: Vec<BlockQ8_0> = (0..13u8)
            .map(|i| BlockQ8_0::new(0.5, core::array::from_fn(|j| (i as i32 * 11 + j as i32 * 23 - 128) as i8)))
            .collect();
        let n = x.len() * QK4_0;
        let want = vec_dot_q4_0_q8_0_with(SimdPath::Portable, n, &x, &y);
        for p in simd::available_paths() {
            assert_eq!(vec_dot_q4_0_q8_0_with(p, n, &x, &y).to_bits(), want.to_bits(), "path {}", p.name());
        }
    }
}
