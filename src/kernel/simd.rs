//! Lane-group block partial sums used by the accelerated kernel.
//!
//! Each q4_0 x q8_0 block pair is treated as 16 lanes, lane `j` holding
//! `lo(qs[j]) * y[j] + hi(qs[j]) * y[j + 16]`, collapsed by a horizontal sum.
//! All paths produce the exact same `i32`.

use crate::block::{BlockQ4_0, BlockQ8_0, QK4_0};
use log::debug;
use std::sync::OnceLock;

pub const LANES: usize = QK4_0 / 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimdPath {
    Portable,
    Avx2,
    Neon,
}

impl SimdPath {
    pub fn name(self) -> &'static str {
        match self {
            SimdPath::Portable => "portable",
            SimdPath::Avx2 => "avx2",
            SimdPath::Neon => "neon",
        }
    }

    pub fn is_available(self) -> bool {
        match self {
            SimdPath::Portable => true,
            #[cfg(all(feature = "simd-avx2", target_arch = "x86_64"))]
            SimdPath::Avx2 => is_x86_feature_detected!("avx2"),
            #[cfg(all(feature = "simd-neon", target_arch = "aarch64"))]
            SimdPath::Neon => std::arch::is_aarch64_feature_detected!("neon"),
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }
}

/// Best path for this CPU and feature set, detected once per process.
pub fn detect() -> SimdPath {
    static PATH: OnceLock<SimdPath> = OnceLock::new();
    *PATH.get_or_init(|| {
        let path = [SimdPath::Avx2, SimdPath::Neon]
            .into_iter()
            .find(|p| p.is_available())
            .unwrap_or(SimdPath::Portable);
        debug!("q4_0 block sums: {} path", path.name());
        path
    })
}

/// Every path usable on this machine, portable first.
pub fn available_paths() -> Vec<SimdPath> {
    [SimdPath::Portable, SimdPath::Avx2, SimdPath::Neon]
        .into_iter()
        .filter(|p| p.is_available())
        .collect()
}

/// Ask the memory system to start loading the cache line holding `r`.
/// No effect on results; a no-op on targets without a stable prefetch intrinsic.
#[inline(always)]
pub fn prefetch<T>(r: &T) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch::<_MM_HINT_T0>((r as *const T).cast::<i8>());
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = r;
}

pub mod portable {
    use super::*;

    #[inline(always)]
    pub fn block_sumi(x: &BlockQ4_0, y: &BlockQ8_0) -> i32 {
        let mut lanes = [0i32; LANES];
        for j in 0..LANES {
            let b = x.qs[j];
            let lo = (b & 0x0F) as i32 - 8;
            let hi = (b >> 4) as i32 - 8;
            lanes[j] = lo * y.qs[j] as i32 + hi * y.qs[j + LANES] as i32;
        }
        hsum(&lanes)
    }

    #[inline(always)]
    fn hsum(lanes: &[i32; LANES]) -> i32 {
        // pairwise tree, same shape as a register reduction
        let mut w = *lanes;
        let mut width = LANES / 2;
        while width > 0 {
            for i in 0..width { w[i] += w[i + width]; }
            width /= 2;
        }
        w[0]
    }
}

#[cfg(all(feature = "simd-avx2", target_arch = "x86_64"))]
pub mod avx2 {
    use super::*;
    use std::arch::x86_64::*;

    /// Nibbles stay unsigned for `maddubs`; the zero-point is removed afterwards
    /// as `8 * sum(y)`, which keeps y = -128 exact.
    #[inline]
    #[target_feature(enable = "avx2")]
    pub unsafe fn block_sumi(x: &BlockQ4_0, y: &BlockQ8_0) -> i32 {
        let m4b = _mm256_set1_epi8(0x0F);
        let ones8 = _mm256_set1_epi8(1);
        let ones16 = _mm256_set1_epi16(1);

        let packed = _mm_loadu_si128(x.qs.as_ptr().cast());
        // low nibbles in bytes 0..16, high nibbles in bytes 16..32
        let both = _mm256_inserti128_si256::<1>(_mm256_castsi128_si256(packed), _mm_srli_epi16::<4>(packed));
        let nib = _mm256_and_si256(both, m4b);
        let qy = _mm256_loadu_si256(y.qs.as_ptr().cast());

        let prod = _mm256_madd_epi16(_mm256_maddubs_epi16(nib, qy), ones16);
        let ysum = _mm256_madd_epi16(_mm256_maddubs_epi16(ones8, qy), ones16);
        hsum_i32x8(_mm256_sub_epi32(prod, _mm256_slli_epi32::<3>(ysum)))
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn hsum_i32x8(v: __m256i) -> i32 {
        let s = _mm_add_epi32(_mm256_castsi256_si128(v), _mm256_extracti128_si256::<1>(v));
        let s = _mm_add_epi32(s, _mm_shuffle_epi32::<0b01_00_11_10>(s));
        let s = _mm_add_epi32(s, _mm_shuffle_epi32::<0b10_11_00_01>(s));
        _mm_cvtsi128_si32(s)
    }
}

#[cfg(all(feature = "simd-neon", target_arch = "aarch64"))]
pub mod neon {
    use super::*;
    use std::arch::aarch64::*;

    /// i8 x i8 -> i32x4 dot via widening multiplies; |product| <= 1024 fits i16.
    #[inline(always)]
    unsafe fn dot_s8(a: int8x16_t, b: int8x16_t) -> int32x4_t {
        let p0 = vmull_s8(vget_low_s8(a), vget_low_s8(b));
        let p1 = vmull_s8(vget_high_s8(a), vget_high_s8(b));
        vaddq_s32(vpaddlq_s16(p0), vpaddlq_s16(p1))
    }

    #[inline]
    #[target_feature(enable = "neon")]
    pub unsafe fn block_sumi(x: &BlockQ4_0, y: &BlockQ8_0) -> i32 {
        let m4b = vdupq_n_u8(0x0F);
        let s8b = vdupq_n_s8(8);
        let qx = vld1q_u8(x.qs.as_ptr());
        let xl = vsubq_s8(vreinterpretq_s8_u8(vandq_u8(qx, m4b)), s8b);
        let xh = vsubq_s8(vreinterpretq_s8_u8(vshrq_n_u8::<4>(qx)), s8b);
        let yl = vld1q_s8(y.qs.as_ptr());
        let yh = vld1q_s8(y.qs.as_ptr().add(LANES));
        vaddvq_s32(vaddq_s32(dot_s8(xl, yl), dot_s8(xh, yh)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portable_is_always_available() {
        assert!(SimdPath::Portable.is_available());
        assert_eq!(available_paths()[0], SimdPath::Portable);
        assert!(detect().is_available());
    }

    #[test]
    fn portable_block_sum_handles_extremes() {
        // every nibble -8, every activation -128: 32 * 1024
        let x = BlockQ4_0::new(1.0, [0x00; 16]);
        let y = BlockQ8_0::new(1.0, [-128; 32]);
        assert_eq!(portable::block_sumi(&x, &y), 32 * 1024);
    }
}
