//! Reference q4_0 x q8_0 dot product: two blocks per step into two running totals.

use crate::block::{decode_nibble_pair, BlockQ4_0, BlockQ8_0, QK4_0};

/// Integer partial sum of one block pair.
/// Low nibbles pair with `y.qs[0..16]`, high nibbles with `y.qs[16..32]`.
#[inline(always)]
fn block_sumi(x: &BlockQ4_0, y: &BlockQ8_0) -> i32 {
    let mut sumi0: i32 = 0;
    let mut sumi1: i32 = 0;
    for j in 0..QK4_0 / 2 {
        let (v0, v1) = decode_nibble_pair(x.qs[j]);
        sumi0 += (v0 as i32) * (y.qs[j] as i32);
        sumi1 += (v1 as i32) * (y.qs[j + QK4_0 / 2] as i32);
    }
    sumi0 + sumi1
}

#[inline(always)]
fn block_contribution(x: &BlockQ4_0, y: &BlockQ8_0) -> f32 {
    block_sumi(x, y) as f32 * (x.scale() * y.scale())
}

pub fn vec_dot_q4_0_q8_0(n: usize, x: &[BlockQ4_0], y: &[BlockQ8_0]) -> f32 {
    debug_assert!(n % QK4_0 == 0, "n must be a multiple of {}", QK4_0);
    let nb = n / QK4_0;
    debug_assert!(x.len() >= nb && y.len() >= nb);

    let mut sumv0 = 0.0f32;
    let mut sumv1 = 0.0f32;
    let mut ib = 0usize;
    while ib + 1 < nb {
        sumv0 += block_contribution(&x[ib], &y[ib]);
        sumv1 += block_contribution(&x[ib + 1], &y[ib + 1]);
        ib += 2;
    }
    let mut sumf = sumv0 + sumv1;

    // odd trailing block
    while ib < nb {
        sumf += block_contribution(&x[ib], &y[ib]);
        ib += 1;
    }
    sumf
}
