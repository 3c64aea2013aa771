//! Block layouts for the 4-bit weight format (q4_0) and 8-bit activation format (q8_0).
//!
//! Both formats quantize 32 consecutive values with one f16 scale per block.
//! On the wire a q4_0 block is 18 bytes (LE scale bits + 16 packed bytes) and a
//! q8_0 block is 34 bytes (LE scale bits + 32 signed bytes).

use half::f16;
use thiserror::Error;

/// Elements per q4_0 block.
pub const QK4_0: usize = 32;
/// Elements per q8_0 block.
pub const QK8_0: usize = 32;
/// Zero-point subtracted from every 4-bit nibble.
pub const Q4_ZERO_POINT: i8 = 8;

pub const Q4_0_BLOCK_BYTES: usize = 2 + QK4_0 / 2;
pub const Q8_0_BLOCK_BYTES: usize = 2 + QK8_0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("byte length {len} is not a whole number of {block_bytes}-byte blocks")]
    Truncated { len: usize, block_bytes: usize },
    #[error("weight vector has {weights} blocks but activation vector has {activations}")]
    BlockCountMismatch { weights: usize, activations: usize },
}

/// Split one packed byte into its two signed nibbles: `(low - 8, high - 8)`.
#[inline(always)]
pub fn decode_nibble_pair(byte: u8) -> (i8, i8) {
    ((byte & 0x0F) as i8 - Q4_ZERO_POINT, (byte >> 4) as i8 - Q4_ZERO_POINT)
}

/// Inverse of [`decode_nibble_pair`]. Inputs must lie in [-8, 7].
#[inline]
pub fn encode_nibble_pair(lo: i8, hi: i8) -> u8 {
    debug_assert!((-8..=7).contains(&lo) && (-8..=7).contains(&hi));
    let lo = (lo + Q4_ZERO_POINT) as u8 & 0x0F;
    let hi = (hi + Q4_ZERO_POINT) as u8 & 0x0F;
    lo | (hi << 4)
}

/// Expand stored half-precision scale bits to f32. Exact for every bit pattern.
#[inline(always)]
pub fn decode_scale(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Round an f32 to the nearest f16 and return its bits.
#[inline]
pub fn encode_scale(v: f32) -> u16 {
    f16::from_f32(v).to_bits()
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct BlockQ4_0 {
    pub d: f16,
    pub qs: [u8; QK4_0 / 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct BlockQ8_0 {
    pub d: f16,
    pub qs: [i8; QK8_0],
}

impl Default for BlockQ4_0 {
    fn default() -> Self { Self { d: f16::ZERO, qs: [0x88; QK4_0 / 2] } }
}

impl Default for BlockQ8_0 {
    fn default() -> Self { Self { d: f16::ZERO, qs: [0; QK8_0] } }
}

impl BlockQ4_0 {
    pub fn new(scale: f32, qs: [u8; QK4_0 / 2]) -> Self {
        Self { d: f16::from_f32(scale), qs }
    }

    /// Pack 32 signed values in [-8, 7]; element `j` and `j + 16` share byte `j`.
    pub fn from_values(scale: f32, vals: &[i8; QK4_0]) -> Self {
        let mut qs = [0u8; QK4_0 / 2];
        for j in 0..QK4_0 / 2 {
            qs[j] = encode_nibble_pair(vals[j], vals[j + QK4_0 / 2]);
        }
        Self::new(scale, qs)
    }

    #[inline(always)]
    pub fn scale(&self) -> f32 { self.d.to_f32() }

    /// Signed element values in logical order: all low nibbles, then all high nibbles.
    pub fn values(&self) -> [i8; QK4_0] {
        let mut out = [0i8; QK4_0];
        for (j, &b) in self.qs.iter().enumerate() {
            let (lo, hi) = decode_nibble_pair(b);
            out[j] = lo;
            out[j + QK4_0 / 2] = hi;
        }
        out
    }

    pub fn dequantize(&self) -> [f32; QK4_0] {
        let d = self.scale();
        self.values().map(|v| v as f32 * d)
    }

    pub fn from_bytes(b: &[u8; Q4_0_BLOCK_BYTES]) -> Self {
        let mut qs = [0u8; QK4_0 / 2];
        qs.copy_from_slice(&b[2..]);
        Self { d: f16::from_bits(u16::from_le_bytes([b[0], b[1]])), qs }
    }

    pub fn to_bytes(&self) -> [u8; Q4_0_BLOCK_BYTES] {
        let mut out = [0u8; Q4_0_BLOCK_BYTES];
        out[..2].copy_from_slice(&self.d.to_bits().to_le_bytes());
        out[2..].copy_from_slice(&self.qs);
        out
    }
}

impl BlockQ8_0 {
    pub fn new(scale: f32, qs: [i8; QK8_0]) -> Self {
        Self { d: f16::from_f32(scale), qs }
    }

    #[inline(always)]
    pub fn scale(&self) -> f32 { self.d.to_f32() }

    pub fn dequantize(&self) -> [f32; QK8_0] {
        let d = self.scale();
        self.qs.map(|v| v as f32 * d)
    }

    pub fn from_bytes(b: &[u8; Q8_0_BLOCK_BYTES]) -> Self {
        let mut qs = [0i8; QK8_0];
        for (dst, &src) in qs.iter_mut().zip(&b[2..]) { *dst = src as i8; }
        Self { d: f16::from_bits(u16::from_le_bytes([b[0], b[1]])), qs }
    }

    pub fn to_bytes(&self) -> [u8; Q8_0_BLOCK_BYTES] {
        let mut out = [0u8; Q8_0_BLOCK_BYTES];
        out[..2].copy_from_slice(&self.d.to_bits().to_le_bytes());
        for (dst, &src) in out[2..].iter_mut().zip(&self.qs) { *dst = src as u8; }
        out
    }
}

fn split_blocks<const N: usize>(bytes: &[u8]) -> Result<impl Iterator<Item = &[u8; N]>, LayoutError> {
    if bytes.len() % N != 0 {
        return Err(LayoutError::Truncated { len: bytes.len(), block_bytes: N });
    }
    // chunks_exact yields exactly N bytes, so the conversion cannot fail
    Ok(bytes.chunks_exact(N).filter_map(|c| <&[u8; N]>::try_from(c).ok()))
}

/// Parse a contiguous run of 18-byte q4_0 blocks.
pub fn q4_0_blocks_from_bytes(bytes: &[u8]) -> Result<Vec<BlockQ4_0>, LayoutError> {
    Ok(split_blocks::<Q4_0_BLOCK_BYTES>(bytes)?.map(BlockQ4_0::from_bytes).collect())
}

/// Parse a contiguous run of 34-byte q8_0 blocks.
pub fn q8_0_blocks_from_bytes(bytes: &[u8]) -> Result<Vec<BlockQ8_0>, LayoutError> {
    Ok(split_blocks::<Q8_0_BLOCK_BYTES>(bytes)?.map(BlockQ8_0::from_bytes).collect())
}

/// Check that two parsed vectors can be fed to a kernel together and return `n`.
pub fn paired_len(x: &[BlockQ4_0], y: &[BlockQ8_0]) -> Result<usize, LayoutError> {
    if x.len() != y.len() {
        return Err(LayoutError::BlockCountMismatch { weights: x.len(), activations: y.len() });
    }
    Ok(x.len() * QK4_0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_sizes_match_wire_layout() {
        assert_eq!(std::mem::size_of::<BlockQ4_0>(), Q4_0_BLOCK_BYTES);
        assert_eq!(std::mem::size_of::<BlockQ8_0>(), Q8_0_BLOCK_BYTES);
    }

    #[test]
    fn nibble_pair_extremes() {
        assert_eq!(decode_nibble_pair(0x00), (-8, -8));
        assert_eq!(decode_nibble_pair(0xFF), (7, 7));
        assert_eq!(decode_nibble_pair(0x8F), (7, 0));
        assert_eq!(decode_nibble_pair(0x88), (0, 0));
    }
}
