use q4dot::block::{
    decode_nibble_pair, decode_scale, encode_nibble_pair, encode_scale, paired_len, q4_0_blocks_from_bytes,
    q8_0_blocks_from_bytes, BlockQ4_0, BlockQ8_0, LayoutError, Q4_0_BLOCK_BYTES, Q8_0_BLOCK_BYTES,
};

#[test]
fn nibble_pair_round_trips_every_byte() {
    for b in 0..=255u8 {
        let (lo, hi) = decode_nibble_pair(b);
        assert!((-8..=7).contains(&lo) && (-8..=7).contains(&hi));
        assert_eq!(encode_nibble_pair(lo, hi), b, "byte {:#04x}", b);
        assert_eq!((lo + 8) as u8, b & 0x0F);
        assert_eq!((hi + 8) as u8, b >> 4);
    }
}

#[test]
fn scale_decode_is_half_expansion() {
    assert_eq!(decode_scale(0x3C00), 1.0);
    assert_eq!(decode_scale(0xC000), -2.0);
    assert_eq!(decode_scale(0x0000), 0.0);
    assert_eq!(decode_scale(0x7BFF), 65504.0);
    // smallest subnormal
    assert_eq!(decode_scale(0x0001), 2f32.powi(-24));
    assert!(decode_scale(0x7C00).is_infinite());
    assert!(decode_scale(0x7E00).is_nan());
    assert_eq!(decode_scale(encode_scale(0.125)), 0.125);
}

#[test]
fn values_put_low_nibbles_first() {
    let mut qs = [0x88u8; 16];
    qs[0] = 0x9A; // lo = +2, hi = +1
    let b = BlockQ4_0::new(1.0, qs);
    let v = b.values();
    assert_eq!(v[0], 2);
    assert_eq!(v[16], 1);
    assert!(v[1..16].iter().all(|&e| e == 0));
    assert_eq!(BlockQ4_0::from_values(1.0, &v), b);
}

#[test]
fn q4_0_bytes_are_le_scale_then_payload() {
    let mut raw = [0u8; Q4_0_BLOCK_BYTES];
    raw[..2].copy_from_slice(&0x3800u16.to_le_bytes()); // 0.5
    for (j, r) in raw[2..].iter_mut().enumerate() { *r = j as u8 * 16 + 15 - j as u8; }
    let b = BlockQ4_0::from_bytes(&raw);
    assert_eq!(b.scale(), 0.5);
    assert_eq!(b.qs[3], 3 * 16 + 12);
    assert_eq!(b.to_bytes(), raw);
    assert_eq!(b.dequantize()[0], (15.0 - 8.0) * 0.5);
}

#[test]
fn q8_0_bytes_are_le_scale_then_payload() {
    let mut raw = [0u8; Q8_0_BLOCK_BYTES];
    raw[..2].copy_from_slice(&0x4000u16.to_le_bytes()); // 2.0
    raw[2] = 0x80;
    raw[33] = 0x7F;
    let b = BlockQ8_0::from_bytes(&raw);
    assert_eq!(b.scale(), 2.0);
    assert_eq!(b.qs[0], -128);
    assert_eq!(b.qs[31], 127);
    assert_eq!(b.dequantize()[0], -256.0);
    assert_eq!(b.to_bytes(), raw);
}

#[test]
fn slice_parsers_reject_partial_blocks() {
    let bytes = vec![0u8; Q4_0_BLOCK_BYTES * 3];
    assert_eq!(q4_0_blocks_from_bytes(&bytes).unwrap().len(), 3);
    assert_eq!(
        q4_0_blocks_from_bytes(&bytes[..40]).unwrap_err(),
        LayoutError::Truncated { len: 40, block_bytes: Q4_0_BLOCK_BYTES }
    );
    let bytes = vec![0u8; Q8_0_BLOCK_BYTES * 2 + 1];
    assert!(matches!(q8_0_blocks_from_bytes(&bytes), Err(LayoutError::Truncated { .. })));
    assert!(q8_0_blocks_from_bytes(&[]).unwrap().is_empty());
}

#[test]
fn paired_len_requires_equal_block_counts() {
    let x = vec![BlockQ4_0::default(); 4];
    let y = vec![BlockQ8_0::default(); 4];
    assert_eq!(paired_len(&x, &y), Ok(128));
    assert_eq!(paired_len(&x, &y[..3]), Err(LayoutError::BlockCountMismatch { weights: 4, activations: 3 }));
}
