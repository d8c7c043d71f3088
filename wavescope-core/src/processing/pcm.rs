//! Raw 16-bit PCM to amplitude decoding.

use crate::models::format::{ByteOrder, SampleFormat};

/// Decode one big-endian sample pair.
///
/// The high byte is sign-extended and the low byte masked, which yields the
/// two's-complement value of the `hi:lo` word.
#[inline]
pub fn decode_be16(hi: u8, lo: u8) -> i16 {
    (((hi as i8 as i32) << 8) | (lo as i32 & 0xFF)) as i16
}

/// Decode raw bytes into one amplitude per sample.
///
/// A trailing partial sample is ignored.
pub fn decode_frame(bytes: &[u8], format: &SampleFormat) -> Vec<f32> {
    let pairs = bytes.chunks_exact(2);
    match format.byte_order() {
        ByteOrder::Big => pairs.map(|p| decode_be16(p[0], p[1]) as f32).collect(),
        ByteOrder::Little => pairs.map(|p| decode_be16(p[1], p[0]) as f32).collect(),
    }
}

/// Encode a 16-bit sample in `order`.
#[inline]
pub fn encode_i16(sample: i16, order: ByteOrder) -> [u8; 2] {
    match order {
        ByteOrder::Big => sample.to_be_bytes(),
        ByteOrder::Little => sample.to_le_bytes(),
    }
}
