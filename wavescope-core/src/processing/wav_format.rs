/// WAV container format utilities.
///
/// Generates canonical 44-byte headers and the helpers for patching the size
/// fields once the payload length is known. Little-endian formats get a
/// `RIFF` container; big-endian formats get `RIFX`, whose header integers are
/// big-endian, so the payload can be stored exactly as captured.
use crate::models::format::{ByteOrder, SampleFormat};

/// Size of the canonical WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Offset of the RIFF/RIFX chunk size field.
pub const CHUNK_SIZE_OFFSET: usize = 4;

/// Offset of the data sub-chunk size field.
pub const DATA_SIZE_OFFSET: usize = 40;

/// Largest payload the 32-bit size fields can describe.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - (WAV_HEADER_SIZE as u64 - 8);

/// Container magic for `order`.
pub fn riff_magic(order: ByteOrder) -> &'static [u8; 4] {
    match order {
        ByteOrder::Little => b"RIFF",
        ByteOrder::Big => b"RIFX",
    }
}

fn put_u16(header: &mut [u8], offset: usize, value: u16, order: ByteOrder) {
    let bytes = match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    };
    header[offset..offset + 2].copy_from_slice(&bytes);
}

fn put_u32(header: &mut [u8], offset: usize, value: u32, order: ByteOrder) {
    let bytes = match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    };
    header[offset..offset + 4].copy_from_slice(&bytes);
}

/// Read a header integer in `order` (used by tests and readers of our files).
pub fn read_u32(header: &[u8], offset: usize, order: ByteOrder) -> u32 {
    let bytes = [header[offset], header[offset + 1], header[offset + 2], header[offset + 3]];
    match order {
        ByteOrder::Little => u32::from_le_bytes(bytes),
        ByteOrder::Big => u32::from_be_bytes(bytes),
    }
}

pub fn read_u16(header: &[u8], offset: usize, order: ByteOrder) -> u16 {
    let bytes = [header[offset], header[offset + 1]];
    match order {
        ByteOrder::Little => u16::from_le_bytes(bytes),
        ByteOrder::Big => u16::from_be_bytes(bytes),
    }
}

/// Generate a 44-byte PCM header for `format`.
///
/// Layout (integers in the format's byte order):
/// ```text
/// [0-3]    "RIFF" (little-endian) or "RIFX" (big-endian)
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &SampleFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let order = format.byte_order();
    let sample_rate = format.sample_rate().round() as u32;
    let channels = format.channels();
    let bit_depth = format.bits_per_sample();
    let block_align = channels * bit_depth / 8;
    let byte_rate = sample_rate * block_align as u32;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(riff_magic(order));
    put_u32(&mut header, CHUNK_SIZE_OFFSET, 36 + data_size, order);
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    put_u32(&mut header, 16, 16, order);
    put_u16(&mut header, 20, 1, order);
    put_u16(&mut header, 22, channels, order);
    put_u32(&mut header, 24, sample_rate, order);
    put_u32(&mut header, 28, byte_rate, order);
    put_u16(&mut header, 32, block_align, order);
    put_u16(&mut header, 34, bit_depth, order);

    header[36..40].copy_from_slice(b"data");
    put_u32(&mut header, DATA_SIZE_OFFSET, data_size, order);

    header
}

/// Encoded chunk-size field for a payload of `data_size` bytes.
pub fn chunk_size_field(data_size: u32, order: ByteOrder) -> [u8; 4] {
    let mut field = [0u8; 4];
    put_u32(&mut field, 0, 36 + data_size, order);
    field
}

/// Encoded data-size field.
pub fn data_size_field(data_size: u32, order: ByteOrder) -> [u8; 4] {
    let mut field = [0u8; 4];
    put_u32(&mut field, 0, data_size, order);
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    fn little() -> SampleFormat {
        SampleFormat::mono_16bit(48_000.0, ByteOrder::Little)
    }

    #[test]
    fn little_endian_uses_riff_magic() {
        let header = generate_wav_header(&little(), 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn big_endian_uses_rifx_magic() {
        let header = generate_wav_header(&SampleFormat::default(), 0);
        assert_eq!(&header[0..4], b"RIFX");
        assert_eq!(&header[8..12], b"WAVE");
    }

    #[test]
    fn header_48khz_mono_16bit() {
        let header = generate_wav_header(&little(), 9600);
        let order = ByteOrder::Little;

        assert_eq!(read_u32(&header, 16, order), 16);
        assert_eq!(read_u16(&header, 20, order), 1);
        assert_eq!(read_u16(&header, 22, order), 1);
        assert_eq!(read_u32(&header, 24, order), 48_000);
        assert_eq!(read_u32(&header, 28, order), 96_000); // 48000 * 1 * 16/8
        assert_eq!(read_u16(&header, 32, order), 2);
        assert_eq!(read_u16(&header, 34, order), 16);
        assert_eq!(read_u32(&header, DATA_SIZE_OFFSET, order), 9600);
        assert_eq!(read_u32(&header, CHUNK_SIZE_OFFSET, order), 36 + 9600);
    }

    #[test]
    fn rifx_header_fields_are_big_endian() {
        let header = generate_wav_header(&SampleFormat::default(), 4096);

        assert_eq!(&header[24..28], &44_100u32.to_be_bytes());
        assert_eq!(read_u32(&header, 28, ByteOrder::Big), 88_200);
        assert_eq!(&header[40..44], &4096u32.to_be_bytes());
    }

    #[test]
    fn highest_valid_rate_fits_byte_rate_field() {
        let format = SampleFormat::mono_16bit(crate::models::format::MAX_SAMPLE_RATE, ByteOrder::Big);
        assert!(format.validate().is_ok());

        let header = generate_wav_header(&format, 0);
        assert_eq!(read_u32(&header, 24, ByteOrder::Big), u32::MAX / 2);
        assert_eq!(read_u32(&header, 28, ByteOrder::Big), u32::MAX - 1);
    }

    #[test]
    fn size_fields_match_generated_header() {
        let header = generate_wav_header(&little(), 1234);
        assert_eq!(chunk_size_field(1234, ByteOrder::Little), header[4..8]);
        assert_eq!(data_size_field(1234, ByteOrder::Little), header[40..44]);
    }
}
