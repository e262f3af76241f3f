//! PCM decoding for streamed TTS audio.
//!
//! The vendor negotiates PCM WAV, mono, 16-bit little-endian. The first
//! chunk of a stream may carry a 44-byte RIFF header; detection is by the
//! RIFF magic only, never by position.

use blitsum_core::AudioBuffer;

pub const WAV_HEADER_LEN: usize = 44;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Whether the chunk starts with a RIFF/WAVE header.
pub fn has_riff_header(bytes: &[u8]) -> bool {
    bytes.len() >= WAV_HEADER_LEN && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Strip the 44-byte header when the magic is present.
pub fn strip_riff_header(bytes: &[u8]) -> &[u8] {
    if has_riff_header(bytes) {
        &bytes[WAV_HEADER_LEN..]
    } else {
        bytes
    }
}

/// Decode 16-bit little-endian PCM into a mono float buffer. A trailing
/// odd byte is dropped.
pub fn decode_pcm16le(bytes: &[u8], sample_rate: u32) -> AudioBuffer {
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32_768.0)
        .collect();
    AudioBuffer { samples, sample_rate }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_header() -> Vec<u8> {
        let mut header = vec![0u8; WAV_HEADER_LEN];
        header[..4].copy_from_slice(b"RIFF");
        header[8..12].copy_from_slice(b"WAVE");
        header
    }

    #[test]
    fn riff_magic_detected() {
        let mut chunk = wav_header();
        chunk.extend_from_slice(&[0, 0, 0, 0]);
        assert!(has_riff_header(&chunk));
        assert!(!has_riff_header(&chunk[4..]));
    }

    #[test]
    fn header_strip_is_exactly_44_bytes() {
        let mut chunk = wav_header();
        chunk.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(strip_riff_header(&chunk), &[1, 2, 3, 4]);
    }

    #[test]
    fn headerless_chunks_pass_through() {
        let chunk = [1u8, 2, 3, 4];
        assert_eq!(strip_riff_header(&chunk), &[1, 2, 3, 4]);
    }

    #[test]
    fn pcm_decode_scales_to_unit_range() {
        let bytes = i16::MAX.to_le_bytes();
        let buffer = decode_pcm16le(&bytes, 44_100);
        assert_eq!(buffer.samples.len(), 1);
        assert!((buffer.samples[0] - 0.99997).abs() < 1e-4);

        let bytes = i16::MIN.to_le_bytes();
        let buffer = decode_pcm16le(&bytes, 44_100);
        assert!((buffer.samples[0] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn duration_follows_sample_rate() {
        let bytes = vec![0u8; 44_100 * 2];
        let buffer = decode_pcm16le(&bytes, 44_100);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
    }
}
