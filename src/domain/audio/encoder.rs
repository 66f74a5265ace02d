//! WAV container for provider PCM.
//!
//! The provider returns headerless 16-bit little-endian mono PCM at 24 kHz.
//! Encoding is a pure function of the sample bytes.

use super::error::SynthesisError;

pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;
pub const WAV_HEADER_SIZE: usize = 44;

/// Anything shorter than ~20ms of audio cannot be a real utterance
pub const MIN_SAMPLE_BYTES: usize = 1_000;

pub const CONTENT_TYPE: &str = "audio/wav";

const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// Wrap raw PCM bytes in a 44-byte RIFF/WAVE header
pub fn encode_wav(samples: &[u8]) -> Vec<u8> {
    let data_len = samples.len() as u32;
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let byte_rate = SAMPLE_RATE * block_align as u32;

    let mut out = Vec::with_capacity(WAV_HEADER_SIZE + samples.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(samples);
    out
}

/// Encode after rejecting buffers that cannot hold real speech
pub fn encode_checked(samples: &[u8]) -> Result<Vec<u8>, SynthesisError> {
    if samples.len() < MIN_SAMPLE_BYTES {
        return Err(SynthesisError::UndersizedAudio {
            actual: samples.len(),
            minimum: MIN_SAMPLE_BYTES,
        });
    }
    if samples.len() % (BITS_PER_SAMPLE as usize / 8) != 0 {
        return Err(SynthesisError::MalformedResponse(format!(
            "sample payload of {} bytes is not a whole number of 16-bit samples",
            samples.len()
        )));
    }
    if samples.len() > (u32::MAX as usize - 36) {
        return Err(SynthesisError::MalformedResponse(format!(
            "sample payload of {} bytes exceeds WAV size limit",
            samples.len()
        )));
    }

    Ok(encode_wav(samples))
}

/// Playback length of a PCM buffer in milliseconds
pub fn duration_ms(sample_bytes: usize) -> u64 {
    let bytes_per_second = SAMPLE_RATE as u64 * (BITS_PER_SAMPLE as u64 / 8) * CHANNELS as u64;
    sample_bytes as u64 * 1000 / bytes_per_second
}
