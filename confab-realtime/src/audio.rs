//! PCM16 audio constants and byte-order utilities.

/// Sample rate the model expects on its input side.
pub const MODEL_INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of audio the model emits (and the local track publishes).
pub const MODEL_OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// MIME type attached to transmitted audio frames.
pub const PCM16_INPUT_MIME: &str = "audio/pcm;rate=16000";

/// One frame of signed 16-bit mono samples.
pub type Pcm16Frame = Vec<i16>;

/// Encode samples as little-endian bytes for the wire.
pub fn encode_pcm16_le(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Decode little-endian bytes into samples. A trailing odd byte is dropped.
pub fn decode_pcm16_le(bytes: &[u8]) -> Pcm16Frame {
    bytes.chunks_exact(2).map(|pair| i16::from_le_bytes([pair[0], pair[1]])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_le_round_trip() {
        let samples: Pcm16Frame = vec![0, 1, -1, i16::MAX, i16::MIN, 12345];
        let bytes = encode_pcm16_le(&samples);
        assert_eq!(bytes.len(), samples.len() * 2);
        assert_eq!(decode_pcm16_le(&bytes), samples);
    }

    #[test]
    fn test_pcm16_le_known_bytes() {
        // 0x0102 little-endian is [0x02, 0x01]
        assert_eq!(encode_pcm16_le(&[0x0102]), vec![0x02, 0x01]);
        assert_eq!(decode_pcm16_le(&[0x02, 0x01]), vec![0x0102]);
    }

    #[test]
    fn test_decode_drops_trailing_odd_byte() {
        assert_eq!(decode_pcm16_le(&[0x02, 0x01, 0xff]), vec![0x0102]);
    }
}
