//! Minimal PCM WAV writer for silence.

use super::{ExportError, ExportResult};

/// Sample rate of generated silence.
pub const SILENCE_SAMPLE_RATE: u32 = 24_000;

const HEADER_LEN: u64 = 44;

/// 16-bit mono PCM WAV of `duration_secs` of silence.
///
/// Fails when the audio would not fit the 32-bit RIFF size fields.
pub fn silence_wav(duration_secs: f64, sample_rate: u32) -> ExportResult<Vec<u8>> {
    let channels = 1u16;
    let bits_per_sample = 16u16;
    let block_align = channels * (bits_per_sample / 8);

    let too_long = || ExportError::SilenceTooLong {
        duration_secs,
        sample_rate,
    };

    let byte_rate = sample_rate
        .checked_mul(u32::from(block_align))
        .ok_or_else(too_long)?;

    let samples = (duration_secs.max(0.0) * f64::from(sample_rate)).round();
    if !samples.is_finite() || samples > u64::MAX as f64 {
        return Err(too_long());
    }
    let data_size = (samples as u64)
        .checked_mul(u64::from(block_align))
        .and_then(|size| u32::try_from(size).ok())
        .ok_or_else(too_long)?;
    let riff_size = data_size.checked_add(36).ok_or_else(too_long)?;

    let mut wav = Vec::with_capacity((HEADER_LEN + u64::from(data_size)) as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&riff_size.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.resize((HEADER_LEN + u64::from(data_size)) as usize, 0);
    Ok(wav)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_length() {
        let wav = silence_wav(0.5, 8_000).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 4000 samples * 2 bytes
        assert_eq!(wav.len(), 44 + 8_000);
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36 + 8_000);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8_000);
        assert!(wav[44..].iter().all(|b| *b == 0));
    }

    #[test]
    fn rejects_silence_beyond_riff_limit() {
        let err = silence_wav(100_000.0, SILENCE_SAMPLE_RATE).unwrap_err();
        assert!(matches!(
            err,
            ExportError::SilenceTooLong { sample_rate: SILENCE_SAMPLE_RATE, .. }
        ));
        assert!(matches!(
            silence_wav(f64::INFINITY, SILENCE_SAMPLE_RATE),
            Err(ExportError::SilenceTooLong { .. })
        ));
    }
}
