use std::path::Path;

use crate::{SyncError, SyncResult};

/// Sample rate the language assistant expects for speech input and produces for speech output.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// Reads speech input for transcription.
///
/// Requirements: 16 kHz, mono, PCM int16 WAV file.
pub fn read_wav_samples(wav_path: &Path) -> SyncResult<Vec<f32>> {
    let mut reader = hound::WavReader::open(wav_path)?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(SyncError::UnsupportedAudio(format!(
            "expected 1 channel, found {}",
            spec.channels
        )));
    }

    if spec.sample_rate != SPEECH_SAMPLE_RATE {
        return Err(SyncError::UnsupportedAudio(format!(
            "expected {SPEECH_SAMPLE_RATE} Hz sample rate, found {} Hz",
            spec.sample_rate
        )));
    }

    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(SyncError::UnsupportedAudio(format!(
            "expected 16 bit integer samples, found {} bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples: Result<Vec<f32>, _> = reader
        .samples::<i16>()
        .map(|sample| sample.map(|s| s as f32 / i16::MAX as f32))
        .collect();

    Ok(samples?)
}

/// Writes synthesized speech as a 16 kHz mono PCM int16 WAV file.
pub fn write_wav_samples(wav_path: &Path, samples: &[f32]) -> SyncResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SPEECH_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(wav_path, spec)?;
    for sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32).round() as i16)?;
    }
    writer.finalize()?;

    Ok(())
}

/// Length of any WAV file in milliseconds, read from its header.
pub fn wav_duration_ms(wav_path: &Path) -> SyncResult<u64> {
    let reader = hound::WavReader::open(wav_path)?;
    let sample_rate = u64::from(reader.spec().sample_rate);
    if sample_rate == 0 {
        return Err(SyncError::UnsupportedAudio("sample rate is zero".to_string()));
    }

    Ok(u64::from(reader.duration()) * 1000 / sample_rate)
}
