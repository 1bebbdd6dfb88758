use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use linesync::audio::{read_wav_samples, wav_duration_ms, write_wav_samples};
use linesync::transport::{SimulatedTransport, Transport, TransportEvent};
use linesync::SyncError;

/// A WAV file in the temp dir, removed on drop.
struct Fixture(PathBuf);

impl Fixture {
    fn empty(tag: &str) -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(std::env::temp_dir().join(format!("linesync-{tag}-{}-{id}.wav", std::process::id())))
    }

    fn pcm16(tag: &str, sample_rate: u32, samples: &[i16]) -> Self {
        let fixture = Self::empty(tag);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer =
            hound::WavWriter::create(fixture.path(), spec).expect("fixture should be created");
        for &sample in samples {
            writer.write_sample(sample).expect("sample should be written");
        }
        writer.finalize().expect("fixture should be finalized");
        fixture
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[test]
fn full_scale_samples_map_onto_unit_range() {
    let wav = Fixture::pcm16("scale", 16_000, &[i16::MAX, -i16::MAX, 0, 16_384]);
    let samples = read_wav_samples(wav.path()).expect("speech wav should load");

    assert_eq!(samples.len(), 4);
    assert_eq!(samples[0], 1.0);
    assert_eq!(samples[1], -1.0);
    assert_eq!(samples[2], 0.0);
    assert!((samples[3] - 0.5).abs() < 0.001);
}

#[test]
fn wrong_sample_rate_is_a_format_error() {
    let wav = Fixture::pcm16("rate", 8_000, &[0, 100, -100, 50]);
    let error = read_wav_samples(wav.path()).expect_err("8 kHz speech must be refused");

    assert!(matches!(error, SyncError::UnsupportedAudio(_)));
    assert_eq!(error.code(), "LS-AUDIO-FORMAT");
    assert!(error.to_string().contains("8000 Hz"));
}

#[test]
fn missing_file_is_an_audio_error() {
    let wav = Fixture::empty("missing");
    let error = read_wav_samples(wav.path()).expect_err("nothing to read");

    assert_eq!(error.code(), "LS-AUDIO");
    assert!(matches!(error, SyncError::Audio(_)));
}

#[test]
fn duration_comes_from_the_header() {
    let wav = Fixture::pcm16("duration", 8_000, &vec![0; 12_000]);

    assert_eq!(wav_duration_ms(wav.path()).expect("header should be readable"), 1500);
}

#[test]
fn simulated_transport_takes_length_from_wav() {
    let wav = Fixture::pcm16("transport", 16_000, &vec![0; 32_000]);
    let mut transport = SimulatedTransport::from_wav(wav.path()).expect("wav should load");

    assert_eq!(transport.duration_ms(), Some(2000));
    assert_eq!(
        transport.poll_event(),
        Some(TransportEvent::MetadataLoaded { duration_ms: 2000 })
    );
}

#[test]
fn written_samples_read_back_clamped() {
    let wav = Fixture::empty("written");
    write_wav_samples(wav.path(), &[0.5, -2.0, 2.0]).expect("wav should be written");
    let samples = read_wav_samples(wav.path()).expect("wav should load");

    assert_eq!(samples.len(), 3);
    assert!((samples[0] - 0.5).abs() < 0.001);
    assert_eq!(samples[1], -1.0);
    assert_eq!(samples[2], 1.0);
}
