//! Optional language assistant: questions about the current line, speech to
//! text and text to speech.
//!
//! The assistant never touches playback. [`AssistantLink`] only reads the
//! track and line it is handed, so a slow or failing assistant cannot pause,
//! stop or desynchronize a loop.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::audio::{read_wav_samples, write_wav_samples};
use crate::{Segment, SyncError, SyncResult, TrackMetadata};

pub trait LanguageAssistant {
    /// Answers a free-text question, optionally grounded in the track and the line being heard.
    fn ask(
        &mut self,
        question: &str,
        track: Option<&TrackMetadata>,
        segment: Option<&Segment>,
    ) -> SyncResult<String>;

    /// Transcribe already-decoded samples (16 kHz, mono, f32 in [-1, 1]).
    fn transcribe_samples(&mut self, samples: Vec<f32>) -> SyncResult<String>;

    /// Speak `text`, returning 16 kHz mono samples.
    fn synthesize(&mut self, text: &str) -> SyncResult<Vec<f32>>;

    /// Transcribe a WAV file.
    fn transcribe_file(&mut self, wav_path: &Path) -> SyncResult<String> {
        let samples = read_wav_samples(wav_path)?;
        self.transcribe_samples(samples)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistantContext<'a> {
    track: Option<&'a TrackMetadata>,
    line: Option<&'a Segment>,
}

/// JSON context describing what the listener is hearing, for prompts.
pub fn segment_context(
    track: Option<&TrackMetadata>,
    segment: Option<&Segment>,
) -> SyncResult<String> {
    Ok(serde_json::to_string(&AssistantContext {
        track,
        line: segment,
    })?)
}

/// A possibly absent assistant. Every call fails with
/// [`SyncError::AssistantUnavailable`] when none is attached.
#[derive(Default)]
pub struct AssistantLink {
    assistant: Option<Box<dyn LanguageAssistant>>,
}

impl AssistantLink {
    pub fn new(assistant: Box<dyn LanguageAssistant>) -> Self {
        Self {
            assistant: Some(assistant),
        }
    }

    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.assistant.is_some()
    }

    pub fn attach(&mut self, assistant: Box<dyn LanguageAssistant>) {
        self.assistant = Some(assistant);
    }

    pub fn detach(&mut self) {
        self.assistant = None;
    }

    pub fn ask_about(
        &mut self,
        question: &str,
        track: Option<&TrackMetadata>,
        segment: Option<&Segment>,
    ) -> SyncResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SyncError::Assistant("question is empty".to_string()));
        }

        debug!(
            has_track = track.is_some(),
            has_line = segment.is_some(),
            "asking assistant"
        );
        let answer = self.assistant()?.ask(question, track, segment);
        log_failure("ask", answer)
    }

    pub fn transcribe_file(&mut self, wav_path: &Path) -> SyncResult<String> {
        let text = self.assistant()?.transcribe_file(wav_path);
        log_failure("transcribe", text).map(|text| text.trim().to_string())
    }

    /// Synthesizes `text` and writes it to `wav_path`.
    pub fn synthesize_to_file(&mut self, text: &str, wav_path: &Path) -> SyncResult<()> {
        let samples = log_failure("synthesize", self.assistant()?.synthesize(text))?;
        if samples.is_empty() {
            return Err(SyncError::Assistant("synthesis produced no audio".to_string()));
        }

        write_wav_samples(wav_path, &samples)
    }

    fn assistant(&mut self) -> SyncResult<&mut Box<dyn LanguageAssistant>> {
        self.assistant
            .as_mut()
            .ok_or(SyncError::AssistantUnavailable)
    }
}

fn log_failure<T>(action: &str, result: SyncResult<T>) -> SyncResult<T> {
    if let Err(error) = &result {
        warn!(action, code = error.code(), %error, "assistant call failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl LanguageAssistant for Echo {
        fn ask(
            &mut self,
            question: &str,
            _track: Option<&TrackMetadata>,
            segment: Option<&Segment>,
        ) -> SyncResult<String> {
            Ok(match segment {
                Some(segment) => format!("{question} -> {}", segment.translation),
                None => question.to_string(),
            })
        }

        fn transcribe_samples(&mut self, samples: Vec<f32>) -> SyncResult<String> {
            Ok(format!(" {} samples ", samples.len()))
        }

        fn synthesize(&mut self, _text: &str) -> SyncResult<Vec<f32>> {
            Err(SyncError::Assistant("voice offline".to_string()))
        }
    }

    #[test]
    fn detached_link_reports_unavailable() {
        let mut link = AssistantLink::detached();

        assert!(!link.is_available());
        assert!(matches!(
            link.ask_about("what?", None, None),
            Err(SyncError::AssistantUnavailable)
        ));
    }

    #[test]
    fn ask_passes_the_current_line() {
        let mut link = AssistantLink::new(Box::new(Echo));
        let segment = Segment {
            start_time_ms: 0,
            end_time_ms: 1000,
            native: "hola".to_string(),
            transliteration: "hola".to_string(),
            translation: "hello".to_string(),
        };

        let answer = link.ask_about("  meaning?  ", None, Some(&segment)).unwrap();
        assert_eq!(answer, "meaning? -> hello");
    }

    #[test]
    fn blank_questions_are_refused() {
        let mut link = AssistantLink::new(Box::new(Echo));
        assert!(link.ask_about("   ", None, None).is_err());
    }

    #[test]
    fn synthesis_failure_is_returned() {
        let mut link = AssistantLink::new(Box::new(Echo));
        let path = std::env::temp_dir().join("linesync-never-written.wav");

        let error = link.synthesize_to_file("hi", &path).expect_err("voice is offline");
        assert!(error.to_string().contains("voice offline"));
        assert!(!path.exists());
    }

    #[test]
    fn context_serializes_line_fields() {
        let segment = Segment {
            start_time_ms: 10,
            end_time_ms: 20,
            native: "n".to_string(),
            transliteration: "t".to_string(),
            translation: "x".to_string(),
        };

        let context = segment_context(None, Some(&segment)).unwrap();
        assert!(context.contains("\"startTimeMs\":10"));
        assert!(context.contains("\"track\":null"));
    }
}
