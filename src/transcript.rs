//! Loading transcripts from their JSON interchange form.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::{Segment, SyncResult, TrackMetadata, Transcript};

#[derive(Debug, Deserialize)]
struct TranscriptPayload {
    metadata: MetadataPayload,
    lines: Vec<LinePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataPayload {
    title: String,
    artist: String,
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinePayload {
    start_time_ms: u64,
    end_time_ms: u64,
    native: String,
    transliteration: String,
    translation: String,
}

impl TranscriptPayload {
    fn into_transcript(self) -> SyncResult<Transcript> {
        let metadata = TrackMetadata {
            title: self.metadata.title,
            artist: self.metadata.artist,
            duration_ms: self.metadata.duration_ms,
        };

        let segments = self
            .lines
            .into_iter()
            .map(|line| Segment {
                start_time_ms: line.start_time_ms,
                end_time_ms: line.end_time_ms,
                native: line.native,
                transliteration: line.transliteration,
                translation: line.translation,
            })
            .collect();

        Transcript::new(metadata, segments)
    }
}

/// Parses and validates a transcript. Fails as a whole: a single malformed
/// line rejects the document.
pub fn parse_transcript(json: &str) -> SyncResult<Transcript> {
    let payload: TranscriptPayload = serde_json::from_str(json)?;
    debug!(lines = payload.lines.len(), "decoded transcript payload");

    let transcript = payload.into_transcript()?;
    info!(
        title = %transcript.metadata().title,
        lines = transcript.len(),
        duration_ms = transcript.duration_ms(),
        "loaded transcript"
    );

    Ok(transcript)
}

pub fn read_transcript(path: &Path) -> SyncResult<Transcript> {
    let json = std::fs::read_to_string(path)?;
    parse_transcript(&json)
}
