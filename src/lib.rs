pub mod assistant;
pub mod audio;
pub mod config;
pub mod error;
pub mod facade;
pub mod index;
pub mod logging;
pub mod loop_engine;
pub mod rate;
pub mod selection;
pub mod source;
pub mod ticker;
pub mod tracker;
pub mod transcript;
pub mod transport;

pub use config::EngineParams;
pub use error::{SyncError, SyncResult};
pub use facade::{PlaybackEvent, PlaybackFacade};
pub use loop_engine::{BoundaryOutcome, LoopEngine, LoopRegion, LoopSource, LoopState, RepeatTarget};
pub use selection::{RangeSelector, SelectionChange};
pub use tracker::{CurrentLine, PositionTracker, SelectionOverride};
pub use transport::{SimulatedTransport, Transport, TransportEvent};

use serde::Serialize;

/// One timed line of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Inclusive start of the line in milliseconds.
    pub start_time_ms: u64,
    /// Exclusive end of the line in milliseconds.
    pub end_time_ms: u64,
    pub native: String,
    pub transliteration: String,
    pub translation: String,
}

impl Segment {
    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms - self.start_time_ms
    }

    pub fn contains(&self, time_ms: u64) -> bool {
        self.start_time_ms <= time_ms && time_ms < self.end_time_ms
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time_ms, self.end_time_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetadata {
    pub title: String,
    /// Author of the track.
    pub artist: String,
    pub duration_ms: u64,
}

/// A validated transcript. Segments are always sorted ascending by start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    metadata: TrackMetadata,
    segments: Vec<Segment>,
}

impl Transcript {
    /// Validates every segment and sorts them by start time. Nothing is kept
    /// when a single segment is invalid.
    pub fn new(metadata: TrackMetadata, mut segments: Vec<Segment>) -> SyncResult<Self> {
        for (index, segment) in segments.iter().enumerate() {
            if segment.start_time_ms >= segment.end_time_ms {
                return Err(SyncError::InvalidLine {
                    index,
                    start_time_ms: segment.start_time_ms,
                    end_time_ms: segment.end_time_ms,
                });
            }
        }

        segments.sort_by_key(|segment| segment.start_time_ms);

        Ok(Self { metadata, segments })
    }

    pub fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Track length: the declared duration, or the end of the last line when
    /// that lies further out.
    pub fn duration_ms(&self) -> u64 {
        let last_end = self
            .segments
            .iter()
            .map(|segment| segment.end_time_ms)
            .max()
            .unwrap_or(0);
        self.metadata.duration_ms.max(last_end)
    }

    pub fn find_active(&self, time_ms: u64) -> Option<usize> {
        index::find_active(&self.segments, time_ms)
    }
}

/// A half-open span of the track in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_time_ms: u64,
    pub end_time_ms: u64,
}

impl TimeRange {
    pub const EMPTY: Self = Self::new(0, 0);

    pub const fn new(start_time_ms: u64, end_time_ms: u64) -> Self {
        Self {
            start_time_ms,
            end_time_ms,
        }
    }

    pub fn span_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }

    pub fn is_empty(&self) -> bool {
        self.span_ms() == 0
    }

    pub fn contains(&self, time_ms: u64) -> bool {
        self.start_time_ms <= time_ms && time_ms < self.end_time_ms
    }
}
