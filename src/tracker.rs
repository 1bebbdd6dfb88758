use crate::index::{best_segment, find_active};
use crate::loop_engine::LoopRegion;
use crate::{Segment, TimeRange, Transcript};

/// The line to highlight and whether playback is actually inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentLine {
    pub index: Option<usize>,
    pub is_active: bool,
}

impl CurrentLine {
    pub const NONE: Self = Self {
        index: None,
        is_active: false,
    };

    fn active(index: usize) -> Self {
        Self {
            index: Some(index),
            is_active: true,
        }
    }

    fn inactive(index: usize) -> Self {
        Self {
            index: Some(index),
            is_active: false,
        }
    }

    pub fn segment<'a>(&self, transcript: &'a Transcript) -> Option<&'a Segment> {
        transcript.get(self.index?)
    }
}

/// A single-line loop target that pins the highlight to its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionOverride {
    pub start_time_ms: u64,
    pub end_time_ms: u64,
}

impl From<TimeRange> for SelectionOverride {
    fn from(range: TimeRange) -> Self {
        Self {
            start_time_ms: range.start_time_ms,
            end_time_ms: range.end_time_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    passed_discount: f64,
}

impl PositionTracker {
    pub fn new(passed_discount: f64) -> Self {
        Self { passed_discount }
    }

    /// Maps a playback time to the line to highlight.
    ///
    /// An active loop wins over a selection override, which wins over natural
    /// playback. Before playback ever started nothing is highlighted; a pause
    /// mid-track keeps the highlight.
    pub fn resolve(
        &self,
        transcript: &Transcript,
        time_ms: u64,
        is_playing: bool,
        loop_region: Option<&LoopRegion>,
        selection_override: Option<&SelectionOverride>,
    ) -> CurrentLine {
        let segments = transcript.segments();
        if segments.is_empty() {
            return CurrentLine::NONE;
        }

        if loop_region.is_some_and(|region| region.active) {
            let index = find_active(segments, time_ms)
                .or_else(|| best_segment(segments, time_ms, self.passed_discount))
                .unwrap_or(0);
            return CurrentLine::active(index);
        }

        if let Some(selection) = selection_override {
            return CurrentLine::active(resolve_override(segments, selection));
        }

        if !is_playing && time_ms == 0 {
            return CurrentLine::NONE;
        }

        if let Some(index) = find_active(segments, time_ms) {
            return CurrentLine::active(index);
        }

        let last = segments.len() - 1;
        if time_ms < segments[0].start_time_ms {
            CurrentLine::inactive(0)
        } else if time_ms >= segments[last].end_time_ms {
            CurrentLine::inactive(last)
        } else {
            let passed = segments
                .iter()
                .rposition(|segment| segment.end_time_ms <= time_ms)
                .unwrap_or(0);
            CurrentLine::inactive(passed)
        }
    }

    /// Position inside the line, from 0 at its start to 1 at its end. Always
    /// measured against the line's own bounds, also while looping.
    pub fn progress(&self, segment: &Segment, time_ms: u64) -> f64 {
        let elapsed = time_ms.saturating_sub(segment.start_time_ms) as f64;
        let length = segment.duration_ms().max(1) as f64;
        (elapsed / length).clamp(0.0, 1.0)
    }
}

fn resolve_override(segments: &[Segment], selection: &SelectionOverride) -> usize {
    if let Some(index) = find_active(segments, selection.start_time_ms) {
        return index;
    }

    if let Some(index) = segments.iter().position(|segment| {
        segment.start_time_ms < selection.end_time_ms && segment.end_time_ms > selection.start_time_ms
    }) {
        return index;
    }

    segments
        .iter()
        .enumerate()
        .min_by_key(|(_, segment)| segment.start_time_ms.abs_diff(selection.start_time_ms))
        .map_or(0, |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loop_engine::{LoopSource, RepeatTarget};
    use crate::TrackMetadata;

    fn line(start: u64, end: u64) -> Segment {
        Segment {
            start_time_ms: start,
            end_time_ms: end,
            native: format!("{start}"),
            transliteration: String::new(),
            translation: String::new(),
        }
    }

    fn transcript() -> Transcript {
        Transcript::new(
            TrackMetadata {
                title: "t".to_string(),
                artist: "a".to_string(),
                duration_ms: 8000,
            },
            vec![line(500, 2000), line(2500, 4000), line(4000, 6000)],
        )
        .unwrap()
    }

    fn region(start: u64, end: u64, active: bool) -> LoopRegion {
        LoopRegion {
            start_time_ms: start,
            end_time_ms: end,
            repeat_target: RepeatTarget::Infinite,
            completed_iterations: 0,
            active,
            source: LoopSource::TimeRange,
        }
    }

    #[test]
    fn nothing_highlighted_before_playback_starts() {
        let tracker = PositionTracker::new(0.5);
        assert_eq!(tracker.resolve(&transcript(), 0, false, None, None), CurrentLine::NONE);
    }

    #[test]
    fn pause_mid_track_keeps_highlight() {
        let tracker = PositionTracker::new(0.5);
        assert_eq!(
            tracker.resolve(&transcript(), 3000, false, None, None),
            CurrentLine::active(1)
        );
    }

    #[test]
    fn misses_fall_back_to_neighbouring_lines() {
        let tracker = PositionTracker::new(0.5);
        let transcript = transcript();

        assert_eq!(tracker.resolve(&transcript, 100, true, None, None), CurrentLine::inactive(0));
        assert_eq!(tracker.resolve(&transcript, 2200, true, None, None), CurrentLine::inactive(0));
        assert_eq!(tracker.resolve(&transcript, 6000, true, None, None), CurrentLine::inactive(2));
        assert_eq!(tracker.resolve(&transcript, 7900, false, None, None), CurrentLine::inactive(2));
    }

    #[test]
    fn playing_from_zero_shows_upcoming_first_line() {
        let tracker = PositionTracker::new(0.5);
        assert_eq!(tracker.resolve(&transcript(), 0, true, None, None), CurrentLine::inactive(0));
    }

    #[test]
    fn active_loop_always_shows_an_active_line() {
        let tracker = PositionTracker::new(0.5);
        let transcript = transcript();
        let looping = region(0, 6000, true);

        assert_eq!(
            tracker.resolve(&transcript, 2300, true, Some(&looping), None),
            CurrentLine::active(0)
        );
        assert_eq!(
            tracker.resolve(&transcript, 2450, true, Some(&looping), None),
            CurrentLine::active(1)
        );
        assert_eq!(
            tracker.resolve(&transcript, 0, false, Some(&looping), None),
            CurrentLine::active(0)
        );
    }

    #[test]
    fn inactive_loop_is_ignored() {
        let tracker = PositionTracker::new(0.5);
        let stopped = region(0, 6000, false);

        assert_eq!(
            tracker.resolve(&transcript(), 2300, true, Some(&stopped), None),
            CurrentLine::inactive(0)
        );
    }

    #[test]
    fn override_pins_its_line() {
        let tracker = PositionTracker::new(0.5);
        let transcript = transcript();

        let exact = SelectionOverride::from(TimeRange::new(2500, 4000));
        assert_eq!(
            tracker.resolve(&transcript, 5000, true, None, Some(&exact)),
            CurrentLine::active(1)
        );

        let overlapping = SelectionOverride::from(TimeRange::new(2200, 2600));
        assert_eq!(
            tracker.resolve(&transcript, 0, false, None, Some(&overlapping)),
            CurrentLine::active(1)
        );

        let detached = SelectionOverride::from(TimeRange::new(7000, 7500));
        assert_eq!(
            tracker.resolve(&transcript, 0, false, None, Some(&detached)),
            CurrentLine::active(2)
        );
    }

    #[test]
    fn progress_is_line_local_and_clamped() {
        let tracker = PositionTracker::new(0.5);
        let segment = line(2000, 4000);

        assert_eq!(tracker.progress(&segment, 1000), 0.0);
        assert_eq!(tracker.progress(&segment, 2000), 0.0);
        assert_eq!(tracker.progress(&segment, 3000), 0.5);
        assert_eq!(tracker.progress(&segment, 9000), 1.0);
    }

    #[test]
    fn empty_transcript_highlights_nothing() {
        let tracker = PositionTracker::new(0.5);
        let empty = Transcript::new(TrackMetadata::default(), Vec::new()).unwrap();
        let looping = region(0, 1000, true);

        assert_eq!(
            tracker.resolve(&empty, 500, true, Some(&looping), None),
            CurrentLine::NONE
        );
    }
}
