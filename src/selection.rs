use std::collections::BTreeSet;

use crate::{TimeRange, Transcript};

/// How a selection edit changed selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// The first line was selected.
    Entered,
    /// The last selected line was removed.
    Exited,
    Unchanged,
}

/// The set of lines picked to build a loop from.
#[derive(Debug, Clone, Default)]
pub struct RangeSelector {
    selected: BTreeSet<usize>,
}

impl RangeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, index: usize) -> SelectionChange {
        let was_empty = self.selected.is_empty();

        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }

        self.mode_change(was_empty)
    }

    pub fn clear(&mut self) -> SelectionChange {
        let was_empty = self.selected.is_empty();
        self.selected.clear();
        self.mode_change(was_empty)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// Smallest range covering every selected line, `{0, 0}` when nothing is
    /// selected. Indices the transcript does not have are skipped.
    pub fn derived_range(&self, transcript: &Transcript) -> TimeRange {
        let mut lines = self.indices().filter_map(|index| transcript.get(index));

        let Some(first) = lines.next() else {
            return TimeRange::EMPTY;
        };

        lines.fold(first.range(), |range, segment| {
            TimeRange::new(
                range.start_time_ms.min(segment.start_time_ms),
                range.end_time_ms.max(segment.end_time_ms),
            )
        })
    }

    fn mode_change(&self, was_empty: bool) -> SelectionChange {
        match (was_empty, self.selected.is_empty()) {
            (true, false) => SelectionChange::Entered,
            (false, true) => SelectionChange::Exited,
            _ => SelectionChange::Unchanged,
        }
    }
}

/// Clamps an explicit range into `[0, duration_ms]` and widens it to at least
/// `min_span_ms`, pushing the end forward first and the start back once the
/// end hits the track end. Tracks shorter than the minimum span yield the
/// whole track.
pub fn validate_range(
    start_time_ms: u64,
    end_time_ms: u64,
    duration_ms: u64,
    min_span_ms: u64,
) -> TimeRange {
    if duration_ms <= min_span_ms {
        return TimeRange::new(0, duration_ms);
    }

    let mut start = start_time_ms.min(duration_ms);
    let mut end = end_time_ms.min(duration_ms);

    if end < start.saturating_add(min_span_ms) {
        end = start.saturating_add(min_span_ms);
        if end > duration_ms {
            end = duration_ms;
            start = duration_ms - min_span_ms;
        }
    }

    TimeRange::new(start, end)
}
