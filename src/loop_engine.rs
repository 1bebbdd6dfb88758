//! Bounded or endless repetition of a slice of the track.

use std::num::NonZeroU32;

use tracing::{debug, info, warn};

use crate::selection::validate_range;
use crate::TimeRange;

/// How many times a loop region plays in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatTarget {
    Infinite,
    /// Total playthroughs, the first pass included.
    Times(NonZeroU32),
}

impl RepeatTarget {
    /// Maps a plain count to a target, `0` meaning endless.
    pub fn from_count(count: u32) -> Self {
        NonZeroU32::new(count).map_or(Self::Infinite, Self::Times)
    }

    /// Whether another playthrough follows once `completed_iterations` passes are done.
    fn allows_another(self, completed_iterations: u32) -> bool {
        match self {
            Self::Infinite => true,
            Self::Times(total) => completed_iterations.saturating_add(1) < total.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSource {
    TimeRange,
    SegmentSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopRegion {
    pub start_time_ms: u64,
    pub end_time_ms: u64,
    pub repeat_target: RepeatTarget,
    pub completed_iterations: u32,
    pub active: bool,
    pub source: LoopSource,
}

impl LoopRegion {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time_ms, self.end_time_ms)
    }

    pub fn contains(&self, time_ms: u64) -> bool {
        self.range().contains(time_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Active,
}

/// What the transport has to do after a position update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryOutcome {
    Inside,
    /// A report from before the last rewind; the position it carries is outdated.
    Stale,
    Rewind {
        to_ms: u64,
        completed_iterations: u32,
    },
    Completed {
        completed_iterations: u32,
    },
}

#[derive(Debug, Clone)]
pub struct LoopEngine {
    region: Option<LoopRegion>,
    min_span_ms: u64,
    /// Set after a rewind until a position before the loop end shows up, so a
    /// late report from before the seek cannot trigger a second rewind.
    awaiting_rewind: bool,
}

impl LoopEngine {
    pub fn new(min_span_ms: u64) -> Self {
        Self {
            region: None,
            min_span_ms,
            awaiting_rewind: false,
        }
    }

    /// Activates a loop over `[start_time_ms, end_time_ms)`.
    ///
    /// Both bounds are clamped into the track. An empty or inverted range is
    /// widened to the minimum span. Returns `None`, leaving any current loop
    /// untouched, when the track has no room for a loop at all.
    pub fn start(
        &mut self,
        start_time_ms: u64,
        end_time_ms: u64,
        repeat_target: RepeatTarget,
        duration_ms: u64,
        source: LoopSource,
    ) -> Option<&LoopRegion> {
        let Some(range) = clamp_loop_range(start_time_ms, end_time_ms, duration_ms, self.min_span_ms)
        else {
            debug!(start_time_ms, end_time_ms, duration_ms, "loop refused, zero-width range");
            return None;
        };

        info!(
            start_ms = range.start_time_ms,
            end_ms = range.end_time_ms,
            ?repeat_target,
            ?source,
            "loop started"
        );

        self.awaiting_rewind = false;
        Some(self.region.insert(LoopRegion {
            start_time_ms: range.start_time_ms,
            end_time_ms: range.end_time_ms,
            repeat_target,
            completed_iterations: 0,
            active: true,
            source,
        }))
    }

    /// Polls the loop end. Positions may overshoot the end by any amount; each
    /// crossing still produces exactly one rewind.
    pub fn check_boundary(&mut self, position_ms: u64) -> BoundaryOutcome {
        let Some(region) = self.region.as_mut().filter(|region| region.active) else {
            return BoundaryOutcome::Inside;
        };

        if position_ms < region.end_time_ms {
            self.awaiting_rewind = false;
            return BoundaryOutcome::Inside;
        }

        if self.awaiting_rewind {
            return BoundaryOutcome::Stale;
        }

        if region.repeat_target.allows_another(region.completed_iterations) {
            region.completed_iterations += 1;
            self.awaiting_rewind = true;
            debug!(
                completed = region.completed_iterations,
                overshoot_ms = position_ms - region.end_time_ms,
                "loop iteration"
            );
            BoundaryOutcome::Rewind {
                to_ms: region.start_time_ms,
                completed_iterations: region.completed_iterations,
            }
        } else {
            region.active = false;
            info!(completed = region.completed_iterations, "loop completed");
            BoundaryOutcome::Completed {
                completed_iterations: region.completed_iterations,
            }
        }
    }

    /// Undoes the last rewind after the transport refused to seek back. The
    /// playthrough it counted never happened, and the loop cannot be held
    /// without seeking, so it is deactivated.
    pub fn rewind_failed(&mut self) {
        if let Some(region) = self.region.as_mut().filter(|region| region.active) {
            region.completed_iterations = region.completed_iterations.saturating_sub(1);
            region.active = false;
            warn!(
                completed = region.completed_iterations,
                "loop abandoned, rewind was rejected"
            );
        }
        self.awaiting_rewind = false;
    }

    /// Forgets a pending rewind so the next position at or past the end counts
    /// as a fresh crossing.
    pub fn rearm(&mut self) {
        self.awaiting_rewind = false;
    }

    /// Deactivates the loop but keeps its region; playback runs on past the end.
    pub fn stop(&mut self) {
        if let Some(region) = self.region.as_mut() {
            region.active = false;
        }
        self.awaiting_rewind = false;
    }

    pub fn reset(&mut self) {
        self.region = None;
        self.awaiting_rewind = false;
    }

    pub fn region(&self) -> Option<&LoopRegion> {
        self.region.as_ref()
    }

    pub fn active_region(&self) -> Option<&LoopRegion> {
        self.region.as_ref().filter(|region| region.active)
    }

    pub fn state(&self) -> LoopState {
        match self.active_region() {
            Some(_) => LoopState::Active,
            None => LoopState::Idle,
        }
    }
}

/// Valid ranges only get clamped; short ones are kept as they are. An inverted
/// or empty range goes through [`validate_range`] as if it started and ended
/// at its clamped start.
fn clamp_loop_range(
    start_ms: u64,
    end_ms: u64,
    duration_ms: u64,
    min_span_ms: u64,
) -> Option<TimeRange> {
    let start = start_ms.min(duration_ms);
    let end = end_ms.min(duration_ms);

    let range = if end > start {
        TimeRange::new(start, end)
    } else {
        validate_range(start, start, duration_ms, min_span_ms)
    };

    (!range.is_empty()).then_some(range)
}
