//! Playback rate changes.
//!
//! Some transports drop or garble audio when a slow rate is applied while
//! playing. Rates below the threshold are therefore applied as a sequence:
//! pause, wait for the buffer to flush, re-seek to the current position, set
//! the rate and resume. A newer request always supersedes the one in flight.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateStep {
    Pause,
    /// Re-seek to the current position to drop buffered audio.
    Reseek,
    Apply(f64),
    Resume,
}

/// Steps to run on the transport, tagged with the request that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct RatePlan {
    pub generation: u64,
    pub steps: Vec<RateStep>,
}

#[derive(Debug, Clone, Copy)]
struct PendingRate {
    generation: u64,
    rate: f64,
    resume: bool,
    ticks_left: u32,
}

#[derive(Debug, Clone)]
pub struct RateSequencer {
    slow_threshold: f64,
    flush_ticks: u32,
    generation: u64,
    pending: Option<PendingRate>,
}

impl RateSequencer {
    pub fn new(slow_threshold: f64, flush_ticks: u32) -> Self {
        Self {
            slow_threshold,
            flush_ticks,
            generation: 0,
            pending: None,
        }
    }

    /// Starts a rate change and returns the steps to run right away.
    pub fn request(&mut self, rate: f64, is_playing: bool) -> RatePlan {
        self.generation += 1;
        let superseded = self.pending.take();
        // A superseded sequence already paused; remember whether it meant to resume.
        let resume = superseded.map_or(is_playing, |pending| pending.resume);

        if let Some(pending) = superseded {
            debug!(
                superseded = pending.generation,
                by = self.generation,
                "rate change superseded"
            );
        }

        if rate >= self.slow_threshold {
            let mut steps = vec![RateStep::Apply(rate)];
            if superseded.is_some() && resume {
                steps.push(RateStep::Resume);
            }
            return RatePlan {
                generation: self.generation,
                steps,
            };
        }

        self.pending = Some(PendingRate {
            generation: self.generation,
            rate,
            resume,
            ticks_left: self.flush_ticks,
        });

        let steps = if is_playing {
            vec![RateStep::Pause]
        } else {
            Vec::new()
        };

        RatePlan {
            generation: self.generation,
            steps,
        }
    }

    /// Advances a pending slow-rate sequence by one tick.
    pub fn on_tick(&mut self) -> Option<RatePlan> {
        let pending = self.pending.as_mut()?;
        pending.ticks_left = pending.ticks_left.saturating_sub(1);
        if pending.ticks_left > 0 {
            return None;
        }

        let pending = self.pending.take()?;
        let mut steps = vec![RateStep::Reseek, RateStep::Apply(pending.rate)];
        if pending.resume {
            steps.push(RateStep::Resume);
        }

        Some(RatePlan {
            generation: pending.generation,
            steps,
        })
    }

    /// Whether steps from `generation` may still be applied.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Makes a pending sequence resume playback once the rate is applied.
    pub fn resume_when_applied(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.resume = true;
        }
    }

    /// Keeps a pending sequence from resuming playback, e.g. after the user paused.
    pub fn hold(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.resume = false;
        }
    }

    /// Drops any pending sequence without applying it.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{RateSequencer, RateStep};

    #[test]
    fn normal_rates_apply_immediately() {
        let mut sequencer = RateSequencer::new(0.8, 2);
        let plan = sequencer.request(1.25, true);

        assert_eq!(plan.steps, vec![RateStep::Apply(1.25)]);
        assert!(!sequencer.in_flight());
    }

    #[test]
    fn slow_rate_runs_full_sequence() {
        let mut sequencer = RateSequencer::new(0.8, 2);

        let plan = sequencer.request(0.5, true);
        assert_eq!(plan.steps, vec![RateStep::Pause]);
        assert!(sequencer.on_tick().is_none());

        let plan = sequencer.on_tick().expect("sequence should finish on the second tick");
        assert_eq!(
            plan.steps,
            vec![RateStep::Reseek, RateStep::Apply(0.5), RateStep::Resume]
        );
        assert!(sequencer.is_current(plan.generation));
        assert!(sequencer.on_tick().is_none());
    }

    #[test]
    fn slow_rate_while_paused_does_not_resume() {
        let mut sequencer = RateSequencer::new(0.8, 1);

        assert!(sequencer.request(0.6, false).steps.is_empty());
        let plan = sequencer.on_tick().unwrap();
        assert_eq!(plan.steps, vec![RateStep::Reseek, RateStep::Apply(0.6)]);
    }

    #[test]
    fn newer_slow_request_supersedes_and_keeps_resume_intent() {
        let mut sequencer = RateSequencer::new(0.8, 2);

        let first = sequencer.request(0.5, true);
        sequencer.on_tick();
        // Transport is paused by now, but the original intent was to keep playing.
        let second = sequencer.request(0.7, false);

        assert!(!sequencer.is_current(first.generation));
        assert!(second.steps.is_empty());
        assert!(sequencer.on_tick().is_none());
        let plan = sequencer.on_tick().unwrap();
        assert_eq!(
            plan.steps,
            vec![RateStep::Reseek, RateStep::Apply(0.7), RateStep::Resume]
        );
        assert_eq!(plan.generation, second.generation);
    }

    #[test]
    fn hold_suppresses_resume() {
        let mut sequencer = RateSequencer::new(0.8, 1);

        sequencer.request(0.5, true);
        sequencer.hold();
        let plan = sequencer.on_tick().unwrap();

        assert_eq!(plan.steps, vec![RateStep::Reseek, RateStep::Apply(0.5)]);
    }

    #[test]
    fn play_after_hold_restores_resume() {
        let mut sequencer = RateSequencer::new(0.8, 1);

        sequencer.request(0.5, false);
        sequencer.hold();
        sequencer.resume_when_applied();
        let plan = sequencer.on_tick().unwrap();

        assert_eq!(
            plan.steps,
            vec![RateStep::Reseek, RateStep::Apply(0.5), RateStep::Resume]
        );
    }

    #[test]
    fn fast_request_cancels_slow_sequence_and_resumes() {
        let mut sequencer = RateSequencer::new(0.8, 3);

        sequencer.request(0.5, true);
        let plan = sequencer.request(1.0, false);

        assert_eq!(plan.steps, vec![RateStep::Apply(1.0), RateStep::Resume]);
        assert!(!sequencer.in_flight());
        assert!(sequencer.on_tick().is_none());
    }
}
