//! The single owner of playback state.
//!
//! [`PlaybackFacade`] merges the loop engine, the position tracker and the
//! selection with whatever the transport reports, and is the only place that
//! issues transport commands. Hosts call [`PlaybackFacade::tick`] at a fixed
//! interval and forward user actions to the command methods; both must happen
//! on the same thread of control.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use url::Url;

use crate::loop_engine::{BoundaryOutcome, LoopEngine, LoopRegion, LoopSource, LoopState, RepeatTarget};
use crate::rate::{RatePlan, RateSequencer, RateStep};
use crate::selection::{validate_range, RangeSelector, SelectionChange};
use crate::source::resolve_source;
use crate::tracker::{CurrentLine, PositionTracker, SelectionOverride};
use crate::transcript::parse_transcript;
use crate::transport::{Transport, TransportEvent};
use crate::{EngineParams, Segment, SyncError, SyncResult, TimeRange, Transcript};

/// Everything a UI needs to react to, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    TimeUpdated {
        position_ms: u64,
    },
    SegmentChanged {
        line: CurrentLine,
    },
    LoopIteration {
        completed_iterations: u32,
        repeat_target: RepeatTarget,
    },
    LoopCompleted {
        completed_iterations: u32,
    },
    TrackEnded,
    TransportError(String),
    SelectionModeChanged {
        selecting: bool,
    },
    DurationChanged {
        duration_ms: u64,
    },
}

pub struct PlaybackFacade<T> {
    transport: T,
    params: EngineParams,
    base_dir: PathBuf,
    transcript: Option<Transcript>,
    loaded_source: Option<Url>,
    media_duration_ms: Option<u64>,
    position_ms: u64,
    playing: bool,
    rate: f64,
    tracker: PositionTracker,
    loop_engine: LoopEngine,
    selector: RangeSelector,
    selection_override: Option<SelectionOverride>,
    current_line: CurrentLine,
    rate_sequencer: RateSequencer,
    /// Transport events set aside while stale position reports were dropped.
    backlog: VecDeque<TransportEvent>,
    events: VecDeque<PlaybackEvent>,
}

impl<T: Transport> PlaybackFacade<T> {
    pub fn new(transport: T, params: EngineParams) -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

        Self {
            tracker: PositionTracker::new(params.passed_segment_discount),
            loop_engine: LoopEngine::new(params.min_loop_span_ms),
            rate_sequencer: RateSequencer::new(params.slow_rate_threshold, params.rate_flush_ticks),
            transport,
            params,
            base_dir,
            transcript: None,
            loaded_source: None,
            media_duration_ms: None,
            position_ms: 0,
            playing: false,
            rate: 1.0,
            selector: RangeSelector::new(),
            selection_override: None,
            current_line: CurrentLine::NONE,
            backlog: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    /// Directory relative media sources are resolved against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    // Loading

    /// Replaces the transcript. Any loop, selection and line override belong
    /// to the old transcript and are dropped.
    pub fn load_transcript(&mut self, transcript: Transcript) {
        info!(
            title = %transcript.metadata().title,
            lines = transcript.len(),
            "transcript attached"
        );

        self.transcript = Some(transcript);
        self.loop_engine.reset();
        self.selection_override = None;
        let change = self.selector.clear();
        self.report_selection_change(change);
        self.refresh_line();
    }

    /// Parses and attaches a transcript. On failure the current transcript
    /// stays in place.
    pub fn load_transcript_json(&mut self, json: &str) -> SyncResult<()> {
        match parse_transcript(json) {
            Ok(transcript) => {
                self.load_transcript(transcript);
                Ok(())
            }
            Err(error) => {
                warn!(code = error.code(), %error, "transcript rejected");
                Err(error)
            }
        }
    }

    /// Points the transport at a media source. Returns `false` when the source
    /// resolves to the one already loaded, in which case nothing is reloaded.
    pub fn load_source(&mut self, raw: &str) -> SyncResult<bool> {
        let source = resolve_source(raw, &self.base_dir)?;
        if self.loaded_source.as_ref() == Some(&source) {
            debug!(%source, "source already loaded");
            return Ok(false);
        }

        self.transport.load(source.as_str())?;
        info!(%source, "source loaded");

        self.loaded_source = Some(source);
        self.media_duration_ms = None;
        self.position_ms = 0;
        self.playing = false;
        self.rate_sequencer.cancel();
        self.drop_stale_reports();
        self.refresh_line();

        Ok(true)
    }

    // Transport commands

    /// Jumps to `time_ms` and starts playback if paused.
    ///
    /// The position moves as soon as the transport accepts the seek, so
    /// queries made right after reflect the target without waiting for a
    /// report. Seeking out of an active loop ends it.
    pub fn seek(&mut self, time_ms: u64) {
        let target = time_ms.min(self.duration_ms());

        if self
            .loop_engine
            .active_region()
            .is_some_and(|region| !region.contains(target))
        {
            debug!(target_ms = target, "seek left the loop region");
            self.loop_engine.stop();
        }

        if self.selection_override.is_some_and(|selection| {
            !TimeRange::new(selection.start_time_ms, selection.end_time_ms).contains(target)
        }) && self.loop_engine.state() == LoopState::Idle
        {
            self.selection_override = None;
        }

        self.move_to(target);
        self.ensure_playing();
    }

    /// Starts playback. While a slow rate is still flushing, playback resumes
    /// once the rate is applied instead.
    pub fn play(&mut self) {
        if self.playing && self.transport.is_playing() {
            return;
        }

        if self.rate_sequencer.in_flight() {
            debug!("play deferred until the pending rate is applied");
            self.rate_sequencer.resume_when_applied();
            return;
        }

        match self.transport.play() {
            Ok(()) => {
                self.playing = true;
                self.refresh_line();
            }
            Err(error) => {
                self.playing = false;
                self.report_transport_error(error);
            }
        }
    }

    pub fn pause(&mut self) {
        self.rate_sequencer.hold();

        match self.transport.pause() {
            Ok(()) => self.playing = false,
            Err(error) => self.report_transport_error(error),
        }
    }

    pub fn toggle_playback(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Changes the playback rate, sequencing slow rates so the transport can
    /// flush its buffer. A newer call supersedes one still in flight.
    pub fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            warn!(rate, "ignoring invalid playback rate");
            return;
        }

        let plan = self.rate_sequencer.request(rate, self.playing);
        self.apply_rate_plan(plan);
    }

    // Loops

    /// Loops `[start_time_ms, end_time_ms)` and jumps to its start. Refused
    /// when the track leaves no room for a loop, e.g. before its length is known.
    pub fn set_loop_region(
        &mut self,
        start_time_ms: u64,
        end_time_ms: u64,
        repeat_target: RepeatTarget,
    ) -> Option<LoopRegion> {
        let previous = self.selection_override.take();
        let region =
            self.start_loop(start_time_ms, end_time_ms, repeat_target, LoopSource::TimeRange);
        if region.is_none() {
            self.selection_override = previous;
            self.refresh_line();
        }
        region
    }

    /// Clamps a user-drawn range into the track and widens it to the minimum
    /// loop span.
    pub fn validate_range(&self, start_time_ms: u64, end_time_ms: u64) -> TimeRange {
        validate_range(
            start_time_ms,
            end_time_ms,
            self.duration_ms(),
            self.params.min_loop_span_ms,
        )
    }

    /// Loops the span covered by the selected lines. Refused when nothing
    /// usable is selected.
    pub fn start_selection_loop(&mut self, repeat_target: RepeatTarget) -> bool {
        let Some(transcript) = &self.transcript else {
            return false;
        };

        let range = self.selector.derived_range(transcript);
        if range.is_empty() {
            debug!("selection loop refused, empty range");
            return false;
        }

        let previous = self.selection_override.take();
        let started = self
            .start_loop(
                range.start_time_ms,
                range.end_time_ms,
                repeat_target,
                LoopSource::SegmentSelection,
            )
            .is_some();
        if !started {
            self.selection_override = previous;
            self.refresh_line();
        }
        started
    }

    /// Loops a single line and pins the highlight to it.
    pub fn loop_line(&mut self, index: usize, repeat_target: RepeatTarget) -> bool {
        let Some(range) = self.segment(index).map(Segment::range) else {
            return false;
        };

        let previous = self.selection_override.replace(SelectionOverride::from(range));
        let started = self
            .start_loop(
                range.start_time_ms,
                range.end_time_ms,
                repeat_target,
                LoopSource::SegmentSelection,
            )
            .is_some();
        if !started {
            self.selection_override = previous;
            self.refresh_line();
        }
        started
    }

    /// Ends looping; playback carries on past the old loop end.
    pub fn stop_loop(&mut self) {
        self.loop_engine.stop();
        self.refresh_line();
    }

    /// Discards the loop along with the selection and line override it was built from.
    pub fn clear_loop(&mut self) {
        self.loop_engine.reset();
        self.selection_override = None;
        let change = self.selector.clear();
        self.report_selection_change(change);
        self.refresh_line();
    }

    // Selection

    /// Adds or removes a line from the selection. Unknown lines are ignored.
    pub fn toggle_selection(&mut self, index: usize) -> SelectionChange {
        if self.segment(index).is_none() {
            return SelectionChange::Unchanged;
        }

        let change = self.selector.toggle(index);
        self.report_selection_change(change);
        change
    }

    pub fn clear_selection(&mut self) -> SelectionChange {
        let change = self.selector.clear();
        self.report_selection_change(change);
        change
    }

    // Line navigation

    pub fn seek_to_line(&mut self, index: usize) -> bool {
        let Some(start) = self.segment(index).map(|segment| segment.start_time_ms) else {
            return false;
        };

        self.seek(start);
        true
    }

    /// Jumps to the first line starting after the current position.
    pub fn next_line(&mut self) -> bool {
        let Some(transcript) = &self.transcript else {
            return false;
        };

        let position = self.position_ms;
        let next = transcript
            .segments()
            .partition_point(|segment| segment.start_time_ms <= position);
        self.seek_to_line(next)
    }

    /// Jumps to the line before the current one, or before the position when
    /// no line is playing.
    pub fn previous_line(&mut self) -> bool {
        let Some(transcript) = &self.transcript else {
            return false;
        };

        let anchor = match (self.current_line.is_active, self.current_segment()) {
            (true, Some(segment)) => segment.start_time_ms,
            _ => self.position_ms,
        };
        let Some(previous) = transcript
            .segments()
            .partition_point(|segment| segment.start_time_ms < anchor)
            .checked_sub(1)
        else {
            return false;
        };

        self.seek_to_line(previous)
    }

    // Ticks

    /// Processes everything the transport reported since the last tick:
    /// position updates run the loop boundary check, then the highlight is
    /// refreshed. Also advances a pending slow-rate sequence.
    pub fn tick(&mut self) {
        if let Some(plan) = self.rate_sequencer.on_tick() {
            self.apply_rate_plan(plan);
        }

        while let Some(event) = self
            .backlog
            .pop_front()
            .or_else(|| self.transport.poll_event())
        {
            self.handle_transport_event(event);
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::TimeUpdate(position_ms) => {
                self.on_position(position_ms);
            }
            TransportEvent::MetadataLoaded { duration_ms } => {
                debug!(duration_ms, "media metadata loaded");
                self.media_duration_ms = Some(duration_ms);
                self.events
                    .push_back(PlaybackEvent::DurationChanged { duration_ms });
            }
            TransportEvent::Ended => {
                if let Some(end) = self.loop_engine.active_region().map(|region| region.end_time_ms) {
                    if self.transport.is_playing() {
                        debug!("end report from before the last rewind");
                        return;
                    }

                    // The transport stopped, so whatever rewind was pending did not take.
                    self.loop_engine.rearm();
                    if self.on_position(self.position_ms.max(end)) {
                        return;
                    }
                }

                self.playing = false;
                info!("track ended");
                self.events.push_back(PlaybackEvent::TrackEnded);
                self.refresh_line();
            }
            TransportEvent::Error(message) => {
                warn!(%message, "transport error");
                self.events.push_back(PlaybackEvent::TransportError(message));
            }
        }
    }

    /// Applies a reported position. Returns `true` when the loop took over,
    /// either rewinding or finishing.
    fn on_position(&mut self, position_ms: u64) -> bool {
        match self.loop_engine.check_boundary(position_ms) {
            BoundaryOutcome::Inside => {
                self.position_ms = position_ms;
                self.events.push_back(PlaybackEvent::TimeUpdated { position_ms });
                self.refresh_line();
                false
            }
            BoundaryOutcome::Stale => {
                debug!(position_ms, "ignoring report from before the rewind");
                false
            }
            BoundaryOutcome::Rewind {
                to_ms,
                completed_iterations,
            } => {
                if !self.move_to(to_ms) {
                    self.loop_engine.rewind_failed();
                    self.position_ms = position_ms;
                    self.events.push_back(PlaybackEvent::TimeUpdated { position_ms });
                    self.refresh_line();
                    return false;
                }

                if let Some(region) = self.loop_engine.region() {
                    self.events.push_back(PlaybackEvent::LoopIteration {
                        completed_iterations,
                        repeat_target: region.repeat_target,
                    });
                }
                self.ensure_playing();
                true
            }
            BoundaryOutcome::Completed {
                completed_iterations,
            } => {
                self.position_ms = position_ms;
                self.events.push_back(PlaybackEvent::LoopCompleted {
                    completed_iterations,
                });
                self.pause();
                self.events.push_back(PlaybackEvent::TimeUpdated { position_ms });
                self.refresh_line();
                true
            }
        }
    }

    fn start_loop(
        &mut self,
        start_time_ms: u64,
        end_time_ms: u64,
        repeat_target: RepeatTarget,
        source: LoopSource,
    ) -> Option<LoopRegion> {
        let duration_ms = self.duration_ms();
        let region = self
            .loop_engine
            .start(start_time_ms, end_time_ms, repeat_target, duration_ms, source)?
            .clone();

        if !self.move_to(region.start_time_ms) {
            self.loop_engine.reset();
            return None;
        }
        self.ensure_playing();
        Some(region)
    }

    /// Drops reports older than this command, tells the transport and moves
    /// to `target` right away. A rejected seek leaves the position alone and
    /// returns `false`.
    fn move_to(&mut self, target: u64) -> bool {
        self.drop_stale_reports();

        if let Err(error) = self.transport.seek(target) {
            self.report_transport_error(error);
            return false;
        }

        self.position_ms = target;
        self.events.push_back(PlaybackEvent::TimeUpdated {
            position_ms: target,
        });
        self.refresh_line();
        true
    }

    fn ensure_playing(&mut self) {
        if !self.transport.is_playing() {
            self.playing = false;
        }
        self.play();
    }

    /// Position and end reports queued before a user command describe a state
    /// the command replaced; only metadata and errors are kept.
    fn drop_stale_reports(&mut self) {
        while let Some(event) = self.transport.poll_event() {
            self.backlog.push_back(event);
        }

        self.backlog.retain(|event| {
            matches!(
                event,
                TransportEvent::MetadataLoaded { .. } | TransportEvent::Error(_)
            )
        });
    }

    fn apply_rate_plan(&mut self, plan: RatePlan) {
        for step in plan.steps {
            if !self.rate_sequencer.is_current(plan.generation) {
                debug!(generation = plan.generation, "dropping superseded rate step");
                return;
            }

            let result = match step {
                RateStep::Pause => self.transport.pause().map(|()| self.playing = false),
                RateStep::Reseek => self.transport.seek(self.position_ms),
                RateStep::Apply(rate) => self.transport.set_rate(rate).map(|()| {
                    debug!(rate, "playback rate applied");
                    self.rate = rate;
                }),
                RateStep::Resume => {
                    self.play();
                    Ok(())
                }
            };

            if let Err(error) = result {
                self.report_transport_error(error);
                return;
            }
        }
    }

    fn refresh_line(&mut self) {
        let line = match &self.transcript {
            Some(transcript) => self.tracker.resolve(
                transcript,
                self.position_ms,
                self.playing,
                self.loop_engine.region(),
                self.selection_override.as_ref(),
            ),
            None => CurrentLine::NONE,
        };

        if line != self.current_line {
            self.current_line = line;
            self.events.push_back(PlaybackEvent::SegmentChanged { line });
        }
    }

    fn report_selection_change(&mut self, change: SelectionChange) {
        let selecting = match change {
            SelectionChange::Entered => true,
            SelectionChange::Exited => false,
            SelectionChange::Unchanged => return,
        };
        self.events
            .push_back(PlaybackEvent::SelectionModeChanged { selecting });
    }

    fn report_transport_error(&mut self, error: SyncError) {
        warn!(code = error.code(), %error, "transport command failed");
        self.events
            .push_back(PlaybackEvent::TransportError(error.to_string()));
    }

    fn segment(&self, index: usize) -> Option<&Segment> {
        self.transcript.as_ref()?.get(index)
    }

    // Queries

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Longest of the media length, the transport's own report and the
    /// transcript's extent.
    pub fn duration_ms(&self) -> u64 {
        let media = self
            .media_duration_ms
            .or_else(|| self.transport.duration_ms())
            .unwrap_or(0);
        let transcript = self.transcript.as_ref().map_or(0, Transcript::duration_ms);
        media.max(transcript)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    pub fn loaded_source(&self) -> Option<&Url> {
        self.loaded_source.as_ref()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn current_line(&self) -> CurrentLine {
        self.current_line
    }

    pub fn current_segment(&self) -> Option<&Segment> {
        self.current_line.segment(self.transcript.as_ref()?)
    }

    /// Progress through the highlighted line, 0 when nothing is highlighted.
    pub fn progress(&self) -> f64 {
        self.current_segment()
            .map_or(0.0, |segment| self.tracker.progress(segment, self.position_ms))
    }

    pub fn loop_region(&self) -> Option<&LoopRegion> {
        self.loop_engine.region()
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_engine.state()
    }

    pub fn selection(&self) -> &RangeSelector {
        &self.selector
    }

    pub fn selection_override(&self) -> Option<&SelectionOverride> {
        self.selection_override.as_ref()
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain(..).collect()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
