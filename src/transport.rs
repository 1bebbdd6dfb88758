use std::collections::VecDeque;
use std::path::Path;

use crate::audio::wav_duration_ms;
use crate::{SyncError, SyncResult};

/// Notifications emitted by a media transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    TimeUpdate(u64),
    MetadataLoaded { duration_ms: u64 },
    Ended,
    Error(String),
}

/// A play/pause/seek/rate device. The engine only issues commands and drains
/// events; it never assumes a particular media backend.
pub trait Transport {
    fn position_ms(&self) -> u64;

    /// Track length once metadata is known.
    fn duration_ms(&self) -> Option<u64>;

    fn is_playing(&self) -> bool;

    fn load(&mut self, source: &str) -> SyncResult<()>;

    fn play(&mut self) -> SyncResult<()>;

    fn pause(&mut self) -> SyncResult<()>;

    fn seek(&mut self, position_ms: u64) -> SyncResult<()>;

    fn set_rate(&mut self, rate: f64) -> SyncResult<()>;

    /// Next pending event, oldest first.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}

/// Commands a [`SimulatedTransport`] has received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Load(String),
    Play,
    Pause,
    Seek(u64),
    SetRate(f64),
}

/// An in-memory transport driven by an explicit clock. Useful for demos and
/// for exercising the engine without an audio device.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    position_ms: u64,
    duration_ms: Option<u64>,
    playing: bool,
    rate: f64,
    reject_play: Option<String>,
    reject_seek: Option<String>,
    events: VecDeque<TransportEvent>,
    commands: Vec<TransportCommand>,
}

impl SimulatedTransport {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            position_ms: 0,
            duration_ms: Some(duration_ms),
            playing: false,
            rate: 1.0,
            reject_play: None,
            reject_seek: None,
            events: VecDeque::new(),
            commands: Vec::new(),
        }
    }

    /// A transport whose length comes from a WAV file.
    pub fn from_wav(path: &Path) -> SyncResult<Self> {
        let duration_ms = wav_duration_ms(path)?;
        let mut transport = Self::new(duration_ms);
        transport
            .events
            .push_back(TransportEvent::MetadataLoaded { duration_ms });
        Ok(transport)
    }

    /// Makes every following `play` fail, like a browser autoplay policy.
    pub fn reject_play(&mut self, reason: Option<&str>) {
        self.reject_play = reason.map(str::to_string);
    }

    /// Makes every following `seek` fail; the position keeps running.
    pub fn reject_seek(&mut self, reason: Option<&str>) {
        self.reject_seek = reason.map(str::to_string);
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn commands(&self) -> &[TransportCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Moves the clock forward by `elapsed_ms` of wall time.
    pub fn advance(&mut self, elapsed_ms: u64) {
        if !self.playing {
            return;
        }

        let step = (elapsed_ms as f64 * self.rate).round() as u64;
        self.position_ms = self.position_ms.saturating_add(step);

        match self.duration_ms {
            Some(duration) if self.position_ms >= duration => {
                self.position_ms = duration;
                self.playing = false;
                self.events.push_back(TransportEvent::TimeUpdate(duration));
                self.events.push_back(TransportEvent::Ended);
            }
            _ => self
                .events
                .push_back(TransportEvent::TimeUpdate(self.position_ms)),
        }
    }

    /// Queues an arbitrary event, e.g. a late position report.
    pub fn push_event(&mut self, event: TransportEvent) {
        self.events.push_back(event);
    }
}

impl Transport for SimulatedTransport {
    fn position_ms(&self) -> u64 {
        self.position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn load(&mut self, source: &str) -> SyncResult<()> {
        self.commands.push(TransportCommand::Load(source.to_string()));
        self.position_ms = 0;
        self.playing = false;
        if let Some(duration_ms) = self.duration_ms {
            self.events
                .push_back(TransportEvent::MetadataLoaded { duration_ms });
        }
        Ok(())
    }

    fn play(&mut self) -> SyncResult<()> {
        self.commands.push(TransportCommand::Play);
        if let Some(reason) = &self.reject_play {
            return Err(SyncError::transport("play", reason.clone()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> SyncResult<()> {
        self.commands.push(TransportCommand::Pause);
        self.playing = false;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> SyncResult<()> {
        self.commands.push(TransportCommand::Seek(position_ms));
        if let Some(reason) = &self.reject_seek {
            return Err(SyncError::transport("seek", reason.clone()));
        }
        self.position_ms = match self.duration_ms {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
        Ok(())
    }

    fn set_rate(&mut self, rate: f64) -> SyncResult<()> {
        self.commands.push(TransportCommand::SetRate(rate));
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SyncError::transport("set_rate", format!("unsupported rate {rate}")));
        }
        self.rate = rate;
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}
