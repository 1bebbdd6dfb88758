use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed transcript: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audio failure: {0}")]
    Audio(#[from] hound::Error),

    #[error("unsupported audio: {0}")]
    UnsupportedAudio(String),

    #[error("line {index} starts at {start_time_ms}ms but ends at {end_time_ms}ms")]
    InvalidLine {
        index: usize,
        start_time_ms: u64,
        end_time_ms: u64,
    },

    #[error("invalid media source `{0}`")]
    InvalidSource(String),

    #[error("transport rejected `{command}`: {reason}")]
    Transport {
        command: &'static str,
        reason: String,
    },

    #[error("no language assistant is attached")]
    AssistantUnavailable,

    #[error("language assistant failed: {0}")]
    Assistant(String),
}

impl SyncError {
    pub fn transport(command: &'static str, reason: impl Into<String>) -> Self {
        Self::Transport {
            command,
            reason: reason.into(),
        }
    }

    /// Whether the error left the engine without a usable transcript. Only
    /// load failures qualify, and even those keep the previous transcript.
    #[must_use]
    pub const fn is_load_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Json(_) | Self::InvalidLine { .. })
    }

    /// Stable, machine-readable code for every variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "LS-IO",
            Self::Json(_) => "LS-JSON",
            Self::Audio(_) => "LS-AUDIO",
            Self::UnsupportedAudio(_) => "LS-AUDIO-FORMAT",
            Self::InvalidLine { .. } => "LS-INVALID-LINE",
            Self::InvalidSource(_) => "LS-INVALID-SOURCE",
            Self::Transport { .. } => "LS-TRANSPORT",
            Self::AssistantUnavailable => "LS-ASSISTANT-UNAVAILABLE",
            Self::Assistant(_) => "LS-ASSISTANT",
        }
    }
}
