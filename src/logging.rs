//! Logging setup for hosts embedding the engine.
//!
//! `LINESYNC_LOG` picks the filter, falling back to `RUST_LOG` and then to
//! `linesync=info`. `LINESYNC_LOG_FORMAT` selects `full`, `compact` or, with the
//! `json-logs` feature, `json`. Output goes to stderr.

use tracing::warn;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "linesync=info";
const FILTER_ENV: &str = "LINESYNC_LOG";
const FORMAT_ENV: &str = "LINESYNC_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Full,
    /// One short line per event; suits per-tick tracing.
    Compact,
    /// Needs the `json-logs` feature, otherwise falls back to `Full`.
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "full" => Some(Self::Full),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Installs the global subscriber from the environment. Later calls are no-ops.
pub fn init() {
    let directives = filter_directives(
        std::env::var(FILTER_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let requested = std::env::var(FORMAT_ENV).ok();
    let format = requested.as_deref().and_then(LogFormat::parse);

    init_with(&directives, format.unwrap_or_default());

    if let (Some(value), None) = (requested, format) {
        warn!(value = %value, "unknown {FORMAT_ENV}, using full output");
    }
}

/// Installs a subscriber for `directives` in `format`. Invalid directives fall
/// back to `linesync=info`.
pub fn init_with(directives: &str, format: LogFormat) {
    let (filter, rejected) = match EnvFilter::try_new(directives) {
        Ok(filter) => (filter, None),
        Err(error) => (EnvFilter::new(DEFAULT_DIRECTIVES), Some(error)),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Full => {
            let _ = builder.try_init();
        }
        LogFormat::Compact => {
            let _ = builder.compact().try_init();
        }
        #[cfg(feature = "json-logs")]
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
        #[cfg(not(feature = "json-logs"))]
        LogFormat::Json => {
            let _ = builder.try_init();
            warn!("json log output needs the json-logs feature");
        }
    }

    if let Some(error) = rejected {
        warn!(directives, %error, "invalid log filter, using {DEFAULT_DIRECTIVES}");
    }
}

/// The first non-blank of the engine-specific and the global filter.
fn filter_directives(engine: Option<String>, global: Option<String>) -> String {
    [engine, global]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
}
