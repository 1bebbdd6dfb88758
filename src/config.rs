use std::path::Path;

use serde::Deserialize;

use crate::SyncResult;

const TICK_INTERVAL_ENV: &str = "LINESYNC_TICK_INTERVAL_MS";

/// Tunables shared by the tracker, the loop engine and the facade.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineParams {
    /// Shortest loop or validated range, in milliseconds.
    pub min_loop_span_ms: u64,
    /// Multiplier applied to the distance of already passed lines when a
    /// best-guess line is needed.
    pub passed_segment_discount: f64,
    /// Rates below this go through the pause/flush/resume sequence.
    pub slow_rate_threshold: f64,
    /// Ticks to wait for the transport buffer to flush before a slow rate is applied.
    pub rate_flush_ticks: u32,
    pub tick_interval_ms: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            min_loop_span_ms: 1000,
            passed_segment_discount: 0.5,
            slow_rate_threshold: 0.8,
            rate_flush_ticks: 2,
            tick_interval_ms: 16,
        }
    }
}

impl EngineParams {
    pub fn from_json_str(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads params from `path` when given, otherwise starts from defaults.
    /// `LINESYNC_TICK_INTERVAL_MS` overrides the tick interval either way.
    pub fn load(path: Option<&Path>) -> SyncResult<Self> {
        let mut params = match path {
            Some(path) => Self::from_json_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };

        if let Some(interval) = std::env::var(TICK_INTERVAL_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|interval| *interval > 0)
        {
            params.tick_interval_ms = interval;
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::EngineParams;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let params = EngineParams::from_json_str(r#"{"minLoopSpanMs": 500}"#)
            .expect("partial params should parse");

        assert_eq!(params.min_loop_span_ms, 500);
        assert_eq!(params.passed_segment_discount, 0.5);
        assert_eq!(params.slow_rate_threshold, 0.8);
    }

    #[test]
    fn rejects_mistyped_fields() {
        assert!(EngineParams::from_json_str(r#"{"rateFlushTicks": "two"}"#).is_err());
    }
}
