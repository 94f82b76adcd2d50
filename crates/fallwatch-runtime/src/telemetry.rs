//! Logging initialisation and the tracing record sink

use std::fmt;
use std::str::FromStr;

use fallwatch_core::{FallwatchError, FallwatchResult, LogRecord, RecordSink};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the global subscriber
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Pretty => f.write_str("pretty"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = FallwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(FallwatchError::invalid_config(
                "FALLWATCH_LOG_FORMAT",
                format!("expected json or pretty, got {:?}", other),
            )),
        }
    }
}

const DEFAULT_FILTER: &str = "info,fallwatch=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(format: LogFormat) -> FallwatchResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    result.map_err(|e| FallwatchError::invalid_config("RUST_LOG", e.to_string()))
}

/// Forwards audit records to `tracing` under the `fallwatch::record` target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn emit(&self, record: LogRecord) {
        tracing::info!(
            target: "fallwatch::record",
            log_type = %record.log_type,
            component = %record.component,
            trace_id = %record.trace_id,
            emitted_at = %record.timestamp,
            payload = %record.payload,
            "record"
        );
    }
}
