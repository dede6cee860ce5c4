//! Logging initialization for provider binaries
//!
//! Structured logs go to stdout through `tracing-subscriber`. JSON output is
//! the default so logs can be shipped as-is; set `HCI_LOG_FORMAT=text` for
//! human-readable output during local development. Filtering follows
//! `RUST_LOG` when set.

use thiserror::Error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log format (`json` or `text`)
pub const LOG_FORMAT_ENV: &str = "HCI_LOG_FORMAT";

/// Filter applied when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,hci=debug,kube=info,tower=warn,hyper=warn";

/// Errors that can occur during telemetry initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize tracing subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Configuration for telemetry initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name recorded on startup (e.g., "hci-machine-controller")
    pub service_name: String,

    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "hci-machine-controller".to_string(),
            json: json_from_env(std::env::var(LOG_FORMAT_ENV).ok().as_deref()),
        }
    }
}

fn json_from_env(value: Option<&str>) -> bool {
    !matches!(value, Some(v) if v.eq_ignore_ascii_case("text"))
}

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (json_layer, text_layer) = if config.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true);
        (Some(layer), None)
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_target(true)),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::SubscriberInit(e.to_string())
        })?;

    info!(service = %config.service_name, json = config.json, "Telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_defaults_to_json() {
        assert!(json_from_env(None));
        assert!(json_from_env(Some("json")));
        assert!(!json_from_env(Some("text")));
        assert!(!json_from_env(Some("TEXT")));
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig {
            service_name: "test-service".to_string(),
            json: false,
        };
        // The first call may race with nothing else; the second always fails
        let _ = init_telemetry(config.clone());
        assert!(matches!(
            init_telemetry(config),
            Err(TelemetryError::SubscriberInit(_))
        ));
    }
}
