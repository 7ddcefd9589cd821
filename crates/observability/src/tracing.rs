//! Tracing/logging initialization.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// `logging` section of the application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `tradeflow_sales=debug`.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl LoggingSettings {
    /// `RUST_LOG` wins over the configured level.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process with default settings.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(&LoggingSettings::default());
}

pub fn init_with(settings: &LoggingSettings) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(settings.env_filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_ok() {
        tracing::debug!(level = %settings.level, json = settings.json, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info_json() {
        let settings = LoggingSettings::default();
        assert_eq!(settings.level, "info");
        assert!(settings.json);
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init_with(&LoggingSettings {
            level: "debug".into(),
            json: false,
        });
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let settings: LoggingSettings = serde_json::from_str(r#"{"json": false}"#).unwrap();
        assert_eq!(settings.level, "info");
        assert!(!settings.json);
    }
}
