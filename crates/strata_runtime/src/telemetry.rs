//! Telemetry bootstrap for deployment programs.
//!
//! The runtime emits [`tracing`] events as registrations move through the
//! pipeline. Embedders that already install a subscriber can ignore this
//! module entirely; [`init_telemetry`] is a convenience for binaries that
//! want sensible output with one call.

use tracing_subscriber::EnvFilter;

/// Output format for telemetry events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TelemetryFormat {
    /// Human-readable multi-line output for interactive runs.
    #[default]
    Pretty,
    /// Single-line output for dense logs.
    Compact,
    /// Newline-delimited JSON for collectors.
    Json,
}

/// Configuration for [`init_telemetry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Default filter directive, used when `RUST_LOG` is unset.
    pub level: String,
    /// Event format.
    pub format: TelemetryFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: TelemetryFormat::default(),
        }
    }
}

impl TelemetryConfig {
    /// Sets the default filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets the event format.
    #[must_use]
    pub fn with_format(mut self, format: TelemetryFormat) -> Self {
        self.format = format;
        self
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_telemetry(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        TelemetryFormat::Pretty => builder.pretty().try_init().ok(),
        TelemetryFormat::Compact => builder.compact().try_init().ok(),
        TelemetryFormat::Json => builder.json().try_init().ok(),
    };
}
