//! Bootstrap settings for a deployment run.
//!
//! A run is configured entirely up front. Settings come either from the
//! process environment (the orchestrator launches deployment programs with
//! the `STRATA_*` variables set) or from [`DeploymentSettings::new`] when
//! embedding the runtime in tests and tools. Configuration problems are
//! fatal and surface before any resource is declared.

use thiserror::Error;

/// Environment variable naming the resource monitor endpoint.
pub const ENV_MONITOR: &str = "STRATA_MONITOR";
/// Environment variable naming the engine endpoint.
pub const ENV_ENGINE: &str = "STRATA_ENGINE";
/// Environment variable naming the project.
pub const ENV_PROJECT: &str = "STRATA_PROJECT";
/// Environment variable naming the stack.
pub const ENV_STACK: &str = "STRATA_STACK";
/// Environment variable carrying the preview flag.
pub const ENV_DRY_RUN: &str = "STRATA_DRY_RUN";
/// Environment variable carrying the parallelism hint.
pub const ENV_PARALLEL: &str = "STRATA_PARALLEL";
/// Environment variable naming the program's working directory.
pub const ENV_PWD: &str = "STRATA_PWD";
/// Environment variable naming an optional trace collector endpoint.
pub const ENV_TRACING: &str = "STRATA_TRACING";

// ─────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────

/// Bootstrap failures raised while reading settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable was absent from the environment.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable was present but could not be parsed.
    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    Invalid {
        /// Name of the offending variable.
        name: &'static str,
        /// The raw value found.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────

/// Everything a deployment run needs to know before the first declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSettings {
    /// Endpoint of the resource monitor channel.
    pub monitor_endpoint: String,
    /// Endpoint of the engine channel.
    pub engine_endpoint: String,
    /// Project the stack belongs to.
    pub project: String,
    /// Stack being deployed.
    pub stack: String,
    /// Whether this run is a preview. Previews never touch real
    /// infrastructure, so values the engine cannot determine stay unknown.
    pub dry_run: bool,
    /// Upper bound on concurrently processed registrations, `0` meaning
    /// unbounded. A hint for the engine side; the runtime itself never
    /// throttles.
    pub parallel: usize,
    /// Working directory of the deployment program.
    pub pwd: String,
    /// Optional endpoint of a trace collector.
    pub tracing_endpoint: Option<String>,
}

impl DeploymentSettings {
    /// Settings for an embedded run, as used by tests and local tooling.
    /// Endpoints default to `local` and are ignored by in-memory monitors.
    #[must_use]
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            monitor_endpoint: "local".to_string(),
            engine_endpoint: "local".to_string(),
            project: project.into(),
            stack: stack.into(),
            dry_run: false,
            parallel: 0,
            pwd: ".".to_string(),
            tracing_endpoint: None,
        }
    }

    /// Marks the run as a preview.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the parallelism hint.
    #[must_use]
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// present variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings from an arbitrary variable source. [`Self::from_env`]
    /// is this applied to the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// present variable fails to parse.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            monitor_endpoint: require(&lookup, ENV_MONITOR)?,
            engine_endpoint: require(&lookup, ENV_ENGINE)?,
            project: require(&lookup, ENV_PROJECT)?,
            stack: require(&lookup, ENV_STACK)?,
            dry_run: parse_flag(&lookup, ENV_DRY_RUN)?,
            parallel: parse_parallel(&lookup, ENV_PARALLEL)?,
            pwd: require(&lookup, ENV_PWD)?,
            tracing_endpoint: lookup(ENV_TRACING),
        })
    }
}

fn require(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    lookup(name).ok_or(ConfigError::Missing(name))
}

fn parse_flag(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<bool, ConfigError> {
    let value = require(lookup, name)?;
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_parallel(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<usize, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(0);
    };
    value.parse().map_err(|error| ConfigError::Invalid {
        name,
        value,
        reason: format!("expected an integer: {error}"),
    })
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────
