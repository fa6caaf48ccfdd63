//! Logging bootstrap for the mapper and the preloader.
//!
//! Both crates emit `tracing` events; nothing is printed until a subscriber
//! is installed. [`init`] installs one driven by environment variables:
//!
//! - `PRAX_DEBUG=true|1|yes` - enable debug logging
//! - `PRAX_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `PRAX_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! Installing the subscriber requires the `tracing-subscriber` feature.
//!
//! ```rust,no_run
//! use prax_mapper::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("pretty") => Self::Pretty,
            Some("compact") => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Whether anything was requested at all.
    pub enabled: bool,
    /// Level directive for the Prax targets.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read `PRAX_DEBUG`, `PRAX_LOG_LEVEL` and `PRAX_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::resolve(
            env::var("PRAX_DEBUG").ok().as_deref(),
            env::var("PRAX_LOG_LEVEL").ok().as_deref(),
            env::var("PRAX_LOG_FORMAT").ok().as_deref(),
        )
    }

    fn resolve(debug: Option<&str>, level: Option<&str>, format: Option<&str>) -> Self {
        let debug = debug
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        let explicit = match level.map(str::to_lowercase).as_deref() {
            Some("trace") => Some("trace"),
            Some("debug") => Some("debug"),
            Some("info") => Some("info"),
            Some("warn") => Some("warn"),
            Some("error") => Some("error"),
            _ => None,
        };

        Self {
            enabled: debug || explicit.is_some(),
            level: explicit.unwrap_or(if debug { "debug" } else { "warn" }),
            format: LogFormat::parse(format),
        }
    }

    /// The `EnvFilter` directive covering the Prax crates.
    pub fn directive(&self) -> String {
        format!(
            "prax_mapper={level},prax_preload={level},prax_entity_preloader={level}",
            level = self.level
        )
    }
}

/// Check if debug logging is enabled via `PRAX_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("PRAX_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Install the global subscriber once. Later calls are no-ops, and nothing is
/// installed unless `PRAX_DEBUG` or a valid `PRAX_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        let settings = LogSettings::from_env();
        if !settings.enabled {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter =
                EnvFilter::try_new(settings.directive()).unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);
            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = settings.level,
                    format = ?settings.format,
                    "Prax logging initialized"
                );
            }
        }
    });
}
