//! Service settings: parsing, validation, and loading.
//!
//! Settings live in a small TOML file:
//!
//! ```toml
//! default_timezone = "America/Toronto"
//! timezone_fallback = "lenient"   # or "strict"
//! log_filter = "habit_rollup=debug"
//! ```
//!
//! Every field has a default, so an empty file is valid.
//!
//! Entrypoints:
//! - Parse + validate from a TOML string: [`load_settings_str`]
//! - Parse + validate from a file path: [`load_settings_path`]

use anyhow::Context;
use serde::{Deserialize, Serialize};
use toml::from_str;

use crate::{store::DEFAULT_USER_TZ, tz::TzFallback};

/// Settings for [`crate::service::RollupService`] and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    /// Last link of the effective-timezone chain (habit override → owner → this).
    pub default_timezone: String,
    /// What to do when a link of the chain does not resolve.
    pub timezone_fallback: TzFallback,
    /// `tracing` filter directive used by the CLI when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_timezone: DEFAULT_USER_TZ.to_string(),
            timezone_fallback: TzFallback::Lenient,
            log_filter: None,
        }
    }
}

/// Parse and validate settings from a TOML string.
///
/// Errors:
/// - TOML parse failures (including unknown keys)
/// - A `default_timezone` that is not a known IANA zone
pub fn load_settings_str(toml_str: &str) -> anyhow::Result<Settings> {
    let settings: Settings = from_str(toml_str).context("failed to parse settings TOML")?;
    crate::tz::parse_tz(&settings.default_timezone).context("invalid default_timezone")?;
    Ok(settings)
}

/// Read a settings TOML file from disk, parse, and validate it.
pub fn load_settings_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Settings> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read settings file {}", path.as_ref().display()))?;
    load_settings_str(&text)
}
