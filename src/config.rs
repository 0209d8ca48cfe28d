//! Viewer configuration.
//!
//! Defaults work for a pack server on the same origin as the label page. Environment
//! variables override them for local setups:
//! - `LABELVIEW_SERVER`: base URL of the pack JSON server (e.g. `http://127.0.0.1:8000`)
//! - `LABELVIEW_TIMEOUT_SECS`: HTTP timeout in whole seconds

use std::time::Duration;

pub const ENV_SERVER: &str = "LABELVIEW_SERVER";
pub const ENV_TIMEOUT_SECS: &str = "LABELVIEW_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Base URL of the pack server. `None` means "same origin as the page URL".
    pub server_base: Option<String>,
    /// Timeout applied to the whole resource request.
    pub timeout: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_base: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {0:?}")]
    BadTimeout(String),
}

impl ViewerConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(base) = lookup(ENV_SERVER).filter(|s| !s.trim().is_empty()) {
            cfg.server_base = Some(base.trim().trim_end_matches('/').to_string());
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::BadTimeout(raw.clone()))?;
            cfg.timeout = Duration::from_secs(secs);
        }

        Ok(cfg)
    }

    /// Server base to use, falling back to the page origin.
    pub fn server_base_or<'a>(&'a self, page_origin: &'a str) -> &'a str {
        self.server_base.as_deref().unwrap_or(page_origin)
    }
}
