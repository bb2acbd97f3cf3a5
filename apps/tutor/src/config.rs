//! Environment-driven tutor configuration.

use std::path::PathBuf;
use std::time::Duration;

use lesson_core::{SupportLevel, DEFAULT_MAX_ATTEMPTS};

use crate::error::{Result, TutorError};

const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_EXPLAIN_TIMEOUT_MS: u64 = 1500;

#[derive(Debug, Clone, PartialEq)]
pub struct TutorConfig {
    /// Root of `{language}/{lesson_id}.json` lesson files.
    pub content_dir: PathBuf,
    /// Directory for sessions and profiles. `None` keeps them in memory.
    pub state_dir: Option<PathBuf>,
    /// Explainer endpoint. `None` disables generated explanations.
    pub explain_url: Option<String>,
    pub explain_timeout: Duration,
    pub support_level: SupportLevel,
    pub max_attempts: u32,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            state_dir: None,
            explain_url: None,
            explain_timeout: Duration::from_millis(DEFAULT_EXPLAIN_TIMEOUT_MS),
            support_level: SupportLevel::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl TutorConfig {
    /// Read configuration from the process environment.
    ///
    /// Env vars:
    /// - TUTOR_CONTENT_DIR: lesson root (default "content")
    /// - TUTOR_STATE_DIR: session and profile directory (optional)
    /// - TUTOR_EXPLAIN_URL: explainer endpoint (optional)
    /// - TUTOR_EXPLAIN_TIMEOUT_MS: explainer time box (default 1500)
    /// - TUTOR_SUPPORT_LEVEL: high, medium or low (default medium)
    /// - TUTOR_MAX_ATTEMPTS: attempts before forced advance (default 4)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get("TUTOR_CONTENT_DIR") {
            config.content_dir = PathBuf::from(dir);
        }

        config.state_dir = get("TUTOR_STATE_DIR").map(PathBuf::from);
        config.explain_url = get("TUTOR_EXPLAIN_URL").map(|url| url.trim().to_string());

        if let Some(raw) = get("TUTOR_EXPLAIN_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                TutorError::Config(format!("TUTOR_EXPLAIN_TIMEOUT_MS must be milliseconds, got '{}'", raw))
            })?;
            config.explain_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = get("TUTOR_SUPPORT_LEVEL") {
            config.support_level = SupportLevel::from_str(&raw).ok_or_else(|| {
                TutorError::Config(format!(
                    "TUTOR_SUPPORT_LEVEL must be high, medium or low, got '{}'",
                    raw
                ))
            })?;
        }

        if let Some(raw) = get("TUTOR_MAX_ATTEMPTS") {
            config.max_attempts = match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(TutorError::Config(format!(
                        "TUTOR_MAX_ATTEMPTS must be a positive integer, got '{}'",
                        raw
                    )))
                }
            };
        }

        Ok(config)
    }
}
