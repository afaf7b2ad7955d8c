//! Queue transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Visibility timeout applied to received messages when none is configured.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 300;
/// Upper bound on the visibility timeout (12 hours).
pub const MAX_VISIBILITY_TIMEOUT_SECS: u64 = 43_200;
/// Deliveries allowed before a message is evicted as poison.
pub const DEFAULT_MAX_MESSAGE_ATTEMPTS: u32 = 3;

/// Settings shared by queue transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Seconds a received message stays hidden from other receivers.
    pub visibility_timeout_secs: u64,
    /// Maximum deliveries before eviction.
    pub max_message_attempts: u32,
    /// Disables poison eviction so failing messages can be inspected.
    pub debug: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: DEFAULT_VISIBILITY_TIMEOUT_SECS,
            max_message_attempts: DEFAULT_MAX_MESSAGE_ATTEMPTS,
            debug: false,
        }
    }
}

impl QueueConfig {
    /// Visibility timeout as a duration.
    #[must_use]
    pub const fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    /// Attempt limit, `None` in debug mode.
    #[must_use]
    pub const fn max_attempts(&self) -> Option<u32> {
        if self.debug {
            None
        } else {
            Some(self.max_message_attempts)
        }
    }

    /// Validate queue settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.visibility_timeout_secs == 0 {
            return Err("visibility_timeout_secs must be greater than 0".into());
        }
        if self.visibility_timeout_secs > MAX_VISIBILITY_TIMEOUT_SECS {
            return Err(format!(
                "visibility_timeout_secs must be at most {MAX_VISIBILITY_TIMEOUT_SECS}, got {}",
                self.visibility_timeout_secs
            ));
        }
        if self.max_message_attempts == 0 {
            return Err("max_message_attempts must be greater than 0".into());
        }
        Ok(())
    }

    /// Read overrides from a key lookup (`VISIBILITY_TIMEOUT_SECS`,
    /// `MAX_MESSAGE_ATTEMPTS`, `DEBUG`) on top of the defaults, then validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = super::parse_var(&lookup, "VISIBILITY_TIMEOUT_SECS")? {
            cfg.visibility_timeout_secs = v;
        }
        if let Some(v) = super::parse_var(&lookup, "MAX_MESSAGE_ATTEMPTS")? {
            cfg.max_message_attempts = v;
        }
        if let Some(v) = super::parse_var(&lookup, "DEBUG")? {
            cfg.debug = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
