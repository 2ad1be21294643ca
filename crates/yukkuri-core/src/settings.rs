//! Client settings and playback policy.
//!
//! `PanelSettings` is the on-disk/env configuration document; every field
//! is optional so partial files and partial updates work. `PlaybackPolicy`
//! is the resolved, `Duration`-typed form the playback wait loop consumes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Slot;

/// Default Panel bridge endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:50080";

/// Default per-request timeout for the transport, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default interval between `isStillPlaying` polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default time after the play request at which a `false` poll is trusted
/// even though no `true` poll was seen.
pub const DEFAULT_START_GRACE: Duration = Duration::from_millis(500);

/// Default upper bound on a synchronous playback wait.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(120);

/// Accepted poll interval range, in milliseconds.
pub const POLL_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 5..=5_000;

/// Environment variable overriding the endpoint.
pub const ENV_PANEL_URL: &str = "YUKKURI_PANEL_URL";
/// Environment variable overriding the poll interval (milliseconds).
pub const ENV_POLL_INTERVAL_MS: &str = "YUKKURI_POLL_INTERVAL_MS";
/// Environment variable overriding the max wait (milliseconds, 0 = none).
pub const ENV_MAX_WAIT_MS: &str = "YUKKURI_MAX_WAIT_MS";

/// Timing policy for synchronous playback.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use yukkuri_core::PlaybackPolicy;
///
/// let policy = PlaybackPolicy::default()
///     .with_poll_interval(Duration::from_millis(20))
///     .with_max_wait(Duration::from_secs(30));
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPolicy {
    poll_interval: Duration,
    start_grace: Duration,
    max_wait: Option<Duration>,
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_grace: DEFAULT_START_GRACE,
            max_wait: Some(DEFAULT_MAX_WAIT),
        }
    }
}

impl PlaybackPolicy {
    /// Set the interval between playback polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the start grace period.
    #[must_use]
    pub const fn with_start_grace(mut self, grace: Duration) -> Self {
        self.start_grace = grace;
        self
    }

    /// Set the maximum total wait, measured from the play request.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Wait without a deadline; only cancellation ends an endless playback.
    #[must_use]
    pub const fn without_deadline(mut self) -> Self {
        self.max_wait = None;
        self
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub const fn start_grace(&self) -> Duration {
        self.start_grace
    }

    #[must_use]
    pub const fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Check the policy for values the wait loop cannot honor.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let interval_ms = duration_ms(self.poll_interval);
        if !POLL_INTERVAL_RANGE_MS.contains(&interval_ms) {
            return Err(SettingsError::InvalidPollInterval(interval_ms));
        }
        if let Some(max_wait) = self.max_wait {
            if self.start_grace > max_wait {
                return Err(SettingsError::GraceExceedsMaxWait {
                    grace_ms: duration_ms(self.start_grace),
                    max_wait_ms: duration_ms(max_wait),
                });
            }
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Client settings document.
///
/// All fields are optional; `effective_*` accessors apply defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PanelSettings {
    /// Base URL of the Panel bridge.
    pub endpoint: Option<String>,

    /// Per-request transport timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,

    /// Interval between playback polls in milliseconds.
    pub poll_interval_ms: Option<u64>,

    /// Start grace period in milliseconds.
    pub start_grace_ms: Option<u64>,

    /// Maximum synchronous playback wait in milliseconds (0 = no deadline).
    pub max_wait_ms: Option<u64>,

    /// Slot the speech queue reads aloud on.
    pub speech_slot: Option<u32>,
}

impl PanelSettings {
    /// Settings with every default filled in.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
            poll_interval_ms: Some(duration_ms(DEFAULT_POLL_INTERVAL)),
            start_grace_ms: Some(duration_ms(DEFAULT_START_GRACE)),
            max_wait_ms: Some(duration_ms(DEFAULT_MAX_WAIT)),
            speech_slot: Some(Slot::PRIMARY.index()),
        }
    }

    /// Read settings from a JSON file and validate them.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let settings: Self =
            serde_json::from_str(&contents).map_err(|e| SettingsError::Parse(e.to_string()))?;
        validate_settings(&settings)?;
        debug!(path = %path.display(), "Loaded panel settings");
        Ok(settings)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), SettingsError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using a custom variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_PANEL_URL) {
            self.endpoint = Some(url);
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = Some(parse_env_ms(ENV_POLL_INTERVAL_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_MAX_WAIT_MS) {
            self.max_wait_ms = Some(parse_env_ms(ENV_MAX_WAIT_MS, &raw)?);
        }
        validate_settings(self)
    }

    #[must_use]
    pub fn effective_endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    #[must_use]
    pub fn effective_request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    /// Resolve the playback timing fields into a policy.
    #[must_use]
    pub fn playback_policy(&self) -> PlaybackPolicy {
        let mut policy = PlaybackPolicy::default();
        if let Some(ms) = self.poll_interval_ms {
            policy = policy.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = self.start_grace_ms {
            policy = policy.with_start_grace(Duration::from_millis(ms));
        }
        match self.max_wait_ms {
            Some(0) => policy = policy.without_deadline(),
            Some(ms) => policy = policy.with_max_wait(Duration::from_millis(ms)),
            None => {}
        }
        policy
    }

    /// Slot the speech queue should use.
    pub fn effective_speech_slot(&self) -> Result<Slot, SettingsError> {
        let index = self.speech_slot.unwrap_or(Slot::PRIMARY.index());
        Slot::new(index).map_err(|_| SettingsError::InvalidSpeechSlot(index))
    }

    /// Merge an update into these settings, touching only the fields it names.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref endpoint) = other.endpoint {
            self.endpoint.clone_from(endpoint);
        }
        if let Some(timeout) = other.request_timeout_ms {
            self.request_timeout_ms = timeout;
        }
        if let Some(interval) = other.poll_interval_ms {
            self.poll_interval_ms = interval;
        }
        if let Some(grace) = other.start_grace_ms {
            self.start_grace_ms = grace;
        }
        if let Some(max_wait) = other.max_wait_ms {
            self.max_wait_ms = max_wait;
        }
        if let Some(slot) = other.speech_slot {
            self.speech_slot = slot;
        }
    }
}

fn parse_env_ms(key: &str, raw: &str) -> Result<u64, SettingsError> {
    raw.trim()
        .parse()
        .map_err(|_| SettingsError::InvalidEnv {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = leave the field alone
/// - `Some(None)` = reset the field to its default
/// - `Some(Some(value))` = set the field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub endpoint: Option<Option<String>>,
    pub request_timeout_ms: Option<Option<u64>>,
    pub poll_interval_ms: Option<Option<u64>>,
    pub start_grace_ms: Option<Option<u64>>,
    pub max_wait_ms: Option<Option<u64>>,
    pub speech_slot: Option<Option<u32>>,
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Poll interval must be between 5 and 5000 ms, got {0}")]
    InvalidPollInterval(u64),

    #[error("Start grace ({grace_ms} ms) must not exceed the max wait ({max_wait_ms} ms)")]
    GraceExceedsMaxWait { grace_ms: u64, max_wait_ms: u64 },

    #[error("Request timeout must be at least 1 ms")]
    InvalidRequestTimeout,

    #[error("Endpoint cannot be empty")]
    EmptyEndpoint,

    #[error("Speech slot {0} is out of range")]
    InvalidSpeechSlot(u32),

    #[error("Environment variable {key} has invalid value '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error("Failed to read settings file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid settings file: {0}")]
    Parse(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &PanelSettings) -> Result<(), SettingsError> {
    if settings
        .endpoint
        .as_ref()
        .is_some_and(|e| e.trim().is_empty())
    {
        return Err(SettingsError::EmptyEndpoint);
    }

    if settings.request_timeout_ms == Some(0) {
        return Err(SettingsError::InvalidRequestTimeout);
    }

    settings.effective_speech_slot()?;
    settings.playback_policy().validate()
}
