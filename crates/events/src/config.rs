//! Bus configuration.

use std::time::Duration;

/// Environment variable overriding [`BusConfig::poll_interval`] (milliseconds).
pub const POLL_INTERVAL_ENV: &str = "MEDIABUS_POLL_INTERVAL_MS";

/// Environment variable overriding [`BusConfig::loop_thread_name`].
pub const LOOP_THREAD_NAME_ENV: &str = "MEDIABUS_LOOP_THREAD_NAME";

/// Default idle sleep of the transport loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidPollInterval { var: &'static str, value: String },
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// How long the transport loop sleeps when the main inbox is empty.
    ///
    /// Upper bound on async delivery latency and on shutdown latency.
    pub poll_interval: Duration,
    /// Name of the transport loop thread
    pub loop_thread_name: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            loop_thread_name: "event-transport".to_string(),
        }
    }
}

impl BusConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_loop_thread_name(mut self, name: impl Into<String>) -> Self {
        self.loop_thread_name = name.into();
        self
    }

    /// Build a config from `MEDIABUS_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary key lookup (environment, file, test map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::InvalidPollInterval {
                    var: POLL_INTERVAL_ENV,
                    value: raw.clone(),
                })?;
            config.poll_interval = Duration::from_millis(millis);
        }

        if let Some(name) = lookup(LOOP_THREAD_NAME_ENV) {
            if !name.trim().is_empty() {
                config.loop_thread_name = name;
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_poll_interval() {
        let config = BusConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.loop_thread_name, "event-transport");
    }

    #[test]
    fn missing_variables_keep_defaults() {
        let config = BusConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BusConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = BusConfig::from_lookup(lookup(&[
            (POLL_INTERVAL_ENV, "25"),
            (LOOP_THREAD_NAME_ENV, "media-bus"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(25));
        assert_eq!(config.loop_thread_name, "media-bus");
    }

    #[test]
    fn zero_or_garbage_interval_is_rejected() {
        for bad in ["0", "fast", "-5"] {
            let err = BusConfig::from_lookup(lookup(&[(POLL_INTERVAL_ENV, bad)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPollInterval { .. }));
        }
    }
}
