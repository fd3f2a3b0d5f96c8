//! Solver configuration.
//!
//! Iteration caps, tolerance windows and the timings used by the
//! [`Propagator`](crate::propagator::Propagator). Every field has a
//! default, so a partial TOML file only needs the keys it overrides.
//!
//! ```
//! use u_timeline::config::SolverConfig;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     max_iterations = 40
//!     full_pass_delay_ms = 100
//! "#).unwrap();
//!
//! assert_eq!(config.max_iterations, 40);
//! assert_eq!(config.realtime_iterations, 3);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::MINUTE_MS;

/// Configuration for solving and for the propagation driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Round cap for a full pass.
    pub max_iterations: usize,
    /// Round cap for a realtime pass.
    pub realtime_iterations: usize,
    /// Slack (ms) within which duration and offset relations count as held.
    /// Must be positive, otherwise those relations can never settle.
    pub tolerance_ms: i64,
    /// Gap (ms) left by the "before" repairs.
    pub buffer_ms: i64,
    /// Delay (ms) between the last realtime pass and the full pass.
    pub full_pass_delay_ms: i64,
    /// Debounce window (ms) for coalescing change notifications.
    pub notify_debounce_ms: i64,
    /// Cadence (ms) of the poll-based change detector.
    pub poll_interval_ms: i64,
    /// Whether the poll-based detector runs at all.
    pub polling: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            realtime_iterations: 3,
            tolerance_ms: MINUTE_MS,
            buffer_ms: MINUTE_MS,
            full_pass_delay_ms: 50,
            notify_debounce_ms: 10,
            poll_interval_ms: 50,
            polling: true,
        }
    }
}

impl SolverConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read, contains invalid TOML,
    /// or fails [`SolverConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be at least 1".into()));
        }
        if self.realtime_iterations == 0 {
            return Err(ConfigError::Invalid(
                "realtime_iterations must be at least 1".into(),
            ));
        }
        if self.tolerance_ms <= 0 {
            return Err(ConfigError::Invalid("tolerance_ms must be positive".into()));
        }
        if self.buffer_ms < 0 {
            return Err(ConfigError::Invalid("buffer_ms must not be negative".into()));
        }
        if self.full_pass_delay_ms < 0 || self.notify_debounce_ms < 0 {
            return Err(ConfigError::Invalid("delays must not be negative".into()));
        }
        if self.polling && self.poll_interval_ms <= 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be positive when polling is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Sets the full-pass round cap.
    pub fn with_max_iterations(mut self, rounds: usize) -> Self {
        self.max_iterations = rounds;
        self
    }

    /// Sets the realtime-pass round cap.
    pub fn with_realtime_iterations(mut self, rounds: usize) -> Self {
        self.realtime_iterations = rounds;
        self
    }

    /// Sets the tolerance window.
    pub fn with_tolerance_ms(mut self, ms: i64) -> Self {
        self.tolerance_ms = ms;
        self
    }

    /// Sets the full-pass delay.
    pub fn with_full_pass_delay_ms(mut self, ms: i64) -> Self {
        self.full_pass_delay_ms = ms;
        self
    }

    /// Sets the notification debounce window.
    pub fn with_notify_debounce_ms(mut self, ms: i64) -> Self {
        self.notify_debounce_ms = ms;
        self
    }

    /// Sets the poll cadence.
    pub fn with_poll_interval_ms(mut self, ms: i64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Turns the poll-based detector on or off.
    pub fn with_polling(mut self, enabled: bool) -> Self {
        self.polling = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.realtime_iterations, 3);
        assert_eq!(config.tolerance_ms, 60_000);
        assert_eq!(config.buffer_ms, 60_000);
        assert!(config.polling);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = SolverConfig::from_toml_str(
            r#"
            realtime_iterations = 5
            polling = false
            "#,
        )
        .unwrap();
        assert_eq!(config.realtime_iterations, 5);
        assert!(!config.polling);
        assert_eq!(config.max_iterations, 20);
    }

    #[test]
    fn test_toml_rejects_zero_cap() {
        let err = SolverConfig::from_toml_str("max_iterations = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_toml_parse_error() {
        let err = SolverConfig::from_toml_str("max_iterations = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SolverConfig::load("/nonexistent/u-timeline.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_builder() {
        let config = SolverConfig::new()
            .with_max_iterations(50)
            .with_polling(false)
            .with_poll_interval_ms(0);
        assert_eq!(config.max_iterations, 50);
        // Zero cadence is fine while polling is off.
        assert!(config.validate().is_ok());
        assert!(config.with_polling(true).validate().is_err());
    }
}
