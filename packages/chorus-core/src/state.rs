//! Core configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{EVENT_CHANNEL_CAPACITY, TRANSPORT_EVENT_CHANNEL_CAPACITY};
use crate::error::{ChorusError, ChorusResult};

/// Configuration for the Chorus core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Capacity of the session event broadcast channel.
    pub event_channel_capacity: usize,

    /// Capacity of the transport's finished-notification channel.
    pub transport_event_capacity: usize,
}

impl Config {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ChorusError::Configuration`] if a channel capacity is zero
    /// (both `broadcast::channel` and `mpsc::channel` panic on 0).
    pub fn validate(&self) -> ChorusResult<()> {
        if self.event_channel_capacity == 0 {
            return Err(ChorusError::Configuration(
                "event_channel_capacity must be >= 1".to_string(),
            ));
        }
        if self.transport_event_capacity == 0 {
            return Err(ChorusError::Configuration(
                "transport_event_capacity must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
            transport_event_capacity: TRANSPORT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = Config {
            event_channel_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChorusError::Configuration(_))
        ));

        let config = Config {
            transport_event_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{"event_channel_capacity": 8}"#).unwrap();
        assert_eq!(config.event_channel_capacity, 8);
        assert_eq!(
            config.transport_event_capacity,
            TRANSPORT_EVENT_CHANNEL_CAPACITY
        );
    }
}
