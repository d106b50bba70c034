//! Engine configuration
//!
//! Provides the configuration type and limit constants for the compensation
//! engine. All capacities are fixed at construction; the engine performs no
//! allocation afterwards.

use hindsight_shared::ClassMask;
use thiserror::Error;

/// Hard upper bound on history depth per entity.
///
/// Rewind queries scan the ring linearly; keeping the ring small makes the
/// scan cost negligible next to the host's own hit test.
pub const MAX_HISTORY_CAPACITY: usize = 64;

/// Hard upper bound on tracked entity slots.
pub const MAX_TRACKED_ENTITIES: usize = 4096;

/// Default history depth per entity.
///
/// 32 snapshots at a 64 Hz tick rate covers half a second of history,
/// comfortably past the default lookback clamp.
pub const DEFAULT_HISTORY_CAPACITY: usize = 32;

/// Default tracked entity slot count.
pub const DEFAULT_MAX_ENTITIES: usize = 256;

/// Default maximum lookback in seconds.
///
/// Bounds how far into the past a rewind may reach regardless of the
/// latency the host reports, so a spoofed or degenerate ping cannot request
/// an unbounded rewind.
pub const DEFAULT_MAX_LOOKBACK: f64 = 0.4;

/// Default exact-match window in seconds.
///
/// A rewind target within this distance of a recorded snapshot uses that
/// snapshot directly instead of interpolating.
pub const DEFAULT_TIME_EPSILON: f64 = 0.0005;

/// Settings for constructing a [`Compensator`](crate::Compensator).
///
/// Capacities and the lookback clamp are fixed for the engine's lifetime.
/// Invalid values are rejected at construction, never at interaction time.
#[derive(Debug, Clone, PartialEq)]
pub struct CompensationConfig {
    /// Number of entity slots (bounds valid [`EntityId`](hindsight_shared::EntityId) indices)
    pub max_entities: usize,
    /// Snapshots retained per entity
    pub history_capacity: usize,
    /// Maximum rewind distance in seconds
    pub max_lookback: f64,
    /// Exact-match window in seconds
    pub time_epsilon: f64,
    /// Entity classes eligible for tracking
    pub eligible_classes: ClassMask,
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_lookback: DEFAULT_MAX_LOOKBACK,
            time_epsilon: DEFAULT_TIME_EPSILON,
            eligible_classes: ClassMask::ALL,
        }
    }
}

impl CompensationConfig {
    /// Validate all fields.
    ///
    /// Called by the engine constructor; a failure here prevents activation
    /// entirely rather than degrading at interaction time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entities == 0 || self.max_entities > MAX_TRACKED_ENTITIES {
            return Err(ConfigError::InvalidEntityLimit(self.max_entities));
        }
        if self.history_capacity == 0 || self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::InvalidHistoryCapacity(self.history_capacity));
        }
        if !self.max_lookback.is_finite() || self.max_lookback <= 0.0 {
            return Err(ConfigError::InvalidLookback(self.max_lookback));
        }
        if !self.time_epsilon.is_finite() || self.time_epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.time_epsilon));
        }
        Ok(())
    }
}

/// Error validating a [`CompensationConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `max_entities` outside `1..=MAX_TRACKED_ENTITIES`
    #[error("invalid max_entities {0} (expected 1-{max})", max = MAX_TRACKED_ENTITIES)]
    InvalidEntityLimit(usize),
    /// `history_capacity` outside `1..=MAX_HISTORY_CAPACITY`
    #[error("invalid history_capacity {0} (expected 1-{max})", max = MAX_HISTORY_CAPACITY)]
    InvalidHistoryCapacity(usize),
    /// `max_lookback` non-positive or non-finite
    #[error("max_lookback must be positive and finite, got {0}")]
    InvalidLookback(f64),
    /// `time_epsilon` negative or non-finite
    #[error("time_epsilon must be non-negative and finite, got {0}")]
    InvalidEpsilon(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CompensationConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_entities() {
        let config = CompensationConfig {
            max_entities: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidEntityLimit(0)));
    }

    #[test]
    fn rejects_oversized_history() {
        let config = CompensationConfig {
            history_capacity: MAX_HISTORY_CAPACITY + 1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidHistoryCapacity(MAX_HISTORY_CAPACITY + 1))
        );
    }

    #[test]
    fn rejects_bad_lookback() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = CompensationConfig {
                max_lookback: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "lookback {bad} should fail");
        }
    }

    #[test]
    fn rejects_negative_epsilon() {
        let config = CompensationConfig {
            time_epsilon: -0.001,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEpsilon(_))
        ));
    }

    #[test]
    fn zero_epsilon_is_allowed() {
        let config = CompensationConfig {
            time_epsilon: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
