//! Run configuration.

use crate::device::Target;
use thiserror::Error;

/// Vector size used when nothing else is asked for.
pub const DEFAULT_COUNT: usize = 256;

/// Largest count whose closed-form total `count * count` fits an `i32`.
pub const MAX_COUNT: usize = 46_340;

/// Largest ring a streaming pipe may be asked to allocate.
pub const MAX_PIPE_CAPACITY: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("count {count} exceeds {max}, the total would overflow i32")]
    CountTooLarge { count: usize, max: usize },
    #[error("pipe capacity {capacity} cannot buffer {count} values fed before launch")]
    CapacityTooSmall { capacity: usize, count: usize },
    #[error("pipe capacity {capacity} exceeds {max}")]
    CapacityTooLarge { capacity: usize, max: usize },
}

/// Parameters of one harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Elements per input vector.
    pub count: usize,
    /// Execution target, resolved once.
    pub target: Target,
    /// Capacity of each input pipe.
    pub pipe_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::with_count(DEFAULT_COUNT)
    }
}

impl RunConfig {
    /// Build-target config whose pipes are sized to `count`.
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            target: Target::from_build(),
            pipe_capacity: count,
        }
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count > MAX_COUNT {
            return Err(ConfigError::CountTooLarge {
                count: self.count,
                max: MAX_COUNT,
            });
        }
        // Feeding finishes before launch, so every value must fit at once.
        if self.pipe_capacity < self.count {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.pipe_capacity,
                count: self.count,
            });
        }
        if self.pipe_capacity > MAX_PIPE_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                capacity: self.pipe_capacity,
                max: MAX_PIPE_CAPACITY,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = RunConfig::default();
        assert_eq!(config.count, 256);
        assert_eq!(config.pipe_capacity, 256);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn max_count_total_fits() {
        assert!((MAX_COUNT as i64).pow(2) <= i32::MAX as i64);
        assert!(((MAX_COUNT + 1) as i64).pow(2) > i32::MAX as i64);
        assert_eq!(RunConfig::with_count(MAX_COUNT).validate(), Ok(()));
    }

    #[test]
    fn rejects_overflowing_count() {
        let err = RunConfig::with_count(MAX_COUNT + 1).validate().unwrap_err();
        assert!(matches!(err, ConfigError::CountTooLarge { .. }));
    }

    #[test]
    fn rejects_undersized_pipes() {
        let mut config = RunConfig::with_count(16);
        config.pipe_capacity = 8;
        assert_eq!(
            config.validate(),
            Err(ConfigError::CapacityTooSmall { capacity: 8, count: 16 })
        );
    }

    #[test]
    fn rejects_oversized_pipes() {
        let mut config = RunConfig::with_count(16);
        config.pipe_capacity = usize::MAX;
        assert_eq!(
            config.validate(),
            Err(ConfigError::CapacityTooLarge {
                capacity: usize::MAX,
                max: MAX_PIPE_CAPACITY
            })
        );
        config.pipe_capacity = MAX_PIPE_CAPACITY;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_count_is_valid() {
        assert_eq!(RunConfig::with_count(0).validate(), Ok(()));
    }
}
