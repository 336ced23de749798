//! Invalid-bbox retry bookkeeping

use tileseed_core::config::SeedingConfig;

/// How often and by how much a rejected coverage is grown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BboxRetryPolicy {
    pub max_retries: u32,
    pub buffer_meters: f64,
}

impl BboxRetryPolicy {
    pub fn from_config(seeding: &SeedingConfig) -> Self {
        Self {
            max_retries: seeding.invalid_bbox_retry_limit,
            buffer_meters: seeding.invalid_bbox_buffer_meters,
        }
    }

    /// Fresh state for one sub-task
    pub fn start(&self) -> RetryState {
        RetryState {
            policy: *self,
            attempt: 0,
        }
    }
}

/// Retry progress of a single sub-task
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: BboxRetryPolicy,
    attempt: u32,
}

impl RetryState {
    /// Retries taken so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Move to the next retry and return its buffer distance, applied to the
    /// original geometry. `None` once the limit is exceeded.
    pub fn advance(&mut self) -> Option<f64> {
        self.attempt += 1;
        if self.attempt > self.policy.max_retries {
            return None;
        }
        Some(self.policy.buffer_meters * self.attempt as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_scales_with_attempt() {
        let policy = BboxRetryPolicy {
            max_retries: 3,
            buffer_meters: 600.0,
        };
        let mut state = policy.start();

        assert_eq!(state.advance(), Some(600.0));
        assert_eq!(state.advance(), Some(1200.0));
        assert_eq!(state.advance(), Some(1800.0));
        assert_eq!(state.advance(), None);
        assert_eq!(state.attempt(), 4);
    }

    #[test]
    fn test_zero_retries() {
        let policy = BboxRetryPolicy {
            max_retries: 0,
            buffer_meters: 600.0,
        };
        assert_eq!(policy.start().advance(), None);
    }

    #[test]
    fn test_from_config_defaults() {
        let policy = BboxRetryPolicy::from_config(&SeedingConfig::default());
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.buffer_meters, 600.0);
    }
}
