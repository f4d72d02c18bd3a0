//! Error types for subscription management
//!
//! The only error a caller can receive from `subscribe` is `CapacityExceeded`;
//! channel failures are handled internally through reconnect scheduling and are
//! visible via `subscription_status` and `metrics`, never as returned errors.

use thiserror::Error;

/// Main error type for manager operations
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("subscription capacity exceeded: {active} active, limit {limit}")]
    CapacityExceeded { active: usize, limit: usize },

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl ManagerError {
    /// Create a capacity-exceeded error
    pub fn capacity_exceeded(active: usize, limit: usize) -> Self {
        Self::CapacityExceeded { active, limit }
    }
}

/// Result type for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;
