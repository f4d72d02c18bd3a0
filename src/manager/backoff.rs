//! Reconnect retry policy
//!
//! Pure functions computing exponential backoff delays and deciding when a
//! subscription has exhausted its retry budget.

use std::time::Duration;

/// Hard ceiling on any single reconnect delay
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Scheduling decision for the next reconnect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Arm a timer and retry after the delay
    Retry { delay: Duration },
    /// Retry budget exhausted; the subscription stays down until it is
    /// explicitly removed or re-registered
    GiveUp { attempts_made: u32 },
}

/// Exponential backoff delay for an attempt: `base_delay * 2^reconnect_count`,
/// capped at [`MAX_RECONNECT_DELAY`]
pub fn reconnect_delay(base_delay: Duration, reconnect_count: u32) -> Duration {
    // 2^31 already puts any non-zero base past the cap, so larger counts
    // can share one exponent instead of overflowing
    let factor = 2u32.pow(reconnect_count.min(31));
    base_delay
        .checked_mul(factor)
        .map_or(MAX_RECONNECT_DELAY, |delay| delay.min(MAX_RECONNECT_DELAY))
}

/// Decide whether another reconnect attempt should be scheduled
pub fn next_reconnect(
    reconnect_count: u32,
    retry_attempts: u32,
    base_delay: Duration,
) -> ReconnectDecision {
    if reconnect_count >= retry_attempts {
        return ReconnectDecision::GiveUp {
            attempts_made: reconnect_count,
        };
    }
    ReconnectDecision::Retry {
        delay: reconnect_delay(base_delay, reconnect_count),
    }
}
