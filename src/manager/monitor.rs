//! Heartbeat and staleness predicates
//!
//! Small pure checks shared by the heartbeat pass and the foreground
//! resume recheck.

use super::state::ConnectionState;
use std::time::Duration;

/// True when a subscription has gone quiet for longer than the threshold
pub(crate) fn is_stale(idle: Duration, threshold: Duration) -> bool {
    idle > threshold
}

/// True when a foreground resume should trigger a reconnect for this
/// subscription
///
/// Only connected subscriptions with resilience enabled are rechecked;
/// anything already erroring or reconnecting is handled by the retry path.
pub(crate) fn should_recheck(
    state: ConnectionState,
    resilience_enabled: bool,
    idle: Duration,
    threshold: Duration,
) -> bool {
    resilience_enabled && state == ConnectionState::Connected && is_stale(idle, threshold)
}

/// True when the heartbeat pass should refresh this subscription's activity
pub(crate) fn heartbeat_touches(state: ConnectionState) -> bool {
    state == ConnectionState::Connected
}
