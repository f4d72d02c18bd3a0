//! Thread-safe connection metrics
//!
//! Atomic counters plus a mutex-protected last-error slot. Every
//! `ConnectionManager` owns exactly one `ConnectionMetrics`; there is no global
//! collector, and accessors hand out snapshots rather than references.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Error rate at or above which `health_check` reports unhealthy
pub(crate) const MAX_HEALTHY_ERROR_RATE: f64 = 0.10;

/// Connection metrics collector using atomics and a mutex
pub struct ConnectionMetrics {
    connections_created: AtomicU64,
    connections_destroyed: AtomicU64,
    reconnect_attempts: AtomicU64,
    total_errors: AtomicU64,
    uptime_ms: AtomicU64,
    last_error: Mutex<Option<LastError>>,
    started_at: DateTime<Utc>,
}

/// Most recent recorded error
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LastError {
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub connections_created: u64,
    pub connections_destroyed: u64,
    pub reconnect_attempts: u64,
    pub total_errors: u64,
    pub last_error: Option<LastError>,
    pub started_at: DateTime<Utc>,
    pub uptime: Duration,
}

/// Aggregated health view derived from the metrics
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub healthy: bool,
    pub active_connections: usize,
    pub error_rate: f64,
    pub uptime: Duration,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self {
            connections_created: AtomicU64::new(0),
            connections_destroyed: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            uptime_ms: AtomicU64::new(0),
            last_error: Mutex::new(None),
            started_at: Utc::now(),
        }
    }

    pub fn connection_created(&self) {
        self.connections_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_destroyed(&self) {
        self.connections_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an observed error (count + last message/time)
    pub fn record_error<S: Into<String>>(&self, message: S) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(LastError {
                message: message.into(),
                at: Utc::now(),
            });
        }
    }

    /// Store the current uptime, measured by the caller's clock
    pub fn refresh_uptime(&self, uptime: Duration) {
        self.uptime_ms
            .store(uptime.as_millis() as u64, Ordering::Relaxed);
    }

    /// Lifetime error rate: `total_errors / max(connections_created, 1)`
    pub fn error_rate(&self) -> f64 {
        let created = self.connections_created.load(Ordering::Relaxed).max(1);
        self.total_errors.load(Ordering::Relaxed) as f64 / created as f64
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_error = self
            .last_error
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or(None);

        MetricsSnapshot {
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_destroyed: self.connections_destroyed.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            last_error,
            started_at: self.started_at,
            uptime: Duration::from_millis(self.uptime_ms.load(Ordering::Relaxed)),
        }
    }

    /// Health view for `active_connections` currently live subscriptions
    ///
    /// Healthy iff at least one subscription is active and the lifetime error
    /// rate is below [`MAX_HEALTHY_ERROR_RATE`].
    pub fn health_snapshot(&self, active_connections: usize) -> HealthSnapshot {
        let error_rate = self.error_rate();
        HealthSnapshot {
            healthy: active_connections > 0 && error_rate < MAX_HEALTHY_ERROR_RATE,
            active_connections,
            error_rate,
            uptime: Duration::from_millis(self.uptime_ms.load(Ordering::Relaxed)),
        }
    }
}

impl Default for ConnectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
