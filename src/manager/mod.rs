//! Connection manager for concurrent change-feed subscriptions
//!
//! One [`ConnectionManager`] owns a registry of subscriptions, a dispatch
//! loop that applies channel events to it, and two monitors: a heartbeat
//! that keeps healthy subscriptions fresh, and a visibility watcher that
//! rechecks staleness when the host application returns to the foreground.
//!
//! The manager never talks to a backend directly. All channel traffic goes
//! through an injected [`ChannelAdapter`], and all time arithmetic goes
//! through an injected [`Clock`], so the full reconnect and staleness
//! behavior can be exercised in tests with mock implementations.

pub mod backoff;
pub mod monitor;
pub mod state;

use crate::adapter::{
    unique_channel_name, ChangeFilter, ChannelAdapter, ChannelEvent, ChannelHandle, ChannelRequest,
    ChannelSignal, ChannelStatus,
};
use crate::clock::Clock;
use crate::config::{ManagerConfig, SubscriptionConfig};
use crate::error::{ManagerError, ManagerResult};
use crate::metrics::{ConnectionMetrics, HealthSnapshot, MetricsSnapshot};
use crate::visibility::Visibility;
use crate::{channel_span, subscription_span};
use state::{
    apply_status, log_state_transition, ConnectionState, EventCallback, ReconnectTimer,
    StatusAction, SubscriptionInfo, SubscriptionSnapshot,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn, Instrument};

/// Internal control messages posted to the dispatch loop by timers and
/// monitors
#[derive(Debug)]
enum ControlEvent {
    /// A reconnect timer fired; `token` identifies the arming
    ReconnectDue { id: String, token: u64 },
    /// Heartbeat cadence elapsed
    HeartbeatTick,
    /// The host application returned to the foreground
    ForegroundResume,
}

/// Client-side manager for concurrent subscriptions to a change-feed backend
///
/// Cheap to clone; all clones share one registry, one metrics collector, and
/// one set of background monitors. Dropping the last clone stops the
/// monitors and detaches all channels.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: ManagerConfig,
    adapter: Arc<dyn ChannelAdapter>,
    clock: Arc<dyn Clock>,
    registry: RwLock<HashMap<String, SubscriptionInfo>>,
    metrics: ConnectionMetrics,
    started_at: Instant,
    /// Sender handed to the adapter for every created channel
    channel_tx: mpsc::UnboundedSender<ChannelEvent>,
    control_tx: mpsc::UnboundedSender<ControlEvent>,
    shutdown_tx: watch::Sender<bool>,
    /// Monotonic registration order, also salts channel names
    next_seq: AtomicU64,
    /// Distinguishes reconnect timer armings from each other
    next_timer_token: AtomicU64,
    background_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager with no visibility signal
    ///
    /// Suitable for server-side use where foreground/background transitions
    /// do not exist; the staleness recheck never runs. Must be called from
    /// within a Tokio runtime.
    pub fn new(config: ManagerConfig, adapter: Arc<dyn ChannelAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self::build(config, adapter, clock, None)
    }

    /// Create a manager wired to a host visibility signal
    ///
    /// The manager rechecks subscription staleness whenever the signal
    /// transitions from [`Visibility::Background`] to
    /// [`Visibility::Foreground`]. Must be called from within a Tokio
    /// runtime.
    pub fn with_visibility(
        config: ManagerConfig,
        adapter: Arc<dyn ChannelAdapter>,
        clock: Arc<dyn Clock>,
        visibility: watch::Receiver<Visibility>,
    ) -> Self {
        Self::build(config, adapter, clock, Some(visibility))
    }

    fn build(
        config: ManagerConfig,
        adapter: Arc<dyn ChannelAdapter>,
        clock: Arc<dyn Clock>,
        visibility: Option<watch::Receiver<Visibility>>,
    ) -> Self {
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let started_at = clock.now();
        let heartbeat_clock = Arc::clone(&clock);
        let heartbeat_interval = config.heartbeat_interval();

        let inner = Arc::new(ManagerInner {
            config,
            adapter,
            clock,
            registry: RwLock::new(HashMap::new()),
            metrics: ConnectionMetrics::new(),
            started_at,
            channel_tx,
            control_tx,
            shutdown_tx,
            next_seq: AtomicU64::new(0),
            next_timer_token: AtomicU64::new(0),
            background_tasks: Mutex::new(Vec::new()),
        });

        let mut tasks = vec![
            tokio::spawn(run_dispatch(Arc::downgrade(&inner), channel_rx, control_rx)),
            tokio::spawn(run_heartbeat(
                heartbeat_clock,
                heartbeat_interval,
                inner.control_tx.clone(),
                shutdown_rx.clone(),
            )),
        ];
        if let Some(visibility_rx) = visibility {
            tasks.push(tokio::spawn(run_visibility(
                inner.control_tx.clone(),
                visibility_rx,
                shutdown_rx,
            )));
        }
        if let Ok(mut slot) = inner.background_tasks.lock() {
            *slot = tasks;
        }

        Self { inner }
    }

    /// Register a subscription under `id` and open its channel
    ///
    /// Returns the id on success. The only error is
    /// [`ManagerError::CapacityExceeded`]; a channel that fails to open is
    /// still registered, in [`ConnectionState::Error`], and retried on the
    /// backoff schedule.
    ///
    /// Subscribing an id that is already registered tears the previous
    /// subscription down first and starts over with fresh retry budget.
    pub async fn subscribe<F>(
        &self,
        id: impl Into<String>,
        config: SubscriptionConfig,
        callback: F,
    ) -> ManagerResult<String>
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        let id = id.into();
        let span = subscription_span!(id = %id, resource = %config.resource);
        self.inner
            .register_subscription(id, config, Arc::new(callback))
            .instrument(span)
            .await
    }

    /// Remove the subscription under `id` and release its channel
    ///
    /// Idempotent; an unknown id logs a warning and returns.
    pub async fn unsubscribe(&self, id: &str) {
        let mut registry = self.inner.registry.write().await;
        if self.inner.remove_locked(&mut registry, id) {
            info!(id = %id, "subscription removed");
        } else {
            warn!(id = %id, "unsubscribe for unknown subscription id");
        }
    }

    /// Remove every subscription concurrently and stop the monitors
    ///
    /// Pending reconnect timers are cancelled and the heartbeat and
    /// visibility monitors stop. Safe to call repeatedly; the manager still
    /// accepts new subscriptions afterwards, but the monitors stay stopped.
    pub async fn unsubscribe_all(&self) {
        let ids: Vec<String> = self.inner.registry.read().await.keys().cloned().collect();
        let count = ids.len();

        let mut teardowns = JoinSet::new();
        for id in ids {
            let manager = self.clone();
            teardowns.spawn(async move {
                manager.unsubscribe(&id).await;
            });
        }
        while teardowns.join_next().await.is_some() {}

        let _ = self.inner.shutdown_tx.send(true);
        info!(count, "all subscriptions removed, monitors stopped");
    }

    /// Lifecycle state of the subscription under `id`, if registered
    pub async fn subscription_status(&self, id: &str) -> Option<ConnectionState> {
        self.inner.registry.read().await.get(id).map(|info| info.state)
    }

    /// Ids of all registered subscriptions in registration order
    pub async fn active_subscriptions(&self) -> Vec<String> {
        let registry = self.inner.registry.read().await;
        let mut entries: Vec<(u64, String)> = registry
            .values()
            .map(|info| (info.seq, info.id.clone()))
            .collect();
        entries.sort_unstable_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, id)| id).collect()
    }

    /// Detailed view of the subscription under `id`, if registered
    pub async fn subscription_details(&self, id: &str) -> Option<SubscriptionSnapshot> {
        let registry = self.inner.registry.read().await;
        let now = self.inner.clock.now();
        registry.get(id).map(|info| info.snapshot(now))
    }

    /// Current connection metrics with uptime refreshed
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.refresh_uptime(self.inner.uptime());
        self.inner.metrics.snapshot()
    }

    /// Health verdict over the whole manager
    ///
    /// Healthy means at least one registered subscription and an error rate
    /// below the healthy ceiling.
    pub async fn health_check(&self) -> HealthSnapshot {
        let active = self.inner.registry.read().await.len();
        self.inner.metrics.refresh_uptime(self.inner.uptime());
        self.inner.metrics.health_snapshot(active)
    }
}

impl ManagerInner {
    fn uptime(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started_at)
    }

    async fn register_subscription(
        &self,
        id: String,
        config: SubscriptionConfig,
        callback: EventCallback,
    ) -> ManagerResult<String> {
        let mut registry = self.registry.write().await;

        if registry.contains_key(&id) {
            warn!(id = %id, "duplicate subscription id, replacing previous subscription");
            self.remove_locked(&mut registry, &id);
        }

        let active = registry.len();
        if active >= self.config.max_channels {
            warn!(
                id = %id,
                active,
                limit = self.config.max_channels,
                "subscription rejected, capacity exceeded"
            );
            return Err(ManagerError::capacity_exceeded(active, self.config.max_channels));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let channel = unique_channel_name(&config.resource, &id, seq);
        let now = self.clock.now();
        let mut info = SubscriptionInfo {
            id: id.clone(),
            channel: channel.clone(),
            handle: None,
            callback,
            created_at: now,
            last_activity: now,
            reconnect_count: 0,
            seq,
            state: ConnectionState::Connecting,
            pending_reconnect: None,
            config,
        };

        let request = ChannelRequest {
            channel: channel.clone(),
            subscription_id: id.clone(),
            filter: ChangeFilter::from_config(&info.config),
            events: self.channel_tx.clone(),
        };

        match self.adapter.create_channel(request).await {
            Ok(handle) => {
                info.handle = Some(handle);
                info!(id = %id, channel = %channel, "subscription channel opened");
            }
            Err(creation_error) => {
                let message = creation_error.to_string();
                warn!(id = %id, error = %message, "channel creation failed, scheduling retry");
                self.metrics.record_error(message);
                info.state = ConnectionState::Error;
                self.schedule_reconnect(&mut info);
            }
        }

        self.metrics.connection_created();
        registry.insert(id.clone(), info);
        Ok(id)
    }

    /// Remove `id` from the registry, cancel its timer, and release its
    /// channel in the background. Returns false if the id is unknown.
    fn remove_locked(&self, registry: &mut HashMap<String, SubscriptionInfo>, id: &str) -> bool {
        let Some(mut info) = registry.remove(id) else {
            return false;
        };
        info.cancel_pending_reconnect();
        if let Some(handle) = info.handle.take() {
            self.release_channel(handle);
        }
        self.metrics.connection_destroyed();
        true
    }

    /// Release a channel without blocking the caller
    fn release_channel(&self, handle: ChannelHandle) {
        let adapter = Arc::clone(&self.adapter);
        let span = channel_span!(channel = %handle.channel);
        tokio::spawn(
            async move {
                if let Err(release_error) = adapter.remove_channel(handle).await {
                    debug!(error = %release_error, "channel release failed");
                }
            }
            .instrument(span),
        );
    }

    async fn handle_channel_event(&self, event: ChannelEvent) {
        match event.signal {
            ChannelSignal::Change { payload } => {
                self.handle_change(&event.subscription_id, &event.channel, payload)
                    .await;
            }
            ChannelSignal::Status { status, error } => {
                self.handle_status(&event.subscription_id, &event.channel, status, error.as_deref())
                    .await;
            }
        }
    }

    async fn handle_change(&self, id: &str, channel: &str, payload: serde_json::Value) {
        let callback = {
            let mut registry = self.registry.write().await;
            let Some(info) = registry.get_mut(id) else {
                debug!(id = %id, "change event for unknown subscription, dropping");
                return;
            };
            if info.channel != channel {
                debug!(id = %id, channel = %channel, "change event from stale channel, dropping");
                return;
            }
            info.last_activity = self.clock.now();
            Arc::clone(&info.callback)
        };
        // Invoked outside the registry lock so callbacks may call back into
        // the manager
        callback(payload);
    }

    async fn handle_status(
        &self,
        id: &str,
        channel: &str,
        status: ChannelStatus,
        error: Option<&str>,
    ) {
        let mut registry = self.registry.write().await;
        let Some(info) = registry.get_mut(id) else {
            debug!(id = %id, status = %status, "status for unknown subscription, dropping");
            return;
        };
        if info.channel != channel {
            debug!(id = %id, channel = %channel, status = %status, "status from stale channel, dropping");
            return;
        }

        let transition = apply_status(status, error);
        log_state_transition(id, info.state, transition.next);
        if let Some(message) = transition.recorded_error {
            self.metrics.record_error(message);
        }
        info.state = transition.next;

        match transition.action {
            StatusAction::ClearPendingReconnect => {
                info.cancel_pending_reconnect();
                info.last_activity = self.clock.now();
            }
            StatusAction::ScheduleReconnect => self.schedule_reconnect(info),
            StatusAction::None => {}
        }
    }

    /// Arm a reconnect timer for `info`, replacing any pending one
    ///
    /// When the retry budget is exhausted this records the abandonment and
    /// arms nothing; the subscription then stays in its current state until
    /// it is removed or re-registered.
    fn schedule_reconnect(&self, info: &mut SubscriptionInfo) {
        match backoff::next_reconnect(
            info.reconnect_count,
            info.config.retry_attempts,
            info.config.base_delay(),
        ) {
            backoff::ReconnectDecision::GiveUp { attempts_made } => {
                error!(
                    id = %info.id,
                    attempts = attempts_made,
                    "retry budget exhausted, subscription abandoned"
                );
                self.metrics.record_error(format!(
                    "subscription {} abandoned after {} reconnect attempts",
                    info.id, attempts_made
                ));
                info.cancel_pending_reconnect();
            }
            backoff::ReconnectDecision::Retry { delay } => {
                let token = self.next_timer_token.fetch_add(1, Ordering::Relaxed);
                info!(
                    id = %info.id,
                    attempt = info.reconnect_count + 1,
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
                // The sleep is created here, not inside the task, so the
                // timer is armed before the registry lock is released
                let sleep = self.clock.sleep(delay);
                let id = info.id.clone();
                let control_tx = self.control_tx.clone();
                let task = tokio::spawn(async move {
                    sleep.await;
                    let _ = control_tx.send(ControlEvent::ReconnectDue { id, token });
                });
                info.pending_reconnect = Some(ReconnectTimer { token, task });
            }
        }
    }

    async fn handle_reconnect_due(&self, id: &str, token: u64) {
        let mut registry = self.registry.write().await;
        let Some(info) = registry.get_mut(id) else {
            debug!(id = %id, "reconnect timer fired for removed subscription, dropping");
            return;
        };
        let armed = info.pending_reconnect.as_ref().map(|timer| timer.token);
        if armed != Some(token) {
            debug!(id = %id, "reconnect timer fired for a replaced arming, dropping");
            return;
        }
        info.pending_reconnect = None;

        self.reconnect_subscription(info).await;
    }

    /// Tear down the current channel incarnation and open a fresh one
    async fn reconnect_subscription(&self, info: &mut SubscriptionInfo) {
        log_state_transition(&info.id, info.state, ConnectionState::Reconnecting);
        info.state = ConnectionState::Reconnecting;
        info.reconnect_count += 1;
        self.metrics.reconnect_attempt();

        // The dead incarnation is released in the background; the fresh
        // channel name keeps the backend from conflating the two
        if let Some(handle) = info.handle.take() {
            self.release_channel(handle);
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let channel = unique_channel_name(&info.config.resource, &info.id, seq);
        info.channel = channel.clone();
        info.last_activity = self.clock.now();

        let request = ChannelRequest {
            channel: channel.clone(),
            subscription_id: info.id.clone(),
            filter: ChangeFilter::from_config(&info.config),
            events: self.channel_tx.clone(),
        };

        match self.adapter.create_channel(request).await {
            Ok(handle) => {
                info.handle = Some(handle);
                log_state_transition(&info.id, info.state, ConnectionState::Connecting);
                info.state = ConnectionState::Connecting;
                info!(
                    id = %info.id,
                    channel = %channel,
                    attempt = info.reconnect_count,
                    "reconnect attempt issued"
                );
            }
            Err(creation_error) => {
                let message = creation_error.to_string();
                warn!(id = %info.id, error = %message, "channel recreation failed");
                self.metrics.record_error(message);
                log_state_transition(&info.id, info.state, ConnectionState::Error);
                info.state = ConnectionState::Error;
                self.schedule_reconnect(info);
            }
        }
    }

    async fn handle_heartbeat_tick(&self) {
        self.metrics.refresh_uptime(self.uptime());
        let now = self.clock.now();
        let mut registry = self.registry.write().await;
        let scanned = registry.len();
        let mut touched = 0usize;
        for info in registry.values_mut() {
            if monitor::heartbeat_touches(info.state) {
                info.last_activity = now;
                touched += 1;
            }
        }
        debug!(scanned, touched, "heartbeat pass complete");
    }

    async fn handle_foreground_resume(&self) {
        let threshold = self.config.staleness_threshold();
        let now = self.clock.now();
        let mut registry = self.registry.write().await;
        let mut scheduled = 0usize;
        for info in registry.values_mut() {
            let idle = info.idle(now);
            if monitor::should_recheck(info.state, info.config.resilience, idle, threshold) {
                warn!(
                    id = %info.id,
                    idle_secs = idle.as_secs(),
                    "subscription stale after foreground resume, scheduling reconnect"
                );
                self.schedule_reconnect(info);
                scheduled += 1;
            }
        }
        if scheduled > 0 {
            info!(scheduled, "foreground recheck scheduled reconnects");
        } else {
            debug!("foreground recheck found no stale subscriptions");
        }
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Ok(tasks) = self.background_tasks.lock() {
            for task in tasks.iter() {
                task.abort();
            }
        }
    }
}

/// Event dispatch loop
///
/// Holds only a weak reference so background tasks never keep a dropped
/// manager alive.
async fn run_dispatch(
    inner: Weak<ManagerInner>,
    mut channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    mut control_rx: mpsc::UnboundedReceiver<ControlEvent>,
) {
    loop {
        tokio::select! {
            event = channel_rx.recv() => {
                let Some(event) = event else { break };
                let Some(inner) = inner.upgrade() else { break };
                inner.handle_channel_event(event).await;
            }
            event = control_rx.recv() => {
                let Some(event) = event else { break };
                let Some(inner) = inner.upgrade() else { break };
                match event {
                    ControlEvent::ReconnectDue { id, token } => {
                        inner.handle_reconnect_due(&id, token).await;
                    }
                    ControlEvent::HeartbeatTick => inner.handle_heartbeat_tick().await,
                    ControlEvent::ForegroundResume => inner.handle_foreground_resume().await,
                }
            }
        }
    }
    debug!("dispatch loop stopped");
}

/// Heartbeat monitor: posts a tick every `interval` until shutdown
async fn run_heartbeat(
    clock: Arc<dyn Clock>,
    interval: Duration,
    control_tx: mpsc::UnboundedSender<ControlEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let sleep = clock.sleep(interval);
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("heartbeat monitor stopped");
                    break;
                }
            }
            _ = sleep => {
                if control_tx.send(ControlEvent::HeartbeatTick).is_err() {
                    break;
                }
            }
        }
    }
}

/// Visibility monitor: posts a resume event on each background-to-foreground
/// transition
async fn run_visibility(
    control_tx: mpsc::UnboundedSender<ControlEvent>,
    mut visibility_rx: watch::Receiver<Visibility>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut last = *visibility_rx.borrow();
    loop {
        tokio::select! {
            changed = visibility_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *visibility_rx.borrow();
                if last == Visibility::Background && current == Visibility::Foreground {
                    debug!("foreground transition observed");
                    if control_tx.send(ControlEvent::ForegroundResume).is_err() {
                        break;
                    }
                }
                last = current;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("visibility monitor stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{settle, ManualClock, MockChannelAdapter};

    fn manager_with(
        config: ManagerConfig,
    ) -> (ConnectionManager, Arc<MockChannelAdapter>, Arc<ManualClock>) {
        let adapter = Arc::new(MockChannelAdapter::new());
        let clock = Arc::new(ManualClock::new());
        let manager = ConnectionManager::new(config, adapter.clone(), clock.clone());
        (manager, adapter, clock)
    }

    #[tokio::test]
    async fn test_subscribe_opens_channel_and_tracks_subscription() {
        let (manager, adapter, _clock) = manager_with(ManagerConfig::default());

        let id = manager
            .subscribe("orders-feed", SubscriptionConfig::new("orders"), |_| {})
            .await
            .unwrap();
        assert_eq!(id, "orders-feed");

        assert_eq!(
            manager.subscription_status("orders-feed").await,
            Some(ConnectionState::Connecting)
        );
        assert_eq!(adapter.get_created_channels().await.len(), 1);
        assert_eq!(manager.metrics().connections_created, 1);

        adapter
            .emit_status("orders-feed", ChannelStatus::Subscribed, None)
            .await;
        settle().await;

        assert_eq!(
            manager.subscription_status("orders-feed").await,
            Some(ConnectionState::Connected)
        );
    }

    #[tokio::test]
    async fn test_subscribe_rejects_past_capacity() {
        let config = ManagerConfig {
            max_channels: 1,
            ..ManagerConfig::default()
        };
        let (manager, _adapter, _clock) = manager_with(config);

        manager
            .subscribe("first", SubscriptionConfig::new("orders"), |_| {})
            .await
            .unwrap();
        let rejected = manager
            .subscribe("second", SubscriptionConfig::new("orders"), |_| {})
            .await;

        assert!(matches!(
            rejected,
            Err(ManagerError::CapacityExceeded { active: 1, limit: 1 })
        ));
        assert_eq!(manager.active_subscriptions().await, vec!["first"]);
    }

    #[tokio::test]
    async fn test_duplicate_subscribe_replaces_previous() {
        let (manager, adapter, _clock) = manager_with(ManagerConfig::default());

        manager
            .subscribe("feed", SubscriptionConfig::new("orders"), |_| {})
            .await
            .unwrap();
        manager
            .subscribe("feed", SubscriptionConfig::new("orders"), |_| {})
            .await
            .unwrap();
        settle().await;

        assert_eq!(manager.active_subscriptions().await, vec!["feed"]);
        assert_eq!(adapter.get_created_channels().await.len(), 2);
        assert_eq!(adapter.get_removed_channels().await.len(), 1);

        let metrics = manager.metrics();
        assert_eq!(metrics.connections_created, 2);
        assert_eq!(metrics.connections_destroyed, 1);
    }

    #[tokio::test]
    async fn test_duplicate_replacement_fits_within_capacity() {
        let config = ManagerConfig {
            max_channels: 1,
            ..ManagerConfig::default()
        };
        let (manager, _adapter, _clock) = manager_with(config);

        manager
            .subscribe("only", SubscriptionConfig::new("orders"), |_| {})
            .await
            .unwrap();
        // Replacing the single slot is not a capacity violation
        let replaced = manager
            .subscribe("only", SubscriptionConfig::new("orders"), |_| {})
            .await;

        assert!(replaced.is_ok());
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_id_is_a_warning_not_an_error() {
        let (manager, adapter, _clock) = manager_with(ManagerConfig::default());

        manager.unsubscribe("never-registered").await;

        assert_eq!(manager.metrics().connections_destroyed, 0);
        assert!(adapter.get_removed_channels().await.is_empty());
    }

    #[tokio::test]
    async fn test_change_events_reach_the_callback() {
        use std::sync::atomic::AtomicUsize;

        let (manager, adapter, _clock) = manager_with(ManagerConfig::default());
        let received = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&received);

        manager
            .subscribe("feed", SubscriptionConfig::new("orders"), move |payload| {
                assert_eq!(payload["op"], "insert");
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        adapter
            .emit_status("feed", ChannelStatus::Subscribed, None)
            .await;
        adapter
            .emit_change("feed", serde_json::json!({"op": "insert", "row": {"id": 7}}))
            .await;
        settle().await;

        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscription_details_reports_snapshot_fields() {
        let (manager, adapter, clock) = manager_with(ManagerConfig::default());

        manager
            .subscribe("feed", SubscriptionConfig::new("orders"), |_| {})
            .await
            .unwrap();
        adapter
            .emit_status("feed", ChannelStatus::Subscribed, None)
            .await;
        settle().await;
        clock.advance(Duration::from_secs(5));
        settle().await;

        let details = manager.subscription_details("feed").await.unwrap();
        assert_eq!(details.id, "feed");
        assert_eq!(details.resource, "orders");
        assert_eq!(details.state, ConnectionState::Connected);
        assert_eq!(details.reconnect_count, 0);
        assert!(details.age >= Duration::from_secs(5));

        assert!(manager.subscription_details("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_closed_status_disconnects_without_retry() {
        let (manager, adapter, clock) = manager_with(ManagerConfig::default());

        manager
            .subscribe("feed", SubscriptionConfig::new("orders"), |_| {})
            .await
            .unwrap();
        adapter
            .emit_status("feed", ChannelStatus::Subscribed, None)
            .await;
        adapter.emit_status("feed", ChannelStatus::Closed, None).await;
        settle().await;

        assert_eq!(
            manager.subscription_status("feed").await,
            Some(ConnectionState::Disconnected)
        );

        // No reconnect is scheduled for a backend-closed channel
        clock.advance(Duration::from_secs(60));
        settle().await;
        assert_eq!(adapter.get_created_channels().await.len(), 1);
    }

    #[tokio::test]
    async fn test_health_check_requires_active_subscriptions() {
        let (manager, _adapter, _clock) = manager_with(ManagerConfig::default());

        let health = manager.health_check().await;
        assert!(!health.healthy);
        assert_eq!(health.active_connections, 0);

        manager
            .subscribe("feed", SubscriptionConfig::new("orders"), |_| {})
            .await
            .unwrap();
        let health = manager.health_check().await;
        assert!(health.healthy);
        assert_eq!(health.active_connections, 1);
    }
}
