//! Mock implementations for testing
//!
//! Provides a mock channel adapter and a manually advanced clock so the
//! full subscribe, reconnect, heartbeat, and staleness behavior can be
//! driven deterministically without a backend or wall-clock sleeps.

use crate::adapter::{
    AdapterError, ChangeFilter, ChannelAdapter, ChannelEvent, ChannelEventSender, ChannelHandle,
    ChannelRequest, ChannelStatus,
};
use crate::clock::{Clock, SleepFuture};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};

/// Record of one successful channel creation
#[derive(Debug, Clone)]
pub struct CreatedChannel {
    pub channel: String,
    pub subscription_id: String,
    pub filter: ChangeFilter,
    pub events: ChannelEventSender,
}

/// Mock channel adapter for testing
///
/// Records every creation and removal, can fail a configurable number of
/// upcoming creations, and can emit status and change events on any channel
/// it has handed out.
#[derive(Debug, Default)]
pub struct MockChannelAdapter {
    pub created_channels: Arc<Mutex<Vec<CreatedChannel>>>,
    pub removed_channels: Arc<Mutex<Vec<ChannelHandle>>>,
    create_attempts: AtomicU64,
    failing_creates: AtomicU32,
}

impl MockChannelAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter whose next `count` creations fail
    pub fn with_failing_creates(count: u32) -> Self {
        let adapter = Self::default();
        adapter.failing_creates.store(count, Ordering::SeqCst);
        adapter
    }

    /// Make the next `count` creations fail; earlier settings are replaced
    pub fn fail_next_creates(&self, count: u32) {
        self.failing_creates.store(count, Ordering::SeqCst);
    }

    /// Total creation attempts, including failed ones
    pub fn create_attempts(&self) -> u64 {
        self.create_attempts.load(Ordering::SeqCst)
    }

    pub async fn get_created_channels(&self) -> Vec<CreatedChannel> {
        self.created_channels.lock().await.clone()
    }

    pub async fn get_removed_channels(&self) -> Vec<ChannelHandle> {
        self.removed_channels.lock().await.clone()
    }

    /// Most recently created channel for a subscription id, if any
    pub async fn last_channel_for(&self, subscription_id: &str) -> Option<CreatedChannel> {
        self.created_channels
            .lock()
            .await
            .iter()
            .rev()
            .find(|entry| entry.subscription_id == subscription_id)
            .cloned()
    }

    /// Emit a status signal on the latest channel created for
    /// `subscription_id`; returns false if no such channel exists
    pub async fn emit_status(
        &self,
        subscription_id: &str,
        status: ChannelStatus,
        error: Option<&str>,
    ) -> bool {
        let Some(entry) = self.last_channel_for(subscription_id).await else {
            return false;
        };
        entry
            .events
            .send(ChannelEvent::status(
                subscription_id,
                entry.channel,
                status,
                error.map(str::to_string),
            ))
            .is_ok()
    }

    /// Emit a change event on the latest channel created for
    /// `subscription_id`; returns false if no such channel exists
    pub async fn emit_change(&self, subscription_id: &str, payload: Value) -> bool {
        let Some(entry) = self.last_channel_for(subscription_id).await else {
            return false;
        };
        entry
            .events
            .send(ChannelEvent::change(subscription_id, entry.channel, payload))
            .is_ok()
    }
}

#[async_trait]
impl ChannelAdapter for MockChannelAdapter {
    async fn create_channel(&self, request: ChannelRequest) -> Result<ChannelHandle, AdapterError> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failing_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(AdapterError::backend("mock channel creation failure"));
        }

        let handle = ChannelHandle::new(request.channel.clone());
        self.created_channels.lock().await.push(CreatedChannel {
            channel: request.channel,
            subscription_id: request.subscription_id,
            filter: request.filter,
            events: request.events,
        });
        Ok(handle)
    }

    async fn remove_channel(&self, handle: ChannelHandle) -> Result<(), AdapterError> {
        self.removed_channels.lock().await.push(handle);
        Ok(())
    }
}

struct ManualTimer {
    deadline: Duration,
    tx: oneshot::Sender<()>,
}

struct ManualClockState {
    elapsed: Duration,
    timers: Vec<ManualTimer>,
}

/// Manually advanced clock for deterministic timer tests
///
/// `now` stands still until [`ManualClock::advance`] moves it; sleeps queued
/// through [`Clock::sleep`] resolve once the advanced time passes their
/// deadline. Sleep registration happens inside the `sleep` call itself, so a
/// timer armed before `advance` is always observed by it.
pub struct ManualClock {
    start: Instant,
    state: StdMutex<ManualClockState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            state: StdMutex::new(ManualClockState {
                elapsed: Duration::ZERO,
                timers: Vec::new(),
            }),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ManualClockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Move the clock forward and fire every sleep whose deadline has passed
    pub fn advance(&self, duration: Duration) {
        let due: Vec<ManualTimer> = {
            let mut state = self.lock_state();
            state.elapsed += duration;
            let elapsed = state.elapsed;
            let (due, pending) = state
                .timers
                .drain(..)
                .partition(|timer| timer.deadline <= elapsed);
            state.timers = pending;
            due
        };

        let mut due = due;
        due.sort_by_key(|timer| timer.deadline);
        for timer in due {
            let _ = timer.tx.send(());
        }
    }

    /// Number of sleeps still waiting for a deadline
    pub fn pending_sleeps(&self) -> usize {
        let mut state = self.lock_state();
        state.timers.retain(|timer| !timer.tx.is_closed());
        state.timers.len()
    }

    /// Time elapsed on this clock since construction
    pub fn elapsed(&self) -> Duration {
        self.lock_state().elapsed
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.lock_state().elapsed
    }

    fn sleep(&self, duration: Duration) -> SleepFuture {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.lock_state();
            if duration.is_zero() {
                let _ = tx.send(());
            } else {
                let deadline = state.elapsed + duration;
                state.timers.push(ManualTimer { deadline, tx });
            }
        }
        Box::pin(async move {
            let _ = rx.await;
        })
    }
}

/// Give spawned tasks and queued events a chance to run to completion
///
/// Enough yields for the longest internal chain (timer fire, dispatch,
/// channel release) on a current-thread runtime.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
