//! Retry Supervisor: wraps [`Coordinator::update`] with offline-awareness,
//! randomized exponential backoff on network errors, and a bounded number of
//! retries on store-constraint errors.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;

use error::{RetryClass, SyncError};
use types::series::MajorDataSeries;

use crate::cancel::CancelToken;
use crate::coordinator::Coordinator;
use crate::fetch::Fetcher;

struct SeriesRetryState {
    cancel: CancelToken,
    attempt: AtomicU32,
}

impl Default for SeriesRetryState {
    fn default() -> Self {
        SeriesRetryState {
            cancel: CancelToken::new(),
            attempt: AtomicU32::new(0),
        }
    }
}

/// Wraps a [`Coordinator`] with retry policy. One instance is shared across
/// a process; `updateWithRetry` is the entry point the HTTP surface and the
/// periodic-check timer call instead of `Coordinator::update` directly.
pub struct RetrySupervisor<F> {
    coordinator: Coordinator<F>,
    online: AtomicBool,
    online_notify: Notify,
    initial_backoff_ms: (u64, u64),
    max_backoff_secs: u64,
    store_retry_attempts: u8,
    states: Mutex<std::collections::HashMap<MajorDataSeries, std::sync::Arc<SeriesRetryState>>>,
}

impl<F: Fetcher + 'static> RetrySupervisor<F> {
    pub fn new(
        coordinator: Coordinator<F>,
        initial_backoff_ms: (u64, u64),
        max_backoff_secs: u64,
        store_retry_attempts: u8,
    ) -> Self {
        RetrySupervisor {
            coordinator,
            online: AtomicBool::new(true),
            online_notify: Notify::new(),
            initial_backoff_ms,
            max_backoff_secs,
            store_retry_attempts,
            states: Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn coordinator(&self) -> &Coordinator<F> {
        &self.coordinator
    }

    /// Call when host connectivity changes; flips the offline gate and, when
    /// transitioning to online, wakes every waiter so their retry fires
    /// immediately instead of on its own backoff schedule.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if online {
            self.online_notify.notify_waiters();
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn state_for(&self, series: MajorDataSeries) -> std::sync::Arc<SeriesRetryState> {
        self.states
            .lock()
            .unwrap()
            .entry(series)
            .or_default()
            .clone()
    }

    /// Runs `update(series, lang)`, retrying through transient failures
    /// until it either succeeds or is cancelled via
    /// [`RetrySupervisor::cancel_update_with_retry`]. Absorbs a second
    /// concurrent call for the same series — it observes whatever the first
    /// call's `Coordinator::update` coalescing already does, since both
    /// calls end up invoking the same underlying `update`.
    pub async fn update_with_retry(&self, series: MajorDataSeries, lang: &str) -> Result<(), SyncError> {
        let state = self.state_for(series);
        let mut store_retries = 0u8;

        loop {
            if state.cancel.is_cancelled() {
                return Err(SyncError::Aborted);
            }

            if !self.is_online() {
                log::warn!("retry: offline, waiting before updating {series}");
                tokio::select! {
                    _ = state.cancel.cancelled() => return Err(SyncError::Aborted),
                    _ = self.online_notify.notified() => {}
                }
                continue;
            }

            match self.coordinator.update(series, lang).await {
                Ok(()) => {
                    state.attempt.store(0, Ordering::SeqCst);
                    return Ok(());
                }
                Err(SyncError::Aborted) => return Err(SyncError::Aborted),
                Err(e) => match e.retry_class() {
                    RetryClass::Offline => {
                        self.online.store(false, Ordering::SeqCst);
                        continue;
                    }
                    RetryClass::Network => {
                        let attempt = state.attempt.fetch_add(1, Ordering::SeqCst);
                        let delay = self.backoff_for(attempt);
                        log::warn!("retry: network error updating {series} ({e}), retrying in {delay:?}");
                        if self.sleep_or_cancelled(delay, &state.cancel).await {
                            return Err(SyncError::Aborted);
                        }
                    }
                    RetryClass::Store => {
                        store_retries += 1;
                        if store_retries > self.store_retry_attempts {
                            log::error!("retry: giving up on {series} after {store_retries} store retries: {e}");
                            return Err(e);
                        }
                        log::warn!("retry: store constraint on {series} ({e}), retry {store_retries}/{}", self.store_retry_attempts);
                        if self.sleep_or_cancelled(Duration::from_millis(50), &state.cancel).await {
                            return Err(SyncError::Aborted);
                        }
                    }
                    RetryClass::Fatal => return Err(e),
                },
            }
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let (min_ms, max_ms) = self.initial_backoff_ms;
        let initial_ms = rand::thread_rng().gen_range(min_ms..max_ms.max(min_ms + 1));
        let scaled = initial_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX).max(1));
        Duration::from_millis(scaled).min(Duration::from_secs(self.max_backoff_secs))
    }

    /// Sleeps for `delay` unless cancelled first; returns whether it was
    /// cancelled.
    async fn sleep_or_cancelled(&self, delay: Duration, cancel: &CancelToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    /// Idempotent: returns whether a pending/running retry loop was
    /// actually cancelled. Removes the series' retry state afterward —
    /// `CancelToken` is one-way, so the next `update_with_retry` call for
    /// this series must start from a fresh token.
    pub fn cancel_update_with_retry(&self, series: MajorDataSeries) -> bool {
        let cancelled = self.coordinator.cancel_update(series);
        let had_state = self
            .states
            .lock()
            .unwrap()
            .remove(&series)
            .map(|state| {
                state.cancel.cancel();
            })
            .is_some();
        cancelled || had_state
    }
}
