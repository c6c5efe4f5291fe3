use std::time::Duration;

use tokio::time::{self, Instant};

/// Named one-shot timers owned by a single task.
///
/// At most one timer per key: scheduling a key that is already pending
/// replaces its deadline. Canceling is plain removal, so a canceled timer
/// can never fire late.
#[derive(Debug)]
pub struct TimerSet<K> {
    pending: Vec<(K, Instant)>,
}

impl<K: Copy + Eq + std::fmt::Debug> TimerSet<K> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Arms `key` to fire `after` from now, replacing any pending deadline.
    pub fn schedule(&mut self, key: K, after: Duration) {
        let deadline = Instant::now() + after;
        match self.pending.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = deadline,
            None => self.pending.push((key, deadline)),
        }
        tracing::trace!(?key, after_ms = after.as_millis() as u64, "timer scheduled");
    }

    /// Returns whether `key` was pending.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(k, _)| *k != key);
        before != self.pending.len()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_scheduled(&self, key: K) -> bool {
        self.pending.iter().any(|(k, _)| *k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Waits for the earliest pending timer, removes it, and returns its key.
    /// Ties fire in scheduling order. Pends forever when nothing is pending.
    ///
    /// Cancel-safe: nothing is removed unless the future completes.
    pub async fn expired(&mut self) -> K {
        let Some(index) = self.earliest() else {
            return std::future::pending().await;
        };
        time::sleep_until(self.pending[index].1).await;
        self.pending.remove(index).0
    }

    fn earliest(&self) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .min_by_key(|(_, (_, deadline))| *deadline)
            .map(|(i, _)| i)
    }
}

impl<K: Copy + Eq + std::fmt::Debug> Default for TimerSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
