// src/preview/debounce.rs

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Trailing-edge debouncer.
///
/// `push` stores the latest item and (re)arms the timer; `ready` resolves
/// with that item once `window` has passed without another push. Superseded
/// items are dropped, never queued.
///
/// `ready` does not touch state until its timer has elapsed, so it can be
/// raced in `tokio::select!` and simply recreated on the next iteration.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record `item` as the latest event and restart the quiescence window.
    pub fn push(&mut self, item: T) {
        let deadline = Instant::now() + self.window;
        if self.pending.replace((item, deadline)).is_some() {
            trace!(window_ms = self.window.as_millis() as u64, "debounce timer reset");
        }
    }

    /// Drop the pending item, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(item, _)| item)
    }

    /// Wait for the pending item to become due. Never resolves while idle.
    pub async fn ready(&mut self) -> T {
        let Some(deadline) = self.pending.as_ref().map(|(_, d)| *d) else {
            return std::future::pending().await;
        };

        sleep_until(deadline).await;

        match self.pending.take() {
            Some((item, _)) => item,
            None => std::future::pending().await,
        }
    }
}
