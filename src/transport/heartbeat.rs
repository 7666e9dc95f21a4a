//! Heartbeat driver.
//!
//! Emits a periodic liveness signal while the connection is up. The driver
//! only transmits; it does not track whether a corresponding `pong` arrives
//! within any deadline. The connection manager starts it on the `Connected`
//! transition and stops it on close, error, and caller disconnect.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

// ============================================================================
// Heartbeat
// ============================================================================

/// Repeating timer that invokes an emit callback every period.
///
/// At most one timer task is active at a time: `start` replaces any running
/// task, `stop` is idempotent, and dropping the driver cancels the task.
pub struct Heartbeat {
    task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Creates a stopped heartbeat driver.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { task: None }
    }

    /// Starts emitting every `interval`.
    ///
    /// The first emit happens one full period after `start`, then repeats.
    /// Any previously running timer is cancelled first.
    pub fn start(&mut self, interval: Duration, emit: impl Fn() + Send + 'static) {
        self.stop();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so emission
            // starts one full period in.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                trace!("heartbeat tick");
                emit();
            }
        }));
    }

    /// Cancels the timer. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Returns `true` if a timer task is running.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_emits_every_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let mut heartbeat = Heartbeat::new();
        heartbeat.start(Duration::from_secs(1), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Nothing yet at start.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_emission() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let mut heartbeat = Heartbeat::new();
        heartbeat.start(Duration::from_secs(1), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        heartbeat.stop();
        assert!(!heartbeat.is_active());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut heartbeat = Heartbeat::new();
        heartbeat.stop();
        heartbeat.start(Duration::from_secs(1), || {});
        heartbeat.stop();
        heartbeat.stop();
        assert!(!heartbeat.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_replaces_previous_timer() {
        let count = Arc::new(AtomicUsize::new(0));

        let mut heartbeat = Heartbeat::new();
        let count_clone = Arc::clone(&count);
        heartbeat.start(Duration::from_secs(60), move || {
            count_clone.fetch_add(100, Ordering::SeqCst);
        });
        let count_clone = Arc::clone(&count);
        heartbeat.start(Duration::from_secs(1), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        // Only the replacement timer ever fired.
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
