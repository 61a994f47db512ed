// SPDX-License-Identifier: Apache-2.0
//! Polling scaffold: a scoped ticker task against a weakly-held capability.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A capability a [`Poller`] invokes on each tick, for as long as its
/// holder stays alive.
#[async_trait]
pub trait Poll: Send + Sync {
    /// Invoked once per tick while the holder is still live.
    async fn poll(&self);
}

struct Running {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Drives a `Poll` holder on a fixed interval `Δ`. Holds only a [`Weak`]
/// reference, so the polled component's own drop ends the loop even
/// without an explicit `stop()`. `start`/`stop` are both idempotent.
pub struct Poller<P: ?Sized> {
    interval: Duration,
    holder: Weak<P>,
    running: Mutex<Option<Running>>,
}

impl<P> Poller<P>
where
    P: Poll + 'static + ?Sized,
{
    /// Construct a poller for `holder`, ticking every `interval`.
    #[must_use]
    pub fn new(interval: Duration, holder: Weak<P>) -> Self {
        Self {
            interval,
            holder,
            running: Mutex::new(None),
        }
    }

    /// Start the ticker task if it isn't already running. A second call
    /// while already running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut running = self
            .running
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if running.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let interval = self.interval;
        let holder = self.holder.clone();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
            loop {
                tokio::select! {
                    biased;
                    () = child.cancelled() => break,
                    _ = ticker.tick() => {
                        match holder.upgrade() {
                            Some(live) => live.poll().await,
                            None => break,
                        }
                    }
                }
            }
        });
        *running = Some(Running { cancel, join });
    }

    /// Stop the ticker and join its task. A call when already stopped is a
    /// no-op.
    pub async fn stop(&self) {
        let stopped = self
            .running
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(Running { cancel, join }) = stopped {
            cancel.cancel();
            let _ = join.await;
        }
    }

    /// `true` if the ticker task is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter(AtomicU32);

    #[async_trait]
    impl Poll for Counter {
        async fn poll(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polling_cadence_matches_interval() {
        let counter = Arc::new(Counter(AtomicU32::new(0)));
        let poller = Arc::new(Poller::new(
            Duration::from_millis(100),
            Arc::downgrade(&counter),
        ));
        poller.start();
        poller.start(); // idempotent

        tokio::time::advance(Duration::from_millis(1_000)).await;
        tokio::task::yield_now().await;
        assert!(counter.0.load(Ordering::SeqCst) >= 9);

        tokio::time::advance(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        let after = counter.0.load(Ordering::SeqCst);

        poller.stop().await;
        poller.stop().await; // idempotent
        assert!(!poller.is_running());
        assert_eq!(after, counter.0.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropping_the_holder_ends_the_loop() {
        let counter = Arc::new(Counter(AtomicU32::new(0)));
        let poller = Arc::new(Poller::new(Duration::from_millis(5), Arc::downgrade(&counter)));
        poller.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(counter);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_drop = {
            // The holder is gone, so the ticker task has exited on its own;
            // stop() still joins cleanly even though it already finished.
            poller.stop().await;
            poller.is_running()
        };
        assert!(!after_drop);
    }
}
