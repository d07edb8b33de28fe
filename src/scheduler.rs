//! Cancellable periodic background task.
//!
//! A `ScheduledTask` owns one spawned loop driven by a tokio interval. The
//! first iteration fires one full period after spawning (callers run their
//! eager cycle themselves before scheduling). Stopping cancels the token and
//! joins the task; cancellation is only observed between iterations, so an
//! in-flight iteration always runs to completion.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Handle to a running periodic loop.
#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `job` every `period` until stopped.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::info!("{}_stopped", name);
                        break;
                    }
                    _ = ticker.tick() => {
                        job().await;
                    }
                }
            }
        });

        tracing::debug!("{}_scheduled: every {:?}", name, period);
        Self { name, cancel, handle }
    }

    /// Signal the loop and wait for the current iteration to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!("{} task ended abnormally: {}", self.name, e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_period() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = ScheduledTask::spawn("test_loop", Duration::from_secs(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Nothing fires before the first full period.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(26)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_running_iteration() {
        let finished = Arc::new(AtomicUsize::new(0));
        let flag = finished.clone();
        let task = ScheduledTask::spawn("slow_loop", Duration::from_secs(1), move || {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                flag.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Let the first iteration start, then stop mid-iteration.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        task.stop().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = ScheduledTask::spawn("idle_loop", Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        task.stop().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
