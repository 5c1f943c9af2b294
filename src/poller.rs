//! Fixed-interval polling with on-demand revalidation.
//!
//! A [`Poller`] owns the shared state for one resource. The scheduled loop and
//! [`Poller::revalidate`] go through the same fetch-and-store path, so whichever
//! response resolves last is the one that sticks. A failed fetch records the error
//! but keeps the last good value.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::network::ApiError;

type Fetcher<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

#[derive(Debug)]
pub struct PollState<T> {
    /// Latest successful value.
    pub data: Option<Arc<T>>,
    /// Error of the latest resolved fetch; cleared by the next success.
    pub error: Option<ApiError>,
    /// Fetches currently awaiting a response.
    pub in_flight: usize,
}

impl<T> PollState<T> {
    pub fn is_validating(&self) -> bool {
        self.in_flight > 0
    }

    /// Nothing has resolved yet.
    pub fn is_pending(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            in_flight: 0,
        }
    }
}

// Manual impl: `T` itself need not be `Clone`, only the `Arc` is cloned.
impl<T> Clone for PollState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            in_flight: self.in_flight,
        }
    }
}

/// One fetch counted in `in_flight`. Dropping it without `finish` (a cancelled
/// fetch) still takes the count back down.
struct InFlight<'a, T> {
    state: &'a watch::Sender<PollState<T>>,
    done: bool,
}

impl<'a, T> InFlight<'a, T> {
    fn enter(state: &'a watch::Sender<PollState<T>>) -> Self {
        state.send_modify(|s| s.in_flight += 1);
        Self { state, done: false }
    }

    /// Leaves the in-flight count and applies `apply` in the same update.
    fn finish(mut self, apply: impl FnOnce(&mut PollState<T>)) {
        self.done = true;
        self.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            apply(s);
        });
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.done {
            self.state.send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
        }
    }
}

pub struct Poller<T> {
    name: &'static str,
    interval: Duration,
    fetcher: Fetcher<T>,
    state: watch::Sender<PollState<T>>,
}

impl<T: Send + Sync + 'static> Poller<T> {
    pub fn new<F, Fut>(name: &'static str, interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (state, _) = watch::channel(PollState::default());
        Self {
            name,
            interval,
            fetcher: Box::new(move || fetch().boxed()),
            state,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> PollState<T> {
        self.state.borrow().clone()
    }

    /// Fetches once, out of band, and stores the outcome. Does not touch the schedule.
    pub async fn revalidate(&self) -> Result<(), ApiError> {
        let fetch = InFlight::enter(&self.state);
        let result = (self.fetcher)().await;
        match result {
            Ok(value) => {
                let value = Arc::new(value);
                fetch.finish(|s| {
                    s.error = None;
                    s.data = Some(value);
                });
                debug!(poller = self.name, "fetch succeeded");
                Ok(())
            }
            Err(e) => {
                let stored = e.clone();
                fetch.finish(|s| s.error = Some(stored));
                warn!(poller = self.name, url = e.url(), error = %e, "fetch failed, keeping last good data");
                Err(e)
            }
        }
    }

    /// Runs the scheduled loop until `cancel` fires. The first fetch happens immediately.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let poller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(poller = poller.name, "polling stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Errors are already recorded in the shared state.
                        let _ = poller.revalidate().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::{MockApi, failure, summary};
    use crate::network::MetricsApi;
    use crate::models::{SummarySnapshot, Window};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn summary_poller(api: Arc<MockApi>, interval: Duration) -> Arc<Poller<SummarySnapshot>> {
        Arc::new(Poller::new("summary", interval, move || {
            let api = Arc::clone(&api);
            async move { api.fetch_summary(Window::Day).await }
        }))
    }

    #[tokio::test]
    async fn success_replaces_snapshot() {
        let api = Arc::new(MockApi::new());
        api.push_summary(Ok(summary(10, 1))).push_summary(Ok(summary(20, 2)));
        let poller = summary_poller(api, Duration::from_secs(60));

        assert!(poller.current().is_pending());
        poller.revalidate().await.unwrap();
        assert_eq!(poller.current().data.unwrap().total_lines_updated, 10);
        poller.revalidate().await.unwrap();
        let state = poller.current();
        assert_eq!(state.data.as_ref().unwrap().total_lines_updated, 20);
        assert!(state.error.is_none());
        assert!(!state.is_validating());
    }

    #[tokio::test]
    async fn failure_keeps_last_good_snapshot() {
        let api = Arc::new(MockApi::new());
        api.push_summary(Ok(summary(340, 3)))
            .push_summary(Err(failure("/metrics/summary")))
            .push_summary(Err(failure("/metrics/summary")));
        let poller = summary_poller(api, Duration::from_secs(60));

        poller.revalidate().await.unwrap();
        assert!(poller.revalidate().await.is_err());
        assert!(poller.revalidate().await.is_err());

        let state = poller.current();
        assert_eq!(state.data.unwrap().total_lines_updated, 340);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn displayed_value_is_always_latest_success() {
        let outcomes = [Some(1), None, Some(3), None, None, Some(6), None];
        let api = Arc::new(MockApi::new());
        for outcome in outcomes {
            match outcome {
                Some(lines) => api.push_summary(Ok(summary(lines, 1))),
                None => api.push_summary(Err(failure("/metrics/summary"))),
            };
        }
        let poller = summary_poller(api, Duration::from_secs(60));

        let mut last_good = None;
        for outcome in outcomes {
            let _ = poller.revalidate().await;
            if outcome.is_some() {
                last_good = outcome;
            }
            let shown = poller.current().data.map(|s| s.total_lines_updated);
            assert_eq!(shown, last_good);
        }
    }

    #[tokio::test]
    async fn subscribers_are_notified() {
        let api = Arc::new(MockApi::new());
        api.push_summary(Ok(summary(5, 1)));
        let poller = summary_poller(api, Duration::from_secs(60));
        let mut rx = poller.subscribe();

        poller.revalidate().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().data.as_ref().unwrap().total_lines_updated, 5);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn schedule_survives_failures_and_stops_on_cancel() {
        let api = Arc::new(MockApi::new());
        api.push_summary(Err(failure("/metrics/summary")))
            .push_summary(Err(failure("/metrics/summary")))
            .push_summary(Ok(summary(7, 1)));
        let poller = summary_poller(Arc::clone(&api), Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let handle = poller.spawn(cancel.clone());

        let mut rx = poller.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if rx.borrow_and_update().data.is_some() {
                    break;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("poller never recovered");

        cancel.cancel();
        handle.await.unwrap();
        let calls = api.calls().len();
        assert!(calls >= 3);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.calls().len(), calls);
    }

    #[tokio::test]
    async fn overlapping_fetches_keep_the_last_to_resolve() {
        let (first_tx, first_rx) = oneshot::channel::<u64>();
        let (second_tx, second_rx) = oneshot::channel::<u64>();
        let pending = Arc::new(Mutex::new(VecDeque::from([first_rx, second_rx])));
        let poller = Arc::new(Poller::new("summary", Duration::from_secs(60), move || {
            let next = pending.lock().unwrap().pop_front();
            async move {
                match next {
                    Some(rx) => rx.await.map(|lines| summary(lines, 1)).map_err(|_| failure("/metrics/summary")),
                    None => Err(failure("/metrics/summary")),
                }
            }
        }));
        let mut rx = poller.subscribe();

        let scheduled = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.revalidate().await })
        };
        rx.wait_for(|s| s.in_flight == 1).await.unwrap();
        let manual = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.revalidate().await })
        };
        rx.wait_for(|s| s.in_flight == 2).await.unwrap();

        // Issued second, resolves first.
        second_tx.send(20).unwrap();
        manual.await.unwrap().unwrap();
        let state = poller.current();
        assert_eq!(state.data.as_ref().unwrap().total_lines_updated, 20);
        assert!(state.is_validating());

        first_tx.send(10).unwrap();
        scheduled.await.unwrap().unwrap();
        let state = poller.current();
        assert_eq!(state.data.as_ref().unwrap().total_lines_updated, 10);
        assert_eq!(state.in_flight, 0);
    }

    #[tokio::test]
    async fn cancelled_fetch_leaves_nothing_in_flight() {
        let poller = Arc::new(Poller::new("summary", Duration::from_secs(60), || {
            std::future::pending::<Result<SummarySnapshot, ApiError>>()
        }));
        let mut rx = poller.subscribe();

        let running = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.revalidate().await })
        };
        rx.wait_for(|s| s.is_validating()).await.unwrap();
        running.abort();
        let _ = running.await;

        let state = poller.current();
        assert_eq!(state.in_flight, 0);
        assert!(state.is_pending());
    }
}
