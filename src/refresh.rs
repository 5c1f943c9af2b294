//! Manual ingestion: ask the server to ingest, then revalidate the summary.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::models::SummarySnapshot;
use crate::network::{ApiError, MetricsApi};
use crate::poller::Poller;

/// Shared "manual refresh in flight" flag. Observers subscribe to it for display.
#[derive(Clone)]
pub struct InFlightFlag {
    tx: Arc<watch::Sender<bool>>,
}

/// Holds the flag raised; lowering happens on drop, whatever the exit path.
pub struct InFlightGuard {
    tx: Arc<watch::Sender<bool>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tx.send_replace(false);
    }
}

impl InFlightFlag {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Raises the flag, or returns `None` if it is already raised.
    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        let acquired = self.tx.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        acquired.then(|| InFlightGuard {
            tx: Arc::clone(&self.tx),
        })
    }
}

impl Default for InFlightFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Completed {
        ingest_error: Option<ApiError>,
        revalidate_error: Option<ApiError>,
    },
    AlreadyRunning,
}

pub struct IngestTrigger {
    api: Arc<dyn MetricsApi>,
    summary: Arc<Poller<SummarySnapshot>>,
    flag: InFlightFlag,
}

impl IngestTrigger {
    pub fn new(api: Arc<dyn MetricsApi>, summary: Arc<Poller<SummarySnapshot>>) -> Self {
        Self {
            api,
            summary,
            flag: InFlightFlag::new(),
        }
    }

    pub fn flag(&self) -> &InFlightFlag {
        &self.flag
    }

    /// Triggers ingestion and, once the server has answered (either way), revalidates
    /// the summary. The in-flight flag is lowered when this future completes or is dropped.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let Some(_guard) = self.flag.try_acquire() else {
            return RefreshOutcome::AlreadyRunning;
        };

        let ingest_error = match self.api.trigger_ingest().await {
            Ok(receipt) => {
                info!(ingested_new = ?receipt.ingested_new, "ingestion triggered");
                None
            }
            Err(e) => {
                warn!(error = %e, "ingestion trigger failed, revalidating anyway");
                Some(e)
            }
        };

        let revalidate_error = self.summary.revalidate().await.err();
        RefreshOutcome::Completed {
            ingest_error,
            revalidate_error,
        }
    }
}
