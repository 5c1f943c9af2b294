use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::models::{CommitRecord, RepoMetrics, Window};
use crate::network::{ApiError, MetricsApi};
use crate::poller::{PollState, Poller};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailPhase {
    Loading,
    Loaded,
    Error,
}

/// Read-only view of one repository: its metrics and recent commits, polled independently.
pub struct RepoDetail {
    pub repo_id: i64,
    metrics_rx: watch::Receiver<PollState<RepoMetrics>>,
    commits_rx: watch::Receiver<PollState<Vec<CommitRecord>>>,
    metrics: PollState<RepoMetrics>,
    commits: PollState<Vec<CommitRecord>>,
    pub scroll: usize,
    cancel: CancellationToken,
}

impl RepoDetail {
    /// Starts both pollers under a child of `parent`; they stop when the detail is dropped.
    pub fn open(
        api: Arc<dyn MetricsApi>,
        repo_id: i64,
        window: Window,
        limit: u32,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self {
        let metrics_api = Arc::clone(&api);
        let metrics = Arc::new(Poller::new("repo-metrics", interval, move || {
            let api = Arc::clone(&metrics_api);
            async move { api.fetch_repo_metrics(repo_id, window).await }
        }));
        let commits = Arc::new(Poller::new("repo-commits", interval, move || {
            let api = Arc::clone(&api);
            async move { api.fetch_repo_commits(repo_id, window, limit).await }
        }));

        let cancel = parent.child_token();
        metrics.spawn(cancel.clone());
        commits.spawn(cancel.clone());

        Self::from_receivers(repo_id, metrics.subscribe(), commits.subscribe(), cancel)
    }

    fn from_receivers(
        repo_id: i64,
        metrics_rx: watch::Receiver<PollState<RepoMetrics>>,
        commits_rx: watch::Receiver<PollState<Vec<CommitRecord>>>,
        cancel: CancellationToken,
    ) -> Self {
        let metrics = metrics_rx.borrow().clone();
        let commits = commits_rx.borrow().clone();
        Self {
            repo_id,
            metrics,
            commits,
            metrics_rx,
            commits_rx,
            scroll: 0,
            cancel,
        }
    }

    /// Pulls whatever the pollers published since the last call. Returns true on change.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        if self.metrics_rx.has_changed().unwrap_or(false) {
            self.metrics = self.metrics_rx.borrow_and_update().clone();
            changed = true;
        }
        if self.commits_rx.has_changed().unwrap_or(false) {
            self.commits = self.commits_rx.borrow_and_update().clone();
            changed = true;
        }
        if changed {
            self.scroll = self.scroll.min(self.commits().len().saturating_sub(1));
        }
        changed
    }

    pub fn phase(&self) -> DetailPhase {
        if self.metrics.data.is_some() && self.commits.data.is_some() {
            DetailPhase::Loaded
        } else if self.metrics.error.is_some() || self.commits.error.is_some() {
            DetailPhase::Error
        } else {
            DetailPhase::Loading
        }
    }

    pub fn metrics(&self) -> Option<&RepoMetrics> {
        self.metrics.data.as_deref()
    }

    /// Commits in the order the API returned them.
    pub fn commits(&self) -> &[CommitRecord] {
        self.commits.data.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.metrics.error.as_ref().or(self.commits.error.as_ref())
    }

    pub fn is_refreshing(&self) -> bool {
        self.metrics.is_validating() || self.commits.is_validating()
    }

    pub fn scroll_down(&mut self) {
        if self.scroll + 1 < self.commits().len() {
            self.scroll += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }
}

impl Drop for RepoDetail {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
