use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Settings, TickerStyle};
use crate::detail::RepoDetail;
use crate::models::{RepoSummary, Screen, SummarySnapshot, Window};
use crate::network::MetricsApi;
use crate::poller::{PollState, Poller};
use crate::refresh::{IngestTrigger, RefreshOutcome};
use crate::summary_view::SummaryView;
use crate::utils::clamp_selection;

pub struct AppOptions {
    pub window: Window,
    pub poll_interval: Duration,
    pub detail_poll_interval: Duration,
    pub settle_delay: Duration,
    pub commit_limit: u32,
    pub ticker_style: TickerStyle,
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            window: settings.window(),
            poll_interval: settings.poll_interval(),
            detail_poll_interval: settings.detail_poll_interval(),
            settle_delay: settings.settle_delay(),
            commit_limit: settings.commit_limit(),
            ticker_style: settings.ticker_style(),
        }
    }
}

/// Wakes the UI loop when the summary poll or the manual flag changes, so states
/// shorter than a frame still reach the view.
pub struct StateChanges {
    summary: watch::Receiver<PollState<SummarySnapshot>>,
    manual: watch::Receiver<bool>,
}

impl StateChanges {
    pub async fn changed(&mut self) {
        tokio::select! {
            Ok(()) = self.summary.changed() => {}
            Ok(()) = self.manual.changed() => {}
            else => std::future::pending::<()>().await,
        }
    }
}

/// Everything the UI loop owns. Network work publishes into watch channels; `on_tick`
/// folds those updates into the views on the loop's own thread.
pub struct App {
    pub screen: Screen,
    pub summary: SummaryView,
    pub detail: Option<RepoDetail>,
    pub selected_repo: usize,
    pub frame: u64,
    pub window: Window,
    pub ticker_style: TickerStyle,
    options: AppOptions,
    api: Arc<dyn MetricsApi>,
    poller: Arc<Poller<SummarySnapshot>>,
    summary_rx: watch::Receiver<PollState<SummarySnapshot>>,
    manual_rx: watch::Receiver<bool>,
    trigger: Arc<IngestTrigger>,
    cancel: CancellationToken,
}

impl App {
    pub fn new(api: Arc<dyn MetricsApi>, options: AppOptions) -> Self {
        let window = options.window;
        let fetch_api = Arc::clone(&api);
        let poller = Arc::new(Poller::new("summary", options.poll_interval, move || {
            let api = Arc::clone(&fetch_api);
            async move { api.fetch_summary(window).await }
        }));
        let trigger = Arc::new(IngestTrigger::new(Arc::clone(&api), Arc::clone(&poller)));

        Self {
            screen: Screen::Summary,
            summary: SummaryView::new(options.settle_delay),
            detail: None,
            selected_repo: 0,
            frame: 0,
            window,
            ticker_style: options.ticker_style,
            summary_rx: poller.subscribe(),
            manual_rx: trigger.flag().subscribe(),
            options,
            api,
            poller,
            trigger,
            cancel: CancellationToken::new(),
        }
    }

    /// Starts the scheduled summary polling.
    pub fn start(&self) -> JoinHandle<()> {
        info!(window = %self.window, interval = ?self.poller.interval(), "summary polling started");
        self.poller.spawn(self.cancel.child_token())
    }

    pub fn changes(&self) -> StateChanges {
        StateChanges {
            summary: self.summary_rx.clone(),
            manual: self.manual_rx.clone(),
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.frame = self.frame.wrapping_add(1);
        self.sync(now);
        self.summary.tick(now);
        if let Some(detail) = self.detail.as_mut() {
            detail.sync();
        }
    }

    /// Applies any published poll or flag changes to the summary view.
    pub fn sync(&mut self, now: Instant) {
        if self.summary_rx.has_changed().unwrap_or(false) {
            let state = self.summary_rx.borrow_and_update().clone();
            self.summary.apply_poll(state, now);
            self.selected_repo = clamp_selection(self.selected_repo, self.repos().len());
        }
        if self.manual_rx.has_changed().unwrap_or(false) {
            let manual = *self.manual_rx.borrow_and_update();
            self.summary.set_manual(manual, now);
        }
    }

    pub fn repos(&self) -> &[RepoSummary] {
        self.summary
            .snapshot()
            .map(|s| s.per_repo.as_slice())
            .unwrap_or(&[])
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.trigger.flag().is_set()
    }

    /// Kicks off a manual ingestion. Returns false, doing nothing, while one is in flight.
    pub fn refresh_now(&self) -> bool {
        if self.refresh_in_flight() {
            return false;
        }
        let trigger = Arc::clone(&self.trigger);
        tokio::spawn(async move {
            match trigger.refresh_now().await {
                RefreshOutcome::Completed {
                    ingest_error: None,
                    revalidate_error: None,
                } => info!("manual refresh finished"),
                RefreshOutcome::Completed {
                    ingest_error,
                    revalidate_error,
                } => warn!(?ingest_error, ?revalidate_error, "manual refresh finished with errors"),
                RefreshOutcome::AlreadyRunning => {}
            }
        });
        true
    }

    pub fn select_next(&mut self) {
        let len = self.repos().len();
        if len > 0 {
            self.selected_repo = (self.selected_repo + 1) % len;
        }
    }

    pub fn select_prev(&mut self) {
        let len = self.repos().len();
        if len > 0 {
            self.selected_repo = if self.selected_repo == 0 { len - 1 } else { self.selected_repo - 1 };
        }
    }

    pub fn open_selected(&mut self) {
        if let Some(repo_id) = self.repos().get(self.selected_repo).map(|r| r.id) {
            self.open_repo(repo_id);
        }
    }

    pub fn open_repo(&mut self, repo_id: i64) {
        info!(repo_id, "opening repo detail");
        // Replacing the previous detail drops it, which stops its pollers.
        self.detail = Some(RepoDetail::open(
            Arc::clone(&self.api),
            repo_id,
            self.window,
            self.options.commit_limit,
            self.options.detail_poll_interval,
            &self.cancel,
        ));
        self.screen = Screen::Detail;
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
        self.screen = Screen::Summary;
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngestReceipt, RepoSummary};
    use crate::network::mock::{MockApi, failure, summary};
    use crate::summary_view::{ColorVariant, RefreshPhase};

    fn options() -> AppOptions {
        AppOptions {
            window: Window::Day,
            poll_interval: Duration::from_secs(60),
            detail_poll_interval: Duration::from_secs(60),
            settle_delay: Duration::from_millis(400),
            commit_limit: 100,
            ticker_style: TickerStyle::Static,
        }
    }

    fn with_repos(lines: u64) -> SummarySnapshot {
        let mut snapshot = summary(lines, 2);
        snapshot.per_repo = vec![
            RepoSummary { id: 7, full_name: "me/seven".into(), commits_count: 4, is_private: false },
            RepoSummary { id: 3, full_name: "me/three".into(), commits_count: 1, is_private: true },
        ];
        snapshot
    }

    async fn tick_until(app: &mut App, done: impl Fn(&App) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                app.on_tick(Instant::now());
                if done(app) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition never reached");
    }

    #[tokio::test]
    async fn first_poll_fills_summary() {
        let api = Arc::new(MockApi::new());
        api.push_summary(Ok(with_repos(340)));
        let mut app = App::new(api, options());
        assert_eq!(app.summary.phase(), RefreshPhase::Loading);

        let _polling = app.start();
        tick_until(&mut app, |app| app.summary.phase() == RefreshPhase::Idle).await;
        assert_eq!(app.summary.snapshot().unwrap().total_lines_updated, 340);
        assert_eq!(app.repos().len(), 2);
        app.shutdown();
    }

    #[tokio::test]
    async fn refresh_now_is_inert_while_in_flight() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let api = Arc::new(MockApi::with_ingest_gate(Arc::clone(&gate)));
        api.push_ingest(Ok(IngestReceipt::default()))
            .push_summary(Ok(with_repos(12)));
        let mut app = App::new(Arc::clone(&api) as Arc<dyn MetricsApi>, options());

        assert!(app.refresh_now());
        tick_until(&mut app, |app| app.summary.is_manual()).await;
        assert_eq!(app.summary.display().color_variant, ColorVariant::Amber);
        assert!(!app.refresh_now());

        gate.notify_one();
        tick_until(&mut app, |app| !app.summary.is_manual()).await;
        assert_eq!(api.calls(), vec!["ingest", "ingest-done", "summary"]);
        assert_eq!(app.summary.snapshot().unwrap().total_lines_updated, 12);
    }

    #[tokio::test]
    async fn failed_ingest_still_revalidates() {
        let api = Arc::new(MockApi::new());
        api.push_ingest(Err(failure("/admin/ingest")))
            .push_summary(Ok(with_repos(5)));
        let mut app = App::new(Arc::clone(&api) as Arc<dyn MetricsApi>, options());

        assert!(app.refresh_now());
        tick_until(&mut app, |app| app.summary.snapshot().is_some() && !app.refresh_in_flight()).await;
        app.on_tick(Instant::now());
        assert!(!app.summary.is_manual());
        assert_eq!(app.summary.display().color_variant, ColorVariant::Mint);
    }

    #[tokio::test]
    async fn selection_wraps_and_opens_detail() {
        let api = Arc::new(MockApi::new());
        api.push_summary(Ok(with_repos(1)));
        let mut app = App::new(api, options());
        let _polling = app.start();
        tick_until(&mut app, |app| !app.repos().is_empty()).await;

        app.select_prev();
        assert_eq!(app.selected_repo, 1);
        app.select_next();
        assert_eq!(app.selected_repo, 0);

        app.open_selected();
        assert!(app.screen == Screen::Detail);
        assert_eq!(app.detail.as_ref().unwrap().repo_id, 7);

        app.close_detail();
        assert!(app.screen == Screen::Summary);
        assert!(app.detail.is_none());
    }

    #[tokio::test]
    async fn changes_wake_before_the_next_frame() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let api = Arc::new(MockApi::with_ingest_gate(Arc::clone(&gate)));
        api.push_ingest(Ok(IngestReceipt::default()))
            .push_summary(Ok(with_repos(9)));
        let mut app = App::new(Arc::clone(&api) as Arc<dyn MetricsApi>, options());
        let mut changes = app.changes();

        assert!(app.refresh_now());
        tokio::time::timeout(Duration::from_secs(5), changes.changed())
            .await
            .expect("no wake-up for the manual flag");
        app.sync(Instant::now());
        assert!(app.summary.is_manual());
        assert!(app.summary.display().progress_visible);

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), async {
            while app.summary.snapshot().is_none() || app.summary.is_manual() {
                changes.changed().await;
                app.sync(Instant::now());
            }
        })
        .await
        .expect("refresh never landed");
        assert_eq!(app.summary.snapshot().unwrap().total_lines_updated, 9);
    }
}
