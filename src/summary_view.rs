//! Display-state derivation for the summary screen.
//!
//! [`SummaryView`] only stores its inputs: the latest poll state, the manual-refresh
//! flag and the progress-bar settle deadline. Phase, colour, ticker text and progress
//! visibility are all computed from those on demand.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::SummarySnapshot;
use crate::network::ApiError;
use crate::poller::PollState;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(400);

const CONNECTING_TEXT: &str = "Connecting to the metrics API…";
const SYNCING_TEXT: &str = "Syncing commit activity…";
const INGESTING_TEXT: &str = "Ingesting fresh commits from GitHub…";
const ERROR_TEXT: &str = "Metrics API unreachable, retrying on the next tick";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Loading,
    ManualRefreshing,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorVariant {
    Green,
    Amber,
    Mint,
    Red,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayState {
    pub ticker_text: String,
    pub color_variant: ColorVariant,
    pub progress_visible: bool,
}

/// Phase as a pure function of the fetch outcome and the manual flag.
pub fn derive_phase(manual: bool, validating: bool, pending: bool, failed: bool) -> RefreshPhase {
    if manual {
        RefreshPhase::ManualRefreshing
    } else if validating || pending {
        RefreshPhase::Loading
    } else if failed {
        RefreshPhase::Error
    } else {
        RefreshPhase::Idle
    }
}

pub fn summary_ticker(snapshot: &SummarySnapshot) -> String {
    let repos = snapshot.repos_updated_count;
    format!(
        "{} lines updated across {} repo{} in the last {}",
        snapshot.total_lines_updated,
        repos,
        if repos == 1 { "" } else { "s" },
        snapshot.window
    )
}

/// Progress-bar visibility with a cancellable hide deadline.
#[derive(Clone, Copy, Debug)]
struct ProgressGate {
    visible: bool,
    hide_at: Option<Instant>,
}

impl ProgressGate {
    fn show(&mut self) {
        self.visible = true;
        self.hide_at = None;
    }

    fn schedule_hide(&mut self, now: Instant, delay: Duration) {
        if self.visible && self.hide_at.is_none() {
            self.hide_at = Some(now + delay);
        }
    }

    fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.hide_at {
            if now >= deadline {
                self.visible = false;
                self.hide_at = None;
            }
        }
    }
}

pub struct SummaryView {
    poll: PollState<SummarySnapshot>,
    manual: bool,
    progress: ProgressGate,
    settle_delay: Duration,
}

impl SummaryView {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            poll: PollState::default(),
            manual: false,
            progress: ProgressGate {
                visible: true,
                hide_at: None,
            },
            settle_delay,
        }
    }

    pub fn apply_poll(&mut self, poll: PollState<SummarySnapshot>, now: Instant) {
        self.poll = poll;
        self.settle(now);
    }

    pub fn set_manual(&mut self, manual: bool, now: Instant) {
        self.manual = manual;
        self.settle(now);
    }

    /// Advances the settle timer.
    pub fn tick(&mut self, now: Instant) {
        self.progress.tick(now);
    }

    fn settle(&mut self, now: Instant) {
        match self.phase() {
            RefreshPhase::Loading | RefreshPhase::ManualRefreshing => self.progress.show(),
            RefreshPhase::Idle | RefreshPhase::Error => {
                self.progress.schedule_hide(now, self.settle_delay)
            }
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        derive_phase(
            self.manual,
            self.poll.is_validating(),
            self.poll.is_pending(),
            self.poll.error.is_some(),
        )
    }

    pub fn snapshot(&self) -> Option<&Arc<SummarySnapshot>> {
        self.poll.data.as_ref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.poll.error.as_ref()
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn display(&self) -> DisplayState {
        let (ticker_text, color_variant) = match self.phase() {
            RefreshPhase::ManualRefreshing => (INGESTING_TEXT.to_string(), ColorVariant::Amber),
            RefreshPhase::Loading => {
                let text = if self.poll.data.is_some() { SYNCING_TEXT } else { CONNECTING_TEXT };
                (text.to_string(), ColorVariant::Green)
            }
            RefreshPhase::Error => (ERROR_TEXT.to_string(), ColorVariant::Red),
            RefreshPhase::Idle => match &self.poll.data {
                Some(snapshot) => (summary_ticker(snapshot), ColorVariant::Mint),
                None => (CONNECTING_TEXT.to_string(), ColorVariant::Green),
            },
        };
        DisplayState {
            ticker_text,
            color_variant,
            progress_visible: self.progress.visible,
        }
    }
}
