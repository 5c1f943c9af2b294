use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::models::Window;
use crate::summary_view::DEFAULT_SETTLE_DELAY;

const BLUEPRINT: &str = include_str!("../habitdash.toml");

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8081";
pub const MAX_COMMIT_LIMIT: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TickerStyle {
    #[default]
    Marquee,
    Static,
}

impl TickerStyle {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => TickerStyle::Static,
            _ => TickerStyle::Marquee,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base: String,
    pub window: String,
    pub poll_interval_secs: u64,
    pub detail_poll_interval_secs: u64,
    pub settle_delay_ms: u64,
    pub commit_limit: u32,
    pub request_timeout_secs: u64,
    pub ticker_style: String,
    pub log_file: Option<String>,
}

impl Settings {
    /// Loads defaults, the user config, `./habitdash.toml` and `HABITDASH_*` variables,
    /// later sources overriding earlier ones.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_from(get_user_config_path().as_deref(), Some(Path::new("habitdash.toml")))
    }

    pub fn load_from(user: Option<&Path>, local: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("api_base", DEFAULT_API_BASE)?
            .set_default("window", "24h")?
            .set_default("poll_interval_secs", 15_i64)?
            .set_default("detail_poll_interval_secs", 20_i64)?
            .set_default("settle_delay_ms", DEFAULT_SETTLE_DELAY.as_millis() as i64)?
            .set_default("commit_limit", 100_i64)?
            .set_default("request_timeout_secs", 10_i64)?
            .set_default("ticker_style", "marquee")?;

        if let Some(path) = user {
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        }
        if let Some(path) = local {
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        }

        let s = builder
            .add_source(Environment::with_prefix("HABITDASH").try_parsing(true))
            .build()?;

        s.try_deserialize()
    }

    pub fn window(&self) -> Window {
        Window::parse(&self.window)
    }

    pub fn ticker_style(&self) -> TickerStyle {
        TickerStyle::parse(&self.ticker_style)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn detail_poll_interval(&self) -> Duration {
        Duration::from_secs(self.detail_poll_interval_secs.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The server rejects limits outside `1..=1000`.
    pub fn commit_limit(&self) -> u32 {
        self.commit_limit.clamp(1, MAX_COMMIT_LIMIT)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.log_file {
            Some(raw) => Some(PathBuf::from(shellexpand::tilde(raw).into_owned())),
            None => get_user_config_dir().map(|dir| dir.join("habitdash.log")),
        }
    }
}

pub fn get_user_config_dir() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".config");
    path.push("habitdash");
    Some(path)
}

pub fn get_user_config_path() -> Option<PathBuf> {
    get_user_config_dir().map(|dir| dir.join("habitdash.toml"))
}

/// Seeds the user config from the blueprint on first run. Needs logging to be up,
/// since failure is only reported there.
pub fn seed_user_config() {
    if let Some(path) = get_user_config_path() {
        seed_user_config_at(&path);
    }
}

fn seed_user_config_at(path: &Path) -> bool {
    match ensure_user_config(path) {
        Ok(created) => {
            if created {
                info!(path = %path.display(), "created user config");
            }
            created
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not create user config");
            false
        }
    }
}

/// Writes the bundled blueprint to `path` unless a file is already there.
pub fn ensure_user_config(path: &Path) -> Result<bool, anyhow::Error> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, BLUEPRINT)?;
    Ok(true)
}
