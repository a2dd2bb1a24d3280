use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::models::{Difficulty, ProgressScope};

const APP_DIR: &str = "qtrack";
const DEFAULT_DB_NAME: &str = "qtrack.db";
const DEFAULT_LOG_NAME: &str = "qtrack.log";

pub const DEFAULT_API_URL: &str = "https://node.codolio.com/api/question-tracker/v1";
pub const DEFAULT_SHEET: &str = "striver-sde-sheet";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_base_url: String,
    pub sheet_slug: String,
    pub progress_scope: ProgressScope,
    pub difficulty_fallback: Difficulty,
    pub timeout: Duration,
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Where the terminal UI sends its log lines.
pub fn default_log_path() -> PathBuf {
    app_dir().join(DEFAULT_LOG_NAME)
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves every field through `lookup`. Unparseable values are logged
    /// and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let dir = app_dir();

        let progress_scope = match var("QTRACK_PROGRESS_SCOPE") {
            Some(raw) => ProgressScope::from_str(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unknown QTRACK_PROGRESS_SCOPE, using direct");
                ProgressScope::Direct
            }),
            None => ProgressScope::Direct,
        };

        let difficulty_fallback = match var("QTRACK_DIFFICULTY_FALLBACK") {
            Some(raw) => Difficulty::from_str(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unknown QTRACK_DIFFICULTY_FALLBACK, using medium");
                Difficulty::Medium
            }),
            None => Difficulty::Medium,
        };

        let timeout_secs = match var("QTRACK_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "invalid QTRACK_TIMEOUT_SECS, using default");
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            db_path: var("QTRACK_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| dir.join(DEFAULT_DB_NAME)),
            api_base_url: var("QTRACK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            sheet_slug: var("QTRACK_SHEET").unwrap_or_else(|| DEFAULT_SHEET.to_string()),
            progress_scope,
            difficulty_fallback,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_db_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.db_path = path;
        }
        self
    }
}
