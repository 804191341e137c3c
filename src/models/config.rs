//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::JobSpec;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Concurrency and timeout settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// How pages are fetched
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Where per-job state is persisted
    #[serde(default)]
    pub store: StoreConfig,

    /// Where alerts go
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Monitored pages
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup.
    ///
    /// Numeric values that fail to parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(n) = lookup("MAX_CONCURRENT").and_then(|v| v.parse().ok()) {
            self.monitor.max_concurrent = n;
        }
        if let Some(secs) = lookup("FETCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.monitor.fetch_timeout_secs = secs;
        }
        if let Some(secs) = lookup("RUN_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.monitor.run_timeout_secs = secs;
        }
        if let Some(table) = lookup("DYNAMODB_TABLE_NAME") {
            self.store.table_name = table;
        }
        if let Some(bucket) = lookup("STATE_S3_BUCKET") {
            self.store.bucket = Some(bucket);
        }
        if let Some(prefix) = lookup("STATE_S3_PREFIX") {
            self.store.prefix = prefix;
        }
        if let Some(repo) = lookup("GITHUB_REPOSITORY") {
            self.notifier.repository = Some(repo);
        }
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.notifier.token = Some(token);
        }
        if let Some(url) = lookup("BROWSERLESS_URL") {
            self.fetcher.browserless_url = Some(url);
        }
        if let Some(token) = lookup("BROWSERLESS_TOKEN") {
            self.fetcher.browserless_token = Some(token);
        }
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Job definitions are not checked here; a bad job only fails itself
    /// (see `pipeline::prepare_jobs`).
    pub fn validate(&self) -> Result<()> {
        if self.monitor.user_agent.trim().is_empty() {
            return Err(AppError::config("monitor.user_agent is empty"));
        }
        if self.monitor.max_concurrent == 0 {
            return Err(AppError::config("monitor.max_concurrent must be > 0"));
        }
        for (key, secs) in [
            ("monitor.fetch_timeout_secs", self.monitor.fetch_timeout_secs),
            ("monitor.store_timeout_secs", self.monitor.store_timeout_secs),
            ("monitor.notify_timeout_secs", self.monitor.notify_timeout_secs),
            ("monitor.run_timeout_secs", self.monitor.run_timeout_secs),
        ] {
            if secs == 0 {
                return Err(AppError::config(format!("{key} must be > 0")));
            }
        }
        if self.fetcher.kind == FetcherKind::Browserless && self.fetcher.browserless_url.is_none()
        {
            return Err(AppError::config(
                "fetcher.browserless_url is required for the browserless fetcher",
            ));
        }
        if self.store.backend == StoreBackend::S3 && self.store.bucket.is_none() {
            return Err(AppError::config("store.bucket is required for the s3 backend"));
        }
        if self.notifier.kind == NotifierKind::Github && self.notifier.repository.is_none() {
            return Err(AppError::config(
                "notifier.repository is required for the github notifier",
            ));
        }
        Ok(())
    }
}

/// Concurrency and timeout settings for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Maximum jobs processed at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Timeout for one page fetch
    #[serde(default = "defaults::fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for one state store call
    #[serde(default = "defaults::store_timeout")]
    pub store_timeout_secs: u64,

    /// Timeout for one notification
    #[serde(default = "defaults::notify_timeout")]
    pub notify_timeout_secs: u64,

    /// Timeout for the whole run
    #[serde(default = "defaults::run_timeout")]
    pub run_timeout_secs: u64,
}

impl MonitorConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            max_concurrent: defaults::max_concurrent(),
            fetch_timeout_secs: defaults::fetch_timeout(),
            store_timeout_secs: defaults::store_timeout(),
            notify_timeout_secs: defaults::notify_timeout(),
            run_timeout_secs: defaults::run_timeout(),
        }
    }
}

/// Page fetcher selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetcherKind {
    /// Plain HTTP GET
    #[default]
    Http,
    /// Rendered through a Browserless instance
    Browserless,
}

/// Fetcher settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetcherConfig {
    #[serde(default)]
    pub kind: FetcherKind,

    /// Base URL of the Browserless service
    #[serde(default)]
    pub browserless_url: Option<String>,

    /// Browserless API token
    #[serde(default, skip_serializing)]
    pub browserless_token: Option<String>,
}

/// State store selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// JSON files on the local filesystem
    #[default]
    Local,
    /// JSON objects in an S3 bucket
    S3,
    /// Items in a DynamoDB table
    Dynamodb,
}

/// State store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory for the local backend
    #[serde(default = "defaults::local_dir")]
    pub local_dir: String,

    /// Table for the dynamodb backend
    #[serde(default = "defaults::table_name")]
    pub table_name: String,

    /// Bucket for the s3 backend
    #[serde(default)]
    pub bucket: Option<String>,

    /// Key prefix for the s3 backend
    #[serde(default = "defaults::prefix")]
    pub prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            local_dir: defaults::local_dir(),
            table_name: defaults::table_name(),
            bucket: None,
            prefix: defaults::prefix(),
        }
    }
}

/// Notifier selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    /// Write alerts to the log only
    #[default]
    Log,
    /// Open a GitHub issue per alert
    Github,
}

/// Notifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,

    /// `owner/repo` receiving issues
    #[serde(default)]
    pub repository: Option<String>,

    /// Labels applied to each issue
    #[serde(default = "defaults::labels")]
    pub labels: Vec<String>,

    /// GitHub API base URL
    #[serde(default = "defaults::github_api")]
    pub api_url: String,

    /// GitHub token; usually supplied through `GITHUB_TOKEN`
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::default(),
            repository: None,
            labels: defaults::labels(),
            api_url: defaults::github_api(),
            token: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Monitor defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; sitewatch/0.1)".into()
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn fetch_timeout() -> u64 {
        30
    }
    pub fn store_timeout() -> u64 {
        10
    }
    pub fn notify_timeout() -> u64 {
        15
    }
    pub fn run_timeout() -> u64 {
        600
    }

    // Store defaults
    pub fn local_dir() -> String {
        "storage".into()
    }
    pub fn table_name() -> String {
        "website-change-monitor".into()
    }
    pub fn prefix() -> String {
        "sitewatch".into()
    }

    // Notifier defaults
    pub fn labels() -> Vec<String> {
        vec!["website-change".into()]
    }
    pub fn github_api() -> String {
        "https://api.github.com".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
