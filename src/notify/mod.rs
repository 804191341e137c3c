//! Alert delivery.
//!
//! The monitor decides *whether* and *what* to report; a `Notifier` decides
//! how. No deduplication happens here: a transition produces at most one call
//! per run by construction.

mod github;
mod logging;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, NotifierKind};

pub use self::github::GithubIssueNotifier;
pub use self::logging::LogNotifier;

/// Pluggable notification backend.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert for a job.
    async fn notify(&self, job_name: &str, target: &str, message: &str) -> Result<()>;
}

/// Build the notifier selected in the configuration.
pub fn from_config(config: &Config) -> Result<Box<dyn Notifier>> {
    match config.notifier.kind {
        NotifierKind::Log => Ok(Box::new(LogNotifier)),
        NotifierKind::Github => Ok(Box::new(GithubIssueNotifier::new(
            &config.notifier,
            &config.monitor,
        )?)),
    }
}
