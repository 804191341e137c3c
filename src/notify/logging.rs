// src/notify/logging.rs

//! Log-only notification backend.

use async_trait::async_trait;

use super::Notifier;
use crate::error::Result;

/// Writes alerts to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, job_name: &str, target: &str, message: &str) -> Result<()> {
        log::warn!("ALERT [{}] {}\n{}", job_name, target, message);
        Ok(())
    }
}
