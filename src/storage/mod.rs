//! State storage backends.
//!
//! One record per job name, read once and written once per run. Every backend
//! must give read-after-write consistency for a single key, and a missing key
//! must come back as `Ok(None)` rather than an error.
//!
//! - `LocalStateStore`: JSON file per job, for development and CI caches
//! - `MemoryStateStore`: in-process map, for tests
//! - `S3StateStore`: JSON object per job in a bucket (feature `s3`)
//! - `DynamoStateStore`: item per job in a table (feature `dynamodb`)

pub mod local;
pub mod memory;

#[cfg(feature = "dynamodb")]
pub mod dynamo;
#[cfg(feature = "s3")]
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{PersistedState, StoreBackend, StoreConfig};

// Re-export for convenience
pub use local::LocalStateStore;
pub use memory::MemoryStateStore;

#[cfg(feature = "dynamodb")]
pub use dynamo::DynamoStateStore;
#[cfg(feature = "s3")]
pub use s3::S3StateStore;

/// Trait for per-job state backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the record for `name`, `None` when the job was never checked.
    async fn get(&self, name: &str) -> Result<Option<PersistedState>>;

    /// Replace the record keyed by `state.name` in a single write.
    async fn put(&self, state: &PersistedState) -> Result<()>;
}

/// Build the store selected in the configuration.
///
/// Cloud backends need their cargo feature; selecting one that was not
/// compiled in is a configuration error.
pub async fn from_config(config: &StoreConfig) -> Result<Arc<dyn StateStore>> {
    match config.backend {
        StoreBackend::Local => Ok(Arc::new(LocalStateStore::new(&config.local_dir))),
        #[cfg(feature = "s3")]
        StoreBackend::S3 => {
            let bucket = config
                .bucket
                .clone()
                .ok_or_else(|| AppError::config("store.bucket is required for the s3 backend"))?;
            Ok(Arc::new(S3StateStore::from_env(bucket, &config.prefix).await))
        }
        #[cfg(feature = "dynamodb")]
        StoreBackend::Dynamodb => Ok(Arc::new(
            DynamoStateStore::from_env(&config.table_name).await,
        )),
        #[allow(unreachable_patterns)]
        other => Err(AppError::config(format!(
            "store backend {other:?} is not compiled into this build"
        ))),
    }
}

/// File-safe form of a job name.
///
/// ASCII letters, digits, `-` and `.` pass through; every other byte,
/// `_` included, becomes `_` plus two lowercase hex digits. Distinct names
/// always get distinct keys.
pub(crate) fn key_for(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
            key.push(char::from(byte));
        } else {
            key.push('_');
            key.push_str(&hex::encode([byte]));
        }
    }
    key
}

/// Keep a loaded record only if it belongs to `name`.
pub(crate) fn record_for(name: &str, state: PersistedState) -> Option<PersistedState> {
    if state.name == name {
        Some(state)
    } else {
        log::warn!(
            "Ignoring stored record for '{}' found under the key of '{}'",
            state.name,
            name
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_backend_from_config() {
        let config = StoreConfig {
            local_dir: "target/ignored".into(),
            ..StoreConfig::default()
        };
        assert!(from_config(&config).await.is_ok());
    }

    #[test]
    fn test_key_for() {
        assert_eq!(key_for("home-page.v2"), "home-page.v2");
        assert_eq!(key_for("shop/tickets now"), "shop_2ftickets_20now");
        assert_eq!(key_for("café"), "caf_c3_a9");
    }

    #[test]
    fn test_key_for_keeps_names_apart() {
        let names = ["shop/a", "shop_a", "shop a", "shop_2fa"];
        let keys: std::collections::HashSet<_> = names.iter().map(|n| key_for(n)).collect();
        assert_eq!(keys.len(), names.len());
    }
}
