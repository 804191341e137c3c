//! AWS S3 storage implementation.
//!
//! Each job's record lives at `{bucket}/{prefix}/state/{job}.json`. S3 gives
//! strong read-after-write consistency per key, which is all the monitor
//! relies on.

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::PersistedState;
use crate::storage::{StateStore, key_for, record_for};

/// S3-based state storage.
#[derive(Clone)]
pub struct S3StateStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3StateStore {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Create S3 storage using the default AWS credential chain.
    pub async fn from_env(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket, prefix)
    }

    fn key(&self, name: &str) -> String {
        object_key(&self.prefix, name)
    }

    /// Read an object, returning None if the key does not exist.
    pub async fn read_bytes_optional(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::store(format!("reading s3://{}/{key}: {e}", self.bucket)))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::debug!("No object at s3://{}/{}", self.bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::store(format!(
                        "reading s3://{}/{key}: {service_err}",
                        self.bucket
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl StateStore for S3StateStore {
    async fn get(&self, name: &str) -> Result<Option<PersistedState>> {
        let key = self.key(name);
        match self.read_bytes_optional(&key).await? {
            Some(bytes) => {
                let state = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::store(format!("corrupt record s3://{}/{key}: {e}", self.bucket))
                })?;
                Ok(record_for(name, state))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, state: &PersistedState) -> Result<()> {
        let key = self.key(&state.name);
        let json = serde_json::to_vec_pretty(state)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(json))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| {
                AppError::store(format!(
                    "writing s3://{}/{key}: {}",
                    self.bucket,
                    e.into_service_error()
                ))
            })?;

        log::debug!("Wrote state for {} to s3://{}/{}", state.name, self.bucket, key);
        Ok(())
    }
}

/// Object key for a job's record under `prefix`.
fn object_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("state/{}.json", key_for(name))
    } else {
        format!("{}/state/{}.json", prefix, key_for(name))
    }
}
