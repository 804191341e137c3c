//! AWS DynamoDB storage implementation.
//!
//! One item per job, keyed by `jobname`:
//!
//! | attribute         | type | present for    |
//! |-------------------|------|----------------|
//! | `jobname`         | S    | all            |
//! | `url`             | S    | all            |
//! | `checksum`        | S    | checksum jobs  |
//! | `pattern_present` | BOOL | pattern jobs   |
//! | `datetime`        | S    | all (ISO-8601) |
//!
//! Reads are strongly consistent so a write from the previous run is always
//! visible to the next one.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Observation, PersistedState};
use crate::storage::StateStore;

const ATTR_NAME: &str = "jobname";
const ATTR_TARGET: &str = "url";
const ATTR_DIGEST: &str = "checksum";
const ATTR_PRESENT: &str = "pattern_present";
const ATTR_CHECKED_AT: &str = "datetime";

/// DynamoDB-based state storage.
#[derive(Clone)]
pub struct DynamoStateStore {
    client: Client,
    table: String,
}

impl DynamoStateStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Create DynamoDB storage using the default AWS credential chain.
    pub async fn from_env(table: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), table)
    }
}

#[async_trait]
impl StateStore for DynamoStateStore {
    async fn get(&self, name: &str) -> Result<Option<PersistedState>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(ATTR_NAME, AttributeValue::S(name.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                AppError::store(format!(
                    "reading {name} from {}: {}",
                    self.table,
                    e.into_service_error()
                ))
            })?;

        match output.item() {
            Some(item) => state_from_item(item).map(Some),
            None => {
                log::debug!("No item for {} in {}", name, self.table);
                Ok(None)
            }
        }
    }

    async fn put(&self, state: &PersistedState) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item_from_state(state)))
            .send()
            .await
            .map_err(|e| {
                AppError::store(format!(
                    "writing {} to {}: {}",
                    state.name,
                    self.table,
                    e.into_service_error()
                ))
            })?;
        Ok(())
    }
}

fn item_from_state(state: &PersistedState) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::from([
        (ATTR_NAME.to_string(), AttributeValue::S(state.name.clone())),
        (ATTR_TARGET.to_string(), AttributeValue::S(state.target.clone())),
        (
            ATTR_CHECKED_AT.to_string(),
            AttributeValue::S(state.last_checked_at.to_rfc3339()),
        ),
    ]);
    match &state.observation {
        Observation::Checksum { content_digest } => {
            item.insert(
                ATTR_DIGEST.to_string(),
                AttributeValue::S(content_digest.clone()),
            );
        }
        Observation::Pattern { pattern_present } => {
            item.insert(
                ATTR_PRESENT.to_string(),
                AttributeValue::Bool(*pattern_present),
            );
        }
    }
    item
}

fn state_from_item(item: &HashMap<String, AttributeValue>) -> Result<PersistedState> {
    let string_attr = |key: &str| -> Result<String> {
        item.get(key)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| AppError::store(format!("item is missing string attribute '{key}'")))
    };

    let observation = if let Some(present) = item.get(ATTR_PRESENT) {
        let pattern_present = *present
            .as_bool()
            .map_err(|_| AppError::store(format!("'{ATTR_PRESENT}' is not a boolean")))?;
        Observation::Pattern { pattern_present }
    } else {
        Observation::Checksum {
            content_digest: string_attr(ATTR_DIGEST)?,
        }
    };

    Ok(PersistedState {
        name: string_attr(ATTR_NAME)?,
        target: string_attr(ATTR_TARGET)?,
        observation,
        last_checked_at: parse_timestamp(&string_attr(ATTR_CHECKED_AT)?)?,
    })
}

/// Parse RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| AppError::store(format!("invalid timestamp '{s}': {e}")))
}
