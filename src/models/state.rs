// src/models/state.rs

//! Persisted per-job state and fetched page content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DetectionMode;

/// What the last run observed, per detection mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    Checksum { content_digest: String },
    Pattern { pattern_present: bool },
}

impl Observation {
    pub fn mode(&self) -> DetectionMode {
        match self {
            Observation::Checksum { .. } => DetectionMode::Checksum,
            Observation::Pattern { .. } => DetectionMode::Pattern,
        }
    }
}

/// State record stored under the job name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Job name (store key)
    pub name: String,

    /// Last-seen target, kept for auditing
    pub target: String,

    #[serde(flatten)]
    pub observation: Observation,

    /// Time of the check that produced this record
    pub last_checked_at: DateTime<Utc>,
}

impl PersistedState {
    /// Stored digest, if this is a checksum record.
    pub fn content_digest(&self) -> Option<&str> {
        match &self.observation {
            Observation::Checksum { content_digest } => Some(content_digest),
            Observation::Pattern { .. } => None,
        }
    }

    /// Stored presence flag, if this is a pattern record.
    pub fn pattern_present(&self) -> Option<bool> {
        match self.observation {
            Observation::Pattern { pattern_present } => Some(pattern_present),
            Observation::Checksum { .. } => None,
        }
    }
}

/// Page body returned by a fetcher.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub raw: String,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedContent {
    /// Content fetched now.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            fetched_at: Utc::now(),
        }
    }
}
