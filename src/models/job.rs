// src/models/job.rs

//! Job definitions and their validated form.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Detection strategy for a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Compare a SHA-256 digest of the whole page
    #[default]
    Checksum,
    /// Compare whether a regular expression matches the page text
    Pattern,
}

/// Which presence flip of a pattern raises an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    OnAppear,
    #[default]
    OnDisappear,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::OnAppear => f.write_str("on_appear"),
            Trigger::OnDisappear => f.write_str("on_disappear"),
        }
    }
}

/// A monitored page as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSpec {
    /// Unique job name, also the state store key
    #[serde(alias = "jobname")]
    pub name: String,

    /// URL handed to the fetcher
    #[serde(alias = "url")]
    pub target: String,

    /// Detection strategy
    #[serde(default)]
    pub mode: DetectionMode,

    /// Regular expression (pattern mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Alerting direction (pattern mode only)
    #[serde(default)]
    pub trigger: Trigger,
}

impl JobSpec {
    /// Checksum job for `target`.
    pub fn checksum(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            mode: DetectionMode::Checksum,
            pattern: None,
            trigger: Trigger::default(),
        }
    }

    /// Pattern job for `target`.
    pub fn pattern(
        name: impl Into<String>,
        target: impl Into<String>,
        pattern: impl Into<String>,
        trigger: Trigger,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            mode: DetectionMode::Pattern,
            pattern: Some(pattern.into()),
            trigger,
        }
    }
}

/// Detection strategy with its pattern compiled.
#[derive(Debug, Clone)]
pub enum Detector {
    Checksum,
    Pattern { regex: Regex, trigger: Trigger },
}

impl Detector {
    pub fn mode(&self) -> DetectionMode {
        match self {
            Detector::Checksum => DetectionMode::Checksum,
            Detector::Pattern { .. } => DetectionMode::Pattern,
        }
    }
}

/// A validated job, ready for detection.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub target: String,
    pub detector: Detector,
}

impl TryFrom<JobSpec> for Job {
    type Error = AppError;

    fn try_from(spec: JobSpec) -> Result<Self> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(AppError::config("job name is empty"));
        }

        let target = spec.target.trim();
        if target.is_empty() {
            return Err(AppError::config(format!("job '{name}' has an empty target")));
        }
        url::Url::parse(target).map_err(|e| {
            AppError::config(format!("job '{name}' has an invalid target '{target}': {e}"))
        })?;

        let detector = match spec.mode {
            DetectionMode::Checksum => Detector::Checksum,
            DetectionMode::Pattern => {
                let pattern = spec
                    .pattern
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| {
                        AppError::config(format!("pattern job '{name}' has no pattern"))
                    })?;
                let regex = Regex::new(pattern).map_err(|e| {
                    AppError::config(format!("job '{name}' has an invalid pattern: {e}"))
                })?;
                Detector::Pattern {
                    regex,
                    trigger: spec.trigger,
                }
            }
        };

        Ok(Self {
            name: name.to_string(),
            target: target.to_string(),
            detector,
        })
    }
}
