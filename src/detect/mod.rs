// src/detect/mod.rs

//! Change detection.
//!
//! A pure function from a job, its prior state and freshly fetched content to
//! a decision plus the state to persist next. Two strategies share the same
//! envelope:
//!
//! - **Checksum**: SHA-256 of the raw body, compared for equality.
//! - **Pattern**: whether a regular expression matches the visible text,
//!   compared as a boolean; only the configured flip direction alerts.
//!
//! A job without prior state is a first observation and never alerts.

pub mod checksum;
pub mod markup;

use std::fmt;

use serde::Serialize;

use crate::models::{Detector, FetchedContent, Job, Observation, PersistedState, Trigger};

pub use checksum::content_digest;
pub use markup::strip_markup;

/// Outcome of comparing fresh content against prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    NoChange,
    Changed,
    PatternAppeared,
    PatternDisappeared,
    FirstObservation,
}

impl Decision {
    /// Whether this decision raises a notification.
    pub fn is_alert(self) -> bool {
        matches!(
            self,
            Decision::Changed | Decision::PatternAppeared | Decision::PatternDisappeared
        )
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::NoChange => "no change",
            Decision::Changed => "changed",
            Decision::PatternAppeared => "pattern appeared",
            Decision::PatternDisappeared => "pattern disappeared",
            Decision::FirstObservation => "first observation",
        };
        f.write_str(s)
    }
}

/// Decision plus the state to write.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub decision: Decision,
    /// Always written, even on `NoChange`
    pub next_state: PersistedState,
    /// Observation of the prior state, when it was comparable
    pub previous: Option<Observation>,
    /// Set only for alerting decisions
    pub notify_message: Option<String>,
}

/// Run detection for one job.
pub fn detect(
    job: &Job,
    prior: Option<&PersistedState>,
    content: &FetchedContent,
) -> DetectionResult {
    // Records for another job, from the other mode or from another digest
    // algorithm are not comparable; start over.
    let previous = prior
        .filter(|state| state.name == job.name)
        .map(|state| &state.observation)
        .filter(|obs| comparable(job, obs));

    let (decision, observation) = match &job.detector {
        Detector::Checksum => {
            let digest = content_digest(&content.raw);
            let decision = match previous {
                None => Decision::FirstObservation,
                Some(Observation::Checksum { content_digest }) if *content_digest == digest => {
                    Decision::NoChange
                }
                Some(_) => Decision::Changed,
            };
            (
                decision,
                Observation::Checksum {
                    content_digest: digest,
                },
            )
        }
        Detector::Pattern { regex, trigger } => {
            let present_now = regex.is_match(&strip_markup(&content.raw));
            let decision = match previous {
                None => Decision::FirstObservation,
                Some(Observation::Pattern { pattern_present }) => {
                    pattern_decision(*pattern_present, present_now, *trigger)
                }
                Some(Observation::Checksum { .. }) => Decision::FirstObservation,
            };
            (
                decision,
                Observation::Pattern {
                    pattern_present: present_now,
                },
            )
        }
    };

    let next_state = PersistedState {
        name: job.name.clone(),
        target: job.target.clone(),
        observation,
        last_checked_at: content.fetched_at,
    };

    let notify_message = decision
        .is_alert()
        .then(|| alert_message(job, decision, previous, &next_state));

    DetectionResult {
        decision,
        next_state,
        previous: previous.cloned(),
        notify_message,
    }
}

fn comparable(job: &Job, observation: &Observation) -> bool {
    match (observation, &job.detector) {
        (Observation::Checksum { content_digest }, Detector::Checksum) => {
            content_digest.len() == checksum::DIGEST_LEN
        }
        (Observation::Pattern { .. }, Detector::Pattern { .. }) => true,
        _ => false,
    }
}

fn pattern_decision(was_present: bool, present_now: bool, trigger: Trigger) -> Decision {
    match (was_present, present_now, trigger) {
        (false, true, Trigger::OnAppear) => Decision::PatternAppeared,
        (true, false, Trigger::OnDisappear) => Decision::PatternDisappeared,
        _ => Decision::NoChange,
    }
}

fn alert_message(
    job: &Job,
    decision: Decision,
    previous: Option<&Observation>,
    next: &PersistedState,
) -> String {
    let mut lines = vec![format!("Change detected for {} ({})", job.name, job.target)];

    match (&next.observation, &job.detector) {
        (Observation::Checksum { content_digest }, _) => {
            if let Some(Observation::Checksum {
                content_digest: old,
            }) = previous
            {
                lines.push(format!("Old checksum: {old}"));
            }
            lines.push(format!("New checksum: {content_digest}"));
        }
        (Observation::Pattern { .. }, Detector::Pattern { regex, trigger }) => {
            let verb = match decision {
                Decision::PatternAppeared => "appeared on",
                _ => "disappeared from",
            };
            lines.push(format!("Pattern `{}` {verb} the page", regex.as_str()));
            lines.push(format!("Trigger: {trigger}"));
        }
        (Observation::Pattern { .. }, Detector::Checksum) => {}
    }

    lines.push(format!("Detected at: {}", next.last_checked_at.to_rfc3339()));
    lines.join("\n")
}
