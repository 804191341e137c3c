// src/pipeline/summary.rs

//! Per-job outcomes and the run summary.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detect::Decision;
use crate::error::{AppError, ErrorKind, Result};
use crate::models::{Job, Observation};
use crate::utils::report;

/// A job-scoped failure.
#[derive(Debug, Clone, Serialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AppError> for JobError {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Coarse outcome of one job, for display and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NoChange,
    FirstObservation,
    Alert,
    Error,
}

/// What happened to one job during a run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub name: String,
    pub target: String,

    /// Set once detection ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Observation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Observation>,

    /// Fetch time of the content behind `current`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,

    /// Whether the notifier accepted the alert
    pub notified: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobReport {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            decision: None,
            previous: None,
            current: None,
            checked_at: None,
            notified: false,
            error: None,
        }
    }

    pub fn for_job(job: &Job) -> Self {
        Self::new(&job.name, &job.target)
    }

    /// Record a failure and return the finished report.
    pub fn failed(mut self, err: &AppError) -> Self {
        self.error = Some(JobError::from(err));
        self
    }

    /// Report for a job the run timed out on.
    pub fn cancelled(job: &Job) -> Self {
        let mut report = Self::for_job(job);
        report.error = Some(JobError {
            kind: ErrorKind::Cancelled,
            message: "run timed out before the job finished".to_string(),
        });
        report
    }

    pub fn status(&self) -> Status {
        if self.error.is_some() {
            return Status::Error;
        }
        match self.decision {
            Some(decision) if decision.is_alert() => Status::Alert,
            Some(Decision::FirstObservation) => Status::FirstObservation,
            _ => Status::NoChange,
        }
    }

    /// Whether a notifiable transition was detected, delivered or not.
    pub fn is_change(&self) -> bool {
        self.decision.is_some_and(Decision::is_alert)
    }

    fn describe(&self) -> String {
        match (&self.error, self.decision) {
            (Some(err), Some(decision)) => format!("{decision}, {} error: {}", err.kind, err.message),
            (Some(err), None) => format!("{} error: {}", err.kind, err.message),
            (None, Some(decision)) if decision.is_alert() => format!("{decision}, alert sent"),
            (None, Some(decision)) => decision.to_string(),
            (None, None) => "not checked".to_string(),
        }
    }
}

/// Outcome of one run across all jobs.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub jobs: Vec<JobReport>,
}

impl RunSummary {
    fn count(&self, status: Status) -> usize {
        self.jobs.iter().filter(|j| j.status() == status).count()
    }

    /// Jobs with a detected transition.
    pub fn changes(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|j| j.is_change())
    }

    pub fn change_count(&self) -> usize {
        self.changes().count()
    }

    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.count(Status::Error)
    }

    pub fn first_observation_count(&self) -> usize {
        self.count(Status::FirstObservation)
    }

    pub fn no_change_count(&self) -> usize {
        self.count(Status::NoChange)
    }

    /// Report for a job by name.
    pub fn job(&self, name: &str) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Print the summary block to the console.
    pub fn print(&self) {
        report::header("Website Change Monitor Results");
        for job in &self.jobs {
            report::sub_item(&format!("{}: {}", job.name, job.describe()));
        }
        report::summary(
            "Run complete",
            &[
                ("Jobs", self.jobs.len().to_string()),
                ("Changes", self.change_count().to_string()),
                ("First observations", self.first_observation_count().to_string()),
                ("Unchanged", self.no_change_count().to_string()),
                ("Errors", self.error_count().to_string()),
                (
                    "Duration",
                    format!(
                        "{}ms",
                        (self.finished_at - self.started_at).num_milliseconds()
                    ),
                ),
            ],
        );
    }

    /// Markdown report for a CI step summary.
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Website Change Monitor Results\n\n");

        if self.has_changes() {
            let _ = writeln!(md, "## 🔔 {} Change(s) Detected\n", self.change_count());
            for job in self.changes() {
                let _ = writeln!(md, "### {}", job.name);
                let _ = writeln!(md, "- **URL**: {}", job.target);
                if let Some(decision) = job.decision {
                    let _ = writeln!(md, "- **Decision**: {decision}");
                }
                match (&job.previous, &job.current) {
                    (
                        Some(Observation::Checksum { content_digest: old }),
                        Some(Observation::Checksum { content_digest: new }),
                    ) => {
                        let _ = writeln!(md, "- **Old Checksum**: `{old}`");
                        let _ = writeln!(md, "- **New Checksum**: `{new}`");
                    }
                    (_, Some(Observation::Pattern { pattern_present })) => {
                        let _ = writeln!(md, "- **Pattern Present**: {pattern_present}");
                    }
                    _ => {}
                }
                let _ = writeln!(md, "- **Notified**: {}", if job.notified { "yes" } else { "no" });
                let detected_at = job.checked_at.unwrap_or(self.finished_at);
                let _ = writeln!(md, "- **Detected At**: {}\n", detected_at.to_rfc3339());
            }
        } else {
            md.push_str("## ✅ No Changes Detected\n\n");
            md.push_str("All monitored websites remain unchanged.\n");
        }

        let failed: Vec<_> = self.jobs.iter().filter_map(|j| j.error.as_ref().map(|e| (j, e))).collect();
        if !failed.is_empty() {
            let _ = writeln!(md, "\n## ⚠️ {} Job(s) Failed\n", failed.len());
            for (job, err) in failed {
                let _ = writeln!(md, "- **{}** ({}): {}", job.name, err.kind, err.message);
            }
        }

        md
    }

    /// `key=value` lines for a CI step output file.
    pub fn output_lines(&self) -> String {
        format!(
            "changes_detected={}\nhas_changes={}\n",
            self.change_count(),
            self.has_changes()
        )
    }

    /// Append the Markdown report and output variables to the files named by
    /// `GITHUB_STEP_SUMMARY` and `GITHUB_OUTPUT`, when set.
    pub fn write_ci_reports(&self) -> Result<()> {
        if let Ok(path) = std::env::var("GITHUB_STEP_SUMMARY") {
            append(Path::new(&path), &self.to_markdown())?;
        }
        if let Ok(path) = std::env::var("GITHUB_OUTPUT") {
            append(Path::new(&path), &self.output_lines())?;
        }
        Ok(())
    }
}

fn append(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, decision: Option<Decision>) -> JobReport {
        let mut report = JobReport::new(name, format!("https://example.com/{name}"));
        report.decision = decision;
        report
    }

    fn summary(jobs: Vec<JobReport>) -> RunSummary {
        let now = Utc::now();
        RunSummary {
            started_at: now,
            finished_at: now,
            jobs,
        }
    }

    #[test]
    fn test_counts() {
        let mut failed = report("broken", None);
        failed.error = Some(JobError {
            kind: ErrorKind::Fetch,
            message: "timed out".into(),
        });
        let mut undelivered = report("noisy", Some(Decision::Changed));
        undelivered.error = Some(JobError {
            kind: ErrorKind::Notify,
            message: "401".into(),
        });

        let summary = summary(vec![
            report("a", Some(Decision::NoChange)),
            report("b", Some(Decision::FirstObservation)),
            report("c", Some(Decision::PatternDisappeared)),
            failed,
            undelivered,
        ]);

        assert_eq!(summary.change_count(), 2);
        assert_eq!(summary.error_count(), 2);
        assert_eq!(summary.first_observation_count(), 1);
        assert_eq!(summary.no_change_count(), 1);
        assert_eq!(summary.job("c").unwrap().status(), Status::Alert);
        assert_eq!(summary.output_lines(), "changes_detected=2\nhas_changes=true\n");
    }

    #[test]
    fn test_markdown_lists_digests_and_failures() {
        let mut changed = report("home", Some(Decision::Changed));
        changed.previous = Some(Observation::Checksum {
            content_digest: "old".into(),
        });
        changed.current = Some(Observation::Checksum {
            content_digest: "new".into(),
        });
        changed.notified = true;
        changed.checked_at = Some("2026-03-01T10:00:00Z".parse().unwrap());
        let failed = report("shop", None).failed(&AppError::fetch("https://shop", "503"));

        let md = summary(vec![changed, failed]).to_markdown();
        assert!(md.contains("## 🔔 1 Change(s) Detected"));
        assert!(md.contains("- **Old Checksum**: `old`"));
        assert!(md.contains("- **New Checksum**: `new`"));
        assert!(md.contains("- **Detected At**: 2026-03-01T10:00:00+00:00"));
        assert!(md.contains("## ⚠️ 1 Job(s) Failed"));
        assert!(md.contains("**shop** (fetch)"));
    }

    #[test]
    fn test_markdown_without_changes() {
        let md = summary(vec![report("a", Some(Decision::NoChange))]).to_markdown();
        assert!(md.contains("No Changes Detected"));
        assert!(!md.contains("Failed"));
    }

    #[test]
    fn test_append_creates_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.txt");
        append(&path, "a=1\n").unwrap();
        append(&path, "b=2\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a=1\nb=2\n");
    }
}
