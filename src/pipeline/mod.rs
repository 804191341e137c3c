//! Run orchestration.
//!
//! - `Monitor`: runs every job through read, fetch, detect, write, notify
//! - `RunSummary`: what happened to each job
//! - `prepare_jobs` / `select_jobs`: job list validation and filtering

pub mod monitor;
pub mod summary;

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{Job, JobSpec};

pub use monitor::Monitor;
pub use summary::{JobError, JobReport, RunSummary, Status};

/// Validate job definitions, one result per spec in input order.
///
/// A spec that fails validation, or whose validated name was already taken
/// by an earlier spec, becomes a configuration error for that entry only.
pub fn prepare_jobs(specs: &[JobSpec]) -> Vec<Result<Job>> {
    let mut seen = HashSet::new();
    specs
        .iter()
        .map(|spec| {
            let job = Job::try_from(spec.clone())?;
            if !seen.insert(job.name.clone()) {
                return Err(AppError::config(format!(
                    "duplicate job name '{}'",
                    job.name
                )));
            }
            Ok(job)
        })
        .collect()
}

/// Keep only the specs named in `names`; an empty filter keeps all.
///
/// Unknown names are an error so typos do not silently skip a check.
pub fn select_jobs(specs: &[JobSpec], names: &[String]) -> Result<Vec<JobSpec>> {
    if names.is_empty() {
        return Ok(specs.to_vec());
    }

    let unknown: Vec<&str> = names
        .iter()
        .filter(|name| !specs.iter().any(|s| &s.name == *name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::config(format!(
            "unknown job(s): {}",
            unknown.join(", ")
        )));
    }

    Ok(specs
        .iter()
        .filter(|s| names.contains(&s.name))
        .cloned()
        .collect())
}
