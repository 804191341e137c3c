// src/pipeline/monitor.rs

//! The run orchestrator.
//!
//! Each job goes through the same steps: read prior state, fetch, detect,
//! write the next state, then notify when the decision alerts. Jobs are
//! independent: a failure in one is recorded in its report and never stops
//! the others. State is written before the alert is sent so a retried run
//! cannot alert twice for the same transition.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::detect::{Decision, detect};
use crate::error::{AppError, Result};
use crate::fetch::{self, Fetcher};
use crate::models::{Config, Job, JobSpec, MonitorConfig};
use crate::notify::{self, Notifier};
use crate::pipeline::prepare_jobs;
use crate::pipeline::summary::{JobError, JobReport, RunSummary};
use crate::storage::{self, StateStore};

/// Runs jobs against a fetcher, a state store and a notifier.
pub struct Monitor {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    settings: MonitorConfig,
}

impl Monitor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        settings: MonitorConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            settings,
        }
    }

    /// Build the backends selected in the configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let fetcher: Arc<dyn Fetcher> = Arc::from(fetch::from_config(config)?);
        let store = storage::from_config(&config.store).await?;
        let notifier: Arc<dyn Notifier> = Arc::from(notify::from_config(config)?);

        log::debug!(
            "Monitor backends: fetcher={:?}, store={:?}, notifier={:?}",
            config.fetcher.kind,
            config.store.backend,
            config.notifier.kind
        );

        Ok(Self::new(fetcher, store, notifier, config.monitor.clone()))
    }

    /// Check every job once and report what happened to each.
    ///
    /// Reports come back in the order of `specs`. Jobs still in flight when
    /// the run timeout expires are reported as cancelled.
    pub async fn run(&self, specs: &[JobSpec]) -> RunSummary {
        let started_at = Utc::now();

        let mut reports: Vec<Option<JobReport>> = Vec::with_capacity(specs.len());
        let mut jobs = Vec::new();
        for (idx, (spec, prepared)) in specs.iter().zip(prepare_jobs(specs)).enumerate() {
            match prepared {
                Ok(job) => {
                    reports.push(None);
                    jobs.push((idx, job));
                }
                Err(err) => {
                    log::error!("Skipping job {}: {}", spec.name, err);
                    reports.push(Some(JobReport::new(&spec.name, &spec.target).failed(&err)));
                }
            }
        }

        let concurrency = self.settings.max_concurrent.max(1);
        log::info!(
            "Checking {} job(s), up to {} at a time",
            jobs.len(),
            concurrency
        );

        let mut pending = stream::iter(&jobs)
            .map(|(idx, job)| async move { (*idx, self.process(job).await) })
            .buffer_unordered(concurrency);

        let drained = tokio::time::timeout(self.settings.run_timeout(), async {
            while let Some((idx, report)) = pending.next().await {
                reports[idx] = Some(report);
            }
        })
        .await;
        drop(pending);

        if drained.is_err() {
            log::error!(
                "Run timed out after {}s; cancelling unfinished jobs",
                self.settings.run_timeout_secs
            );
        }
        for (idx, job) in &jobs {
            if reports[*idx].is_none() {
                reports[*idx] = Some(JobReport::cancelled(job));
            }
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            jobs: reports.into_iter().flatten().collect(),
        };
        log::info!(
            "Run finished: {} job(s), {} change(s), {} first observation(s), {} unchanged, {} error(s)",
            summary.jobs.len(),
            summary.change_count(),
            summary.first_observation_count(),
            summary.no_change_count(),
            summary.error_count()
        );
        summary
    }

    async fn process(&self, job: &Job) -> JobReport {
        let mut report = JobReport::for_job(job);
        if let Err(err) = self.check(job, &mut report).await {
            log::error!("Job {} failed: {}", job.name, err);
            report.error = Some(JobError::from(&err));
        }
        report
    }

    async fn check(&self, job: &Job, report: &mut JobReport) -> Result<()> {
        log::info!("Checking {} ({})", job.name, job.target);

        let prior = bounded(self.settings.store_timeout(), self.store.get(&job.name), || {
            AppError::store(format!("reading state for '{}' timed out", job.name))
        })
        .await?;

        let content = bounded(
            self.settings.fetch_timeout(),
            self.fetcher.fetch(&job.target),
            || {
                AppError::fetch(
                    &job.target,
                    format!("timed out after {}s", self.settings.fetch_timeout_secs),
                )
            },
        )
        .await?;

        let result = detect(job, prior.as_ref(), &content);
        report.decision = Some(result.decision);
        report.previous = result.previous.clone();
        report.current = Some(result.next_state.observation.clone());
        report.checked_at = Some(result.next_state.last_checked_at);

        bounded(
            self.settings.store_timeout(),
            self.store.put(&result.next_state),
            || AppError::store(format!("writing state for '{}' timed out", job.name)),
        )
        .await?;

        match result.decision {
            Decision::NoChange => log::info!("No change for {}", job.name),
            Decision::FirstObservation => {
                log::info!("First observation for {}, baseline stored", job.name)
            }
            decision => log::warn!("{} for {} ({})", decision, job.name, job.target),
        }

        if let Some(message) = &result.notify_message {
            bounded(
                self.settings.notify_timeout(),
                self.notifier.notify(&job.name, &job.target, message),
                || {
                    AppError::notify(format!(
                        "timed out after {}s",
                        self.settings.notify_timeout_secs
                    ))
                },
            )
            .await?;
            report.notified = true;
        }

        Ok(())
    }
}

/// Await `call`, turning an expired `limit` into the error from `on_timeout`.
async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T>>,
    on_timeout: impl FnOnce() -> AppError,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(on_timeout()))
}
