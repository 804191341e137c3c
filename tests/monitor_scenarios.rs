//! End-to-end runs of the monitor against in-process backends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use sitewatch::detect::{Decision, content_digest};
use sitewatch::error::{AppError, ErrorKind, Result};
use sitewatch::fetch::Fetcher;
use sitewatch::models::{
    FetchedContent, JobSpec, MonitorConfig, Observation, PersistedState, Trigger,
};
use sitewatch::notify::Notifier;
use sitewatch::pipeline::{Monitor, Status};
use sitewatch::storage::{LocalStateStore, MemoryStateStore, StateStore};

/// Serves whatever body was last set for a target; unknown targets fail.
#[derive(Default)]
struct ScriptedFetcher {
    pages: Mutex<HashMap<String, String>>,
}

impl ScriptedFetcher {
    fn serve(&self, target: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(target.to_string(), body.to_string());
    }

    fn take_down(&self, target: &str) {
        self.pages.lock().unwrap().remove(target);
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, target: &str) -> Result<FetchedContent> {
        let body = self.pages.lock().unwrap().get(target).cloned();
        body.map(FetchedContent::new)
            .ok_or_else(|| AppError::fetch(target, "503 Service Unavailable"))
    }
}

/// Records every alert; optionally rejects them all.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    reject: bool,
}

impl RecordingNotifier {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, job_name: &str, _target: &str, message: &str) -> Result<()> {
        if self.reject {
            return Err(AppError::notify("401 Unauthorized"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((job_name.to_string(), message.to_string()));
        Ok(())
    }
}

/// Memory store whose reads or writes fail for one job.
struct FlakyStore {
    inner: MemoryStateStore,
    broken: String,
    fail_reads: bool,
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn get(&self, name: &str) -> Result<Option<PersistedState>> {
        if self.fail_reads && name == self.broken {
            return Err(AppError::store("throttled"));
        }
        self.inner.get(name).await
    }

    async fn put(&self, state: &PersistedState) -> Result<()> {
        if !self.fail_reads && state.name == self.broken {
            return Err(AppError::store("conditional check failed"));
        }
        self.inner.put(state).await
    }
}

struct Harness {
    fetcher: Arc<ScriptedFetcher>,
    store: Arc<MemoryStateStore>,
    notifier: Arc<RecordingNotifier>,
    monitor: Monitor,
}

fn harness() -> Harness {
    harness_with(RecordingNotifier::default())
}

fn harness_with(notifier: RecordingNotifier) -> Harness {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = Arc::new(MemoryStateStore::new());
    let notifier = Arc::new(notifier);
    let monitor = Monitor::new(
        fetcher.clone(),
        store.clone(),
        notifier.clone(),
        MonitorConfig::default(),
    );
    Harness {
        fetcher,
        store,
        notifier,
        monitor,
    }
}

#[tokio::test]
async fn checksum_job_alerts_once_per_change() {
    let h = harness();
    let jobs = [JobSpec::checksum("home", "https://example.com")];

    h.fetcher.serve("https://example.com", "v1");
    let run1 = h.monitor.run(&jobs).await;
    assert_eq!(run1.jobs[0].decision, Some(Decision::FirstObservation));
    assert_eq!(
        h.store.snapshot("home").unwrap().content_digest(),
        Some(content_digest("v1").as_str())
    );
    assert!(h.notifier.sent().is_empty());

    let run2 = h.monitor.run(&jobs).await;
    assert_eq!(run2.jobs[0].decision, Some(Decision::NoChange));
    assert!(h.notifier.sent().is_empty());

    h.fetcher.serve("https://example.com", "v2");
    let run3 = h.monitor.run(&jobs).await;
    assert_eq!(run3.jobs[0].decision, Some(Decision::Changed));
    assert!(run3.jobs[0].notified);
    assert_eq!(run3.change_count(), 1);
    assert_eq!(
        h.store.snapshot("home").unwrap().content_digest(),
        Some(content_digest("v2").as_str())
    );

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "home");
    assert!(sent[0].1.contains(&content_digest("v1")));
    assert!(sent[0].1.contains(&content_digest("v2")));
}

#[tokio::test]
async fn pattern_job_alerts_on_configured_flip_only() {
    let h = harness();
    let jobs = [JobSpec::pattern(
        "tickets",
        "https://tickets.example.com",
        "SOLD OUT",
        Trigger::OnDisappear,
    )];

    h.fetcher
        .serve("https://tickets.example.com", "<h1>Tour</h1><b>SOLD OUT</b>");
    let run1 = h.monitor.run(&jobs).await;
    assert_eq!(run1.jobs[0].decision, Some(Decision::FirstObservation));
    assert_eq!(h.store.snapshot("tickets").unwrap().pattern_present(), Some(true));

    h.fetcher
        .serve("https://tickets.example.com", "<h1>Tour</h1><a>Buy now</a>");
    let run2 = h.monitor.run(&jobs).await;
    assert_eq!(run2.jobs[0].decision, Some(Decision::PatternDisappeared));
    assert_eq!(h.store.snapshot("tickets").unwrap().pattern_present(), Some(false));
    assert_eq!(h.notifier.sent().len(), 1);

    let run3 = h.monitor.run(&jobs).await;
    assert_eq!(run3.jobs[0].decision, Some(Decision::NoChange));

    // Reappearing is the other direction and stays quiet.
    h.fetcher
        .serve("https://tickets.example.com", "<p>SOLD <i>OUT</i></p>");
    let run4 = h.monitor.run(&jobs).await;
    assert_eq!(run4.jobs[0].decision, Some(Decision::NoChange));
    assert_eq!(h.store.snapshot("tickets").unwrap().pattern_present(), Some(true));
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn one_fetch_failure_leaves_other_jobs_and_prior_state_intact() {
    let h = harness();
    let jobs = [
        JobSpec::checksum("a", "https://a.example.com"),
        JobSpec::checksum("b", "https://b.example.com"),
        JobSpec::checksum("c", "https://c.example.com"),
    ];
    for job in &jobs {
        h.fetcher.serve(&job.target, "v1");
    }
    h.monitor.run(&jobs).await;
    let before = h.store.snapshot("b").unwrap();

    h.fetcher.serve("https://a.example.com", "v2");
    h.fetcher.take_down("https://b.example.com");
    h.fetcher.serve("https://c.example.com", "v2");
    let summary = h.monitor.run(&jobs).await;

    assert_eq!(summary.job("a").unwrap().decision, Some(Decision::Changed));
    assert_eq!(summary.job("c").unwrap().decision, Some(Decision::Changed));
    assert_eq!(summary.job("b").unwrap().status(), Status::Error);
    assert_eq!(
        summary.job("b").unwrap().error.as_ref().unwrap().kind,
        ErrorKind::Fetch
    );
    assert_eq!(h.store.snapshot("b").unwrap(), before);
    assert_eq!(h.notifier.sent().len(), 2);
    assert_eq!(summary.error_count(), 1);
}

#[tokio::test]
async fn notify_failure_keeps_new_state() {
    let h = harness_with(RecordingNotifier::rejecting());
    let jobs = [JobSpec::checksum("home", "https://example.com")];

    h.fetcher.serve("https://example.com", "v1");
    h.monitor.run(&jobs).await;
    h.fetcher.serve("https://example.com", "v2");
    let summary = h.monitor.run(&jobs).await;

    let report = &summary.jobs[0];
    assert_eq!(report.decision, Some(Decision::Changed));
    assert!(!report.notified);
    assert_eq!(report.error.as_ref().unwrap().kind, ErrorKind::Notify);
    assert!(summary.has_changes());
    assert_eq!(
        h.store.snapshot("home").unwrap().content_digest(),
        Some(content_digest("v2").as_str())
    );

    // The transition was recorded, so the next run sees no change.
    let next = h.monitor.run(&jobs).await;
    assert_eq!(next.jobs[0].decision, Some(Decision::NoChange));
}

#[tokio::test]
async fn store_write_failure_skips_notification() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(FlakyStore {
        inner: MemoryStateStore::with_records([PersistedState {
            name: "home".into(),
            target: "https://example.com".into(),
            observation: Observation::Checksum {
                content_digest: content_digest("v1"),
            },
            last_checked_at: Utc::now(),
        }]),
        broken: "home".into(),
        fail_reads: false,
    });
    let monitor = Monitor::new(
        fetcher.clone(),
        store.clone(),
        notifier.clone(),
        MonitorConfig::default(),
    );

    fetcher.serve("https://example.com", "v2");
    let summary = monitor
        .run(&[JobSpec::checksum("home", "https://example.com")])
        .await;

    let report = &summary.jobs[0];
    assert_eq!(report.decision, Some(Decision::Changed));
    assert_eq!(report.error.as_ref().unwrap().kind, ErrorKind::Store);
    assert!(notifier.sent().is_empty());
    assert_eq!(
        store.inner.snapshot("home").unwrap().content_digest(),
        Some(content_digest("v1").as_str())
    );
}

#[tokio::test]
async fn store_read_failure_aborts_job_before_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = Arc::new(FlakyStore {
        inner: MemoryStateStore::new(),
        broken: "home".into(),
        fail_reads: true,
    });
    let monitor = Monitor::new(
        fetcher.clone(),
        store.clone(),
        Arc::new(RecordingNotifier::default()),
        MonitorConfig::default(),
    );

    fetcher.serve("https://example.com", "v1");
    fetcher.serve("https://other.example.com", "v1");
    let summary = monitor
        .run(&[
            JobSpec::checksum("home", "https://example.com"),
            JobSpec::checksum("other", "https://other.example.com"),
        ])
        .await;

    let home = summary.job("home").unwrap();
    assert!(home.decision.is_none());
    assert_eq!(home.error.as_ref().unwrap().kind, ErrorKind::Store);
    assert!(store.inner.snapshot("home").is_none());
    assert_eq!(
        summary.job("other").unwrap().decision,
        Some(Decision::FirstObservation)
    );
}

#[tokio::test]
async fn invalid_jobs_fail_alone() {
    let h = harness();
    h.fetcher.serve("https://example.com", "v1");

    let summary = h
        .monitor
        .run(&[
            JobSpec::checksum("home", "https://example.com"),
            JobSpec::pattern("broken", "https://example.com", "[unclosed", Trigger::OnAppear),
            JobSpec::checksum("home", "https://example.com/dup"),
            JobSpec::checksum("nowhere", "not a url"),
        ])
        .await;

    assert_eq!(summary.jobs.len(), 4);
    assert_eq!(summary.jobs[0].decision, Some(Decision::FirstObservation));
    for report in &summary.jobs[1..] {
        assert_eq!(report.error.as_ref().unwrap().kind, ErrorKind::Config);
        assert!(report.decision.is_none());
    }
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn first_observation_of_pattern_that_matches_trigger_is_quiet() {
    let h = harness();
    let jobs = [JobSpec::pattern(
        "restock",
        "https://shop.example.com",
        "(?i)in stock",
        Trigger::OnAppear,
    )];

    h.fetcher.serve("https://shop.example.com", "<span>In Stock</span>");
    let summary = h.monitor.run(&jobs).await;

    assert_eq!(summary.jobs[0].decision, Some(Decision::FirstObservation));
    assert!(!summary.has_changes());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn similar_job_names_keep_their_own_state() {
    let tmp = tempfile::TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = Monitor::new(
        fetcher.clone(),
        Arc::new(LocalStateStore::new(tmp.path())),
        notifier.clone(),
        MonitorConfig::default(),
    );
    let jobs = [
        JobSpec::checksum("shop/a", "https://shop.example.com/a"),
        JobSpec::checksum("shop_a", "https://shop.example.com/b"),
    ];
    fetcher.serve("https://shop.example.com/a", "first page");
    fetcher.serve("https://shop.example.com/b", "second page");

    monitor.run(&jobs).await;
    for _ in 0..2 {
        let summary = monitor.run(&jobs).await;
        assert_eq!(summary.jobs[0].decision, Some(Decision::NoChange));
        assert_eq!(summary.jobs[1].decision, Some(Decision::NoChange));
    }
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn padded_duplicate_name_is_rejected() {
    let h = harness();
    h.fetcher.serve("https://example.com", "v1");
    h.fetcher.serve("https://example.com/other", "v2");

    let summary = h
        .monitor
        .run(&[
            JobSpec::checksum("home", "https://example.com"),
            JobSpec::checksum("home ", "https://example.com/other"),
        ])
        .await;

    assert_eq!(summary.jobs[0].decision, Some(Decision::FirstObservation));
    assert_eq!(summary.jobs[1].error.as_ref().unwrap().kind, ErrorKind::Config);
    assert!(summary.jobs[1].decision.is_none());
    assert!(h.notifier.sent().is_empty());
    assert_eq!(
        h.store.snapshot("home").unwrap().content_digest(),
        Some(content_digest("v1").as_str())
    );
}
