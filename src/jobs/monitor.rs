//! # Job Monitor
//!
//! Owns the raw jobs collection, the projection inputs and the selection, and
//! keeps the collection fresh with a fixed-interval poll.
//!
//! Mounting fetches immediately and arms a repeating timer. Ticks and manual
//! refreshes may overlap; each request carries a generation number drawn from a
//! monotonically increasing counter, and a response is applied only if it is
//! newer than the one currently applied and the monitor is still mounted.
//! Failures leave the collection untouched, raise a short-lived notice and
//! never stop the timer. Unmounting cancels the timer and waits for its task,
//! after which no further fetch is issued.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use metrics::{counter, histogram};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use super::selection::Selection;
use super::source::JobSource;
use super::view::{JobQuery, SortField, SortOrder, StatusFilter, project};
use crate::config::AppConfig;
use crate::error::ClientError;
use crate::models::{Job, JobStats};
use crate::notify::{Notice, NoticeLevel, Notices};
use crate::telemetry::{
    POLL_FAILURES_TOTAL, POLL_LATENCY_MS, POLL_REQUESTS_TOTAL, POLL_STALE_RESPONSES_TOTAL,
};

/// Settings applied when a monitor is mounted.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Delay between poll ticks
    pub interval: Duration,
    /// Lifetime of a notice
    pub notice_ttl: Duration,
    /// Initial projection inputs
    pub query: JobQuery,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            notice_ttl: Duration::from_secs(3),
            query: JobQuery::default(),
        }
    }
}

impl MonitorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: config.polling.interval(),
            notice_ttl: config.notice_ttl(),
            query: JobQuery::default(),
        }
    }

    pub fn with_query(mut self, query: JobQuery) -> Self {
        self.query = query;
        self
    }
}

/// What started a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Tick,
    Manual,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Trigger::Tick => "tick",
            Trigger::Manual => "manual",
        }
    }
}

#[derive(Debug)]
struct MonitorState {
    raw_jobs: Vec<Job>,
    query: JobQuery,
    selection: Selection,
    /// Generation of the response currently in `raw_jobs` (0 = nothing applied yet)
    applied_generation: u64,
    last_error: Option<String>,
    last_updated: Option<Instant>,
    notices: Notices,
}

struct Shared {
    source: Arc<dyn JobSource>,
    state: Mutex<MonitorState>,
    next_generation: AtomicU64,
    cancel: CancellationToken,
    fetches: TaskTracker,
    /// Bumped after every poll outcome that touched the state
    revision: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn is_mounted(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Start one fetch cycle in its own task. Returns the generation it was assigned.
    fn dispatch(self: &Arc<Self>, trigger: Trigger) -> Option<u64> {
        if !self.is_mounted() {
            debug!(trigger = trigger.as_str(), "monitor unmounted; fetch not dispatched");
            return None;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        counter!(POLL_REQUESTS_TOTAL, "trigger" => trigger.as_str()).increment(1);

        let shared = Arc::clone(self);
        let span = info_span!("job_poll", generation, trigger = trigger.as_str());
        self.fetches
            .spawn(async move { shared.fetch_and_apply(generation).await }.instrument(span));

        Some(generation)
    }

    async fn fetch_and_apply(&self, generation: u64) {
        // A task spawned just before unmount must not reach the source.
        if !self.is_mounted() {
            return;
        }

        let started = Instant::now();
        let result = self.source.fetch_jobs().await;
        histogram!(POLL_LATENCY_MS).record(started.elapsed().as_secs_f64() * 1_000.0);

        if !self.is_mounted() {
            debug!("response arrived after unmount; discarded");
            return;
        }

        match result {
            Ok(jobs) => self.apply_jobs(generation, jobs),
            Err(err) => self.apply_failure(generation, err),
        }
    }

    fn apply_jobs(&self, generation: u64, jobs: Vec<Job>) {
        {
            let mut state = self.lock();
            // Unmount may have completed while this task waited for the lock.
            if !self.is_mounted() {
                debug!("response arrived after unmount; discarded");
                return;
            }
            if generation <= state.applied_generation {
                counter!(POLL_STALE_RESPONSES_TOTAL).increment(1);
                debug!(
                    applied = state.applied_generation,
                    "stale response discarded"
                );
                return;
            }

            for job in &jobs {
                let issues = job.consistency_issues();
                if !issues.is_empty() {
                    warn!(job_id = job.id, status = %job.status, ?issues, "inconsistent job record");
                }
            }

            debug!(count = jobs.len(), "jobs collection replaced");
            state.raw_jobs = jobs;
            state.applied_generation = generation;
            state.last_error = None;
            state.last_updated = Some(Instant::now());
        }
        self.bump_revision();
    }

    fn apply_failure(&self, generation: u64, err: ClientError) {
        counter!(POLL_FAILURES_TOTAL).increment(1);
        warn!(error = %err, "failed to fetch jobs");

        {
            let mut state = self.lock();
            if !self.is_mounted() {
                debug!("failure arrived after unmount; discarded");
                return;
            }
            if generation <= state.applied_generation {
                debug!(
                    applied = state.applied_generation,
                    "failure superseded by a newer response"
                );
                return;
            }
            state.last_error = Some(err.to_string());
            state
                .notices
                .push(NoticeLevel::Error, format!("Failed to fetch jobs: {}", err.notice_message()));
        }
        self.bump_revision();
    }
}

/// Shortest accepted poll period; `tokio::time::interval` panics on zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Entry point for mounting a job monitor.
pub struct JobMonitor;

impl JobMonitor {
    /// Mount a monitor over `source`: fetch immediately, then every `options.interval`.
    ///
    /// Must be called from within a Tokio runtime. Intervals below 1 ms are
    /// raised to 1 ms.
    pub fn mount(source: Arc<dyn JobSource>, options: MonitorOptions) -> MonitorHandle {
        let period = options.interval.max(MIN_INTERVAL);
        if period != options.interval {
            warn!(requested_ms = options.interval.as_millis() as u64, "poll interval clamped to 1ms");
        }
        let (revision, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            source,
            state: Mutex::new(MonitorState {
                raw_jobs: Vec::new(),
                query: options.query,
                selection: Selection::default(),
                applied_generation: 0,
                last_error: None,
                last_updated: None,
                notices: Notices::new(options.notice_ttl),
            }),
            next_generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            fetches: TaskTracker::new(),
            revision,
        });

        info!(interval_ms = period.as_millis() as u64, "job monitor mounted");
        let timer = tokio::spawn(run_timer(Arc::clone(&shared), period));

        MonitorHandle {
            shared,
            timer: Some(timer),
        }
    }
}

async fn run_timer(shared: Arc<Shared>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => {
                debug!("poll timer cancelled");
                break;
            }
            // The first tick completes immediately: that is the fetch on mount.
            _ = ticker.tick() => {
                shared.dispatch(Trigger::Tick);
            }
        }
    }
}

/// Point-in-time copy of everything a renderer needs.
#[derive(Debug, Clone)]
pub struct MonitorSnapshot {
    pub display: Vec<Job>,
    pub total: usize,
    pub stats: JobStats,
    pub query: JobQuery,
    pub selected: Option<Job>,
    pub last_error: Option<String>,
    pub notices: Vec<Notice>,
    pub generation: u64,
    pub last_updated: Option<Instant>,
}

/// Owner of a mounted monitor. Dropping it cancels the poll timer.
pub struct MonitorHandle {
    shared: Arc<Shared>,
    timer: Option<JoinHandle<()>>,
}

impl fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("mounted", &self.shared.is_mounted())
            .finish_non_exhaustive()
    }
}

impl MonitorHandle {
    /// Run one fetch cycle now. The timer keeps its cadence.
    pub fn refresh(&self) -> Option<u64> {
        self.shared.dispatch(Trigger::Manual)
    }

    /// Trigger server-side synchronization, then refresh on success.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<(), ClientError> {
        match self.shared.source.trigger_sync().await {
            Ok(()) => {
                self.shared
                    .lock()
                    .notices
                    .push(NoticeLevel::Success, "Job synchronization triggered.");
                self.refresh();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "job synchronization failed");
                self.shared.lock().notices.push(
                    NoticeLevel::Error,
                    format!("Sync failed: {}", err.notice_message()),
                );
                self.shared.bump_revision();
                Err(err)
            }
        }
    }

    pub fn set_status_filter(&self, status: StatusFilter) {
        self.shared.lock().query.status = status;
    }

    pub fn set_job_type_filter(&self, job_type: Option<String>) {
        self.shared.lock().query.job_type = job_type.filter(|t| !t.trim().is_empty());
    }

    pub fn set_search(&self, search: impl Into<String>) {
        self.shared.lock().query.search = search.into();
    }

    pub fn set_order(&self, order: SortOrder) {
        self.shared.lock().query.order = order;
    }

    /// Sort on `field`. The current column flips direction; a new column starts descending.
    pub fn sort_by(&self, field: SortField) -> (SortField, SortOrder) {
        let mut state = self.shared.lock();
        state.query.sort_by(field);
        (state.query.field, state.query.order)
    }

    pub fn toggle_order(&self) -> SortOrder {
        let mut state = self.shared.lock();
        state.query.order = state.query.order.toggled();
        state.query.order
    }

    pub fn query(&self) -> JobQuery {
        self.shared.lock().query.clone()
    }

    /// Current display sequence.
    pub fn display(&self) -> Vec<Job> {
        let state = self.shared.lock();
        project(&state.raw_jobs, &state.query)
    }

    /// Most recently applied collection, in fetch order.
    pub fn raw_jobs(&self) -> Vec<Job> {
        self.shared.lock().raw_jobs.clone()
    }

    /// Select a row of the current display sequence. Returns `false` if no row has that id.
    pub fn select(&self, job_id: i64) -> bool {
        let mut state = self.shared.lock();
        let display = project(&state.raw_jobs, &state.query);
        match display.iter().find(|job| job.id == job_id) {
            Some(job) => {
                state.selection.select(job);
                true
            }
            None => false,
        }
    }

    /// Open the detail view on a job obtained elsewhere (e.g. fetched by id).
    pub fn select_job(&self, job: &Job) {
        self.shared.lock().selection.select(job);
    }

    pub fn dismiss(&self) {
        self.shared.lock().selection.dismiss();
    }

    pub fn selected(&self) -> Option<Job> {
        self.shared.lock().selection.current().cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    /// Notices still visible now.
    pub fn notices(&self) -> Vec<Notice> {
        self.shared.lock().notices.active(Instant::now())
    }

    /// Receiver that changes whenever a poll outcome updates the state.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.is_mounted()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let mut state = self.shared.lock();
        let display = project(&state.raw_jobs, &state.query);
        let notices = state.notices.active(Instant::now());
        MonitorSnapshot {
            total: state.raw_jobs.len(),
            stats: JobStats::from_jobs(&state.raw_jobs),
            display,
            query: state.query.clone(),
            selected: state.selection.current().cloned(),
            last_error: state.last_error.clone(),
            notices,
            generation: state.applied_generation,
            last_updated: state.last_updated,
        }
    }

    /// Cancel the poll timer and wait for it to stop. In-flight fetches are
    /// left to finish but their results are discarded.
    pub async fn unmount(mut self) {
        self.shared.cancel.cancel();
        self.shared.fetches.close();
        if let Some(timer) = self.timer.take()
            && let Err(err) = timer.await
        {
            warn!(error = %err, "poll timer task ended abnormally");
        }
        self.shared.lock().selection.dismiss();
        info!("job monitor unmounted");
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
        self.shared.fetches.close();
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
