//! Background scrape jobs.
//!
//! Each job owns its browser session and dedup ledger for its whole run.
//! The registry only keeps what the API needs to report on it: status,
//! live progress, the stop flag and, once finished, the run report.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use foodmap_core::{RunConfig, RunProgress, RunReport, SearchReport};
use foodmap_scraper::{Scraper, StopSignal};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

/// Runs the work behind `/scrape` and `/search`.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn scrape(
        &self,
        run: RunConfig,
        stop: StopSignal,
        progress: watch::Sender<RunProgress>,
    ) -> RunReport;

    async fn search(&self, postal_code: &str, visible: bool) -> SearchReport;
}

/// Launches a dedicated Chromium session per call.
#[derive(Debug, Clone)]
pub struct BrowserRunner {
    scraper: Arc<Scraper>,
}

impl BrowserRunner {
    #[must_use]
    pub fn new(scraper: Arc<Scraper>) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl JobRunner for BrowserRunner {
    async fn scrape(
        &self,
        run: RunConfig,
        stop: StopSignal,
        progress: watch::Sender<RunProgress>,
    ) -> RunReport {
        self.scraper.scrape_with_chromium(&run, &stop, &progress).await
    }

    async fn search(&self, postal_code: &str, visible: bool) -> SearchReport {
        self.scraper.search_with_chromium(postal_code, visible).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    fn from_report(report: &RunReport) -> Self {
        if !report.success {
            Self::Failed
        } else if report.stopped {
            Self::Stopped
        } else {
            Self::Completed
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

struct JobEntry {
    postal_code: String,
    status: JobStatus,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    finished: Option<Instant>,
    progress: watch::Receiver<RunProgress>,
    stop: StopSignal,
    report: Option<RunReport>,
}

impl JobEntry {
    fn snapshot(&self, job_id: &str) -> JobSnapshot {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        #[allow(clippy::cast_precision_loss)]
        let runtime_minutes = (end - self.started_at).num_milliseconds().max(0) as f64 / 60_000.0;
        JobSnapshot {
            job_id: job_id.to_string(),
            postal_code: self.postal_code.clone(),
            status: self.status,
            started_at: self.started_at,
            finished_at: self.finished_at,
            runtime_minutes: (runtime_minutes * 10.0).round() / 10.0,
            stop_requested: self.stop.is_stopped(),
            progress: self.progress.borrow().clone(),
            report: self.report.clone(),
        }
    }
}

/// Point-in-time view of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub postal_code: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub runtime_minutes: f64,
    pub stop_requested: bool,
    pub progress: RunProgress,
    pub report: Option<RunReport>,
}

/// Why a job could not be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// Another job is still running for the same postal code.
    AlreadyRunning { job_id: String },
}

#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, JobEntry>>>,
    retention: Duration,
}

impl JobRegistry {
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Registers a job for `run` and starts it on a background task.
    ///
    /// # Errors
    ///
    /// Returns [`StartError::AlreadyRunning`] when a job for the same postal
    /// code has not finished yet; two writers on one output file would lose
    /// records.
    pub async fn start(
        &self,
        run: RunConfig,
        runner: Arc<dyn JobRunner>,
    ) -> Result<String, StartError> {
        let job_id = short_id();
        let stop = StopSignal::new();
        let (progress_tx, progress_rx) = watch::channel(RunProgress::default());
        let started_at = Utc::now();

        {
            let mut jobs = self.jobs.write().await;
            if let Some((id, _)) = jobs
                .iter()
                .find(|(_, j)| j.postal_code == run.postal_code && !j.status.is_finished())
            {
                return Err(StartError::AlreadyRunning { job_id: id.clone() });
            }
            jobs.insert(
                job_id.clone(),
                JobEntry {
                    postal_code: run.postal_code.clone(),
                    status: JobStatus::Starting,
                    started_at,
                    finished_at: None,
                    finished: None,
                    progress: progress_rx,
                    stop: stop.clone(),
                    report: None,
                },
            );
        }
        tracing::info!(job_id = %job_id, postal_code = %run.postal_code, "scrape job queued");

        let registry = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            registry.set_status(&id, JobStatus::Running).await;
            let postal_code = run.postal_code.clone();
            let work = tokio::spawn(async move { runner.scrape(run, stop, progress_tx).await });
            let report = match work.await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "scrape task aborted");
                    RunReport::failed(postal_code, format!("scrape task aborted: {e}"), started_at)
                }
            };
            registry.finish(&id, report).await;
        });

        Ok(job_id)
    }

    pub async fn get(&self, job_id: &str) -> Option<JobSnapshot> {
        self.jobs.read().await.get(job_id).map(|j| j.snapshot(job_id))
    }

    /// Every known job, oldest first.
    pub async fn list(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<JobSnapshot> = jobs.iter().map(|(id, j)| j.snapshot(id)).collect();
        all.sort_by_key(|j| j.started_at);
        all
    }

    /// Raises the stop flag of `job_id`. Returns the job's current status,
    /// or `None` when the job is unknown.
    pub async fn stop(&self, job_id: &str) -> Option<JobStatus> {
        let jobs = self.jobs.read().await;
        let job = jobs.get(job_id)?;
        if !job.status.is_finished() {
            job.stop.stop();
            tracing::info!(job_id, postal_code = %job.postal_code, "stop requested");
        }
        Some(job.status)
    }

    /// The unfinished job for `postal_code`, if any.
    pub async fn active_for(&self, postal_code: &str) -> Option<JobSnapshot> {
        let jobs = self.jobs.read().await;
        jobs.iter()
            .find(|(_, j)| j.postal_code == postal_code && !j.status.is_finished())
            .map(|(id, j)| j.snapshot(id))
    }

    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|j| !j.status.is_finished())
            .count()
    }

    /// Forgets finished jobs older than the retention period.
    pub async fn evict_expired(&self) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, j| j.finished.is_none_or(|at| at.elapsed() < self.retention));
        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = jobs.len(), "evicted finished jobs");
        }
        evicted
    }

    async fn set_status(&self, job_id: &str, status: JobStatus) {
        if let Some(job) = self.jobs.write().await.get_mut(job_id) {
            job.status = status;
        }
    }

    async fn finish(&self, job_id: &str, report: RunReport) {
        let status = JobStatus::from_report(&report);
        match &report.error {
            Some(error) => tracing::warn!(job_id, %status, error, "scrape job finished"),
            None => tracing::info!(
                job_id,
                %status,
                establishments = report.establishments_scraped,
                "scrape job finished"
            ),
        }
        if let Some(job) = self.jobs.write().await.get_mut(job_id) {
            job.status = status;
            job.finished_at = Some(Utc::now());
            job.finished = Some(Instant::now());
            job.report = Some(report);
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct QuickRunner;

    #[async_trait]
    impl JobRunner for QuickRunner {
        async fn scrape(
            &self,
            run: RunConfig,
            _stop: StopSignal,
            progress: watch::Sender<RunProgress>,
        ) -> RunReport {
            progress.send_modify(|p| p.pages_processed = 1);
            let mut report = RunReport::failed(run.postal_code, "unused", Utc::now());
            report.success = true;
            report.error = None;
            report
        }

        async fn search(&self, postal_code: &str, _visible: bool) -> SearchReport {
            SearchReport {
                success: true,
                postal_code: postal_code.to_string(),
                dialog_closed: false,
                page_load_ms: 0,
                search_ms: 0,
                total_ms: 0,
                error: None,
            }
        }
    }

    async fn wait_finished(registry: &JobRegistry, job_id: &str) -> JobSnapshot {
        for _ in 0..200 {
            let job = registry.get(job_id).await.unwrap();
            if job.status.is_finished() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {job_id} did not finish");
    }

    #[test]
    fn status_follows_report() {
        let mut report = RunReport::failed("75011", "boom", Utc::now());
        assert_eq!(JobStatus::from_report(&report), JobStatus::Failed);
        report.success = true;
        report.stopped = true;
        assert_eq!(JobStatus::from_report(&report), JobStatus::Stopped);
        report.stopped = false;
        assert_eq!(JobStatus::from_report(&report), JobStatus::Completed);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Running).unwrap(), "\"running\"");
        assert_eq!(JobStatus::Stopped.to_string(), "stopped");
    }

    #[test]
    fn ids_are_short() {
        assert_eq!(short_id().len(), 8);
        assert_ne!(short_id(), short_id());
    }

    #[tokio::test]
    async fn finished_job_keeps_report_and_progress() {
        let registry = JobRegistry::new(Duration::from_secs(3600));
        let id = registry
            .start(RunConfig::new("75011"), Arc::new(QuickRunner))
            .await
            .unwrap();

        let job = wait_finished(&registry, &id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress.pages_processed, 1);
        assert!(job.report.is_some());
        assert!(job.finished_at.is_some());
        assert_eq!(registry.active_count().await, 0);
        assert!(registry.active_for("75011").await.is_none());
    }

    #[tokio::test]
    async fn expired_jobs_are_evicted() {
        let registry = JobRegistry::new(Duration::ZERO);
        let id = registry
            .start(RunConfig::new("75011"), Arc::new(QuickRunner))
            .await
            .unwrap();
        wait_finished(&registry, &id).await;

        assert_eq!(registry.evict_expired().await, 1);
        assert!(registry.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn unknown_jobs_cannot_be_stopped() {
        let registry = JobRegistry::new(Duration::from_secs(60));
        assert!(registry.stop("missing").await.is_none());
    }
}
