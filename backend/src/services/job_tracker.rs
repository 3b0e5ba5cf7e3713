//! In-memory tracker for background reprocessing jobs.
//!
//! Jobs keep a progress counter and a list of user-facing log lines that the
//! HTTP layer streams over SSE.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    /// Number of calls the job will touch.
    pub total: usize,
    pub processed: usize,
    pub logs: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-call outcomes once the job has finished.
    pub result: Option<serde_json::Value>,
}

impl Job {
    pub fn is_finished(&self) -> bool {
        self.status != JobStatus::Running
    }
}

/// Finished jobs kept for status polling. Running jobs are never evicted.
pub const MAX_RETAINED_JOBS: usize = 100;

#[derive(Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job over `total` items and return its id.
    pub fn create_job(&self, total: usize) -> String {
        let job_id = Uuid::new_v4().to_string();
        let job = Job {
            job_id: job_id.clone(),
            status: JobStatus::Running,
            total,
            processed: 0,
            logs: vec![],
            created_at: Utc::now(),
            completed_at: None,
            result: None,
        };
        let mut jobs = self.jobs.write();
        jobs.insert(job_id.clone(), job);
        prune_finished(&mut jobs, MAX_RETAINED_JOBS);
        job_id
    }

    pub fn log(&self, job_id: &str, level: LogLevel, message: impl Into<String>) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.logs.push(LogEntry {
                timestamp: Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    /// Fix the item count once it is known.
    pub fn set_total(&self, job_id: &str, total: usize) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.total = total;
        }
    }

    /// Count one more processed item.
    pub fn advance(&self, job_id: &str) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.processed = (job.processed + 1).min(job.total);
        }
    }

    pub fn complete_job(&self, job_id: &str, result: Option<serde_json::Value>) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now());
            job.result = result;
        }
    }

    pub fn fail_job(&self, job_id: &str, error_message: impl Into<String>) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            job.logs.push(LogEntry {
                timestamp: Utc::now(),
                level: LogLevel::Error,
                message: error_message.into(),
            });
        }
    }

    pub fn get_job(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().get(job_id).cloned()
    }

    /// Log lines from index `from` onward; empty for an unknown job.
    pub fn logs_since(&self, job_id: &str, from: usize) -> Vec<LogEntry> {
        self.jobs
            .read()
            .get(job_id)
            .map(|job| job.logs.iter().skip(from).cloned().collect())
            .unwrap_or_default()
    }
}

/// Drop the oldest finished jobs until at most `cap` remain.
fn prune_finished(jobs: &mut HashMap<String, Job>, cap: usize) {
    if jobs.len() <= cap {
        return;
    }
    let mut finished: Vec<(DateTime<Utc>, String)> = jobs
        .values()
        .filter(|job| job.is_finished())
        .map(|job| (job.completed_at.unwrap_or(job.created_at), job.job_id.clone()))
        .collect();
    finished.sort();
    let excess = jobs.len() - cap;
    for (_, job_id) in finished.into_iter().take(excess) {
        jobs.remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let tracker = JobTracker::new();
        let id = tracker.create_job(2);
        tracker.log(&id, LogLevel::Info, "starting");
        tracker.advance(&id);
        tracker.advance(&id);
        tracker.advance(&id);

        let job = tracker.get_job(&id).unwrap();
        assert_eq!(job.processed, 2);
        assert!(!job.is_finished());

        tracker.complete_job(&id, Some(serde_json::json!({"ok": 2})));
        let job = tracker.get_job(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_logs_since_and_unknown_job() {
        let tracker = JobTracker::new();
        let id = tracker.create_job(0);
        tracker.log(&id, LogLevel::Info, "one");
        tracker.fail_job(&id, "two");

        let tail = tracker.logs_since(&id, 1);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].level, LogLevel::Error);
        assert!(tracker.logs_since("missing", 0).is_empty());
        assert!(tracker.get_job("missing").is_none());
    }

    #[test]
    fn test_finished_jobs_are_evicted_past_the_cap() {
        let tracker = JobTracker::new();
        let running = tracker.create_job(1);
        let first_done = tracker.create_job(1);
        tracker.complete_job(&first_done, None);
        for _ in 0..MAX_RETAINED_JOBS {
            let id = tracker.create_job(1);
            tracker.fail_job(&id, "boom");
        }
        let newest = tracker.create_job(1);

        assert_eq!(tracker.jobs.read().len(), MAX_RETAINED_JOBS);
        assert!(tracker.get_job(&running).is_some());
        assert!(tracker.get_job(&newest).is_some());
        assert!(tracker.get_job(&first_done).is_none());
    }

    #[test]
    fn test_running_jobs_are_never_evicted() {
        let tracker = JobTracker::new();
        let ids: Vec<String> = (0..MAX_RETAINED_JOBS + 5).map(|_| tracker.create_job(1)).collect();
        assert!(ids.iter().all(|id| tracker.get_job(id).is_some()));
    }
}
