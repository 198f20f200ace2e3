//! Job tracking for background light curve queries.
//!
//! Queries submitted through `POST /v1/queries` run on a spawned task. The
//! tracker keeps each job's state and progress log in memory so clients can
//! poll the job or follow its log over SSE.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A single log entry with timestamp and message.
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
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Query job state and progress log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryJob {
    pub job_id: String,
    pub status: JobStatus,
    /// Short description of the query, e.g. `ra=244.00092 dec=22.26803`
    pub description: String,
    pub logs: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Serialized query results once completed
    pub result: Option<serde_json::Value>,
}

/// How long finished jobs stay queryable by default.
pub const DEFAULT_JOB_RETENTION_MINUTES: i64 = 60;

/// In-memory job tracker shared by the HTTP handlers.
///
/// Finished jobs older than the retention period are dropped whenever a new
/// job is created.
#[derive(Clone)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, QueryJob>>>,
    retention: Duration,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::with_retention(Duration::minutes(DEFAULT_JOB_RETENTION_MINUTES))
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Register a queued job and return its id.
    pub fn create_job(&self, description: impl Into<String>) -> String {
        let pruned = self.prune_finished(Utc::now() - self.retention);
        if pruned > 0 {
            tracing::debug!("Pruned {} finished query jobs", pruned);
        }

        let job_id = Uuid::new_v4().to_string();
        let job = QueryJob {
            job_id: job_id.clone(),
            status: JobStatus::Queued,
            description: description.into(),
            logs: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            result: None,
        };
        self.jobs.write().insert(job_id.clone(), job);
        job_id
    }

    pub fn start_job(&self, job_id: &str) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.status = JobStatus::Running;
        }
    }

    /// Append a log entry. Unknown ids are ignored.
    pub fn log(&self, job_id: &str, level: LogLevel, message: impl Into<String>) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.logs.push(LogEntry {
                timestamp: Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    pub fn complete_job(&self, job_id: &str, result: serde_json::Value) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now());
            job.result = Some(result);
        }
    }

    /// Mark a job as failed, recording the message as its last log entry.
    pub fn fail_job(&self, job_id: &str, error_message: impl Into<String>) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            let now = Utc::now();
            job.status = JobStatus::Failed;
            job.completed_at = Some(now);
            job.logs.push(LogEntry {
                timestamp: now,
                level: LogLevel::Error,
                message: error_message.into(),
            });
        }
    }

    pub fn get_job(&self, job_id: &str) -> Option<QueryJob> {
        self.jobs.read().get(job_id).cloned()
    }

    /// Log entries from position `offset` onward.
    pub fn logs_since(&self, job_id: &str, offset: usize) -> Vec<LogEntry> {
        self.jobs
            .read()
            .get(job_id)
            .map(|job| job.logs.iter().skip(offset).cloned().collect())
            .unwrap_or_default()
    }

    /// Drop finished jobs completed before `cutoff`. Returns how many were removed.
    pub fn prune_finished(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| match job.completed_at {
            Some(done) => !job.status.is_finished() || done >= cutoff,
            None => true,
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}
