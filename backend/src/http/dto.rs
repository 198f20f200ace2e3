//! Data Transfer Objects for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::models::QueryWindow;
use crate::services::job_tracker::{JobStatus, LogEntry};
use crate::services::QueryResults;

/// Light curve query, as query-string parameters or a JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurveQuery {
    /// Right ascension in decimal degrees
    pub ra: f64,
    /// Declination in decimal degrees
    pub dec: f64,
    /// Earliest observation date (e.g. `2018-06-04`)
    pub date_min: String,
    /// Latest observation date
    pub date_max: String,
}

impl LightCurveQuery {
    /// Short label used as the job description.
    pub fn describe(&self) -> String {
        format!(
            "ra={} dec={} {}..{}",
            self.ra, self.dec, self.date_min, self.date_max
        )
    }
}

/// Synchronous query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurveResponse {
    pub window: QueryWindow,
    /// Source name → table
    pub results: QueryResults,
}

/// Response for query submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQueryResponse {
    /// Job ID for tracking the background query
    pub job_id: String,
    pub message: String,
}

/// Job status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub description: String,
    pub logs: Vec<LogEntry>,
    /// Results if completed
    pub result: Option<serde_json::Value>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Configured source names
    pub sources: Vec<String>,
}
