//! Service layer for query orchestration.
//!
//! The [`Session`] sits between callers (library users, the HTTP handlers) and
//! the individual survey sources. With the `http-server` feature, background
//! query jobs are tracked here as well.

pub mod error;
pub mod session;

#[cfg(feature = "http-server")]
pub mod job_tracker;

#[cfg(feature = "http-server")]
pub mod query_processor;

pub use error::{SessionError, SessionResult};
pub use session::{build_window, write_results_csv, QueryResults, Session, SessionBuilder};

#[cfg(feature = "http-server")]
pub use job_tracker::{
    JobStatus, JobTracker, LogEntry, LogLevel, QueryJob, DEFAULT_JOB_RETENTION_MINUTES,
};
