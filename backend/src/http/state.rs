//! Application state for the HTTP server.

use std::sync::Arc;

use crate::services::job_tracker::JobTracker;
use crate::services::Session;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Configured sources to query
    pub session: Arc<Session>,
    /// Background query jobs
    pub job_tracker: JobTracker,
}

impl AppState {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            job_tracker: JobTracker::new(),
        }
    }

    pub fn with_job_tracker(session: Arc<Session>, job_tracker: JobTracker) -> Self {
        Self {
            session,
            job_tracker,
        }
    }
}
