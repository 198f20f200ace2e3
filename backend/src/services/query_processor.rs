//! Background light curve query processing.
//!
//! Runs a session query on a spawned task and reports progress through the
//! [`JobTracker`], so HTTP clients can follow it over SSE.

use std::sync::Arc;

use tracing::error;

use crate::models::QueryWindow;
use crate::services::job_tracker::{JobTracker, LogLevel};
use crate::services::session::{QueryResults, Session};

/// Query every configured source for `window`, recording progress under `job_id`.
///
/// Sources are queried one at a time so each gets its own log entry. The
/// job completes with the serialized results or fails with the first fatal
/// source error.
pub async fn process_query_async(
    job_id: String,
    tracker: JobTracker,
    session: Arc<Session>,
    window: QueryWindow,
) -> Result<QueryResults, String> {
    tracker.start_job(&job_id);
    tracker.log(
        &job_id,
        LogLevel::Info,
        format!(
            "Querying {} source(s) at ra={}, dec={} for MJD {}..{}",
            session.source_names().len(),
            window.ra(),
            window.dec(),
            window.mjd_min().value(),
            window.mjd_max().value()
        ),
    );

    let mut results = QueryResults::new();
    for name in session.source_names() {
        tracker.log(&job_id, LogLevel::Info, format!("Querying {}...", name));
        match session.query_source(name, &window).await {
            Ok(table) if table.is_empty() => {
                tracker.log(
                    &job_id,
                    LogLevel::Warning,
                    format!("{}: no observations in window", name),
                );
                results.insert(name.to_string(), table);
            }
            Ok(table) => {
                tracker.log(
                    &job_id,
                    LogLevel::Success,
                    format!("✓ {}: {} observations", name, table.len()),
                );
                results.insert(name.to_string(), table);
            }
            Err(e) => {
                let msg = e.to_string();
                error!("Query job {} failed: {}", job_id, msg);
                tracker.fail_job(&job_id, &msg);
                return Err(msg);
            }
        }
    }

    match serde_json::to_value(&results) {
        Ok(value) => {
            tracker.log(&job_id, LogLevel::Success, "✓ Query complete");
            tracker.complete_job(&job_id, value);
            Ok(results)
        }
        Err(e) => {
            let msg = format!("Failed to serialize results: {}", e);
            tracker.fail_job(&job_id, &msg);
            Err(msg)
        }
    }
}
