//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! session for the actual survey queries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use super::dto::{
    HealthResponse, JobStatusResponse, LightCurveQuery, LightCurveResponse, SubmitQueryResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::services::build_window;
use crate::services::query_processor::process_query_async;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        sources: state
            .session
            .source_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }))
}

// =============================================================================
// Light curve queries
// =============================================================================

/// GET /v1/lightcurves?ra=..&dec=..&date_min=..&date_max=..
///
/// Query every configured source and wait for the results. ATLAS jobs can
/// take minutes; prefer `POST /v1/queries` for long windows.
pub async fn get_lightcurves(
    State(state): State<AppState>,
    Query(query): Query<LightCurveQuery>,
) -> HandlerResult<LightCurveResponse> {
    let window = build_window(query.ra, query.dec, &query.date_min, &query.date_max)?;
    let results = state.session.query_window(&window).await?;
    Ok(Json(LightCurveResponse { window, results }))
}

/// POST /v1/queries
///
/// Start a background query. Returns a job ID for tracking progress.
pub async fn submit_query(
    State(state): State<AppState>,
    Json(query): Json<LightCurveQuery>,
) -> Result<(StatusCode, Json<SubmitQueryResponse>), AppError> {
    // Reject bad input before a job is created
    let window = build_window(query.ra, query.dec, &query.date_min, &query.date_max)?;

    let job_id = state.job_tracker.create_job(query.describe());
    let response_job_id = job_id.clone();

    let tracker = state.job_tracker.clone();
    let session = Arc::clone(&state.session);
    tokio::spawn(async move {
        let _ = process_query_async(job_id, tracker, session, window).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitQueryResponse {
            job_id: response_job_id.clone(),
            message: format!(
                "Query started. Track progress at /v1/jobs/{}/logs",
                response_job_id
            ),
        }),
    ))
}

// =============================================================================
// Job management
// =============================================================================

/// GET /v1/jobs/{job_id}
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> HandlerResult<JobStatusResponse> {
    let job = state
        .job_tracker
        .get_job(&job_id)
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

    Ok(Json(JobStatusResponse {
        job_id: job.job_id,
        status: job.status,
        description: job.description,
        logs: job.logs,
        result: job.result,
    }))
}

/// GET /v1/jobs/{job_id}/logs
///
/// Stream job logs via Server-Sent Events (SSE). A final `complete` event
/// carries the job status and result.
pub async fn stream_job_logs(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.job_tracker.get_job(&job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {} not found", job_id)));
    }

    let tracker = state.job_tracker.clone();
    let stream = async_stream::stream! {
        let mut sent = 0;
        loop {
            for entry in tracker.logs_since(&job_id, sent) {
                sent += 1;
                let data = serde_json::to_string(&entry).unwrap_or_default();
                yield Ok(Event::default().data(data));
            }

            match tracker.get_job(&job_id) {
                Some(job) if job.status.is_finished() => {
                    // Flush entries written between the read above and completion
                    for entry in job.logs.iter().skip(sent) {
                        let data = serde_json::to_string(entry).unwrap_or_default();
                        yield Ok(Event::default().data(data));
                    }
                    let final_event = serde_json::json!({
                        "status": job.status,
                        "result": job.result,
                    });
                    yield Ok(Event::default()
                        .event("complete")
                        .data(serde_json::to_string(&final_event).unwrap_or_default()));
                    break;
                }
                Some(_) => {}
                None => break,
            }

            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}
