#![allow(dead_code)]

//! Shared helpers for integration tests: in-process mock survey servers and
//! scoped environment variables.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores variables on unwind and serializes access to process-global env
/// vars, since tests run in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Serve the router returned by `build` on an ephemeral local port.
///
/// `build` receives the server's own base URL so handlers can hand out
/// absolute links.
pub async fn spawn_server<F>(build: F) -> String
where
    F: FnOnce(String) -> Router,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    let app = build(base.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    base
}

// =============================================================================
// ATLAS
// =============================================================================

pub const ATLAS_USER: &str = "observer";
pub const ATLAS_PASSWORD: &str = "secret";
pub const ATLAS_TOKEN: &str = "atlas-token";

/// Forced photometry result for ra 244.00092, dec 22.26803.
///
/// Two rows are inside 2018-06-04..2018-06-29, one has a negative magnitude
/// and one is after the window.
pub const ATLAS_RESULT: &str = "\
###MJD          m      dm   uJy   duJy F err chi/N     RA       Dec        x        y     maj   min   phi  apfit mag5sig Sky   Obs
58273.51234  17.123  0.021  512  10 o  0  1.02 244.00092 22.26803  5120.1  3310.2 2.10 2.00 -12.0 -0.41 19.55 20.1 02a58273o0123c
58275.40000 -17.500  0.300  -40  12 c  0  0.98 244.00092 22.26803  5121.4  3311.0 2.12 2.01 -10.0 -0.40 19.40 20.0 02a58275o0456c
58280.25000  17.301  0.030  430  11 c  0  1.10 244.00092 22.26803  5119.9  3309.7 2.08 1.99 -11.0 -0.42 19.61 20.2 01a58280o0789c
58310.10000  17.050  0.025  530  10 o  0  1.00 244.00092 22.26803  5120.0  3310.0 2.10 2.00 -12.0 -0.41 19.50 20.1 02a58310o0001c
";

/// Behaviour of the mock ATLAS server.
#[derive(Debug, Clone)]
pub struct AtlasScenario {
    /// Throttle messages answered with 429 before the job is accepted
    pub throttle: Vec<String>,
    /// Queue answers with this status (other than 201/429) before accepting
    pub queue_failures: Vec<u16>,
    /// Number of polls that report the job as still running
    pub pending_polls: usize,
    /// Status returned by the task URL
    pub poll_status: u16,
    /// Finished job carries no result URL
    pub no_result: bool,
    /// Status returned by the result URL
    pub result_status: u16,
    pub result: String,
}

impl Default for AtlasScenario {
    fn default() -> Self {
        Self {
            throttle: Vec::new(),
            queue_failures: Vec::new(),
            pending_polls: 0,
            poll_status: 200,
            no_result: false,
            result_status: 200,
            result: ATLAS_RESULT.to_string(),
        }
    }
}

/// Request counters of the mock ATLAS server.
#[derive(Debug, Default)]
pub struct AtlasRecorder {
    pub queue_posts: AtomicUsize,
    pub polls: AtomicUsize,
    pub deletes: AtomicUsize,
    pub queued_form: Mutex<HashMap<String, String>>,
}

struct AtlasState {
    base: String,
    scenario: AtlasScenario,
    throttle: Mutex<VecDeque<String>>,
    queue_failures: Mutex<VecDeque<u16>>,
    recorder: Arc<AtlasRecorder>,
}

fn authorized(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}

async fn atlas_auth(Form(form): Form<HashMap<String, String>>) -> Response {
    let valid = form.get("username").map(String::as_str) == Some(ATLAS_USER)
        && form.get("password").map(String::as_str) == Some(ATLAS_PASSWORD);
    if valid {
        Json(json!({ "token": ATLAS_TOKEN })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "non_field_errors": ["Unable to log in with provided credentials."] })),
        )
            .into_response()
    }
}

async fn atlas_queue(
    State(state): State<Arc<AtlasState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers, &format!("Token {}", ATLAS_TOKEN)) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.recorder.queue_posts.fetch_add(1, Ordering::SeqCst);

    if let Some(detail) = state.throttle.lock().unwrap().pop_front() {
        return (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "detail": detail }))).into_response();
    }
    if let Some(status) = state.queue_failures.lock().unwrap().pop_front() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "queue unavailable").into_response();
    }

    *state.recorder.queued_form.lock().unwrap() = form;
    (
        StatusCode::CREATED,
        Json(json!({ "url": format!("{}/queue/1/", state.base) })),
    )
        .into_response()
}

async fn atlas_task(State(state): State<Arc<AtlasState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers, &format!("Token {}", ATLAS_TOKEN)) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let poll = state.recorder.polls.fetch_add(1, Ordering::SeqCst);

    if state.scenario.poll_status != 200 {
        let status =
            StatusCode::from_u16(state.scenario.poll_status).unwrap_or(StatusCode::BAD_GATEWAY);
        return (status, "status unavailable").into_response();
    }

    if poll < state.scenario.pending_polls {
        return Json(json!({
            "starttimestamp": "2024-01-01T00:00:00Z",
            "finishtimestamp": null,
            "result_url": null,
        }))
        .into_response();
    }

    let result_url = if state.scenario.no_result {
        Value::Null
    } else {
        Value::String(format!("{}/static/results/job1.txt", state.base))
    };
    Json(json!({
        "starttimestamp": "2024-01-01T00:00:00Z",
        "finishtimestamp": "2024-01-01T00:01:00Z",
        "result_url": result_url,
        "error_msg": null,
    }))
    .into_response()
}

async fn atlas_delete(State(state): State<Arc<AtlasState>>) -> StatusCode {
    state.recorder.deletes.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn atlas_result(State(state): State<Arc<AtlasState>>) -> Response {
    let status = StatusCode::from_u16(state.scenario.result_status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, state.scenario.result.clone()).into_response()
}

/// Start a mock ATLAS forced photometry server. Returns its base URL.
pub async fn spawn_atlas(scenario: AtlasScenario) -> (String, Arc<AtlasRecorder>) {
    let recorder = Arc::new(AtlasRecorder::default());
    let rec = Arc::clone(&recorder);
    let base = spawn_server(move |base| {
        let state = Arc::new(AtlasState {
            base,
            throttle: Mutex::new(scenario.throttle.iter().cloned().collect()),
            queue_failures: Mutex::new(scenario.queue_failures.iter().copied().collect()),
            scenario,
            recorder: rec,
        });
        Router::new()
            .route("/api-token-auth/", post(atlas_auth))
            .route("/queue/", post(atlas_queue))
            .route("/queue/{task_id}/", get(atlas_task).delete(atlas_delete))
            .route("/static/results/job1.txt", get(atlas_result))
            .with_state(state)
    })
    .await;
    (base, recorder)
}

// =============================================================================
// ZTF / AMPEL
// =============================================================================

pub const AMPEL_TOKEN: &str = "ampel-token";

/// Behaviour of the mock AMPEL archive.
#[derive(Debug, Clone)]
pub struct ZtfScenario {
    /// Object id → photopoints
    pub objects: Vec<(String, Vec<Value>)>,
    pub cone_status: u16,
    /// Objects whose photopoints request fails
    pub failing_objects: Vec<String>,
}

impl Default for ZtfScenario {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            cone_status: 200,
            failing_objects: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ZtfRecorder {
    pub cone_query: Mutex<HashMap<String, String>>,
    pub photo_requests: AtomicUsize,
}

struct ZtfState {
    scenario: ZtfScenario,
    recorder: Arc<ZtfRecorder>,
}

async fn ztf_cone(
    State(state): State<Arc<ZtfState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers, &format!("bearer {}", AMPEL_TOKEN)) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    *state.recorder.cone_query.lock().unwrap() = query;

    if state.scenario.cone_status != 200 {
        let status = StatusCode::from_u16(state.scenario.cone_status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "cone search failed").into_response();
    }
    let ids: Vec<&str> = state.scenario.objects.iter().map(|(id, _)| id.as_str()).collect();
    Json(json!(ids)).into_response()
}

async fn ztf_photopoints(
    State(state): State<Arc<ZtfState>>,
    Path(object_id): Path<String>,
) -> Response {
    state.recorder.photo_requests.fetch_add(1, Ordering::SeqCst);
    if state.scenario.failing_objects.contains(&object_id) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match state.scenario.objects.iter().find(|(id, _)| *id == object_id) {
        Some((_, points)) => Json(json!({ "objectId": object_id, "prv_candidates": points })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start a mock AMPEL archive. Returns its base URL.
pub async fn spawn_ztf(scenario: ZtfScenario) -> (String, Arc<ZtfRecorder>) {
    let recorder = Arc::new(ZtfRecorder::default());
    let state = Arc::new(ZtfState {
        scenario,
        recorder: Arc::clone(&recorder),
    });
    let base = spawn_server(move |_| {
        Router::new()
            .route("/objects/cone_search", get(ztf_cone))
            .route("/object/{object_id}/photopoints", get(ztf_photopoints))
            .with_state(state)
    })
    .await;
    (base, recorder)
}

/// A ZTF photopoint row.
pub fn photopoint(jd: f64, mag: Option<f64>, fid: i64) -> Value {
    json!({
        "jd": jd,
        "magpsf": mag,
        "sigmapsf": mag.map(|_| 0.05),
        "fid": fid,
        "diffmaglim": 20.5,
    })
}

// =============================================================================
// ASAS-SN Sky Patrol
// =============================================================================

#[derive(Debug, Default)]
pub struct SkyPatrolRecorder {
    pub query: Mutex<HashMap<String, String>>,
}

struct SkyPatrolState {
    status: u16,
    rows: Vec<Value>,
    recorder: Arc<SkyPatrolRecorder>,
}

async fn skypatrol_cone(
    State(state): State<Arc<SkyPatrolState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    *state.recorder.query.lock().unwrap() = query;
    if state.status != 200 {
        let status = StatusCode::from_u16(state.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "unavailable").into_response();
    }
    Json(json!({ "data": state.rows })).into_response()
}

/// Start a mock Sky Patrol server answering every cone search with `rows`.
pub async fn spawn_skypatrol(status: u16, rows: Vec<Value>) -> (String, Arc<SkyPatrolRecorder>) {
    let recorder = Arc::new(SkyPatrolRecorder::default());
    let state = Arc::new(SkyPatrolState {
        status,
        rows,
        recorder: Arc::clone(&recorder),
    });
    let base = spawn_server(move |_| {
        Router::new()
            .route("/lightcurves/cone_search", get(skypatrol_cone))
            .with_state(state)
    })
    .await;
    (base, recorder)
}

/// A Sky Patrol photometry row.
pub fn skypatrol_row(id: u64, jd: f64, mag: Option<f64>, filter: &str) -> Value {
    json!({
        "asas_sn_id": id,
        "jd": jd,
        "flux": 4.2,
        "flux_err": 0.1,
        "mag": mag,
        "mag_err": mag.map(|_| 0.03),
        "phot_filter": filter,
        "limit": 17.6,
    })
}
