//! ATLAS forced photometry adapter.
//!
//! The ATLAS server runs forced photometry as queued jobs. A query goes
//! through four phases:
//!
//! ```text
//! authenticate ──► enqueue ──► poll task ──► fetch result
//!   (token)       (429: wait,   (10 s until    (text table)
//!                  retry)        finished)
//! ```
//!
//! The result is a whitespace-delimited table whose header row is prefixed
//! with `###`. Rows with a negative magnitude come from reference-image
//! subtraction and are dropped.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::backoff::{parse_retry_hint, RetryPolicy, Sleeper, DEFAULT_BACKOFF};
use super::error::{ErrorContext, SourceError, SourceResult};
use super::source::{DataSource, SourceSettings};
use crate::models::{LightCurveRecord, LightCurveTable, QueryWindow};

pub const ATLAS_SOURCE_NAME: &str = "atlas";

/// Public forced photometry endpoint.
pub const DEFAULT_ATLAS_URL: &str = "https://fallingstar-data.com/forcedphot";

/// Survey-wide limiting magnitude.
///
/// ATLAS does not report a per-exposure limit in the forced photometry table,
/// so every row carries this approximate 5-sigma depth.
pub const ATLAS_LIMITING_MAGNITUDE: f64 = 19.7;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct QueuedTask {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ThrottleResponse {
    #[serde(default)]
    detail: String,
}

/// Job state as reported by the task URL.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub starttimestamp: Option<String>,
    #[serde(default)]
    pub finishtimestamp: Option<String>,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        self.finishtimestamp.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_running(&self) -> bool {
        self.starttimestamp.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// ATLAS forced photometry source.
pub struct AtlasSource {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl AtlasSource {
    /// Create an ATLAS source. Requires `username` and `password`.
    pub fn new(settings: &SourceSettings) -> SourceResult<Self> {
        let (username, password) = settings.auth.require_credentials(ATLAS_SOURCE_NAME)?;

        Ok(Self {
            client: settings.http_client(ATLAS_SOURCE_NAME)?,
            base_url: settings.base_url(DEFAULT_ATLAS_URL),
            username,
            password,
            retry: settings.retry,
            sleeper: Arc::clone(&settings.sleeper),
        })
    }

    fn context(operation: &str) -> ErrorContext {
        ErrorContext::new(ATLAS_SOURCE_NAME).with_operation(operation)
    }

    fn auth_header(token: &str) -> String {
        format!("Token {}", token)
    }

    /// Exchange username/password for an API token.
    async fn authenticate(&self) -> SourceResult<String> {
        let url = format!("{}/api-token-auth/", self.base_url);
        let params = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("ATLAS authentication request failed: {}", e);
                SourceError::authentication(e.to_string(), Self::context("authenticate"))
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("ATLAS authentication failed ({}): {}", status, body.trim());
            return Err(SourceError::authentication(
                "token request rejected",
                Self::context("authenticate")
                    .with_status(status.as_u16())
                    .with_details(body.trim().to_string()),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            error!("ATLAS token response unreadable: {}", e);
            SourceError::authentication(
                format!("malformed token response: {}", e),
                Self::context("authenticate"),
            )
        })?;

        debug!("ATLAS token obtained");
        Ok(token.token)
    }

    /// Submit the forced photometry job and return its task URL.
    ///
    /// Throttled submissions (429) wait for the interval the server names;
    /// other failures are logged and retried after [`DEFAULT_BACKOFF`].
    async fn enqueue(&self, token: &str, window: &QueryWindow) -> SourceResult<String> {
        let url = format!("{}/queue/", self.base_url);
        let params = [
            ("ra", window.ra().to_string()),
            ("dec", window.dec().to_string()),
            ("mjd_min", window.mjd_min().value().to_string()),
            ("mjd_max", window.mjd_max().value().to_string()),
        ];

        let mut attempts = 0u32;
        loop {
            attempts += 1;

            let wait = match self
                .client
                .post(&url)
                .header(header::AUTHORIZATION, Self::auth_header(token))
                .header(header::ACCEPT, "application/json")
                .form(&params)
                .send()
                .await
            {
                Ok(response) if response.status() == StatusCode::CREATED => {
                    let task: QueuedTask = response.json().await.map_err(|e| {
                        SourceError::parse(
                            format!("malformed queue response: {}", e),
                            Self::context("enqueue"),
                        )
                    })?;
                    info!("ATLAS task queued at {}", task.url);
                    return Ok(task.url);
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let body = response.text().await.unwrap_or_default();
                    let detail = serde_json::from_str::<ThrottleResponse>(&body)
                        .map(|t| t.detail)
                        .unwrap_or(body);
                    let wait = parse_retry_hint(&detail);
                    info!("ATLAS throttled: {} (waiting {}s)", detail.trim(), wait.as_secs());
                    wait
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!("ATLAS enqueue failed ({}): {}", status, body.trim());
                    DEFAULT_BACKOFF
                }
                Err(e) => {
                    error!("ATLAS enqueue request failed: {}", e);
                    DEFAULT_BACKOFF
                }
            };

            if !self.retry.allows_another(attempts) {
                return Err(SourceError::retries_exhausted(
                    attempts,
                    "task was never accepted by the queue",
                    Self::context("enqueue"),
                ));
            }
            self.sleeper.sleep(wait).await;
        }
    }

    /// Poll the task until it finishes and return its result URL.
    ///
    /// `Ok(None)` means the job finished without producing a result file.
    async fn wait_for_result(&self, token: &str, task_url: &str) -> SourceResult<Option<String>> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;

            let response = self
                .client
                .get(task_url)
                .header(header::AUTHORIZATION, Self::auth_header(token))
                .header(header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| {
                    SourceError::polling(e.to_string(), Self::context("poll_task"))
                })?;

            let status = response.status();
            if status != StatusCode::OK {
                let body = response.text().await.unwrap_or_default();
                error!("ATLAS task status check failed ({}): {}", status, body.trim());
                return Err(SourceError::polling(
                    "task status check failed",
                    Self::context("poll_task")
                        .with_status(status.as_u16())
                        .with_details(body.trim().to_string()),
                ));
            }

            let task: TaskStatus = response.json().await.map_err(|e| {
                SourceError::polling(
                    format!("malformed task status: {}", e),
                    Self::context("poll_task"),
                )
            })?;

            if task.is_finished() {
                match task.result_url {
                    Some(result_url) if !result_url.is_empty() => {
                        info!("ATLAS task complete, results at {}", result_url);
                        return Ok(Some(result_url));
                    }
                    _ => {
                        warn!(
                            "ATLAS task finished without results: {}",
                            task.error_msg.as_deref().unwrap_or("no error message")
                        );
                        return Ok(None);
                    }
                }
            } else if task.is_running() {
                debug!(
                    "ATLAS task running (started at {})",
                    task.starttimestamp.as_deref().unwrap_or_default()
                );
            } else {
                debug!("ATLAS task waiting to start");
            }

            if !self.retry.allows_another(attempts) {
                return Err(SourceError::retries_exhausted(
                    attempts,
                    "task did not finish",
                    Self::context("poll_task"),
                ));
            }
            self.sleeper.sleep(DEFAULT_BACKOFF).await;
        }
    }

    async fn fetch_result(&self, token: &str, result_url: &str) -> SourceResult<String> {
        let response = self
            .client
            .get(result_url)
            .header(header::AUTHORIZATION, Self::auth_header(token))
            .send()
            .await
            .map_err(|e| SourceError::request(e.to_string(), Self::context("fetch_result")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::request(
                "result download failed",
                Self::context("fetch_result").with_status(status.as_u16()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::request(e.to_string(), Self::context("fetch_result")))
    }

    /// Remove the finished task from the server-side queue.
    async fn delete_task(&self, token: &str, task_url: &str) {
        let outcome = self
            .client
            .delete(task_url)
            .header(header::AUTHORIZATION, Self::auth_header(token))
            .header(header::ACCEPT, "application/json")
            .send()
            .await;

        match outcome {
            Ok(response) if response.status().is_success() => {
                debug!("ATLAS task {} deleted", task_url);
            }
            Ok(response) => warn!("ATLAS task delete returned {}", response.status()),
            Err(e) => warn!("ATLAS task delete failed: {}", e),
        }
    }
}

#[async_trait]
impl DataSource for AtlasSource {
    fn name(&self) -> &str {
        ATLAS_SOURCE_NAME
    }

    async fn get_lc(&self, window: &QueryWindow) -> SourceResult<LightCurveTable> {
        let token = self.authenticate().await?;
        let task_url = self.enqueue(&token, window).await?;

        let result_url = self.wait_for_result(&token, &task_url).await?;

        // A finished task is always removed from the queue.
        let fetched = match result_url {
            Some(url) => Some(self.fetch_result(&token, &url).await),
            None => None,
        };
        self.delete_task(&token, &task_url).await;

        let text = match fetched {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                warn!("ATLAS result unavailable, returning empty light curve: {}", e);
                return Ok(LightCurveTable::empty());
            }
            None => return Ok(LightCurveTable::empty()),
        };

        let obj_id = format!("{:.6},{:.6}", window.ra(), window.dec());
        let table = parse_forced_photometry(&text, &obj_id).restrict_to(window);
        info!("ATLAS returned {} observations", table.len());
        Ok(table)
    }
}

/// Parse an ATLAS forced photometry result table.
///
/// `###` markers are stripped and the first non-empty line is taken as the
/// header, which must name the `MJD`, `m`, `dm` and `F` columns. Rows whose
/// field count differs from the header or whose numbers do not parse are
/// skipped, as are rows with `m < 0`. Every row gets `obj_id` and
/// [`ATLAS_LIMITING_MAGNITUDE`].
pub fn parse_forced_photometry(text: &str, obj_id: &str) -> LightCurveTable {
    let cleaned = text.replace("###", "");
    let mut lines = cleaned.lines().filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return LightCurveTable::empty();
    };
    let header: Vec<&str> = header_line.split_whitespace().collect();
    let position = |name: &str| header.iter().position(|h| *h == name);

    let (Some(mjd_idx), Some(mag_idx), Some(err_idx), Some(filter_idx)) =
        (position("MJD"), position("m"), position("dm"), position("F"))
    else {
        warn!("ATLAS result header missing expected columns: {}", header_line.trim());
        return LightCurveTable::empty();
    };

    let mut skipped = 0usize;
    let mut table = LightCurveTable::empty();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != header.len() {
            skipped += 1;
            continue;
        }

        let parsed = (
            fields[mjd_idx].parse::<f64>(),
            fields[mag_idx].parse::<f64>(),
            fields[err_idx].parse::<f64>(),
        );
        let (Ok(mjd), Ok(mag), Ok(mag_err)) = parsed else {
            skipped += 1;
            continue;
        };

        if mag < 0.0 {
            continue;
        }

        table.push(LightCurveRecord {
            obj_id: obj_id.to_string(),
            mjd,
            mag,
            mag_err,
            filter: fields[filter_idx].to_string(),
            limit: ATLAS_LIMITING_MAGNITUDE,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} malformed ATLAS rows", skipped);
    }
    table
}
