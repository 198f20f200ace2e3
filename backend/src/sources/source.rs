//! The data source capability and the settings every adapter is built from.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use super::backoff::{RetryPolicy, Sleeper, TokioSleeper};
use super::error::{ErrorContext, SourceError, SourceResult};
use crate::models::{LightCurveTable, QueryWindow};

/// A remote photometry service that can produce a light curve for a window.
///
/// Implementations return a table in the unified schema, restricted to the
/// window's MJD range. When nothing matches, or a fetch fails in a way the
/// adapter can recover from, the result is an empty table rather than an
/// error; callers must tolerate empty tables. `Err` is reserved for failures
/// that leave the query in an unknown state.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Registry name of this source.
    fn name(&self) -> &str;

    /// Fetch the light curve for `window`.
    async fn get_lc(&self, window: &QueryWindow) -> SourceResult<LightCurveTable>;
}

/// Per-source credential bundle.
///
/// The core never inspects it; each adapter validates the fields it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthInfo {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            token: None,
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Username/password pair, or a configuration error naming `source`.
    pub fn require_credentials(&self, source: &str) -> SourceResult<(String, String)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) if !user.is_empty() => Ok((user.clone(), pass.clone())),
            _ => Err(SourceError::configuration(
                "username and password are required",
                ErrorContext::new(source).with_operation("validate_auth"),
            )),
        }
    }

    /// Bearer token, or a configuration error naming `source`.
    pub fn require_token(&self, source: &str) -> SourceResult<String> {
        match &self.token {
            Some(token) if !token.is_empty() => Ok(token.clone()),
            _ => Err(SourceError::configuration(
                "an API token is required",
                ErrorContext::new(source).with_operation("validate_auth"),
            )),
        }
    }
}

/// Everything a source constructor needs.
#[derive(Clone)]
pub struct SourceSettings {
    pub auth: AuthInfo,
    /// Base URL override; `None` uses the adapter's public endpoint.
    pub endpoint: Option<String>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub sleeper: Arc<dyn Sleeper>,
}

impl SourceSettings {
    pub fn new(auth: AuthInfo) -> Self {
        Self {
            auth,
            endpoint: None,
            retry: RetryPolicy::unbounded(),
            request_timeout: Duration::from_secs(60),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Endpoint override with any trailing slash removed, or `default`.
    pub(crate) fn base_url(&self, default: &str) -> String {
        self.endpoint
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    /// HTTP client honoring the configured timeout.
    pub(crate) fn http_client(&self, source: &str) -> SourceResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| {
                SourceError::configuration(
                    format!("Failed to build HTTP client: {}", e),
                    ErrorContext::new(source),
                )
            })
    }
}

impl std::fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSettings")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Accept identifiers the services send either as JSON strings or numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        UInt(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::UInt(n) => n.to_string(),
    })
}
