//! Session configuration file support.
//!
//! This module reads the set of sources to query, their credentials and
//! optional endpoint overrides from a TOML file or from the environment.
//!
//! ```toml
//! [sources.atlas]
//! username = "observer"
//! password = "secret"
//!
//! [sources.ztf]
//! token = "ampel-token"
//!
//! [sources."asas-sn"]
//!
//! [endpoints]
//! atlas = "https://fallingstar-data.com/forcedphot"
//!
//! [retry]
//! max_attempts = 0
//! request_timeout_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::services::error::SessionError;
use crate::sources::{AuthInfo, RetryPolicy, Sleeper, SourceKind, SourceSettings};

/// Session configuration from file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Source name → credentials
    #[serde(default)]
    pub sources: BTreeMap<String, AuthInfo>,
    #[serde(default)]
    pub endpoints: EndpointSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Base URL overrides keyed by source name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ztf: Option<String>,
    #[serde(default, alias = "asas-sn", skip_serializing_if = "Option::is_none")]
    pub asas_sn: Option<String>,
}

impl EndpointSettings {
    /// Override for the source registered as `name`.
    pub fn for_source(&self, name: &str) -> Option<&str> {
        match name {
            "atlas" => self.atlas.as_deref(),
            "ztf" => self.ztf.as_deref(),
            "asas-sn" => self.asas_sn.as_deref(),
            _ => None,
        }
    }
}

/// Retry and timeout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Upper bound on ATLAS enqueue/poll iterations; 0 means unbounded
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl SessionConfig {
    /// Configuration with the given sources and default settings.
    pub fn with_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = (S, AuthInfo)>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Default::default()
        }
    }

    /// Load session configuration from a TOML file.
    ///
    /// # Errors
    /// Configuration error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SessionError::configuration(format!("Failed to read config file: {}", e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse session configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SessionError> {
        toml::from_str(content).map_err(|e| {
            SessionError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load session configuration from the default location.
    ///
    /// Searches for `lightfirst.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, SessionError> {
        let search_paths = [
            PathBuf::from("lightfirst.toml"),
            PathBuf::from("backend/lightfirst.toml"),
            PathBuf::from("../lightfirst.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(SessionError::configuration(
            "No lightfirst.toml found in standard locations",
        ))
    }

    /// Build configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `LIGHTFIRST_SOURCES` (required): comma-separated source names
    /// - `ATLAS_USERNAME`, `ATLAS_PASSWORD`: ATLAS credentials
    /// - `AMPEL_TOKEN`: ZTF/AMPEL bearer token
    /// - `ATLAS_URL`, `AMPEL_URL`, `ASASSN_URL` (optional): endpoint overrides
    /// - `LIGHTFIRST_MAX_ATTEMPTS` (optional, default: 0 = unbounded)
    /// - `LIGHTFIRST_REQUEST_TIMEOUT` (optional, default: 60 seconds)
    pub fn from_env() -> Result<Self, SessionError> {
        let names = env::var("LIGHTFIRST_SOURCES").map_err(|_| {
            SessionError::configuration("LIGHTFIRST_SOURCES environment variable not set")
        })?;

        let mut sources = BTreeMap::new();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let auth = match name.parse::<SourceKind>() {
                Ok(SourceKind::Atlas) => AuthInfo {
                    username: env::var("ATLAS_USERNAME").ok(),
                    password: env::var("ATLAS_PASSWORD").ok(),
                    token: None,
                },
                Ok(SourceKind::Ztf) => AuthInfo {
                    token: env::var("AMPEL_TOKEN").ok(),
                    ..Default::default()
                },
                _ => AuthInfo::none(),
            };
            sources.insert(name.to_string(), auth);
        }

        let max_attempts = match env::var("LIGHTFIRST_MAX_ATTEMPTS") {
            Ok(v) => v.parse().map_err(|_| {
                SessionError::configuration("LIGHTFIRST_MAX_ATTEMPTS must be a non-negative integer")
            })?,
            Err(_) => 0,
        };
        let request_timeout_secs = match env::var("LIGHTFIRST_REQUEST_TIMEOUT") {
            Ok(v) => v.parse().map_err(|_| {
                SessionError::configuration("LIGHTFIRST_REQUEST_TIMEOUT must be a number of seconds")
            })?,
            Err(_) => default_request_timeout(),
        };

        Ok(Self {
            sources,
            endpoints: EndpointSettings {
                atlas: env::var("ATLAS_URL").ok(),
                ztf: env::var("AMPEL_URL").ok(),
                asas_sn: env::var("ASASSN_URL").ok(),
            },
            retry: RetrySettings {
                max_attempts,
                request_timeout_secs,
            },
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_limit(self.retry.max_attempts)
    }

    /// Constructor settings for one configured source.
    pub fn settings_for(&self, name: &str, auth: &AuthInfo, sleeper: Arc<dyn Sleeper>) -> SourceSettings {
        let mut settings = SourceSettings::new(auth.clone())
            .with_retry(self.retry_policy())
            .with_request_timeout(Duration::from_secs(self.retry.request_timeout_secs))
            .with_sleeper(sleeper);
        if let Some(endpoint) = self.endpoints.for_source(name) {
            settings = settings.with_endpoint(endpoint);
        }
        settings
    }
}
