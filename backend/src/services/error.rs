//! Error types for session construction and queries.

use crate::sources::SourceError;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Unknown source name, invalid credentials or unreadable config.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        source_name: Option<String>,
    },

    /// Coordinates or MJD bounds out of range.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A date string could not be converted to MJD.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A source failed in a way it could not degrade from.
    #[error("Source '{source_name}' failed: {error}")]
    Source {
        source_name: String,
        #[source]
        error: SourceError,
    },
}

impl SessionError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source_name: None,
        }
    }

    pub fn configuration_for(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source_name: Some(source_name.into()),
        }
    }

    pub fn source_failure(source_name: impl Into<String>, error: SourceError) -> Self {
        Self::Source {
            source_name: source_name.into(),
            error,
        }
    }
}
