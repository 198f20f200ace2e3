//! Error types for data source operations.
//!
//! Most fetch failures never reach callers: adapters degrade them to an empty
//! table. The variants here cover what does escape (authentication, job
//! polling, exhausted retry bounds) plus the errors adapters classify
//! internally before deciding to degrade.

use std::fmt;

/// Result type for data source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Structured context for source errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Registry name of the source (e.g., "atlas", "ztf")
    pub source: Option<String>,
    /// The operation being performed (e.g., "authenticate", "poll_task")
    pub operation: Option<String>,
    /// HTTP status returned by the remote service, if any
    pub status: Option<u16>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Default::default()
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref source) = self.source {
            parts.push(format!("source={}", source));
        }
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(status) = self.status {
            parts.push(format!("status={}", status));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for data source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Credentials were rejected or no token could be obtained.
    #[error("Authentication error: {message} {context}")]
    AuthenticationError {
        message: String,
        context: ErrorContext,
    },

    /// Transport failure or unexpected status from the remote service.
    #[error("Request error: {message} {context}")]
    RequestError {
        message: String,
        context: ErrorContext,
    },

    /// Remote job status could not be retrieved; the job is lost.
    #[error("Polling error: {message} {context}")]
    PollingError {
        message: String,
        context: ErrorContext,
    },

    /// Response body did not have the expected shape.
    #[error("Parse error: {message} {context}")]
    ParseError {
        message: String,
        context: ErrorContext,
    },

    /// A configured retry bound was reached before the remote side settled.
    #[error("Retries exhausted after {attempts} attempts: {message} {context}")]
    RetriesExhausted {
        attempts: u32,
        message: String,
        context: ErrorContext,
    },

    /// Missing or malformed source settings (credentials, endpoint).
    #[error("Configuration error: {message} {context}")]
    ConfigurationError {
        message: String,
        context: ErrorContext,
    },
}

impl SourceError {
    pub fn authentication(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::AuthenticationError {
            message: message.into(),
            context,
        }
    }

    pub fn request(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::RequestError {
            message: message.into(),
            context,
        }
    }

    pub fn polling(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::PollingError {
            message: message.into(),
            context,
        }
    }

    pub fn parse(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ParseError {
            message: message.into(),
            context,
        }
    }

    pub fn retries_exhausted(
        attempts: u32,
        message: impl Into<String>,
        context: ErrorContext,
    ) -> Self {
        Self::RetriesExhausted {
            attempts,
            message: message.into(),
            context,
        }
    }

    pub fn configuration(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            context,
        }
    }

    /// Whether an adapter may degrade this error to an empty table.
    ///
    /// Request and parse failures are recoverable; authentication, polling,
    /// retry exhaustion and configuration errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RequestError { .. } | Self::ParseError { .. })
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::AuthenticationError { context, .. }
            | Self::RequestError { context, .. }
            | Self::PollingError { context, .. }
            | Self::ParseError { context, .. }
            | Self::RetriesExhausted { context, .. }
            | Self::ConfigurationError { context, .. } => context,
        }
    }
}
