//! Error types for forceql-auth.
//!
//! Error messages avoid including credential values.

/// Result type alias for forceql-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for forceql-auth operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if the credential grant itself was rejected.
    pub fn is_grant_rejected(&self) -> bool {
        matches!(self.kind, ErrorKind::OAuth { .. })
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The identity service rejected the credential grant. The error code
    /// and description are passed through verbatim from the service.
    #[error("Authentication failed: {error} - {description}")]
    OAuth { error: String, description: String },

    /// HTTP failure while talking to the identity endpoint.
    #[error("HTTP error during authentication: {0}")]
    Http(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Environment variable not set.
    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Avoid echoing URLs that may carry tokens.
        let message = err.to_string();
        let sanitized = if message.contains("access_token") || message.contains("token=") {
            "HTTP request failed (details redacted)".to_string()
        } else {
            message
        };
        Error::with_source(ErrorKind::Http(sanitized), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::Serialization(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        let err = ErrorKind::OAuth {
            error: "invalid_grant".to_string(),
            description: "authentication failure".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Authentication failed: invalid_grant - authentication failure"
        );
    }

    #[test]
    fn test_grant_rejected() {
        let err = Error::new(ErrorKind::OAuth {
            error: "invalid_client_id".into(),
            description: "client identifier invalid".into(),
        });
        assert!(err.is_grant_rejected());

        let err = Error::new(ErrorKind::Http("boom".into()));
        assert!(!err.is_grant_rejected());
    }
}
