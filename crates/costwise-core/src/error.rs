//! Error types for Costwise

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Upstream unavailable ({source_name}): {message}")]
    UpstreamUnavailable {
        source_name: String,
        message: String,
        retryable: bool,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// One section of a compound request failed; `cause` is the inner kind
    #[error("Component {component} failed: {message}")]
    PartialComponentFailure {
        component: String,
        cause: &'static str,
        message: String,
        retryable: bool,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn upstream(
        source_name: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Error::UpstreamUnavailable {
            source_name: source_name.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Mark `err` as the failure of one component, keeping its kind and
    /// retryability. Already-wrapped failures are returned unchanged.
    pub fn partial(component: impl Into<String>, err: Error) -> Self {
        match err {
            Error::PartialComponentFailure { .. } => err,
            other => Error::PartialComponentFailure {
                component: component.into(),
                cause: other.kind(),
                message: other.to_string(),
                retryable: other.is_retryable(),
            },
        }
    }

    /// Whether a caller can reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnavailable {
                retryable: true,
                ..
            } | Error::PartialComponentFailure {
                retryable: true,
                ..
            }
        )
    }

    /// Inner kind of a component failure
    pub fn cause(&self) -> Option<&'static str> {
        match self {
            Error::PartialComponentFailure { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Stable machine-readable kind, used for error sections in results
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InsufficientData(_) => "insufficient_data",
            Error::UpstreamUnavailable { .. } => "upstream_unavailable",
            Error::InvalidParameter(_) => "invalid_parameter",
            Error::PartialComponentFailure { .. } => "partial_component_failure",
            Error::Cancelled => "cancelled",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Csv(_) => "csv",
            Error::Join(_) => "join",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_is_retryable() {
        let err = Error::upstream("billing", "connection reset", true);
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "upstream_unavailable");
        assert!(err.to_string().contains("billing"));
        assert!(!Error::upstream("file", "missing", false).is_retryable());
    }

    #[test]
    fn test_partial_keeps_cause_and_retryability() {
        let err = Error::partial("forecast", Error::upstream("billing", "reset", true));
        assert_eq!(err.kind(), "partial_component_failure");
        assert_eq!(err.cause(), Some("upstream_unavailable"));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("billing"));

        let again = Error::partial("anomaly", err);
        assert!(again.to_string().starts_with("Component forecast failed"));

        let invalid = Error::partial("forecast", Error::InvalidParameter("bad".into()));
        assert_eq!(invalid.cause(), Some("invalid_parameter"));
        assert!(!invalid.is_retryable());
    }

    #[test]
    fn test_invalid_parameter_not_retryable() {
        let err = Error::InvalidParameter("horizon must be positive".into());
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "invalid_parameter");
    }
}
