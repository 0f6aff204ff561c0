//! Error types.
//!
//! Library-level failures are typed with `thiserror`; the binary wraps them
//! in `anyhow` at the edges (config loading, file output, `main`).

use thiserror::Error;

/// Failures raised while validating or aggregating practice data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A record failed validation at the loading boundary.
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    /// A limit or threshold outside its domain.
    #[error("invalid metric parameter: {0}")]
    InvalidMetric(String),

    /// Trend delta against a zero baseline.
    #[error("undefined delta for {period}: previous period {previous} has value 0")]
    UndefinedDelta { period: String, previous: String },

    /// Nothing to aggregate.
    #[error("no data to analyze: {0}")]
    EmptyInput(String),
}

/// Failures at the text-generation / text-to-speech boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Non-success HTTP status from the upstream service.
    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The response body is not the JSON shape we expect.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    /// Connection, timeout or other transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The environment variable holding the API key is unset or empty.
    #[error("missing API key: set the {0} environment variable")]
    MissingApiKey(String),
}

impl GatewayError {
    /// Map a reqwest send failure onto the gateway taxonomy.
    pub(crate) fn from_send(err: reqwest::Error, service: &str, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            GatewayError::Transport(format!(
                "{} request timed out after {}s",
                service, timeout_seconds
            ))
        } else if err.is_connect() {
            GatewayError::Transport(format!("cannot connect to {}", service))
        } else {
            GatewayError::Transport(format!("failed to send {} request: {}", service, err))
        }
    }
}

/// Failures raised by a chat session before any upstream call is made.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = GatewayError::Upstream {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "upstream error 503: overloaded");
    }

    #[test]
    fn test_undefined_delta_display() {
        let err = AnalysisError::UndefinedDelta {
            period: "B".to_string(),
            previous: "A".to_string(),
        };
        assert!(err.to_string().contains("previous period A"));
    }

    #[test]
    fn test_session_error_wraps_analysis() {
        let err: SessionError = AnalysisError::InvalidMetric("limit -1".to_string()).into();
        assert_eq!(err.to_string(), "invalid metric parameter: limit -1");
    }
}
