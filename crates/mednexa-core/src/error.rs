//! Errors raised by calls to the remote analysis service.

use thiserror::Error;

/// A failed call to the analysis service.
///
/// The chat responder folds all three kinds into one "remote-call failure"
/// when substituting a fallback response, but callers that surface errors
/// can tell them apart.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced an HTTP response (connect refused, DNS, reset).
    #[error("could not reach analysis service: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the JSON shape we expected.
    #[error("malformed response from analysis service: {0}")]
    Decode(#[from] serde_json::Error),

    /// A local file involved in the request could not be read.
    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }

    pub fn is_status(&self) -> bool {
        matches!(self, RemoteError::Status { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, RemoteError::Decode(_))
    }

    /// HTTP status code, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            RemoteError::Transport(e) => e.status().map(|s| s.as_u16()),
            RemoteError::Decode(_) | RemoteError::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_reports_code() {
        let err = RemoteError::Status {
            status: 503,
            body: "down".to_string(),
        };
        assert!(err.is_status());
        assert!(!err.is_transport());
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "analysis service returned 503: down");
    }

    #[test]
    fn decode_error_has_no_status() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = RemoteError::from(json_err);
        assert!(err.is_decode());
        assert_eq!(err.status(), None);
    }
}
