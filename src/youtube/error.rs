//! API error type and failure classification.

use serde::Deserialize;
use thiserror::Error;

/// HTTP statuses considered likely to resolve on their own.
pub const TRANSIENT_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Errors returned by [`PlaylistApi`](super::PlaylistApi) calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        /// First `errors[].reason` from the Google error envelope, if any.
        reason: Option<String>,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Why a not-found response was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    PlaylistMissing,
    VideoMissing,
    Unclassified,
}

/// Coarse failure class used to pick diagnostics and retry behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotFound(NotFoundKind),
    Forbidden,
    Conflict,
    /// One of [`TRANSIENT_STATUSES`].
    Transient(u16),
    Other,
}

impl ApiError {
    /// Build a status error from a response body.
    ///
    /// Google APIs wrap errors as `{"error": {"code", "message", "errors": [{"reason"}]}}`.
    /// Bodies that do not follow that shape keep their raw text as the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self::Status {
                status,
                reason: envelope
                    .error
                    .errors
                    .into_iter()
                    .find_map(|detail| detail.reason),
                message: envelope.error.message,
            },
            Err(_) => Self::Status {
                status,
                reason: None,
                message: body.trim().to_string(),
            },
        }
    }

    pub fn classify(&self) -> FailureClass {
        let Self::Status { status, reason, .. } = self else {
            return FailureClass::Other;
        };
        match *status {
            404 => FailureClass::NotFound(match reason.as_deref() {
                Some("playlistNotFound") => NotFoundKind::PlaylistMissing,
                Some("videoNotFound") => NotFoundKind::VideoMissing,
                _ => NotFoundKind::Unclassified,
            }),
            403 => FailureClass::Forbidden,
            409 => FailureClass::Conflict,
            code if TRANSIENT_STATUSES.contains(&code) => FailureClass::Transient(code),
            _ => FailureClass::Other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}
