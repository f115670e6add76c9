//! WebHDFS error classification
//!
//! One closed taxonomy for everything the backend can throw at us. A raw
//! HTTP response is classified exactly once, at the layer that holds it;
//! every layer above passes the kind through unchanged.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// WebHDFS error body: `{"RemoteException": {"message": ...}}`
#[derive(Debug, Deserialize)]
struct RemoteExceptionBody {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    message: Option<String>,
    #[serde(rename = "exception")]
    _exception: Option<String>,
}

/// Closed error taxonomy surfaced by the HDFS client
#[derive(Debug, Error)]
pub enum HdfsError {
    /// Requested path does not exist
    #[error("path not found: {0}")]
    NotFound(String),

    /// Path already exists (or otherwise conflicts with the operation)
    #[error("path conflict: {0}")]
    Conflict(String),

    /// Backend rejected the identity or permissions
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Connection-level failure: refused, timed out, DNS
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend violated the protocol contract (bad redirect, unparseable body)
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Any other backend-reported failure
    #[error("backend error: {0}")]
    Unknown(String),
}

impl HdfsError {
    /// Classify a non-2xx backend response.
    ///
    /// Rules, in order: 404 is NotFound, 409 is Conflict, 401/403 is
    /// Unauthorized. Otherwise the body decides: a JSON RemoteException
    /// carries its message as Unknown, a non-JSON body is a Protocol
    /// violation carrying the raw text, and JSON without the expected
    /// field falls back to Unknown.
    pub fn classify(status: StatusCode, body: &[u8]) -> HdfsError {
        match status {
            StatusCode::NOT_FOUND => HdfsError::NotFound(remote_message(body)),
            StatusCode::CONFLICT => HdfsError::Conflict(remote_message(body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                HdfsError::Unauthorized(remote_message(body))
            }
            _ => match serde_json::from_slice::<RemoteExceptionBody>(body) {
                Ok(parsed) => HdfsError::Unknown(
                    parsed
                        .remote_exception
                        .message
                        .unwrap_or_else(|| format!("backend returned {}", status)),
                ),
                Err(_) if serde_json::from_slice::<serde_json::Value>(body).is_ok() => {
                    HdfsError::Unknown(format!("backend returned {}", status))
                }
                Err(_) => {
                    HdfsError::Protocol(String::from_utf8_lossy(body).into_owned())
                }
            },
        }
    }

    /// Stable kind name for the REST boundary
    pub fn kind(&self) -> &'static str {
        match self {
            HdfsError::NotFound(_) => "NOT_FOUND",
            HdfsError::Conflict(_) => "CONFLICT",
            HdfsError::Unauthorized(_) => "UNAUTHORIZED",
            HdfsError::Transport(_) => "TRANSPORT",
            HdfsError::Protocol(_) => "PROTOCOL",
            HdfsError::Unknown(_) => "UNKNOWN",
        }
    }
}

/// Pull the RemoteException message out of an error body, falling back to
/// the raw text when the body is not the expected shape.
fn remote_message(body: &[u8]) -> String {
    match serde_json::from_slice::<RemoteExceptionBody>(body) {
        Ok(parsed) => parsed
            .remote_exception
            .message
            .unwrap_or_else(|| "no message".to_string()),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

impl From<reqwest::Error> for HdfsError {
    fn from(e: reqwest::Error) -> Self {
        // A failure with no response at all is always Transport, whatever
        // the phase. Decode failures mean the backend broke the contract.
        if e.is_decode() {
            HdfsError::Protocol(e.to_string())
        } else {
            HdfsError::Transport(e.to_string())
        }
    }
}
