//! Error types for backend and identity calls.

use std::fmt;

use cora_core::Endpoint;

/// Failure to obtain an identity token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(String),
    #[error("token provider rejected the request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("token command failed: {0}")]
    Command(String),
    #[error("no token configured: {0}")]
    Missing(String),
    #[error("token provider returned an empty token")]
    Empty,
}

/// What went wrong with a backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendErrorCause {
    /// The identity token could not be obtained; no request was sent.
    Auth(AuthError),
    /// The request never produced an HTTP response.
    Transport(String),
    /// The backend answered with a non-2xx status.
    Status { status: u16, body: String },
    /// The response body did not match the expected shape.
    Decode(String),
}

impl fmt::Display for BackendErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorCause::Auth(e) => write!(f, "authorization failed: {}", e),
            BackendErrorCause::Transport(msg) => write!(f, "transport error: {}", msg),
            BackendErrorCause::Status { status, body } => {
                write!(f, "HTTP {}: {}", status, truncate(body, 200))
            }
            BackendErrorCause::Decode(msg) => write!(f, "invalid response: {}", msg),
        }
    }
}

/// A failed call to one backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{endpoint} failed: {cause}")]
pub struct BackendError {
    pub endpoint: Endpoint,
    pub cause: BackendErrorCause,
}

impl BackendError {
    pub fn auth(endpoint: Endpoint, err: AuthError) -> Self {
        Self {
            endpoint,
            cause: BackendErrorCause::Auth(err),
        }
    }

    pub fn transport(endpoint: Endpoint, msg: impl Into<String>) -> Self {
        Self {
            endpoint,
            cause: BackendErrorCause::Transport(msg.into()),
        }
    }

    pub fn status(endpoint: Endpoint, status: u16, body: impl Into<String>) -> Self {
        Self {
            endpoint,
            cause: BackendErrorCause::Status {
                status,
                body: body.into(),
            },
        }
    }

    pub fn decode(endpoint: Endpoint, msg: impl Into<String>) -> Self {
        Self {
            endpoint,
            cause: BackendErrorCause::Decode(msg.into()),
        }
    }

    /// Whether the call failed before reaching the backend because no token
    /// could be obtained.
    pub fn is_auth(&self) -> bool {
        matches!(self.cause, BackendErrorCause::Auth(_))
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
