use thiserror::Error;

/// Failures of a remote API call, split the way callers need to react to them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The server answered, but not with the expected body.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        Self::Status {
            status,
            detail: detail.into(),
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &str {
        match self {
            ApiError::Status { detail, .. } if !detail.is_empty() => detail,
            ApiError::Status { .. } => "request rejected",
            ApiError::Transport(_) => "service unreachable",
            ApiError::Decode(_) => "unexpected response",
        }
    }
}
