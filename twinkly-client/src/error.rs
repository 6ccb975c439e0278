use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Step of the login/verify handshake that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Login,
    Verify,
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeStage::Login => write!(f, "login"),
            HandshakeStage::Verify => write!(f, "verify"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Connection refused, timeout, DNS failure and friends. Never retried.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The device refused the handshake, either by HTTP status or by a
    /// non-1000 response code.
    #[error("authentication rejected during {stage}: {reason}")]
    AuthenticationRejected {
        stage: HandshakeStage,
        reason: String,
    },

    /// An authorized operation was called on a session without a token.
    #[error("session is not authenticated")]
    AuthRequired,

    /// The device no longer accepts the session token. Re-authenticate and retry.
    #[error("authentication token was rejected by the device")]
    TokenExpired,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The device answered with a body that is missing fields or has the wrong shape.
    #[error("failed to decode device response: {0}")]
    Decode(String),

    #[error("{endpoint} failed with status: {status}")]
    UnexpectedStatus {
        endpoint: &'static str,
        status: StatusCode,
    },
}

impl Error {
    pub(crate) fn rejected(stage: HandshakeStage, reason: impl Into<String>) -> Self {
        Error::AuthenticationRejected {
            stage,
            reason: reason.into(),
        }
    }

    /// True for failures that a fresh `authenticate()` may cure.
    pub fn needs_authentication(&self) -> bool {
        matches!(self, Error::AuthRequired | Error::TokenExpired)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
