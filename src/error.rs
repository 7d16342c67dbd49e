//! Error types shared by the collaborator clients and the pipeline.

use thiserror::Error;

/// Outcome of a single failed outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Connection refused/reset, I/O failure or timeout.
    #[error("{service} transport error: {message}")]
    Transport { service: &'static str, message: String },

    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered, but the body had an unexpected shape.
    #[error("{service} response could not be decoded: {message}")]
    Decode { service: &'static str, message: String },

    /// The service answered successfully with nothing usable.
    #[error("{service} returned an empty response")]
    Empty { service: &'static str },
}

impl CallError {
    /// Only transport failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transport { .. })
    }

    pub(crate) fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            CallError::Decode {
                service,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            CallError::Status {
                service,
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            CallError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }
}

/// Configuration problems detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing credentials for {0}")]
    MissingCredential(&'static str),

    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),
}

/// Errors that may escape the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Rejected before any collaborator was called.
    #[error("`{0}` must not be empty")]
    InvalidInput(&'static str),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Every fallback was exhausted without a usable analysis.
    #[error("word could not be resolved")]
    Unresolved,
}

impl ResolveError {
    /// Whether the boundary layer should report this as a server-side failure.
    pub fn is_server_error(&self) -> bool {
        !matches!(self, ResolveError::InvalidInput(_))
    }
}
