use thiserror::Error;

pub type Result<T, E = SourceError> = core::result::Result<T, E>;

/// Failure of a single request against the backend.
///
/// `Transport` and `Status` cover the network side; `Decode` means the response
/// arrived but its body was not the expected JSON shape. Callers treat all of
/// them the same way: the request produced no data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("transport error on {endpoint}: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("malformed body from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl SourceError {
    pub fn is_decode(&self) -> bool {
        matches!(self, SourceError::Decode { .. })
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            SourceError::Transport { endpoint, .. }
            | SourceError::Status { endpoint, .. }
            | SourceError::Decode { endpoint, .. } => Some(endpoint),
            SourceError::Config(_) => None,
        }
    }
}
