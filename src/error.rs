use thiserror::Error;

/// A delete was requested while no environment is selected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unable to determine the current environment name.")]
pub struct PreconditionError;

/// Reading the application list failed. Never shown to the user; the next poll
/// or environment change retries.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("list request failed: {0}")]
    Transport(String),
    #[error("list request returned HTTP {0}")]
    Status(u16),
    #[error("list response could not be decoded: {0}")]
    Decode(String),
    #[error("server answered with code {0}")]
    Api(i64),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// A delete call that did not come back with the success code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Delete {name} failed ({code}): {message}")]
pub struct DeleteError {
    pub name: String,
    pub code: i64,
    pub message: String,
}
