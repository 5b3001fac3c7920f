//! Port forward error types

use thiserror::Error;

/// Why a single forward in a batch failed
///
/// Errors are stored on the forward's result record, so they stay cheap to
/// clone and compare.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForwardError {
    #[error("already forwarded")]
    AlreadyForwarded,

    #[error("not forwarded")]
    NotForwarded,

    #[error("invalid forward: {0}")]
    Invalid(String),

    #[error("{0}")]
    ProcessLaunch(String),

    #[error("ssh exit with code {0}")]
    ProcessExit(i32),

    #[error("ssh terminated by signal")]
    ProcessSignaled,

    #[error("{0}")]
    PortInUse(String),

    #[error("registry error: {0}")]
    Registry(String),
}

impl From<std::io::Error> for ForwardError {
    fn from(err: std::io::Error) -> Self {
        ForwardError::Registry(err.to_string())
    }
}

// Serialized as the message shown to the user
impl serde::Serialize for ForwardError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
