//! Error taxonomy shared by capture, recording, reporting and dispatch.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Stable names for each failure class, used in user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IoFailure,
    PathError,
    SerializationError,
    SpawnFailure,
    SelfInvocation,
    ConfigError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::IoFailure => "IOFailure",
            ErrorKind::PathError => "PathError",
            ErrorKind::SerializationError => "SerializationError",
            ErrorKind::SpawnFailure => "SpawnFailure",
            ErrorKind::SelfInvocation => "SelfInvocation",
            ErrorKind::ConfigError => "ConfigError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid output location {}: {reason}", path.display())]
    Path { path: PathBuf, reason: String },
    #[error("invocation is not serializable: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cannot run `{command}` (arguments: {arguments:?}): {source}")]
    Spawn {
        command: String,
        arguments: Vec<String>,
        #[source]
        source: io::Error,
    },
    #[error("`{}` resolves to this wrapper; refusing to wrap itself", command.display())]
    SelfInvocation { command: PathBuf },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl InvocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvocationError::Io { .. } => ErrorKind::IoFailure,
            InvocationError::Path { .. } => ErrorKind::PathError,
            InvocationError::Serialization(_) => ErrorKind::SerializationError,
            InvocationError::Spawn { .. } => ErrorKind::SpawnFailure,
            InvocationError::SelfInvocation { .. } => ErrorKind::SelfInvocation,
            InvocationError::Config(_) => ErrorKind::ConfigError,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        InvocationError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        InvocationError::Path {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for a wrapper that failed with this error.
    ///
    /// Follows the shell convention: 127 when the command was not found,
    /// 126 when it was found but could not be run.
    pub fn exit_code(&self) -> i32 {
        match self {
            InvocationError::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                127
            }
            InvocationError::Spawn { .. } | InvocationError::SelfInvocation { .. } => 126,
            _ => 1,
        }
    }
}

/// A failure attributed to one invocation, carrying the step it was
/// allocated (if any) so the message can name it.
#[derive(Debug)]
pub struct FailedInvocation {
    pub step: Option<u64>,
    pub error: InvocationError,
}

impl FailedInvocation {
    pub fn new(step: Option<u64>, error: InvocationError) -> Self {
        Self { step, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

impl fmt::Display for FailedInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(step) = self.step {
            write!(f, "step {step}: ")?;
        }
        write!(f, "{}: {}", self.error.kind(), self.error)
    }
}

impl std::error::Error for FailedInvocation {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
