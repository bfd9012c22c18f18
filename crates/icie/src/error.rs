use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or truncated byte stream from the worker. The bridge is
    /// unusable afterwards.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("worker process terminated")]
    WorkerTerminated,

    #[error("failed to start worker: {0}")]
    Spawn(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("project manifest not found in {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("project manifest {} is corrupt: {reason}", .path.display())]
    ManifestCorrupt { path: PathBuf, reason: String },

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("no free project name found after {attempts} attempts")]
    NoFreeNameFound { attempts: usize },

    #[error("prompt cancelled: {0}")]
    PromptCancelled(String),

    /// The worker reported `finished` with `success: false`.
    #[error("{operation} failed{}", detail(.message))]
    OperationFailed {
        operation: &'static str,
        message: Option<String>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// True for errors after which the worker connection cannot be reused.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::WorkerTerminated)
    }
}

/// Bare I/O errors come from the pipes; filesystem call sites use
/// [`Error::io`] to attach the path.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset => Self::WorkerTerminated,
            _ => Self::io("worker pipe", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_means_worker_gone() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, Error::WorkerTerminated));
        assert!(err.is_fatal());
    }

    #[test]
    fn operation_failed_message() {
        let err = Error::OperationFailed {
            operation: "build",
            message: Some("main.cpp:3: expected ';'".to_string()),
        };
        assert_eq!(err.to_string(), "build failed: main.cpp:3: expected ';'");

        let err = Error::OperationFailed {
            operation: "submit",
            message: None,
        };
        assert_eq!(err.to_string(), "submit failed");
    }
}
