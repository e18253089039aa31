/// Error types for the protoc bridge

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Broad classification of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidInput,
    Io,
    Compilation,
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input {path}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protoc did not exit cleanly (exit code {}). Review output for more information.", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    Compilation {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl BuildError {
    pub fn configuration(message: impl Into<String>) -> Self {
        BuildError::Configuration(message.into())
    }

    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BuildError::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Configuration(_) => ErrorKind::Configuration,
            BuildError::InvalidInput { .. } => ErrorKind::InvalidInput,
            BuildError::Io { .. } | BuildError::Spawn { .. } => ErrorKind::Io,
            BuildError::Compilation { .. } => ErrorKind::Compilation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(BuildError::configuration("x").kind(), ErrorKind::Configuration);
        assert_eq!(BuildError::invalid_input("a.jar", "bad").kind(), ErrorKind::InvalidInput);
        let spawn = BuildError::Spawn {
            executable: "protoc".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(spawn.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_invalid_input_names_path() {
        let err = BuildError::invalid_input("/deps/broken.jar", "was not a readable artifact");
        assert_eq!(
            err.to_string(),
            "Invalid input /deps/broken.jar: was not a readable artifact"
        );
    }
}
