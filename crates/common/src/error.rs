//! Error types shared across Collage crates.

use std::path::PathBuf;

/// Top-level error type for Collage operations.
#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    /// Malformed caller input, rejected before any graph construction.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The compiler produced a graph that breaks its own wiring rules.
    /// Always a defect in the compiler, never a caller problem.
    #[error("Filter graph invariant violated: {message}")]
    CompilationInvariant { message: String },

    /// The media executor exited unsuccessfully or produced nothing.
    #[error("External execution failed ({status}): {diagnostics}")]
    ExternalExecution { status: String, diagnostics: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CollageError.
pub type CollageResult<T> = Result<T, CollageError>;

impl CollageError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }

    pub fn compilation_invariant(msg: impl Into<String>) -> Self {
        Self::CompilationInvariant {
            message: msg.into(),
        }
    }

    pub fn external_execution(status: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::ExternalExecution {
            status: status.into(),
            diagnostics: diagnostics.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether the error was caused by the request itself rather than by
    /// the compiler or the executor.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::Json(_))
    }
}
