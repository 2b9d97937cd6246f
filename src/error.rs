//! Error handling types for toolwright
//!
//! This module provides the error taxonomy shared by tool resolution,
//! formatting, test runs and coverage handling.

use std::path::PathBuf;
use std::sync::PoisonError;
use thiserror::Error;

/// Comprehensive error type for tool orchestration
#[derive(Debug, Error)]
pub enum ToolError {
    /// A required tool could not be resolved
    #[error("Tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// The installer rejected or failed to install a tool
    #[error("Failed to install {tool}: {message}")]
    InstallFailure { tool: String, message: String },

    /// A tool process could not be run or exited unsuccessfully
    #[error("Process '{command}' failed: {message}")]
    ProcessFailure { command: String, message: String },

    /// A coverage report could not be parsed
    #[error("Malformed coverage report at line {line}: {message}")]
    ParseFailure { line: usize, message: String },

    /// Temporary directory creation or removal failed
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tool operations
pub type ToolResult<T> = Result<T, ToolError>;

/// Helper trait to convert PoisonError into a recovered guard
pub trait LockResultExt<T> {
    /// Recover the guard from a poisoned lock, logging which operation hit it.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "toolwright::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

impl ToolError {
    /// Create a tool not found error
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        ToolError::ToolNotFound { tool: tool.into() }
    }

    /// Create an install failure error
    pub fn install_failure(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::InstallFailure {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a process failure error
    pub fn process(command: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::ProcessFailure {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a coverage parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        ToolError::ParseFailure {
            line,
            message: message.into(),
        }
    }

    /// Create a filesystem error for the given path
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
