//! Error taxonomy for fetch orchestration.

use std::path::PathBuf;

use crate::classify::Severity;

/// Errors produced anywhere in the fetch workflow.
///
/// Every variant is terminal for the orchestration that raised it; the only
/// failures that are retried are non-good exit statuses, and those surface
/// here as [`FetchError::WorkflowFailed`] once the retry budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not write manifest to {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no servers configured")]
    NoServers,

    #[error("fetch tool not found: {0}")]
    MissingExecutable(String),

    #[error("credentials unavailable: {0}")]
    Credentials(String),

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("could not launch {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message} (after {attempts} attempts)")]
    WorkflowFailed {
        message: String,
        severity: Severity,
        attempts: u32,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fetch workflow operations.
pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_failed_display_names_attempts() {
        let err = FetchError::WorkflowFailed {
            message: "fetch of m.tt failed".to_string(),
            severity: Severity::Fatal,
            attempts: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("fetch of m.tt failed"));
        assert!(msg.contains("2 attempts"));
    }

    #[test]
    fn test_manifest_write_display_names_path() {
        let err = FetchError::ManifestWrite {
            path: PathBuf::from("/work/tooltool.tt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/work/tooltool.tt"));
    }

    #[test]
    fn test_missing_executable_display() {
        let err = FetchError::MissingExecutable("tooltool.py".to_string());
        assert!(err.to_string().contains("tooltool.py"));
    }
}
