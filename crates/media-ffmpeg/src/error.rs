use std::process::ExitStatus;

use thiserror::Error;

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, MediaFfmpegError>;

/// Error type for probing and overlay export backed by FFmpeg CLI tools.
#[derive(Debug, Error)]
pub enum MediaFfmpegError {
    #[error("invalid rational {num}/{den}")]
    InvalidRational { num: i32, den: i32 },

    #[error("invalid export request: {reason}")]
    InvalidExportRequest { reason: &'static str },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed ({status}): {command}; stderr: {}", .stderr.trim())]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("probe output is not valid json: {0}")]
    ProbeJson(#[from] serde_json::Error),

    #[error("parse error ({context}): {value}")]
    Parse { context: &'static str, value: String },
}

impl MediaFfmpegError {
    /// Returns true when a spawned tool was terminated by a signal instead of
    /// exiting on its own.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::CommandFailed { status, .. } if status.code().is_none())
    }
}
