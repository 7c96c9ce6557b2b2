use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors produced while turning a source video and captions into an output.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("input is not a local file: {input}")]
    BadInputUrl { input: String },

    #[error("cannot load asset {}: {reason}", path.display())]
    Asset { path: PathBuf, reason: String },

    #[error("asset has no video track: {}", .0.display())]
    MissingVideoTrack(PathBuf),

    #[error("composition failed: {reason}")]
    Composition { reason: String },

    #[error("export failed: {reason}")]
    Export { reason: String },

    #[error("export was cancelled")]
    ExportCancelled,

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("{context}: {} ({source})", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {}: {source}", path.display())]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Caller-visible error category with a stable string code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RenderErrorKind {
    #[serde(rename = "bad_input_url")]
    BadInputUrl,
    #[serde(rename = "asset_error")]
    AssetError,
    #[serde(rename = "composition_failure")]
    CompositionFailure,
    #[serde(rename = "export_failed")]
    ExportError,
    #[serde(rename = "invalid_config")]
    Config,
}

impl RenderErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::BadInputUrl => "bad_input_url",
            Self::AssetError => "asset_error",
            Self::CompositionFailure => "composition_failure",
            Self::ExportError => "export_failed",
            Self::Config => "invalid_config",
        }
    }
}

impl Display for RenderErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl RenderError {
    pub fn kind(&self) -> RenderErrorKind {
        match self {
            Self::BadInputUrl { .. } => RenderErrorKind::BadInputUrl,
            Self::Asset { .. } | Self::MissingVideoTrack(_) => RenderErrorKind::AssetError,
            Self::Composition { .. } => RenderErrorKind::CompositionFailure,
            Self::Export { .. } | Self::ExportCancelled => RenderErrorKind::ExportError,
            Self::InvalidConfig { .. } | Self::ConfigRead { .. } | Self::ConfigJson { .. } => {
                RenderErrorKind::Config
            }
            // Only the output side does filesystem work once the input is accepted.
            Self::Io { .. } => RenderErrorKind::ExportError,
        }
    }

    pub(crate) fn asset(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Asset {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn composition(reason: impl Into<String>) -> Self {
        Self::Composition {
            reason: reason.into(),
        }
    }
}

/// Serializable failure payload handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderFailure {
    pub kind: RenderErrorKind,
    pub message: String,
}

impl From<&RenderError> for RenderFailure {
    fn from(error: &RenderError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<RenderError> for RenderFailure {
    fn from(error: RenderError) -> Self {
        Self::from(&error)
    }
}

impl Display for RenderFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{RenderError, RenderErrorKind, RenderFailure};

    #[test]
    fn kinds_map_to_stable_codes() {
        let cases = [
            (
                RenderError::BadInputUrl {
                    input: "http://example.com/a.mp4".to_string(),
                },
                "bad_input_url",
            ),
            (
                RenderError::MissingVideoTrack(PathBuf::from("voice.m4a")),
                "asset_error",
            ),
            (RenderError::composition("empty range"), "composition_failure"),
            (RenderError::ExportCancelled, "export_failed"),
            (
                RenderError::InvalidConfig {
                    reason: "fontSize must be positive".to_string(),
                },
                "invalid_config",
            ),
        ];

        for (error, code) in cases {
            assert_eq!(error.kind().code(), code, "{error}");
        }
    }

    #[test]
    fn failure_payload_carries_kind_and_message() {
        let failure = RenderFailure::from(RenderError::Export {
            reason: "encoder exited with status 1".to_string(),
        });

        assert_eq!(failure.kind, RenderErrorKind::ExportError);
        assert_eq!(
            failure.to_string(),
            "export_failed: export failed: encoder exited with status 1"
        );
        let json = serde_json::to_value(&failure).expect("failure should serialize");
        assert_eq!(json["kind"], "export_failed");
    }
}
