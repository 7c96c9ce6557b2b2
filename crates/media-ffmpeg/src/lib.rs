//! FFmpeg CLI plumbing for the caption overlay engine: stream probing and the
//! overlay re-encode.

mod error;
mod overlay;
mod probe;
mod time;

pub use error::{MediaFfmpegError, Result};
pub use overlay::{
    EncodingSettings, OverlayExportRequest, OverlayGraphic, OverlayTextLine, TextAlign,
    TextStyle, export_overlay_mp4,
};
pub use probe::{MediaInfo, StreamInfo, StreamKind, probe_media};
pub use time::Rational;
