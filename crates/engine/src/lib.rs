//! Caption overlay engine: schedules timed suggestions, lays them out as
//! bottom-anchored plates and burns them into a copy of the source video.

pub mod backend;
pub mod composition;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod layout;
pub mod orientation;
pub mod overlay;
pub mod pipeline;
pub mod schedule;
pub mod time;
pub mod timestamp;

pub use backend::{ExportJob, ExportSettings, ExportStatus, FfmpegMediaBackend, MediaBackend};
pub use composition::{
    AssetAudioTrack, AssetVideoTrack, Composition, CompositionBuilder, CompositionTrack, Layer,
    LayerRole, MediaAsset, RenderSpec,
};
pub use config::OverlayConfig;
pub use error::{RenderError, RenderErrorKind, RenderFailure, Result};
pub use export::{ExportState, Exporter};
pub use geometry::{AffineTransform, Rect, Size};
pub use layout::{ApproximateMetrics, TextLayout, TextLayoutEngine, TextMeasure};
pub use orientation::{Orientation, ResolvedOrientation, resolve_orientation};
pub use overlay::{CaptionStyle, OpacityRamp, OverlayElement, OverlayLayer, OverlayRenderer};
pub use pipeline::{OverlayPipeline, normalize_input};
pub use schedule::{
    AnalysisResponse, CaptionAlignment, CaptionEvent, DegeneratePolicy, RawCaptionItem,
    caption_items_from_json, schedule,
};
pub use time::{MediaTime, PREFERRED_TIMESCALE, TimeRange};
pub use timestamp::{format_timestamp, parse_timestamp};
