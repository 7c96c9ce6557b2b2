use std::path::{Path, PathBuf};

use async_trait::async_trait;
use media_ffmpeg::{
    EncodingSettings, MediaInfo, OverlayExportRequest, OverlayGraphic, OverlayTextLine, Rational,
    StreamInfo, TextAlign, TextStyle,
};
use tracing::{debug, warn};

use crate::composition::{AssetAudioTrack, AssetVideoTrack, Composition, MediaAsset, RenderSpec};
use crate::config::OverlayConfig;
use crate::error::{RenderError, Result};
use crate::geometry::{AffineTransform, Size};
use crate::overlay::{OverlayElement, OverlayLayer};
use crate::schedule::CaptionAlignment;
use crate::time::{MediaTime, TimeRange};

/// Encoder settings forwarded to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
}

impl From<&OverlayConfig> for ExportSettings {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            preset: config.preset.clone(),
            crf: config.crf,
            audio_codec: config.audio_codec.clone(),
        }
    }
}

/// Everything a backend needs to write one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub composition: Composition,
    pub render_spec: RenderSpec,
    pub overlay: OverlayLayer,
    pub settings: ExportSettings,
    pub output_path: PathBuf,
}

/// Terminal state reported by a backend export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Completed,
    Failed(String),
    Cancelled,
}

/// Media operations required by the overlay pipeline.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Loads track metadata for a local file.
    fn load_asset(&self, path: &Path) -> Result<MediaAsset>;

    /// Encodes `job` to `job.output_path`, resolving exactly once.
    ///
    /// Dropping the future before it resolves must stop the encode and leave
    /// nothing at `job.output_path`.
    async fn export(&self, job: ExportJob) -> ExportStatus;
}

/// FFmpeg CLI-backed backend used by production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegMediaBackend;

#[async_trait]
impl MediaBackend for FfmpegMediaBackend {
    fn load_asset(&self, path: &Path) -> Result<MediaAsset> {
        let info = media_ffmpeg::probe_media(path)
            .map_err(|err| RenderError::asset(path, err.to_string()))?;
        asset_from_probe(info)
    }

    async fn export(&self, job: ExportJob) -> ExportStatus {
        let request = overlay_export_request(&job);
        match media_ffmpeg::export_overlay_mp4(&request).await {
            Ok(()) => ExportStatus::Completed,
            Err(err) if err.is_interrupted() => ExportStatus::Cancelled,
            Err(err) => ExportStatus::Failed(err.to_string()),
        }
    }
}

fn asset_from_probe(info: MediaInfo) -> Result<MediaAsset> {
    let duration_seconds = info
        .duration_seconds
        .or_else(|| {
            info.streams
                .iter()
                .filter_map(|stream| stream.duration_seconds)
                .reduce(f64::max)
        })
        .ok_or_else(|| RenderError::asset(&info.path, "duration is unknown"))?;
    let duration = MediaTime::from_seconds(duration_seconds);

    let video_tracks = info
        .video_streams()
        .map(|stream| video_track(stream, duration))
        .collect::<Vec<_>>();
    let audio_tracks = info
        .audio_streams()
        .map(|stream| AssetAudioTrack {
            track_index: stream.index,
            sample_rate: stream.sample_rate,
            channels: stream.channels,
            time_range: stream_range(stream, duration),
        })
        .collect::<Vec<_>>();

    debug!(
        path = %info.path.display(),
        duration = duration_seconds,
        video_tracks = video_tracks.len(),
        audio_tracks = audio_tracks.len(),
        "asset loaded"
    );

    Ok(MediaAsset {
        path: info.path,
        duration,
        video_tracks,
        audio_tracks,
    })
}

fn video_track(stream: &StreamInfo, asset_duration: MediaTime) -> AssetVideoTrack {
    AssetVideoTrack {
        track_index: stream.index,
        natural_size: Size::new(
            f64::from(stream.width.unwrap_or(0)),
            f64::from(stream.height.unwrap_or(0)),
        ),
        preferred_transform: AffineTransform::from_rotation_degrees(stream.rotation_degrees),
        frame_rate: stream.frame_rate.map(Rational::as_f64),
        timescale: stream
            .time_base
            .filter(|time_base| time_base.num > 0)
            .map(|time_base| time_base.den / time_base.num),
        time_range: stream_range(stream, asset_duration),
    }
}

fn stream_range(stream: &StreamInfo, asset_duration: MediaTime) -> TimeRange {
    let duration = stream
        .duration_seconds
        .map(MediaTime::from_seconds)
        .unwrap_or(asset_duration);
    TimeRange::new(MediaTime::ZERO, duration)
}

/// Translates a job into the ffmpeg overlay request, rounding geometry to
/// whole pixels.
pub(crate) fn overlay_export_request(job: &ExportJob) -> OverlayExportRequest {
    let frame_rate = i32::try_from(job.render_spec.frame_rate)
        .ok()
        .and_then(|fps| Rational::new(fps, 1).ok())
        .unwrap_or_else(|| {
            warn!(
                frame_rate = job.render_spec.frame_rate,
                "unsupported frame rate, using 30 fps"
            );
            Rational::FPS_30
        });

    OverlayExportRequest {
        input: job.composition.source.clone(),
        output_path: job.output_path.clone(),
        duration_seconds: job.composition.duration.seconds(),
        render_width: pixels(job.render_spec.render_size.width),
        render_height: pixels(job.render_spec.render_size.height),
        frame_rate,
        include_audio: job.composition.audio.is_some(),
        overlays: job
            .overlay
            .elements
            .iter()
            .map(|element| overlay_graphic(element, &job.overlay))
            .collect(),
        encoding: EncodingSettings {
            video_codec: job.settings.video_codec.clone(),
            preset: job.settings.preset.clone(),
            crf: job.settings.crf,
            audio_codec: job.settings.audio_codec.clone(),
        },
    }
}

fn overlay_graphic(element: &OverlayElement, layer: &OverlayLayer) -> OverlayGraphic {
    let inset = (element.text_frame.x - element.bounds.x).round() as i64;
    let align = match element.alignment {
        CaptionAlignment::Left => TextAlign::Left,
        CaptionAlignment::Center => TextAlign::Center,
        CaptionAlignment::Right => TextAlign::Right,
    };

    OverlayGraphic {
        x: element.bounds.x.round() as i64,
        y: element.bounds.y.round() as i64,
        width: pixels(element.bounds.width).max(1),
        height: pixels(element.bounds.height).max(1),
        fill: layer.style.plate_color.clone(),
        style: TextStyle {
            font_size: pixels(element.font_size).max(1),
            color: layer.style.text_color.clone(),
            font_file: layer.style.font_file.clone(),
        },
        lines: element
            .lines
            .iter()
            .enumerate()
            .map(|(index, text)| OverlayTextLine {
                text: text.clone(),
                y: element.line_offset(index).round() as i64,
                inset,
                align,
            })
            .collect(),
        fade_in_at: element.fade_in.start.seconds(),
        fade_out_at: element.fade_out.start.seconds(),
        fade_seconds: element.fade_in.duration.seconds(),
    }
}

fn pixels(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}
