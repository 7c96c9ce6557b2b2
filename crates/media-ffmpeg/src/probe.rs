use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::error::{MediaFfmpegError, Result};
use crate::time::Rational;

/// Stream kind discovered by probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Other,
}

/// Stream metadata read from `ffprobe`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub index: u32,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
    pub time_base: Option<Rational>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<Rational>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub duration_seconds: Option<f64>,
    /// Clockwise rotation, in degrees, a player applies before display.
    pub rotation_degrees: i32,
}

/// Media probe result.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub streams: Vec<StreamInfo>,
    pub duration_seconds: Option<f64>,
}

impl MediaInfo {
    /// Returns every video stream in container order.
    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams
            .iter()
            .filter(|stream| stream.kind == StreamKind::Video)
    }

    /// Returns every audio stream in container order.
    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams
            .iter()
            .filter(|stream| stream.kind == StreamKind::Audio)
    }

    /// Returns the first video stream.
    ///
    /// # Example
    /// ```no_run
    /// use media_ffmpeg::probe_media;
    ///
    /// let info = probe_media("workout.mov").expect("probe should succeed");
    /// let _video = info.first_video().expect("video stream exists");
    /// ```
    pub fn first_video(&self) -> Option<&StreamInfo> {
        self.video_streams().next()
    }

    /// Returns the first audio stream.
    pub fn first_audio(&self) -> Option<&StreamInfo> {
        self.audio_streams().next()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<RawStream>,
    format: Option<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    time_base: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    duration: Option<String>,
    #[serde(default)]
    disposition: RawDisposition,
    #[serde(default)]
    tags: RawTags,
    #[serde(default)]
    side_data_list: Vec<RawSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Default, Deserialize)]
struct RawTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSideData {
    side_data_type: Option<String>,
    rotation: Option<f64>,
}

/// Probes a media file via `ffprobe` JSON output.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::probe_media;
///
/// let info = probe_media("workout.mov").expect("probe should succeed");
/// assert!(!info.streams.is_empty());
/// ```
pub fn probe_media(path: impl AsRef<Path>) -> Result<MediaInfo> {
    let path = path.as_ref();

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "run ffprobe",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: format!("ffprobe {}", path.display()),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let info = parse_probe_json(path, &output.stdout)?;
    debug!(
        path = %path.display(),
        streams = info.streams.len(),
        duration_seconds = ?info.duration_seconds,
        "probed media"
    );
    Ok(info)
}

fn parse_probe_json(path: &Path, stdout: &[u8]) -> Result<MediaInfo> {
    let raw: ProbeOutput = serde_json::from_slice(stdout)?;

    let streams = raw
        .streams
        .into_iter()
        .map(convert_stream)
        .collect::<Result<Vec<_>>>()?;
    let duration_seconds = raw
        .format
        .and_then(|format| format.duration)
        .map(|value| parse_seconds(&value, "format duration"))
        .transpose()?
        .flatten();

    Ok(MediaInfo {
        path: path.to_path_buf(),
        streams,
        duration_seconds,
    })
}

fn convert_stream(raw: RawStream) -> Result<StreamInfo> {
    // Cover art is a single still picture muxed as a video stream.
    let kind = match raw.codec_type.as_deref() {
        Some("video") if raw.disposition.attached_pic != 0 => StreamKind::Other,
        Some("video") => StreamKind::Video,
        Some("audio") => StreamKind::Audio,
        _ => StreamKind::Other,
    };
    let frame_rate = optional_rational(raw.avg_frame_rate.as_deref())
        .or_else(|| optional_rational(raw.r_frame_rate.as_deref()));
    let sample_rate = raw
        .sample_rate
        .as_deref()
        .map(|value| {
            value.parse::<u32>().map_err(|_| MediaFfmpegError::Parse {
                context: "sample_rate",
                value: value.to_string(),
            })
        })
        .transpose()?;
    let duration_seconds = raw
        .duration
        .as_deref()
        .map(|value| parse_seconds(value, "stream duration"))
        .transpose()?
        .flatten();

    Ok(StreamInfo {
        index: raw.index,
        kind,
        codec_name: raw.codec_name,
        time_base: optional_rational(raw.time_base.as_deref()),
        width: raw.width.filter(|width| *width > 0),
        height: raw.height.filter(|height| *height > 0),
        frame_rate,
        sample_rate,
        channels: raw.channels,
        duration_seconds,
        rotation_degrees: display_rotation(&raw.tags, &raw.side_data_list),
    })
}

/// Resolves the clockwise display rotation.
///
/// The display matrix side data stores the counter-clockwise angle, the legacy
/// `rotate` tag the clockwise one. Side data wins when both are present.
fn display_rotation(tags: &RawTags, side_data: &[RawSideData]) -> i32 {
    let from_matrix = side_data
        .iter()
        .filter(|entry| entry.side_data_type.as_deref() == Some("Display Matrix"))
        .find_map(|entry| entry.rotation)
        .map(|ccw| -(ccw.round() as i32));
    let from_tag = tags
        .rotate
        .as_deref()
        .and_then(|value| value.trim().parse::<i32>().ok());

    from_matrix.or(from_tag).unwrap_or(0).rem_euclid(360)
}

fn optional_rational(value: Option<&str>) -> Option<Rational> {
    value.and_then(|raw| Rational::parse(raw).ok())
}

fn parse_seconds(value: &str, context: &'static str) -> Result<Option<f64>> {
    if value.is_empty() || value == "N/A" {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| MediaFfmpegError::Parse {
            context,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{StreamKind, parse_probe_json};
    use crate::Rational;

    const PORTRAIT_PHONE_CLIP: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30/1",
                "avg_frame_rate": "30/1",
                "time_base": "1/600",
                "duration": "10.000000",
                "tags": { "rotate": "90" },
                "side_data_list": [
                    { "side_data_type": "Display Matrix", "rotation": -90 }
                ]
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "sample_rate": "44100",
                "channels": 2,
                "time_base": "1/44100",
                "duration": "9.980000"
            },
            {
                "index": 2,
                "codec_type": "data",
                "time_base": "1/600"
            }
        ],
        "format": { "duration": "10.000000" }
    }"#;

    #[test]
    fn parse_probe_json_reads_streams_and_display_rotation() {
        let info = parse_probe_json(Path::new("clip.mov"), PORTRAIT_PHONE_CLIP.as_bytes())
            .expect("probe json should parse");

        assert_eq!(info.streams.len(), 3);
        assert_eq!(info.duration_seconds, Some(10.0));

        let video = info.first_video().expect("video stream should exist");
        assert_eq!(video.width, Some(1920));
        assert_eq!(video.height, Some(1080));
        assert_eq!(video.rotation_degrees, 90);
        assert_eq!(video.frame_rate, Some(Rational::FPS_30));

        let audio = info.first_audio().expect("audio stream should exist");
        assert_eq!(audio.sample_rate, Some(44_100));
        assert_eq!(audio.channels, Some(2));
        assert_eq!(info.streams[2].kind, StreamKind::Other);
    }

    #[test]
    fn legacy_rotate_tag_is_used_without_display_matrix() {
        let json = r#"{
            "streams": [
                { "index": 0, "codec_type": "video", "width": 640, "height": 480,
                  "tags": { "rotate": "270" } }
            ]
        }"#;

        let info = parse_probe_json(Path::new("clip.mp4"), json.as_bytes())
            .expect("probe json should parse");
        let video = info.first_video().expect("video stream should exist");
        assert_eq!(video.rotation_degrees, 270);
        assert_eq!(info.duration_seconds, None);
    }

    #[test]
    fn audio_only_file_has_no_video_stream() {
        let json = r#"{
            "streams": [
                { "index": 0, "codec_type": "audio", "sample_rate": "48000", "channels": 1 }
            ],
            "format": { "duration": "N/A" }
        }"#;

        let info = parse_probe_json(Path::new("voice.m4a"), json.as_bytes())
            .expect("probe json should parse");
        assert!(info.first_video().is_none());
        assert_eq!(info.duration_seconds, None);
    }

    #[test]
    fn cover_art_is_not_a_video_stream() {
        let json = r#"{
            "streams": [
                { "index": 0, "codec_type": "audio", "codec_name": "aac",
                  "sample_rate": "44100", "channels": 2,
                  "disposition": { "default": 1, "attached_pic": 0 } },
                { "index": 1, "codec_type": "video", "codec_name": "mjpeg",
                  "width": 600, "height": 600,
                  "disposition": { "default": 0, "attached_pic": 1 } }
            ],
            "format": { "duration": "184.320000" }
        }"#;

        let info = parse_probe_json(Path::new("set-break.m4a"), json.as_bytes())
            .expect("probe json should parse");
        assert!(info.first_video().is_none());
        assert_eq!(info.streams[1].kind, StreamKind::Other);
        assert!(info.first_audio().is_some());
    }
}
