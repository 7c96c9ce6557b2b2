use std::path::PathBuf;

use tracing::debug;

use crate::config::OverlayConfig;
use crate::error::{RenderError, Result};
use crate::geometry::{AffineTransform, Rect, Size};
use crate::orientation::{ResolvedOrientation, resolve_orientation};
use crate::time::{MediaTime, TimeRange};

/// Read-only description of a source file, as loaded by a media backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub duration: MediaTime,
    pub video_tracks: Vec<AssetVideoTrack>,
    pub audio_tracks: Vec<AssetAudioTrack>,
}

impl MediaAsset {
    pub fn first_video(&self) -> Option<&AssetVideoTrack> {
        self.video_tracks.first()
    }

    pub fn first_audio(&self) -> Option<&AssetAudioTrack> {
        self.audio_tracks.first()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetVideoTrack {
    /// Stream index inside the container.
    pub track_index: u32,
    pub natural_size: Size,
    pub preferred_transform: AffineTransform,
    pub frame_rate: Option<f64>,
    /// Ticks per second of the track's time base, when known.
    pub timescale: Option<i32>,
    pub time_range: TimeRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetAudioTrack {
    pub track_index: u32,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub time_range: TimeRange,
}

/// A source track inserted into the composition timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionTrack {
    pub source_track_index: u32,
    pub time_range: TimeRange,
    pub preferred_transform: AffineTransform,
}

/// Editable timeline mirroring the whole source asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub source: PathBuf,
    pub duration: MediaTime,
    pub natural_size: Size,
    pub video: CompositionTrack,
    pub audio: Option<CompositionTrack>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    BaseVideo,
    Overlay,
}

/// One entry of the layer stack, bottom first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub role: LayerRole,
    pub frame: Rect,
}

/// Output frame geometry and timing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSpec {
    pub render_size: Size,
    pub frame_rate: u32,
    pub frame_duration: MediaTime,
    pub orientation: ResolvedOrientation,
    pub layer_stack: Vec<Layer>,
}

/// Builds a [`Composition`] and its [`RenderSpec`] from a loaded asset.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompositionBuilder;

impl CompositionBuilder {
    /// Inserts the first video track, and the first audio track when present,
    /// over `[0, asset.duration)`.
    pub fn build(&self, asset: &MediaAsset) -> Result<Composition> {
        let video = asset
            .first_video()
            .ok_or_else(|| RenderError::MissingVideoTrack(asset.path.clone()))?;

        let range = TimeRange::new(MediaTime::ZERO, asset.duration);
        if range.is_empty() {
            return Err(RenderError::composition(format!(
                "asset duration is not positive: {}s",
                asset.duration.seconds()
            )));
        }
        if video.natural_size.is_empty() {
            return Err(RenderError::composition(format!(
                "video track {} has no frame size",
                video.track_index
            )));
        }
        if video.timescale.is_none_or(|timescale| timescale <= 0) {
            return Err(RenderError::composition(format!(
                "video track {} has no time base",
                video.track_index
            )));
        }
        if video.time_range.is_empty() {
            return Err(RenderError::composition(format!(
                "video track {} has no media to insert",
                video.track_index
            )));
        }

        let audio = asset
            .first_audio()
            .map(|track| {
                if track.time_range.is_empty() {
                    return Err(RenderError::composition(format!(
                        "audio track {} has no media to insert",
                        track.track_index
                    )));
                }
                Ok(CompositionTrack {
                    source_track_index: track.track_index,
                    time_range: range,
                    preferred_transform: AffineTransform::IDENTITY,
                })
            })
            .transpose()?;

        debug!(
            source = %asset.path.display(),
            duration = asset.duration.seconds(),
            video_track = video.track_index,
            has_audio = audio.is_some(),
            "composition built"
        );

        Ok(Composition {
            source: asset.path.clone(),
            duration: asset.duration,
            natural_size: video.natural_size,
            video: CompositionTrack {
                source_track_index: video.track_index,
                time_range: range,
                preferred_transform: video.preferred_transform,
            },
            audio,
        })
    }

    /// Resolves orientation and frames both layers to the oriented size.
    ///
    /// Render dimensions are rounded down to even values, as 4:2:0 output
    /// requires.
    pub fn render_spec(&self, composition: &Composition, config: &OverlayConfig) -> RenderSpec {
        let orientation = resolve_orientation(
            &composition.video.preferred_transform,
            composition.natural_size,
        );
        let render_size = Size::new(
            even_floor(orientation.render_size.width),
            even_floor(orientation.render_size.height),
        );
        let frame = Rect::from_size(render_size);
        let frame_rate = config.frame_rate.max(1);

        RenderSpec {
            render_size,
            frame_rate,
            frame_duration: MediaTime::new(1, i32::try_from(frame_rate).unwrap_or(i32::MAX)),
            orientation,
            layer_stack: vec![
                Layer {
                    role: LayerRole::BaseVideo,
                    frame,
                },
                Layer {
                    role: LayerRole::Overlay,
                    frame,
                },
            ],
        }
    }
}

fn even_floor(value: f64) -> f64 {
    let floored = (value.max(0.0) as u64) & !1;
    floored.max(2) as f64
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use super::{
        AssetAudioTrack, AssetVideoTrack, CompositionBuilder, LayerRole, MediaAsset,
    };
    use crate::config::OverlayConfig;
    use crate::error::RenderErrorKind;
    use crate::geometry::{AffineTransform, Size};
    use crate::orientation::Orientation;
    use crate::time::{MediaTime, TimeRange};

    pub(crate) fn asset(seconds: i64, rotation: i32, with_audio: bool) -> MediaAsset {
        let range = TimeRange::new(MediaTime::ZERO, MediaTime::from_whole_seconds(seconds));
        MediaAsset {
            path: PathBuf::from("/videos/squat.mov"),
            duration: MediaTime::from_whole_seconds(seconds),
            video_tracks: vec![AssetVideoTrack {
                track_index: 0,
                natural_size: Size::new(1920.0, 1080.0),
                preferred_transform: AffineTransform::from_rotation_degrees(rotation),
                frame_rate: Some(30.0),
                timescale: Some(600),
                time_range: range,
            }],
            audio_tracks: if with_audio {
                vec![AssetAudioTrack {
                    track_index: 1,
                    sample_rate: Some(44_100),
                    channels: Some(2),
                    time_range: range,
                }]
            } else {
                Vec::new()
            },
        }
    }

    #[test]
    fn build_inserts_video_and_audio_over_full_duration() {
        let composition = CompositionBuilder
            .build(&asset(10, 90, true))
            .expect("composition should build");

        assert_eq!(composition.duration, MediaTime::from_whole_seconds(10));
        assert_eq!(composition.video.time_range.start, MediaTime::ZERO);
        assert_eq!(
            composition.video.time_range.end(),
            MediaTime::from_whole_seconds(10)
        );
        assert_eq!(
            composition.video.preferred_transform,
            AffineTransform::from_rotation_degrees(90)
        );
        let audio = composition.audio.expect("audio track should be inserted");
        assert_eq!(audio.source_track_index, 1);
        assert_eq!(audio.time_range, composition.video.time_range);
    }

    #[test]
    fn build_without_audio_has_no_audio_track() {
        let composition = CompositionBuilder
            .build(&asset(10, 0, false))
            .expect("composition should build");
        assert!(composition.audio.is_none());
    }

    #[test]
    fn build_without_video_is_asset_error() {
        let mut source = asset(10, 0, true);
        source.video_tracks.clear();

        let err = CompositionBuilder
            .build(&source)
            .expect_err("audio-only asset must fail");
        assert_eq!(err.kind(), RenderErrorKind::AssetError);
    }

    #[test]
    fn build_rejects_empty_duration_and_broken_tracks() {
        let mut zero = asset(10, 0, false);
        zero.duration = MediaTime::ZERO;

        let mut no_time_base = asset(10, 0, false);
        no_time_base.video_tracks[0].timescale = None;

        let mut no_size = asset(10, 0, false);
        no_size.video_tracks[0].natural_size = Size::ZERO;

        let mut empty_audio = asset(10, 0, true);
        empty_audio.audio_tracks[0].time_range = TimeRange::default();

        for source in [zero, no_time_base, no_size, empty_audio] {
            let err = CompositionBuilder
                .build(&source)
                .expect_err("insert should fail");
            assert_eq!(err.kind(), RenderErrorKind::CompositionFailure);
        }
    }

    #[test]
    fn render_spec_uses_oriented_size_and_frame_rate() {
        let builder = CompositionBuilder;
        let composition = builder
            .build(&asset(10, 90, true))
            .expect("composition should build");

        let spec = builder.render_spec(&composition, &OverlayConfig::default());

        assert_eq!(spec.orientation.orientation, Orientation::Right);
        assert_eq!(spec.render_size, Size::new(1080.0, 1920.0));
        assert_eq!(spec.frame_rate, 30);
        assert_eq!(spec.frame_duration, MediaTime::new(1, 30));
        let roles = spec
            .layer_stack
            .iter()
            .map(|layer| layer.role)
            .collect::<Vec<_>>();
        assert_eq!(roles, [LayerRole::BaseVideo, LayerRole::Overlay]);
        assert!(
            spec.layer_stack
                .iter()
                .all(|layer| layer.frame.size() == spec.render_size)
        );
    }

    #[test]
    fn render_spec_rounds_odd_dimensions_down() {
        let builder = CompositionBuilder;
        let mut source = asset(10, 0, false);
        source.video_tracks[0].natural_size = Size::new(721.0, 405.0);
        let composition = builder.build(&source).expect("composition should build");

        let spec = builder.render_spec(&composition, &OverlayConfig::default());
        assert_eq!(spec.render_size, Size::new(720.0, 404.0));
    }
}
