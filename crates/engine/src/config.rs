use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::schedule::DegeneratePolicy;

/// Styling, timing and encoder settings for one render.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct OverlayConfig {
    pub font_size: f64,
    pub line_height_factor: f64,
    pub line_spacing: f64,
    /// Minimum horizontal distance between a plate and the frame edge.
    pub margin: f64,
    pub plate_padding: f64,
    /// Distance from the frame bottom to the plate's bottom edge.
    pub bottom_offset: f64,
    pub fade_duration: f64,
    pub frame_rate: u32,
    pub plate_color: String,
    pub text_color: String,
    pub font_file: Option<PathBuf>,
    /// Where finished renders land; the OS temp dir when unset.
    pub output_dir: Option<PathBuf>,
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub audio_codec: String,
    pub degenerate_policy: DegeneratePolicy,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_size: 24.0,
            line_height_factor: 1.2,
            line_spacing: 4.0,
            margin: 20.0,
            plate_padding: 10.0,
            bottom_offset: 60.0,
            fade_duration: 0.3,
            frame_rate: 30,
            plate_color: "black@0.8".to_string(),
            text_color: "white".to_string(),
            font_file: None,
            output_dir: None,
            video_codec: "libx264".to_string(),
            crf: 18,
            preset: "medium".to_string(),
            audio_codec: "aac".to_string(),
            degenerate_policy: DegeneratePolicy::Drop,
        }
    }
}

impl OverlayConfig {
    /// Loads and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| RenderError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|source| RenderError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("fontSize", self.font_size),
            ("lineHeightFactor", self.line_height_factor),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }

        let non_negative = [
            ("lineSpacing", self.line_spacing),
            ("margin", self.margin),
            ("platePadding", self.plate_padding),
            ("bottomOffset", self.bottom_offset),
            ("fadeDuration", self.fade_duration),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must not be negative, got {value}")));
            }
        }

        if !(1..=240).contains(&self.frame_rate) {
            return Err(invalid(format!(
                "frameRate must be between 1 and 240, got {}",
                self.frame_rate
            )));
        }
        if self.crf > 51 {
            return Err(invalid(format!("crf must be at most 51, got {}", self.crf)));
        }

        let required = [
            ("plateColor", &self.plate_color),
            ("textColor", &self.text_color),
            ("videoCodec", &self.video_codec),
            ("preset", &self.preset),
            ("audioCodec", &self.audio_codec),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(format!("{name} must not be empty")));
            }
        }

        if let DegeneratePolicy::Clamp {
            min_visible_seconds,
        } = self.degenerate_policy
        {
            if !min_visible_seconds.is_finite() || min_visible_seconds <= 0.0 {
                return Err(invalid(format!(
                    "degeneratePolicy.minVisibleSeconds must be positive, got {min_visible_seconds}"
                )));
            }
        }

        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn invalid(reason: String) -> RenderError {
    RenderError::InvalidConfig { reason }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::OverlayConfig;
    use crate::error::RenderErrorKind;
    use crate::schedule::DegeneratePolicy;

    #[test]
    fn defaults_are_valid() {
        let config = OverlayConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.font_size, 24.0);
        assert_eq!(config.bottom_offset, 60.0);
        assert_eq!(config.fade_duration, 0.3);
        assert_eq!(config.output_dir(), std::env::temp_dir());
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_keys() {
        let config: OverlayConfig = serde_json::from_str(
            r#"{ "fontSize": 32, "degeneratePolicy": { "mode": "clamp", "minVisibleSeconds": 1.0 } }"#,
        )
        .expect("config should parse");

        assert_eq!(config.font_size, 32.0);
        assert_eq!(config.plate_padding, 10.0);
        assert_eq!(
            config.degenerate_policy,
            DegeneratePolicy::Clamp {
                min_visible_seconds: 1.0
            }
        );
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = OverlayConfig::default();
        config.frame_rate = 0;
        assert!(config.validate().is_err());

        let mut config = OverlayConfig::default();
        config.fade_duration = -0.1;
        assert!(config.validate().is_err());

        let mut config = OverlayConfig::default();
        config.video_codec = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_json_file_reports_config_kind() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        file.write_all(br#"{ "fontSize": 0 }"#)
            .expect("config should be written");

        let err = OverlayConfig::from_json_file(file.path()).expect_err("zero font size");
        assert_eq!(err.kind(), RenderErrorKind::Config);

        let mut unknown = tempfile::NamedTempFile::new().expect("temp file should be created");
        unknown
            .write_all(br#"{ "fontSzie": 30 }"#)
            .expect("config should be written");
        let err = OverlayConfig::from_json_file(unknown.path()).expect_err("unknown key");
        assert_eq!(err.kind(), RenderErrorKind::Config);
    }
}
