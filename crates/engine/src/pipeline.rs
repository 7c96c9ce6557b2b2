use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{ExportSettings, FfmpegMediaBackend, MediaBackend};
use crate::composition::CompositionBuilder;
use crate::config::OverlayConfig;
use crate::error::{RenderError, Result};
use crate::export::Exporter;
use crate::overlay::OverlayRenderer;
use crate::schedule::{AnalysisResponse, RawCaptionItem, caption_items_from_json, schedule};

/// Burns timed captions into a copy of a local video.
///
/// # Example
/// ```no_run
/// use overlay_engine::{OverlayConfig, OverlayPipeline, RawCaptionItem};
///
/// # async fn demo() -> overlay_engine::Result<()> {
/// let pipeline = OverlayPipeline::with_ffmpeg(OverlayConfig::default())?;
/// let output = pipeline
///     .render(
///         "file:///videos/squat.mov",
///         &[RawCaptionItem::new("00:01", "Keep your chest up")],
///     )
///     .await?;
/// println!("{}", output.display());
/// # Ok(())
/// # }
/// ```
pub struct OverlayPipeline<B> {
    backend: B,
    config: OverlayConfig,
    builder: CompositionBuilder,
    renderer: OverlayRenderer,
}

impl OverlayPipeline<FfmpegMediaBackend> {
    pub fn with_ffmpeg(config: OverlayConfig) -> Result<Self> {
        Self::new(FfmpegMediaBackend, config)
    }
}

impl<B: MediaBackend> OverlayPipeline<B> {
    /// Validates `config` and wires the pipeline to `backend`.
    pub fn new(backend: B, config: OverlayConfig) -> Result<Self> {
        config.validate()?;
        let renderer = OverlayRenderer::from_config(&config);
        Ok(Self {
            backend,
            config,
            builder: CompositionBuilder,
            renderer,
        })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Renders `items` over the video at `input` and returns the new file.
    ///
    /// `input` is a `file://` URI or a filesystem path. Nothing is written
    /// unless the whole render succeeds.
    pub async fn render(&self, input: &str, items: &[RawCaptionItem]) -> Result<PathBuf> {
        let path = normalize_input(input)?;
        info!(input = %path.display(), captions = items.len(), "render started");

        let asset = self.backend.load_asset(&path)?;
        let composition = self.builder.build(&asset)?;
        let render_spec = self.builder.render_spec(&composition, &self.config);

        let events = schedule(items, composition.duration, self.config.degenerate_policy);
        debug!(
            scheduled = events.len(),
            dropped = items.len() - events.len(),
            "captions scheduled"
        );
        let overlay = self.renderer.render(&events, render_spec.render_size);

        let mut exporter = Exporter::new(
            &self.backend,
            self.config.output_dir(),
            ExportSettings::from(&self.config),
        );
        let output = exporter.export(&composition, &render_spec, &overlay).await?;

        info!(
            input = %path.display(),
            output = %output.display(),
            overlays = overlay.elements.len(),
            "render finished"
        );
        Ok(output)
    }

    pub async fn render_analysis(
        &self,
        input: &str,
        response: &AnalysisResponse,
    ) -> Result<PathBuf> {
        debug!(exercise = %response.exercise, "rendering analysis response");
        self.render(input, &response.analysis).await
    }

    /// Like [`render`](Self::render), for untrusted JSON: either the analysis
    /// object or a bare item array. Malformed items are skipped.
    pub async fn render_json(&self, input: &str, captions: &Value) -> Result<PathBuf> {
        let items = caption_items_from_json(captions);
        self.render(input, &items).await
    }
}

/// Resolves a `file://` URI or plain path to an absolute local path.
///
/// # Example
/// ```
/// use std::path::PathBuf;
/// use overlay_engine::normalize_input;
///
/// let path = normalize_input("file:///videos/my%20squat.mov").expect("local file");
/// assert_eq!(path, PathBuf::from("/videos/my squat.mov"));
/// assert!(normalize_input("https://example.com/squat.mov").is_err());
/// ```
pub fn normalize_input(input: &str) -> Result<PathBuf> {
    let bad = || RenderError::BadInputUrl {
        input: input.to_string(),
    };
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(bad());
    }

    if let Some((scheme, rest)) = split_scheme(trimmed) {
        if !scheme.eq_ignore_ascii_case("file") {
            return Err(bad());
        }
        let (host, encoded_path) = match rest.find('/') {
            Some(slash) => rest.split_at(slash),
            None => return Err(bad()),
        };
        if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
            return Err(bad());
        }
        let decoded = urlencoding::decode(encoded_path).map_err(|_| bad())?;
        let path = PathBuf::from(decoded.into_owned());
        if !path.is_absolute() {
            return Err(bad());
        }
        return Ok(path);
    }

    let path = Path::new(trimmed);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|_| bad())?;
    Ok(cwd.join(path))
}

/// Splits `scheme://rest` when the prefix is a syntactically valid scheme.
fn split_scheme(input: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = input.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}
