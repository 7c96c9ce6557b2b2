use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::OverlayConfig;
use crate::geometry::{Rect, Size};
use crate::layout::{TextLayout, TextLayoutEngine, TextMeasure};
use crate::schedule::{CaptionAlignment, CaptionEvent};
use crate::time::{MediaTime, TimeRange};

/// Linear opacity change over `[start, start + duration]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityRamp {
    pub start: MediaTime,
    pub duration: MediaTime,
    pub from: f64,
    pub to: f64,
}

impl OpacityRamp {
    /// Opacity at `t`: `from` before the ramp, `to` after it.
    pub fn value_at(&self, t: MediaTime) -> f64 {
        if t < self.start {
            return self.from;
        }
        let duration = self.duration.seconds();
        if duration <= 0.0 {
            return self.to;
        }
        let progress = ((t - self.start).seconds() / duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * progress
    }

    pub fn end(&self) -> MediaTime {
        self.start + self.duration
    }
}

/// Colors and font shared by every caption in a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionStyle {
    pub plate_color: String,
    pub text_color: String,
    pub font_file: Option<PathBuf>,
}

/// A positioned caption plate with its wrapped text and fades.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayElement {
    pub text: String,
    /// Plate rectangle in render coordinates.
    pub bounds: Rect,
    /// Text box in render coordinates, inset by the plate padding.
    pub text_frame: Rect,
    pub lines: Vec<String>,
    pub font_size: f64,
    pub line_height: f64,
    pub line_spacing: f64,
    pub alignment: CaptionAlignment,
    /// From fade-in start until the fade-out has finished.
    pub visible_window: TimeRange,
    pub fade_in: OpacityRamp,
    pub fade_out: OpacityRamp,
}

impl OverlayElement {
    /// Combined opacity of both fades at `t`.
    pub fn opacity_at(&self, t: MediaTime) -> f64 {
        if !self.visible_window.contains(t) {
            return 0.0;
        }
        self.fade_in.value_at(t).min(self.fade_out.value_at(t))
    }

    /// Top of line `index`, relative to the plate.
    pub fn line_offset(&self, index: usize) -> f64 {
        let padding = self.text_frame.y - self.bounds.y;
        padding + index as f64 * (self.line_height + self.line_spacing)
    }
}

/// Caption elements framed to one render size, drawn in order.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    pub frame: Size,
    pub style: CaptionStyle,
    pub elements: Vec<OverlayElement>,
}

/// Turns scheduled captions into positioned, fading plates.
#[derive(Debug, Clone)]
pub struct OverlayRenderer<M = crate::layout::ApproximateMetrics> {
    layout: TextLayoutEngine<M>,
    font_size: f64,
    margin: f64,
    plate_padding: f64,
    bottom_offset: f64,
    fade_duration: MediaTime,
    style: CaptionStyle,
}

impl OverlayRenderer {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::with_layout(
            TextLayoutEngine::new(config.line_height_factor, config.line_spacing),
            config,
        )
    }
}

impl<M: TextMeasure> OverlayRenderer<M> {
    pub fn with_layout(layout: TextLayoutEngine<M>, config: &OverlayConfig) -> Self {
        Self {
            layout,
            font_size: config.font_size,
            margin: config.margin,
            plate_padding: config.plate_padding,
            bottom_offset: config.bottom_offset,
            fade_duration: MediaTime::from_seconds(config.fade_duration),
            style: CaptionStyle {
                plate_color: config.plate_color.clone(),
                text_color: config.text_color.clone(),
                font_file: config.font_file.clone(),
            },
        }
    }

    /// Lays out one plate per event, bottom-centered in `render_size`.
    pub fn render(&self, events: &[CaptionEvent], render_size: Size) -> OverlayLayer {
        let max_text_width = render_size.width - 2.0 * self.margin - 2.0 * self.plate_padding;

        let elements = events
            .iter()
            .filter_map(|event| {
                let layout = self
                    .layout
                    .layout(&event.text, max_text_width, self.font_size);
                if layout.lines.is_empty() {
                    warn!(
                        start = event.start.seconds(),
                        "caption skipped: no visible text"
                    );
                    return None;
                }
                Some(self.element(event, layout, render_size))
            })
            .collect::<Vec<_>>();

        debug!(
            captions = events.len(),
            elements = elements.len(),
            width = render_size.width,
            height = render_size.height,
            "overlay layer rendered"
        );

        OverlayLayer {
            frame: render_size,
            style: self.style.clone(),
            elements,
        }
    }

    fn element(&self, event: &CaptionEvent, layout: TextLayout, frame: Size) -> OverlayElement {
        let padding = self.plate_padding;
        let width = (layout.size.width + 2.0 * padding).min(frame.width);
        let height = (layout.size.height + 2.0 * padding).min(frame.height);

        let x = ((frame.width - width) / 2.0).clamp(0.0, frame.width - width);
        let y = (frame.height - self.bottom_offset - height).clamp(0.0, frame.height - height);
        let bounds = Rect::new(x, y, width, height);
        let text_frame = Rect::new(
            x + padding,
            y + padding,
            layout.size.width.min((width - 2.0 * padding).max(0.0)),
            layout.size.height.min((height - 2.0 * padding).max(0.0)),
        );

        let fade_in = OpacityRamp {
            start: event.start,
            duration: self.fade_duration,
            from: 0.0,
            to: 1.0,
        };
        let fade_out = OpacityRamp {
            start: event.end,
            duration: self.fade_duration,
            from: 1.0,
            to: 0.0,
        };

        OverlayElement {
            text: event.text.clone(),
            bounds,
            text_frame,
            lines: layout.lines,
            font_size: self.font_size,
            line_height: layout.line_height,
            line_spacing: self.layout.line_spacing(),
            alignment: event.alignment,
            visible_window: TimeRange::from_bounds(event.start, fade_out.end()),
            fade_in,
            fade_out,
        }
    }
}
