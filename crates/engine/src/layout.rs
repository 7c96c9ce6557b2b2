use crate::geometry::Size;

/// Glyph advance source used for line breaking.
pub trait TextMeasure {
    /// Horizontal advance of `text` rendered at `font_size`.
    fn advance(&self, text: &str, font_size: f64) -> f64;
}

/// Width estimate from per-character advance ratios of the font size.
///
/// Tuned for a proportional sans-serif face; it only needs to be close enough
/// that plates fit the text `drawtext` renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximateMetrics {
    pub average_ratio: f64,
    pub narrow_ratio: f64,
    pub wide_ratio: f64,
    pub space_ratio: f64,
}

impl Default for ApproximateMetrics {
    fn default() -> Self {
        Self {
            average_ratio: 0.56,
            narrow_ratio: 0.3,
            wide_ratio: 0.8,
            space_ratio: 0.28,
        }
    }
}

impl TextMeasure for ApproximateMetrics {
    fn advance(&self, text: &str, font_size: f64) -> f64 {
        let ratio_sum = text
            .chars()
            .map(|ch| match ch {
                ' ' | '\t' => self.space_ratio,
                'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => {
                    self.narrow_ratio
                }
                'm' | 'w' | 'M' | 'W' | '@' => self.wide_ratio,
                _ => self.average_ratio,
            })
            .sum::<f64>();
        ratio_sum * font_size
    }
}

/// Wrapped caption text and its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    pub line_widths: Vec<f64>,
    pub line_height: f64,
    pub size: Size,
}

impl TextLayout {
    fn empty(line_height: f64) -> Self {
        Self {
            lines: Vec::new(),
            line_widths: Vec::new(),
            line_height,
            size: Size::ZERO,
        }
    }
}

/// Greedy word wrapper producing the minimal box for a caption.
#[derive(Debug, Clone)]
pub struct TextLayoutEngine<M = ApproximateMetrics> {
    measure: M,
    line_height_factor: f64,
    line_spacing: f64,
}

impl TextLayoutEngine<ApproximateMetrics> {
    pub fn new(line_height_factor: f64, line_spacing: f64) -> Self {
        Self::with_measure(ApproximateMetrics::default(), line_height_factor, line_spacing)
    }
}

impl<M: TextMeasure> TextLayoutEngine<M> {
    pub fn with_measure(measure: M, line_height_factor: f64, line_spacing: f64) -> Self {
        Self {
            measure,
            line_height_factor,
            line_spacing,
        }
    }

    pub fn line_height(&self, font_size: f64) -> f64 {
        font_size * self.line_height_factor
    }

    pub fn line_spacing(&self) -> f64 {
        self.line_spacing
    }

    /// Wraps `text` so no line is wider than `max_width`, breaking only at
    /// whitespace. Explicit newlines always start a new line.
    ///
    /// A single word wider than `max_width` is placed on its own line; the
    /// reported width is still clamped to `max_width`.
    ///
    /// # Example
    /// ```
    /// use overlay_engine::TextLayoutEngine;
    ///
    /// let engine = TextLayoutEngine::new(1.2, 4.0);
    /// let layout = engine.layout("Keep your chest up and knees out", 160.0, 24.0);
    /// assert!(layout.lines.len() > 1);
    /// assert!(layout.size.width <= 160.0);
    /// ```
    pub fn layout(&self, text: &str, max_width: f64, font_size: f64) -> TextLayout {
        let line_height = self.line_height(font_size);
        let max_width = max_width.max(0.0);

        let mut lines = Vec::<String>::new();
        for paragraph in text.lines() {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                if current.is_empty() {
                    current.push_str(word);
                    continue;
                }
                let candidate = format!("{current} {word}");
                if self.measure.advance(&candidate, font_size) <= max_width {
                    current = candidate;
                } else {
                    lines.push(std::mem::replace(&mut current, word.to_string()));
                }
            }
            if !current.is_empty() {
                lines.push(current);
            }
        }

        if lines.is_empty() {
            return TextLayout::empty(line_height);
        }

        let line_widths = lines
            .iter()
            .map(|line| self.measure.advance(line, font_size))
            .collect::<Vec<_>>();
        let widest = line_widths.iter().copied().fold(0.0_f64, f64::max);
        let count = lines.len() as f64;
        let height = count * line_height + (count - 1.0) * self.line_spacing;

        TextLayout {
            lines,
            line_widths,
            line_height,
            size: Size::new(widest.min(max_width), height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApproximateMetrics, TextLayoutEngine, TextMeasure};

    /// Every character is exactly `font_size` wide.
    struct Monospace;

    impl TextMeasure for Monospace {
        fn advance(&self, text: &str, font_size: f64) -> f64 {
            text.chars().count() as f64 * font_size
        }
    }

    fn mono() -> TextLayoutEngine<Monospace> {
        TextLayoutEngine::with_measure(Monospace, 1.5, 2.0)
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let layout = mono().layout("Brace", 100.0, 10.0);

        assert_eq!(layout.lines, ["Brace"]);
        assert_eq!(layout.size.width, 50.0);
        assert_eq!(layout.size.height, 15.0);
    }

    #[test]
    fn wraps_at_word_boundaries_within_max_width() {
        let text = "keep the bar over mid foot";
        let layout = mono().layout(text, 110.0, 10.0);

        assert_eq!(layout.lines, ["keep the", "bar over", "mid foot"]);
        assert!(layout.size.width <= 110.0);
        let rejoined = layout.lines.join(" ");
        assert_eq!(rejoined, text);
        // 3 lines of 15 plus 2 gaps of 2.
        assert_eq!(layout.size.height, 49.0);
    }

    #[test]
    fn overlong_word_sits_alone_and_width_is_clamped() {
        let layout = mono().layout("a supercalifragilistic b", 80.0, 10.0);

        assert_eq!(layout.lines, ["a", "supercalifragilistic", "b"]);
        assert_eq!(layout.size.width, 80.0);
        assert_eq!(layout.line_widths[1], 200.0);
    }

    #[test]
    fn empty_or_blank_text_yields_zero_box() {
        for text in ["", "   ", "\n\t"] {
            let layout = mono().layout(text, 100.0, 10.0);
            assert!(layout.lines.is_empty());
            assert!(layout.size.is_empty());
        }
    }

    #[test]
    fn explicit_newline_forces_break() {
        let layout = mono().layout("Hips back\nChest up", 1_000.0, 10.0);
        assert_eq!(layout.lines, ["Hips back", "Chest up"]);
    }

    #[test]
    fn approximate_metrics_scale_with_font_size() {
        let metrics = ApproximateMetrics::default();
        let small = metrics.advance("Squat deeper", 12.0);
        let large = metrics.advance("Squat deeper", 24.0);

        assert!(small > 0.0);
        assert!((large - small * 2.0).abs() < 1e-9);
        assert!(metrics.advance("iii", 24.0) < metrics.advance("MMM", 24.0));
    }
}
