use crate::error::{MediaFfmpegError, Result};

/// Rational value as printed by ffprobe for time bases and frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// Thirty frames per second, the default composition frame rate.
    pub const FPS_30: Self = Self { num: 30, den: 1 };

    /// Creates a validated rational.
    ///
    /// # Example
    /// ```
    /// use media_ffmpeg::Rational;
    ///
    /// let tb = Rational::new(1, 48_000).expect("valid");
    /// assert_eq!(tb.den, 48_000);
    /// ```
    pub fn new(num: i32, den: i32) -> Result<Self> {
        if den <= 0 || num == 0 {
            return Err(MediaFfmpegError::InvalidRational { num, den });
        }

        Ok(Self { num, den })
    }

    /// Parses `num/den` text. ffprobe prints `0/0` for unknown rates; that
    /// is reported as an error so callers can treat it as absent.
    ///
    /// # Example
    /// ```
    /// use media_ffmpeg::Rational;
    ///
    /// let rate = Rational::parse("30000/1001").expect("valid");
    /// assert!((rate.as_f64() - 29.97).abs() < 0.01);
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let (num, den) = input
            .split_once('/')
            .ok_or_else(|| MediaFfmpegError::Parse {
                context: "rational",
                value: input.to_string(),
            })?;
        let num = parse_i32(num, "rational num")?;
        let den = parse_i32(den, "rational den")?;
        Self::new(num, den)
    }

    /// Converts to floating point.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn parse_i32(value: &str, context: &'static str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| MediaFfmpegError::Parse {
            context,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::Rational;

    #[test]
    fn parse_rejects_unknown_rate() {
        assert!(Rational::parse("0/0").is_err());
    }

    #[test]
    fn ntsc_rate_displays_as_ffmpeg_prints_it() {
        let rate = Rational::parse("30000/1001").expect("valid");
        assert!((rate.as_f64() - 29.970_03).abs() < 1e-5);
        assert_eq!(rate.to_string(), "30000/1001");
    }
}
