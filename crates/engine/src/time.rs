use std::cmp::Ordering;
use std::ops::{Add, Sub};

/// Timescale used for caption times: 600 ticks per second divides evenly into
/// every common video frame rate.
pub const PREFERRED_TIMESCALE: i32 = 600;

/// Rational timestamp `value / timescale` seconds.
///
/// Equality and ordering compare the represented instant, so `600/600` equals
/// `1/1`.
#[derive(Debug, Clone, Copy)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
}

impl MediaTime {
    pub const ZERO: Self = Self {
        value: 0,
        timescale: PREFERRED_TIMESCALE,
    };

    /// Creates a timestamp. A non-positive timescale falls back to
    /// [`PREFERRED_TIMESCALE`].
    pub fn new(value: i64, timescale: i32) -> Self {
        if timescale <= 0 {
            return Self {
                value,
                timescale: PREFERRED_TIMESCALE,
            };
        }
        Self { value, timescale }
    }

    /// Whole seconds at the preferred timescale.
    ///
    /// # Example
    /// ```
    /// use overlay_engine::MediaTime;
    ///
    /// assert_eq!(MediaTime::from_whole_seconds(5).value, 3_000);
    /// ```
    pub fn from_whole_seconds(seconds: i64) -> Self {
        Self {
            value: seconds.saturating_mul(i64::from(PREFERRED_TIMESCALE)),
            timescale: PREFERRED_TIMESCALE,
        }
    }

    /// Fractional seconds rounded to the nearest preferred-timescale tick.
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() {
            return Self::ZERO;
        }
        Self {
            value: (seconds * f64::from(PREFERRED_TIMESCALE)).round() as i64,
            timescale: PREFERRED_TIMESCALE,
        }
    }

    pub fn seconds(self) -> f64 {
        self.value as f64 / f64::from(self.timescale)
    }

    /// Re-expresses the instant in `timescale` ticks with nearest rounding.
    pub fn convert_scale(self, timescale: i32) -> Self {
        let target = Self::new(0, timescale).timescale;
        let numerator = i128::from(self.value) * i128::from(target);
        let rounded = div_round_nearest(numerator, i128::from(self.timescale));
        Self {
            value: rounded.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
            timescale: target,
        }
    }

    pub fn is_positive(self) -> bool {
        self.value > 0
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.value) * i128::from(other.timescale);
        let rhs = i128::from(other.value) * i128::from(self.timescale);
        lhs.cmp(&rhs)
    }
}

impl Add for MediaTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let rhs = rhs.convert_scale(self.timescale);
        Self {
            value: self.value.saturating_add(rhs.value),
            timescale: self.timescale,
        }
    }
}

impl Sub for MediaTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let rhs = rhs.convert_scale(self.timescale);
        Self {
            value: self.value.saturating_sub(rhs.value),
            timescale: self.timescale,
        }
    }
}

/// Half-open range `[start, start + duration)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: MediaTime,
    pub duration: MediaTime,
}

impl TimeRange {
    pub fn new(start: MediaTime, duration: MediaTime) -> Self {
        Self { start, duration }
    }

    /// Builds the range between two instants; `end` before `start` yields an
    /// empty range.
    pub fn from_bounds(start: MediaTime, end: MediaTime) -> Self {
        let duration = if end > start { end - start } else { MediaTime::ZERO };
        Self { start, duration }
    }

    pub fn end(&self) -> MediaTime {
        self.start + self.duration
    }

    pub fn is_empty(&self) -> bool {
        !self.duration.is_positive()
    }

    pub fn contains(&self, t: MediaTime) -> bool {
        self.start <= t && t < self.end()
    }
}

fn div_round_nearest(num: i128, den: i128) -> i128 {
    debug_assert!(den > 0);

    let abs_num = num.abs();
    let mut out = abs_num / den;
    let remainder = abs_num % den;
    if remainder.saturating_mul(2) >= den {
        out += 1;
    }

    if num < 0 { -out } else { out }
}

#[cfg(test)]
mod tests {
    use super::{MediaTime, TimeRange};

    #[test]
    fn equality_ignores_timescale() {
        assert_eq!(MediaTime::new(600, 600), MediaTime::new(1, 1));
        assert!(MediaTime::new(1, 30) < MediaTime::new(21, 600));
    }

    #[test]
    fn convert_scale_rounds_to_nearest_tick() {
        let frame = MediaTime::new(1_001, 30_000).convert_scale(600);
        assert_eq!(frame.value, 20);
        assert_eq!(frame.timescale, 600);
    }

    #[test]
    fn from_bounds_with_inverted_ends_is_empty() {
        let range = TimeRange::from_bounds(
            MediaTime::from_whole_seconds(5),
            MediaTime::from_whole_seconds(3),
        );
        assert!(range.is_empty());
        assert!(!range.contains(MediaTime::from_whole_seconds(5)));
    }

    #[test]
    fn range_is_half_open() {
        let range = TimeRange::from_bounds(
            MediaTime::from_whole_seconds(1),
            MediaTime::from_whole_seconds(5),
        );
        assert!(range.contains(MediaTime::from_whole_seconds(1)));
        assert!(!range.contains(MediaTime::from_whole_seconds(5)));
        assert_eq!(range.end(), MediaTime::from_whole_seconds(5));
    }
}
