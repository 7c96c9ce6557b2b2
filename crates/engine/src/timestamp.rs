use tracing::debug;

use crate::time::{MediaTime, PREFERRED_TIMESCALE};

/// Parses an `MM:SS` caption timestamp.
///
/// Minutes and seconds must both be unsigned integers with no surrounding
/// whitespace; seconds may exceed 59 and simply add up. Anything malformed
/// yields [`MediaTime::ZERO`] because caption timing is best-effort metadata.
///
/// # Example
/// ```
/// use overlay_engine::{MediaTime, parse_timestamp};
///
/// assert_eq!(parse_timestamp("01:05"), MediaTime::from_whole_seconds(65));
/// assert_eq!(parse_timestamp("1:2:3"), MediaTime::ZERO);
/// ```
pub fn parse_timestamp(text: &str) -> MediaTime {
    match try_parse_timestamp(text) {
        Some(time) => time,
        None => {
            debug!(timestamp = text, "malformed caption timestamp; using zero");
            MediaTime::ZERO
        }
    }
}

/// Formats a time as `MM:SS`, truncating to whole seconds.
///
/// Minutes are padded to two digits and grow past two when needed, so the
/// output always parses back with [`parse_timestamp`].
pub fn format_timestamp(time: MediaTime) -> String {
    let total = time
        .value
        .max(0)
        .div_euclid(i64::from(time.timescale));
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn try_parse_timestamp(text: &str) -> Option<MediaTime> {
    let mut parts = text.split(':');
    let (Some(minutes), Some(seconds), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };

    let minutes = parse_component(minutes)?;
    let seconds = parse_component(seconds)?;
    let total = minutes.checked_mul(60)?.checked_add(seconds)?;
    let ticks = total.checked_mul(i64::from(PREFERRED_TIMESCALE))?;
    Some(MediaTime::new(ticks, PREFERRED_TIMESCALE))
}

fn parse_component(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok()
}
