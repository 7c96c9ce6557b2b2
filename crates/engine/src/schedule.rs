use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::time::{MediaTime, TimeRange};
use crate::timestamp::parse_timestamp;

/// One suggestion as returned by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCaptionItem {
    pub timestamp: String,
    pub suggestion: String,
    #[serde(
        rename = "endTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub end_timestamp: Option<String>,
    /// Text alignment code: 1 left, 2 center, 3 right.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<u8>,
}

impl RawCaptionItem {
    pub fn new(timestamp: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            suggestion: suggestion.into(),
            end_timestamp: None,
            align: None,
        }
    }

    pub fn with_end(mut self, end_timestamp: impl Into<String>) -> Self {
        self.end_timestamp = Some(end_timestamp.into());
        self
    }

    pub fn with_align(mut self, align: u8) -> Self {
        self.align = Some(align);
        self
    }
}

/// Full analysis payload: the detected exercise and its timed suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub exercise: String,
    #[serde(default)]
    pub analysis: Vec<RawCaptionItem>,
}

/// Horizontal text alignment inside a caption plate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptionAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl CaptionAlignment {
    /// Maps the wire code; unknown or missing codes align left.
    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            Some(2) => Self::Center,
            Some(3) => Self::Right,
            _ => Self::Left,
        }
    }
}

/// What to do with a caption whose resolved end is not after its start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum DegeneratePolicy {
    /// Leave the caption out.
    #[default]
    Drop,
    /// Keep the caption and extend its end to `start + min_visible_seconds`.
    Clamp {
        #[serde(rename = "minVisibleSeconds")]
        min_visible_seconds: f64,
    },
}

/// A scheduled caption with a resolved `[start, end)` window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionEvent {
    pub text: String,
    pub start: MediaTime,
    pub end: MediaTime,
    pub alignment: CaptionAlignment,
}

impl CaptionEvent {
    pub fn window(&self) -> TimeRange {
        TimeRange::from_bounds(self.start, self.end)
    }
}

/// Orders raw items by start time and resolves every end time.
///
/// An explicit `endTimestamp` is used verbatim even when it overlaps the next
/// caption. Otherwise a caption ends where the next one starts, and the last
/// one ends at `video_duration`. Items sharing a start keep their input order.
///
/// # Example
/// ```
/// use overlay_engine::{DegeneratePolicy, MediaTime, RawCaptionItem, schedule};
///
/// let events = schedule(
///     &[RawCaptionItem::new("00:05", "B"), RawCaptionItem::new("00:01", "A")],
///     MediaTime::from_whole_seconds(10),
///     DegeneratePolicy::Drop,
/// );
/// assert_eq!(events[0].text, "A");
/// assert_eq!(events[0].end, MediaTime::from_whole_seconds(5));
/// assert_eq!(events[1].end, MediaTime::from_whole_seconds(10));
/// ```
pub fn schedule(
    items: &[RawCaptionItem],
    video_duration: MediaTime,
    policy: DegeneratePolicy,
) -> Vec<CaptionEvent> {
    let mut parsed = items
        .iter()
        .map(|item| ParsedItem {
            start: parse_timestamp(&item.timestamp),
            explicit_end: item.end_timestamp.as_deref().map(parse_timestamp),
            item,
        })
        .collect::<Vec<_>>();
    // `sort_by` is stable: equal starts keep input order.
    parsed.sort_by(|lhs, rhs| lhs.start.cmp(&rhs.start));

    let mut events = Vec::with_capacity(parsed.len());
    for (index, entry) in parsed.iter().enumerate() {
        let end = match (entry.explicit_end, parsed.get(index + 1)) {
            (Some(explicit), _) => explicit,
            (None, Some(next)) => next.start,
            (None, None) => video_duration,
        };

        let event = CaptionEvent {
            text: entry.item.suggestion.clone(),
            start: entry.start,
            end,
            alignment: CaptionAlignment::from_code(entry.item.align),
        };

        if event.end > event.start {
            debug!(
                start = event.start.seconds(),
                end = event.end.seconds(),
                text = %event.text,
                "caption scheduled"
            );
            events.push(event);
            continue;
        }

        match policy {
            DegeneratePolicy::Drop => {
                warn!(
                    start = event.start.seconds(),
                    end = event.end.seconds(),
                    text = %event.text,
                    "caption dropped: end is not after start"
                );
            }
            DegeneratePolicy::Clamp {
                min_visible_seconds,
            } => {
                let end = event.start + MediaTime::from_seconds(min_visible_seconds);
                if end <= event.start {
                    warn!(
                        text = %event.text,
                        min_visible_seconds,
                        "caption dropped: clamp duration is not positive"
                    );
                    continue;
                }
                warn!(
                    start = event.start.seconds(),
                    end = end.seconds(),
                    text = %event.text,
                    "caption end clamped to minimum visible duration"
                );
                events.push(CaptionEvent { end, ..event });
            }
        }
    }

    events
}

/// Extracts caption items from untrusted JSON.
///
/// Accepts either the full `{exercise, analysis: [...]}` payload or the bare
/// array. Entries that are not objects, or that lack a string `timestamp` or
/// `suggestion`, are skipped.
pub fn caption_items_from_json(value: &Value) -> Vec<RawCaptionItem> {
    let entries = match value {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(object) => match object.get("analysis") {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => {
                warn!("analysis payload has no analysis array");
                return Vec::new();
            }
        },
        _ => {
            warn!("caption payload is neither an array nor an object");
            return Vec::new();
        }
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let item = raw_item_from_value(entry);
            if item.is_none() {
                warn!(index, "caption item skipped: missing timestamp or suggestion");
            }
            item
        })
        .collect()
}

fn raw_item_from_value(value: &Value) -> Option<RawCaptionItem> {
    let object = value.as_object()?;
    let timestamp = object.get("timestamp")?.as_str()?;
    let suggestion = object.get("suggestion")?.as_str()?;
    let end_timestamp = object
        .get("endTimestamp")
        .and_then(Value::as_str)
        .map(str::to_string);
    let align = object
        .get("align")
        .and_then(Value::as_u64)
        .and_then(|code| u8::try_from(code).ok());

    Some(RawCaptionItem {
        timestamp: timestamp.to_string(),
        suggestion: suggestion.to_string(),
        end_timestamp,
        align,
    })
}

struct ParsedItem<'a> {
    start: MediaTime,
    explicit_end: Option<MediaTime>,
    item: &'a RawCaptionItem,
}
