//! Result envelope returned by the manager operations.

use indexmap::IndexMap;

/// Message used when a match count was extrapolated.
pub const APPROXIMATE_COUNT_MESSAGE: &str = "numMatches value is approximated.";

/// Severity of an [`Event`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Info,
    Warning,
    Error,
}

/// Advisory attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct Event {
    #[serde(rename = "type")]
    pub type_: EventType,
    pub message: String,
}

impl Event {
    pub fn warning(message: &str) -> Self {
        Self::new(EventType::Warning, message.to_string())
    }
}

/// Results of one manager operation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RgaResult<T> {
    pub results: Vec<T>,
    /// Exact or approximate number of matches, `-1` if unknown.
    pub num_matches: i64,
    pub events: Vec<Event>,
    pub attributes: IndexMap<String, serde_json::Value>,
    /// Elapsed time in milliseconds.
    pub time: u64,
}

impl<T> Default for RgaResult<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            num_matches: -1,
            events: Vec::new(),
            attributes: IndexMap::new(),
            time: 0,
        }
    }
}

impl<T> RgaResult<T> {
    pub fn new(results: Vec<T>, num_matches: i64) -> Self {
        Self {
            results,
            num_matches,
            ..Default::default()
        }
    }

    /// The empty result with zero matches.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events.extend(events);
        self
    }

    /// Set the elapsed time from `before`.
    pub fn with_time(mut self, before: std::time::Instant) -> Self {
        self.time = before.elapsed().as_millis() as u64;
        self
    }
}
