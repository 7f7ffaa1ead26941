//! Template identity and the pick geometry needed to regenerate events

use super::event::Origin;
use chrono::{DateTime, Utc};

/// Pick made on the template waveform for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePick {
    pub station: String,
    pub channel: String,
    pub phase_hint: Option<String>,
    pub time: DateTime<Utc>,
}

/// Reference waveform pattern, identified by a stable name.
///
/// Families share their template through an `Arc`; a template is never mutated
/// after it has been handed to a family.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    pub picks: Vec<TemplatePick>,
    pub origin: Option<Origin>,
    /// Seconds of waveform kept before each pick
    pub prepick: f64,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            picks: Vec::new(),
            origin: None,
            prepick: 0.0,
        }
    }

    pub fn with_picks(mut self, picks: Vec<TemplatePick>) -> Self {
        self.picks = picks;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_prepick(mut self, prepick: f64) -> Self {
        self.prepick = prepick;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start of the earliest template waveform, i.e. the instant a trigger time refers to
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.picks
            .iter()
            .map(|p| p.time)
            .min()
            .map(|t| t - seconds(self.prepick))
    }
}

/// Fractional seconds as a chrono duration, nanosecond resolution
pub(crate) fn seconds(secs: f64) -> chrono::Duration {
    chrono::Duration::nanoseconds((secs * 1e9).round() as i64)
}
