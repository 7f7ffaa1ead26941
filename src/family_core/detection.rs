//! Single matched-filter trigger produced by one template

use super::event::DerivedEvent;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;

/// How the detection threshold was scaled from its configured input
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThresholdKind {
    /// Multiple of the median absolute deviation of the correlation sum
    Mad,
    Absolute,
    /// Average channel correlation
    AvChanCorr,
    Other(String),
}

impl ThresholdKind {
    pub fn as_str(&self) -> &str {
        match self {
            ThresholdKind::Mad => "MAD",
            ThresholdKind::Absolute => "absolute",
            ThresholdKind::AvChanCorr => "av_chan_corr",
            ThresholdKind::Other(s) => s,
        }
    }

    /// Unknown kinds are kept verbatim so they survive a round-trip.
    pub fn parse(s: &str) -> Self {
        match s {
            "MAD" => ThresholdKind::Mad,
            "absolute" => ThresholdKind::Absolute,
            "av_chan_corr" => ThresholdKind::AvChanCorr,
            other => ThresholdKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DetectionKind {
    /// Network correlation sum
    Corr,
    Other(String),
}

impl DetectionKind {
    pub fn as_str(&self) -> &str {
        match self {
            DetectionKind::Corr => "corr",
            DetectionKind::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "corr" => DetectionKind::Corr,
            other => DetectionKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (station, channel) pair a detection was made on
pub type ChannelId = (String, String);

/// One trigger of a template against continuous data.
///
/// The template name is fixed at construction. Equality covers every field
/// except the attached event.
#[derive(Debug, Clone)]
pub struct Detection {
    template_name: String,
    pub trigger_time: DateTime<Utc>,
    pub channel_count: u32,
    pub detection_value: f64,
    pub threshold: f64,
    pub threshold_kind: ThresholdKind,
    pub threshold_input: f64,
    pub detection_kind: DetectionKind,
    id: String,
    pub channels: Option<Vec<ChannelId>>,
    event: Option<DerivedEvent>,
}

impl Detection {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        template_name: impl Into<String>,
        trigger_time: DateTime<Utc>,
        channel_count: u32,
        detection_value: f64,
        threshold: f64,
        threshold_kind: ThresholdKind,
        threshold_input: f64,
        detection_kind: DetectionKind,
    ) -> Self {
        let template_name = template_name.into();
        let id = detection_id(&template_name, &trigger_time);
        Self {
            template_name,
            trigger_time,
            channel_count,
            detection_value,
            threshold,
            threshold_kind,
            threshold_input,
            detection_kind,
            id,
            channels: None,
            event: None,
        }
    }

    pub fn with_channels(mut self, channels: Vec<ChannelId>) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_event(mut self, event: DerivedEvent) -> Self {
        self.event = Some(event);
        self
    }

    /// Override the derived id, used when the id was read back from disk.
    pub(crate) fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event(&self) -> Option<&DerivedEvent> {
        self.event.as_ref()
    }

    pub(crate) fn attach_event(&mut self, event: DerivedEvent) {
        self.event = Some(event);
    }

    /// Total order used by [`Family::sort`](super::Family::sort)
    pub fn cmp_by_time(&self, other: &Self) -> Ordering {
        self.trigger_time.cmp(&other.trigger_time)
    }
}

/// `<template name without spaces>_<YYYYmmdd_HHMMSSffffff>`
pub fn detection_id(template_name: &str, trigger_time: &DateTime<Utc>) -> String {
    let compact: String = template_name.split(' ').collect();
    format!("{}_{}", compact, trigger_time.format("%Y%m%d_%H%M%S%6f"))
}

fn same_float(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for Detection {
    fn eq(&self, other: &Self) -> bool {
        self.template_name == other.template_name
            && self.trigger_time == other.trigger_time
            && self.channel_count == other.channel_count
            && same_float(self.detection_value, other.detection_value)
            && same_float(self.threshold, other.threshold)
            && self.threshold_kind == other.threshold_kind
            && same_float(self.threshold_input, other.threshold_input)
            && self.detection_kind == other.detection_kind
            && self.id == other.id
            && self.channels == other.channels
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Detection on template {} at {} with {} channels (value {}, threshold {} {})",
            self.template_name,
            self.trigger_time.to_rfc3339(),
            self.channel_count,
            self.detection_value,
            self.threshold,
            self.threshold_kind
        )
    }
}
