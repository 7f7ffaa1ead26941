//! Detection-record text format
//!
//! One detection per line, `key: value; ` pairs in a fixed key order:
//!
//! ```text
//! template_name: a; detect_time: 2012-03-26T01:02:03.450Z; no_chans: 8; detect_val: 4.20000000000000017763568394002505; ...
//! ```
//!
//! The statistic, threshold and threshold input are written with 32 fixed
//! fractional digits (trailing zeros trimmed, decimal point kept) so that the
//! parsed double is bit-identical to the one that was written. Where the fixed
//! form cannot hold enough significant digits (magnitudes below ~1e-16) the
//! shortest exact decimal is written instead.

use super::detection::{Detection, DetectionKind, ThresholdKind};
use super::error::{FamilyError, Result};
use super::event::{DerivedEvent, EventBuilder, EventCatalog};
use super::family::Family;
use super::literal::{parse_channels, render_channels};
use super::template::Template;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::str::FromStr;

pub const KEY_TEMPLATE_NAME: &str = "template_name";
pub const KEY_DETECT_TIME: &str = "detect_time";
pub const KEY_NO_CHANS: &str = "no_chans";
pub const KEY_DETECT_VAL: &str = "detect_val";
pub const KEY_THRESHOLD: &str = "threshold";
pub const KEY_THRESHOLD_TYPE: &str = "threshold_type";
pub const KEY_THRESHOLD_INPUT: &str = "threshold_input";
pub const KEY_TYPEOFDET: &str = "typeofdet";
pub const KEY_ID: &str = "id";
pub const KEY_CHANS: &str = "chans";
pub const KEY_EVENT: &str = "event";

const NONE: &str = "None";

/// Text encoding of a detection-record file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "utf8" => Ok(TextEncoding::Utf8),
            "latin1" | "iso88591" => Ok(TextEncoding::Latin1),
            _ => Err(format!("Unknown encoding '{}'", s)),
        }
    }
}

impl TextEncoding {
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| {
                FamilyError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        FamilyError::Io(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("character {:?} cannot be written as Latin-1", c),
                        ))
                    })
                })
                .collect(),
        }
    }
}

/// Decimal form of `value` that parses back to the identical double
pub fn format_exact(value: f64) -> String {
    let fixed = format!("{:.32}", value);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0')
    } else {
        fixed.as_str()
    };
    if trimmed
        .parse::<f64>()
        .is_ok_and(|parsed| parsed.to_bits() == value.to_bits())
    {
        return trimmed.to_string();
    }

    let shortest = value.to_string();
    if shortest.contains('.') || !value.is_finite() {
        shortest
    } else {
        format!("{}.", shortest)
    }
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// RFC 3339, or a naive `YYYY-mm-ddTHH:MM:SS[.f]` taken as UTC
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn push_pair(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("; ");
}

/// One record, without the trailing newline
pub fn encode_detection(detection: &Detection) -> String {
    let mut out = String::with_capacity(256);
    push_pair(&mut out, KEY_TEMPLATE_NAME, detection.template_name());
    push_pair(&mut out, KEY_DETECT_TIME, &format_time(&detection.trigger_time));
    push_pair(&mut out, KEY_NO_CHANS, &detection.channel_count.to_string());
    push_pair(&mut out, KEY_DETECT_VAL, &format_exact(detection.detection_value));
    push_pair(&mut out, KEY_THRESHOLD, &format_exact(detection.threshold));
    push_pair(&mut out, KEY_THRESHOLD_TYPE, detection.threshold_kind.as_str());
    push_pair(&mut out, KEY_THRESHOLD_INPUT, &format_exact(detection.threshold_input));
    push_pair(&mut out, KEY_TYPEOFDET, detection.detection_kind.as_str());
    push_pair(&mut out, KEY_ID, detection.id());
    let chans = detection
        .channels
        .as_deref()
        .map(render_channels)
        .unwrap_or_else(|| NONE.to_string());
    push_pair(&mut out, KEY_CHANS, &chans);
    let event = detection.event().map_or(NONE, |e| e.resource_id.as_str());
    push_pair(&mut out, KEY_EVENT, event);
    out
}

pub fn encode_detections(detections: &[Detection]) -> Vec<String> {
    detections.iter().map(encode_detection).collect()
}

pub fn encode_family(family: &Family) -> Vec<String> {
    encode_detections(family.detections())
}

/// Everything decode needs besides the text itself
pub struct DecodeContext<'a> {
    /// Companion events that records may reference by resource id
    pub catalog: &'a EventCatalog,
    pub template: &'a Template,
    pub estimate_origin: bool,
    /// Regeneration hook for detections whose event cannot be resolved
    pub builder: Option<&'a dyn EventBuilder>,
}

enum EventRef {
    Missing,
    Resolved(DerivedEvent),
    Unresolved(String),
}

#[derive(Default)]
struct PartialRecord {
    template_name: Option<String>,
    trigger_time: Option<DateTime<Utc>>,
    channel_count: Option<u32>,
    detection_value: Option<f64>,
    threshold: Option<f64>,
    threshold_kind: Option<ThresholdKind>,
    threshold_input: Option<f64>,
    detection_kind: Option<DetectionKind>,
    id: Option<String>,
    channels: Option<Vec<(String, String)>>,
}

fn required<T>(value: Option<T>, key: &str, line: &str) -> Result<T> {
    value.ok_or_else(|| FamilyError::malformed(line, format!("missing key '{}'", key)))
}

fn parse_float(value: &str, key: &str, line: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| FamilyError::malformed(line, format!("{}: {}", key, e)))
}

/// Parse one record. Blank lines yield `None`.
pub fn decode_record(line: &str, ctx: &DecodeContext<'_>) -> Result<Option<Detection>> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return Ok(None);
    }

    let mut record = PartialRecord::default();
    let mut event = EventRef::Missing;

    for pair in line.split(';') {
        if pair.trim().is_empty() {
            continue;
        }
        // Only the separator is stripped; values keep their own spaces and ": "
        let (key, value) = pair
            .split_once(": ")
            .ok_or_else(|| FamilyError::malformed(line, format!("no key in '{}'", pair.trim())))?;
        let key = key.trim();
        match key {
            KEY_EVENT => {
                if ctx.catalog.is_empty() || value == NONE {
                    continue;
                }
                event = match ctx.catalog.find(value) {
                    Some(found) => EventRef::Resolved(found.clone()),
                    None => EventRef::Unresolved(value.to_string()),
                };
            }
            KEY_DETECT_TIME => {
                let time = parse_time(value.trim()).ok_or_else(|| {
                    FamilyError::malformed(line, format!("unparsable detect_time '{}'", value))
                })?;
                record.trigger_time = Some(time);
            }
            KEY_CHANS => {
                if value != NONE {
                    let chans = parse_channels(value)
                        .map_err(|e| FamilyError::malformed(line, format!("chans: {}", e)))?;
                    record.channels = Some(chans);
                }
            }
            KEY_TEMPLATE_NAME => record.template_name = Some(value.to_string()),
            KEY_TYPEOFDET => record.detection_kind = Some(DetectionKind::parse(value)),
            KEY_THRESHOLD_TYPE => record.threshold_kind = Some(ThresholdKind::parse(value)),
            KEY_ID => record.id = Some(value.to_string()),
            KEY_NO_CHANS => {
                // Legacy files carry "8.0"
                let count = parse_float(value, key, line)?;
                if !count.is_finite() || count < 0.0 || count > f64::from(u32::MAX) {
                    return Err(FamilyError::malformed(
                        line,
                        format!("no_chans out of range: {}", value),
                    ));
                }
                record.channel_count = Some(count.trunc() as u32);
            }
            KEY_DETECT_VAL => record.detection_value = Some(parse_float(value, key, line)?),
            KEY_THRESHOLD => record.threshold = Some(parse_float(value, key, line)?),
            KEY_THRESHOLD_INPUT => record.threshold_input = Some(parse_float(value, key, line)?),
            other => {
                return Err(FamilyError::malformed(line, format!("unknown key '{}'", other)));
            }
        }
    }

    let mut detection = Detection::new(
        required(record.template_name, KEY_TEMPLATE_NAME, line)?,
        required(record.trigger_time, KEY_DETECT_TIME, line)?,
        required(record.channel_count, KEY_NO_CHANS, line)?,
        required(record.detection_value, KEY_DETECT_VAL, line)?,
        required(record.threshold, KEY_THRESHOLD, line)?,
        required(record.threshold_kind, KEY_THRESHOLD_TYPE, line)?,
        required(record.threshold_input, KEY_THRESHOLD_INPUT, line)?,
        required(record.detection_kind, KEY_TYPEOFDET, line)?,
    );
    if let Some(id) = record.id {
        detection = detection.with_id(id);
    }
    if let Some(chans) = record.channels {
        detection = detection.with_channels(chans);
    }

    match event {
        EventRef::Resolved(found) => detection.attach_event(found),
        EventRef::Unresolved(id) => match ctx.builder {
            Some(builder) => {
                log::debug!("Event {} not in catalog, regenerating from template", id);
                let built = builder.build(ctx.template, &detection, ctx.estimate_origin);
                detection.attach_event(built);
            }
            None => return Err(FamilyError::LookupFailure(id)),
        },
        EventRef::Missing => {
            if ctx.catalog.is_empty() {
                if let Some(builder) = ctx.builder {
                    let built = builder.build(ctx.template, &detection, ctx.estimate_origin);
                    detection.attach_event(built);
                }
            }
        }
    }

    Ok(Some(detection))
}

/// Parse every record in `text`, aborting on the first malformed line.
pub fn decode_records(text: &str, ctx: &DecodeContext<'_>) -> Result<Vec<Detection>> {
    let mut detections = Vec::new();
    for line in text.lines() {
        if let Some(detection) = decode_record(line, ctx)? {
            detections.push(detection);
        }
    }
    log::debug!(
        "Decoded {} detections for template {}",
        detections.len(),
        ctx.template.name()
    );
    Ok(detections)
}

/// [`decode_records`] over raw bytes in the given encoding
pub fn decode_bytes(bytes: &[u8], encoding: TextEncoding, ctx: &DecodeContext<'_>) -> Result<Vec<Detection>> {
    let text = encoding.decode(bytes)?;
    decode_records(&text, ctx)
}
