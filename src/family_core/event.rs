//! Derived event descriptions, the companion catalog, and event regeneration

use super::detection::Detection;
use super::template::Template;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pick {
    pub station: String,
    pub channel: String,
    pub phase_hint: Option<String>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Origin {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Metres
    pub depth: f64,
}

/// Structured description of a detection for downstream cataloguing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedEvent {
    pub resource_id: String,
    pub picks: Vec<Pick>,
    pub origin: Option<Origin>,
    pub comment: Option<String>,
}

impl DerivedEvent {
    pub fn bare(resource_id: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            picks: Vec::new(),
            origin: None,
            comment: Some(comment.into()),
        }
    }

    /// Summary entry for a detection that has no event attached
    pub fn for_detection(detection: &Detection) -> Self {
        Self::bare(
            resource_id_for(detection),
            format!(
                "Detected by template {} at {}",
                detection.template_name(),
                detection.trigger_time.to_rfc3339()
            ),
        )
    }

    /// Last `/`-separated segment of the resource id
    pub fn short_id(&self) -> &str {
        short_id(&self.resource_id)
    }
}

pub fn resource_id_for(detection: &Detection) -> String {
    format!("smi:local/{}", detection.id())
}

pub(crate) fn short_id(resource_id: &str) -> &str {
    resource_id.rsplit('/').next().unwrap_or(resource_id)
}

/// Ordered collection of events that decoded records can reference by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCatalog {
    events: Vec<DerivedEvent>,
}

impl EventCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DerivedEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[DerivedEvent] {
        &self.events
    }

    /// Resolve by resource id; full ids and bare trailing segments both match.
    pub fn find(&self, resource_id: &str) -> Option<&DerivedEvent> {
        let wanted = short_id(resource_id);
        self.events.iter().find(|e| e.short_id() == wanted)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DerivedEvent> {
        self.events.iter()
    }
}

impl From<Vec<DerivedEvent>> for EventCatalog {
    fn from(events: Vec<DerivedEvent>) -> Self {
        Self { events }
    }
}

impl IntoIterator for EventCatalog {
    type Item = DerivedEvent;
    type IntoIter = std::vec::IntoIter<DerivedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Regenerates an event for a decoded detection that could not be matched to
/// the companion catalog.
pub trait EventBuilder {
    fn build(&self, template: &Template, detection: &Detection, estimate_origin: bool) -> DerivedEvent;
}

/// Shifts the template picks (and optionally its origin) onto the trigger time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEventBuilder;

impl EventBuilder for TemplateEventBuilder {
    fn build(&self, template: &Template, detection: &Detection, estimate_origin: bool) -> DerivedEvent {
        let mut event = DerivedEvent::for_detection(detection);
        let Some(reference) = template.reference_time() else {
            return event;
        };

        for pick in &template.picks {
            if let Some(chans) = &detection.channels {
                let used = chans
                    .iter()
                    .any(|(sta, cha)| *sta == pick.station && *cha == pick.channel);
                if !used {
                    continue;
                }
            }
            event.picks.push(Pick {
                station: pick.station.clone(),
                channel: pick.channel.clone(),
                phase_hint: pick.phase_hint.clone(),
                time: detection.trigger_time + (pick.time - reference),
            });
        }

        if estimate_origin {
            if let Some(origin) = &template.origin {
                event.origin = Some(Origin {
                    time: detection.trigger_time + (origin.time - reference),
                    ..origin.clone()
                });
            }
        }

        log::debug!(
            "Regenerated event {} with {} picks for template {}",
            event.resource_id,
            event.picks.len(),
            template.name()
        );
        event
    }
}

/// Offset of a pick from the trigger time, seconds
pub fn pick_offset(detection: &Detection, pick: &Pick) -> f64 {
    let delta = pick.time - detection.trigger_time;
    delta.num_nanoseconds().map(|ns| ns as f64 / 1e9).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family_core::detection::{DetectionKind, ThresholdKind};
    use crate::family_core::template::TemplatePick;
    use chrono::TimeZone;

    fn create_test_template() -> Template {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        Template::new("a")
            .with_picks(vec![
                TemplatePick {
                    station: "FOZ".to_string(),
                    channel: "HHZ".to_string(),
                    phase_hint: Some("P".to_string()),
                    time: t0 + chrono::Duration::seconds(1),
                },
                TemplatePick {
                    station: "WVZ".to_string(),
                    channel: "HHN".to_string(),
                    phase_hint: Some("S".to_string()),
                    time: t0 + chrono::Duration::seconds(3),
                },
            ])
            .with_origin(Origin {
                time: t0,
                latitude: -43.5,
                longitude: 170.2,
                depth: 5000.0,
            })
            .with_prepick(0.5)
    }

    fn create_test_detection() -> Detection {
        Detection::new(
            "a",
            Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap(),
            2,
            6.1,
            4.0,
            ThresholdKind::Mad,
            8.0,
            DetectionKind::Corr,
        )
    }

    #[test]
    fn test_builder_shifts_picks() {
        let detection = create_test_detection();
        let event = TemplateEventBuilder.build(&create_test_template(), &detection, false);

        assert_eq!(event.picks.len(), 2);
        assert_eq!(pick_offset(&detection, &event.picks[0]), 0.5);
        assert_eq!(pick_offset(&detection, &event.picks[1]), 2.5);
        assert!(event.origin.is_none());
        assert_eq!(event.resource_id, format!("smi:local/{}", detection.id()));
    }

    #[test]
    fn test_builder_estimates_origin() {
        let detection = create_test_detection();
        let event = TemplateEventBuilder.build(&create_test_template(), &detection, true);

        let origin = event.origin.unwrap();
        assert_eq!(origin.latitude, -43.5);
        assert_eq!(
            origin.time,
            detection.trigger_time - chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_builder_restricts_to_detection_channels() {
        let detection = create_test_detection()
            .with_channels(vec![("WVZ".to_string(), "HHN".to_string())]);
        let event = TemplateEventBuilder.build(&create_test_template(), &detection, false);

        assert_eq!(event.picks.len(), 1);
        assert_eq!(event.picks[0].station, "WVZ");
    }

    #[test]
    fn test_catalog_lookup_by_short_id() {
        let catalog = EventCatalog::from(vec![
            DerivedEvent::bare("smi:local/abc", "first"),
            DerivedEvent::bare("smi:local/def", "second"),
        ]);

        assert_eq!(catalog.find("def").unwrap().comment.as_deref(), Some("second"));
        assert_eq!(catalog.find("smi:local/abc").unwrap().short_id(), "abc");
        assert!(catalog.find("xyz").is_none());
    }
}
