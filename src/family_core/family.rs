//! Family: every detection produced by one template, plus its derived event summary

use super::collaborators::{DetectionPlotter, LagCalcParams, PickAligner};
use super::detection::Detection;
use super::error::{FamilyError, Result};
use super::event::{DerivedEvent, EventCatalog};
use super::template::Template;
use std::fmt;
use std::ops::Index;
use std::slice::SliceIndex;
use std::sync::Arc;

/// Anything a family can be extended with
#[derive(Debug, Clone)]
pub enum FamilyMember {
    Family(Family),
    Detection(Detection),
    /// A bare event catalog. Catalogs cannot be turned back into detections,
    /// so extending with one is always rejected.
    Catalog(EventCatalog),
}

impl FamilyMember {
    fn kind(&self) -> &'static str {
        match self {
            FamilyMember::Family(_) => "Family",
            FamilyMember::Detection(_) => "Detection",
            FamilyMember::Catalog(_) => "an event catalog",
        }
    }
}

impl From<Family> for FamilyMember {
    fn from(family: Family) -> Self {
        FamilyMember::Family(family)
    }
}

impl From<Detection> for FamilyMember {
    fn from(detection: Detection) -> Self {
        FamilyMember::Detection(detection)
    }
}

impl From<EventCatalog> for FamilyMember {
    fn from(catalog: EventCatalog) -> Self {
        FamilyMember::Catalog(catalog)
    }
}

/// Container for the detections of a single template.
///
/// Detections are kept in insertion order and may repeat; call [`sort`](Self::sort)
/// and [`deduplicate`](Self::deduplicate) explicitly. The event summary is never
/// set by callers: it is rebuilt from the detections whenever its length stops
/// matching theirs.
///
/// Cloning deep-copies the detections and summary and re-shares the immutable
/// template.
#[derive(Debug, Clone)]
pub struct Family {
    template: Arc<Template>,
    detections: Vec<Detection>,
    summary: Vec<DerivedEvent>,
}

fn summarize(detections: &[Detection]) -> impl Iterator<Item = DerivedEvent> + '_ {
    detections.iter().map(|d| {
        d.event()
            .cloned()
            .unwrap_or_else(|| DerivedEvent::for_detection(d))
    })
}

impl Family {
    /// Template names of `detections` are not checked here; only the
    /// append/combine operations enforce them.
    pub fn new(template: Arc<Template>, detections: Vec<Detection>) -> Self {
        let summary = summarize(&detections).collect();
        Self {
            template,
            detections,
            summary,
        }
    }

    pub fn from_detection(template: Arc<Template>, detection: Detection) -> Self {
        Self::new(template, vec![detection])
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn template_name(&self) -> &str {
        self.template.name()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn into_detections(self) -> Vec<Detection> {
        self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Detection> {
        self.detections.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    /// One event per detection, order-aligned
    pub fn catalog(&mut self) -> &[DerivedEvent] {
        self.reconcile_summary();
        &self.summary
    }

    fn reconcile_summary(&mut self) {
        if self.summary.len() != self.detections.len() {
            log::debug!(
                "Rebuilding event summary for template {} ({} cached, {} detections)",
                self.template.name(),
                self.summary.len(),
                self.detections.len()
            );
            self.summary = summarize(&self.detections).collect();
        }
    }

    /// The summary is derived from the detections and cannot be replaced.
    pub fn set_catalog(&mut self, _catalog: EventCatalog) -> Result<()> {
        log::warn!("Setting catalog directly is no longer supported, it is generated from detections");
        Err(FamilyError::UnsupportedOperation(
            "setting the event summary directly",
        ))
    }

    /// Order by trigger time, stable for equal times.
    pub fn sort(&mut self) -> &mut Self {
        self.detections.sort_by(Detection::cmp_by_time);
        // Cached entries are out of order now
        self.summary.clear();
        self
    }

    /// Drop detections equal to one kept earlier, keeping first-seen order.
    pub fn deduplicate(&mut self) -> &mut Self {
        let before = self.detections.len();
        let mut kept: Vec<Detection> = Vec::with_capacity(before);
        for detection in self.detections.drain(..) {
            if !kept.contains(&detection) {
                kept.push(detection);
            }
        }
        self.detections = kept;
        self.summary.clear();
        log::debug!(
            "Deduplicated family {}: {} -> {} detections",
            self.template.name(),
            before,
            self.detections.len()
        );
        self
    }

    /// Independent copy; mutating it never shows through to `self`.
    pub fn copy(&self) -> Family {
        self.clone()
    }

    pub fn append_family(&mut self, other: &Family) -> Result<&mut Self> {
        if other.template.name() != self.template.name() {
            return Err(FamilyError::TemplateMismatch {
                expected: self.template.name().to_string(),
                found: other.template.name().to_string(),
            });
        }
        self.detections.extend(other.detections.iter().cloned());
        self.summary.extend(summarize(&other.detections));
        Ok(self)
    }

    pub fn append_detection(&mut self, detection: Detection) -> Result<&mut Self> {
        if detection.template_name() != self.template.name() {
            return Err(FamilyError::TemplateMismatch {
                expected: self.template.name().to_string(),
                found: detection.template_name().to_string(),
            });
        }
        self.summary.extend(summarize(std::slice::from_ref(&detection)));
        self.detections.push(detection);
        Ok(self)
    }

    /// In-place extension. Never sorts or deduplicates.
    pub fn append(&mut self, other: impl Into<FamilyMember>) -> Result<&mut Self> {
        match other.into() {
            FamilyMember::Family(family) => self.append_family(&family),
            FamilyMember::Detection(detection) => self.append_detection(detection),
            other => Err(FamilyError::UnsupportedCombination(other.kind())),
        }
    }

    /// Copy, then append; `self` is left untouched whatever the outcome.
    pub fn combine(&self, other: impl Into<FamilyMember>) -> Result<Family> {
        let mut combined = self.copy();
        combined.append(other)?;
        Ok(combined)
    }

    /// Hand this family, as a one-family collection, to an external pick aligner.
    pub fn lag_calc<A: PickAligner>(
        &self,
        aligner: &A,
        stream: &A::Stream,
        params: &LagCalcParams,
    ) -> Result<EventCatalog> {
        log::info!(
            "Aligning picks for {} detections of template {}",
            self.len(),
            self.template.name()
        );
        aligner.align(std::slice::from_ref(self), stream, params)
    }

    /// Cumulative detection plot, drawn by the supplied plotter
    pub fn plot<P: DetectionPlotter>(&self, plotter: &P, plot_grouped: bool) {
        plotter.cumulative_detections(&self.detections, plot_grouped);
    }
}

impl<I: SliceIndex<[Detection]>> Index<I> for Family {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.detections[index]
    }
}

impl<'a> IntoIterator for &'a Family {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

impl PartialEq for Family {
    /// Compares templates and the time-sorted detections. The reconciled summary
    /// always has one entry per detection, so the count check covers it too.
    fn eq(&self, other: &Self) -> bool {
        if *self.template != *other.template || self.len() != other.len() {
            return false;
        }
        let mut ours: Vec<&Detection> = self.detections.iter().collect();
        let mut theirs: Vec<&Detection> = other.detections.iter().collect();
        ours.sort_by(|a, b| a.cmp_by_time(b));
        theirs.sort_by(|a, b| a.cmp_by_time(b));
        ours.iter().zip(theirs.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Family of {} detections from template {}",
            self.detections.len(),
            self.template.name()
        )
    }
}
