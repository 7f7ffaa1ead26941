//! Seams to the pick aligner and the plotter, which live outside this crate

use super::detection::Detection;
use super::error::Result;
use super::event::EventCatalog;
use super::family::Family;

/// Parameters forwarded to a cross-correlation pick aligner
#[derive(Debug, Clone, PartialEq)]
pub struct LagCalcParams {
    /// Whether the waveform source already matches the template processing
    pub pre_processed: bool,
    /// Search half-width in seconds
    pub shift_len: f64,
    /// Minimum correlation for a pick to be kept
    pub min_cc: f64,
    /// Channel endings on which S picks are made
    pub horizontal_chans: Vec<String>,
    /// Channel endings on which P picks are made
    pub vertical_chans: Vec<String>,
    pub cores: usize,
    pub interpolate: bool,
    pub plot: bool,
    pub parallel: bool,
    pub process_cores: Option<usize>,
}

impl Default for LagCalcParams {
    fn default() -> Self {
        Self {
            pre_processed: false,
            shift_len: 0.2,
            min_cc: 0.4,
            horizontal_chans: ["E", "N", "1", "2"].iter().map(|s| s.to_string()).collect(),
            vertical_chans: vec!["Z".to_string()],
            cores: 1,
            interpolate: false,
            plot: false,
            parallel: true,
            process_cores: None,
        }
    }
}

/// Refines pick times by re-correlating waveform snippets around each detection.
pub trait PickAligner {
    /// Waveform source the aligner cuts snippets from
    type Stream;

    fn align(
        &self,
        families: &[Family],
        stream: &Self::Stream,
        params: &LagCalcParams,
    ) -> Result<EventCatalog>;
}

pub trait DetectionPlotter {
    fn cumulative_detections(&self, detections: &[Detection], plot_grouped: bool);
}
