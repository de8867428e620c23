// THEORY:
// The `pipeline` module is the top-level API of the change detector. It wires the
// five decision stages into one call:
//
//   Aligner -> Differencer -> Region Extractor -> Classifier -> Aggregator
//
// and runs the Visualizer on the side. Data only flows forward; each stage returns
// a fresh value and nothing is shared between runs, so a single pipeline can be
// used from many threads at once. The first stage error aborts the run and is
// returned as-is: there are no partial results and no retries.

use crate::core_modules::aggregator::{self, Summary};
use crate::core_modules::aligner;
use crate::core_modules::classifier;
use crate::core_modules::codec;
use crate::core_modules::deviation::Deviation;
use crate::core_modules::differencer;
use crate::core_modules::pixel::pixel::luminance_grid;
use crate::core_modules::recommendations::{self, Recommendation};
use crate::core_modules::region_extractor::{
    self, DEFAULT_CHANGE_THRESHOLD, DEFAULT_MIN_REGION_FRACTION,
};
use crate::core_modules::visualizer::{self, VisualizationKind, Visualizations};
use crate::error::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

// Re-export key data structures for the public API.
pub use crate::core_modules::deviation::{Cause, RiskLevel, Severity};

/// Tunable knobs of a pipeline. `Default` gives the calibrated values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// A ChangeMap value must be strictly greater than this to count as changed.
    pub change_threshold: u8,
    /// Smallest region kept, as a fraction of the image area.
    pub min_region_fraction: f64,
    pub jpeg_quality: u8,
    pub render_visualizations: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            min_region_fraction: DEFAULT_MIN_REGION_FRACTION,
            jpeg_quality: codec::DEFAULT_JPEG_QUALITY,
            render_visualizations: true,
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub result_id: String,
    /// Sorted by severity rank, discovery order within a tier.
    pub deviations: Vec<Deviation>,
    pub summary: Summary,
    #[serde(skip)]
    pub visualizations: Option<Visualizations>,
}

impl AnalysisResult {
    pub fn recommendations(&self) -> Vec<Recommendation> {
        recommendations::recommend(&self.deviations, &self.summary)
    }

    /// JPEG bytes of one picture, or `None` when the run skipped rendering.
    pub fn encode_visualization(
        &self,
        kind: VisualizationKind,
        quality: u8,
    ) -> Result<Option<Vec<u8>>> {
        self.visualizations
            .as_ref()
            .map(|visualizations| codec::encode_jpeg(visualizations.get(kind), quality))
            .transpose()
    }
}

/// The main, top-level struct for the change detector.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetectionPipeline {
    config: PipelineConfig,
}

impl ChangeDetectionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decodes both uploads and runs the full analysis.
    pub fn analyze_bytes(&self, reference: &[u8], current: &[u8]) -> Result<AnalysisResult> {
        let reference = codec::decode("reference", reference)?;
        let current = codec::decode("current", current)?;
        self.analyze(reference, current)
    }

    /// Runs every stage on a decoded pair. The reference is the older capture.
    pub fn analyze(&self, reference: RgbImage, current: RgbImage) -> Result<AnalysisResult> {
        let result_id = aggregator::mint_result_id();
        let span = info_span!("analysis", id = %result_id);
        let _guard = span.enter();

        let (reference, current) = aligner::align(reference, current)?;
        let (width, height) = current.dimensions();
        let total_area = width as u64 * height as u64;

        let reference_luma = luminance_grid(&reference);
        let current_luma = luminance_grid(&current);
        let change_map = differencer::change_map_from_luma(&reference_luma, &current_luma)?;
        debug!(width, height, "change map computed");

        let extraction = region_extractor::extract_regions(
            &change_map,
            self.config.change_threshold,
            self.config.min_region_fraction,
        )?;

        let deviations = extraction
            .regions
            .iter()
            .map(|region| {
                let classification = classifier::classify(&reference_luma, &current_luma, region)?;
                Ok(Deviation::new(region, classification, total_area))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(count = deviations.len(), "regions classified");

        let (deviations, summary) = aggregator::aggregate(deviations, &extraction.mask)?;

        let visualizations = if self.config.render_visualizations {
            Some(visualizer::render(
                &reference,
                &current,
                &change_map,
                &extraction.mask,
                &extraction.regions,
            )?)
        } else {
            None
        };

        info!(
            deviations = summary.total_deviations,
            change_percentage = summary.change_percentage,
            risk = %summary.risk_level,
            "analysis complete"
        );

        Ok(AnalysisResult {
            result_id,
            deviations,
            summary,
            visualizations,
        })
    }
}
