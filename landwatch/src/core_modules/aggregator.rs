// THEORY:
// The `aggregator` is the last decision stage. It takes the classified deviations
// and the cleaned change mask and produces the report-level view:
//
// 1.  **Ranking**: deviations are stably sorted by severity rank, so equal tiers
//     keep their discovery order.
// 2.  **Statistics**: changed pixels are counted on the cleaned mask (the same mask
//     the extractor segmented), then expressed as a percentage of the image.
// 3.  **Risk**: one overall level from the worst deviation and the change
//     percentage, via an ordered rule table (first match wins).
// 4.  **Identity**: a fresh 8-character result id per run.

use crate::core_modules::deviation::{Deviation, RiskLevel, Severity, round_to};
use crate::core_modules::morphology;
use crate::error::{Error, Result};
use image::GrayImage;
use serde::Serialize;
use uuid::Uuid;

/// Whole-image statistics of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_deviations: usize,
    pub changed_area_pixels: u64,
    pub total_area_pixels: u64,
    /// Percent of the image that changed, rounded to 2 decimals.
    pub change_percentage: f64,
    pub risk_level: RiskLevel,
    /// `"{width}x{height}"` of the aligned grid.
    pub image_dimensions: String,
}

/// What the risk rules look at.
#[derive(Debug, Clone, Copy)]
struct RiskEvidence {
    worst: Option<Severity>,
    change_percentage: f64,
}

impl RiskEvidence {
    fn reaches(&self, tier: Severity) -> bool {
        self.worst.is_some_and(|worst| worst <= tier)
    }
}

const RISK_RULES: [(fn(&RiskEvidence) -> bool, RiskLevel); 3] = [
    (
        |e| e.reaches(Severity::Critical) || e.change_percentage > 10.0,
        RiskLevel::Critical,
    ),
    (|e| e.reaches(Severity::High) || e.change_percentage > 5.0, RiskLevel::High),
    (
        |e| e.reaches(Severity::Medium) || e.change_percentage > 2.0,
        RiskLevel::Medium,
    ),
];

/// Stable sort by severity rank.
pub fn rank_deviations(deviations: &mut [Deviation]) {
    deviations.sort_by_key(|deviation| deviation.severity.rank());
}

/// `changed / total * 100`, rounded to 2 decimals.
pub fn change_percentage(changed_pixels: u64, total_pixels: u64) -> Result<f64> {
    if total_pixels == 0 {
        return Err(Error::Dimension { width: 0, height: 0 });
    }
    Ok(round_to(changed_pixels as f64 / total_pixels as f64 * 100.0, 2))
}

/// Overall risk from the deviation set and the change percentage.
pub fn risk_level(deviations: &[Deviation], change_percentage: f64) -> RiskLevel {
    let evidence = RiskEvidence {
        worst: deviations.iter().map(|deviation| deviation.severity).min(),
        change_percentage,
    };
    RISK_RULES
        .iter()
        .find(|(predicate, _)| predicate(&evidence))
        .map(|(_, level)| *level)
        .unwrap_or(RiskLevel::Low)
}

/// Uppercase 8-character id. Collisions are unlikely but the store must handle them.
pub fn mint_result_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Ranks `deviations` in place and computes the summary.
pub fn aggregate(
    mut deviations: Vec<Deviation>,
    mask: &GrayImage,
) -> Result<(Vec<Deviation>, Summary)> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::Dimension { width, height });
    }

    rank_deviations(&mut deviations);

    let total_area_pixels = width as u64 * height as u64;
    let changed_area_pixels = morphology::count_on(mask);
    let change_percentage = change_percentage(changed_area_pixels, total_area_pixels)?;
    let risk_level = risk_level(&deviations, change_percentage);

    let summary = Summary {
        total_deviations: deviations.len(),
        changed_area_pixels,
        total_area_pixels,
        change_percentage,
        risk_level,
        image_dimensions: format!("{width}x{height}"),
    };
    Ok((deviations, summary))
}
