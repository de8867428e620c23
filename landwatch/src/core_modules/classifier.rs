// THEORY:
// The `classifier` is the decision stage. For each region it answers two
// questions using nothing but pixel statistics:
//
// 1.  **Why did it change?** The grayscale mean and standard deviation inside the
//     region's bounding box are measured on both images. Bright open land turning
//     dark reads as construction, dark turning bright as clearing, a texture swing
//     as a land-use change, and plain brightness shifts are graded by size.
// 2.  **How much does it matter?** The region's share of the image and the mean
//     ChangeMap intensity over its box map onto Critical, High, Medium or Low.
//
// Both questions are answered by ordered rule tables: the first predicate that
// holds wins. The thresholds are fixed constants and compare with strict `>`.

use crate::core_modules::deviation::{Cause, Classification, Severity};
use crate::core_modules::region::{BoundingBox, Region};
use crate::error::{Error, Result};
use image::GrayImage;

/// Mean and population standard deviation of a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStatistics {
    pub mean: f64,
    pub std_dev: f64,
}

/// Per-region statistics of the reference and current luminance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CauseEvidence {
    pub reference: WindowStatistics,
    pub current: WindowStatistics,
}

impl CauseEvidence {
    fn mean_shift(&self) -> f64 {
        (self.reference.mean - self.current.mean).abs()
    }

    fn texture_shift(&self) -> f64 {
        (self.reference.std_dev - self.current.std_dev).abs()
    }
}

/// Region size and change strength, the inputs of the severity rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityEvidence {
    /// Region area as a percentage of the image.
    pub proportion: f64,
    /// Mean ChangeMap value over the region's box.
    pub intensity: f64,
}

type Rule<E, L> = (fn(&E) -> bool, L);

const CAUSE_RULES: [Rule<CauseEvidence, Cause>; 5] = [
    (
        |e| e.reference.mean > 180.0 && e.current.mean < 150.0,
        Cause::EncroachmentOrConstruction,
    ),
    (
        |e| e.reference.mean < 120.0 && e.current.mean > 160.0,
        Cause::DemolitionOrClearing,
    ),
    (|e| e.texture_shift() > 25.0, Cause::LandUseChange),
    (|e| e.mean_shift() > 40.0, Cause::UnauthorizedDevelopment),
    (|e| e.mean_shift() > 20.0, Cause::BoundaryDeviation),
];

const SEVERITY_RULES: [Rule<SeverityEvidence, Severity>; 3] = [
    (|e| e.proportion > 5.0 || e.intensity > 80.0, Severity::Critical),
    (|e| e.proportion > 2.0 || e.intensity > 60.0, Severity::High),
    (|e| e.proportion > 0.5 || e.intensity > 40.0, Severity::Medium),
];

fn first_match<E, L: Copy>(rules: &[Rule<E, L>], evidence: &E, fallback: L) -> L {
    rules
        .iter()
        .find(|(predicate, _)| predicate(evidence))
        .map(|(_, label)| *label)
        .unwrap_or(fallback)
}

/// Mean and population standard deviation of `gray` inside `bbox`.
pub fn window_statistics(gray: &GrayImage, bbox: &BoundingBox) -> WindowStatistics {
    let count = bbox.area() as f64;
    if count < 1.0 {
        return WindowStatistics { mean: 0.0, std_dev: 0.0 };
    }

    let mut sum = 0.0;
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            sum += gray.get_pixel(x, y)[0] as f64;
        }
    }
    let mean = sum / count;

    let mut squares = 0.0;
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            squares += (gray.get_pixel(x, y)[0] as f64 - mean).powi(2);
        }
    }

    WindowStatistics {
        mean,
        std_dev: (squares / count).sqrt(),
    }
}

pub fn infer_cause(evidence: &CauseEvidence) -> Cause {
    first_match(&CAUSE_RULES, evidence, Cause::MinorSurfaceChange)
}

pub fn infer_severity(evidence: &SeverityEvidence) -> Severity {
    first_match(&SEVERITY_RULES, evidence, Severity::Low)
}

/// Severity from raw area counts; fails on an empty image rather than dividing by zero.
pub fn severity_for(area_pixels: u64, total_area: u64, intensity: f64) -> Result<Severity> {
    if total_area == 0 {
        return Err(Error::Dimension { width: 0, height: 0 });
    }
    Ok(infer_severity(&SeverityEvidence {
        proportion: area_pixels as f64 / total_area as f64 * 100.0,
        intensity,
    }))
}

/// Classifies one region against the aligned luminance grids.
pub fn classify(
    reference: &GrayImage,
    current: &GrayImage,
    region: &Region,
) -> Result<Classification> {
    let (width, height) = reference.dimensions();
    if current.dimensions() != (width, height) {
        return Err(Error::InternalInvariant(format!(
            "classifier received {:?} and {:?}",
            reference.dimensions(),
            current.dimensions()
        )));
    }
    if !region.bounding_box.fits_within(width, height) {
        return Err(Error::InternalInvariant(format!(
            "region {} lies outside the {}x{} image",
            region.label(),
            width,
            height
        )));
    }

    let evidence = CauseEvidence {
        reference: window_statistics(reference, &region.bounding_box),
        current: window_statistics(current, &region.bounding_box),
    };
    let total_area = width as u64 * height as u64;

    Ok(Classification {
        cause: infer_cause(&evidence),
        severity: severity_for(region.area_pixels, total_area, region.mean_intensity)?,
    })
}
