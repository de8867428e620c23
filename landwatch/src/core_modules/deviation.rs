// THEORY:
// A `Deviation` is a `Region` after the classifier has looked at it: the same
// geometry, plus a plausible cause and a severity tier, plus the numbers a report
// needs (area share of the image, mean change intensity) rounded for display.
//
// The enums here are closed vocabularies. Their serialized form is the exact
// human-readable label downstream consumers (reports, dashboards) expect.

use crate::core_modules::region::{BoundingBox, Region};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The inferred reason a region changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cause {
    #[serde(rename = "Possible Encroachment/Construction")]
    EncroachmentOrConstruction,
    #[serde(rename = "Possible Demolition/Clearing")]
    DemolitionOrClearing,
    #[serde(rename = "Land Use Change Detected")]
    LandUseChange,
    #[serde(rename = "Unauthorized Development")]
    UnauthorizedDevelopment,
    #[serde(rename = "Boundary Deviation")]
    BoundaryDeviation,
    #[serde(rename = "Minor Surface Change")]
    MinorSurfaceChange,
}

impl Cause {
    pub const ALL: [Cause; 6] = [
        Cause::EncroachmentOrConstruction,
        Cause::DemolitionOrClearing,
        Cause::LandUseChange,
        Cause::UnauthorizedDevelopment,
        Cause::BoundaryDeviation,
        Cause::MinorSurfaceChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cause::EncroachmentOrConstruction => "Possible Encroachment/Construction",
            Cause::DemolitionOrClearing => "Possible Demolition/Clearing",
            Cause::LandUseChange => "Land Use Change Detected",
            Cause::UnauthorizedDevelopment => "Unauthorized Development",
            Cause::BoundaryDeviation => "Boundary Deviation",
            Cause::MinorSurfaceChange => "Minor Surface Change",
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgent a single deviation is. Declared in rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort key: Critical=0 .. Low=3.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-image risk. Declared from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause and severity for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub cause: Cause,
    pub severity: Severity,
}

/// A classified region, ready for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deviation {
    /// `D{n}`, n being the region's discovery index.
    pub id: String,
    #[serde(rename = "type")]
    pub cause: Cause,
    pub severity: Severity,
    pub area_pixels: u64,
    /// Share of the image, in percent, rounded to 3 decimals.
    pub area_percentage: f64,
    #[serde(rename = "bbox")]
    pub bounding_box: BoundingBox,
    /// Mean ChangeMap value over the bounding box, rounded to 1 decimal.
    pub avg_change_intensity: f64,
    /// Discovery order, kept for tie-breaking and for the visualizer.
    #[serde(skip)]
    pub discovery_index: usize,
}

impl Deviation {
    pub fn new(region: &Region, classification: Classification, total_area: u64) -> Self {
        Self {
            id: region.label(),
            cause: classification.cause,
            severity: classification.severity,
            area_pixels: region.area_pixels,
            area_percentage: round_to(region.area_pixels as f64 / total_area as f64 * 100.0, 3),
            bounding_box: region.bounding_box,
            avg_change_intensity: round_to(region.mean_intensity, 1),
            discovery_index: region.index,
        }
    }
}

/// Rounds half away from zero at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::Point;

    #[test]
    fn severity_ranks_follow_declaration_order() {
        let mut tiers = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        tiers.sort();
        assert_eq!(
            tiers,
            vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
        );
        assert_eq!(tiers.iter().map(Severity::rank).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn causes_serialize_as_their_labels() {
        for cause in Cause::ALL {
            let json = serde_json::to_string(&cause).unwrap();
            assert_eq!(json, format!("\"{}\"", cause.as_str()));
        }
    }

    #[test]
    fn rounding_keeps_the_requested_places() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(42.0, 1), 42.0);
    }

    #[test]
    fn deviation_reports_share_of_image() {
        let region = Region {
            index: 4,
            bounding_box: BoundingBox::from_corners(Point { x: 0, y: 0 }, Point { x: 99, y: 99 }),
            area_pixels: 10_000,
            mean_intensity: 96.44,
            pixels: Vec::new(),
        };
        let classification = Classification {
            cause: Cause::EncroachmentOrConstruction,
            severity: Severity::Critical,
        };
        let deviation = Deviation::new(&region, classification, 1_000_000);
        assert_eq!(deviation.id, "D4");
        assert_eq!(deviation.area_percentage, 1.0);
        assert_eq!(deviation.avg_change_intensity, 96.4);
        assert_eq!(deviation.discovery_index, 4);

        let json = serde_json::to_value(&deviation).unwrap();
        assert_eq!(json["type"], "Possible Encroachment/Construction");
        assert_eq!(json["severity"], "Critical");
        assert_eq!(json["bbox"]["width"], 100);
        assert!(json.get("discovery_index").is_none());
    }
}
