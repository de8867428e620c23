// THEORY:
// Recommendations turn a finished analysis into a short action list for field
// staff. They only read the ranked deviations and the summary, so they can be
// recomputed from a stored record at any time.

use crate::core_modules::aggregator::Summary;
use crate::core_modules::deviation::{Cause, Deviation, RiskLevel};
use serde::{Deserialize, Serialize};

/// Urgency of a recommended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Immediate,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub action: String,
    pub reason: String,
}

impl Recommendation {
    fn new(priority: Priority, action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            priority,
            action: action.into(),
            reason: reason.into(),
        }
    }
}

const BASE_MAP_REFRESH_PERCENTAGE: f64 = 5.0;

fn for_deviation(deviation: &Deviation) -> Option<Recommendation> {
    match deviation.cause {
        Cause::EncroachmentOrConstruction => Some(Recommendation::new(
            Priority::High,
            format!("Issue encroachment notice for region {}", deviation.id),
            format!("{} detected with {} severity", deviation.cause, deviation.severity),
        )),
        Cause::UnauthorizedDevelopment => Some(Recommendation::new(
            Priority::High,
            format!("Issue stop-work order for region {}", deviation.id),
            format!("Unauthorized development detected - area: {} px", deviation.area_pixels),
        )),
        Cause::DemolitionOrClearing => Some(Recommendation::new(
            Priority::Medium,
            format!("Verify land utilization status for region {}", deviation.id),
            "Possible under-utilization or abandonment detected",
        )),
        _ => None,
    }
}

/// Action list for one analysis, most urgent general actions first, then one per
/// actionable deviation in result order, then routine follow-ups.
pub fn recommend(deviations: &[Deviation], summary: &Summary) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if summary.risk_level == RiskLevel::Critical {
        recommendations.push(Recommendation::new(
            Priority::Immediate,
            "Schedule emergency field inspection within 48 hours",
            "Critical deviations detected that require immediate verification",
        ));
    }

    recommendations.extend(deviations.iter().filter_map(for_deviation));

    if summary.change_percentage > BASE_MAP_REFRESH_PERCENTAGE {
        recommendations.push(Recommendation::new(
            Priority::Medium,
            "Update reference base maps with current survey data",
            format!(
                "{}% change detected, base map may be outdated",
                summary.change_percentage
            ),
        ));
    }

    recommendations.push(Recommendation::new(
        Priority::Low,
        "Schedule next satellite monitoring review in 30 days",
        "Continue periodic monitoring to track deviation trends",
    ));
    recommendations
}
