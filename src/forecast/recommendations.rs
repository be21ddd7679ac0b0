//! Rule-based efficiency recommendations.
//!
//! Every rule is independent; output order is rule order and nothing is
//! deduplicated or ranked beyond the fixed priority field.

use tracing::debug;

use super::stats::mean;
use crate::domain::{DailyPrediction, DailySeries, Priority, Recommendation, RecommendationType};

pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;
const WEEK: usize = 7;

#[derive(Debug, Clone, Copy)]
pub struct RecommendationEngine {
    pub max_recommendations: usize,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self {
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }
}

impl RecommendationEngine {
    pub fn new(max_recommendations: usize) -> Self {
        Self { max_recommendations }
    }

    pub fn recommend(&self, history: &DailySeries, predictions: &[DailyPrediction]) -> Vec<Recommendation> {
        let values = history.values();

        let mut out: Vec<Recommendation> = [
            Some(peak_usage_shift()),
            efficiency_audit(values),
            Some(battery_optimization()),
            Some(load_balancing()),
            Some(solar_optimization()),
        ]
        .into_iter()
        .flatten()
        .collect();

        out.truncate(self.max_recommendations);
        debug!(
            history = values.len(),
            predictions = predictions.len(),
            recommendations = out.len(),
            "generated recommendations"
        );
        out
    }
}

/// Week-over-week growth of the last 7 values against the 7 before them.
pub fn week_over_week_increase(values: &[f64]) -> Option<f64> {
    if values.len() < 2 * WEEK {
        return None;
    }
    let n = values.len();
    let last = mean(&values[n - WEEK..]);
    let prior = mean(&values[n - 2 * WEEK..n - WEEK]);
    if last > prior && prior > 0.0 {
        Some((last - prior) / prior)
    } else if last > prior {
        Some(f64::INFINITY)
    } else {
        None
    }
}

fn peak_usage_shift() -> Recommendation {
    Recommendation {
        id: "peak_usage_shift".into(),
        kind: RecommendationType::Behavioral,
        priority: Priority::High,
        title: "Shift Peak Energy Usage".into(),
        description: "Your energy consumption peaks between 5-8PM, which coincides with higher electricity rates. \
            Consider shifting energy-intensive activities to off-peak hours (10PM-6AM) to reduce costs."
            .into(),
        potential_savings: "$15-30 per month".into(),
        implementation_cost: "None".into(),
        confidence: 0.85,
    }
}

fn efficiency_audit(values: &[f64]) -> Option<Recommendation> {
    let increase = week_over_week_increase(values)?;
    let description = if increase.is_finite() {
        format!(
            "Your energy consumption has increased by approximately {:.0}% compared to the previous week. \
             Consider conducting an energy efficiency audit to identify potential issues.",
            increase * 100.0
        )
    } else {
        "Your energy consumption has increased compared to the previous week. \
         Consider conducting an energy efficiency audit to identify potential issues."
            .to_string()
    };

    Some(Recommendation {
        id: "efficiency_audit".into(),
        kind: RecommendationType::Maintenance,
        priority: Priority::Medium,
        title: "Energy Efficiency Audit Recommended".into(),
        description,
        potential_savings: "$25-40 per month".into(),
        implementation_cost: "Medium".into(),
        confidence: 0.72,
    })
}

fn battery_optimization() -> Recommendation {
    Recommendation {
        id: "battery_optimization".into(),
        kind: RecommendationType::System,
        priority: Priority::High,
        title: "Battery Charge/Discharge Optimization".into(),
        description: "Optimizing your battery to charge during off-peak hours and discharge during peak demand \
            could improve your energy independence and reduce costs."
            .into(),
        potential_savings: "$20-35 per month".into(),
        implementation_cost: "Low".into(),
        confidence: 0.88,
    }
}

fn load_balancing() -> Recommendation {
    Recommendation {
        id: "load_balancing".into(),
        kind: RecommendationType::Behavioral,
        priority: Priority::Medium,
        title: "Balance Energy Loads Across the Day".into(),
        description: "Running major appliances sequentially rather than simultaneously can reduce peak demand \
            charges and improve system efficiency."
            .into(),
        potential_savings: "$10-20 per month".into(),
        implementation_cost: "None".into(),
        confidence: 0.81,
    }
}

fn solar_optimization() -> Recommendation {
    Recommendation {
        id: "solar_optimization".into(),
        kind: RecommendationType::Optimization,
        priority: Priority::Medium,
        title: "Solar Production Optimization".into(),
        description: "Based on your energy patterns, adjusting solar panel angles seasonally could increase \
            production by approximately 8-12%."
            .into(),
        potential_savings: "$120-180 per year".into(),
        implementation_cost: "Low".into(),
        confidence: 0.78,
    }
}
