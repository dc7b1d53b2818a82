//! Sales-pipeline analytics engine
//!
//! Turns a snapshot of deals and a reference time into a single report:
//! summary metrics, conversion rates, velocity, forecast scenarios, risk
//! signals, period-over-period deal flow, a composite health score, capped
//! recommendations and a narrative experience layer for the dashboard.
//!
//! Every component is a pure function of its explicit inputs. Components that
//! blend metrics take the previously computed groups rather than re-reading
//! the deals, so the report stays internally consistent.

mod conversion;
mod deal_flow;
mod engine;
mod experience;
#[cfg(test)]
mod fixtures;
mod forecast;
mod format;
mod health;
mod recommendations;
mod risk;
mod summary;
mod types;
mod velocity;

pub use conversion::calculate_conversion_rates;
pub use deal_flow::track_deal_flow;
pub use engine::PipelineAnalyzer;
pub use experience::compose_experience;
pub use forecast::build_forecast;
pub use format::{format_currency, format_percent};
pub use health::{score_health, HealthScorer, HealthWeights};
pub use recommendations::generate_recommendations;
pub use risk::identify_risks;
pub use summary::summarize_deals;
pub use types::*;
pub use velocity::analyze_velocity;

use crate::errors::DomainError;

/// Result type for analytics operations
pub type AnalyticsResult<T> = Result<T, DomainError>;

/// Default health blend weights
pub const DEFAULT_HEALTH_WEIGHTS: HealthWeights =
    HealthWeights { win_rate: 0.35, confidence: 0.25, stalled: 0.25, growth: 0.15 };

/// Coverage ratio below which the report asks for more pipeline
pub const COVERAGE_TARGET: f64 = 1.5;

/// Scores at or above this are healthy unless win-rate risk says otherwise
pub const HEALTHY_SCORE: f64 = 70.0;

/// Scores below this are critical
pub const CRITICAL_SCORE: f64 = 40.0;

/// Maximum recommendations in a report
pub const MAX_RECOMMENDATIONS: usize = 6;

/// Maximum next best actions surfaced in the experience layer
pub const MAX_NEXT_BEST_ACTIONS: usize = 3;

pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) =
        values.into_iter().fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    ratio(sum, count as f64)
}

/// Ratios and rates are reported to four decimal places.
pub(crate) fn round_ratio(value: f64) -> f64 {
    round_to(value, 4)
}

/// Day averages and scores are reported to two decimal places.
pub(crate) fn round_days(value: f64) -> f64 {
    round_to(value, 2)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
