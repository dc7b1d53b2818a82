use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::round_ratio;
use super::types::Forecast;
use crate::domain::deal::{Deal, DealStatus};

/// Revenue scenarios for the snapshot.
///
/// Scenario policy:
/// - `base_case`: won value plus probability-weighted open and on-hold value.
/// - `best_case`: won value plus every open and on-hold deal fully realized.
/// - `worst_case`: only already-won value is realized.
///
/// So `worst_case <= base_case <= best_case` always holds. Lost deals never
/// contribute to any scenario.
///
/// `coverage_ratio` is the probability-weighted value of the whole snapshot
/// over won value: how many times the weighted book covers revenue already
/// banked. It is 0 when nothing has been won.
///
/// `confidence_ratio` is `base_case / total_pipeline`, 0 for an empty book.
/// Since `base_case <= total_pipeline`, adding won value only raises it.
pub fn build_forecast(deals: &[Deal]) -> Forecast {
    let mut total_pipeline = Decimal::ZERO;
    let mut weighted_pipeline = Decimal::ZERO;
    let mut won_value = Decimal::ZERO;
    let mut active_weighted = Decimal::ZERO;
    let mut active_value = Decimal::ZERO;

    for deal in deals {
        total_pipeline += deal.pipeline_value;
        weighted_pipeline += deal.weighted_value();
        match deal.status {
            DealStatus::Won => won_value += deal.pipeline_value,
            DealStatus::Open | DealStatus::OnHold => {
                active_value += deal.pipeline_value;
                active_weighted += deal.weighted_value();
            }
            DealStatus::Lost => {}
        }
    }

    let coverage_ratio = if won_value.is_zero() {
        0.0
    } else {
        (weighted_pipeline / won_value).to_f64().unwrap_or(0.0)
    };

    let base_case = won_value + active_weighted;
    let confidence_ratio = if total_pipeline.is_zero() {
        0.0
    } else {
        (base_case / total_pipeline).to_f64().unwrap_or(0.0)
    };

    Forecast {
        total_pipeline,
        base_case: base_case.round_dp(2),
        best_case: won_value + active_value,
        worst_case: won_value,
        coverage_ratio: round_ratio(coverage_ratio),
        confidence_ratio: round_ratio(confidence_ratio.clamp(0.0, 1.0)),
    }
}
