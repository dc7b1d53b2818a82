use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::VelocityMetrics;
use super::{mean, round_days};
use crate::domain::deal::Deal;

/// Recomputes open-deal age directly from the deals so it can be cross-checked
/// against `PipelineSummary::open_deal_age_average_days`.
pub fn analyze_velocity(deals: &[Deal], now: DateTime<Utc>) -> VelocityMetrics {
    let average_open_days =
        mean(deals.iter().filter(|deal| deal.is_active()).filter_map(|deal| deal.age_days(now)));

    let (overdue_deals, overdue_pipeline_value) = deals
        .iter()
        .filter(|deal| is_overdue(deal, now))
        .fold((0, Decimal::ZERO), |(count, value), deal| (count + 1, value + deal.pipeline_value));

    VelocityMetrics {
        average_open_days: round_days(average_open_days),
        overdue_deals,
        overdue_pipeline_value,
    }
}

fn is_overdue(deal: &Deal, now: DateTime<Utc>) -> bool {
    deal.is_active() && deal.expected_close_date.is_some_and(|close| close < now)
}
