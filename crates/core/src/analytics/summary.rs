use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::PipelineSummary;
use super::{mean, ratio, round_days, round_ratio};
use crate::domain::deal::{Deal, DealStatus};

/// Status partition, value totals and averages for a deal snapshot.
///
/// Every deal lands in exactly one of the four status buckets, so the bucket
/// counts always sum to `total_deals`.
pub fn summarize_deals(deals: &[Deal], now: DateTime<Utc>) -> PipelineSummary {
    let mut open_deals = 0;
    let mut on_hold_deals = 0;
    let mut won_deals = 0;
    let mut lost_deals = 0;
    let mut pipeline_value = Decimal::ZERO;
    let mut weighted_pipeline_value = Decimal::ZERO;
    let mut won_pipeline_value = Decimal::ZERO;
    let mut open_pipeline_value = Decimal::ZERO;

    for deal in deals {
        match deal.status {
            DealStatus::Open => open_deals += 1,
            DealStatus::OnHold => on_hold_deals += 1,
            DealStatus::Won => won_deals += 1,
            DealStatus::Lost => lost_deals += 1,
        }

        pipeline_value += deal.pipeline_value;
        weighted_pipeline_value += deal.weighted_value();
        if deal.status == DealStatus::Won {
            won_pipeline_value += deal.pipeline_value;
        }
        if deal.is_active() {
            open_pipeline_value += deal.pipeline_value;
        }
    }

    let total_deals = deals.len();
    let average_deal_size = if total_deals == 0 {
        Decimal::ZERO
    } else {
        (pipeline_value / Decimal::from(total_deals)).round_dp(2)
    };

    let closed_deal_cycle_average_days =
        mean(deals.iter().filter(|deal| deal.status.is_closed()).filter_map(Deal::cycle_days));
    let open_deal_age_average_days =
        mean(deals.iter().filter(|deal| deal.is_active()).filter_map(|deal| deal.age_days(now)));

    PipelineSummary {
        total_deals,
        open_deals,
        on_hold_deals,
        won_deals,
        lost_deals,
        pipeline_value,
        weighted_pipeline_value: weighted_pipeline_value.round_dp(2),
        won_pipeline_value,
        open_pipeline_value,
        average_deal_size,
        win_rate: round_ratio(ratio(won_deals as f64, (won_deals + lost_deals) as f64)),
        pipeline_momentum: round_ratio(ratio(won_deals as f64, total_deals as f64)),
        closed_deal_cycle_average_days: round_days(closed_deal_cycle_average_days),
        open_deal_age_average_days: round_days(open_deal_age_average_days),
    }
}
