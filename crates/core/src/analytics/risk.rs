use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::RiskSignals;
use crate::domain::deal::{days_between, Deal};

/// Flags stalled deals and deals with overdue follow-ups.
///
/// An active deal is stalled when it has never been contacted or its last
/// contact is more than `stall_threshold_days` old. Overdue follow-ups are
/// counted once per deal, however many of its follow-ups are late.
pub fn identify_risks(
    deals: &[Deal],
    now: DateTime<Utc>,
    stall_threshold_days: u32,
) -> RiskSignals {
    let threshold = f64::from(stall_threshold_days);
    let mut stalled_pipeline_value = Decimal::ZERO;
    let mut stalled_deal_ids = Vec::new();
    let mut overdue_follow_up_deal_ids = Vec::new();

    for deal in deals.iter().filter(|deal| deal.is_active()) {
        if is_stalled(deal, now, threshold) {
            stalled_pipeline_value += deal.pipeline_value;
            stalled_deal_ids.push(deal.id.clone());
        }
        if deal.has_overdue_follow_up(now) {
            overdue_follow_up_deal_ids.push(deal.id.clone());
        }
    }

    RiskSignals {
        stall_threshold_days,
        stalled_deal_count: stalled_deal_ids.len(),
        stalled_pipeline_value,
        overdue_follow_up_count: overdue_follow_up_deal_ids.len(),
        stalled_deal_ids,
        overdue_follow_up_deal_ids,
    }
}

fn is_stalled(deal: &Deal, now: DateTime<Utc>, threshold_days: f64) -> bool {
    match deal.last_contact_at {
        Some(last_contact) => days_between(last_contact, now) > threshold_days,
        None => true,
    }
}
