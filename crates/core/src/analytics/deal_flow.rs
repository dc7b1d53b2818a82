use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::round_ratio;
use super::types::{DealFlow, FlowCounter};
use crate::domain::deal::{Deal, DealStatus};

#[derive(Debug, Clone, Copy)]
struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    /// Half-open: `[start, end)`.
    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[derive(Debug, Default)]
struct WindowTally {
    new_deals: usize,
    /// New deals that have not closed won; a won deal is credited by its win.
    new_unwon_deals: usize,
    wins: usize,
    new_value: Decimal,
}

impl WindowTally {
    fn collect(deals: &[Deal], window: Window) -> Self {
        let mut tally = Self::default();
        for deal in deals {
            if deal.created_at.is_some_and(|created| window.contains(created)) {
                tally.new_deals += 1;
                tally.new_value += deal.pipeline_value;
                if deal.status != DealStatus::Won {
                    tally.new_unwon_deals += 1;
                }
            }
            // updatedAt stands in for the won transition timestamp.
            if deal.status == DealStatus::Won
                && deal.updated_at.is_some_and(|updated| window.contains(updated))
            {
                tally.wins += 1;
            }
        }
        tally
    }

    fn activity(&self) -> usize {
        self.new_deals + self.wins
    }
}

/// `(current - previous) / (current + previous)`, or 0 when both are empty.
fn bounded_change(current: usize, previous: usize) -> f64 {
    let total = (current + previous) as f64;
    if total == 0.0 {
        0.0
    } else {
        ((current as f64 - previous as f64) / total).clamp(-1.0, 1.0)
    }
}

/// Period-over-period flow across two equal windows ending at `now`.
///
/// `momentum_index` is `(current - previous) / (current + previous)` over
/// combined new-deal and win activity, which is bounded to `[-1, 1]` and is 0
/// when both windows are empty.
///
/// `growth_index` uses the same ratio but counts current-window wins plus new
/// deals that are still unwon, against previous-window unwon new deals. Adding
/// a won deal can only raise it.
///
/// Window starts saturate at the earliest representable instant.
pub fn track_deal_flow(deals: &[Deal], now: DateTime<Utc>, lookback_days: u32) -> DealFlow {
    let span = Duration::days(i64::from(lookback_days));
    let current_start = now.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let previous_start =
        current_start.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC);

    let current = WindowTally::collect(deals, Window { start: current_start, end: now });
    let previous =
        WindowTally::collect(deals, Window { start: previous_start, end: current_start });

    let momentum_index = bounded_change(current.activity(), previous.activity());
    let growth_index =
        bounded_change(current.new_unwon_deals + current.wins, previous.new_unwon_deals);

    DealFlow {
        lookback_days,
        current_window_start: current_start,
        previous_window_start: previous_start,
        new_deals: FlowCounter::new(current.new_deals, previous.new_deals),
        wins: FlowCounter::new(current.wins, previous.wins),
        net_new_pipeline_value: current.new_value - previous.new_value,
        momentum_index: round_ratio(momentum_index),
        growth_index: round_ratio(growth_index),
    }
}
