//! Rule-driven action recommendations
//!
//! Rules are evaluated in catalog order. The triggered set is stable-sorted by
//! priority, so equal priorities keep catalog order, then de-duplicated by
//! title and capped at [`MAX_RECOMMENDATIONS`].

use std::collections::HashSet;

use super::format::{format_currency, format_percent};
use super::types::{PipelineSignals, Priority, Recommendation};
use super::{ratio, COVERAGE_TARGET, MAX_RECOMMENDATIONS};
use crate::config::AnalyticsConfig;
use crate::domain::deal::Deal;

pub const RE_ENGAGE_STALLED: &str = "Re-engage stalled accounts";
pub const AUTOMATE_FOLLOW_UPS: &str = "Automate follow-up cadences";
pub const SHORTEN_CYCLE_TIMES: &str = "Shorten deal cycle times";
pub const UPDATE_CLOSE_DATES: &str = "Update overdue close dates";
pub const TIGHTEN_QUALIFICATION: &str = "Tighten deal qualification";
pub const SEND_PROPOSALS: &str = "Send proposals to qualified deals";
pub const STRENGTHEN_PROPOSALS: &str = "Strengthen proposal positioning";
pub const SCHEDULE_NEXT_STEPS: &str = "Schedule next steps on open deals";
pub const REFILL_FUNNEL: &str = "Refill the top of the funnel";
pub const GROW_COVERAGE: &str = "Grow forecast coverage";
pub const ADD_FIRST_DEALS: &str = "Add your first deals";

const CRITICAL_STALLED_SHARE: f64 = 0.5;
const LOW_PROPOSAL_COVERAGE: f64 = 0.5;
const LOW_ACCEPTANCE_RATE: f64 = 0.3;
const LOW_FOLLOW_UP_RATE: f64 = 0.5;

pub fn generate_recommendations(
    deals: &[Deal],
    signals: PipelineSignals<'_>,
    config: &AnalyticsConfig,
) -> Vec<Recommendation> {
    let PipelineSignals { summary, conversion, velocity, forecast, risk, deal_flow } = signals;
    let symbol = config.currency_symbol.as_str();
    let active_deals = summary.active_deals();
    let mut triggered = Vec::new();

    if risk.stalled_deal_count > 0 {
        let stalled_share = ratio(risk.stalled_deal_count as f64, active_deals as f64);
        let priority = if stalled_share >= CRITICAL_STALLED_SHARE {
            Priority::Critical
        } else {
            Priority::High
        };
        triggered.push(Recommendation::new(
            RE_ENGAGE_STALLED,
            format!(
                "{} active deal(s) worth {} have had no contact in over {} days.",
                risk.stalled_deal_count,
                format_currency(risk.stalled_pipeline_value, symbol),
                risk.stall_threshold_days
            ),
            priority,
            "risk.stalledDealCount",
        ));
    }

    if risk.overdue_follow_up_count > 0 {
        triggered.push(Recommendation::new(
            AUTOMATE_FOLLOW_UPS,
            format!(
                "{} deal(s) have scheduled follow-ups past due. Put reminders on a cadence.",
                risk.overdue_follow_up_count
            ),
            Priority::High,
            "risk.overdueFollowUpCount",
        ));
    }

    let cycle_threshold = f64::from(config.cycle_time_threshold_days);
    if summary.closed_deal_cycle_average_days > cycle_threshold {
        let priority = if summary.closed_deal_cycle_average_days > cycle_threshold * 2.0 {
            Priority::High
        } else {
            Priority::Medium
        };
        triggered.push(Recommendation::new(
            SHORTEN_CYCLE_TIMES,
            format!(
                "Closed deals take {:.0} days on average against a {}-day target.",
                summary.closed_deal_cycle_average_days, config.cycle_time_threshold_days
            ),
            priority,
            "summary.closedDealCycleAverageDays",
        ));
    }

    if velocity.overdue_deals > 0 {
        triggered.push(Recommendation::new(
            UPDATE_CLOSE_DATES,
            format!(
                "{} open deal(s) worth {} are past their expected close date.",
                velocity.overdue_deals,
                format_currency(velocity.overdue_pipeline_value, symbol)
            ),
            Priority::High,
            "velocity.overdueDeals",
        ));
    }

    if summary.closed_deals() > 0 && summary.win_rate < config.win_rate_baseline {
        let priority = if summary.win_rate < config.win_rate_baseline / 2.0 {
            Priority::High
        } else {
            Priority::Medium
        };
        triggered.push(Recommendation::new(
            TIGHTEN_QUALIFICATION,
            format!(
                "Win rate is {} against a {} baseline.",
                format_percent(summary.win_rate),
                format_percent(config.win_rate_baseline)
            ),
            priority,
            "summary.winRate",
        ));
    }

    let without_proposal =
        deals.iter().filter(|deal| deal.is_active() && !deal.has_proposal()).count();
    if without_proposal > 0 && conversion.proposal_coverage < LOW_PROPOSAL_COVERAGE {
        triggered.push(Recommendation::new(
            SEND_PROPOSALS,
            format!("{without_proposal} active deal(s) have no proposal yet."),
            Priority::Medium,
            "conversionRates.proposalCoverage",
        ));
    }

    if conversion.total_proposals > 0 && conversion.proposal_acceptance_rate < LOW_ACCEPTANCE_RATE
    {
        triggered.push(Recommendation::new(
            STRENGTHEN_PROPOSALS,
            format!(
                "Only {} of proposals are accepted.",
                format_percent(conversion.proposal_acceptance_rate)
            ),
            Priority::Medium,
            "conversionRates.proposalAcceptanceRate",
        ));
    }

    if active_deals > 0 && conversion.active_follow_up_rate < LOW_FOLLOW_UP_RATE {
        triggered.push(Recommendation::new(
            SCHEDULE_NEXT_STEPS,
            format!(
                "{} of deals have a scheduled follow-up.",
                format_percent(conversion.active_follow_up_rate)
            ),
            Priority::Low,
            "conversionRates.activeFollowUpRate",
        ));
    }

    if summary.total_deals > 0 && (deal_flow.momentum_index < 0.0 || active_deals == 0) {
        triggered.push(Recommendation::new(
            REFILL_FUNNEL,
            format!(
                "{} new deal(s) in the last {} days versus {} in the period before.",
                deal_flow.new_deals.count,
                deal_flow.lookback_days,
                deal_flow.new_deals.previous_count
            ),
            Priority::Medium,
            "dealFlow.momentumIndex",
        ));
    }

    if active_deals > 0 && forecast.coverage_ratio < COVERAGE_TARGET {
        triggered.push(Recommendation::new(
            GROW_COVERAGE,
            format!(
                "Weighted pipeline covers won revenue {:.2}x; aim for {COVERAGE_TARGET:.1}x.",
                forecast.coverage_ratio
            ),
            Priority::Low,
            "forecast.coverageRatio",
        ));
    }

    if summary.total_deals == 0 {
        triggered.push(Recommendation::new(
            ADD_FIRST_DEALS,
            "There are no deals to analyze yet. Add the engagements you are working on.",
            Priority::High,
            "summary.totalDeals",
        ));
    }

    rank(triggered)
}

fn rank(mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    recommendations.sort_by_key(|recommendation| recommendation.priority);

    let mut seen = HashSet::new();
    recommendations.retain(|recommendation| seen.insert(recommendation.title.clone()));
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}
