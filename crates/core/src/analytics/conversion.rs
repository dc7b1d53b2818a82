use super::types::{ConversionRates, PipelineSummary};
use super::{ratio, round_ratio};
use crate::domain::deal::Deal;

pub fn calculate_conversion_rates(deals: &[Deal], summary: &PipelineSummary) -> ConversionRates {
    let deals_with_proposals = deals.iter().filter(|deal| deal.has_proposal()).count();
    let deals_with_follow_ups = deals.iter().filter(|deal| deal.has_scheduled_follow_up()).count();

    // Acceptance is pooled over every proposal, not averaged per deal.
    let total_proposals: usize = deals.iter().map(|deal| deal.proposals.len()).sum();
    let accepted_proposals = deals
        .iter()
        .flat_map(|deal| deal.proposals.iter())
        .filter(|proposal| proposal.is_accepted())
        .count();

    let total_deals = summary.total_deals as f64;
    ConversionRates {
        proposal_coverage: round_ratio(ratio(deals_with_proposals as f64, total_deals)),
        proposal_acceptance_rate: round_ratio(ratio(
            accepted_proposals as f64,
            total_proposals as f64,
        )),
        active_follow_up_rate: round_ratio(ratio(deals_with_follow_ups as f64, total_deals)),
        total_proposals,
        accepted_proposals,
    }
}
