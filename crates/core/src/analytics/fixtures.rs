//! Shared deal fixtures for the analytics unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::deal::{
    Deal, DealStatus, FollowUp, FollowUpStatus, Proposal, ProposalStatus, Stage, StageCategory,
};

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single().expect("valid fixture date")
}

pub fn now() -> DateTime<Utc> {
    at(2024, 1, 1)
}

pub fn discovery_stage() -> Stage {
    Stage::new("discovery", "Discovery Scheduled", 40, StageCategory::Open)
}

pub fn negotiation_stage() -> Stage {
    Stage::new("negotiation", "Negotiation", 70, StageCategory::Open)
}

pub fn won_stage() -> Stage {
    Stage::new("closed-won", "Closed Won", 100, StageCategory::Won)
}

pub fn lost_stage() -> Stage {
    Stage::new("closed-lost", "Closed Lost", 0, StageCategory::Lost)
}

pub fn follow_up(id: &str, due_at: DateTime<Utc>, status: FollowUpStatus) -> FollowUp {
    FollowUp { id: id.to_string(), due_at: Some(due_at), status }
}

pub fn proposal(id: &str, status: ProposalStatus) -> Proposal {
    Proposal { id: id.to_string(), status, accepted_at: None }
}

/// Four-deal freelancer pipeline: two open deals (one stalled with an overdue
/// follow-up and a past close date), one win and one loss.
pub fn reference_pipeline() -> Vec<Deal> {
    vec![
        Deal::new("deal-discovery", discovery_stage(), DealStatus::Open, 20_000)
            .with_win_probability(75)
            .with_created_at(at(2023, 12, 10))
            .with_updated_at(at(2023, 12, 20))
            .with_last_contact_at(at(2023, 12, 20))
            .with_expected_close_date(at(2024, 2, 15))
            .with_follow_up(follow_up("f-1", at(2024, 1, 10), FollowUpStatus::Scheduled))
            .with_proposal(proposal("p-1", ProposalStatus::Sent)),
        Deal::new("deal-negotiation", negotiation_stage(), DealStatus::Open, 15_000)
            .with_created_at(at(2023, 10, 15))
            .with_updated_at(at(2023, 11, 5))
            .with_last_contact_at(at(2023, 11, 5))
            .with_expected_close_date(at(2023, 12, 15))
            .with_follow_up(follow_up("f-2", at(2023, 12, 1), FollowUpStatus::Scheduled))
            .with_proposal(proposal("p-2", ProposalStatus::Sent)),
        Deal::new("deal-won", won_stage(), DealStatus::Won, 25_000)
            .with_win_probability(60)
            .with_created_at(at(2023, 9, 1))
            .with_updated_at(at(2023, 11, 20))
            .with_last_contact_at(at(2023, 11, 20))
            .with_follow_up(follow_up("f-3", at(2023, 11, 10), FollowUpStatus::Completed))
            .with_proposal(Proposal {
                id: "p-3".to_string(),
                status: ProposalStatus::Accepted,
                accepted_at: Some(at(2023, 11, 18)),
            }),
        Deal::new("deal-lost", lost_stage(), DealStatus::Lost, 10_000)
            .with_win_probability(30)
            .with_created_at(at(2023, 8, 1))
            .with_updated_at(at(2023, 10, 10)),
    ]
}
