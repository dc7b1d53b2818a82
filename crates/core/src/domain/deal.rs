use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Open,
    OnHold,
    Won,
    Lost,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::OnHold => "on_hold",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "on_hold" | "on-hold" | "onhold" => Some(Self::OnHold),
            "won" => Some(Self::Won),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }

    /// Open and on-hold deals still carry live pipeline.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::OnHold)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    Open,
    Won,
    Lost,
}

impl StageCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "won" => Some(Self::Won),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }
}

/// Denormalized stage snapshot captured with the deal record.
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub win_probability: Decimal,
    pub status_category: StageCategory,
}

impl Stage {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        win_probability: impl Into<Decimal>,
        status_category: StageCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            win_probability: clamp_probability(win_probability.into()),
            status_category,
        }
    }

    pub fn unassigned() -> Self {
        Self::new("", "Unassigned", Decimal::ZERO, StageCategory::Open)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FollowUpStatus {
    Scheduled,
    Completed,
    Other(String),
}

impl FollowUpStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Self::Scheduled,
            "completed" => Self::Completed,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FollowUp {
    pub id: String,
    pub due_at: Option<DateTime<Utc>>,
    pub status: FollowUpStatus,
}

impl FollowUp {
    pub fn is_scheduled(&self) -> bool {
        self.status == FollowUpStatus::Scheduled
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_scheduled() && self.due_at.is_some_and(|due_at| due_at < now)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposalStatus {
    Draft,
    Sent,
    Accepted,
    Other(String),
}

impl ProposalStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Self::Draft,
            "sent" => Self::Sent,
            "accepted" => Self::Accepted,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    pub id: String,
    pub status: ProposalStatus,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Proposal {
    /// A recorded acceptance timestamp counts even if the status lagged behind.
    pub fn is_accepted(&self) -> bool {
        self.status == ProposalStatus::Accepted || self.accepted_at.is_some()
    }
}

/// Read-only deal snapshot as eager-loaded by the persistence layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Deal {
    pub id: DealId,
    pub stage_id: Option<String>,
    pub stage: Stage,
    pub status: DealStatus,
    pub pipeline_value: Decimal,
    pub win_probability: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub next_follow_up_at: Option<DateTime<Utc>>,
    pub expected_close_date: Option<DateTime<Utc>>,
    pub follow_ups: Vec<FollowUp>,
    pub proposals: Vec<Proposal>,
}

impl Deal {
    pub fn new(
        id: impl Into<String>,
        stage: Stage,
        status: DealStatus,
        pipeline_value: impl Into<Decimal>,
    ) -> Self {
        Self {
            id: DealId(id.into()),
            stage_id: (!stage.id.is_empty()).then(|| stage.id.clone()),
            stage,
            status,
            pipeline_value: pipeline_value.into().max(Decimal::ZERO),
            win_probability: None,
            created_at: None,
            updated_at: None,
            last_contact_at: None,
            next_follow_up_at: None,
            expected_close_date: None,
            follow_ups: Vec::new(),
            proposals: Vec::new(),
        }
    }

    pub fn with_win_probability(mut self, probability: impl Into<Decimal>) -> Self {
        self.win_probability = Some(clamp_probability(probability.into()));
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with_last_contact_at(mut self, last_contact_at: DateTime<Utc>) -> Self {
        self.last_contact_at = Some(last_contact_at);
        self
    }

    pub fn with_expected_close_date(mut self, expected_close_date: DateTime<Utc>) -> Self {
        self.expected_close_date = Some(expected_close_date);
        self
    }

    pub fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_ups.push(follow_up);
        self
    }

    pub fn with_proposal(mut self, proposal: Proposal) -> Self {
        self.proposals.push(proposal);
        self
    }

    /// Win probability in percent; falls back to the stage snapshot.
    pub fn probability(&self) -> Decimal {
        clamp_probability(self.win_probability.unwrap_or(self.stage.win_probability))
    }

    pub fn weighted_value(&self) -> Decimal {
        self.pipeline_value * self.probability() / Decimal::ONE_HUNDRED
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> Option<f64> {
        self.created_at.map(|created_at| days_between(created_at, now))
    }

    pub fn cycle_days(&self) -> Option<f64> {
        match (self.created_at, self.updated_at) {
            (Some(created_at), Some(updated_at)) => Some(days_between(created_at, updated_at)),
            _ => None,
        }
    }

    pub fn has_proposal(&self) -> bool {
        !self.proposals.is_empty()
    }

    pub fn has_scheduled_follow_up(&self) -> bool {
        self.follow_ups.iter().any(FollowUp::is_scheduled)
    }

    pub fn has_overdue_follow_up(&self, now: DateTime<Utc>) -> bool {
        self.follow_ups.iter().any(|follow_up| follow_up.is_overdue(now))
    }
}

pub fn clamp_probability(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{
        days_between, Deal, DealStatus, FollowUp, FollowUpStatus, Proposal, ProposalStatus, Stage,
        StageCategory,
    };

    fn negotiation() -> Stage {
        Stage::new("negotiation", "Negotiation", 70, StageCategory::Open)
    }

    #[test]
    fn probability_falls_back_to_stage_snapshot() {
        let deal = Deal::new("d-1", negotiation(), DealStatus::Open, 15_000);
        assert_eq!(deal.probability(), Decimal::from(70));
        assert_eq!(deal.weighted_value(), Decimal::from(10_500));

        let overridden = deal.with_win_probability(90);
        assert_eq!(overridden.probability(), Decimal::from(90));
        assert_eq!(overridden.weighted_value(), Decimal::from(13_500));
    }

    #[test]
    fn probabilities_are_clamped_to_percent_range() {
        let deal =
            Deal::new("d-2", negotiation(), DealStatus::Open, 1_000).with_win_probability(140);
        assert_eq!(deal.probability(), Decimal::ONE_HUNDRED);
        assert_eq!(Stage::new("s", "S", -5, StageCategory::Open).win_probability, Decimal::ZERO);
    }

    #[test]
    fn negative_pipeline_value_is_floored_at_zero() {
        let deal = Deal::new("d-3", negotiation(), DealStatus::Open, -250);
        assert_eq!(deal.pipeline_value, Decimal::ZERO);
    }

    #[test]
    fn status_parsing_accepts_hold_spellings() {
        assert_eq!(DealStatus::parse("on_hold"), Some(DealStatus::OnHold));
        assert_eq!(DealStatus::parse("On-Hold"), Some(DealStatus::OnHold));
        assert_eq!(DealStatus::parse("archived"), None);
        assert!(DealStatus::OnHold.is_active());
        assert!(DealStatus::Lost.is_closed());
    }

    #[test]
    fn overdue_follow_up_requires_scheduled_status() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let past = Utc.with_ymd_and_hms(2023, 12, 20, 0, 0, 0).unwrap();

        let completed =
            FollowUp { id: "f-1".into(), due_at: Some(past), status: FollowUpStatus::Completed };
        let scheduled =
            FollowUp { id: "f-2".into(), due_at: Some(past), status: FollowUpStatus::Scheduled };
        let undated =
            FollowUp { id: "f-3".into(), due_at: None, status: FollowUpStatus::Scheduled };

        assert!(!completed.is_overdue(now));
        assert!(scheduled.is_overdue(now));
        assert!(!undated.is_overdue(now));
    }

    #[test]
    fn accepted_timestamp_counts_as_acceptance() {
        let accepted_at = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
        let lagging = Proposal {
            id: "p-1".into(),
            status: ProposalStatus::Sent,
            accepted_at: Some(accepted_at),
        };
        let sent = Proposal { id: "p-2".into(), status: ProposalStatus::Sent, accepted_at: None };

        assert!(lagging.is_accepted());
        assert!(!sent.is_accepted());
        assert_eq!(ProposalStatus::parse("Declined"), ProposalStatus::Other("declined".into()));
    }

    #[test]
    fn day_spans_are_fractional() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        assert!((days_between(start, end) - 1.5).abs() < f64::EPSILON);
    }
}
