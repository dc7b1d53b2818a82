//! Report types produced by the analytics pipeline.
//!
//! Every record serializes with camelCase keys so the report can be embedded
//! directly in a dashboard response.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::deal::DealId;

/// Status partition counts, value totals and average metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total_deals: usize,
    pub open_deals: usize,
    pub on_hold_deals: usize,
    pub won_deals: usize,
    pub lost_deals: usize,
    pub pipeline_value: Decimal,
    /// Probability-weighted value across all deals, closed ones included.
    pub weighted_pipeline_value: Decimal,
    pub won_pipeline_value: Decimal,
    /// Value of open and on-hold deals.
    pub open_pipeline_value: Decimal,
    pub average_deal_size: Decimal,
    /// Won over closed (won + lost); 0 when nothing has closed.
    pub win_rate: f64,
    /// Won deals over all deals.
    pub pipeline_momentum: f64,
    pub closed_deal_cycle_average_days: f64,
    pub open_deal_age_average_days: f64,
}

impl PipelineSummary {
    pub fn active_deals(&self) -> usize {
        self.open_deals + self.on_hold_deals
    }

    pub fn closed_deals(&self) -> usize {
        self.won_deals + self.lost_deals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRates {
    /// Share of deals with at least one proposal.
    pub proposal_coverage: f64,
    /// Accepted proposals over all proposals, pooled across deals.
    pub proposal_acceptance_rate: f64,
    /// Share of deals with at least one scheduled follow-up.
    pub active_follow_up_rate: f64,
    pub total_proposals: usize,
    pub accepted_proposals: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityMetrics {
    pub average_open_days: f64,
    pub overdue_deals: usize,
    pub overdue_pipeline_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub total_pipeline: Decimal,
    pub base_case: Decimal,
    pub best_case: Decimal,
    pub worst_case: Decimal,
    pub coverage_ratio: f64,
    /// Share of the total pipeline the base case expects to realize, in 0..=1.
    pub confidence_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSignals {
    pub stall_threshold_days: u32,
    pub stalled_deal_count: usize,
    pub stalled_pipeline_value: Decimal,
    /// Deals with at least one scheduled follow-up past due.
    pub overdue_follow_up_count: usize,
    pub stalled_deal_ids: Vec<DealId>,
    pub overdue_follow_up_deal_ids: Vec<DealId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowCounter {
    pub count: usize,
    pub previous_count: usize,
    pub delta: i64,
}

impl FlowCounter {
    pub fn new(count: usize, previous_count: usize) -> Self {
        Self { count, previous_count, delta: count as i64 - previous_count as i64 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealFlow {
    pub lookback_days: u32,
    pub current_window_start: DateTime<Utc>,
    pub previous_window_start: DateTime<Utc>,
    pub new_deals: FlowCounter,
    pub wins: FlowCounter,
    pub net_new_pipeline_value: Decimal,
    /// Bounded to [-1, 1]; positive when the current window is busier.
    pub momentum_index: f64,
    /// Bounded to [-1, 1]. Wins only count in the current window, so a new win
    /// never lowers it.
    pub growth_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    AtRisk,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::AtRisk => "at_risk",
            Self::Critical => "critical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::AtRisk => "at risk",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDriver {
    pub metric: String,
    pub value: f64,
    /// Points this metric adds to the 0-100 score.
    pub contribution: f64,
    pub limiting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    pub score: f64,
    pub status: HealthStatus,
    pub summary: String,
    pub drivers: Vec<HealthDriver>,
}

/// Severity of a recommendation. Declaration order is sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub metric: String,
}

impl Recommendation {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        metric: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
            metric: metric.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotlightTone {
    Positive,
    Neutral,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spotlight {
    pub id: String,
    pub label: String,
    pub value: String,
    pub tone: SpotlightTone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub health_status: HealthStatus,
    pub spotlights: Vec<Spotlight>,
    pub narrative: String,
    pub next_best_actions: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub generated_at: DateTime<Utc>,
    pub lookback_days: u32,
    pub summary: PipelineSummary,
    pub conversion_rates: ConversionRates,
    pub velocity: VelocityMetrics,
    pub forecast: Forecast,
    pub risk: RiskSignals,
    pub deal_flow: DealFlow,
    pub health: HealthScore,
    pub recommendations: Vec<Recommendation>,
    pub experience: Experience,
}

/// Per-call options layered over [`crate::config::AnalyticsConfig`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportOptions {
    pub lookback_days: Option<u32>,
    /// Caller-supplied actions that replace computed ones in the experience layer.
    pub recommendations: Option<Vec<Recommendation>>,
}

impl ReportOptions {
    pub fn with_lookback_days(mut self, lookback_days: u32) -> Self {
        self.lookback_days = Some(lookback_days);
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<Recommendation>) -> Self {
        self.recommendations = Some(recommendations);
        self
    }
}

/// Borrowed view over the independently computed metric groups, handed to the
/// components that blend them.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSignals<'a> {
    pub summary: &'a PipelineSummary,
    pub conversion: &'a ConversionRates,
    pub velocity: &'a VelocityMetrics,
    pub forecast: &'a Forecast,
    pub risk: &'a RiskSignals,
    pub deal_flow: &'a DealFlow,
}
