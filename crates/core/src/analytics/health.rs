//! Composite pipeline health scoring

use super::types::{HealthDriver, HealthScore, HealthStatus, PipelineSignals};
use super::{ratio, round_days, CRITICAL_SCORE, HEALTHY_SCORE};

/// A normalized component below this is reported as limiting.
const LIMITING_COMPONENT: f64 = 0.6;

/// Blend weights for the health components. They sum to 1.0 so the score
/// spans 0-100.
///
/// Adding a won deal never lowers any component, so it never lowers the score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthWeights {
    /// Weight for closed-deal win rate (default: 0.35)
    pub win_rate: f64,
    /// Weight for forecast confidence, the realizable share of the pipeline (default: 0.25)
    pub confidence: f64,
    /// Weight for the share of active deals that are not stalled (default: 0.25)
    pub stalled: f64,
    /// Weight for period-over-period growth (default: 0.15)
    pub growth: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        super::DEFAULT_HEALTH_WEIGHTS
    }
}

/// Each component normalized to 0..=1, where higher is healthier.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Components {
    win_rate: f64,
    confidence: f64,
    stalled: f64,
    growth: f64,
}

impl Components {
    fn from_signals(signals: &PipelineSignals<'_>, stalled_ratio: f64) -> Self {
        Self {
            win_rate: signals.summary.win_rate.clamp(0.0, 1.0),
            confidence: signals.forecast.confidence_ratio.clamp(0.0, 1.0),
            stalled: (1.0 - stalled_ratio).clamp(0.0, 1.0),
            growth: ((signals.deal_flow.growth_index + 1.0) / 2.0).clamp(0.0, 1.0),
        }
    }
}

/// Blends previously computed signals into a health score.
#[derive(Debug, Clone)]
pub struct HealthScorer {
    weights: HealthWeights,
    win_rate_baseline: f64,
}

impl HealthScorer {
    pub fn new(win_rate_baseline: f64) -> Self {
        Self { weights: HealthWeights::default(), win_rate_baseline }
    }

    pub fn with_weights(weights: HealthWeights, win_rate_baseline: f64) -> Self {
        Self { weights, win_rate_baseline }
    }

    pub fn score(&self, signals: &PipelineSignals<'_>) -> HealthScore {
        let stalled_ratio = stalled_ratio(signals);
        let components = Components::from_signals(signals, stalled_ratio);

        let weighted = components.win_rate * self.weights.win_rate
            + components.confidence * self.weights.confidence
            + components.stalled * self.weights.stalled
            + components.growth * self.weights.growth;
        let score = round_days((weighted * 100.0).clamp(0.0, 100.0));

        let status = self.status(score, signals);
        let drivers = self.drivers(signals, &components, stalled_ratio);
        let summary = summarize(score, status, &drivers);

        HealthScore { score, status, summary, drivers }
    }

    fn status(&self, score: f64, signals: &PipelineSignals<'_>) -> HealthStatus {
        let summary = signals.summary;
        let risk_present =
            signals.risk.stalled_deal_count > 0 || signals.risk.overdue_follow_up_count > 0;
        let win_rate_lagging =
            summary.closed_deals() > 0 && summary.win_rate < self.win_rate_baseline;

        if score < CRITICAL_SCORE {
            HealthStatus::Critical
        } else if score < HEALTHY_SCORE || (win_rate_lagging && risk_present) {
            HealthStatus::AtRisk
        } else {
            HealthStatus::Healthy
        }
    }

    /// All four drivers, largest shortfall first. Ties keep declaration order.
    fn drivers(
        &self,
        signals: &PipelineSignals<'_>,
        components: &Components,
        stalled_ratio: f64,
    ) -> Vec<HealthDriver> {
        let weights = self.weights;
        let entries = [
            (
                "winRate",
                signals.summary.win_rate,
                components.win_rate,
                weights.win_rate,
                signals.summary.win_rate < self.win_rate_baseline,
            ),
            (
                "forecastConfidence",
                signals.forecast.confidence_ratio,
                components.confidence,
                weights.confidence,
                components.confidence < LIMITING_COMPONENT,
            ),
            (
                "stalledRatio",
                stalled_ratio,
                components.stalled,
                weights.stalled,
                components.stalled < LIMITING_COMPONENT,
            ),
            (
                "growthIndex",
                signals.deal_flow.growth_index,
                components.growth,
                weights.growth,
                components.growth < LIMITING_COMPONENT,
            ),
        ];

        let mut ranked: Vec<(f64, HealthDriver)> = entries
            .into_iter()
            .map(|(metric, value, component, weight, limiting)| {
                let shortfall = weight * (1.0 - component);
                let driver = HealthDriver {
                    metric: metric.to_string(),
                    value,
                    contribution: round_days(component * weight * 100.0),
                    limiting,
                };
                (shortfall, driver)
            })
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.into_iter().map(|(_, driver)| driver).collect()
    }
}

/// Scores health with [`DEFAULT_HEALTH_WEIGHTS`](super::DEFAULT_HEALTH_WEIGHTS).
pub fn score_health(signals: PipelineSignals<'_>, win_rate_baseline: f64) -> HealthScore {
    HealthScorer::new(win_rate_baseline).score(&signals)
}

fn stalled_ratio(signals: &PipelineSignals<'_>) -> f64 {
    ratio(signals.risk.stalled_deal_count as f64, signals.summary.active_deals() as f64)
}

fn summarize(score: f64, status: HealthStatus, drivers: &[HealthDriver]) -> String {
    let limiting: Vec<&str> = drivers
        .iter()
        .filter(|driver| driver.limiting)
        .map(|driver| driver_label(&driver.metric))
        .collect();

    if limiting.is_empty() {
        format!(
            "Pipeline health is {} ({score:.0}/100) across win rate, confidence, risk, and growth.",
            status.label()
        )
    } else {
        format!(
            "Pipeline health is {} ({score:.0}/100), held back by {}.",
            status.label(),
            join_labels(&limiting)
        )
    }
}

fn driver_label(metric: &str) -> &'static str {
    match metric {
        "winRate" => "win rate",
        "forecastConfidence" => "forecast confidence",
        "stalledRatio" => "stalled deals",
        _ => "growth",
    }
}

fn join_labels(labels: &[&str]) -> String {
    match labels {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
