//! Pipeline entry point

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use super::types::{PipelineReport, PipelineSignals, ReportOptions};
use super::{
    analyze_velocity, build_forecast, calculate_conversion_rates, compose_experience,
    generate_recommendations, identify_risks, summarize_deals, track_deal_flow, AnalyticsResult,
    HealthScorer,
};
use crate::config::{AnalyticsConfig, MAX_LOOKBACK_DAYS};
use crate::domain::deal::Deal;
use crate::domain::snapshot::{normalize_deals, parse_reference_time};
use crate::errors::{DomainError, ValidationError};

/// Runs every analytics component over one snapshot and assembles the report.
#[derive(Debug, Clone, Default)]
pub struct PipelineAnalyzer {
    config: AnalyticsConfig,
}

impl PipelineAnalyzer {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Validates a loosely typed snapshot at the boundary, then analyzes it.
    /// Nothing is computed unless `deals` and `now` both validate.
    pub fn analyze_snapshot(
        &self,
        deals: &Value,
        now: &str,
        options: &ReportOptions,
    ) -> AnalyticsResult<PipelineReport> {
        let validated = parse_reference_time(now).and_then(|now| {
            let deals = normalize_deals(deals)?;
            Ok((deals, now))
        });

        let (deals, now) = match validated {
            Ok(validated) => validated,
            Err(error) => {
                warn!(
                    event_name = "analytics.snapshot.rejected",
                    error = %error,
                    "deal snapshot rejected at validation"
                );
                return Err(error.into());
            }
        };

        info!(
            event_name = "analytics.snapshot.normalized",
            deal_count = deals.len(),
            now = %now,
            "deal snapshot normalized"
        );
        self.analyze(&deals, now, options)
    }

    pub fn analyze(
        &self,
        deals: &[Deal],
        now: DateTime<Utc>,
        options: &ReportOptions,
    ) -> AnalyticsResult<PipelineReport> {
        let lookback_days = options.lookback_days.unwrap_or(self.config.lookback_days);
        if !(1..=MAX_LOOKBACK_DAYS).contains(&lookback_days) {
            return Err(ValidationError::InvalidLookback(lookback_days).into());
        }

        let summary = summarize_deals(deals, now);
        let partitioned =
            summary.open_deals + summary.on_hold_deals + summary.won_deals + summary.lost_deals;
        if partitioned != summary.total_deals {
            return Err(DomainError::InvariantViolation(format!(
                "status partition covers {partitioned} of {} deals",
                summary.total_deals
            )));
        }

        let conversion_rates = calculate_conversion_rates(deals, &summary);
        let velocity = analyze_velocity(deals, now);
        let forecast = build_forecast(deals);
        let risk = identify_risks(deals, now, self.config.stall_threshold_days);
        let deal_flow = track_deal_flow(deals, now, lookback_days);

        let signals = PipelineSignals {
            summary: &summary,
            conversion: &conversion_rates,
            velocity: &velocity,
            forecast: &forecast,
            risk: &risk,
            deal_flow: &deal_flow,
        };
        let health = HealthScorer::new(self.config.win_rate_baseline).score(&signals);
        let recommendations = generate_recommendations(deals, signals, &self.config);
        let experience = compose_experience(
            signals,
            &health,
            &recommendations,
            options.recommendations.as_deref(),
            &self.config.currency_symbol,
        );

        info!(
            event_name = "analytics.report.built",
            deal_count = summary.total_deals,
            lookback_days,
            health_score = health.score,
            health_status = health.status.as_str(),
            recommendation_count = recommendations.len(),
            "pipeline report built"
        );

        Ok(PipelineReport {
            generated_at: now,
            lookback_days,
            summary,
            conversion_rates,
            velocity,
            forecast,
            risk,
            deal_flow,
            health,
            recommendations,
            experience,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::PipelineAnalyzer;
    use crate::analytics::fixtures::{now, reference_pipeline};
    use crate::analytics::types::{HealthStatus, Priority, Recommendation, ReportOptions};
    use crate::config::AnalyticsConfig;
    use crate::errors::{DomainError, ValidationError};

    #[test]
    fn builds_reference_report() {
        let analyzer = PipelineAnalyzer::default();
        let report = analyzer
            .analyze(&reference_pipeline(), now(), &ReportOptions::default())
            .expect("report");

        assert_eq!(report.generated_at, now());
        assert_eq!(report.lookback_days, 30);
        assert_eq!(report.summary.total_deals, 4);
        assert_eq!(report.forecast.base_case, Decimal::from(50_500));
        assert_eq!(report.health.status, HealthStatus::AtRisk);
        assert_eq!(report.experience.health_status, report.health.status);
        assert_eq!(report.recommendations.len(), 5);
        assert_eq!(report.experience.next_best_actions[0], report.recommendations[0]);
    }

    #[test]
    fn options_override_configured_lookback() {
        let analyzer = PipelineAnalyzer::new(AnalyticsConfig {
            lookback_days: 90,
            ..AnalyticsConfig::default()
        });
        let report = analyzer
            .analyze(&reference_pipeline(), now(), &ReportOptions::default().with_lookback_days(7))
            .expect("report");

        assert_eq!(report.lookback_days, 7);
        assert_eq!(report.deal_flow.lookback_days, 7);
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let error = PipelineAnalyzer::default()
            .analyze(&reference_pipeline(), now(), &ReportOptions::default().with_lookback_days(0))
            .expect_err("zero lookback");

        assert_eq!(error, DomainError::Validation(ValidationError::InvalidLookback(0)));
    }

    #[test]
    fn lookback_beyond_a_year_is_rejected() {
        let analyzer = PipelineAnalyzer::default();

        for lookback_days in [366, 100_000_000, u32::MAX] {
            let error = analyzer
                .analyze_snapshot(
                    &json!([]),
                    "2024-01-01T00:00:00Z",
                    &ReportOptions::default().with_lookback_days(lookback_days),
                )
                .expect_err("oversized lookback");
            assert_eq!(
                error,
                DomainError::Validation(ValidationError::InvalidLookback(lookback_days))
            );
        }

        let full_year = ReportOptions::default().with_lookback_days(365);
        let report = analyzer
            .analyze(&reference_pipeline(), now(), &full_year)
            .expect("a full year is accepted");
        assert_eq!(report.deal_flow.lookback_days, 365);
    }

    #[test]
    fn supplied_recommendations_lead_next_best_actions() {
        let supplied = vec![Recommendation::new(
            "Call the Acme founder",
            "They asked for a revised scope.",
            Priority::Low,
            "manual",
        )];
        let report = PipelineAnalyzer::default()
            .analyze(
                &reference_pipeline(),
                now(),
                &ReportOptions::default().with_recommendations(supplied),
            )
            .expect("report");

        assert_eq!(report.experience.next_best_actions[0].title, "Call the Acme founder");
        assert_eq!(report.recommendations[0].title, "Re-engage stalled accounts");
    }

    #[test]
    fn snapshot_validation_fails_fast() {
        let analyzer = PipelineAnalyzer::default();

        let options = ReportOptions::default();

        let error = analyzer
            .analyze_snapshot(&json!({ "deals": [] }), "2024-01-01T00:00:00Z", &options)
            .expect_err("object deals");
        assert_eq!(error, DomainError::Validation(ValidationError::DealsNotAList));

        let error = analyzer
            .analyze_snapshot(&json!([]), "soon", &options)
            .expect_err("bad now");
        assert!(matches!(
            error,
            DomainError::Validation(ValidationError::InvalidReferenceTime { .. })
        ));
    }

    #[test]
    fn empty_snapshot_produces_a_zeroed_report() {
        let report = PipelineAnalyzer::default()
            .analyze_snapshot(&json!([]), "2024-01-01T00:00:00Z", &ReportOptions::default())
            .expect("report");

        assert_eq!(report.summary.total_deals, 0);
        assert_eq!(report.summary.win_rate, 0.0);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.experience.narrative.contains("Won $0"));
    }
}
