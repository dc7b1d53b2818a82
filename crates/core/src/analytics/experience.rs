use super::format::{format_currency, format_percent};
use super::types::{
    Experience, HealthScore, PipelineSignals, Recommendation, Spotlight, SpotlightTone,
};
use super::{COVERAGE_TARGET, MAX_NEXT_BEST_ACTIONS};

/// Dashboard-facing layer over the computed report.
///
/// `override_recommendations`, when given, replaces the computed list as the
/// source of next best actions. Either way the first source entry stays
/// first and the remainder is ordered by priority.
pub fn compose_experience(
    signals: PipelineSignals<'_>,
    health: &HealthScore,
    recommendations: &[Recommendation],
    override_recommendations: Option<&[Recommendation]>,
    currency_symbol: &str,
) -> Experience {
    let source = override_recommendations.unwrap_or(recommendations);

    Experience {
        health_status: health.status,
        spotlights: spotlights(&signals, currency_symbol),
        narrative: narrative(&signals, health, currency_symbol),
        next_best_actions: next_best_actions(source),
    }
}

fn spotlights(signals: &PipelineSignals<'_>, symbol: &str) -> Vec<Spotlight> {
    let summary = signals.summary;
    let forecast = signals.forecast;
    let risk = signals.risk;

    vec![
        Spotlight {
            id: "won-revenue".to_string(),
            label: "Won revenue".to_string(),
            value: format_currency(summary.won_pipeline_value, symbol),
            tone: if summary.won_pipeline_value.is_zero() {
                SpotlightTone::Neutral
            } else {
                SpotlightTone::Positive
            },
        },
        Spotlight {
            id: "weighted-pipeline".to_string(),
            label: "Weighted pipeline".to_string(),
            value: format_currency(summary.weighted_pipeline_value, symbol),
            tone: SpotlightTone::Neutral,
        },
        Spotlight {
            id: "forecast-base-case".to_string(),
            label: "Base case forecast".to_string(),
            value: format_currency(forecast.base_case, symbol),
            tone: if forecast.coverage_ratio >= COVERAGE_TARGET {
                SpotlightTone::Positive
            } else {
                SpotlightTone::Neutral
            },
        },
        Spotlight {
            id: "stalled-value".to_string(),
            label: "Stalled pipeline".to_string(),
            value: format_currency(risk.stalled_pipeline_value, symbol),
            tone: if risk.stalled_deal_count > 0 {
                SpotlightTone::Warning
            } else {
                SpotlightTone::Positive
            },
        },
    ]
}

/// Leads with won revenue in the configured symbol: `Won $25,000` under the default `$`.
fn narrative(signals: &PipelineSignals<'_>, health: &HealthScore, symbol: &str) -> String {
    let summary = signals.summary;
    let mut sentences = vec![
        format!(
            "Won {} across {} deal(s) at a {} win rate.",
            format_currency(summary.won_pipeline_value, symbol),
            summary.won_deals,
            format_percent(summary.win_rate)
        ),
        format!(
            "{} active deal(s) carry {} of open pipeline with a base case of {}.",
            summary.active_deals(),
            format_currency(summary.open_pipeline_value, symbol),
            format_currency(signals.forecast.base_case, symbol)
        ),
    ];

    if signals.risk.stalled_deal_count > 0 {
        sentences.push(format!(
            "{} stalled deal(s) hold {}.",
            signals.risk.stalled_deal_count,
            format_currency(signals.risk.stalled_pipeline_value, symbol)
        ));
    }
    sentences.push(health.summary.clone());

    sentences.join(" ")
}

fn next_best_actions(source: &[Recommendation]) -> Vec<Recommendation> {
    let Some((first, rest)) = source.split_first() else {
        return Vec::new();
    };

    let mut ranked = rest.to_vec();
    ranked.sort_by_key(|recommendation| recommendation.priority);

    std::iter::once(first.clone()).chain(ranked).take(MAX_NEXT_BEST_ACTIONS).collect()
}
