use std::env;
use std::fs;
use std::path::Path;

use pipelens_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use super::{CommandResult, EXIT_CONFIG};

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let analytics = &config.analytics;
    let lines = [
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "analytics.lookback_days",
            &analytics.lookback_days.to_string(),
            source("analytics.lookback_days", &["PIPELENS_ANALYTICS_LOOKBACK_DAYS"]),
        ),
        render_line(
            "analytics.stall_threshold_days",
            &analytics.stall_threshold_days.to_string(),
            source("analytics.stall_threshold_days", &["PIPELENS_ANALYTICS_STALL_THRESHOLD_DAYS"]),
        ),
        render_line(
            "analytics.cycle_time_threshold_days",
            &analytics.cycle_time_threshold_days.to_string(),
            source(
                "analytics.cycle_time_threshold_days",
                &["PIPELENS_ANALYTICS_CYCLE_TIME_THRESHOLD_DAYS"],
            ),
        ),
        render_line(
            "analytics.win_rate_baseline",
            &analytics.win_rate_baseline.to_string(),
            source("analytics.win_rate_baseline", &["PIPELENS_ANALYTICS_WIN_RATE_BASELINE"]),
        ),
        render_line(
            "analytics.currency_symbol",
            &analytics.currency_symbol,
            source("analytics.currency_symbol", &["PIPELENS_ANALYTICS_CURRENCY_SYMBOL"]),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["PIPELENS_LOGGING_LEVEL", "PIPELENS_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format).to_lowercase(),
            source("logging.format", &["PIPELENS_LOGGING_FORMAT", "PIPELENS_LOG_FORMAT"]),
        ),
    ];

    CommandResult::output(lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

/// First env key that is set wins, so aliases are listed after the canonical key.
fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
