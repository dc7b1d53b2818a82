use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["pipelens.toml", "config/pipelens.toml"];

/// Longest deal-flow lookback window, in days.
pub const MAX_LOOKBACK_DAYS: u32 = 365;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub analytics: AnalyticsConfig,
    pub logging: LoggingConfig,
}

/// Tunables handed to the analytics engine. The engine never reads the
/// environment itself; callers load this once and pass it in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub lookback_days: u32,
    pub stall_threshold_days: u32,
    pub cycle_time_threshold_days: u32,
    pub win_rate_baseline: f64,
    pub currency_symbol: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub lookback_days: Option<u32>,
    pub stall_threshold_days: Option<u32>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            stall_threshold_days: 30,
            cycle_time_threshold_days: 45,
            win_rate_baseline: 0.6,
            currency_symbol: "$".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analytics: AnalyticsConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(analytics) = patch.analytics {
            if let Some(lookback_days) = analytics.lookback_days {
                self.analytics.lookback_days = lookback_days;
            }
            if let Some(stall_threshold_days) = analytics.stall_threshold_days {
                self.analytics.stall_threshold_days = stall_threshold_days;
            }
            if let Some(cycle_time_threshold_days) = analytics.cycle_time_threshold_days {
                self.analytics.cycle_time_threshold_days = cycle_time_threshold_days;
            }
            if let Some(win_rate_baseline) = analytics.win_rate_baseline {
                self.analytics.win_rate_baseline = win_rate_baseline;
            }
            if let Some(currency_symbol) = analytics.currency_symbol {
                self.analytics.currency_symbol = currency_symbol;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PIPELENS_ANALYTICS_LOOKBACK_DAYS") {
            self.analytics.lookback_days = parse_u32("PIPELENS_ANALYTICS_LOOKBACK_DAYS", &value)?;
        }
        if let Some(value) = read_env("PIPELENS_ANALYTICS_STALL_THRESHOLD_DAYS") {
            self.analytics.stall_threshold_days =
                parse_u32("PIPELENS_ANALYTICS_STALL_THRESHOLD_DAYS", &value)?;
        }
        if let Some(value) = read_env("PIPELENS_ANALYTICS_CYCLE_TIME_THRESHOLD_DAYS") {
            self.analytics.cycle_time_threshold_days =
                parse_u32("PIPELENS_ANALYTICS_CYCLE_TIME_THRESHOLD_DAYS", &value)?;
        }
        if let Some(value) = read_env("PIPELENS_ANALYTICS_WIN_RATE_BASELINE") {
            self.analytics.win_rate_baseline =
                parse_f64("PIPELENS_ANALYTICS_WIN_RATE_BASELINE", &value)?;
        }
        if let Some(value) = read_env("PIPELENS_ANALYTICS_CURRENCY_SYMBOL") {
            self.analytics.currency_symbol = value;
        }

        let log_level =
            read_env("PIPELENS_LOGGING_LEVEL").or_else(|| read_env("PIPELENS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PIPELENS_LOGGING_FORMAT").or_else(|| read_env("PIPELENS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(lookback_days) = overrides.lookback_days {
            self.analytics.lookback_days = lookback_days;
        }
        if let Some(stall_threshold_days) = overrides.stall_threshold_days {
            self.analytics.stall_threshold_days = stall_threshold_days;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_analytics(&self.analytics)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_analytics(analytics: &AnalyticsConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_LOOKBACK_DAYS).contains(&analytics.lookback_days) {
        return Err(ConfigError::Validation(
            "analytics.lookback_days must be in range 1..=365".to_string(),
        ));
    }

    if analytics.stall_threshold_days == 0 || analytics.stall_threshold_days > 365 {
        return Err(ConfigError::Validation(
            "analytics.stall_threshold_days must be in range 1..=365".to_string(),
        ));
    }

    if analytics.cycle_time_threshold_days == 0 || analytics.cycle_time_threshold_days > 730 {
        return Err(ConfigError::Validation(
            "analytics.cycle_time_threshold_days must be in range 1..=730".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&analytics.win_rate_baseline) {
        return Err(ConfigError::Validation(
            "analytics.win_rate_baseline must be a fraction in range 0.0..=1.0".to_string(),
        ));
    }

    if analytics.currency_symbol.trim().is_empty() {
        return Err(ConfigError::Validation(
            "analytics.currency_symbol must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    analytics: Option<AnalyticsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyticsPatch {
    lookback_days: Option<u32>,
    stall_threshold_days: Option<u32>,
    cycle_time_threshold_days: Option<u32>,
    win_rate_baseline: Option<f64>,
    currency_symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const PIPELENS_VARS: [&str; 9] = [
        "PIPELENS_ANALYTICS_LOOKBACK_DAYS",
        "PIPELENS_ANALYTICS_STALL_THRESHOLD_DAYS",
        "PIPELENS_ANALYTICS_CYCLE_TIME_THRESHOLD_DAYS",
        "PIPELENS_ANALYTICS_WIN_RATE_BASELINE",
        "PIPELENS_ANALYTICS_CURRENCY_SYMBOL",
        "PIPELENS_LOGGING_LEVEL",
        "PIPELENS_LOG_LEVEL",
        "PIPELENS_LOGGING_FORMAT",
        "PIPELENS_LOG_FORMAT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_dashboard_contract() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PIPELENS_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.analytics.lookback_days == 30, "default lookback should be 30 days")?;
        ensure(config.analytics.stall_threshold_days == 30, "default stall threshold is 30 days")?;
        ensure(config.analytics.currency_symbol == "$", "default currency symbol is `$`")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default format is compact")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PIPELENS_VARS);
        env::set_var("TEST_PIPELENS_SYMBOL", "€");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pipelens.toml");
            fs::write(
                &path,
                r#"
[analytics]
lookback_days = 14
currency_symbol = "${TEST_PIPELENS_SYMBOL}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.analytics.lookback_days == 14, "lookback should be read from file")?;
            ensure(
                config.analytics.currency_symbol == "€",
                "currency symbol should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_PIPELENS_SYMBOL"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PIPELENS_VARS);
        env::set_var("PIPELENS_LOG_LEVEL", "warn");
        env::set_var("PIPELENS_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&PIPELENS_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PIPELENS_VARS);
        env::set_var("PIPELENS_ANALYTICS_STALL_THRESHOLD_DAYS", "21");
        env::set_var("PIPELENS_ANALYTICS_LOOKBACK_DAYS", "60");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pipelens.toml");
            fs::write(
                &path,
                r#"
[analytics]
lookback_days = 14
stall_threshold_days = 10
cycle_time_threshold_days = 20

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    lookback_days: Some(7),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.analytics.lookback_days == 7, "override lookback should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.analytics.stall_threshold_days == 21,
                "env stall threshold should win over file and defaults",
            )?;
            ensure(
                config.analytics.cycle_time_threshold_days == 20,
                "file cycle threshold should win over defaults",
            )
        })();

        clear_vars(&PIPELENS_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PIPELENS_VARS);
        env::set_var("PIPELENS_ANALYTICS_WIN_RATE_BASELINE", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("analytics.win_rate_baseline")
            );
            ensure(has_message, "validation failure should mention analytics.win_rate_baseline")
        })();

        clear_vars(&PIPELENS_VARS);
        result
    }

    #[test]
    fn malformed_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PIPELENS_VARS);
        env::set_var("PIPELENS_ANALYTICS_LOOKBACK_DAYS", "a month");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "PIPELENS_ANALYTICS_LOOKBACK_DAYS",
                "invalid override should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid env override error".to_string()),
        };

        clear_vars(&PIPELENS_VARS);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PIPELENS_VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(ref missing)) if *missing == path),
            "missing required file should be reported with its path",
        )
    }
}
