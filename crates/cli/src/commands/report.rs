use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pipelens_core::config::{AppConfig, LoadOptions};
use pipelens_core::{
    parse_envelope, ApplicationError, InterfaceError, PipelineAnalyzer, ReportOptions,
};
use serde_json::Value;
use tracing::info;

use super::{CommandResult, EXIT_CONFIG, EXIT_INPUT, EXIT_INTERNAL};

const COMMAND: &str = "report";

#[derive(Debug, Clone)]
pub struct ReportArgs {
    pub input: PathBuf,
    pub now: Option<String>,
    pub lookback_days: Option<u32>,
    pub pretty: bool,
}

pub fn run(args: &ReportArgs, options: LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let raw = match read_snapshot(&args.input) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(COMMAND, "input_read", format!("{error:#}"), EXIT_INPUT)
        }
    };
    let document = match parse_snapshot(&args.input, &raw) {
        Ok(document) => document,
        Err(error) => {
            return CommandResult::failure(COMMAND, "input_parse", format!("{error:#}"), EXIT_INPUT)
        }
    };

    let envelope = match parse_envelope(&document) {
        Ok(envelope) => envelope,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "input_validation",
                error.to_string(),
                EXIT_INPUT,
            )
        }
    };

    let Some(now) = args.now.clone().or(envelope.now) else {
        return CommandResult::failure(
            COMMAND,
            "input_validation",
            "reference time is missing: pass --now or set `now` in the snapshot",
            EXIT_INPUT,
        );
    };

    let report_options = ReportOptions {
        lookback_days: args.lookback_days.or(envelope.lookback_days),
        recommendations: envelope.recommendations,
    };

    info!(
        event_name = "cli.report.started",
        input = %args.input.display(),
        now = %now,
        "running pipeline report"
    );

    let analyzer = PipelineAnalyzer::new(config.analytics);
    let report = match analyzer.analyze_snapshot(&envelope.deals, &now, &report_options) {
        Ok(report) => report,
        Err(error) => {
            let correlation_id = format!("{COMMAND}:{}", args.input.display());
            return match ApplicationError::from(error).into_interface(correlation_id) {
                InterfaceError::BadRequest { message, .. } => {
                    CommandResult::failure(COMMAND, "input_validation", message, EXIT_INPUT)
                }
                InterfaceError::Internal { message, .. } => {
                    CommandResult::failure(COMMAND, "internal", message, EXIT_INTERNAL)
                }
            };
        }
    };

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match rendered {
        Ok(rendered) => CommandResult::output(rendered),
        Err(error) => CommandResult::failure(
            COMMAND,
            "serialization",
            format!("report serialization failed: {error}"),
            EXIT_INTERNAL,
        ),
    }
}

fn read_snapshot(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot `{}`", path.display()))
}

fn parse_snapshot(path: &Path, raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .with_context(|| format!("snapshot `{}` is not valid JSON", path.display()))
}
