pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pipelens_core::config::{AppConfig, LoadOptions, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "pipelens",
    about = "Pipelens pipeline analytics CLI",
    long_about = "Run the pipeline analytics engine over a deal snapshot and inspect configuration.",
    after_help = "Examples:\n  pipelens report --input deals.json --now 2024-01-01T00:00:00Z\n  pipelens report --input snapshot.json --pretty\n  pipelens config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a pipelens.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Analyze a deal snapshot file and print the pipeline report as JSON")]
    Report {
        #[arg(long, help = "Snapshot file: a deal array or a {now, deals, ...} envelope")]
        input: PathBuf,
        #[arg(long, help = "Reference time (RFC 3339); overrides the snapshot's `now`")]
        now: Option<String>,
        #[arg(long, help = "Deal-flow lookback window in days")]
        lookback_days: Option<u32>,
        #[arg(long, help = "Pretty-print the report")]
        pretty: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    // Config errors are reported by the command itself; logging falls back to defaults.
    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Report { input, now, lookback_days, pretty } => commands::report::run(
            &commands::report::ReportArgs { input, now, lookback_days, pretty },
            options,
        ),
        Command::Config => commands::config::run(options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the command output.
pub fn init_logging(logging: &LoggingConfig) {
    use pipelens_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        eprintln!("logging already initialized: {error}");
    }
}
