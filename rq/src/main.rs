//! rq - request rate limiter simulation
//!
//! CLI entry point: configures providers, generates requests and prints one
//! line per processed request.

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info, warn};

use ratequeue::cli::{Cli, Command};
use ratequeue::config::Config;
use ratequeue::prompt::run_prompts;
use ratequeue::{DispatchConfig, DispatchSummary, Dispatcher, ProcessedRecord, ProviderSpec};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // Records go to stdout; logs stay on stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre!("Failed to install subscriber: {}", e))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Run {
            providers,
            requests,
            seed,
            backoff_ms,
            json,
        }) => {
            let mut config = config;
            if seed.is_some() {
                config.seed = seed;
            }
            if let Some(backoff_ms) = backoff_ms {
                config.backoff_ms = backoff_ms;
            }
            cmd_run(&config, &providers, requests.unwrap_or(config.requests), json).await
        }
        Some(Command::Interactive) | None => cmd_interactive(&config).await,
        Some(Command::Config) => cmd_config(&config),
    }
}

/// Run with providers from the command line, falling back to the config file
async fn cmd_run(config: &Config, providers: &[ProviderSpec], requests: u64, json: bool) -> Result<()> {
    debug!(providers = providers.len(), requests, json, "cmd_run: called");
    let specs = if providers.is_empty() {
        &config.providers[..]
    } else {
        providers
    };

    for spec in specs.iter().filter(|spec| spec.validate().is_err()) {
        warn!(provider = %spec.name, rate_limit = spec.rate_limit, "cmd_run: invalid rate limit, using default");
        println!(
            "{} Rate limit for {} must be greater than 0. Using default rate limit {}.",
            "!".yellow(),
            spec.name,
            config.default_rate()
        );
    }

    simulate(config.dispatch_config(specs), requests, json).await
}

/// Prompt for the setup the way the original terminal program did
async fn cmd_interactive(config: &Config) -> Result<()> {
    debug!("cmd_interactive: called");
    let default_rate = config.default_rate();
    let setup = tokio::task::spawn_blocking(move || run_prompts(default_rate))
        .await
        .context("Prompt task failed")??;

    let dispatch = DispatchConfig {
        providers: setup.providers,
        ..config.dispatch_config(&[])
    };
    simulate(dispatch, setup.requests, false).await
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", config.to_yaml()?);
    Ok(())
}

async fn simulate(dispatch: DispatchConfig, requests: u64, json: bool) -> Result<()> {
    let dispatcher = Dispatcher::new(dispatch).context("Invalid simulation setup")?;
    info!(requests, "Starting simulation");

    // Dropping the run future drops the provider handles, which stops them
    let summary = tokio::select! {
        summary = dispatcher.run(requests, |record| print_record(record, json)) => {
            summary.context("Simulation failed")?
        }
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("Failed to listen for Ctrl-C")?;
            info!("Simulation interrupted");
            println!("\n{}", "Simulation stopped.".yellow());
            return Ok(());
        }
    };

    if !json {
        print_summary(&summary);
    }
    Ok(())
}

fn print_record(record: &ProcessedRecord, json: bool) {
    if json {
        match serde_json::to_string(record) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "print_record: failed to serialize record"),
        }
    } else {
        println!("{}", record);
    }
}

fn print_summary(summary: &DispatchSummary) {
    println!();
    println!("{} Processed {} requests", "✓".green(), summary.records.len());
    for report in &summary.reports {
        println!("  {}: {}", report.name.cyan(), report.processed);
    }
}
