//! Interactive setup prompts

use colored::Colorize;
use eyre::{Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::provider::{ProviderConfig, RateLimit};

/// Answers collected from the prompts
#[derive(Debug, Clone)]
pub struct InteractiveSetup {
    pub providers: Vec<ProviderConfig>,
    pub requests: u64,
}

/// Ask for the provider count, each provider's rate and the request count.
///
/// Rates that are not greater than 0 are replaced with `default_rate`.
pub fn run_prompts(default_rate: RateLimit) -> Result<InteractiveSetup> {
    print_welcome();

    let mut rl = DefaultEditor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;
    let mut read_line = |prompt: &str| match rl.readline(prompt) {
        Ok(line) => Ok(line),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Err(eyre!("Simulation stopped.")),
        Err(err) => Err(eyre!("Readline error: {}", err)),
    };

    collect_setup(&mut read_line, default_rate)
}

/// Drive the question sequence against any line source
fn collect_setup<R>(read_line: &mut R, default_rate: RateLimit) -> Result<InteractiveSetup>
where
    R: FnMut(&str) -> Result<String>,
{
    let count = ask(read_line, "Enter the number of providers: ", parse_count)?;
    // Grows as answers arrive; the count is untrusted input
    let mut providers = Vec::new();
    for i in 0..count {
        let name = format!("P{}", i + 1);
        let rate = ask(
            read_line,
            &format!("Enter rate limit (requests per second) for {}: ", name),
            parse_rate,
        )?;
        let rate_limit = match RateLimit::new(rate) {
            Ok(rate_limit) => rate_limit,
            Err(_) => {
                println!(
                    "{} Setting default rate limit to {} (1 request every {:.0} seconds).",
                    "Rate limit must be greater than 0.".yellow(),
                    default_rate.per_second(),
                    default_rate.interval().as_secs_f64()
                );
                default_rate
            }
        };
        providers.push(ProviderConfig::new(name, rate_limit));
    }

    let requests = ask(read_line, "Enter the number of requests to generate: ", parse_count)?;
    debug!(providers = providers.len(), requests, "collect_setup: setup complete");

    Ok(InteractiveSetup { providers, requests })
}

fn print_welcome() {
    println!("{}", "Welcome to the Request Rate Limiter Simulation!".bright_cyan().bold());
    println!("You will specify the number of providers and their respective rate limits.");
    println!("Rate limit is the number of requests a provider can process per second.");
    println!("For example:");
    println!("  - A rate limit of 0.2 means the provider processes 1 request every 5 seconds.");
    println!("  - A rate limit of 1 means the provider processes 1 request per second.");
}

/// Re-prompt until `parse` accepts the line
fn ask<T, R>(read_line: &mut R, prompt: &str, parse: fn(&str) -> Option<T>) -> Result<T>
where
    R: FnMut(&str) -> Result<String>,
{
    loop {
        let line = read_line(prompt)?;
        match parse(&line) {
            Some(value) => return Ok(value),
            None => println!("{} '{}'", "Invalid input:".red(), line.trim()),
        }
    }
}

fn parse_count(input: &str) -> Option<u64> {
    input.trim().parse().ok()
}

// Non-positive rates are accepted here and replaced by the caller
fn parse_rate(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|rate| !rate.is_nan())
}
