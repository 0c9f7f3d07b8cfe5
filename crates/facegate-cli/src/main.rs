use anyhow::{anyhow, bail, Context, Result};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use facegate_core::pipeline;
use facegate_core::{ComparisonResult, Descriptor, EuclideanMatcher, MatchOutcome, Matcher, ResNetEncoder, ScrfdDetector};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(
    name = "facegate",
    version,
    about = "Face descriptor extraction and comparison",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

// Arguments are optional so that missing ones are reported as JSON errors
// rather than clap usage text. Surplus trailing arguments are ignored.
#[derive(Subcommand)]
enum Commands {
    /// Extract the descriptor of the single face in an image
    Encode {
        /// Image file to read
        #[arg(allow_hyphen_values = true)]
        image_path: Option<PathBuf>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
        _rest: Vec<String>,
    },
    /// Find the known descriptor closest to an unknown one
    Compare {
        /// JSON array of known descriptors
        #[arg(allow_hyphen_values = true)]
        known: Option<String>,
        /// JSON descriptor to look up
        #[arg(allow_hyphen_values = true)]
        unknown: Option<String>,
        /// Maximum distance that counts as a match (default 0.3)
        #[arg(allow_hyphen_values = true)]
        tolerance: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
        _rest: Vec<String>,
    },
}

fn main() -> ExitCode {
    // stdout carries only the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage_exit(err),
    };

    let config = Config::from_env();
    let result = match cli.command {
        None => Err(anyhow!("Missing action parameter")),
        Some(Commands::Encode { image_path, .. }) => run_encode(&config, image_path),
        Some(Commands::Compare { known, unknown, tolerance, .. }) => run_compare(&config, known, unknown, tolerance),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "invocation failed");
            report_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Print `{"error": message}` on stderr.
fn report_error(message: &str) {
    eprintln!("{}", json!({ "error": message }));
}

/// Map clap parse failures onto the JSON error protocol.
fn usage_exit(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        // Subcommands swallow every trailing token, so an unknown argument
        // can only be a flag in the action position.
        ErrorKind::InvalidSubcommand | ErrorKind::UnknownArgument => {
            let action = [ContextKind::InvalidSubcommand, ContextKind::InvalidArg]
                .into_iter()
                .find_map(|kind| match err.get(kind) {
                    Some(ContextValue::String(s)) => Some(s.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            report_error(&format!("Unknown action: {action}"));
        }
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            report_error("Missing action parameter");
        }
        _ => {
            let rendered = err.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            report_error(first.trim_start_matches("error: "));
        }
    }
    ExitCode::FAILURE
}

fn run_encode(config: &Config, image_path: Option<PathBuf>) -> Result<()> {
    let image_path = image_path.ok_or_else(|| anyhow!("Missing image path parameter"))?;

    let mut detector = ScrfdDetector::load(&config.detector_model_path())
        .map_err(|e| anyhow!("Error encoding face: {e}"))?;
    let mut encoder = ResNetEncoder::load(&config.encoder_model_path(), config.encoder)
        .map_err(|e| anyhow!("Error encoding face: {e}"))?;

    let descriptor = pipeline::encode_file(&image_path, &mut detector, &mut encoder, &config.policy)?;
    tracing::info!(path = %image_path.display(), dim = descriptor.len(), "face encoded");

    println!("{}", serde_json::to_string(&descriptor)?);
    Ok(())
}

fn run_compare(
    config: &Config,
    known: Option<String>,
    unknown: Option<String>,
    tolerance: Option<String>,
) -> Result<()> {
    let (Some(known), Some(unknown)) = (known, unknown) else {
        bail!("Missing parameters for comparison");
    };

    let tolerance = match tolerance {
        Some(t) => t
            .trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("Comparison error: could not convert string to float: '{t}'"))?,
        None => config.tolerance,
    };

    let known: Value = serde_json::from_str(&known).map_err(|e| anyhow!("Invalid JSON input: {e}"))?;
    let unknown: Value = serde_json::from_str(&unknown).map_err(|e| anyhow!("Invalid JSON input: {e}"))?;

    // A payload that parses but cannot be matched still yields a result.
    let outcome = match_payloads(known, unknown, tolerance).unwrap_or_else(|e| {
        report_error(&format!("Error comparing faces: {e:#}"));
        MatchOutcome::NONE
    });

    println!("{}", serde_json::to_string(&ComparisonResult::from(outcome))?);
    Ok(())
}

fn match_payloads(known: Value, unknown: Value, tolerance: f64) -> Result<MatchOutcome> {
    // nothing to match against, whatever the candidate looks like
    if known.is_null() || known.as_array().is_some_and(Vec::is_empty) {
        return Ok(MatchOutcome::NONE);
    }

    let known: Option<Vec<Descriptor>> =
        serde_json::from_value(known).context("known encodings must be an array of number arrays")?;
    let unknown: Option<Descriptor> =
        serde_json::from_value(unknown).context("unknown encoding must be an array of numbers")?;

    Ok(EuclideanMatcher.compare(&known.unwrap_or_default(), unknown.as_ref(), tolerance)?)
}
