//! Spoof command implementation.
//!
//! Validates the arguments, decodes the input JPEG, runs the digest search and
//! writes the matching bytes to the output path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use hashspoof_core::{
    decode, is_lossy_path, perceptual_distance, read_image, write_image, DigestAlgorithm,
    ExhaustReason, JpegEncoder, ProgressSink, SearchConfig, SearchOutcome, Searcher,
    SpoofError, TargetPrefix, TracingProgress, SIMILARITY_THRESHOLD,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::exit_codes::{self, ExitCode};
use crate::utils::{format_count, format_duration, strip_hex_marker};
use crate::OutputFormat;

/// Arguments for one spoof run.
pub struct SpoofArgs {
    pub hex_prefix: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: SearchConfig,
    pub quality: u8,
    pub algorithm: DigestAlgorithm,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Machine-readable summary printed with `--format json`.
#[derive(Debug, Serialize)]
struct SpoofReport<'a> {
    status: &'static str,
    prefix: &'a str,
    algorithm: DigestAlgorithm,
    attempts: u64,
    elapsed_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    perceptual_distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exhausted: Option<ExhaustReason>,
}

/// Prints `Attempt N:: Hash H` lines to stdout.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn observe(&self, attempts: u64, digest: &str) {
        println!("Attempt {attempts}:: Hash {digest}");
    }
}

/// Execute the spoof command.
pub fn execute(args: SpoofArgs) -> Result<ExitCode> {
    // Validate everything cheap before touching the filesystem
    let prefix = TargetPrefix::parse(strip_hex_marker(&args.hex_prefix)?)
        .context("Invalid hex prefix")?;

    if !is_lossy_path(&args.input) {
        return Err(SpoofError::UnsupportedFormat(
            "Image must be in JPEG format (.jpg or .jpeg)".into(),
        ))
        .context(format!("Rejected input: {}", args.input.display()));
    }

    let content = read_image(&args.input)?;
    info!(path = %args.input.display(), bytes = content.len(), "Read file");

    let raster = decode(&content).context("Failed to decode input image")?;
    let original = raster.clone();
    debug!(
        width = raster.width(),
        height = raster.height(),
        quality = args.quality,
        algorithm = %args.algorithm,
        "Prepared raster"
    );

    let text = args.format == OutputFormat::Text;
    if text && !args.quiet {
        println!(
            "{} {} (expected ~{} attempts)",
            "Searching for prefix".dimmed(),
            prefix.to_string().bold(),
            format_count(prefix.expected_attempts())
        );
    }

    let progress: &dyn ProgressSink = if text && !args.quiet {
        &ConsoleProgress
    } else {
        &TracingProgress
    };

    let encoder = JpegEncoder::new(args.quality);
    let searcher = Searcher::new(args.config);
    let outcome = searcher.search(raster, prefix.as_str(), &encoder, &args.algorithm, progress)?;

    match outcome {
        SearchOutcome::Found {
            raster,
            digest,
            encoded,
            attempts,
            elapsed,
        } => {
            write_image(&args.output, &encoded)?;
            info!(path = %args.output.display(), attempts, "Altered image saved");

            let distance = perceptual_distance(&original, &raster)
                .context("Failed to compare output with input")?;
            if distance > SIMILARITY_THRESHOLD {
                warn!(distance, "Output differs perceptually from the input");
            }

            let report = SpoofReport {
                status: "found",
                prefix: prefix.as_str(),
                algorithm: args.algorithm,
                attempts,
                elapsed_ms: elapsed.as_millis(),
                digest: Some(&digest),
                output: Some(args.output.display().to_string()),
                perceptual_distance: Some(distance),
                exhausted: None,
            };
            match args.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => {
                    print_found(&args.output, &digest, attempts, elapsed, distance, args.quiet)
                }
            }
            Ok(ExitCode::success())
        }
        SearchOutcome::Exhausted {
            attempts,
            reason,
            elapsed,
            ..
        } => {
            let report = SpoofReport {
                status: "exhausted",
                prefix: prefix.as_str(),
                algorithm: args.algorithm,
                attempts,
                elapsed_ms: elapsed.as_millis(),
                digest: None,
                output: None,
                perceptual_distance: None,
                exhausted: Some(reason),
            };
            if args.format == OutputFormat::Json {
                print_json(&report)?;
            }
            Ok(ExitCode::error(
                exit_codes::SEARCH_EXHAUSTED,
                format!("No matching digest after {attempts} attempts: {reason}; nothing written"),
            ))
        }
    }
}

fn print_json(report: &SpoofReport<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}

fn print_found(
    output: &Path,
    digest: &str,
    attempts: u64,
    elapsed: Duration,
    distance: u32,
    quiet: bool,
) {
    if quiet {
        println!("{digest}");
        return;
    }

    println!();
    println!("Altered image saved with hash: {digest}");
    println!();
    println!("   {} {}", "Output:".dimmed(), output.display());
    println!("   {} {}", "Attempts:".dimmed(), attempts);
    println!("   {} {}", "Elapsed:".dimmed(), format_duration(elapsed));
    println!(
        "   {} {}/64 bits",
        "Perceptual distance:".dimmed(),
        distance
    );
    println!("{}", "Match found".green().bold());
}
