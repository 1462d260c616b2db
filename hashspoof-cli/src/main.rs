//! Hashspoof CLI - grind a JPEG's digest toward a hex prefix.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use hashspoof_core::config::DEFAULT_MAX_ATTEMPTS;
use hashspoof_core::{DigestAlgorithm, SearchConfig, DEFAULT_JPEG_QUALITY};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use commands::spoof::SpoofArgs;
use exit_codes::{ExitCode, EXIT_CODES_HELP};

#[derive(Parser)]
#[command(name = "hashspoof")]
#[command(
    author,
    version,
    about = "Perturb a JPEG imperceptibly until its digest starts with a hex prefix",
    long_about = None,
    after_help = EXIT_CODES_HELP
)]
struct Cli {
    /// Target digest prefix with a 0x marker (e.g. 0x24)
    #[arg(value_name = "HEX_PREFIX")]
    hex_prefix: String,

    /// JPEG image to perturb
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the altered JPEG
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Give up after this many attempts (0 = unbounded)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u64,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Number of parallel search workers
    #[arg(short = 'j', long, value_name = "N", default_value_t = 1)]
    workers: usize,

    /// Seed for a reproducible perturbation walk
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// JPEG quality used when re-encoding (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Digest algorithm
    #[arg(short, long, value_enum, default_value_t = Algorithm::Sha512)]
    algorithm: Algorithm,

    /// Output format for the final report
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print only the matching digest
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Digest algorithm selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Sha512,
    #[value(name = "sha3-512")]
    Sha3_512,
}

impl From<Algorithm> for DigestAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Sha512 => DigestAlgorithm::Sha512,
            Algorithm::Sha3_512 => DigestAlgorithm::Sha3_512,
        }
    }
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn into_args(self) -> SpoofArgs {
        let config = SearchConfig::default()
            .with_max_attempts((self.max_attempts > 0).then_some(self.max_attempts))
            .with_time_budget(self.timeout.map(Duration::from_secs))
            .with_workers(self.workers)
            .with_seed(self.seed);

        SpoofArgs {
            hex_prefix: self.hex_prefix,
            input: self.input,
            output: self.output,
            config,
            quality: self.quality,
            algorithm: self.algorithm.into(),
            format: self.format,
            quiet: self.quiet,
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "hashspoof=debug,hashspoof_core=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> std::process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not errors
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            return std::process::ExitCode::from(code as u8);
        }
    };

    init_tracing(cli.verbose, cli.quiet);

    let exit = match commands::spoof::execute(cli.into_args()) {
        Ok(exit) => exit,
        Err(err) => {
            let exit = ExitCode::from_anyhow(&err);
            debug!(code = exit.code, error = ?err, "Command failed");
            exit
        }
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::ExitCode::from(exit.code as u8)
}
