//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use std::fmt;

use hashspoof_core::SpoofError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all, including encoder or digest failures mid-search).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments or prefix).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (not a JPEG, undecodable image).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Search guardrail tripped before a match; retrying may succeed.
/// Maps to EX_TEMPFAIL from sysexits.h.
pub const SEARCH_EXHAUSTED: i32 = 75;

/// Help text listing the exit codes.
pub const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Match found and output written
  1   Encoder or digest failure during the search
  64  Invalid arguments or hex prefix
  65  Input is not a decodable JPEG
  66  Input file could not be read
  74  Output file could not be written
  75  Attempt or time budget exhausted without a match";

/// Malformed command-line input detected after clap parsing.
#[derive(Debug)]
pub struct UsageError(pub String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let code = if err.chain().any(|e| e.is::<UsageError>()) {
            USAGE_ERROR
        } else if let Some(spoof) = err.chain().find_map(|e| e.downcast_ref::<SpoofError>()) {
            Self::classify(spoof)
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }

    fn classify(err: &SpoofError) -> i32 {
        match err {
            SpoofError::InvalidPrefix { .. }
            | SpoofError::PrefixTooLong { .. }
            | SpoofError::InvalidConfig(_) => USAGE_ERROR,
            SpoofError::UnsupportedFormat(_)
            | SpoofError::Decode(_)
            | SpoofError::InvalidDimensions { .. } => DATA_ERROR,
            SpoofError::ReadInput { .. } => INPUT_ERROR,
            SpoofError::WriteOutput { .. } => IO_ERROR,
            SpoofError::EncodingFailure(_)
            | SpoofError::DigestFailure(_)
            | SpoofError::PerceptualHash(_) => GENERAL_ERROR,
        }
    }
}
