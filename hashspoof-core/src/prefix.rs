//! Target prefix validation and matching.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpoofError};

/// Required leading characters of a digest, in lowercase hex.
///
/// The empty prefix is valid and matches every digest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetPrefix(String);

impl TargetPrefix {
    /// Validate `prefix`, accepting only `0-9a-f`.
    pub fn parse(prefix: &str) -> Result<Self> {
        if let Some((position, found)) = prefix
            .char_indices()
            .find(|(_, c)| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(SpoofError::InvalidPrefix { found, position });
        }
        Ok(Self(prefix.to_owned()))
    }

    /// Fail when the prefix cannot fit in a digest of `max` hex characters.
    pub fn check_len(&self, max: usize) -> Result<()> {
        if self.0.len() > max {
            return Err(SpoofError::PrefixTooLong {
                len: self.0.len(),
                max,
            });
        }
        Ok(())
    }

    /// Whether `digest` begins with this prefix.
    pub fn matches(&self, digest: &str) -> bool {
        digest.starts_with(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mean number of attempts for a uniformly distributed digest: `16^len`.
    pub fn expected_attempts(&self) -> f64 {
        16f64.powi(self.0.len() as i32)
    }
}

impl fmt::Display for TargetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TargetPrefix {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TargetPrefix {
    type Error = SpoofError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TargetPrefix> for String {
    fn from(prefix: TargetPrefix) -> Self {
        prefix.0
    }
}
