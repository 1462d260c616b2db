//! Search configuration.
//!
//! Built in code by the caller; there are no configuration files or
//! environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpoofError};

/// Attempts between progress observations.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Default attempt guardrail.
pub const DEFAULT_MAX_ATTEMPTS: u64 = 10_000_000;

/// Consecutive repeated digests before the perturbation is escalated.
pub const DEFAULT_STALL_THRESHOLD: u32 = 8;

/// Upper bound on pixels perturbed per attempt after escalation.
pub const DEFAULT_MAX_PERTURBATION: u32 = 64;

/// Tunables for [`Searcher`](crate::search::Searcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Stop with `Exhausted` after this many attempts (`None` = unbounded)
    pub max_attempts: Option<u64>,
    /// Stop with `Exhausted` after this much wall-clock time
    pub time_budget: Option<Duration>,
    /// Report progress every N attempts (0 disables)
    pub progress_interval: u64,
    /// Repeated digests tolerated before escalating
    pub stall_threshold: u32,
    /// Cap on pixels touched per attempt
    pub max_perturbation: u32,
    /// Independent search workers (1 = sequential)
    pub workers: usize,
    /// Seed for reproducible walks; worker `i` uses `seed + i`
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            time_budget: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            max_perturbation: DEFAULT_MAX_PERTURBATION,
            workers: 1,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn with_max_attempts(mut self, max_attempts: Option<u64>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_time_budget(mut self, time_budget: Option<Duration>) -> Self {
        self.time_budget = time_budget;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_stall_threshold(mut self, threshold: u32) -> Self {
        self.stall_threshold = threshold;
        self
    }

    pub fn with_max_perturbation(mut self, max: u32) -> Self {
        self.max_perturbation = max;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SpoofError::InvalidConfig(
                "workers must be at least 1".into(),
            ));
        }
        if self.max_perturbation == 0 {
            return Err(SpoofError::InvalidConfig(
                "max_perturbation must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Seed for worker `index`, if the walk is reproducible.
    pub fn worker_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(index as u64))
    }
}
