//! Digest search loop.
//!
//! Each attempt perturbs the raster in place, re-encodes it, digests the
//! encoded bytes and compares the digest against the target prefix.
//! Perturbations accumulate across attempts and are never reverted.
//!
//! # Guardrails
//!
//! A prefix of `k` hex characters takes `16^k` attempts on average, with no
//! structural bound. The search therefore checks an attempt budget and a time
//! budget before every attempt and ends with [`SearchOutcome::Exhausted`]
//! when either trips.
//!
//! # Stalls
//!
//! A lossy encoder may quantize a one-bit change away, producing the same bytes
//! as the previous attempt. After `stall_threshold` consecutive repeated
//! digests the number of pixels perturbed per attempt doubles, up to
//! `max_perturbation`, and drops back to one once the digest moves again.
//!
//! # Parallel search
//!
//! With `workers >= 2` (and the `parallel` feature), every worker owns a private
//! clone of the raster and its own RNG. Workers share an atomic attempt counter
//! and a stop flag; the first match claims the flag and is the only one
//! reported.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::RasterEncoder;
use crate::config::SearchConfig;
use crate::digest::Digester;
use crate::error::{Result, SearchFailure, SpoofError};
use crate::perturb::{perturb_many, CoordinateSource};
use crate::prefix::TargetPrefix;
use crate::raster::Raster;

/// Receives periodic progress observations.
///
/// Observations are side effects only and never influence the search.
pub trait ProgressSink: Send + Sync {
    fn observe(&self, attempts: u64, digest: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, &str) + Send + Sync,
{
    fn observe(&self, attempts: u64, digest: &str) {
        self(attempts, digest)
    }
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn observe(&self, attempts: u64, digest: &str) {
        info!(attempts, digest, "Search progress");
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn observe(&self, _attempts: u64, _digest: &str) {}
}

/// Which guardrail ended an unsuccessful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "limit", rename_all = "snake_case")]
pub enum ExhaustReason {
    Attempts(u64),
    Time(Duration),
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempts(max) => write!(f, "attempt limit of {max} reached"),
            Self::Time(budget) => write!(f, "time budget of {:.1}s elapsed", budget.as_secs_f64()),
        }
    }
}

/// Result of a search that ran without collaborator failures.
#[derive(Debug)]
pub enum SearchOutcome {
    Found {
        raster: Raster,
        /// Digest of `encoded`, beginning with the target prefix
        digest: String,
        /// Exact encoded bytes that produced `digest`
        encoded: Vec<u8>,
        attempts: u64,
        elapsed: Duration,
    },
    Exhausted {
        raster: Raster,
        attempts: u64,
        reason: ExhaustReason,
        elapsed: Duration,
    },
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn attempts(&self) -> u64 {
        match self {
            Self::Found { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Found { elapsed, .. } | Self::Exhausted { elapsed, .. } => *elapsed,
        }
    }

    pub fn digest(&self) -> Option<&str> {
        match self {
            Self::Found { digest, .. } => Some(digest),
            Self::Exhausted { .. } => None,
        }
    }

    pub fn raster(&self) -> &Raster {
        match self {
            Self::Found { raster, .. } | Self::Exhausted { raster, .. } => raster,
        }
    }

    pub fn into_raster(self) -> Raster {
        match self {
            Self::Found { raster, .. } | Self::Exhausted { raster, .. } => raster,
        }
    }
}

/// How a single worker's loop ended.
enum WorkerEnd {
    Found {
        raster: Raster,
        digest: String,
        encoded: Vec<u8>,
    },
    Exhausted {
        raster: Raster,
        reason: ExhaustReason,
    },
    Cancelled {
        raster: Raster,
    },
    Failed {
        raster: Raster,
        error: SpoofError,
    },
}

impl WorkerEnd {
    fn rank(&self) -> u8 {
        match self {
            Self::Found { .. } => 0,
            Self::Failed { .. } => 1,
            Self::Exhausted { .. } => 2,
            Self::Cancelled { .. } => 3,
        }
    }
}

/// State shared by every worker of one search.
struct Shared {
    attempts: AtomicU64,
    stop: AtomicBool,
    started: Instant,
}

impl Shared {
    fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            stop: AtomicBool::new(false),
            started: Instant::now(),
        }
    }

    fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }
}

/// Pixels perturbed per attempt, doubled while the digest stays unchanged.
#[derive(Debug)]
struct Escalation {
    strength: u32,
    stalled: u32,
    threshold: u32,
    max: u32,
}

impl Escalation {
    fn new(config: &SearchConfig) -> Self {
        Self {
            strength: 1,
            stalled: 0,
            threshold: config.stall_threshold,
            max: config.max_perturbation,
        }
    }

    /// Record whether the latest digest repeated the previous one.
    /// Returns true when the strength changed.
    fn record(&mut self, repeated: bool) -> bool {
        if !repeated {
            let changed = self.strength > 1;
            self.strength = 1;
            self.stalled = 0;
            return changed;
        }

        if self.strength >= self.max {
            // Nothing left to escalate to.
            self.stalled = 0;
            return false;
        }

        self.stalled = self.stalled.saturating_add(1);
        if self.stalled < self.threshold {
            return false;
        }
        self.strength = self.strength.saturating_mul(2).min(self.max);
        self.stalled = 0;
        true
    }
}

/// Runs digest-prefix searches with a fixed [`SearchConfig`].
#[derive(Debug, Clone, Default)]
pub struct Searcher {
    config: SearchConfig,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search for an encoding of `raster` whose digest starts with `prefix`.
    ///
    /// The prefix and configuration are validated before any collaborator is
    /// called; a validation failure reports zero attempts. Runs in parallel when
    /// the configuration asks for more than one worker.
    pub fn search(
        &self,
        raster: Raster,
        prefix: &str,
        encoder: &dyn RasterEncoder,
        digester: &dyn Digester,
        progress: &dyn ProgressSink,
    ) -> std::result::Result<SearchOutcome, SearchFailure> {
        let prefix = match self.prepare(prefix, digester) {
            Ok(prefix) => prefix,
            Err(error) => return Err(SearchFailure::new(error, 0, raster)),
        };

        if self.config.workers > 1 {
            #[cfg(feature = "parallel")]
            return self.run_parallel(raster, &prefix, encoder, digester, progress);

            #[cfg(not(feature = "parallel"))]
            warn!(
                workers = self.config.workers,
                "Parallel search disabled at build time, running one worker"
            );
        }

        let mut rng = self.worker_rng(0);
        self.run_sequential(raster, &prefix, encoder, digester, progress, &mut rng)
    }

    /// Sequential search driven by an injected coordinate source.
    ///
    /// Ignores `workers` and `seed`; the walk is fully determined by `source`.
    pub fn search_with_source<S>(
        &self,
        raster: Raster,
        prefix: &str,
        encoder: &dyn RasterEncoder,
        digester: &dyn Digester,
        progress: &dyn ProgressSink,
        source: &mut S,
    ) -> std::result::Result<SearchOutcome, SearchFailure>
    where
        S: CoordinateSource + ?Sized,
    {
        let prefix = match self.prepare(prefix, digester) {
            Ok(prefix) => prefix,
            Err(error) => return Err(SearchFailure::new(error, 0, raster)),
        };
        self.run_sequential(raster, &prefix, encoder, digester, progress, source)
    }

    fn prepare(&self, prefix: &str, digester: &dyn Digester) -> Result<TargetPrefix> {
        self.config.validate()?;
        let prefix = TargetPrefix::parse(prefix)?;
        prefix.check_len(digester.hex_len())?;
        debug!(
            prefix = %prefix,
            algorithm = digester.name(),
            expected_attempts = prefix.expected_attempts(),
            "Starting search"
        );
        Ok(prefix)
    }

    fn worker_rng(&self, index: usize) -> StdRng {
        match self.config.worker_seed(index) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    fn run_sequential<S>(
        &self,
        raster: Raster,
        prefix: &TargetPrefix,
        encoder: &dyn RasterEncoder,
        digester: &dyn Digester,
        progress: &dyn ProgressSink,
        source: &mut S,
    ) -> std::result::Result<SearchOutcome, SearchFailure>
    where
        S: CoordinateSource + ?Sized,
    {
        let shared = Shared::new();
        let end = self.run_worker(raster, prefix, encoder, digester, progress, source, &shared);
        self.finish(end, Vec::new(), &shared)
    }

    #[cfg(feature = "parallel")]
    fn run_parallel(
        &self,
        raster: Raster,
        prefix: &TargetPrefix,
        encoder: &dyn RasterEncoder,
        digester: &dyn Digester,
        progress: &dyn ProgressSink,
    ) -> std::result::Result<SearchOutcome, SearchFailure> {
        use rayon::prelude::*;

        let workers = self.config.workers;
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("hashspoof-worker-{index}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                return Err(SearchFailure::new(
                    SpoofError::InvalidConfig(format!("Failed to start worker pool: {e}")),
                    0,
                    raster,
                ))
            }
        };

        info!(workers, "Starting parallel search");
        let shared = Shared::new();
        let clones: Vec<Raster> = (1..workers).map(|_| raster.clone()).collect();
        let (primary, others) = pool.install(|| {
            rayon::join(
                || {
                    let mut rng = self.worker_rng(0);
                    self.run_worker(raster, prefix, encoder, digester, progress, &mut rng, &shared)
                },
                || {
                    clones
                        .into_par_iter()
                        .enumerate()
                        .map(|(i, raster)| {
                            let mut rng = self.worker_rng(i + 1);
                            self.run_worker(
                                raster, prefix, encoder, digester, progress, &mut rng, &shared,
                            )
                        })
                        .collect::<Vec<_>>()
                },
            )
        });
        self.finish(primary, others, &shared)
    }

    /// One worker's perturb, encode, digest, compare loop.
    #[allow(clippy::too_many_arguments)]
    fn run_worker<S>(
        &self,
        mut raster: Raster,
        prefix: &TargetPrefix,
        encoder: &dyn RasterEncoder,
        digester: &dyn Digester,
        progress: &dyn ProgressSink,
        source: &mut S,
        shared: &Shared,
    ) -> WorkerEnd
    where
        S: CoordinateSource + ?Sized,
    {
        let interval = self.config.progress_interval;
        let mut escalation = Escalation::new(&self.config);
        let mut last_digest: Option<String> = None;

        loop {
            if shared.stop.load(Ordering::Acquire) {
                return WorkerEnd::Cancelled { raster };
            }
            if let Some(reason) = self.exhausted(shared) {
                return WorkerEnd::Exhausted { raster, reason };
            }

            if let Err(error) = perturb_many(&mut raster, source, escalation.strength) {
                shared.stop.store(true, Ordering::Release);
                return WorkerEnd::Failed { raster, error };
            }

            let encoded = match encoder.encode(&raster) {
                Ok(bytes) => bytes,
                Err(e) => {
                    shared.stop.store(true, Ordering::Release);
                    return WorkerEnd::Failed {
                        raster,
                        error: as_encoding_failure(e),
                    };
                }
            };

            let digest = match digester.digest_hex(&encoded) {
                Ok(digest) => digest,
                Err(e) => {
                    shared.stop.store(true, Ordering::Release);
                    return WorkerEnd::Failed {
                        raster,
                        error: as_digest_failure(e),
                    };
                }
            };

            let attempts = shared.attempts.fetch_add(1, Ordering::AcqRel) + 1;
            if interval > 0 && attempts % interval == 0 {
                progress.observe(attempts, &digest);
            }

            if prefix.matches(&digest) {
                // Only the first matching worker may report.
                if shared
                    .stop
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return WorkerEnd::Found {
                        raster,
                        digest,
                        encoded,
                    };
                }
                return WorkerEnd::Cancelled { raster };
            }

            let repeated = last_digest.as_deref() == Some(digest.as_str());
            if escalation.record(repeated) {
                if repeated {
                    debug!(
                        attempts,
                        strength = escalation.strength,
                        "Digest stalled, escalating perturbation"
                    );
                } else {
                    debug!(attempts, "Digest advanced, restoring single-pixel perturbation");
                }
            }
            last_digest = Some(digest);
        }
    }

    fn exhausted(&self, shared: &Shared) -> Option<ExhaustReason> {
        if let Some(max) = self.config.max_attempts {
            if shared.attempts() >= max {
                return Some(ExhaustReason::Attempts(max));
            }
        }
        if let Some(budget) = self.config.time_budget {
            if shared.started.elapsed() >= budget {
                return Some(ExhaustReason::Time(budget));
            }
        }
        None
    }

    /// Collapse worker ends into one outcome: a match wins, then a failure,
    /// then an exhausted guardrail.
    fn finish(
        &self,
        primary: WorkerEnd,
        others: Vec<WorkerEnd>,
        shared: &Shared,
    ) -> std::result::Result<SearchOutcome, SearchFailure> {
        let attempts = shared.attempts();
        let elapsed = shared.started.elapsed();
        let best = others
            .into_iter()
            .fold(primary, |best, end| if end.rank() < best.rank() { end } else { best });

        match best {
            WorkerEnd::Found {
                raster,
                digest,
                encoded,
            } => {
                info!(attempts, digest = %digest, ?elapsed, "Found matching digest");
                Ok(SearchOutcome::Found {
                    raster,
                    digest,
                    encoded,
                    attempts,
                    elapsed,
                })
            }
            WorkerEnd::Failed { raster, error } => {
                warn!(attempts, error = %error, "Search aborted");
                Err(SearchFailure::new(error, attempts, raster))
            }
            WorkerEnd::Exhausted { raster, reason } => {
                warn!(attempts, %reason, "Search exhausted without a match");
                Ok(SearchOutcome::Exhausted {
                    raster,
                    attempts,
                    reason,
                    elapsed,
                })
            }
            WorkerEnd::Cancelled { raster } => {
                let reason = self
                    .exhausted(shared)
                    .unwrap_or(ExhaustReason::Attempts(attempts));
                warn!(attempts, %reason, "Search cancelled without a match");
                Ok(SearchOutcome::Exhausted {
                    raster,
                    attempts,
                    reason,
                    elapsed,
                })
            }
        }
    }
}

fn as_encoding_failure(error: SpoofError) -> SpoofError {
    match error {
        SpoofError::EncodingFailure(_) => error,
        other => SpoofError::EncodingFailure(other.to_string()),
    }
}

fn as_digest_failure(error: SpoofError) -> SpoofError {
    match error {
        SpoofError::DigestFailure(_) => error,
        other => SpoofError::DigestFailure(other.to_string()),
    }
}

/// Run a search with default configuration, logging progress via `tracing`.
pub fn search(
    raster: Raster,
    prefix: &str,
    encoder: &dyn RasterEncoder,
    digester: &dyn Digester,
) -> std::result::Result<SearchOutcome, SearchFailure> {
    Searcher::default().search(raster, prefix, encoder, digester, &TracingProgress)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;
    use crate::codec::JpegEncoder;
    use crate::digest::DigestAlgorithm;
    use crate::perturb::ScriptedCoordinates;

    /// Encodes the raw packed pixels, optionally failing on the n-th call.
    struct StubEncoder {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl StubEncoder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: None,
            }
        }

        fn failing_on(call: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: Some(call),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RasterEncoder for StubEncoder {
        fn encode(&self, raster: &Raster) -> Result<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(call) == self.fail_on {
                return Err(SpoofError::EncodingFailure("stub failure".into()));
            }
            Ok(raster.pixels().iter().flat_map(|p| p.to_le_bytes()).collect())
        }
    }

    /// Returns scripted digests in order, repeating the last one.
    struct StubDigester {
        digests: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl StubDigester {
        fn new(digests: Vec<&'static str>) -> Self {
            Self {
                digests,
                calls: AtomicUsize::new(0),
            }
        }

        fn never_matching() -> Self {
            Self::new(vec!["ffff"])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Digester for StubDigester {
        fn digest_hex(&self, _bytes: &[u8]) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let index = call.min(self.digests.len() - 1);
            Ok(self.digests[index].to_string())
        }

        fn hex_len(&self) -> usize {
            4
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    struct FailingDigester;

    impl Digester for FailingDigester {
        fn digest_hex(&self, _bytes: &[u8]) -> Result<String> {
            Err(SpoofError::InvalidConfig("no algorithm".into()))
        }

        fn hex_len(&self) -> usize {
            128
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn white_2x2() -> Raster {
        Raster::filled(2, 2, 0xFFFFFF).unwrap()
    }

    fn seeded(seed: u64) -> Searcher {
        Searcher::new(SearchConfig::default().with_seed(Some(seed)))
    }

    #[test]
    fn test_empty_prefix_matches_first_attempt() {
        let original = white_2x2();
        let outcome = seeded(1)
            .search(
                original.clone(),
                "",
                &JpegEncoder::default(),
                &DigestAlgorithm::Sha512,
                &NoProgress,
            )
            .unwrap();

        assert!(outcome.is_found());
        assert_eq!(outcome.attempts(), 1);
        assert!(outcome.raster().diff_count(&original) <= 1);
        assert_eq!(outcome.digest().map(str::len), Some(128));
    }

    #[test]
    fn test_found_digest_matches_encoded_bytes() {
        let outcome = seeded(2)
            .search(
                white_2x2(),
                "",
                &JpegEncoder::default(),
                &DigestAlgorithm::Sha512,
                &NoProgress,
            )
            .unwrap();

        match outcome {
            SearchOutcome::Found {
                digest, encoded, ..
            } => {
                assert_eq!(DigestAlgorithm::Sha512.digest_hex(&encoded).unwrap(), digest);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_prefix_fails_before_any_collaborator_call() {
        let encoder = StubEncoder::new();
        let digester = StubDigester::never_matching();

        let failure = seeded(3)
            .search(white_2x2(), "0xg", &encoder, &digester, &NoProgress)
            .unwrap_err();

        assert!(matches!(failure.error, SpoofError::InvalidPrefix { .. }));
        assert_eq!(failure.attempts, 0);
        assert_eq!(encoder.calls(), 0);
        assert_eq!(digester.calls(), 0);
        assert_eq!(failure.raster, white_2x2());
    }

    #[test]
    fn test_prefix_longer_than_digest_is_rejected() {
        let encoder = StubEncoder::new();
        let failure = seeded(3)
            .search(
                white_2x2(),
                "00000",
                &encoder,
                &StubDigester::never_matching(),
                &NoProgress,
            )
            .unwrap_err();

        assert!(matches!(
            failure.error,
            SpoofError::PrefixTooLong { len: 5, max: 4 }
        ));
        assert_eq!(encoder.calls(), 0);
    }

    #[test]
    fn test_stub_digest_matches_deterministically() {
        let digester = StubDigester::new(vec!["f1", "a2", "e3", "0b"]);
        let outcome = seeded(4)
            .search(white_2x2(), "0", &StubEncoder::new(), &digester, &NoProgress)
            .unwrap();

        assert_eq!(outcome.attempts(), 4);
        assert_eq!(outcome.digest(), Some("0b"));
    }

    #[test]
    fn test_progress_every_hundred_attempts() {
        let observed = Mutex::new(Vec::new());
        let progress = |attempts: u64, digest: &str| {
            observed.lock().unwrap().push((attempts, digest.to_string()));
        };
        let searcher = Searcher::new(
            SearchConfig::default()
                .with_seed(Some(5))
                .with_max_attempts(Some(250)),
        );

        let outcome = searcher
            .search(
                white_2x2(),
                "0",
                &StubEncoder::new(),
                &StubDigester::never_matching(),
                &progress,
            )
            .unwrap();

        assert!(!outcome.is_found());
        assert_eq!(outcome.attempts(), 250);
        let observed = observed.into_inner().unwrap();
        assert_eq!(
            observed,
            vec![(100, "ffff".to_string()), (200, "ffff".to_string())]
        );
    }

    #[test]
    fn test_progress_interval_zero_disables_reports() {
        let count = AtomicUsize::new(0);
        let progress = |_: u64, _: &str| {
            count.fetch_add(1, Ordering::SeqCst);
        };
        let searcher = Searcher::new(
            SearchConfig::default()
                .with_seed(Some(5))
                .with_max_attempts(Some(300))
                .with_progress_interval(0),
        );

        searcher
            .search(
                white_2x2(),
                "0",
                &StubEncoder::new(),
                &StubDigester::never_matching(),
                &progress,
            )
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_encoding_failure_reports_prior_attempts() {
        let encoder = StubEncoder::failing_on(5);
        let digester = StubDigester::never_matching();

        let failure = seeded(6)
            .search(white_2x2(), "0", &encoder, &digester, &NoProgress)
            .unwrap_err();

        assert!(matches!(failure.error, SpoofError::EncodingFailure(_)));
        assert_eq!(failure.attempts, 4);
        assert_eq!(encoder.calls(), 5);
        assert_eq!(digester.calls(), 4);
        // Five toggles were applied, so at least one pixel still differs.
        assert!(failure.raster.diff_count(&white_2x2()) >= 1);
    }

    #[test]
    fn test_digest_failure_is_wrapped() {
        let failure = seeded(7)
            .search(
                white_2x2(),
                "0",
                &StubEncoder::new(),
                &FailingDigester,
                &NoProgress,
            )
            .unwrap_err();

        match failure.error {
            SpoofError::DigestFailure(message) => assert!(message.contains("no algorithm")),
            other => panic!("expected DigestFailure, got {other:?}"),
        }
        assert_eq!(failure.attempts, 0);
    }

    #[test]
    fn test_time_budget_exhausts() {
        let searcher = Searcher::new(
            SearchConfig::default()
                .with_seed(Some(8))
                .with_max_attempts(None)
                .with_time_budget(Some(Duration::from_millis(20))),
        );

        let outcome = searcher
            .search(
                white_2x2(),
                "0",
                &StubEncoder::new(),
                &StubDigester::never_matching(),
                &NoProgress,
            )
            .unwrap();

        match outcome {
            SearchOutcome::Exhausted { reason, .. } => {
                assert_eq!(reason, ExhaustReason::Time(Duration::from_millis(20)));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_attempt_budget_never_calls_collaborators() {
        let encoder = StubEncoder::new();
        let searcher = Searcher::new(SearchConfig::default().with_max_attempts(Some(0)));

        let outcome = searcher
            .search(
                white_2x2(),
                "",
                &encoder,
                &StubDigester::never_matching(),
                &NoProgress,
            )
            .unwrap();

        assert_eq!(outcome.attempts(), 0);
        assert_eq!(encoder.calls(), 0);
        assert_eq!(outcome.into_raster(), white_2x2());
    }

    #[test]
    fn test_invalid_config_reports_zero_attempts() {
        let searcher = Searcher::new(SearchConfig::default().with_workers(0));
        let failure = searcher
            .search(
                white_2x2(),
                "",
                &StubEncoder::new(),
                &StubDigester::never_matching(),
                &NoProgress,
            )
            .unwrap_err();
        assert!(matches!(failure.error, SpoofError::InvalidConfig(_)));
        assert_eq!(failure.attempts, 0);
    }

    #[test]
    fn test_stall_escalates_pixels_per_attempt() {
        // A constant digest never advances, so strength doubles every
        // `stall_threshold` repeats: attempts 1..=3 touch one pixel each,
        // attempts 4..=5 two pixels each.
        let searcher = Searcher::new(
            SearchConfig::default()
                .with_stall_threshold(2)
                .with_max_perturbation(2)
                .with_max_attempts(Some(5)),
        );
        let raster = Raster::filled(16, 1, 0).unwrap();
        let mut source = ScriptedCoordinates::new((0..16).map(|x| (x, 0)).collect());

        let outcome = searcher
            .search_with_source(
                raster,
                "0",
                &StubEncoder::new(),
                &StubDigester::never_matching(),
                &NoProgress,
                &mut source,
            )
            .unwrap();

        let touched = outcome.raster().pixels().iter().filter(|&&p| p == 1).count();
        assert_eq!(touched, 3 + 2 * 2);
    }

    #[test]
    fn test_escalation_resets_when_digest_advances() {
        // Attempts 1..=3 repeat "aaaa" and touch one pixel each, attempt 4
        // runs at strength 2, then "bbbb" drops attempt 5 back to one pixel.
        let searcher = Searcher::new(
            SearchConfig::default()
                .with_stall_threshold(2)
                .with_max_attempts(Some(5)),
        );
        let raster = Raster::filled(16, 1, 0).unwrap();
        let mut source = ScriptedCoordinates::new((0..16).map(|x| (x, 0)).collect());
        let digester = StubDigester::new(vec!["aaaa", "aaaa", "aaaa", "bbbb", "cccc"]);

        let outcome = searcher
            .search_with_source(
                raster,
                "0",
                &StubEncoder::new(),
                &digester,
                &NoProgress,
                &mut source,
            )
            .unwrap();

        assert_eq!(outcome.attempts(), 5);
        assert_eq!(digester.calls(), 5);
        let touched = outcome.raster().pixels().iter().filter(|&&p| p == 1).count();
        assert_eq!(touched, 3 + 2 + 1);
    }

    #[test]
    fn test_escalation_stops_counting_at_cap() {
        let config = SearchConfig::default()
            .with_stall_threshold(1)
            .with_max_perturbation(4);
        let mut escalation = Escalation::new(&config);

        assert!(escalation.record(true));
        assert!(escalation.record(true));
        assert_eq!(escalation.strength, 4);

        escalation.stalled = u32::MAX;
        for _ in 0..3 {
            assert!(!escalation.record(true));
        }
        assert_eq!(escalation.strength, 4);
        assert_eq!(escalation.stalled, 0);

        assert!(escalation.record(false));
        assert_eq!(escalation.strength, 1);
        assert!(!escalation.record(false));
    }

    #[test]
    fn test_escalation_saturates_stall_count() {
        let config = SearchConfig::default()
            .with_stall_threshold(u32::MAX)
            .with_max_perturbation(2);
        let mut escalation = Escalation::new(&config);
        escalation.stalled = u32::MAX - 1;

        assert!(escalation.record(true));
        assert_eq!(escalation.strength, 2);
        assert_eq!(escalation.stalled, 0);
    }

    #[test]
    fn test_scripted_source_drives_walk() {
        let mut source = ScriptedCoordinates::new(vec![(1, 1)]);
        let outcome = Searcher::default()
            .search_with_source(
                white_2x2(),
                "",
                &StubEncoder::new(),
                &StubDigester::never_matching(),
                &NoProgress,
                &mut source,
            )
            .unwrap();

        assert_eq!(outcome.raster().get(1, 1), Some(0xFFFFFE));
        assert_eq!(outcome.raster().diff_count(&white_2x2()), 1);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_reports_single_match() {
        let searcher = Searcher::new(
            SearchConfig::default()
                .with_seed(Some(10))
                .with_workers(4)
                .with_max_attempts(Some(100_000)),
        );
        let original = Raster::filled(8, 8, 0x808080).unwrap();

        let outcome = searcher
            .search(
                original.clone(),
                "0",
                &StubEncoder::new(),
                &DigestAlgorithm::Sha512,
                &NoProgress,
            )
            .unwrap();

        match outcome {
            SearchOutcome::Found {
                digest,
                encoded,
                attempts,
                ..
            } => {
                assert!(digest.starts_with('0'));
                assert_eq!(DigestAlgorithm::Sha512.digest_hex(&encoded).unwrap(), digest);
                assert!(attempts >= 1);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_exhaustion_respects_shared_budget() {
        let workers = 3;
        let searcher = Searcher::new(
            SearchConfig::default()
                .with_workers(workers)
                .with_max_attempts(Some(500)),
        );

        let outcome = searcher
            .search(
                white_2x2(),
                "0",
                &StubEncoder::new(),
                &StubDigester::never_matching(),
                &NoProgress,
            )
            .unwrap();

        assert!(!outcome.is_found());
        assert!(outcome.attempts() >= 500);
        assert!(outcome.attempts() < 500 + workers as u64);
    }

    #[test]
    fn test_exhaust_reason_display() {
        assert_eq!(
            ExhaustReason::Attempts(10).to_string(),
            "attempt limit of 10 reached"
        );
        assert_eq!(
            ExhaustReason::Time(Duration::from_millis(1500)).to_string(),
            "time budget of 1.5s elapsed"
        );
    }
}
