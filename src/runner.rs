//! Concurrent check runner
//!
//! Samples tasks from a round (uniformly, with replacement) and runs one isolated attempt per
//! draw. Draws are produced lazily and at most `max_concurrent_checks` attempts are in flight,
//! so memory use does not grow with the number of requested checks. A failure in any stage of
//! one attempt becomes that attempt's result and never affects the others.
//!
//! Cancellation is cooperative: draws not yet started are never dispatched, attempts in flight
//! are dropped, and [`CheckRunner::run`] returns the results that had already completed.

use crate::config::MAX_CONCURRENT_CHECKS;
use crate::content_id::ContentId;
use crate::error::CheckError;
use crate::fetcher::ContentFetcher;
use crate::resolver::ProviderResolver;
use crate::types::{CheckResult, RetrievalStats, RetrievalTask, Round, SampleSize};
use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lazy sequence of task indices drawn uniformly with replacement
pub struct Draws {
    rng: StdRng,
    task_count: usize,
    remaining: usize,
}

impl Iterator for Draws {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 || self.task_count == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.rng.gen_range(0..self.task_count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.task_count == 0 { 0 } else { self.remaining };
        (remaining, Some(remaining))
    }
}

/// Runs sampled spot checks against a round.
#[derive(Clone)]
pub struct CheckRunner {
    resolver: ProviderResolver,
    fetcher: ContentFetcher,
    max_concurrent_checks: usize,
    seed: Option<u64>,
}

impl CheckRunner {
    /// Create a runner with at most `max_concurrent_checks` attempts in flight.
    ///
    /// The limit is clamped to `1..=MAX_CONCURRENT_CHECKS`.
    pub fn new(
        resolver: ProviderResolver,
        fetcher: ContentFetcher,
        max_concurrent_checks: usize,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            max_concurrent_checks: max_concurrent_checks.clamp(1, MAX_CONCURRENT_CHECKS),
            seed: None,
        }
    }

    /// Make draws reproducible.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Indices of `k` tasks drawn uniformly with replacement from `task_count` tasks.
    pub fn draws(&self, task_count: usize, k: usize) -> Draws {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Draws {
            rng,
            task_count,
            remaining: k,
        }
    }

    /// Run `sample` checks against `round`.
    ///
    /// Results are ordered by draw. Under cancellation, only attempts that completed before
    /// the token fired are included.
    pub async fn run(
        &self,
        round: Arc<Round>,
        sample: SampleSize,
        cancel: CancellationToken,
    ) -> Vec<CheckResult> {
        let task_count = round.retrieval_tasks.len();
        let k = sample.resolve(task_count);

        if k == 0 {
            return Vec::new();
        }
        if task_count == 0 {
            tracing::warn!(
                round_id = %round.round_id,
                checks = k,
                "Round has no retrieval tasks, nothing to check"
            );
            return Vec::new();
        }

        tracing::info!(
            round_id = %round.round_id,
            tasks = task_count,
            checks = k,
            concurrency = self.max_concurrent_checks,
            "Starting spot checks"
        );

        let resolver = &self.resolver;
        let fetcher = &self.fetcher;
        let tasks = &round.retrieval_tasks;

        let mut attempts = stream::iter(self.draws(task_count, k).enumerate())
            .map(move |(draw, task_index)| {
                let task = tasks[task_index].clone();
                async move { (draw, check(resolver, fetcher, task).await) }
            })
            .buffer_unordered(self.max_concurrent_checks);

        let mut results = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(
                        completed = results.len(),
                        checks = k,
                        "Check run cancelled, returning partial results"
                    );
                    break;
                }
                next = attempts.next() => match next {
                    Some(entry) => results.push(entry),
                    None => break,
                },
            }
        }

        results.sort_by_key(|(draw, _)| *draw);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

async fn check(
    resolver: &ProviderResolver,
    fetcher: &ContentFetcher,
    task: RetrievalTask,
) -> CheckResult {
    match check_task(resolver, fetcher, &task).await {
        Ok(stats) => {
            tracing::info!(
                task = %task,
                bytes = stats.byte_length,
                duration_ms = stats.duration_ms,
                "Retrieval succeeded"
            );
            CheckResult::success(task, stats)
        }
        Err(e) => {
            tracing::warn!(task = %task, code = e.error_code(), error = %e, "Check failed");
            CheckResult::failure(task, &e)
        }
    }
}

async fn check_task(
    resolver: &ProviderResolver,
    fetcher: &ContentFetcher,
    task: &RetrievalTask,
) -> Result<RetrievalStats, CheckError> {
    let cid: ContentId = task
        .cid
        .parse()
        .map_err(|source| CheckError::ContentIdParse {
            input: task.cid.clone(),
            source,
        })?;

    let peer = resolver
        .resolve(&task.miner_id, &cid)
        .await?
        .ok_or_else(|| CheckError::NoProvider {
            cid: task.cid.clone(),
        })?;

    fetcher.fetch(&cid, peer).await
}
