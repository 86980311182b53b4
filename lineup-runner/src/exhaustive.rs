//! Exhaustive search: simulate a fixed number of games for every lineup.
//!
//! The aggregation loop owns all running state (best, worst, histogram and
//! the next rank to enqueue). Workers only return scored lineups. Results
//! are consumed in rank order, so ties resolve to the lowest rank whatever
//! the thread count, and a paused run has completed exactly the ranks below
//! `count_completed`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use lineup_core::{simulate_games, BattingOrder, HitGenerator, LineupIndexer, RngHierarchy};
use tracing::{debug, info, warn};

use crate::config::{Objective, OptimizerConfig};
use crate::optimizer::{
    check_resumable, project_remaining_ms, OptimizeError, OptimizeRequest, Optimizer,
};
use crate::pool::{TaskHandle, TaskPool};
use crate::progress::{ProgressTracker, PUBLISH_SPACING};
use crate::result::{
    histogram_bucket, OptimizationResult, OptimizerKind, ResultStatus, ScoredLineup,
};

const RNG_STREAM: &str = "exhaustive";

#[derive(Debug, Clone, Default)]
pub struct ExhaustiveOptimizer {
    config: OptimizerConfig,
}

impl ExhaustiveOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

// ─── Per-run context shared with workers ─────────────────────────────

struct SearchContext {
    indexer: Arc<dyn LineupIndexer>,
    hits: HitGenerator,
    rng: RngHierarchy,
    innings: u32,
    games: u64,
}

impl SearchContext {
    fn prepare(config: &OptimizerConfig, request: &OptimizeRequest) -> Result<Self, OptimizeError> {
        config.validate()?;
        let players = request.validate()?;
        let hits = HitGenerator::new(&players)?;
        let indexer: Arc<dyn LineupIndexer> = Arc::from(request.build_indexer(&request.players)?);
        Ok(Self {
            indexer,
            hits,
            rng: RngHierarchy::new(config.master_seed),
            innings: config.innings,
            games: config.exhaustive.games,
        })
    }

    fn size(&self) -> u64 {
        self.indexer.size()
    }

    /// Score one rank. Seeding by rank makes the score independent of which
    /// worker runs it and of any pause in between.
    fn evaluate(&self, rank: u64) -> Result<ScoredLineup, OptimizeError> {
        let lineup = self
            .indexer
            .lineup_at(rank)
            .ok_or(OptimizeError::MissingLineup {
                rank,
                size: self.size(),
            })?;
        let order = BattingOrder::resolve(&lineup, &self.hits)?;
        let mut rng = self.rng.rng_for(RNG_STREAM, rank, 0);
        let score = simulate_games(&order, self.innings, self.games, &self.hits, &mut rng);
        Ok(ScoredLineup {
            rank,
            lineup,
            score,
        })
    }
}

fn submit(
    pool: &TaskPool,
    ctx: &Arc<SearchContext>,
    rank: u64,
) -> TaskHandle<Result<ScoredLineup, OptimizeError>> {
    let ctx = Arc::clone(ctx);
    pool.submit(move || ctx.evaluate(rank))
}

fn await_task(
    handle: TaskHandle<Result<ScoredLineup, OptimizeError>>,
) -> Result<ScoredLineup, OptimizeError> {
    match handle.wait().and_then(|outcome| outcome) {
        Ok(scored) => Ok(scored),
        Err(e) => {
            warn!(event = "worker_failed", optimizer = "exhaustive", error = %e);
            Err(e)
        }
    }
}

// ─── Aggregation state ───────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tally {
    best: Option<ScoredLineup>,
    worst: Option<ScoredLineup>,
    histogram: BTreeMap<i64, u64>,
    completed: u64,
}

impl Tally {
    fn resume(existing: Option<&OptimizationResult>) -> Self {
        match existing {
            Some(e) => Self {
                best: e.best.clone(),
                worst: e.worst.clone(),
                histogram: e.histogram.clone(),
                completed: e.count_completed,
            },
            None => Self::default(),
        }
    }

    fn record(&mut self, scored: ScoredLineup, objective: Objective) {
        *self.histogram.entry(histogram_bucket(scored.score)).or_insert(0) += 1;
        self.completed += 1;

        let replaces_best = self
            .best
            .as_ref()
            .map_or(true, |best| objective.prefers(scored.score, best.score));
        let replaces_worst = self
            .worst
            .as_ref()
            .map_or(true, |worst| objective.prefers(worst.score, scored.score));
        if replaces_best {
            self.best = Some(scored.clone());
        }
        if replaces_worst {
            self.worst = Some(scored);
        }
    }

    fn snapshot(&self, total: u64, elapsed_ms: u64, status: ResultStatus) -> OptimizationResult {
        OptimizationResult::new(OptimizerKind::Exhaustive, total)
            .with_best(self.best.clone())
            .with_worst(self.worst.clone())
            .with_histogram(self.histogram.clone())
            .with_progress(self.completed, elapsed_ms)
            .with_status(status, None)
    }
}

// ─── Optimizer ───────────────────────────────────────────────────────

impl Optimizer for ExhaustiveOptimizer {
    fn kind(&self) -> OptimizerKind {
        OptimizerKind::Exhaustive
    }

    fn optimize(
        &self,
        request: &OptimizeRequest,
        tracker: &ProgressTracker,
        existing: Option<&OptimizationResult>,
    ) -> Result<OptimizationResult, OptimizeError> {
        let ctx = Arc::new(SearchContext::prepare(&self.config, request)?);
        let size = ctx.size();
        if let Some(existing) = existing {
            check_resumable(existing, OptimizerKind::Exhaustive, size)?;
            if existing.status == ResultStatus::Complete {
                return Ok(existing.clone());
            }
        }

        let objective = self.config.objective;
        let buffer = self.config.exhaustive.task_buffer;
        let prior_elapsed = existing.map_or(0, |e| e.elapsed_ms);
        let mut tally = Tally::resume(existing);
        let mut next_rank = tally.completed;

        info!(
            event = "optimizer_start",
            optimizer = "exhaustive",
            kind = %request.kind,
            size,
            threads = self.config.threads,
            games = ctx.games,
            resume_from = next_rank,
        );

        let pool = TaskPool::new(self.config.threads, "exhaustive-worker")?;
        let started = Instant::now();
        let elapsed = || prior_elapsed + started.elapsed().as_millis() as u64;
        tracker.update_progress(tally.snapshot(size, elapsed(), ResultStatus::InProgress));
        let mut last_log: Option<Instant> = None;

        let mut in_flight = VecDeque::with_capacity(buffer.min(size as usize));
        while in_flight.len() < buffer && next_rank < size {
            in_flight.push_back(submit(&pool, &ctx, next_rank));
            next_rank += 1;
        }

        let mut paused = false;
        while let Some(handle) = in_flight.pop_front() {
            let scored = pool.or_cancel(&mut in_flight, await_task(handle))?;
            tally.record(scored, objective);
            tracker.update_progress(tally.snapshot(size, elapsed(), ResultStatus::InProgress));
            if last_log.map_or(true, |at| at.elapsed() >= PUBLISH_SPACING) {
                debug!(
                    event = "progress",
                    optimizer = "exhaustive",
                    completed = tally.completed,
                    in_flight = in_flight.len(),
                );
                last_log = Some(Instant::now());
            }

            if !paused && tracker.pause_requested() {
                paused = true;
                info!(
                    event = "optimizer_pausing",
                    optimizer = "exhaustive",
                    draining = in_flight.len(),
                );
            }
            if !paused && next_rank < size {
                in_flight.push_back(submit(&pool, &ctx, next_rank));
                next_rank += 1;
            }
        }

        let status = if tally.completed < size {
            ResultStatus::Paused
        } else {
            ResultStatus::Complete
        };
        let result = tracker.update_progress(tally.snapshot(size, elapsed(), status));
        info!(
            event = "optimizer_finish",
            optimizer = "exhaustive",
            status = ?result.status,
            completed = result.count_completed,
            total = size,
            best_score = result.best.as_ref().map(|b| b.score),
            elapsed_ms = result.elapsed_ms,
        );
        Ok(result)
    }

    fn estimate(
        &self,
        request: &OptimizeRequest,
        existing: Option<&OptimizationResult>,
    ) -> Result<OptimizationResult, OptimizeError> {
        let ctx = Arc::new(SearchContext::prepare(&self.config, request)?);
        let size = ctx.size();
        if let Some(existing) = existing {
            check_resumable(existing, OptimizerKind::Exhaustive, size)?;
        }
        let base = existing
            .cloned()
            .unwrap_or_else(|| OptimizationResult::new(OptimizerKind::Exhaustive, size));

        let sample = self.config.exhaustive.estimate_sample_lineups.min(size).max(1);
        let pool = TaskPool::new(self.config.threads, "exhaustive-estimate")?;
        let started = Instant::now();
        let mut handles: VecDeque<_> = (0..sample)
            .map(|i| {
                // Spread the sample across the whole rank space.
                let rank = (i as u128 * size as u128 / sample as u128) as u64;
                submit(&pool, &ctx, rank)
            })
            .collect();
        while let Some(handle) = handles.pop_front() {
            pool.or_cancel(&mut handles, await_task(handle))?;
        }
        let wall_ms = (started.elapsed().as_secs_f64() * 1000.0).max(1e-3);

        let remaining_ms = project_remaining_ms(base.remaining(), sample as f64 / wall_ms);
        let total_ms = remaining_ms.map(|r| r.saturating_add(base.elapsed_ms));
        info!(
            event = "optimizer_estimate",
            optimizer = "exhaustive",
            sample,
            wall_ms,
            remaining_ms,
        );
        Ok(base
            .with_status(ResultStatus::Estimate, None)
            .with_estimates(remaining_ms, total_ms))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
