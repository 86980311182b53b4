//! Adaptive search: a sequential elimination tournament.
//!
//! Instead of simulating a fixed number of games per lineup, each challenger
//! is compared against the current champion with Welch's t-test, adding
//! games to the smaller sample until the difference is significant at
//! `alpha` or both sides reach the per-lineup cap (then the higher mean wins).
//!
//! Workers run short sub-tournaments over a few challengers against a copy
//! of the champion. The live champion sits behind [`Champion`], which only
//! offers two operations: replace it if a worker's copy is still current,
//! and merge extra samples into it if it is unchanged. Everything else,
//! including which lineups are still alive, is owned by the aggregation
//! loop.
//!
//! Players are ordered by batting average before indexing, so rank 0 is a
//! strong starting champion.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use lineup_core::{
    simulate_game, BattingOrder, HitGenerator, LineupIndexer, Player, PlayerId, RngHierarchy,
};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{AdaptiveConfig, Objective, OptimizerConfig};
use crate::optimizer::{
    check_resumable, project_remaining_ms, OptimizeError, OptimizeRequest, Optimizer,
};
use crate::pool::{TaskHandle, TaskPool};
use crate::progress::{ProgressTracker, PUBLISH_SPACING};
use crate::result::{
    AdaptiveState, OptimizationResult, OptimizerKind, ResultStatus, ScoredLineup,
};
use crate::stats::{welch_t_test, MeanShift, SampleStats};

const RNG_STREAM: &str = "adaptive";
const FINAL_STREAM: &str = "adaptive-final";
const ESTIMATE_STREAM: &str = "adaptive-estimate";
const SPREAD_STREAM: &str = "adaptive-spread";

/// Smallest range an estimate compares with, so lineups that always score
/// the same still separate.
const MIN_ESTIMATE_RANGE: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct AdaptiveOptimizer {
    config: OptimizerConfig,
}

impl AdaptiveOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

// ─── Candidates and duels ────────────────────────────────────────────

/// A lineup in the tournament with the games simulated for it so far.
/// Identity is the rank; the statistics only decide duels.
#[derive(Debug, Clone)]
struct Candidate {
    rank: u64,
    order: Arc<BattingOrder>,
    stats: SampleStats,
}

#[derive(Debug, Clone, Copy)]
struct Duel {
    /// The incumbent (first argument) kept its place.
    incumbent_wins: bool,
    /// Samples added to the incumbent during this duel.
    incumbent_added: SampleStats,
    simulations: u64,
    reached_cap: bool,
}

/// Immutable per-run data shared with workers.
struct Tournament {
    indexer: Arc<dyn LineupIndexer>,
    hits: HitGenerator,
    rng: RngHierarchy,
    innings: u32,
    objective: Objective,
    settings: AdaptiveConfig,
}

/// Selected players ordered by batting average, best first. Ties keep the
/// requested order so the ordering is stable across resumes.
fn seeded_order(players: &[Player]) -> Vec<PlayerId> {
    let mut players: Vec<&Player> = players.iter().collect();
    players.sort_by(|a, b| {
        b.outcomes
            .batting_average()
            .total_cmp(&a.outcomes.batting_average())
    });
    players.into_iter().map(|p| p.id.clone()).collect()
}

impl Tournament {
    fn prepare(config: &OptimizerConfig, request: &OptimizeRequest) -> Result<Self, OptimizeError> {
        config.validate()?;
        let players = request.validate()?;
        let hits = HitGenerator::new(&players)?;
        let seeded = seeded_order(&players);
        let indexer: Arc<dyn LineupIndexer> = Arc::from(request.build_indexer(&seeded)?);
        Ok(Self {
            indexer,
            hits,
            rng: RngHierarchy::new(config.master_seed),
            innings: config.innings,
            objective: config.objective,
            settings: config.adaptive.clone(),
        })
    }

    fn size(&self) -> u64 {
        self.indexer.size()
    }

    fn candidate(&self, rank: u64) -> Result<Candidate, OptimizeError> {
        let lineup = self
            .indexer
            .lineup_at(rank)
            .ok_or(OptimizeError::MissingLineup {
                rank,
                size: self.size(),
            })?;
        Ok(Candidate {
            rank,
            order: Arc::new(BattingOrder::resolve(&lineup, &self.hits)?),
            stats: SampleStats::new(),
        })
    }

    fn scored(&self, candidate: &Candidate) -> Result<ScoredLineup, OptimizeError> {
        let lineup = self
            .indexer
            .lineup_at(candidate.rank)
            .ok_or(OptimizeError::MissingLineup {
                rank: candidate.rank,
                size: self.size(),
            })?;
        Ok(ScoredLineup {
            rank: candidate.rank,
            lineup,
            score: candidate.stats.mean,
        })
    }

    /// Simulate `games` more games for `candidate`; returns just the new samples.
    fn simulate(&self, candidate: &mut Candidate, games: u64, rng: &mut StdRng) -> SampleStats {
        let mut added = SampleStats::new();
        for _ in 0..games {
            let runs = simulate_game(&candidate.order, self.innings, &self.hits, rng) as f64;
            candidate.stats.add(runs);
            added.add(runs);
        }
        added
    }

    /// Compare `incumbent` with `challenger` until the t-test separates them
    /// or both reach the sample cap. With a `shift` the test runs on the
    /// shifted pair; the winner is still decided on the true means.
    fn duel(
        &self,
        incumbent: &mut Candidate,
        challenger: &mut Candidate,
        shift: Option<MeanShift>,
        rng: &mut StdRng,
    ) -> Duel {
        let s = &self.settings;
        let mut incumbent_added = SampleStats::new();
        let mut simulations = 0;

        if incumbent.stats.n < 2 {
            incumbent_added.merge(&self.simulate(incumbent, s.warmup_games, rng));
            simulations += s.warmup_games;
        }
        if challenger.stats.n < 2 {
            self.simulate(challenger, s.warmup_games, rng);
            simulations += s.warmup_games;
        }

        let mut reached_cap = false;
        loop {
            let test = match shift {
                Some(shift) => {
                    let (a, b) = shift.apply(&incumbent.stats, &challenger.stats);
                    welch_t_test(&a, &b)
                }
                None => welch_t_test(&incumbent.stats, &challenger.stats),
            };
            let p_value = test.map_or(1.0, |t| t.p_value);
            if p_value <= s.alpha {
                break;
            }
            let cap = s.max_samples_per_lineup;
            if incumbent.stats.n >= cap && challenger.stats.n >= cap {
                reached_cap = true;
                warn!(
                    event = "comparison_at_cap",
                    incumbent = incumbent.rank,
                    challenger = challenger.rank,
                    samples = cap,
                    p_value,
                );
                break;
            }
            if incumbent.stats.n < challenger.stats.n || challenger.stats.n >= cap {
                incumbent_added.merge(&self.simulate(incumbent, s.sample_chunk, rng));
            } else {
                self.simulate(challenger, s.sample_chunk, rng);
            }
            simulations += s.sample_chunk;
        }

        Duel {
            incumbent_wins: !self
                .objective
                .prefers(challenger.stats.mean, incumbent.stats.mean),
            incumbent_added,
            simulations,
            reached_cap,
        }
    }
}

// ─── The shared champion ─────────────────────────────────────────────

struct Champion {
    live: Mutex<Candidate>,
}

impl Champion {
    fn new(candidate: Candidate) -> Self {
        Self {
            live: Mutex::new(candidate),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Candidate> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Candidate {
        self.lock().clone()
    }

    /// Install `successor` if `stale_rank` is still the live champion.
    /// Hands `successor` back otherwise.
    fn replace_if_current(&self, stale_rank: u64, successor: Candidate) -> Result<(), Candidate> {
        let mut live = self.lock();
        if live.rank == stale_rank {
            *live = successor;
            Ok(())
        } else {
            Err(successor)
        }
    }

    /// Fold `extra` samples into the live champion if it is still `rank`.
    fn merge_if_current(&self, rank: u64, extra: &SampleStats) -> bool {
        let mut live = self.lock();
        if live.rank == rank {
            live.stats.merge(extra);
            true
        } else {
            false
        }
    }
}

// ─── Worker tasks ────────────────────────────────────────────────────

#[derive(Debug)]
struct TaskOutcome {
    eliminated: Vec<u64>,
    /// A winner that could not be installed because the champion changed
    /// while the task ran; it still has to face the new champion.
    survivor: Option<Candidate>,
    simulations: u64,
    comparisons_at_cap: u64,
}

fn run_task(
    tournament: &Tournament,
    champion: &Champion,
    challengers: Vec<Candidate>,
    mut rng: StdRng,
) -> TaskOutcome {
    let mut leader = champion.snapshot();
    let champion_rank = leader.rank;
    let mut leader_is_champion = true;
    let mut champion_extra = SampleStats::new();
    let mut outcome = TaskOutcome {
        eliminated: Vec::with_capacity(challengers.len()),
        survivor: None,
        simulations: 0,
        comparisons_at_cap: 0,
    };

    for mut challenger in challengers {
        let duel = tournament.duel(&mut leader, &mut challenger, None, &mut rng);
        outcome.simulations += duel.simulations;
        outcome.comparisons_at_cap += u64::from(duel.reached_cap);
        if leader_is_champion {
            champion_extra.merge(&duel.incumbent_added);
        }
        if duel.incumbent_wins {
            outcome.eliminated.push(challenger.rank);
        } else {
            outcome.eliminated.push(leader.rank);
            leader = challenger;
            leader_is_champion = false;
        }
    }

    if leader_is_champion {
        // A failed merge means someone already beat this champion.
        champion.merge_if_current(champion_rank, &champion_extra);
    } else {
        outcome.survivor = champion.replace_if_current(champion_rank, leader).err();
    }
    outcome
}

type TaskResult = Result<TaskOutcome, OptimizeError>;

fn await_task(handle: TaskHandle<TaskOutcome>) -> TaskResult {
    match handle.wait() {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            warn!(event = "worker_failed", optimizer = "adaptive", error = %e);
            Err(e)
        }
    }
}

// ─── Aggregation state ───────────────────────────────────────────────

/// Lineups still in contention and the cursor over undrawn ranks.
#[derive(Debug)]
struct Bracket {
    /// Drawn but waiting for a task.
    pending: VecDeque<Candidate>,
    /// Every rank drawn and not yet eliminated, champion included.
    alive: BTreeSet<u64>,
    next_rank: u64,
    size: u64,
    simulations: u64,
    comparisons_at_cap: u64,
}

impl Bracket {
    fn fresh(tournament: &Tournament) -> Result<(Self, Candidate), OptimizeError> {
        let champion = tournament.candidate(0)?;
        let bracket = Self {
            pending: VecDeque::new(),
            alive: BTreeSet::from([0]),
            next_rank: 1,
            size: tournament.size(),
            simulations: 0,
            comparisons_at_cap: 0,
        };
        Ok((bracket, champion))
    }

    fn restore(
        tournament: &Tournament,
        state: &AdaptiveState,
    ) -> Result<(Self, Candidate), OptimizeError> {
        let size = tournament.size();
        let consistent = state.next_rank <= size
            && state.candidate_ranks.contains(&state.champion_rank)
            && state.candidate_ranks.iter().all(|&r| r < state.next_rank);
        if !consistent {
            return Err(OptimizeError::IncompatibleCheckpoint(format!(
                "tournament state (champion {}, next rank {}, {} survivors) does not fit {size} lineups",
                state.champion_rank,
                state.next_rank,
                state.candidate_ranks.len()
            )));
        }

        let mut champion = tournament.candidate(state.champion_rank)?;
        champion.stats = state.champion_stats;
        let pending = state
            .candidate_ranks
            .iter()
            .filter(|&&r| r != state.champion_rank)
            .map(|&r| tournament.candidate(r))
            .collect::<Result<VecDeque<_>, _>>()?;
        let bracket = Self {
            pending,
            alive: state.candidate_ranks.clone(),
            next_rank: state.next_rank,
            size,
            simulations: state.simulations_run,
            comparisons_at_cap: state.comparisons_at_cap,
        };
        Ok((bracket, champion))
    }

    fn completed(&self) -> u64 {
        self.next_rank - self.alive.len() as u64
    }

    fn exhausted(&self) -> bool {
        self.pending.is_empty() && self.next_rank >= self.size
    }

    /// Challengers for the next task: waiting survivors first, then fresh
    /// ranks. Batches shrink to one as the remaining work runs out.
    fn next_batch(
        &mut self,
        tournament: &Tournament,
        threads: usize,
    ) -> Result<Vec<Candidate>, OptimizeError> {
        let remaining = (self.size - self.next_rank) + self.pending.len() as u64;
        let max = tournament.settings.max_lineups_per_task as u64;
        let wanted = (remaining / threads.max(1) as u64).clamp(1, max) as usize;

        let mut batch = Vec::with_capacity(wanted);
        while batch.len() < wanted {
            if let Some(candidate) = self.pending.pop_front() {
                batch.push(candidate);
            } else if self.next_rank < self.size {
                batch.push(tournament.candidate(self.next_rank)?);
                self.alive.insert(self.next_rank);
                self.next_rank += 1;
            } else {
                break;
            }
        }
        Ok(batch)
    }

    fn absorb(&mut self, outcome: TaskOutcome) {
        for rank in outcome.eliminated {
            self.alive.remove(&rank);
        }
        if let Some(survivor) = outcome.survivor {
            self.pending.push_back(survivor);
        }
        self.simulations += outcome.simulations;
        self.comparisons_at_cap += outcome.comparisons_at_cap;
    }

    fn state(&self, champion: &Candidate) -> AdaptiveState {
        AdaptiveState {
            candidate_ranks: self.alive.clone(),
            next_rank: self.next_rank,
            champion_rank: champion.rank,
            champion_stats: champion.stats,
            simulations_run: self.simulations,
            comparisons_at_cap: self.comparisons_at_cap,
        }
    }

    fn snapshot(
        &self,
        tournament: &Tournament,
        champion: &Candidate,
        status: ResultStatus,
        elapsed_ms: u64,
    ) -> Result<OptimizationResult, OptimizeError> {
        let best = if champion.stats.n > 0 {
            Some(tournament.scored(champion)?)
        } else {
            None
        };
        Ok(OptimizationResult::new(OptimizerKind::Adaptive, self.size)
            .with_best(best)
            .with_progress(self.completed(), elapsed_ms)
            .with_adaptive(Some(self.state(champion)))
            .with_status(status, None))
    }
}

// ─── Optimizer ───────────────────────────────────────────────────────

impl Optimizer for AdaptiveOptimizer {
    fn kind(&self) -> OptimizerKind {
        OptimizerKind::Adaptive
    }

    fn optimize(
        &self,
        request: &OptimizeRequest,
        tracker: &ProgressTracker,
        existing: Option<&OptimizationResult>,
    ) -> Result<OptimizationResult, OptimizeError> {
        let tournament = Arc::new(Tournament::prepare(&self.config, request)?);
        let size = tournament.size();
        if let Some(existing) = existing {
            check_resumable(existing, OptimizerKind::Adaptive, size)?;
            if existing.status == ResultStatus::Complete {
                return Ok(existing.clone());
            }
        }

        let (mut bracket, champion) = match existing.and_then(|e| e.adaptive.as_ref()) {
            Some(state) => Bracket::restore(&tournament, state)?,
            None => Bracket::fresh(&tournament)?,
        };
        let champion = Arc::new(Champion::new(champion));
        // Distinct task streams for every resume of the same search.
        let epoch = bracket.simulations;
        let prior_elapsed = existing.map_or(0, |e| e.elapsed_ms);
        let buffer = self.config.adaptive.task_buffer;

        info!(
            event = "optimizer_start",
            optimizer = "adaptive",
            kind = %request.kind,
            size,
            threads = self.config.threads,
            alpha = self.config.adaptive.alpha,
            resume_from = bracket.completed(),
            survivors = bracket.alive.len(),
        );

        let pool = TaskPool::new(self.config.threads, "adaptive-worker")?;
        let started = Instant::now();
        let elapsed = || prior_elapsed + started.elapsed().as_millis() as u64;
        tracker.update_progress(bracket.snapshot(
            &tournament,
            &champion.snapshot(),
            ResultStatus::InProgress,
            elapsed(),
        )?);
        let mut last_publish = Instant::now();

        let mut task_seq = 0u64;
        let mut in_flight = VecDeque::new();
        let mut paused = false;
        loop {
            while !paused && in_flight.len() < buffer {
                let batch =
                    pool.or_cancel(&mut in_flight, bracket.next_batch(&tournament, pool.threads()))?;
                if batch.is_empty() {
                    break;
                }
                let tournament = Arc::clone(&tournament);
                let champion = Arc::clone(&champion);
                let rng = tournament.rng.rng_for(RNG_STREAM, task_seq, epoch);
                task_seq += 1;
                in_flight.push_back(
                    pool.submit(move || run_task(&tournament, &champion, batch, rng)),
                );
            }

            let Some(handle) = in_flight.pop_front() else {
                break;
            };
            bracket.absorb(pool.or_cancel(&mut in_flight, await_task(handle))?);

            if last_publish.elapsed() >= PUBLISH_SPACING {
                let snapshot = bracket.snapshot(
                    &tournament,
                    &champion.snapshot(),
                    ResultStatus::InProgress,
                    elapsed(),
                );
                let snapshot = pool.or_cancel(&mut in_flight, snapshot)?;
                debug!(
                    event = "progress",
                    optimizer = "adaptive",
                    completed = snapshot.count_completed,
                    survivors = bracket.alive.len(),
                );
                tracker.update_progress(snapshot);
                last_publish = Instant::now();
            }
            if !paused && tracker.pause_requested() {
                paused = true;
                info!(
                    event = "optimizer_pausing",
                    optimizer = "adaptive",
                    draining = in_flight.len(),
                );
            }
        }

        let mut final_champion = champion.snapshot();
        let result = if bracket.exhausted() {
            let wanted = self.config.adaptive.final_top_up_samples;
            if final_champion.stats.n < wanted {
                let games = wanted - final_champion.stats.n;
                let mut rng = tournament
                    .rng
                    .rng_for(FINAL_STREAM, final_champion.rank, epoch);
                tournament.simulate(&mut final_champion, games, &mut rng);
                bracket.simulations += games;
            }
            let mut result = bracket.snapshot(
                &tournament,
                &final_champion,
                ResultStatus::Complete,
                elapsed(),
            )?;
            // The last survivor counts as evaluated.
            result.count_completed = size;
            result
        } else {
            bracket.snapshot(&tournament, &final_champion, ResultStatus::Paused, elapsed())?
        };
        let result = tracker.update_progress(result);

        info!(
            event = "optimizer_finish",
            optimizer = "adaptive",
            status = ?result.status,
            completed = result.count_completed,
            total = size,
            best_score = result.best.as_ref().map(|b| b.score),
            simulations = bracket.simulations,
            comparisons_at_cap = bracket.comparisons_at_cap,
            elapsed_ms = result.elapsed_ms,
        );
        Ok(result)
    }

    fn estimate(
        &self,
        request: &OptimizeRequest,
        existing: Option<&OptimizationResult>,
    ) -> Result<OptimizationResult, OptimizeError> {
        let tournament = Arc::new(Tournament::prepare(&self.config, request)?);
        let size = tournament.size();
        if let Some(existing) = existing {
            check_resumable(existing, OptimizerKind::Adaptive, size)?;
        }
        let base = existing
            .cloned()
            .unwrap_or_else(|| OptimizationResult::new(OptimizerKind::Adaptive, size));
        // One comparison eliminates one lineup; the champion is never eliminated.
        let comparisons_left = size.saturating_sub(1).saturating_sub(base.count_completed);
        if size < 2 || comparisons_left == 0 {
            let elapsed_ms = base.elapsed_ms;
            return Ok(base
                .with_status(ResultStatus::Estimate, None)
                .with_estimates(Some(0), Some(elapsed_ms)));
        }

        let sample = self.sample_comparisons(&tournament)?;
        let remaining_ms =
            project_remaining_ms(comparisons_left, sample.pairs as f64 / sample.wall_ms);
        let total_ms = remaining_ms.map(|r| r.saturating_add(base.elapsed_ms));
        info!(
            event = "optimizer_estimate",
            optimizer = "adaptive",
            pairs = sample.pairs,
            range = sample.shift.range(),
            simulations = sample.simulations,
            wall_ms = sample.wall_ms,
            remaining_ms,
        );
        Ok(base
            .with_status(ResultStatus::Estimate, None)
            .with_estimates(remaining_ms, total_ms))
    }
}

// ─── Estimates ───────────────────────────────────────────────────────

/// Timed comparisons behind an adaptive estimate.
#[derive(Debug, Clone, Copy)]
struct EstimateSample {
    pairs: u64,
    shift: MeanShift,
    /// Games simulated, spread measurement included.
    simulations: u64,
    /// Wall time of the comparisons alone.
    wall_ms: f64,
}

impl AdaptiveOptimizer {
    /// Duel random pairs of distinct lineups under a [`MeanShift`] sized to
    /// the spread of lineup scores, so near-equal pairs settle quickly
    /// instead of running to the sample cap.
    fn sample_comparisons(
        &self,
        tournament: &Arc<Tournament>,
    ) -> Result<EstimateSample, OptimizeError> {
        let settings = &self.config.adaptive;
        let size = tournament.size();
        let pool = TaskPool::new(self.config.threads, "adaptive-estimate")?;

        let games = settings.estimate_spread_games;
        let mut handles: VecDeque<_> = (0..settings.estimate_spread_lineups)
            .map(|i| {
                let tournament = Arc::clone(tournament);
                let mut rng = tournament.rng.rng_for(SPREAD_STREAM, i, 0);
                pool.submit(move || -> Result<f64, OptimizeError> {
                    let mut candidate = tournament.candidate(rng.gen_range(0..size))?;
                    tournament.simulate(&mut candidate, games, &mut rng);
                    Ok(candidate.stats.mean)
                })
            })
            .collect();
        let mut spread = SampleStats::new();
        while let Some(handle) = handles.pop_front() {
            let mean = pool.or_cancel(&mut handles, handle.wait().and_then(|outcome| outcome))?;
            spread.add(mean);
        }
        let range = (spread.variance().sqrt() * settings.estimate_std_deviations)
            .max(MIN_ESTIMATE_RANGE);
        let shift = MeanShift::new(range);
        debug!(
            event = "estimate_spread",
            optimizer = "adaptive",
            lineups = spread.n,
            mean = spread.mean,
            range,
        );

        let pairs = settings.estimate_sample_pairs.max(1);
        let started = Instant::now();
        let mut handles: VecDeque<_> = (0..pairs)
            .map(|i| {
                let tournament = Arc::clone(tournament);
                let mut rng = tournament.rng.rng_for(ESTIMATE_STREAM, i, 0);
                pool.submit(move || -> Result<u64, OptimizeError> {
                    let a = rng.gen_range(0..size);
                    // Never pair a lineup with itself.
                    let b = (a + 1 + rng.gen_range(0..size - 1)) % size;
                    let mut incumbent = tournament.candidate(a)?;
                    let mut challenger = tournament.candidate(b)?;
                    Ok(tournament
                        .duel(&mut incumbent, &mut challenger, Some(shift), &mut rng)
                        .simulations)
                })
            })
            .collect();
        let mut simulations = spread.n * games;
        while let Some(handle) = handles.pop_front() {
            simulations +=
                pool.or_cancel(&mut handles, handle.wait().and_then(|outcome| outcome))?;
        }
        let wall_ms = (started.elapsed().as_secs_f64() * 1000.0).max(1e-3);

        Ok(EstimateSample {
            pairs,
            shift,
            simulations,
            wall_ms,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
