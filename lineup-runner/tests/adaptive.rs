//! Integration tests for the adaptive (t-test tournament) optimizer.

use std::collections::BTreeSet;

use lineup_core::{Gender, LineupKind, OutcomeCounts, Player, PlayerId, Roster};
use lineup_runner::{
    AdaptiveOptimizer, ExhaustiveOptimizer, Objective, OptimizationResult, OptimizeError,
    OptimizeRequest, Optimizer, OptimizerConfig, OptimizerKind, ProgressTracker, ResultStatus,
};

// ─── Shared helpers ──────────────────────────────────────────────────

fn outcomes(outs: u32, singles: u32, home_runs: u32) -> OutcomeCounts {
    OutcomeCounts {
        outs,
        singles,
        home_runs,
        ..OutcomeCounts::default()
    }
}

fn request(players: Vec<Player>) -> OptimizeRequest {
    OptimizeRequest::whole_roster(Roster::new(players).unwrap(), LineupKind::Standard)
}

/// Lineups led by the slugger score exactly 11 runs; every other lineup
/// scores exactly 10.
fn slugger_request() -> OptimizeRequest {
    request(vec![
        Player::new("o1", "Out One", Gender::Male, outcomes(1, 0, 0)),
        Player::new("o2", "Out Two", Gender::Male, outcomes(1, 0, 0)),
        Player::new("slugger", "Slugger", Gender::Male, outcomes(0, 0, 1)),
    ])
}

fn stochastic_request() -> OptimizeRequest {
    request(
        (0..4)
            .map(|i| {
                Player::new(
                    format!("p{i}"),
                    format!("Player {i}"),
                    Gender::Male,
                    outcomes(5 + 2 * i, 3, 1),
                )
            })
            .collect(),
    )
}

fn config() -> OptimizerConfig {
    let mut config = OptimizerConfig::default();
    config.threads = 2;
    config.adaptive.max_samples_per_lineup = 40;
    config.adaptive.final_top_up_samples = 20;
    config
}

fn tracker_for(size: u64) -> ProgressTracker {
    ProgressTracker::new(OptimizationResult::new(OptimizerKind::Adaptive, size), 2)
}

// ─── Tournament outcomes ─────────────────────────────────────────────

#[test]
fn dominant_lineup_wins_the_tournament() {
    let result = AdaptiveOptimizer::new(config())
        .optimize(&slugger_request(), &tracker_for(6), None)
        .unwrap();

    assert_eq!(result.status, ResultStatus::Complete);
    assert_eq!(result.count_total, 6);
    assert_eq!(result.count_completed, 6);
    let best = result.best.unwrap();
    assert_eq!(best.score, 11.0);
    assert_eq!(best.lineup.batter(0), &PlayerId::new("slugger"));

    let state = result.adaptive.unwrap();
    assert_eq!(state.candidate_ranks, BTreeSet::from([best.rank]));
    assert_eq!(state.next_rank, 6);
    assert!(state.champion_stats.n >= 20);
    // The two slugger-first lineups are identical and can only be told apart
    // by hitting the cap.
    assert!(state.comparisons_at_cap >= 1);
}

#[test]
fn adaptive_agrees_with_exhaustive_on_exact_scores() {
    let mut exhaustive_config = config();
    exhaustive_config.exhaustive.games = 5;
    let exhaustive = ExhaustiveOptimizer::new(exhaustive_config)
        .optimize(&slugger_request(), &tracker_for(6), None)
        .unwrap();
    let adaptive = AdaptiveOptimizer::new(config())
        .optimize(&slugger_request(), &tracker_for(6), None)
        .unwrap();
    assert_eq!(
        adaptive.best.unwrap().score,
        exhaustive.best.unwrap().score
    );
}

#[test]
fn lowest_objective_picks_a_weak_lineup() {
    let mut config = config();
    config.objective = Objective::Lowest;
    let result = AdaptiveOptimizer::new(config)
        .optimize(&slugger_request(), &tracker_for(6), None)
        .unwrap();
    let best = result.best.unwrap();
    assert_eq!(best.score, 10.0);
    assert_ne!(best.lineup.batter(0), &PlayerId::new("slugger"));
}

#[test]
fn noisy_roster_runs_to_completion() {
    let mut config = config();
    config.adaptive.max_samples_per_lineup = 2000;
    config.adaptive.final_top_up_samples = 500;
    let result = AdaptiveOptimizer::new(config)
        .optimize(&stochastic_request(), &tracker_for(24), None)
        .unwrap();

    assert_eq!(result.status, ResultStatus::Complete);
    assert_eq!(result.count_completed, 24);
    let best = result.best.unwrap();
    let state = result.adaptive.unwrap();
    assert_eq!(state.champion_rank, best.rank);
    assert_eq!(state.candidate_ranks.len(), 1);
    assert!(state.champion_stats.n >= 500);
    assert!(state.simulations_run >= 500 + 23 * 10);
    assert!((best.score - state.champion_stats.mean).abs() < 1e-12);
}

// ─── Pause and resume ────────────────────────────────────────────────

#[test]
fn pause_keeps_survivors_and_resume_finishes() {
    let mut config = config();
    config.adaptive.task_buffer = 1;
    let optimizer = AdaptiveOptimizer::new(config);

    let tracker = tracker_for(6);
    tracker.request_pause();
    let paused = optimizer
        .optimize(&slugger_request(), &tracker, None)
        .unwrap();
    assert_eq!(paused.status, ResultStatus::Paused);
    // One task of two challengers ran; both lost to the champion.
    assert_eq!(paused.count_completed, 2);
    let state = paused.adaptive.clone().unwrap();
    assert_eq!(state.next_rank, 3);
    assert!(state.champion_stats.n >= 10);

    let resumed = optimizer
        .optimize(&slugger_request(), &tracker_for(6), Some(&paused))
        .unwrap();
    assert_eq!(resumed.status, ResultStatus::Complete);
    assert_eq!(resumed.count_completed, 6);
    assert_eq!(resumed.best.unwrap().score, 11.0);
    let resumed_state = resumed.adaptive.unwrap();
    assert!(resumed_state.simulations_run > state.simulations_run);
    assert!(resumed_state.champion_stats.n >= state.champion_stats.n);
}

#[test]
fn exhaustive_checkpoint_cannot_resume_adaptive() {
    let exhaustive = OptimizationResult::new(OptimizerKind::Exhaustive, 6)
        .with_status(ResultStatus::Paused, None);
    let err = AdaptiveOptimizer::new(config())
        .optimize(&slugger_request(), &tracker_for(6), Some(&exhaustive))
        .unwrap_err();
    assert!(matches!(err, OptimizeError::IncompatibleCheckpoint(_)));
}

// ─── Estimates ───────────────────────────────────────────────────────

#[test]
fn estimate_projects_remaining_comparisons() {
    let mut config = config();
    config.adaptive.max_samples_per_lineup = 500;
    config.adaptive.estimate_sample_pairs = 4;
    let estimate = AdaptiveOptimizer::new(config)
        .estimate(&stochastic_request(), None)
        .unwrap();
    assert_eq!(estimate.status, ResultStatus::Estimate);
    assert!(estimate.estimated_time_remaining_ms.is_some());
}

#[test]
fn single_player_needs_no_comparisons() {
    let request = request(vec![Player::new(
        "solo",
        "Solo",
        Gender::Female,
        outcomes(2, 1, 0),
    )]);
    let optimizer = AdaptiveOptimizer::new(config());
    let estimate = optimizer.estimate(&request, None).unwrap();
    assert_eq!(estimate.estimated_time_remaining_ms, Some(0));
    assert_eq!(estimate.estimated_total_ms, Some(0));

    let paused = OptimizationResult::new(OptimizerKind::Adaptive, 1)
        .with_progress(0, 120)
        .with_status(ResultStatus::Paused, None);
    let resumed_estimate = optimizer.estimate(&request, Some(&paused)).unwrap();
    assert_eq!(resumed_estimate.estimated_total_ms, Some(120));

    let result = optimizer.optimize(&request, &tracker_for(1), None).unwrap();
    assert_eq!(result.status, ResultStatus::Complete);
    assert_eq!(result.count_completed, 1);
    assert_eq!(result.adaptive.unwrap().champion_stats.n, 20);
}
