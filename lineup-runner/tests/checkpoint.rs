//! Checkpoint persistence: save a paused search, load it back, resume.

use anyhow::Result;
use tempfile::TempDir;

use lineup_core::{Gender, LineupKind, OutcomeCounts, Player, Roster};
use lineup_runner::{
    load_checkpoint, save_checkpoint, AdaptiveOptimizer, CheckpointError, ExhaustiveOptimizer,
    OptimizationResult, OptimizeRequest, Optimizer, OptimizerConfig, OptimizerKind,
    ProgressTracker, ResultStatus,
};

fn request() -> OptimizeRequest {
    let players = (0..4)
        .map(|i| {
            Player::new(
                format!("p{i}"),
                format!("Player {i}"),
                if i % 2 == 0 { Gender::Male } else { Gender::Female },
                OutcomeCounts {
                    outs: 6 + i,
                    singles: 3,
                    doubles: 1,
                    walks: i % 2,
                    ..OutcomeCounts::default()
                },
            )
        })
        .collect();
    OptimizeRequest::whole_roster(Roster::new(players).unwrap(), LineupKind::Standard)
}

fn config() -> OptimizerConfig {
    let mut config = OptimizerConfig::default();
    config.threads = 2;
    config.exhaustive.games = 100;
    config.exhaustive.task_buffer = 3;
    config.adaptive.task_buffer = 1;
    config.adaptive.max_samples_per_lineup = 1000;
    config.adaptive.final_top_up_samples = 100;
    config
}

fn paused_tracker(kind: OptimizerKind) -> ProgressTracker {
    let tracker = ProgressTracker::new(OptimizationResult::new(kind, 24), 2);
    tracker.request_pause();
    tracker
}

fn fresh_tracker(kind: OptimizerKind) -> ProgressTracker {
    ProgressTracker::new(OptimizationResult::new(kind, 24), 2)
}

#[test]
fn exhaustive_resumes_from_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested/runs/exhaustive.json");
    let optimizer = ExhaustiveOptimizer::new(config());

    let paused = optimizer.optimize(&request(), &paused_tracker(OptimizerKind::Exhaustive), None)?;
    assert_eq!(paused.status, ResultStatus::Paused);
    save_checkpoint(&path, &paused)?;
    assert!(!path.with_file_name("exhaustive.json.tmp").exists());

    let checkpoint = load_checkpoint(&path)?;
    assert_eq!(checkpoint.optimizer, OptimizerKind::Exhaustive);
    assert_eq!(checkpoint.result, paused);

    let resumed = optimizer.optimize(
        &request(),
        &fresh_tracker(OptimizerKind::Exhaustive),
        Some(&checkpoint.result),
    )?;
    let uninterrupted =
        optimizer.optimize(&request(), &fresh_tracker(OptimizerKind::Exhaustive), None)?;
    assert_eq!(resumed.status, ResultStatus::Complete);
    assert_eq!(resumed.best, uninterrupted.best);
    assert_eq!(resumed.histogram, uninterrupted.histogram);
    Ok(())
}

#[test]
fn adaptive_state_survives_serialization() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("adaptive.json");
    let optimizer = AdaptiveOptimizer::new(config());

    let paused = optimizer.optimize(&request(), &paused_tracker(OptimizerKind::Adaptive), None)?;
    assert_eq!(paused.status, ResultStatus::Paused);
    save_checkpoint(&path, &paused)?;

    let checkpoint = load_checkpoint(&path)?;
    let state = checkpoint.result.adaptive.clone().expect("tournament state");
    assert_eq!(Some(&state), paused.adaptive.as_ref());
    assert!(state.candidate_ranks.contains(&state.champion_rank));

    let resumed = optimizer.optimize(
        &request(),
        &fresh_tracker(OptimizerKind::Adaptive),
        Some(&checkpoint.result),
    )?;
    assert_eq!(resumed.status, ResultStatus::Complete);
    assert_eq!(resumed.count_completed, 24);
    Ok(())
}

#[test]
fn overwriting_keeps_the_latest_result() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("search.json");
    let first = OptimizationResult::new(OptimizerKind::Exhaustive, 24)
        .with_progress(3, 100)
        .with_status(ResultStatus::Paused, None);
    let second = first.clone().with_progress(9, 250);
    save_checkpoint(&path, &first)?;
    save_checkpoint(&path, &second)?;
    assert_eq!(load_checkpoint(&path)?.result.count_completed, 9);
    Ok(())
}

#[test]
fn garbage_is_reported_as_json_error() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json")?;
    assert!(matches!(load_checkpoint(&path), Err(CheckpointError::Json(_))));
    assert!(matches!(
        load_checkpoint(&dir.path().join("missing.json")),
        Err(CheckpointError::Io(_))
    ));
    Ok(())
}
