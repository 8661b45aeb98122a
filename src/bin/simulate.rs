use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_chase::constants::{STARTING_LIVES, TICK_DT};
use maze_chase::decision::{PlayerController, TablePolicy};
use maze_chase::engine::{GameEngine, GameEngineOptions, SessionMode};
use maze_chase::error::GameError;
use maze_chase::types::{RuntimeEvent, SessionOutcome, Snapshot};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run a single custom scenario instead of the built-in list.
    #[arg(long)]
    single: bool,
    #[arg(long)]
    sessions: Option<u32>,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    step_limit: Option<u64>,
    #[arg(long)]
    level: Option<usize>,
    #[arg(long)]
    lives: Option<i32>,
    /// Trained policy artifact; the built-in greedy policy plays otherwise.
    #[arg(long)]
    policy: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    sessions: u32,
    #[serde(rename = "stepLimit")]
    step_limit: u64,
    level: usize,
    lives: i32,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct SessionResultLine {
    scenario: String,
    session: u32,
    seed: u32,
    outcome: SessionOutcome,
    score: u32,
    level: usize,
    ticks: u64,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    captures: u32,
    #[serde(rename = "fruitsTaken")]
    fruits_taken: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "generatedAt")]
    generated_at: String,
    policy: String,
    #[serde(rename = "sessionCount")]
    session_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "bestScore")]
    best_score: u32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    sessions: Vec<SessionResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    timestamp: String,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| format!("sim-{seed_hint}"));

    let policy = match load_policy(cli.policy.as_deref()) {
        Ok(policy) => policy,
        Err(error) => {
            emit_log(
                "error",
                "policy_load_failed",
                &run_id,
                None,
                None,
                None,
                json!({ "error": error.to_string(), "recoverable": error.is_recoverable() }),
            );
            std::process::exit(2);
        }
    };
    let policy_name = policy.name.clone();

    let mut session_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;
    let mut has_anomaly = false;

    for scenario in &scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "sessions": scenario.sessions,
                "stepLimit": scenario.step_limit,
                "level": scenario.level,
                "lives": scenario.lives,
            }),
        );

        for session in 0..scenario.sessions {
            let seed = scenario.seed.wrapping_add(session);
            let (line, anomaly_records) = match run_session(scenario, session, seed, &policy) {
                Ok(run) => run,
                Err(error) => {
                    emit_log(
                        "error",
                        "session_failed",
                        &run_id,
                        Some(&scenario.name),
                        Some(seed),
                        None,
                        json!({ "error": error.to_string() }),
                    );
                    std::process::exit(2);
                }
            };

            for anomaly in &anomaly_records {
                emit_log(
                    "warn",
                    "anomaly_detected",
                    &run_id,
                    Some(&scenario.name),
                    Some(seed),
                    Some(anomaly.tick),
                    json!({ "message": anomaly.message }),
                );
            }
            if !line.anomalies.is_empty() {
                has_anomaly = true;
            }
            total_anomalies += anomaly_records.len();
            *outcome_counts.entry(outcome_key(line.outcome)).or_insert(0) += 1;

            println!(
                "{}",
                serde_json::to_string(&line).expect("session result should serialize")
            );
            session_results.push(line);
        }
    }

    let summary = build_run_summary(
        run_id.clone(),
        policy_name,
        session_results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({ "path": path.to_string_lossy(), "error": error.to_string() }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "sessionCount": summary.session_count,
            "anomalyCount": summary.anomaly_count,
            "averageScore": summary.average_score,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn load_policy(path: Option<&Path>) -> Result<TablePolicy, GameError> {
    match path {
        Some(path) => TablePolicy::from_file(path),
        None => Ok(TablePolicy::greedy_default()),
    }
}

fn run_session(
    scenario: &Scenario,
    session: u32,
    seed: u32,
    policy: &TablePolicy,
) -> Result<(SessionResultLine, Vec<AnomalyRecord>), GameError> {
    let options = GameEngineOptions {
        mode: SessionMode::Automated {
            step_limit: scenario.step_limit,
        },
        start_level: scenario.level,
        starting_lives: scenario.lives,
        seed,
    };
    let mut engine = GameEngine::new(options, PlayerController::Policy(policy.clone()))?;

    let mut ghosts_eaten = 0;
    let mut captures = 0;
    let mut fruits_taken = 0;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut last_score = 0u32;

    while !engine.is_ended() {
        engine.step(TICK_DT)?;
        let snapshot = engine.build_snapshot(true);

        for message in collect_snapshot_anomalies(&snapshot, last_score) {
            anomaly_records.push(AnomalyRecord {
                tick: snapshot.tick,
                message: message.clone(),
            });
            if !anomalies.contains(&message) {
                anomalies.push(message);
            }
        }
        last_score = snapshot.score;

        for event in &snapshot.events {
            match event {
                RuntimeEvent::GhostEaten { .. } => ghosts_eaten += 1,
                RuntimeEvent::PlayerCaptured { .. } => captures += 1,
                RuntimeEvent::FruitTaken { .. } => fruits_taken += 1,
                _ => {}
            }
        }
    }

    let result = engine.result();
    Ok((
        SessionResultLine {
            scenario: scenario.name.clone(),
            session,
            seed,
            outcome: result.outcome,
            score: result.score,
            level: result.level,
            ticks: result.ticks,
            pellets_eaten: engine.pellets_eaten(),
            ghosts_eaten,
            captures,
            fruits_taken,
            anomalies,
        },
        anomaly_records,
    ))
}

/// Invariant checks over the read-only snapshot; anything tripping here is
/// an engine bug, not a gameplay outcome.
fn collect_snapshot_anomalies(snapshot: &Snapshot, last_score: u32) -> Vec<String> {
    let mut anomalies = Vec::new();

    if snapshot.score < last_score {
        anomalies.push(format!(
            "score went backwards: {} -> {}",
            last_score, snapshot.score
        ));
    }
    if snapshot.lives < -1 {
        anomalies.push(format!("lives below terminal floor: {}", snapshot.lives));
    }

    for (label, position, tile, target) in std::iter::once((
        "player".to_string(),
        snapshot.player.position,
        snapshot.player.tile,
        snapshot.player.target_tile,
    ))
    .chain(snapshot.ghosts.iter().map(|ghost| {
        (
            format!("{:?}", ghost.ghost_type),
            ghost.position,
            ghost.tile,
            ghost.target_tile,
        )
    })) {
        let a = tile.position();
        let b = target.position();
        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
        let eps = 1e-3;
        let on_segment = position.x >= min_x - eps
            && position.x <= max_x + eps
            && position.y >= min_y - eps
            && position.y <= max_y + eps;
        if !on_segment {
            anomalies.push(format!(
                "{label} off its link: ({}, {}) outside ({}, {})..({}, {})",
                position.x, position.y, a.x, a.y, b.x, b.y
            ));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or(424_242);
    let step_limit = cli.step_limit.unwrap_or(20_000);
    let level = cli.level.unwrap_or(0);
    let lives = cli.lives.unwrap_or(STARTING_LIVES).clamp(0, 99);

    if cli.single || cli.sessions.is_some() || cli.step_limit.is_some() {
        let sessions = cli.sessions.unwrap_or(1).clamp(1, 1_000);
        return vec![Scenario {
            name: format!("custom-x{sessions}"),
            sessions,
            step_limit,
            level,
            lives,
            seed,
        }];
    }

    vec![
        Scenario {
            name: "quick-check".to_string(),
            sessions: 2,
            step_limit: 5_000,
            level,
            lives,
            seed,
        },
        Scenario {
            name: "full-run".to_string(),
            sessions: 3,
            step_limit: 40_000,
            level,
            lives,
            seed: seed.wrapping_add(1),
        },
    ]
}

fn outcome_key(outcome: SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Win => "win",
        SessionOutcome::Loss => "loss",
        SessionOutcome::Truncated => "truncated",
    }
    .to_string()
}

fn build_run_summary(
    run_id: String,
    policy: String,
    sessions: Vec<SessionResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let session_count = sessions.len();
    let average_score = if session_count == 0 {
        0
    } else {
        sessions.iter().map(|line| line.score).sum::<u32>() / session_count as u32
    };
    let best_score = sessions.iter().map(|line| line.score).max().unwrap_or(0);
    RunSummary {
        run_id,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        policy,
        session_count,
        anomaly_count,
        average_score,
        best_score,
        outcome_counts,
        sessions,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_chase::types::{Direction, PlayerView, Tile, Vec2};

    fn make_result_line(outcome: SessionOutcome, score: u32) -> SessionResultLine {
        SessionResultLine {
            scenario: "test".to_string(),
            session: 0,
            seed: 42,
            outcome,
            score,
            level: 0,
            ticks: 100,
            pellets_eaten: 0,
            ghosts_eaten: 0,
            captures: 0,
            fruits_taken: 0,
            anomalies: Vec::new(),
        }
    }

    fn snapshot_with_player(position: Vec2, tile: Tile, target: Tile) -> Snapshot {
        Snapshot {
            tick: 1,
            score: 0,
            lives: 5,
            level: 0,
            paused: false,
            player: PlayerView {
                tile,
                target_tile: target,
                position,
                direction: Direction::Right,
                alive: true,
                visible: true,
            },
            ghosts: Vec::new(),
            pellets: Vec::new(),
            fruit: None,
            pellets_eaten: 0,
            message: None,
            background_flash: false,
            events: Vec::new(),
        }
    }

    #[test]
    fn build_run_summary_averages_scores() {
        let summary = build_run_summary(
            "sim-1".to_string(),
            "greedy-default".to_string(),
            vec![
                make_result_line(SessionOutcome::Truncated, 100),
                make_result_line(SessionOutcome::Win, 300),
            ],
            BTreeMap::from([
                ("truncated".to_string(), 1usize),
                ("win".to_string(), 1usize),
            ]),
            0,
        );
        assert_eq!(summary.average_score, 200);
        assert_eq!(summary.best_score, 300);
        assert_eq!(summary.session_count, 2);
    }

    #[test]
    fn on_segment_anomaly_fires_only_off_the_link() {
        let on = snapshot_with_player(Vec2::new(24.0, 0.0), Tile::new(0, 0), Tile::new(3, 0));
        assert!(collect_snapshot_anomalies(&on, 0).is_empty());

        let off = snapshot_with_player(Vec2::new(24.0, 40.0), Tile::new(0, 0), Tile::new(3, 0));
        let anomalies = collect_snapshot_anomalies(&off, 0);
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].contains("off its link"));
    }

    #[test]
    fn score_regression_is_an_anomaly() {
        let snapshot = snapshot_with_player(Vec2::new(0.0, 0.0), Tile::new(0, 0), Tile::new(0, 0));
        let anomalies = collect_snapshot_anomalies(&snapshot, 500);
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].contains("score went backwards"));
    }

    #[test]
    fn custom_flags_collapse_to_a_single_scenario() {
        let cli = Cli::parse_from(["simulate", "--sessions", "4", "--seed", "9"]);
        let scenarios = resolve_scenarios(&cli);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].sessions, 4);
        assert_eq!(scenarios[0].seed, 9);
    }

    #[test]
    fn default_scenarios_cover_quick_and_full_runs() {
        let cli = Cli::parse_from(["simulate"]);
        let scenarios = resolve_scenarios(&cli);
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].name, "quick-check");
        assert_eq!(scenarios[1].name, "full-run");
    }

    #[test]
    fn write_summary_reports_missing_parent_directories() {
        let target = std::env::temp_dir()
            .join("maze-chase-missing-dir")
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1".to_string(),
            "greedy-default".to_string(),
            vec![make_result_line(SessionOutcome::Loss, 10)],
            BTreeMap::from([("loss".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }
}
