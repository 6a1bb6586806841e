use clap::Parser;
use ghost_racer_server::constants::TICK_MS;
use ghost_racer_server::server_utils::{normalize_mode, normalize_preset};
use ghost_racer_server::session::{is_blocked, Autopilot, GameSession, SessionConfig};
use ghost_racer_server::types::{GameOverReason, MoveMode, Preset, RuntimeEvent, Snapshot};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    minutes: Option<i32>,
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    mode: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    preset: Preset,
    mode: MoveMode,
    minutes: i32,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    preset: Preset,
    mode: MoveMode,
    minutes: i32,
    reason: GameOverReason,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    score: u32,
    #[serde(rename = "ghostsSpawned")]
    ghosts_spawned: usize,
    #[serde(rename = "trajectoryLen")]
    trajectory_len: usize,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "averageScore")]
    average_score: f64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "preset": scenario.preset,
                "mode": scenario.mode,
                "minutes": scenario.minutes,
            }),
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *reason_counts
            .entry(game_over_reason_key(scenario_run.result.reason))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "reason": scenario_run.result.reason,
                "durationMs": scenario_run.result.duration_ms,
                "score": scenario_run.result.score,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).expect("scenario result should serialize")
        );
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        reason_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "averageScore": summary.average_score,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    let config = SessionConfig::preset(scenario.preset)
        .with_mode(scenario.mode)
        .with_time_limit(Some(scenario.minutes as u64 * 60_000));
    let mut session = match GameSession::new(config, scenario.seed) {
        Ok(session) => session,
        Err(error) => {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                0,
                format!("session failed to start: {error}"),
            );
            return ScenarioRunResult {
                result: ScenarioResultLine {
                    scenario: scenario.name.clone(),
                    seed: scenario.seed,
                    preset: scenario.preset,
                    mode: scenario.mode,
                    minutes: scenario.minutes,
                    reason: GameOverReason::TimeUp,
                    duration_ms: 0,
                    score: 0,
                    ghosts_spawned: 0,
                    trajectory_len: 0,
                    anomalies,
                },
                anomaly_records,
                finished_tick: 0,
            };
        }
    };

    let mut pilot = Autopilot::new();
    let mut previous_score = 0u32;
    let mut tick_safety = 0usize;
    let mut last_tick = 0u64;
    let tick_limit = scenario.minutes as usize * 60 * 70;

    while !session.is_ended() {
        let keys = pilot.keys(
            session.config().mode,
            session.grid(),
            session.car(),
            session.depot().cell(),
        );
        if let Err(error) = session.step(TICK_MS, keys) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                session.tick(),
                format!("session aborted: {error}"),
            );
            break;
        }
        if is_blocked(session.grid(), &session.car().hitbox()) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                session.tick(),
                "car left the road".to_string(),
            );
        }

        let snapshot = session.build_snapshot(true);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(&snapshot, previous_score) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        previous_score = snapshot.score;

        tick_safety += 1;
        if tick_safety > tick_limit {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }
    }

    let summary = session.build_summary();
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            preset: scenario.preset,
            mode: scenario.mode,
            minutes: scenario.minutes,
            reason: summary.reason,
            duration_ms: summary.duration_ms,
            score: summary.score,
            ghosts_spawned: summary.ghosts_spawned,
            trajectory_len: session.recorder().trajectory().len(),
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    }
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, previous_score: u32) -> Vec<String> {
    let mut anomalies = Vec::new();
    if !snapshot.car.x.is_finite() || !snapshot.car.y.is_finite() {
        anomalies.push(format!(
            "car position is not finite: ({}, {})",
            snapshot.car.x, snapshot.car.y
        ));
    }
    if snapshot.score < previous_score {
        anomalies.push(format!(
            "score regressed: {previous_score} -> {}",
            snapshot.score
        ));
    }

    for ghost in &snapshot.ghosts {
        if ghost.playback_index >= snapshot.trajectory_len {
            anomalies.push(format!(
                "ghost {} playback ahead of trajectory: {} >= {}",
                ghost.id, ghost.playback_index, snapshot.trajectory_len
            ));
        }
        if !ghost.x.is_finite() || !ghost.y.is_finite() {
            anomalies.push(format!("ghost {} position is not finite", ghost.id));
        }
    }

    let scored = snapshot
        .events
        .iter()
        .filter(|event| matches!(event, RuntimeEvent::Scored { .. }))
        .count();
    if scored > 1 {
        anomalies.push(format!("collectible scored {scored} times in one tick"));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));

    if cli.single || cli.minutes.is_some() || cli.preset.is_some() || cli.mode.is_some() {
        let preset = normalize_preset(cli.preset.as_deref());
        let mode = normalize_mode(cli.mode.as_deref());
        return vec![Scenario {
            name: format!("custom-{}-{}", preset_key(preset), mode_key(mode)),
            preset,
            mode,
            minutes: cli.minutes.unwrap_or(2).clamp(1, 10),
            seed,
        }];
    }

    vec![
        Scenario {
            name: "classic-physics".to_string(),
            preset: Preset::Classic,
            mode: MoveMode::Physics,
            minutes: 2,
            seed,
        },
        Scenario {
            name: "fast-grid-step".to_string(),
            preset: Preset::Fast,
            mode: MoveMode::GridStep,
            minutes: 2,
            seed: normalize_seed(seed as u64 + 1),
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn preset_key(preset: Preset) -> &'static str {
    match preset {
        Preset::Classic => "classic",
        Preset::Fast => "fast",
    }
}

fn mode_key(mode: MoveMode) -> &'static str {
    match mode {
        MoveMode::Physics => "physics",
        MoveMode::GridStep => "grid-step",
    }
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_duration_ms: u64 = scenarios.iter().map(|s| s.duration_ms).sum();
    let total_score: u64 = scenarios.iter().map(|s| u64::from(s.score)).sum();
    let (average_duration_ms, average_score) = if scenario_count == 0 {
        (0, 0.0)
    } else {
        (
            total_duration_ms / scenario_count as u64,
            total_score as f64 / scenario_count as f64,
        )
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        average_score,
        reason_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
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

fn game_over_reason_key(reason: GameOverReason) -> String {
    match reason {
        GameOverReason::Caught => "caught",
        GameOverReason::TimeUp => "time_up",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
