use chrono::{SecondsFormat, Utc};
use clap::Parser;
use pacman_rl_env::constants::{MAX_EPISODE_STEPS, OBSERVATION_LEN};
use pacman_rl_env::env::{EnvOptions, PacmanEnv};
use pacman_rl_env::types::CollisionPolicy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    episodes: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    lives: Option<i32>,
    #[arg(long)]
    collision: Option<String>,
    #[arg(long)]
    max_steps: Option<u32>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum EpisodeEndReason {
    LevelClear,
    GameOver,
    Truncated,
    Aborted,
}

#[derive(Clone, Debug, Serialize)]
struct EpisodeResultLine {
    episode: usize,
    seed: u32,
    steps: u32,
    score: i32,
    #[serde(rename = "totalReward")]
    total_reward: f32,
    reason: EpisodeEndReason,
    #[serde(rename = "livesLeft")]
    lives_left: i32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    step: u32,
    message: String,
}

#[derive(Clone, Debug)]
struct EpisodeRunResult {
    result: EpisodeResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "episodeCount")]
    episode_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageSteps")]
    average_steps: u32,
    #[serde(rename = "averageScore")]
    average_score: i32,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    episodes: Vec<EpisodeResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    timestamp: String,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    episode: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<u32>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let episodes = cli.episodes.unwrap_or(2).max(1);
    let base_seed = normalize_seed(
        cli.seed
            .unwrap_or_else(|| Utc::now().timestamp_millis() as u64),
    );
    let run_started_at = now_rfc3339();
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(base_seed, Utc::now().timestamp_millis() as u64));

    let options = resolve_options(&cli, base_seed);
    let mut env = match PacmanEnv::new(options.clone()) {
        Ok(env) => env,
        Err(error) => {
            emit_log(
                "error",
                "env_build_failed",
                &run_id,
                None,
                None,
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };

    let mut has_anomaly = false;
    let mut episode_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_steps = 0u64;
    let mut total_score = 0i64;
    let mut total_anomalies = 0usize;

    for episode in 0..episodes {
        let seed = base_seed.wrapping_add(episode as u32);
        emit_log(
            "info",
            "episode_started",
            &run_id,
            Some(episode),
            Some(seed),
            None,
            json!({
                "lives": options.lives,
                "collisionPolicy": options.collision_policy,
                "maxSteps": options.max_episode_steps,
            }),
        );

        let episode_run = run_episode(&mut env, episode, seed, options.max_episode_steps);

        for anomaly in &episode_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(episode),
                Some(seed),
                Some(anomaly.step),
                json!({ "message": anomaly.message }),
            );
        }

        if !episode_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += episode_run.anomaly_records.len();
        total_steps += episode_run.result.steps as u64;
        total_score += episode_run.result.score as i64;
        *reason_counts
            .entry(reason_key(episode_run.result.reason))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "episode_finished",
            &run_id,
            Some(episode),
            Some(seed),
            Some(episode_run.result.steps),
            json!({
                "reason": episode_run.result.reason,
                "score": episode_run.result.score,
                "totalReward": episode_run.result.total_reward,
                "anomalyCount": episode_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&episode_run.result).expect("episode result should serialize")
        );
        episode_results.push(episode_run.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        run_started_at,
        now_rfc3339(),
        episode_results,
        reason_counts,
        total_anomalies,
        total_steps,
        total_score,
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
        &run_id,
        None,
        None,
        None,
        json!({
            "episodeCount": summary.episode_count,
            "anomalyCount": summary.anomaly_count,
            "averageSteps": summary.average_steps,
            "averageScore": summary.average_score,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_episode(
    env: &mut PacmanEnv,
    episode: usize,
    seed: u32,
    max_steps: u32,
) -> EpisodeRunResult {
    let mut policy = StdRng::seed_from_u64(seed as u64);
    let (observation, info) = env.reset(Some(seed));

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut total_reward = 0.0f32;
    let mut steps = 0u32;
    let mut last_score = info.score;
    let mut reason = EpisodeEndReason::Aborted;

    if observation.len() != OBSERVATION_LEN {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            0,
            format!("reset observation length {}", observation.len()),
        );
    }

    loop {
        let action: usize = policy.random_range(0..4);
        let outcome = env.step(action);
        steps += 1;
        total_reward += outcome.reward;

        if !outcome.reward.is_finite() {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                steps,
                format!("non-finite reward: {}", outcome.reward),
            );
        }
        if outcome.observation.len() != OBSERVATION_LEN {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                steps,
                format!("observation length {}", outcome.observation.len()),
            );
        }
        if outcome.info.score < last_score {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                steps,
                format!(
                    "score decreased: {} -> {}",
                    last_score, outcome.info.score
                ),
            );
        }
        last_score = outcome.info.score;

        if outcome.truncated {
            reason = EpisodeEndReason::Truncated;
            break;
        }
        if outcome.terminated {
            reason = if outcome.info.game_over {
                EpisodeEndReason::GameOver
            } else {
                EpisodeEndReason::LevelClear
            };
            break;
        }
        if steps > max_steps + 16 {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                steps,
                "step safety limit exceeded".to_string(),
            );
            break;
        }
    }

    EpisodeRunResult {
        result: EpisodeResultLine {
            episode,
            seed,
            steps,
            score: env.score(),
            total_reward,
            reason,
            lives_left: env.lives(),
            anomalies,
        },
        anomaly_records,
    }
}

fn resolve_options(cli: &Cli, base_seed: u32) -> EnvOptions {
    let collision_policy = cli
        .collision
        .as_deref()
        .and_then(CollisionPolicy::parse)
        .unwrap_or(CollisionPolicy::GridExact);
    EnvOptions {
        lives: cli.lives.unwrap_or(1).clamp(1, 9),
        collision_policy,
        max_episode_steps: cli.max_steps.unwrap_or(MAX_EPISODE_STEPS).max(1),
        seed: base_seed,
        ..EnvOptions::default()
    }
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    step: u32,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        step,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("rollout-{seed}-{timestamp_ms}")
}

#[allow(clippy::too_many_arguments)]
fn build_run_summary(
    run_id: String,
    started_at: String,
    finished_at: String,
    episodes: Vec<EpisodeResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_steps: u64,
    total_score: i64,
) -> RunSummary {
    let episode_count = episodes.len();
    let (average_steps, average_score) = if episode_count == 0 {
        (0, 0)
    } else {
        (
            (total_steps / episode_count as u64) as u32,
            (total_score / episode_count as i64) as i32,
        )
    };
    RunSummary {
        run_id,
        started_at,
        finished_at,
        episode_count,
        anomaly_count,
        average_steps,
        average_score,
        reason_counts,
        episodes,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    episode: Option<usize>,
    seed: Option<u32>,
    step: Option<u32>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp: now_rfc3339(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        episode,
        seed,
        step,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn reason_key(reason: EpisodeEndReason) -> String {
    match reason {
        EpisodeEndReason::LevelClear => "level_clear",
        EpisodeEndReason::GameOver => "game_over",
        EpisodeEndReason::Truncated => "truncated",
        EpisodeEndReason::Aborted => "aborted",
    }
    .to_string()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_episode_result(reason: EpisodeEndReason, steps: u32, score: i32) -> EpisodeResultLine {
        EpisodeResultLine {
            episode: 0,
            seed: 42,
            steps,
            score,
            total_reward: 0.0,
            reason,
            lives_left: 0,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        assert_eq!(default_run_id(42, 123456789), "rollout-42-123456789");
    }

    #[test]
    fn build_run_summary_averages_steps_and_score() {
        let summary = build_run_summary(
            "rollout-42-1".to_string(),
            now_rfc3339(),
            now_rfc3339(),
            vec![
                make_episode_result(EpisodeEndReason::GameOver, 100, 300),
                make_episode_result(EpisodeEndReason::Truncated, 300, 500),
            ],
            BTreeMap::from([
                ("game_over".to_string(), 1usize),
                ("truncated".to_string(), 1usize),
            ]),
            1,
            400,
            800,
        );
        assert_eq!(summary.average_steps, 200);
        assert_eq!(summary.average_score, 400);
        assert_eq!(summary.episode_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("pacman-rollout-missing-{}", Utc::now().timestamp_millis()))
            .join("summary.json");
        let summary = build_run_summary(
            "rollout-1-1".to_string(),
            now_rfc3339(),
            now_rfc3339(),
            vec![make_episode_result(EpisodeEndReason::GameOver, 10, 0)],
            BTreeMap::from([("game_over".to_string(), 1usize)]),
            0,
            10,
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            10,
            "same anomaly".to_string(),
        );
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            11,
            "same anomaly".to_string(),
        );

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].step, 10);
        assert_eq!(records[1].step, 11);
    }

    #[test]
    fn random_policy_episode_terminates_and_reports() {
        let mut env = PacmanEnv::new(EnvOptions {
            max_episode_steps: 50,
            seed: 7,
            ..EnvOptions::default()
        })
        .unwrap();
        let episode_run = run_episode(&mut env, 0, 7, 50);
        assert!(episode_run.result.steps > 0);
        assert!(episode_run.result.steps <= 51);
        assert_ne!(episode_run.result.reason, EpisodeEndReason::Aborted);
        assert!(episode_run.result.anomalies.is_empty());
    }
}
