use clap::{Parser, ValueEnum};
use ghost_chase::constants::TICK_MS;
use ghost_chase::engine::{GameEngine, GameEngineOptions};
use ghost_chase::grid::nearest_free_cell;
use ghost_chase::maps::{maze_map, open_map, pacman_map, random_map, MapLayout};
use ghost_chase::rng::Rng;
use ghost_chase::types::{GameEvent, GameSetup, GameState, GhostLevel, PlayerRanking, Position};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    players: Option<usize>,
    #[arg(long)]
    ghost_level: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 2_000)]
    max_ticks: u64,
    #[arg(long, value_enum)]
    map: Option<MapKind>,
    #[arg(long, default_value_t = 4)]
    frames_per_tick: u64,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
enum MapKind {
    Pacman,
    Maze,
    Open,
    Random,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    name: String,
    players: usize,
    ghost_level: GhostLevel,
    map: MapKind,
    seed: u32,
    max_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    players: usize,
    ghost_level: u8,
    map: MapKind,
    ticks: u64,
    finished: bool,
    winner: Option<usize>,
    eliminations: usize,
    first_capture_tick: Option<u64>,
    rankings: Vec<PlayerRanking>,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
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
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    match_id: String,
    started_at: String,
    finished_at: String,
    scenario_count: usize,
    anomaly_count: usize,
    average_ticks: u64,
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let base_options = match cli.config.as_deref().map(load_options).transpose() {
        Ok(options) => options.unwrap_or_default(),
        Err(err) => {
            error!(error = %err, "failed to load engine config");
            std::process::exit(2);
        }
    };
    let scenarios = resolve_scenarios(&cli);
    let started_at = chrono::Utc::now();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, started_at.timestamp_millis()));
    let frames_per_tick = cli.frames_per_tick.max(1);

    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_ticks = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            players = scenario.players,
            ghost_level = scenario.ghost_level.number(),
            "scenario started"
        );
        let run = run_scenario(&scenario, &base_options, frames_per_tick);

        for anomaly in &run.anomaly_records {
            warn!(
                match_id = %match_id,
                scenario = %scenario.name,
                tick = anomaly.tick,
                message = %anomaly.message,
                "anomaly detected"
            );
        }

        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run.anomaly_records.len();
        total_ticks += run.result.ticks;
        *outcome_counts
            .entry(outcome_key(&run.result).to_string())
            .or_insert(0) += 1;

        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            ticks = run.result.ticks,
            winner = ?run.result.winner,
            eliminations = run.result.eliminations,
            anomalies = run.anomaly_records.len(),
            "scenario finished"
        );

        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(err) => {
                error!(error = %err, "failed to serialize scenario result");
                std::process::exit(2);
            }
        }
        scenario_results.push(run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        started_at.to_rfc3339(),
        chrono::Utc::now().to_rfc3339(),
        scenario_results,
        outcome_counts,
        total_anomalies,
        total_ticks,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            error!(path = %path.display(), error = %err, "summary write failed");
            std::process::exit(2);
        }
    }

    info!(
        match_id = %match_id,
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        average_ticks = summary.average_ticks,
        summary_out = ?cli.summary_out,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn load_options(path: &Path) -> Result<GameEngineOptions, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn build_layout(map: MapKind, seed: u32) -> MapLayout {
    let mut rng = Rng::new(seed ^ 0x9e37_79b9);
    match map {
        MapKind::Pacman => pacman_map(),
        MapKind::Maze => maze_map(21, 13, &mut rng),
        MapKind::Open => open_map(15, 11),
        MapKind::Random => random_map(17, 13, None, &mut rng),
    }
}

fn run_scenario(
    scenario: &Scenario,
    base_options: &GameEngineOptions,
    frames_per_tick: u64,
) -> ScenarioRunResult {
    let MapLayout { map_size, walls } = build_layout(scenario.map, scenario.seed);
    let center = Position::new(map_size.width / 2, map_size.height / 2);
    let ghost = nearest_free_cell(center, map_size, &walls, &[]).unwrap_or(center);
    let options = GameEngineOptions {
        max_players: base_options.max_players.max(scenario.players),
        ghost_level: scenario.ghost_level,
        seed: scenario.seed,
        ..base_options.clone()
    };
    let mut engine = GameEngine::new(
        GameSetup {
            players: Vec::new(),
            ghost,
            map_size,
            walls,
        },
        options,
    );

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    for _ in 0..scenario.players {
        if let Err(err) = engine.add_player_to_corner() {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                0,
                format!("player placement failed: {err}"),
            );
            break;
        }
    }
    engine.drain_events();
    engine.start();

    let mut now = 0u64;
    let mut eliminations = 0usize;
    let mut first_capture_tick = None;
    let mut previous_step = engine.game_state().game_step;

    while !engine.is_game_over() && previous_step < scenario.max_ticks {
        now += TICK_MS;
        let state = engine.tick(now);
        for frame in 1..=frames_per_tick {
            engine.render_tick(now + TICK_MS * frame / frames_per_tick);
        }

        let mut messages = collect_state_anomalies(&state);
        if state.game_step != previous_step + 1 {
            messages.push(format!(
                "game step jumped from {previous_step} to {}",
                state.game_step
            ));
        }
        for message in messages {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                state.game_step,
                message,
            );
        }

        for event in engine.drain_events() {
            if let GameEvent::PlayerEliminated { tick, .. } = event {
                eliminations += 1;
                first_capture_tick.get_or_insert(tick);
            }
        }
        previous_step = state.game_step;
    }

    let status = engine.game_over_status();
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            players: scenario.players,
            ghost_level: scenario.ghost_level.number(),
            map: scenario.map,
            ticks: previous_step,
            finished: status.is_over,
            winner: status.winner,
            eliminations,
            first_capture_tick,
            rankings: engine.rankings(),
            anomalies,
        },
        anomaly_records,
    }
}

fn collect_state_anomalies(state: &GameState) -> Vec<String> {
    let mut anomalies = Vec::new();

    let mut occupied = HashSet::new();
    for slot in state.active_slots() {
        let pos = state.players[slot];
        if !occupied.insert(pos) {
            anomalies.push(format!("players share cell ({}, {})", pos.x, pos.y));
        }
        if !state.map_size.contains(pos) || state.walls.contains(pos) {
            anomalies.push(format!("player {slot} inside wall at ({}, {})", pos.x, pos.y));
        }
    }

    if !state.map_size.contains(state.ghost) || state.walls.contains(state.ghost) {
        anomalies.push(format!(
            "ghost inside wall at ({}, {})",
            state.ghost.x, state.ghost.y
        ));
    }

    let mut ranked = HashSet::new();
    let mut ranks = HashSet::new();
    for ranking in &state.rankings {
        if !ranked.insert(ranking.player_id) {
            anomalies.push(format!("player {} ranked twice", ranking.player_id));
        }
        if ranking.rank == 0 || ranking.rank > state.players.len() || !ranks.insert(ranking.rank) {
            anomalies.push(format!("invalid rank {}", ranking.rank));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(rand::random::<u64>));
    let ghost_level = cli
        .ghost_level
        .as_deref()
        .and_then(GhostLevel::parse)
        .unwrap_or_default();

    if cli.players.is_some() || cli.ghost_level.is_some() || cli.map.is_some() {
        let players = cli.players.unwrap_or(2).clamp(1, 40);
        let map = cli.map.unwrap_or(MapKind::Pacman);
        return vec![Scenario {
            name: format!("custom-p{players}-l{}", ghost_level.number()),
            players,
            ghost_level,
            map,
            seed,
            max_ticks: cli.max_ticks,
        }];
    }

    vec![
        Scenario {
            name: "quick-check-p2".to_string(),
            players: 2,
            ghost_level: GhostLevel::Basic,
            map: MapKind::Pacman,
            seed,
            max_ticks: cli.max_ticks,
        },
        Scenario {
            name: "strategic-maze-p4".to_string(),
            players: 4,
            ghost_level: GhostLevel::Strategic,
            map: MapKind::Maze,
            seed: normalize_seed(seed as u64 + 1),
            max_ticks: cli.max_ticks,
        },
        Scenario {
            name: "advanced-open-p8".to_string(),
            players: 8,
            ghost_level: GhostLevel::Advanced,
            map: MapKind::Open,
            seed: normalize_seed(seed as u64 + 2),
            max_ticks: cli.max_ticks,
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
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

fn default_match_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn outcome_key(result: &ScenarioResultLine) -> &'static str {
    match (result.finished, result.winner) {
        (true, Some(_)) => "winner",
        (true, None) => "no_winner",
        (false, _) => "unfinished",
    }
}

fn build_run_summary(
    match_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_ticks: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_ticks = if scenario_count == 0 {
        0
    } else {
        total_ticks / scenario_count as u64
    };
    RunSummary {
        match_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_ticks,
        outcome_counts,
        scenarios,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}
