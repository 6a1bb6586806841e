use serde::{Deserialize, Serialize};

use crate::board::RectSpec;

/// Grid cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

/// Pixel-space position (top-left origin, like the sprites it describes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveMode {
    /// Held keys accelerate the car; friction slows it every tick.
    Physics,
    /// Each key press moves the car exactly one cell.
    GridStep,
}

impl MoveMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "physics" => Some(Self::Physics),
            "grid_step" | "grid" => Some(Self::GridStep),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Classic,
    Fast,
}

impl Preset {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "classic" => Some(Self::Classic),
            "fast" => Some(Self::Fast),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Caught,
    TimeUp,
}

#[derive(Clone, Debug, Serialize)]
pub struct BoardInit {
    pub width: i32,
    pub height: i32,
    #[serde(rename = "tileSize")]
    pub tile_size: i32,
    pub tiles: Vec<String>,
    pub rects: Vec<RectSpec>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionConfigView {
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
    #[serde(rename = "spawnIntervalMs")]
    pub spawn_interval_ms: u64,
    #[serde(rename = "timeLimitMs")]
    pub time_limit_ms: Option<u64>,
    pub mode: MoveMode,
}

#[derive(Clone, Debug, Serialize)]
pub struct CarView {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "playbackIndex")]
    pub playback_index: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Scored {
        score: u32,
        depot: Vec2,
    },
    GhostSpawned {
        #[serde(rename = "ghostId")]
        ghost_id: u64,
    },
    Caught {
        #[serde(rename = "ghostId")]
        ghost_id: u64,
        #[serde(rename = "scoreAtCapture")]
        score_at_capture: u32,
    },
    TimeUp {
        score: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    #[serde(rename = "timeLeftMs")]
    pub time_left_ms: Option<u64>,
    pub score: u32,
    pub car: CarView,
    pub ghosts: Vec<GhostView>,
    pub depot: Vec2,
    #[serde(rename = "trajectoryLen")]
    pub trajectory_len: usize,
    pub ended: bool,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub reason: GameOverReason,
    pub score: u32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub ticks: u64,
    #[serde(rename = "ghostsSpawned")]
    pub ghosts_spawned: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct PersistentRankingEntry {
    pub name: String,
    pub games: u64,
    #[serde(rename = "bestScore")]
    pub best_score: u32,
    #[serde(rename = "avgScore")]
    pub avg_score: f64,
    #[serde(rename = "updatedAtMs")]
    pub updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankingResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<PersistentRankingEntry>,
}
