use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{PersistentRankingEntry, RankingResponse, SessionSummary};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredRankingEntry {
    name: String,
    games: u64,
    #[serde(rename = "bestScore", alias = "best_score")]
    best_score: u32,
    #[serde(rename = "totalScore", alias = "total_score")]
    total_score: u64,
    #[serde(rename = "updatedAtMs", alias = "updated_at_ms")]
    updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RankingStoreFile {
    version: u8,
    players: HashMap<String, StoredRankingEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct RankingStoreFileRaw {
    version: u8,
    players: HashMap<String, serde_json::Value>,
}

/// High-score table persisted as a JSON file; rewritten after every recorded game.
pub struct RankingStore {
    file_path: PathBuf,
    players: HashMap<String, StoredRankingEntry>,
}

impl RankingStore {
    pub fn new(file_path: PathBuf) -> Self {
        let players = load_players(&file_path);
        debug!(path = %file_path.display(), players = players.len(), "ranking store loaded");
        Self { file_path, players }
    }

    pub fn record_session(&mut self, name: &str, summary: &SessionSummary) {
        let key = ranking_key(name);
        if key.is_empty() {
            return;
        }
        let now_ms = now_ms();
        let current = self
            .players
            .entry(key)
            .or_insert_with(|| StoredRankingEntry {
                name: name.trim().to_string(),
                games: 0,
                best_score: 0,
                total_score: 0,
                updated_at_ms: now_ms,
            });

        current.name = name.trim().to_string();
        current.games = current.games.saturating_add(1);
        current.best_score = current.best_score.max(summary.score);
        current.total_score = current.total_score.saturating_add(u64::from(summary.score));
        current.updated_at_ms = now_ms;

        self.save();
    }

    pub fn build_response(&self, requested_limit: Option<usize>) -> RankingResponse {
        RankingResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries: self.get_top(requested_limit),
        }
    }

    fn get_top(&self, requested_limit: Option<usize>) -> Vec<PersistentRankingEntry> {
        let normalized_limit = requested_limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let mut entries: Vec<PersistentRankingEntry> = self
            .players
            .values()
            .map(|entry| PersistentRankingEntry {
                name: entry.name.clone(),
                games: entry.games,
                best_score: entry.best_score,
                avg_score: entry.total_score as f64 / entry.games.max(1) as f64,
                updated_at_ms: entry.updated_at_ms,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then_with(|| cmp_desc_f64(a.avg_score, b.avg_score))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        entries.truncate(normalized_limit);
        entries
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), %error, "failed to create ranking dir");
                return;
            }
        }

        let payload = RankingStoreFile {
            version: 1,
            players: self.players.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    warn!(path = %self.file_path.display(), %error, "failed to write ranking");
                }
            }
            Err(error) => {
                warn!(path = %self.file_path.display(), %error, "failed to serialize ranking");
            }
        }
    }
}

fn cmp_desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn load_players(path: &Path) -> HashMap<String, StoredRankingEntry> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read ranking");
            }
            return HashMap::new();
        }
    };
    let parsed = match serde_json::from_str::<RankingStoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            warn!(path = %path.display(), version = value.version, "unsupported ranking version");
            return HashMap::new();
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse ranking");
            return HashMap::new();
        }
    };

    let mut merged = HashMap::<String, StoredRankingEntry>::new();
    for (player_key, raw_value) in parsed.players {
        let value: StoredRankingEntry = match serde_json::from_value(raw_value) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(path = %path.display(), player = %player_key, %error, "skipping ranking entry");
                continue;
            }
        };
        let Some(normalized) = sanitize_stored_entry(value) else {
            warn!(path = %path.display(), player = %player_key, "skipping ranking entry");
            continue;
        };
        let key = ranking_key(&normalized.name);

        match merged.get_mut(&key) {
            Some(current) => {
                current.name = normalized.name;
                current.games = current.games.saturating_add(normalized.games);
                current.best_score = current.best_score.max(normalized.best_score);
                current.total_score = current.total_score.saturating_add(normalized.total_score);
                current.updated_at_ms = current.updated_at_ms.max(normalized.updated_at_ms);
            }
            None => {
                merged.insert(key, normalized);
            }
        }
    }

    merged
}

/// Rejects nameless rows and rows whose score ceiling overflows; clamps totals that
/// cannot come from `games` real games.
fn sanitize_stored_entry(value: StoredRankingEntry) -> Option<StoredRankingEntry> {
    let name = value.name.trim().to_string();
    if name.is_empty() {
        return None;
    }
    let best_score = if value.games == 0 { 0 } else { value.best_score };
    let ceiling = u64::from(best_score).checked_mul(value.games.max(1))?;
    let total_score = value.total_score.clamp(u64::from(best_score), ceiling);
    Some(StoredRankingEntry {
        name,
        games: value.games,
        best_score,
        total_score,
        updated_at_ms: value.updated_at_ms,
    })
}

fn ranking_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
