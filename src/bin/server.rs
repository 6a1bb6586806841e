use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use ghost_racer_server::constants::TICK_MS;
use ghost_racer_server::mover::KeyState;
use ghost_racer_server::ranking_store::RankingStore;
use ghost_racer_server::server_protocol::{parse_client_message, ParsedClientMessage};
use ghost_racer_server::server_utils::{
    normalize_seed, parse_ranking_limit, parse_spawn_interval_ms, sanitize_name,
};
use ghost_racer_server::session::{GameSession, SessionConfig};
use ghost_racer_server::types::{MoveMode, Preset};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    name: Option<String>,
    keys: KeyState,
    session: Option<GameSession>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    ranking_store: RankingStore,
    spawn_interval_override_ms: Option<u64>,
}

impl ServerState {
    fn new(ranking_store: RankingStore, spawn_interval_override_ms: Option<u64>) -> Self {
        Self {
            clients: HashMap::new(),
            ranking_store,
            spawn_interval_override_ms,
        }
    }

    fn session_config(&self, preset: Preset, mode: MoveMode) -> SessionConfig {
        let mut config = SessionConfig::preset(preset).with_mode(mode);
        if let Some(interval) = self.spawn_interval_override_ms {
            config.spawn_interval_ms = interval;
        }
        config
    }
}

#[derive(Debug, Deserialize)]
struct RankingQuery {
    limit: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let ranking_path = std::env::var("RANKING_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/ranking.json"));
    let spawn_interval_override_ms =
        parse_spawn_interval_ms(std::env::var("SPAWN_INTERVAL_MS").ok().as_deref());
    if let Some(interval) = spawn_interval_override_ms {
        info!(interval_ms = interval, "ghost spawn interval overridden");
    }

    let state = Arc::new(Mutex::new(ServerState::new(
        RankingStore::new(ranking_path),
        spawn_interval_override_ms,
    )));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/ranking", get(ranking_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; set STATIC_DIR to serve a client");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    info!(port, "listening");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ranking_handler(
    State(state): State<SharedState>,
    Query(query): Query<RankingQuery>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(
        guard
            .ranking_store
            .build_response(parse_ranking_limit(query.limit.as_deref())),
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                name: None,
                keys: KeyState::default(),
                session: None,
            },
        );
    }
    info!(client = %client_id, "client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                let mut guard = state.lock().await;
                handle_client_message(&mut guard, &client_id, raw.as_str());
            }
            Message::Binary(raw) => {
                let mut guard = state.lock().await;
                match std::str::from_utf8(&raw) {
                    Ok(text) => handle_client_message(&mut guard, &client_id, text),
                    Err(_) => send_error(&mut guard, &client_id, "invalid utf8 message"),
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        guard.clients.remove(&client_id);
    }
    info!(client = %client_id, "client disconnected");
    drop(tx);
    let _ = writer.await;
}

fn handle_client_message(state: &mut ServerState, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error(state, client_id, "invalid message");
        return;
    };

    match message {
        ParsedClientMessage::Hello { name } => {
            let name = sanitize_name(&name);
            if let Some(client) = state.clients.get_mut(client_id) {
                client.name = Some(name.clone());
            }
            send_to_client(
                state,
                client_id,
                &json!({
                    "type": "welcome",
                    "clientId": client_id,
                    "name": name,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
        ParsedClientMessage::Start { seed, mode, preset } => {
            let named = state
                .clients
                .get(client_id)
                .map(|client| client.name.is_some())
                .unwrap_or(false);
            if !named {
                send_error(state, client_id, "send hello first");
                return;
            }
            let config = state.session_config(
                preset.unwrap_or(Preset::Classic),
                mode.unwrap_or(MoveMode::Physics),
            );
            let seed = normalize_seed(seed).unwrap_or_else(rand::random::<u32>);
            start_session(state, client_id, config, seed);
        }
        ParsedClientMessage::Input { keys } => {
            if let Some(client) = state.clients.get_mut(client_id) {
                client.keys = keys;
            }
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                state,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
    }
}

fn start_session(state: &mut ServerState, client_id: &str, config: SessionConfig, seed: u32) {
    let session = match GameSession::new(config, seed) {
        Ok(session) => session,
        Err(error) => {
            warn!(client = %client_id, seed, %error, "failed to start session");
            send_error(state, client_id, &format!("could not start game: {error}"));
            return;
        }
    };

    let init = json!({
        "type": "game_init",
        "seed": session.seed(),
        "board": session.board_init(),
        "config": session.config_view(),
    });
    let Some(client) = state.clients.get_mut(client_id) else {
        return;
    };
    client.keys = KeyState::default();
    client.session = Some(session);
    info!(client = %client_id, seed, "session started");
    send_to_client(state, client_id, &init, QueuePolicy::DisconnectOnFull);
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_sessions(&mut guard);
        }
    });
}

fn tick_sessions(state: &mut ServerState) {
    let mut outgoing: Vec<(String, Value, QueuePolicy)> = Vec::new();

    for (client_id, client) in state.clients.iter_mut() {
        let Some(session) = client.session.as_mut() else {
            continue;
        };
        if let Err(error) = session.step(TICK_MS, client.keys) {
            warn!(client = %client_id, %error, "session aborted");
            client.session = None;
            outgoing.push((
                client_id.clone(),
                json!({ "type": "error", "message": "game aborted" }),
                QueuePolicy::DisconnectOnFull,
            ));
            continue;
        }

        let snapshot = session.build_snapshot(true);
        outgoing.push((
            client_id.clone(),
            json!({ "type": "state", "snapshot": snapshot }),
            QueuePolicy::DropOnFull,
        ));

        if session.is_ended() {
            let summary = session.build_summary();
            let name = client.name.clone().unwrap_or_else(|| sanitize_name(""));
            state.ranking_store.record_session(&name, &summary);
            info!(
                client = %client_id,
                score = summary.score,
                reason = ?summary.reason,
                "session finished"
            );
            client.session = None;
            outgoing.push((
                client_id.clone(),
                json!({ "type": "game_over", "summary": summary }),
                QueuePolicy::DisconnectOnFull,
            ));
        }
    }

    for (client_id, message, policy) in outgoing {
        send_to_client(state, &client_id, &message, policy);
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client(state, client_id);
    }
}

fn send_error(state: &mut ServerState, client_id: &str, message: &str) {
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn disconnect_client(state: &mut ServerState, client_id: &str) {
    let Some(client) = state.clients.remove(client_id) else {
        return;
    };
    warn!(client = %client_id, "outbound queue full; disconnecting");
    let _ = client.tx.try_send(OutboundMessage::Close {
        code: 4002,
        reason: "outbound queue full".to_string(),
    });
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_ranking(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("{name}-{}-{}", std::process::id(), rand::random::<u32>()))
            .join("ranking.json")
    }

    fn connect(
        state: &mut ServerState,
        capacity: usize,
    ) -> (String, mpsc::Receiver<OutboundMessage>) {
        let client_id = make_id("client");
        let (tx, rx) = mpsc::channel(capacity);
        state.clients.insert(
            client_id.clone(),
            ClientContext {
                tx,
                name: None,
                keys: KeyState::default(),
                session: None,
            },
        );
        (client_id, rx)
    }

    fn drain_types(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<String> {
        let mut types = Vec::new();
        while let Ok(OutboundMessage::Text(text)) = rx.try_recv() {
            let value: Value = serde_json::from_str(&text).expect("valid json");
            types.push(value["type"].as_str().unwrap_or_default().to_string());
        }
        types
    }

    #[test]
    fn start_requires_hello() {
        let path = temp_ranking("server-hello");
        let mut state = ServerState::new(RankingStore::new(path), None);
        let (client_id, mut rx) = connect(&mut state, 16);

        handle_client_message(&mut state, &client_id, r#"{"type":"start"}"#);
        assert_eq!(drain_types(&mut rx), vec!["error"]);

        handle_client_message(&mut state, &client_id, r#"{"type":"hello","name":"Ann"}"#);
        handle_client_message(&mut state, &client_id, r#"{"type":"start","seed":5}"#);
        assert_eq!(drain_types(&mut rx), vec!["welcome", "game_init"]);
        assert!(state.clients[&client_id].session.is_some());
    }

    #[test]
    fn finished_session_is_ranked_and_cleared() {
        let path = temp_ranking("server-finish");
        let mut state = ServerState::new(RankingStore::new(path.clone()), Some(500));
        let (client_id, mut rx) = connect(&mut state, 4_096);
        handle_client_message(&mut state, &client_id, r#"{"type":"hello","name":"Ann"}"#);
        handle_client_message(&mut state, &client_id, r#"{"type":"start","seed":8}"#);
        let _ = drain_types(&mut rx);

        // A parked car is caught by the first ghost once it spawns.
        for _ in 0..200 {
            tick_sessions(&mut state);
            if state.clients[&client_id].session.is_none() {
                break;
            }
        }
        assert!(state.clients[&client_id].session.is_none());
        let types = drain_types(&mut rx);
        assert_eq!(types.last().map(String::as_str), Some("game_over"));
        assert!(types.iter().filter(|kind| *kind == "state").count() > 1);

        let ranking = state.ranking_store.build_response(None);
        assert_eq!(ranking.entries.len(), 1);
        assert_eq!(ranking.entries[0].name, "Ann");

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn full_queue_drops_state_but_keeps_client() {
        let path = temp_ranking("server-drop");
        let mut state = ServerState::new(RankingStore::new(path), None);
        let (client_id, _rx) = connect(&mut state, 2);
        handle_client_message(&mut state, &client_id, r#"{"type":"hello","name":"Ann"}"#);
        handle_client_message(&mut state, &client_id, r#"{"type":"start"}"#);

        for _ in 0..10 {
            tick_sessions(&mut state);
        }
        assert!(state.clients.contains_key(&client_id));

        handle_client_message(&mut state, &client_id, r#"{"type":"ping","t":1}"#);
        assert!(!state.clients.contains_key(&client_id));
    }

    #[test]
    fn spawn_interval_override_applies_to_presets() {
        let path = temp_ranking("server-override");
        let state = ServerState::new(RankingStore::new(path), Some(1_500));
        let config = state.session_config(Preset::Fast, MoveMode::GridStep);
        assert_eq!(config.spawn_interval_ms, 1_500);
        assert_eq!(config.mode, MoveMode::GridStep);
    }
}
