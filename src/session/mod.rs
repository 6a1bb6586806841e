use tracing::{debug, info};

use crate::board::{generate_board, to_board_init, BoardConfig, GeneratedBoard};
use crate::constants::{
    BOARD_PLAYABLE_HEIGHT, BOARD_WIDTH, CLASSIC_SPAWN_INTERVAL_MS, FAST_SPAWN_INTERVAL_MS,
    HUD_ROWS, TICK_RATE,
};
use crate::depot::Depot;
use crate::error::{PlacementError, SessionError};
use crate::grid::Grid;
use crate::mover::{KeyState, Mover};
use crate::pursuit::{AabbOverlap, CollisionResult, PursuitDetector};
use crate::recorder::Recorder;
use crate::rng::Rng;
use crate::types::{
    BoardInit, CarView, GameOverReason, GhostView, MoveMode, Preset, RuntimeEvent,
    SessionConfigView, SessionSummary, Snapshot,
};

mod autopilot;
mod body;

pub use self::autopilot::{next_cell, Autopilot};
pub use self::body::{is_blocked, CarBody};

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub board: BoardConfig,
    pub board_width: i32,
    /// Rows available to road loops; `board.reserved_rows` are added below.
    pub board_height: i32,
    pub spawn_interval_ms: u64,
    pub time_limit_ms: Option<u64>,
    pub mode: MoveMode,
}

impl SessionConfig {
    pub fn preset(preset: Preset) -> Self {
        let spawn_interval_ms = match preset {
            Preset::Classic => CLASSIC_SPAWN_INTERVAL_MS,
            Preset::Fast => FAST_SPAWN_INTERVAL_MS,
        };
        Self {
            board: BoardConfig {
                reserved_rows: HUD_ROWS,
                ..BoardConfig::default()
            },
            board_width: BOARD_WIDTH,
            board_height: BOARD_PLAYABLE_HEIGHT,
            spawn_interval_ms,
            time_limit_ms: None,
            mode: MoveMode::Physics,
        }
    }

    pub fn with_mode(mut self, mode: MoveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_time_limit(mut self, time_limit_ms: Option<u64>) -> Self {
        self.time_limit_ms = time_limit_ms;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::preset(Preset::Classic)
    }
}

/// One player's game: owns every component and advances them in a fixed order.
#[derive(Clone, Debug)]
pub struct GameSession {
    config: SessionConfig,
    seed: u32,
    rng: Rng,
    board: GeneratedBoard,
    car: CarBody,
    mover: Mover,
    depot: Depot,
    recorder: Recorder,
    detector: PursuitDetector,
    overlap: AabbOverlap,
    events: Vec<RuntimeEvent>,
    elapsed_ms: u64,
    tick_counter: u64,
    ended: bool,
    end_reason: Option<GameOverReason>,
}

impl GameSession {
    pub fn new(config: SessionConfig, seed: u32) -> Result<Self, SessionError> {
        let mut rng = Rng::new(seed);
        let board = generate_board(
            config.board_width,
            config.board_height,
            &mut rng,
            &config.board,
        )?;
        let spawn = board
            .grid
            .first_road_cell()
            .ok_or(PlacementError::NoCandidates)?;
        let depot = Depot::new(&board.grid, &mut rng)?;
        info!(
            seed,
            loops = board.rects.len(),
            spawn_x = spawn.x,
            spawn_y = spawn.y,
            mode = ?config.mode,
            "session created"
        );

        Ok(Self {
            mover: Mover::new(config.mode),
            recorder: Recorder::new(config.spawn_interval_ms),
            config,
            seed,
            rng,
            board,
            car: CarBody::at_cell(spawn),
            depot,
            detector: PursuitDetector,
            overlap: AabbOverlap,
            events: Vec::new(),
            elapsed_ms: 0,
            tick_counter: 0,
            ended: false,
            end_reason: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn end_reason(&self) -> Option<GameOverReason> {
        self.end_reason
    }

    pub fn grid(&self) -> &Grid {
        &self.board.grid
    }

    pub fn car(&self) -> &CarBody {
        &self.car
    }

    pub fn depot(&self) -> &Depot {
        &self.depot
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn score(&self) -> u32 {
        self.depot.score()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn board_init(&self) -> BoardInit {
        to_board_init(&self.board)
    }

    pub fn config_view(&self) -> SessionConfigView {
        SessionConfigView {
            tick_rate: TICK_RATE,
            spawn_interval_ms: self.config.spawn_interval_ms,
            time_limit_ms: self.config.time_limit_ms,
            mode: self.mover.mode(),
        }
    }

    /// Advances one tick: mover, body, depot, pursuit, recorder.
    ///
    /// A catch ends the session before the recorder runs, so the final position is
    /// never recorded.
    pub fn step(&mut self, dt_ms: u64, keys: KeyState) -> Result<(), SessionError> {
        if self.ended {
            return Ok(());
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let now_ms = self.elapsed_ms;

        let steering = self.mover.update(keys, self.car.velocity);
        match self.mover.mode() {
            MoveMode::Physics => {
                self.car.velocity = steering.velocity;
                self.car.integrate(dt_ms as f32 / 1000.0, &self.board.grid);
            }
            MoveMode::GridStep => self.car.step_cells(steering.step, &self.board.grid),
        }

        let player = self.car.hitbox();
        if let Some(score) =
            self.depot
                .on_tick(&player, &self.overlap, &self.board.grid, &mut self.rng)?
        {
            self.events.push(RuntimeEvent::Scored {
                score,
                depot: self.depot.cell(),
            });
        }

        let collision = self.detector.check(
            &player,
            self.recorder.ghosts(),
            &self.overlap,
            self.depot.score(),
        );
        if let CollisionResult::Caught {
            ghost_id,
            score_at_capture,
        } = collision
        {
            self.events.push(RuntimeEvent::Caught {
                ghost_id,
                score_at_capture,
            });
            self.finish(GameOverReason::Caught);
            return Ok(());
        }

        let recorded = self.recorder.on_tick(now_ms, self.car.position)?;
        if let Some(ghost_id) = recorded.spawned {
            self.events.push(RuntimeEvent::GhostSpawned { ghost_id });
        }

        if let Some(limit) = self.config.time_limit_ms {
            if self.elapsed_ms >= limit {
                self.events.push(RuntimeEvent::TimeUp {
                    score: self.depot.score(),
                });
                self.finish(GameOverReason::TimeUp);
            }
        }
        Ok(())
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            now_ms: self.elapsed_ms,
            time_left_ms: self
                .config
                .time_limit_ms
                .map(|limit| limit.saturating_sub(self.elapsed_ms)),
            score: self.depot.score(),
            car: CarView {
                x: self.car.position.x,
                y: self.car.position.y,
                vx: self.car.velocity.x,
                vy: self.car.velocity.y,
            },
            ghosts: self
                .recorder
                .ghosts()
                .iter()
                .map(|ghost| GhostView {
                    id: ghost.id(),
                    x: ghost.position().x,
                    y: ghost.position().y,
                    playback_index: ghost.playback_index(),
                })
                .collect(),
            depot: self.depot.cell(),
            trajectory_len: self.recorder.trajectory().len(),
            ended: self.ended,
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_summary(&self) -> SessionSummary {
        SessionSummary {
            reason: self.end_reason.unwrap_or(GameOverReason::TimeUp),
            score: self.depot.score(),
            duration_ms: self.elapsed_ms,
            ticks: self.tick_counter,
            ghosts_spawned: self.recorder.ghosts().len(),
        }
    }

    fn finish(&mut self, reason: GameOverReason) {
        self.ended = true;
        self.end_reason = Some(reason);
        debug!(
            ?reason,
            score = self.depot.score(),
            ticks = self.tick_counter,
            elapsed_ms = self.elapsed_ms,
            "session ended"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{tile_origin, TICK_MS};
    use crate::types::{Point, Vec2};

    fn keys(left: bool, right: bool, up: bool, down: bool) -> KeyState {
        KeyState {
            left,
            right,
            up,
            down,
        }
    }

    /// Cycles through every key combination so the car wanders around the loops.
    fn scripted_keys(tick: usize) -> KeyState {
        let phase = (tick / 45) % 8;
        match phase {
            0 => keys(false, true, false, false),
            1 => keys(false, false, false, true),
            2 => keys(true, false, false, false),
            3 => keys(false, false, true, false),
            4 => keys(false, true, false, true),
            5 => keys(true, false, true, false),
            6 => KeyState::default(),
            _ => keys(true, true, true, true),
        }
    }

    fn assert_car_on_road(session: &GameSession) {
        assert!(
            !is_blocked(session.grid(), &session.car().hitbox()),
            "car left the road at {:?}",
            session.car().position
        );
    }

    #[test]
    fn new_session_spawns_car_on_first_road_cell() {
        let session = GameSession::new(SessionConfig::default(), 7).expect("board generates");
        let spawn = session.grid().first_road_cell().expect("road exists");
        let (x, y) = tile_origin(spawn.x, spawn.y);
        assert_eq!(session.car().position, Point { x, y });
        assert_eq!(session.grid().width(), BOARD_WIDTH);
        assert_eq!(session.grid().height(), BOARD_PLAYABLE_HEIGHT + HUD_ROWS);
        let depot = session.depot().cell();
        assert!(session.grid().is_road(depot.x, depot.y));
        assert!(session.recorder().ghosts().is_empty());
    }

    #[test]
    fn same_seed_produces_same_progression() {
        let config = SessionConfig::preset(Preset::Fast);
        let mut a = GameSession::new(config.clone(), 424_242).expect("board generates");
        let mut b = GameSession::new(config, 424_242).expect("board generates");
        assert_eq!(a.grid(), b.grid());

        for tick in 0..1_200 {
            a.step(TICK_MS, scripted_keys(tick)).expect("tick succeeds");
            b.step(TICK_MS, scripted_keys(tick)).expect("tick succeeds");
            let sa = a.build_snapshot(false);
            let sb = b.build_snapshot(false);
            assert_eq!(sa.car.x.to_bits(), sb.car.x.to_bits());
            assert_eq!(sa.car.y.to_bits(), sb.car.y.to_bits());
            assert_eq!(sa.score, sb.score);
            assert_eq!(sa.depot, sb.depot);
            assert_eq!(sa.ghosts.len(), sb.ghosts.len());
            if a.is_ended() || b.is_ended() {
                assert_eq!(a.is_ended(), b.is_ended());
                break;
            }
        }
    }

    #[test]
    fn car_never_leaves_the_road() {
        let config = SessionConfig::default().with_time_limit(Some(30_000));
        for seed in [1, 2, 3, 99, 2024] {
            let mut session = GameSession::new(config.clone(), seed).expect("board generates");
            for tick in 0..1_800 {
                session
                    .step(TICK_MS, scripted_keys(tick + seed as usize))
                    .expect("tick succeeds");
                assert_car_on_road(&session);
                if session.is_ended() {
                    break;
                }
            }
        }
    }

    #[test]
    fn stationary_player_on_depot_scores_once() {
        let mut session = GameSession::new(SessionConfig::default(), 5).expect("board generates");
        let spawn = session.car().cell();
        session.depot = Depot::at(spawn);

        session.step(TICK_MS, KeyState::default()).expect("tick succeeds");
        assert_eq!(session.score(), 1);
        let relocated = session.depot().cell();
        assert!(session.grid().is_road(relocated.x, relocated.y));

        let snapshot = session.build_snapshot(true);
        assert!(snapshot.events.iter().any(|event| matches!(
            event,
            RuntimeEvent::Scored { score: 1, depot } if *depot == relocated
        )));
    }

    #[test]
    fn stationary_player_is_caught_by_first_ghost() {
        let mut config = SessionConfig::default();
        config.spawn_interval_ms = 100;
        let mut session = GameSession::new(config, 9).expect("board generates");
        // Park the collectible away from the car so the score stays put.
        let spawn = session.car().cell();
        let far = session
            .grid()
            .road_cells()
            .into_iter()
            .max_by_key(|cell| (cell.x - spawn.x).abs() + (cell.y - spawn.y).abs())
            .expect("road exists");
        session.depot = Depot::at(far);

        let mut ticks = 0;
        while !session.is_ended() && ticks < 100 {
            session.step(TICK_MS, KeyState::default()).expect("tick succeeds");
            ticks += 1;
        }
        assert!(session.is_ended());
        assert_eq!(session.end_reason(), Some(GameOverReason::Caught));
        // Armed on tick 1, spawns on the first tick more than 100ms later, catches on the next.
        assert_eq!(ticks, 9);

        let snapshot = session.build_snapshot(true);
        assert!(snapshot.events.iter().any(|event| matches!(
            event,
            RuntimeEvent::Caught {
                ghost_id: 1,
                score_at_capture: 0
            }
        )));
        let summary = session.build_summary();
        assert_eq!(summary.reason, GameOverReason::Caught);
        assert_eq!(summary.ghosts_spawned, 1);
        assert_eq!(summary.ticks, 9);
    }

    #[test]
    fn catch_skips_recording_and_later_steps_are_ignored() {
        let mut config = SessionConfig::default();
        config.spawn_interval_ms = 0;
        let mut session = GameSession::new(config, 12).expect("board generates");
        session.depot = Depot::at(Vec2 { x: -5, y: -5 });
        while !session.is_ended() {
            session.step(TICK_MS, KeyState::default()).expect("tick succeeds");
        }
        let recorded = session.recorder().trajectory().len();
        let ticks = session.tick();
        assert_eq!(recorded as u64, ticks - 1);

        session.step(TICK_MS, keys(false, true, false, false)).expect("no-op");
        assert_eq!(session.tick(), ticks);
        assert_eq!(session.recorder().trajectory().len(), recorded);
    }

    #[test]
    fn ghost_playback_never_outruns_trajectory() {
        let config = SessionConfig::preset(Preset::Fast).with_time_limit(Some(20_000));
        let mut session = GameSession::new(config, 77).expect("board generates");
        let mut tick = 0;
        while !session.is_ended() {
            session.step(TICK_MS, scripted_keys(tick)).expect("tick succeeds");
            let len = session.recorder().trajectory().len();
            for ghost in session.recorder().ghosts() {
                assert!(ghost.playback_index() < len);
            }
            tick += 1;
        }
    }

    #[test]
    fn time_limit_ends_session() {
        let config = SessionConfig::default().with_time_limit(Some(TICK_MS * 10));
        let mut session = GameSession::new(config, 3).expect("board generates");
        session.depot = Depot::at(Vec2 { x: -5, y: -5 });
        for _ in 0..20 {
            session.step(TICK_MS, KeyState::default()).expect("tick succeeds");
        }
        assert_eq!(session.tick(), 10);
        assert_eq!(session.end_reason(), Some(GameOverReason::TimeUp));
        let snapshot = session.build_snapshot(true);
        assert_eq!(snapshot.time_left_ms, Some(0));
        assert!(snapshot.ended);
        assert!(matches!(
            snapshot.events.last(),
            Some(RuntimeEvent::TimeUp { score: 0 })
        ));
    }

    #[test]
    fn build_snapshot_drains_events_when_requested() {
        let mut session = GameSession::new(SessionConfig::default(), 333).expect("board generates");
        session.events.push(RuntimeEvent::GhostSpawned { ghost_id: 42 });

        let peek = session.build_snapshot(false);
        assert!(peek.events.is_empty());
        let first = session.build_snapshot(true);
        let second = session.build_snapshot(true);
        assert_eq!(first.events.len(), 1);
        assert_eq!(second.events.len(), 0);
    }

    #[test]
    fn grid_step_mode_moves_whole_cells() {
        let config = SessionConfig::default().with_mode(MoveMode::GridStep);
        let mut session = GameSession::new(config, 21).expect("board generates");
        session.depot = Depot::at(Vec2 { x: -5, y: -5 });
        let start = session.car().cell();
        session.step(TICK_MS, keys(false, true, false, false)).expect("tick succeeds");
        assert_eq!(session.car().cell(), Vec2 { x: start.x + 1, y: start.y });
        session.step(TICK_MS, keys(false, true, false, false)).expect("tick succeeds");
        assert_eq!(session.car().cell(), Vec2 { x: start.x + 1, y: start.y });
    }

    #[test]
    fn config_view_reports_the_mode_the_car_moves_in() {
        let config = SessionConfig::preset(Preset::Fast).with_mode(MoveMode::GridStep);
        let session = GameSession::new(config, 5).expect("board generates");
        assert_eq!(session.config().mode, MoveMode::GridStep);
        assert_eq!(session.config_view().mode, MoveMode::GridStep);
        assert_eq!(session.config_view().spawn_interval_ms, FAST_SPAWN_INTERVAL_MS);
    }
}
