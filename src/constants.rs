pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const VIEWPORT_WIDTH: i32 = 640;
pub const VIEWPORT_HEIGHT: i32 = 480;
pub const PLAYER_SCALE: f32 = 1.5;
pub const SPRITE_SCALE: i32 = 5;
pub const TILE_SIZE: i32 = 8 * SPRITE_SCALE;
pub const HUD_ROWS: i32 = 2;

pub const BOARD_WIDTH: i32 = VIEWPORT_WIDTH / TILE_SIZE;
pub const BOARD_PLAYABLE_HEIGHT: i32 = VIEWPORT_HEIGHT / TILE_SIZE - HUD_ROWS;

pub const RECT_COUNT: usize = 4;
pub const MAX_TRIES: usize = 100;
pub const MIN_RECT_WIDTH: i32 = 7;
pub const MAX_RECT_WIDTH: i32 = 20;
pub const MIN_RECT_HEIGHT: i32 = 7;
pub const MAX_RECT_HEIGHT: i32 = 20;

/// Side of the car and ghost hitboxes in pixels (8px sprite at `PLAYER_SCALE`).
pub const CAR_SIZE: f32 = 8.0 * PLAYER_SCALE;

pub const CAR_ACCELERATION: f32 = 10.0;
pub const CAR_FRICTION: f32 = 0.9;

pub const SAMPLE_CHUNK_SIZE: usize = 1024;

pub const CLASSIC_SPAWN_INTERVAL_MS: u64 = 10_000;
pub const FAST_SPAWN_INTERVAL_MS: u64 = 3_000;

pub fn tile_origin(cell_x: i32, cell_y: i32) -> (f32, f32) {
    ((cell_x * TILE_SIZE) as f32, (cell_y * TILE_SIZE) as f32)
}
