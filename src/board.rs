use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{
    MAX_RECT_HEIGHT, MAX_RECT_WIDTH, MAX_TRIES, MIN_RECT_HEIGHT, MIN_RECT_WIDTH, RECT_COUNT,
    TILE_SIZE,
};
use crate::error::BoardError;
use crate::grid::{Grid, TileKind};
use crate::rng::RandomSource;
use crate::types::BoardInit;

/// What to do when the attempt budget runs out before `rect_count` loops were accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    #[default]
    AcceptPartial,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub rect_count: usize,
    /// `None` keeps drawing until `rect_count` loops are accepted.
    pub max_tries: Option<usize>,
    pub min_rect_width: i32,
    pub max_rect_width: i32,
    pub min_rect_height: i32,
    pub max_rect_height: i32,
    /// Rows appended below the playable area (HUD strip); always left empty.
    pub reserved_rows: i32,
    pub shortfall: ShortfallPolicy,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rect_count: RECT_COUNT,
            max_tries: Some(MAX_TRIES),
            min_rect_width: MIN_RECT_WIDTH,
            max_rect_width: MAX_RECT_WIDTH,
            min_rect_height: MIN_RECT_HEIGHT,
            max_rect_height: MAX_RECT_HEIGHT,
            reserved_rows: 0,
            shortfall: ShortfallPolicy::AcceptPartial,
        }
    }
}

/// Accepted road loop. All fields are even.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RectSpec {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Debug)]
pub struct GeneratedBoard {
    pub grid: Grid,
    pub rects: Vec<RectSpec>,
    pub attempts: usize,
}

pub fn generate_board<R: RandomSource>(
    width: i32,
    height: i32,
    rng: &mut R,
    config: &BoardConfig,
) -> Result<GeneratedBoard, BoardError> {
    if width <= 0 || height <= 0 || config.reserved_rows < 0 {
        return Err(BoardError::InvalidDimensions { width, height });
    }
    check_rect_bounds("width", config.min_rect_width, config.max_rect_width)?;
    check_rect_bounds("height", config.min_rect_height, config.max_rect_height)?;
    if !fits_any_rect(width, config.min_rect_width)
        || !fits_any_rect(height, config.min_rect_height)
    {
        return Err(BoardError::Incompatible {
            width,
            height,
            min_width: config.min_rect_width,
            min_height: config.min_rect_height,
        });
    }

    let mut rects = Vec::with_capacity(config.rect_count);
    let mut attempts = 0usize;
    while rects.len() < config.rect_count
        && config.max_tries.map(|max| attempts < max).unwrap_or(true)
    {
        attempts += 1;
        if let Some(rect) = try_place_rect(width, height, rng, config) {
            debug!(attempt = attempts, ?rect, "road loop accepted");
            rects.push(rect);
        }
    }

    if rects.is_empty() {
        return Err(BoardError::NoRoad { tries: attempts });
    }
    if rects.len() < config.rect_count {
        match config.shortfall {
            ShortfallPolicy::Fail => {
                return Err(BoardError::AttemptsExhausted {
                    accepted: rects.len(),
                    wanted: config.rect_count,
                    tries: attempts,
                });
            }
            ShortfallPolicy::AcceptPartial => {
                warn!(
                    accepted = rects.len(),
                    wanted = config.rect_count,
                    attempts,
                    "board generation ran out of attempts; keeping partial board"
                );
            }
        }
    }

    let mut grid = Grid::new(width, height + config.reserved_rows);
    for rect in &rects {
        carve_rect(&mut grid, rect);
    }
    debug!(
        width,
        height,
        loops = rects.len(),
        attempts,
        road = grid.road_count(),
        "board generated"
    );

    Ok(GeneratedBoard {
        grid,
        rects,
        attempts,
    })
}

pub fn to_board_init(board: &GeneratedBoard) -> BoardInit {
    BoardInit {
        width: board.grid.width(),
        height: board.grid.height(),
        tile_size: TILE_SIZE,
        tiles: board.grid.to_rows(),
        rects: board.rects.clone(),
    }
}

/// Every accepted extent rounds down to an even value of at least 2.
fn check_rect_bounds(axis: &'static str, min: i32, max: i32) -> Result<(), BoardError> {
    if min < 2 || min > max {
        return Err(BoardError::InvalidRectBounds { axis, min, max });
    }
    Ok(())
}

fn round_down_even(value: i32) -> i32 {
    value.div_euclid(2) * 2
}

/// Smallest loop the sampler can produce sits at offset 0 with extent `even(min)`.
fn fits_any_rect(extent: i32, min: i32) -> bool {
    min <= extent && round_down_even(min) < extent
}

fn try_place_rect<R: RandomSource>(
    width: i32,
    height: i32,
    rng: &mut R,
    config: &BoardConfig,
) -> Option<RectSpec> {
    let left = round_down_even(rng.int(0, width));
    let top = round_down_even(rng.int(0, height));

    let max_width = config.max_rect_width.min(width - left);
    let max_height = config.max_rect_height.min(height - top);
    if max_width < config.min_rect_width || max_height < config.min_rect_height {
        return None;
    }

    let rect_width = round_down_even(rng.int(config.min_rect_width, max_width));
    let rect_height = round_down_even(rng.int(config.min_rect_height, max_height));
    if left + rect_width >= width || top + rect_height >= height {
        return None;
    }

    Some(RectSpec {
        left,
        top,
        width: rect_width,
        height: rect_height,
    })
}

fn carve_rect(grid: &mut Grid, rect: &RectSpec) {
    let right = rect.left + rect.width;
    let bottom = rect.top + rect.height;
    for x in rect.left..=right {
        grid.set(x, rect.top, TileKind::Horizontal);
        grid.set(x, bottom, TileKind::Horizontal);
    }
    for y in rect.top..bottom {
        grid.set(rect.left, y, TileKind::Horizontal);
        grid.set(right, y, TileKind::Horizontal);
    }
}
