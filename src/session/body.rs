use crate::constants::{tile_origin, TILE_SIZE};
use crate::grid::Grid;
use crate::pursuit::Hitbox;
use crate::types::{Point, Vec2};

/// The player's car: position plus arcade velocity in px/s.
#[derive(Clone, Debug, PartialEq)]
pub struct CarBody {
    pub position: Point,
    pub velocity: Point,
}

impl CarBody {
    pub fn at_cell(cell: Vec2) -> Self {
        let (x, y) = tile_origin(cell.x, cell.y);
        Self {
            position: Point { x, y },
            velocity: Point::default(),
        }
    }

    pub fn hitbox(&self) -> Hitbox {
        Hitbox::car_at(self.position)
    }

    /// Cell under the hitbox centre.
    pub fn cell(&self) -> Vec2 {
        let hitbox = self.hitbox();
        let tile = TILE_SIZE as f32;
        Vec2 {
            x: ((hitbox.x + hitbox.width / 2.0) / tile).floor() as i32,
            y: ((hitbox.y + hitbox.height / 2.0) / tile).floor() as i32,
        }
    }

    /// Moves one axis at a time; an axis whose move would touch an empty tile or
    /// leave the board is cancelled and its velocity zeroed.
    pub fn integrate(&mut self, dt_secs: f32, grid: &Grid) {
        let dx = self.velocity.x * dt_secs;
        if dx != 0.0 {
            let candidate = Point {
                x: self.position.x + dx,
                y: self.position.y,
            };
            if is_blocked(grid, &Hitbox::car_at(candidate)) {
                self.velocity.x = 0.0;
            } else {
                self.position = candidate;
            }
        }

        let dy = self.velocity.y * dt_secs;
        if dy != 0.0 {
            let candidate = Point {
                x: self.position.x,
                y: self.position.y + dy,
            };
            if is_blocked(grid, &Hitbox::car_at(candidate)) {
                self.velocity.y = 0.0;
            } else {
                self.position = candidate;
            }
        }
    }

    /// Grid-step movement: jump whole cells, staying on the board.
    pub fn step_cells(&mut self, step: Vec2, grid: &Grid) {
        if step.x == 0 && step.y == 0 {
            return;
        }
        let current = self.cell();
        let mut target = current;
        if grid.contains(current.x + step.x, current.y) {
            target.x += step.x;
        }
        if grid.contains(target.x, current.y + step.y) {
            target.y += step.y;
        }
        let (x, y) = tile_origin(target.x, target.y);
        self.position = Point { x, y };
        self.velocity = Point::default();
    }
}

/// True when the hitbox leaves the board or overlaps any non-road tile.
pub fn is_blocked(grid: &Grid, hitbox: &Hitbox) -> bool {
    let tile = TILE_SIZE as f32;
    let board_width = (grid.width() * TILE_SIZE) as f32;
    let board_height = (grid.height() * TILE_SIZE) as f32;
    if hitbox.x < 0.0 || hitbox.y < 0.0 || hitbox.right() > board_width || hitbox.bottom() > board_height
    {
        return true;
    }

    let first_x = (hitbox.x / tile).floor() as i32;
    let last_x = (hitbox.right() / tile).ceil() as i32 - 1;
    let first_y = (hitbox.y / tile).floor() as i32;
    let last_y = (hitbox.bottom() / tile).ceil() as i32 - 1;
    for y in first_y..=last_y {
        for x in first_x..=last_x {
            if !grid.is_road(x, y) {
                return true;
            }
        }
    }
    false
}
