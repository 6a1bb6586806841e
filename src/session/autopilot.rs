use std::collections::{HashMap, VecDeque};

use crate::constants::{tile_origin, CAR_SIZE, TILE_SIZE};
use crate::grid::Grid;
use crate::mover::KeyState;
use crate::types::{MoveMode, Vec2};

use super::body::CarBody;

/// Pixels of slack before the autopilot corrects an axis.
const DEADZONE: f32 = 1.5;

/// Computer driver used by the simulator: follows the shortest road path to a target cell.
#[derive(Clone, Debug, Default)]
pub struct Autopilot {
    pressed_last_tick: bool,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&mut self, mode: MoveMode, grid: &Grid, car: &CarBody, target: Vec2) -> KeyState {
        let from = car.cell();
        let Some(next) = next_cell(grid, from, target) else {
            return KeyState::default();
        };

        match mode {
            MoveMode::Physics => steer_towards(car, next),
            MoveMode::GridStep => {
                // Grid-step movement is edge triggered, so alternate press and release.
                if self.pressed_last_tick || next == from {
                    self.pressed_last_tick = false;
                    return KeyState::default();
                }
                self.pressed_last_tick = true;
                KeyState {
                    left: next.x < from.x,
                    right: next.x > from.x,
                    up: next.y < from.y,
                    down: next.y > from.y,
                }
            }
        }
    }
}

/// Holds the keys that move the car towards the centre of `cell`.
fn steer_towards(car: &CarBody, cell: Vec2) -> KeyState {
    let inset = (TILE_SIZE as f32 - CAR_SIZE) / 2.0;
    let (x, y) = tile_origin(cell.x, cell.y);
    let (aim_x, aim_y) = (x + inset, y + inset);
    KeyState {
        left: car.position.x > aim_x + DEADZONE,
        right: car.position.x < aim_x - DEADZONE,
        up: car.position.y > aim_y + DEADZONE,
        down: car.position.y < aim_y - DEADZONE,
    }
}

/// First step of a shortest road path from `from` to `to`; `to` itself when already there.
pub fn next_cell(grid: &Grid, from: Vec2, to: Vec2) -> Option<Vec2> {
    if from == to {
        return Some(to);
    }
    if !grid.is_road(from.x, from.y) || !grid.is_road(to.x, to.y) {
        return None;
    }

    let mut came_from: HashMap<Vec2, Vec2> = HashMap::new();
    let mut queue = VecDeque::new();
    came_from.insert(from, from);
    queue.push_back(from);

    while let Some(cell) = queue.pop_front() {
        if cell == to {
            break;
        }
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            let next = Vec2 {
                x: cell.x + dx,
                y: cell.y + dy,
            };
            if !grid.is_road(next.x, next.y) || came_from.contains_key(&next) {
                continue;
            }
            came_from.insert(next, cell);
            queue.push_back(next);
        }
    }

    let mut step = to;
    loop {
        let parent = *came_from.get(&step)?;
        if parent == from {
            return Some(step);
        }
        step = parent;
    }
}
