use crate::constants::{CAR_ACCELERATION, CAR_FRICTION};
use crate::types::{MoveMode, Point, Vec2};

/// Directional keys held down this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

/// Direction latched on one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AxisLatch {
    Negative,
    Positive,
    #[default]
    Idle,
}

impl AxisLatch {
    /// A held direction wins over a newly pressed opposite key; on release the
    /// opposite key takes over if it is still held.
    fn update(self, negative_down: bool, positive_down: bool) -> Self {
        match self {
            AxisLatch::Negative if !negative_down => {
                if positive_down {
                    AxisLatch::Positive
                } else {
                    AxisLatch::Idle
                }
            }
            AxisLatch::Positive if !positive_down => {
                if negative_down {
                    AxisLatch::Negative
                } else {
                    AxisLatch::Idle
                }
            }
            AxisLatch::Idle if negative_down => AxisLatch::Negative,
            AxisLatch::Idle if positive_down => AxisLatch::Positive,
            latched => latched,
        }
    }

    fn sign(self) -> f32 {
        match self {
            AxisLatch::Negative => -1.0,
            AxisLatch::Positive => 1.0,
            AxisLatch::Idle => 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Steering {
    pub velocity: Point,
    /// Whole-cell displacement requested in grid-step mode.
    pub step: Vec2,
}

#[derive(Clone, Debug)]
pub struct Mover {
    mode: MoveMode,
    acceleration: f32,
    friction: f32,
    horizontal: AxisLatch,
    vertical: AxisLatch,
    previous: KeyState,
}

impl Mover {
    pub fn new(mode: MoveMode) -> Self {
        Self {
            mode,
            acceleration: CAR_ACCELERATION,
            friction: CAR_FRICTION,
            horizontal: AxisLatch::Idle,
            vertical: AxisLatch::Idle,
            previous: KeyState::default(),
        }
    }

    pub fn mode(&self) -> MoveMode {
        self.mode
    }

    pub fn horizontal(&self) -> AxisLatch {
        self.horizontal
    }

    pub fn vertical(&self) -> AxisLatch {
        self.vertical
    }

    pub fn update(&mut self, keys: KeyState, velocity: Point) -> Steering {
        let steering = match self.mode {
            MoveMode::Physics => Steering {
                velocity: self.accelerate(keys, velocity),
                step: Vec2 { x: 0, y: 0 },
            },
            MoveMode::GridStep => Steering {
                velocity: Point::default(),
                step: self.pressed_step(keys),
            },
        };
        self.previous = keys;
        steering
    }

    fn accelerate(&mut self, keys: KeyState, velocity: Point) -> Point {
        self.horizontal = self.horizontal.update(keys.left, keys.right);
        self.vertical = self.vertical.update(keys.up, keys.down);
        Point {
            x: velocity.x * self.friction + self.horizontal.sign() * self.acceleration,
            y: velocity.y * self.friction + self.vertical.sign() * self.acceleration,
        }
    }

    fn pressed_step(&self, keys: KeyState) -> Vec2 {
        let pressed = |now: bool, before: bool| i32::from(now && !before);
        Vec2 {
            x: pressed(keys.right, self.previous.right) - pressed(keys.left, self.previous.left),
            y: pressed(keys.down, self.previous.down) - pressed(keys.up, self.previous.up),
        }
    }
}
