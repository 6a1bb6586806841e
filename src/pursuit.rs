use tracing::info;

use crate::constants::CAR_SIZE;
use crate::ghost::Ghost;
use crate::types::Point;

/// Axis-aligned box with a top-left origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hitbox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Hitbox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Car- and ghost-sized box at `origin`.
    pub fn car_at(origin: Point) -> Self {
        Self::new(origin.x, origin.y, CAR_SIZE, CAR_SIZE)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Physics collaborator that decides whether two hitboxes touch.
pub trait Overlap {
    fn overlaps(&self, a: &Hitbox, b: &Hitbox) -> bool;
}

/// Arcade-physics rule: boxes that merely share an edge do not overlap.
#[derive(Clone, Copy, Debug, Default)]
pub struct AabbOverlap;

impl Overlap for AabbOverlap {
    fn overlaps(&self, a: &Hitbox, b: &Hitbox) -> bool {
        !(a.right() <= b.x || a.bottom() <= b.y || a.x >= b.right() || a.y >= b.bottom())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionResult {
    NoCollision,
    Caught { ghost_id: u64, score_at_capture: u32 },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PursuitDetector;

impl PursuitDetector {
    /// Tests ghosts in spawn order and stops at the first one touching the player.
    pub fn check<O: Overlap>(
        &self,
        player: &Hitbox,
        ghosts: &[Ghost],
        overlap: &O,
        score: u32,
    ) -> CollisionResult {
        let caught = ghosts
            .iter()
            .find(|ghost| overlap.overlaps(&Hitbox::car_at(ghost.position()), player));
        match caught {
            Some(ghost) => {
                info!(ghost_id = ghost.id(), score, "player caught by ghost");
                CollisionResult::Caught {
                    ghost_id: ghost.id(),
                    score_at_capture: score,
                }
            }
            None => CollisionResult::NoCollision,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::recorder::Trajectory;

    struct CountingOverlap {
        calls: Cell<usize>,
    }

    impl Overlap for CountingOverlap {
        fn overlaps(&self, a: &Hitbox, b: &Hitbox) -> bool {
            self.calls.set(self.calls.get() + 1);
            AabbOverlap.overlaps(a, b)
        }
    }

    fn ghost_at(id: u64, x: f32, y: f32) -> Ghost {
        let mut trajectory = Trajectory::new();
        trajectory.push(Point { x, y });
        Ghost::spawn(id, 0, &trajectory).expect("one sample recorded")
    }

    #[test]
    fn aabb_overlap_excludes_shared_edges() {
        let a = Hitbox::new(0.0, 0.0, 10.0, 10.0);
        assert!(AabbOverlap.overlaps(&a, &Hitbox::new(9.0, 9.0, 10.0, 10.0)));
        assert!(!AabbOverlap.overlaps(&a, &Hitbox::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!AabbOverlap.overlaps(&a, &Hitbox::new(0.0, -10.0, 10.0, 10.0)));
        assert!(AabbOverlap.overlaps(&a, &Hitbox::new(2.0, 2.0, 1.0, 1.0)));
    }

    #[test]
    fn no_ghosts_means_no_collision() {
        let player = Hitbox::car_at(Point { x: 0.0, y: 0.0 });
        assert_eq!(
            PursuitDetector.check(&player, &[], &AabbOverlap, 3),
            CollisionResult::NoCollision
        );
    }

    #[test]
    fn distant_ghosts_do_not_catch() {
        let player = Hitbox::car_at(Point { x: 0.0, y: 0.0 });
        let ghosts = [ghost_at(1, 100.0, 0.0), ghost_at(2, 0.0, 12.0)];
        assert_eq!(
            PursuitDetector.check(&player, &ghosts, &AabbOverlap, 0),
            CollisionResult::NoCollision
        );
    }

    #[test]
    fn first_overlapping_ghost_short_circuits() {
        let player = Hitbox::car_at(Point { x: 40.0, y: 40.0 });
        let ghosts = [
            ghost_at(1, 200.0, 200.0),
            ghost_at(2, 45.0, 45.0),
            ghost_at(3, 40.0, 40.0),
        ];
        let overlap = CountingOverlap {
            calls: Cell::new(0),
        };
        let result = PursuitDetector.check(&player, &ghosts, &overlap, 7);
        assert_eq!(
            result,
            CollisionResult::Caught {
                ghost_id: 2,
                score_at_capture: 7
            }
        );
        assert_eq!(overlap.calls.get(), 2);
    }
}
