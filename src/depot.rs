use tracing::debug;

use crate::constants::{tile_origin, TILE_SIZE};
use crate::error::PlacementError;
use crate::grid::Grid;
use crate::pursuit::{Hitbox, Overlap};
use crate::rng::RandomSource;
use crate::types::Vec2;

/// The collectible the player drives into to score.
#[derive(Clone, Debug)]
pub struct Depot {
    cell: Vec2,
    score: u32,
}

impl Depot {
    pub fn new<R: RandomSource>(grid: &Grid, rng: &mut R) -> Result<Self, PlacementError> {
        let cell = pick_road_cell(grid, rng)?;
        Ok(Self { cell, score: 0 })
    }

    pub fn at(cell: Vec2) -> Self {
        Self { cell, score: 0 }
    }

    pub fn cell(&self) -> Vec2 {
        self.cell
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn hitbox(&self) -> Hitbox {
        let (x, y) = tile_origin(self.cell.x, self.cell.y);
        Hitbox::new(x, y, TILE_SIZE as f32, TILE_SIZE as f32)
    }

    /// Scores and relocates when the player touches the collectible.
    ///
    /// The new cell is drawn from every road cell, so it may land where it was.
    pub fn on_tick<O: Overlap, R: RandomSource>(
        &mut self,
        player: &Hitbox,
        overlap: &O,
        grid: &Grid,
        rng: &mut R,
    ) -> Result<Option<u32>, PlacementError> {
        if !overlap.overlaps(&self.hitbox(), player) {
            return Ok(None);
        }
        self.cell = pick_road_cell(grid, rng)?;
        self.score += 1;
        debug!(score = self.score, x = self.cell.x, y = self.cell.y, "depot collected");
        Ok(Some(self.score))
    }
}

pub fn pick_road_cell<R: RandomSource>(grid: &Grid, rng: &mut R) -> Result<Vec2, PlacementError> {
    let candidates = grid.road_cells();
    rng.pick(&candidates)
        .copied()
        .ok_or(PlacementError::NoCandidates)
}
