use crate::error::OutOfBounds;
use crate::recorder::Trajectory;
use crate::types::Point;

/// Playback cursor into the shared trajectory.
///
/// A ghost does not own any samples; it only remembers how far into the
/// recording it has replayed. The recorder hands it the trajectory each tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Ghost {
    id: u64,
    playback_index: usize,
    spawned_at_ms: u64,
    position: Point,
}

impl Ghost {
    /// Binds a new ghost to the first recorded sample.
    pub fn spawn(id: u64, spawned_at_ms: u64, trajectory: &Trajectory) -> Result<Self, OutOfBounds> {
        let position = trajectory.position_at(0)?;
        Ok(Self {
            id,
            playback_index: 0,
            spawned_at_ms,
            position,
        })
    }

    /// Moves one sample forward and reads the new position.
    pub fn advance(&mut self, trajectory: &Trajectory) -> Result<Point, OutOfBounds> {
        let next = self.playback_index + 1;
        let position = trajectory.position_at(next)?;
        self.playback_index = next;
        self.position = position;
        Ok(position)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn playback_index(&self) -> usize {
        self.playback_index
    }

    pub fn spawned_at_ms(&self) -> u64 {
        self.spawned_at_ms
    }

    pub fn position(&self) -> Point {
        self.position
    }
}
