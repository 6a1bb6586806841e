use tracing::debug;

use crate::error::OutOfBounds;
use crate::ghost::Ghost;
use crate::sample_buffer::SampleBuffer;
use crate::types::Point;

/// The player's recorded path: one sample per tick in two parallel buffers.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    xs: SampleBuffer,
    ys: SampleBuffer,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: Point) {
        self.xs.append(point.x);
        self.ys.append(point.y);
    }

    pub fn position_at(&self, index: usize) -> Result<Point, OutOfBounds> {
        Ok(Point {
            x: self.xs.get(index)?,
            y: self.ys.get(index)?,
        })
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn xs(&self) -> &SampleBuffer {
        &self.xs
    }

    pub fn ys(&self) -> &SampleBuffer {
        &self.ys
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecorderTick {
    pub spawned: Option<u64>,
}

/// Records the player every tick and spawns ghosts that replay the recording.
///
/// `on_tick` always appends before advancing ghosts. A ghost spawned while the
/// trajectory holds `L` samples therefore trails the live sample by `L - 1`
/// forever and never reads past the end.
#[derive(Clone, Debug)]
pub struct Recorder {
    trajectory: Trajectory,
    ghosts: Vec<Ghost>,
    spawn_interval_ms: u64,
    last_spawn_ms: Option<u64>,
    next_ghost_id: u64,
}

impl Recorder {
    pub fn new(spawn_interval_ms: u64) -> Self {
        Self {
            trajectory: Trajectory::new(),
            ghosts: Vec::new(),
            spawn_interval_ms,
            last_spawn_ms: None,
            next_ghost_id: 1,
        }
    }

    pub fn on_tick(&mut self, now_ms: u64, player: Point) -> Result<RecorderTick, OutOfBounds> {
        self.trajectory.push(player);

        for ghost in &mut self.ghosts {
            ghost.advance(&self.trajectory)?;
        }

        let Some(last_spawn_ms) = self.last_spawn_ms else {
            self.last_spawn_ms = Some(now_ms);
            return Ok(RecorderTick::default());
        };
        if now_ms.saturating_sub(last_spawn_ms) <= self.spawn_interval_ms {
            return Ok(RecorderTick::default());
        }

        let id = self.next_ghost_id;
        self.next_ghost_id += 1;
        self.ghosts.push(Ghost::spawn(id, now_ms, &self.trajectory)?);
        self.last_spawn_ms = Some(now_ms);
        debug!(
            ghost_id = id,
            now_ms,
            trajectory_len = self.trajectory.len(),
            live = self.ghosts.len(),
            "ghost spawned"
        );
        Ok(RecorderTick { spawned: Some(id) })
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn spawn_interval_ms(&self) -> u64 {
        self.spawn_interval_ms
    }

    pub fn last_spawn_ms(&self) -> Option<u64> {
        self.last_spawn_ms
    }
}
