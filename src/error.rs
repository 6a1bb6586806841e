use thiserror::Error;

/// Read past the recorded end of a sample buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("index {index} out of bounds for sample buffer of length {len}")]
pub struct OutOfBounds {
    pub index: usize,
    pub len: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("rectangle {axis} bounds must satisfy 2 <= min <= max, got {min}..={max}")]
    InvalidRectBounds { axis: &'static str, min: i32, max: i32 },
    #[error(
        "no rectangle of at least {min_width}x{min_height} fits a {width}x{height} board"
    )]
    Incompatible {
        width: i32,
        height: i32,
        min_width: i32,
        min_height: i32,
    },
    #[error("accepted {accepted} of {wanted} rectangles within {tries} attempts")]
    AttemptsExhausted {
        accepted: usize,
        wanted: usize,
        tries: usize,
    },
    #[error("no rectangle accepted within {tries} attempts; board has no road")]
    NoRoad { tries: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("grid has no road cells to place on")]
    NoCandidates,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("ghost playback outran the recorded trajectory: {0}")]
    Playback(#[from] OutOfBounds),
}
