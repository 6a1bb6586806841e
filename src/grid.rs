use serde::Serialize;

use crate::types::Vec2;

/// Classification of a single board cell.
///
/// Generation only ever writes `Empty` and `Horizontal`; `Horizontal` means
/// "drivable road" regardless of orientation. The remaining kinds are reserved
/// for directional road art.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TileKind {
    #[default]
    Empty = 0,
    Horizontal = 1,
    Vertical = 2,
    TopLeft = 3,
    TopRight = 4,
    BottomLeft = 5,
    BottomRight = 6,
}

impl TileKind {
    pub fn is_road(self) -> bool {
        self != TileKind::Empty
    }

    pub fn glyph(self) -> char {
        match self {
            TileKind::Empty => '#',
            TileKind::Horizontal => '-',
            TileKind::Vertical => '|',
            TileKind::TopLeft => 'r',
            TileKind::TopRight => '7',
            TileKind::BottomLeft => 'L',
            TileKind::BottomRight => 'J',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '#' => Some(TileKind::Empty),
            '-' => Some(TileKind::Horizontal),
            '|' => Some(TileKind::Vertical),
            'r' => Some(TileKind::TopLeft),
            '7' => Some(TileKind::TopRight),
            'L' => Some(TileKind::BottomLeft),
            'J' => Some(TileKind::BottomRight),
            _ => None,
        }
    }
}

/// Fixed-size, row-major tile array (`index = y * width + x`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<TileKind>,
}

impl Grid {
    /// Creates an all-`Empty` grid. Panics on non-positive dimensions.
    pub fn new(width: i32, height: i32) -> Self {
        assert!(
            width > 0 && height > 0,
            "grid dimensions must be positive, got {width}x{height}"
        );
        Self {
            width,
            height,
            cells: vec![TileKind::Empty; (width * height) as usize],
        }
    }

    /// Parses rows of tile glyphs. Returns `None` for ragged rows or unknown glyphs.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Option<Self> {
        let height = rows.len() as i32;
        let width = rows.first()?.as_ref().chars().count() as i32;
        if width == 0 {
            return None;
        }
        let mut cells = Vec::with_capacity((width * height) as usize);
        for row in rows {
            let row = row.as_ref();
            if row.chars().count() as i32 != width {
                return None;
            }
            for glyph in row.chars() {
                cells.push(TileKind::from_glyph(glyph)?);
            }
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn index_of(&self, x: i32, y: i32) -> usize {
        assert!(
            self.contains(x, y),
            "cell ({x},{y}) outside {}x{} grid",
            self.width,
            self.height
        );
        (y * self.width + x) as usize
    }

    pub fn get(&self, x: i32, y: i32) -> TileKind {
        self.cells[self.index_of(x, y)]
    }

    pub fn try_get(&self, x: i32, y: i32) -> Option<TileKind> {
        if !self.contains(x, y) {
            return None;
        }
        Some(self.cells[(y * self.width + x) as usize])
    }

    pub fn set(&mut self, x: i32, y: i32, kind: TileKind) {
        let idx = self.index_of(x, y);
        self.cells[idx] = kind;
    }

    pub fn is_road(&self, x: i32, y: i32) -> bool {
        self.try_get(x, y).map(TileKind::is_road).unwrap_or(false)
    }

    /// First road cell in row-major order; the player spawns here.
    pub fn first_road_cell(&self) -> Option<Vec2> {
        self.cells
            .iter()
            .position(|kind| kind.is_road())
            .map(|idx| Vec2 {
                x: idx as i32 % self.width,
                y: idx as i32 / self.width,
            })
    }

    pub fn road_cells(&self) -> Vec<Vec2> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, kind)| kind.is_road())
            .map(|(idx, _)| Vec2 {
                x: idx as i32 % self.width,
                y: idx as i32 / self.width,
            })
            .collect()
    }

    pub fn road_count(&self) -> usize {
        self.cells.iter().filter(|kind| kind.is_road()).count()
    }

    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|kind| kind.glyph()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_empty_and_row_major() {
        let mut grid = Grid::new(4, 3);
        assert_eq!(grid.road_count(), 0);
        grid.set(3, 1, TileKind::Horizontal);
        assert_eq!(grid.get(3, 1), TileKind::Horizontal);
        assert_eq!(grid.to_rows(), vec!["####", "###-", "####"]);
    }

    #[test]
    #[should_panic(expected = "outside 4x3 grid")]
    fn get_out_of_range_panics() {
        let grid = Grid::new(4, 3);
        let _ = grid.get(4, 0);
    }

    #[test]
    #[should_panic(expected = "outside 4x3 grid")]
    fn set_negative_coordinate_panics() {
        let mut grid = Grid::new(4, 3);
        grid.set(0, -1, TileKind::Horizontal);
    }

    #[test]
    fn try_get_is_lenient_outside() {
        let grid = Grid::new(2, 2);
        assert_eq!(grid.try_get(-1, 0), None);
        assert_eq!(grid.try_get(0, 2), None);
        assert_eq!(grid.try_get(1, 1), Some(TileKind::Empty));
        assert!(!grid.is_road(5, 5));
    }

    #[test]
    fn first_road_cell_scans_rows_before_columns() {
        let grid = Grid::from_rows(&["#####", "####-", "#-###"]).expect("valid rows");
        assert_eq!(grid.first_road_cell(), Some(Vec2 { x: 4, y: 1 }));
        assert_eq!(
            grid.road_cells(),
            vec![Vec2 { x: 4, y: 1 }, Vec2 { x: 1, y: 2 }]
        );
    }

    #[test]
    fn first_road_cell_is_none_on_empty_grid() {
        assert_eq!(Grid::new(3, 3).first_road_cell(), None);
    }

    #[test]
    fn from_rows_rejects_ragged_or_unknown_input() {
        assert!(Grid::from_rows(&["##", "#"]).is_none());
        assert!(Grid::from_rows(&["#?"]).is_none());
        let empty: [&str; 0] = [];
        assert!(Grid::from_rows(&empty).is_none());
    }

    #[test]
    fn reserved_tile_kinds_count_as_road() {
        let grid = Grid::from_rows(&["r-7", "|#|", "L-J"]).expect("valid rows");
        assert_eq!(grid.road_count(), 8);
        assert_eq!(grid.get(0, 0), TileKind::TopLeft);
        assert_eq!(grid.get(2, 2), TileKind::BottomRight);
    }
}
