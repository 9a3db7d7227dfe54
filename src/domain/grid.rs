/// Grid geometry: the symmetry axis, mirroring, and pointer → cell mapping.
///
/// The grid is split by a vertical axis at column `width / 2`:
///   - source half: `col < width / 2`            (the path is shown here)
///   - target half: `col >= width - width / 2`    (the player draws here)
///
/// For odd widths the middle column *is* the axis and belongs to neither half.
///
/// Screen coordinates and grid coordinates are separate:
///   - `GridLayout` says where the grid sits on the terminal
///   - the two halves are drawn with an `axis_gap` between them,
///     so points inside the gap map to no cell at all

use std::fmt;

pub const GRID_WIDTH: usize = 16;
pub const GRID_HEIGHT: usize = 12;

/// A grid coordinate. Row-major, (0, 0) is top-left.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Cell { row, col }
    }
}

/// Grid dimensions in cells.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Grid::STANDARD
    }
}

impl Grid {
    pub const STANDARD: Grid = Grid { width: GRID_WIDTH, height: GRID_HEIGHT };

    pub const fn new(width: usize, height: usize) -> Self {
        Grid { width, height }
    }

    #[inline]
    pub fn contains(self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    /// Number of columns in each half.
    #[inline]
    pub fn half_width(self) -> usize {
        self.width / 2
    }

    /// First column of the target half.
    #[inline]
    pub fn first_target_col(self) -> usize {
        self.width - self.half_width()
    }

    #[inline]
    pub fn is_source(self, cell: Cell) -> bool {
        self.contains(cell) && cell.col < self.half_width()
    }

    #[inline]
    pub fn is_target(self, cell: Cell) -> bool {
        self.contains(cell) && cell.col >= self.first_target_col()
    }

    /// Reflect a cell across the vertical axis: `(row, W - 1 - col)`.
    ///
    /// Involutive for every in-bounds cell. Columns past the right edge,
    /// and every column of a zero-width grid, clamp to column 0.
    #[inline]
    pub fn mirror(self, cell: Cell) -> Cell {
        Cell::new(cell.row, self.width.saturating_sub(1).saturating_sub(cell.col))
    }

    /// All cells in row-major order.
    pub fn cells(self) -> impl Iterator<Item = Cell> {
        (0..self.height).flat_map(move |row| (0..self.width).map(move |col| Cell::new(row, col)))
    }
}

/// A pointer position in terminal cells (column, row).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub const fn new(x: u16, y: u16) -> Self {
        Point { x, y }
    }
}

/// Where the grid is drawn on the terminal.
///
/// Each grid cell covers `cell_w × cell_h` terminal cells. The target half
/// starts `axis_gap` columns after the end of the left half.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GridLayout {
    pub grid: Grid,
    pub origin_x: u16,
    pub origin_y: u16,
    pub cell_w: u16,
    pub cell_h: u16,
    pub axis_gap: u16,
}

impl GridLayout {
    pub fn new(grid: Grid, origin_x: u16, origin_y: u16) -> Self {
        GridLayout { grid, origin_x, origin_y, cell_w: 2, cell_h: 1, axis_gap: 1 }
    }

    /// Total width in terminal columns, gap included.
    pub fn span_x(&self) -> usize {
        self.grid.width * self.cell_w as usize + self.axis_gap as usize
    }

    pub fn span_y(&self) -> usize {
        self.grid.height * self.cell_h as usize
    }

    /// Terminal column where the axis gap begins.
    pub fn axis_x(&self) -> usize {
        self.origin_x as usize + self.grid.first_target_col() * self.cell_w as usize
    }

    /// Top-left terminal position of a cell.
    pub fn cell_origin(&self, cell: Cell) -> (usize, usize) {
        let gap = if cell.col >= self.grid.first_target_col() { self.axis_gap as usize } else { 0 };
        let x = self.origin_x as usize + cell.col * self.cell_w as usize + gap;
        let y = self.origin_y as usize + cell.row * self.cell_h as usize;
        (x, y)
    }

    /// Cell under the pointer on either half, or `None` outside the grid / in the gap.
    pub fn cell_at_point(&self, p: Point) -> Option<Cell> {
        if self.cell_w == 0 || self.cell_h == 0 { return None; }
        let dx = (p.x as usize).checked_sub(self.origin_x as usize)?;
        let dy = (p.y as usize).checked_sub(self.origin_y as usize)?;
        let cw = self.cell_w as usize;

        let left_span = self.grid.first_target_col() * cw;
        let col = if dx < left_span {
            dx / cw
        } else {
            let past_gap = dx.checked_sub(left_span + self.axis_gap as usize)?;
            self.grid.first_target_col() + past_gap / cw
        };
        let row = dy / self.cell_h as usize;

        let cell = Cell::new(row, col);
        self.grid.contains(cell).then_some(cell)
    }

    /// Cell under the pointer if it is on the target half; clicks anywhere
    /// else (source half, axis, outside the grid) report no match.
    pub fn cell_for_point(&self, p: Point) -> Option<Cell> {
        self.cell_at_point(p).filter(|&c| self.grid.is_target(c))
    }
}
