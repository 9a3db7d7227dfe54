/// Level definition: one immutable record per level.
///
/// Invariants (checked once, in `LevelDef::new`):
///   - path is non-empty
///   - every path cell is inside the grid and strictly on the source half
///   - path cells are distinct
///   - time limit is positive
///   - ink limit covers the path (an unsolvable level never loads)
///
/// Fields are private so a `LevelDef` that exists is always valid.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use super::grid::{Cell, Grid};

pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(25_000);
pub const DEFAULT_INK_LIMIT: u32 = 25;
pub const DEFAULT_MISTAKE_LIMIT: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("{level}: path is empty")]
    EmptyPath { level: String },

    #[error("{level}: cell {cell} is outside the {width}x{height} grid")]
    OutOfBounds { level: String, cell: Cell, width: usize, height: usize },

    #[error("{level}: cell {cell} is not on the left side of the axis")]
    NotOnSourceSide { level: String, cell: Cell },

    #[error("{level}: cell {cell} appears more than once in the path")]
    DuplicateCell { level: String, cell: Cell },

    #[error("{level}: time limit must be positive")]
    ZeroTimeLimit { level: String },

    #[error("{level}: ink limit {ink} cannot cover a path of {needed} cells")]
    InsufficientInk { level: String, ink: u32, needed: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelDef {
    name: String,
    path: Vec<Cell>,
    time_limit: Duration,
    ink_limit: u32,
    mistake_limit: u32,
}

impl LevelDef {
    pub fn new(
        name: impl Into<String>,
        path: Vec<Cell>,
        time_limit: Duration,
        ink_limit: u32,
        mistake_limit: u32,
        grid: Grid,
    ) -> Result<Self, LevelError> {
        let name = name.into();

        if path.is_empty() {
            return Err(LevelError::EmptyPath { level: name });
        }

        let mut seen = HashSet::with_capacity(path.len());
        for &cell in &path {
            if !grid.contains(cell) {
                return Err(LevelError::OutOfBounds {
                    level: name,
                    cell,
                    width: grid.width,
                    height: grid.height,
                });
            }
            if !grid.is_source(cell) {
                return Err(LevelError::NotOnSourceSide { level: name, cell });
            }
            if !seen.insert(cell) {
                return Err(LevelError::DuplicateCell { level: name, cell });
            }
        }

        if time_limit.is_zero() {
            return Err(LevelError::ZeroTimeLimit { level: name });
        }
        if (ink_limit as usize) < path.len() {
            return Err(LevelError::InsufficientInk { level: name, ink: ink_limit, needed: path.len() });
        }

        Ok(LevelDef { name, path, time_limit, ink_limit, mistake_limit })
    }

    pub fn name(&self) -> &str { &self.name }

    /// Source-side path, in reveal order.
    pub fn path(&self) -> &[Cell] { &self.path }

    pub fn time_limit(&self) -> Duration { self.time_limit }
    pub fn ink_limit(&self) -> u32 { self.ink_limit }
    pub fn mistake_limit(&self) -> u32 { self.mistake_limit }
}
