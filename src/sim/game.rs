/// Game controller: sequences level sessions across a pack.
///
/// ```text
///   Level(i) Success ──ack──▶ Level(i+1) … ──▶ Victory
///   Level(i) Failure ──ack──▶ Level(0)
///   Victory          ──ack──▶ Level(0)
/// ```
///
/// Owns the current `LevelSession` exclusively; a session is discarded
/// wholesale when the level changes.

use std::time::Duration;

use tracing::info;

use crate::domain::grid::{Cell, Grid, GridLayout, Point};
use crate::domain::level::LevelDef;
use crate::domain::tile::Tile;
use super::event::GameEvent;
use super::pack::LevelPack;
use super::session::{LevelSession, Phase, PlaceOutcome, SessionTiming};

enum Stage {
    Level(LevelSession),
    Victory,
}

/// What the presentation layer needs to know about the stage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StageView {
    Level(Phase),
    Victory,
}

/// Owned, read-only view of the game for one frame.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub stage: StageView,
    pub grid: Grid,
    pub level_number: usize, // 1-based
    pub total_levels: usize,
    pub level_name: String,
    pub tiles: Vec<(Cell, Tile)>,
    /// Source cells visible during the reveal.
    pub revealed: Vec<Cell>,
    /// Target cells not yet placed; shown after a failure.
    pub missed: Vec<Cell>,
    pub remaining_time: Duration,
    pub time_limit: Duration,
    pub remaining_ink: u32,
    pub ink_limit: u32,
    pub mistakes_made: u32,
    pub mistake_limit: u32,
}

pub struct Game {
    levels: Vec<LevelDef>,
    grid: Grid,
    timing: SessionTiming,
    layout: GridLayout,
    index: usize,
    stage: Stage,
    events: Vec<GameEvent>,
    auto_advance: Option<Duration>,
    success_elapsed: Duration,
}

impl Game {
    pub fn new(pack: &LevelPack, grid: Grid, timing: SessionTiming) -> Self {
        let levels = pack.levels().to_vec();
        let mut game = Game {
            levels,
            grid,
            timing,
            layout: GridLayout::new(grid, 0, 0),
            index: 0,
            stage: Stage::Victory,
            events: Vec::new(),
            auto_advance: None,
            success_elapsed: Duration::ZERO,
        };
        game.start_level(0);
        game
    }

    /// Advance to the next level on its own this long after a Success.
    pub fn with_auto_advance(mut self, delay: Option<Duration>) -> Self {
        self.auto_advance = delay;
        self
    }

    /// Where the grid was last drawn; clicks are mapped through it.
    pub fn set_layout(&mut self, layout: GridLayout) {
        self.layout = layout;
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn level_index(&self) -> usize {
        self.index
    }

    pub fn session(&self) -> Option<&LevelSession> {
        match &self.stage {
            Stage::Level(s) => Some(s),
            Stage::Victory => None,
        }
    }

    pub fn is_victory(&self) -> bool {
        matches!(self.stage, Stage::Victory)
    }

    fn phase(&self) -> Option<Phase> {
        self.session().map(|s| s.phase())
    }

    /// Whether any input should acknowledge rather than play.
    pub fn awaiting_acknowledgement(&self) -> bool {
        match self.phase() {
            Some(phase) => phase.is_terminal(),
            None => true,
        }
    }

    pub fn in_reveal(&self) -> bool {
        self.phase() == Some(Phase::Reveal)
    }
}

// ── Input routing ──

impl Game {
    pub fn handle_tick(&mut self, dt: Duration) {
        let Stage::Level(session) = &mut self.stage else {
            return;
        };
        session.tick(dt, &mut self.events);

        if session.phase() == Phase::Success {
            if let Some(delay) = self.auto_advance {
                self.success_elapsed = self.success_elapsed.saturating_add(dt);
                if self.success_elapsed >= delay {
                    self.advance();
                }
            }
        }
    }

    /// Pointer press at a terminal position. Acknowledges in terminal
    /// stages; otherwise places on the cell under the pointer, if any.
    pub fn handle_click(&mut self, point: Point) -> Option<PlaceOutcome> {
        if self.awaiting_acknowledgement() {
            self.acknowledge();
            return None;
        }
        let cell = self.layout.cell_for_point(point)?;
        self.place_at(cell)
    }

    /// Place on a grid cell directly (keyboard / gamepad cursor).
    pub fn place_at(&mut self, cell: Cell) -> Option<PlaceOutcome> {
        match &mut self.stage {
            Stage::Level(session) => Some(session.place(cell, &mut self.events)),
            Stage::Victory => None,
        }
    }

    pub fn skip_reveal(&mut self) {
        if let Stage::Level(session) = &mut self.stage {
            session.skip_reveal(&mut self.events);
        }
    }

    /// Continue past a terminal stage. Returns false when there was
    /// nothing to acknowledge.
    pub fn acknowledge(&mut self) -> bool {
        self.advance() || self.restart()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

// ── Level sequencing ──

impl Game {
    /// Move past a cleared level; Victory after the last one.
    /// Returns false, changing nothing, unless the level ended in Success.
    pub fn advance(&mut self) -> bool {
        if self.phase() != Some(Phase::Success) {
            return false;
        }
        let next = self.index + 1;
        if next >= self.levels.len() {
            self.index = self.levels.len().saturating_sub(1);
            self.stage = Stage::Victory;
            info!(levels = self.levels.len(), "all levels cleared");
            self.events.push(GameEvent::GameComplete);
        } else {
            self.start_level(next);
        }
        true
    }

    /// Back to level 1 with a fresh session, after a Failure or Victory.
    pub fn restart(&mut self) -> bool {
        if !matches!(self.phase(), Some(Phase::Failure(_)) | None) {
            return false;
        }
        info!(from = self.index + 1, "restarting at level 1");
        self.start_level(0);
        true
    }

    fn start_level(&mut self, index: usize) {
        let Some(def) = self.levels.get(index) else {
            self.stage = Stage::Victory;
            return;
        };
        self.index = index;
        self.success_elapsed = Duration::ZERO;
        self.stage = Stage::Level(LevelSession::new(def, self.grid, self.timing));
        info!(level = index + 1, name = def.name(), "level started");
        self.events.push(GameEvent::LevelStarted { index });
    }
}

// ── Presentation ──

impl Game {
    pub fn snapshot(&self) -> Snapshot {
        let total_levels = self.levels.len();
        match &self.stage {
            Stage::Level(s) => {
                let missed = match s.phase() {
                    Phase::Failure(_) => s
                        .target()
                        .iter()
                        .copied()
                        .filter(|&c| !s.tile_state(c).is_correct())
                        .collect(),
                    _ => Vec::new(),
                };
                Snapshot {
                    stage: StageView::Level(s.phase()),
                    grid: self.grid,
                    level_number: self.index + 1,
                    total_levels,
                    level_name: s.name().to_string(),
                    tiles: s.tiles().map(|(c, t)| (c, *t)).collect(),
                    revealed: s.revealed_path().to_vec(),
                    missed,
                    remaining_time: s.remaining_time(),
                    time_limit: s.time_limit(),
                    remaining_ink: s.remaining_ink(),
                    ink_limit: s.ink_limit(),
                    mistakes_made: s.mistakes_made(),
                    mistake_limit: s.mistake_limit(),
                }
            }
            Stage::Victory => Snapshot {
                stage: StageView::Victory,
                grid: self.grid,
                level_number: total_levels,
                total_levels,
                level_name: String::new(),
                tiles: Vec::new(),
                revealed: Vec::new(),
                missed: Vec::new(),
                remaining_time: Duration::ZERO,
                time_limit: Duration::ZERO,
                remaining_ink: 0,
                ink_limit: 0,
                mistakes_made: 0,
                mistake_limit: 0,
            },
        }
    }
}
