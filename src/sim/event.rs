/// Events emitted by the session and the controller.
/// The presentation layer consumes these for animation/sound.

use std::time::Duration;

use crate::domain::grid::Cell;
use super::session::FailReason;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// A source cell became visible during the reveal (`index` of `total`).
    RevealStep { index: usize, total: usize },
    RevealFinished,
    InkSpent { cell: Cell },
    TileCorrect { cell: Cell },
    TileIncorrect { cell: Cell },
    TimerWarning { remaining: Duration },
    LevelComplete,
    LevelFailed { reason: FailReason },
    /// A new level session started (0-based index).
    LevelStarted { index: usize },
    GameComplete,
}
