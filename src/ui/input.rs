/// Input state tracker.
///
/// Collects everything the terminal reported since the last frame:
///   - key presses (Press/Repeat; Release is ignored)
///   - left-button mouse presses as terminal positions
///
/// The game is click/press driven, so only edge events matter; nothing
/// tracks held keys.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

use crate::domain::grid::{Cell, Grid, Point};

pub struct InputState {
    /// Key codes pressed during the most recent drain_events() call.
    presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for modifier checks.
    pub raw_events: Vec<KeyEvent>,

    /// Left-button presses, in arrival order.
    clicks: Vec<Point>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            clicks: Vec::with_capacity(4),
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.presses.clear();
        self.raw_events.clear();
        self.clicks.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.record_key(key),
                Ok(Event::Mouse(m)) => {
                    if let MouseEventKind::Down(MouseButton::Left) = m.kind {
                        self.clicks.push(Point::new(m.column, m.row));
                    }
                }
                _ => {}
            }
        }
    }

    fn record_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        self.raw_events.push(key);
        self.presses.push(key.code);
    }

    /// Was this key pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.presses.contains(&code)
    }

    /// Convenience: was any of these keys pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Any key at all this frame (acknowledgement).
    pub fn any_key(&self) -> bool {
        !self.presses.is_empty()
    }

    pub fn clicks(&self) -> &[Point] {
        &self.clicks
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

/// Keyboard/gamepad selection on the target half.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cursor {
    pub cell: Cell,
    grid: Grid,
}

impl Cursor {
    /// Starts on the first target column, top row.
    pub fn new(grid: Grid) -> Self {
        Cursor { cell: Cell::new(0, grid.first_target_col()), grid }
    }

    /// Move by (d_row, d_col), clamped to the target half.
    pub fn step(&mut self, d_row: isize, d_col: isize) {
        let min_col = self.grid.first_target_col() as isize;
        let max_col = self.grid.width as isize - 1;
        let max_row = self.grid.height as isize - 1;

        let row = (self.cell.row as isize + d_row).clamp(0, max_row.max(0));
        let col = (self.cell.col as isize + d_col).clamp(min_col, max_col.max(min_col));
        self.cell = Cell::new(row as usize, col as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    #[test]
    fn release_events_are_ignored() {
        let mut input = InputState::new();
        input.record_key(key(KeyCode::Enter, KeyEventKind::Release));
        assert!(!input.any_key());
        input.record_key(key(KeyCode::Enter, KeyEventKind::Press));
        assert!(input.was_pressed(KeyCode::Enter));
        assert!(input.any_pressed(&[KeyCode::Char(' '), KeyCode::Enter]));
    }

    #[test]
    fn ctrl_c_detected() {
        let mut input = InputState::new();
        input.record_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(input.ctrl_c_pressed());
    }

    #[test]
    fn cursor_stays_on_target_half() {
        let grid = Grid::new(4, 3);
        let mut cursor = Cursor::new(grid);
        assert_eq!(cursor.cell, Cell::new(0, 2));

        cursor.step(0, -1);
        assert_eq!(cursor.cell, Cell::new(0, 2));
        cursor.step(5, 5);
        assert_eq!(cursor.cell, Cell::new(2, 3));
        assert!(grid.is_target(cursor.cell));
    }
}
