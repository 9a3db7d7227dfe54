/// Tile placement state.
///
/// A tile only ever holds one of three states; the renderer reads the
/// transition (previous state + remaining fade) to blend colours after
/// a change instead of snapping.

use std::time::Duration;

/// How long a state change takes to fade in on screen.
pub const TRANSITION: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TileState {
    #[default]
    Empty,
    Correct,   // On the mirrored path
    Incorrect, // Placed, but not on the mirrored path
}

impl TileState {
    pub fn is_correct(self) -> bool {
        matches!(self, TileState::Correct)
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Tile {
    state: TileState,
    previous: TileState,
    fade_left: Duration,
}

impl Tile {
    pub fn state(&self) -> TileState {
        self.state
    }

    /// State before the most recent change. Equal to `state()` once settled.
    pub fn previous(&self) -> TileState {
        if self.is_transitioning() { self.previous } else { self.state }
    }

    /// Change state and start the fade. Setting the current state again is a no-op.
    pub fn set_state(&mut self, state: TileState) {
        if state == self.state { return; }
        self.previous = self.state;
        self.state = state;
        self.fade_left = TRANSITION;
    }

    pub fn advance(&mut self, elapsed: Duration) {
        self.fade_left = self.fade_left.saturating_sub(elapsed);
    }

    pub fn is_transitioning(&self) -> bool {
        !self.fade_left.is_zero()
    }

    /// 0.0 right after a change, 1.0 when settled.
    pub fn transition_progress(&self) -> f32 {
        1.0 - self.fade_left.as_secs_f32() / TRANSITION.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tile_is_empty_and_settled() {
        let t = Tile::default();
        assert_eq!(t.state(), TileState::Empty);
        assert!(!t.is_transitioning());
        assert_eq!(t.transition_progress(), 1.0);
    }

    #[test]
    fn state_change_fades_in() {
        let mut t = Tile::default();
        t.set_state(TileState::Correct);
        assert!(t.is_transitioning());
        assert_eq!(t.previous(), TileState::Empty);
        assert_eq!(t.transition_progress(), 0.0);

        t.advance(Duration::from_millis(125));
        assert!((t.transition_progress() - 0.5).abs() < 1e-3);

        t.advance(Duration::from_millis(500));
        assert!(!t.is_transitioning());
        assert_eq!(t.previous(), TileState::Correct);
    }

    #[test]
    fn setting_same_state_does_not_restart_fade() {
        let mut t = Tile::default();
        t.set_state(TileState::Incorrect);
        t.advance(TRANSITION);
        t.set_state(TileState::Incorrect);
        assert!(!t.is_transitioning());
    }
}
