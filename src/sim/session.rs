/// LevelSession: the run-time state machine for one level.
///
/// ## Phases
///
/// ```text
///   Reveal ──(reveal elapsed / skip)──▶ Playing ──▶ Success
///                                          │
///                                          └──────▶ Failure(Time | Ink | Mistakes)
/// ```
///
/// Success and Failure are terminal for the session; the controller decides
/// what comes next once the player acknowledges.
///
/// ## Placement order of checks
///
///   1. phase must be Playing                     → Rejected(NotPlaying)
///   2. cell must be on the target half           → Rejected(OutsideTarget)
///   3. cell must not already be Correct          → Rejected(AlreadyCorrect)
///   4. ink must be > 0                           → Rejected(OutOfInk) (+ Failure(Ink) if unfinished)
///   5. spend ink, classify, update tile
///   6. Incorrect: mistakes > limit               → Failure(Mistakes)
///      Correct:   every target cell Correct      → Success
///   7. still Playing, ink == 0, path unfinished  → Failure(Ink)
///
/// Nothing is mutated before step 5.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::grid::{Cell, Grid};
use crate::domain::level::LevelDef;
use crate::domain::tile::{Tile, TileState};
use super::event::GameEvent;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FailReason {
    Time,
    Ink,
    Mistakes,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Reveal,
    Playing,
    Success,
    Failure(FailReason),
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Success | Phase::Failure(_))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Placement {
    Correct,
    Incorrect,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RejectReason {
    NotPlaying,
    OutsideTarget,
    AlreadyCorrect,
    OutOfInk,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlaceOutcome {
    Placed { cell: Cell, placement: Placement },
    Rejected(RejectReason),
}

/// Reveal pacing and low-time warnings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTiming {
    /// Delay between consecutive path cells appearing.
    pub reveal_step: Duration,
    /// Minimum time the path stays on screen before input opens.
    pub reveal_hold: Duration,
    /// Start warning once remaining time drops to this.
    pub warn_below: Duration,
    /// Interval between warnings.
    pub warn_every: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        SessionTiming {
            reveal_step: Duration::from_millis(75),
            reveal_hold: Duration::from_millis(1800),
            warn_below: Duration::from_millis(10_000),
            warn_every: Duration::from_millis(1000),
        }
    }
}

pub struct LevelSession {
    grid: Grid,
    name: String,
    source: Vec<Cell>,
    target: Vec<Cell>,
    target_set: HashSet<Cell>,
    placed: HashMap<Cell, Tile>,
    correct: usize,

    time_limit: Duration,
    ink_limit: u32,
    mistake_limit: u32,
    remaining_time: Duration,
    remaining_ink: u32,
    mistakes_made: u32,

    phase: Phase,
    timing: SessionTiming,
    reveal_elapsed: Duration,
    revealed: usize,
    next_warning: Option<Duration>,
}

// ── Construction ──

impl LevelSession {
    pub fn new(def: &LevelDef, grid: Grid, timing: SessionTiming) -> Self {
        let source = def.path().to_vec();
        let target: Vec<Cell> = source.iter().map(|&c| grid.mirror(c)).collect();
        let target_set = target.iter().copied().collect();
        let next_warning = (!timing.warn_below.is_zero() && !timing.warn_every.is_zero())
            .then_some(timing.warn_below);

        LevelSession {
            grid,
            name: def.name().to_string(),
            source,
            target,
            target_set,
            placed: HashMap::new(),
            correct: 0,
            time_limit: def.time_limit(),
            ink_limit: def.ink_limit(),
            mistake_limit: def.mistake_limit(),
            remaining_time: def.time_limit(),
            remaining_ink: def.ink_limit(),
            mistakes_made: 0,
            phase: Phase::Reveal,
            timing,
            reveal_elapsed: Duration::ZERO,
            revealed: 0,
            next_warning,
        }
    }
}

// ── Events in ──

impl LevelSession {
    /// Advance the session by `elapsed`. Tile fades run in every phase;
    /// the reveal walk only in Reveal, the countdown only in Playing.
    pub fn tick(&mut self, elapsed: Duration, events: &mut Vec<GameEvent>) {
        for tile in self.placed.values_mut() {
            tile.advance(elapsed);
        }

        match self.phase {
            Phase::Reveal => self.advance_reveal(elapsed, events),
            Phase::Playing => self.advance_clock(elapsed, events),
            Phase::Success | Phase::Failure(_) => {}
        }
    }

    /// End the reveal now and start the clock.
    pub fn skip_reveal(&mut self, events: &mut Vec<GameEvent>) {
        if self.phase == Phase::Reveal {
            self.finish_reveal(events);
        }
    }

    pub fn place(&mut self, cell: Cell, events: &mut Vec<GameEvent>) -> PlaceOutcome {
        if self.phase != Phase::Playing {
            return PlaceOutcome::Rejected(RejectReason::NotPlaying);
        }
        if !self.grid.is_target(cell) {
            return PlaceOutcome::Rejected(RejectReason::OutsideTarget);
        }
        if self.tile_state(cell).is_correct() {
            return PlaceOutcome::Rejected(RejectReason::AlreadyCorrect);
        }
        // Only reachable if a session starts dry: spending the last ink
        // already ends the level.
        if self.remaining_ink == 0 {
            if !self.is_complete() {
                self.fail(FailReason::Ink, events);
            }
            return PlaceOutcome::Rejected(RejectReason::OutOfInk);
        }

        self.remaining_ink -= 1;
        events.push(GameEvent::InkSpent { cell });

        let placement = if self.target_set.contains(&cell) {
            Placement::Correct
        } else {
            Placement::Incorrect
        };

        match placement {
            Placement::Correct => {
                self.placed.entry(cell).or_default().set_state(TileState::Correct);
                self.correct += 1;
                events.push(GameEvent::TileCorrect { cell });
                debug!(%cell, correct = self.correct, of = self.target.len(), "correct placement");

                if self.is_complete() {
                    self.phase = Phase::Success;
                    info!(level = %self.name, ink_left = self.remaining_ink, "level complete");
                    events.push(GameEvent::LevelComplete);
                }
            }
            Placement::Incorrect => {
                self.placed.entry(cell).or_default().set_state(TileState::Incorrect);
                self.mistakes_made += 1;
                events.push(GameEvent::TileIncorrect { cell });
                debug!(%cell, mistakes = self.mistakes_made, limit = self.mistake_limit, "incorrect placement");

                if self.mistakes_made > self.mistake_limit {
                    self.fail(FailReason::Mistakes, events);
                }
            }
        }

        if self.phase == Phase::Playing && self.remaining_ink == 0 && !self.is_complete() {
            self.fail(FailReason::Ink, events);
        }

        PlaceOutcome::Placed { cell, placement }
    }
}

// ── Internal transitions ──

impl LevelSession {
    fn reveal_duration(&self) -> Duration {
        let walk = self.timing.reveal_step.saturating_mul(self.source.len() as u32);
        walk.max(self.timing.reveal_hold)
    }

    fn advance_reveal(&mut self, elapsed: Duration, events: &mut Vec<GameEvent>) {
        self.reveal_elapsed = self.reveal_elapsed.saturating_add(elapsed);

        let total = self.source.len();
        let shown = if self.timing.reveal_step.is_zero() {
            total
        } else {
            let steps = self.reveal_elapsed.as_nanos() / self.timing.reveal_step.as_nanos();
            (steps as usize).saturating_add(1).min(total)
        };
        self.show_up_to(shown, events);

        if self.reveal_elapsed >= self.reveal_duration() {
            self.finish_reveal(events);
        }
    }

    fn show_up_to(&mut self, shown: usize, events: &mut Vec<GameEvent>) {
        let total = self.source.len();
        while self.revealed < shown {
            events.push(GameEvent::RevealStep { index: self.revealed, total });
            self.revealed += 1;
        }
    }

    fn finish_reveal(&mut self, events: &mut Vec<GameEvent>) {
        self.show_up_to(self.source.len(), events);
        self.phase = Phase::Playing;
        debug!(level = %self.name, time = ?self.remaining_time, "reveal finished, clock running");
        events.push(GameEvent::RevealFinished);
    }

    fn advance_clock(&mut self, elapsed: Duration, events: &mut Vec<GameEvent>) {
        self.remaining_time = self.remaining_time.saturating_sub(elapsed);
        if self.remaining_time.is_zero() {
            self.fail(FailReason::Time, events);
            return;
        }

        if let Some(at) = self.next_warning {
            if self.remaining_time <= at {
                events.push(GameEvent::TimerWarning { remaining: self.remaining_time });
                let mut next = at;
                while next >= self.remaining_time && !next.is_zero() {
                    next = next.saturating_sub(self.timing.warn_every);
                }
                self.next_warning = (!next.is_zero()).then_some(next);
            }
        }
    }

    fn fail(&mut self, reason: FailReason, events: &mut Vec<GameEvent>) {
        self.phase = Phase::Failure(reason);
        info!(
            level = %self.name,
            ?reason,
            ink_left = self.remaining_ink,
            mistakes = self.mistakes_made,
            "level failed"
        );
        events.push(GameEvent::LevelFailed { reason });
    }
}

// ── Queries ──

impl LevelSession {
    pub fn phase(&self) -> Phase { self.phase }
    pub fn name(&self) -> &str { &self.name }
    pub fn grid(&self) -> Grid { self.grid }

    /// Source path in reveal order.
    pub fn source(&self) -> &[Cell] { &self.source }

    /// Mirrored path, same order as `source()`.
    pub fn target(&self) -> &[Cell] { &self.target }

    /// Source cells currently visible. Only non-empty during Reveal.
    pub fn revealed_path(&self) -> &[Cell] {
        match self.phase {
            Phase::Reveal => &self.source[..self.revealed],
            _ => &[],
        }
    }

    pub fn tile_state(&self, cell: Cell) -> TileState {
        self.placed.get(&cell).map(|t| t.state()).unwrap_or_default()
    }

    pub fn tiles(&self) -> impl Iterator<Item = (Cell, &Tile)> {
        self.placed.iter().map(|(&c, t)| (c, t))
    }

    pub fn is_complete(&self) -> bool {
        self.correct == self.target.len()
    }

    pub fn time_limit(&self) -> Duration { self.time_limit }
    pub fn remaining_time(&self) -> Duration { self.remaining_time }
    pub fn ink_limit(&self) -> u32 { self.ink_limit }
    pub fn remaining_ink(&self) -> u32 { self.remaining_ink }
    pub fn mistakes_made(&self) -> u32 { self.mistakes_made }
    pub fn mistake_limit(&self) -> u32 { self.mistake_limit }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::level::DEFAULT_TIME_LIMIT;

    const GRID: Grid = Grid::new(4, 4);

    fn level(path: &[(usize, usize)], ink: u32, mistakes: u32) -> LevelDef {
        let cells = path.iter().map(|&p| Cell::from(p)).collect();
        LevelDef::new("test", cells, DEFAULT_TIME_LIMIT, ink, mistakes, GRID).unwrap()
    }

    /// Session already past the reveal.
    fn playing(path: &[(usize, usize)], ink: u32, mistakes: u32) -> LevelSession {
        let mut s = LevelSession::new(&level(path, ink, mistakes), GRID, SessionTiming::default());
        s.skip_reveal(&mut vec![]);
        assert_eq!(s.phase(), Phase::Playing);
        s
    }

    fn place(s: &mut LevelSession, row: usize, col: usize) -> PlaceOutcome {
        s.place(Cell::new(row, col), &mut vec![])
    }

    // ── Reveal ──

    #[test]
    fn starts_in_reveal_and_rejects_input() {
        let mut s = LevelSession::new(&level(&[(0, 0)], 1, 0), GRID, SessionTiming::default());
        assert_eq!(s.phase(), Phase::Reveal);
        assert_eq!(place(&mut s, 0, 3), PlaceOutcome::Rejected(RejectReason::NotPlaying));
        assert_eq!(s.remaining_ink(), 1);
    }

    #[test]
    fn clock_does_not_run_during_reveal() {
        let mut s = LevelSession::new(&level(&[(0, 0)], 1, 0), GRID, SessionTiming::default());
        s.tick(Duration::from_millis(1000), &mut vec![]);
        assert_eq!(s.phase(), Phase::Reveal);
        assert_eq!(s.remaining_time(), DEFAULT_TIME_LIMIT);
    }

    #[test]
    fn reveal_shows_one_cell_per_step_then_opens_input() {
        let timing = SessionTiming {
            reveal_step: Duration::from_millis(100),
            reveal_hold: Duration::from_millis(500),
            ..SessionTiming::default()
        };
        let mut s = LevelSession::new(&level(&[(0, 0), (1, 0), (2, 0)], 3, 0), GRID, timing);
        let mut ev = vec![];

        s.tick(Duration::from_millis(10), &mut ev);
        assert_eq!(s.revealed_path(), &[Cell::new(0, 0)]);

        s.tick(Duration::from_millis(100), &mut ev);
        assert_eq!(s.revealed_path().len(), 2);

        s.tick(Duration::from_millis(200), &mut ev);
        assert_eq!(s.revealed_path().len(), 3);
        assert_eq!(s.phase(), Phase::Reveal);

        s.tick(Duration::from_millis(200), &mut ev);
        assert_eq!(s.phase(), Phase::Playing);
        assert!(s.revealed_path().is_empty());

        let steps = ev.iter().filter(|e| matches!(e, GameEvent::RevealStep { .. })).count();
        assert_eq!(steps, 3);
        assert_eq!(ev.last(), Some(&GameEvent::RevealFinished));
    }

    #[test]
    fn long_path_reveal_outlasts_hold() {
        let timing = SessionTiming {
            reveal_step: Duration::from_millis(100),
            reveal_hold: Duration::from_millis(150),
            ..SessionTiming::default()
        };
        let mut s = LevelSession::new(&level(&[(0, 0), (1, 0), (2, 0)], 3, 0), GRID, timing);
        s.tick(Duration::from_millis(200), &mut vec![]);
        assert_eq!(s.phase(), Phase::Reveal);
        s.tick(Duration::from_millis(100), &mut vec![]);
        assert_eq!(s.phase(), Phase::Playing);
    }

    #[test]
    fn skip_reveal_emits_remaining_steps() {
        let mut s = LevelSession::new(&level(&[(0, 0), (1, 0)], 2, 0), GRID, SessionTiming::default());
        let mut ev = vec![];
        s.skip_reveal(&mut ev);
        assert_eq!(
            ev,
            vec![
                GameEvent::RevealStep { index: 0, total: 2 },
                GameEvent::RevealStep { index: 1, total: 2 },
                GameEvent::RevealFinished,
            ]
        );
    }

    // ── Placement ──

    #[test]
    fn mirrored_target_is_derived_once() {
        let s = playing(&[(0, 0), (1, 0)], 2, 0);
        assert_eq!(s.target(), &[Cell::new(0, 3), Cell::new(1, 3)]);
    }

    #[test]
    fn scenario_two_correct_placements_succeed() {
        let mut s = playing(&[(0, 0), (1, 0)], 2, 0);
        let mut ev = vec![];
        assert_eq!(
            s.place(Cell::new(0, 3), &mut ev),
            PlaceOutcome::Placed { cell: Cell::new(0, 3), placement: Placement::Correct }
        );
        assert_eq!(s.phase(), Phase::Playing);
        s.place(Cell::new(1, 3), &mut ev);
        assert_eq!(s.phase(), Phase::Success);
        assert_eq!(s.remaining_ink(), 0);
        assert_eq!(ev.last(), Some(&GameEvent::LevelComplete));
        assert!(!ev.iter().any(|e| matches!(e, GameEvent::LevelFailed { .. })));
    }

    #[test]
    fn scenario_incorrect_with_zero_tolerance_fails_immediately() {
        let mut s = playing(&[(0, 0), (1, 0)], 2, 0);
        let mut ev = vec![];
        assert_eq!(
            s.place(Cell::new(0, 2), &mut ev),
            PlaceOutcome::Placed { cell: Cell::new(0, 2), placement: Placement::Incorrect }
        );
        assert_eq!(s.tile_state(Cell::new(0, 2)), TileState::Incorrect);
        assert_eq!(s.mistakes_made(), 1);
        assert_eq!(s.remaining_ink(), 1);
        assert_eq!(s.phase(), Phase::Failure(FailReason::Mistakes));
        assert_eq!(ev.last(), Some(&GameEvent::LevelFailed { reason: FailReason::Mistakes }));
    }

    #[test]
    fn any_order_completes() {
        let path = [(0, 0), (1, 0), (2, 1), (3, 1)];
        let orders: [[usize; 4]; 3] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1]];
        for order in orders {
            let mut s = playing(&path, 4, 0);
            for &i in &order {
                let target = s.target()[i];
                place(&mut s, target.row, target.col);
            }
            assert_eq!(s.phase(), Phase::Success, "order {order:?}");
            assert_eq!(s.mistakes_made(), 0);
        }
    }

    #[test]
    fn replacing_correct_cell_is_idempotent() {
        let mut s = playing(&[(0, 0), (1, 0)], 5, 1);
        place(&mut s, 0, 3);
        let ink = s.remaining_ink();
        assert_eq!(place(&mut s, 0, 3), PlaceOutcome::Rejected(RejectReason::AlreadyCorrect));
        assert_eq!(place(&mut s, 0, 3), PlaceOutcome::Rejected(RejectReason::AlreadyCorrect));
        assert_eq!(s.remaining_ink(), ink);
        assert_eq!(s.mistakes_made(), 0);
        assert_eq!(s.phase(), Phase::Playing);
    }

    #[test]
    fn source_side_click_is_noop() {
        let mut s = playing(&[(0, 0)], 3, 0);
        assert_eq!(place(&mut s, 0, 0), PlaceOutcome::Rejected(RejectReason::OutsideTarget));
        assert_eq!(place(&mut s, 0, 1), PlaceOutcome::Rejected(RejectReason::OutsideTarget));
        assert_eq!(place(&mut s, 9, 3), PlaceOutcome::Rejected(RejectReason::OutsideTarget));
        assert_eq!(s.remaining_ink(), 3);
        assert_eq!(s.mistakes_made(), 0);
        assert_eq!(s.phase(), Phase::Playing);
    }

    #[test]
    fn mistakes_fail_on_the_call_that_exceeds_the_limit() {
        let mut s = playing(&[(0, 0)], 10, 2);
        place(&mut s, 1, 2);
        place(&mut s, 2, 2);
        assert_eq!(s.mistakes_made(), 2);
        assert_eq!(s.phase(), Phase::Playing);
        place(&mut s, 3, 2);
        assert_eq!(s.phase(), Phase::Failure(FailReason::Mistakes));
    }

    #[test]
    fn reclicking_incorrect_cell_counts_again() {
        let mut s = playing(&[(0, 0)], 10, 5);
        place(&mut s, 1, 2);
        place(&mut s, 1, 2);
        assert_eq!(s.mistakes_made(), 2);
        assert_eq!(s.remaining_ink(), 8);
    }

    #[test]
    fn last_ink_spent_with_path_unfinished_fails_immediately() {
        let mut s = playing(&[(0, 0), (1, 0)], 2, 5);
        place(&mut s, 0, 3);
        let mut ev = vec![];
        s.place(Cell::new(3, 2), &mut ev);
        assert_eq!(s.remaining_ink(), 0);
        assert_eq!(s.phase(), Phase::Failure(FailReason::Ink));
        assert_eq!(ev.last(), Some(&GameEvent::LevelFailed { reason: FailReason::Ink }));
    }

    #[test]
    fn placing_with_no_ink_left_is_rejected_and_fails() {
        let mut s = playing(&[(0, 0), (1, 0)], 2, 5);
        s.remaining_ink = 0;
        let mut ev = vec![];
        let outcome = s.place(Cell::new(0, 3), &mut ev);
        assert_eq!(outcome, PlaceOutcome::Rejected(RejectReason::OutOfInk));
        assert_eq!(s.phase(), Phase::Failure(FailReason::Ink));
        assert_eq!(s.tile_state(Cell::new(0, 3)), TileState::Empty);
        assert_eq!(s.mistakes_made(), 0);
        assert_eq!(ev, vec![GameEvent::LevelFailed { reason: FailReason::Ink }]);
    }

    #[test]
    fn success_wins_over_ink_exhaustion() {
        let mut s = playing(&[(0, 0)], 1, 0);
        place(&mut s, 0, 3);
        assert_eq!(s.remaining_ink(), 0);
        assert_eq!(s.phase(), Phase::Success);
    }

    #[test]
    fn terminal_session_ignores_input() {
        let mut s = playing(&[(0, 0)], 1, 0);
        place(&mut s, 0, 3);
        assert_eq!(place(&mut s, 1, 3), PlaceOutcome::Rejected(RejectReason::NotPlaying));
        s.tick(DEFAULT_TIME_LIMIT, &mut vec![]);
        assert_eq!(s.phase(), Phase::Success);
    }

    // ── Clock ──

    #[test]
    fn time_running_out_fails_on_that_tick() {
        let mut s = playing(&[(0, 0)], 1, 0);
        let mut ev = vec![];
        s.tick(DEFAULT_TIME_LIMIT - Duration::from_millis(1), &mut ev);
        assert_eq!(s.phase(), Phase::Playing);
        s.tick(Duration::from_millis(5), &mut ev);
        assert_eq!(s.remaining_time(), Duration::ZERO);
        assert_eq!(s.phase(), Phase::Failure(FailReason::Time));
        assert_eq!(ev.last(), Some(&GameEvent::LevelFailed { reason: FailReason::Time }));
    }

    #[test]
    fn timer_warnings_fire_once_per_interval_below_threshold() {
        let mut s = playing(&[(0, 0)], 1, 0);
        let mut ev = vec![];
        // 25s limit: nothing until 10s remain
        s.tick(Duration::from_millis(14_000), &mut ev);
        assert!(ev.is_empty());
        s.tick(Duration::from_millis(1_000), &mut ev); // 10.0s left
        s.tick(Duration::from_millis(500), &mut ev); //  9.5s
        s.tick(Duration::from_millis(500), &mut ev); //  9.0s
        s.tick(Duration::from_millis(2_500), &mut ev); // 6.5s, one warning for the jump
        let warnings = ev.iter().filter(|e| matches!(e, GameEvent::TimerWarning { .. })).count();
        assert_eq!(warnings, 3);
    }

    #[test]
    fn tile_fades_advance_with_ticks() {
        let mut s = playing(&[(0, 0), (1, 0)], 2, 0);
        place(&mut s, 0, 3);
        assert!(s.tiles().any(|(c, t)| c == Cell::new(0, 3) && t.is_transitioning()));
        s.tick(Duration::from_millis(300), &mut vec![]);
        assert!(!s.tiles().any(|(c, t)| c == Cell::new(0, 3) && t.is_transitioning()));
    }
}
