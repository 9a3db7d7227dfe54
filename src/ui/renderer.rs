/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Glyph)
///   2. Compare each glyph with `back` buffer (previous frame)
///   3. Only emit terminal commands for glyphs that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::grid::{Cell, Grid, GridLayout};
use crate::domain::tile::{Tile, TileState};
use crate::sim::game::{Snapshot, StageView};
use crate::sim::session::{FailReason, Phase};

// ── Palette ──

type Rgb = (u8, u8, u8);

const BACKGROUND: Rgb = (20, 30, 40);
const GRID_LINE: Rgb = (50, 60, 70);
const SYMMETRY_LINE: Rgb = (255, 255, 255);
const EMPTY_TILE: Rgb = (25, 35, 45);
const PATH_TILE: Rgb = (100, 180, 255);
const CORRECT_TILE: Rgb = (0, 200, 100);
const INCORRECT_TILE: Rgb = (220, 50, 50);
const UI_TEXT: Rgb = (230, 230, 230);
const MESSAGE_TEXT: Rgb = (255, 220, 180);
const DIM_TEXT: Rgb = (120, 130, 140);
const WARNING_TEXT: Rgb = (255, 90, 90);

fn rgb(c: Rgb) -> Color {
    Color::Rgb { r: c.0, g: c.1, b: c.2 }
}

fn state_rgb(state: TileState) -> Rgb {
    match state {
        TileState::Empty => EMPTY_TILE,
        TileState::Correct => CORRECT_TILE,
        TileState::Incorrect => INCORRECT_TILE,
    }
}

/// Linear blend from `a` to `b`; `t` is clamped to 0..=1.
fn blend(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// On-screen colour of a placed tile, mid-fade if it just changed.
fn tile_rgb(tile: &Tile) -> Rgb {
    blend(state_rgb(tile.previous()), state_rgb(tile.state()), tile.transition_progress())
}

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Glyph {
    /// Explicit background for all "empty" terminal cells, so the gap
    /// between rows matches the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: BACKGROUND.0, g: BACKGROUND.1, b: BACKGROUND.2 };

    const BLANK: Glyph = Glyph { ch: ' ', fg: Color::White, bg: Glyph::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    /// Different from any real glyph, so every position will be diff'd.
    const INVALID: Glyph = Glyph { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Glyph { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Glyphs ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Glyph::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Glyph::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, glyph: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = glyph;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Glyph::new(ch, fg, bg));
        }
    }

    /// Write a string centred on the buffer width.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, Glyph::BASE_BG);
    }
}

// ── Layout ──

/// Vertical offsets
const HUD_ROW: usize = 0;
const NAME_ROW: usize = 1;
const GRID_ROW: usize = 3;

/// Grid position for a terminal of the given size: centred horizontally,
/// fixed below the HUD.
pub fn layout_for(grid: Grid, term_w: usize) -> GridLayout {
    let probe = GridLayout::new(grid, 0, GRID_ROW as u16);
    let origin_x = term_w.saturating_sub(probe.span_x()) / 2;
    GridLayout::new(grid, origin_x.min(u16::MAX as usize) as u16, GRID_ROW as u16)
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_stage: Option<StageView>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_stage: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Glyph::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every glyph.
        self.back.cells.fill(Glyph::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Draw one frame. Returns where the grid landed so clicks can be
    /// mapped back to cells.
    pub fn render(&mut self, snap: &Snapshot, cursor: Option<Cell>) -> io::Result<GridLayout> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
        }

        // Detect stage change → clear for clean transition
        if self.last_stage != Some(snap.stage) {
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
            self.last_stage = Some(snap.stage);
        }

        let layout = layout_for(snap.grid, self.term_w);

        // Build front buffer
        self.front.clear();

        match snap.stage {
            StageView::Victory => self.compose_victory(snap),
            StageView::Level(phase) => {
                self.compose_hud(snap);
                self.compose_grid(snap, &layout, phase, cursor);
                self.compose_message(snap, &layout, phase);
            }
        }

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(layout)
    }

    // ── Diff flush: only write changed glyphs ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Glyph::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Set explicit base colors at start of frame.
        // Do NOT use ResetColor here: it resets to the terminal's native
        // default, which may differ from BASE_BG and cause line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Glyph::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let glyph = self.front.get(x, y);
                if glyph == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                // Position cursor if needed
                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                // Set colors only if changed
                if glyph.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(glyph.fg))?;
                    last_fg = glyph.fg;
                }
                if glyph.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(glyph.bg))?;
                    last_bg = glyph.bg;
                }

                queue!(self.writer, Print(glyph.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, s: &Snapshot) {
        let secs = s.remaining_time.as_secs_f32();
        let hud = format!(
            " Level {}/{}   Time {:>5.1}s   Ink {}/{}   Mistakes {}/{} ",
            s.level_number, s.total_levels,
            secs,
            s.remaining_ink, s.ink_limit,
            s.mistakes_made, s.mistake_limit,
        );
        // Time turns red in the last ten seconds of play
        let low_time = matches!(s.stage, StageView::Level(Phase::Playing)) && secs < 10.0;
        let fg = if low_time { rgb(WARNING_TEXT) } else { rgb(UI_TEXT) };
        self.front.put_centered(HUD_ROW, &hud, fg);
        self.front.put_centered(NAME_ROW, &s.level_name, rgb(DIM_TEXT));
    }

    fn compose_grid(&mut self, s: &Snapshot, layout: &GridLayout, phase: Phase, cursor: Option<Cell>) {
        let grid = s.grid;

        // Base: empty tiles with a dot in the grid-line colour
        for cell in grid.cells() {
            self.paint_cell(layout, cell, '·', rgb(GRID_LINE), rgb(EMPTY_TILE));
        }

        // Symmetry line in the gap between halves
        let axis_x = layout.axis_x();
        for row in 0..layout.span_y() {
            let y = layout.origin_y as usize + row;
            self.front.set(axis_x, y, Glyph::new('│', rgb(SYMMETRY_LINE), Glyph::BASE_BG));
        }

        // Reveal: the source path drawn so far
        for &cell in &s.revealed {
            self.paint_cell(layout, cell, ' ', rgb(UI_TEXT), rgb(PATH_TILE));
        }

        // Placed tiles, blended while fading
        for (cell, tile) in &s.tiles {
            let mark = match tile.state() {
                TileState::Incorrect => '×',
                _ => ' ',
            };
            self.paint_cell(layout, *cell, mark, rgb(UI_TEXT), rgb(tile_rgb(tile)));
        }

        // Failure: where the path should have gone
        for &cell in &s.missed {
            let dim = blend(EMPTY_TILE, PATH_TILE, 0.45);
            self.paint_cell(layout, cell, '░', rgb(PATH_TILE), rgb(dim));
        }

        if phase == Phase::Playing {
            if let Some(cell) = cursor {
                let (x, y) = layout.cell_origin(cell);
                let bg = self.front.get(x, y).bg;
                self.front.set(x, y, Glyph::new('[', rgb(SYMMETRY_LINE), bg));
                self.front.set(x + 1, y, Glyph::new(']', rgb(SYMMETRY_LINE), bg));
            }
        }
    }

    /// Fill one grid cell (`cell_w` terminal columns); `mark` goes in the first.
    fn paint_cell(&mut self, layout: &GridLayout, cell: Cell, mark: char, fg: Color, bg: Color) {
        let (x, y) = layout.cell_origin(cell);
        for dx in 0..layout.cell_w as usize {
            let ch = if dx == 0 { mark } else { ' ' };
            for dy in 0..layout.cell_h as usize {
                self.front.set(x + dx, y + dy, Glyph::new(ch, fg, bg));
            }
        }
    }

    fn compose_message(&mut self, s: &Snapshot, layout: &GridLayout, phase: Phase) {
        let y = layout.origin_y as usize + layout.span_y() + 1;
        let msg = rgb(MESSAGE_TEXT);
        let hint = rgb(DIM_TEXT);

        match phase {
            Phase::Reveal => {
                self.front.put_centered(y, "Memorize the path", msg);
                self.front.put_centered(y + 2, "Enter/Space: start now   Esc: quit", hint);
            }
            Phase::Playing => {
                self.front.put_centered(y, "Draw its mirror image on the right", rgb(UI_TEXT));
                self.front.put_centered(
                    y + 2,
                    "Click a cell, or arrows/WASD + Space to place   Esc: quit",
                    hint,
                );
            }
            Phase::Success => {
                let text = format!("LEVEL {} COMPLETE!", s.level_number);
                self.front.put_centered(y, &text, rgb(CORRECT_TILE));
                self.front.put_centered(y + 2, "Click or press any key to continue", hint);
            }
            Phase::Failure(reason) => {
                self.front.put_centered(y, fail_message(reason), rgb(INCORRECT_TILE));
                self.front.put_centered(y + 2, "Click or press any key to restart from level 1", hint);
            }
        }
    }

    fn compose_victory(&mut self, s: &Snapshot) {
        let box_art = [
            "╔══════════════════════════════════╗",
            "║   ★  CONGRATULATIONS!  ★         ║",
            "╚══════════════════════════════════╝",
        ];
        let top = self.front.height.saturating_sub(8) / 2;
        for (i, line) in box_art.iter().enumerate() {
            self.front.put_centered(top + i, line, rgb(MESSAGE_TEXT));
        }
        let cleared = format!("All {} levels cleared", s.total_levels);
        self.front.put_centered(top + 4, &cleared, rgb(CORRECT_TILE));
        self.front.put_centered(top + 6, "Click or press any key to play again   Esc: quit", rgb(DIM_TEXT));
    }
}

fn fail_message(reason: FailReason) -> &'static str {
    match reason {
        FailReason::Time => "TIME'S UP!",
        FailReason::Ink => "OUT OF INK!",
        FailReason::Mistakes => "TOO MANY MISTAKES!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn layout_centres_grid() {
        let layout = layout_for(Grid::STANDARD, 80);
        // 16 cells * 2 cols + 1 gap = 33
        assert_eq!(layout.span_x(), 33);
        assert_eq!(layout.origin_x, (80 - 33) / 2);
        assert_eq!(layout.origin_y as usize, GRID_ROW);
    }

    #[test]
    fn narrow_terminal_pins_grid_left() {
        assert_eq!(layout_for(Grid::STANDARD, 10).origin_x, 0);
    }

    #[test]
    fn blend_endpoints_and_midpoint() {
        assert_eq!(blend(EMPTY_TILE, CORRECT_TILE, 0.0), EMPTY_TILE);
        assert_eq!(blend(EMPTY_TILE, CORRECT_TILE, 1.0), CORRECT_TILE);
        assert_eq!(blend((0, 0, 0), (200, 100, 50), 0.5), (100, 50, 25));
        assert_eq!(blend((0, 0, 0), (10, 10, 10), 7.0), (10, 10, 10));
    }

    #[test]
    fn tile_colour_fades_towards_new_state() {
        let mut tile = Tile::default();
        tile.set_state(TileState::Correct);
        assert_eq!(tile_rgb(&tile), EMPTY_TILE);

        tile.advance(Duration::from_secs(1));
        assert_eq!(tile_rgb(&tile), CORRECT_TILE);
    }

    #[test]
    fn every_failure_has_a_message() {
        for reason in [FailReason::Time, FailReason::Ink, FailReason::Mistakes] {
            assert!(!fail_message(reason).is_empty());
        }
    }
}
