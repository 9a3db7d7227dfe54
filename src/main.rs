/// Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{error, info};

use config::GameConfig;
use domain::grid::Grid;
use sim::event::GameEvent;
use sim::game::Game;
use sim::pack;
use ui::gamepad::GamepadState;
use ui::input::{Cursor, InputState};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    logging::init_tracing();
    let config = GameConfig::load();
    let grid = Grid::STANDARD;

    let pack = match pack::load(&config, grid) {
        Ok(p) => p,
        Err(e) => {
            error!("level pack rejected: {e}");
            eprintln!("mirrorpath: {e}");
            std::process::exit(1);
        }
    };

    let mut game = Game::new(&pack, grid, config.timing.session())
        .with_auto_advance(config.timing.auto_advance());

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        std::process::exit(1);
    }

    let sound = if config.sound { SoundEngine::new() } else { None };

    let result = game_loop(&mut game, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
        std::process::exit(1);
    }

    info!(level = game.level_index() + 1, victory = game.is_victory(), "quit");
    println!();
    println!("Thanks for playing Mirror Path!");
}

fn game_loop(
    game: &mut Game,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    info!(gamepad = gp.connected, sound = sound.is_some(), "input ready");
    let mut cursor = Cursor::new(game.grid());
    let mut last_tick = Instant::now();
    let tick_rate = config.timing.frame();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) || gp.cancel_pressed() {
            break;
        }

        handle_input(game, &kb, &gp, &mut cursor);

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            game.handle_tick(elapsed);
            last_tick = Instant::now();
        }

        process_sound_events(sound, &game.drain_events());

        let layout = renderer.render(&game.snapshot(), Some(cursor.cell))?;
        game.set_layout(layout);
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Enter];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

/// Route one frame of input by stage: acknowledge, skip the reveal, or play.
fn handle_input(game: &mut Game, kb: &InputState, gp: &GamepadState, cursor: &mut Cursor) {
    if game.awaiting_acknowledgement() {
        let any = kb.any_key() || !kb.clicks().is_empty() || gp.any_pressed();
        if any && game.acknowledge() {
            *cursor = Cursor::new(game.grid());
        }
        return;
    }

    if game.in_reveal() {
        if kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed() {
            game.skip_reveal();
        }
        return;
    }

    for &point in kb.clicks() {
        if game.awaiting_acknowledgement() {
            break;
        }
        let Some(cell) = game.layout().cell_for_point(point) else {
            continue;
        };
        // Mouse and cursor stay in step
        cursor.cell = cell;
        game.handle_click(point);
    }

    let (mut d_row, mut d_col) = gp.cursor_step();
    if kb.any_pressed(KEYS_UP) { d_row -= 1; }
    if kb.any_pressed(KEYS_DOWN) { d_row += 1; }
    if kb.any_pressed(KEYS_LEFT) { d_col -= 1; }
    if kb.any_pressed(KEYS_RIGHT) { d_col += 1; }
    if (d_row, d_col) != (0, 0) {
        cursor.step(d_row, d_col);
    }

    if kb.any_pressed(KEYS_CONFIRM) || gp.place_pressed() {
        game.place_at(cursor.cell);
    }
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::RevealStep { index, total } => sfx.play_path_step(*index, *total),
            GameEvent::InkSpent { .. } => sfx.play_click(),
            GameEvent::TileCorrect { .. } => sfx.play_correct(),
            GameEvent::TileIncorrect { .. } => sfx.play_incorrect(),
            GameEvent::TimerWarning { .. } => sfx.play_timer_warning(),
            GameEvent::LevelComplete => sfx.play_level_complete(),
            GameEvent::LevelFailed { .. } => sfx.play_game_over(),
            GameEvent::GameComplete => sfx.play_victory(),
            GameEvent::RevealFinished | GameEvent::LevelStarted { .. } => {}
        }
    }
}
