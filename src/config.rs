/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// ```toml
/// [timing]
/// frame_ms = 16
/// reveal_step_ms = 75
/// reveal_ms = 1800
/// timer_warning_ms = 10000
/// timer_warning_repeat_ms = 1000
/// auto_advance_ms = 0          # 0 = wait for a key after a cleared level
///
/// [gamepad]
/// place = ["A"]
/// confirm = ["Start", "B"]
/// cancel = ["Select"]
///
/// [general]
/// levels_file = "levels.toml"  # omit for the built-in levels
/// sound = true
/// ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::sim::session::SessionTiming;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub gamepad: GamepadConfig,
    pub levels_file: Option<PathBuf>,
    pub sound: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    pub frame_ms: u64,
    pub reveal_step_ms: u64,        // delay between path cells appearing
    pub reveal_ms: u64,             // minimum time the path stays visible
    pub timer_warning_ms: u64,
    pub timer_warning_repeat_ms: u64,
    pub auto_advance_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub place: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

impl TimingConfig {
    pub fn session(&self) -> SessionTiming {
        SessionTiming {
            reveal_step: Duration::from_millis(self.reveal_step_ms),
            reveal_hold: Duration::from_millis(self.reveal_ms),
            warn_below: Duration::from_millis(self.timer_warning_ms),
            warn_every: Duration::from_millis(self.timer_warning_repeat_ms),
        }
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }

    /// `None` when cleared levels wait for acknowledgement.
    pub fn auto_advance(&self) -> Option<Duration> {
        (self.auto_advance_ms > 0).then(|| Duration::from_millis(self.auto_advance_ms))
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame")]
    frame_ms: u64,
    #[serde(default = "default_reveal_step")]
    reveal_step_ms: u64,
    #[serde(default = "default_reveal")]
    reveal_ms: u64,
    #[serde(default = "default_timer_warning")]
    timer_warning_ms: u64,
    #[serde(default = "default_timer_warning_repeat")]
    timer_warning_repeat_ms: u64,
    #[serde(default)]
    auto_advance_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_place")]
    place: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    levels_file: Option<String>,
    #[serde(default = "default_sound")]
    sound: bool,
}

// ── Defaults ──

fn default_frame() -> u64 { 16 }
fn default_reveal_step() -> u64 { 75 }
fn default_reveal() -> u64 { 1800 }
fn default_timer_warning() -> u64 { 10_000 }
fn default_timer_warning_repeat() -> u64 { 1000 }
fn default_sound() -> bool { true }

fn default_place() -> Vec<String> { vec!["A".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into(), "B".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            frame_ms: default_frame(),
            reveal_step_ms: default_reveal_step(),
            reveal_ms: default_reveal(),
            timer_warning_ms: default_timer_warning(),
            timer_warning_repeat_ms: default_timer_warning_repeat(),
            auto_advance_ms: 0,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            place: default_place(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_file: None,
            sound: default_sound(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) ~/.local/share/mirrorpath, (4) /usr/share/mirrorpath.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Build a config from TOML text (no file search). Relative paths stay relative.
    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(toml_cfg, &[]))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Relative levels_file: first candidate dir that has it, else as given
        let levels_file = toml_cfg.general.levels_file.map(|name| {
            let path = PathBuf::from(&name);
            if path.is_absolute() {
                return path;
            }
            search_dirs.iter()
                .map(|d| d.join(&name))
                .find(|p| p.is_file())
                .unwrap_or(path)
        });

        GameConfig {
            timing: TimingConfig {
                frame_ms: toml_cfg.timing.frame_ms,
                reveal_step_ms: toml_cfg.timing.reveal_step_ms,
                reveal_ms: toml_cfg.timing.reveal_ms,
                timer_warning_ms: toml_cfg.timing.timer_warning_ms,
                timer_warning_repeat_ms: toml_cfg.timing.timer_warning_repeat_ms,
                auto_advance_ms: toml_cfg.timing.auto_advance_ms,
            },
            gamepad: GamepadConfig {
                place: toml_cfg.gamepad.place,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            levels_file,
            sound: toml_cfg.general.sound,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data dirs (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable (symlinks resolved)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home
    if let Some(xdg) = data_home() {
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/mirrorpath");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// `~/.local/share/mirrorpath`, if HOME is set.
pub fn data_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share/mirrorpath"))
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    debug!(path = %path.display(), "config loaded");
                    return cfg;
                }
                Err(e) => {
                    warn!(path = %path.display(), "config.toml parse error, using defaults: {e}");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                warn!(path = %path.display(), "could not read config.toml: {e}");
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.timing.reveal_step_ms, 75);
        assert_eq!(cfg.timing.reveal_ms, 1800);
        assert_eq!(cfg.timing.auto_advance(), None);
        assert_eq!(cfg.gamepad.place, vec!["A".to_string()]);
        assert!(cfg.levels_file.is_none());
        assert!(cfg.sound);
        assert_eq!(cfg.timing.session(), SessionTiming::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[timing]\nreveal_ms = 500\nauto_advance_ms = 1500\n[general]\nsound = false\nlevels_file = \"pack.toml\"\n",
        )
        .unwrap();
        assert_eq!(cfg.timing.reveal_ms, 500);
        assert_eq!(cfg.timing.reveal_step_ms, 75);
        assert_eq!(cfg.timing.auto_advance(), Some(Duration::from_millis(1500)));
        assert!(!cfg.sound);
        assert_eq!(cfg.levels_file, Some(PathBuf::from("pack.toml")));
    }

    #[test]
    fn zero_frame_rate_is_clamped() {
        let cfg = GameConfig::from_toml_str("[timing]\nframe_ms = 0\n").unwrap();
        assert_eq!(cfg.timing.frame(), Duration::from_millis(1));
    }

    #[test]
    fn bad_types_are_an_error() {
        assert!(GameConfig::from_toml_str("[timing]\nreveal_ms = \"soon\"\n").is_err());
    }
}
