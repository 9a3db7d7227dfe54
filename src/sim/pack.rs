/// Level pack loader.
///
/// ## Sources (priority order):
///   1. `levels_file` from config.toml (a TOML pack)
///   2. Built-in embedded levels (25)
///
/// ## Pack format (TOML):
///   ```toml
///   name = "My Pack"
///
///   [defaults]            # optional; each key optional
///   time_ms = 25000
///   ink = 25
///   mistakes = 5
///
///   [[level]]
///   name = "L shape"      # optional, defaults to "Level N"
///   path = [[2, 1], [3, 1], [4, 1]]   # [row, col] on the left half, reveal order
///   time_ms = 30000       # optional overrides
///   ink = 30
///   mistakes = 7
///   ```
///
/// Every level is validated while loading. One bad level rejects the
/// whole pack: the game refuses to start rather than run an unsolvable level.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::domain::grid::{Cell, Grid};
use crate::domain::level::{
    LevelDef, LevelError, DEFAULT_INK_LIMIT, DEFAULT_MISTAKE_LIMIT, DEFAULT_TIME_LIMIT,
};

#[derive(Debug, Error)]
pub enum PackError {
    #[error("could not read level pack {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("level pack {origin} is not valid TOML: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("level pack {name} contains no levels")]
    Empty { name: String },

    #[error(transparent)]
    Invalid(#[from] LevelError),
}

/// An ordered, non-empty list of validated levels.
#[derive(Clone, Debug)]
pub struct LevelPack {
    name: String,
    levels: Vec<LevelDef>,
}

impl LevelPack {
    pub fn new(name: impl Into<String>, levels: Vec<LevelDef>) -> Result<Self, PackError> {
        let name = name.into();
        if levels.is_empty() {
            return Err(PackError::Empty { name });
        }
        Ok(LevelPack { name, levels })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn levels(&self) -> &[LevelDef] { &self.levels }
    pub fn len(&self) -> usize { self.levels.len() }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the pack selected by the config.
pub fn load(config: &GameConfig, grid: Grid) -> Result<LevelPack, PackError> {
    let pack = match &config.levels_file {
        Some(path) => load_file(path, grid)?,
        None => builtin(grid)?,
    };
    info!(pack = pack.name(), levels = pack.len(), "level pack loaded");
    Ok(pack)
}

/// The 25 levels shipped with the game.
pub fn builtin(grid: Grid) -> Result<LevelPack, PackError> {
    let defaults = TomlDefaults::default();
    let levels = embedded_levels()
        .into_iter()
        .enumerate()
        .map(|(i, raw)| resolve(raw, i, &defaults, grid))
        .collect::<Result<Vec<_>, _>>()?;
    LevelPack::new("Built-in Levels", levels)
}

pub fn load_file(path: &Path, grid: Grid) -> Result<LevelPack, PackError> {
    let text = std::fs::read_to_string(path).map_err(|source| PackError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_pack(&text, &path.display().to_string(), grid)
}

/// Parse and validate a TOML pack. `origin` names the source in errors.
pub fn parse_pack(text: &str, origin: &str, grid: Grid) -> Result<LevelPack, PackError> {
    let file: TomlPack = toml::from_str(text).map_err(|source| PackError::Parse {
        origin: origin.to_string(),
        source,
    })?;

    let name = file.name.unwrap_or_else(|| origin.to_string());
    if file.level.is_empty() {
        warn!(pack = %name, "level pack has no [[level]] entries");
    }
    let levels = file
        .level
        .into_iter()
        .enumerate()
        .map(|(i, raw)| resolve(raw, i, &file.defaults, grid))
        .collect::<Result<Vec<_>, _>>()?;

    LevelPack::new(name, levels)
}

// ══════════════════════════════════════════════════════════════
// TOML schema
// ══════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TomlPack {
    name: Option<String>,
    #[serde(default)]
    defaults: TomlDefaults,
    #[serde(default)]
    level: Vec<TomlLevel>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TomlDefaults {
    #[serde(default = "default_time_ms")]
    time_ms: u64,
    #[serde(default = "default_ink")]
    ink: u32,
    #[serde(default = "default_mistakes")]
    mistakes: u32,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TomlLevel {
    name: Option<String>,
    path: Vec<[usize; 2]>,
    time_ms: Option<u64>,
    ink: Option<u32>,
    mistakes: Option<u32>,
}

fn default_time_ms() -> u64 { DEFAULT_TIME_LIMIT.as_millis() as u64 }
fn default_ink() -> u32 { DEFAULT_INK_LIMIT }
fn default_mistakes() -> u32 { DEFAULT_MISTAKE_LIMIT }

impl Default for TomlDefaults {
    fn default() -> Self {
        TomlDefaults {
            time_ms: default_time_ms(),
            ink: default_ink(),
            mistakes: default_mistakes(),
        }
    }
}

fn resolve(raw: TomlLevel, index: usize, defaults: &TomlDefaults, grid: Grid) -> Result<LevelDef, LevelError> {
    let name = match raw.name {
        Some(n) => format!("Level {} - {}", index + 1, n),
        None => format!("Level {}", index + 1),
    };
    let path = raw.path.into_iter().map(|[row, col]| Cell::new(row, col)).collect();
    LevelDef::new(
        name,
        path,
        Duration::from_millis(raw.time_ms.unwrap_or(defaults.time_ms)),
        raw.ink.unwrap_or(defaults.ink),
        raw.mistakes.unwrap_or(defaults.mistakes),
        grid,
    )
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

fn embedded_levels() -> Vec<TomlLevel> {
    vec![
        make_embedded("Simple L", &[(2, 1), (3, 1), (4, 1), (4, 2), (4, 3)], None, None, None),
        make_embedded("Diagonal", &[(1, 1), (2, 2), (3, 3), (4, 4)], None, None, None),
        make_embedded("U Turn", &[(6, 2), (5, 2), (4, 2), (4, 3), (4, 4), (5, 4), (6, 4)], None, None, None),
        make_embedded("Cross", &[(3, 2), (4, 2), (5, 2), (4, 1), (4, 3)], None, None, None),
        make_embedded("Zig Zag", &[(1, 1), (1, 2), (2, 2), (2, 3), (3, 3), (3, 4)], None, None, None),
        make_embedded("Frame", &[
            (2, 1), (2, 2), (2, 3), (2, 4), (3, 4), (4, 4),
            (5, 4), (5, 3), (5, 2), (5, 1), (4, 1), (3, 1),
        ], None, Some(30), Some(7)),
        make_embedded("Stairs", &[(7, 1), (6, 1), (6, 2), (5, 2), (5, 3), (4, 3), (4, 4)], None, None, None),
        make_embedded("T Junction", &[(2, 1), (2, 2), (2, 3), (3, 2), (4, 2)], None, None, None),
        make_embedded("S Bend", &[(1, 3), (1, 2), (2, 2), (3, 2), (3, 3), (4, 3), (4, 4)], Some(20_000), None, None),
        make_embedded("Switchback", &[
            (3, 1), (4, 1), (5, 1), (5, 2), (5, 3), (4, 3), (3, 3), (3, 4), (3, 5), (4, 5),
        ], None, Some(25), Some(5)),
        make_embedded("Small Spiral", &[
            (3, 3), (3, 4), (4, 4), (5, 4), (5, 3), (5, 2), (4, 2), (3, 2), (3, 1),
        ], None, None, None),
        make_embedded("Arrowhead", &[(1, 1), (2, 2), (3, 3), (4, 4), (3, 4), (5, 4), (4, 5)], None, None, Some(4)),
        make_embedded("Interlocking L", &[
            (1, 1), (2, 1), (3, 1), (3, 2), (3, 3), (4, 3), (5, 3), (5, 4), (5, 5), (6, 5),
        ], Some(35_000), Some(30), Some(6)),
        make_embedded("Thin Frame", &[
            (1, 1), (1, 2), (1, 3), (1, 4), (1, 5), (2, 5), (3, 5), (4, 5), (5, 5),
            (6, 5), (6, 4), (6, 3), (6, 2), (6, 1), (5, 1), (4, 1), (3, 1), (2, 1),
        ], None, Some(40), Some(8)),
        make_embedded("Checkerboard", &[
            (2, 1), (2, 3), (2, 5), (4, 1), (4, 3), (4, 5), (6, 1), (6, 3), (6, 5),
        ], Some(20_000), None, Some(3)),
        make_embedded("Long Snake", &[
            (1, 6), (1, 5), (1, 4), (2, 4), (3, 4), (3, 3), (3, 2),
            (4, 2), (5, 2), (5, 1), (6, 1), (7, 1), (8, 1),
        ], None, Some(35), Some(5)),
        make_embedded("Battlements", &[
            (4, 1), (4, 2), (3, 2), (3, 3), (2, 3), (2, 4), (3, 4), (3, 5), (4, 5), (4, 6), (5, 6),
        ], Some(30_000), None, None),
        make_embedded("Broken Ring", &[
            (2, 2), (3, 1), (4, 2), (5, 1), (6, 2), (5, 3), (4, 4), (3, 3),
        ], None, None, Some(4)),
        make_embedded("Double U", &[
            (2, 1), (3, 1), (4, 1), (4, 2), (3, 2), (2, 2), (2, 4),
            (3, 4), (4, 4), (4, 5), (3, 5), (2, 5), (5, 1), (5, 5),
        ], None, Some(35), Some(6)),
        make_embedded("Maze Entrance", &[
            (1, 1), (1, 2), (1, 3), (2, 3), (3, 3), (3, 2), (3, 1), (4, 1),
            (5, 1), (5, 2), (5, 3), (5, 4), (4, 4), (3, 4), (2, 4),
        ], Some(40_000), Some(40), Some(7)),
        make_embedded("Column", &[
            (1, 3), (2, 3), (3, 3), (4, 3), (5, 3), (6, 3), (7, 3), (8, 3), (9, 3), (10, 3),
        ], Some(15_000), None, Some(4)),
        make_embedded("Scattered Dots", &[(1, 1), (3, 5), (5, 2), (7, 6), (9, 3), (11, 1)], None, None, Some(2)),
        make_embedded("H Beam", &[(2, 1), (3, 1), (4, 1), (5, 1), (6, 1), (4, 2), (4, 3)], None, None, None),
        make_embedded("Long Plus", &[
            (3, 3), (4, 3), (5, 3), (6, 3), (7, 3), (5, 1), (5, 2),
            (5, 4), (5, 5), (1, 3), (2, 3), (8, 3), (9, 3),
        ], None, Some(30), Some(5)),
        make_embedded("Weave", &[
            (1, 1), (2, 1), (2, 2), (1, 2), (1, 3), (1, 4), (2, 4), (3, 4), (3, 3),
            (3, 2), (4, 2), (5, 2), (5, 3), (5, 4), (5, 5), (4, 5), (3, 5), (2, 5),
        ], Some(45_000), Some(45), Some(5)),
    ]
}

fn make_embedded(
    name: &str,
    path: &[(usize, usize)],
    time_ms: Option<u64>,
    ink: Option<u32>,
    mistakes: Option<u32>,
) -> TomlLevel {
    TomlLevel {
        name: Some(name.to_string()),
        path: path.iter().map(|&(r, c)| [r, c]).collect(),
        time_ms,
        ink,
        mistakes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_levels_all_validate() {
        let pack = builtin(Grid::STANDARD).unwrap();
        assert_eq!(pack.len(), 25);
        for def in pack.levels() {
            assert!(def.path().len() as u32 <= def.ink_limit(), "{}", def.name());
        }
    }

    #[test]
    fn builtin_overrides_apply() {
        let pack = builtin(Grid::STANDARD).unwrap();
        let first = &pack.levels()[0];
        assert_eq!(first.name(), "Level 1 - Simple L");
        assert_eq!(first.time_limit(), DEFAULT_TIME_LIMIT);
        assert_eq!(first.ink_limit(), DEFAULT_INK_LIMIT);
        assert_eq!(first.mistake_limit(), DEFAULT_MISTAKE_LIMIT);

        let last = &pack.levels()[24];
        assert_eq!(last.time_limit(), Duration::from_millis(45_000));
        assert_eq!(last.ink_limit(), 45);
        assert_eq!(last.mistake_limit(), 5);
        assert_eq!(last.path().len(), 18);
    }

    #[test]
    fn toml_pack_applies_defaults_then_overrides() {
        let text = r#"
            name = "Tiny"
            [defaults]
            ink = 4
            [[level]]
            path = [[0, 0], [1, 0]]
            [[level]]
            name = "Strict"
            path = [[0, 1]]
            mistakes = 0
            time_ms = 3000
        "#;
        let pack = parse_pack(text, "inline", Grid::new(4, 4)).unwrap();
        assert_eq!(pack.name(), "Tiny");
        let a = &pack.levels()[0];
        assert_eq!(a.name(), "Level 1");
        assert_eq!(a.ink_limit(), 4);
        assert_eq!(a.mistake_limit(), DEFAULT_MISTAKE_LIMIT);
        let b = &pack.levels()[1];
        assert_eq!(b.name(), "Level 2 - Strict");
        assert_eq!(b.mistake_limit(), 0);
        assert_eq!(b.time_limit(), Duration::from_millis(3000));
    }

    #[test]
    fn toml_pack_with_unsolvable_level_is_rejected() {
        let text = "[[level]]\npath = [[0, 0], [1, 0], [2, 0]]\nink = 2\n";
        let err = parse_pack(text, "inline", Grid::new(4, 4)).unwrap_err();
        assert!(matches!(err, PackError::Invalid(LevelError::InsufficientInk { needed: 3, .. })));
    }

    #[test]
    fn toml_pack_with_target_side_cell_is_rejected() {
        let text = "[[level]]\npath = [[0, 3]]\n";
        let err = parse_pack(text, "inline", Grid::new(4, 4)).unwrap_err();
        assert!(matches!(err, PackError::Invalid(LevelError::NotOnSourceSide { .. })));
    }

    #[test]
    fn empty_pack_is_rejected() {
        let err = parse_pack("name = \"Nothing\"\n", "inline", Grid::STANDARD).unwrap_err();
        assert!(matches!(err, PackError::Empty { .. }));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = parse_pack("[[level]\npath = 3", "inline", Grid::STANDARD).unwrap_err();
        assert!(matches!(err, PackError::Parse { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_file(Path::new("/nonexistent/mirrorpath/levels.toml"), Grid::STANDARD).unwrap_err();
        assert!(matches!(err, PackError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/mirrorpath/levels.toml"));
    }
}
