//! Loading levels, game settings and input scripts from disk.
//!
//! A level is either a RON file holding [`LevelData`] or a directory of
//! raw map lumps (`THINGS`, `LINEDEFS`, ... one file each, optionally with a
//! `.lmp` extension). Settings and input scripts are RON.

use std::fs;
use std::path::{Path, PathBuf};

use doomsim_core::config::GameConfig;
use doomsim_core::input::TicCmd;
use doomsim_core::map::lumps::MapLumps;
use doomsim_core::map::LevelData;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading level, settings or input files.
#[derive(Debug, Error)]
pub enum LevelSourceError {
    /// The file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A RON file did not parse.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that failed.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A lump directory lacks a required lump.
    #[error("lump directory {dir} has no {lump} lump")]
    MissingLump {
        /// Directory searched.
        dir: String,
        /// Lump name.
        lump: &'static str,
    },

    /// The core rejected the data.
    #[error(transparent)]
    Sim(#[from] doomsim_core::error::SimError),
}

/// Result alias for loading.
pub type Result<T> = std::result::Result<T, LevelSourceError>;

/// One step of an input script: `cmds` (one per player) held for `repeat`
/// tics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStep {
    /// Commands per player slot.
    pub cmds: Vec<TicCmd>,
    /// How many tics to hold them.
    #[serde(default = "one")]
    pub repeat: u32,
}

const fn one() -> u32 {
    1
}

/// A run-length encoded list of per-tic commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputScript {
    /// Steps in order.
    pub steps: Vec<InputStep>,
}

impl InputScript {
    /// Total tics the script covers.
    #[must_use]
    pub fn tics(&self) -> usize {
        self.steps.iter().map(|s| s.repeat as usize).sum()
    }

    /// One command vector per tic.
    #[must_use]
    pub fn expand(&self) -> Vec<Vec<TicCmd>> {
        let mut tics = Vec::with_capacity(self.tics());
        for step in &self.steps {
            for _ in 0..step.repeat {
                tics.push(step.cmds.clone());
            }
        }
        tics
    }

    /// Expand, then pad with empty commands or cut to exactly `tics`.
    #[must_use]
    pub fn expand_to(&self, tics: usize) -> Vec<Vec<TicCmd>> {
        let mut expanded = self.expand();
        expanded.resize(tics, Vec::new());
        expanded
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| LevelSourceError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_ron<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_to_string(path)?;
    ron::from_str(&text).map_err(|e| LevelSourceError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Load a level from a RON file or a lump directory.
pub fn load_level(path: &Path) -> Result<LevelData> {
    let level = if path.is_dir() {
        load_lump_dir(path)?
    } else {
        parse_ron(path)?
    };
    tracing::info!(
        path = %path.display(),
        level = %level.name,
        sectors = level.sectors.len(),
        lines = level.lines.len(),
        things = level.things.len(),
        "level loaded"
    );
    Ok(level)
}

/// Load game settings; defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    match path {
        Some(path) => parse_ron(path),
        None => Ok(GameConfig::default()),
    }
}

/// Load an input script; empty when no path is given.
pub fn load_input(path: Option<&Path>) -> Result<InputScript> {
    match path {
        Some(path) => parse_ron(path),
        None => Ok(InputScript::default()),
    }
}

fn find_lump(dir: &Path, name: &str) -> Option<PathBuf> {
    [name.to_string(), format!("{name}.lmp"), name.to_ascii_lowercase(), format!("{}.lmp", name.to_ascii_lowercase())]
        .into_iter()
        .map(|file| dir.join(file))
        .find(|p| p.is_file())
}

fn read_lump(dir: &Path, name: &'static str) -> Result<Vec<u8>> {
    let path = find_lump(dir, name).ok_or_else(|| LevelSourceError::MissingLump {
        dir: dir.display().to_string(),
        lump: name,
    })?;
    read_optional_lump(&path)
}

fn read_optional_lump(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| LevelSourceError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Decode a directory of raw map lumps. The level is named after the
/// directory.
pub fn load_lump_dir(dir: &Path) -> Result<LevelData> {
    let lumps = MapLumps {
        things: read_lump(dir, "THINGS")?,
        linedefs: read_lump(dir, "LINEDEFS")?,
        sidedefs: read_lump(dir, "SIDEDEFS")?,
        vertexes: read_lump(dir, "VERTEXES")?,
        segs: read_lump(dir, "SEGS")?,
        ssectors: read_lump(dir, "SSECTORS")?,
        nodes: read_lump(dir, "NODES")?,
        sectors: read_lump(dir, "SECTORS")?,
        reject: find_lump(dir, "REJECT").map(|p| read_optional_lump(&p)).transpose()?,
        blockmap: find_lump(dir, "BLOCKMAP").map(|p| read_optional_lump(&p)).transpose()?,
    };
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "MAP".to_string());
    Ok(LevelData::from_lumps(&name, &lumps)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doomsim_test_utils::fixtures::{door_level, level_to_ron};

    #[test]
    fn test_input_script_expands_repeats() {
        let script: InputScript = ron::from_str(
            "(steps: [(cmds: [(forward_move: 25, side_move: 0, angle_turn: 0, buttons: 0)], repeat: 3), (cmds: [])])",
        )
        .unwrap();
        assert_eq!(script.tics(), 4);
        let tics = script.expand();
        assert_eq!(tics[2], vec![TicCmd::forward(25)]);
        assert!(tics[3].is_empty());
        assert_eq!(script.expand_to(6).len(), 6);
        assert_eq!(script.expand_to(2).len(), 2);
    }

    #[test]
    fn test_ron_level_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.ron");
        fs::write(&path, level_to_ron(&door_level()).unwrap()).unwrap();
        assert_eq!(load_level(&path).unwrap(), door_level());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_level(&dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, LevelSourceError::Io { .. }));
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");
        fs::write(&path, "(skill: Sideways)").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(LevelSourceError::Parse { .. })));
    }

    #[test]
    fn test_lump_dir_requires_every_lump() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("THINGS"), []).unwrap();
        let err = load_lump_dir(dir.path()).unwrap_err();
        assert!(matches!(err, LevelSourceError::MissingLump { lump: "LINEDEFS", .. }));
    }

    #[test]
    fn test_malformed_lump_is_a_core_error() {
        let dir = tempfile::tempdir().unwrap();
        for lump in ["THINGS", "LINEDEFS", "SIDEDEFS", "VERTEXES", "SEGS", "SSECTORS", "NODES", "SECTORS"] {
            fs::write(dir.path().join(lump), []).unwrap();
        }
        fs::write(dir.path().join("THINGS.lmp"), [0u8; 7]).unwrap();
        fs::remove_file(dir.path().join("THINGS")).unwrap();
        let err = load_lump_dir(dir.path()).unwrap_err();
        assert!(matches!(err, LevelSourceError::Sim(_)));
    }
}
