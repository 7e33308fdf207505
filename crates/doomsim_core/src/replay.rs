//! Replay system for recording and playing back levels.
//!
//! A replay stores the level, the game settings and one command vector per
//! tic. Because the world is deterministic this is enough to recreate any
//! run exactly; the final state hash recorded alongside lets playback prove
//! it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::GameConfig;
use crate::error::{Result, SimError};
use crate::events::TickEvents;
use crate::input::TicCmd;
use crate::map::data::LevelData;
use crate::world::World;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// The level played.
    pub level: LevelData,
    /// Game settings.
    pub config: GameConfig,
    /// Commands per tic, one entry per player slot.
    pub tics: Vec<Vec<TicCmd>>,
    /// State hash after the last tic.
    pub final_hash: u64,
}

impl Replay {
    /// Start an empty recording.
    #[must_use]
    pub fn new(level: LevelData, config: GameConfig) -> Self {
        Self {
            version: REPLAY_VERSION,
            level,
            config,
            tics: Vec::new(),
            final_hash: 0,
        }
    }

    /// Record one tic's commands.
    pub fn record(&mut self, cmds: &[TicCmd]) {
        self.tics.push(cmds.to_vec());
    }

    /// Finalize the replay with the state hash after the last tic.
    pub fn finalize(&mut self, final_hash: u64) {
        self.final_hash = final_hash;
    }

    /// Play `commands` from the start of the level and record them.
    pub fn record_run<I>(level: LevelData, config: GameConfig, commands: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<TicCmd>>,
    {
        let mut world = World::from_data(&level, config.clone())?;
        let mut replay = Self::new(level, config);
        for cmds in commands {
            world.tick(&cmds)?;
            replay.record(&cmds);
        }
        replay.finalize(world.state_hash());
        Ok(replay)
    }

    /// Number of recorded tics.
    #[must_use]
    pub fn duration(&self) -> usize {
        self.tics.len()
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SimError::Serialization(format!("failed to encode replay: {e}")))
    }

    /// Decode with bincode, checking the format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| SimError::Serialization(format!("failed to decode replay: {e}")))?;
        if replay.version != REPLAY_VERSION {
            return Err(SimError::Serialization(format!(
                "replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| SimError::Serialization(format!("failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| SimError::Serialization(format!("failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// Plays a replay back one tic at a time.
#[derive(Debug)]
pub struct ReplayPlayer<'r> {
    replay: &'r Replay,
    world: World,
    position: usize,
}

impl<'r> ReplayPlayer<'r> {
    /// Build the level and stand before the first tic.
    pub fn new(replay: &'r Replay) -> Result<Self> {
        Ok(Self {
            replay,
            world: World::from_data(&replay.level, replay.config.clone())?,
            position: 0,
        })
    }

    /// Run the next recorded tic. `None` once every tic has run.
    pub fn advance(&mut self) -> Result<Option<TickEvents>> {
        let Some(cmds) = self.replay.tics.get(self.position) else {
            return Ok(None);
        };
        let events = self.world.tick(cmds)?;
        self.position += 1;
        Ok(Some(events))
    }

    /// Move to just before tic `tic`. Seeking backwards replays from the
    /// start of the level.
    pub fn seek(&mut self, tic: usize) -> Result<()> {
        if tic > self.replay.duration() {
            return Err(SimError::InvalidState(format!(
                "seek to tic {tic} past the end of a {}-tic replay",
                self.replay.duration()
            )));
        }
        if tic < self.position {
            self.world = World::from_data(&self.replay.level, self.replay.config.clone())?;
            self.position = 0;
        }
        while self.position < tic {
            self.advance()?;
        }
        Ok(())
    }

    /// Play to the end and compare the final state hash with the
    /// recorded one.
    pub fn verify(&mut self) -> Result<bool> {
        self.seek(self.replay.duration())?;
        let hash = self.world.state_hash();
        if hash != self.replay.final_hash {
            tracing::warn!(
                expected = self.replay.final_hash,
                actual = hash,
                tics = self.position,
                "replay diverged"
            );
        }
        Ok(hash == self.replay.final_hash)
    }

    /// Tics played so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Whether every recorded tic has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.position >= self.replay.duration()
    }

    /// The world being played.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }
}
