//! Things that happened during a tic, for collaborators outside the core.
//!
//! The simulation never plays audio. It records which sound should start
//! and where, and the audio layer decides what to do with it.

use serde::{Deserialize, Serialize};

use crate::thinker::ThinkerId;

/// Sound effects the simulation can request.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sfx {
    Pstart,
    Pstop,
    Stnmov,
    Swtchn,
    Swtchx,
    Doropn,
    Dorcls,
    Bdopn,
    Bdcls,
    Oof,
    Noway,
    Itemup,
    Wpnup,
}

impl Sfx {
    /// Lump name without the `DS` prefix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pstart => "pstart",
            Self::Pstop => "pstop",
            Self::Stnmov => "stnmov",
            Self::Swtchn => "swtchn",
            Self::Swtchx => "swtchx",
            Self::Doropn => "doropn",
            Self::Dorcls => "dorcls",
            Self::Bdopn => "bdopn",
            Self::Bdcls => "bdcls",
            Self::Oof => "oof",
            Self::Noway => "noway",
            Self::Itemup => "itemup",
            Self::Wpnup => "wpnup",
        }
    }
}

/// Where a sound comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundOrigin {
    /// A sector's sound origin.
    Sector(usize),
    /// The midpoint of a line.
    Line(usize),
    /// A map object.
    Mobj(ThinkerId),
    /// Not positioned.
    Global,
}

/// A sound start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundEvent {
    /// Which sound.
    pub sfx: Sfx,
    /// Where it starts.
    pub origin: SoundOrigin,
}

/// How the level was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelExit {
    /// Normal exit.
    Normal,
    /// Secret exit.
    Secret,
}

/// Events generated during one tic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Sounds started this tic, in order.
    pub sounds: Vec<SoundEvent>,
    /// Set when something ended the level this tic.
    pub exit: Option<LevelExit>,
    /// Dead players who pressed use and wait to be respawned by the driver.
    pub reborn: Vec<usize>,
    /// Whether the tic was skipped because the game is paused.
    pub paused: bool,
}

impl TickEvents {
    /// Record a sound.
    pub fn start_sound(&mut self, origin: SoundOrigin, sfx: Sfx) {
        self.sounds.push(SoundEvent { sfx, origin });
    }

    /// Number of times `sfx` was started.
    #[must_use]
    pub fn count(&self, sfx: Sfx) -> usize {
        self.sounds.iter().filter(|s| s.sfx == sfx).count()
    }
}
