//! Game rules fixed for the whole level.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Number of player slots.
pub const MAXPLAYERS: usize = 4;

/// Difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Skill {
    /// I'm too young to die.
    Baby,
    /// Hey, not too rough.
    Easy,
    /// Hurt me plenty.
    #[default]
    Medium,
    /// Ultra-violence.
    Hard,
    /// Nightmare!
    Nightmare,
}

impl Skill {
    /// Map thing option bit that selects things for this skill.
    #[must_use]
    pub const fn thing_bit(self) -> i16 {
        match self {
            Self::Baby | Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard | Self::Nightmare => 4,
        }
    }

    /// Whether ammo pickups are doubled.
    #[must_use]
    pub const fn doubles_ammo(self) -> bool {
        matches!(self, Self::Baby | Self::Nightmare)
    }
}

/// Which game the level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    /// Episode 1 only.
    Shareware,
    /// Three episodes.
    #[default]
    Registered,
    /// Four episodes.
    Retail,
    /// One 32-map episode.
    Commercial,
}

impl GameMode {
    /// Highest switch texture set available in this game.
    #[must_use]
    pub const fn switch_episode(self) -> u8 {
        match self {
            Self::Shareware => 1,
            Self::Registered | Self::Retail => 2,
            Self::Commercial => 3,
        }
    }
}

/// Rules for one level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Difficulty.
    pub skill: Skill,
    /// Game mode.
    pub mode: GameMode,
    /// 0 for cooperative, 1 for deathmatch, 2 for altdeath.
    pub deathmatch: u8,
    /// Whether this is a network game.
    pub netgame: bool,
    /// Suppress monster spawns.
    pub no_monsters: bool,
    /// Which player slots are in the game.
    pub players_in_game: [bool; MAXPLAYERS],
    /// Deathmatch time limit in minutes.
    pub time_limit: Option<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            skill: Skill::default(),
            mode: GameMode::default(),
            deathmatch: 0,
            netgame: false,
            no_monsters: false,
            players_in_game: [true, false, false, false],
            time_limit: None,
        }
    }
}

impl GameConfig {
    /// Parse a RON config.
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| SimError::Serialization(format!("bad game config: {e}")))
    }

    /// Builder-style skill override.
    #[must_use]
    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skill = skill;
        self
    }

    /// Builder-style player slot selection.
    #[must_use]
    pub fn with_players(mut self, players: [bool; MAXPLAYERS]) -> Self {
        self.players_in_game = players;
        self
    }

    /// Number of players in the game.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players_in_game.iter().filter(|&&p| p).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_bits() {
        assert_eq!(Skill::Baby.thing_bit(), 1);
        assert_eq!(Skill::Easy.thing_bit(), 1);
        assert_eq!(Skill::Medium.thing_bit(), 2);
        assert_eq!(Skill::Hard.thing_bit(), 4);
        assert_eq!(Skill::Nightmare.thing_bit(), 4);
        assert!(Skill::Nightmare.doubles_ammo());
        assert!(!Skill::Hard.doubles_ammo());
    }

    #[test]
    fn test_ron_defaults_fill_missing_fields() {
        let config = GameConfig::from_ron("(skill: Hard, deathmatch: 1, time_limit: Some(20))").unwrap();
        assert_eq!(config.skill, Skill::Hard);
        assert_eq!(config.deathmatch, 1);
        assert_eq!(config.time_limit, Some(20));
        assert_eq!(config.mode, GameMode::Registered);
        assert_eq!(config.player_count(), 1);
    }

    #[test]
    fn test_bad_ron_is_an_error() {
        assert!(matches!(
            GameConfig::from_ron("(skill: Impossible)"),
            Err(SimError::Serialization(_))
        ));
    }

    #[test]
    fn test_switch_episodes() {
        assert_eq!(GameMode::Shareware.switch_episode(), 1);
        assert_eq!(GameMode::Retail.switch_episode(), 2);
        assert_eq!(GameMode::Commercial.switch_episode(), 3);
    }
}
