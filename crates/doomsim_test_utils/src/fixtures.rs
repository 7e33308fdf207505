//! Test fixtures and helpers.
//!
//! Pre-built levels and scripted inputs for consistent testing.

use doomsim_core::config::GameConfig;
use doomsim_core::input::TicCmd;
use doomsim_core::map::LevelData;
use doomsim_core::math::Fixed;
use fixed::types::I16F16;

pub use doomsim_core::fixtures::{RoomChain, ROOM_DEPTH, ROOM_WIDTH};

use crate::determinism::Scenario;

/// Create a fixed-point number from an integer.
#[must_use]
pub const fn fixed(n: i32) -> Fixed {
    Fixed::from_int(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_bits(I16F16::saturating_from_num(n).to_bits())
}

/// Three rooms: a lit start room, a closed manual door and a room with a
/// monster and a medikit behind it.
#[must_use]
pub fn door_level() -> LevelData {
    RoomChain::new()
        .room(0, 128)
        .light(200)
        .special(1)
        .player_start(64, 128, 0)
        .room(0, 0)
        .boundary_special(1, 0)
        .room(0, 128)
        .special(8)
        .thing(3004, 320, 128, 180)
        .thing(2012, 300, 40, 0)
        .build()
}

/// A lift room between two rooms, with a walk-over trigger on the way in.
#[must_use]
pub fn lift_level() -> LevelData {
    RoomChain::new()
        .room(0, 128)
        .player_start(64, 128, 0)
        .room(64, 192)
        .tag(3)
        .boundary_special(88, 3)
        .room(64, 192)
        .special(17)
        .build()
}

/// Walk forward, open what is ahead, turn and come back; repeating.
#[must_use]
pub fn patrol_commands(tics: usize) -> Vec<Vec<TicCmd>> {
    (0..tics)
        .map(|tic| {
            let cmd = match tic % 70 {
                0..=19 => TicCmd::forward(25),
                20 => TicCmd::use_line(),
                21..=39 => TicCmd::forward(50),
                40..=47 => TicCmd {
                    angle_turn: 2048,
                    ..TicCmd::default()
                },
                _ => TicCmd {
                    forward_move: 25,
                    side_move: 10,
                    ..TicCmd::default()
                },
            };
            vec![cmd]
        })
        .collect()
}

/// [`door_level`] with a patrol script.
#[must_use]
pub fn door_scenario(tics: usize) -> Scenario {
    Scenario::new(door_level(), GameConfig::default(), patrol_commands(tics))
}

/// Serialize a level to pretty RON, the format the headless runner reads.
pub fn level_to_ron(level: &LevelData) -> Result<String, ron::Error> {
    ron::ser::to_string_pretty(level, ron::ser::PrettyConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_helpers_agree() {
        assert_eq!(fixed(3), fixed_f(3.0));
        assert_eq!(fixed_f(0.5).to_bits(), 1 << 15);
        assert_eq!(fixed_f(1e9), Fixed::MAX);
    }

    #[test]
    fn test_level_survives_ron() {
        let level = door_level();
        let text = level_to_ron(&level).unwrap();
        assert!(text.contains("things"));
        assert_eq!(LevelData::from_ron(&text).unwrap(), level);
    }

    #[test]
    fn test_patrol_script_length() {
        assert_eq!(patrol_commands(140).len(), 140);
        assert_eq!(patrol_commands(140)[20], vec![TicCmd::use_line()]);
    }
}
