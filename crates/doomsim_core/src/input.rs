//! Per-player input for one tic.

use serde::{Deserialize, Serialize};

/// Fire.
pub const BT_ATTACK: u8 = 1;
/// Use a line.
pub const BT_USE: u8 = 2;
/// The remaining bits are a special action rather than normal buttons.
pub const BT_SPECIAL: u8 = 128;
/// Mask of the special action.
pub const BT_SPECIALMASK: u8 = 3;
/// Weapon change requested.
pub const BT_CHANGE: u8 = 4;
/// Special action: toggle pause.
pub const BTS_PAUSE: u8 = 1;
/// Special action: save the game.
pub const BTS_SAVEGAME: u8 = 2;

/// One player's command for one tic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TicCmd {
    /// Forward speed; positive is forward.
    pub forward_move: i8,
    /// Strafe speed; positive is right.
    pub side_move: i8,
    /// Turn, in the upper 16 bits of an angle.
    pub angle_turn: i16,
    /// Button bits.
    pub buttons: u8,
}

impl TicCmd {
    /// A command that walks forward at `speed`.
    #[must_use]
    pub const fn forward(speed: i8) -> Self {
        Self {
            forward_move: speed,
            side_move: 0,
            angle_turn: 0,
            buttons: 0,
        }
    }

    /// A command that only presses use.
    #[must_use]
    pub const fn use_line() -> Self {
        Self {
            forward_move: 0,
            side_move: 0,
            angle_turn: 0,
            buttons: BT_USE,
        }
    }

    /// A command that toggles pause.
    #[must_use]
    pub const fn pause() -> Self {
        Self {
            forward_move: 0,
            side_move: 0,
            angle_turn: 0,
            buttons: BT_SPECIAL | BTS_PAUSE,
        }
    }

    /// The special action, if the special bit is set.
    #[must_use]
    pub const fn special(&self) -> Option<u8> {
        if self.buttons & BT_SPECIAL != 0 {
            Some(self.buttons & BT_SPECIALMASK)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_bits() {
        assert_eq!(TicCmd::pause().special(), Some(BTS_PAUSE));
        assert_eq!(TicCmd::use_line().special(), None);
        let save = TicCmd {
            buttons: BT_SPECIAL | BTS_SAVEGAME | (3 << 2),
            ..TicCmd::default()
        };
        assert_eq!(save.special(), Some(BTS_SAVEGAME));
    }
}
