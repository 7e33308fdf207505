//! Static thing and state tables.
//!
//! Only the things that matter to the sector simulation are listed: the
//! player, a few monsters and decorations that block movement, the pickups
//! the player can collect, and the blood and gib effects crushing produces.
//! Monsters stand idle; there is no AI and no weapon fire.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, FRACUNIT};

/// Largest radius of any thing; lines are searched this far beyond a box.
pub const MAXRADIUS: Fixed = Fixed::from_int(32);
/// Eye height of a standing player.
pub const VIEWHEIGHT: Fixed = Fixed::from_int(41);
/// Spawn height meaning "on the floor".
pub const ONFLOORZ: Fixed = Fixed::MIN;
/// Spawn height meaning "hanging from the ceiling".
pub const ONCEILINGZ: Fixed = Fixed::MAX;
/// Downward acceleration per tic.
pub const GRAVITY: Fixed = Fixed::ONE;
/// Momentum cap on each axis.
pub const MAXMOVE: Fixed = Fixed::from_int(30);
/// Momentum below this stops dead.
pub const STOPSPEED: Fixed = Fixed::from_bits(0x1000);
/// Ground friction multiplier.
pub const FRICTION: Fixed = Fixed::from_bits(0xe800);
/// Highest step a walker can climb.
pub const MAX_STEP: Fixed = Fixed::from_int(24);

/// Thing behaviour bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MobjFlags(pub u32);

impl MobjFlags {
    /// Touching it calls the pickup code.
    pub const SPECIAL: u32 = 0x1;
    /// Blocks other things.
    pub const SOLID: u32 = 0x2;
    /// Can be damaged.
    pub const SHOOTABLE: u32 = 0x4;
    /// Not linked into a sector's thing list.
    pub const NOSECTOR: u32 = 0x8;
    /// Not linked into the blockmap.
    pub const NOBLOCKMAP: u32 = 0x10;
    /// Deaf monster.
    pub const AMBUSH: u32 = 0x20;
    /// Just took damage.
    pub const JUSTHIT: u32 = 0x40;
    /// Just attacked.
    pub const JUSTATTACKED: u32 = 0x80;
    /// Spawned on the ceiling.
    pub const SPAWNCEILING: u32 = 0x100;
    /// Ignores gravity.
    pub const NOGRAVITY: u32 = 0x200;
    /// May walk off ledges.
    pub const DROPOFF: u32 = 0x400;
    /// Picks up items.
    pub const PICKUP: u32 = 0x800;
    /// Passes through walls and things.
    pub const NOCLIP: u32 = 0x1000;
    /// Slides along walls.
    pub const SLIDE: u32 = 0x2000;
    /// Flies.
    pub const FLOAT: u32 = 0x4000;
    /// Teleporting; skips height checks.
    pub const TELEPORT: u32 = 0x8000;
    /// A projectile.
    pub const MISSILE: u32 = 0x10000;
    /// Dropped by a dying monster.
    pub const DROPPED: u32 = 0x20000;
    /// Partial invisibility.
    pub const SHADOW: u32 = 0x40000;
    /// Bleeds puffs, not blood.
    pub const NOBLOOD: u32 = 0x80000;
    /// A corpse; slides down steps.
    pub const CORPSE: u32 = 0x100000;
    /// Floating to a target height.
    pub const INFLOAT: u32 = 0x200000;
    /// Counts toward the kill total.
    pub const COUNTKILL: u32 = 0x400000;
    /// Counts toward the item total.
    pub const COUNTITEM: u32 = 0x800000;
    /// Charging lost soul.
    pub const SKULLFLY: u32 = 0x1000000;
    /// Not spawned in deathmatch.
    pub const NOTDMATCH: u32 = 0x2000000;
    /// Player colour translation bits.
    pub const TRANSLATION: u32 = 0xc000000;
    /// Shift of the translation bits.
    pub const TRANSSHIFT: u32 = 26;

    /// Whether every bit of `bits` is set.
    #[must_use]
    pub const fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    /// Whether any bit of `bits` is set.
    #[must_use]
    pub const fn intersects(self, bits: u32) -> bool {
        self.0 & bits != 0
    }

    /// Set `bits`.
    pub fn insert(&mut self, bits: u32) {
        self.0 |= bits;
    }

    /// Clear `bits`.
    pub fn remove(&mut self, bits: u32) {
        self.0 &= !bits;
    }
}

impl BitOr<u32> for MobjFlags {
    type Output = Self;

    fn bitor(self, rhs: u32) -> Self {
        Self(self.0 | rhs)
    }
}

/// Code run on entering a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing.
    None,
    /// Corpse stops blocking.
    Fall,
}

/// One animation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// Sprite name.
    pub sprite: &'static str,
    /// Frame letter index; bit 15 is full bright.
    pub frame: u16,
    /// Duration; -1 stays forever.
    pub tics: i32,
    /// Entry action.
    pub action: Action,
    /// Following state.
    pub next: StateNum,
}

const fn st(sprite: &'static str, frame: u16, tics: i32, action: Action, next: StateNum) -> State {
    State {
        sprite,
        frame,
        tics,
        action,
        next,
    }
}

const BRIGHT: u16 = 0x8000;

/// Index into the state table.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateNum {
    Null,
    Play,
    PlayRun1,
    PlayRun2,
    PlayRun3,
    PlayRun4,
    PlayPain,
    PlayPain2,
    PlayDie1,
    PlayDie2,
    PlayDie3,
    PlayDie4,
    PlayDie5,
    PlayDie6,
    PlayDie7,
    PossStnd,
    PossStnd2,
    PossPain,
    PossPain2,
    PossDie1,
    PossDie2,
    PossDie3,
    PossDie4,
    PossDie5,
    SposStnd,
    SposStnd2,
    SposPain,
    SposPain2,
    SposDie1,
    SposDie2,
    SposDie3,
    SposDie4,
    SposDie5,
    TrooStnd,
    TrooStnd2,
    TrooPain,
    TrooPain2,
    TrooDie1,
    TrooDie2,
    TrooDie3,
    TrooDie4,
    TrooDie5,
    SargStnd,
    SargStnd2,
    SargPain,
    SargPain2,
    SargDie1,
    SargDie2,
    SargDie3,
    SargDie4,
    SargDie5,
    SargDie6,
    Bar1,
    Bar2,
    Bexp,
    Bexp2,
    Bexp3,
    Bexp4,
    Bexp5,
    Blood1,
    Blood2,
    Blood3,
    Gibs,
    Clip,
    Shot,
    Stim,
    Medi,
    Bkey,
    Bkey2,
    Ykey,
    Ykey2,
    Rkey,
    Rkey2,
    Bskull,
    Bskull2,
    Yskull,
    Yskull2,
    Rskull,
    Rskull2,
    Colu,
}

impl StateNum {
    /// The table entry.
    #[must_use]
    pub const fn state(self) -> State {
        use Action::{Fall, None as No};
        use StateNum as S;
        match self {
            S::Null => st("TROO", 0, -1, No, S::Null),
            S::Play => st("PLAY", 0, -1, No, S::Null),
            S::PlayRun1 => st("PLAY", 0, 4, No, S::PlayRun2),
            S::PlayRun2 => st("PLAY", 1, 4, No, S::PlayRun3),
            S::PlayRun3 => st("PLAY", 2, 4, No, S::PlayRun4),
            S::PlayRun4 => st("PLAY", 3, 4, No, S::PlayRun1),
            S::PlayPain => st("PLAY", 6, 4, No, S::PlayPain2),
            S::PlayPain2 => st("PLAY", 6, 4, No, S::Play),
            S::PlayDie1 => st("PLAY", 7, 10, No, S::PlayDie2),
            S::PlayDie2 => st("PLAY", 8, 10, No, S::PlayDie3),
            S::PlayDie3 => st("PLAY", 9, 10, Fall, S::PlayDie4),
            S::PlayDie4 => st("PLAY", 10, 10, No, S::PlayDie5),
            S::PlayDie5 => st("PLAY", 11, 10, No, S::PlayDie6),
            S::PlayDie6 => st("PLAY", 12, 10, No, S::PlayDie7),
            S::PlayDie7 => st("PLAY", 13, -1, No, S::Null),
            S::PossStnd => st("POSS", 0, 10, No, S::PossStnd2),
            S::PossStnd2 => st("POSS", 1, 10, No, S::PossStnd),
            S::PossPain => st("POSS", 6, 3, No, S::PossPain2),
            S::PossPain2 => st("POSS", 6, 3, No, S::PossStnd),
            S::PossDie1 => st("POSS", 7, 5, No, S::PossDie2),
            S::PossDie2 => st("POSS", 8, 5, No, S::PossDie3),
            S::PossDie3 => st("POSS", 9, 5, Fall, S::PossDie4),
            S::PossDie4 => st("POSS", 10, 5, No, S::PossDie5),
            S::PossDie5 => st("POSS", 11, -1, No, S::Null),
            S::SposStnd => st("SPOS", 0, 10, No, S::SposStnd2),
            S::SposStnd2 => st("SPOS", 1, 10, No, S::SposStnd),
            S::SposPain => st("SPOS", 6, 3, No, S::SposPain2),
            S::SposPain2 => st("SPOS", 6, 3, No, S::SposStnd),
            S::SposDie1 => st("SPOS", 7, 5, No, S::SposDie2),
            S::SposDie2 => st("SPOS", 8, 5, No, S::SposDie3),
            S::SposDie3 => st("SPOS", 9, 5, Fall, S::SposDie4),
            S::SposDie4 => st("SPOS", 10, 5, No, S::SposDie5),
            S::SposDie5 => st("SPOS", 11, -1, No, S::Null),
            S::TrooStnd => st("TROO", 0, 10, No, S::TrooStnd2),
            S::TrooStnd2 => st("TROO", 1, 10, No, S::TrooStnd),
            S::TrooPain => st("TROO", 7, 2, No, S::TrooPain2),
            S::TrooPain2 => st("TROO", 7, 2, No, S::TrooStnd),
            S::TrooDie1 => st("TROO", 8, 8, No, S::TrooDie2),
            S::TrooDie2 => st("TROO", 9, 8, No, S::TrooDie3),
            S::TrooDie3 => st("TROO", 10, 6, No, S::TrooDie4),
            S::TrooDie4 => st("TROO", 11, 6, Fall, S::TrooDie5),
            S::TrooDie5 => st("TROO", 12, -1, No, S::Null),
            S::SargStnd => st("SARG", 0, 10, No, S::SargStnd2),
            S::SargStnd2 => st("SARG", 1, 10, No, S::SargStnd),
            S::SargPain => st("SARG", 7, 2, No, S::SargPain2),
            S::SargPain2 => st("SARG", 7, 2, No, S::SargStnd),
            S::SargDie1 => st("SARG", 8, 8, No, S::SargDie2),
            S::SargDie2 => st("SARG", 9, 8, No, S::SargDie3),
            S::SargDie3 => st("SARG", 10, 4, No, S::SargDie4),
            S::SargDie4 => st("SARG", 11, 4, Fall, S::SargDie5),
            S::SargDie5 => st("SARG", 12, 4, No, S::SargDie6),
            S::SargDie6 => st("SARG", 13, -1, No, S::Null),
            S::Bar1 => st("BAR1", 0, 6, No, S::Bar2),
            S::Bar2 => st("BAR1", 1, 6, No, S::Bar1),
            S::Bexp => st("BEXP", BRIGHT, 5, No, S::Bexp2),
            S::Bexp2 => st("BEXP", 1 | BRIGHT, 5, No, S::Bexp3),
            S::Bexp3 => st("BEXP", 2 | BRIGHT, 5, No, S::Bexp4),
            S::Bexp4 => st("BEXP", 3 | BRIGHT, 10, No, S::Bexp5),
            S::Bexp5 => st("BEXP", 4 | BRIGHT, 10, No, S::Null),
            S::Blood1 => st("BLUD", 2, 8, No, S::Blood2),
            S::Blood2 => st("BLUD", 1, 8, No, S::Blood3),
            S::Blood3 => st("BLUD", 0, 8, No, S::Null),
            S::Gibs => st("POL5", 0, -1, No, S::Null),
            S::Clip => st("CLIP", 0, -1, No, S::Null),
            S::Shot => st("SHOT", 0, -1, No, S::Null),
            S::Stim => st("STIM", 0, -1, No, S::Null),
            S::Medi => st("MEDI", 0, -1, No, S::Null),
            S::Bkey => st("BKEY", 0, 10, No, S::Bkey2),
            S::Bkey2 => st("BKEY", BRIGHT | 1, 10, No, S::Bkey),
            S::Ykey => st("YKEY", 0, 10, No, S::Ykey2),
            S::Ykey2 => st("YKEY", BRIGHT | 1, 10, No, S::Ykey),
            S::Rkey => st("RKEY", 0, 10, No, S::Rkey2),
            S::Rkey2 => st("RKEY", BRIGHT | 1, 10, No, S::Rkey),
            S::Bskull => st("BSKU", 0, 10, No, S::Bskull2),
            S::Bskull2 => st("BSKU", BRIGHT | 1, 10, No, S::Bskull),
            S::Yskull => st("YSKU", 0, 10, No, S::Yskull2),
            S::Yskull2 => st("YSKU", BRIGHT | 1, 10, No, S::Yskull),
            S::Rskull => st("RSKU", 0, 10, No, S::Rskull2),
            S::Rskull2 => st("RSKU", BRIGHT | 1, 10, No, S::Rskull),
            S::Colu => st("COLU", BRIGHT, -1, No, S::Null),
        }
    }
}

/// Per-type constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobjInfo {
    /// Editor number, or -1 for things only spawned by code.
    pub doomednum: i16,
    /// Initial state.
    pub spawn_state: StateNum,
    /// Initial health.
    pub spawn_health: i32,
    /// Tics before a spawned monster reacts.
    pub reaction_time: i32,
    /// State entered on pain.
    pub pain_state: StateNum,
    /// Out of 256.
    pub pain_chance: i32,
    /// State entered on death.
    pub death_state: StateNum,
    /// Walk speed.
    pub speed: i32,
    /// Collision radius.
    pub radius: Fixed,
    /// Collision height.
    pub height: Fixed,
    /// Mass.
    pub mass: i32,
    /// Initial flags.
    pub flags: u32,
}

const fn units(n: i32) -> Fixed {
    Fixed::from_bits(n * FRACUNIT)
}

const NONE: StateNum = StateNum::Null;

const fn decoration(doomednum: i16, spawn_state: StateNum, radius: i32, height: i32, flags: u32) -> MobjInfo {
    MobjInfo {
        doomednum,
        spawn_state,
        spawn_health: 1000,
        reaction_time: 8,
        pain_state: NONE,
        pain_chance: 0,
        death_state: NONE,
        speed: 0,
        radius: units(radius),
        height: units(height),
        mass: 100,
        flags,
    }
}

const fn monster(
    doomednum: i16,
    stand: StateNum,
    health: i32,
    pain: StateNum,
    pain_chance: i32,
    death: StateNum,
    speed: i32,
    radius: i32,
    mass: i32,
) -> MobjInfo {
    MobjInfo {
        doomednum,
        spawn_state: stand,
        spawn_health: health,
        reaction_time: 8,
        pain_state: pain,
        pain_chance,
        death_state: death,
        speed,
        radius: units(radius),
        height: units(56),
        mass,
        flags: MobjFlags::SOLID | MobjFlags::SHOOTABLE | MobjFlags::COUNTKILL,
    }
}

/// Thing types.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MobjType {
    Player,
    Possessed,
    ShotgunGuy,
    Imp,
    Demon,
    Barrel,
    Blood,
    Clip,
    Shotgun,
    Stimpack,
    Medikit,
    BlueCard,
    YellowCard,
    RedCard,
    BlueSkull,
    YellowSkull,
    RedSkull,
    FloorLamp,
    DeadPlayer,
}

impl MobjType {
    /// Every type, in table order.
    pub const ALL: [Self; 19] = [
        Self::Player,
        Self::Possessed,
        Self::ShotgunGuy,
        Self::Imp,
        Self::Demon,
        Self::Barrel,
        Self::Blood,
        Self::Clip,
        Self::Shotgun,
        Self::Stimpack,
        Self::Medikit,
        Self::BlueCard,
        Self::YellowCard,
        Self::RedCard,
        Self::BlueSkull,
        Self::YellowSkull,
        Self::RedSkull,
        Self::FloorLamp,
        Self::DeadPlayer,
    ];

    /// The type with editor number `doomednum`.
    #[must_use]
    pub fn from_doomednum(doomednum: i16) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.info().doomednum == doomednum)
    }

    /// Constants for this type.
    #[must_use]
    pub const fn info(self) -> MobjInfo {
        use MobjFlags as F;
        use StateNum as S;
        match self {
            Self::Player => MobjInfo {
                doomednum: -1,
                spawn_state: S::Play,
                spawn_health: 100,
                reaction_time: 0,
                pain_state: S::PlayPain,
                pain_chance: 255,
                death_state: S::PlayDie1,
                speed: 0,
                radius: units(16),
                height: units(56),
                mass: 100,
                flags: F::SOLID | F::SHOOTABLE | F::DROPOFF | F::PICKUP | F::NOTDMATCH,
            },
            Self::Possessed => monster(3004, S::PossStnd, 20, S::PossPain, 200, S::PossDie1, 8, 20, 100),
            Self::ShotgunGuy => monster(9, S::SposStnd, 30, S::SposPain, 170, S::SposDie1, 8, 20, 100),
            Self::Imp => monster(3001, S::TrooStnd, 60, S::TrooPain, 200, S::TrooDie1, 8, 20, 100),
            Self::Demon => monster(3002, S::SargStnd, 150, S::SargPain, 180, S::SargDie1, 10, 30, 400),
            Self::Barrel => MobjInfo {
                spawn_health: 20,
                death_state: S::Bexp,
                ..decoration(2035, S::Bar1, 10, 42, F::SOLID | F::SHOOTABLE | F::NOBLOOD)
            },
            Self::Blood => decoration(-1, S::Blood1, 20, 16, F::NOBLOCKMAP),
            Self::Clip => decoration(2007, S::Clip, 20, 16, F::SPECIAL),
            Self::Shotgun => decoration(2001, S::Shot, 20, 16, F::SPECIAL),
            Self::Stimpack => decoration(2011, S::Stim, 20, 16, F::SPECIAL),
            Self::Medikit => decoration(2012, S::Medi, 20, 16, F::SPECIAL),
            Self::BlueCard => decoration(5, S::Bkey, 20, 16, F::SPECIAL | F::NOTDMATCH),
            Self::YellowCard => decoration(6, S::Ykey, 20, 16, F::SPECIAL | F::NOTDMATCH),
            Self::RedCard => decoration(13, S::Rkey, 20, 16, F::SPECIAL | F::NOTDMATCH),
            Self::BlueSkull => decoration(40, S::Bskull, 20, 16, F::SPECIAL | F::NOTDMATCH),
            Self::YellowSkull => decoration(39, S::Yskull, 20, 16, F::SPECIAL | F::NOTDMATCH),
            Self::RedSkull => decoration(38, S::Rskull, 20, 16, F::SPECIAL | F::NOTDMATCH),
            Self::FloorLamp => decoration(2028, S::Colu, 16, 16, F::SOLID),
            Self::DeadPlayer => decoration(15, S::PlayDie7, 20, 16, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_contains_all_intersects_any() {
        let flags = MobjFlags(MobjFlags::SOLID | MobjFlags::SHOOTABLE);
        assert!(flags.contains(MobjFlags::SOLID));
        assert!(flags.contains(MobjFlags::SOLID | MobjFlags::SHOOTABLE));
        assert!(!flags.contains(MobjFlags::SOLID | MobjFlags::SPECIAL));
        assert!(flags.intersects(MobjFlags::SOLID | MobjFlags::SPECIAL));
        assert!(!flags.intersects(MobjFlags::SPECIAL | MobjFlags::MISSILE));
        assert!(MobjFlags::default().contains(0));
    }

    #[test]
    fn test_doomednum_lookup() {
        assert_eq!(MobjType::from_doomednum(3004), Some(MobjType::Possessed));
        assert_eq!(MobjType::from_doomednum(2035), Some(MobjType::Barrel));
        assert_eq!(MobjType::from_doomednum(38), Some(MobjType::RedSkull));
        assert_eq!(MobjType::from_doomednum(-1), Some(MobjType::Player));
        assert_eq!(MobjType::from_doomednum(7777), None);
    }

    #[test]
    fn test_editor_numbers_are_unique() {
        for (i, a) in MobjType::ALL.iter().enumerate() {
            for b in &MobjType::ALL[i + 1..] {
                let (na, nb) = (a.info().doomednum, b.info().doomednum);
                assert!(na == -1 && nb == -1 || na != nb, "{a:?} and {b:?} share {na}");
            }
        }
    }

    #[test]
    fn test_no_thing_exceeds_max_radius() {
        for t in MobjType::ALL {
            assert!(t.info().radius <= MAXRADIUS, "{t:?}");
        }
    }

    #[test]
    fn test_run_cycle_loops() {
        let mut s = StateNum::PlayRun1;
        for _ in 0..4 {
            s = s.state().next;
        }
        assert_eq!(s, StateNum::PlayRun1);
    }

    #[test]
    fn test_death_sequences_end_in_a_still_frame() {
        for t in MobjType::ALL {
            let mut s = t.info().death_state;
            if s == StateNum::Null {
                continue;
            }
            for _ in 0..16 {
                if s.state().tics == -1 || s == StateNum::Null {
                    break;
                }
                s = s.state().next;
            }
            assert!(s == StateNum::Null || s.state().tics == -1, "{t:?}");
        }
    }

    #[test]
    fn test_flag_helpers() {
        let mut flags = MobjFlags(MobjFlags::SOLID) | MobjFlags::SHOOTABLE;
        assert!(flags.contains(MobjFlags::SOLID));
        flags.remove(MobjFlags::SOLID);
        assert!(!flags.contains(MobjFlags::SOLID));
        flags.insert(MobjFlags::CORPSE);
        assert_eq!(flags.0, MobjFlags::SHOOTABLE | MobjFlags::CORPSE);
    }
}
