//! Snapshots: the dynamic state of a world, without its geometry.
//!
//! A snapshot is restored onto a world built from the same level. Thinker
//! handles do not survive the trip; every reference is stored as the
//! referent's position in the thinker list and remapped on restore.
//! Sector and blockmap membership are re-derived from object positions,
//! then put back in the recorded order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::map::{LineFlags, SideDef};
use crate::math::Fixed;
use crate::mobj::info::MobjFlags;
use crate::player::Player;
use crate::random::Rng;
use crate::specials::{Button, SpecialState, MAXBUTTONS};
use crate::thinker::{ThinkerId, ThinkerState};
use crate::world::{LevelState, Thinker, World};

/// Snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Dynamic state of one sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRecord {
    /// Floor height, raw bits.
    pub floor_height: i32,
    /// Ceiling height, raw bits.
    pub ceiling_height: i32,
    /// Floor flat.
    pub floor_pic: usize,
    /// Ceiling flat.
    pub ceiling_pic: usize,
    /// Light level.
    pub light_level: i16,
    /// Special.
    pub special: i16,
    /// Tag.
    pub tag: i16,
    /// Owning mover, as a thinker ordinal.
    pub special_data: Option<u32>,
    /// Things in the sector, as thinker ordinals, in list order.
    pub things: Vec<u32>,
}

/// Dynamic state of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Special.
    pub special: u16,
    /// Tag.
    pub tag: i16,
    /// Flags; the mapped bit is set as lines are seen.
    pub flags: LineFlags,
}

/// One thinker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkerRecord {
    /// Active or in stasis.
    pub state: ThinkerState,
    /// The thinker's value.
    pub thinker: Thinker,
}

/// One player slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Player state with its body handle cleared.
    pub player: Player,
    /// Body, as a thinker ordinal.
    pub mobj: Option<u32>,
}

/// Special bookkeeping with handles as ordinals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRecord {
    /// Active ceilings by slot.
    pub active_ceilings: Vec<Option<u32>>,
    /// Active platforms by slot.
    pub active_plats: Vec<Option<u32>>,
    /// Waiting buttons by slot.
    pub buttons: Vec<Option<Button>>,
    /// Scrolling lines.
    pub scrolling_lines: Vec<usize>,
    /// Level time limit countdown.
    pub level_timer: Option<u32>,
}

/// Everything a tic can change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Level the snapshot was taken on.
    pub level_name: String,
    /// Sectors in index order.
    pub sectors: Vec<SectorRecord>,
    /// Lines in index order.
    pub lines: Vec<LineRecord>,
    /// Sides in index order.
    pub sides: Vec<SideDef>,
    /// Live thinkers in list order.
    pub thinkers: Vec<ThinkerRecord>,
    /// Player slots.
    pub players: Vec<PlayerRecord>,
    /// Special bookkeeping.
    pub specials: SpecialRecord,
    /// Level counters.
    pub state: LevelState,
    /// Random number generator.
    pub rng: Rng,
    /// Blockmap cells, as thinker ordinals in list order.
    pub cells: Vec<Vec<u32>>,
}

impl Snapshot {
    /// Take a snapshot of `world`.
    #[must_use]
    pub fn capture(world: &World) -> Self {
        let ordinals = world.ordinals();
        let ordinal = |id: Option<ThinkerId>| id.and_then(|id| ordinals.get(&id).copied());
        let ordinal_list = |ids: &[ThinkerId]| -> Vec<u32> { ids.iter().filter_map(|&id| ordinal(Some(id))).collect() };
        let level = world.level();
        let specials = world.specials();
        let blockmap = world.blockmap();

        Self {
            version: SNAPSHOT_VERSION,
            level_name: level.name.clone(),
            sectors: level
                .sectors
                .iter()
                .map(|s| SectorRecord {
                    floor_height: s.floor_height.to_bits(),
                    ceiling_height: s.ceiling_height.to_bits(),
                    floor_pic: s.floor_pic,
                    ceiling_pic: s.ceiling_pic,
                    light_level: s.light_level,
                    special: s.special,
                    tag: s.tag,
                    special_data: ordinal(s.special_data),
                    things: ordinal_list(&s.things),
                })
                .collect(),
            lines: level
                .lines
                .iter()
                .map(|l| LineRecord {
                    special: l.special,
                    tag: l.tag,
                    flags: l.flags,
                })
                .collect(),
            sides: level.sides.clone(),
            thinkers: world
                .thinkers()
                .iter()
                .map(|(_, state, thinker)| ThinkerRecord {
                    state,
                    thinker: thinker.clone(),
                })
                .collect(),
            players: world
                .players()
                .iter()
                .map(|p| PlayerRecord {
                    player: Player {
                        mobj: None,
                        ..p.clone()
                    },
                    mobj: ordinal(p.mobj),
                })
                .collect(),
            specials: SpecialRecord {
                active_ceilings: specials.active_ceilings.iter().map(|&id| ordinal(id)).collect(),
                active_plats: specials.active_plats.iter().map(|&id| ordinal(id)).collect(),
                buttons: specials.buttons.to_vec(),
                scrolling_lines: specials.scrolling_lines.clone(),
                level_timer: specials.level_timer,
            },
            state: world.level_state().clone(),
            rng: *world.rng(),
            cells: (0..blockmap.cell_count())
                .map(|cell| ordinal_list(blockmap.cell_things(cell)))
                .collect(),
        }
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SimError::Serialization(format!("failed to encode snapshot: {e}")))
    }

    /// Decode with bincode.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let snapshot: Self = bincode::deserialize(data)
            .map_err(|e| SimError::Serialization(format!("failed to decode snapshot: {e}")))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SimError::Serialization(format!(
                "snapshot version {} is not {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

fn mismatch(what: impl Into<String>) -> SimError {
    SimError::SnapshotMismatch(what.into())
}

fn check_count(what: &str, recorded: usize, actual: usize) -> Result<()> {
    if recorded == actual {
        Ok(())
    } else {
        Err(mismatch(format!("{recorded} {what} recorded, level has {actual}")))
    }
}

impl World {
    /// Take a snapshot of the world.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Replace the world's dynamic state with a snapshot's.
    ///
    /// The world must have been built from the level the snapshot was
    /// taken on. On error the world is left in an unspecified state.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.level_name != self.level().name {
            return Err(mismatch(format!(
                "snapshot of {} restored onto {}",
                snapshot.level_name,
                self.level().name
            )));
        }
        {
            let level = self.level();
            check_count("sectors", snapshot.sectors.len(), level.sectors.len())?;
            check_count("lines", snapshot.lines.len(), level.lines.len())?;
            check_count("sides", snapshot.sides.len(), level.sides.len())?;
        }
        check_count("blockmap cells", snapshot.cells.len(), self.blockmap().cell_count())?;
        check_count("players", snapshot.players.len(), self.players().len())?;
        check_count("ceiling slots", snapshot.specials.active_ceilings.len(), self.specials().active_ceilings.len())?;
        check_count("plat slots", snapshot.specials.active_plats.len(), self.specials().active_plats.len())?;
        check_count("button slots", snapshot.specials.buttons.len(), MAXBUTTONS)?;

        let (level, blockmap, thinkers, players, specials, state, rng) = self.parts_mut();

        thinkers.clear();
        let mut ids = Vec::with_capacity(snapshot.thinkers.len());
        for record in &snapshot.thinkers {
            let id = thinkers.add(record.thinker.clone());
            if record.state == ThinkerState::InStasis {
                thinkers.set_state(id, ThinkerState::InStasis);
            }
            ids.push(id);
        }
        let resolve = |ordinal: u32| -> Result<ThinkerId> {
            ids.get(ordinal as usize)
                .copied()
                .ok_or_else(|| mismatch(format!("thinker ordinal {ordinal} out of range")))
        };
        let resolve_opt = |ordinal: Option<u32>| ordinal.map(resolve).transpose();

        for (sector, record) in level.sectors.iter_mut().zip(&snapshot.sectors) {
            sector.floor_height = Fixed::from_bits(record.floor_height);
            sector.ceiling_height = Fixed::from_bits(record.ceiling_height);
            sector.floor_pic = record.floor_pic;
            sector.ceiling_pic = record.ceiling_pic;
            sector.light_level = record.light_level;
            sector.special = record.special;
            sector.tag = record.tag;
            sector.special_data = resolve_opt(record.special_data)?;
            sector.things.clear();
        }
        for (line, record) in level.lines.iter_mut().zip(&snapshot.lines) {
            line.special = record.special;
            line.tag = record.tag;
            line.flags = record.flags;
        }
        level.sides.clone_from(&snapshot.sides);

        for (player, record) in players.iter_mut().zip(&snapshot.players) {
            *player = Player {
                mobj: resolve_opt(record.mobj)?,
                ..record.player.clone()
            };
        }

        let mut restored = SpecialState {
            scrolling_lines: snapshot.specials.scrolling_lines.clone(),
            level_timer: snapshot.specials.level_timer,
            ..SpecialState::default()
        };
        for (slot, &ordinal) in restored.active_ceilings.iter_mut().zip(&snapshot.specials.active_ceilings) {
            *slot = resolve_opt(ordinal)?;
        }
        for (slot, &ordinal) in restored.active_plats.iter_mut().zip(&snapshot.specials.active_plats) {
            *slot = resolve_opt(ordinal)?;
        }
        for (slot, &button) in restored.buttons.iter_mut().zip(&snapshot.specials.buttons) {
            *slot = button;
        }
        *specials = restored;
        state.clone_from(&snapshot.state);
        *rng = snapshot.rng;

        // Where each object belongs, judged by its position alone.
        let mut sector_members: HashMap<usize, Vec<u32>> = HashMap::new();
        let mut cell_members: HashMap<usize, Vec<u32>> = HashMap::new();
        for (ordinal, record) in (0u32..).zip(&snapshot.thinkers) {
            let Some(mobj) = record.thinker.as_mobj() else {
                continue;
            };
            let subsector = level.point_in_subsector(mobj.x, mobj.y);
            if subsector != mobj.subsector {
                return Err(mismatch(format!(
                    "thinker {ordinal} recorded in subsector {} but stands in {subsector}",
                    mobj.subsector
                )));
            }
            if !mobj.flags.contains(MobjFlags::NOSECTOR) {
                sector_members
                    .entry(level.subsectors[subsector].sector)
                    .or_default()
                    .push(ordinal);
            }
            if !mobj.flags.contains(MobjFlags::NOBLOCKMAP) {
                if let Some(cell) = blockmap.cell_at(mobj.x, mobj.y) {
                    cell_members.entry(cell).or_default().push(ordinal);
                }
            }
        }

        for (index, record) in snapshot.sectors.iter().enumerate() {
            let derived = sector_members.remove(&index).unwrap_or_default();
            if !same_members(&derived, &record.things) {
                return Err(mismatch(format!("sector {index} thing list disagrees with positions")));
            }
            level.sectors[index].things = record.things.iter().map(|&o| resolve(o)).collect::<Result<_>>()?;
        }
        for (cell, recorded) in snapshot.cells.iter().enumerate() {
            let derived = cell_members.remove(&cell).unwrap_or_default();
            if !same_members(&derived, recorded) {
                return Err(mismatch(format!("blockmap cell {cell} thing list disagrees with positions")));
            }
            blockmap.set_cell_things(cell, recorded.iter().map(|&o| resolve(o)).collect::<Result<_>>()?);
        }

        tracing::debug!(
            level = %snapshot.level_name,
            thinkers = snapshot.thinkers.len(),
            level_time = snapshot.state.level_time,
            "snapshot restored"
        );
        Ok(())
    }
}

fn same_members(derived: &[u32], recorded: &[u32]) -> bool {
    let mut a = derived.to_vec();
    let mut b = recorded.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}
