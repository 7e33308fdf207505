//! Map objects: players, monsters, pickups and effects.
//!
//! A map object is a thinker like any other. While one runs, its value is
//! held outside the thinker list, so code that needs the object itself and
//! the rest of the world takes `(ctx, id, &mut Mobj)`.
//!
//! # Module Structure
//!
//! - `info`: static thing and state tables
//! - `movement`: position checks, sliding, falling, crushing
//! - `interact`: damage, death and pickups
//! - `spawn`: placing editor things and players at level start

pub mod info;
pub mod interact;
pub mod movement;
pub mod spawn;

use serde::{Deserialize, Serialize};

use crate::angle::Angle;
use crate::blockmap::BlockMap;
use crate::config::{Skill, MAXPLAYERS};
use crate::error::Result;
use crate::map::{Level, MapThing};
use crate::math::Fixed;
use crate::thinker::{ThinkerId, ThinkerState};
use crate::world::{SimContext, Thinker};

use info::{Action, MobjFlags, MobjType, StateNum, ONCEILINGZ, ONFLOORZ};

/// A map object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mobj {
    /// Type.
    pub kind: MobjType,
    /// Position.
    pub x: Fixed,
    /// Position.
    pub y: Fixed,
    /// Height of the feet.
    pub z: Fixed,
    /// Facing.
    pub angle: Angle,
    /// Current animation state.
    pub state: StateNum,
    /// Tics left in the state; -1 is forever.
    pub tics: i32,
    /// Subsector containing `(x, y)`.
    pub subsector: usize,
    /// Highest floor under the bounding box.
    pub floor_z: Fixed,
    /// Lowest ceiling over the bounding box.
    pub ceiling_z: Fixed,
    /// Collision radius.
    pub radius: Fixed,
    /// Collision height.
    pub height: Fixed,
    /// Momentum.
    pub mom_x: Fixed,
    /// Momentum.
    pub mom_y: Fixed,
    /// Momentum.
    pub mom_z: Fixed,
    /// Behaviour bits.
    pub flags: MobjFlags,
    /// Hit points.
    pub health: i32,
    /// Tics before a monster may act.
    pub reaction_time: i32,
    /// Player slot a monster looks at first.
    pub last_look: i32,
    /// Owning player slot.
    pub player: Option<usize>,
    /// Editor thing this was spawned from.
    pub spawn_point: Option<MapThing>,
}

impl Mobj {
    /// Sector the object's centre is in.
    #[must_use]
    pub fn sector(&self, level: &Level) -> usize {
        level.subsectors[self.subsector].sector
    }

    /// Sprite name of the current frame.
    #[must_use]
    pub fn sprite(&self) -> &'static str {
        self.state.state().sprite
    }

    /// Frame index of the current frame, without the bright bit.
    #[must_use]
    pub fn frame(&self) -> u16 {
        self.state.state().frame & 0x7fff
    }

    /// Whether the object stands on its floor.
    #[must_use]
    pub fn on_floor(&self) -> bool {
        self.z <= self.floor_z
    }
}

/// Link into the sector and blockmap lists at `subsector`.
fn link(level: &mut Level, blockmap: &mut BlockMap, id: ThinkerId, mobj: &Mobj) {
    if !mobj.flags.contains(MobjFlags::NOSECTOR) {
        let sector = level.subsectors[mobj.subsector].sector;
        level.sectors[sector].link_thing(id);
    }
    if !mobj.flags.contains(MobjFlags::NOBLOCKMAP) {
        blockmap.link_thing(mobj.x, mobj.y, id);
    }
}

/// Find the subsector under the object and link it into the sector and
/// blockmap lists, both at the head.
pub fn set_thing_position(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj) {
    mobj.subsector = ctx.level.point_in_subsector(mobj.x, mobj.y);
    link(ctx.level, ctx.blockmap, id, mobj);
}

/// Unlink from the sector and blockmap lists.
pub fn unset_thing_position(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &Mobj) {
    if !mobj.flags.contains(MobjFlags::NOSECTOR) {
        let sector = mobj.sector(ctx.level);
        ctx.level.sectors[sector].unlink_thing(id);
    }
    if !mobj.flags.contains(MobjFlags::NOBLOCKMAP) {
        ctx.blockmap.unlink_thing(mobj.x, mobj.y, id);
    }
}

/// Create an object and add it to the thinker list.
///
/// `z` may be [`ONFLOORZ`] or [`ONCEILINGZ`]. Draws one random number.
pub fn spawn_mobj(ctx: &mut SimContext<'_>, x: Fixed, y: Fixed, z: Fixed, kind: MobjType) -> ThinkerId {
    let info = kind.info();
    let reaction_time = if ctx.config.skill == Skill::Nightmare {
        0
    } else {
        info.reaction_time
    };
    let last_look = ctx.rng.draw() % MAXPLAYERS as i32;

    let subsector = ctx.level.point_in_subsector(x, y);
    let sector = &ctx.level.sectors[ctx.level.subsectors[subsector].sector];
    let (floor_z, ceiling_z) = (sector.floor_height, sector.ceiling_height);
    let z = if z == ONFLOORZ {
        floor_z
    } else if z == ONCEILINGZ {
        ceiling_z - info.height
    } else {
        z
    };

    let mobj = Mobj {
        kind,
        x,
        y,
        z,
        angle: Angle::ZERO,
        state: info.spawn_state,
        tics: info.spawn_state.state().tics,
        subsector,
        floor_z,
        ceiling_z,
        radius: info.radius,
        height: info.height,
        mom_x: Fixed::ZERO,
        mom_y: Fixed::ZERO,
        mom_z: Fixed::ZERO,
        flags: MobjFlags(info.flags),
        health: info.spawn_health,
        reaction_time,
        last_look,
        player: None,
        spawn_point: None,
    };

    let id = ctx.thinkers.add(Thinker::Mobj(Box::new(mobj)));
    if let Some(Thinker::Mobj(mobj)) = ctx.thinkers.get(id) {
        link(ctx.level, ctx.blockmap, id, mobj);
    }
    tracing::trace!(?kind, id = id.index(), %x, %y, "mobj spawned");
    id
}

/// Unlink an object and mark its thinker removed.
pub fn remove_mobj(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &Mobj) {
    unset_thing_position(ctx, id, mobj);
    ctx.thinkers.remove(id);
}

/// Enter `state`, running entry actions and skipping zero-tic states.
///
/// Returns `false` if the object reached the null state and was removed.
pub fn set_mobj_state(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj, state: StateNum) -> bool {
    let mut state = state;
    loop {
        if state == StateNum::Null {
            mobj.state = StateNum::Null;
            remove_mobj(ctx, id, mobj);
            return false;
        }
        let st = state.state();
        mobj.state = state;
        mobj.tics = st.tics;
        if st.action == Action::Fall {
            mobj.flags.remove(MobjFlags::SOLID);
        }
        state = st.next;
        if mobj.tics != 0 {
            return true;
        }
    }
}

fn is_removed(ctx: &SimContext<'_>, id: ThinkerId) -> bool {
    !matches!(
        ctx.thinkers.state(id),
        Some(ThinkerState::Active | ThinkerState::InStasis)
    )
}

/// One tic of a map object: horizontal then vertical movement, then the
/// state countdown.
pub fn mobj_think(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj) -> Result<()> {
    if mobj.mom_x != Fixed::ZERO || mobj.mom_y != Fixed::ZERO || mobj.flags.contains(MobjFlags::SKULLFLY) {
        movement::xy_movement(ctx, id, mobj)?;
        if is_removed(ctx, id) {
            return Ok(());
        }
    }

    if mobj.z != mobj.floor_z || mobj.mom_z != Fixed::ZERO {
        movement::z_movement(ctx, id, mobj);
        if is_removed(ctx, id) {
            return Ok(());
        }
    }

    if mobj.tics != -1 {
        mobj.tics -= 1;
        if mobj.tics == 0 {
            let next = mobj.state.state().next;
            set_mobj_state(ctx, id, mobj, next);
        }
    }
    Ok(())
}

/// Run `f` on a map object moved out of the thinker list.
///
/// Returns `Ok(None)` if `id` is not a live map object.
pub fn with_mobj<'a, R>(
    ctx: &mut SimContext<'a>,
    id: ThinkerId,
    f: impl FnOnce(&mut SimContext<'a>, &mut Mobj) -> Result<R>,
) -> Result<Option<R>> {
    let Some(mut thinker) = ctx.thinkers.take(id) else {
        return Ok(None);
    };
    let outcome = match &mut thinker {
        Thinker::Mobj(mobj) => f(ctx, mobj).map(Some),
        _ => Ok(None),
    };
    ctx.thinkers.restore(id, thinker);
    outcome
}

#[cfg(test)]
mod tests {
    use crate::fixtures::RoomChain;

    use super::*;
    use crate::world::World;

    fn f(n: i32) -> Fixed {
        Fixed::from_int(n)
    }

    fn world() -> World {
        World::from_data(&RoomChain::new().room(0, 128).room(16, 100).build(), Default::default()).unwrap()
    }

    #[test]
    fn test_spawn_links_and_takes_floor() {
        let mut world = world();
        let id = world.with_context(|ctx| Ok(spawn_mobj(ctx, f(192), f(64), ONFLOORZ, MobjType::Barrel))).unwrap();
        let mobj = world.mobj(id).unwrap();
        assert_eq!(mobj.z, f(16));
        assert_eq!(mobj.floor_z, f(16));
        assert_eq!(mobj.ceiling_z, f(100));
        assert_eq!(mobj.sector(world.level()), 1);
        assert_eq!(world.level().sectors[1].things.first(), Some(&id));
        let (bx, by) = (world.blockmap().block_x(f(192)), world.blockmap().block_y(f(64)));
        assert_eq!(world.blockmap().things_in(bx, by).first(), Some(&id));
    }

    #[test]
    fn test_ceiling_spawn_hangs_from_ceiling() {
        let mut world = world();
        let id = world
            .with_context(|ctx| Ok(spawn_mobj(ctx, f(64), f(64), ONCEILINGZ, MobjType::Clip)))
            .unwrap();
        assert_eq!(world.mobj(id).unwrap().z, f(128 - 16));
    }

    #[test]
    fn test_spawn_draws_one_random_number() {
        let mut world = world();
        let before = world.rng().index();
        world
            .with_context(|ctx| Ok(spawn_mobj(ctx, f(64), f(64), ONFLOORZ, MobjType::Stimpack)))
            .unwrap();
        assert_eq!(world.rng().index(), before.wrapping_add(1));
    }

    #[test]
    fn test_null_state_removes() {
        let mut world = world();
        let id = world.with_context(|ctx| Ok(spawn_mobj(ctx, f(64), f(64), ONFLOORZ, MobjType::Blood))).unwrap();
        let alive = world
            .with_context(|ctx| with_mobj(ctx, id, |ctx, mobj| Ok(set_mobj_state(ctx, id, mobj, StateNum::Null))))
            .unwrap();
        assert_eq!(alive, Some(false));
        assert!(world.mobj(id).is_none());
    }

    #[test]
    fn test_fall_action_clears_solid() {
        let mut world = world();
        let id = world
            .with_context(|ctx| Ok(spawn_mobj(ctx, f(64), f(64), ONFLOORZ, MobjType::Possessed)))
            .unwrap();
        world
            .with_context(|ctx| with_mobj(ctx, id, |ctx, mobj| Ok(set_mobj_state(ctx, id, mobj, StateNum::PossDie3))))
            .unwrap();
        let mobj = world.mobj(id).unwrap();
        assert!(!mobj.flags.contains(MobjFlags::SOLID));
        assert_eq!(mobj.tics, 5);
    }

    #[test]
    fn test_blood_runs_out() {
        let mut world = world();
        let id = world.with_context(|ctx| Ok(spawn_mobj(ctx, f(64), f(64), ONFLOORZ, MobjType::Blood))).unwrap();
        for _ in 0..24 {
            world.tick(&[]).unwrap();
        }
        assert!(world.mobj(id).is_none());
    }
}
