//! Platforms: lifts, perpetual platforms and raise-and-change floors.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::events::{Sfx, SoundOrigin};
use crate::math::{Fixed, FRACUNIT};
use crate::thinker::{ThinkerId, ThinkerState};
use crate::world::{SimContext, Thinker};

use super::{move_plane, tagged_sectors, MoveResult, Plane, MAXPLATS, TICRATE};

/// Normal platform speed.
pub const PLATSPEED: Fixed = Fixed::ONE;
/// Seconds a lift waits at the bottom.
pub const PLATWAIT: i32 = 3;

/// Where a platform is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatStatus {
    /// Rising.
    Up,
    /// Lowering.
    Down,
    /// Counting down before moving again.
    Waiting,
    /// Stopped by a trigger.
    InStasis,
}

/// What a platform does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatKind {
    /// Cycle between the lowest and highest neighbouring floors forever.
    PerpetualRaise,
    /// Lift: lower, wait, come back up.
    DownWaitUpStay,
    /// Raise by a fixed amount, taking the trigger's floor flat.
    RaiseAndChange,
    /// Raise to the next higher floor, taking the trigger's floor flat.
    RaiseToNearestAndChange,
    /// Fast lift.
    BlazeDWUS,
}

/// A platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plat {
    /// Sector.
    pub sector: usize,
    /// Step per tic.
    pub speed: Fixed,
    /// Bottom of travel.
    pub low: Fixed,
    /// Top of travel.
    pub high: Fixed,
    /// Tics to wait at each end.
    pub wait: i32,
    /// Tics left of the current wait.
    pub count: i32,
    /// Current phase.
    pub status: PlatStatus,
    /// Phase before a stop.
    pub old_status: PlatStatus,
    /// Whether blocked things are crushed.
    pub crush: bool,
    /// Tag of the trigger line.
    pub tag: i16,
    /// Behaviour.
    pub kind: PlatKind,
}

/// One tic of a platform.
pub fn plat_raise(ctx: &mut SimContext<'_>, id: ThinkerId, plat: &mut Plat) -> Result<()> {
    let origin = SoundOrigin::Sector(plat.sector);
    match plat.status {
        PlatStatus::Up => {
            let res = move_plane(ctx, plat.sector, plat.speed, plat.high, plat.crush, Plane::Floor, 1)?;
            let changes = matches!(plat.kind, PlatKind::RaiseAndChange | PlatKind::RaiseToNearestAndChange);
            if changes && ctx.state.level_time & 7 == 0 {
                ctx.events.start_sound(origin, Sfx::Stnmov);
            }
            if res == MoveResult::Crushed && !plat.crush {
                plat.count = plat.wait;
                plat.status = PlatStatus::Down;
                ctx.events.start_sound(origin, Sfx::Pstart);
            } else if res == MoveResult::PastDest {
                plat.count = plat.wait;
                plat.status = PlatStatus::Waiting;
                ctx.events.start_sound(origin, Sfx::Pstop);
                if plat.kind != PlatKind::PerpetualRaise {
                    remove_active_plat(ctx, id, plat.sector)?;
                }
            }
        }
        PlatStatus::Down => {
            let res = move_plane(ctx, plat.sector, plat.speed, plat.low, false, Plane::Floor, -1)?;
            if res == MoveResult::PastDest {
                plat.count = plat.wait;
                plat.status = PlatStatus::Waiting;
                ctx.events.start_sound(origin, Sfx::Pstop);
            }
        }
        PlatStatus::Waiting => {
            plat.count -= 1;
            if plat.count == 0 {
                plat.status = if ctx.level.sectors[plat.sector].floor_height == plat.low {
                    PlatStatus::Up
                } else {
                    PlatStatus::Down
                };
                ctx.events.start_sound(origin, Sfx::Pstart);
            }
        }
        PlatStatus::InStasis => {}
    }
    Ok(())
}

/// Start a platform of `kind` in every idle sector tagged like `line`.
/// `amount` is the rise of [`PlatKind::RaiseAndChange`].
///
/// Perpetual platforms first restart stopped ones with the same tag.
pub fn do_plat(ctx: &mut SimContext<'_>, line: usize, kind: PlatKind, amount: i32) -> Result<bool> {
    let tag = ctx.level.lines[line].tag;
    if kind == PlatKind::PerpetualRaise {
        activate_in_stasis(ctx, tag);
    }

    let mut started = false;
    for s in tagged_sectors(ctx, line) {
        if ctx.level.sectors[s].is_busy() {
            continue;
        }
        started = true;

        let level = &*ctx.level;
        let floor = level.sectors[s].floor_height;
        let model_pic = level.sectors[level.sides[level.lines[line].front_side].sector].floor_pic;
        let lift_low = level.lowest_floor_surrounding(s).min(floor);
        let mut plat = Plat {
            sector: s,
            speed: PLATSPEED,
            low: floor,
            high: floor,
            wait: 0,
            count: 0,
            status: PlatStatus::Up,
            old_status: PlatStatus::Up,
            crush: false,
            tag,
            kind,
        };
        let sfx = match kind {
            PlatKind::RaiseToNearestAndChange => {
                plat.speed = Fixed::from_bits(FRACUNIT / 2);
                plat.high = level.next_highest_floor(s, floor);
                let sector = &mut ctx.level.sectors[s];
                sector.floor_pic = model_pic;
                sector.special = 0;
                Sfx::Stnmov
            }
            PlatKind::RaiseAndChange => {
                plat.speed = Fixed::from_bits(FRACUNIT / 2);
                plat.high = floor + Fixed::from_int(amount);
                ctx.level.sectors[s].floor_pic = model_pic;
                Sfx::Stnmov
            }
            PlatKind::DownWaitUpStay | PlatKind::BlazeDWUS => {
                plat.speed = Fixed::from_int(if kind == PlatKind::BlazeDWUS { 8 } else { 4 });
                plat.low = lift_low;
                plat.wait = TICRATE as i32 * PLATWAIT;
                plat.status = PlatStatus::Down;
                Sfx::Pstart
            }
            PlatKind::PerpetualRaise => {
                plat.low = lift_low;
                plat.high = level.highest_floor_surrounding(s).max(floor);
                plat.wait = TICRATE as i32 * PLATWAIT;
                plat.status = if ctx.rng.draw() & 1 == 0 {
                    PlatStatus::Up
                } else {
                    PlatStatus::Down
                };
                Sfx::Pstart
            }
        };

        let id = ctx.thinkers.add(Thinker::Plat(plat));
        ctx.level.sectors[s].claim(s, id)?;
        ctx.events.start_sound(SoundOrigin::Sector(s), sfx);
        add_active_plat(ctx, id)?;
        tracing::debug!(sector = s, ?kind, "platform started");
    }
    Ok(started)
}

fn add_active_plat(ctx: &mut SimContext<'_>, id: ThinkerId) -> Result<()> {
    let Some(slot) = ctx.specials.active_plats.iter_mut().find(|s| s.is_none()) else {
        return Err(SimError::PlatLimit(MAXPLATS));
    };
    *slot = Some(id);
    Ok(())
}

fn remove_active_plat(ctx: &mut SimContext<'_>, id: ThinkerId, sector: usize) -> Result<()> {
    let Some(slot) = ctx.specials.active_plats.iter_mut().find(|s| **s == Some(id)) else {
        return Err(SimError::InvalidState(format!("platform in sector {sector} is not active")));
    };
    *slot = None;
    ctx.level.sectors[sector].release();
    ctx.thinkers.remove(id);
    Ok(())
}

fn activate_in_stasis(ctx: &mut SimContext<'_>, tag: i16) {
    let active: Vec<ThinkerId> = ctx.specials.active_plats.iter().flatten().copied().collect();
    for id in active {
        if let Some(Thinker::Plat(plat)) = ctx.thinkers.get_mut(id) {
            if plat.tag == tag && plat.status == PlatStatus::InStasis {
                plat.status = plat.old_status;
                ctx.thinkers.set_state(id, ThinkerState::Active);
            }
        }
    }
}

/// Freeze the moving platforms tagged like `line`.
pub fn stop_plat(ctx: &mut SimContext<'_>, line: usize) {
    let tag = ctx.level.lines[line].tag;
    let active: Vec<ThinkerId> = ctx.specials.active_plats.iter().flatten().copied().collect();
    for id in active {
        if let Some(Thinker::Plat(plat)) = ctx.thinkers.get_mut(id) {
            if plat.tag == tag && plat.status != PlatStatus::InStasis {
                plat.old_status = plat.status;
                plat.status = PlatStatus::InStasis;
                ctx.thinkers.set_state(id, ThinkerState::InStasis);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::fixtures::RoomChain;
    use crate::world::World;

    fn f(n: i32) -> Fixed {
        Fixed::from_int(n)
    }

    fn run(world: &mut World, tics: usize) {
        for _ in 0..tics {
            world.tick(&[]).unwrap();
        }
    }

    fn lift_world() -> World {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 4)
            .room(64, 128)
            .tag(4)
            .build();
        World::from_data(&data, GameConfig::default()).unwrap()
    }

    fn start(world: &mut World, kind: PlatKind, amount: i32) -> bool {
        let line = RoomChain::north_wall(0);
        world.with_context(|ctx| do_plat(ctx, line, kind, amount)).unwrap()
    }

    fn plat(world: &World) -> Plat {
        world
            .thinkers()
            .iter()
            .find_map(|(_, _, t)| match t {
                Thinker::Plat(p) => Some(p.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_lift_lowers_waits_and_returns() {
        let mut world = lift_world();
        assert!(start(&mut world, PlatKind::DownWaitUpStay, 0));
        let p = plat(&world);
        assert_eq!((p.low, p.high), (Fixed::ZERO, f(64)));

        // 64 units at 4 per tic, plus the arrival tic
        run(&mut world, 17);
        assert_eq!(world.level().sectors[1].floor_height, Fixed::ZERO);
        assert_eq!(plat(&world).status, PlatStatus::Waiting);

        run(&mut world, 105);
        assert_eq!(plat(&world).status, PlatStatus::Up);
        run(&mut world, 17);
        assert_eq!(world.level().sectors[1].floor_height, f(64));
        assert!(!world.level().sectors[1].is_busy());
        assert_eq!(world.thinker_count(), 0);
        assert!(world.specials().active_plats.iter().all(Option::is_none));
    }

    #[test]
    fn test_stop_and_restart_perpetual() {
        let mut world = lift_world();
        assert!(start(&mut world, PlatKind::PerpetualRaise, 0));
        run(&mut world, 3);
        let line = RoomChain::north_wall(0);
        world
            .with_context(|ctx| {
                stop_plat(ctx, line);
                Ok(())
            })
            .unwrap();
        let frozen = world.level().sectors[1].floor_height;
        run(&mut world, 10);
        assert_eq!(world.level().sectors[1].floor_height, frozen);
        assert_eq!(plat(&world).status, PlatStatus::InStasis);

        // the sector is still owned, so only the restart happens
        assert!(!start(&mut world, PlatKind::PerpetualRaise, 0));
        assert_ne!(plat(&world).status, PlatStatus::InStasis);
    }

    #[test]
    fn test_raise_and_change_takes_trigger_flat() {
        let data = RoomChain::new()
            .room(0, 128)
            .floor_pic("NUKAGE1")
            .wall_special(0, 4)
            .room(0, 128)
            .tag(4)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        start(&mut world, PlatKind::RaiseAndChange, 24);
        assert_eq!(world.level().sectors[1].floor_pic, world.level().sectors[0].floor_pic);
        run(&mut world, 49);
        assert_eq!(world.level().sectors[1].floor_height, f(24));
        assert_eq!(world.thinker_count(), 0);
    }

    #[test]
    fn test_plat_slots_run_out() {
        let data = (0..=MAXPLATS).fold(RoomChain::new().room(0, 128).wall_special(0, 4), |chain, _| {
            chain.room(64, 128).tag(4)
        });
        let mut world = World::from_data(&data.build(), GameConfig::default()).unwrap();
        let line = RoomChain::north_wall(0);
        let outcome = world.with_context(|ctx| do_plat(ctx, line, PlatKind::DownWaitUpStay, 0));
        assert!(matches!(outcome, Err(SimError::PlatLimit(MAXPLATS))));
    }
}
