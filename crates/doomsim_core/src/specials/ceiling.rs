//! Moving ceilings and crushers.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::events::{Sfx, SoundOrigin};
use crate::math::{Fixed, FRACUNIT};
use crate::thinker::{ThinkerId, ThinkerState};
use crate::world::{SimContext, Thinker};

use super::{finish_mover, move_plane, tagged_sectors, MoveResult, Plane};

/// Normal ceiling speed.
pub const CEILSPEED: Fixed = Fixed::ONE;

/// What a ceiling does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CeilingKind {
    /// Lower to the floor and stop.
    LowerToFloor,
    /// Raise to the highest neighbouring ceiling and stop.
    RaiseToHighest,
    /// Lower to 8 above the floor, crushing, and stop.
    LowerAndCrush,
    /// Crush up and down forever.
    CrushAndRaise,
    /// Crush up and down forever at double speed, never slowing.
    FastCrushAndRaise,
    /// Like [`CeilingKind::CrushAndRaise`] with only stop sounds.
    SilentCrushAndRaise,
}

/// A moving ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ceiling {
    /// Behaviour.
    pub kind: CeilingKind,
    /// Sector.
    pub sector: usize,
    /// Lowest point.
    pub bottom_height: Fixed,
    /// Highest point.
    pub top_height: Fixed,
    /// Step per tic.
    pub speed: Fixed,
    /// Whether blocked things are crushed rather than stopping the ceiling.
    pub crush: bool,
    /// 1 up, -1 down, 0 stopped.
    pub direction: i32,
    /// Tag of the sector, matched by stop and restart triggers.
    pub tag: i16,
    /// Direction before a crush stop.
    pub old_direction: i32,
}

/// One tic of a ceiling.
pub fn move_ceiling(ctx: &mut SimContext<'_>, id: ThinkerId, ceiling: &mut Ceiling) -> Result<()> {
    let origin = SoundOrigin::Sector(ceiling.sector);
    let silent = ceiling.kind == CeilingKind::SilentCrushAndRaise;
    match ceiling.direction {
        1 => {
            let res = move_plane(
                ctx,
                ceiling.sector,
                ceiling.speed,
                ceiling.top_height,
                false,
                Plane::Ceiling,
                ceiling.direction,
            )?;
            if ctx.state.level_time & 7 == 0 && !silent {
                ctx.events.start_sound(origin, Sfx::Stnmov);
            }
            if res == MoveResult::PastDest {
                match ceiling.kind {
                    CeilingKind::RaiseToHighest => remove_active_ceiling(ctx, id, ceiling.sector),
                    CeilingKind::SilentCrushAndRaise => {
                        ctx.events.start_sound(origin, Sfx::Pstop);
                        ceiling.direction = -1;
                    }
                    CeilingKind::FastCrushAndRaise | CeilingKind::CrushAndRaise => ceiling.direction = -1,
                    _ => {}
                }
            }
        }
        -1 => {
            let res = move_plane(
                ctx,
                ceiling.sector,
                ceiling.speed,
                ceiling.bottom_height,
                ceiling.crush,
                Plane::Ceiling,
                ceiling.direction,
            )?;
            if ctx.state.level_time & 7 == 0 && !silent {
                ctx.events.start_sound(origin, Sfx::Stnmov);
            }
            match (res, ceiling.kind) {
                (MoveResult::PastDest, CeilingKind::SilentCrushAndRaise) => {
                    ctx.events.start_sound(origin, Sfx::Pstop);
                    ceiling.speed = CEILSPEED;
                    ceiling.direction = 1;
                }
                (MoveResult::PastDest, CeilingKind::CrushAndRaise) => {
                    ceiling.speed = CEILSPEED;
                    ceiling.direction = 1;
                }
                (MoveResult::PastDest, CeilingKind::FastCrushAndRaise) => ceiling.direction = 1,
                (MoveResult::PastDest, CeilingKind::LowerAndCrush | CeilingKind::LowerToFloor) => {
                    remove_active_ceiling(ctx, id, ceiling.sector);
                }
                (
                    MoveResult::Crushed,
                    CeilingKind::SilentCrushAndRaise | CeilingKind::CrushAndRaise | CeilingKind::LowerAndCrush,
                ) => {
                    ceiling.speed = Fixed::from_bits(FRACUNIT / 8);
                }
                _ => {}
            }
        }
        _ => {}
    }
    Ok(())
}

fn add_active_ceiling(ctx: &mut SimContext<'_>, id: ThinkerId) {
    // a full list leaves the ceiling running but unstoppable
    if let Some(slot) = ctx.specials.active_ceilings.iter_mut().find(|s| s.is_none()) {
        *slot = Some(id);
    }
}

/// Finish a ceiling and drop it from the active list.
fn remove_active_ceiling(ctx: &mut SimContext<'_>, id: ThinkerId, sector: usize) {
    if let Some(slot) = ctx.specials.active_ceilings.iter_mut().find(|s| **s == Some(id)) {
        *slot = None;
    }
    finish_mover(ctx, id, sector);
}

fn active_ceilings(ctx: &SimContext<'_>) -> Vec<ThinkerId> {
    ctx.specials.active_ceilings.iter().flatten().copied().collect()
}

/// Restart stopped crushers tagged like `line`.
fn activate_in_stasis_ceiling(ctx: &mut SimContext<'_>, line: usize) {
    let tag = ctx.level.lines[line].tag;
    for id in active_ceilings(ctx) {
        if let Some(Thinker::Ceiling(c)) = ctx.thinkers.get_mut(id) {
            if c.tag == tag && c.direction == 0 {
                c.direction = c.old_direction;
                ctx.thinkers.set_state(id, ThinkerState::Active);
            }
        }
    }
}

/// Stop the moving crushers tagged like `line`.
pub fn ceiling_crush_stop(ctx: &mut SimContext<'_>, line: usize) -> bool {
    let tag = ctx.level.lines[line].tag;
    let mut stopped = false;
    for id in active_ceilings(ctx) {
        if let Some(Thinker::Ceiling(c)) = ctx.thinkers.get_mut(id) {
            if c.tag == tag && c.direction != 0 {
                c.old_direction = c.direction;
                c.direction = 0;
                ctx.thinkers.set_state(id, ThinkerState::InStasis);
                stopped = true;
            }
        }
    }
    stopped
}

/// Start a ceiling of `kind` in every idle sector tagged like `line`.
///
/// Crusher kinds first restart any stopped crushers with the same tag.
pub fn do_ceiling(ctx: &mut SimContext<'_>, line: usize, kind: CeilingKind) -> Result<bool> {
    if matches!(
        kind,
        CeilingKind::FastCrushAndRaise | CeilingKind::SilentCrushAndRaise | CeilingKind::CrushAndRaise
    ) {
        activate_in_stasis_ceiling(ctx, line);
    }

    let mut started = false;
    for s in tagged_sectors(ctx, line) {
        let sector = &ctx.level.sectors[s];
        if sector.is_busy() {
            continue;
        }
        started = true;

        let (floor, ceil) = (sector.floor_height, sector.ceiling_height);
        let eight = Fixed::from_int(8);
        let mut ceiling = Ceiling {
            kind,
            sector: s,
            bottom_height: floor,
            top_height: ceil,
            speed: CEILSPEED,
            crush: false,
            direction: -1,
            tag: sector.tag,
            old_direction: 0,
        };
        match kind {
            CeilingKind::FastCrushAndRaise => {
                ceiling.crush = true;
                ceiling.bottom_height = floor + eight;
                ceiling.speed = CEILSPEED + CEILSPEED;
            }
            CeilingKind::SilentCrushAndRaise | CeilingKind::CrushAndRaise => {
                ceiling.crush = true;
                ceiling.bottom_height = floor + eight;
            }
            CeilingKind::LowerAndCrush => ceiling.bottom_height = floor + eight,
            CeilingKind::LowerToFloor => {}
            CeilingKind::RaiseToHighest => {
                ceiling.top_height = ctx.level.highest_ceiling_surrounding(s);
                ceiling.direction = 1;
            }
        }

        let id = ctx.thinkers.add(Thinker::Ceiling(ceiling));
        ctx.level.sectors[s].claim(s, id)?;
        add_active_ceiling(ctx, id);
        tracing::debug!(sector = s, ?kind, "ceiling started");
    }
    Ok(started)
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

    fn crusher_world() -> World {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 7)
            .room(0, 72)
            .tag(7)
            .build();
        World::from_data(&data, GameConfig::default()).unwrap()
    }

    fn trigger<R>(world: &mut World, f: impl FnOnce(&mut SimContext<'_>, usize) -> Result<R>) -> R {
        let line = RoomChain::north_wall(0);
        world.with_context(|ctx| f(ctx, line)).unwrap()
    }

    #[test]
    fn test_lower_to_floor_finishes_and_frees_sector() {
        let mut world = crusher_world();
        assert!(trigger(&mut world, |ctx, line| do_ceiling(ctx, line, CeilingKind::LowerToFloor)));
        assert!(world.level().sectors[1].is_busy());
        for _ in 0..72 {
            world.tick(&[]).unwrap();
        }
        assert_eq!(world.level().sectors[1].ceiling_height, Fixed::ZERO);
        assert!(world.level().sectors[1].is_busy());
        world.tick(&[]).unwrap();
        assert!(!world.level().sectors[1].is_busy());
        assert_eq!(world.thinker_count(), 0);
        assert!(world.specials().active_ceilings.iter().all(Option::is_none));
    }

    #[test]
    fn test_busy_sector_is_skipped() {
        let mut world = crusher_world();
        assert!(trigger(&mut world, |ctx, line| do_ceiling(ctx, line, CeilingKind::LowerToFloor)));
        assert!(!trigger(&mut world, |ctx, line| do_ceiling(ctx, line, CeilingKind::CrushAndRaise)));
        assert_eq!(world.thinker_count(), 1);
    }

    #[test]
    fn test_crusher_reverses_at_bottom() {
        let mut world = crusher_world();
        trigger(&mut world, |ctx, line| do_ceiling(ctx, line, CeilingKind::FastCrushAndRaise));
        // 72 down to 8 at 2 per tic
        for _ in 0..32 {
            world.tick(&[]).unwrap();
        }
        assert_eq!(world.level().sectors[1].ceiling_height, f(8));
        world.tick(&[]).unwrap();
        assert_eq!(world.level().sectors[1].ceiling_height, f(8));
        world.tick(&[]).unwrap();
        assert_eq!(world.level().sectors[1].ceiling_height, f(10));
        assert!(world.level().sectors[1].is_busy());
    }

    #[test]
    fn test_crush_stop_and_restart() {
        let mut world = crusher_world();
        trigger(&mut world, |ctx, line| do_ceiling(ctx, line, CeilingKind::CrushAndRaise));
        world.tick(&[]).unwrap();
        assert_eq!(world.level().sectors[1].ceiling_height, f(71));

        assert!(trigger(&mut world, |ctx, line| Ok(ceiling_crush_stop(ctx, line))));
        world.tick(&[]).unwrap();
        assert_eq!(world.level().sectors[1].ceiling_height, f(71));
        let (_, state, _) = world.thinkers().iter().next().unwrap();
        assert_eq!(state, ThinkerState::InStasis);
        assert!(!trigger(&mut world, |ctx, line| Ok(ceiling_crush_stop(ctx, line))));

        // restarting starts nothing new because the sector is still owned
        assert!(!trigger(&mut world, |ctx, line| do_ceiling(ctx, line, CeilingKind::CrushAndRaise)));
        world.tick(&[]).unwrap();
        assert_eq!(world.level().sectors[1].ceiling_height, f(70));
    }

    #[test]
    fn test_crusher_slows_on_a_thing() {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 7)
            .room(0, 72)
            .tag(7)
            .thing(3004, 192, 128, 0)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        trigger(&mut world, |ctx, line| do_ceiling(ctx, line, CeilingKind::CrushAndRaise));
        // 56 tall: touches at 56, then crushes
        for _ in 0..17 {
            world.tick(&[]).unwrap();
        }
        let ceiling = world
            .thinkers()
            .iter()
            .find_map(|(_, _, t)| match t {
                Thinker::Ceiling(c) => Some(c.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(ceiling.speed, Fixed::from_bits(FRACUNIT / 8));
    }
}
