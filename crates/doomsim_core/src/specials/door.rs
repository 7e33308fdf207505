//! Vertical doors: tagged doors, manual doors, locked doors and the two
//! timed doors sector specials spawn at level start.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::events::{Sfx, SoundOrigin};
use crate::math::Fixed;
use crate::mobj::Mobj;
use crate::player::Card;
use crate::thinker::ThinkerId;
use crate::world::{SimContext, Thinker};

use super::{finish_mover, move_plane, tagged_sectors, MoveResult, Plane, TICRATE};

/// Normal door speed.
pub const VDOORSPEED: Fixed = Fixed::from_int(2);
/// Tics a door stays open.
pub const VDOORWAIT: i32 = 150;

/// What a door does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorKind {
    /// Open, wait, close.
    Normal,
    /// Close, wait 30 seconds, open.
    Close30ThenOpen,
    /// Close and stay closed.
    Close,
    /// Open and stay open.
    Open,
    /// Wait five minutes, then behave as [`DoorKind::Normal`].
    RaiseIn5Mins,
    /// Fast open, wait, close.
    BlazeRaise,
    /// Fast open and stay open.
    BlazeOpen,
    /// Fast close and stay closed.
    BlazeClose,
}

/// A moving door.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Door {
    /// Behaviour.
    pub kind: DoorKind,
    /// Sector.
    pub sector: usize,
    /// Open height.
    pub top_height: Fixed,
    /// Step per tic.
    pub speed: Fixed,
    /// 1 up, 0 waiting, -1 down, 2 waiting to start.
    pub direction: i32,
    /// Tics to wait when open.
    pub top_wait: i32,
    /// Tics left of the current wait.
    pub top_count_down: i32,
}

impl Door {
    fn new(kind: DoorKind, sector: usize) -> Self {
        Self {
            kind,
            sector,
            top_height: Fixed::ZERO,
            speed: VDOORSPEED,
            direction: 1,
            top_wait: VDOORWAIT,
            top_count_down: 0,
        }
    }
}

fn blaze_speed() -> Fixed {
    Fixed::from_int(8)
}

/// One tic of a door.
pub fn vertical_door(ctx: &mut SimContext<'_>, id: ThinkerId, door: &mut Door) -> Result<()> {
    let origin = SoundOrigin::Sector(door.sector);
    match door.direction {
        0 => {
            door.top_count_down -= 1;
            if door.top_count_down == 0 {
                match door.kind {
                    DoorKind::BlazeRaise => {
                        door.direction = -1;
                        ctx.events.start_sound(origin, Sfx::Bdcls);
                    }
                    DoorKind::Normal => {
                        door.direction = -1;
                        ctx.events.start_sound(origin, Sfx::Dorcls);
                    }
                    DoorKind::Close30ThenOpen => {
                        door.direction = 1;
                        ctx.events.start_sound(origin, Sfx::Doropn);
                    }
                    _ => {}
                }
            }
        }
        2 => {
            door.top_count_down -= 1;
            if door.top_count_down == 0 && door.kind == DoorKind::RaiseIn5Mins {
                door.direction = 1;
                door.kind = DoorKind::Normal;
                ctx.events.start_sound(origin, Sfx::Doropn);
            }
        }
        -1 => {
            let floor = ctx.level.sectors[door.sector].floor_height;
            let res = move_plane(ctx, door.sector, door.speed, floor, false, Plane::Ceiling, -1)?;
            match res {
                MoveResult::PastDest => match door.kind {
                    DoorKind::BlazeRaise | DoorKind::BlazeClose => {
                        finish_mover(ctx, id, door.sector);
                        ctx.events.start_sound(origin, Sfx::Bdcls);
                    }
                    DoorKind::Normal | DoorKind::Close => finish_mover(ctx, id, door.sector),
                    DoorKind::Close30ThenOpen => {
                        door.direction = 0;
                        door.top_count_down = TICRATE as i32 * 30;
                    }
                    _ => {}
                },
                MoveResult::Crushed => {
                    if !matches!(door.kind, DoorKind::BlazeClose | DoorKind::Close) {
                        door.direction = 1;
                        ctx.events.start_sound(origin, Sfx::Doropn);
                    }
                }
                MoveResult::Ok => {}
            }
        }
        1 => {
            let res = move_plane(ctx, door.sector, door.speed, door.top_height, false, Plane::Ceiling, 1)?;
            if res == MoveResult::PastDest {
                match door.kind {
                    DoorKind::BlazeRaise | DoorKind::Normal => {
                        door.direction = 0;
                        door.top_count_down = door.top_wait;
                    }
                    DoorKind::Close30ThenOpen | DoorKind::BlazeOpen | DoorKind::Open => {
                        finish_mover(ctx, id, door.sector);
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn spawn(ctx: &mut SimContext<'_>, door: Door) -> Result<ThinkerId> {
    let (sector, kind) = (door.sector, door.kind);
    let id = ctx.thinkers.add(Thinker::Door(door));
    ctx.level.sectors[sector].claim(sector, id)?;
    tracing::debug!(sector, ?kind, "door started");
    Ok(id)
}

/// Start a door of `kind` in every idle sector tagged like `line`.
pub fn do_door(ctx: &mut SimContext<'_>, line: usize, kind: DoorKind) -> Result<bool> {
    let mut started = false;
    for s in tagged_sectors(ctx, line) {
        if ctx.level.sectors[s].is_busy() {
            continue;
        }
        started = true;

        let origin = SoundOrigin::Sector(s);
        let ceiling = ctx.level.sectors[s].ceiling_height;
        let open_height = ctx.level.lowest_ceiling_surrounding(s) - Fixed::from_int(4);
        let mut door = Door::new(kind, s);
        match kind {
            DoorKind::BlazeClose => {
                door.top_height = open_height;
                door.direction = -1;
                door.speed = blaze_speed();
                ctx.events.start_sound(origin, Sfx::Bdcls);
            }
            DoorKind::Close => {
                door.top_height = open_height;
                door.direction = -1;
                ctx.events.start_sound(origin, Sfx::Dorcls);
            }
            DoorKind::Close30ThenOpen => {
                door.top_height = ceiling;
                door.direction = -1;
                ctx.events.start_sound(origin, Sfx::Dorcls);
            }
            DoorKind::BlazeRaise | DoorKind::BlazeOpen => {
                door.top_height = open_height;
                door.speed = blaze_speed();
                if open_height != ceiling {
                    ctx.events.start_sound(origin, Sfx::Bdopn);
                }
            }
            DoorKind::Normal | DoorKind::Open => {
                door.top_height = open_height;
                if open_height != ceiling {
                    ctx.events.start_sound(origin, Sfx::Doropn);
                }
            }
            DoorKind::RaiseIn5Mins => {}
        }
        spawn(ctx, door)?;
    }
    Ok(started)
}

/// Whether the player behind `mobj` holds either key of a colour; grunts
/// when not.
fn has_key(ctx: &mut SimContext<'_>, mobj: &Mobj, keys: [Card; 2]) -> bool {
    let Some(p) = mobj.player else {
        return false;
    };
    if keys.iter().any(|&card| ctx.players[p].has_card(card)) {
        return true;
    }
    ctx.events.start_sound(SoundOrigin::Global, Sfx::Oof);
    false
}

fn required_keys(special: u16) -> Option<[Card; 2]> {
    match special {
        26 | 32 | 99 | 133 => Some([Card::BlueCard, Card::BlueSkull]),
        27 | 34 | 136 | 137 => Some([Card::YellowCard, Card::YellowSkull]),
        28 | 33 | 134 | 135 => Some([Card::RedCard, Card::RedSkull]),
        _ => None,
    }
}

/// A tagged door that needs a key. Only players can open it.
pub fn do_locked_door(ctx: &mut SimContext<'_>, line: usize, kind: DoorKind, mobj: &Mobj) -> Result<bool> {
    if mobj.player.is_none() {
        return Ok(false);
    }
    if let Some(keys) = required_keys(ctx.level.lines[line].special) {
        if !has_key(ctx, mobj, keys) {
            return Ok(false);
        }
    }
    do_door(ctx, line, kind)
}

/// A door opened by using its own line; the door sector is behind it.
///
/// Using a door already moving reverses it, except that monsters never
/// close doors.
pub fn ev_vertical_door(ctx: &mut SimContext<'_>, line: usize, mobj: &Mobj) -> Result<()> {
    let special = ctx.level.lines[line].special;
    if matches!(special, 26..=28 | 32..=34) {
        let keys = required_keys(special).unwrap_or([Card::BlueCard, Card::BlueSkull]);
        if !has_key(ctx, mobj, keys) {
            return Ok(());
        }
    }

    let Some(sector) = ctx.level.lines[line].back_sector else {
        return Err(SimError::OneSidedDoor { line, special });
    };
    if let Some(owner) = ctx.level.sectors[sector].special_data {
        if matches!(special, 1 | 26 | 27 | 28 | 117) {
            if let Some(Thinker::Door(door)) = ctx.thinkers.get_mut(owner) {
                if door.direction == -1 {
                    door.direction = 1;
                } else if mobj.player.is_some() {
                    door.direction = -1;
                }
            }
        }
        return Ok(());
    }

    let origin = SoundOrigin::Sector(sector);
    let sfx = if matches!(special, 117 | 118) { Sfx::Bdopn } else { Sfx::Doropn };
    ctx.events.start_sound(origin, sfx);

    let mut door = Door::new(DoorKind::Normal, sector);
    match special {
        31..=34 => {
            door.kind = DoorKind::Open;
            ctx.level.lines[line].special = 0;
        }
        117 => {
            door.kind = DoorKind::BlazeRaise;
            door.speed = blaze_speed();
        }
        118 => {
            door.kind = DoorKind::BlazeOpen;
            door.speed = blaze_speed();
            ctx.level.lines[line].special = 0;
        }
        _ => {}
    }
    door.top_height = ctx.level.lowest_ceiling_surrounding(sector) - Fixed::from_int(4);
    spawn(ctx, door)?;
    Ok(())
}

/// Sector special 10: the door closes 30 seconds into the level.
pub fn spawn_door_close_in_30(ctx: &mut SimContext<'_>, sector: usize) -> Result<()> {
    ctx.level.sectors[sector].special = 0;
    let door = Door {
        direction: 0,
        top_height: ctx.level.sectors[sector].ceiling_height,
        top_count_down: 30 * TICRATE as i32,
        ..Door::new(DoorKind::Normal, sector)
    };
    spawn(ctx, door)?;
    Ok(())
}

/// Sector special 14: the door opens five minutes into the level.
pub fn spawn_door_raise_in_5_mins(ctx: &mut SimContext<'_>, sector: usize) -> Result<()> {
    ctx.level.sectors[sector].special = 0;
    let door = Door {
        direction: 2,
        top_height: ctx.level.lowest_ceiling_surrounding(sector) - Fixed::from_int(4),
        top_count_down: 5 * 60 * TICRATE as i32,
        ..Door::new(DoorKind::RaiseIn5Mins, sector)
    };
    spawn(ctx, door)?;
    Ok(())
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

    /// A closed door room between two open rooms, the boundary into it
    /// carrying `special`.
    fn door_world(special: u16) -> World {
        let data = RoomChain::new()
            .room(0, 128)
            .room(0, 0)
            .boundary_special(special, 0)
            .tag(9)
            .room(0, 128)
            .player_start(64, 128, 0)
            .build();
        World::from_data(&data, GameConfig::default()).unwrap()
    }

    fn player_mobj(world: &World) -> Mobj {
        let id = world.players()[0].mobj.unwrap();
        world.mobj(id).unwrap().clone()
    }

    fn use_door(world: &mut World, mobj: &Mobj) -> Result<()> {
        let line = RoomChain::boundary_line(1);
        world.with_context(|ctx| ev_vertical_door(ctx, line, mobj))
    }

    #[test]
    fn test_manual_door_opens_waits_and_closes() {
        let mut world = door_world(1);
        let mobj = player_mobj(&world);
        use_door(&mut world, &mobj).unwrap();

        // 124 units at 2 per tic, then the arrival tic
        run(&mut world, 63);
        assert_eq!(world.level().sectors[1].ceiling_height, f(124));
        run(&mut world, VDOORWAIT as usize);
        run(&mut world, 63);
        assert_eq!(world.level().sectors[1].ceiling_height, Fixed::ZERO);
        assert!(!world.level().sectors[1].is_busy());
    }

    #[test]
    fn test_using_a_closing_door_reopens_it() {
        let mut world = door_world(1);
        let mobj = player_mobj(&world);
        use_door(&mut world, &mobj).unwrap();
        run(&mut world, 10);
        // a second press while rising sends it down
        use_door(&mut world, &mobj).unwrap();
        run(&mut world, 2);
        assert_eq!(world.level().sectors[1].ceiling_height, f(16));
        use_door(&mut world, &mobj).unwrap();
        run(&mut world, 1);
        assert_eq!(world.level().sectors[1].ceiling_height, f(18));
    }

    #[test]
    fn test_locked_door_needs_key() {
        let mut world = door_world(26);
        let mobj = player_mobj(&world);
        use_door(&mut world, &mobj).unwrap();
        assert!(!world.level().sectors[1].is_busy());

        world.players_mut()[0].give_card(Card::BlueSkull);
        use_door(&mut world, &mobj).unwrap();
        assert!(world.level().sectors[1].is_busy());
    }

    #[test]
    fn test_one_sided_door_is_an_error() {
        let mut world = door_world(1);
        let mobj = player_mobj(&world);
        let wall = RoomChain::north_wall(0);
        let outcome = world.with_context(|ctx| ev_vertical_door(ctx, wall, &mobj));
        assert!(matches!(outcome, Err(SimError::OneSidedDoor { .. })));
    }

    #[test]
    fn test_open_door_clears_special_and_stays_open() {
        let mut world = door_world(31);
        let mobj = player_mobj(&world);
        use_door(&mut world, &mobj).unwrap();
        assert_eq!(world.level().lines[RoomChain::boundary_line(1)].special, 0);
        run(&mut world, 64);
        assert_eq!(world.level().sectors[1].ceiling_height, f(124));
        assert_eq!(world.thinker_count(), 1);
    }

    #[test]
    fn test_tagged_close_door() {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 9)
            .room(0, 64)
            .tag(9)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let line = RoomChain::north_wall(0);
        assert!(world.with_context(|ctx| do_door(ctx, line, DoorKind::Close)).unwrap());
        run(&mut world, 33);
        assert_eq!(world.level().sectors[1].ceiling_height, Fixed::ZERO);
        assert_eq!(world.thinker_count(), 0);
    }

    #[test]
    fn test_close_in_30_sector() {
        let data = RoomChain::new().room(0, 128).room(0, 64).special(10).build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        assert_eq!(world.level().sectors[1].special, 0);
        run(&mut world, 30 * TICRATE as usize);
        assert_eq!(world.level().sectors[1].ceiling_height, f(64));
        run(&mut world, 1);
        assert_eq!(world.level().sectors[1].ceiling_height, f(62));
    }
}
