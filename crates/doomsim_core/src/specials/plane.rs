//! The plane mover every floor, ceiling, door and platform thinker uses.

use crate::error::Result;
use crate::math::Fixed;
use crate::mobj::movement::change_sector;
use crate::world::SimContext;

/// Outcome of one plane step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    /// Moved by the full speed.
    Ok,
    /// Something was in the way.
    Crushed,
    /// Arrived, clamped to the destination.
    PastDest,
}

/// Which plane of the sector to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// The floor.
    Floor,
    /// The ceiling.
    Ceiling,
}

fn height_mut<'s>(ctx: &'s mut SimContext<'_>, sector: usize, plane: Plane) -> &'s mut Fixed {
    let sector = &mut ctx.level.sectors[sector];
    match plane {
        Plane::Floor => &mut sector.floor_height,
        Plane::Ceiling => &mut sector.ceiling_height,
    }
}

fn set_height(ctx: &mut SimContext<'_>, sector: usize, plane: Plane, height: Fixed) {
    *height_mut(ctx, sector, plane) = height;
}

/// Move a floor or ceiling one step of `speed` toward `dest`.
///
/// Things in the sector are clipped after every change. A blocked step is
/// undone, except when a crushing floor rises or a crushing ceiling
/// lowers: those stay put and keep damaging whatever is in the way. A
/// rising ceiling is never blocked.
pub fn move_plane(
    ctx: &mut SimContext<'_>,
    sector: usize,
    speed: Fixed,
    dest: Fixed,
    crush: bool,
    plane: Plane,
    direction: i32,
) -> Result<MoveResult> {
    let last = *height_mut(ctx, sector, plane);
    match (plane, direction) {
        (_, -1) if last - speed < dest => {
            set_height(ctx, sector, plane, dest);
            if change_sector(ctx, sector, crush)? {
                set_height(ctx, sector, plane, last);
                change_sector(ctx, sector, crush)?;
            }
            Ok(MoveResult::PastDest)
        }
        (_, 1) if last + speed > dest => {
            set_height(ctx, sector, plane, dest);
            if change_sector(ctx, sector, crush)? {
                set_height(ctx, sector, plane, last);
                change_sector(ctx, sector, crush)?;
            }
            Ok(MoveResult::PastDest)
        }
        (Plane::Floor, -1) => {
            set_height(ctx, sector, plane, last - speed);
            if change_sector(ctx, sector, crush)? {
                set_height(ctx, sector, plane, last);
                change_sector(ctx, sector, crush)?;
                return Ok(MoveResult::Crushed);
            }
            Ok(MoveResult::Ok)
        }
        (Plane::Floor, 1) | (Plane::Ceiling, -1) => {
            let next = if direction == 1 { last + speed } else { last - speed };
            set_height(ctx, sector, plane, next);
            if change_sector(ctx, sector, crush)? {
                if crush {
                    return Ok(MoveResult::Crushed);
                }
                set_height(ctx, sector, plane, last);
                change_sector(ctx, sector, crush)?;
                return Ok(MoveResult::Crushed);
            }
            Ok(MoveResult::Ok)
        }
        (Plane::Ceiling, 1) => {
            set_height(ctx, sector, plane, last + speed);
            change_sector(ctx, sector, crush)?;
            Ok(MoveResult::Ok)
        }
        _ => Ok(MoveResult::Ok),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::RoomChain;
    use crate::world::World;

    fn f(n: i32) -> Fixed {
        Fixed::from_int(n)
    }

    fn step(world: &mut World, speed: i32, dest: i32, plane: Plane, direction: i32) -> MoveResult {
        world
            .with_context(|ctx| move_plane(ctx, 0, f(speed), f(dest), false, plane, direction))
            .unwrap()
    }

    #[test]
    fn test_floor_steps_then_clamps() {
        let mut world = World::from_data(&RoomChain::new().room(0, 128).build(), Default::default()).unwrap();
        assert_eq!(step(&mut world, 8, 20, Plane::Floor, 1), MoveResult::Ok);
        assert_eq!(world.level().sectors[0].floor_height, f(8));
        assert_eq!(step(&mut world, 8, 20, Plane::Floor, 1), MoveResult::Ok);
        assert_eq!(step(&mut world, 8, 20, Plane::Floor, 1), MoveResult::PastDest);
        assert_eq!(world.level().sectors[0].floor_height, f(20));
    }

    #[test]
    fn test_ceiling_lowers_to_destination() {
        let mut world = World::from_data(&RoomChain::new().room(0, 128).build(), Default::default()).unwrap();
        assert_eq!(step(&mut world, 100, 40, Plane::Ceiling, -1), MoveResult::PastDest);
        assert_eq!(world.level().sectors[0].ceiling_height, f(40));
    }

    #[test]
    fn test_blocked_floor_is_undone() {
        let data = RoomChain::new().room(0, 64).thing(3004, 64, 64, 0).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        // a 56 unit monster under a 64 unit ceiling
        assert_eq!(step(&mut world, 10, 30, Plane::Floor, 1), MoveResult::Crushed);
        assert_eq!(world.level().sectors[0].floor_height, Fixed::ZERO);
    }
}
