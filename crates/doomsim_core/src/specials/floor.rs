//! Moving floors, stairs and donuts.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::events::{Sfx, SoundOrigin};
use crate::math::{Fixed, FRACUNIT};
use crate::thinker::ThinkerId;
use crate::world::{SimContext, Thinker};

use super::{finish_mover, move_plane, tagged_sectors, MoveResult, Plane};

/// Normal floor speed.
pub const FLOORSPEED: Fixed = Fixed::ONE;

/// What a floor does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloorKind {
    /// Lower to the highest neighbouring floor.
    LowerFloor,
    /// Lower to the lowest neighbouring floor.
    LowerFloorToLowest,
    /// Lower fast to 8 above the highest neighbouring floor.
    TurboLower,
    /// Raise to the lowest neighbouring ceiling.
    RaiseFloor,
    /// Raise to the next higher neighbouring floor.
    RaiseFloorToNearest,
    /// Raise by the height of the shortest lower texture around.
    RaiseToTexture,
    /// Lower to the lowest neighbouring floor, taking its flat and special.
    LowerAndChange,
    /// Raise by 24.
    RaiseFloor24,
    /// Raise by 24, taking the trigger's front flat and special.
    RaiseFloor24AndChange,
    /// Raise to 8 below the lowest neighbouring ceiling, crushing.
    RaiseFloorCrush,
    /// Raise fast to the next higher neighbouring floor.
    RaiseFloorTurbo,
    /// The rising ring of a donut.
    DonutRaise,
    /// Raise by 512.
    RaiseFloor512,
    /// One step of a staircase.
    BuildStair,
}

/// Staircase flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StairKind {
    /// Slow, 8 unit steps.
    Build8,
    /// Fast, 16 unit steps that crush.
    Turbo16,
}

/// A moving floor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FloorMove {
    /// Behaviour.
    pub kind: FloorKind,
    /// Whether blocked things are crushed.
    pub crush: bool,
    /// Sector.
    pub sector: usize,
    /// 1 up, -1 down.
    pub direction: i32,
    /// Special applied on arrival by the changing kinds.
    pub new_special: i16,
    /// Flat applied on arrival by the changing kinds.
    pub texture: usize,
    /// Destination height.
    pub dest: Fixed,
    /// Step per tic.
    pub speed: Fixed,
}

impl FloorMove {
    fn new(kind: FloorKind, sector: usize, direction: i32, speed: Fixed, dest: Fixed) -> Self {
        Self {
            kind,
            crush: false,
            sector,
            direction,
            new_special: 0,
            texture: 0,
            dest,
            speed,
        }
    }
}

/// One tic of a floor.
pub fn move_floor(ctx: &mut SimContext<'_>, id: ThinkerId, floor: &mut FloorMove) -> Result<()> {
    let res = move_plane(
        ctx,
        floor.sector,
        floor.speed,
        floor.dest,
        floor.crush,
        Plane::Floor,
        floor.direction,
    )?;
    let origin = SoundOrigin::Sector(floor.sector);
    if ctx.state.level_time & 7 == 0 {
        ctx.events.start_sound(origin, Sfx::Stnmov);
    }

    if res == MoveResult::PastDest {
        let changes = matches!(
            (floor.direction, floor.kind),
            (1, FloorKind::DonutRaise) | (-1, FloorKind::LowerAndChange)
        );
        if changes {
            let sector = &mut ctx.level.sectors[floor.sector];
            sector.special = floor.new_special;
            sector.floor_pic = floor.texture;
        }
        finish_mover(ctx, id, floor.sector);
        ctx.events.start_sound(origin, Sfx::Pstop);
    }
    Ok(())
}

fn spawn(ctx: &mut SimContext<'_>, floor: FloorMove) -> Result<ThinkerId> {
    let sector = floor.sector;
    let kind = floor.kind;
    let id = ctx.thinkers.add(Thinker::Floor(floor));
    ctx.level.sectors[sector].claim(sector, id)?;
    tracing::debug!(sector, ?kind, "floor started");
    Ok(id)
}

/// Height of the shortest lower texture on the two-sided lines of `sector`.
fn shortest_lower_texture(ctx: &SimContext<'_>, sector: usize) -> Fixed {
    let level = &*ctx.level;
    let mut min = Fixed::MAX;
    for &l in &level.sectors[sector].lines {
        let line = &level.lines[l];
        let Some(back) = line.back_side.filter(|_| line.is_two_sided()) else {
            continue;
        };
        for side in [line.front_side, back] {
            if let Some(height) = level.textures.height(level.sides[side].bottom_texture) {
                min = min.min(height);
            }
        }
    }
    min
}

/// Flat and special of the neighbour whose floor is at `dest`, if any.
fn model_at(ctx: &SimContext<'_>, sector: usize, dest: Fixed) -> Option<(usize, i16)> {
    let level = &*ctx.level;
    level.sectors[sector].lines.iter().find_map(|&l| {
        let line = &level.lines[l];
        if !line.is_two_sided() {
            return None;
        }
        let other = if line.front_sector == sector {
            line.back_sector?
        } else {
            line.front_sector
        };
        let other = &level.sectors[other];
        (other.floor_height == dest).then_some((other.floor_pic, other.special))
    })
}

/// Start a floor of `kind` in every idle sector tagged like `line`.
pub fn do_floor(ctx: &mut SimContext<'_>, line: usize, kind: FloorKind) -> Result<bool> {
    let mut started = false;
    for s in tagged_sectors(ctx, line) {
        if ctx.level.sectors[s].is_busy() {
            continue;
        }
        started = true;

        let level = &*ctx.level;
        let current = level.sectors[s].floor_height;
        let eight = Fixed::from_int(8);
        let quick = Fixed::from_int(4);
        let mut floor = match kind {
            FloorKind::LowerFloor => FloorMove::new(kind, s, -1, FLOORSPEED, level.highest_floor_surrounding(s)),
            FloorKind::LowerFloorToLowest => {
                FloorMove::new(kind, s, -1, FLOORSPEED, level.lowest_floor_surrounding(s))
            }
            FloorKind::TurboLower => {
                let mut dest = level.highest_floor_surrounding(s);
                if dest != current {
                    dest += eight;
                }
                FloorMove::new(kind, s, -1, quick, dest)
            }
            FloorKind::RaiseFloor | FloorKind::RaiseFloorCrush => {
                let ceiling = level.sectors[s].ceiling_height;
                let mut dest = level.lowest_ceiling_surrounding(s).min(ceiling);
                if kind == FloorKind::RaiseFloorCrush {
                    dest -= eight;
                }
                let mut floor = FloorMove::new(kind, s, 1, FLOORSPEED, dest);
                floor.crush = kind == FloorKind::RaiseFloorCrush;
                floor
            }
            FloorKind::RaiseFloorTurbo => FloorMove::new(kind, s, 1, quick, level.next_highest_floor(s, current)),
            FloorKind::RaiseFloorToNearest => {
                FloorMove::new(kind, s, 1, FLOORSPEED, level.next_highest_floor(s, current))
            }
            FloorKind::RaiseFloor24 => FloorMove::new(kind, s, 1, FLOORSPEED, current + Fixed::from_int(24)),
            FloorKind::RaiseFloor512 => FloorMove::new(kind, s, 1, FLOORSPEED, current + Fixed::from_int(512)),
            FloorKind::RaiseFloor24AndChange => {
                let model = level.lines[line].front_sector;
                let (pic, special) = (level.sectors[model].floor_pic, level.sectors[model].special);
                let sector = &mut ctx.level.sectors[s];
                sector.floor_pic = pic;
                sector.special = special;
                FloorMove::new(kind, s, 1, FLOORSPEED, current + Fixed::from_int(24))
            }
            FloorKind::RaiseToTexture => {
                let dest = Fixed::from_bits(current.to_bits().wrapping_add(shortest_lower_texture(ctx, s).to_bits()));
                FloorMove::new(kind, s, 1, FLOORSPEED, dest)
            }
            FloorKind::LowerAndChange => {
                let dest = level.lowest_floor_surrounding(s);
                let own = &level.sectors[s];
                let (texture, new_special) = model_at(ctx, s, dest).unwrap_or((own.floor_pic, 0));
                let mut floor = FloorMove::new(kind, s, -1, FLOORSPEED, dest);
                floor.texture = texture;
                floor.new_special = new_special;
                floor
            }
            FloorKind::DonutRaise | FloorKind::BuildStair => {
                FloorMove::new(kind, s, 1, FLOORSPEED, current)
            }
        };
        floor.sector = s;
        spawn(ctx, floor)?;
    }
    Ok(started)
}

/// Build a staircase from every idle sector tagged like `line`, following
/// two-sided lines whose back sector shares the step's floor flat.
///
/// The tag search carries on from the last step built.
pub fn build_stairs(ctx: &mut SimContext<'_>, line: usize, kind: StairKind) -> Result<bool> {
    let tag = ctx.level.lines[line].tag;
    let (speed, step) = match kind {
        StairKind::Build8 => (Fixed::from_bits(FRACUNIT / 4), Fixed::from_int(8)),
        StairKind::Turbo16 => (Fixed::from_int(4), Fixed::from_int(16)),
    };
    let stair = |sector: usize, dest: Fixed| FloorMove {
        crush: kind == StairKind::Turbo16,
        ..FloorMove::new(FloorKind::BuildStair, sector, 1, speed, dest)
    };

    let mut started = false;
    let mut after = None;
    while let Some(first) = ctx.level.next_tagged_sector(tag, after) {
        after = Some(first);
        if ctx.level.sectors[first].is_busy() {
            continue;
        }
        started = true;

        let mut sector = first;
        let mut height = ctx.level.sectors[sector].floor_height + step;
        spawn(ctx, stair(sector, height))?;
        let texture = ctx.level.sectors[sector].floor_pic;

        loop {
            let mut next = None;
            for &l in &ctx.level.sectors[sector].lines {
                let ld = &ctx.level.lines[l];
                if !ld.is_two_sided() || ld.front_sector != sector {
                    continue;
                }
                let Some(back) = ld.back_sector else {
                    continue;
                };
                if ctx.level.sectors[back].floor_pic != texture {
                    continue;
                }
                height += step;
                if ctx.level.sectors[back].is_busy() {
                    continue;
                }
                next = Some(back);
                break;
            }
            let Some(back) = next else {
                break;
            };
            sector = back;
            after = Some(back);
            spawn(ctx, stair(sector, height))?;
        }
    }
    Ok(started)
}

/// Raise the ring around every idle sector tagged like `line` to the
/// floor beyond it while the hole lowers to the same height.
pub fn do_donut(ctx: &mut SimContext<'_>, line: usize) -> Result<bool> {
    let mut started = false;
    for s1 in tagged_sectors(ctx, line) {
        if ctx.level.sectors[s1].is_busy() {
            continue;
        }
        started = true;

        let Some(&first_line) = ctx.level.sectors[s1].lines.first() else {
            continue;
        };
        let Some(s2) = ctx.level.next_sector(first_line, s1) else {
            continue;
        };
        if ctx.level.sectors[s2].is_busy() {
            continue;
        }
        let outer = ctx.level.sectors[s2].lines.iter().find_map(|&l| {
            let ld = &ctx.level.lines[l];
            match ld.back_sector {
                Some(back) if back != s1 => Some(back),
                _ => None,
            }
        });
        let Some(s3) = outer else {
            continue;
        };

        let (pic, dest) = (ctx.level.sectors[s3].floor_pic, ctx.level.sectors[s3].floor_height);
        let half = Fixed::from_bits(FRACUNIT / 2);
        let mut ring = FloorMove::new(FloorKind::DonutRaise, s2, 1, half, dest);
        ring.texture = pic;
        spawn(ctx, ring)?;
        spawn(ctx, FloorMove::new(FloorKind::LowerFloor, s1, -1, half, dest))?;
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

    fn run(world: &mut World, tics: usize) {
        for _ in 0..tics {
            world.tick(&[]).unwrap();
        }
    }

    fn floors(world: &World) -> Vec<Fixed> {
        world.level().sectors.iter().map(|s| s.floor_height).collect()
    }

    fn start(world: &mut World, kind: FloorKind) -> bool {
        let line = RoomChain::north_wall(0);
        world.with_context(|ctx| do_floor(ctx, line, kind)).unwrap()
    }

    #[test]
    fn test_lower_floor_to_highest_neighbour() {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 3)
            .room(64, 128)
            .tag(3)
            .room(16, 128)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        assert!(start(&mut world, FloorKind::LowerFloor));
        run(&mut world, 48);
        assert_eq!(floors(&world)[1], f(16));
        run(&mut world, 1);
        assert!(!world.level().sectors[1].is_busy());
        assert_eq!(world.thinker_count(), 0);
    }

    #[test]
    fn test_raise_floor_stops_at_lowest_ceiling() {
        let data = RoomChain::new()
            .room(0, 96)
            .wall_special(0, 3)
            .room(0, 128)
            .tag(3)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        start(&mut world, FloorKind::RaiseFloorCrush);
        run(&mut world, 100);
        assert_eq!(floors(&world)[1], f(88));
        assert!(!world.level().sectors[1].is_busy());
    }

    #[test]
    fn test_raise_to_texture_uses_shortest_lower() {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 3)
            .room(0, 128)
            .tag(3)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        start(&mut world, FloorKind::RaiseToTexture);
        run(&mut world, 20);
        // the boundary's lower texture is 16 tall
        assert_eq!(floors(&world)[1], f(16));
    }

    #[test]
    fn test_lower_and_change_takes_neighbour_flat() {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 3)
            .room(32, 128)
            .tag(3)
            .room(-16, 128)
            .floor_pic("NUKAGE1")
            .special(7)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        start(&mut world, FloorKind::LowerAndChange);
        run(&mut world, 49);
        let level = world.level();
        assert_eq!(level.sectors[1].floor_height, f(-16));
        assert_eq!(level.sectors[1].floor_pic, level.sectors[2].floor_pic);
        assert_eq!(level.sectors[1].special, 7);
    }

    #[test]
    fn test_lower_and_change_without_model_clears_special() {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 3)
            .room(-16, 128)
            .tag(3)
            .special(7)
            .room(0, 128)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let pic = world.level().sectors[1].floor_pic;
        assert!(start(&mut world, FloorKind::LowerAndChange));
        run(&mut world, 2);
        let sector = &world.level().sectors[1];
        assert_eq!(sector.floor_height, f(-16));
        assert_eq!(sector.floor_pic, pic);
        assert_eq!(sector.special, 0);
        assert!(!sector.is_busy());
    }

    #[test]
    fn test_stairs_follow_matching_flats() {
        let data = RoomChain::new()
            .room(0, 256)
            .wall_special(0, 3)
            .room(0, 256)
            .tag(3)
            .room(0, 256)
            .room(0, 256)
            .floor_pic("FLAT1")
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let line = RoomChain::north_wall(0);
        assert!(world.with_context(|ctx| build_stairs(ctx, line, StairKind::Turbo16)).unwrap());
        assert_eq!(world.thinker_count(), 2);
        run(&mut world, 20);
        assert_eq!(floors(&world), vec![Fixed::ZERO, f(16), f(32), Fixed::ZERO]);
    }

    #[test]
    fn test_donut_lowers_hole_to_ring_beyond() {
        // the ring's first two-sided line is its own west boundary, so the
        // height beyond the ring is the ring's own
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(0, 3)
            .room(8, 128)
            .floor_pic("NUKAGE1")
            .room(24, 128)
            .tag(3)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let line = RoomChain::north_wall(0);
        assert!(world.with_context(|ctx| do_donut(ctx, line)).unwrap());
        assert_eq!(world.thinker_count(), 2);
        run(&mut world, 33);
        assert_eq!(floors(&world), vec![Fixed::ZERO, f(8), f(8)]);
        assert_eq!(world.thinker_count(), 0);
    }

    #[test]
    fn test_donut_without_ring_spawns_nothing() {
        let data = RoomChain::new().room(0, 128).wall_special(0, 3).tag(3).build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let line = RoomChain::north_wall(0);
        assert!(world.with_context(|ctx| do_donut(ctx, line)).unwrap());
        assert_eq!(world.thinker_count(), 0);
    }
}
