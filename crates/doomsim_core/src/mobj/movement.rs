//! Moving map objects against the level: position tests, stepping,
//! wall sliding, gravity, and fitting things into sectors that changed
//! height under them.

use crate::angle::{Angle, ANG180};
use crate::collision::line_opening;
use crate::error::Result;
use crate::events::{Sfx, SoundOrigin};
use crate::geometry::{
    approx_distance, box_on_line_side, point_on_line_side, point_to_angle, BoundingBox, BoxSide, SlopeType,
};
use crate::map::{Level, LineFlags};
use crate::math::{Fixed, FRACUNIT};
use crate::specials::lines::cross_special_line;
use crate::thinker::ThinkerId;
use crate::traverse::{path_intercepts, traverse_intercepts};
use crate::world::{SimContext, Thinker};

use super::info::{MobjFlags, MobjType, StateNum, FRICTION, GRAVITY, MAXMOVE, MAXRADIUS, MAX_STEP, STOPSPEED, VIEWHEIGHT};
use super::{interact, set_mobj_state, set_thing_position, spawn_mobj, unset_thing_position, with_mobj, Mobj};

/// What a position test found around the tested spot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveCheck {
    /// Highest floor touched.
    pub floor_z: Fixed,
    /// Lowest ceiling touched.
    pub ceiling_z: Fixed,
    /// Lowest floor touched.
    pub dropoff_z: Fixed,
    /// Line that set `ceiling_z`.
    pub ceiling_line: Option<usize>,
    /// Special lines touched, in the order they were met.
    pub spec_hit: Vec<usize>,
}

/// Whether `mobj` could stand at `(x, y)`, ignoring heights.
///
/// Solid things and impassable lines block. Specials touched along the way
/// are picked up when the mover has [`MobjFlags::PICKUP`]. The returned
/// check is filled in as far as the test got, even on failure.
pub fn check_position(
    ctx: &mut SimContext<'_>,
    id: ThinkerId,
    mobj: &mut Mobj,
    x: Fixed,
    y: Fixed,
) -> Result<(bool, MoveCheck)> {
    let bbox = BoundingBox::around(x, y, mobj.radius);
    let sector = &ctx.level.sectors[ctx.level.sector_at(x, y)];
    let mut check = MoveCheck {
        floor_z: sector.floor_height,
        ceiling_z: sector.ceiling_height,
        dropoff_z: sector.floor_height,
        ceiling_line: None,
        spec_hit: Vec::new(),
    };

    ctx.blockmap.new_traversal();

    if mobj.flags.contains(MobjFlags::NOCLIP) {
        return Ok((true, check));
    }

    let (xl, xh) = (
        ctx.blockmap.block_x(bbox.left - MAXRADIUS),
        ctx.blockmap.block_x(bbox.right + MAXRADIUS),
    );
    let (yl, yh) = (
        ctx.blockmap.block_y(bbox.bottom - MAXRADIUS),
        ctx.blockmap.block_y(bbox.top + MAXRADIUS),
    );
    for bx in xl..=xh {
        for by in yl..=yh {
            for other in ctx.blockmap.things_in(bx, by) {
                if !check_thing(ctx, other, id, mobj, x, y)? {
                    return Ok((false, check));
                }
            }
        }
    }

    let (xl, xh) = (ctx.blockmap.block_x(bbox.left), ctx.blockmap.block_x(bbox.right));
    let (yl, yh) = (ctx.blockmap.block_y(bbox.bottom), ctx.blockmap.block_y(bbox.top));
    let is_player = mobj.player.is_some();
    for bx in xl..=xh {
        for by in yl..=yh {
            let level = &*ctx.level;
            let open = ctx
                .blockmap
                .try_for_each_line(bx, by, |line| Ok(check_line(level, &bbox, line, is_player, &mut check)))?;
            if !open {
                return Ok((false, check));
            }
        }
    }

    Ok((true, check))
}

fn check_thing(
    ctx: &mut SimContext<'_>,
    other: ThinkerId,
    id: ThinkerId,
    mobj: &mut Mobj,
    x: Fixed,
    y: Fixed,
) -> Result<bool> {
    // the mover itself is out of the list while it moves
    let Some(thing) = ctx.thinkers.get(other).and_then(Thinker::as_mobj) else {
        return Ok(true);
    };
    let flags = thing.flags;
    if !flags.intersects(MobjFlags::SOLID | MobjFlags::SPECIAL | MobjFlags::SHOOTABLE) {
        return Ok(true);
    }

    let block_dist = thing.radius + mobj.radius;
    if (thing.x - x).abs() >= block_dist || (thing.y - y).abs() >= block_dist {
        return Ok(true);
    }

    if flags.contains(MobjFlags::SPECIAL) {
        if mobj.flags.contains(MobjFlags::PICKUP) {
            with_mobj(ctx, other, |ctx, special| {
                interact::touch_special_thing(ctx, other, special, id, mobj);
                Ok(())
            })?;
        }
        return Ok(!flags.contains(MobjFlags::SOLID));
    }

    Ok(!flags.contains(MobjFlags::SOLID))
}

fn check_line(level: &Level, bbox: &BoundingBox, line: usize, is_player: bool, check: &mut MoveCheck) -> bool {
    let ld = &level.lines[line];
    if bbox.right <= ld.bbox.left
        || bbox.left >= ld.bbox.right
        || bbox.top <= ld.bbox.bottom
        || bbox.bottom >= ld.bbox.top
    {
        return true;
    }
    if box_on_line_side(bbox, &ld.div_line(), ld.slope) != BoxSide::Straddle {
        return true;
    }

    if ld.back_sector.is_none() {
        return false;
    }
    if ld.flags.contains(LineFlags::BLOCKING) {
        return false;
    }
    if ld.flags.contains(LineFlags::BLOCK_MONSTERS) && !is_player {
        return false;
    }

    let opening = line_opening(level, line);
    if opening.top < check.ceiling_z {
        check.ceiling_z = opening.top;
        check.ceiling_line = Some(line);
    }
    if opening.bottom > check.floor_z {
        check.floor_z = opening.bottom;
    }
    if opening.low_floor < check.dropoff_z {
        check.dropoff_z = opening.low_floor;
    }
    if ld.special != 0 {
        check.spec_hit.push(line);
    }
    true
}

/// Move to `(x, y)` if the spot is free and the step is climbable, then
/// trigger any walk-over lines crossed. Returns `false` if blocked.
pub fn try_move(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj, x: Fixed, y: Fixed) -> Result<bool> {
    let (fits, check) = check_position(ctx, id, mobj, x, y)?;
    if !fits {
        return Ok(false);
    }

    if !mobj.flags.contains(MobjFlags::NOCLIP) {
        if check.ceiling_z - check.floor_z < mobj.height {
            return Ok(false);
        }
        let teleporting = mobj.flags.contains(MobjFlags::TELEPORT);
        if !teleporting && check.ceiling_z - mobj.z < mobj.height {
            return Ok(false);
        }
        if !teleporting && check.floor_z - mobj.z > MAX_STEP {
            return Ok(false);
        }
        if !mobj.flags.intersects(MobjFlags::DROPOFF | MobjFlags::FLOAT) && check.floor_z - check.dropoff_z > MAX_STEP {
            return Ok(false);
        }
    }

    unset_thing_position(ctx, id, mobj);
    let (old_x, old_y) = (mobj.x, mobj.y);
    mobj.floor_z = check.floor_z;
    mobj.ceiling_z = check.ceiling_z;
    mobj.x = x;
    mobj.y = y;
    set_thing_position(ctx, id, mobj);

    if !mobj.flags.intersects(MobjFlags::TELEPORT | MobjFlags::NOCLIP) {
        for &line in check.spec_hit.iter().rev() {
            let ld = &ctx.level.lines[line];
            let div = ld.div_line();
            let side = point_on_line_side(mobj.x, mobj.y, &div);
            let old_side = point_on_line_side(old_x, old_y, &div);
            if side != old_side && ld.special != 0 {
                cross_special_line(ctx, line, old_side, id, mobj)?;
            }
        }
    }

    Ok(true)
}

fn half(v: Fixed) -> Fixed {
    Fixed::from_bits(v.to_bits() / 2)
}

/// Apply horizontal momentum, split into steps no longer than half of
/// [`MAXMOVE`], then friction.
pub fn xy_movement(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj) -> Result<()> {
    if mobj.mom_x == Fixed::ZERO && mobj.mom_y == Fixed::ZERO {
        if mobj.flags.contains(MobjFlags::SKULLFLY) {
            mobj.flags.remove(MobjFlags::SKULLFLY);
            mobj.mom_z = Fixed::ZERO;
            let spawn_state = mobj.kind.info().spawn_state;
            set_mobj_state(ctx, id, mobj, spawn_state);
        }
        return Ok(());
    }

    let clamp = |v: Fixed| {
        if v > MAXMOVE {
            MAXMOVE
        } else if v < -MAXMOVE {
            -MAXMOVE
        } else {
            v
        }
    };
    mobj.mom_x = clamp(mobj.mom_x);
    mobj.mom_y = clamp(mobj.mom_y);

    let mut x_move = mobj.mom_x;
    let mut y_move = mobj.mom_y;
    loop {
        let (try_x, try_y) = if x_move > half(MAXMOVE) || y_move > half(MAXMOVE) {
            let step = (mobj.x + half(x_move), mobj.y + half(y_move));
            x_move = x_move >> 1;
            y_move = y_move >> 1;
            step
        } else {
            let step = (mobj.x + x_move, mobj.y + y_move);
            x_move = Fixed::ZERO;
            y_move = Fixed::ZERO;
            step
        };

        if !try_move(ctx, id, mobj, try_x, try_y)? {
            if mobj.player.is_some() {
                slide_move(ctx, id, mobj)?;
            } else {
                mobj.mom_x = Fixed::ZERO;
                mobj.mom_y = Fixed::ZERO;
            }
        }

        if x_move == Fixed::ZERO && y_move == Fixed::ZERO {
            break;
        }
    }

    if mobj.flags.intersects(MobjFlags::MISSILE | MobjFlags::SKULLFLY) {
        return Ok(());
    }
    if mobj.z > mobj.floor_z {
        return Ok(());
    }

    if mobj.flags.contains(MobjFlags::CORPSE) {
        let quarter = Fixed::from_bits(FRACUNIT / 4);
        let sliding = mobj.mom_x > quarter || mobj.mom_x < -quarter || mobj.mom_y > quarter || mobj.mom_y < -quarter;
        if sliding && mobj.floor_z != ctx.level.sectors[mobj.sector(ctx.level)].floor_height {
            // still sliding off a step
            return Ok(());
        }
    }

    let idle = mobj.player.map_or(true, |p| {
        let cmd = ctx.players[p].cmd;
        cmd.forward_move == 0 && cmd.side_move == 0
    });
    let slow = mobj.mom_x > -STOPSPEED && mobj.mom_x < STOPSPEED && mobj.mom_y > -STOPSPEED && mobj.mom_y < STOPSPEED;
    if slow && idle {
        if mobj.player.is_some()
            && matches!(
                mobj.state,
                StateNum::PlayRun1 | StateNum::PlayRun2 | StateNum::PlayRun3 | StateNum::PlayRun4
            )
        {
            set_mobj_state(ctx, id, mobj, StateNum::Play);
        }
        mobj.mom_x = Fixed::ZERO;
        mobj.mom_y = Fixed::ZERO;
    } else {
        mobj.mom_x = mobj.mom_x.mul(FRICTION);
        mobj.mom_y = mobj.mom_y.mul(FRICTION);
    }
    Ok(())
}

/// Apply vertical momentum and gravity, landing on the floor and
/// bumping the ceiling.
pub fn z_movement(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj) {
    if let Some(p) = mobj.player {
        if mobj.z < mobj.floor_z {
            let player = &mut ctx.players[p];
            player.view_height = player.view_height - (mobj.floor_z - mobj.z);
            player.delta_view_height = (VIEWHEIGHT - player.view_height) >> 3;
        }
    }

    mobj.z += mobj.mom_z;

    if mobj.z <= mobj.floor_z {
        if mobj.flags.contains(MobjFlags::SKULLFLY) {
            mobj.mom_z = -mobj.mom_z;
        }
        if mobj.mom_z < Fixed::ZERO {
            if let Some(p) = mobj.player {
                if mobj.mom_z < -Fixed::from_bits(GRAVITY.to_bits() * 8) {
                    // squat down from a hard landing
                    ctx.players[p].delta_view_height = mobj.mom_z >> 3;
                    ctx.events.start_sound(SoundOrigin::Mobj(id), Sfx::Oof);
                }
            }
            mobj.mom_z = Fixed::ZERO;
        }
        mobj.z = mobj.floor_z;
    } else if !mobj.flags.contains(MobjFlags::NOGRAVITY) {
        if mobj.mom_z == Fixed::ZERO {
            mobj.mom_z = -Fixed::from_bits(GRAVITY.to_bits() * 2);
        } else {
            mobj.mom_z -= GRAVITY;
        }
    }

    if mobj.z + mobj.height > mobj.ceiling_z {
        if mobj.flags.contains(MobjFlags::SKULLFLY) {
            mobj.mom_z = -mobj.mom_z;
        }
        if mobj.mom_z > Fixed::ZERO {
            mobj.mom_z = Fixed::ZERO;
        }
        mobj.z = mobj.ceiling_z - mobj.height;
    }
}

/// The nearest wall blocking a slide.
struct SlideHit {
    frac: Fixed,
    line: Option<usize>,
}

fn slide_traverse(level: &Level, mobj: &Mobj, frac: Fixed, line: usize, hit: &mut SlideHit) -> bool {
    let ld = &level.lines[line];
    let blocking = if ld.flags.contains(LineFlags::TWO_SIDED) {
        let opening = line_opening(level, line);
        opening.range < mobj.height
            || opening.top - mobj.z < mobj.height
            || opening.bottom - mobj.z > MAX_STEP
    } else {
        // the back of a one-sided wall is never hit
        point_on_line_side(mobj.x, mobj.y, &ld.div_line()) == 0
    };
    if !blocking {
        return true;
    }
    if frac < hit.frac {
        hit.frac = frac;
        hit.line = Some(line);
    }
    false
}

fn trace_slide(
    ctx: &mut SimContext<'_>,
    mobj: &Mobj,
    x: Fixed,
    y: Fixed,
    hit: &mut SlideHit,
) -> Result<()> {
    let mut intercepts = path_intercepts(ctx.level, ctx.blockmap, x, y, x + mobj.mom_x, y + mobj.mom_y)?;
    let level = &*ctx.level;
    traverse_intercepts(&mut intercepts, Fixed::ONE, |i| Ok(slide_traverse(level, mobj, i.frac, i.line, hit)))?;
    Ok(())
}

/// Project the move `(x_move, y_move)` onto `line`.
fn hit_slide_line(level: &Level, mobj: &Mobj, line: usize, x_move: Fixed, y_move: Fixed) -> (Fixed, Fixed) {
    let ld = &level.lines[line];
    match ld.slope {
        SlopeType::Horizontal => return (x_move, Fixed::ZERO),
        SlopeType::Vertical => return (Fixed::ZERO, y_move),
        _ => {}
    }

    let side = point_on_line_side(mobj.x, mobj.y, &ld.div_line());
    let mut line_angle = point_to_angle(Fixed::ZERO, Fixed::ZERO, ld.dx, ld.dy);
    if side == 1 {
        line_angle += Angle::A180;
    }
    let move_angle = point_to_angle(Fixed::ZERO, Fixed::ZERO, x_move, y_move);
    let mut delta = move_angle - line_angle;
    if delta.to_bits() > ANG180 {
        delta += Angle::A180;
    }

    let move_len = approx_distance(x_move, y_move);
    let new_len = move_len.mul(delta.cos());
    (new_len.mul(line_angle.cos()), new_len.mul(line_angle.sin()))
}

/// Slide a blocked player along the nearest wall.
///
/// Traces from the leading corner and both adjacent corners of the
/// bounding box, moves up to the closest hit, then spends the rest of the
/// momentum along the wall. After three attempts it falls back to moving
/// one axis at a time.
pub fn slide_move(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj) -> Result<()> {
    let mut hit_count = 0;
    loop {
        hit_count += 1;
        if hit_count == 3 {
            return stair_step(ctx, id, mobj);
        }

        let (lead_x, trail_x) = if mobj.mom_x > Fixed::ZERO {
            (mobj.x + mobj.radius, mobj.x - mobj.radius)
        } else {
            (mobj.x - mobj.radius, mobj.x + mobj.radius)
        };
        let (lead_y, trail_y) = if mobj.mom_y > Fixed::ZERO {
            (mobj.y + mobj.radius, mobj.y - mobj.radius)
        } else {
            (mobj.y - mobj.radius, mobj.y + mobj.radius)
        };

        let mut hit = SlideHit {
            frac: Fixed::from_bits(FRACUNIT + 1),
            line: None,
        };
        trace_slide(ctx, mobj, lead_x, lead_y, &mut hit)?;
        trace_slide(ctx, mobj, trail_x, lead_y, &mut hit)?;
        trace_slide(ctx, mobj, lead_x, trail_y, &mut hit)?;

        let Some(line) = hit.line else {
            return stair_step(ctx, id, mobj);
        };

        // fudge a bit to keep clear of the wall
        let mut frac = hit.frac - Fixed::from_bits(0x800);
        if frac > Fixed::ZERO {
            let new_x = mobj.x + mobj.mom_x.mul(frac);
            let new_y = mobj.y + mobj.mom_y.mul(frac);
            if !try_move(ctx, id, mobj, new_x, new_y)? {
                return stair_step(ctx, id, mobj);
            }
        }

        frac = Fixed::ONE - (frac + Fixed::from_bits(0x800));
        if frac > Fixed::ONE {
            frac = Fixed::ONE;
        }
        if frac <= Fixed::ZERO {
            return Ok(());
        }

        let (x_move, y_move) = hit_slide_line(
            ctx.level,
            mobj,
            line,
            mobj.mom_x.mul(frac),
            mobj.mom_y.mul(frac),
        );
        mobj.mom_x = x_move;
        mobj.mom_y = y_move;
        let (new_x, new_y) = (mobj.x + x_move, mobj.y + y_move);
        if try_move(ctx, id, mobj, new_x, new_y)? {
            return Ok(());
        }
    }
}

fn stair_step(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj) -> Result<()> {
    let (x, y) = (mobj.x, mobj.y + mobj.mom_y);
    if !try_move(ctx, id, mobj, x, y)? {
        let (x, y) = (mobj.x + mobj.mom_x, mobj.y);
        try_move(ctx, id, mobj, x, y)?;
    }
    Ok(())
}

/// Refit an object to the floor and ceiling around it after a sector
/// moved. Things on the floor ride it; others are pushed down by the
/// ceiling. Returns whether the object still fits.
pub fn thing_height_clip(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj) -> Result<bool> {
    let on_floor = mobj.z == mobj.floor_z;

    let (x, y) = (mobj.x, mobj.y);
    let (_, check) = check_position(ctx, id, mobj, x, y)?;
    mobj.floor_z = check.floor_z;
    mobj.ceiling_z = check.ceiling_z;

    if on_floor {
        mobj.z = mobj.floor_z;
    } else if mobj.z + mobj.height > mobj.ceiling_z {
        mobj.z = mobj.ceiling_z - mobj.height;
    }

    Ok(mobj.ceiling_z - mobj.floor_z >= mobj.height)
}

fn change_sector_thing(ctx: &mut SimContext<'_>, id: ThinkerId, mobj: &mut Mobj, crunch: bool) -> Result<bool> {
    if thing_height_clip(ctx, id, mobj)? {
        return Ok(false);
    }

    if mobj.health <= 0 {
        set_mobj_state(ctx, id, mobj, StateNum::Gibs);
        mobj.flags.remove(MobjFlags::SOLID);
        mobj.height = Fixed::ZERO;
        mobj.radius = Fixed::ZERO;
        return Ok(false);
    }

    if mobj.flags.contains(MobjFlags::DROPPED) {
        super::remove_mobj(ctx, id, mobj);
        return Ok(false);
    }

    if !mobj.flags.contains(MobjFlags::SHOOTABLE) {
        return Ok(false);
    }

    if crunch && ctx.state.level_time & 3 == 0 {
        interact::damage_mobj(ctx, id, mobj, 10);
        let blood = spawn_mobj(ctx, mobj.x, mobj.y, mobj.z + half(mobj.height), MobjType::Blood);
        let mom_x = Fixed::from_bits(ctx.rng.sub_random() << 12);
        let mom_y = Fixed::from_bits(ctx.rng.sub_random() << 12);
        if let Some(blood) = ctx.thinkers.get_mut(blood).and_then(Thinker::as_mobj_mut) {
            blood.mom_x = mom_x;
            blood.mom_y = mom_y;
        }
    }
    Ok(true)
}

/// Refit every thing that may touch `sector` after its floor or ceiling
/// moved. With `crunch`, things that no longer fit take damage.
///
/// Returns `true` if anything did not fit.
pub fn change_sector(ctx: &mut SimContext<'_>, sector: usize, crunch: bool) -> Result<bool> {
    let blockbox = ctx.level.sectors[sector].blockbox;
    let mut no_fit = false;
    for x in blockbox.left..=blockbox.right {
        for y in blockbox.bottom..=blockbox.top {
            for id in ctx.blockmap.things_in(x, y) {
                if with_mobj(ctx, id, |ctx, mobj| change_sector_thing(ctx, id, mobj, crunch))? == Some(true) {
                    no_fit = true;
                }
            }
        }
    }
    Ok(no_fit)
}

#[cfg(test)]
mod tests {
    use crate::fixtures::RoomChain;

    use super::*;
    use crate::mobj::info::ONFLOORZ;
    use crate::world::World;

    fn f(n: i32) -> Fixed {
        Fixed::from_int(n)
    }

    fn spawn(world: &mut World, kind: MobjType, x: i32, y: i32) -> ThinkerId {
        world
            .with_context(|ctx| Ok(spawn_mobj(ctx, f(x), f(y), ONFLOORZ, kind)))
            .unwrap()
    }

    fn attempt(world: &mut World, id: ThinkerId, x: i32, y: i32) -> bool {
        world
            .with_context(|ctx| with_mobj(ctx, id, |ctx, mobj| try_move(ctx, id, mobj, f(x), f(y))))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_small_step_is_climbed() {
        let data = RoomChain::new().room(0, 128).room(24, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Possessed, 100, 64);
        assert!(attempt(&mut world, id, 140, 64));
        let mobj = world.mobj(id).unwrap();
        assert_eq!(mobj.floor_z, f(24));
        assert_eq!(mobj.sector(world.level()), 1);
    }

    #[test]
    fn test_tall_step_blocks() {
        let data = RoomChain::new().room(0, 128).room(25, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Possessed, 100, 64);
        assert!(!attempt(&mut world, id, 140, 64));
        assert_eq!(world.mobj(id).unwrap().x, f(100));
    }

    #[test]
    fn test_low_ceiling_blocks() {
        let data = RoomChain::new().room(0, 128).room(0, 50).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Possessed, 100, 64);
        assert!(!attempt(&mut world, id, 140, 64));
    }

    #[test]
    fn test_monster_will_not_walk_off_ledge() {
        let data = RoomChain::new().room(64, 192).room(0, 192).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Imp, 100, 64);
        assert!(!attempt(&mut world, id, 120, 64));
    }

    #[test]
    fn test_floating_monster_may_leave_ledge() {
        let data = RoomChain::new().room(64, 192).room(0, 192).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Imp, 100, 64);
        world
            .with_context(|ctx| {
                with_mobj(ctx, id, |_, mobj| {
                    mobj.flags.insert(MobjFlags::FLOAT);
                    Ok(())
                })
            })
            .unwrap();
        assert!(attempt(&mut world, id, 120, 64));
    }

    #[test]
    fn test_solid_things_block() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let lamp = spawn(&mut world, MobjType::FloorLamp, 64, 64);
        let id = spawn(&mut world, MobjType::Possessed, 64, 150);
        assert!(!attempt(&mut world, id, 64, 99));
        assert!(attempt(&mut world, id, 64, 100));
        assert!(world.mobj(lamp).is_some());
    }

    #[test]
    fn test_walls_block() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Possessed, 64, 64);
        assert!(!attempt(&mut world, id, 64, 240));
        assert!(attempt(&mut world, id, 64, 235));
    }

    #[test]
    fn test_gravity_accelerates_then_lands() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = world
            .with_context(|ctx| Ok(spawn_mobj(ctx, f(64), f(64), f(10), MobjType::Barrel)))
            .unwrap();
        world.tick(&[]).unwrap();
        let mobj = world.mobj(id).unwrap();
        assert_eq!(mobj.z, f(10));
        assert_eq!(mobj.mom_z, f(-2));
        world.tick(&[]).unwrap();
        assert_eq!(world.mobj(id).unwrap().z, f(8));
        assert_eq!(world.mobj(id).unwrap().mom_z, f(-3));
        for _ in 0..4 {
            world.tick(&[]).unwrap();
        }
        let mobj = world.mobj(id).unwrap();
        assert_eq!(mobj.z, Fixed::ZERO);
        assert_eq!(mobj.mom_z, Fixed::ZERO);
    }

    #[test]
    fn test_friction_slows_then_stops() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Barrel, 40, 128);
        world
            .with_context(|ctx| {
                if let Some(m) = ctx.thinkers.get_mut(id).and_then(Thinker::as_mobj_mut) {
                    m.mom_x = f(1);
                }
                Ok(())
            })
            .unwrap();
        world.tick(&[]).unwrap();
        let mobj = world.mobj(id).unwrap();
        assert_eq!(mobj.x, f(41));
        assert_eq!(mobj.mom_x, FRICTION);
        for _ in 0..100 {
            world.tick(&[]).unwrap();
        }
        assert_eq!(world.mobj(id).unwrap().mom_x, Fixed::ZERO);
    }

    #[test]
    fn test_height_clip_rides_floor_and_reports_fit() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Possessed, 64, 64);
        world.level_mut().sectors[0].floor_height = f(40);
        let fits = world
            .with_context(|ctx| with_mobj(ctx, id, |ctx, mobj| thing_height_clip(ctx, id, mobj)))
            .unwrap();
        assert_eq!(fits, Some(true));
        assert_eq!(world.mobj(id).unwrap().z, f(40));

        world.level_mut().sectors[0].ceiling_height = f(80);
        let fits = world
            .with_context(|ctx| with_mobj(ctx, id, |ctx, mobj| thing_height_clip(ctx, id, mobj)))
            .unwrap();
        assert_eq!(fits, Some(false));
    }

    #[test]
    fn test_crushed_corpse_turns_to_gibs() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Possessed, 64, 64);
        world
            .with_context(|ctx| {
                if let Some(m) = ctx.thinkers.get_mut(id).and_then(Thinker::as_mobj_mut) {
                    m.health = 0;
                }
                Ok(())
            })
            .unwrap();
        world.level_mut().sectors[0].ceiling_height = f(20);
        let no_fit = world.with_context(|ctx| change_sector(ctx, 0, true)).unwrap();
        assert!(!no_fit);
        let mobj = world.mobj(id).unwrap();
        assert_eq!(mobj.state, StateNum::Gibs);
        assert_eq!(mobj.height, Fixed::ZERO);
        assert!(!mobj.flags.contains(MobjFlags::SOLID));
    }

    #[test]
    fn test_crushing_damages_and_bleeds() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Demon, 64, 64);
        world.level_mut().sectors[0].ceiling_height = f(40);
        let before = world.thinker_count();
        let no_fit = world.with_context(|ctx| change_sector(ctx, 0, true)).unwrap();
        assert!(no_fit);
        assert_eq!(world.mobj(id).unwrap().health, 140);
        assert_eq!(world.thinker_count(), before + 1);
    }

    #[test]
    fn test_dropped_items_are_removed_when_crushed() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, Default::default()).unwrap();
        let id = spawn(&mut world, MobjType::Clip, 64, 64);
        world
            .with_context(|ctx| {
                if let Some(m) = ctx.thinkers.get_mut(id).and_then(Thinker::as_mobj_mut) {
                    m.flags.insert(MobjFlags::DROPPED);
                }
                Ok(())
            })
            .unwrap();
        world.level_mut().sectors[0].ceiling_height = f(8);
        world.with_context(|ctx| change_sector(ctx, 0, false)).unwrap();
        assert!(world.mobj(id).is_none());
    }

    #[test]
    fn test_slide_line_projection_on_axis_lines() {
        let data = RoomChain::new().room(0, 128).build();
        let (level, _) = Level::build(&data).unwrap();
        let mobj = Mobj {
            kind: MobjType::Player,
            x: f(64),
            y: f(64),
            z: Fixed::ZERO,
            angle: Angle::ZERO,
            state: StateNum::Play,
            tics: -1,
            subsector: 0,
            floor_z: Fixed::ZERO,
            ceiling_z: f(128),
            radius: f(16),
            height: f(56),
            mom_x: Fixed::ZERO,
            mom_y: Fixed::ZERO,
            mom_z: Fixed::ZERO,
            flags: MobjFlags::default(),
            health: 100,
            reaction_time: 0,
            last_look: 0,
            player: Some(0),
            spawn_point: None,
        };
        let north = RoomChain::north_wall(0);
        assert_eq!(hit_slide_line(&level, &mobj, north, f(3), f(5)), (f(3), Fixed::ZERO));
        let west = RoomChain::boundary_line(0);
        assert_eq!(hit_slide_line(&level, &mobj, west, f(3), f(5)), (Fixed::ZERO, f(5)));
    }
}
