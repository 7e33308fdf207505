//! Line specials triggered by walking over a line or using it.
//!
//! W1 and S1 specials clear themselves once they fire. WR and SR specials
//! stay, and switch lines arm a button that pops back after a second.

use crate::error::Result;
use crate::events::LevelExit;
use crate::map::LineFlags;
use crate::mobj::info::MobjFlags;
use crate::mobj::Mobj;
use crate::thinker::ThinkerId;
use crate::world::SimContext;

use super::ceiling::{ceiling_crush_stop, do_ceiling, CeilingKind};
use super::door::{do_door, do_locked_door, ev_vertical_door, DoorKind};
use super::floor::{build_stairs, do_donut, do_floor, FloorKind, StairKind};
use super::lights::{light_turn_on, start_light_strobing, turn_tag_lights_off};
use super::plat::{do_plat, stop_plat, PlatKind};
use super::switch::change_switch_texture;

/// Walk-over specials monsters may trigger too.
const MONSTER_CROSS: [u16; 7] = [39, 97, 125, 126, 4, 10, 88];
/// Use specials monsters may trigger too.
const MONSTER_USE: [u16; 4] = [1, 32, 33, 34];

fn teleport_unsupported(line: usize, special: u16) {
    tracing::warn!(line, special, "teleport lines are not simulated");
}

/// `mobj` crossed `line` from `side`.
pub fn cross_special_line(ctx: &mut SimContext<'_>, line: usize, side: usize, id: ThinkerId, mobj: &Mobj) -> Result<()> {
    let special = ctx.level.lines[line].special;
    if mobj.player.is_none() {
        if mobj.flags.contains(MobjFlags::MISSILE) || !MONSTER_CROSS.contains(&special) {
            return Ok(());
        }
    }
    tracing::trace!(line, special, side, thing = id.index(), "line crossed");

    let once = |ctx: &mut SimContext<'_>| ctx.level.lines[line].special = 0;
    match special {
        // W1
        2 => {
            do_door(ctx, line, DoorKind::Open)?;
            once(ctx);
        }
        3 => {
            do_door(ctx, line, DoorKind::Close)?;
            once(ctx);
        }
        4 => {
            do_door(ctx, line, DoorKind::Normal)?;
            once(ctx);
        }
        5 => {
            do_floor(ctx, line, FloorKind::RaiseFloor)?;
            once(ctx);
        }
        6 => {
            do_ceiling(ctx, line, CeilingKind::FastCrushAndRaise)?;
            once(ctx);
        }
        8 => {
            build_stairs(ctx, line, StairKind::Build8)?;
            once(ctx);
        }
        10 => {
            do_plat(ctx, line, PlatKind::DownWaitUpStay, 0)?;
            once(ctx);
        }
        12 => {
            light_turn_on(ctx, line, 0);
            once(ctx);
        }
        13 => {
            light_turn_on(ctx, line, 255);
            once(ctx);
        }
        16 => {
            do_door(ctx, line, DoorKind::Close30ThenOpen)?;
            once(ctx);
        }
        17 => {
            start_light_strobing(ctx, line);
            once(ctx);
        }
        19 => {
            do_floor(ctx, line, FloorKind::LowerFloor)?;
            once(ctx);
        }
        22 => {
            do_plat(ctx, line, PlatKind::RaiseToNearestAndChange, 0)?;
            once(ctx);
        }
        25 => {
            do_ceiling(ctx, line, CeilingKind::CrushAndRaise)?;
            once(ctx);
        }
        30 => {
            do_floor(ctx, line, FloorKind::RaiseToTexture)?;
            once(ctx);
        }
        35 => {
            light_turn_on(ctx, line, 35);
            once(ctx);
        }
        36 => {
            do_floor(ctx, line, FloorKind::TurboLower)?;
            once(ctx);
        }
        37 => {
            do_floor(ctx, line, FloorKind::LowerAndChange)?;
            once(ctx);
        }
        38 => {
            do_floor(ctx, line, FloorKind::LowerFloorToLowest)?;
            once(ctx);
        }
        39 => {
            teleport_unsupported(line, special);
            once(ctx);
        }
        40 => {
            do_ceiling(ctx, line, CeilingKind::RaiseToHighest)?;
            do_floor(ctx, line, FloorKind::LowerFloorToLowest)?;
            once(ctx);
        }
        44 => {
            do_ceiling(ctx, line, CeilingKind::LowerAndCrush)?;
            once(ctx);
        }
        52 => ctx.exit_level(LevelExit::Normal),
        53 => {
            do_plat(ctx, line, PlatKind::PerpetualRaise, 0)?;
            once(ctx);
        }
        54 => {
            stop_plat(ctx, line);
            once(ctx);
        }
        56 => {
            do_floor(ctx, line, FloorKind::RaiseFloorCrush)?;
            once(ctx);
        }
        57 => {
            ceiling_crush_stop(ctx, line);
            once(ctx);
        }
        58 => {
            do_floor(ctx, line, FloorKind::RaiseFloor24)?;
            once(ctx);
        }
        59 => {
            do_floor(ctx, line, FloorKind::RaiseFloor24AndChange)?;
            once(ctx);
        }
        104 => {
            turn_tag_lights_off(ctx, line);
            once(ctx);
        }
        108 => {
            do_door(ctx, line, DoorKind::BlazeRaise)?;
            once(ctx);
        }
        109 => {
            do_door(ctx, line, DoorKind::BlazeOpen)?;
            once(ctx);
        }
        100 => {
            build_stairs(ctx, line, StairKind::Turbo16)?;
            once(ctx);
        }
        110 => {
            do_door(ctx, line, DoorKind::BlazeClose)?;
            once(ctx);
        }
        119 => {
            do_floor(ctx, line, FloorKind::RaiseFloorToNearest)?;
            once(ctx);
        }
        121 => {
            do_plat(ctx, line, PlatKind::BlazeDWUS, 0)?;
            once(ctx);
        }
        124 => ctx.exit_level(LevelExit::Secret),
        125 => {
            if mobj.player.is_none() {
                teleport_unsupported(line, special);
                once(ctx);
            }
        }
        130 => {
            do_floor(ctx, line, FloorKind::RaiseFloorTurbo)?;
            once(ctx);
        }
        141 => {
            do_ceiling(ctx, line, CeilingKind::SilentCrushAndRaise)?;
            once(ctx);
        }

        // WR
        72 => {
            do_ceiling(ctx, line, CeilingKind::LowerAndCrush)?;
        }
        73 => {
            do_ceiling(ctx, line, CeilingKind::CrushAndRaise)?;
        }
        74 => {
            ceiling_crush_stop(ctx, line);
        }
        75 => {
            do_door(ctx, line, DoorKind::Close)?;
        }
        76 => {
            do_door(ctx, line, DoorKind::Close30ThenOpen)?;
        }
        77 => {
            do_ceiling(ctx, line, CeilingKind::FastCrushAndRaise)?;
        }
        79 => light_turn_on(ctx, line, 35),
        80 => light_turn_on(ctx, line, 0),
        81 => light_turn_on(ctx, line, 255),
        82 => {
            do_floor(ctx, line, FloorKind::LowerFloorToLowest)?;
        }
        83 => {
            do_floor(ctx, line, FloorKind::LowerFloor)?;
        }
        84 => {
            do_floor(ctx, line, FloorKind::LowerAndChange)?;
        }
        86 => {
            do_door(ctx, line, DoorKind::Open)?;
        }
        87 => {
            do_plat(ctx, line, PlatKind::PerpetualRaise, 0)?;
        }
        88 => {
            do_plat(ctx, line, PlatKind::DownWaitUpStay, 0)?;
        }
        89 => stop_plat(ctx, line),
        90 => {
            do_door(ctx, line, DoorKind::Normal)?;
        }
        91 => {
            do_floor(ctx, line, FloorKind::RaiseFloor)?;
        }
        92 => {
            do_floor(ctx, line, FloorKind::RaiseFloor24)?;
        }
        93 => {
            do_floor(ctx, line, FloorKind::RaiseFloor24AndChange)?;
        }
        94 => {
            do_floor(ctx, line, FloorKind::RaiseFloorCrush)?;
        }
        95 => {
            do_plat(ctx, line, PlatKind::RaiseToNearestAndChange, 0)?;
        }
        96 => {
            do_floor(ctx, line, FloorKind::RaiseToTexture)?;
        }
        97 => teleport_unsupported(line, special),
        98 => {
            do_floor(ctx, line, FloorKind::TurboLower)?;
        }
        105 => {
            do_door(ctx, line, DoorKind::BlazeRaise)?;
        }
        106 => {
            do_door(ctx, line, DoorKind::BlazeOpen)?;
        }
        107 => {
            do_door(ctx, line, DoorKind::BlazeClose)?;
        }
        120 => {
            do_plat(ctx, line, PlatKind::BlazeDWUS, 0)?;
        }
        126 => {
            if mobj.player.is_none() {
                teleport_unsupported(line, special);
            }
        }
        128 => {
            do_floor(ctx, line, FloorKind::RaiseFloorToNearest)?;
        }
        129 => {
            do_floor(ctx, line, FloorKind::RaiseFloorTurbo)?;
        }
        _ => {}
    }
    Ok(())
}

/// `mobj` used `line` from `side`. Returns whether the line was a use
/// special the thing was allowed to activate.
pub fn use_special_line(ctx: &mut SimContext<'_>, line: usize, side: usize, id: ThinkerId, mobj: &Mobj) -> Result<bool> {
    let ld = &ctx.level.lines[line];
    let special = ld.special;
    if side != 0 && special != 124 {
        return Ok(false);
    }
    if mobj.player.is_none() && (ld.flags.contains(LineFlags::SECRET) || !MONSTER_USE.contains(&special)) {
        return Ok(false);
    }
    tracing::trace!(line, special, thing = id.index(), "line used");

    let switch = |ctx: &mut SimContext<'_>, fired: bool, use_again: bool| -> Result<()> {
        if fired {
            change_switch_texture(ctx, line, use_again)?;
        }
        Ok(())
    };

    match special {
        // manual doors
        1 | 26 | 27 | 28 | 31 | 32 | 33 | 34 | 117 | 118 => ev_vertical_door(ctx, line, mobj)?,

        // S1
        7 => {
            let fired = build_stairs(ctx, line, StairKind::Build8)?;
            switch(ctx, fired, false)?;
        }
        9 => {
            let fired = do_donut(ctx, line)?;
            switch(ctx, fired, false)?;
        }
        11 => {
            change_switch_texture(ctx, line, false)?;
            ctx.exit_level(LevelExit::Normal);
        }
        14 => {
            let fired = do_plat(ctx, line, PlatKind::RaiseAndChange, 32)?;
            switch(ctx, fired, false)?;
        }
        15 => {
            let fired = do_plat(ctx, line, PlatKind::RaiseAndChange, 24)?;
            switch(ctx, fired, false)?;
        }
        18 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloorToNearest)?;
            switch(ctx, fired, false)?;
        }
        20 => {
            let fired = do_plat(ctx, line, PlatKind::RaiseToNearestAndChange, 0)?;
            switch(ctx, fired, false)?;
        }
        21 => {
            let fired = do_plat(ctx, line, PlatKind::DownWaitUpStay, 0)?;
            switch(ctx, fired, false)?;
        }
        23 => {
            let fired = do_floor(ctx, line, FloorKind::LowerFloorToLowest)?;
            switch(ctx, fired, false)?;
        }
        29 => {
            let fired = do_door(ctx, line, DoorKind::Normal)?;
            switch(ctx, fired, false)?;
        }
        41 => {
            let fired = do_ceiling(ctx, line, CeilingKind::LowerToFloor)?;
            switch(ctx, fired, false)?;
        }
        71 => {
            let fired = do_floor(ctx, line, FloorKind::TurboLower)?;
            switch(ctx, fired, false)?;
        }
        49 => {
            let fired = do_ceiling(ctx, line, CeilingKind::CrushAndRaise)?;
            switch(ctx, fired, false)?;
        }
        50 => {
            let fired = do_door(ctx, line, DoorKind::Close)?;
            switch(ctx, fired, false)?;
        }
        51 => {
            change_switch_texture(ctx, line, false)?;
            ctx.exit_level(LevelExit::Secret);
        }
        55 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloorCrush)?;
            switch(ctx, fired, false)?;
        }
        101 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloor)?;
            switch(ctx, fired, false)?;
        }
        102 => {
            let fired = do_floor(ctx, line, FloorKind::LowerFloor)?;
            switch(ctx, fired, false)?;
        }
        103 => {
            let fired = do_door(ctx, line, DoorKind::Open)?;
            switch(ctx, fired, false)?;
        }
        111 => {
            let fired = do_door(ctx, line, DoorKind::BlazeRaise)?;
            switch(ctx, fired, false)?;
        }
        112 => {
            let fired = do_door(ctx, line, DoorKind::BlazeOpen)?;
            switch(ctx, fired, false)?;
        }
        113 => {
            let fired = do_door(ctx, line, DoorKind::BlazeClose)?;
            switch(ctx, fired, false)?;
        }
        122 => {
            let fired = do_plat(ctx, line, PlatKind::BlazeDWUS, 0)?;
            switch(ctx, fired, false)?;
        }
        127 => {
            let fired = build_stairs(ctx, line, StairKind::Turbo16)?;
            switch(ctx, fired, false)?;
        }
        131 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloorTurbo)?;
            switch(ctx, fired, false)?;
        }
        133 | 135 | 137 => {
            let fired = do_locked_door(ctx, line, DoorKind::BlazeOpen, mobj)?;
            switch(ctx, fired, false)?;
        }
        140 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloor512)?;
            switch(ctx, fired, false)?;
        }

        // SR
        42 => {
            let fired = do_door(ctx, line, DoorKind::Close)?;
            switch(ctx, fired, true)?;
        }
        43 => {
            let fired = do_ceiling(ctx, line, CeilingKind::LowerToFloor)?;
            switch(ctx, fired, true)?;
        }
        45 => {
            let fired = do_floor(ctx, line, FloorKind::LowerFloor)?;
            switch(ctx, fired, true)?;
        }
        60 => {
            let fired = do_floor(ctx, line, FloorKind::LowerFloorToLowest)?;
            switch(ctx, fired, true)?;
        }
        61 => {
            let fired = do_door(ctx, line, DoorKind::Open)?;
            switch(ctx, fired, true)?;
        }
        62 => {
            let fired = do_plat(ctx, line, PlatKind::DownWaitUpStay, 1)?;
            switch(ctx, fired, true)?;
        }
        63 => {
            let fired = do_door(ctx, line, DoorKind::Normal)?;
            switch(ctx, fired, true)?;
        }
        64 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloor)?;
            switch(ctx, fired, true)?;
        }
        66 => {
            let fired = do_plat(ctx, line, PlatKind::RaiseAndChange, 24)?;
            switch(ctx, fired, true)?;
        }
        67 => {
            let fired = do_plat(ctx, line, PlatKind::RaiseAndChange, 32)?;
            switch(ctx, fired, true)?;
        }
        65 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloorCrush)?;
            switch(ctx, fired, true)?;
        }
        68 => {
            let fired = do_plat(ctx, line, PlatKind::RaiseToNearestAndChange, 0)?;
            switch(ctx, fired, true)?;
        }
        69 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloorToNearest)?;
            switch(ctx, fired, true)?;
        }
        70 => {
            let fired = do_floor(ctx, line, FloorKind::TurboLower)?;
            switch(ctx, fired, true)?;
        }
        114 => {
            let fired = do_door(ctx, line, DoorKind::BlazeRaise)?;
            switch(ctx, fired, true)?;
        }
        115 => {
            let fired = do_door(ctx, line, DoorKind::BlazeOpen)?;
            switch(ctx, fired, true)?;
        }
        116 => {
            let fired = do_door(ctx, line, DoorKind::BlazeClose)?;
            switch(ctx, fired, true)?;
        }
        123 => {
            let fired = do_plat(ctx, line, PlatKind::BlazeDWUS, 0)?;
            switch(ctx, fired, true)?;
        }
        132 => {
            let fired = do_floor(ctx, line, FloorKind::RaiseFloorTurbo)?;
            switch(ctx, fired, true)?;
        }
        99 | 134 | 136 => {
            let fired = do_locked_door(ctx, line, DoorKind::BlazeOpen, mobj)?;
            switch(ctx, fired, true)?;
        }
        138 => {
            light_turn_on(ctx, line, 255);
            change_switch_texture(ctx, line, true)?;
        }
        139 => {
            light_turn_on(ctx, line, 35);
            change_switch_texture(ctx, line, true)?;
        }
        _ => {}
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::events::Sfx;
    use crate::fixtures::RoomChain;
    use crate::math::Fixed;
    use crate::world::World;

    fn player(world: &World) -> (ThinkerId, Mobj) {
        let id = world.players()[0].mobj.unwrap();
        (id, world.mobj(id).unwrap().clone())
    }

    fn chain_with_wall(special: u16) -> World {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(special, 6)
            .player_start(64, 128, 90)
            .room(64, 128)
            .tag(6)
            .build();
        World::from_data(&data, GameConfig::default()).unwrap()
    }

    #[test]
    fn test_walk_over_once_clears_special() {
        let mut world = chain_with_wall(19);
        let (id, mobj) = player(&world);
        let line = RoomChain::north_wall(0);
        world.with_context(|ctx| cross_special_line(ctx, line, 0, id, &mobj)).unwrap();
        assert_eq!(world.level().lines[line].special, 0);
        assert!(world.level().sectors[1].is_busy());
    }

    #[test]
    fn test_repeatable_keeps_special() {
        let mut world = chain_with_wall(83);
        let (id, mobj) = player(&world);
        let line = RoomChain::north_wall(0);
        world.with_context(|ctx| cross_special_line(ctx, line, 0, id, &mobj)).unwrap();
        assert_eq!(world.level().lines[line].special, 83);
        assert!(world.level().sectors[1].is_busy());
    }

    #[test]
    fn test_monsters_only_cross_some_lines() {
        let data = RoomChain::new()
            .room(0, 128)
            .wall_special(19, 6)
            .thing(3004, 64, 128, 0)
            .room(64, 128)
            .tag(6)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let (id, mobj) = world
            .thinkers()
            .iter()
            .find_map(|(id, _, t)| t.as_mobj().map(|m| (id, m.clone())))
            .unwrap();
        let line = RoomChain::north_wall(0);
        world.with_context(|ctx| cross_special_line(ctx, line, 0, id, &mobj)).unwrap();
        assert_eq!(world.level().lines[line].special, 19);
        assert!(!world.level().sectors[1].is_busy());
    }

    #[test]
    fn test_exit_switch_ends_level() {
        let mut world = chain_with_wall(11);
        let (id, mobj) = player(&world);
        let line = RoomChain::north_wall(0);
        let events = world
            .with_context(|ctx| {
                use_special_line(ctx, line, 0, id, &mobj)?;
                Ok(ctx.events.clone())
            })
            .unwrap();
        assert_eq!(world.level_state().exit, Some(LevelExit::Normal));
        assert_eq!(world.level().lines[line].special, 0);
        // the special is cleared before the sound is picked
        assert_eq!(events.count(Sfx::Swtchx), 0);
    }

    #[test]
    fn test_switch_lowers_floor() {
        let mut world = chain_with_wall(23);
        let (id, mobj) = player(&world);
        let line = RoomChain::north_wall(0);
        assert!(world.with_context(|ctx| use_special_line(ctx, line, 0, id, &mobj)).unwrap());
        for _ in 0..70 {
            world.tick(&[]).unwrap();
        }
        assert_eq!(world.level().sectors[1].floor_height, Fixed::ZERO);
    }

    #[test]
    fn test_back_side_use_does_nothing() {
        let mut world = chain_with_wall(23);
        let (id, mobj) = player(&world);
        let line = RoomChain::north_wall(0);
        assert!(!world.with_context(|ctx| use_special_line(ctx, line, 1, id, &mobj)).unwrap());
        assert!(!world.level().sectors[1].is_busy());
    }
}
