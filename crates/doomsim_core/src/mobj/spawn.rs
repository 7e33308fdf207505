//! Placing editor things and players when a level starts.

use crate::angle::Angle;
use crate::error::{Result, SimError};
use crate::map::MapThing;
use crate::math::Fixed;
use crate::mobj::info::VIEWHEIGHT;
use crate::player::{PlayerState, NUMCARDS};
use crate::world::{SimContext, Thinker};

use super::info::{MobjFlags, MobjType, ONCEILINGZ, ONFLOORZ};
use super::spawn_mobj;

/// Editor option: deaf monster.
pub const MTF_AMBUSH: i16 = 8;
/// Editor option: multiplayer only.
pub const MTF_MULTIPLAYER: i16 = 16;
/// Editor type of a deathmatch start.
pub const DEATHMATCH_START: i16 = 11;
/// Most deathmatch starts kept.
pub const MAX_DEATHMATCH_STARTS: usize = 10;

fn thing_xy(mthing: &MapThing) -> (Fixed, Fixed) {
    (Fixed::from_int(i32::from(mthing.x)), Fixed::from_int(i32::from(mthing.y)))
}

/// Spawn player `kind - 1` at a start spot, resetting them first if they
/// were waiting to be reborn.
pub fn spawn_player(ctx: &mut SimContext<'_>, mthing: &MapThing) -> Result<()> {
    let Some(p) = usize::try_from(mthing.kind - 1).ok().filter(|&p| p < ctx.players.len()) else {
        return Err(SimError::InvalidState(format!("player start of type {}", mthing.kind)));
    };
    if !ctx.config.players_in_game[p] {
        return Ok(());
    }

    if ctx.players[p].state == PlayerState::Reborn {
        ctx.players[p].reborn();
    }

    let (x, y) = thing_xy(mthing);
    let id = spawn_mobj(ctx, x, y, ONFLOORZ, MobjType::Player);
    let health = ctx.players[p].health;
    if let Some(mobj) = ctx.thinkers.get_mut(id).and_then(Thinker::as_mobj_mut) {
        if p > 0 {
            mobj.flags.insert((p as u32) << MobjFlags::TRANSSHIFT);
        }
        mobj.angle = Angle::from_map_degrees(mthing.angle);
        mobj.player = Some(p);
        mobj.health = health;
    }

    let deathmatch = ctx.config.deathmatch != 0;
    let player = &mut ctx.players[p];
    player.mobj = Some(id);
    player.state = PlayerState::Live;
    player.damage_count = 0;
    player.bonus_count = 0;
    player.view_height = VIEWHEIGHT;
    if deathmatch {
        player.cards = [true; NUMCARDS];
    }

    tracing::debug!(player = p, x = mthing.x, y = mthing.y, "player spawned");
    Ok(())
}

/// Spawn one editor thing, filtered by game mode, skill and options.
///
/// Player starts are recorded and, outside deathmatch, spawned. Types
/// with no table entry are skipped with a warning.
pub fn spawn_map_thing(ctx: &mut SimContext<'_>, mthing: &MapThing) -> Result<()> {
    if mthing.kind == DEATHMATCH_START {
        if ctx.state.deathmatch_starts.len() < MAX_DEATHMATCH_STARTS {
            ctx.state.deathmatch_starts.push(*mthing);
        }
        return Ok(());
    }

    if mthing.kind <= 0 {
        tracing::warn!(kind = mthing.kind, x = mthing.x, y = mthing.y, "skipping thing with bad type");
        return Ok(());
    }

    if mthing.kind <= 4 {
        let p = (mthing.kind - 1) as usize;
        ctx.state.player_starts[p] = Some(*mthing);
        if ctx.config.deathmatch == 0 {
            spawn_player(ctx, mthing)?;
        }
        return Ok(());
    }

    if !ctx.config.netgame && mthing.options & MTF_MULTIPLAYER != 0 {
        return Ok(());
    }
    if mthing.options & ctx.config.skill.thing_bit() == 0 {
        return Ok(());
    }

    let Some(kind) = MobjType::from_doomednum(mthing.kind) else {
        tracing::warn!(kind = mthing.kind, x = mthing.x, y = mthing.y, "unknown thing type");
        return Ok(());
    };
    let flags = kind.info().flags;
    if ctx.config.deathmatch != 0 && flags & MobjFlags::NOTDMATCH != 0 {
        return Ok(());
    }
    if ctx.config.no_monsters && flags & MobjFlags::COUNTKILL != 0 {
        return Ok(());
    }

    let (x, y) = thing_xy(mthing);
    let z = if flags & MobjFlags::SPAWNCEILING != 0 {
        ONCEILINGZ
    } else {
        ONFLOORZ
    };
    let id = spawn_mobj(ctx, x, y, z, kind);

    let Some(Thinker::Mobj(mobj)) = ctx.thinkers.get_mut(id) else {
        return Err(SimError::InvalidState("spawned thing vanished".into()));
    };
    mobj.spawn_point = Some(*mthing);
    if mobj.tics > 0 {
        mobj.tics = 1 + ctx.rng.draw() % mobj.tics;
    }
    if mobj.flags.contains(MobjFlags::COUNTKILL) {
        ctx.state.total_kills += 1;
    }
    if mobj.flags.contains(MobjFlags::COUNTITEM) {
        ctx.state.total_items += 1;
    }
    mobj.angle = Angle::from_map_degrees(mthing.angle);
    if mthing.options & MTF_AMBUSH != 0 {
        mobj.flags.insert(MobjFlags::AMBUSH);
    }
    Ok(())
}

/// Place player `p` on a random free deathmatch start, falling back to
/// their cooperative start after twenty tries.
pub fn deathmatch_spawn_player(ctx: &mut SimContext<'_>, p: usize) -> Result<()> {
    let selections = ctx.state.deathmatch_starts.len();
    if selections < 4 {
        return Err(SimError::InvalidState(format!(
            "only {selections} deathmatch starts, 4 required"
        )));
    }

    for _ in 0..20 {
        let i = ctx.rng.draw() as usize % selections;
        let spot = ctx.state.deathmatch_starts[i];
        let (x, y) = thing_xy(&spot);
        let taken = ctx.players[..p].iter().filter_map(|other| other.mobj).any(|id| {
            ctx.thinkers
                .get(id)
                .and_then(Thinker::as_mobj)
                .is_some_and(|m| m.x == x && m.y == y)
        });
        if !taken {
            ctx.state.deathmatch_starts[i].kind = p as i16 + 1;
            let spot = ctx.state.deathmatch_starts[i];
            return spawn_player(ctx, &spot);
        }
    }

    // no free spot; the player may end up stuck
    let Some(start) = ctx.state.player_starts[p] else {
        return Err(SimError::InvalidState(format!("no start for player {p}")));
    };
    spawn_player(ctx, &start)
}

#[cfg(test)]
mod tests {
    use crate::fixtures::RoomChain;

    use super::*;
    use crate::config::{GameConfig, Skill};
    use crate::world::World;

    fn count(world: &World, kind: MobjType) -> usize {
        world
            .thinkers()
            .iter()
            .filter(|(_, _, t)| t.as_mobj().is_some_and(|m| m.kind == kind))
            .count()
    }

    #[test]
    fn test_player_start_spawns_player() {
        let data = RoomChain::new().room(0, 128).player_start(64, 96, 90).build();
        let world = World::from_data(&data, GameConfig::default()).unwrap();
        let player = &world.players()[0];
        let mobj = world.mobj(player.mobj.unwrap()).unwrap();
        assert_eq!((mobj.x, mobj.y), (Fixed::from_int(64), Fixed::from_int(96)));
        assert_eq!(mobj.angle, Angle::A90);
        assert_eq!(mobj.player, Some(0));
        assert_eq!(mobj.health, 100);
        assert_eq!(player.state, PlayerState::Live);
        assert_eq!(player.view_height, VIEWHEIGHT);
    }

    #[test]
    fn test_skill_bits_filter_things() {
        let mut data = RoomChain::new()
            .room(0, 128)
            .thing(2011, 32, 32, 0)
            .thing(2012, 64, 32, 0)
            .build();
        data.things[0].options = 1;
        data.things[1].options = 4;

        let easy = World::from_data(&data, GameConfig::default().with_skill(Skill::Easy)).unwrap();
        assert_eq!(count(&easy, MobjType::Stimpack), 1);
        assert_eq!(count(&easy, MobjType::Medikit), 0);

        let hard = World::from_data(&data, GameConfig::default().with_skill(Skill::Hard)).unwrap();
        assert_eq!(count(&hard, MobjType::Stimpack), 0);
        assert_eq!(count(&hard, MobjType::Medikit), 1);
    }

    #[test]
    fn test_multiplayer_things_need_a_netgame() {
        let mut data = RoomChain::new().room(0, 128).thing(2011, 32, 32, 0).build();
        data.things[0].options = 7 | MTF_MULTIPLAYER;
        let world = World::from_data(&data, GameConfig::default()).unwrap();
        assert_eq!(count(&world, MobjType::Stimpack), 0);
    }

    #[test]
    fn test_unknown_things_are_skipped() {
        let data = RoomChain::new().room(0, 128).thing(9999, 32, 32, 0).build();
        let world = World::from_data(&data, GameConfig::default()).unwrap();
        assert_eq!(world.thinker_count(), 0);
    }

    #[test]
    fn test_monster_totals_and_ambush() {
        let mut data = RoomChain::new().room(0, 128).thing(3004, 64, 64, 0).build();
        data.things[0].options = 7 | MTF_AMBUSH;
        let world = World::from_data(&data, GameConfig::default()).unwrap();
        assert_eq!(world.level_state().total_kills, 1);
        let (_, _, t) = world.thinkers().iter().next().unwrap();
        let mobj = t.as_mobj().unwrap();
        assert!(mobj.flags.contains(MobjFlags::AMBUSH));
        assert!(mobj.tics >= 1 && mobj.tics <= 10);
        assert_eq!(mobj.spawn_point.unwrap().kind, 3004);
    }

    #[test]
    fn test_no_monsters_skips_monsters() {
        let data = RoomChain::new().room(0, 128).thing(3004, 64, 64, 0).build();
        let config = GameConfig {
            no_monsters: true,
            ..GameConfig::default()
        };
        let world = World::from_data(&data, config).unwrap();
        assert_eq!(count(&world, MobjType::Possessed), 0);
    }

    #[test]
    fn test_deathmatch_needs_four_starts() {
        let data = RoomChain::new()
            .room(0, 128)
            .player_start(64, 64, 0)
            .thing(DEATHMATCH_START, 32, 32, 0)
            .build();
        let config = GameConfig {
            deathmatch: 1,
            netgame: true,
            ..GameConfig::default()
        };
        assert!(matches!(World::from_data(&data, config), Err(SimError::InvalidState(_))));
    }

    #[test]
    fn test_deathmatch_spawns_on_a_start_with_all_keys() {
        let data = RoomChain::new()
            .room(0, 128)
            .player_start(64, 64, 0)
            .thing(DEATHMATCH_START, 32, 32, 0)
            .thing(DEATHMATCH_START, 96, 32, 0)
            .thing(DEATHMATCH_START, 32, 200, 0)
            .thing(DEATHMATCH_START, 96, 200, 0)
            .thing(13, 64, 128, 0)
            .build();
        let config = GameConfig {
            deathmatch: 1,
            netgame: true,
            ..GameConfig::default()
        }
        .with_players([true, true, false, false]);
        let world = World::from_data(&data, config).unwrap();
        let starts: Vec<_> = world.level_state().deathmatch_starts.iter().map(|s| (s.x, s.y)).collect();
        let a = world.mobj(world.players()[0].mobj.unwrap()).unwrap();
        let b = world.mobj(world.players()[1].mobj.unwrap()).unwrap();
        for m in [a, b] {
            assert!(starts.contains(&(m.x.floor() as i16, m.y.floor() as i16)));
        }
        assert_ne!((a.x, a.y), (b.x, b.y));
        assert!(world.players()[1].cards.iter().all(|&c| c));
        // keys are not placed in deathmatch
        assert_eq!(count(&world, MobjType::RedCard), 0);
    }
}
