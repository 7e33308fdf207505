//! Damage, death and pickups.
//!
//! Only sourceless damage exists here: crushers and harmful floors. There
//! are no attackers to credit and nothing to retaliate against.

use crate::config::Skill;
use crate::events::{Sfx, SoundOrigin};
use crate::math::Fixed;
use crate::player::{AmmoType, Card, PlayerState, Weapon, BONUSADD};
use crate::thinker::ThinkerId;
use crate::world::{SimContext, Thinker};

use super::info::{MobjFlags, MobjType, ONFLOORZ};
use super::{remove_mobj, set_mobj_state, spawn_mobj, Mobj};

/// Take `damage` hit points from `target`, with armor absorbing part of
/// it for players. Kills at zero health; otherwise may flinch.
pub fn damage_mobj(ctx: &mut SimContext<'_>, id: ThinkerId, target: &mut Mobj, damage: i32) {
    if !target.flags.contains(MobjFlags::SHOOTABLE) || target.health <= 0 {
        return;
    }

    if target.flags.contains(MobjFlags::SKULLFLY) {
        target.mom_x = Fixed::ZERO;
        target.mom_y = Fixed::ZERO;
        target.mom_z = Fixed::ZERO;
    }

    let mut damage = damage;
    if let Some(p) = target.player {
        if ctx.config.skill == Skill::Baby {
            damage >>= 1;
        }

        // the last level's exit floor never kills
        let sector = target.sector(ctx.level);
        if ctx.level.sectors[sector].special == 11 && damage >= target.health {
            damage = target.health - 1;
        }

        let player = &mut ctx.players[p];
        if player.armor_type != 0 {
            let mut saved = if player.armor_type == 1 { damage / 3 } else { damage / 2 };
            if player.armor_points <= saved {
                saved = player.armor_points;
                player.armor_type = 0;
            }
            player.armor_points -= saved;
            damage -= saved;
        }
        player.health = (player.health - damage).max(0);
        player.damage_count = (player.damage_count + damage).min(100);
    }

    target.health -= damage;
    if target.health <= 0 {
        kill_mobj(ctx, id, target);
        return;
    }

    let info = target.kind.info();
    if ctx.rng.draw() < info.pain_chance && !target.flags.contains(MobjFlags::SKULLFLY) {
        target.flags.insert(MobjFlags::JUSTHIT);
        set_mobj_state(ctx, id, target, info.pain_state);
    }
    target.reaction_time = 0;
}

/// Turn `target` into a corpse and drop what it carried.
pub fn kill_mobj(ctx: &mut SimContext<'_>, id: ThinkerId, target: &mut Mobj) {
    target
        .flags
        .remove(MobjFlags::SHOOTABLE | MobjFlags::FLOAT | MobjFlags::SKULLFLY | MobjFlags::NOGRAVITY);
    target.flags.insert(MobjFlags::CORPSE | MobjFlags::DROPOFF);
    target.height = target.height >> 2;

    if target.flags.contains(MobjFlags::COUNTKILL) && !ctx.config.netgame {
        ctx.players[0].kill_count += 1;
    }

    if let Some(p) = target.player {
        let player = &mut ctx.players[p];
        player.frags[p] += 1;
        player.state = PlayerState::Dead;
        target.flags.remove(MobjFlags::SOLID);
        tracing::debug!(player = p, "player died");
    }

    let death_state = target.kind.info().death_state;
    set_mobj_state(ctx, id, target, death_state);
    target.tics -= ctx.rng.draw() & 3;
    if target.tics < 1 {
        target.tics = 1;
    }

    let drop = match target.kind {
        MobjType::Possessed => MobjType::Clip,
        MobjType::ShotgunGuy => MobjType::Shotgun,
        _ => return,
    };
    let dropped = spawn_mobj(ctx, target.x, target.y, ONFLOORZ, drop);
    if let Some(item) = ctx.thinkers.get_mut(dropped).and_then(Thinker::as_mobj_mut) {
        item.flags.insert(MobjFlags::DROPPED);
    }
}

/// Give player `p` a weapon and the ammo that comes with it.
///
/// In cooperative network games a placed weapon stays for the others and
/// the pickup itself reports `false`.
pub fn give_weapon(ctx: &mut SimContext<'_>, p: usize, weapon: Weapon, dropped: bool) -> bool {
    let skill = ctx.config.skill;
    let player = &mut ctx.players[p];

    if ctx.config.netgame && ctx.config.deathmatch != 2 && !dropped {
        if player.weapons[weapon as usize] {
            return false;
        }
        player.bonus_count += BONUSADD;
        player.weapons[weapon as usize] = true;
        if let Some(ammo) = weapon.ammo() {
            let clips = if ctx.config.deathmatch != 0 { 5 } else { 2 };
            player.give_ammo(ammo, clips, skill);
        }
        player.pending_weapon = Some(weapon);
        ctx.events.start_sound(SoundOrigin::Global, Sfx::Wpnup);
        return false;
    }

    let gave_ammo = weapon
        .ammo()
        .is_some_and(|ammo| player.give_ammo(ammo, if dropped { 1 } else { 2 }, skill));

    let gave_weapon = !player.weapons[weapon as usize];
    if gave_weapon {
        player.weapons[weapon as usize] = true;
        player.pending_weapon = Some(weapon);
    }
    gave_weapon || gave_ammo
}

/// `toucher` walked over the pickup `special`.
pub fn touch_special_thing(
    ctx: &mut SimContext<'_>,
    special_id: ThinkerId,
    special: &mut Mobj,
    _toucher_id: ThinkerId,
    toucher: &mut Mobj,
) {
    let delta = special.z - toucher.z;
    if delta > toucher.height || delta < Fixed::from_int(-8) {
        // out of reach
        return;
    }
    if toucher.health <= 0 {
        return;
    }
    let Some(p) = toucher.player else {
        return;
    };

    let mut sound = Sfx::Itemup;
    let card = match special.kind {
        MobjType::BlueCard => Some(Card::BlueCard),
        MobjType::YellowCard => Some(Card::YellowCard),
        MobjType::RedCard => Some(Card::RedCard),
        MobjType::BlueSkull => Some(Card::BlueSkull),
        MobjType::YellowSkull => Some(Card::YellowSkull),
        MobjType::RedSkull => Some(Card::RedSkull),
        _ => None,
    };

    if let Some(card) = card {
        ctx.players[p].give_card(card);
        if ctx.config.netgame {
            // keys stay for the other players
            return;
        }
    } else {
        match special.kind {
            MobjType::Stimpack | MobjType::Medikit => {
                let amount = if special.kind == MobjType::Stimpack { 10 } else { 25 };
                if !ctx.players[p].give_body(amount) {
                    return;
                }
                toucher.health = ctx.players[p].health;
            }
            MobjType::Clip => {
                let clips = i32::from(!special.flags.contains(MobjFlags::DROPPED));
                let skill = ctx.config.skill;
                if !ctx.players[p].give_ammo(AmmoType::Clip, clips, skill) {
                    return;
                }
            }
            MobjType::Shotgun => {
                let dropped = special.flags.contains(MobjFlags::DROPPED);
                if !give_weapon(ctx, p, Weapon::Shotgun, dropped) {
                    return;
                }
                sound = Sfx::Wpnup;
            }
            other => {
                tracing::warn!(kind = ?other, "touched an unknown pickup");
                return;
            }
        }
    }

    if special.flags.contains(MobjFlags::COUNTITEM) {
        ctx.players[p].item_count += 1;
    }
    remove_mobj(ctx, special_id, special);
    ctx.players[p].bonus_count += BONUSADD;
    ctx.events.start_sound(SoundOrigin::Global, sound);
}

#[cfg(test)]
mod tests {
    use crate::fixtures::RoomChain;

    use super::*;
    use crate::config::GameConfig;
    use crate::input::TicCmd;
    use crate::mobj::info::StateNum;
    use crate::mobj::with_mobj;
    use crate::world::World;

    fn f(n: i32) -> Fixed {
        Fixed::from_int(n)
    }

    fn world_with(kind: i16, x: i16) -> World {
        let data = RoomChain::new()
            .room(0, 128)
            .player_start(32, 128, 0)
            .thing(kind, x, 128, 0)
            .build();
        World::from_data(&data, GameConfig::default()).unwrap()
    }

    fn hurt(world: &mut World, id: ThinkerId, damage: i32) {
        world
            .with_context(|ctx| {
                with_mobj(ctx, id, |ctx, mobj| {
                    damage_mobj(ctx, id, mobj, damage);
                    Ok(())
                })
            })
            .unwrap();
    }

    #[test]
    fn test_armor_absorbs_a_third() {
        let mut world = world_with(2028, 100);
        let id = world.players()[0].mobj.unwrap();
        world.players_mut()[0].armor_type = 1;
        world.players_mut()[0].armor_points = 100;
        hurt(&mut world, id, 30);
        let player = &world.players()[0];
        assert_eq!(player.armor_points, 90);
        assert_eq!(player.health, 80);
        assert_eq!(player.damage_count, 20);
        assert_eq!(world.mobj(id).unwrap().health, 80);
    }

    #[test]
    fn test_killing_a_trooper_drops_a_clip() {
        let mut world = world_with(3004, 100);
        let trooper = world
            .thinkers()
            .iter()
            .find_map(|(id, _, t)| t.as_mobj().filter(|m| m.kind == MobjType::Possessed).map(|_| id))
            .unwrap();
        let before = world.thinker_count();
        hurt(&mut world, trooper, 100);
        let corpse = world.mobj(trooper).unwrap();
        assert!(corpse.flags.contains(MobjFlags::CORPSE));
        assert!(!corpse.flags.contains(MobjFlags::SHOOTABLE));
        assert_eq!(corpse.height, f(14));
        assert_eq!(corpse.state, StateNum::PossDie1);
        assert_eq!(world.players()[0].kill_count, 1);
        assert_eq!(world.thinker_count(), before + 1);
        let clip = world
            .thinkers()
            .iter()
            .find_map(|(_, _, t)| t.as_mobj().filter(|m| m.kind == MobjType::Clip))
            .unwrap();
        assert!(clip.flags.contains(MobjFlags::DROPPED));
    }

    #[test]
    fn test_walking_over_a_stimpack_heals() {
        let mut world = world_with(2011, 40);
        let id = world.players()[0].mobj.unwrap();
        world.players_mut()[0].health = 50;
        world
            .with_context(|ctx| {
                if let Some(m) = ctx.thinkers.get_mut(id).and_then(Thinker::as_mobj_mut) {
                    m.health = 50;
                }
                Ok(())
            })
            .unwrap();
        let events = world.tick(&[TicCmd::forward(25)]).unwrap();
        assert_eq!(world.players()[0].health, 60);
        assert_eq!(world.mobj(id).unwrap().health, 60);
        assert_eq!(world.players()[0].bonus_count, BONUSADD);
        assert_eq!(events.count(Sfx::Itemup), 1);
        let stims = world
            .thinkers()
            .iter()
            .filter(|(_, _, t)| t.as_mobj().is_some_and(|m| m.kind == MobjType::Stimpack))
            .count();
        assert_eq!(stims, 0);
    }

    #[test]
    fn test_full_health_leaves_stimpack() {
        let mut world = world_with(2011, 40);
        world.tick(&[TicCmd::forward(25)]).unwrap();
        assert_eq!(world.players()[0].bonus_count, 0);
        let stims = world
            .thinkers()
            .iter()
            .filter(|(_, _, t)| t.as_mobj().is_some_and(|m| m.kind == MobjType::Stimpack))
            .count();
        assert_eq!(stims, 1);
    }

    #[test]
    fn test_keys_are_collected() {
        let mut world = world_with(13, 40);
        world.tick(&[TicCmd::forward(25)]).unwrap();
        assert!(world.players()[0].has_card(Card::RedCard));
    }

    #[test]
    fn test_shotgun_pickup_gives_weapon_and_shells() {
        let mut world = world_with(2001, 40);
        let events = world.tick(&[TicCmd::forward(25)]).unwrap();
        let player = &world.players()[0];
        assert!(player.weapons[Weapon::Shotgun as usize]);
        assert_eq!(player.ammo[AmmoType::Shell as usize], 8);
        assert_eq!(player.pending_weapon, Some(Weapon::Shotgun));
        assert_eq!(events.count(Sfx::Wpnup), 1);
    }

    #[test]
    fn test_baby_halves_player_damage() {
        let data = RoomChain::new().room(0, 128).player_start(32, 128, 0).build();
        let mut world = World::from_data(&data, GameConfig::default().with_skill(Skill::Baby)).unwrap();
        let id = world.players()[0].mobj.unwrap();
        hurt(&mut world, id, 20);
        assert_eq!(world.players()[0].health, 90);
    }
}
