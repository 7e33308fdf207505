//! Player state and the per-tic player think: turning and thrust, view
//! height and bob, the use key, and damaging floors.

use serde::{Deserialize, Serialize};

use crate::angle::{Angle, ANG90};
use crate::collision::line_opening;
use crate::config::{GameConfig, Skill, MAXPLAYERS};
use crate::error::{Result, SimError};
use crate::events::{LevelExit, Sfx, SoundOrigin};
use crate::geometry::{point_on_line_side, thrust_vector};
use crate::input::{TicCmd, BT_CHANGE, BT_SPECIAL, BT_USE};
use crate::math::{Fixed, FRACUNIT};
use crate::mobj::info::{MobjFlags, StateNum, VIEWHEIGHT};
use crate::mobj::{interact, set_mobj_state, with_mobj, Mobj};
use crate::specials::lines::use_special_line;
use crate::thinker::ThinkerId;
use crate::traverse::{path_intercepts, traverse_intercepts};
use crate::trig::{fine_cosine, fine_sine, FINEANGLES, FINEMASK};
use crate::world::SimContext;

/// Health cap for pickups.
pub const MAXHEALTH: i32 = 100;
/// Palette flash added per pickup.
pub const BONUSADD: i32 = 6;
/// Bob amplitude cap.
pub const MAXBOB: Fixed = Fixed::from_bits(0x10_0000);
/// How far ahead the use key reaches, in whole units.
pub const USERANGE: i32 = 64;

/// Per-player life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// Playing.
    Live,
    /// Dead on the ground.
    Dead,
    /// Waiting to be respawned.
    #[default]
    Reborn,
}

/// Keys.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Card {
    BlueCard,
    YellowCard,
    RedCard,
    BlueSkull,
    YellowSkull,
    RedSkull,
}

/// Number of key kinds.
pub const NUMCARDS: usize = 6;

/// Ammo pools.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmmoType {
    Clip,
    Shell,
}

/// Number of ammo pools.
pub const NUMAMMO: usize = 2;
/// Rounds in one clip of each ammo type.
pub const CLIP_AMMO: [i32; NUMAMMO] = [10, 4];
/// Carrying capacity without a backpack.
pub const MAX_AMMO: [i32; NUMAMMO] = [200, 50];

/// Weapons.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Weapon {
    Fist,
    #[default]
    Pistol,
    Shotgun,
}

/// Number of weapons.
pub const NUMWEAPONS: usize = 3;

impl Weapon {
    /// Ammo this weapon uses.
    #[must_use]
    pub const fn ammo(self) -> Option<AmmoType> {
        match self {
            Self::Fist => None,
            Self::Pistol => Some(AmmoType::Clip),
            Self::Shotgun => Some(AmmoType::Shell),
        }
    }

    /// Weapon selected by a weapon-change slot.
    #[must_use]
    pub const fn from_slot(slot: u8) -> Option<Self> {
        match slot {
            0 => Some(Self::Fist),
            1 => Some(Self::Pistol),
            2 => Some(Self::Shotgun),
            _ => None,
        }
    }
}

/// One player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Player {
    /// Body in the world.
    pub mobj: Option<ThinkerId>,
    /// Life cycle.
    pub state: PlayerState,
    /// Command for the current tic.
    pub cmd: TicCmd,
    /// Eye height in the world.
    pub view_z: Fixed,
    /// Eye height above the feet.
    pub view_height: Fixed,
    /// Eye height change per tic while recovering from a landing.
    pub delta_view_height: Fixed,
    /// Bob amplitude from momentum.
    pub bob: Fixed,
    /// Whether the feet touched the floor this tic.
    pub on_ground: bool,
    /// Health, mirrored on the body.
    pub health: i32,
    /// Armor points.
    pub armor_points: i32,
    /// 0 none, 1 green, 2 blue.
    pub armor_type: i32,
    /// Keys held.
    pub cards: [bool; NUMCARDS],
    /// Weapons held.
    pub weapons: [bool; NUMWEAPONS],
    /// Weapon in hand.
    pub ready_weapon: Weapon,
    /// Weapon to switch to.
    pub pending_weapon: Option<Weapon>,
    /// Ammo carried.
    pub ammo: [i32; NUMAMMO],
    /// Ammo capacity.
    pub max_ammo: [i32; NUMAMMO],
    /// Use was held last tic.
    pub use_down: bool,
    /// Fire was held last tic.
    pub attack_down: bool,
    /// Monsters killed.
    pub kill_count: i32,
    /// Items collected.
    pub item_count: i32,
    /// Secrets found.
    pub secret_count: i32,
    /// Kills per player; self kills count.
    pub frags: [i32; MAXPLAYERS],
    /// Red flash.
    pub damage_count: i32,
    /// Gold flash.
    pub bonus_count: i32,
}

impl Player {
    /// A player waiting for the first spawn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a fresh life, keeping the level tallies.
    pub fn reborn(&mut self) {
        let frags = self.frags;
        let (kills, items, secrets) = (self.kill_count, self.item_count, self.secret_count);

        *self = Self {
            frags,
            kill_count: kills,
            item_count: items,
            secret_count: secrets,
            use_down: true,
            attack_down: true,
            state: PlayerState::Live,
            health: MAXHEALTH,
            ready_weapon: Weapon::Pistol,
            pending_weapon: Some(Weapon::Pistol),
            max_ammo: MAX_AMMO,
            ..Self::default()
        };
        self.weapons[Weapon::Fist as usize] = true;
        self.weapons[Weapon::Pistol as usize] = true;
        self.ammo[AmmoType::Clip as usize] = 50;
    }

    /// Whether the key is held.
    #[must_use]
    pub const fn has_card(&self, card: Card) -> bool {
        self.cards[card as usize]
    }

    /// Take a key. A new key flashes the screen.
    pub fn give_card(&mut self, card: Card) {
        if self.cards[card as usize] {
            return;
        }
        self.bonus_count = BONUSADD;
        self.cards[card as usize] = true;
    }

    /// Heal up to [`MAXHEALTH`]. Returns `false` if already there.
    pub fn give_body(&mut self, amount: i32) -> bool {
        if self.health >= MAXHEALTH {
            return false;
        }
        self.health = (self.health + amount).min(MAXHEALTH);
        true
    }

    /// Add `clips` clips of ammo, or half a clip for zero.
    ///
    /// Returns `false` if the pool was already full. Picking up ammo for
    /// an empty pool may queue a better weapon.
    pub fn give_ammo(&mut self, ammo: AmmoType, clips: i32, skill: Skill) -> bool {
        let i = ammo as usize;
        if self.ammo[i] == self.max_ammo[i] {
            return false;
        }

        let mut num = if clips != 0 {
            clips * CLIP_AMMO[i]
        } else {
            CLIP_AMMO[i] / 2
        };
        if skill.doubles_ammo() {
            num <<= 1;
        }

        let old = self.ammo[i];
        self.ammo[i] = (self.ammo[i] + num).min(self.max_ammo[i]);
        if old != 0 {
            return true;
        }

        match ammo {
            AmmoType::Clip => {
                if self.ready_weapon == Weapon::Fist {
                    self.pending_weapon = Some(Weapon::Pistol);
                }
            }
            AmmoType::Shell => {
                if matches!(self.ready_weapon, Weapon::Fist | Weapon::Pistol) && self.weapons[Weapon::Shotgun as usize] {
                    self.pending_weapon = Some(Weapon::Shotgun);
                }
            }
        }
        true
    }
}

/// Add `len` of momentum along `angle`.
fn thrust(mobj: &mut Mobj, angle: Angle, len: Fixed) {
    let (dx, dy) = thrust_vector(angle, len);
    mobj.mom_x += dx;
    mobj.mom_y += dy;
}

/// Turn and accelerate from the tic command.
pub fn move_player(ctx: &mut SimContext<'_>, p: usize, id: ThinkerId, mobj: &mut Mobj) {
    let cmd = ctx.players[p].cmd;

    mobj.angle += Angle::from_bits((i32::from(cmd.angle_turn) << 16) as u32);

    // no control in the air
    let on_ground = mobj.z <= mobj.floor_z;
    ctx.players[p].on_ground = on_ground;

    if cmd.forward_move != 0 && on_ground {
        thrust(mobj, mobj.angle, Fixed::from_bits(i32::from(cmd.forward_move) * 2048));
    }
    if cmd.side_move != 0 && on_ground {
        let angle = mobj.angle - Angle::from_bits(ANG90);
        thrust(mobj, angle, Fixed::from_bits(i32::from(cmd.side_move) * 2048));
    }

    if (cmd.forward_move != 0 || cmd.side_move != 0) && mobj.state == StateNum::Play {
        set_mobj_state(ctx, id, mobj, StateNum::PlayRun1);
    }
}

/// Compute the bob and eye height.
pub fn calc_height(ctx: &mut SimContext<'_>, p: usize, mobj: &Mobj) {
    let level_time = ctx.state.level_time;
    let player = &mut ctx.players[p];
    player.on_ground = mobj.z <= mobj.floor_z;

    player.bob = (mobj.mom_x.mul(mobj.mom_x) + mobj.mom_y.mul(mobj.mom_y)) >> 2;
    if player.bob > MAXBOB {
        player.bob = MAXBOB;
    }

    if !player.on_ground {
        player.view_z = mobj.z + player.view_height;
        return;
    }

    let angle = ((FINEANGLES / 20) as u32).wrapping_mul(level_time) as usize & FINEMASK;
    let bob = Fixed::from_bits(player.bob.to_bits() / 2).mul(fine_sine(angle));

    if player.state == PlayerState::Live {
        player.view_height += player.delta_view_height;
        if player.view_height > VIEWHEIGHT {
            player.view_height = VIEWHEIGHT;
            player.delta_view_height = Fixed::ZERO;
        }
        let half = Fixed::from_bits(VIEWHEIGHT.to_bits() / 2);
        if player.view_height < half {
            player.view_height = half;
            if player.delta_view_height <= Fixed::ZERO {
                player.delta_view_height = Fixed::from_bits(1);
            }
        }
        if player.delta_view_height != Fixed::ZERO {
            player.delta_view_height += Fixed::from_bits(FRACUNIT / 4);
            if player.delta_view_height == Fixed::ZERO {
                player.delta_view_height = Fixed::from_bits(1);
            }
        }
    }

    player.view_z = mobj.z + player.view_height + bob;
    let limit = mobj.ceiling_z - Fixed::from_int(4);
    if player.view_z > limit {
        player.view_z = limit;
    }
}

/// Sink the view while dead; use asks for a respawn.
pub fn death_think(ctx: &mut SimContext<'_>, p: usize, mobj: &Mobj) {
    let floor = Fixed::from_int(6);
    let player = &mut ctx.players[p];
    if player.view_height > floor {
        player.view_height -= Fixed::ONE;
    }
    if player.view_height < floor {
        player.view_height = floor;
    }
    player.delta_view_height = Fixed::ZERO;

    calc_height(ctx, p, mobj);

    let player = &mut ctx.players[p];
    if player.damage_count > 0 {
        player.damage_count -= 1;
    }
    if player.cmd.buttons & BT_USE != 0 {
        player.state = PlayerState::Reborn;
    }
}

/// Press use: trigger the first special line within reach, or grunt at
/// a wall.
pub fn use_lines(ctx: &mut SimContext<'_>, p: usize, id: ThinkerId, mobj: &mut Mobj) -> Result<()> {
    let fine = mobj.angle.fine();
    let (x1, y1) = (mobj.x, mobj.y);
    let x2 = x1 + Fixed::from_bits(USERANGE.wrapping_mul(fine_cosine(fine).to_bits()));
    let y2 = y1 + Fixed::from_bits(USERANGE.wrapping_mul(fine_sine(fine).to_bits()));

    let mut intercepts = path_intercepts(ctx.level, ctx.blockmap, x1, y1, x2, y2)?;
    traverse_intercepts(&mut intercepts, Fixed::ONE, |intercept| {
        let line = intercept.line;
        if ctx.level.lines[line].special == 0 {
            if line_opening(ctx.level, line).is_closed() {
                ctx.events.start_sound(SoundOrigin::Mobj(id), Sfx::Noway);
                return Ok(false);
            }
            return Ok(true);
        }
        let side = point_on_line_side(mobj.x, mobj.y, &ctx.level.lines[line].div_line());
        use_special_line(ctx, line, side, id, mobj)?;
        Ok(false)
    })?;
    tracing::trace!(player = p, "use pressed");
    Ok(())
}

/// Effects of standing on a special floor.
pub fn player_in_special_sector(ctx: &mut SimContext<'_>, p: usize, id: ThinkerId, mobj: &mut Mobj) -> Result<()> {
    let sector = mobj.sector(ctx.level);
    if mobj.z != ctx.level.sectors[sector].floor_height {
        return Ok(());
    }

    let special = ctx.level.sectors[sector].special;
    let pulse = ctx.state.level_time & 0x1f == 0;
    match special {
        5 => {
            if pulse {
                interact::damage_mobj(ctx, id, mobj, 10);
            }
        }
        7 => {
            if pulse {
                interact::damage_mobj(ctx, id, mobj, 5);
            }
        }
        4 | 16 => {
            if pulse {
                interact::damage_mobj(ctx, id, mobj, 20);
            }
        }
        9 => {
            ctx.players[p].secret_count += 1;
            ctx.level.sectors[sector].special = 0;
            tracing::debug!(player = p, sector, "secret found");
        }
        11 => {
            if pulse {
                interact::damage_mobj(ctx, id, mobj, 20);
            }
            if ctx.players[p].health <= 10 {
                ctx.exit_level(LevelExit::Normal);
            }
        }
        _ => return Err(SimError::UnknownSectorSpecial { sector, special }),
    }
    Ok(())
}

fn think(ctx: &mut SimContext<'_>, p: usize, id: ThinkerId, mobj: &mut Mobj) -> Result<()> {
    if mobj.flags.contains(MobjFlags::JUSTATTACKED) {
        let cmd = &mut ctx.players[p].cmd;
        cmd.angle_turn = 0;
        cmd.forward_move = (0xc800 / 512) as i8;
        cmd.side_move = 0;
        mobj.flags.remove(MobjFlags::JUSTATTACKED);
    }

    if ctx.players[p].state == PlayerState::Dead {
        death_think(ctx, p, mobj);
        return Ok(());
    }

    if mobj.reaction_time > 0 {
        mobj.reaction_time -= 1;
    } else {
        move_player(ctx, p, id, mobj);
    }

    calc_height(ctx, p, mobj);

    if ctx.level.sectors[mobj.sector(ctx.level)].special != 0 {
        player_in_special_sector(ctx, p, id, mobj)?;
    }

    if ctx.players[p].cmd.buttons & BT_SPECIAL != 0 {
        ctx.players[p].cmd.buttons = 0;
    }

    let buttons = ctx.players[p].cmd.buttons;
    if buttons & BT_CHANGE != 0 {
        let player = &mut ctx.players[p];
        if let Some(weapon) = Weapon::from_slot((buttons >> 3) & 7) {
            if player.weapons[weapon as usize] && weapon != player.ready_weapon {
                player.pending_weapon = Some(weapon);
            }
        }
    }

    if buttons & BT_USE != 0 {
        if !ctx.players[p].use_down {
            use_lines(ctx, p, id, mobj)?;
            ctx.players[p].use_down = true;
        }
    } else {
        ctx.players[p].use_down = false;
    }

    let player = &mut ctx.players[p];
    if player.damage_count > 0 {
        player.damage_count -= 1;
    }
    if player.bonus_count > 0 {
        player.bonus_count -= 1;
    }
    Ok(())
}

/// Run one player for one tic.
pub fn player_think(ctx: &mut SimContext<'_>, p: usize) -> Result<()> {
    let Some(id) = ctx.players[p].mobj else {
        return Ok(());
    };
    with_mobj(ctx, id, |ctx, mobj| think(ctx, p, id, mobj))?;
    Ok(())
}

/// Whether a slot is in the game with a body.
#[must_use]
pub fn is_active(config: &GameConfig, players: &[Player], p: usize) -> bool {
    config.players_in_game[p] && players[p].mobj.is_some()
}

#[cfg(test)]
mod tests {
    use crate::fixtures::RoomChain;

    use super::*;
    use crate::world::World;

    fn f(n: i32) -> Fixed {
        Fixed::from_int(n)
    }

    fn one_room(floor_special: i16) -> World {
        let data = RoomChain::new()
            .room(0, 128)
            .special(floor_special)
            .player_start(64, 128, 0)
            .build();
        World::from_data(&data, GameConfig::default()).unwrap()
    }

    #[test]
    fn test_reborn_keeps_tallies() {
        let mut player = Player::new();
        player.kill_count = 3;
        player.frags[1] = 2;
        player.health = 7;
        player.cards[0] = true;
        player.reborn();
        assert_eq!(player.kill_count, 3);
        assert_eq!(player.frags[1], 2);
        assert_eq!(player.health, MAXHEALTH);
        assert!(!player.cards[0]);
        assert_eq!(player.ammo, [50, 0]);
        assert!(player.weapons[Weapon::Pistol as usize]);
        assert!(!player.weapons[Weapon::Shotgun as usize]);
        assert!(player.use_down);
        assert_eq!(player.state, PlayerState::Live);
    }

    #[test]
    fn test_give_ammo_caps_and_doubles() {
        let mut player = Player::new();
        player.reborn();
        assert!(player.give_ammo(AmmoType::Clip, 1, Skill::Medium));
        assert_eq!(player.ammo[0], 60);
        assert!(player.give_ammo(AmmoType::Clip, 0, Skill::Baby));
        assert_eq!(player.ammo[0], 70);
        player.ammo[0] = 195;
        assert!(player.give_ammo(AmmoType::Clip, 1, Skill::Medium));
        assert_eq!(player.ammo[0], 200);
        assert!(!player.give_ammo(AmmoType::Clip, 1, Skill::Medium));
    }

    #[test]
    fn test_give_body_caps() {
        let mut player = Player::new();
        player.reborn();
        assert!(!player.give_body(10));
        player.health = 95;
        assert!(player.give_body(25));
        assert_eq!(player.health, MAXHEALTH);
    }

    #[test]
    fn test_forward_thrust_moves_player() {
        let mut world = one_room(0);
        let id = world.players()[0].mobj.unwrap();
        world.tick(&[TicCmd::forward(50)]).unwrap();
        let mobj = world.mobj(id).unwrap();
        // 50 * 2048 along angle zero, then one step and friction
        assert_eq!(mobj.x, f(64) + Fixed::from_bits(50 * 2048));
        assert_eq!(mobj.state, StateNum::PlayRun1);
        assert_eq!(mobj.mom_x, Fixed::from_bits(50 * 2048).mul(crate::mobj::info::FRICTION));
    }

    #[test]
    fn test_standing_still_view_height() {
        let mut world = one_room(0);
        world.tick(&[TicCmd::default()]).unwrap();
        let player = &world.players()[0];
        assert_eq!(player.view_height, VIEWHEIGHT);
        assert_eq!(player.view_z, VIEWHEIGHT);
        assert!(player.on_ground);
    }

    #[test]
    fn test_use_held_triggers_once() {
        let mut world = one_room(0);
        let use_cmd = TicCmd::use_line();
        world.tick(&[use_cmd]).unwrap();
        assert!(world.players()[0].use_down);
        world.tick(&[TicCmd::default()]).unwrap();
        assert!(!world.players()[0].use_down);
    }

    #[test]
    fn test_use_against_wall_grunts() {
        let data = RoomChain::new().room(0, 128).player_start(100, 128, 0).build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        // the reborn spawn leaves use held; release it first
        world.tick(&[TicCmd::default()]).unwrap();
        let events = world.tick(&[TicCmd::use_line()]).unwrap();
        assert_eq!(events.count(Sfx::Noway), 1);
    }

    #[test]
    fn test_secret_sector_counts_once() {
        let mut world = one_room(9);
        world.tick(&[TicCmd::default()]).unwrap();
        world.tick(&[TicCmd::default()]).unwrap();
        assert_eq!(world.players()[0].secret_count, 1);
        assert_eq!(world.level().sectors[0].special, 0);
    }

    #[test]
    fn test_damaging_floor_pulses_every_32_tics() {
        let mut world = one_room(7);
        for _ in 0..33 {
            world.tick(&[TicCmd::default()]).unwrap();
        }
        // tics 0 and 32
        assert_eq!(world.players()[0].health, 90);
    }

    #[test]
    fn test_unknown_floor_special_is_an_error() {
        let mut world = one_room(42);
        assert!(matches!(
            world.tick(&[TicCmd::default()]),
            Err(SimError::UnknownSectorSpecial { special: 42, .. })
        ));
    }

    #[test]
    fn test_death_think_sinks_view_and_use_requests_reborn() {
        let mut world = one_room(0);
        world.players_mut()[0].state = PlayerState::Dead;
        world.tick(&[TicCmd::default()]).unwrap();
        assert_eq!(world.players()[0].view_height, VIEWHEIGHT - Fixed::ONE);
        world.tick(&[TicCmd::use_line()]).unwrap();
        assert_eq!(world.players()[0].state, PlayerState::Reborn);
        let events = world.tick(&[TicCmd::default()]).unwrap();
        assert_eq!(events.reborn, vec![0]);
    }
}
