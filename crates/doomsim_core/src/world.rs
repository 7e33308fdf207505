//! The world: one level in play and everything that changes while it runs.
//!
//! A [`World`] owns the level geometry, the blockmap, the thinker list,
//! the random number generator and the players. Game code never holds a
//! `&mut World`; it receives a [`SimContext`], a bundle of borrows of the
//! world's parts, so that a running thinker can be moved out of the list
//! while the rest of the world stays reachable.
//!
//! # Tick order
//!
//! 1. Players think, in slot order
//! 2. The thinker sweep runs every active thinker in list order
//! 3. Special bookkeeping: level timer, scrolling walls, switch buttons
//! 4. Level time advances

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::blockmap::BlockMap;
use crate::config::{GameConfig, MAXPLAYERS};
use crate::error::Result;
use crate::events::{LevelExit, TickEvents};
use crate::hash::StateHasher;
use crate::input::{TicCmd, BTS_PAUSE};
use crate::map::data::LevelData;
use crate::map::{Level, MapThing};
use crate::mobj::spawn::{deathmatch_spawn_player, spawn_map_thing};
use crate::mobj::{mobj_think, Mobj};
use crate::player::{player_think, Player, PlayerState};
use crate::random::Rng;
use crate::specials::ceiling::{move_ceiling, Ceiling};
use crate::specials::door::{vertical_door, Door};
use crate::specials::floor::{move_floor, FloorMove};
use crate::specials::lights::{fire_flicker, glow, light_flash, strobe_flash, FireFlicker, Glow, LightFlash, Strobe};
use crate::specials::plat::{plat_raise, Plat};
use crate::specials::{spawn_specials, update_specials, SpecialState, SwitchList};
use crate::thinker::{ThinkerId, Thinkers};

/// Everything that can sit in the thinker list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Thinker {
    /// A map object.
    Mobj(Box<Mobj>),
    /// A moving ceiling.
    Ceiling(Ceiling),
    /// A moving floor.
    Floor(FloorMove),
    /// A platform.
    Plat(Plat),
    /// A door.
    Door(Door),
    /// Random light flash.
    LightFlash(LightFlash),
    /// Strobe.
    Strobe(Strobe),
    /// Glowing light.
    Glow(Glow),
    /// Fire flicker.
    FireFlicker(FireFlicker),
}

impl Thinker {
    /// The map object, if this is one.
    #[must_use]
    pub fn as_mobj(&self) -> Option<&Mobj> {
        match self {
            Self::Mobj(mobj) => Some(mobj),
            _ => None,
        }
    }

    /// The map object, if this is one.
    pub fn as_mobj_mut(&mut self) -> Option<&mut Mobj> {
        match self {
            Self::Mobj(mobj) => Some(mobj),
            _ => None,
        }
    }

    /// Short name of the variant, for logs and reports.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Mobj(_) => "mobj",
            Self::Ceiling(_) => "ceiling",
            Self::Floor(_) => "floor",
            Self::Plat(_) => "plat",
            Self::Door(_) => "door",
            Self::LightFlash(_) => "light_flash",
            Self::Strobe(_) => "strobe",
            Self::Glow(_) => "glow",
            Self::FireFlicker(_) => "fire_flicker",
        }
    }
}

/// Per-level counters and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelState {
    /// Tics since the level started, pauses excluded.
    pub level_time: u32,
    /// Monsters that count toward the kill total.
    pub total_kills: i32,
    /// Items that count toward the item total.
    pub total_items: i32,
    /// Secret sectors.
    pub total_secrets: i32,
    /// Whether the game is paused.
    pub paused: bool,
    /// Set once something ended the level.
    pub exit: Option<LevelExit>,
    /// Cooperative starts by player slot.
    pub player_starts: [Option<MapThing>; MAXPLAYERS],
    /// Deathmatch starts in map order.
    pub deathmatch_starts: Vec<MapThing>,
}

/// Borrowed view of a world handed to game code.
pub struct SimContext<'a> {
    /// Level geometry and sector state.
    pub level: &'a mut Level,
    /// Spatial index.
    pub blockmap: &'a mut BlockMap,
    /// Thinker list. A thinker that is running is not in it.
    pub thinkers: &'a mut Thinkers<Thinker>,
    /// The world's only source of randomness.
    pub rng: &'a mut Rng,
    /// Player slots.
    pub players: &'a mut [Player],
    /// Special bookkeeping.
    pub specials: &'a mut SpecialState,
    /// Level counters.
    pub state: &'a mut LevelState,
    /// Game settings.
    pub config: &'a GameConfig,
    /// Switch textures.
    pub switches: &'a SwitchList,
    /// Events of the current tic.
    pub events: &'a mut TickEvents,
}

impl SimContext<'_> {
    /// End the level. The driver decides what happens next.
    pub fn exit_level(&mut self, exit: LevelExit) {
        tracing::info!(?exit, level_time = self.state.level_time, "level exit");
        self.state.exit = Some(exit);
        self.events.exit = Some(exit);
    }
}

/// One level in play.
#[derive(Debug, Clone)]
pub struct World {
    level: Level,
    blockmap: BlockMap,
    thinkers: Thinkers<Thinker>,
    rng: Rng,
    players: [Player; MAXPLAYERS],
    specials: SpecialState,
    state: LevelState,
    config: GameConfig,
    switches: SwitchList,
}

/// Borrow every part of a world as a context.
macro_rules! context {
    ($world:expr, $events:expr) => {
        SimContext {
            level: &mut $world.level,
            blockmap: &mut $world.blockmap,
            thinkers: &mut $world.thinkers,
            rng: &mut $world.rng,
            players: &mut $world.players[..],
            specials: &mut $world.specials,
            state: &mut $world.state,
            config: &$world.config,
            switches: &$world.switches,
            events: $events,
        }
    };
}

/// The world without its thinker list, so the sweep can borrow both.
struct Parts<'w> {
    level: &'w mut Level,
    blockmap: &'w mut BlockMap,
    rng: &'w mut Rng,
    players: &'w mut [Player; MAXPLAYERS],
    specials: &'w mut SpecialState,
    state: &'w mut LevelState,
    config: &'w GameConfig,
    switches: &'w SwitchList,
}

impl World {
    /// Build a level and set it up for play: spawn its things, place
    /// deathmatch players and start the sector specials.
    pub fn from_data(data: &LevelData, config: GameConfig) -> Result<Self> {
        let (mut level, blockmap) = Level::build(data)?;
        let switches = SwitchList::new(config.mode, &mut level.textures);
        let things = level.things.clone();
        let mut world = Self {
            level,
            blockmap,
            thinkers: Thinkers::new(),
            rng: Rng::new(),
            players: std::array::from_fn(|_| Player::new()),
            specials: SpecialState::default(),
            state: LevelState::default(),
            config,
            switches,
        };

        world.with_context(|ctx| {
            for thing in &things {
                spawn_map_thing(ctx, thing)?;
            }
            if ctx.config.deathmatch != 0 {
                for p in 0..MAXPLAYERS {
                    if ctx.config.players_in_game[p] {
                        ctx.players[p].mobj = None;
                        deathmatch_spawn_player(ctx, p)?;
                    }
                }
            }
            spawn_specials(ctx)
        })?;

        tracing::info!(
            level = %world.level.name,
            thinkers = world.thinkers.len(),
            kills = world.state.total_kills,
            items = world.state.total_items,
            secrets = world.state.total_secrets,
            "level set up"
        );
        Ok(world)
    }

    /// Advance one tic. `cmds` holds one command per player slot; missing
    /// entries count as no input.
    pub fn tick(&mut self, cmds: &[TicCmd]) -> Result<TickEvents> {
        let mut events = TickEvents::default();

        for p in 0..MAXPLAYERS {
            if !self.config.players_in_game[p] {
                continue;
            }
            let cmd = cmds.get(p).copied().unwrap_or_default();
            if cmd.special() == Some(BTS_PAUSE) {
                self.state.paused = !self.state.paused;
                tracing::debug!(player = p, paused = self.state.paused, "pause toggled");
            }
            self.players[p].cmd = cmd;
        }
        if self.state.paused {
            events.paused = true;
            return Ok(events);
        }

        {
            let mut ctx = context!(self, &mut events);
            for p in 0..MAXPLAYERS {
                if !ctx.config.players_in_game[p] {
                    continue;
                }
                if ctx.players[p].state == PlayerState::Reborn {
                    ctx.events.reborn.push(p);
                    continue;
                }
                player_think(&mut ctx, p)?;
            }
        }

        let (parts, thinkers) = self.split();
        thinkers.run(|thinkers, id, thinker| {
            let mut ctx = SimContext {
                level: &mut *parts.level,
                blockmap: &mut *parts.blockmap,
                thinkers,
                rng: &mut *parts.rng,
                players: &mut parts.players[..],
                specials: &mut *parts.specials,
                state: &mut *parts.state,
                config: parts.config,
                switches: parts.switches,
                events: &mut events,
            };
            run_thinker(&mut ctx, id, thinker)
        })?;

        {
            let mut ctx = context!(self, &mut events);
            update_specials(&mut ctx);
        }
        self.state.level_time += 1;

        #[cfg(any(debug_assertions, feature = "debug-validation"))]
        {
            let hash = self.state_hash();
            tracing::debug!(tic = self.state.level_time, state_hash = hash, "world state hash");
        }

        Ok(events)
    }

    fn split(&mut self) -> (Parts<'_>, &mut Thinkers<Thinker>) {
        (
            Parts {
                level: &mut self.level,
                blockmap: &mut self.blockmap,
                rng: &mut self.rng,
                players: &mut self.players,
                specials: &mut self.specials,
                state: &mut self.state,
                config: &self.config,
                switches: &self.switches,
            },
            &mut self.thinkers,
        )
    }

    /// Run `f` against the world outside of a tic, e.g. to trigger a
    /// special directly. Events it raises are dropped.
    pub fn with_context<R>(&mut self, f: impl FnOnce(&mut SimContext<'_>) -> Result<R>) -> Result<R> {
        let mut events = TickEvents::default();
        let mut ctx = context!(self, &mut events);
        f(&mut ctx)
    }

    /// Hash of everything a tic can change.
    ///
    /// Thinker handles are hashed by list position, so a world restored
    /// from a snapshot hashes the same as the one it was taken from. The
    /// value is stable across platforms and toolchains; see [`StateHasher`].
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = StateHasher::new();
        let ordinals = self.ordinals();
        let ordinal = |id: Option<ThinkerId>| id.and_then(|id| ordinals.get(&id).copied());

        hasher.add(&self.state);
        hasher.add(&self.rng.index());

        for sector in &self.level.sectors {
            hasher.add(&(
                sector.floor_height,
                sector.ceiling_height,
                sector.floor_pic,
                sector.ceiling_pic,
                sector.light_level,
                sector.special,
                sector.tag,
                ordinal(sector.special_data),
            ));
            let things: Vec<Option<u32>> = sector.things.iter().map(|&id| ordinal(Some(id))).collect();
            hasher.add(&things);
        }
        for line in &self.level.lines {
            hasher.add(&(line.special, line.tag, line.flags));
        }
        for side in &self.level.sides {
            hasher.add(&(
                side.texture_offset,
                side.row_offset,
                side.top_texture,
                side.bottom_texture,
                side.mid_texture,
            ));
        }

        hasher.add(&(self.thinkers.len() as u64));
        for (_, state, thinker) in self.thinkers.iter() {
            hasher.add(&state);
            hasher.add(thinker);
        }

        for player in &self.players {
            hasher.add(&Player { mobj: None, ..player.clone() });
            hasher.add(&ordinal(player.mobj));
        }

        for id in self.specials.active_ceilings.iter().chain(&self.specials.active_plats) {
            hasher.add(&ordinal(*id));
        }
        hasher.add(&self.specials.buttons);
        hasher.add(&self.specials.scrolling_lines);
        hasher.add(&self.specials.level_timer);

        hasher.value()
    }

    /// List position of every live thinker.
    pub(crate) fn ordinals(&self) -> HashMap<ThinkerId, u32> {
        self.thinkers
            .ids()
            .into_iter()
            .zip(0u32..)
            .collect()
    }

    /// A map object by handle.
    #[must_use]
    pub fn mobj(&self, id: ThinkerId) -> Option<&Mobj> {
        self.thinkers.get(id).and_then(Thinker::as_mobj)
    }

    /// Player slots.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Player slots, mutably.
    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    /// Level geometry.
    #[must_use]
    pub const fn level(&self) -> &Level {
        &self.level
    }

    /// Level geometry, mutably.
    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    /// Level counters.
    #[must_use]
    pub const fn level_state(&self) -> &LevelState {
        &self.state
    }

    /// The thinker list.
    #[must_use]
    pub const fn thinkers(&self) -> &Thinkers<Thinker> {
        &self.thinkers
    }

    /// Number of live thinkers.
    #[must_use]
    pub fn thinker_count(&self) -> usize {
        self.thinkers.len()
    }

    /// Spatial index.
    #[must_use]
    pub const fn blockmap(&self) -> &BlockMap {
        &self.blockmap
    }

    /// The random number generator.
    #[must_use]
    pub const fn rng(&self) -> &Rng {
        &self.rng
    }

    /// Special bookkeeping.
    #[must_use]
    pub const fn specials(&self) -> &SpecialState {
        &self.specials
    }

    /// Game settings.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (
        &mut Level,
        &mut BlockMap,
        &mut Thinkers<Thinker>,
        &mut [Player; MAXPLAYERS],
        &mut SpecialState,
        &mut LevelState,
        &mut Rng,
    ) {
        (
            &mut self.level,
            &mut self.blockmap,
            &mut self.thinkers,
            &mut self.players,
            &mut self.specials,
            &mut self.state,
            &mut self.rng,
        )
    }
}

fn run_thinker(ctx: &mut SimContext<'_>, id: ThinkerId, thinker: &mut Thinker) -> Result<()> {
    match thinker {
        Thinker::Mobj(mobj) => mobj_think(ctx, id, mobj),
        Thinker::Ceiling(ceiling) => move_ceiling(ctx, id, ceiling),
        Thinker::Floor(floor) => move_floor(ctx, id, floor),
        Thinker::Plat(plat) => plat_raise(ctx, id, plat),
        Thinker::Door(door) => vertical_door(ctx, id, door),
        Thinker::LightFlash(flash) => {
            light_flash(ctx, flash);
            Ok(())
        }
        Thinker::Strobe(strobe) => {
            strobe_flash(ctx, strobe);
            Ok(())
        }
        Thinker::Glow(g) => {
            glow(ctx, g);
            Ok(())
        }
        Thinker::FireFlicker(flick) => {
            fire_flicker(ctx, flick);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::RoomChain;

    fn busy_level() -> LevelData {
        RoomChain::new()
            .room(0, 128)
            .light(200)
            .special(1)
            .player_start(64, 128, 0)
            .room(0, 96)
            .special(8)
            .light(160)
            .thing(3004, 192, 128, 0)
            .thing(2011, 200, 64, 0)
            .room(0, 128)
            .special(17)
            .build()
    }

    fn script(tic: u32) -> TicCmd {
        match tic % 40 {
            0..=9 => TicCmd::forward(25),
            10..=14 => TicCmd {
                angle_turn: 640,
                ..TicCmd::default()
            },
            15 => TicCmd::use_line(),
            _ => TicCmd::forward(-25),
        }
    }

    #[test]
    fn test_identical_runs_hash_identically() {
        let data = busy_level();
        let mut a = World::from_data(&data, GameConfig::default()).unwrap();
        let mut b = World::from_data(&data, GameConfig::default()).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());
        for tic in 0..300 {
            a.tick(&[script(tic)]).unwrap();
            b.tick(&[script(tic)]).unwrap();
            assert_eq!(a.state_hash(), b.state_hash(), "diverged at tic {tic}");
        }
    }

    #[test]
    fn test_input_changes_the_hash() {
        let data = busy_level();
        let mut a = World::from_data(&data, GameConfig::default()).unwrap();
        let mut b = World::from_data(&data, GameConfig::default()).unwrap();
        a.tick(&[TicCmd::forward(25)]).unwrap();
        b.tick(&[TicCmd::default()]).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_level_time_advances() {
        let mut world = World::from_data(&busy_level(), GameConfig::default()).unwrap();
        for _ in 0..5 {
            world.tick(&[]).unwrap();
        }
        assert_eq!(world.level_state().level_time, 5);
    }

    #[test]
    fn test_pause_freezes_the_world() {
        let mut world = World::from_data(&busy_level(), GameConfig::default()).unwrap();
        world.tick(&[]).unwrap();
        let events = world.tick(&[TicCmd::pause()]).unwrap();
        assert!(events.paused);
        world.tick(&[]).unwrap();
        let frozen = world.state_hash();
        for _ in 0..10 {
            assert!(world.tick(&[]).unwrap().paused);
        }
        assert_eq!(world.state_hash(), frozen);
        assert_eq!(world.level_state().level_time, 1);

        let events = world.tick(&[TicCmd::pause()]).unwrap();
        assert!(!events.paused);
        assert_eq!(world.level_state().level_time, 2);
    }

    #[test]
    fn test_players_without_a_start_have_no_body() {
        let data = RoomChain::new().room(0, 128).build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        assert!(world.players()[0].mobj.is_none());
        world.tick(&[TicCmd::forward(50)]).unwrap();
        assert_eq!(world.thinker_count(), 0);
    }

    #[test]
    fn test_thinkers_spawned_during_setup_keep_map_order() {
        let world = World::from_data(&busy_level(), GameConfig::default()).unwrap();
        let kinds: Vec<_> = world.thinkers().iter().map(|(_, _, t)| t.kind_name()).collect();
        assert_eq!(kinds, vec!["mobj", "mobj", "mobj", "light_flash", "glow", "fire_flicker"]);
    }
}
