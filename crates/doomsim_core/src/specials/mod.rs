//! Sector and line specials: movers, lights, switches and the per-tic
//! bookkeeping that goes with them.
//!
//! # Module Structure
//!
//! - `plane`: the shared floor/ceiling stepper
//! - `ceiling`, `floor`, `plat`, `door`: mover thinkers and their triggers
//! - `lights`: light effect thinkers and light triggers
//! - `switch`: switch textures and timed buttons
//! - `lines`: walk-over and use line special tables

pub mod ceiling;
pub mod door;
pub mod floor;
pub mod lights;
pub mod lines;
pub mod plane;
pub mod plat;
pub mod switch;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::events::{LevelExit, Sfx, SoundOrigin};
use crate::math::Fixed;
use crate::thinker::ThinkerId;
use crate::world::SimContext;

pub use plane::{move_plane, MoveResult, Plane};
pub use switch::{Button, ButtonWhere, SwitchList};

/// Tics per second.
pub const TICRATE: u32 = 35;
/// Ceilings that can be stopped and restarted.
pub const MAXCEILINGS: usize = 30;
/// Platforms that can be stopped and restarted.
pub const MAXPLATS: usize = 30;
/// Switches that can be waiting to pop back at once.
pub const MAXBUTTONS: usize = 16;

/// Line special of a wall whose texture scrolls left.
const SCROLL_LEFT: u16 = 48;

/// Bookkeeping shared by all specials of a level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecialState {
    /// Ceilings that crush-stop and reactivation triggers can find.
    pub active_ceilings: [Option<ThinkerId>; MAXCEILINGS],
    /// Platforms that stop and reactivation triggers can find.
    pub active_plats: [Option<ThinkerId>; MAXPLATS],
    /// Switches waiting to pop back.
    pub buttons: [Option<Button>; MAXBUTTONS],
    /// Lines whose front texture scrolls every tic.
    pub scrolling_lines: Vec<usize>,
    /// Tics left before the level time limit ends the level.
    pub level_timer: Option<u32>,
}

impl Default for SpecialState {
    fn default() -> Self {
        Self {
            active_ceilings: [None; MAXCEILINGS],
            active_plats: [None; MAXPLATS],
            buttons: [None; MAXBUTTONS],
            scrolling_lines: Vec::new(),
            level_timer: None,
        }
    }
}

/// Start the thinkers sector specials ask for at level start, count
/// secrets and collect scrolling walls.
pub fn spawn_specials(ctx: &mut SimContext<'_>) -> Result<()> {
    *ctx.specials = SpecialState {
        level_timer: ctx
            .config
            .time_limit
            .filter(|_| ctx.config.deathmatch != 0)
            .map(|minutes| minutes * 60 * TICRATE),
        ..SpecialState::default()
    };

    for sector in 0..ctx.level.sectors.len() {
        match ctx.level.sectors[sector].special {
            1 => lights::spawn_light_flash(ctx, sector),
            2 => lights::spawn_strobe_flash(ctx, sector, lights::FASTDARK, false),
            3 => lights::spawn_strobe_flash(ctx, sector, lights::SLOWDARK, false),
            4 => {
                lights::spawn_strobe_flash(ctx, sector, lights::FASTDARK, false);
                ctx.level.sectors[sector].special = 4;
            }
            8 => lights::spawn_glowing_light(ctx, sector),
            9 => ctx.state.total_secrets += 1,
            10 => door::spawn_door_close_in_30(ctx, sector)?,
            12 => lights::spawn_strobe_flash(ctx, sector, lights::SLOWDARK, true),
            13 => lights::spawn_strobe_flash(ctx, sector, lights::FASTDARK, true),
            14 => door::spawn_door_raise_in_5_mins(ctx, sector)?,
            17 => lights::spawn_fire_flicker(ctx, sector),
            _ => {}
        }
    }

    ctx.specials.scrolling_lines = ctx
        .level
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.special == SCROLL_LEFT)
        .map(|(i, _)| i)
        .collect();

    tracing::debug!(
        thinkers = ctx.thinkers.len(),
        secrets = ctx.state.total_secrets,
        scrolling = ctx.specials.scrolling_lines.len(),
        "sector specials spawned"
    );
    Ok(())
}

/// Per-tic bookkeeping after the thinker sweep: the level timer,
/// scrolling walls and switch buttons.
pub fn update_specials(ctx: &mut SimContext<'_>) {
    if let Some(timer) = ctx.specials.level_timer.as_mut().filter(|t| **t > 0) {
        *timer -= 1;
        if *timer == 0 {
            ctx.exit_level(LevelExit::Normal);
        }
    }

    for &line in &ctx.specials.scrolling_lines {
        let line = &ctx.level.lines[line];
        if line.special == SCROLL_LEFT {
            ctx.level.sides[line.front_side].texture_offset += Fixed::ONE;
        }
    }

    for slot in &mut ctx.specials.buttons {
        let Some(button) = slot.as_mut() else {
            continue;
        };
        button.timer -= 1;
        if button.timer == 0 {
            let side = &mut ctx.level.sides[ctx.level.lines[button.line].front_side];
            match button.position {
                ButtonWhere::Top => side.top_texture = button.texture,
                ButtonWhere::Middle => side.mid_texture = button.texture,
                ButtonWhere::Bottom => side.bottom_texture = button.texture,
            }
            ctx.events.start_sound(SoundOrigin::Sector(button.sound_sector), Sfx::Swtchn);
            *slot = None;
        }
    }
}

/// Remove a mover: free its sector and mark the thinker removed.
pub(crate) fn finish_mover(ctx: &mut SimContext<'_>, id: ThinkerId, sector: usize) {
    ctx.level.sectors[sector].release();
    ctx.thinkers.remove(id);
}

/// Sectors tagged like `line`, in index order.
pub(crate) fn tagged_sectors(ctx: &SimContext<'_>, line: usize) -> Vec<usize> {
    let tag = ctx.level.lines[line].tag;
    let mut found = Vec::new();
    let mut after = None;
    while let Some(s) = ctx.level.next_tagged_sector(tag, after) {
        found.push(s);
        after = Some(s);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::fixtures::RoomChain;
    use crate::world::{Thinker, World};

    #[test]
    fn test_sector_specials_spawn_light_thinkers() {
        let data = RoomChain::new()
            .room(0, 128)
            .special(1)
            .room(0, 128)
            .special(8)
            .room(0, 128)
            .special(9)
            .room(0, 128)
            .special(4)
            .build();
        let world = World::from_data(&data, GameConfig::default()).unwrap();
        let kinds: Vec<_> = world
            .thinkers()
            .iter()
            .map(|(_, _, t)| std::mem::discriminant(t))
            .collect();
        assert_eq!(kinds.len(), 3);
        let sectors = &world.level().sectors;
        assert_eq!(sectors[0].special, 0);
        assert_eq!(sectors[1].special, 0);
        // secrets keep their special until found, strobe-with-damage too
        assert_eq!(sectors[2].special, 9);
        assert_eq!(sectors[3].special, 4);
        assert_eq!(world.level_state().total_secrets, 1);
        assert!(matches!(world.thinkers().iter().next(), Some((_, _, Thinker::LightFlash(_)))));
    }

    #[test]
    fn test_scrolling_wall_advances_every_tic() {
        let data = RoomChain::new().room(0, 128).wall_special(SCROLL_LEFT, 0).build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        world.tick(&[]).unwrap();
        world.tick(&[]).unwrap();
        let line = &world.level().lines[RoomChain::north_wall(0)];
        assert_eq!(world.level().sides[line.front_side].texture_offset, Fixed::from_int(2));
    }

    #[test]
    fn test_level_timer_exits_in_deathmatch_only() {
        let data = RoomChain::new()
            .room(0, 128)
            .thing(11, 32, 32, 0)
            .thing(11, 96, 32, 0)
            .thing(11, 32, 200, 0)
            .thing(11, 96, 200, 0)
            .build();
        let coop = World::from_data(
            &data,
            GameConfig {
                time_limit: Some(1),
                ..GameConfig::default()
            },
        )
        .unwrap();
        assert_eq!(coop.specials().level_timer, None);

        let mut dm = World::from_data(
            &data,
            GameConfig {
                time_limit: Some(1),
                deathmatch: 1,
                ..GameConfig::default()
            },
        )
        .unwrap();
        assert_eq!(dm.specials().level_timer, Some(60 * TICRATE));
        for _ in 1..60 * TICRATE {
            assert_eq!(dm.tick(&[]).unwrap().exit, None);
        }
        assert_eq!(dm.tick(&[]).unwrap().exit, Some(LevelExit::Normal));
    }
}
