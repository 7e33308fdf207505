//! Switch textures and the buttons that pop back after a second.

use serde::{Deserialize, Serialize};

use crate::config::GameMode;
use crate::error::{Result, SimError};
use crate::events::{Sfx, SoundOrigin};
use crate::map::TextureSet;
use crate::world::SimContext;

use super::MAXBUTTONS;

/// Tics a repeatable switch stays pressed.
pub const BUTTONTIME: u32 = 35;

/// Line special of the exit switch, which makes its own sound.
const EXIT_SWITCH: u16 = 11;

/// Switch texture pairs and the game episode set each first appears in.
const SWITCH_NAMES: [(&str, &str, u8); 40] = [
    ("SW1BRCOM", "SW2BRCOM", 1),
    ("SW1BRN1", "SW2BRN1", 1),
    ("SW1BRN2", "SW2BRN2", 1),
    ("SW1BRNGN", "SW2BRNGN", 1),
    ("SW1BROWN", "SW2BROWN", 1),
    ("SW1COMM", "SW2COMM", 1),
    ("SW1COMP", "SW2COMP", 1),
    ("SW1DIRT", "SW2DIRT", 1),
    ("SW1EXIT", "SW2EXIT", 1),
    ("SW1GRAY", "SW2GRAY", 1),
    ("SW1GRAY1", "SW2GRAY1", 1),
    ("SW1METAL", "SW2METAL", 1),
    ("SW1PIPE", "SW2PIPE", 1),
    ("SW1SLAD", "SW2SLAD", 1),
    ("SW1STARG", "SW2STARG", 1),
    ("SW1STON1", "SW2STON1", 1),
    ("SW1STON2", "SW2STON2", 1),
    ("SW1STONE", "SW2STONE", 1),
    ("SW1STRTN", "SW2STRTN", 1),
    ("SW1BLUE", "SW2BLUE", 2),
    ("SW1CMT", "SW2CMT", 2),
    ("SW1GARG", "SW2GARG", 2),
    ("SW1GSTON", "SW2GSTON", 2),
    ("SW1HOT", "SW2HOT", 2),
    ("SW1LION", "SW2LION", 2),
    ("SW1SATYR", "SW2SATYR", 2),
    ("SW1SKIN", "SW2SKIN", 2),
    ("SW1VINE", "SW2VINE", 2),
    ("SW1WOOD", "SW2WOOD", 2),
    ("SW1PANEL", "SW2PANEL", 3),
    ("SW1ROCK", "SW2ROCK", 3),
    ("SW1MET2", "SW2MET2", 3),
    ("SW1WDMET", "SW2WDMET", 3),
    ("SW1BRIK", "SW2BRIK", 3),
    ("SW1MOD1", "SW2MOD1", 3),
    ("SW1ZIM", "SW2ZIM", 3),
    ("SW1STON6", "SW2STON6", 3),
    ("SW1TEK", "SW2TEK", 3),
    ("SW1MARB", "SW2MARB", 3),
    ("SW1SKULL", "SW2SKULL", 3),
];

/// Which texture of a side a button changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonWhere {
    /// Upper texture.
    Top,
    /// Middle texture.
    Middle,
    /// Lower texture.
    Bottom,
}

/// A pressed switch waiting to pop back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Button {
    /// The switch line.
    pub line: usize,
    /// Which texture to restore.
    pub position: ButtonWhere,
    /// Texture to restore.
    pub texture: usize,
    /// Tics left.
    pub timer: u32,
    /// Sector whose origin the pop-back sound comes from.
    pub sound_sector: usize,
}

/// Wall texture numbers of the on/off switch pairs, flattened so that
/// entry `i ^ 1` is the partner of entry `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchList {
    textures: Vec<usize>,
}

impl SwitchList {
    /// The switches available in `mode`, resolved against the level's
    /// texture table.
    pub fn new(mode: GameMode, textures: &mut TextureSet) -> Self {
        let episode = mode.switch_episode();
        let textures = SWITCH_NAMES
            .iter()
            .filter(|(_, _, e)| *e <= episode)
            .flat_map(|(on, off, _)| [on, off])
            .map(|name| textures.intern_wall(name))
            .collect();
        Self { textures }
    }

    /// Number of switch pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len() / 2
    }

    /// `true` when no switches are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// Remember a pressed switch so it pops back after `time` tics.
///
/// A line already waiting is left alone.
pub fn start_button(ctx: &mut SimContext<'_>, line: usize, position: ButtonWhere, texture: usize, time: u32) -> Result<()> {
    if ctx.specials.buttons.iter().flatten().any(|b| b.line == line) {
        return Ok(());
    }
    let sound_sector = ctx.level.lines[line].front_sector;
    let Some(slot) = ctx.specials.buttons.iter_mut().find(|b| b.is_none()) else {
        return Err(SimError::ButtonLimit(MAXBUTTONS));
    };
    *slot = Some(Button {
        line,
        position,
        texture,
        timer: time,
        sound_sector,
    });
    Ok(())
}

/// Flip the switch texture on the front of `line`, clearing the special
/// of one-shot switches and arming a button for repeatable ones.
pub fn change_switch_texture(ctx: &mut SimContext<'_>, line: usize, use_again: bool) -> Result<()> {
    if !use_again {
        ctx.level.lines[line].special = 0;
    }
    let sfx = if ctx.level.lines[line].special == EXIT_SWITCH {
        Sfx::Swtchx
    } else {
        Sfx::Swtchn
    };

    let front = ctx.level.lines[line].front_side;
    let side = &ctx.level.sides[front];
    let found = ctx.switches.textures.iter().enumerate().find_map(|(i, &texture)| {
        if texture == side.top_texture {
            Some((ButtonWhere::Top, i))
        } else if texture == side.mid_texture {
            Some((ButtonWhere::Middle, i))
        } else if texture == side.bottom_texture {
            Some((ButtonWhere::Bottom, i))
        } else {
            None
        }
    });

    let Some((position, i)) = found else {
        return Ok(());
    };
    let old = ctx.switches.textures[i];
    let new = ctx.switches.textures[i ^ 1];
    ctx.events.start_sound(SoundOrigin::Line(line), sfx);
    let side = &mut ctx.level.sides[front];
    match position {
        ButtonWhere::Top => side.top_texture = new,
        ButtonWhere::Middle => side.mid_texture = new,
        ButtonWhere::Bottom => side.bottom_texture = new,
    }
    if use_again {
        start_button(ctx, line, position, old, BUTTONTIME)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::fixtures::RoomChain;
    use crate::world::World;

    fn world_with_switch(special: u16, mode: GameMode) -> World {
        let data = RoomChain::new().room(0, 128).wall_special(special, 0).build();
        let config = GameConfig {
            mode,
            ..GameConfig::default()
        };
        let mut world = World::from_data(&data, config).unwrap();
        let switch = world.level_mut().textures.intern_wall("SW1STARG");
        let front = world.level().lines[RoomChain::north_wall(0)].front_side;
        world.level_mut().sides[front].mid_texture = switch;
        world
    }

    #[test]
    fn test_switch_sets_depend_on_game_mode() {
        let mut textures = TextureSet::default();
        assert_eq!(SwitchList::new(GameMode::Shareware, &mut textures).len(), 19);
        assert_eq!(SwitchList::new(GameMode::Registered, &mut textures).len(), 29);
        assert_eq!(SwitchList::new(GameMode::Commercial, &mut textures).len(), 40);
    }

    #[test]
    fn test_one_shot_switch_flips_and_clears() {
        let mut world = world_with_switch(7, GameMode::Registered);
        let line = RoomChain::north_wall(0);
        let events = world.with_context(|ctx| {
            change_switch_texture(ctx, line, false)?;
            Ok(ctx.events.clone())
        });
        let events = events.unwrap();
        assert_eq!(events.count(Sfx::Swtchn), 1);
        let level = world.level();
        let side = &level.sides[level.lines[line].front_side];
        assert_eq!(level.textures.walls.name(side.mid_texture), Some("SW2STARG"));
        assert_eq!(level.lines[line].special, 0);
        assert!(world.specials().buttons.iter().all(Option::is_none));
    }

    #[test]
    fn test_button_pops_back_after_a_second() {
        let mut world = world_with_switch(63, GameMode::Registered);
        let line = RoomChain::north_wall(0);
        world
            .with_context(|ctx| change_switch_texture(ctx, line, true))
            .unwrap();
        assert_eq!(world.level().lines[line].special, 63);
        let button = world.specials().buttons[0].unwrap();
        assert_eq!(button.timer, BUTTONTIME);

        for _ in 0..BUTTONTIME - 1 {
            world.tick(&[]).unwrap();
        }
        let events = world.tick(&[]).unwrap();
        assert_eq!(events.count(Sfx::Swtchn), 1);
        let level = world.level();
        let side = &level.sides[level.lines[line].front_side];
        assert_eq!(level.textures.walls.name(side.mid_texture), Some("SW1STARG"));
        assert!(world.specials().buttons[0].is_none());
    }

    #[test]
    fn test_button_slots_run_out() {
        let data = (0..6).fold(RoomChain::new(), |chain, _| chain.room(0, 128)).build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let outcome = world.with_context(|ctx| {
            for line in 0..=MAXBUTTONS {
                start_button(ctx, line, ButtonWhere::Top, 0, BUTTONTIME)?;
            }
            Ok(())
        });
        assert!(matches!(outcome, Err(SimError::ButtonLimit(MAXBUTTONS))));
    }
}
