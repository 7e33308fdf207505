//! Light effects: flashing, strobing, glowing and flickering sectors, and
//! the line triggers that set light levels.

use serde::{Deserialize, Serialize};

use crate::thinker::ThinkerId;
use crate::world::{SimContext, Thinker};

use super::tagged_sectors;

/// Dark phase of a fast strobe.
pub const FASTDARK: i32 = 15;
/// Dark phase of a slow strobe.
pub const SLOWDARK: i32 = 35;
/// Bright phase of every strobe.
pub const STROBEBRIGHT: i32 = 5;
/// Light change per tic of a glowing sector.
pub const GLOWSPEED: i16 = 8;

/// Random flicker between the sector's light and its darkest neighbour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightFlash {
    /// Sector.
    pub sector: usize,
    /// Tics to the next toggle.
    pub count: i32,
    /// Bright level.
    pub max_light: i16,
    /// Dark level.
    pub min_light: i16,
    /// Mask for the bright phase length.
    pub max_time: i32,
    /// Mask for the dark phase length.
    pub min_time: i32,
}

/// Regular strobe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strobe {
    /// Sector.
    pub sector: usize,
    /// Tics to the next toggle.
    pub count: i32,
    /// Dark level.
    pub min_light: i16,
    /// Bright level.
    pub max_light: i16,
    /// Dark phase length.
    pub dark_time: i32,
    /// Bright phase length.
    pub bright_time: i32,
}

/// Smooth ramp between two light levels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Glow {
    /// Sector.
    pub sector: usize,
    /// Dark level.
    pub min_light: i16,
    /// Bright level.
    pub max_light: i16,
    /// -1 dimming, 1 brightening.
    pub direction: i32,
}

/// Flickering fire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FireFlicker {
    /// Sector.
    pub sector: usize,
    /// Tics to the next change.
    pub count: i32,
    /// Bright level.
    pub max_light: i16,
    /// Floor of the flicker.
    pub min_light: i16,
}

fn add(ctx: &mut SimContext<'_>, thinker: Thinker) -> ThinkerId {
    let id = ctx.thinkers.add(thinker);
    tracing::debug!(id = id.index(), "light thinker spawned");
    id
}

/// One tic of a flickering fire.
pub fn fire_flicker(ctx: &mut SimContext<'_>, flick: &mut FireFlicker) {
    flick.count -= 1;
    if flick.count != 0 {
        return;
    }
    let amount = ((ctx.rng.draw() & 3) * 16) as i16;
    let sector = &mut ctx.level.sectors[flick.sector];
    sector.light_level = if sector.light_level - amount < flick.min_light {
        flick.min_light
    } else {
        flick.max_light - amount
    };
    flick.count = 4;
}

/// Start a fire flicker in `sector`.
pub fn spawn_fire_flicker(ctx: &mut SimContext<'_>, sector: usize) {
    let light = ctx.level.sectors[sector].light_level;
    ctx.level.sectors[sector].special = 0;
    let flick = FireFlicker {
        sector,
        count: 4,
        max_light: light,
        min_light: ctx.level.min_surrounding_light(sector, light) + 16,
    };
    add(ctx, Thinker::FireFlicker(flick));
}

/// One tic of a random flash.
pub fn light_flash(ctx: &mut SimContext<'_>, flash: &mut LightFlash) {
    flash.count -= 1;
    if flash.count != 0 {
        return;
    }
    let sector = &mut ctx.level.sectors[flash.sector];
    if sector.light_level == flash.max_light {
        sector.light_level = flash.min_light;
        flash.count = (ctx.rng.draw() & flash.min_time) + 1;
    } else {
        sector.light_level = flash.max_light;
        flash.count = (ctx.rng.draw() & flash.max_time) + 1;
    }
}

/// Start a random flash in `sector`.
pub fn spawn_light_flash(ctx: &mut SimContext<'_>, sector: usize) {
    ctx.level.sectors[sector].special = 0;
    let light = ctx.level.sectors[sector].light_level;
    let mut flash = LightFlash {
        sector,
        count: 0,
        max_light: light,
        min_light: ctx.level.min_surrounding_light(sector, light),
        max_time: 64,
        min_time: 7,
    };
    flash.count = (ctx.rng.draw() & flash.max_time) + 1;
    add(ctx, Thinker::LightFlash(flash));
}

/// One tic of a strobe.
pub fn strobe_flash(ctx: &mut SimContext<'_>, strobe: &mut Strobe) {
    strobe.count -= 1;
    if strobe.count != 0 {
        return;
    }
    let sector = &mut ctx.level.sectors[strobe.sector];
    if sector.light_level == strobe.min_light {
        sector.light_level = strobe.max_light;
        strobe.count = strobe.bright_time;
    } else {
        sector.light_level = strobe.min_light;
        strobe.count = strobe.dark_time;
    }
}

/// Start a strobe in `sector`. Synchronised strobes all toggle on the
/// same tic; the others start at a random point.
pub fn spawn_strobe_flash(ctx: &mut SimContext<'_>, sector: usize, dark_time: i32, in_sync: bool) {
    let light = ctx.level.sectors[sector].light_level;
    let mut min_light = ctx.level.min_surrounding_light(sector, light);
    if min_light == light {
        min_light = 0;
    }
    ctx.level.sectors[sector].special = 0;
    let count = if in_sync { 1 } else { (ctx.rng.draw() & 7) + 1 };
    let strobe = Strobe {
        sector,
        count,
        min_light,
        max_light: light,
        dark_time,
        bright_time: STROBEBRIGHT,
    };
    add(ctx, Thinker::Strobe(strobe));
}

/// One tic of a glow.
pub fn glow(ctx: &mut SimContext<'_>, g: &mut Glow) {
    let sector = &mut ctx.level.sectors[g.sector];
    match g.direction {
        -1 => {
            sector.light_level -= GLOWSPEED;
            if sector.light_level <= g.min_light {
                sector.light_level += GLOWSPEED;
                g.direction = 1;
            }
        }
        1 => {
            sector.light_level += GLOWSPEED;
            if sector.light_level >= g.max_light {
                sector.light_level -= GLOWSPEED;
                g.direction = -1;
            }
        }
        _ => {}
    }
}

/// Start a glow in `sector`.
pub fn spawn_glowing_light(ctx: &mut SimContext<'_>, sector: usize) {
    let light = ctx.level.sectors[sector].light_level;
    let g = Glow {
        sector,
        min_light: ctx.level.min_surrounding_light(sector, light),
        max_light: light,
        direction: -1,
    };
    ctx.level.sectors[sector].special = 0;
    add(ctx, Thinker::Glow(g));
}

/// Start slow strobes in every idle sector tagged like `line`.
pub fn start_light_strobing(ctx: &mut SimContext<'_>, line: usize) {
    for sector in tagged_sectors(ctx, line) {
        if ctx.level.sectors[sector].is_busy() {
            continue;
        }
        spawn_strobe_flash(ctx, sector, SLOWDARK, false);
    }
}

/// Dim every sector tagged like `line` to its darkest neighbour.
pub fn turn_tag_lights_off(ctx: &mut SimContext<'_>, line: usize) {
    let tag = ctx.level.lines[line].tag;
    for sector in 0..ctx.level.sectors.len() {
        if ctx.level.sectors[sector].tag != tag {
            continue;
        }
        let mut min = ctx.level.sectors[sector].light_level;
        for &l in &ctx.level.sectors[sector].lines {
            if let Some(other) = ctx.level.next_sector(l, sector) {
                min = min.min(ctx.level.sectors[other].light_level);
            }
        }
        ctx.level.sectors[sector].light_level = min;
    }
}

/// Set every sector tagged like `line` to `bright`, or with 0 to the
/// brightest neighbour of the first such sector.
pub fn light_turn_on(ctx: &mut SimContext<'_>, line: usize, bright: i16) {
    let tag = ctx.level.lines[line].tag;
    let mut bright = bright;
    for sector in 0..ctx.level.sectors.len() {
        if ctx.level.sectors[sector].tag != tag {
            continue;
        }
        // once found, the level is reused for later sectors
        if bright == 0 {
            for &l in &ctx.level.sectors[sector].lines {
                if let Some(other) = ctx.level.next_sector(l, sector) {
                    bright = bright.max(ctx.level.sectors[other].light_level);
                }
            }
        }
        ctx.level.sectors[sector].light_level = bright;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::fixtures::RoomChain;
    use crate::world::World;

    fn lights(world: &World) -> Vec<i16> {
        world.level().sectors.iter().map(|s| s.light_level).collect()
    }

    #[test]
    fn test_glow_ramps_and_bounces() {
        let data = RoomChain::new()
            .room(0, 128)
            .light(160)
            .special(8)
            .room(0, 128)
            .light(136)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let mut seen = Vec::new();
        for _ in 0..8 {
            world.tick(&[]).unwrap();
            seen.push(lights(&world)[0]);
        }
        assert_eq!(seen, vec![152, 144, 144, 152, 152, 144, 144, 152]);
    }

    #[test]
    fn test_sync_strobe_toggles_on_schedule() {
        let data = RoomChain::new()
            .room(0, 128)
            .light(200)
            .special(13)
            .room(0, 128)
            .light(50)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        world.tick(&[]).unwrap();
        assert_eq!(lights(&world)[0], 50);
        for _ in 0..FASTDARK - 1 {
            world.tick(&[]).unwrap();
        }
        assert_eq!(lights(&world)[0], 50);
        world.tick(&[]).unwrap();
        assert_eq!(lights(&world)[0], 200);
        for _ in 0..STROBEBRIGHT {
            world.tick(&[]).unwrap();
        }
        assert_eq!(lights(&world)[0], 50);
    }

    #[test]
    fn test_lone_strobe_goes_fully_dark() {
        let data = RoomChain::new().room(0, 128).light(200).special(12).build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        world.tick(&[]).unwrap();
        assert_eq!(lights(&world)[0], 0);
    }

    #[test]
    fn test_flash_and_flicker_stay_in_bounds() {
        let data = RoomChain::new()
            .room(0, 128)
            .light(200)
            .special(1)
            .room(0, 128)
            .light(64)
            .room(0, 128)
            .light(192)
            .special(17)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        for _ in 0..300 {
            world.tick(&[]).unwrap();
            let l = lights(&world);
            assert!(l[0] == 200 || l[0] == 64, "flash at {}", l[0]);
            assert!((80..=192).contains(&l[2]), "flicker at {}", l[2]);
        }
    }

    #[test]
    fn test_light_triggers() {
        let data = RoomChain::new()
            .room(0, 128)
            .light(96)
            .wall_special(12, 5)
            .room(0, 128)
            .light(144)
            .tag(5)
            .room(0, 128)
            .light(208)
            .build();
        let mut world = World::from_data(&data, GameConfig::default()).unwrap();
        let line = RoomChain::north_wall(0);

        world
            .with_context(|ctx| {
                turn_tag_lights_off(ctx, line);
                Ok(())
            })
            .unwrap();
        assert_eq!(lights(&world)[1], 96);

        world
            .with_context(|ctx| {
                light_turn_on(ctx, line, 0);
                Ok(())
            })
            .unwrap();
        assert_eq!(lights(&world)[1], 208);

        world
            .with_context(|ctx| {
                light_turn_on(ctx, line, 35);
                Ok(())
            })
            .unwrap();
        assert_eq!(lights(&world)[1], 35);
    }
}
