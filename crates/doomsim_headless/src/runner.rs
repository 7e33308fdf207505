//! Running a level without a renderer and reporting what happened.

use std::collections::BTreeMap;
use std::path::Path;

use doomsim_core::config::GameConfig;
use doomsim_core::events::LevelExit;
pub use doomsim_core::hash::combine_hash;
use doomsim_core::input::TicCmd;
use doomsim_core::map::LevelData;
use doomsim_core::replay::Replay;
use doomsim_core::world::World;
use serde::{Deserialize, Serialize};

use crate::level_source::{LevelSourceError, Result};

/// Where a player ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerReport {
    /// Player slot.
    pub slot: usize,
    /// Health at the end of the run.
    pub health: i32,
    /// Position in whole map units, if the player has a body.
    pub position: Option<(i32, i32)>,
    /// Secret sectors found.
    pub secrets: i32,
}

/// Outcome of one run, written as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Level name.
    pub level: String,
    /// Tics run.
    pub tics: u64,
    /// Level time at the end, pauses excluded.
    pub level_time: u32,
    /// State hash after the last tic.
    pub final_hash: u64,
    /// Per-tic hashes folded together.
    pub running_hash: u64,
    /// How the level ended, if it did.
    pub exit: Option<String>,
    /// Tic on which the level ended.
    pub exit_tic: Option<u64>,
    /// Live thinkers at the end.
    pub thinkers: usize,
    /// Sounds started, by effect name.
    pub sounds: BTreeMap<String, u32>,
    /// Monsters, items and secrets counted at level start.
    pub totals: (i32, i32, i32),
    /// Players in the game.
    pub players: Vec<PlayerReport>,
}

impl RunReport {
    /// Write as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }
}

/// Write any report as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let io = |source| LevelSourceError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| io(std::io::Error::other(e)))?;
    std::fs::write(path, json).map_err(io)
}

/// What to run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The level.
    pub level: LevelData,
    /// Game settings.
    pub game: GameConfig,
    /// Commands per tic.
    pub commands: Vec<Vec<TicCmd>>,
    /// Stop as soon as the level exits.
    pub stop_on_exit: bool,
}

/// A finished run: the report and a replay of exactly the tics played.
#[derive(Debug)]
pub struct RunOutcome {
    /// Summary.
    pub report: RunReport,
    /// Recording of the run.
    pub replay: Replay,
    /// The world after the last tic.
    pub world: World,
}

/// Play a level to the end of its command script.
pub fn run_level(config: &RunConfig) -> Result<RunOutcome> {
    let mut world = World::from_data(&config.level, config.game.clone())?;
    let mut replay = Replay::new(config.level.clone(), config.game.clone());
    let mut running = world.state_hash();
    let mut sounds: BTreeMap<String, u32> = BTreeMap::new();
    let mut exit: Option<LevelExit> = None;
    let mut exit_tic = None;
    let mut tics = 0u64;

    for cmds in &config.commands {
        let events = world.tick(cmds)?;
        replay.record(cmds);
        tics += 1;
        running = combine_hash(running, world.state_hash());
        for sound in &events.sounds {
            *sounds.entry(format!("{:?}", sound.sfx)).or_default() += 1;
        }
        if let (None, Some(e)) = (exit, events.exit) {
            tracing::info!(tic = tics, exit = ?e, "level exited");
            exit = Some(e);
            exit_tic = Some(tics);
            if config.stop_on_exit {
                break;
            }
        }
    }

    let final_hash = world.state_hash();
    replay.finalize(final_hash);
    let state = world.level_state();
    let report = RunReport {
        level: config.level.name.clone(),
        tics,
        level_time: state.level_time,
        final_hash,
        running_hash: running,
        exit: exit.map(|e| format!("{e:?}")),
        exit_tic,
        thinkers: world.thinker_count(),
        sounds,
        totals: (state.total_kills, state.total_items, state.total_secrets),
        players: player_reports(&world),
    };
    Ok(RunOutcome { report, replay, world })
}

fn player_reports(world: &World) -> Vec<PlayerReport> {
    world
        .players()
        .iter()
        .enumerate()
        .filter(|(slot, _)| world.config().players_in_game[*slot])
        .map(|(slot, player)| PlayerReport {
            slot,
            health: player.health,
            position: player
                .mobj
                .and_then(|id| world.mobj(id))
                .map(|mobj| (mobj.x.floor(), mobj.y.floor())),
            secrets: player.secret_count,
        })
        .collect()
}

/// Static facts about a level after setup, for `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// Level name.
    pub name: String,
    /// Vertex count.
    pub vertices: usize,
    /// Line count.
    pub lines: usize,
    /// Lines with a special.
    pub special_lines: usize,
    /// Side count.
    pub sides: usize,
    /// Sector count.
    pub sectors: usize,
    /// Subsector count.
    pub subsectors: usize,
    /// Node count.
    pub nodes: usize,
    /// Editor things.
    pub things: usize,
    /// Thinkers after setup, by kind.
    pub thinkers: BTreeMap<String, usize>,
    /// Blockmap columns and rows.
    pub blockmap: (i32, i32),
    /// Monsters, items and secrets.
    pub totals: (i32, i32, i32),
    /// State hash at tic 0.
    pub initial_hash: u64,
}

/// Build a level and describe it.
pub fn inspect_level(level: &LevelData, game: &GameConfig) -> Result<LevelSummary> {
    let world = World::from_data(level, game.clone())?;
    let built = world.level();
    let mut thinkers: BTreeMap<String, usize> = BTreeMap::new();
    for (_, _, thinker) in world.thinkers().iter() {
        *thinkers.entry(thinker.kind_name().to_string()).or_default() += 1;
    }
    let state = world.level_state();
    Ok(LevelSummary {
        name: built.name.clone(),
        vertices: built.vertices.len(),
        lines: built.lines.len(),
        special_lines: built.lines.iter().filter(|l| l.special != 0).count(),
        sides: built.sides.len(),
        sectors: built.sectors.len(),
        subsectors: built.subsectors.len(),
        nodes: built.nodes.len(),
        things: built.things.len(),
        thinkers,
        blockmap: (world.blockmap().width(), world.blockmap().height()),
        totals: (state.total_kills, state.total_items, state.total_secrets),
        initial_hash: world.state_hash(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use doomsim_core::replay::ReplayPlayer;
    use doomsim_test_utils::determinism::{combine_hash as harness_combine, run_with_running_hash};
    use doomsim_test_utils::fixtures::{door_level, door_scenario, patrol_commands, RoomChain};

    fn run(commands: Vec<Vec<TicCmd>>) -> RunOutcome {
        run_level(&RunConfig {
            level: door_level(),
            game: GameConfig::default(),
            commands,
            stop_on_exit: true,
        })
        .unwrap()
    }

    #[test]
    fn test_running_hash_matches_harness() {
        assert_eq!(combine_hash(1, 2), harness_combine(1, 2));
        let outcome = run(patrol_commands(150));
        let trace = run_with_running_hash(&door_scenario(150)).unwrap();
        assert_eq!(outcome.report.running_hash, trace.running);
        assert_eq!(outcome.report.final_hash, *trace.per_tic.last().unwrap());
    }

    #[test]
    fn test_recorded_replay_verifies() {
        let outcome = run(patrol_commands(120));
        assert_eq!(outcome.replay.duration(), 120);
        assert!(ReplayPlayer::new(&outcome.replay).unwrap().verify().unwrap());
    }

    #[test]
    fn test_report_counts_level_contents() {
        let outcome = run(vec![vec![]; 5]);
        assert_eq!(outcome.report.tics, 5);
        assert_eq!(outcome.report.totals.0, 1);
        assert_eq!(outcome.report.players.len(), 1);
        assert_eq!(outcome.report.players[0].position, Some((64, 128)));
        assert_eq!(outcome.report.exit, None);
    }

    #[test]
    fn test_exit_stops_the_run() {
        let level = RoomChain::new()
            .room(0, 128)
            .player_start(64, 128, 0)
            .wall_special(11, 0)
            .build();
        // face north and press use against the exit switch
        let mut commands = vec![vec![TicCmd {
            angle_turn: 0x4000,
            ..TicCmd::default()
        }]];
        commands.extend(std::iter::repeat(vec![TicCmd::forward(50)]).take(30));
        commands.push(vec![TicCmd::use_line()]);
        commands.extend(std::iter::repeat(vec![]).take(10));
        let outcome = run_level(&RunConfig {
            level,
            game: GameConfig::default(),
            commands,
            stop_on_exit: true,
        })
        .unwrap();
        assert_eq!(outcome.report.exit.as_deref(), Some("Normal"));
        assert_eq!(outcome.report.exit_tic, Some(32));
        assert_eq!(outcome.report.tics, 32);
    }

    #[test]
    fn test_inspect_counts_thinkers() {
        let summary = inspect_level(&door_level(), &GameConfig::default()).unwrap();
        assert_eq!(summary.sectors, 3);
        assert_eq!(summary.special_lines, 1);
        assert_eq!(summary.thinkers.get("mobj"), Some(&3));
        assert_eq!(summary.thinkers.get("light_flash"), Some(&1));
        assert_eq!(summary.thinkers.get("glow"), Some(&1));
    }

    #[test]
    fn test_report_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let outcome = run(vec![vec![]; 3]);
        outcome.report.save(&path).unwrap();
        let loaded: RunReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, outcome.report);
    }
}
