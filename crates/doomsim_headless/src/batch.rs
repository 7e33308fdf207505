//! Parallel determinism verification.
//!
//! Runs the same level and script many times on the rayon pool and checks
//! that every run produced the same per-tic hashes.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::level_source::Result;
use crate::runner::{combine_hash, RunConfig};
use doomsim_core::world::World;

/// Configuration for a verification batch.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// What to run.
    pub run: RunConfig,
    /// Number of runs.
    pub runs: u32,
    /// Maximum parallel runs (0 = use rayon default)
    pub parallel: usize,
}

/// Hashes of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHashes {
    /// Run number.
    pub run: u32,
    /// State hash after each tic.
    pub per_tic: Vec<u64>,
    /// Per-tic hashes folded together.
    pub running: u64,
}

/// Results from a verification batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Level name.
    pub level: String,
    /// Tics per run.
    pub tics: u64,
    /// Runs completed.
    pub runs: u32,
    /// Running hash of each run, in run order.
    pub running_hashes: Vec<u64>,
    /// Whether every run matched the first.
    pub deterministic: bool,
    /// First tic (1-based) at which some run left the first run's path.
    pub first_divergence: Option<u64>,
}

fn run_once(config: &RunConfig, run: u32) -> Result<RunHashes> {
    let mut world = World::from_data(&config.level, config.game.clone())?;
    let mut running = world.state_hash();
    let mut per_tic = Vec::with_capacity(config.commands.len());
    for cmds in &config.commands {
        world.tick(cmds)?;
        let hash = world.state_hash();
        running = combine_hash(running, hash);
        per_tic.push(hash);
    }
    debug!(run, running, "verification run finished");
    Ok(RunHashes { run, per_tic, running })
}

/// First tic at which `other` differs from `reference`.
fn divergence(reference: &RunHashes, other: &RunHashes) -> Option<u64> {
    reference
        .per_tic
        .iter()
        .zip(&other.per_tic)
        .position(|(a, b)| a != b)
        .map(|i| i as u64 + 1)
}

/// Run the level `runs` times in parallel and compare.
pub fn verify_runs(config: &VerifyConfig) -> Result<VerifyReport> {
    let runs = config.runs.max(1);
    info!(
        level = %config.run.level.name,
        runs,
        tics = config.run.commands.len(),
        parallel = config.parallel,
        "verifying determinism"
    );

    let execute = || -> Result<Vec<RunHashes>> {
        (0..runs)
            .into_par_iter()
            .map(|run| run_once(&config.run, run))
            .collect()
    };
    let results = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new().num_threads(config.parallel).build() {
            Ok(pool) => pool.install(execute)?,
            Err(e) => {
                warn!(error = %e, "failed to build thread pool, using the global one");
                execute()?
            }
        }
    } else {
        execute()?
    };

    let reference = &results[0];
    let first_divergence = results.iter().skip(1).filter_map(|r| divergence(reference, r)).min();
    let deterministic = first_divergence.is_none() && results.iter().all(|r| r.running == reference.running);
    if !deterministic {
        warn!(first_divergence, "runs diverged");
    }

    Ok(VerifyReport {
        level: config.run.level.name.clone(),
        tics: config.run.commands.len() as u64,
        runs,
        running_hashes: results.iter().map(|r| r.running).collect(),
        deterministic,
        first_divergence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use doomsim_core::config::GameConfig;
    use doomsim_test_utils::fixtures::{door_level, lift_level, patrol_commands};

    fn config(level: doomsim_core::map::LevelData, runs: u32, parallel: usize) -> VerifyConfig {
        VerifyConfig {
            run: RunConfig {
                level,
                game: GameConfig::default(),
                commands: patrol_commands(200),
                stop_on_exit: false,
            },
            runs,
            parallel,
        }
    }

    #[test]
    fn test_parallel_runs_agree() {
        let report = verify_runs(&config(door_level(), 6, 0)).unwrap();
        assert!(report.deterministic);
        assert_eq!(report.running_hashes.len(), 6);
        assert_eq!(report.first_divergence, None);
    }

    #[test]
    fn test_fixed_pool_size() {
        let report = verify_runs(&config(lift_level(), 3, 2)).unwrap();
        assert!(report.deterministic);
        assert_eq!(report.tics, 200);
    }

    #[test]
    fn test_zero_runs_means_one() {
        let report = verify_runs(&config(door_level(), 0, 0)).unwrap();
        assert_eq!(report.runs, 1);
    }

    #[test]
    fn test_divergence_is_one_based() {
        let a = RunHashes {
            run: 0,
            per_tic: vec![1, 2, 3],
            running: 0,
        };
        let b = RunHashes {
            run: 1,
            per_tic: vec![1, 9, 3],
            running: 0,
        };
        assert_eq!(divergence(&a, &b), Some(2));
        assert_eq!(divergence(&a, &a), None);
    }
}
