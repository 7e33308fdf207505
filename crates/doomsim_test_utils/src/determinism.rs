//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the world produces identical
//! results given identical level data, settings and commands.
//!
//! # Testing Strategy
//!
//! Replays and snapshots only work if the world is 100% deterministic.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`doomsim_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The thinker list, sector lists and blockmap cells are all ordered.
//!
//! - **System randomness**: The world draws from its own table-driven
//!   generator and nothing else.
//!
//! - **Handle values**: Thinker handles depend on slot reuse, so hashes and
//!   snapshots refer to thinkers by list position instead.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual specials and movement (in `doomsim_core`)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Scripted runs, replays and snapshots are reproducible
//! 4. **Parallel tests**: Running N worlds in parallel all match

use std::hash::{Hash, Hasher};
use std::thread;

use doomsim_core::config::GameConfig;
use doomsim_core::error::{Result, SimError};
use doomsim_core::hash::StateHasher;
use doomsim_core::input::TicCmd;
use doomsim_core::map::LevelData;
use doomsim_core::snapshot::Snapshot;
use doomsim_core::world::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of tics simulated.
    pub tics: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the world was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "World is non-deterministic!\n\
                 Runs: {}\n\
                 Tics: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.tics,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Running hash from each world.
    pub hashes: Vec<u64>,
    /// Number of tics each world ran.
    pub tics: u64,
    /// Number of worlds run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all worlds produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all worlds matched.
    ///
    /// # Panics
    ///
    /// Panics if the worlds produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel worlds diverged!\n\
                 Worlds: {}\n\
                 Tics: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.tics,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// A level, its settings and a command vector per tic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Level to build.
    pub level: LevelData,
    /// Game settings.
    pub config: GameConfig,
    /// Commands per tic.
    pub commands: Vec<Vec<TicCmd>>,
}

impl Scenario {
    /// Bundle a scenario.
    #[must_use]
    pub fn new(level: LevelData, config: GameConfig, commands: Vec<Vec<TicCmd>>) -> Self {
        Self { level, config, commands }
    }

    /// A fresh world at tic 0.
    pub fn world(&self) -> Result<World> {
        World::from_data(&self.level, self.config.clone())
    }

    /// Number of scripted tics.
    #[must_use]
    pub fn tics(&self) -> u64 {
        self.commands.len() as u64
    }

    /// Commands for `tic`; no input past the end of the script.
    #[must_use]
    pub fn cmds(&self, tic: u64) -> &[TicCmd] {
        usize::try_from(tic)
            .ok()
            .and_then(|t| self.commands.get(t))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Per-tic hashes of a run and the running hash combining them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTrace {
    /// State hash after each tic.
    pub per_tic: Vec<u64>,
    /// Every per-tic hash folded together in order.
    pub running: u64,
}

pub use doomsim_core::hash::combine_hash;

/// Run a scenario to the end, hashing after every tic.
pub fn run_with_running_hash(scenario: &Scenario) -> Result<HashTrace> {
    let mut world = scenario.world()?;
    let mut running = world.state_hash();
    let mut per_tic = Vec::with_capacity(scenario.commands.len());
    for cmds in &scenario.commands {
        world.tick(cmds)?;
        let hash = world.state_hash();
        running = combine_hash(running, hash);
        per_tic.push(hash);
    }
    Ok(HashTrace { per_tic, running })
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `tics` - Number of tics to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance by one tic
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use doomsim_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 tics each
///     || World::from_data(&level, GameConfig::default()).unwrap(),
///     |world, _| { world.tick(&[]).unwrap(); },
///     World::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    tics: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for tic in 0..tics {
            step(&mut state, tic);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        tics,
    }
}

/// Run a scenario `runs` times and compare the running hashes.
pub fn verify_scenario_determinism(scenario: &Scenario, runs: usize) -> Result<DeterminismResult> {
    let hashes = (0..runs)
        .map(|_| run_with_running_hash(scenario).map(|trace| trace.running))
        .collect::<Result<Vec<_>>>()?;
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    Ok(DeterminismResult {
        is_deterministic,
        hashes,
        tics: scenario.tics(),
    })
}

/// Run a scenario `num_sims` times on scoped threads and collect the
/// running hashes.
pub fn run_parallel_scoped(scenario: &Scenario, num_sims: usize) -> Result<ParallelSimResult> {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| s.spawn(|| run_with_running_hash(scenario).map(|trace| trace.running)))
            .collect();

        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .map_err(|_| SimError::InvalidState("world thread panicked".into()))?
            })
            .collect::<Result<Vec<_>>>()
    })?;

    Ok(ParallelSimResult {
        hashes,
        tics: scenario.tics(),
        num_sims,
    })
}

/// Compare two scenarios tic by tic, finding the first divergence.
///
/// Useful for debugging non-determinism by finding exactly when two runs
/// start to differ, or for finding the tic at which an input change
/// first has an effect.
///
/// # Returns
///
/// `None` if the runs match for `tics` tics, `Some(0)` if they already
/// differ before the first tic, `Some(n)` if they differ after tic `n`.
pub fn find_first_divergence(a: &Scenario, b: &Scenario, tics: u64) -> Result<Option<u64>> {
    let mut world_a = a.world()?;
    let mut world_b = b.world()?;

    // Check initial state
    if world_a.state_hash() != world_b.state_hash() {
        return Ok(Some(0));
    }

    for tic in 1..=tics {
        world_a.tick(a.cmds(tic - 1))?;
        world_b.tick(b.cmds(tic - 1))?;

        if world_a.state_hash() != world_b.state_hash() {
            tracing::debug!(tic, "runs diverged");
            return Ok(Some(tic));
        }
    }

    Ok(None)
}

/// Verify that a snapshot round trip preserves the world exactly.
///
/// Runs `split` tics, encodes a snapshot, restores it onto a freshly built
/// world and then runs the rest of the script on both. The restored world
/// must match the original immediately and at the end.
pub fn verify_snapshot_round_trip(scenario: &Scenario, split: u64) -> Result<bool> {
    let mut world = scenario.world()?;
    for tic in 0..split {
        world.tick(scenario.cmds(tic))?;
    }

    let bytes = world.snapshot().to_bytes()?;
    let mut restored = scenario.world()?;
    restored.restore(&Snapshot::from_bytes(&bytes)?)?;
    if restored.state_hash() != world.state_hash() {
        return Ok(false);
    }

    for tic in split..scenario.tics() {
        world.tick(scenario.cmds(tic))?;
        restored.tick(scenario.cmds(tic))?;
    }

    Ok(restored.state_hash() == world.state_hash())
}

/// Hash any hashable value with the platform-stable state hasher.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = StateHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of world determinism.
pub mod strategies {
    use doomsim_core::input::{TicCmd, BT_USE};
    use doomsim_core::math::Fixed;
    use proptest::prelude::*;

    /// Any fixed-point number.
    pub fn arb_fixed() -> impl Strategy<Value = Fixed> {
        any::<i32>().prop_map(Fixed::from_bits)
    }

    /// A fixed-point number of at most `limit` whole units either way.
    pub fn arb_fixed_within(limit: i32) -> impl Strategy<Value = Fixed> {
        (-limit..=limit, 0i32..0x10000).prop_map(|(whole, frac)| Fixed::from_bits((whole << 16) | frac))
    }

    /// One player command. Special actions are left out, so a sequence
    /// never pauses the game.
    pub fn arb_ticcmd() -> impl Strategy<Value = TicCmd> {
        (-50i8..=50, -40i8..=40, any::<i16>(), any::<bool>()).prop_map(
            |(forward_move, side_move, angle_turn, use_line)| TicCmd {
                forward_move,
                side_move,
                angle_turn,
                buttons: if use_line { BT_USE } else { 0 },
            },
        )
    }

    /// A single-player command script.
    pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<Vec<TicCmd>>> {
        proptest::collection::vec(arb_ticcmd().prop_map(|cmd| vec![cmd]), 0..max_len)
    }

    /// Floor and ceiling heights of an open room.
    pub fn arb_room_heights() -> impl Strategy<Value = (i16, i16)> {
        (-64i16..=64, 72i16..=256).prop_map(|(floor, gap)| (floor, floor + gap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{door_scenario, lift_level, patrol_commands, RoomChain};
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n, _| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_door_scenario_is_deterministic() {
        verify_scenario_determinism(&door_scenario(350), 3)
            .unwrap()
            .assert_deterministic();
    }

    #[test]
    fn test_lift_scenario_is_deterministic() {
        let scenario = Scenario::new(lift_level(), GameConfig::default(), patrol_commands(280));
        verify_scenario_determinism(&scenario, 2)
            .unwrap()
            .assert_deterministic();
    }

    #[test]
    fn test_running_hash_depends_on_every_tic() {
        let trace = run_with_running_hash(&door_scenario(100)).unwrap();
        assert_eq!(trace.per_tic.len(), 100);
        let mut shorter = door_scenario(100);
        shorter.commands.truncate(99);
        assert_ne!(run_with_running_hash(&shorter).unwrap().running, trace.running);
    }

    #[test]
    fn test_compute_hash_is_width_independent() {
        assert_eq!(compute_hash(&7usize), compute_hash(&7u64));
        assert_eq!(compute_hash(&(1u64, 2u64)), combine_hash(1, 2));
        assert_eq!(combine_hash(1, 2), 0x7717_9803_63c8_e066);
    }

    #[test]
    fn test_find_divergence_on_identical_runs() {
        let scenario = door_scenario(120);
        assert_eq!(find_first_divergence(&scenario, &scenario, 120).unwrap(), None);
    }

    #[test]
    fn test_find_divergence_at_changed_input() {
        let a = door_scenario(60);
        let mut b = a.clone();
        b.commands[30] = vec![TicCmd {
            angle_turn: 4096,
            ..TicCmd::default()
        }];
        assert_eq!(find_first_divergence(&a, &b, 60).unwrap(), Some(31));
    }

    #[test]
    fn test_find_divergence_on_different_levels() {
        let a = door_scenario(10);
        let b = Scenario::new(lift_level(), GameConfig::default(), a.commands.clone());
        assert_eq!(find_first_divergence(&a, &b, 10).unwrap(), Some(0));
    }

    // =========================================================================
    // Snapshot round-trip tests
    // =========================================================================

    #[test]
    fn test_snapshot_round_trip_at_start() {
        assert!(verify_snapshot_round_trip(&door_scenario(100), 0).unwrap());
    }

    #[test]
    fn test_snapshot_round_trip_mid_door() {
        // the door is moving at tic 30
        assert!(verify_snapshot_round_trip(&door_scenario(300), 30).unwrap());
    }

    // =========================================================================
    // Parallel runs
    // =========================================================================

    #[test]
    fn test_parallel_worlds_match() {
        let result = run_parallel_scoped(&door_scenario(200), 4).unwrap();
        assert_eq!(result.hashes.len(), 4);
        result.assert_deterministic();
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Any command script replays to the same running hash.
        #[test]
        fn prop_command_sequences_are_replayable(
            commands in strategies::arb_command_sequence(120),
        ) {
            let scenario = Scenario::new(crate::fixtures::door_level(), GameConfig::default(), commands);
            let result = verify_scenario_determinism(&scenario, 2).unwrap();
            prop_assert!(result.is_deterministic);
        }

        /// Snapshots taken at any point restore exactly.
        #[test]
        fn prop_snapshot_round_trip_is_exact(
            commands in strategies::arb_command_sequence(150),
            split in 0u64..150,
        ) {
            let scenario = Scenario::new(crate::fixtures::door_level(), GameConfig::default(), commands);
            let split = split.min(scenario.tics());
            prop_assert!(verify_snapshot_round_trip(&scenario, split).unwrap());
        }

        /// Rooms of any height build and run deterministically.
        #[test]
        fn prop_room_heights_are_deterministic(
            (floor, ceiling) in strategies::arb_room_heights(),
            commands in strategies::arb_command_sequence(60),
        ) {
            let level = RoomChain::new()
                .room(floor, ceiling)
                .player_start(64, 128, 0)
                .room(floor, ceiling)
                .build();
            let scenario = Scenario::new(level, GameConfig::default(), commands);
            let result = verify_scenario_determinism(&scenario, 2).unwrap();
            prop_assert!(result.is_deterministic);
        }
    }

    // =========================================================================
    // Stress tests (only run explicitly with --ignored)
    // =========================================================================

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_long_patrol() {
        verify_scenario_determinism(&door_scenario(35 * 60 * 5), 3)
            .unwrap()
            .assert_deterministic();
    }

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_parallel_many_worlds() {
        run_parallel_scoped(&door_scenario(35 * 60), 16)
            .unwrap()
            .assert_deterministic();
    }
}
