//! End-to-end determinism tests.
//!
//! These drive whole levels through scripted input and check that runs,
//! replays and snapshot restores all land on the same state hash.

use doomsim_core::config::{GameConfig, Skill};
use doomsim_core::input::TicCmd;
use doomsim_core::replay::{Replay, ReplayPlayer};
use doomsim_core::world::World;
use doomsim_test_utils::determinism::strategies::arb_command_sequence;
use doomsim_test_utils::determinism::{
    find_first_divergence, run_parallel_scoped, run_with_running_hash, verify_determinism,
    verify_scenario_determinism, verify_snapshot_round_trip, Scenario,
};
use doomsim_test_utils::fixtures::{door_level, door_scenario, lift_level, patrol_commands};
use proptest::prelude::*;

// =============================================================================
// Repeated runs
// =============================================================================

#[test]
fn test_door_level_repeats() {
    verify_scenario_determinism(&door_scenario(350), 4)
        .unwrap()
        .assert_deterministic();
}

#[test]
fn test_lift_level_repeats_on_every_skill() {
    for skill in [Skill::Baby, Skill::Medium, Skill::Nightmare] {
        let scenario = Scenario::new(
            lift_level(),
            GameConfig::default().with_skill(skill),
            patrol_commands(280),
        );
        verify_scenario_determinism(&scenario, 3)
            .unwrap()
            .assert_deterministic();
    }
}

#[test]
fn test_idle_world_repeats() {
    let level = door_level();
    verify_determinism(
        3,
        200,
        || World::from_data(&level, GameConfig::default()).unwrap(),
        |world, _| {
            world.tick(&[]).unwrap();
        },
        World::state_hash,
    )
    .assert_deterministic();
}

#[test]
fn test_parallel_worlds_agree() {
    run_parallel_scoped(&door_scenario(210), 4)
        .unwrap()
        .assert_deterministic();
}

// =============================================================================
// Divergence
// =============================================================================

#[test]
fn test_identical_scripts_never_diverge() {
    assert_eq!(
        find_first_divergence(&door_scenario(140), &door_scenario(140), 140).unwrap(),
        None
    );
}

#[test]
fn test_input_change_diverges_on_that_tic() {
    let a = door_scenario(60);
    let mut commands = patrol_commands(60);
    commands[5] = vec![TicCmd::forward(50)];
    let b = Scenario::new(door_level(), GameConfig::default(), commands);
    assert_eq!(find_first_divergence(&a, &b, 60).unwrap(), Some(6));
}

#[test]
fn test_different_levels_differ_at_start() {
    let a = door_scenario(10);
    let b = Scenario::new(lift_level(), GameConfig::default(), patrol_commands(10));
    assert_eq!(find_first_divergence(&a, &b, 10).unwrap(), Some(0));
}

// =============================================================================
// Snapshots and replays
// =============================================================================

#[test]
fn test_snapshot_round_trip_at_several_points() {
    let scenario = door_scenario(280);
    for split in [0, 1, 21, 35, 70, 200] {
        assert!(
            verify_snapshot_round_trip(&scenario, split).unwrap(),
            "snapshot at tic {split} diverged"
        );
    }
}

#[test]
fn test_replay_matches_running_hash() {
    let scenario = door_scenario(175);
    let trace = run_with_running_hash(&scenario).unwrap();
    let replay = Replay::record_run(
        scenario.level.clone(),
        scenario.config.clone(),
        scenario.commands.clone(),
    )
    .unwrap();
    assert_eq!(Some(&replay.final_hash), trace.per_tic.last());

    let bytes = replay.to_bytes().unwrap();
    let loaded = Replay::from_bytes(&bytes).unwrap();
    assert!(ReplayPlayer::new(&loaded).unwrap().verify().unwrap());
}

// =============================================================================
// Property tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn test_random_input_is_deterministic(commands in arb_command_sequence(90)) {
        let scenario = Scenario::new(door_level(), GameConfig::default(), commands);
        let first = run_with_running_hash(&scenario).unwrap();
        let second = run_with_running_hash(&scenario).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_random_input_snapshot_round_trip(
        commands in arb_command_sequence(80),
        split in 0u64..80,
    ) {
        let scenario = Scenario::new(lift_level(), GameConfig::default(), commands);
        let split = split.min(scenario.tics());
        prop_assert!(verify_snapshot_round_trip(&scenario, split).unwrap());
    }
}
