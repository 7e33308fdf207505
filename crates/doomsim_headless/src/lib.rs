//! Headless level runner for determinism checks and CI verification.
//!
//! This crate drives a `doomsim_core` world without a renderer or audio:
//!
//! - **Run**: play a level against a scripted input, report the outcome
//!   as JSON and optionally record a replay
//! - **Verify**: play the same script many times in parallel and check
//!   every run hashes identically
//! - **Replay**: play back a recorded replay and check its final hash
//! - **Inspect**: describe a level as built
//!
//! # Files
//!
//! - Levels: RON [`LevelData`](doomsim_core::map::LevelData) or a
//!   directory of raw map lumps
//! - Settings: RON [`GameConfig`](doomsim_core::config::GameConfig)
//! - Input: RON [`InputScript`](level_source::InputScript)
//! - Replays: bincode
//! - Reports: JSON on stdout, logs on stderr
//!
//! # Example
//!
//! ```bash
//! cargo run -p doomsim_headless -- run --level e1m1.ron --input walk.ron --record walk.replay
//! cargo run -p doomsim_headless -- verify --level e1m1.ron --input walk.ron --runs 8
//! cargo run -p doomsim_headless -- replay --file walk.replay --verify
//! ```

pub mod batch;
pub mod level_source;
pub mod runner;

pub use batch::{verify_runs, VerifyConfig, VerifyReport};
pub use level_source::{load_config, load_input, load_level, InputScript, InputStep, LevelSourceError};
pub use runner::{inspect_level, run_level, LevelSummary, RunConfig, RunOutcome, RunReport};
