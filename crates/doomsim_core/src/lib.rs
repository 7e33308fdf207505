//! # Doomsim Core
//!
//! Deterministic simulation core for a classic 2.5D shooter level.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No audio (sounds are reported as events)
//! - No IO beyond replay files
//! - No system randomness (one table-driven generator per world)
//! - No floating-point math in the simulation (16.16 fixed-point)
//!
//! Identical level data, settings and per-tic commands produce identical
//! worlds, tic for tic. That is what replays, snapshots and the headless
//! determinism checks build on.
//!
//! ## Crate Structure
//!
//! - [`math`], [`angle`], [`trig`], [`tables`] - fixed-point numbers and angles
//! - [`geometry`], [`collision`], [`traverse`] - line tests and traces
//! - [`map`], [`blockmap`] - level geometry and the spatial grid
//! - [`thinker`] - the ordered list of everything that runs each tic
//! - [`mobj`], [`player`] - map objects and the players driving them
//! - [`specials`] - doors, lifts, floors, ceilings, lights and switches
//! - [`world`], [`hash`] - the world, its tic and its platform-stable state hash
//! - [`snapshot`], [`replay`] - saving, restoring and replaying worlds
//! - [`fixtures`] - synthetic levels for tests and benchmarks

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod angle;
pub mod blockmap;
pub mod collision;
pub mod config;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod geometry;
pub mod hash;
pub mod input;
pub mod map;
pub mod math;
pub mod mobj;
pub mod player;
pub mod random;
pub mod replay;
pub mod snapshot;
pub mod specials;
pub mod tables;
pub mod thinker;
pub mod traverse;
pub mod trig;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::angle::Angle;
    pub use crate::config::{GameConfig, GameMode, Skill, MAXPLAYERS};
    pub use crate::error::{Result, SimError};
    pub use crate::events::{LevelExit, Sfx, SoundEvent, SoundOrigin, TickEvents};
    pub use crate::input::TicCmd;
    pub use crate::map::{Level, LevelData, MapThing};
    pub use crate::math::{Fixed, FRACUNIT};
    pub use crate::mobj::Mobj;
    pub use crate::player::{Player, PlayerState};
    pub use crate::random::Rng;
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::snapshot::Snapshot;
    pub use crate::thinker::{ThinkerId, ThinkerState, Thinkers};
    pub use crate::world::{LevelState, SimContext, Thinker, World};
}
