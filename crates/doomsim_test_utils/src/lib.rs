//! # Doomsim Test Utilities
//!
//! Test support for the simulation crates:
//! - [`determinism`]: repeated, parallel and snapshot-split runs compared by
//!   state hash, plus proptest strategies for commands and fixed-point values
//! - [`fixtures`]: small hand-built levels and scripted player input
//!
//! `doomsim_core` only uses this crate from its `tests/` and `benches/`
//! targets; its inline unit tests build levels with
//! `doomsim_core::fixtures::RoomChain` directly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest so callers share one version.
pub use proptest;
