//! Error types for the simulation core.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for every fault the simulation can raise.
///
/// None of these are recoverable inside a tic: they propagate to whoever
/// drives the world.
#[derive(Debug, Error)]
pub enum SimError {
    /// Fixed-point division whose widened quotient does not fit in 32 bits.
    #[error("fixed-point division overflow: {numerator:#010x} / {denominator:#010x}")]
    FixedDivOverflow {
        /// Raw numerator bits.
        numerator: i32,
        /// Raw denominator bits.
        denominator: i32,
    },

    /// A lump whose size is not a multiple of its record size.
    #[error("malformed {lump} lump: {len} bytes is not a multiple of {record}")]
    MalformedLump {
        /// Lump name.
        lump: &'static str,
        /// Size in bytes.
        len: usize,
        /// Record size in bytes.
        record: usize,
    },

    /// Blockmap header or offsets point outside the lump.
    #[error("malformed blockmap: {0}")]
    MalformedBlockMap(String),

    /// Level data that refers to something that does not exist.
    #[error("{kind} {index} references missing {target} {target_index}")]
    InvalidReference {
        /// Kind of the referring record.
        kind: &'static str,
        /// Index of the referring record.
        index: usize,
        /// Kind of the referenced record.
        target: &'static str,
        /// Index that was out of range.
        target_index: usize,
    },

    /// A second mover was spawned on a sector that already has one.
    #[error("sector {0} already has an active special")]
    SectorBusy(usize),

    /// Manual door special on a line with no back side.
    #[error("door special {special} on one-sided line {line}")]
    OneSidedDoor {
        /// Line index.
        line: usize,
        /// Line special.
        special: u16,
    },

    /// A player is standing in a sector whose special has no behaviour.
    #[error("unknown special {special} in sector {sector}")]
    UnknownSectorSpecial {
        /// Sector index.
        sector: usize,
        /// Sector special.
        special: i16,
    },

    /// The active platform table is full.
    #[error("no more plats (limit {0})")]
    PlatLimit(usize),

    /// The switch button table is full.
    #[error("no button slots left (limit {0})")]
    ButtonLimit(usize),

    /// A snapshot taken on a different level.
    #[error("snapshot does not match level: {0}")]
    SnapshotMismatch(String),

    /// Invalid simulation state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Encoding or decoding failed.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
