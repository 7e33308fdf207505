//! The BSP tree: segs, subsectors and partition nodes.

use serde::{Deserialize, Serialize};

use crate::angle::Angle;
use crate::geometry::{BoundingBox, DivLine};
use crate::math::Fixed;

/// Child index bit marking a subsector rather than a node.
pub const NF_SUBSECTOR: u16 = 0x8000;

/// A piece of a line bounding one subsector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seg {
    /// Start vertex.
    pub v1: usize,
    /// End vertex.
    pub v2: usize,
    /// Distance along the line to the seg start.
    pub offset: Fixed,
    /// Direction of the seg.
    pub angle: Angle,
    /// Parent line.
    pub line: usize,
    /// Side of the parent line this seg runs along.
    pub side: usize,
    /// Sector in front.
    pub front_sector: usize,
    /// Sector behind, for segs of two-sided lines.
    pub back_sector: Option<usize>,
}

/// A convex leaf of the BSP tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsector {
    /// Sector the leaf belongs to, taken from its first seg.
    pub sector: usize,
    /// Seg count.
    pub num_segs: usize,
    /// First seg.
    pub first_seg: usize,
}

/// A partition node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// The partition line.
    pub partition: DivLine,
    /// Bounds of the front and back children.
    pub bbox: [BoundingBox; 2],
    /// Front and back children; [`NF_SUBSECTOR`] marks leaves.
    pub children: [u16; 2],
}

/// A decoded node child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    /// Another node.
    Node(usize),
    /// A leaf.
    Subsector(usize),
}

impl Child {
    /// Decode a raw child index.
    #[must_use]
    pub const fn decode(raw: u16) -> Self {
        if raw & NF_SUBSECTOR != 0 {
            Self::Subsector((raw & !NF_SUBSECTOR) as usize)
        } else {
            Self::Node(raw as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_decoding() {
        assert_eq!(Child::decode(3), Child::Node(3));
        assert_eq!(Child::decode(0x8000), Child::Subsector(0));
        assert_eq!(Child::decode(0x8005), Child::Subsector(5));
        assert_eq!(Child::decode(0x7FFF), Child::Node(0x7FFF));
    }
}
