//! Lines and the sides that face into sectors.

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, DivLine, SlopeType};
use crate::math::Fixed;

/// `ML_*` line flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineFlags(pub u16);

impl LineFlags {
    /// Blocks players and monsters.
    pub const BLOCKING: u16 = 1;
    /// Blocks monsters only.
    pub const BLOCK_MONSTERS: u16 = 2;
    /// Has a back side.
    pub const TWO_SIDED: u16 = 4;
    /// Upper texture pegged to the top.
    pub const DONT_PEG_TOP: u16 = 8;
    /// Lower texture pegged to the bottom.
    pub const DONT_PEG_BOTTOM: u16 = 16;
    /// Shown as one-sided on the automap; monsters cannot use it.
    pub const SECRET: u16 = 32;
    /// Blocks sound propagation.
    pub const SOUND_BLOCK: u16 = 64;
    /// Never drawn on the automap.
    pub const DONT_DRAW: u16 = 128;
    /// Drawn on the automap from the start.
    pub const MAPPED: u16 = 256;

    /// Whether every bit of `bits` is set.
    #[must_use]
    pub const fn contains(self, bits: u16) -> bool {
        self.0 & bits == bits
    }

    /// Whether any bit of `bits` is set.
    #[must_use]
    pub const fn intersects(self, bits: u16) -> bool {
        self.0 & bits != 0
    }
}

/// A texture side of a line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideDef {
    /// Horizontal texture offset; scrolling walls advance it.
    pub texture_offset: Fixed,
    /// Vertical texture offset.
    pub row_offset: Fixed,
    /// Upper texture, 0 for none.
    pub top_texture: usize,
    /// Lower texture, 0 for none.
    pub bottom_texture: usize,
    /// Middle texture, 0 for none.
    pub mid_texture: usize,
    /// Sector the side faces.
    pub sector: usize,
}

/// A map line, with the values derived from its vertices at load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDef {
    /// Start vertex.
    pub v1: usize,
    /// End vertex.
    pub v2: usize,
    /// Start point, copied from `v1`.
    pub x: Fixed,
    /// Start point, copied from `v1`.
    pub y: Fixed,
    /// `v2.x - v1.x`.
    pub dx: Fixed,
    /// `v2.y - v1.y`.
    pub dy: Fixed,
    /// Flag bits.
    pub flags: LineFlags,
    /// Special action, cleared by one-shot triggers.
    pub special: u16,
    /// Sector tag the special acts on.
    pub tag: i16,
    /// Right-hand side; every line has one.
    pub front_side: usize,
    /// Left-hand side.
    pub back_side: Option<usize>,
    /// Sector of the front side.
    pub front_sector: usize,
    /// Sector of the back side.
    pub back_sector: Option<usize>,
    /// Bounds of the two vertices.
    pub bbox: BoundingBox,
    /// Slope category for box tests.
    pub slope: SlopeType,
    /// Point sounds made by this line come from (its midpoint).
    pub sound_origin: (Fixed, Fixed),
}

impl LineDef {
    /// The line as origin plus direction.
    #[must_use]
    pub const fn div_line(&self) -> DivLine {
        DivLine {
            x: self.x,
            y: self.y,
            dx: self.dx,
            dy: self.dy,
        }
    }

    /// Sector on the requested side (0 front, 1 back).
    #[must_use]
    pub fn sector_on(&self, side: usize) -> Option<usize> {
        if side == 0 {
            Some(self.front_sector)
        } else {
            self.back_sector
        }
    }

    /// Side index on the requested side (0 front, 1 back).
    #[must_use]
    pub fn side_on(&self, side: usize) -> Option<usize> {
        if side == 0 {
            Some(self.front_side)
        } else {
            self.back_side
        }
    }

    /// Whether the two-sided flag is set.
    #[must_use]
    pub const fn is_two_sided(&self) -> bool {
        self.flags.contains(LineFlags::TWO_SIDED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_bits() {
        let flags = LineFlags(LineFlags::TWO_SIDED | LineFlags::SECRET);
        assert!(flags.contains(LineFlags::TWO_SIDED));
        assert!(flags.contains(LineFlags::TWO_SIDED | LineFlags::SECRET));
        assert!(!flags.contains(LineFlags::SECRET | LineFlags::BLOCKING));
        assert!(flags.intersects(LineFlags::SECRET | LineFlags::BLOCKING));
        assert!(!flags.intersects(LineFlags::BLOCKING | LineFlags::MAPPED));
        assert!(!flags.contains(LineFlags::BLOCKING));
    }
}
