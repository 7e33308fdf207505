//! Table-driven trigonometry.
//!
//! Fine angles are `angle >> 19`, 8192 steps per turn. The sine table runs
//! for a turn and a quarter so cosine is a read at a quarter-turn offset.
//! The tangent table covers -90..+90 degrees and is indexed by the angle
//! biased by +90 degrees.

use crate::angle::{Angle, ANG90};
use crate::math::Fixed;
use crate::tables::{FINE_SINE, FINE_TANGENT, TAN_TO_ANGLE};

/// Fine angles per turn.
pub const FINEANGLES: usize = 8192;
/// Mask for wrapping a fine index.
pub const FINEMASK: usize = FINEANGLES - 1;
/// Entries in the inverse tangent table, minus one.
pub const SLOPERANGE: u32 = 2048;
/// Bits of slope precision.
pub const SLOPEBITS: u32 = 11;
/// `FRACBITS - SLOPEBITS`.
pub const DBITS: u32 = 16 - SLOPEBITS;

/// Sine of a fine angle. `fine` must be below 10240.
#[must_use]
pub fn fine_sine(fine: usize) -> Fixed {
    Fixed::from_bits(FINE_SINE[fine])
}

/// Cosine of a fine angle. `fine` must be below 8192.
#[must_use]
pub fn fine_cosine(fine: usize) -> Fixed {
    Fixed::from_bits(FINE_SINE[fine + FINEANGLES / 4])
}

/// Tangent of a fine angle already biased by +90 degrees.
#[must_use]
pub fn fine_tangent(fine: usize) -> Fixed {
    Fixed::from_bits(FINE_TANGENT[fine & (FINEANGLES / 2 - 1)])
}

/// Angle whose tangent is `slope / 2048`, for `slope` in `0..=2048`.
#[must_use]
pub fn tan_to_angle(slope: usize) -> Angle {
    Angle::from_bits(TAN_TO_ANGLE[slope.min(SLOPERANGE as usize)])
}

/// The lossy slope ratio used by point-to-angle.
///
/// `den < 512` short-circuits to the maximum slope.
#[must_use]
pub fn slope_div(num: u32, den: u32) -> usize {
    if den < 512 {
        return SLOPERANGE as usize;
    }
    let ans = (num << 3) / (den >> 8);
    ans.min(SLOPERANGE) as usize
}

impl Angle {
    /// Sine through the fine table.
    #[must_use]
    pub fn sin(self) -> Fixed {
        fine_sine(self.fine())
    }

    /// Cosine through the fine table.
    #[must_use]
    pub fn cos(self) -> Fixed {
        fine_cosine(self.fine())
    }

    /// Tangent through the fine table.
    #[must_use]
    pub fn tan(self) -> Fixed {
        fine_tangent(Angle::from_bits(self.to_bits().wrapping_add(ANG90)).fine())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::FRACUNIT;

    #[test]
    fn test_table_edges() {
        assert_eq!(fine_sine(0).to_bits(), 25);
        assert_eq!(fine_sine(2047).to_bits(), 65535);
        assert_eq!(fine_sine(4096).to_bits(), -25);
        assert_eq!(fine_cosine(0).to_bits(), 65535);
        assert_eq!(fine_cosine(FINEMASK).to_bits(), 65535);
        assert_eq!(tan_to_angle(0), Angle::ZERO);
        assert_eq!(tan_to_angle(2048).to_bits(), 0x2000_0000);
    }

    #[test]
    fn test_quarter_turn_alias() {
        for fine in (0..FINEANGLES).step_by(97) {
            assert_eq!(fine_cosine(fine), fine_sine(fine + FINEANGLES / 4));
        }
    }

    #[test]
    fn test_sine_is_odd_around_half_turn() {
        // single precision leaves a handful of entries one unit apart
        for fine in 0..FINEANGLES / 2 {
            let a = fine_sine(fine).to_bits();
            let b = fine_sine(fine + FINEANGLES / 2).to_bits();
            assert!((a + b).abs() <= 1, "fine {fine}: {a} vs {b}");
        }
    }

    #[test]
    fn test_tangent_biasing() {
        // tan(0) sits just past the middle of the table
        assert_eq!(Angle::ZERO.tan().to_bits(), 25);
        assert!(Angle::A45.tan().to_bits() > FRACUNIT - 64);
        assert!(Angle::A45.tan().to_bits() < FRACUNIT + 64);
        // period of 180 degrees
        assert_eq!(Angle::A180.tan(), Angle::ZERO.tan());
    }

    #[test]
    fn test_inverse_tangent_is_monotonic() {
        for slope in 1..=SLOPERANGE as usize {
            assert!(tan_to_angle(slope) >= tan_to_angle(slope - 1));
        }
    }

    #[test]
    fn test_slope_div() {
        assert_eq!(slope_div(100, 511), 2048);
        assert_eq!(slope_div(1 << 16, 1 << 16), 2048);
        assert_eq!(slope_div(1 << 15, 1 << 16), 1024);
        assert_eq!(slope_div(0, 1 << 16), 0);
    }

    #[test]
    fn test_angle_trig() {
        assert_eq!(Angle::A90.sin(), fine_sine(2048));
        assert_eq!(Angle::A90.cos().to_bits(), -25);
        assert_eq!(Angle::ZERO.cos().to_bits(), 65535);
    }
}
