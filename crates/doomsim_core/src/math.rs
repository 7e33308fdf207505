//! Fixed-point math for the deterministic simulation.
//!
//! Every distance, height, speed and momentum in the world is a 16.16
//! fixed-point number stored in an `i32`. The arithmetic below reproduces
//! the native 32-bit behaviour bit for bit: addition and subtraction wrap,
//! multiplication widens to 64 bits and truncates after the shift, and
//! division saturates on the cheap overflow test before falling back to a
//! widened divide.
//!
//! Conversions to and from floating point (used only by tooling and tests)
//! go through [`fixed::types::I16F16`], which shares the bit layout.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Shl, Shr, Sub, SubAssign};

use fixed::types::I16F16;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Number of fractional bits.
pub const FRACBITS: u32 = 16;

/// `1.0` as raw bits.
pub const FRACUNIT: i32 = 1 << FRACBITS;

/// A 16.16 fixed-point number.
///
/// Serialized as its raw bit pattern so snapshots round-trip exactly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fixed(i32);

impl Fixed {
    /// Zero.
    pub const ZERO: Self = Self(0);
    /// One map unit.
    pub const ONE: Self = Self(FRACUNIT);
    /// Largest representable value.
    pub const MAX: Self = Self(i32::MAX);
    /// Smallest representable value.
    pub const MIN: Self = Self(i32::MIN);

    /// Wrap raw 16.16 bits.
    #[must_use]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Raw 16.16 bits.
    #[must_use]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Whole map units, wrapping like `n << 16`.
    #[must_use]
    pub const fn from_int(n: i32) -> Self {
        Self(n.wrapping_shl(FRACBITS))
    }

    /// Integer part rounded toward negative infinity.
    #[must_use]
    pub const fn floor(self) -> i32 {
        self.0 >> FRACBITS
    }

    /// Integer part rounded toward positive infinity.
    #[must_use]
    pub const fn ceil(self) -> i32 {
        self.0.wrapping_add(FRACUNIT - 1) >> FRACBITS
    }

    /// Nearest representable value to `value`.
    ///
    /// Out-of-range values saturate and NaN maps to zero.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        match I16F16::checked_from_num(value) {
            Some(v) => Self(v.to_bits()),
            None if value.is_nan() => Self::ZERO,
            None if value < 0.0 => Self::MIN,
            None => Self::MAX,
        }
    }

    /// Exact floating-point value.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        I16F16::from_bits(self.0).to_num()
    }

    /// Absolute value with native wrapping (`MIN.abs() == MIN`).
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    /// `true` for strictly negative values.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// 16.16 multiply: widen, multiply, shift right 16, truncate.
    #[must_use]
    pub const fn mul(self, rhs: Self) -> Self {
        Self(((self.0 as i64 * rhs.0 as i64) >> FRACBITS) as i32)
    }

    /// 16.16 divide.
    ///
    /// When `|a| >> 14 >= |b|` the quotient cannot fit and the result
    /// saturates to `MIN`/`MAX` by the sign of `a ^ b`. Otherwise the
    /// quotient is computed in 64 bits; a zero divisor or a result outside
    /// the `i32` range is a fault.
    pub fn div(self, rhs: Self) -> Result<Self> {
        if (self.0.wrapping_abs() >> 14) >= rhs.0.wrapping_abs() {
            return Ok(if (self.0 ^ rhs.0) < 0 {
                Self::MIN
            } else {
                Self::MAX
            });
        }
        // |MIN| wraps negative, so MIN / 0 gets here
        (i64::from(self.0) << FRACBITS)
            .checked_div(i64::from(rhs.0))
            .and_then(|quotient| i32::try_from(quotient).ok())
            .map(Self)
            .ok_or(SimError::FixedDivOverflow {
                numerator: self.0,
                denominator: rhs.0,
            })
    }
}

impl Add for Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Fixed {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl Shr<u32> for Fixed {
    type Output = Self;

    fn shr(self, rhs: u32) -> Self {
        Self(self.0 >> rhs)
    }
}

impl Shl<u32> for Fixed {
    type Output = Self;

    fn shl(self, rhs: u32) -> Self {
        Self(self.0.wrapping_shl(rhs))
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&I16F16::from_bits(self.0), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_wraps() {
        let a = Fixed::MAX;
        assert_eq!((a + Fixed::from_bits(1)).to_bits(), i32::MIN);
        assert_eq!((Fixed::MIN - Fixed::from_bits(1)).to_bits(), i32::MAX);
    }

    #[test]
    fn test_mul_truncates_toward_negative_infinity() {
        assert_eq!(Fixed::from_int(3).mul(Fixed::from_int(4)), Fixed::from_int(12));
        // -1/65536 * 1/2 is -0.5 bits, arithmetic shift gives -1
        assert_eq!(
            Fixed::from_bits(-1).mul(Fixed::from_bits(FRACUNIT / 2)).to_bits(),
            -1
        );
    }

    #[test]
    fn test_mul_shift_before_multiply_differs() {
        let dy = Fixed::from_bits(0x0001_8000);
        let dx = Fixed::from_bits(0x0003_0000);
        let shifted_first = (dy >> FRACBITS).mul(dx);
        let full = dy.mul(dx);
        assert_ne!(shifted_first, full);
    }

    #[test]
    fn test_div_saturates() {
        let big = Fixed::from_int(20000);
        let tiny = Fixed::from_bits(1);
        assert_eq!(big.div(tiny).unwrap(), Fixed::MAX);
        assert_eq!((-big).div(tiny).unwrap(), Fixed::MIN);
        assert_eq!(big.div(-tiny).unwrap(), Fixed::MIN);
        assert_eq!(Fixed::ZERO.div(Fixed::ZERO).unwrap(), Fixed::MAX);
    }

    #[test]
    fn test_div_exact() {
        let q = Fixed::from_int(10).div(Fixed::from_int(4)).unwrap();
        assert_eq!(q.to_bits(), 0x0002_8000);
        let q = Fixed::from_int(-9).div(Fixed::from_int(2)).unwrap();
        assert_eq!(q.to_bits(), -0x0004_8000);
    }

    #[test]
    fn test_div_min_numerator_faults() {
        // |MIN| wraps to MIN so the saturation test fails and the slow
        // path overflows.
        let result = Fixed::MIN.div(Fixed::from_bits(-3));
        assert!(matches!(result, Err(SimError::FixedDivOverflow { .. })));
    }

    #[test]
    fn test_div_min_by_zero_faults() {
        let result = Fixed::MIN.div(Fixed::ZERO);
        assert!(matches!(
            result,
            Err(SimError::FixedDivOverflow {
                numerator: i32::MIN,
                denominator: 0
            })
        ));
    }

    #[test]
    fn test_floor_ceil() {
        let v = Fixed::from_bits(0x0001_0001);
        assert_eq!(v.floor(), 1);
        assert_eq!(v.ceil(), 2);
        assert_eq!(Fixed::from_int(5).ceil(), 5);
        assert_eq!(Fixed::from_bits(-1).floor(), -1);
        assert_eq!(Fixed::from_bits(-1).ceil(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Fixed::from_bits(0x0001_8000).to_string(), "1.5");
    }

    proptest! {
        #[test]
        fn prop_f64_round_trip(d in -30000.0f64..30000.0) {
            let back = Fixed::from_f64(d).to_f64();
            prop_assert!((back - d).abs() < 1e-3);
        }

        #[test]
        fn prop_mul_matches_wide_product(a in any::<i32>(), b in any::<i32>()) {
            let expected = ((i64::from(a) * i64::from(b)) >> 16) as i32;
            prop_assert_eq!(Fixed::from_bits(a).mul(Fixed::from_bits(b)).to_bits(), expected);
        }
    }
}
