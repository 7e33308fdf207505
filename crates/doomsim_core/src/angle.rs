//! Binary angle measurement.
//!
//! A full turn is 2^32 units, so every operation wraps for free and two
//! angles compare by their raw unsigned value.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// 45 degrees.
pub const ANG45: u32 = 0x2000_0000;
/// 90 degrees.
pub const ANG90: u32 = 0x4000_0000;
/// 180 degrees.
pub const ANG180: u32 = 0x8000_0000;
/// 270 degrees.
pub const ANG270: u32 = 0xC000_0000;

/// Right shift turning an angle into a fine-table index.
pub const ANGLETOFINESHIFT: u32 = 19;

const TURN: f64 = 4_294_967_296.0;

/// An angle in binary angle measurement units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Angle(u32);

impl Angle {
    /// East.
    pub const ZERO: Self = Self(0);
    /// 45 degrees.
    pub const A45: Self = Self(ANG45);
    /// North.
    pub const A90: Self = Self(ANG90);
    /// West.
    pub const A180: Self = Self(ANG180);
    /// South.
    pub const A270: Self = Self(ANG270);

    /// Wrap raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Angle for `degrees`, normalised into one turn.
    #[must_use]
    pub fn from_degrees(degrees: f64) -> Self {
        let turns = degrees.rem_euclid(360.0) / 360.0;
        Self(((turns * TURN) as u64 & 0xFFFF_FFFF) as u32)
    }

    /// Angle in degrees, in `[0, 360)`.
    #[must_use]
    pub fn to_degrees(self) -> f64 {
        f64::from(self.0) * 360.0 / TURN
    }

    /// Index into the fine trig tables (`0..8192`).
    #[must_use]
    pub const fn fine(self) -> usize {
        (self.0 >> ANGLETOFINESHIFT) as usize
    }

    /// Map-thing facing: editor angles snap to 45 degree steps.
    #[must_use]
    pub const fn from_map_degrees(degrees: i16) -> Self {
        Self(ANG45.wrapping_mul((degrees / 45) as u32))
    }
}

impl Add for Angle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Angle {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Angle {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}°", self.to_degrees())
    }
}
