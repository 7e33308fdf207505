//! The vertical gap a two-sided line leaves open.

use crate::map::Level;
use crate::math::Fixed;

/// Passable window through a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineOpening {
    /// Lower of the two ceilings.
    pub top: Fixed,
    /// Higher of the two floors.
    pub bottom: Fixed,
    /// `top - bottom`; zero or negative means closed.
    pub range: Fixed,
    /// Lower of the two floors, for drop-off checks.
    pub low_floor: Fixed,
}

impl LineOpening {
    /// Whether nothing can pass.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.range <= Fixed::ZERO
    }
}

/// The opening of `line`. One-sided lines are closed.
#[must_use]
pub fn line_opening(level: &Level, line: usize) -> LineOpening {
    let line = &level.lines[line];
    let Some(back) = line.back_sector else {
        return LineOpening::default();
    };
    let front = &level.sectors[line.front_sector];
    let back = &level.sectors[back];

    let top = if front.ceiling_height < back.ceiling_height {
        front.ceiling_height
    } else {
        back.ceiling_height
    };
    let (bottom, low_floor) = if front.floor_height > back.floor_height {
        (front.floor_height, back.floor_height)
    } else {
        (back.floor_height, front.floor_height)
    };

    LineOpening {
        top,
        bottom,
        range: top - bottom,
        low_floor,
    }
}
