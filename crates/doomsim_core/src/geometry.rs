//! Point and box classification against lines, angles and distances
//! between points, and the intercept fraction used by traces.
//!
//! Operation order in these functions is load-bearing. In particular the
//! side tests shift their operands *before* multiplying, which rounds
//! differently from the algebraically equivalent expression.

use serde::{Deserialize, Serialize};

use crate::angle::{Angle, ANG180, ANG270, ANG90, ANGLETOFINESHIFT};
use crate::error::Result;
use crate::math::{Fixed, FRACBITS};
use crate::trig::{fine_sine, slope_div, tan_to_angle, DBITS};

/// Which side of a line something is on.
pub const FRONT: usize = 0;
/// The other side.
pub const BACK: usize = 1;

/// A line as origin plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DivLine {
    /// Origin x.
    pub x: Fixed,
    /// Origin y.
    pub y: Fixed,
    /// Direction x.
    pub dx: Fixed,
    /// Direction y.
    pub dy: Fixed,
}

impl DivLine {
    /// Line from `(x1, y1)` to `(x2, y2)`.
    #[must_use]
    pub fn between(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Self {
        Self {
            x: x1,
            y: y1,
            dx: x2 - x1,
            dy: y2 - y1,
        }
    }
}

/// Axis-aligned bounds in map space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Largest y.
    pub top: Fixed,
    /// Smallest y.
    pub bottom: Fixed,
    /// Smallest x.
    pub left: Fixed,
    /// Largest x.
    pub right: Fixed,
}

impl BoundingBox {
    /// An inverted box that any point will expand.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            top: Fixed::MIN,
            bottom: Fixed::MAX,
            left: Fixed::MAX,
            right: Fixed::MIN,
        }
    }

    /// Box of half-width `radius` around a point.
    #[must_use]
    pub fn around(x: Fixed, y: Fixed, radius: Fixed) -> Self {
        Self {
            top: y + radius,
            bottom: y - radius,
            left: x - radius,
            right: x + radius,
        }
    }

    /// Grow towards `(x, y)`.
    ///
    /// Each axis moves at most one edge per call, so the very first point
    /// only sets `left` and `bottom`. Sector bounds depend on this.
    pub fn add_point(&mut self, x: Fixed, y: Fixed) {
        if x < self.left {
            self.left = x;
        } else if x > self.right {
            self.right = x;
        }
        if y < self.bottom {
            self.bottom = y;
        } else if y > self.top {
            self.top = y;
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Slope category of a line, used to pick box corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlopeType {
    /// `dy == 0`.
    Horizontal,
    /// `dx == 0`.
    Vertical,
    /// `dy / dx > 0`.
    Positive,
    /// `dy / dx < 0`.
    Negative,
}

impl SlopeType {
    /// Classify a direction vector.
    pub fn classify(dx: Fixed, dy: Fixed) -> Result<Self> {
        Ok(if dx == Fixed::ZERO {
            Self::Vertical
        } else if dy == Fixed::ZERO {
            Self::Horizontal
        } else if dy.div(dx)? > Fixed::ZERO {
            Self::Positive
        } else {
            Self::Negative
        })
    }
}

/// Result of testing a box against a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxSide {
    /// Entirely on the front side.
    Front,
    /// Entirely on the back side.
    Back,
    /// Crossing the line.
    Straddle,
}

/// Side of a map line a point is on (0 front, 1 back).
///
/// Axis-aligned lines compare coordinates directly. Otherwise compares
/// `(line.dy >> 16) * dx` against `dy * (line.dx >> 16)`.
#[must_use]
pub fn point_on_line_side(x: Fixed, y: Fixed, line: &DivLine) -> usize {
    if line.dx == Fixed::ZERO {
        if x <= line.x {
            return usize::from(line.dy > Fixed::ZERO);
        }
        return usize::from(line.dy < Fixed::ZERO);
    }
    if line.dy == Fixed::ZERO {
        if y <= line.y {
            return usize::from(line.dx < Fixed::ZERO);
        }
        return usize::from(line.dx > Fixed::ZERO);
    }

    let dx = x - line.x;
    let dy = y - line.y;
    let left = (line.dy >> FRACBITS).mul(dx);
    let right = dy.mul(line.dx >> FRACBITS);
    if right < left {
        FRONT
    } else {
        BACK
    }
}

/// Side of a BSP partition a point is on (0 front, 1 back).
///
/// Same as [`point_on_line_side`] but first settles every case where the
/// operand signs alone decide the answer.
#[must_use]
pub fn point_on_partition_side(x: Fixed, y: Fixed, node: &DivLine) -> usize {
    if node.dx == Fixed::ZERO {
        if x <= node.x {
            return usize::from(node.dy > Fixed::ZERO);
        }
        return usize::from(node.dy < Fixed::ZERO);
    }
    if node.dy == Fixed::ZERO {
        if y <= node.y {
            return usize::from(node.dx < Fixed::ZERO);
        }
        return usize::from(node.dx > Fixed::ZERO);
    }

    let dx = x - node.x;
    let dy = y - node.y;

    if (node.dy.to_bits() ^ node.dx.to_bits() ^ dx.to_bits() ^ dy.to_bits()) < 0 {
        return usize::from((node.dy.to_bits() ^ dx.to_bits()) < 0);
    }

    let left = (node.dy >> FRACBITS).mul(dx);
    let right = dy.mul(node.dx >> FRACBITS);
    if right < left {
        FRONT
    } else {
        BACK
    }
}

/// Side of a trace line a point is on (0 front, 1 back).
///
/// Long traces lose precision on purpose: both products drop eight bits
/// from each operand.
#[must_use]
pub fn point_on_divline_side(x: Fixed, y: Fixed, line: &DivLine) -> usize {
    if line.dx == Fixed::ZERO {
        if x <= line.x {
            return usize::from(line.dy > Fixed::ZERO);
        }
        return usize::from(line.dy < Fixed::ZERO);
    }
    if line.dy == Fixed::ZERO {
        if y <= line.y {
            return usize::from(line.dx < Fixed::ZERO);
        }
        return usize::from(line.dx > Fixed::ZERO);
    }

    let dx = x - line.x;
    let dy = y - line.y;

    if (line.dy.to_bits() ^ line.dx.to_bits() ^ dx.to_bits() ^ dy.to_bits()) < 0 {
        return usize::from((line.dy.to_bits() ^ dx.to_bits()) < 0);
    }

    let left = (line.dy >> 8).mul(dx >> 8);
    let right = (dy >> 8).mul(line.dx >> 8);
    if right < left {
        FRONT
    } else {
        BACK
    }
}

/// Which side of `line` the box lies on.
///
/// Only two corners are tested; which two depends on the slope.
#[must_use]
pub fn box_on_line_side(bbox: &BoundingBox, line: &DivLine, slope: SlopeType) -> BoxSide {
    let (p1, p2) = match slope {
        SlopeType::Horizontal => {
            let mut p1 = usize::from(bbox.top > line.y);
            let mut p2 = usize::from(bbox.bottom > line.y);
            if line.dx < Fixed::ZERO {
                p1 ^= 1;
                p2 ^= 1;
            }
            (p1, p2)
        }
        SlopeType::Vertical => {
            let mut p1 = usize::from(bbox.right < line.x);
            let mut p2 = usize::from(bbox.left < line.x);
            if line.dy < Fixed::ZERO {
                p1 ^= 1;
                p2 ^= 1;
            }
            (p1, p2)
        }
        SlopeType::Positive => (
            point_on_line_side(bbox.left, bbox.top, line),
            point_on_line_side(bbox.right, bbox.bottom, line),
        ),
        SlopeType::Negative => (
            point_on_line_side(bbox.right, bbox.top, line),
            point_on_line_side(bbox.left, bbox.bottom, line),
        ),
    };

    match (p1 == p2, p1) {
        (true, FRONT) => BoxSide::Front,
        (true, _) => BoxSide::Back,
        (false, _) => BoxSide::Straddle,
    }
}

/// Angle of the vector from `(x1, y1)` to `(x2, y2)`.
///
/// Folds the vector into the first octant, looks the slope up in the
/// inverse tangent table and unfolds the result.
#[must_use]
pub fn point_to_angle(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Angle {
    let mut x = (x2 - x1).to_bits();
    let mut y = (y2 - y1).to_bits();

    if x == 0 && y == 0 {
        return Angle::ZERO;
    }

    let tan = |num: i32, den: i32| tan_to_angle(slope_div(num as u32, den as u32)).to_bits();

    let bits = if x >= 0 {
        if y >= 0 {
            if x > y {
                // octant 0
                tan(y, x)
            } else {
                // octant 1
                ANG90.wrapping_sub(1).wrapping_sub(tan(x, y))
            }
        } else {
            y = y.wrapping_neg();
            if x > y {
                // octant 8
                tan(y, x).wrapping_neg()
            } else {
                // octant 7
                ANG270.wrapping_add(tan(x, y))
            }
        }
    } else {
        x = x.wrapping_neg();
        if y >= 0 {
            if x > y {
                // octant 3
                ANG180.wrapping_sub(1).wrapping_sub(tan(y, x))
            } else {
                // octant 2
                ANG90.wrapping_add(tan(x, y))
            }
        } else {
            y = y.wrapping_neg();
            if x > y {
                // octant 4
                ANG180.wrapping_add(tan(y, x))
            } else {
                // octant 5
                ANG270.wrapping_sub(1).wrapping_sub(tan(x, y))
            }
        }
    };
    Angle::from_bits(bits)
}

/// Euclidean distance from the view point to `(x, y)` via the tables.
///
/// Coincident points are zero apart.
pub fn point_to_dist(view_x: Fixed, view_y: Fixed, x: Fixed, y: Fixed) -> Result<Fixed> {
    let mut dx = (x - view_x).abs();
    let mut dy = (y - view_y).abs();
    if dy > dx {
        std::mem::swap(&mut dx, &mut dy);
    }
    if dx == Fixed::ZERO {
        return Ok(Fixed::ZERO);
    }

    let slope = (dy.div(dx)?.to_bits() >> DBITS) as usize;
    let angle = tan_to_angle(slope).to_bits().wrapping_add(ANG90) >> ANGLETOFINESHIFT;
    dx.div(fine_sine(angle as usize))
}

/// Cheap distance estimate: `dx + dy - min(dx, dy) / 2`.
#[must_use]
pub fn approx_distance(dx: Fixed, dy: Fixed) -> Fixed {
    let dx = dx.abs();
    let dy = dy.abs();
    if dx < dy {
        dx + dy - (dx >> 1)
    } else {
        dx + dy - (dy >> 1)
    }
}

/// Fraction along `trace` where it meets `line`.
///
/// Parallel lines intercept at zero.
pub fn intercept_vector(trace: &DivLine, line: &DivLine) -> Result<Fixed> {
    let den = (line.dy >> 8).mul(trace.dx) - (line.dx >> 8).mul(trace.dy);
    if den == Fixed::ZERO {
        return Ok(Fixed::ZERO);
    }
    let num = ((line.x - trace.x) >> 8).mul(line.dy) + ((trace.y - line.y) >> 8).mul(line.dx);
    num.div(den)
}

/// Unit vector scaled by `length` in direction `angle`.
#[must_use]
pub fn thrust_vector(angle: Angle, length: Fixed) -> (Fixed, Fixed) {
    (length.mul(angle.cos()), length.mul(angle.sin()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::FRACUNIT;

    fn f(n: i32) -> Fixed {
        Fixed::from_int(n)
    }

    fn line(x1: i32, y1: i32, x2: i32, y2: i32) -> DivLine {
        DivLine::between(f(x1), f(y1), f(x2), f(y2))
    }

    #[test]
    fn test_point_on_line_side_axis_aligned() {
        // northward line: east is the front
        let north = line(0, 0, 0, 64);
        assert_eq!(point_on_line_side(f(10), f(5), &north), FRONT);
        assert_eq!(point_on_line_side(f(-10), f(5), &north), BACK);
        let east = line(0, 0, 64, 0);
        assert_eq!(point_on_line_side(f(5), f(-10), &east), FRONT);
        assert_eq!(point_on_line_side(f(5), f(10), &east), BACK);
    }

    #[test]
    fn test_point_on_line_side_diagonal() {
        let diag = line(0, 0, 64, 64);
        assert_eq!(point_on_line_side(f(32), f(0), &diag), FRONT);
        assert_eq!(point_on_line_side(f(0), f(32), &diag), BACK);
    }

    #[test]
    fn test_partition_and_line_sides_agree_on_clear_cases() {
        let diag = line(0, 0, 128, 64);
        for (x, y) in [(100, 0), (0, 100), (-50, -80), (200, 20), (10, -300)] {
            assert_eq!(
                point_on_partition_side(f(x), f(y), &diag),
                point_on_line_side(f(x), f(y), &diag),
                "({x}, {y})"
            );
            assert_eq!(
                point_on_divline_side(f(x), f(y), &diag),
                point_on_line_side(f(x), f(y), &diag),
                "({x}, {y})"
            );
        }
    }

    #[test]
    fn test_box_on_line_side() {
        let north = line(0, 0, 0, 64);
        let slope = SlopeType::classify(north.dx, north.dy).unwrap();
        assert_eq!(slope, SlopeType::Vertical);
        let east_box = BoundingBox::around(f(40), f(10), f(16));
        let mid_box = BoundingBox::around(f(4), f(10), f(16));
        let west_box = BoundingBox::around(f(-40), f(10), f(16));
        assert_eq!(box_on_line_side(&east_box, &north, slope), BoxSide::Front);
        assert_eq!(box_on_line_side(&mid_box, &north, slope), BoxSide::Straddle);
        assert_eq!(box_on_line_side(&west_box, &north, slope), BoxSide::Back);

        let diag = line(0, 0, 64, 64);
        let slope = SlopeType::classify(diag.dx, diag.dy).unwrap();
        assert_eq!(slope, SlopeType::Positive);
        assert_eq!(
            box_on_line_side(&BoundingBox::around(f(60), f(0), f(8)), &diag, slope),
            BoxSide::Front
        );
        assert_eq!(
            box_on_line_side(&BoundingBox::around(f(32), f(32), f(8)), &diag, slope),
            BoxSide::Straddle
        );
    }

    #[test]
    fn test_slope_classification() {
        assert_eq!(SlopeType::classify(f(0), f(3)).unwrap(), SlopeType::Vertical);
        assert_eq!(SlopeType::classify(f(3), f(0)).unwrap(), SlopeType::Horizontal);
        assert_eq!(SlopeType::classify(f(-3), f(2)).unwrap(), SlopeType::Negative);
        assert_eq!(SlopeType::classify(f(-3), f(-2)).unwrap(), SlopeType::Positive);
    }

    #[test]
    fn test_point_to_angle_cardinals() {
        let o = Fixed::ZERO;
        assert_eq!(point_to_angle(o, o, f(10), o), Angle::ZERO);
        assert_eq!(point_to_angle(o, o, o, f(10)).to_bits(), ANG90 - 1);
        assert_eq!(point_to_angle(o, o, f(-10), o).to_bits(), ANG180 - 1);
        assert_eq!(point_to_angle(o, o, o, f(-10)).to_bits(), ANG270);
        assert_eq!(point_to_angle(o, o, o, o), Angle::ZERO);
    }

    #[test]
    fn test_point_to_angle_diagonals_are_close() {
        let o = Fixed::ZERO;
        for (x, y, degrees) in [(10, 10, 45.0), (-10, 10, 135.0), (-10, -10, 225.0), (10, -10, 315.0)] {
            let got = point_to_angle(o, o, f(x), f(y)).to_degrees();
            assert!((got - degrees).abs() < 0.1, "{x},{y}: {got}");
        }
    }

    #[test]
    fn test_point_to_dist() {
        let o = Fixed::ZERO;
        let d = point_to_dist(o, o, f(300), f(400)).unwrap();
        assert!((d.to_f64() - 500.0).abs() < 1.0, "{d}");
        assert_eq!(point_to_dist(f(7), f(7), f(7), f(7)).unwrap(), Fixed::ZERO);
    }

    #[test]
    fn test_approx_distance() {
        assert_eq!(approx_distance(f(30), f(40)), f(55));
        assert_eq!(approx_distance(f(-40), f(30)), f(55));
    }

    #[test]
    fn test_intercept_vector() {
        let trace = line(0, 32, 128, 32);
        let wall = line(64, 0, 64, 128);
        let frac = intercept_vector(&trace, &wall).unwrap();
        assert_eq!(frac, Fixed::from_bits(FRACUNIT / 2));

        let parallel = line(0, 0, 128, 0);
        assert_eq!(intercept_vector(&trace, &parallel).unwrap(), Fixed::ZERO);
    }

    #[test]
    fn test_thrust_vector() {
        let (x, y) = thrust_vector(Angle::ZERO, f(2));
        assert_eq!(x, f(2).mul(Fixed::from_bits(65535)));
        assert_eq!(y, f(2).mul(Fixed::from_bits(25)));
    }

    #[test]
    fn test_bounding_box_growth() {
        let mut bbox = BoundingBox::empty();
        bbox.add_point(f(3), f(-2));
        assert_eq!(bbox.left, f(3));
        assert_eq!(bbox.right, Fixed::MIN);
        bbox.add_point(f(-5), f(7));
        bbox.add_point(f(3), f(-2));
        assert_eq!(bbox.left, f(-5));
        assert_eq!(bbox.right, f(3));
        assert_eq!(bbox.bottom, f(-2));
        assert_eq!(bbox.top, f(7));
    }
}
