//! Path traversal: the lines a straight trace crosses, nearest first.
//!
//! Collection and traversal are separate steps. Collecting needs the
//! blockmap's traversal marks; walking the result may then mutate the
//! world freely from the callback.

use crate::blockmap::{BlockMap, MAPBLOCKSHIFT, MAPBLOCKSIZE, MAPBTOFRAC};
use crate::error::Result;
use crate::geometry::{intercept_vector, point_on_divline_side, point_on_line_side, DivLine};
use crate::map::Level;
use crate::math::{Fixed, FRACBITS, FRACUNIT};

/// A line crossed by a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intercept {
    /// Fraction along the trace, `0..=1` in 16.16.
    pub frac: Fixed,
    /// Line index.
    pub line: usize,
}

/// Cells visited before the walk gives up.
const MAX_CELLS: usize = 64;

fn add_line_intercepts(level: &Level, trace: &DivLine, line: usize, out: &mut Vec<Intercept>) -> Result<()> {
    let ld = &level.lines[line];
    let sixteen = Fixed::from_int(16);
    let (s1, s2) = if trace.dx > sixteen || trace.dy > sixteen || trace.dx < -sixteen || trace.dy < -sixteen {
        let v1 = level.vertices[ld.v1];
        let v2 = level.vertices[ld.v2];
        (
            point_on_divline_side(v1.x, v1.y, trace),
            point_on_divline_side(v2.x, v2.y, trace),
        )
    } else {
        let div = ld.div_line();
        (
            point_on_line_side(trace.x, trace.y, &div),
            point_on_line_side(trace.x + trace.dx, trace.y + trace.dy, &div),
        )
    };
    if s1 == s2 {
        return Ok(());
    }

    let frac = intercept_vector(trace, &ld.div_line())?;
    if frac < Fixed::ZERO {
        return Ok(());
    }
    out.push(Intercept { frac, line });
    Ok(())
}

/// Collect every line the trace from `(x1, y1)` to `(x2, y2)` crosses.
///
/// Cells are stepped in the order the trace enters them; a start point
/// lying exactly on a cell edge is nudged one unit inward first.
pub fn path_intercepts(
    level: &Level,
    blockmap: &mut BlockMap,
    x1: Fixed,
    y1: Fixed,
    x2: Fixed,
    y2: Fixed,
) -> Result<Vec<Intercept>> {
    blockmap.new_traversal();
    let (origin_x, origin_y) = blockmap.origin();

    let mut x1 = x1;
    let mut y1 = y1;
    if (x1 - origin_x).to_bits() & (MAPBLOCKSIZE - 1) == 0 {
        x1 += Fixed::ONE;
    }
    if (y1 - origin_y).to_bits() & (MAPBLOCKSIZE - 1) == 0 {
        y1 += Fixed::ONE;
    }

    let trace = DivLine {
        x: x1,
        y: y1,
        dx: x2 - x1,
        dy: y2 - y1,
    };

    let x1 = (x1 - origin_x).to_bits();
    let y1 = (y1 - origin_y).to_bits();
    let x2 = (x2 - origin_x).to_bits();
    let y2 = (y2 - origin_y).to_bits();
    let (xt1, yt1) = (x1 >> MAPBLOCKSHIFT, y1 >> MAPBLOCKSHIFT);
    let (xt2, yt2) = (x2 >> MAPBLOCKSHIFT, y2 >> MAPBLOCKSHIFT);

    let dx = Fixed::from_bits(x2.wrapping_sub(x1));
    let dy = Fixed::from_bits(y2.wrapping_sub(y1));

    let (map_x_step, partial, y_step) = if xt2 > xt1 {
        (1, FRACUNIT - ((x1 >> MAPBTOFRAC) & (FRACUNIT - 1)), dy.div(dx.abs())?)
    } else if xt2 < xt1 {
        (-1, (x1 >> MAPBTOFRAC) & (FRACUNIT - 1), dy.div(dx.abs())?)
    } else {
        (0, FRACUNIT, Fixed::from_int(256))
    };
    let mut y_intercept = Fixed::from_bits(y1 >> MAPBTOFRAC) + Fixed::from_bits(partial).mul(y_step);

    let (map_y_step, partial, x_step) = if yt2 > yt1 {
        (1, FRACUNIT - ((y1 >> MAPBTOFRAC) & (FRACUNIT - 1)), dx.div(dy.abs())?)
    } else if yt2 < yt1 {
        (-1, (y1 >> MAPBTOFRAC) & (FRACUNIT - 1), dx.div(dy.abs())?)
    } else {
        (0, FRACUNIT, Fixed::from_int(256))
    };
    let mut x_intercept = Fixed::from_bits(x1 >> MAPBTOFRAC) + Fixed::from_bits(partial).mul(x_step);

    let mut intercepts = Vec::new();
    let (mut map_x, mut map_y) = (xt1, yt1);
    for _ in 0..MAX_CELLS {
        blockmap.try_for_each_line(map_x, map_y, |line| {
            add_line_intercepts(level, &trace, line, &mut intercepts)?;
            Ok(true)
        })?;

        if map_x == xt2 && map_y == yt2 {
            break;
        }
        if y_intercept.to_bits() >> FRACBITS == map_y {
            y_intercept += y_step;
            map_x += map_x_step;
        } else if x_intercept.to_bits() >> FRACBITS == map_x {
            x_intercept += x_step;
            map_y += map_y_step;
        }
    }

    Ok(intercepts)
}

/// Visit intercepts nearest first, stopping past `max_frac` or when the
/// callback returns `false`. Equal fractions keep collection order.
///
/// Returns `false` if the callback stopped the walk.
pub fn traverse_intercepts<F>(intercepts: &mut [Intercept], max_frac: Fixed, mut visit: F) -> Result<bool>
where
    F: FnMut(&Intercept) -> Result<bool>,
{
    for _ in 0..intercepts.len() {
        let mut nearest = None;
        let mut dist = Fixed::MAX;
        for (i, intercept) in intercepts.iter().enumerate() {
            if intercept.frac < dist {
                dist = intercept.frac;
                nearest = Some(i);
            }
        }
        if dist > max_frac {
            return Ok(true);
        }
        let Some(i) = nearest else {
            return Ok(true);
        };
        if !visit(&intercepts[i])? {
            return Ok(false);
        }
        intercepts[i].frac = Fixed::MAX;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use crate::fixtures::RoomChain;

    use super::*;

    fn f(n: i32) -> Fixed {
        Fixed::from_int(n)
    }

    #[test]
    fn test_trace_east_crosses_boundaries_in_order() {
        let data = RoomChain::new().room(0, 128).room(0, 128).room(0, 128).build();
        let (level, mut blockmap) = Level::build(&data).unwrap();
        let mut hits = path_intercepts(&level, &mut blockmap, f(20), f(64), f(400), f(64)).unwrap();
        let mut order = Vec::new();
        traverse_intercepts(&mut hits, Fixed::ONE, |i| {
            order.push(i.line);
            Ok(true)
        })
        .unwrap();
        assert_eq!(
            order,
            vec![
                RoomChain::boundary_line(1),
                RoomChain::boundary_line(2),
                RoomChain::east_wall(3)
            ]
        );
    }

    #[test]
    fn test_short_trace_stops_before_far_lines() {
        let data = RoomChain::new().room(0, 128).room(0, 128).build();
        let (level, mut blockmap) = Level::build(&data).unwrap();
        let hits = path_intercepts(&level, &mut blockmap, f(100), f(64), f(164), f(64)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, RoomChain::boundary_line(1));
        // 28 of 64 units along
        assert_eq!(hits[0].frac, Fixed::from_bits(0x7000));
    }

    #[test]
    fn test_callback_can_stop_the_walk() {
        let data = RoomChain::new().room(0, 128).room(0, 128).room(0, 128).build();
        let (level, mut blockmap) = Level::build(&data).unwrap();
        let mut hits = path_intercepts(&level, &mut blockmap, f(20), f(64), f(360), f(64)).unwrap();
        let mut seen = 0;
        let finished = traverse_intercepts(&mut hits, Fixed::ONE, |_| {
            seen += 1;
            Ok(false)
        })
        .unwrap();
        assert!(!finished);
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_ties_keep_collection_order() {
        let mut hits = vec![
            Intercept { frac: Fixed::from_bits(100), line: 7 },
            Intercept { frac: Fixed::from_bits(50), line: 3 },
            Intercept { frac: Fixed::from_bits(50), line: 9 },
        ];
        let mut order = Vec::new();
        traverse_intercepts(&mut hits, Fixed::ONE, |i| {
            order.push(i.line);
            Ok(true)
        })
        .unwrap();
        assert_eq!(order, vec![3, 9, 7]);
    }

    #[test]
    fn test_max_frac_cuts_off() {
        let mut hits = vec![
            Intercept { frac: Fixed::from_bits(0x8000), line: 1 },
            Intercept { frac: Fixed::from_bits(0x2_0000), line: 2 },
        ];
        let mut order = Vec::new();
        let finished = traverse_intercepts(&mut hits, Fixed::ONE, |i| {
            order.push(i.line);
            Ok(true)
        })
        .unwrap();
        assert!(finished);
        assert_eq!(order, vec![1]);
    }
}
