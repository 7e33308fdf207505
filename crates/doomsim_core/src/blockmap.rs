//! The blockmap: a 128-unit grid over the level.
//!
//! Each cell has a fixed list of the lines that touch it and a dynamic
//! list of the map objects whose origin is inside it. Line lists are kept
//! in the lump layout (offsets into one shared table, each run terminated
//! by `-1`) including the leading `0` entry that every cell carries, so
//! line 0 is reported from every cell.

use crate::error::{Result, SimError};
use crate::math::{Fixed, FRACBITS};
use crate::thinker::ThinkerId;

/// Cell size in map units.
pub const MAPBLOCKUNITS: i32 = 128;
/// Shift from fixed-point map coordinates to cell coordinates.
pub const MAPBLOCKSHIFT: u32 = FRACBITS + 7;
/// Shift from fixed-point to cell fraction.
pub const MAPBTOFRAC: u32 = MAPBLOCKSHIFT - FRACBITS;
/// Cell size mask in fixed-point.
pub const MAPBLOCKSIZE: i32 = MAPBLOCKUNITS << FRACBITS;

const END_OF_LIST: i32 = -1;

/// Spatial grid over lines and map objects.
#[derive(Debug, Clone)]
pub struct BlockMap {
    origin_x: Fixed,
    origin_y: Fixed,
    width: i32,
    height: i32,
    /// Per-cell start into `lists`.
    offsets: Vec<u32>,
    /// Concatenated line runs, each ending in `-1`.
    lists: Vec<i32>,
    /// Objects per cell, most recently linked first.
    things: Vec<Vec<ThinkerId>>,
    valid_count: u32,
    line_marks: Vec<u32>,
}

impl BlockMap {
    /// Parse a BLOCKMAP lump (already split into 16-bit words).
    pub fn from_lump(lump: &[i16], num_lines: usize) -> Result<Self> {
        if lump.len() < 4 {
            return Err(SimError::MalformedBlockMap(format!(
                "{} words is too short for a header",
                lump.len()
            )));
        }
        let width = i32::from(lump[2]);
        let height = i32::from(lump[3]);
        if width <= 0 || height <= 0 {
            return Err(SimError::MalformedBlockMap(format!(
                "bad dimensions {width}x{height}"
            )));
        }
        let cells = (width * height) as usize;
        if lump.len() < 4 + cells {
            return Err(SimError::MalformedBlockMap(format!(
                "{cells} cells but only {} words",
                lump.len()
            )));
        }

        // Words are re-read as unsigned: offsets and line numbers are u16,
        // 0xFFFF is the terminator.
        let lists: Vec<i32> = lump
            .iter()
            .map(|&w| {
                let w = w as u16;
                if w == 0xFFFF {
                    END_OF_LIST
                } else {
                    i32::from(w)
                }
            })
            .collect();
        let offsets: Vec<u32> = lump[4..4 + cells].iter().map(|&w| u32::from(w as u16)).collect();

        for (cell, &offset) in offsets.iter().enumerate() {
            let mut i = offset as usize;
            loop {
                match lists.get(i) {
                    None => {
                        return Err(SimError::MalformedBlockMap(format!(
                            "cell {cell} runs off the end of the lump"
                        )))
                    }
                    Some(&END_OF_LIST) => break,
                    Some(&line) if line as usize >= num_lines => {
                        return Err(SimError::InvalidReference {
                            kind: "blockmap cell",
                            index: cell,
                            target: "line",
                            target_index: line as usize,
                        })
                    }
                    Some(_) => i += 1,
                }
            }
        }

        Ok(Self::from_parts(
            Fixed::from_int(i32::from(lump[0])),
            Fixed::from_int(i32::from(lump[1])),
            width,
            height,
            offsets,
            lists,
            num_lines,
        ))
    }

    /// Build a blockmap for a level that does not carry one.
    ///
    /// `lines` are `(x1, y1, x2, y2)` in whole map units. The grid origin
    /// is the lower-left corner of the vertex bounds and every cell run
    /// starts with `0`, the same as lumps from the usual node builders.
    pub fn generate(lines: &[(i32, i32, i32, i32)]) -> Self {
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for &(x1, y1, x2, y2) in lines {
            min_x = min_x.min(x1).min(x2);
            min_y = min_y.min(y1).min(y2);
            max_x = max_x.max(x1).max(x2);
            max_y = max_y.max(y1).max(y2);
        }
        if lines.is_empty() {
            (min_x, min_y, max_x, max_y) = (0, 0, 0, 0);
        }

        let width = ((max_x - min_x) >> 7) + 1;
        let height = ((max_y - min_y) >> 7) + 1;
        let cells = (width * height) as usize;
        let mut per_cell: Vec<Vec<i32>> = vec![vec![0]; cells];

        for (index, &(x1, y1, x2, y2)) in lines.iter().enumerate() {
            let bx1 = (x1.min(x2) - min_x) >> 7;
            let bx2 = (x1.max(x2) - min_x) >> 7;
            let by1 = (y1.min(y2) - min_y) >> 7;
            let by2 = (y1.max(y2) - min_y) >> 7;
            for by in by1..=by2 {
                for bx in bx1..=bx2 {
                    let left = min_x + bx * MAPBLOCKUNITS;
                    let bottom = min_y + by * MAPBLOCKUNITS;
                    if segment_touches_cell((x1, y1, x2, y2), left, bottom) {
                        let list = &mut per_cell[(by * width + bx) as usize];
                        // line 0 is already present through the leading entry
                        if index != 0 {
                            list.push(index as i32);
                        }
                    }
                }
            }
        }

        let mut offsets = Vec::with_capacity(cells);
        let mut lists = Vec::new();
        for list in per_cell {
            offsets.push(lists.len() as u32);
            lists.extend(list);
            lists.push(END_OF_LIST);
        }

        Self::from_parts(
            Fixed::from_int(min_x),
            Fixed::from_int(min_y),
            width,
            height,
            offsets,
            lists,
            lines.len(),
        )
    }

    fn from_parts(
        origin_x: Fixed,
        origin_y: Fixed,
        width: i32,
        height: i32,
        offsets: Vec<u32>,
        lists: Vec<i32>,
        num_lines: usize,
    ) -> Self {
        let cells = (width * height) as usize;
        Self {
            origin_x,
            origin_y,
            width,
            height,
            offsets,
            lists,
            things: vec![Vec::new(); cells],
            valid_count: 0,
            line_marks: vec![0; num_lines],
        }
    }

    /// Grid origin.
    #[must_use]
    pub const fn origin(&self) -> (Fixed, Fixed) {
        (self.origin_x, self.origin_y)
    }

    /// Columns.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Rows.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Cell column of a world x coordinate (may be outside the grid).
    #[must_use]
    pub fn block_x(&self, x: Fixed) -> i32 {
        (x - self.origin_x).to_bits() >> MAPBLOCKSHIFT
    }

    /// Cell row of a world y coordinate (may be outside the grid).
    #[must_use]
    pub fn block_y(&self, y: Fixed) -> i32 {
        (y - self.origin_y).to_bits() >> MAPBLOCKSHIFT
    }

    fn cell_index(&self, bx: i32, by: i32) -> Option<usize> {
        if bx < 0 || by < 0 || bx >= self.width || by >= self.height {
            None
        } else {
            Some((by * self.width + bx) as usize)
        }
    }

    /// Start a new traversal: lines seen by earlier traversals become
    /// visitable again.
    pub fn new_traversal(&mut self) {
        self.valid_count = self.valid_count.wrapping_add(1);
        if self.valid_count == 0 {
            self.line_marks.fill(0);
            self.valid_count = 1;
        }
    }

    /// Visit every line in a cell not yet seen in this traversal.
    ///
    /// Cells outside the grid succeed without visiting anything. Returns
    /// `false` as soon as the callback does.
    pub fn for_each_line(&mut self, bx: i32, by: i32, mut f: impl FnMut(usize) -> bool) -> bool {
        match self.try_for_each_line(bx, by, |line| Ok(f(line))) {
            Ok(keep_going) => keep_going,
            Err(_) => false,
        }
    }

    /// Fallible form of [`BlockMap::for_each_line`].
    pub fn try_for_each_line(
        &mut self,
        bx: i32,
        by: i32,
        mut f: impl FnMut(usize) -> Result<bool>,
    ) -> Result<bool> {
        let Some(cell) = self.cell_index(bx, by) else {
            return Ok(true);
        };
        let mut i = self.offsets[cell] as usize;
        while let Some(&entry) = self.lists.get(i) {
            if entry == END_OF_LIST {
                break;
            }
            i += 1;
            let line = entry as usize;
            if self.line_marks[line] == self.valid_count {
                continue;
            }
            self.line_marks[line] = self.valid_count;
            if !f(line)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Objects in a cell at the time of the call, most recently linked first.
    #[must_use]
    pub fn things_in(&self, bx: i32, by: i32) -> Vec<ThinkerId> {
        self.cell_index(bx, by)
            .map(|cell| self.things[cell].clone())
            .unwrap_or_default()
    }

    /// Link an object at the head of a cell's list. Returns `false` when the
    /// position is off the grid and nothing was linked.
    pub fn link_thing(&mut self, x: Fixed, y: Fixed, id: ThinkerId) -> bool {
        let (bx, by) = (self.block_x(x), self.block_y(y));
        match self.cell_index(bx, by) {
            Some(cell) => {
                self.things[cell].insert(0, id);
                true
            }
            None => false,
        }
    }

    /// Unlink an object previously linked at `(x, y)`.
    pub fn unlink_thing(&mut self, x: Fixed, y: Fixed, id: ThinkerId) {
        let (bx, by) = (self.block_x(x), self.block_y(y));
        if let Some(cell) = self.cell_index(bx, by) {
            self.things[cell].retain(|&other| other != id);
        }
    }

    /// Drop every object link.
    pub fn clear_things(&mut self) {
        for cell in &mut self.things {
            cell.clear();
        }
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.things.len()
    }

    /// Flat cell index of a map position, `None` off the grid.
    pub(crate) fn cell_at(&self, x: Fixed, y: Fixed) -> Option<usize> {
        self.cell_index(self.block_x(x), self.block_y(y))
    }

    pub(crate) fn cell_things(&self, cell: usize) -> &[ThinkerId] {
        &self.things[cell]
    }

    pub(crate) fn set_cell_things(&mut self, cell: usize, things: Vec<ThinkerId>) {
        self.things[cell] = things;
    }
}

/// Whether the closed segment touches the closed 128x128 cell at
/// `(left, bottom)`.
fn segment_touches_cell((x1, y1, x2, y2): (i32, i32, i32, i32), left: i32, bottom: i32) -> bool {
    let right = left + MAPBLOCKUNITS;
    let top = bottom + MAPBLOCKUNITS;
    if x1.max(x2) < left || x1.min(x2) > right || y1.max(y2) < bottom || y1.min(y2) > top {
        return false;
    }
    let (dx, dy) = (i64::from(x2 - x1), i64::from(y2 - y1));
    let side = |cx: i32, cy: i32| (i64::from(cx - x1) * dy - i64::from(cy - y1) * dx).signum();
    let corners = [
        side(left, bottom),
        side(right, bottom),
        side(left, top),
        side(right, top),
    ];
    !(corners.iter().all(|&s| s > 0) || corners.iter().all(|&s| s < 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_room() -> Vec<(i32, i32, i32, i32)> {
        vec![
            (0, 0, 0, 300),
            (0, 300, 300, 300),
            (300, 300, 300, 0),
            (300, 0, 0, 0),
            (100, 100, 200, 200),
        ]
    }

    fn visit_all(map: &mut BlockMap, margin: i32) -> Vec<usize> {
        let mut seen = Vec::new();
        map.new_traversal();
        for by in -margin..map.height() + margin {
            for bx in -margin..map.width() + margin {
                map.for_each_line(bx, by, |line| {
                    seen.push(line);
                    true
                });
            }
        }
        seen
    }

    #[test]
    fn test_generated_grid_dimensions() {
        let map = BlockMap::generate(&square_room());
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 3);
        assert_eq!(map.origin(), (Fixed::ZERO, Fixed::ZERO));
    }

    #[test]
    fn test_full_sweep_visits_each_line_once() {
        let lines = square_room();
        let mut map = BlockMap::generate(&lines);
        let mut seen = visit_all(&mut map, 2);
        assert_eq!(seen.len(), lines.len());
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        // a second sweep with a fresh marker sees them all again
        assert_eq!(visit_all(&mut map, 2).len(), lines.len());
    }

    #[test]
    fn test_out_of_range_cell_is_trivial_success() {
        let mut map = BlockMap::generate(&square_room());
        map.new_traversal();
        let mut calls = 0;
        assert!(map.for_each_line(-1, 0, |_| {
            calls += 1;
            false
        }));
        assert!(map.for_each_line(0, 99, |_| {
            calls += 1;
            false
        }));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_early_termination() {
        let mut map = BlockMap::generate(&square_room());
        map.new_traversal();
        let mut calls = 0;
        let finished = map.for_each_line(0, 0, |_| {
            calls += 1;
            false
        });
        assert!(!finished);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_leading_zero_reports_line_zero_everywhere() {
        let mut map = BlockMap::generate(&square_room());
        // the far corner cell does not touch line 0 geometrically
        map.new_traversal();
        let mut seen = Vec::new();
        map.for_each_line(2, 2, |line| {
            seen.push(line);
            true
        });
        assert_eq!(seen[0], 0);
    }

    #[test]
    fn test_from_lump_round_trip_layout() {
        // 1x1 grid at (-64, -64) holding lines 0 and 2
        let lump: Vec<i16> = vec![-64, -64, 1, 1, 5, 0, 2, -1];
        let mut map = BlockMap::from_lump(&lump, 3).unwrap();
        assert_eq!(map.origin(), (Fixed::from_int(-64), Fixed::from_int(-64)));
        map.new_traversal();
        let mut seen = Vec::new();
        map.for_each_line(0, 0, |line| {
            seen.push(line);
            true
        });
        assert_eq!(seen, vec![0, 2]);
    }

    #[test]
    fn test_from_lump_rejects_bad_data() {
        assert!(BlockMap::from_lump(&[0, 0, 1], 1).is_err());
        // offset past the end
        assert!(BlockMap::from_lump(&[0, 0, 1, 1, 9], 1).is_err());
        // unterminated run
        assert!(BlockMap::from_lump(&[0, 0, 1, 1, 5, 0], 1).is_err());
        // line out of range
        assert!(BlockMap::from_lump(&[0, 0, 1, 1, 5, 7, -1], 3).is_err());
    }

    #[test]
    fn test_world_to_cell() {
        let map = BlockMap::generate(&square_room());
        assert_eq!(map.block_x(Fixed::from_int(127)), 0);
        assert_eq!(map.block_x(Fixed::from_int(128)), 1);
        assert_eq!(map.block_y(Fixed::from_int(-1)), -1);
    }

    #[test]
    fn test_thing_links_are_head_first() {
        let mut map = BlockMap::generate(&square_room());
        let a = ThinkerId::from_raw(1, 0);
        let b = ThinkerId::from_raw(2, 0);
        let x = Fixed::from_int(10);
        assert!(map.link_thing(x, x, a));
        assert!(map.link_thing(x, x, b));
        assert_eq!(map.things_in(0, 0), vec![b, a]);
        map.unlink_thing(x, x, b);
        assert_eq!(map.things_in(0, 0), vec![a]);
        assert!(!map.link_thing(Fixed::from_int(-500), x, b));
    }
}
