//! Synthetic levels: a row of rectangular rooms joined by two-sided lines.
//!
//! Rooms run west to east, each [`ROOM_DEPTH`] units deep. The vertical
//! line at boundary `k` is `x_k`, so room `k` spans `x_k..x_{k+1}`. Every
//! inner boundary faces west: its front sector is the room to the west and
//! its back sector the room to the east. A player in room `k - 1` using
//! boundary `k` therefore opens a door in room `k`.
//!
//! Line indices are fixed by the layout:
//!
//! | line | index |
//! |---|---|
//! | west wall / boundary `k` / east wall | `3k` |
//! | south wall of room `k` | `3k + 1` |
//! | north wall of room `k` | `3k + 2` |
//!
//! The BSP has one subsector per room and one node per inner boundary.

use std::collections::BTreeMap;

use crate::map::data::{LevelData, LineData, NodeData, SectorData, SegData, SideData, SubsectorData, VertexData};
use crate::map::{LineFlags, MapThing, NF_SUBSECTOR};

/// North-south extent of every room.
pub const ROOM_DEPTH: i16 = 256;
/// Default east-west extent of a room.
pub const ROOM_WIDTH: i16 = 128;
/// Upper texture on boundary sides, and the middle texture on walls.
pub const WALL_TEXTURE: &str = "STARTAN3";
/// Lower texture on boundary sides.
pub const STEP_TEXTURE: &str = "STEP2";

// Seg angles, BAM >> 16.
const EAST: i16 = 0;
const NORTH: i16 = 0x4000;
const WEST: i16 = i16::MIN;
const SOUTH: i16 = -0x4000;

#[derive(Debug, Clone)]
struct Room {
    sector: SectorData,
    width: i16,
    west: (u16, i16, u16),
    north: (u16, i16),
}

/// Builder for a chain of rooms.
#[derive(Debug, Clone, Default)]
pub struct RoomChain {
    rooms: Vec<Room>,
    things: Vec<MapThing>,
}

impl RoomChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn last(&mut self) -> &mut Room {
        if self.rooms.is_empty() {
            self.rooms.push(Self::default_room(0, 128));
        }
        let last = self.rooms.len() - 1;
        &mut self.rooms[last]
    }

    fn default_room(floor: i16, ceiling: i16) -> Room {
        Room {
            sector: SectorData {
                floor_height: floor,
                ceiling_height: ceiling,
                floor_pic: "FLOOR4_8".into(),
                ceiling_pic: "CEIL3_5".into(),
                light_level: 160,
                special: 0,
                tag: 0,
            },
            width: ROOM_WIDTH,
            west: (0, 0, LineFlags::TWO_SIDED),
            north: (0, 0),
        }
    }

    /// Append a room east of the last one.
    #[must_use]
    pub fn room(mut self, floor: i16, ceiling: i16) -> Self {
        self.rooms.push(Self::default_room(floor, ceiling));
        self
    }

    /// Light level of the last room.
    #[must_use]
    pub fn light(mut self, level: i16) -> Self {
        self.last().sector.light_level = level;
        self
    }

    /// Tag of the last room.
    #[must_use]
    pub fn tag(mut self, tag: i16) -> Self {
        self.last().sector.tag = tag;
        self
    }

    /// Sector special of the last room.
    #[must_use]
    pub fn special(mut self, special: i16) -> Self {
        self.last().sector.special = special;
        self
    }

    /// Width of the last room.
    #[must_use]
    pub fn width(mut self, width: i16) -> Self {
        self.last().width = width;
        self
    }

    /// Floor flat of the last room.
    #[must_use]
    pub fn floor_pic(mut self, name: &str) -> Self {
        self.last().sector.floor_pic = name.into();
        self
    }

    /// Special and tag on the boundary west of the last room.
    #[must_use]
    pub fn boundary_special(mut self, special: u16, tag: i16) -> Self {
        let west = &mut self.last().west;
        west.0 = special;
        west.1 = tag;
        self
    }

    /// Extra flag bits on the boundary west of the last room.
    #[must_use]
    pub fn boundary_flags(mut self, flags: u16) -> Self {
        self.last().west.2 |= flags;
        self
    }

    /// Special and tag on the north wall of the last room.
    #[must_use]
    pub fn wall_special(mut self, special: u16, tag: i16) -> Self {
        self.last().north = (special, tag);
        self
    }

    /// Place a thing, present on every skill.
    #[must_use]
    pub fn thing(mut self, kind: i16, x: i16, y: i16, angle: i16) -> Self {
        self.things.push(MapThing {
            x,
            y,
            angle,
            kind,
            options: 7,
        });
        self
    }

    /// Place player one's start.
    #[must_use]
    pub fn player_start(self, x: i16, y: i16, angle: i16) -> Self {
        self.thing(1, x, y, angle)
    }

    /// The vertical line at boundary `k`; 0 is the west wall.
    #[must_use]
    pub const fn boundary_line(k: usize) -> usize {
        3 * k
    }

    /// The east wall of a chain of `rooms` rooms.
    #[must_use]
    pub const fn east_wall(rooms: usize) -> usize {
        3 * rooms
    }

    /// South wall of room `k`.
    #[must_use]
    pub const fn south_wall(k: usize) -> usize {
        3 * k + 1
    }

    /// North wall of room `k`.
    #[must_use]
    pub const fn north_wall(k: usize) -> usize {
        3 * k + 2
    }

    /// Produce the level records.
    #[must_use]
    pub fn build(mut self) -> LevelData {
        if self.rooms.is_empty() {
            self.rooms.push(Self::default_room(0, 128));
        }
        let n = self.rooms.len();

        let mut xs = vec![0i16];
        for room in &self.rooms {
            let last = xs[xs.len() - 1];
            xs.push(last + room.width);
        }
        let bottom = |i: usize| (2 * i) as u16;
        let top = |i: usize| (2 * i + 1) as u16;

        let vertices = xs
            .iter()
            .flat_map(|&x| [VertexData { x, y: 0 }, VertexData { x, y: ROOM_DEPTH }])
            .collect();

        let wall = |sector: usize| SideData {
            x_offset: 0,
            y_offset: 0,
            top_texture: "-".into(),
            bottom_texture: "-".into(),
            mid_texture: WALL_TEXTURE.into(),
            sector: sector as u16,
        };
        let step = |sector: usize| SideData {
            x_offset: 0,
            y_offset: 0,
            top_texture: WALL_TEXTURE.into(),
            bottom_texture: STEP_TEXTURE.into(),
            mid_texture: "-".into(),
            sector: sector as u16,
        };

        let mut sides = Vec::new();
        let mut lines = Vec::new();
        let mut one_sided = |sides: &mut Vec<SideData>, v1: u16, v2: u16, sector: usize, (special, tag): (u16, i16)| {
            sides.push(wall(sector));
            lines.push(LineData {
                v1,
                v2,
                flags: LineFlags::BLOCKING,
                special,
                tag,
                front_side: (sides.len() - 1) as u16,
                back_side: None,
            });
        };

        one_sided(&mut sides, bottom(0), top(0), 0, (self.rooms[0].west.0, self.rooms[0].west.1));
        let mut boundaries = Vec::new();
        for k in 0..n {
            one_sided(&mut sides, bottom(k + 1), bottom(k), k, (0, 0));
            one_sided(&mut sides, top(k), top(k + 1), k, self.rooms[k].north);
            if k + 1 < n {
                // filled in below so the line index stays 3(k + 1)
                boundaries.push(k + 1);
                one_sided(&mut sides, top(k + 1), bottom(k + 1), k, (0, 0));
            } else {
                one_sided(&mut sides, top(n), bottom(n), k, (0, 0));
            }
        }
        for k in boundaries {
            let (special, tag, flags) = self.rooms[k].west;
            let line = &mut lines[3 * k];
            sides[line.front_side as usize] = step(k - 1);
            sides.push(step(k));
            line.flags = flags;
            line.special = special;
            line.tag = tag;
            line.back_side = Some((sides.len() - 1) as u16);
        }

        let mut segs = Vec::new();
        let mut subsectors = Vec::new();
        for k in 0..n {
            let first_seg = segs.len() as u16;
            let west = if k == 0 {
                SegData { v1: bottom(0), v2: top(0), angle: NORTH, line: 0, side: 0, offset: 0 }
            } else {
                SegData { v1: bottom(k), v2: top(k), angle: NORTH, line: (3 * k) as u16, side: 1, offset: 0 }
            };
            segs.push(west);
            segs.push(SegData { v1: bottom(k + 1), v2: bottom(k), angle: WEST, line: (3 * k + 1) as u16, side: 0, offset: 0 });
            segs.push(SegData { v1: top(k), v2: top(k + 1), angle: EAST, line: (3 * k + 2) as u16, side: 0, offset: 0 });
            segs.push(SegData { v1: top(k + 1), v2: bottom(k + 1), angle: SOUTH, line: (3 * k + 3) as u16, side: 0, offset: 0 });
            subsectors.push(SubsectorData { num_segs: 4, first_seg });
        }

        let nodes = (0..n.saturating_sub(1))
            .map(|k| {
                let split = xs[k + 1];
                NodeData {
                    x: split,
                    y: 0,
                    dx: 0,
                    dy: ROOM_DEPTH,
                    bbox: [[ROOM_DEPTH, 0, split, xs[k + 2]], [ROOM_DEPTH, 0, 0, split]],
                    children: [
                        (k + 1) as u16 | NF_SUBSECTOR,
                        if k == 0 { NF_SUBSECTOR } else { (k - 1) as u16 },
                    ],
                }
            })
            .collect();

        LevelData {
            name: "CHAIN".into(),
            vertices,
            sectors: self.rooms.iter().map(|r| r.sector.clone()).collect(),
            sides,
            lines,
            segs,
            subsectors,
            nodes,
            things: self.things,
            reject: None,
            blockmap: None,
            texture_heights: BTreeMap::from([(WALL_TEXTURE.into(), 128), (STEP_TEXTURE.into(), 16)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Level;
    use crate::math::Fixed;

    #[test]
    fn test_rooms_locate_by_x() {
        let data = RoomChain::new().room(0, 128).room(8, 128).width(64).room(16, 128).build();
        let (level, _) = Level::build(&data).unwrap();
        let f = Fixed::from_int;
        assert_eq!(level.sector_at(f(10), f(10)), 0);
        assert_eq!(level.sector_at(f(150), f(200)), 1);
        assert_eq!(level.sector_at(f(200), f(10)), 2);
        assert_eq!(level.lines.len(), 10);
    }

    #[test]
    fn test_boundaries_face_west() {
        let data = RoomChain::new().room(0, 128).room(0, 128).boundary_special(1, 0).build();
        let (level, _) = Level::build(&data).unwrap();
        let line = &level.lines[RoomChain::boundary_line(1)];
        assert_eq!(line.front_sector, 0);
        assert_eq!(line.back_sector, Some(1));
        assert_eq!(line.special, 1);
        assert!(line.is_two_sided());
        assert!(!level.lines[RoomChain::east_wall(2)].is_two_sided());
    }
}
