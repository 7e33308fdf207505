//! Level geometry: the static graph built once per level plus the few
//! fields of it that specials mutate (heights, lights, textures, line
//! specials).
//!
//! # Module Structure
//!
//! - `data`: serde records a map loader hands over
//! - `lumps`: decoding of the raw map lumps into those records
//! - `line`, `sector`, `bsp`: runtime geometry types
//! - `reject`: sector visibility rejection table
//! - `textures`: per-level texture and flat name tables
//! - `queries`: neighbour-sector searches used by specials

pub mod bsp;
pub mod data;
pub mod line;
pub mod lumps;
pub mod queries;
pub mod reject;
pub mod sector;
pub mod textures;

use serde::{Deserialize, Serialize};

use crate::blockmap::{BlockMap, MAPBLOCKSHIFT};
use crate::error::{Result, SimError};
use crate::geometry::{point_on_partition_side, BoundingBox, DivLine, SlopeType};
use crate::math::Fixed;
use crate::mobj::info::MAXRADIUS;

pub use bsp::{Child, Node, Seg, Subsector, NF_SUBSECTOR};
pub use data::{LevelData, MapThing};
pub use line::{LineDef, LineFlags, SideDef};
pub use reject::Reject;
pub use sector::{BlockBox, Sector};
pub use textures::{NameTable, TextureSet};

/// A map vertex in fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    /// X.
    pub x: Fixed,
    /// Y.
    pub y: Fixed,
}

/// A built level.
#[derive(Debug, Clone)]
pub struct Level {
    /// Map name.
    pub name: String,
    /// Vertices.
    pub vertices: Vec<Vertex>,
    /// Sectors.
    pub sectors: Vec<Sector>,
    /// Sides.
    pub sides: Vec<SideDef>,
    /// Lines.
    pub lines: Vec<LineDef>,
    /// Segs.
    pub segs: Vec<Seg>,
    /// Subsectors.
    pub subsectors: Vec<Subsector>,
    /// Nodes; the last one is the root.
    pub nodes: Vec<Node>,
    /// Visibility rejection.
    pub reject: Reject,
    /// Texture and flat names.
    pub textures: TextureSet,
    /// Things placed in the editor.
    pub things: Vec<MapThing>,
}

fn missing(kind: &'static str, index: usize, target: &'static str, target_index: usize) -> SimError {
    SimError::InvalidReference {
        kind,
        index,
        target,
        target_index,
    }
}

fn check(
    kind: &'static str,
    index: usize,
    target: &'static str,
    target_index: usize,
    len: usize,
) -> Result<usize> {
    if target_index < len {
        Ok(target_index)
    } else {
        Err(missing(kind, index, target, target_index))
    }
}

impl Level {
    /// Build the runtime level and its blockmap from loader records.
    ///
    /// Every cross reference is validated; no partial level is produced.
    pub fn build(data: &LevelData) -> Result<(Self, BlockMap)> {
        let vertices: Vec<Vertex> = data
            .vertices
            .iter()
            .map(|v| Vertex {
                x: Fixed::from_int(i32::from(v.x)),
                y: Fixed::from_int(i32::from(v.y)),
            })
            .collect();

        let mut textures = TextureSet {
            walls: NameTable::walls(),
            flats: NameTable::new(),
            heights: vec![None],
        };

        let mut sectors: Vec<Sector> = data
            .sectors
            .iter()
            .map(|s| Sector {
                floor_height: Fixed::from_int(i32::from(s.floor_height)),
                ceiling_height: Fixed::from_int(i32::from(s.ceiling_height)),
                floor_pic: textures.flats.intern(&s.floor_pic),
                ceiling_pic: textures.flats.intern(&s.ceiling_pic),
                light_level: s.light_level,
                special: s.special,
                tag: s.tag,
                lines: Vec::new(),
                things: Vec::new(),
                special_data: None,
                sound_origin: (Fixed::ZERO, Fixed::ZERO),
                blockbox: BlockBox::default(),
            })
            .collect();

        let sides = data
            .sides
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Ok(SideDef {
                    texture_offset: Fixed::from_int(i32::from(s.x_offset)),
                    row_offset: Fixed::from_int(i32::from(s.y_offset)),
                    top_texture: textures.intern_wall(&s.top_texture),
                    bottom_texture: textures.intern_wall(&s.bottom_texture),
                    mid_texture: textures.intern_wall(&s.mid_texture),
                    sector: check("side", i, "sector", usize::from(s.sector), sectors.len())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for (name, &height) in &data.texture_heights {
            let i = textures.intern_wall(name);
            textures.heights[i] = Some(Fixed::from_int(i32::from(height)));
        }

        let lines = data
            .lines
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let v1 = check("line", i, "vertex", usize::from(l.v1), vertices.len())?;
                let v2 = check("line", i, "vertex", usize::from(l.v2), vertices.len())?;
                let front_side = check("line", i, "side", usize::from(l.front_side), sides.len())?;
                let back_side = l
                    .back_side
                    .map(|b| check("line", i, "side", usize::from(b), sides.len()))
                    .transpose()?;
                let (a, b) = (vertices[v1], vertices[v2]);
                let dx = b.x - a.x;
                let dy = b.y - a.y;
                let mut bbox = BoundingBox::empty();
                (bbox.left, bbox.right) = if a.x < b.x { (a.x, b.x) } else { (b.x, a.x) };
                (bbox.bottom, bbox.top) = if a.y < b.y { (a.y, b.y) } else { (b.y, a.y) };
                Ok(LineDef {
                    v1,
                    v2,
                    x: a.x,
                    y: a.y,
                    dx,
                    dy,
                    flags: LineFlags(l.flags),
                    special: l.special,
                    tag: l.tag,
                    front_side,
                    back_side,
                    front_sector: sides[front_side].sector,
                    back_sector: back_side.map(|b| sides[b].sector),
                    bbox,
                    slope: SlopeType::classify(dx, dy)?,
                    sound_origin: (midpoint(a.x, b.x), midpoint(a.y, b.y)),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let segs = data
            .segs
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let v1 = check("seg", i, "vertex", usize::from(s.v1), vertices.len())?;
                let v2 = check("seg", i, "vertex", usize::from(s.v2), vertices.len())?;
                let line_index = check("seg", i, "line", usize::from(s.line), lines.len())?;
                let line = &lines[line_index];
                let side = usize::from(s.side != 0);
                let side_def = line
                    .side_on(side)
                    .ok_or_else(|| missing("seg", i, "side", side))?;
                let back_sector = if line.is_two_sided() {
                    let back = line
                        .side_on(side ^ 1)
                        .ok_or_else(|| missing("seg", i, "side", side ^ 1))?;
                    Some(sides[back].sector)
                } else {
                    None
                };
                Ok(Seg {
                    v1,
                    v2,
                    offset: Fixed::from_int(i32::from(s.offset)),
                    angle: crate::angle::Angle::from_bits((i32::from(s.angle) << 16) as u32),
                    line: line_index,
                    side,
                    front_sector: sides[side_def].sector,
                    back_sector,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let subsectors = data
            .subsectors
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let first = usize::from(s.first_seg);
                let count = usize::from(s.num_segs);
                if count == 0 || first + count > segs.len() {
                    return Err(missing("subsector", i, "seg", first + count));
                }
                Ok(Subsector {
                    sector: segs[first].front_sector,
                    num_segs: count,
                    first_seg: first,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let nodes = data
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| {
                for &raw in &n.children {
                    match Child::decode(raw) {
                        Child::Node(c) => {
                            check("node", i, "node", c, data.nodes.len())?;
                        }
                        Child::Subsector(c) => {
                            check("node", i, "subsector", c, subsectors.len())?;
                        }
                    }
                }
                let bbox = n.bbox.map(|[top, bottom, left, right]| BoundingBox {
                    top: Fixed::from_int(i32::from(top)),
                    bottom: Fixed::from_int(i32::from(bottom)),
                    left: Fixed::from_int(i32::from(left)),
                    right: Fixed::from_int(i32::from(right)),
                });
                Ok(Node {
                    partition: DivLine {
                        x: Fixed::from_int(i32::from(n.x)),
                        y: Fixed::from_int(i32::from(n.y)),
                        dx: Fixed::from_int(i32::from(n.dx)),
                        dy: Fixed::from_int(i32::from(n.dy)),
                    },
                    bbox,
                    children: n.children,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if nodes.is_empty() && subsectors.is_empty() && !sectors.is_empty() {
            return Err(missing("level", 0, "subsector", 0));
        }

        let blockmap = match &data.blockmap {
            Some(words) => BlockMap::from_lump(words, lines.len())?,
            None => {
                let raw: Vec<(i32, i32, i32, i32)> = data
                    .lines
                    .iter()
                    .map(|l| {
                        let a = data.vertices[usize::from(l.v1)];
                        let b = data.vertices[usize::from(l.v2)];
                        (i32::from(a.x), i32::from(a.y), i32::from(b.x), i32::from(b.y))
                    })
                    .collect();
                BlockMap::generate(&raw)
            }
        };

        group_lines(&mut sectors, &lines, &vertices, &blockmap);

        let level = Self {
            name: data.name.clone(),
            vertices,
            reject: Reject::new(data.reject.as_deref(), sectors.len()),
            sectors,
            sides,
            lines,
            segs,
            subsectors,
            nodes,
            textures,
            things: data.things.clone(),
        };

        tracing::info!(
            level = %level.name,
            vertices = level.vertices.len(),
            lines = level.lines.len(),
            sectors = level.sectors.len(),
            subsectors = level.subsectors.len(),
            nodes = level.nodes.len(),
            things = level.things.len(),
            "level built"
        );

        Ok((level, blockmap))
    }

    /// Subsector containing `(x, y)`, walking the BSP from the root.
    #[must_use]
    pub fn point_in_subsector(&self, x: Fixed, y: Fixed) -> usize {
        let Some(root) = self.nodes.len().checked_sub(1) else {
            return 0;
        };
        let mut child = Child::Node(root);
        loop {
            match child {
                Child::Subsector(s) => return s,
                Child::Node(n) => {
                    let node = &self.nodes[n];
                    let side = point_on_partition_side(x, y, &node.partition);
                    child = Child::decode(node.children[side]);
                }
            }
        }
    }

    /// Sector containing `(x, y)`.
    #[must_use]
    pub fn sector_at(&self, x: Fixed, y: Fixed) -> usize {
        self.subsectors[self.point_in_subsector(x, y)].sector
    }
}

fn midpoint(a: Fixed, b: Fixed) -> Fixed {
    Fixed::from_bits(a.to_bits().wrapping_add(b.to_bits()) / 2)
}

/// Fill in each sector's line list, sound origin and blockbox.
fn group_lines(sectors: &mut [Sector], lines: &[LineDef], vertices: &[Vertex], blockmap: &BlockMap) {
    let (origin_x, origin_y) = blockmap.origin();
    let shift = |v: Fixed| v.to_bits() >> MAPBLOCKSHIFT;

    for (index, sector) in sectors.iter_mut().enumerate() {
        let mut bbox = BoundingBox::empty();
        for (line_index, line) in lines.iter().enumerate() {
            if line.front_sector == index || line.back_sector == Some(index) {
                sector.lines.push(line_index);
                let (a, b) = (vertices[line.v1], vertices[line.v2]);
                bbox.add_point(a.x, a.y);
                bbox.add_point(b.x, b.y);
            }
        }

        sector.sound_origin = (midpoint(bbox.right, bbox.left), midpoint(bbox.top, bbox.bottom));

        let top = shift(bbox.top - origin_y + MAXRADIUS);
        let bottom = shift(bbox.bottom - origin_y - MAXRADIUS);
        let right = shift(bbox.right - origin_x + MAXRADIUS);
        let left = shift(bbox.left - origin_x - MAXRADIUS);
        sector.blockbox = BlockBox {
            top: if top >= blockmap.height() { blockmap.height() - 1 } else { top },
            bottom: bottom.max(0),
            right: if right >= blockmap.width() { blockmap.width() - 1 } else { right },
            left: left.max(0),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::data::{LineData, SectorData, SideData, SubsectorData, VertexData};

    /// One 128x128 square room, no nodes.
    fn square() -> LevelData {
        let v = |x, y| VertexData { x, y };
        let line = |v1, v2| LineData {
            v1,
            v2,
            flags: LineFlags::BLOCKING,
            special: 0,
            tag: 0,
            front_side: 0,
            back_side: None,
        };
        LevelData {
            name: "TEST".into(),
            vertices: vec![v(0, 0), v(0, 128), v(128, 128), v(128, 0)],
            sectors: vec![SectorData {
                floor_height: 0,
                ceiling_height: 128,
                floor_pic: "FLOOR4_8".into(),
                ceiling_pic: "CEIL3_5".into(),
                light_level: 160,
                special: 0,
                tag: 0,
            }],
            sides: vec![SideData {
                x_offset: 0,
                y_offset: 0,
                top_texture: "-".into(),
                bottom_texture: "-".into(),
                mid_texture: "STARTAN3".into(),
                sector: 0,
            }],
            lines: vec![line(0, 1), line(1, 2), line(2, 3), line(3, 0)],
            segs: vec![],
            subsectors: vec![],
            nodes: vec![],
            things: vec![],
            reject: None,
            blockmap: None,
            texture_heights: Default::default(),
        }
    }

    fn with_single_subsector(mut data: LevelData) -> LevelData {
        use crate::map::data::SegData;
        data.segs = (0..4)
            .map(|i| SegData {
                v1: i,
                v2: (i + 1) % 4,
                angle: 0,
                line: i,
                side: 0,
                offset: 0,
            })
            .collect();
        data.subsectors = vec![SubsectorData {
            num_segs: 4,
            first_seg: 0,
        }];
        data
    }

    #[test]
    fn test_build_square_room() {
        let (level, blockmap) = Level::build(&with_single_subsector(square())).unwrap();
        assert_eq!(level.lines.len(), 4);
        assert_eq!(level.sectors[0].lines, vec![0, 1, 2, 3]);
        assert_eq!(level.sectors[0].floor_pic, 0);
        assert_eq!(level.sectors[0].ceiling_pic, 1);
        assert_eq!(level.sides[0].mid_texture, 1);
        assert_eq!(level.sides[0].top_texture, 0);
        assert_eq!(
            level.sectors[0].sound_origin,
            (Fixed::from_int(64), Fixed::from_int(64))
        );
        // 128 units plus the inclusive far edge
        assert_eq!((blockmap.width(), blockmap.height()), (2, 2));
        assert_eq!(
            level.sectors[0].blockbox,
            BlockBox {
                top: 1,
                bottom: 0,
                left: 0,
                right: 1
            }
        );
        assert_eq!(level.lines[1].slope, SlopeType::Horizontal);
        assert_eq!(level.lines[0].slope, SlopeType::Vertical);
        assert_eq!(level.lines[0].sound_origin, (Fixed::ZERO, Fixed::from_int(64)));
    }

    #[test]
    fn test_no_nodes_is_one_region() {
        let (level, _) = Level::build(&with_single_subsector(square())).unwrap();
        assert_eq!(level.point_in_subsector(Fixed::from_int(5), Fixed::from_int(5)), 0);
        assert_eq!(level.point_in_subsector(Fixed::from_int(-500), Fixed::from_int(900)), 0);
        assert_eq!(level.sector_at(Fixed::from_int(64), Fixed::from_int(64)), 0);
    }

    #[test]
    fn test_bad_references_are_rejected() {
        let mut data = with_single_subsector(square());
        data.lines[2].v2 = 40;
        assert!(matches!(
            Level::build(&data),
            Err(SimError::InvalidReference {
                kind: "line",
                index: 2,
                target: "vertex",
                target_index: 40
            })
        ));

        let mut data = with_single_subsector(square());
        data.sides[0].sector = 3;
        assert!(matches!(
            Level::build(&data),
            Err(SimError::InvalidReference { kind: "side", .. })
        ));

        let mut data = with_single_subsector(square());
        data.subsectors[0].num_segs = 9;
        assert!(matches!(
            Level::build(&data),
            Err(SimError::InvalidReference { kind: "subsector", .. })
        ));
    }

    #[test]
    fn test_two_sided_flag_without_back_side_is_rejected() {
        let mut data = with_single_subsector(square());
        data.lines[0].flags |= LineFlags::TWO_SIDED;
        assert!(matches!(
            Level::build(&data),
            Err(SimError::InvalidReference { kind: "seg", .. })
        ));
    }

    #[test]
    fn test_texture_heights_are_interned() {
        let mut data = with_single_subsector(square());
        data.texture_heights.insert("STEP2".into(), 16);
        data.texture_heights.insert("STARTAN3".into(), 128);
        let (level, _) = Level::build(&data).unwrap();
        let step = level.textures.walls.lookup("STEP2").unwrap();
        assert_eq!(level.textures.height(step), Some(Fixed::from_int(16)));
        assert_eq!(level.textures.height(1), Some(Fixed::from_int(128)));
    }
}
