//! Level records as handed over by a map loader.
//!
//! Coordinates are whole map units and textures are names, exactly as they
//! appear in the level lumps. [`super::Level::build`] turns these into the
//! fixed-point runtime graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A map vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexData {
    /// X in map units.
    pub x: i16,
    /// Y in map units.
    pub y: i16,
}

/// A sector record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorData {
    /// Floor height.
    pub floor_height: i16,
    /// Ceiling height.
    pub ceiling_height: i16,
    /// Floor flat name.
    pub floor_pic: String,
    /// Ceiling flat name.
    pub ceiling_pic: String,
    /// Light level, 0..=255.
    pub light_level: i16,
    /// Special effect number.
    pub special: i16,
    /// Tag matched by line triggers.
    pub tag: i16,
}

/// A side record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideData {
    /// Horizontal texture offset.
    pub x_offset: i16,
    /// Vertical texture offset.
    pub y_offset: i16,
    /// Upper texture name, `-` for none.
    pub top_texture: String,
    /// Lower texture name, `-` for none.
    pub bottom_texture: String,
    /// Middle texture name, `-` for none.
    pub mid_texture: String,
    /// Sector this side faces.
    pub sector: u16,
}

/// A line record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineData {
    /// Start vertex.
    pub v1: u16,
    /// End vertex.
    pub v2: u16,
    /// `ML_*` flag bits.
    pub flags: u16,
    /// Special action number.
    pub special: u16,
    /// Sector tag the special acts on.
    pub tag: i16,
    /// Right-hand side.
    pub front_side: u16,
    /// Left-hand side, absent for one-sided walls.
    #[serde(default)]
    pub back_side: Option<u16>,
}

/// A BSP seg record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegData {
    /// Start vertex.
    pub v1: u16,
    /// End vertex.
    pub v2: u16,
    /// Angle in BAM >> 16.
    pub angle: i16,
    /// Parent line.
    pub line: u16,
    /// 0 when running along the line's front side.
    pub side: u16,
    /// Distance from the line start.
    pub offset: i16,
}

/// A subsector record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsectorData {
    /// Seg count.
    pub num_segs: u16,
    /// First seg.
    pub first_seg: u16,
}

/// A BSP node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    /// Partition origin x.
    pub x: i16,
    /// Partition origin y.
    pub y: i16,
    /// Partition direction x.
    pub dx: i16,
    /// Partition direction y.
    pub dy: i16,
    /// Child bounds as `[top, bottom, left, right]`, front then back.
    pub bbox: [[i16; 4]; 2],
    /// Children; the top bit marks a subsector.
    pub children: [u16; 2],
}

/// A map thing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapThing {
    /// X in map units.
    pub x: i16,
    /// Y in map units.
    pub y: i16,
    /// Facing in degrees.
    pub angle: i16,
    /// Editor number.
    pub kind: i16,
    /// `MTF_*` option bits.
    pub options: i16,
}

/// Everything a level is built from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelData {
    /// Map lump name, e.g. `E1M1`.
    pub name: String,
    /// Vertices.
    pub vertices: Vec<VertexData>,
    /// Sectors.
    pub sectors: Vec<SectorData>,
    /// Sides.
    pub sides: Vec<SideData>,
    /// Lines.
    pub lines: Vec<LineData>,
    /// Segs.
    pub segs: Vec<SegData>,
    /// Subsectors.
    pub subsectors: Vec<SubsectorData>,
    /// Nodes; the last one is the root.
    pub nodes: Vec<NodeData>,
    /// Things placed in the editor.
    pub things: Vec<MapThing>,
    /// Packed sector-to-sector visibility bits.
    #[serde(default)]
    pub reject: Option<Vec<u8>>,
    /// Blockmap lump as 16-bit words; generated when absent.
    #[serde(default)]
    pub blockmap: Option<Vec<i16>>,
    /// Wall texture heights by name, used by raise-to-texture floors.
    #[serde(default)]
    pub texture_heights: BTreeMap<String, i16>,
}

impl LevelData {
    /// Parse a level from RON text.
    pub fn from_ron(text: &str) -> crate::error::Result<Self> {
        ron::from_str(text)
            .map_err(|e| crate::error::SimError::Serialization(format!("level: {e}")))
    }
}
