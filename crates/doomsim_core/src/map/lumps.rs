//! Decoding of the raw little-endian map lumps.
//!
//! Each lump is an array of fixed-size records. A lump whose length is not
//! a multiple of its record size is rejected outright.

use serde::{Deserialize, Serialize};

use super::data::{
    LevelData, LineData, MapThing, NodeData, SectorData, SegData, SideData, SubsectorData,
    VertexData,
};
use crate::error::{Result, SimError};

/// The lumps that follow a map marker, as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLumps {
    /// THINGS.
    pub things: Vec<u8>,
    /// LINEDEFS.
    pub linedefs: Vec<u8>,
    /// SIDEDEFS.
    pub sidedefs: Vec<u8>,
    /// VERTEXES.
    pub vertexes: Vec<u8>,
    /// SEGS.
    pub segs: Vec<u8>,
    /// SSECTORS.
    pub ssectors: Vec<u8>,
    /// NODES.
    pub nodes: Vec<u8>,
    /// SECTORS.
    pub sectors: Vec<u8>,
    /// REJECT, if present.
    pub reject: Option<Vec<u8>>,
    /// BLOCKMAP, if present.
    pub blockmap: Option<Vec<u8>>,
}

const THING_SIZE: usize = 10;
const LINEDEF_SIZE: usize = 14;
const SIDEDEF_SIZE: usize = 30;
const VERTEX_SIZE: usize = 4;
const SEG_SIZE: usize = 12;
const SSECTOR_SIZE: usize = 4;
const NODE_SIZE: usize = 28;
const SECTOR_SIZE: usize = 26;

/// No side on this half of the line.
const NO_SIDE: u16 = 0xFFFF;

fn records<'a>(
    lump: &'a [u8],
    name: &'static str,
    size: usize,
) -> Result<std::slice::ChunksExact<'a, u8>> {
    if lump.len() % size != 0 {
        return Err(SimError::MalformedLump {
            lump: name,
            len: lump.len(),
            record: size,
        });
    }
    Ok(lump.chunks_exact(size))
}

fn i16_at(record: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([record[offset], record[offset + 1]])
}

fn u16_at(record: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([record[offset], record[offset + 1]])
}

/// An 8-byte, NUL-padded lump name, upper-cased.
fn name_at(record: &[u8], offset: usize) -> String {
    let raw = &record[offset..offset + 8];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).to_ascii_uppercase()
}

/// Decode THINGS.
pub fn decode_things(lump: &[u8]) -> Result<Vec<MapThing>> {
    Ok(records(lump, "THINGS", THING_SIZE)?
        .map(|r| MapThing {
            x: i16_at(r, 0),
            y: i16_at(r, 2),
            angle: i16_at(r, 4),
            kind: i16_at(r, 6),
            options: i16_at(r, 8),
        })
        .collect())
}

/// Decode LINEDEFS.
pub fn decode_linedefs(lump: &[u8]) -> Result<Vec<LineData>> {
    Ok(records(lump, "LINEDEFS", LINEDEF_SIZE)?
        .map(|r| {
            let back = u16_at(r, 12);
            LineData {
                v1: u16_at(r, 0),
                v2: u16_at(r, 2),
                flags: u16_at(r, 4),
                special: u16_at(r, 6),
                tag: i16_at(r, 8),
                front_side: u16_at(r, 10),
                back_side: (back != NO_SIDE).then_some(back),
            }
        })
        .collect())
}

/// Decode SIDEDEFS.
pub fn decode_sidedefs(lump: &[u8]) -> Result<Vec<SideData>> {
    Ok(records(lump, "SIDEDEFS", SIDEDEF_SIZE)?
        .map(|r| SideData {
            x_offset: i16_at(r, 0),
            y_offset: i16_at(r, 2),
            top_texture: name_at(r, 4),
            bottom_texture: name_at(r, 12),
            mid_texture: name_at(r, 20),
            sector: u16_at(r, 28),
        })
        .collect())
}

/// Decode VERTEXES.
pub fn decode_vertexes(lump: &[u8]) -> Result<Vec<VertexData>> {
    Ok(records(lump, "VERTEXES", VERTEX_SIZE)?
        .map(|r| VertexData {
            x: i16_at(r, 0),
            y: i16_at(r, 2),
        })
        .collect())
}

/// Decode SEGS.
pub fn decode_segs(lump: &[u8]) -> Result<Vec<SegData>> {
    Ok(records(lump, "SEGS", SEG_SIZE)?
        .map(|r| SegData {
            v1: u16_at(r, 0),
            v2: u16_at(r, 2),
            angle: i16_at(r, 4),
            line: u16_at(r, 6),
            side: u16_at(r, 8),
            offset: i16_at(r, 10),
        })
        .collect())
}

/// Decode SSECTORS.
pub fn decode_ssectors(lump: &[u8]) -> Result<Vec<SubsectorData>> {
    Ok(records(lump, "SSECTORS", SSECTOR_SIZE)?
        .map(|r| SubsectorData {
            num_segs: u16_at(r, 0),
            first_seg: u16_at(r, 2),
        })
        .collect())
}

/// Decode NODES.
pub fn decode_nodes(lump: &[u8]) -> Result<Vec<NodeData>> {
    Ok(records(lump, "NODES", NODE_SIZE)?
        .map(|r| {
            let mut bbox = [[0i16; 4]; 2];
            for (side, corners) in bbox.iter_mut().enumerate() {
                for (k, value) in corners.iter_mut().enumerate() {
                    *value = i16_at(r, 8 + side * 8 + k * 2);
                }
            }
            NodeData {
                x: i16_at(r, 0),
                y: i16_at(r, 2),
                dx: i16_at(r, 4),
                dy: i16_at(r, 6),
                bbox,
                children: [u16_at(r, 24), u16_at(r, 26)],
            }
        })
        .collect())
}

/// Decode SECTORS.
pub fn decode_sectors(lump: &[u8]) -> Result<Vec<SectorData>> {
    Ok(records(lump, "SECTORS", SECTOR_SIZE)?
        .map(|r| SectorData {
            floor_height: i16_at(r, 0),
            ceiling_height: i16_at(r, 2),
            floor_pic: name_at(r, 4),
            ceiling_pic: name_at(r, 12),
            light_level: i16_at(r, 20),
            special: i16_at(r, 22),
            tag: i16_at(r, 24),
        })
        .collect())
}

/// Split BLOCKMAP into its 16-bit words.
pub fn decode_blockmap(lump: &[u8]) -> Result<Vec<i16>> {
    Ok(records(lump, "BLOCKMAP", 2)?
        .map(|r| i16_at(r, 0))
        .collect())
}

impl LevelData {
    /// Decode a level from its raw lumps.
    pub fn from_lumps(name: &str, lumps: &MapLumps) -> Result<Self> {
        Ok(Self {
            name: name.to_ascii_uppercase(),
            vertices: decode_vertexes(&lumps.vertexes)?,
            sectors: decode_sectors(&lumps.sectors)?,
            sides: decode_sidedefs(&lumps.sidedefs)?,
            lines: decode_linedefs(&lumps.linedefs)?,
            segs: decode_segs(&lumps.segs)?,
            subsectors: decode_ssectors(&lumps.ssectors)?,
            nodes: decode_nodes(&lumps.nodes)?,
            things: decode_things(&lumps.things)?,
            reject: lumps.reject.clone(),
            blockmap: lumps.blockmap.as_deref().map(decode_blockmap).transpose()?,
            texture_heights: std::collections::BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let err = decode_vertexes(&[0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            SimError::MalformedLump {
                lump: "VERTEXES",
                len: 3,
                record: 4
            }
        ));
        assert!(decode_sectors(&[0; 27]).is_err());
        assert!(decode_blockmap(&[1]).is_err());
    }

    #[test]
    fn test_empty_lumps_decode_to_nothing() {
        assert!(decode_things(&[]).unwrap().is_empty());
        assert!(decode_nodes(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_linedef_missing_back_side() {
        let lump = words(&[0, 1, 1, 0, 7, 0, -1]);
        let lines = decode_linedefs(&lump).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].tag, 7);
        assert_eq!(lines[0].front_side, 0);
        assert_eq!(lines[0].back_side, None);
        assert_eq!(lines[0].flags, 1);
    }

    #[test]
    fn test_sector_names_are_trimmed_and_upper_cased() {
        let mut lump = words(&[0, 128]);
        lump.extend_from_slice(b"flat14\0\0");
        lump.extend_from_slice(b"CEIL3_5\0");
        lump.extend(words(&[160, 9, 3]));
        let sectors = decode_sectors(&lump).unwrap();
        assert_eq!(sectors[0].floor_pic, "FLAT14");
        assert_eq!(sectors[0].ceiling_pic, "CEIL3_5");
        assert_eq!(sectors[0].light_level, 160);
        assert_eq!(sectors[0].special, 9);
        assert_eq!(sectors[0].tag, 3);
    }

    #[test]
    fn test_node_layout() {
        let mut values = vec![64, 0, 0, 128];
        values.extend([128, 0, 64, 128, 128, 0, 0, 64]);
        let mut lump = words(&values);
        lump.extend_from_slice(&0x8001u16.to_le_bytes());
        lump.extend_from_slice(&0x8000u16.to_le_bytes());
        let nodes = decode_nodes(&lump).unwrap();
        assert_eq!(nodes[0].dy, 128);
        assert_eq!(nodes[0].bbox[0], [128, 0, 64, 128]);
        assert_eq!(nodes[0].bbox[1], [128, 0, 0, 64]);
        assert_eq!(nodes[0].children, [0x8001, 0x8000]);
    }
}
