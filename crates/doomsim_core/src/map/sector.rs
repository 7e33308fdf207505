//! Sectors: the floor/ceiling regions movers and lights act on.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::Fixed;
use crate::thinker::ThinkerId;

/// Blockmap cells a sector's things can be in, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockBox {
    /// Highest row.
    pub top: i32,
    /// Lowest row.
    pub bottom: i32,
    /// Lowest column.
    pub left: i32,
    /// Highest column.
    pub right: i32,
}

/// A sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    /// Floor height.
    pub floor_height: Fixed,
    /// Ceiling height.
    pub ceiling_height: Fixed,
    /// Floor flat.
    pub floor_pic: usize,
    /// Ceiling flat.
    pub ceiling_pic: usize,
    /// Light level.
    pub light_level: i16,
    /// Special effect; some are cleared once handled.
    pub special: i16,
    /// Tag matched by line triggers.
    pub tag: i16,
    /// Bounding lines, in line order.
    pub lines: Vec<usize>,
    /// Things whose centre is inside, most recently linked first.
    pub things: Vec<ThinkerId>,
    /// The mover currently owning this sector.
    pub special_data: Option<ThinkerId>,
    /// Sector sounds come from the centre of its bounds.
    pub sound_origin: (Fixed, Fixed),
    /// Blockmap cells touched by the sector grown by the largest thing
    /// radius.
    pub blockbox: BlockBox,
}

impl Sector {
    /// Record `owner` as this sector's mover.
    ///
    /// Spawning code checks [`Sector::is_busy`] first; claiming a sector
    /// that already has a mover is a contract violation.
    pub fn claim(&mut self, index: usize, owner: ThinkerId) -> Result<()> {
        if self.special_data.is_some() {
            return Err(SimError::SectorBusy(index));
        }
        self.special_data = Some(owner);
        Ok(())
    }

    /// Clear the mover reference.
    pub fn release(&mut self) {
        self.special_data = None;
    }

    /// Whether a mover owns this sector.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.special_data.is_some()
    }

    pub(crate) fn link_thing(&mut self, id: ThinkerId) {
        self.things.insert(0, id);
    }

    pub(crate) fn unlink_thing(&mut self, id: ThinkerId) {
        self.things.retain(|&other| other != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector() -> Sector {
        Sector {
            floor_height: Fixed::ZERO,
            ceiling_height: Fixed::from_int(128),
            floor_pic: 0,
            ceiling_pic: 0,
            light_level: 160,
            special: 0,
            tag: 0,
            lines: Vec::new(),
            things: Vec::new(),
            special_data: None,
            sound_origin: (Fixed::ZERO, Fixed::ZERO),
            blockbox: BlockBox::default(),
        }
    }

    #[test]
    fn test_second_claim_is_rejected() {
        let mut s = sector();
        let a = ThinkerId::from_raw(1, 0);
        let b = ThinkerId::from_raw(2, 0);
        s.claim(5, a).unwrap();
        assert!(s.is_busy());
        assert!(matches!(s.claim(5, b), Err(SimError::SectorBusy(5))));
        assert_eq!(s.special_data, Some(a));
        s.release();
        s.claim(5, b).unwrap();
        assert_eq!(s.special_data, Some(b));
    }

    #[test]
    fn test_thing_links_are_head_first() {
        let mut s = sector();
        let a = ThinkerId::from_raw(1, 0);
        let b = ThinkerId::from_raw(2, 0);
        s.link_thing(a);
        s.link_thing(b);
        assert_eq!(s.things, vec![b, a]);
        s.unlink_thing(b);
        assert_eq!(s.things, vec![a]);
    }
}
