//! The reject table: a precomputed "cannot possibly see" bit per sector
//! pair.

use serde::{Deserialize, Serialize};

/// Sector-to-sector visibility rejection bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reject {
    num_sectors: usize,
    bits: Vec<u8>,
}

impl Reject {
    /// Wrap a REJECT lump. Missing or short data reads as "may see".
    #[must_use]
    pub fn new(lump: Option<&[u8]>, num_sectors: usize) -> Self {
        let needed = (num_sectors * num_sectors).div_ceil(8);
        let mut bits = lump.map(<[u8]>::to_vec).unwrap_or_default();
        if bits.len() < needed {
            if !bits.is_empty() {
                tracing::warn!(have = bits.len(), needed, "REJECT lump is short, padding with zeroes");
            }
            bits.resize(needed, 0);
        }
        Self { num_sectors, bits }
    }

    /// Whether a thing in sector `from` could possibly see into sector
    /// `to`.
    #[must_use]
    pub fn can_see(&self, from: usize, to: usize) -> bool {
        let pnum = from * self.num_sectors + to;
        let byte = self.bits.get(pnum >> 3).copied().unwrap_or(0);
        byte & (1 << (pnum & 7)) == 0
    }

    /// Sector count the table was built for.
    #[must_use]
    pub const fn num_sectors(&self) -> usize {
        self.num_sectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_sees_everything() {
        let reject = Reject::new(None, 5);
        for a in 0..5 {
            for b in 0..5 {
                assert!(reject.can_see(a, b));
            }
        }
    }

    #[test]
    fn test_bit_layout() {
        // 3 sectors: pair (0, 1) is bit 1, pair (1, 0) is bit 3
        let reject = Reject::new(Some(&[0b0000_1010, 0]), 3);
        assert!(!reject.can_see(0, 1));
        assert!(!reject.can_see(1, 0));
        assert!(reject.can_see(0, 2));
        assert!(reject.can_see(1, 1));
    }

    #[test]
    fn test_symmetric_table_is_symmetric() {
        // hide sector 2 from sector 0 both ways in a 4-sector table
        let n = 4;
        let mut bytes = vec![0u8; 2];
        for (a, b) in [(0usize, 2usize), (2, 0)] {
            let p = a * n + b;
            bytes[p >> 3] |= 1 << (p & 7);
        }
        let reject = Reject::new(Some(&bytes), n);
        for a in 0..n {
            assert!(reject.can_see(a, a));
            for b in 0..n {
                assert_eq!(reject.can_see(a, b), reject.can_see(b, a));
            }
        }
        assert!(!reject.can_see(0, 2));
    }
}
