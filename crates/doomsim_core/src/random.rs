//! The deterministic random number generator.
//!
//! A fixed 256-entry table walked by an index. The output depends only on
//! how many numbers have been drawn, so every draw is part of the
//! reproducible state and one generator belongs to exactly one world.

use serde::{Deserialize, Serialize};

#[rustfmt::skip]
static RNDTABLE: [u8; 256] = [
    0,   8, 109, 220, 222, 241, 149, 107,  75, 248, 254, 140,  16,  66,
    74,  21, 211,  47,  80, 242, 154,  27, 205, 128, 161,  89,  77,  36,
    95, 110,  85,  48, 212, 140, 211, 249,  22,  79, 200,  50,  28, 188,
    52, 140, 202, 120,  68, 145,  62,  70, 184, 190,  91, 197, 152, 224,
    149, 104,  25, 178, 252, 182, 202, 182, 141, 197,   4,  81, 181, 242,
    145,  42,  39, 227, 156, 198, 225, 193, 219,  93, 122, 175, 249,   0,
    175, 143,  70, 239,  46, 246, 163,  53, 163, 109, 168, 135,   2, 235,
    25,  92,  20, 145, 138,  77,  69, 166,  78, 176, 173, 212, 166, 113,
    94, 161,  41,  50, 239,  49, 111, 164,  70,  60,   2,  37, 171,  75,
    136, 156,  11,  56,  42, 146, 138, 229,  73, 146,  77,  61,  98, 196,
    135, 106,  63, 197, 195,  86,  96, 203, 113, 101, 170, 247, 181, 113,
    80, 250, 108,   7, 255, 237, 129, 226,  79, 107, 112, 166, 103, 241,
    24, 223, 239, 120, 198,  58,  60,  82, 128,   3, 184,  66, 143, 224,
    145, 224,  81, 206, 163,  45,  63,  90, 168, 114,  59,  33, 159,  95,
    28, 139, 123,  98, 125, 196,  15,  70, 194, 253,  54,  14, 109, 226,
    71,  17, 161,  93, 186,  87, 244, 138,  20,  52, 123, 251,  26,  36,
    17,  46,  52, 231, 232,  76,  31, 221,  84,  37, 216, 165, 212, 106,
    197, 242,  98,  43,  39, 175, 254, 145, 190,  84, 118, 222, 187, 136,
    120, 163, 236, 249,
];

/// Table-driven generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rng {
    index: u8,
}

impl Rng {
    /// A generator at the start of the table.
    #[must_use]
    pub const fn new() -> Self {
        Self { index: 0 }
    }

    /// Next value in `0..=255`.
    pub fn draw(&mut self) -> i32 {
        self.index = self.index.wrapping_add(1);
        i32::from(RNDTABLE[usize::from(self.index)])
    }

    /// `draw() - draw()`, evaluated left to right.
    pub fn sub_random(&mut self) -> i32 {
        let a = self.draw();
        let b = self.draw();
        a - b
    }

    /// Number of draws modulo 256.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_start() {
        let mut rng = Rng::new();
        assert_eq!(rng.draw(), 8);
        assert_eq!(rng.draw(), 109);
        assert_eq!(rng.draw(), 220);
        assert_eq!(rng.index(), 3);
    }

    #[test]
    fn test_wraps_after_256_draws() {
        let mut rng = Rng::new();
        for _ in 0..255 {
            rng.draw();
        }
        assert_eq!(rng.index(), 255);
        assert_eq!(rng.draw(), 0);
        assert_eq!(rng.draw(), 8);
    }

    #[test]
    fn test_sub_random_order() {
        let mut rng = Rng::new();
        assert_eq!(rng.sub_random(), 8 - 109);
    }

    #[test]
    fn test_independent_generators() {
        let mut a = Rng::new();
        let mut b = Rng::new();
        a.draw();
        a.draw();
        assert_eq!(b.draw(), 8);
        assert_eq!(a.draw(), 220);
    }
}
