//! Stable hashing for world state.
//!
//! State hashes outlive the process that computed them: replays store the
//! final hash and the headless runner compares hashes across machines. So
//! the hash is 64-bit FNV-1a over an explicit byte stream: values are fed
//! through bincode (fixed-width little-endian integers, `usize` as `u64`),
//! never through the platform's native layout.

use std::hash::Hasher;
use std::io;

use serde::Serialize;

/// FNV-1a 64-bit offset basis.
pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a 64-bit prime.
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a accumulator with width- and endian-independent integer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHasher(u64);

impl Default for StateHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHasher {
    /// Start from the offset basis.
    #[must_use]
    pub const fn new() -> Self {
        Self(FNV_OFFSET_BASIS)
    }

    /// Fold raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    /// Fold any serializable value through its bincode encoding.
    pub fn add<T: Serialize + ?Sized>(&mut self, value: &T) {
        if let Err(e) = bincode::serialize_into(&mut *self, value) {
            tracing::warn!(error = %e, "state value could not be encoded for hashing");
            self.write_bytes(b"\xffunencodable");
        }
    }

    /// The hash so far.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl io::Write for StateHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Hasher for StateHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.write_bytes(bytes);
    }

    fn write_u8(&mut self, i: u8) {
        self.write_bytes(&[i]);
    }

    fn write_u16(&mut self, i: u16) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_u32(&mut self, i: u32) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_u128(&mut self, i: u128) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    fn write_i8(&mut self, i: i8) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_i16(&mut self, i: i16) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_i32(&mut self, i: i32) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_i64(&mut self, i: i64) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_i128(&mut self, i: i128) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_isize(&mut self, i: isize) {
        self.write_i64(i as i64);
    }
}

/// Fold a tic's state hash into a running hash.
#[must_use]
pub fn combine_hash(running: u64, tic_hash: u64) -> u64 {
    let mut hasher = StateHasher::new();
    hasher.write_u64(running);
    hasher.write_u64(tic_hash);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fnv(bytes: &[u8]) -> u64 {
        let mut hasher = StateHasher::new();
        hasher.write_bytes(bytes);
        hasher.value()
    }

    #[test]
    fn test_fnv1a_reference_vectors() {
        assert_eq!(fnv(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_combine_hash_golden() {
        assert_eq!(combine_hash(1, 2), 0x7717_9803_63c8_e066);
        assert_ne!(combine_hash(1, 2), combine_hash(2, 1));
    }

    #[test]
    fn test_serialized_values_are_little_endian() {
        let mut hasher = StateHasher::new();
        hasher.add(&(1u16, -1i32, Some(3u32)));
        assert_eq!(hasher.value(), 0xe990_af7f_cadf_87d0);
        assert_eq!(
            hasher.value(),
            fnv(&[1, 0, 0xff, 0xff, 0xff, 0xff, 1, 3, 0, 0, 0])
        );
    }

    #[test]
    fn test_usize_hashes_as_u64() {
        let mut a = StateHasher::new();
        a.add(&7usize);
        let mut b = StateHasher::new();
        b.add(&7u64);
        assert_eq!(a, b);

        let mut c = StateHasher::new();
        c.write_usize(7);
        let mut d = StateHasher::new();
        d.write_u64(7);
        assert_eq!(c.finish(), d.finish());
        assert_eq!(c.finish(), a.value());
    }
}
