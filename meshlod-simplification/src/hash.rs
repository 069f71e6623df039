//! Open-addressing hash tables over `u32` keys
//!
//! The tables only store vertex/triangle ids; hashing and equality are delegated to a
//! [`KeyHasher`] that looks the id up in some external array. The tables are sized once
//! to a power of two that is at least the number of keys inserted, so they never grow.

use meshlod_core::{try_filled, Result, VertexPositions};

/// Marker for an unoccupied slot
pub(crate) const EMPTY: u32 = u32::MAX;

pub(crate) trait KeyHasher {
    fn hash(&self, key: u32) -> u32;
    fn equal(&self, lhs: u32, rhs: u32) -> bool;
}

/// Smallest power of two that is >= `count` (and at least 1)
pub(crate) fn hash_buckets(count: usize) -> usize {
    count.max(1).next_power_of_two()
}

#[inline]
fn murmur_finalize(mut h: u32) -> u32 {
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1e995);
    h ^= h >> 15;
    h
}

pub(crate) struct HashTable {
    slots: Vec<u32>,
}

impl HashTable {
    pub(crate) fn new(what: &'static str, key_count: usize) -> Result<Self> {
        Ok(Self {
            slots: try_filled(what, hash_buckets(key_count), EMPTY)?,
        })
    }

    pub(crate) fn clear(&mut self) {
        self.slots.fill(EMPTY);
    }

    /// Find the slot holding a key equal to `key`, or the empty slot where it belongs.
    pub(crate) fn find<H: KeyHasher>(&mut self, hasher: &H, key: u32) -> &mut u32 {
        let hashmod = self.slots.len() - 1;
        let mut bucket = hasher.hash(key) as usize & hashmod;

        for probe in 0..=hashmod {
            let item = self.slots[bucket];

            if item == EMPTY || hasher.equal(item, key) {
                return &mut self.slots[bucket];
            }

            // quadratic probing
            bucket = (bucket + probe + 1) & hashmod;
        }

        unreachable!("hash table is full")
    }
}

/// Hashes vertices by the exact bit pattern of their position (MurmurHash2 over xyz)
pub(crate) struct PositionHasher<'a> {
    pub positions: VertexPositions<'a>,
}

impl KeyHasher for PositionHasher<'_> {
    fn hash(&self, index: u32) -> u32 {
        const M: u32 = 0x5bd1e995;
        const R: u32 = 24;

        let mut h = 0u32;

        for mut k in self.positions.bits(index as usize) {
            k = k.wrapping_mul(M);
            k ^= k >> R;
            k = k.wrapping_mul(M);

            h = h.wrapping_mul(M);
            h ^= k;
        }

        h
    }

    fn equal(&self, lhs: u32, rhs: u32) -> bool {
        self.positions.bits(lhs as usize) == self.positions.bits(rhs as usize)
    }
}

/// Hashes vertices by the grid cell id they were quantized to
pub(crate) struct CellHasher<'a> {
    pub vertex_ids: &'a [u32],
}

impl KeyHasher for CellHasher<'_> {
    fn hash(&self, index: u32) -> u32 {
        murmur_finalize(self.vertex_ids[index as usize])
    }

    fn equal(&self, lhs: u32, rhs: u32) -> bool {
        self.vertex_ids[lhs as usize] == self.vertex_ids[rhs as usize]
    }
}

/// Keys are the ids themselves
pub(crate) struct IdHasher;

impl KeyHasher for IdHasher {
    fn hash(&self, id: u32) -> u32 {
        murmur_finalize(id)
    }

    fn equal(&self, lhs: u32, rhs: u32) -> bool {
        lhs == rhs
    }
}

/// Hashes triangles (keys are triangle numbers into `indices`)
pub(crate) struct TriangleHasher<'a> {
    pub indices: &'a [u32],
}

impl TriangleHasher<'_> {
    #[inline]
    fn triangle(&self, i: u32) -> &[u32] {
        let base = i as usize * 3;
        &self.indices[base..base + 3]
    }
}

impl KeyHasher for TriangleHasher<'_> {
    fn hash(&self, i: u32) -> u32 {
        let tri = self.triangle(i);

        // Teschner et al., optimized spatial hashing
        tri[0].wrapping_mul(73856093) ^ tri[1].wrapping_mul(19349663) ^ tri[2].wrapping_mul(83492791)
    }

    fn equal(&self, lhs: u32, rhs: u32) -> bool {
        self.triangle(lhs) == self.triangle(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlod_core::Point3f;

    #[test]
    fn test_hash_buckets() {
        assert_eq!(hash_buckets(0), 1);
        assert_eq!(hash_buckets(1), 1);
        assert_eq!(hash_buckets(5), 8);
        assert_eq!(hash_buckets(64), 64);
    }

    #[test]
    fn test_id_table_deduplicates() {
        let mut table = HashTable::new("test", 8).unwrap();
        let mut unique = 0;

        for id in [3, 7, 3, 1000, 7, 7, 42, 0] {
            let slot = table.find(&IdHasher, id);
            unique += (*slot == EMPTY) as usize;
            *slot = id;
        }

        assert_eq!(unique, 5);

        table.clear();
        assert_eq!(*table.find(&IdHasher, 3), EMPTY);
    }

    #[test]
    fn test_full_table_still_finds_existing_keys() {
        // every slot occupied; lookups of present keys must still succeed
        let mut table = HashTable::new("test", 4).unwrap();
        for id in 0..4 {
            *table.find(&IdHasher, id) = id;
        }
        for id in 0..4 {
            assert_eq!(*table.find(&IdHasher, id), id);
        }
    }

    #[test]
    fn test_position_hasher_is_bit_exact() {
        let points = vec![
            Point3f::new(1.0, 2.0, 3.0),
            Point3f::new(1.0, 2.0, 3.0),
            Point3f::new(1.0, 2.0, 3.0 + f32::EPSILON * 4.0),
        ];
        let hasher = PositionHasher {
            positions: VertexPositions::from_points(&points),
        };

        assert_eq!(hasher.hash(0), hasher.hash(1));
        assert!(hasher.equal(0, 1));
        assert!(!hasher.equal(0, 2));
    }

    #[test]
    fn test_triangle_hasher() {
        let indices = [0, 1, 2, 3, 4, 5, 0, 1, 2];
        let hasher = TriangleHasher { indices: &indices };

        assert!(hasher.equal(0, 2));
        assert!(!hasher.equal(0, 1));
        assert_eq!(hasher.hash(0), hasher.hash(2));
    }
}
