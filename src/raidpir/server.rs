use super::{prg_share, xor_into, SelectionBits};
use crate::config_err;
use crate::error::Result;
use crate::partition::PartitionLayout;
use bitvec::prelude::*;
use rand::RngCore;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Upper bound on precomputed seed shares kept per replica
pub const SEED_CACHE_CAPACITY: usize = 64;

/// Blocks per subset table; one selection byte indexes one table
const TABLE_GROUP: usize = 8;

/// Replica side of RAID-PIR.
///
/// Issues seeds and, for each issued seed, precomputes the XOR of the
/// blocks its PRG share selects, so a query only costs the explicit chunk.
pub struct RaidPirServer {
    layout: PartitionLayout,
    db: Vec<u8>,
    replica: usize,
    precomputed: Mutex<HashMap<u64, Vec<u8>>>,
    /// Per group of 8 blocks, the XOR of each of the 256 subsets. Empty for
    /// groups outside the covered chunks, `None` unless enabled.
    subset_tables: Option<Vec<Vec<u8>>>,
}

impl RaidPirServer {
    pub fn new(layout: PartitionLayout, db: Vec<u8>, replica: usize) -> Result<Self> {
        if db.len() != layout.descriptor.db_size {
            return Err(config_err!(
                "database has {} bytes, layout expects {}",
                db.len(),
                layout.descriptor.db_size
            ));
        }
        if replica >= layout.servers {
            return Err(config_err!(
                "replica id {} out of range for {} servers",
                replica,
                layout.servers
            ));
        }
        Ok(Self {
            layout,
            db,
            replica,
            precomputed: Mutex::new(HashMap::new()),
            subset_tables: None,
        })
    }

    /// Precompute subset XOR tables for the covered chunks (Method of Four
    /// Russians). Block selection then costs one XOR per selection byte
    /// instead of one per set bit, for 32 times the covered chunks' size in
    /// memory.
    pub fn with_four_russians(mut self) -> Self {
        let t0 = Instant::now();
        let groups_per_chunk = self.layout.chunk_blocks() / TABLE_GROUP;
        let covered: Vec<usize> = self.layout.covered_chunks(self.replica).collect();
        let tables: Vec<Vec<u8>> = (0..self.layout.partitions / TABLE_GROUP)
            .into_par_iter()
            .map(|group| {
                if covered.contains(&(group / groups_per_chunk)) {
                    self.subset_table(group)
                } else {
                    Vec::new()
                }
            })
            .collect();
        info!(
            replica = self.replica,
            bytes = tables.iter().map(Vec::len).sum::<usize>(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "subset tables ready"
        );
        self.subset_tables = Some(tables);
        self
    }

    /// XORs of every subset of blocks `8·group .. 8·group + 8`, entry `mask`
    /// covering the blocks whose bit is set in `mask`
    fn subset_table(&self, group: usize) -> Vec<u8> {
        let pb = self.layout.partition_bytes();
        let mut table = vec![0u8; (1 << TABLE_GROUP) * pb];
        for mask in 1..1usize << TABLE_GROUP {
            let block = self.block(group * TABLE_GROUP + mask.trailing_zeros() as usize);
            let (done, rest) = table.split_at_mut(mask * pb);
            let without_lowest = mask & (mask - 1);
            let entry = &mut rest[..pb];
            entry.copy_from_slice(&done[without_lowest * pb..(without_lowest + 1) * pb]);
            xor_into(entry, block);
        }
        table
    }

    pub fn replica(&self) -> usize {
        self.replica
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    fn block(&self, id: usize) -> &[u8] {
        &self.db[self.layout.partition(id).range]
    }

    /// XOR of the blocks of `chunk` whose bit is set
    fn xor_chunk(&self, acc: &mut [u8], chunk: usize, bits: &BitSlice<u8, Lsb0>) {
        let base = chunk * self.layout.chunk_blocks();
        let pb = self.layout.partition_bytes();
        for (k, group_bits) in bits.chunks(TABLE_GROUP).enumerate() {
            let group = base / TABLE_GROUP + k;
            let table = self
                .subset_tables
                .as_ref()
                .and_then(|tables| tables.get(group))
                .filter(|table| !table.is_empty());
            match table {
                Some(table) => {
                    let mask = group_bits.iter_ones().fold(0usize, |m, i| m | 1 << i);
                    if mask != 0 {
                        xor_into(acc, &table[mask * pb..(mask + 1) * pb]);
                    }
                }
                None => {
                    for i in group_bits.iter_ones() {
                        xor_into(acc, self.block(base + k * TABLE_GROUP + i));
                    }
                }
            }
        }
    }

    /// XOR of the blocks selected by the PRG share of `seed`
    fn seeded_part(&self, seed: u64) -> Vec<u8> {
        let cb = self.layout.chunk_blocks();
        let share = prg_share(seed, self.layout.redundancy, cb);
        let mut acc = vec![0u8; self.layout.partition_bytes()];
        for (m, chunk) in self.layout.covered_chunks(self.replica).enumerate().skip(1) {
            self.xor_chunk(&mut acc, chunk, &share[(m - 1) * cb..m * cb]);
        }
        acc
    }

    /// Issue a fresh seed and precompute its share
    pub fn issue_seed(&self) -> u64 {
        let seed = rand::thread_rng().next_u64();
        let part = self.seeded_part(seed);
        let mut cache = self.precomputed.lock().unwrap_or_else(|e| e.into_inner());
        if cache.len() >= SEED_CACHE_CAPACITY {
            // stale seeds from abandoned sessions
            cache.clear();
        }
        cache.insert(seed, part);
        trace!(replica = self.replica, "issued seed");
        seed
    }

    /// Masked block for a seed and the client's explicit share
    pub fn response(&self, seed: u64, explicit: &SelectionBits) -> Result<Vec<u8>> {
        let cb = self.layout.chunk_blocks();
        if explicit.len() != cb {
            return Err(config_err!(
                "explicit share has {} bits, expected {}",
                explicit.len(),
                cb
            ));
        }

        let cached = self
            .precomputed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&seed);
        let mut acc = match cached {
            Some(part) => part,
            None => {
                debug!(replica = self.replica, "seed not precomputed, recomputing");
                self.seeded_part(seed)
            }
        };

        self.xor_chunk(&mut acc, self.replica, explicit);
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::DatabaseDescriptor;

    fn server() -> RaidPirServer {
        let desc = DatabaseDescriptor::new(64 * 32, 32).unwrap();
        let layout = PartitionLayout::new(desc, 2, 16, 2).unwrap();
        let db: Vec<u8> = (0..desc.db_size).map(|i| (i % 251) as u8).collect();
        RaidPirServer::new(layout, db, 1).unwrap()
    }

    #[test]
    fn test_cached_and_uncached_agree() {
        let s = server();
        let seed = s.issue_seed();
        let explicit = SelectionBits::from_vec(vec![0b1010_0101]);
        let cached = s.response(seed, &explicit).unwrap();
        // second call misses the cache and recomputes
        let recomputed = s.response(seed, &explicit).unwrap();
        assert_eq!(cached, recomputed);
    }

    #[test]
    fn test_explicit_bits_select_own_chunk() {
        let s = server();
        let seed = 5;
        let none = s.response(seed, &SelectionBits::from_vec(vec![0])).unwrap();
        let one = s.response(seed, &SelectionBits::from_vec(vec![1])).unwrap();
        // replica 1 owns chunk 1, whose first block is partition 8
        let mut diff = none.clone();
        xor_into(&mut diff, &one);
        assert_eq!(diff, s.block(8));
    }

    #[test]
    fn test_four_russians_matches_plain_selection() {
        let plain = server();
        let tabled = server().with_four_russians();
        let tables = tabled.subset_tables.as_ref().unwrap();
        // replica 1 of 2 with redundancy 2 covers both chunks
        assert!(tables.iter().all(|t| t.len() == 256 * tabled.layout.partition_bytes()));
        for (seed, byte) in [(3u64, 0u8), (4, 0xff), (5, 0b0110_1001), (6, 0x80)] {
            let explicit = SelectionBits::from_vec(vec![byte]);
            assert_eq!(
                plain.response(seed, &explicit).unwrap(),
                tabled.response(seed, &explicit).unwrap(),
                "seed {} explicit {:#010b}",
                seed,
                byte
            );
        }
    }

    #[test]
    fn test_four_russians_skips_uncovered_chunks() {
        // 4 servers, redundancy 2: replica 0 covers chunks 0 and 1 only
        let desc = DatabaseDescriptor::new(64 * 32, 32).unwrap();
        let layout = PartitionLayout::new(desc, 2, 64, 4).unwrap();
        let db: Vec<u8> = (0..desc.db_size).map(|i| (i % 253) as u8).collect();
        let s = RaidPirServer::new(layout, db, 0).unwrap().with_four_russians();
        let covered: Vec<usize> = s.layout.covered_chunks(0).collect();
        let tables = s.subset_tables.as_ref().unwrap();
        for (group, table) in tables.iter().enumerate() {
            assert_eq!(!table.is_empty(), covered.contains(&(group / 2)), "group {}", group);
        }
        let mut expected = s.block(2).to_vec();
        xor_into(&mut expected, s.block(5));
        assert_eq!(&tables[0][0b0010_0100 * 32..0b0010_0101 * 32], expected.as_slice());
    }

    #[test]
    fn test_rejects_wrong_share_length() {
        let s = server();
        assert!(s.response(1, &SelectionBits::from_vec(vec![0, 0])).is_err());
    }

    #[test]
    fn test_rejects_bad_construction() {
        let desc = DatabaseDescriptor::new(64 * 32, 32).unwrap();
        let layout = PartitionLayout::new(desc, 2, 16, 2).unwrap();
        assert!(RaidPirServer::new(layout.clone(), vec![0; 10], 0).is_err());
        assert!(RaidPirServer::new(layout, vec![0; 64 * 32], 2).is_err());
    }
}
