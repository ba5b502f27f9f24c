//! RAID-PIR: XOR-shared block selection across replicas.
//!
//! The `partitions` blocks are grouped into one chunk per replica. Replica
//! j covers chunks j..j+r-1. For every chunk after its own, its selection
//! bits come from a ChaCha20 stream keyed by a seed the replica itself
//! issued, so only the bits for its own chunk travel over the wire. The
//! client picks those explicit bits so that, chunk by chunk, the XOR of all
//! replicas' bits is the unit vector of the wanted block.
//!
//! Any single replica sees an explicit vector masked by PRG output of the
//! other replicas' seeds, so on its own it is uniformly random.

mod client;
mod server;

pub use client::RaidPirClient;
pub use server::RaidPirServer;

use bitvec::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Selection bits, one per block of a chunk
pub type SelectionBits = BitVec<u8, Lsb0>;

/// PRG share of replica with seed `seed`: `(redundancy - 1) * chunk_blocks`
/// bits, segment m-1 covering the replica's m-th chunk after its own.
pub(crate) fn prg_share(seed: u64, redundancy: usize, chunk_blocks: usize) -> SelectionBits {
    let mut bytes = vec![0u8; (redundancy - 1) * chunk_blocks / 8];
    ChaCha20Rng::seed_from_u64(seed).fill_bytes(&mut bytes);
    SelectionBits::from_vec(bytes)
}

/// XOR `src` into `dst`, byte by byte
pub(crate) fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
