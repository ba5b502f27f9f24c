//! HybridPIR: multi-server private information retrieval
//!
//! Two layers hide which element a client reads:
//! - RAID-PIR across replicas: the database is cut into blocks, and the
//!   client sends each replica an XOR share of the wanted block's unit
//!   vector. A single replica learns nothing about the block.
//! - SealPIR inside the block: the client sends an RLWE-encrypted hypercube
//!   selection, so even the XOR-masked block is never read in the clear.
//!
//! Lattice arithmetic is layered bottom-up: `math` (Z_q, NTT, polynomials),
//! `rlwe` (encryption, Galois automorphisms) and `ks` (key switching).

pub mod params;
pub mod error;
pub mod math;
pub mod rlwe;
pub mod ks;
pub mod partition;
pub mod engine;
pub mod raidpir;
pub mod sealpir;
pub mod message;
pub mod transport;
pub mod dispatch;
pub mod assemble;
pub mod client;
pub mod server;
pub mod bench;

pub use assemble::{assemble, RetrievedElement};
pub use client::{retrieve, HybridPirClient};
pub use dispatch::{dispatch_round, require_quorum};
pub use engine::SubQueryEngine;
pub use error::{HybridPirError, Result};
pub use message::HybridPirMessage;
pub use params::{DispatchConfig, RetrievalParams, SealPirParams};
pub use partition::{DatabaseDescriptor, PartitionAssignment, PartitionLayout};
pub use raidpir::{RaidPirClient, RaidPirServer};
pub use sealpir::{SealPirClient, SealPirLayout};
pub use server::HybridPirServer;
pub use transport::{HttpTransport, LocalTransport, Target, Transport};
