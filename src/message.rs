//! Wire messages exchanged between a client and a replica.
//!
//! A retrieval is two rounds: `Hello` → `Seed`, then `Query` → `Response`.
//! Every message carries the client's per-retrieval session id, so a
//! reply belonging to an abandoned call can be recognised and dropped.
//!
//! Payloads are bincode with fixed-width integers, so for a fixed
//! configuration the encoded size of a `Query` does not depend on the
//! element being fetched.

use crate::error::{HybridPirError, Result};
use crate::ks::GaloisKeys;
use crate::sealpir::{SealPirQuery, SealPirReply};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Largest frame accepted by [`HybridPirMessage::read_from`]
pub const MAX_FRAME_BYTES: u64 = 256 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HybridPirMessage {
    /// Opens a retrieval; the replica answers with a fresh seed
    Hello { session: u64 },
    /// Seed of the replica's PRG share
    Seed { session: u64, seed: u64 },
    /// Explicit RAID-PIR bits for the replica's own chunk plus the SealPIR
    /// sub-query over the masked partition
    Query {
        session: u64,
        seed: u64,
        raidpir_query: Vec<u8>,
        galois_keys: GaloisKeys,
        sealpir_query: SealPirQuery,
    },
    Response { session: u64, reply: SealPirReply },
    Error { session: u64, reason: String },
}

impl HybridPirMessage {
    pub fn session(&self) -> u64 {
        match self {
            HybridPirMessage::Hello { session }
            | HybridPirMessage::Seed { session, .. }
            | HybridPirMessage::Query { session, .. }
            | HybridPirMessage::Response { session, .. }
            | HybridPirMessage::Error { session, .. } => *session,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            HybridPirMessage::Hello { .. } => "hello",
            HybridPirMessage::Seed { .. } => "seed",
            HybridPirMessage::Query { .. } => "query",
            HybridPirMessage::Response { .. } => "response",
            HybridPirMessage::Error { .. } => "error",
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Write a length-prefixed frame
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let body = self.to_bytes()?;
        writer.write_all(&(body.len() as u64).to_le_bytes())?;
        writer.write_all(&body)?;
        writer.flush()?;
        Ok(())
    }

    /// Read one length-prefixed frame
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut len = [0u8; 8];
        reader.read_exact(&mut len)?;
        let len = u64::from_le_bytes(len);
        if len > MAX_FRAME_BYTES {
            return Err(HybridPirError::Codec(format!(
                "frame of {} bytes exceeds limit of {}",
                len, MAX_FRAME_BYTES
            )));
        }
        let mut body = vec![0u8; len as usize];
        reader.read_exact(&mut body)?;
        Self::from_bytes(&body)
    }
}
