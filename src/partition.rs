//! Index partitioning.
//!
//! The database of `db_size / element_size` elements is cut into
//! `raidpir_size` equally sized partitions, which are the RAID-PIR blocks.
//! Blocks are grouped into one chunk per replica; replica j covers chunks
//! j, j+1, ..., j+r-1 (mod servers), so every chunk is held by exactly r
//! replicas.

use crate::config_err;
use crate::error::Result;
use crate::params::RetrievalParams;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Logical shape of the retrievable dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    pub db_size: usize,
    pub element_size: usize,
    pub element_count: usize,
}

impl DatabaseDescriptor {
    pub fn new(db_size: usize, element_size: usize) -> Result<Self> {
        if element_size == 0 {
            return Err(config_err!("element_size must be positive"));
        }
        if db_size % element_size != 0 {
            return Err(config_err!(
                "element_size {} does not divide db_size {}",
                element_size,
                db_size
            ));
        }
        let element_count = db_size / element_size;
        if element_count == 0 {
            return Err(config_err!("database holds no elements"));
        }
        Ok(Self {
            db_size,
            element_size,
            element_count,
        })
    }
}

/// A contiguous slice of the database; one RAID-PIR block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub id: usize,
    /// Byte range within the database
    pub range: Range<usize>,
}

/// Where one global index lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionAssignment {
    pub index: usize,
    pub partition: usize,
    /// Element offset inside the partition
    pub offset: usize,
    /// RAID-PIR chunk holding the partition
    pub chunk: usize,
    /// Replica ids covering that chunk, in ascending chunk-coverage order
    pub replicas: Vec<usize>,
}

/// Deterministic block layout shared by client and replicas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    pub descriptor: DatabaseDescriptor,
    pub redundancy: usize,
    /// Number of partitions (RAID-PIR blocks)
    pub partitions: usize,
    /// Number of replica targets
    pub servers: usize,
    pub elements_per_partition: usize,
}

impl PartitionLayout {
    pub fn new(
        descriptor: DatabaseDescriptor,
        redundancy: usize,
        raidpir_size: usize,
        servers: usize,
    ) -> Result<Self> {
        if servers < redundancy {
            return Err(config_err!(
                "{} targets configured but redundancy is {}",
                servers,
                redundancy
            ));
        }
        if redundancy < 2 {
            return Err(config_err!("raidpir_redundancy must be at least 2, got {}", redundancy));
        }
        if raidpir_size == 0 || descriptor.element_count % raidpir_size != 0 {
            return Err(config_err!(
                "raidpir_size {} does not tile {} elements",
                raidpir_size,
                descriptor.element_count
            ));
        }
        if raidpir_size % (8 * servers) != 0 {
            return Err(config_err!(
                "raidpir_size {} must be a multiple of 8 * servers ({})",
                raidpir_size,
                8 * servers
            ));
        }
        Ok(Self {
            descriptor,
            redundancy,
            partitions: raidpir_size,
            servers,
            elements_per_partition: descriptor.element_count / raidpir_size,
        })
    }

    /// Layout for a parameter set and a target count
    pub fn from_params(params: &RetrievalParams, servers: usize) -> Result<Self> {
        let descriptor = DatabaseDescriptor::new(params.db_size, params.element_size)?;
        Self::new(descriptor, params.raidpir_redundancy, params.raidpir_size, servers)
    }

    pub fn partition_bytes(&self) -> usize {
        self.elements_per_partition * self.descriptor.element_size
    }

    /// Blocks per chunk
    pub fn chunk_blocks(&self) -> usize {
        self.partitions / self.servers
    }

    /// Chunks covered by replica `replica`, own chunk first
    pub fn covered_chunks(&self, replica: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.redundancy).map(move |m| (replica + m) % self.servers)
    }

    /// Replicas covering chunk `chunk`
    pub fn chunk_replicas(&self, chunk: usize) -> Vec<usize> {
        (0..self.redundancy)
            .map(|i| (chunk + self.servers - self.redundancy + 1 + i) % self.servers)
            .collect()
    }

    pub fn partition(&self, id: usize) -> Partition {
        let bytes = self.partition_bytes();
        Partition {
            id,
            range: id * bytes..(id + 1) * bytes,
        }
    }

    /// Every partition in id order
    pub fn partitions(&self) -> impl Iterator<Item = Partition> + '_ {
        (0..self.partitions).map(|id| self.partition(id))
    }

    /// Map a global element index to its partition, offset and replicas
    pub fn assign(&self, index: usize) -> Result<PartitionAssignment> {
        if index >= self.descriptor.element_count {
            return Err(config_err!(
                "index {} out of range for {} elements",
                index,
                self.descriptor.element_count
            ));
        }
        let partition = index / self.elements_per_partition;
        let chunk = partition / self.chunk_blocks();
        Ok(PartitionAssignment {
            index,
            partition,
            offset: index % self.elements_per_partition,
            chunk,
            replicas: self.chunk_replicas(chunk),
        })
    }
}
