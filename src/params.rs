//! Parameter sets for hybrid retrievals.
//!
//! [`RetrievalParams`] is the caller-facing configuration surface: every
//! field is required and nothing is defaulted. [`SealPirParams`] is the
//! lattice parameter set derived from it, and [`DispatchConfig`] holds the
//! network timeouts.

use crate::config_err;
use crate::error::Result;
use crate::math::DEFAULT_Q;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest supported ring degree
pub const MIN_RING_DIM: usize = 1024;
/// Largest ring degree for which 2N divides q - 1
pub const MAX_RING_DIM: usize = 8192;
/// Error standard deviation for all fresh encryptions
pub const DEFAULT_SIGMA: f64 = 3.2;
/// log2 of the key-switching gadget base
pub const GADGET_BASE_LOG: u32 = 8;
/// Largest hypercube depth accepted
pub const MAX_SEALPIR_D: usize = 8;
/// Largest plaintext modulus bit length accepted
pub const MAX_SEALPIR_LOG: u32 = 20;
/// Largest SealPIR reply a layout may produce, in coefficient bytes. Equal
/// to the wire frame limit, so a larger reply could never be delivered.
pub const MAX_REPLY_BYTES: usize = 256 << 20;

/// Caller-supplied configuration of one retrieval.
///
/// The replica targets are passed separately, since they are session
/// state rather than database shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Total database size in bytes
    pub db_size: usize,
    /// Size of one element in bytes
    pub element_size: usize,
    /// Number of replicas that cover each RAID-PIR chunk
    pub raidpir_redundancy: usize,
    /// Number of RAID-PIR blocks (partitions) the database is split into
    pub raidpir_size: usize,
    /// Ring degree N of the SealPIR layer
    pub sealpir_degree: usize,
    /// Plaintext modulus bit length, t = 2^sealpir_log
    pub sealpir_log: u32,
    /// Hypercube dimension count
    pub sealpir_d: usize,
}

impl RetrievalParams {
    /// Number of elements in the database
    pub fn element_count(&self) -> usize {
        if self.element_size == 0 {
            0
        } else {
            self.db_size / self.element_size
        }
    }

    /// Lattice parameters for the SealPIR layer
    pub fn sealpir(&self) -> Result<SealPirParams> {
        SealPirParams::new(self.sealpir_degree, self.sealpir_log)
    }

    /// Check the scalar constraints that do not depend on the target list.
    ///
    /// Layout constraints involving the number of replicas are checked by
    /// [`crate::partition::PartitionLayout::new`].
    pub fn validate(&self) -> Result<()> {
        if self.element_size == 0 {
            return Err(config_err!("element_size must be positive"));
        }
        if self.db_size == 0 || self.db_size % self.element_size != 0 {
            return Err(config_err!(
                "element_size {} does not divide db_size {}",
                self.element_size,
                self.db_size
            ));
        }
        if self.sealpir_d == 0 || self.sealpir_d > MAX_SEALPIR_D {
            return Err(config_err!(
                "sealpir_d must be in 1..={}, got {}",
                MAX_SEALPIR_D,
                self.sealpir_d
            ));
        }
        self.sealpir()?.validate()
    }
}

/// Lattice parameters for the SealPIR sub-query engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealPirParams {
    /// Ring dimension N (power of two)
    pub ring_dim: usize,
    /// Ciphertext modulus q, NTT-friendly: q ≡ 1 (mod 2N)
    pub q: u64,
    /// Plaintext modulus bit length; t = 2^plain_log
    pub plain_log: u32,
    /// Gaussian error standard deviation
    pub sigma: f64,
    /// Gadget decomposition base z for key switching
    pub gadget_base: u64,
    /// Number of gadget digits ℓ = ⌈log_z(q)⌉
    pub gadget_len: usize,
}

impl SealPirParams {
    /// Parameter set for ring degree `ring_dim` and plaintext bits `plain_log`
    pub fn new(ring_dim: usize, plain_log: u32) -> Result<Self> {
        let q = DEFAULT_Q;
        let q_bits = 64 - q.leading_zeros();
        let params = Self {
            ring_dim,
            q,
            plain_log,
            sigma: DEFAULT_SIGMA,
            gadget_base: 1 << GADGET_BASE_LOG,
            gadget_len: q_bits.div_ceil(GADGET_BASE_LOG) as usize,
        };
        params.validate()?;
        Ok(params)
    }

    /// Plaintext modulus t
    pub fn plain_modulus(&self) -> u64 {
        1u64 << self.plain_log
    }

    /// Scaling factor Δ = ⌊q/t⌋
    pub fn delta(&self) -> u64 {
        self.q / self.plain_modulus()
    }

    /// Bit length of q
    pub fn modulus_bits(&self) -> u32 {
        64 - self.q.leading_zeros()
    }

    /// Plaintexts produced when one ciphertext is decomposed in base t
    pub fn expansion_ratio(&self) -> usize {
        2 * self.modulus_bits().div_ceil(self.plain_log) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if !self.ring_dim.is_power_of_two()
            || self.ring_dim < MIN_RING_DIM
            || self.ring_dim > MAX_RING_DIM
        {
            return Err(config_err!(
                "sealpir_degree must be a power of two in [{}, {}], got {}",
                MIN_RING_DIM,
                MAX_RING_DIM,
                self.ring_dim
            ));
        }
        if self.q % (2 * self.ring_dim as u64) != 1 {
            return Err(config_err!("q must be ≡ 1 (mod 2N) for the NTT"));
        }
        if self.plain_log == 0 || self.plain_log > MAX_SEALPIR_LOG {
            return Err(config_err!(
                "sealpir_log must be in 1..={}, got {}",
                MAX_SEALPIR_LOG,
                self.plain_log
            ));
        }
        Ok(())
    }
}

/// Timeouts applied by the query dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Budget for one send/receive with one target
    pub per_target_timeout: Duration,
    /// Budget for the whole retrieval call
    pub deadline: Duration,
}

impl DispatchConfig {
    pub fn new(per_target_timeout: Duration, deadline: Duration) -> Self {
        Self {
            per_target_timeout,
            deadline,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            per_target_timeout: Duration::from_secs(60),
            deadline: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HybridPirError;

    fn scenario() -> RetrievalParams {
        RetrievalParams {
            db_size: 1 << 20,
            element_size: 8,
            raidpir_redundancy: 2,
            raidpir_size: 1 << 12,
            sealpir_degree: 2048,
            sealpir_log: 12,
            sealpir_d: 2,
        }
    }

    #[test]
    fn test_scenario_is_valid() {
        let params = scenario();
        assert!(params.validate().is_ok());
        assert_eq!(params.element_count(), 1 << 17);
    }

    #[test]
    fn test_sealpir_derived_values() {
        let sp = scenario().sealpir().unwrap();
        assert_eq!(sp.plain_modulus(), 4096);
        assert_eq!(sp.modulus_bits(), 60);
        assert_eq!(sp.expansion_ratio(), 10);
        assert_eq!(sp.gadget_len, 8);
        assert_eq!(sp.delta(), DEFAULT_Q / 4096);
    }

    #[test]
    fn test_rejects_bad_ring_degree() {
        for degree in [0usize, 512, 3000, 16384] {
            let mut p = scenario();
            p.sealpir_degree = degree;
            assert!(matches!(p.validate(), Err(HybridPirError::Configuration(_))));
        }
    }

    #[test]
    fn test_rejects_bad_log_and_depth() {
        let mut p = scenario();
        p.sealpir_log = 0;
        assert!(p.validate().is_err());

        let mut p = scenario();
        p.sealpir_log = 21;
        assert!(p.validate().is_err());

        let mut p = scenario();
        p.sealpir_d = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_rejects_non_dividing_element_size() {
        let mut p = scenario();
        p.element_size = 3;
        assert!(matches!(p.validate(), Err(HybridPirError::Configuration(_))));
    }

    #[test]
    fn test_dispatch_defaults() {
        let cfg = DispatchConfig::default();
        assert_eq!(cfg.per_target_timeout, Duration::from_secs(60));
        assert!(cfg.deadline > cfg.per_target_timeout);
    }
}
