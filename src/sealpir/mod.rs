//! SealPIR: homomorphic selection inside one partition.
//!
//! The partition's elements are packed into plaintext polynomials, which
//! are arranged as a `d`-dimensional hypercube. The client sends, per
//! dimension, ciphertexts encrypting the scaled coordinate as a single
//! coefficient; the server obliviously expands them into one-hot vectors
//! of ciphertexts, folds the hypercube one dimension at a time, and
//! decomposes intermediate ciphertexts into plaintexts between dimensions.
//!
//! - [`encode`]: bytes to plaintext coefficients and back
//! - [`query`]: client session (keys, queries, reply decoding)
//! - [`expand`]: oblivious query expansion with Galois substitutions
//! - [`reply`]: server-side hypercube folding

pub mod encode;
pub mod expand;
pub mod query;
pub mod reply;

pub use expand::expand_query;
pub use query::SealPirClient;
pub use reply::generate_reply;

use crate::config_err;
use crate::error::Result;
use crate::ks::GadgetVector;
use crate::params::{RetrievalParams, SealPirParams, MAX_REPLY_BYTES};
use crate::rlwe::{expansion_element, RlweCiphertext};
use serde::{Deserialize, Serialize};

/// Per-dimension query ciphertexts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealPirQuery {
    pub dims: Vec<Vec<RlweCiphertext>>,
}

/// Folded result: `F^(d-1)` ciphertexts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealPirReply {
    pub ciphertexts: Vec<RlweCiphertext>,
}

/// Shape of one partition as seen by SealPIR. Client and server derive it
/// from the same parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SealPirLayout {
    pub params: SealPirParams,
    pub element_size: usize,
    /// Elements in the partition
    pub num_elements: usize,
    pub coeffs_per_element: usize,
    pub elements_per_plaintext: usize,
    /// Plaintexts holding data, before hypercube padding
    pub num_plaintexts: usize,
    /// Hypercube side lengths, most significant first
    pub dims: Vec<usize>,
}

impl SealPirLayout {
    pub fn new(
        params: SealPirParams,
        element_size: usize,
        num_elements: usize,
        d: usize,
    ) -> Result<Self> {
        params.validate()?;
        if element_size == 0 || num_elements == 0 {
            return Err(config_err!("partition must hold at least one non-empty element"));
        }
        if d == 0 {
            return Err(config_err!("sealpir_d must be positive"));
        }

        let coeffs_per_element = (8 * element_size).div_ceil(params.plain_log as usize);
        if coeffs_per_element > params.ring_dim {
            return Err(config_err!(
                "element of {} bytes needs {} coefficients, ring degree is {}",
                element_size,
                coeffs_per_element,
                params.ring_dim
            ));
        }
        let elements_per_plaintext = params.ring_dim / coeffs_per_element;
        let num_plaintexts = num_elements.div_ceil(elements_per_plaintext);
        let dims = hypercube_dims(num_plaintexts, d);

        let layout = Self {
            params,
            element_size,
            num_elements,
            coeffs_per_element,
            elements_per_plaintext,
            num_plaintexts,
            dims,
        };
        match layout.reply_bytes() {
            Some(bytes) if bytes <= MAX_REPLY_BYTES => {}
            _ => {
                return Err(config_err!(
                    "a reply over {} dimensions at sealpir_log {} exceeds {} bytes; lower sealpir_d or raise sealpir_log",
                    d,
                    layout.params.plain_log,
                    MAX_REPLY_BYTES
                ))
            }
        }
        layout.check_noise()?;
        Ok(layout)
    }

    /// Layout of one RAID-PIR partition under `params`
    pub fn for_partition(params: &RetrievalParams, elements_per_partition: usize) -> Result<Self> {
        Self::new(
            params.sealpir()?,
            params.element_size,
            elements_per_partition,
            params.sealpir_d,
        )
    }

    pub fn depth(&self) -> usize {
        self.dims.len()
    }

    /// Plaintexts including hypercube padding
    pub fn total_plaintexts(&self) -> usize {
        self.dims.iter().product()
    }

    /// Bytes of one decoded plaintext
    pub fn sub_block_bytes(&self) -> usize {
        self.elements_per_plaintext * self.element_size
    }

    pub fn plaintext_index(&self, offset: usize) -> usize {
        offset / self.elements_per_plaintext
    }

    pub fn offset_in_plaintext(&self, offset: usize) -> usize {
        offset % self.elements_per_plaintext
    }

    /// Hypercube coordinates of a plaintext, most significant first
    pub fn coordinates(&self, mut index: usize) -> Vec<usize> {
        let mut coords = vec![0; self.dims.len()];
        for (c, &n) in coords.iter_mut().zip(&self.dims).rev() {
            *c = index % n;
            index /= n;
        }
        coords
    }

    /// Ciphertexts sent for dimension `dim`
    pub fn ciphertexts_in_dim(&self, dim: usize) -> usize {
        self.dims[dim].div_ceil(self.params.ring_dim)
    }

    /// Coordinates covered by ciphertext `k` of a dimension of side `n`
    pub fn coverage(&self, n: usize, k: usize) -> usize {
        (n - k * self.params.ring_dim).min(self.params.ring_dim)
    }

    /// Deepest expansion any query ciphertext needs
    pub fn expansion_levels(&self) -> usize {
        self.dims
            .iter()
            .map(|&n| ceil_log2(n.min(self.params.ring_dim)))
            .max()
            .unwrap_or(0)
    }

    /// Galois elements the client must provide keys for
    pub fn galois_elements(&self) -> Vec<usize> {
        (0..self.expansion_levels())
            .map(|level| expansion_element(self.params.ring_dim, level))
            .collect()
    }

    pub fn gadget(&self) -> GadgetVector {
        GadgetVector::new(self.params.gadget_base, self.params.gadget_len, self.params.q)
    }

    /// Plaintexts per decomposed ciphertext
    pub fn expansion_ratio(&self) -> usize {
        self.params.expansion_ratio()
    }

    /// Ciphertexts in a reply. Bounded by the check in [`SealPirLayout::new`].
    pub fn reply_len(&self) -> usize {
        self.expansion_ratio().pow(self.depth() as u32 - 1)
    }

    /// Serialized coefficient bytes of a reply, `None` on overflow
    fn reply_bytes(&self) -> Option<usize> {
        let ct_bytes = 2 * self.params.ring_dim * std::mem::size_of::<u64>();
        self.expansion_ratio()
            .checked_pow(u32::try_from(self.depth() - 1).ok()?)?
            .checked_mul(ct_bytes)
    }

    /// Estimated log2 noise of a dimension of side `n` after folding.
    ///
    /// Each expansion level substitutes both branches and then adds them,
    /// so a level maps noise e to at most 2·(e + ks), where ks is the
    /// key-switching noise sqrt(ℓN)·(z/√3)·σ. The plaintext products then
    /// add a factor sqrt(N·n)·t/√3.
    fn folded_noise_bits(&self, n: usize) -> f64 {
        let p = &self.params;
        let log_sqrt3 = 3f64.log2() / 2.0;
        let ks = ((p.gadget_len * p.ring_dim) as f64).sqrt() * p.gadget_base as f64 / 3f64.sqrt() * p.sigma;
        let mut expanded = p.sigma;
        for _ in 0..ceil_log2(n.min(p.ring_dim)) {
            expanded = 2.0 * (expanded + ks);
        }
        expanded.log2() + 0.5 * ((p.ring_dim * n) as f64).log2() + p.plain_log as f64 - log_sqrt3
    }

    /// Reject layouts whose estimated noise in any dimension comes within
    /// `NOISE_MARGIN_BITS` of Δ/4, where decryption checks start failing.
    fn check_noise(&self) -> Result<()> {
        let budget = (self.params.delta() as f64).log2() - 2.0;
        for &n in &self.dims {
            let folded = self.folded_noise_bits(n) + NOISE_MARGIN_BITS;
            if folded >= budget {
                return Err(config_err!(
                    "hypercube side {} exceeds the noise budget ({:.1} of {:.1} bits); raise sealpir_d or lower sealpir_log",
                    n,
                    folded,
                    budget
                ));
            }
        }
        Ok(())
    }
}

/// Headroom between the estimated standard deviation and the decryption
/// bound. Covers the maximum over every coefficient of every reply
/// ciphertext plus slack for correlations the estimate ignores.
const NOISE_MARGIN_BITS: f64 = 5.0;

/// ⌈log2 n⌉ for n ≥ 1
pub(crate) fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// Side lengths whose product covers `count`, as even as possible and
/// trimmed from the last dimension.
fn hypercube_dims(count: usize, d: usize) -> Vec<usize> {
    let mut root = 1usize;
    while root.checked_pow(d as u32).is_some_and(|p| p < count) {
        root += 1;
    }
    let mut dims = vec![root; d];
    let mut product: usize = dims.iter().product();
    for i in (0..d).rev() {
        while dims[i] > 1 && product / dims[i] * (dims[i] - 1) >= count {
            product = product / dims[i] * (dims[i] - 1);
            dims[i] -= 1;
        }
    }
    dims
}
