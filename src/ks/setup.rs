//! Key-switching matrix and Galois key generation

use crate::math::{GaussianSampler, NttContext, Poly};
use crate::rlwe::{apply_automorphism, RlweCiphertext, RlweSecretKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::gadget::GadgetVector;

/// Key-switching matrix from secret s to secret s'.
///
/// ```text
/// K[i] = (a_i, -a_i·s' + e_i + s·z^i)
/// ```
///
/// Rows are stored in NTT domain; switching only ever multiplies them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySwitchingMatrix {
    pub rows: Vec<RlweCiphertext>,
    pub gadget: GadgetVector,
}

impl KeySwitchingMatrix {
    pub fn ring_dim(&self) -> usize {
        self.rows.first().map_or(0, |r| r.ring_dim())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shape check for matrices received over the wire
    pub fn is_well_formed(&self, ring_dim: usize, q: u64, gadget: &GadgetVector) -> bool {
        self.gadget == *gadget
            && self.rows.len() == gadget.len
            && self.rows.iter().all(|row| {
                [&row.a, &row.b].iter().all(|p| {
                    p.dimension() == ring_dim
                        && p.modulus() == q
                        && p.is_ntt()
                        && p.coeffs().iter().all(|&c| c < q)
                })
            })
    }
}

/// Generate a key-switching matrix from `from_key` to `to_key`
pub fn generate_ks_matrix(
    from_key: &RlweSecretKey,
    to_key: &RlweSecretKey,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> KeySwitchingMatrix {
    let d = from_key.ring_dim();
    let q = from_key.modulus();
    debug_assert_eq!(d, to_key.ring_dim(), "keys must share ring dimension");

    let to_key_ntt = to_key.poly.to_ntt_new(ctx);
    let rows = gadget
        .powers()
        .into_iter()
        .map(|power| {
            let mut a = Poly::random_with_rng(d, q, sampler.rng_mut());
            a.to_ntt(ctx);
            let mut b = Poly::sample_gaussian(d, q, sampler);
            b += &from_key.poly.scalar_mul(power);
            b.to_ntt(ctx);
            b -= &a.mul_ntt_domain(&to_key_ntt, ctx);
            RlweCiphertext::from_parts(a, b)
        })
        .collect();

    KeySwitchingMatrix {
        rows,
        gadget: *gadget,
    }
}

/// Key-switching matrix from τ_g(s) back to s
pub fn generate_automorphism_ks_matrix(
    sk: &RlweSecretKey,
    g: usize,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> KeySwitchingMatrix {
    let rotated = RlweSecretKey::from_poly(apply_automorphism(&sk.poly, g));
    generate_ks_matrix(&rotated, sk, gadget, sampler, ctx)
}

/// Key-switching matrices for a set of Galois elements.
///
/// Shipped to the replicas with every query so they can run oblivious
/// expansion; generated once per client session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaloisKeys {
    keys: Vec<(usize, KeySwitchingMatrix)>,
}

impl GaloisKeys {
    pub fn generate(
        sk: &RlweSecretKey,
        elements: &[usize],
        gadget: &GadgetVector,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        let keys = elements
            .iter()
            .map(|&g| (g, generate_automorphism_ks_matrix(sk, g, gadget, sampler, ctx)))
            .collect();
        debug!(count = elements.len(), ring_dim = sk.ring_dim(), "generated galois keys");
        Self { keys }
    }

    /// Matrix for Galois element `g`, if present
    pub fn get(&self, g: usize) -> Option<&KeySwitchingMatrix> {
        self.keys.iter().find(|(e, _)| *e == g).map(|(_, k)| k)
    }

    /// Galois elements covered, in generation order
    pub fn elements(&self) -> Vec<usize> {
        self.keys.iter().map(|(g, _)| *g).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Every matrix has the expected shape
    pub fn is_well_formed(&self, ring_dim: usize, q: u64, gadget: &GadgetVector) -> bool {
        self.keys
            .iter()
            .all(|(_, k)| k.is_well_formed(ring_dim, q, gadget))
    }
}
