//! RLWE ciphertext and key types.

use crate::math::Poly;
use serde::{Deserialize, Serialize};

/// RLWE secret key: polynomial in R_q with small coefficients.
///
/// Never leaves the client session; only its Galois keys are shipped.
///
/// ```
/// use hybrid_pir::rlwe::RlweSecretKey;
/// use hybrid_pir::math::{Poly, DEFAULT_Q};
///
/// let sk = RlweSecretKey::from_poly(Poly::zero(1024, DEFAULT_Q));
/// assert_eq!(sk.ring_dim(), 1024);
/// ```
#[derive(Clone, Debug)]
pub struct RlweSecretKey {
    pub poly: Poly,
}

/// RLWE ciphertext (a, b) with b = -a·s + e + m, where m is the raw
/// Z_q message (Δ times the plaintext for ordinary encryptions).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlweCiphertext {
    pub a: Poly,
    pub b: Poly,
}

impl RlweSecretKey {
    pub fn from_poly(poly: Poly) -> Self {
        Self { poly }
    }

    pub fn ring_dim(&self) -> usize {
        self.poly.dimension()
    }

    pub fn modulus(&self) -> u64 {
        self.poly.modulus()
    }
}

impl RlweCiphertext {
    /// Ciphertext from its two component polynomials
    pub fn from_parts(a: Poly, b: Poly) -> Self {
        debug_assert_eq!(a.dimension(), b.dimension(), "component dimensions differ");
        debug_assert_eq!(a.modulus(), b.modulus(), "component moduli differ");
        Self { a, b }
    }

    /// Trivial encryption of zero, the identity for homomorphic addition
    pub fn zero(ring_dim: usize, q: u64) -> Self {
        Self {
            a: Poly::zero(ring_dim, q),
            b: Poly::zero(ring_dim, q),
        }
    }

    pub fn ring_dim(&self) -> usize {
        self.a.dimension()
    }

    pub fn modulus(&self) -> u64 {
        self.a.modulus()
    }

    /// Whether both components are in coefficient domain with the expected
    /// shape. Used to reject malformed ciphertexts from the wire.
    pub fn is_well_formed(&self, ring_dim: usize, q: u64) -> bool {
        [&self.a, &self.b].iter().all(|p| {
            p.dimension() == ring_dim
                && p.modulus() == q
                && !p.is_ntt()
                && p.coeffs().iter().all(|&c| c < q)
        })
    }
}
