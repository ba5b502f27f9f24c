//! Gadget vector g = (1, z, z², ..., z^(ℓ-1)) and base-z decomposition.

use crate::math::Poly;
use serde::{Deserialize, Serialize};

/// Gadget parameters for key switching
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetVector {
    /// Base z (power of two)
    pub base: u64,
    /// Number of digits ℓ
    pub len: usize,
    /// Modulus q
    pub q: u64,
}

impl GadgetVector {
    pub fn new(base: u64, len: usize, q: u64) -> Self {
        debug_assert!(base.is_power_of_two(), "gadget base must be a power of two");
        debug_assert!(
            (base as u128).pow(len as u32) >= q as u128,
            "z^ℓ must cover q"
        );
        Self { base, len, q }
    }

    /// Powers z^i mod q for i in 0..ℓ
    pub fn powers(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.len);
        let mut p = 1u128;
        for _ in 0..self.len {
            out.push((p % self.q as u128) as u64);
            p = (p * self.base as u128) % self.q as u128;
        }
        out
    }

    fn base_log(&self) -> u32 {
        self.base.trailing_zeros()
    }
}

/// Decompose a polynomial coefficient-wise into ℓ digit polynomials with
/// digits in [0, z), so that Σ digit_i · z^i reproduces every coefficient.
pub fn gadget_decompose(poly: &Poly, gadget: &GadgetVector) -> Vec<Poly> {
    assert!(!poly.is_ntt(), "decomposition requires coefficient domain");
    let d = poly.dimension();
    let q = poly.modulus();
    let shift = gadget.base_log();
    let mask = gadget.base - 1;

    let mut digits: Vec<Poly> = (0..gadget.len).map(|_| Poly::zero(d, q)).collect();
    for (j, &c) in poly.coeffs().iter().enumerate() {
        let mut val = c;
        for digit in digits.iter_mut() {
            digit.coeffs_mut()[j] = val & mask;
            val >>= shift;
        }
    }
    digits
}
