//! Polynomial operations over R_q = Z_q[X]/(X^d + 1).
//!
//! A [`Poly`] lives either in the coefficient domain or in the NTT domain.
//! Additions work in both; multiplication goes through [`NttContext`].
//! Coefficient-only operations (monomial shifts, automorphisms, digit
//! decomposition, norms) assert the domain.
//!
//! # Example
//!
//! ```
//! use hybrid_pir::math::{NttContext, Poly, DEFAULT_Q};
//!
//! let ctx = NttContext::new(1024, DEFAULT_Q);
//! let a = Poly::constant(3, 1024, DEFAULT_Q);
//! let b = Poly::constant(5, 1024, DEFAULT_Q);
//! assert_eq!(a.mul_ntt(&b, &ctx).coeff(0), 15);
//! ```

use super::modular::ModQ;
use super::ntt::NttContext;
use super::sampler::GaussianSampler;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Polynomial in R_q.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Poly {
    coeffs: Vec<u64>,
    q: u64,
    is_ntt: bool,
}

impl Poly {
    /// Zero polynomial
    pub fn zero(dim: usize, q: u64) -> Self {
        Self {
            coeffs: vec![0; dim],
            q,
            is_ntt: false,
        }
    }

    /// Zero polynomial already tagged as NTT domain, for accumulators
    pub fn zero_ntt(dim: usize, q: u64) -> Self {
        Self {
            coeffs: vec![0; dim],
            q,
            is_ntt: true,
        }
    }

    /// Polynomial from coefficients, reduced mod q
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let mut p = Self {
            coeffs,
            q,
            is_ntt: false,
        };
        for c in &mut p.coeffs {
            *c %= q;
        }
        p
    }

    /// Constant polynomial
    pub fn constant(value: u64, dim: usize, q: u64) -> Self {
        let mut p = Self::zero(dim, q);
        p.coeffs[0] = value % q;
        p
    }

    /// Uniformly random polynomial
    pub fn random_with_rng<R: Rng + ?Sized>(dim: usize, q: u64, rng: &mut R) -> Self {
        Self {
            coeffs: (0..dim).map(|_| rng.gen_range(0..q)).collect(),
            q,
            is_ntt: false,
        }
    }

    /// Polynomial with discrete Gaussian coefficients
    pub fn sample_gaussian(dim: usize, q: u64, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: sampler.sample_vec_centered(dim, q),
            q,
            is_ntt: false,
        }
    }

    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }

    pub fn modulus(&self) -> u64 {
        self.q
    }

    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Coefficient at index (coefficient domain only)
    pub fn coeff(&self, i: usize) -> u64 {
        assert!(!self.is_ntt, "cannot read coefficients in NTT domain");
        self.coeffs[i]
    }

    /// Set coefficient at index (coefficient domain only)
    pub fn set_coeff(&mut self, i: usize, value: u64) {
        assert!(!self.is_ntt, "cannot set coefficients in NTT domain");
        self.coeffs[i] = value % self.q;
    }

    /// Raw coefficient or evaluation vector
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    pub fn coeffs_mut(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    /// Convert to NTT domain in place
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert back to coefficient domain in place
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// NTT-domain copy
    pub fn to_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_ntt(ctx);
        result
    }

    /// Scalar multiplication (valid in either domain)
    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let scalar = scalar % self.q;
        Self {
            coeffs: self
                .coeffs
                .iter()
                .map(|&c| ModQ::mul(c, scalar, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }

    /// Negacyclic product via NTT, result in coefficient domain
    pub fn mul_ntt(&self, other: &Self, ctx: &NttContext) -> Self {
        assert_eq!(self.q, other.q, "moduli must match");
        assert_eq!(self.coeffs.len(), other.coeffs.len(), "dimensions must match");

        let a = self.to_ntt_new(ctx);
        let b = other.to_ntt_new(ctx);
        let mut poly = a.mul_ntt_domain(&b, ctx);
        poly.from_ntt(ctx);
        poly
    }

    /// Pointwise product of two NTT-domain polynomials
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(self.is_ntt && other.is_ntt, "both operands must be in NTT domain");
        assert_eq!(self.q, other.q, "moduli must match");

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);
        Self {
            coeffs: result,
            q: self.q,
            is_ntt: true,
        }
    }

    /// `self += a * b` with every operand in NTT domain
    pub fn mul_acc_ntt_domain(&mut self, a: &Self, b: &Self, ctx: &NttContext) {
        assert!(
            self.is_ntt && a.is_ntt && b.is_ntt,
            "all operands must be in NTT domain"
        );
        assert_eq!(self.q, a.q, "moduli must match");
        assert_eq!(self.q, b.q, "moduli must match");

        let q = self.q;
        for ((acc, &x), &y) in self.coeffs.iter_mut().zip(&a.coeffs).zip(&b.coeffs) {
            *acc = ModQ::add(*acc, ctx.mul_single(x, y), q);
        }
    }

    /// Multiply by the monomial X^k in the negacyclic ring.
    ///
    /// `k` is taken modulo 2d, so X^(2d - j) is the inverse of X^j.
    pub fn mul_monomial(&self, k: usize) -> Self {
        assert!(!self.is_ntt, "monomial shift requires coefficient domain");
        let d = self.coeffs.len();
        let k = k % (2 * d);
        let mut coeffs = vec![0u64; d];
        for (i, &c) in self.coeffs.iter().enumerate() {
            let target = i + k;
            let wraps = (target / d) % 2 == 1;
            let slot = target % d;
            coeffs[slot] = if wraps { ModQ::negate(c, self.q) } else { c };
        }
        Self {
            coeffs,
            q: self.q,
            is_ntt: false,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

}

impl PartialEq for Poly {
    fn eq(&self, other: &Self) -> bool {
        self.q == other.q && self.is_ntt == other.is_ntt && self.coeffs == other.coeffs
    }
}

impl Eq for Poly {}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Poly {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Poly) {
        assert_eq!(self.q, rhs.q, "moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");
        let q = self.q;
        for (a, &b) in self.coeffs.iter_mut().zip(&rhs.coeffs) {
            *a = ModQ::add(*a, b, q);
        }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Poly {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Poly) {
        assert_eq!(self.q, rhs.q, "moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");
        let q = self.q;
        for (a, &b) in self.coeffs.iter_mut().zip(&rhs.coeffs) {
            *a = ModQ::sub(*a, b, q);
        }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        Poly {
            coeffs: self.coeffs.iter().map(|&c| ModQ::negate(c, self.q)).collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}
