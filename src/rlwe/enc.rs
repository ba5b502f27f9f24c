//! RLWE encryption, decryption and ciphertext algebra.
//!
//! Messages are scaled BFV-style: a plaintext p ∈ R_t is encrypted as
//! b = -a·s + e + Δ·p with Δ = ⌊q/t⌋. Decryption rounds t·(b + a·s)/q.
//! [`RlweCiphertext::encrypt_raw`] skips the scaling so callers can place
//! arbitrary Z_q values (the query builder uses Δ·2^-l).

use crate::math::{GaussianSampler, ModQ, NttContext, Poly};

use super::types::{RlweCiphertext, RlweSecretKey};

impl RlweSecretKey {
    /// Sample a secret key from the error distribution
    pub fn generate(ring_dim: usize, q: u64, sampler: &mut GaussianSampler) -> Self {
        let coeffs: Vec<u64> = (0..ring_dim)
            .map(|_| ModQ::from_signed(sampler.sample(), q))
            .collect();
        Self {
            poly: Poly::from_coeffs(coeffs, q),
        }
    }
}

impl RlweCiphertext {
    /// Encrypt a raw Z_q message polynomial: b = -a·s + e + m
    pub fn encrypt_raw(
        sk: &RlweSecretKey,
        message: &Poly,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        let d = sk.ring_dim();
        let q = sk.modulus();
        let a = Poly::random_with_rng(d, q, sampler.rng_mut());
        let error = Poly::sample_gaussian(d, q, sampler);

        let mut b = -&a.mul_ntt(&sk.poly, ctx);
        b += &error;
        b += message;
        Self { a, b }
    }

    /// Encrypt a plaintext with coefficients in [0, t)
    pub fn encrypt(
        sk: &RlweSecretKey,
        plaintext: &Poly,
        delta: u64,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        Self::encrypt_raw(sk, &plaintext.scalar_mul(delta), sampler, ctx)
    }

    /// The noisy phase b + a·s
    pub fn phase(&self, sk: &RlweSecretKey, ctx: &NttContext) -> Poly {
        &self.a.mul_ntt(&sk.poly, ctx) + &self.b
    }

    /// Decrypt to a plaintext mod t = 2^plain_log
    pub fn decrypt(&self, sk: &RlweSecretKey, plain_log: u32, ctx: &NttContext) -> Poly {
        let q = self.modulus();
        let t = 1u64 << plain_log;
        let coeffs = self
            .phase(sk, ctx)
            .coeffs()
            .iter()
            .map(|&x| round_scale(x, t, q) % t)
            .collect();
        Poly::from_coeffs(coeffs, q)
    }

    /// Remaining noise budget in bits.
    ///
    /// For each coefficient the residual r = t·x - q·round(t·x/q) is the
    /// scaled noise; decryption is correct while |r| < q/2. The budget is
    /// ⌊log2(q / (2·max|r|))⌋, so a budget of zero means the noise has
    /// crossed Δ/4.
    pub fn noise_budget(&self, sk: &RlweSecretKey, plain_log: u32, ctx: &NttContext) -> u32 {
        let q = self.modulus() as u128;
        let t = 1u128 << plain_log;
        let max_residual = self
            .phase(sk, ctx)
            .coeffs()
            .iter()
            .map(|&x| {
                let scaled = x as u128 * t;
                let rounded = (scaled + q / 2) / q;
                let nearest = rounded * q;
                scaled.abs_diff(nearest)
            })
            .max()
            .unwrap_or(0);

        if max_residual == 0 {
            return 64 - (q as u64).leading_zeros();
        }
        let ratio = q / (2 * max_residual);
        if ratio == 0 {
            0
        } else {
            127 - ratio.leading_zeros()
        }
    }

    /// Homomorphic addition
    pub fn add(&self, other: &RlweCiphertext) -> RlweCiphertext {
        RlweCiphertext {
            a: &self.a + &other.a,
            b: &self.b + &other.b,
        }
    }

    /// Multiply by X^k in the negacyclic ring
    pub fn mul_monomial(&self, k: usize) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_monomial(k),
            b: self.b.mul_monomial(k),
        }
    }

    /// Multiply by a plaintext polynomial p(X): (p·a, p·b) decrypts to p·m
    pub fn mul_plain(&self, plaintext: &Poly, ctx: &NttContext) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_ntt(plaintext, ctx),
            b: self.b.mul_ntt(plaintext, ctx),
        }
    }

    /// Move both components into NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        self.a.to_ntt(ctx);
        self.b.to_ntt(ctx);
    }

    /// Move both components back to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        self.a.from_ntt(ctx);
        self.b.from_ntt(ctx);
    }

    /// `self += ct · plaintext`, all operands in NTT domain
    pub fn mul_plain_acc_ntt(&mut self, ct: &RlweCiphertext, plaintext: &Poly, ctx: &NttContext) {
        self.a.mul_acc_ntt_domain(&ct.a, plaintext, ctx);
        self.b.mul_acc_ntt_domain(&ct.b, plaintext, ctx);
    }
}

/// round(t·x / q)
#[inline]
fn round_scale(x: u64, t: u64, q: u64) -> u64 {
    let q = q as u128;
    ((x as u128 * t as u128 + q / 2) / q) as u64
}
