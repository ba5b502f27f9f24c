//! Negacyclic Number-Theoretic Transform over Z_q[X]/(X^n + 1).
//!
//! Forward transform is Cooley-Tukey decimation-in-time with twiddles stored
//! in bit-reversed order; the inverse is Gentleman-Sande. Values in the NTT
//! domain are kept in Montgomery form (R = 2^64), so pointwise products need
//! a single Montgomery reduction.
//!
//! # Example
//!
//! ```
//! use hybrid_pir::math::{NttContext, DEFAULT_Q};
//!
//! let ctx = NttContext::new(1024, DEFAULT_Q);
//! let mut coeffs = vec![3u64; 1024];
//! ctx.forward(&mut coeffs);
//! ctx.inverse(&mut coeffs);
//! assert!(coeffs.iter().all(|&c| c == 3));
//! ```

use super::modular::ModQ;

/// Precomputed twiddle tables for one (n, q) pair.
///
/// Build once per ring dimension and share it; every polynomial operation
/// that multiplies goes through it.
#[derive(Clone, Debug)]
pub struct NttContext {
    n: usize,
    q: u64,
    /// -q^(-1) mod 2^64
    q_inv_neg: u64,
    /// R^2 mod q
    r_squared: u64,
    /// ψ^bitrev(i) in Montgomery form
    roots: Vec<u64>,
    /// ψ^-bitrev(i) in Montgomery form
    inv_roots: Vec<u64>,
    /// n^(-1) in Montgomery form
    n_inv: u64,
}

impl NttContext {
    /// Create a context for ring dimension `n` and prime modulus `q`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two or q ≢ 1 (mod 2n). Parameter
    /// validation upstream rejects both before a context is built.
    pub fn new(n: usize, q: u64) -> Self {
        assert!(n.is_power_of_two() && n >= 2, "n must be a power of two");
        assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");
        assert!(q < (1u64 << 62), "q must fit Montgomery headroom");

        let q_inv_neg = Self::compute_q_inv_neg(q);
        let r_squared = Self::compute_r_squared(q);

        let psi = Self::find_primitive_root(2 * n as u64, q);
        let psi_inv = ModQ::inverse(psi, q);

        let log_n = n.trailing_zeros();
        let mut roots = vec![0u64; n];
        let mut inv_roots = vec![0u64; n];
        let mut power = 1u64;
        let mut inv_power = 1u64;
        for i in 0..n {
            let slot = bit_reverse(i, log_n);
            roots[slot] = Self::to_montgomery(power, q, r_squared, q_inv_neg);
            inv_roots[slot] = Self::to_montgomery(inv_power, q, r_squared, q_inv_neg);
            power = ModQ::mul(power, psi, q);
            inv_power = ModQ::mul(inv_power, psi_inv, q);
        }

        let n_inv = Self::to_montgomery(ModQ::inverse(n as u64, q), q, r_squared, q_inv_neg);

        Self {
            n,
            q,
            q_inv_neg,
            r_squared,
            roots,
            inv_roots,
            n_inv,
        }
    }

    /// Ring dimension
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Modulus
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Forward transform in place. Input in standard form, output in
    /// Montgomery-form evaluations.
    pub fn forward(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "input length must equal ring dimension");

        for c in coeffs.iter_mut() {
            *c = Self::to_montgomery(*c, self.q, self.r_squared, self.q_inv_neg);
        }

        let q = self.q;
        let mut t = self.n;
        let mut m = 1;
        while m < self.n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let w = self.roots[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = self.mont_mul(coeffs[j + t], w);
                    coeffs[j] = ModQ::add(u, v, q);
                    coeffs[j + t] = ModQ::sub(u, v, q);
                }
            }
            m <<= 1;
        }
    }

    /// Inverse transform in place, returning standard-form coefficients.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "input length must equal ring dimension");

        let q = self.q;
        let mut t = 1;
        let mut m = self.n;
        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let w = self.inv_roots[h + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = coeffs[j + t];
                    coeffs[j] = ModQ::add(u, v, q);
                    coeffs[j + t] = self.mont_mul(ModQ::sub(u, v, q), w);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }

        for c in coeffs.iter_mut() {
            // scale by n^-1, then leave Montgomery form
            *c = self.mont_mul(self.mont_mul(*c, self.n_inv), 1);
        }
    }

    /// Pointwise product of two NTT-domain vectors
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        assert_eq!(a.len(), self.n);
        assert_eq!(b.len(), self.n);
        assert_eq!(result.len(), self.n);
        for i in 0..self.n {
            result[i] = self.mont_mul(a[i], b[i]);
        }
    }

    /// Single Montgomery product, used for fused multiply-accumulate loops
    #[inline]
    pub fn mul_single(&self, a: u64, b: u64) -> u64 {
        self.mont_mul(a, b)
    }

    #[inline]
    fn mont_mul(&self, a: u64, b: u64) -> u64 {
        Self::reduce(a as u128 * b as u128, self.q, self.q_inv_neg)
    }

    #[inline]
    fn reduce(ab: u128, q: u64, q_inv_neg: u64) -> u64 {
        let m = (ab as u64).wrapping_mul(q_inv_neg) as u128;
        let t = ((ab + m * q as u128) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn to_montgomery(a: u64, q: u64, r_squared: u64, q_inv_neg: u64) -> u64 {
        Self::reduce(a as u128 * r_squared as u128, q, q_inv_neg)
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        // Newton iteration for q^-1 mod 2^64
        let mut inv: u64 = 1;
        for _ in 0..6 {
            inv = inv.wrapping_mul(2u64.wrapping_sub(q.wrapping_mul(inv)));
        }
        inv.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % q as u128;
        ((r_mod_q * r_mod_q) % q as u128) as u64
    }

    /// Primitive `order`-th root of unity modulo q
    fn find_primitive_root(order: u64, q: u64) -> u64 {
        let exp = (q - 1) / order;
        (2..q)
            .map(|g| ModQ::pow(g, exp, q))
            .find(|&c| ModQ::pow(c, order / 2, q) == q - 1)
            .expect("q ≡ 1 (mod order) guarantees a primitive root")
    }
}

fn bit_reverse(mut x: usize, bits: u32) -> usize {
    let mut r = 0;
    for _ in 0..bits {
        r = (r << 1) | (x & 1);
        x >>= 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DEFAULT_Q;

    fn schoolbook_negacyclic(a: &[u64], b: &[u64], q: u64) -> Vec<u64> {
        let n = a.len();
        let mut out = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let prod = ModQ::mul(a[i], b[j], q);
                let k = i + j;
                if k < n {
                    out[k] = ModQ::add(out[k], prod, q);
                } else {
                    out[k - n] = ModQ::sub(out[k - n], prod, q);
                }
            }
        }
        out
    }

    #[test]
    fn test_roundtrip_sizes() {
        for n in [16usize, 1024, 2048, 4096, 8192] {
            let ctx = NttContext::new(n, DEFAULT_Q);
            let original: Vec<u64> = (0..n as u64).map(|i| (i * 7919) % DEFAULT_Q).collect();
            let mut coeffs = original.clone();
            ctx.forward(&mut coeffs);
            ctx.inverse(&mut coeffs);
            assert_eq!(coeffs, original, "roundtrip failed for n={}", n);
        }
    }

    #[test]
    fn test_matches_schoolbook() {
        let n = 32;
        let q = DEFAULT_Q;
        let ctx = NttContext::new(n, q);
        let a: Vec<u64> = (0..n as u64).map(|i| (i * i + 3) % q).collect();
        let b: Vec<u64> = (0..n as u64).map(|i| q - 1 - i).collect();

        let expected = schoolbook_negacyclic(&a, &b, q);

        let mut fa = a.clone();
        let mut fb = b.clone();
        ctx.forward(&mut fa);
        ctx.forward(&mut fb);
        let mut prod = vec![0u64; n];
        ctx.pointwise_mul(&fa, &fb, &mut prod);
        ctx.inverse(&mut prod);

        assert_eq!(prod, expected);
    }

    #[test]
    fn test_x_times_x_pow_n_minus_one_is_minus_one() {
        let n = 256;
        let q = DEFAULT_Q;
        let ctx = NttContext::new(n, q);

        let mut a = vec![0u64; n];
        a[1] = 1;
        let mut b = vec![0u64; n];
        b[n - 1] = 1;

        ctx.forward(&mut a);
        ctx.forward(&mut b);
        let mut result = vec![0u64; n];
        ctx.pointwise_mul(&a, &b, &mut result);
        ctx.inverse(&mut result);

        assert_eq!(result[0], q - 1);
        assert!(result[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_bit_reverse() {
        assert_eq!(bit_reverse(1, 3), 4);
        assert_eq!(bit_reverse(3, 3), 6);
        assert_eq!(bit_reverse(0, 5), 0);
    }
}
