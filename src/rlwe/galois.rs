//! Galois automorphisms for RLWE.
//!
//! τ_g: R → R with τ_g(X) = X^g for odd g. Oblivious query expansion uses
//! the elements g = N/2^a + 1, which fix the coefficients whose index is a
//! multiple of 2^(a+1) and negate the ones at odd multiples of 2^a.

use crate::math::{ModQ, Poly};

use super::types::RlweCiphertext;

/// τ_g(p(X)) = p(X^g) mod (X^d + 1)
pub fn apply_automorphism(poly: &Poly, g: usize) -> Poly {
    assert!(!poly.is_ntt(), "automorphism requires coefficient domain");
    let d = poly.dimension();
    assert!(is_valid_galois_element(g, d), "{} is not a Galois element for degree {}", g, d);
    let q = poly.modulus();
    let two_d = 2 * d;

    let mut out = Poly::zero(d, q);
    let coeffs = out.coeffs_mut();
    for (i, &c) in poly.coeffs().iter().enumerate() {
        if c == 0 {
            continue;
        }
        let idx = (g * i) % two_d;
        if idx < d {
            coeffs[idx] = ModQ::add(coeffs[idx], c, q);
        } else {
            coeffs[idx - d] = ModQ::sub(coeffs[idx - d], c, q);
        }
    }
    out
}

/// τ_g applied to both components. The result decrypts under τ_g(s) and
/// needs a key switch back to s.
pub fn automorphism_ciphertext(ct: &RlweCiphertext, g: usize) -> RlweCiphertext {
    RlweCiphertext {
        a: apply_automorphism(&ct.a, g),
        b: apply_automorphism(&ct.b, g),
    }
}

/// Galois element used at level `level` of query expansion
pub fn expansion_element(ring_dim: usize, level: usize) -> usize {
    (ring_dim >> level) + 1
}

/// Check if g is odd and lies in [1, 2d)
fn is_valid_galois_element(g: usize, d: usize) -> bool {
    g % 2 == 1 && g < 2 * d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{NttContext, DEFAULT_Q};

    const Q: u64 = DEFAULT_Q;

    #[test]
    fn test_identity() {
        let p = Poly::from_coeffs((1..=16).collect(), Q);
        assert_eq!(apply_automorphism(&p, 1), p);
    }

    #[test]
    fn test_is_ring_homomorphism() {
        let n = 64;
        let ctx = NttContext::new(n, Q);
        let a = Poly::from_coeffs((0..n as u64).map(|i| i * 3 + 1).collect(), Q);
        let b = Poly::from_coeffs((0..n as u64).map(|i| 100 - i).collect(), Q);
        for g in [3usize, 5, 2 * n - 1, n + 1] {
            let lhs = apply_automorphism(&a.mul_ntt(&b, &ctx), g);
            let rhs = apply_automorphism(&a, g).mul_ntt(&apply_automorphism(&b, g), &ctx);
            assert_eq!(lhs, rhs, "g = {}", g);
        }
    }

    #[test]
    fn test_expansion_element_parity() {
        let n = 32;
        let p = Poly::from_coeffs((1..=n as u64).collect(), Q);

        // level 0: X -> X^(N+1) flips the sign of odd coefficients
        let g0 = expansion_element(n, 0);
        assert_eq!(g0, n + 1);
        let r = apply_automorphism(&p, g0);
        for i in 0..n {
            let expected = if i % 2 == 0 { p.coeff(i) } else { Q - p.coeff(i) };
            assert_eq!(r.coeff(i), expected, "coefficient {}", i);
        }

        // level 1: fixes multiples of 4, negates 2 mod 4
        let g1 = expansion_element(n, 1);
        let r = apply_automorphism(&p, g1);
        for i in (0..n).step_by(2) {
            let expected = if i % 4 == 0 { p.coeff(i) } else { Q - p.coeff(i) };
            assert_eq!(r.coeff(i), expected, "coefficient {}", i);
        }
    }

    #[test]
    fn test_valid_elements() {
        assert!(is_valid_galois_element(3, 1024));
        assert!(is_valid_galois_element(2047, 1024));
        assert!(!is_valid_galois_element(4, 1024));
        assert!(!is_valid_galois_element(2049, 1024));
    }
}
