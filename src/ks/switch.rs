//! Key switching and Galois substitution

use crate::crypto_err;
use crate::error::Result;
use crate::math::{NttContext, Poly};
use crate::rlwe::{automorphism_ciphertext, RlweCiphertext};

use super::gadget::gadget_decompose;
use super::setup::{GaloisKeys, KeySwitchingMatrix};

/// Switch (a, b) from key s to key s'.
///
/// (a', b') = (0, b) + Σᵢ g⁻¹(a)ᵢ · K[i], accumulated in NTT domain.
pub fn key_switch(
    ct: &RlweCiphertext,
    ks_matrix: &KeySwitchingMatrix,
    ctx: &NttContext,
) -> RlweCiphertext {
    let d = ct.ring_dim();
    let q = ct.modulus();

    let mut acc_a = Poly::zero_ntt(d, q);
    let mut acc_b = Poly::zero_ntt(d, q);
    for (mut digit, row) in gadget_decompose(&ct.a, &ks_matrix.gadget)
        .into_iter()
        .zip(&ks_matrix.rows)
    {
        digit.to_ntt(ctx);
        acc_a.mul_acc_ntt_domain(&digit, &row.a, ctx);
        acc_b.mul_acc_ntt_domain(&digit, &row.b, ctx);
    }
    acc_a.from_ntt(ctx);
    acc_b.from_ntt(ctx);

    acc_b += &ct.b;
    RlweCiphertext::from_parts(acc_a, acc_b)
}

/// Apply τ_g to a ciphertext under s and switch the result back to s
pub fn substitute(
    ct: &RlweCiphertext,
    g: usize,
    keys: &GaloisKeys,
    ctx: &NttContext,
) -> Result<RlweCiphertext> {
    let ks = keys
        .get(g)
        .ok_or_else(|| crypto_err!("missing galois key for element {}", g))?;
    Ok(key_switch(&automorphism_ciphertext(ct, g), ks, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ks::{generate_ks_matrix, GadgetVector};
    use crate::math::{GaussianSampler, DEFAULT_Q};
    use crate::rlwe::{apply_automorphism, expansion_element, RlweSecretKey};

    const N: usize = 1024;
    const Q: u64 = DEFAULT_Q;
    const LOG_T: u32 = 12;

    fn gadget() -> GadgetVector {
        GadgetVector::new(1 << 8, 8, Q)
    }

    fn message() -> Poly {
        Poly::from_coeffs((0..N as u64).map(|i| (i * 17 + 3) % 4096).collect(), Q)
    }

    #[test]
    fn test_key_switch_between_keys() {
        let ctx = NttContext::new(N, Q);
        let mut sampler = GaussianSampler::with_seed(3.2, 5);
        let s1 = RlweSecretKey::generate(N, Q, &mut sampler);
        let s2 = RlweSecretKey::generate(N, Q, &mut sampler);
        let ksm = generate_ks_matrix(&s1, &s2, &gadget(), &mut sampler, &ctx);

        let m = message();
        let ct = RlweCiphertext::encrypt(&s1, &m, Q >> LOG_T, &mut sampler, &ctx);
        let switched = key_switch(&ct, &ksm, &ctx);

        assert_eq!(switched.decrypt(&s2, LOG_T, &ctx), m);
        assert!(switched.noise_budget(&s2, LOG_T, &ctx) > 20);
    }

    #[test]
    fn test_substitute_applies_automorphism_to_message() {
        let ctx = NttContext::new(N, Q);
        let mut sampler = GaussianSampler::with_seed(3.2, 6);
        let sk = RlweSecretKey::generate(N, Q, &mut sampler);
        let elements: Vec<usize> = (0..3).map(|l| expansion_element(N, l)).collect();
        let keys = GaloisKeys::generate(&sk, &elements, &gadget(), &mut sampler, &ctx);

        let m = message();
        let ct = RlweCiphertext::encrypt(&sk, &m, Q >> LOG_T, &mut sampler, &ctx);
        for &g in &elements {
            let sub = substitute(&ct, g, &keys, &ctx).unwrap();
            let expected = apply_automorphism(&m, g);
            let t = 1u64 << LOG_T;
            let dec = sub.decrypt(&sk, LOG_T, &ctx);
            for i in 0..N {
                // negated coefficients come back as t - m mod t
                let want = expected.coeff(i);
                let want = if want > Q / 2 { (t - (Q - want) % t) % t } else { want % t };
                assert_eq!(dec.coeff(i), want, "g = {}, coefficient {}", g, i);
            }
        }
    }

    #[test]
    fn test_substitute_without_key_fails() {
        let ctx = NttContext::new(N, Q);
        let mut sampler = GaussianSampler::with_seed(3.2, 7);
        let sk = RlweSecretKey::generate(N, Q, &mut sampler);
        let keys = GaloisKeys::default();
        let ct = RlweCiphertext::encrypt(&sk, &message(), Q >> LOG_T, &mut sampler, &ctx);
        assert!(substitute(&ct, N + 1, &keys, &ctx).is_err());
    }
}
