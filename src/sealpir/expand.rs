//! Oblivious query expansion.
//!
//! A ciphertext encrypting c·X^i (i < 2^l) is turned into 2^l ciphertexts,
//! the j-th encrypting 2^l·c·[i = j]. Level a splits every ciphertext by
//! the parity of its coefficient index at stride 2^a:
//!
//! ```text
//! even = ct + Subs(ct, N/2^a + 1)
//! odd  = ct·X^(-2^a) + Subs(ct·X^(-2^a), N/2^a + 1)
//! ```
//!
//! The query builder pre-scales c by 2^-l mod q, so the survivors encrypt
//! exactly Δ.

use crate::error::Result;
use crate::ks::{substitute, GaloisKeys};
use crate::math::NttContext;
use crate::rlwe::{expansion_element, RlweCiphertext};

use super::ceil_log2;

/// Expand `ct` into its first `count` selector ciphertexts, in index order.
///
/// Branches that only feed outputs at or beyond `count` are skipped.
pub fn expand_query(
    ct: &RlweCiphertext,
    count: usize,
    keys: &GaloisKeys,
    ctx: &NttContext,
) -> Result<Vec<RlweCiphertext>> {
    let n = ct.ring_dim();
    let levels = ceil_log2(count);
    let mut cts = vec![ct.clone()];

    for level in 0..levels {
        let g = expansion_element(n, level);
        let stride = 1usize << level;
        // X^(-2^a) = X^(2N - 2^a)
        let inverse_shift = 2 * n - stride;

        let mut lower = Vec::with_capacity(cts.len());
        let mut upper = Vec::with_capacity(cts.len());
        for (b, c0) in cts.iter().enumerate() {
            if b < count {
                lower.push(c0.add(&substitute(c0, g, keys, ctx)?));
            }
            if b + stride < count {
                let c1 = c0.mul_monomial(inverse_shift);
                let sub = substitute(&c1, g, keys, ctx)?;
                upper.push(c1.add(&sub));
            }
        }
        lower.append(&mut upper);
        cts = lower;
    }

    cts.truncate(count);
    Ok(cts)
}
