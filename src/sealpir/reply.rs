//! Server-side hypercube folding.
//!
//! Dimension i multiplies the expanded selector ciphertexts into the current
//! plaintexts and sums along that axis. Between dimensions every resulting
//! ciphertext is cut into `F` plaintexts (base-t digits of a, then of b)
//! that become the input of the next dimension. Outputs keep the digit path
//! as the least significant part of their index, so the client can regroup
//! them in runs of `F`.

use super::{expand_query, SealPirLayout, SealPirQuery, SealPirReply};
use crate::crypto_err;
use crate::error::Result;
use crate::ks::GaloisKeys;
use crate::math::{NttContext, Poly};
use crate::rlwe::RlweCiphertext;
use rayon::prelude::*;
use std::borrow::Cow;
use std::time::Instant;
use tracing::debug;

/// Base-t digits of both components: `F / 2` polynomials for a, then for b
pub fn decompose_ciphertext(ct: &RlweCiphertext, plain_log: u32, digits: usize) -> Vec<Poly> {
    let mask = (1u64 << plain_log) - 1;
    let q = ct.modulus();
    [&ct.a, &ct.b]
        .into_iter()
        .flat_map(|component| {
            (0..digits).map(move |j| {
                let shift = j as u32 * plain_log;
                let coeffs = component
                    .coeffs()
                    .iter()
                    .map(|&c| c.checked_shr(shift).unwrap_or(0) & mask)
                    .collect();
                Poly::from_coeffs(coeffs, q)
            })
        })
        .collect()
}

/// Check that a query and its keys match the layout before spending work
pub fn validate_query(layout: &SealPirLayout, query: &SealPirQuery, keys: &GaloisKeys) -> Result<()> {
    let n = layout.params.ring_dim;
    let q = layout.params.q;
    if query.dims.len() != layout.depth() {
        return Err(crypto_err!(
            "query has {} dimensions, expected {}",
            query.dims.len(),
            layout.depth()
        ));
    }
    for (i, cts) in query.dims.iter().enumerate() {
        if cts.len() != layout.ciphertexts_in_dim(i) {
            return Err(crypto_err!(
                "dimension {} has {} ciphertexts, expected {}",
                i,
                cts.len(),
                layout.ciphertexts_in_dim(i)
            ));
        }
        if !cts.iter().all(|ct| ct.is_well_formed(n, q)) {
            return Err(crypto_err!("malformed query ciphertext in dimension {}", i));
        }
    }
    if !keys.is_well_formed(n, q, &layout.gadget()) {
        return Err(crypto_err!("malformed galois keys"));
    }
    Ok(())
}

/// Fold `plaintexts` (NTT form, hypercube-padded) with the query
pub fn generate_reply(
    layout: &SealPirLayout,
    plaintexts: &[Poly],
    query: &SealPirQuery,
    keys: &GaloisKeys,
    ctx: &NttContext,
) -> Result<SealPirReply> {
    validate_query(layout, query, keys)?;
    if plaintexts.len() != layout.total_plaintexts() {
        return Err(crypto_err!(
            "expected {} plaintexts, got {}",
            layout.total_plaintexts(),
            plaintexts.len()
        ));
    }

    let n = layout.params.ring_dim;
    let q = layout.params.q;
    let plain_log = layout.params.plain_log;
    let digits = layout.expansion_ratio() / 2;
    let last = layout.depth() - 1;

    let mut cur: Cow<'_, [Poly]> = Cow::Borrowed(plaintexts);
    let mut product = layout.total_plaintexts();
    let mut width = 1usize;

    for (i, (&side, cts)) in layout.dims.iter().zip(&query.dims).enumerate() {
        let t0 = Instant::now();

        let mut selectors = Vec::with_capacity(side);
        for (k, ct) in cts.iter().enumerate() {
            selectors.extend(expand_query(ct, layout.coverage(side, k), keys, ctx)?);
        }
        for s in &mut selectors {
            s.to_ntt(ctx);
        }

        product /= side;
        let outputs: Vec<RlweCiphertext> = (0..product * width)
            .into_par_iter()
            .map(|idx| {
                let (k, w) = (idx / width, idx % width);
                let mut acc = RlweCiphertext::from_parts(Poly::zero_ntt(n, q), Poly::zero_ntt(n, q));
                for (j, sel) in selectors.iter().enumerate() {
                    acc.mul_plain_acc_ntt(sel, &cur[(j * product + k) * width + w], ctx);
                }
                acc.from_ntt(ctx);
                acc
            })
            .collect();

        debug!(
            dimension = i,
            side,
            outputs = outputs.len(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "folded dimension"
        );

        if i == last {
            return Ok(SealPirReply { ciphertexts: outputs });
        }

        cur = Cow::Owned(
            outputs
                .par_iter()
                .flat_map_iter(|ct| {
                    decompose_ciphertext(ct, plain_log, digits)
                        .into_iter()
                        .map(move |mut p| {
                            p.to_ntt(ctx);
                            p
                        })
                })
                .collect(),
        );
        width *= layout.expansion_ratio();
    }

    Err(crypto_err!("empty hypercube"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{GaussianSampler, DEFAULT_Q};
    use crate::params::SealPirParams;
    use crate::rlwe::RlweSecretKey;

    #[test]
    fn test_decompose_recomposes() {
        let n = 1024;
        let q = DEFAULT_Q;
        let ctx = NttContext::new(n, q);
        let mut sampler = GaussianSampler::with_seed(3.2, 3);
        let sk = RlweSecretKey::generate(n, q, &mut sampler);
        let ct = RlweCiphertext::encrypt(&sk, &Poly::constant(1, n, q), q >> 12, &mut sampler, &ctx);

        let parts = decompose_ciphertext(&ct, 12, 5);
        assert_eq!(parts.len(), 10);
        for (component, digits) in [&ct.a, &ct.b].into_iter().zip(parts.chunks(5)) {
            for i in 0..n {
                let value: u64 = digits
                    .iter()
                    .enumerate()
                    .map(|(j, d)| d.coeff(i) << (12 * j))
                    .sum();
                assert_eq!(value, component.coeff(i));
            }
        }
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let params = SealPirParams::new(1024, 12).unwrap();
        let layout = SealPirLayout::new(params, 8, 170 * 20, 2).unwrap();
        let query = SealPirQuery { dims: vec![vec![]] };
        assert!(validate_query(&layout, &query, &GaloisKeys::default()).is_err());

        let ct = RlweCiphertext::zero(512, DEFAULT_Q);
        let query = SealPirQuery {
            dims: vec![vec![ct.clone()], vec![ct]],
        };
        assert!(validate_query(&layout, &query, &GaloisKeys::default()).is_err());
    }
}
