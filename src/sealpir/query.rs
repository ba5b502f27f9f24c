//! Client side of SealPIR: key material, hypercube queries, reply decoding.

use super::encode::decode_plaintext;
use super::{ceil_log2, SealPirLayout, SealPirQuery, SealPirReply};
use crate::engine::SubQueryEngine;
use crate::error::Result;
use crate::ks::GaloisKeys;
use crate::math::{GaussianSampler, ModQ, NttContext, Poly};
use crate::rlwe::{RlweCiphertext, RlweSecretKey};
use crate::{config_err, crypto_err};
use std::sync::Mutex;
use std::time::Instant;
use tracing::debug;

/// Per-session SealPIR client.
///
/// Owns the secret key and the Galois keys derived from it. Key generation
/// happens once in [`SealPirClient::new`]; every query and decode after
/// that borrows the same material.
pub struct SealPirClient {
    layout: SealPirLayout,
    ctx: NttContext,
    secret_key: RlweSecretKey,
    galois_keys: GaloisKeys,
    sampler: Mutex<GaussianSampler>,
}

impl SealPirClient {
    pub fn new(layout: SealPirLayout, mut sampler: GaussianSampler) -> Self {
        let t0 = Instant::now();
        let n = layout.params.ring_dim;
        let q = layout.params.q;
        let ctx = NttContext::new(n, q);
        let secret_key = RlweSecretKey::generate(n, q, &mut sampler);
        let galois_keys = GaloisKeys::generate(
            &secret_key,
            &layout.galois_elements(),
            &layout.gadget(),
            &mut sampler,
            &ctx,
        );
        debug!(
            ring_dim = n,
            keys = galois_keys.len(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "sealpir keygen"
        );
        Self {
            layout,
            ctx,
            secret_key,
            galois_keys,
            sampler: Mutex::new(sampler),
        }
    }

    pub fn layout(&self) -> &SealPirLayout {
        &self.layout
    }

    /// Keys the server needs for expansion
    pub fn galois_keys(&self) -> &GaloisKeys {
        &self.galois_keys
    }

    /// Fresh retrieval session id from the session's random stream
    pub fn next_session_id(&self) -> u64 {
        self.sampler.lock().unwrap_or_else(|e| e.into_inner()).next_u64()
    }

    /// Query for the element at `offset` within the partition.
    ///
    /// The ciphertext count depends only on the layout.
    pub fn query(&self, offset: usize) -> Result<SealPirQuery> {
        if offset >= self.layout.num_elements {
            return Err(config_err!(
                "offset {} out of range for a partition of {} elements",
                offset,
                self.layout.num_elements
            ));
        }

        let n = self.layout.params.ring_dim;
        let q = self.layout.params.q;
        let delta = self.layout.params.delta();
        let coords = self.layout.coordinates(self.layout.plaintext_index(offset));
        let mut sampler = self.sampler.lock().unwrap_or_else(|e| e.into_inner());

        let dims = self
            .layout
            .dims
            .iter()
            .zip(&coords)
            .map(|(&side, &coord)| {
                (0..side.div_ceil(n))
                    .map(|k| {
                        let covered = self.layout.coverage(side, k);
                        let mut message = Poly::zero(n, q);
                        if coord / n == k {
                            let scale = ModQ::inverse(1u64 << ceil_log2(covered), q);
                            message.set_coeff(coord - k * n, ModQ::mul(delta, scale, q));
                        }
                        RlweCiphertext::encrypt_raw(&self.secret_key, &message, &mut sampler, &self.ctx)
                    })
                    .collect()
            })
            .collect();

        Ok(SealPirQuery { dims })
    }

    /// Decrypt, refusing malformed ciphertexts and exhausted noise budgets
    fn decrypt_checked(&self, ct: &RlweCiphertext) -> Result<Poly> {
        let n = self.layout.params.ring_dim;
        let q = self.layout.params.q;
        let plain_log = self.layout.params.plain_log;
        if !ct.is_well_formed(n, q) {
            return Err(crypto_err!("reply ciphertext does not match ring degree {}", n));
        }
        if ct.noise_budget(&self.secret_key, plain_log, &self.ctx) == 0 {
            return Err(crypto_err!("reply noise exceeds the decryption bound"));
        }
        Ok(ct.decrypt(&self.secret_key, plain_log, &self.ctx))
    }

    /// Rebuild a ciphertext from its `F` decrypted base-t digits
    fn compose(&self, digits: &[Poly]) -> Result<RlweCiphertext> {
        let n = self.layout.params.ring_dim;
        let q = self.layout.params.q;
        let plain_log = self.layout.params.plain_log;
        let half = digits.len() / 2;

        let join = |parts: &[Poly]| -> Result<Poly> {
            let mut coeffs = vec![0u128; n];
            for (j, part) in parts.iter().enumerate() {
                let shift = j as u32 * plain_log;
                for (acc, &c) in coeffs.iter_mut().zip(part.coeffs()) {
                    *acc |= (c as u128) << shift;
                }
            }
            let coeffs = coeffs
                .into_iter()
                .map(|c| {
                    if c >= q as u128 {
                        Err(crypto_err!("composed coefficient exceeds the ciphertext modulus"))
                    } else {
                        Ok(c as u64)
                    }
                })
                .collect::<Result<Vec<u64>>>()?;
            Ok(Poly::from_coeffs(coeffs, q))
        };

        Ok(RlweCiphertext::from_parts(join(&digits[..half])?, join(&digits[half..])?))
    }

    /// Decode a reply into the sub-block holding the element at `offset`:
    /// every element slot of the selected plaintext.
    pub fn decode(&self, offset: usize, reply: &SealPirReply) -> Result<Vec<u8>> {
        let t0 = Instant::now();
        if reply.ciphertexts.len() != self.layout.reply_len() {
            return Err(crypto_err!(
                "reply has {} ciphertexts, expected {}",
                reply.ciphertexts.len(),
                self.layout.reply_len()
            ));
        }
        if offset >= self.layout.num_elements {
            return Err(config_err!("offset {} out of range", offset));
        }

        let ratio = self.layout.expansion_ratio();
        let mut cts = reply.ciphertexts.clone();
        for _ in 1..self.layout.depth() {
            let plaintexts = cts
                .iter()
                .map(|ct| self.decrypt_checked(ct))
                .collect::<Result<Vec<_>>>()?;
            cts = plaintexts
                .chunks(ratio)
                .map(|digits| self.compose(digits))
                .collect::<Result<Vec<_>>>()?;
        }

        let [last] = cts.as_slice() else {
            return Err(crypto_err!("reply did not fold to a single ciphertext"));
        };
        let plaintext = self.decrypt_checked(last)?;
        let block = decode_plaintext(&self.layout, &plaintext);
        debug!(
            bytes = block.len(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "decoded sealpir reply"
        );
        Ok(block)
    }
}

impl SubQueryEngine for SealPirClient {
    type Context = ();
    type Query = SealPirQuery;
    type Answer = SealPirReply;

    fn build_query(&self, selection: usize, _context: &()) -> Result<SealPirQuery> {
        self.query(selection)
    }

    fn reconstruct(&self, selection: usize, reply: &SealPirReply) -> Result<Vec<u8>> {
        self.decode(selection, reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HybridPirError;
    use crate::params::SealPirParams;
    use crate::sealpir::encode::encode_partition;
    use crate::sealpir::generate_reply;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn setup(num_elements: usize, d: usize) -> (SealPirClient, Vec<u8>, Vec<Poly>) {
        let params = SealPirParams::new(1024, 12).unwrap();
        let layout = SealPirLayout::new(params, 8, num_elements, d).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(num_elements as u64);
        let data: Vec<u8> = (0..num_elements * 8).map(|_| rng.gen()).collect();
        let ctx = NttContext::new(1024, layout.params.q);
        let plaintexts = encode_partition(&layout, &data, &ctx).unwrap();
        let client = SealPirClient::new(layout, GaussianSampler::with_seed(3.2, 17));
        (client, data, plaintexts)
    }

    fn fetch(client: &SealPirClient, plaintexts: &[Poly], offset: usize) -> Vec<u8> {
        let layout = client.layout();
        let ctx = NttContext::new(layout.params.ring_dim, layout.params.q);
        let query = client.build_query(offset, &()).unwrap();
        let reply = generate_reply(layout, plaintexts, &query, client.galois_keys(), &ctx).unwrap();
        let block = client.reconstruct(offset, &reply).unwrap();
        assert_eq!(block.len(), layout.sub_block_bytes());
        let start = layout.offset_in_plaintext(offset) * layout.element_size;
        block[start..start + layout.element_size].to_vec()
    }

    #[test]
    fn test_two_dimensions() {
        let (client, data, plaintexts) = setup(3400, 2);
        assert_eq!(client.layout().dims, vec![5, 4]);
        for offset in [0, 1, 169, 170, 2048, 3399] {
            assert_eq!(fetch(&client, &plaintexts, offset), &data[offset * 8..offset * 8 + 8]);
        }
    }

    #[test]
    fn test_one_dimension() {
        let (client, data, plaintexts) = setup(1000, 1);
        for offset in [0, 512, 999] {
            assert_eq!(fetch(&client, &plaintexts, offset), &data[offset * 8..offset * 8 + 8]);
        }
    }

    #[test]
    fn test_three_dimensions() {
        let (client, data, plaintexts) = setup(170 * 8, 3);
        assert_eq!(client.layout().dims, vec![2, 2, 2]);
        let offset = 170 * 5 + 3;
        assert_eq!(fetch(&client, &plaintexts, offset), &data[offset * 8..offset * 8 + 8]);
    }

    #[test]
    fn test_every_accepted_layout_decodes() {
        let mut accepted = 0;
        for ring_dim in [1024, 2048] {
            for plain_log in [8, 12, 16, 20] {
                for d in [1, 2, 3] {
                    for (element_size, num_elements) in [(8, 3000), (32, 700), (8, 40)] {
                        let params = SealPirParams::new(ring_dim, plain_log).unwrap();
                        let Ok(layout) = SealPirLayout::new(params, element_size, num_elements, d) else {
                            continue;
                        };
                        accepted += 1;
                        let seed = (ring_dim + plain_log as usize * 10 + d) as u64;
                        let mut rng = ChaCha20Rng::seed_from_u64(seed);
                        let data: Vec<u8> = (0..num_elements * element_size).map(|_| rng.gen()).collect();
                        let ctx = NttContext::new(ring_dim, layout.params.q);
                        let plaintexts = encode_partition(&layout, &data, &ctx).unwrap();
                        let client = SealPirClient::new(layout, GaussianSampler::with_seed(3.2, seed));
                        let offset = num_elements * 2 / 3;
                        let label = format!("N={} log={} d={} es={}", ring_dim, plain_log, d, element_size);
                        assert_eq!(
                            fetch(&client, &plaintexts, offset),
                            &data[offset * element_size..(offset + 1) * element_size],
                            "{}",
                            label
                        );
                    }
                }
            }
        }
        assert!(accepted >= 20, "only {} layouts accepted", accepted);
    }

    #[test]
    fn test_query_size_independent_of_offset() {
        let (client, _, _) = setup(3400, 2);
        let sizes: Vec<usize> = [0, 1000, 3399]
            .iter()
            .map(|&o| bincode::serialize(&client.query(o).unwrap()).unwrap().len())
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_session_ids_follow_the_seed() {
        let (a, _, _) = setup(40, 1);
        let (b, _, _) = setup(40, 1);
        let ids: Vec<u64> = (0..4).map(|_| a.next_session_id()).collect();
        assert_eq!(ids, (0..4).map(|_| b.next_session_id()).collect::<Vec<_>>());
        assert!(ids.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_offset_out_of_range() {
        let (client, _, _) = setup(3400, 2);
        let err = client.query(3400).unwrap_err();
        assert!(matches!(err, HybridPirError::Configuration(_)));
    }

    #[test]
    fn test_rejects_malformed_reply() {
        let (client, _, _) = setup(3400, 2);
        let short = SealPirReply { ciphertexts: vec![] };
        assert!(matches!(client.decode(0, &short), Err(HybridPirError::Crypto(_))));

        let wrong_ring = SealPirReply {
            ciphertexts: vec![RlweCiphertext::zero(2048, client.layout().params.q); 10],
        };
        assert!(matches!(client.decode(0, &wrong_ring), Err(HybridPirError::Crypto(_))));
    }

    #[test]
    fn test_rejects_random_reply() {
        let (client, _, _) = setup(3400, 2);
        let q = client.layout().params.q;
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let ciphertexts = (0..10)
            .map(|_| {
                RlweCiphertext::from_parts(
                    Poly::random_with_rng(1024, q, &mut rng),
                    Poly::random_with_rng(1024, q, &mut rng),
                )
            })
            .collect();
        let err = client.decode(0, &SealPirReply { ciphertexts }).unwrap_err();
        assert!(matches!(err, HybridPirError::Crypto(_)));
    }
}
