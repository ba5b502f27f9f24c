//! Packing of partition bytes into plaintext polynomials.
//!
//! Every element occupies `coeffs_per_element` consecutive coefficients,
//! each holding `plain_log` bits of the element in little-endian order.
//! An element never straddles two plaintexts.

use super::SealPirLayout;
use crate::config_err;
use crate::error::Result;
use crate::math::{NttContext, Poly};
use rayon::prelude::*;

/// Split bytes into `count` little-endian `log_t`-bit coefficients,
/// zero-padding past the end of the input
pub fn bytes_to_coeffs(bytes: &[u8], log_t: u32, count: usize) -> Vec<u64> {
    let mask = (1u64 << log_t) - 1;
    let mut out = Vec::with_capacity(count);
    let mut acc = 0u64;
    let mut bits = 0u32;
    let mut input = bytes.iter();

    while out.len() < count {
        while bits < log_t {
            match input.next() {
                Some(&b) => {
                    acc |= (b as u64) << bits;
                    bits += 8;
                }
                None => break,
            }
        }
        out.push(acc & mask);
        acc >>= log_t;
        bits = bits.saturating_sub(log_t);
    }
    out
}

/// Inverse of [`bytes_to_coeffs`]: the first `len` bytes encoded by `coeffs`
pub fn coeffs_to_bytes(coeffs: &[u64], log_t: u32, len: usize) -> Vec<u8> {
    let mask = (1u64 << log_t) - 1;
    let mut out = Vec::with_capacity(len);
    let mut acc = 0u64;
    let mut bits = 0u32;

    for &c in coeffs {
        if out.len() == len {
            break;
        }
        acc |= (c & mask) << bits;
        bits += log_t;
        while bits >= 8 && out.len() < len {
            out.push(acc as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    while out.len() < len {
        out.push(acc as u8);
        acc >>= 8;
    }
    out
}

/// Encode a partition into NTT-form plaintexts, padded with zero
/// plaintexts up to the hypercube size.
pub fn encode_partition(layout: &SealPirLayout, data: &[u8], ctx: &NttContext) -> Result<Vec<Poly>> {
    let es = layout.element_size;
    if data.len() > layout.num_elements * es {
        return Err(config_err!(
            "partition of {} bytes exceeds {} elements of {} bytes",
            data.len(),
            layout.num_elements,
            es
        ));
    }

    let n = layout.params.ring_dim;
    let q = layout.params.q;
    let cpe = layout.coeffs_per_element;
    let ept = layout.elements_per_plaintext;
    let log_t = layout.params.plain_log;

    let plaintexts = (0..layout.total_plaintexts())
        .into_par_iter()
        .map(|p| {
            let mut coeffs = vec![0u64; n];
            for slot in 0..ept {
                let start = (p * ept + slot) * es;
                if start >= data.len() {
                    break;
                }
                let end = (start + es).min(data.len());
                let packed = bytes_to_coeffs(&data[start..end], log_t, cpe);
                coeffs[slot * cpe..(slot + 1) * cpe].copy_from_slice(&packed);
            }
            let mut poly = Poly::from_coeffs(coeffs, q);
            poly.to_ntt(ctx);
            poly
        })
        .collect();
    Ok(plaintexts)
}

/// Unpack every element slot of a decrypted plaintext, giving
/// `elements_per_plaintext * element_size` bytes
pub fn decode_plaintext(layout: &SealPirLayout, plaintext: &Poly) -> Vec<u8> {
    let cpe = layout.coeffs_per_element;
    let coeffs = plaintext.coeffs();
    (0..layout.elements_per_plaintext)
        .flat_map(|slot| {
            coeffs_to_bytes(
                &coeffs[slot * cpe..(slot + 1) * cpe],
                layout.params.plain_log,
                layout.element_size,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SealPirParams;

    #[test]
    fn test_coefficients_fit_plaintext_modulus() {
        let bytes: Vec<u8> = (0..=255).collect();
        for log_t in [1u32, 7, 12, 16, 20] {
            let count = (8 * bytes.len()).div_ceil(log_t as usize);
            let coeffs = bytes_to_coeffs(&bytes, log_t, count);
            assert!(coeffs.iter().all(|&c| c < (1 << log_t)));
            assert_eq!(coeffs_to_bytes(&coeffs, log_t, bytes.len()), bytes, "log_t {}", log_t);
        }
    }

    #[test]
    fn test_known_packing() {
        // 0xdeadbeef little-endian in 12-bit limbs
        let coeffs = bytes_to_coeffs(&[0xef, 0xbe, 0xad, 0xde], 12, 3);
        assert_eq!(coeffs, vec![0xeef, 0xadb, 0x0de]);
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let coeffs = bytes_to_coeffs(&[0xff], 12, 4);
        assert_eq!(coeffs, vec![0xff, 0, 0, 0]);
    }

    #[test]
    fn test_encode_decode_partition() {
        let params = SealPirParams::new(1024, 12).unwrap();
        let layout = SealPirLayout::new(params, 8, 400, 2).unwrap();
        let ctx = NttContext::new(1024, layout.params.q);
        let data: Vec<u8> = (0..400 * 8).map(|i| (i * 7 % 256) as u8).collect();

        let plaintexts = encode_partition(&layout, &data, &ctx).unwrap();
        assert_eq!(plaintexts.len(), layout.total_plaintexts());

        let ept = layout.elements_per_plaintext;
        for (p, pt) in plaintexts.iter().enumerate().take(layout.num_plaintexts) {
            let mut coeff_pt = pt.clone();
            coeff_pt.from_ntt(&ctx);
            let block = decode_plaintext(&layout, &coeff_pt);
            assert_eq!(block.len(), layout.sub_block_bytes());
            let start = p * ept * 8;
            let end = ((p + 1) * ept * 8).min(data.len());
            assert_eq!(&block[..end - start], &data[start..end]);
        }
    }

    #[test]
    fn test_rejects_oversized_partition() {
        let params = SealPirParams::new(1024, 12).unwrap();
        let layout = SealPirLayout::new(params, 8, 4, 1).unwrap();
        let ctx = NttContext::new(1024, layout.params.q);
        assert!(encode_partition(&layout, &[0u8; 33], &ctx).is_err());
    }
}
