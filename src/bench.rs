//! Cost profile of the homomorphic layer at a fixed parameter set.
//!
//! Runs one SealPIR retrieval inside a single partition, without RAID-PIR
//! or any network, and reports how long each phase took.

use crate::error::Result;
use crate::math::{GaussianSampler, NttContext};
use crate::params::SealPirParams;
use crate::sealpir::encode::encode_partition;
use crate::sealpir::{expand_query, generate_reply, SealPirClient, SealPirLayout};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::time::{Duration, Instant};
use tracing::info;

const BENCH_RING_DIM: usize = 2048;
const BENCH_PLAIN_LOG: u32 = 12;
const BENCH_ELEMENT_SIZE: usize = 32;
const BENCH_ELEMENTS: usize = 4096;
const BENCH_D: usize = 2;

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub keygen: Duration,
    pub encode: Duration,
    pub query: Duration,
    pub expand: Duration,
    pub reply: Duration,
    pub decode: Duration,
    pub query_bytes: usize,
    pub reply_bytes: usize,
}

/// Time key generation, query, expansion, reply and decode
pub fn benchmark() -> Result<BenchmarkReport> {
    let params = SealPirParams::new(BENCH_RING_DIM, BENCH_PLAIN_LOG)?;
    let layout = SealPirLayout::new(params, BENCH_ELEMENT_SIZE, BENCH_ELEMENTS, BENCH_D)?;
    let ctx = NttContext::new(layout.params.ring_dim, layout.params.q);

    let mut data = vec![0u8; BENCH_ELEMENTS * BENCH_ELEMENT_SIZE];
    ChaCha20Rng::seed_from_u64(0).fill_bytes(&mut data);

    let t = Instant::now();
    let plaintexts = encode_partition(&layout, &data, &ctx)?;
    let encode = t.elapsed();

    let t = Instant::now();
    let client = SealPirClient::new(layout.clone(), GaussianSampler::new(layout.params.sigma));
    let keygen = t.elapsed();

    let offset = BENCH_ELEMENTS / 2;
    let t = Instant::now();
    let query = client.query(offset)?;
    let query_time = t.elapsed();

    let t = Instant::now();
    expand_query(&query.dims[0][0], layout.coverage(layout.dims[0], 0), client.galois_keys(), &ctx)?;
    let expand = t.elapsed();

    let t = Instant::now();
    let reply = generate_reply(&layout, &plaintexts, &query, client.galois_keys(), &ctx)?;
    let reply_time = t.elapsed();

    let t = Instant::now();
    let block = client.decode(offset, &reply)?;
    let decode = t.elapsed();
    let start = layout.offset_in_plaintext(offset) * BENCH_ELEMENT_SIZE;
    let expected = &data[offset * BENCH_ELEMENT_SIZE..(offset + 1) * BENCH_ELEMENT_SIZE];
    if &block[start..start + BENCH_ELEMENT_SIZE] != expected {
        return Err(crate::crypto_err!("benchmark retrieval returned the wrong element"));
    }

    let report = BenchmarkReport {
        keygen,
        encode,
        query: query_time,
        expand,
        reply: reply_time,
        decode,
        query_bytes: bincode::serialized_size(&query)? as usize,
        reply_bytes: bincode::serialized_size(&reply)? as usize,
    };
    info!(
        ring_dim = BENCH_RING_DIM,
        elements = BENCH_ELEMENTS,
        hypercube = ?layout.dims,
        keygen_ms = report.keygen.as_secs_f64() * 1000.0,
        encode_ms = report.encode.as_secs_f64() * 1000.0,
        query_ms = report.query.as_secs_f64() * 1000.0,
        expand_ms = report.expand.as_secs_f64() * 1000.0,
        reply_ms = report.reply.as_secs_f64() * 1000.0,
        decode_ms = report.decode.as_secs_f64() * 1000.0,
        query_bytes = report.query_bytes,
        reply_bytes = report.reply_bytes,
        "sealpir benchmark"
    );
    Ok(report)
}
