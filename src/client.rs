//! Hybrid retrieval session.
//!
//! [`HybridPirClient`] owns the SealPIR key material for its lifetime, so
//! key generation is paid once and amortised over every retrieval made
//! through the same session. A retrieval is:
//!
//! 1. map the index to (partition, offset), before any network activity
//! 2. `Hello` round: collect one seed per replica
//! 3. build the RAID-PIR shares and the SealPIR query, `Query` round
//! 4. decode every replica's SealPIR reply, XOR the sub-blocks, slice out
//!    the element
//!
//! Query building and decoding run on tokio's blocking pool, so the
//! call deadline stays live while they run.

use crate::assemble::{assemble, RetrievedElement};
use crate::dispatch::{dispatch_round, require_quorum};
use crate::engine::SubQueryEngine;
use crate::error::{HybridPirError, Result};
use crate::math::GaussianSampler;
use crate::message::HybridPirMessage;
use crate::params::{DispatchConfig, RetrievalParams};
use crate::partition::PartitionLayout;
use crate::raidpir::RaidPirClient;
use crate::sealpir::{SealPirClient, SealPirLayout, SealPirReply};
use crate::transport::{Target, Transport};
use crate::{config_err, crypto_err};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct HybridPirClient {
    params: RetrievalParams,
    targets: Vec<Target>,
    layout: PartitionLayout,
    raidpir: Arc<RaidPirClient>,
    sealpir: Arc<SealPirClient>,
}

impl HybridPirClient {
    /// Validate the configuration and generate the session's keys.
    ///
    /// `targets` must name replicas `0..targets.len()`, each exactly once.
    pub fn new(params: RetrievalParams, mut targets: Vec<Target>, sampler: GaussianSampler) -> Result<Self> {
        params.validate()?;
        targets.sort_by_key(|t| t.replica);
        if let Some((i, t)) = targets.iter().enumerate().find(|(i, t)| t.replica != *i) {
            return Err(config_err!(
                "target {} has replica id {}, expected {}",
                t.address,
                t.replica,
                i
            ));
        }

        let layout = PartitionLayout::from_params(&params, targets.len())?;
        let sealpir_layout = SealPirLayout::for_partition(&params, layout.elements_per_partition)?;
        let sealpir = SealPirClient::new(sealpir_layout, sampler);
        Ok(Self {
            params,
            targets,
            raidpir: Arc::new(RaidPirClient::new(layout.clone())),
            layout,
            sealpir: Arc::new(sealpir),
        })
    }

    pub fn params(&self) -> &RetrievalParams {
        &self.params
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    /// Fetch element `index`, failing with [`HybridPirError::Timeout`] if
    /// the whole call exceeds `config.deadline`
    pub async fn retrieve<T: Transport>(
        &self,
        transport: &Arc<T>,
        index: usize,
        config: &DispatchConfig,
    ) -> Result<RetrievedElement> {
        let deadline = tokio::time::Instant::now() + config.deadline;
        tokio::time::timeout_at(deadline, self.retrieve_inner(transport, index, config))
            .await
            .map_err(|_| HybridPirError::Timeout(config.deadline))?
    }

    async fn retrieve_inner<T: Transport>(
        &self,
        transport: &Arc<T>,
        index: usize,
        config: &DispatchConfig,
    ) -> Result<RetrievedElement> {
        let t0 = Instant::now();
        let assignment = self.layout.assign(index)?;
        let servers = self.targets.len();
        let session = self.sealpir.next_session_id();
        debug!(
            index,
            partition = assignment.partition,
            offset = assignment.offset,
            chunk = assignment.chunk,
            replicas = ?assignment.replicas,
            "assigned"
        );

        let hello = self
            .targets
            .iter()
            .map(|_| HybridPirMessage::Hello { session })
            .collect();
        let slots = dispatch_round(transport, &self.targets, hello, session, config).await?;
        let seeds = require_quorum(slots, servers)?
            .into_iter()
            .map(|m| match m {
                HybridPirMessage::Seed { seed, .. } => Ok(seed),
                other => Err(unexpected("seed", &other)),
            })
            .collect::<Result<Vec<u64>>>()?;

        let t_query = Instant::now();
        let (partition, offset) = (assignment.partition, assignment.offset);
        let (raidpir, sealpir) = (Arc::clone(&self.raidpir), Arc::clone(&self.sealpir));
        let seed_list = seeds.clone();
        let (shares, sealpir_query) = off_runtime(move || {
            let shares = raidpir.build_query(partition, &seed_list)?;
            Ok((shares, sealpir.build_query(offset, &())?))
        })
        .await?;
        debug!(elapsed_ms = t_query.elapsed().as_secs_f64() * 1000.0, "queries built");

        let queries = shares
            .into_iter()
            .zip(&seeds)
            .map(|(bits, &seed)| HybridPirMessage::Query {
                session,
                seed,
                raidpir_query: bits.into_vec(),
                galois_keys: self.sealpir.galois_keys().clone(),
                sealpir_query: sealpir_query.clone(),
            })
            .collect();
        let slots = dispatch_round(transport, &self.targets, queries, session, config).await?;
        let replies = require_quorum(slots, servers)?
            .into_iter()
            .map(|m| match m {
                HybridPirMessage::Response { reply, .. } => Ok(reply),
                other => Err(unexpected("response", &other)),
            })
            .collect::<Result<Vec<SealPirReply>>>()?;

        let t_decode = Instant::now();
        let (raidpir, sealpir) = (Arc::clone(&self.raidpir), Arc::clone(&self.sealpir));
        let combined = off_runtime(move || {
            let sub_blocks = replies
                .par_iter()
                .map(|reply| sealpir.reconstruct(offset, reply))
                .collect::<Result<Vec<_>>>()?;
            raidpir.reconstruct(partition, &sub_blocks)
        })
        .await?;
        debug!(elapsed_ms = t_decode.elapsed().as_secs_f64() * 1000.0, "replies decoded");

        let element = assemble(
            index,
            self.params.element_size,
            &combined,
            self.sealpir.layout().offset_in_plaintext(offset),
        )?;
        info!(
            index,
            servers,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "retrieved element"
        );
        Ok(element)
    }
}

/// Run CPU-bound work on the blocking pool
async fn off_runtime<R, F>(work: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| crypto_err!("client worker failed: {}", e))?
}

fn unexpected(wanted: &str, got: &HybridPirMessage) -> HybridPirError {
    HybridPirError::Codec(format!("expected {} message, got {}", wanted, got.kind()))
}

/// One-shot retrieval: builds a session, fetches `index`, returns the
/// element's bytes
pub async fn retrieve<T: Transport>(
    transport: &Arc<T>,
    targets: Vec<Target>,
    params: RetrievalParams,
    index: usize,
) -> Result<Vec<u8>> {
    let sigma = params.sealpir()?.sigma;
    let client = HybridPirClient::new(params, targets, GaussianSampler::new(sigma))?;
    let element = client.retrieve(transport, index, &DispatchConfig::default()).await?;
    Ok(element.bytes)
}
