//! Replica responder.
//!
//! A replica holds the full database. For a query it XORs the RAID-PIR
//! blocks its selection picks into one masked partition, packs that into
//! plaintexts and answers the client's SealPIR query over it.

use crate::error::Result;
use crate::message::HybridPirMessage;
use crate::math::NttContext;
use crate::params::RetrievalParams;
use crate::partition::PartitionLayout;
use crate::raidpir::{RaidPirServer, SelectionBits};
use crate::sealpir::encode::encode_partition;
use crate::sealpir::{generate_reply, SealPirLayout, SealPirQuery, SealPirReply};
use crate::ks::GaloisKeys;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct HybridPirServer {
    params: RetrievalParams,
    raidpir: RaidPirServer,
    sealpir: SealPirLayout,
    ctx: NttContext,
}

impl HybridPirServer {
    /// Replica `replica` of `servers`, serving `db` under `params`
    pub fn new(db: Vec<u8>, replica: usize, servers: usize, params: RetrievalParams) -> Result<Self> {
        params.validate()?;
        let layout = PartitionLayout::from_params(&params, servers)?;
        let sealpir = SealPirLayout::for_partition(&params, layout.elements_per_partition)?;
        let ctx = NttContext::new(sealpir.params.ring_dim, sealpir.params.q);
        info!(
            replica,
            servers,
            partitions = layout.partitions,
            partition_bytes = layout.partition_bytes(),
            hypercube = ?sealpir.dims,
            "replica ready"
        );
        let raidpir = RaidPirServer::new(layout, db, replica)?;
        Ok(Self {
            params,
            raidpir,
            sealpir,
            ctx,
        })
    }

    /// Answer block selections from precomputed subset tables; see
    /// [`RaidPirServer::with_four_russians`]
    pub fn with_four_russians(mut self) -> Self {
        self.raidpir = self.raidpir.with_four_russians();
        self
    }

    pub fn replica(&self) -> usize {
        self.raidpir.replica()
    }

    pub fn params(&self) -> &RetrievalParams {
        &self.params
    }

    pub fn layout(&self) -> &PartitionLayout {
        self.raidpir.layout()
    }

    fn answer(
        &self,
        seed: u64,
        raidpir_query: Vec<u8>,
        galois_keys: &GaloisKeys,
        sealpir_query: &SealPirQuery,
    ) -> Result<SealPirReply> {
        let t0 = Instant::now();
        let explicit = SelectionBits::from_vec(raidpir_query);
        let masked = self.raidpir.response(seed, &explicit)?;
        let t_raid = t0.elapsed();

        let plaintexts = encode_partition(&self.sealpir, &masked, &self.ctx)?;
        let reply = generate_reply(&self.sealpir, &plaintexts, sealpir_query, galois_keys, &self.ctx)?;
        debug!(
            replica = self.replica(),
            raidpir_ms = t_raid.as_secs_f64() * 1000.0,
            total_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "answered query"
        );
        Ok(reply)
    }

    /// Process one message. Failures become `Error` replies.
    pub fn handle(&self, message: HybridPirMessage) -> HybridPirMessage {
        match message {
            HybridPirMessage::Hello { session } => HybridPirMessage::Seed {
                session,
                seed: self.raidpir.issue_seed(),
            },
            HybridPirMessage::Query {
                session,
                seed,
                raidpir_query,
                galois_keys,
                sealpir_query,
            } => match self.answer(seed, raidpir_query, &galois_keys, &sealpir_query) {
                Ok(reply) => HybridPirMessage::Response { session, reply },
                Err(e) => {
                    warn!(replica = self.replica(), error = %e, "query rejected");
                    HybridPirMessage::Error {
                        session,
                        reason: e.to_string(),
                    }
                }
            },
            other => HybridPirMessage::Error {
                session: other.session(),
                reason: format!("unexpected {} message", other.kind()),
            },
        }
    }

    /// Decode, process and re-encode one wire payload
    pub fn handle_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let reply = match HybridPirMessage::from_bytes(bytes) {
            Ok(message) => self.handle(message),
            Err(e) => HybridPirMessage::Error {
                session: 0,
                reason: e.to_string(),
            },
        };
        reply.to_bytes()
    }
}

/// Demo content: deterministic random elements, with `deadbeef` (padded or
/// cut to the element size) at `element_count / 2`
pub fn demo_database(element_count: usize, element_size: usize, seed: u64) -> Vec<u8> {
    let mut db = vec![0u8; element_count * element_size];
    ChaCha20Rng::seed_from_u64(seed).fill_bytes(&mut db);
    if element_count == 0 {
        return db;
    }
    let marker = (element_count / 2) * element_size;
    let slot = &mut db[marker..marker + element_size];
    slot.fill(0);
    let n = element_size.min(8);
    slot[..n].copy_from_slice(&b"deadbeef"[..n]);
    db
}

/// HTTP front end: `POST /pir` with a bincode body, `GET /health`
#[cfg(feature = "server")]
pub mod http {
    use super::HybridPirServer;
    use axum::{
        body::Bytes,
        extract::{DefaultBodyLimit, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    /// Queries carry Galois keys, which dominate the body size
    pub const MAX_BODY_BYTES: usize = 64 << 20;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HealthResponse {
        pub status: String,
        pub version: String,
        pub replica: usize,
    }

    async fn health_check(State(server): State<Arc<HybridPirServer>>) -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            replica: server.replica(),
        })
    }

    async fn handle_pir(
        State(server): State<Arc<HybridPirServer>>,
        body: Bytes,
    ) -> Result<Vec<u8>, (StatusCode, String)> {
        tokio::task::spawn_blocking(move || server.handle_bytes(&body))
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }

    pub fn router(server: Arc<HybridPirServer>) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/pir", post(handle_pir))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(server)
    }
}
