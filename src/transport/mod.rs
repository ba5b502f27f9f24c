//! Transport collaborator: moves opaque payloads to a replica and back.
//!
//! The core never frames sockets itself. [`local::LocalTransport`] calls
//! in-process replicas (tests, benches); [`http::HttpTransport`] posts
//! bincode bodies to a replica's `/pir` endpoint.

pub mod http;
pub mod local;

pub use http::HttpTransport;
pub use local::LocalTransport;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// A replica endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Network address, `host:port` for HTTP
    pub address: String,
    /// Replica id, which decides the RAID-PIR chunks it covers
    pub replica: usize,
}

impl Target {
    pub fn new(address: impl Into<String>, replica: usize) -> Self {
        Self {
            address: address.into(),
            replica,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (replica {})", self.address, self.replica)
    }
}

/// One request/response exchange with a target.
///
/// Failures are reported as [`crate::HybridPirError::Network`]; the
/// dispatcher applies its own timeout on top of any the transport has.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        target: &Target,
        message: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}
