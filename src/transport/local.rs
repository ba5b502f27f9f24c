use super::{Target, Transport};
use crate::error::{HybridPirError, Result};
use crate::server::HybridPirServer;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// In-process transport over a set of replicas keyed by address.
///
/// Targets can be switched off to simulate a replica that never answers.
#[derive(Default)]
pub struct LocalTransport {
    servers: HashMap<String, Arc<HybridPirServer>>,
    unavailable: RwLock<HashSet<String>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: impl Into<String>, server: Arc<HybridPirServer>) {
        self.servers.insert(address.into(), server);
    }

    pub fn set_available(&self, address: &str, available: bool) {
        let mut down = self.unavailable.write().unwrap_or_else(|e| e.into_inner());
        if available {
            down.remove(address);
        } else {
            down.insert(address.to_string());
        }
    }

    fn lookup(&self, target: &Target) -> Result<Arc<HybridPirServer>> {
        let network = |reason: &str| HybridPirError::Network {
            target: target.address.clone(),
            reason: reason.to_string(),
        };
        if self
            .unavailable
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&target.address)
        {
            return Err(network("target unavailable"));
        }
        self.servers
            .get(&target.address)
            .cloned()
            .ok_or_else(|| network("unknown target"))
    }
}

impl Transport for LocalTransport {
    fn send(
        &self,
        target: &Target,
        message: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let lookup = self.lookup(target);
        let address = target.address.clone();
        async move {
            let server = lookup?;
            trace!(target = %address, bytes = message.len(), "local send");
            tokio::task::spawn_blocking(move || server.handle_bytes(&message))
                .await
                .map_err(|e| HybridPirError::Network {
                    target: address,
                    reason: e.to_string(),
                })?
        }
    }
}
