use super::{Target, Transport};
use crate::error::{HybridPirError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Posts bincode payloads to `http://{address}/pir`
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(connect: Duration, request: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(request)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeouts ({}), using defaults", e);
                reqwest::Client::new()
            });
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        target: &Target,
        message: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let client = self.client.clone();
        let address = target.address.clone();
        async move {
            let url = format!("http://{}/pir", address);
            let network = |reason: String| HybridPirError::Network {
                target: address.clone(),
                reason,
            };

            let resp = client
                .post(&url)
                .header("content-type", "application/octet-stream")
                .body(message)
                .send()
                .await
                .map_err(|e| network(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(network(format!("status {}", resp.status())));
            }
            let body = resp.bytes().await.map_err(|e| network(e.to_string()))?;
            Ok(body.to_vec())
        }
    }
}
