//! HTTP trace sink client

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use rab_core::{Error, Result, TraceEvent, TraceSink};

/// Trace sink that POSTs structured records to the observability collaborator
///
/// Emission is best-effort by contract: every failure is classified
/// transient, and callers log it and carry on without retrying.
pub struct HttpTraceSink {
    client: Client,
    endpoint: String,
}

impl HttpTraceSink {
    /// Create a new trace sink client for the configured endpoint
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build trace client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl TraceSink for HttpTraceSink {
    async fn record(&self, event: TraceEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&event)
            .send()
            .await
            .map_err(|e| Error::TransientBackend(format!("trace sink unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::TransientBackend(format!("trace sink returned {}", status)));
        }

        Ok(())
    }
}
