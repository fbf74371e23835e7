use anyhow::{Context, Result};
use hadcoin_core::consensus::ChainFetcher;
use hadcoin_core::ChainSnapshot;
use reqwest::Client;
use std::time::Duration;

/// Fetches a peer's chain from its `GET /get_chain` endpoint.
#[derive(Clone, Debug)]
pub struct HttpChainFetcher {
    http: Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { http })
    }
}

impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot> {
        let snapshot = self
            .http
            .get(format!("http://{peer}/get_chain"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("requesting chain from {peer}"))?
            .json::<ChainSnapshot>()
            .await
            .with_context(|| format!("decoding chain from {peer}"))?;
        Ok(snapshot)
    }
}
