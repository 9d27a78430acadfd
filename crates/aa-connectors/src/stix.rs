//! STIX bundle HTTP client.
//!
//! Retrieves the raw bundle bytes from the configured source with an
//! explicit timeout, then hands them through integrity verification. This
//! is the only network touchpoint in the system.

use crate::integrity;
use aa_core::{AtlasError, AtlasResult, BundleProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Bundle source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSource {
    /// URL of the STIX bundle.
    #[serde(default = "default_url")]
    pub url: String,

    /// ATT&CK domain tag written into exported layers.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Expected SHA-256 of the bundle, lowercase hex. When unset the
    /// observed digest is logged instead of enforced.
    #[serde(default)]
    pub expected_sha256: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "https://raw.githubusercontent.com/mitre-attack/attack-stix-data/master/enterprise-attack/enterprise-attack-18.1.json".to_string()
}

fn default_domain() -> String {
    "enterprise-attack".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for BundleSource {
    fn default() -> Self {
        Self {
            url: default_url(),
            domain: default_domain(),
            expected_sha256: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// HTTP client for the STIX bundle source.
pub struct StixClient {
    source: BundleSource,
    client: reqwest::Client,
}

impl StixClient {
    /// Creates a client with the timeout baked into the connection pool.
    pub fn new(source: BundleSource) -> AtlasResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()
            .map_err(|e| AtlasError::Fetch(e.to_string()))?;

        info!(url = %source.url, timeout_secs = source.timeout_secs, "STIX client initialized");

        Ok(Self { source, client })
    }

    pub fn source(&self) -> &BundleSource {
        &self.source
    }

    /// Fetches the raw bundle bytes.
    ///
    /// Non-success statuses and transport failures (including timeout
    /// expiry) map to [`AtlasError::Fetch`]; the request can never hang
    /// past the configured timeout.
    pub async fn fetch(&self) -> AtlasResult<Vec<u8>> {
        let response = self
            .client
            .get(&self.source.url)
            .send()
            .await
            .map_err(|e| AtlasError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AtlasError::Fetch(format!(
                "unexpected status {} from bundle source",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AtlasError::Fetch(e.to_string()))?;

        info!(bytes = bytes.len(), "Bundle downloaded");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl BundleProvider for StixClient {
    /// Fetch then verify; verification failure aborts before any parsing.
    async fn fetch_verified(&self) -> AtlasResult<Vec<u8>> {
        let bytes = self.fetch().await?;
        integrity::verify(&bytes, self.source.expected_sha256.as_deref())?;
        Ok(bytes)
    }
}
