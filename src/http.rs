//! Open-Elevation HTTP client.
//!
//! Only compiled with the `http` feature. Speaks the public
//! Open-Elevation lookup API and plugs into track enrichment through
//! the [`ElevationSource`] trait.

use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::elevation::ElevationSource;

const DEFAULT_ENDPOINT: &str = "https://api.open-elevation.com/api/v1/lookup";
const DEFAULT_CHUNK_SIZE: usize = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for elevation lookups.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Lookup endpoint, Open-Elevation compatible
    pub endpoint: String,
    /// Maximum number of coordinates per request
    pub chunk_size: usize,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    elevation: f64,
}

/// HTTP client for the Open-Elevation lookup API.
pub struct OpenElevationClient {
    client: Client,
    config: EnrichConfig,
}

impl OpenElevationClient {
    /// Create a client with the given configuration.
    pub fn new(config: EnrichConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client, config })
    }

    /// Fetch one elevation per coordinate pair, chunking large tracks.
    pub async fn fetch_elevations(&self, coords: &[(f64, f64)]) -> Result<Vec<f64>, String> {
        let mut elevations = Vec::with_capacity(coords.len());
        for chunk in coordinate_chunks(coords, self.config.chunk_size) {
            elevations.extend(self.fetch_chunk(chunk).await?);
        }
        Ok(elevations)
    }

    async fn fetch_chunk(&self, coords: &[(f64, f64)]) -> Result<Vec<f64>, String> {
        let locations = format_locations(coords);
        debug!(
            "requesting {} elevations from {}",
            coords.len(),
            self.config.endpoint
        );

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("locations", locations.as_str())])
            .send()
            .await
            .map_err(|e| format!("elevation request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("elevation service answered HTTP {}", status));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| format!("unreadable elevation response: {}", e))?;

        if body.results.len() != coords.len() {
            return Err(format!(
                "asked for {} elevations, got {}",
                coords.len(),
                body.results.len()
            ));
        }
        Ok(body.results.into_iter().map(|r| r.elevation).collect())
    }
}

// The repositories are synchronous, so the blocking lookup runs the
// async client on a dedicated runtime.
impl ElevationSource for OpenElevationClient {
    fn lookup(&self, coords: &[(f64, f64)]) -> Result<Vec<f64>, String> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| format!("Failed to create async runtime: {}", e))?;
        runtime.block_on(self.fetch_elevations(coords))
    }
}

// One request per chunk. A chunk size of zero is clamped so a bad config
// cannot loop forever without sending anything.
fn coordinate_chunks(coords: &[(f64, f64)], chunk_size: usize) -> std::slice::Chunks<'_, (f64, f64)> {
    coords.chunks(chunk_size.max(1))
}

fn format_locations(coords: &[(f64, f64)]) -> String {
    coords
        .iter()
        .map(|(lat, lon)| format!("{},{}", lat, lon))
        .collect::<Vec<_>>()
        .join("|")
}
