// src/source/http.rs
// =============================================================================
// This module expands profiles through a JSON HTTP API.
//
// Endpoint:
//   GET {base_url}/profiles/{id}/related
//   -> 200 [{"id": "...", "username": "...", ...}, ...]
//
// Anything other than a 2xx response, a network failure, or a body that is
// not a JSON array of profiles is an error, which ends that branch of the
// crawl.
//
// Rust concepts:
// - reqwest::Client: Cheap to clone, pools connections between requests
// - url::Url: Safe path building (ids are encoded as a single segment)
// =============================================================================

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::profile::Profile;
use crate::scheduler::Expand;

/// Fetches related profiles from an HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    // Creates a source for the API at `base_url`
    //
    // Parameters:
    //   base_url: root of the API (e.g., "https://api.example.com/v1")
    //   timeout: per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| anyhow!("Invalid URL '{}': {}", base_url, e))?;

        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(anyhow!("Unsupported URL scheme: {}", base_url.scheme()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    // Builds {base_url}/profiles/{id}/related, keeping any base path
    fn related_url(&self, profile: &Profile) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["profiles", profile.id.as_str(), "related"]);
        Ok(url)
    }
}

#[async_trait]
impl Expand<Profile> for HttpSource {
    async fn expand(&self, profile: &Profile) -> Result<Vec<Profile>> {
        let url = self.related_url(profile)?;
        debug!(%url, "fetching related profiles");

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch {}: HTTP {}", url, response.status()));
        }

        let mut related: Vec<Profile> = response
            .json()
            .await
            .with_context(|| format!("Invalid profiles JSON from {}", url))?;

        for child in &mut related {
            child.inherit_category(profile);
        }

        Ok(related)
    }
}
