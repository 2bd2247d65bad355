// src/source/dummy.rs
// =============================================================================
// A synthetic source, for trying the crawler without a real API.
//
// Profile "1" has children "1/1" .. "1/{fanout}", each of those has
// "1/1/1" .. and so on forever; the admission cap is what stops the crawl.
// Profiles whose id is "-1" or starts with "-1/" fail to expand.
// =============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::profile::Profile;
use crate::scheduler::Expand;

pub const DEFAULT_FANOUT: usize = 5;

#[derive(Debug, Clone)]
pub struct DummySource {
    fanout: usize,
    latency: Duration,
}

impl Default for DummySource {
    fn default() -> Self {
        Self::new(DEFAULT_FANOUT, Duration::ZERO)
    }
}

impl DummySource {
    pub fn new(fanout: usize, latency: Duration) -> Self {
        Self { fanout, latency }
    }
}

#[async_trait]
impl Expand<Profile> for DummySource {
    async fn expand(&self, profile: &Profile) -> Result<Vec<Profile>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if profile.id == "-1" || profile.id.starts_with("-1/") {
            return Err(anyhow!("fake error"));
        }

        let related = (1..=self.fanout)
            .map(|idx| {
                let mut child = Profile::new(format!("{}/{}", profile.id, idx));
                child.inherit_category(profile);
                child
            })
            .collect();

        Ok(related)
    }
}
