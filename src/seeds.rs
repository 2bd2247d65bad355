// src/seeds.rs
// =============================================================================
// This module loads crawl seeds from a JSON file.
//
// Format:
//   [
//     {"category": "music", "username": "someone", "user_id": "3030197091"},
//     ...
//   ]
//
// Every field is optional in the file; a seed needs at least a user_id or a
// username before it can start a crawl.
// =============================================================================

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::crawler::CrawlError;
use crate::profile::Profile;

/// One entry of the seeds file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub user_id: String,
}

impl Seed {
    /// Turns the seed into the profile the crawl starts from.
    ///
    /// The id is `user_id`, or the username when no id is known.
    pub fn into_profile(self) -> Result<Profile, CrawlError> {
        let id = if !self.user_id.is_empty() {
            self.user_id
        } else if !self.username.is_empty() {
            self.username.clone()
        } else {
            return Err(CrawlError::MissingSeed);
        };

        let mut profile = Profile::new(id);
        if !self.username.is_empty() {
            profile = profile.with_username(self.username);
        }
        if !self.category.is_empty() {
            profile = profile.with_category(self.category);
        }
        Ok(profile)
    }
}

/// Parses a JSON array of seeds.
pub fn parse_seeds<R: Read>(source: R) -> Result<Vec<Seed>> {
    serde_json::from_reader(source).context("Invalid seeds JSON")
}

/// Reads and parses a seeds file.
pub fn load_seeds(path: &Path) -> Result<Vec<Seed>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open seeds file {}", path.display()))?;
    parse_seeds(BufReader::new(file))
        .with_context(|| format!("Failed to parse seeds file {}", path.display()))
}
