// src/sink/mod.rs
// =============================================================================
// This module is where crawled profiles end up.
//
// The crawler calls `write` once per profile it reads off the result stream.
// A failed write is the caller's problem: the crawler logs and counts it but
// keeps crawling.
// =============================================================================

mod jsonl;

use anyhow::Result;

use crate::profile::Profile;

pub use jsonl::JsonLinesWriter;

/// Destination for crawled profiles.
pub trait ProfileWriter: Send {
    fn write(&mut self, profile: &Profile) -> Result<()>;

    /// Pushes out anything buffered. Called once, after the crawl.
    fn flush(&mut self) -> Result<()>;
}
