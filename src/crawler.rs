// src/crawler.rs
// =============================================================================
// This module runs one crawl session from a seed to a writer.
//
// What happens here:
// 1. Validate the configuration (a seed and a positive cap are required)
// 2. Build the admission controller and the scheduler
// 3. Run the scheduler in the background
// 4. Drain the result stream into the writer until it ends
// 5. Flush the writer and report what happened
//
// Draining is not optional: the scheduler hands results over one at a time,
// so nothing moves unless this loop keeps reading.
// =============================================================================

use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::profile::Profile;
use crate::scheduler::{AdmissionConfig, AdmissionController, Expand, Results, Scheduler};
use crate::sink::ProfileWriter;

/// Configuration problems, reported before any crawling starts.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("missing required seed config")]
    MissingSeed,
    #[error("max profiles must be greater than zero")]
    InvalidCap,
}

#[derive(Debug, Clone, Default)]
pub struct CrawlConfig {
    pub seed: Option<Profile>,
    pub admission: AdmissionConfig,
}

/// What a finished crawl did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Profiles handed to the writer successfully
    pub written: usize,
    /// Profiles the writer rejected
    pub write_errors: usize,
    pub elapsed: Duration,
}

pub struct Crawler<E, W> {
    seed: Profile,
    admission: AdmissionConfig,
    source: E,
    writer: W,
}

impl<E, W> Crawler<E, W>
where
    E: Expand<Profile>,
    W: ProfileWriter,
{
    pub fn new(config: CrawlConfig, source: E, writer: W) -> Result<Self, CrawlError> {
        let seed = config.seed.ok_or(CrawlError::MissingSeed)?;

        if config.admission.max_takes == 0 {
            return Err(CrawlError::InvalidCap);
        }

        Ok(Self {
            seed,
            admission: config.admission,
            source,
            writer,
        })
    }

    /// Crawls until the cap is reached, every branch is exhausted, or
    /// `shutdown` fires. Shutting down stops new admissions; profiles already
    /// found are still written.
    pub async fn run(self, shutdown: CancellationToken) -> Result<CrawlSummary> {
        let Crawler {
            seed,
            admission,
            source,
            mut writer,
        } = self;

        let start = Instant::now();
        info!(
            seed = %seed,
            max_profiles = admission.max_takes,
            max_workers = admission.max_workers,
            defer_ms = millis(admission.defer_time),
            "crawling"
        );

        let admission = Arc::new(AdmissionController::new(admission));
        let mut scheduler = Scheduler::new(Arc::clone(&admission));
        let mut results: Results<Profile> = scheduler.results();
        let traversal = tokio::spawn(scheduler.run(source, seed));

        let mut summary = CrawlSummary::default();
        let mut stopping = false;

        loop {
            tokio::select! {
                profile = results.next() => match profile {
                    Some(profile) => write_profile(&mut writer, &profile, &mut summary),
                    None => break,
                },
                _ = shutdown.cancelled(), if !stopping => {
                    warn!("shutdown requested, no new profiles will be admitted");
                    admission.stop();
                    stopping = true;
                }
            }
        }

        traversal.await.context("Scheduler task failed")?;
        writer.flush()?;

        summary.elapsed = start.elapsed();
        info!(
            written = summary.written,
            write_errors = summary.write_errors,
            elapsed_ms = millis(summary.elapsed),
            "crawl finished"
        );

        Ok(summary)
    }
}

// Saturates instead of wrapping for durations past u64::MAX milliseconds
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn write_profile<W: ProfileWriter>(writer: &mut W, profile: &Profile, summary: &mut CrawlSummary) {
    match writer.write(profile) {
        Ok(()) => {
            debug!(profile = %profile, "writing");
            summary.written += 1;
        }
        Err(e) => {
            warn!(profile = %profile, error = %e, "writing profile failed");
            summary.write_errors += 1;
        }
    }
}
