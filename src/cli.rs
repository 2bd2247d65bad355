// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Layout:
//   profile-crawler [--verbose] <dummy|http> [SEED] [LIMITS] [--output FILE]
//
// The seed and the crawl limits are shared by every subcommand, so they live
// in their own structs and get flattened into each one.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::AdmissionConfig;
use crate::source::DEFAULT_FANOUT;

#[derive(Parser, Debug)]
#[command(
    name = "profile-crawler",
    version,
    about = "Crawl related profiles from a seed, at a bounded rate and up to a cap",
    long_about = "profile-crawler starts from one seed profile and keeps discovering related \
                  profiles until a maximum number has been found or every branch runs dry. \
                  Requests are admitted at a fixed cadence."
)]
pub struct Cli {
    /// Log debug events (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a synthetic tree (no network)
    ///
    /// Example: profile-crawler dummy --seed-id 1 --max-profiles 20 --defer-ms 100
    Dummy {
        /// Related profiles per profile
        #[arg(long, default_value_t = DEFAULT_FANOUT)]
        fanout: usize,

        /// Simulated time spent expanding one profile
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,

        #[command(flatten)]
        seed: SeedArgs,

        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Crawl a JSON API serving GET {base_url}/profiles/{id}/related
    ///
    /// Example: profile-crawler http https://api.example.com --seeds-file seeds.json
    Http {
        /// Root URL of the profile API
        base_url: String,

        /// Per-request timeout
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,

        #[command(flatten)]
        seed: SeedArgs,

        #[command(flatten)]
        crawl: CrawlArgs,
    },
}

/// Where the crawl starts: either given inline or picked from a seeds file.
#[derive(Args, Debug, Clone, Default)]
pub struct SeedArgs {
    /// Id of the seed profile
    #[arg(long, conflicts_with = "seeds_file")]
    pub seed_id: Option<String>,

    /// Username of the seed profile (used as the id when --seed-id is absent)
    #[arg(long, conflicts_with = "seeds_file")]
    pub seed_username: Option<String>,

    /// Category attached to every profile found from this seed
    #[arg(long, conflicts_with = "seeds_file")]
    pub seed_category: Option<String>,

    /// JSON file with a list of seeds
    #[arg(long)]
    pub seeds_file: Option<PathBuf>,

    /// Which entry of the seeds file to crawl from (ignored without --seeds-file)
    #[arg(long, default_value_t = 0)]
    pub seed_index: usize,
}

/// Rate and size limits of one crawl.
#[derive(Args, Debug, Clone)]
pub struct CrawlArgs {
    /// Milliseconds between two admission rounds
    #[arg(long, env = "CRAWLER_DEFER_MS", default_value_t = 1000)]
    pub defer_ms: u64,

    /// Stop admitting once this many profiles have been found
    #[arg(long, env = "CRAWLER_MAX_PROFILES", default_value_t = 10)]
    pub max_profiles: usize,

    /// Profiles admitted per round
    #[arg(long, env = "CRAWLER_MAX_WORKERS", default_value_t = 1)]
    pub max_workers: usize,

    /// Write JSON lines here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CrawlArgs {
    pub fn admission(&self) -> AdmissionConfig {
        AdmissionConfig {
            defer_time: Duration::from_millis(self.defer_ms),
            max_takes: self.max_profiles,
            max_workers: self.max_workers,
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does #[command(flatten)] do?
//    - It pulls the fields of another Args struct into this command
//    - SeedArgs and CrawlArgs are written once and shared by both subcommands
//
// 2. What does env = "CRAWLER_MAX_PROFILES" do?
//    - If the flag is not given, clap reads the environment variable
//    - If neither is set, the default_value_t is used
//
// 3. What does conflicts_with do?
//    - --seed-id and --seeds-file cannot be used together
//    - clap reports the clash before our code runs
// -----------------------------------------------------------------------------
