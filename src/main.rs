// src/main.rs
// =============================================================================
// This is the entry point of the crawler.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging
// 3. Build the profile source for the chosen subcommand and resolve the seed
// 4. Crawl into the writer (a JSON lines file, or stdout)
// 5. Exit with proper code (0 = all written, 1 = some writes failed, 2 = error)
//
// Ctrl-C does not abort the process: it stops admitting new profiles and lets
// the crawl wind down, so everything already found still gets written.
// =============================================================================

mod cli;
mod crawler;
mod logging;
mod profile;
mod scheduler;
mod seeds;
mod sink;
mod source;

use anyhow::{anyhow, Result};
use clap::Parser;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::error;

use cli::{Cli, CrawlArgs, Commands, SeedArgs};
use crawler::{CrawlConfig, CrawlSummary, Crawler};
use profile::Profile;
use scheduler::Expand;
use seeds::Seed;
use sink::{JsonLinesWriter, ProfileWriter};
use source::{DummySource, HttpSource};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "crawl failed");
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = every profile was written
//   Ok(1) = the writer rejected some profiles
//   Err = configuration or I/O error
async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Dummy {
            fanout,
            latency_ms,
            seed,
            crawl,
        } => {
            let source = DummySource::new(fanout, Duration::from_millis(latency_ms));
            crawl_with(source, seed, crawl).await
        }
        Commands::Http {
            base_url,
            timeout_secs,
            seed,
            crawl,
        } => {
            let source = HttpSource::new(&base_url, Duration::from_secs(timeout_secs))?;
            crawl_with(source, seed, crawl).await
        }
    }
}

async fn crawl_with<E: Expand<Profile>>(source: E, seed: SeedArgs, args: CrawlArgs) -> Result<i32> {
    let config = CrawlConfig {
        seed: resolve_seed(seed)?,
        admission: args.admission(),
    };

    let summary = match &args.output {
        Some(path) => crawl_into(source, config, JsonLinesWriter::create(path)?).await?,
        None => crawl_into(source, config, JsonLinesWriter::stdout()).await?,
    };

    print_summary(&summary);

    if summary.write_errors > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

async fn crawl_into<E, W>(source: E, config: CrawlConfig, writer: W) -> Result<CrawlSummary>
where
    E: Expand<Profile>,
    W: ProfileWriter,
{
    let crawler = Crawler::new(config, source, writer)?;

    let shutdown = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        }
    });

    let result = crawler.run(shutdown).await;
    ctrl_c.abort();
    result
}

// Picks the seed profile from the seeds file or from the inline flags.
// No seed at all is not an error here; Crawler::new reports it.
fn resolve_seed(args: SeedArgs) -> Result<Option<Profile>> {
    if let Some(path) = &args.seeds_file {
        let seed = seeds::load_seeds(path)?
            .into_iter()
            .nth(args.seed_index)
            .ok_or_else(|| {
                anyhow!("Seeds file {} has no entry {}", path.display(), args.seed_index)
            })?;
        return Ok(Some(seed.into_profile()?));
    }

    let seed = Seed {
        category: args.seed_category.unwrap_or_default(),
        username: args.seed_username.unwrap_or_default(),
        user_id: args.seed_id.unwrap_or_default(),
    };
    Ok(seed.into_profile().ok())
}

// Goes to stderr: stdout may be carrying the crawled profiles
fn print_summary(summary: &CrawlSummary) {
    eprintln!();
    eprintln!("📊 Summary:");
    eprintln!("   ✅ Written: {}", summary.written);
    eprintln!("   ❌ Failed: {}", summary.write_errors);
    eprintln!("   ⏱️  Elapsed: {:.2?}", summary.elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_inline_seed() {
        let args = SeedArgs {
            seed_id: Some("3030197091".to_string()),
            seed_username: Some("someone".to_string()),
            ..SeedArgs::default()
        };

        let seed = resolve_seed(args).unwrap().unwrap();
        assert_eq!(seed.id, "3030197091");
        assert_eq!(seed.username.as_deref(), Some("someone"));
    }

    #[test]
    fn test_resolve_missing_seed() {
        assert_eq!(resolve_seed(SeedArgs::default()).unwrap(), None);
    }

    #[test]
    fn test_resolve_seed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"user_id": "1"}}, {{"username": "bob", "category": "music"}}]"#
        )
        .unwrap();

        let args = SeedArgs {
            seeds_file: Some(file.path().to_path_buf()),
            seed_index: 1,
            ..SeedArgs::default()
        };
        let seed = resolve_seed(args).unwrap().unwrap();
        assert_eq!(seed.id, "bob");
        assert_eq!(seed.category.as_deref(), Some("music"));

        let args = SeedArgs {
            seeds_file: Some(file.path().to_path_buf()),
            seed_index: 5,
            ..SeedArgs::default()
        };
        assert!(resolve_seed(args).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_crawl_into_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.jsonl");
        let config = CrawlConfig {
            seed: Some(Profile::new("1")),
            admission: scheduler::AdmissionConfig {
                max_takes: 3,
                ..scheduler::AdmissionConfig::default()
            },
        };

        let summary = crawl_into(
            DummySource::new(3, Duration::ZERO),
            config,
            JsonLinesWriter::create(&path).unwrap(),
        )
        .await
        .unwrap();

        let lines = std::fs::read_to_string(&path).unwrap();
        assert_eq!(lines.lines().count(), summary.written);
        assert!(summary.written >= 3);
    }
}
