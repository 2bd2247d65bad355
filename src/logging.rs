// src/logging.rs
// =============================================================================
// Sets up tracing output.
//
// - Logs go to stderr, so stdout can carry the crawled profiles
// - RUST_LOG wins if set; otherwise info (debug with --verbose) for this crate
// - JSON lines when LOG_FORMAT=json or ENV=production, plain text otherwise
// =============================================================================

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("profile_crawler={}", level))
    });

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json")
        || std::env::var("ENV").as_deref() == Ok("production");

    // try_init: a second call (e.g. from tests) keeps the first subscriber
    if use_json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }
}
