// src/source/mod.rs
// =============================================================================
// This module contains the profile sources: things that know how to turn one
// profile into its related profiles.
//
// Submodules:
// - dummy: Synthetic infinite tree, for demos and tests
// - http: JSON HTTP API
//
// Both implement scheduler::Expand<Profile>, which is all the scheduler
// needs from them.
// =============================================================================

mod dummy;
mod http;

pub use dummy::{DummySource, DEFAULT_FANOUT};
pub use http::HttpSource;
