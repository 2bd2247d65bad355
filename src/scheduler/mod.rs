// src/scheduler/mod.rs
// =============================================================================
// This module is the traversal engine.
//
// Submodules:
// - admission: Hands out permits at a fixed cadence, up to a cap
// - frontier: Spawns one task per item, streams results, detects completion
//
// Data flows one way: seed -> scheduler -> permit -> expand -> result stream.
// Control flows back only for shutdown: scheduler -> admission controller.
// =============================================================================

mod admission;
mod frontier;

#[cfg(test)]
pub(crate) mod testing;

pub use admission::{AdmissionConfig, AdmissionController};
pub use frontier::{Expand, Results, Scheduler};
