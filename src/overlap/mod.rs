//! Overlap bookkeeping: which remote entities a rank must ghost.
//!
//! This module re-exports the [`accumulator`] submodule.

pub mod accumulator;

pub use accumulator::{Baseline, GhostAccumulator, GhostSets};
