#![cfg_attr(docsrs, feature(doc_cfg))]
//! # contact-ghosting
//!
//! contact-ghosting implements round-robin ghosting for distributed contact
//! interfaces. Two independently partitioned surface meshes, slave and master,
//! live on a fixed set of cooperating ranks; the library tells every rank which
//! remote master entities it must replicate so that no contact interaction
//! with its slave elements is missed.
//!
//! ## Features
//! - Per-rank interface store with disjoint row (owned) and overlapping column
//!   (visible) sets for slave/master nodes and elements
//! - Ring exchange that rotates master ownership one hop per round without ever
//!   producing two owners
//! - Pluggable proximity search (brute force, bounding-volume tree)
//! - Pluggable communication backends (serial, threads, MPI)
//! - Invariant checking in debug builds or with the `check-invariants` feature
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! contact-ghosting = "0.1"
//! # Optional features:
//! # features = ["mpi-support","rayon"]
//! ```
//!
//! Build a store per rank (see [`algs::distribute::distribute_interface`]),
//! then call [`algs::round_robin::RoundRobin::detect_ghosting`] on every rank
//! whenever the geometry has moved enough to invalidate the previous ghosting.
//!
//! ## Determinism
//! Search results are ordered by ID and every rank runs exactly `P` rounds,
//! so a run on unchanged input reproduces the same partition.

// Re-export our major subsystems:
pub mod algs;
pub mod config;
pub mod contact_error;
pub mod debug_invariants;
pub mod overlap;
pub mod search;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::commit::{NoopFinalize, PartitionFinalize};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm};
    pub use crate::algs::distribute::{InterfaceMesh, distribute_interface};
    pub use crate::algs::round_robin::{GhostingReport, RoundRobin, RoundRobinPhase};
    pub use crate::config::{RoundRobinConfig, SearchStrategy};
    pub use crate::contact_error::ContactError;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::overlap::accumulator::{GhostAccumulator, GhostSets};
    pub use crate::search::{ProximitySearch, SearchResult};
    pub use crate::topology::entity::{Element, EntityKind, FrictionState, Node, NodeKind, Side};
    pub use crate::topology::gid::Gid;
    pub use crate::topology::ownership::{Ownership, Partition, PartitionView};
    pub use crate::topology::store::InterfaceStore;
}
