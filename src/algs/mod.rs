//! Re-export public algorithms.

pub mod commit;
pub mod communicator;
pub mod distribute;
pub mod ring_exchange;
pub mod round_robin;
pub mod wire;

pub use commit::{NoopFinalize, PartitionCommitter, PartitionFinalize};
pub use distribute::{InterfaceMesh, distribute_interface};
pub use ring_exchange::{RING_TAG, RingChannel, RingExchanger};
pub use round_robin::{GhostingReport, RoundRobin, RoundRobinPhase};
