//! Round-robin contact ghosting.
//!
//! Master-side ownership is rotated around the ring of ranks for one full
//! revolution. After every rotation each rank searches its (fixed) slave
//! elements against the master replica it currently holds and remembers
//! every candidate it finds. Once ownership is back where it started, the
//! remembered IDs plus the pre-rotation column sets become the final ghost
//! partition.
//!
//! ```text
//! search → initialize
//! for round in 0..P:
//!     rotate → rebuild search → (search → extend, unless last round)
//! extend(baseline) → commit ghosts → rebuild search
//! ```
//!
//! The number of rounds is always `P`, whatever the geometry.

use crate::algs::commit::{PartitionCommitter, PartitionFinalize};
use crate::algs::communicator::Communicator;
use crate::algs::ring_exchange::{RingExchanger, RoundStats};
use crate::config::RoundRobinConfig;
use crate::contact_error::ContactError;
use crate::overlap::accumulator::{Baseline, GhostAccumulator};
use crate::search::ProximitySearch;
use crate::topology::entity::{EntityKind, Side};
use crate::topology::gid::Gid;
use crate::topology::store::InterfaceStore;
use std::collections::BTreeSet;
use std::fmt;

/// Where a [`RoundRobin`] run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundRobinPhase {
    #[default]
    Searching,
    Exchanging,
    Finalizing,
    Done,
}

impl fmt::Display for RoundRobinPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundRobinPhase::Searching => "searching",
            RoundRobinPhase::Exchanging => "exchanging",
            RoundRobinPhase::Finalizing => "finalizing",
            RoundRobinPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Summary of one [`RoundRobin::detect_ghosting`] call on one rank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GhostingReport {
    /// Rounds executed; always the communicator size.
    pub rounds: usize,
    /// Accumulated `(elements, nodes)` counts after each discovery, starting
    /// with the initial search.
    pub discovered: Vec<(usize, usize)>,
    /// Exchange statistics per round (all zero on a one-rank ring).
    pub round_stats: Vec<RoundStats>,
    /// Final column sizes, slave and master combined.
    pub final_col_elements: usize,
    pub final_col_nodes: usize,
}

/// Drives the ghosting protocol for one rank.
///
/// Every rank of the communicator must call
/// [`detect_ghosting`](Self::detect_ghosting) the same number of times; the
/// ring exchange blocks until its neighbours take part.
pub struct RoundRobin<'a, C: Communicator, F: PartitionFinalize> {
    comm: &'a C,
    config: RoundRobinConfig,
    search: Box<dyn ProximitySearch>,
    accumulator: GhostAccumulator,
    committer: PartitionCommitter,
    finalize: F,
    phase: RoundRobinPhase,
}

impl<'a, C: Communicator, F: PartitionFinalize> RoundRobin<'a, C, F> {
    /// Validate `config` and instantiate its search strategy.
    pub fn new(comm: &'a C, config: RoundRobinConfig, finalize: F) -> Result<Self, ContactError> {
        config.validate()?;
        let search = config.search.build(config.search_param);
        Ok(Self::with_search(comm, config, search, finalize))
    }

    /// Use a caller-provided search instead of `config.search`.
    pub fn with_search(
        comm: &'a C,
        config: RoundRobinConfig,
        search: Box<dyn ProximitySearch>,
        finalize: F,
    ) -> Self {
        let committer = PartitionCommitter::new(config.check_invariants);
        Self {
            comm,
            config,
            search,
            accumulator: GhostAccumulator::new(),
            committer,
            finalize,
            phase: RoundRobinPhase::Searching,
        }
    }

    pub fn config(&self) -> &RoundRobinConfig {
        &self.config
    }

    pub fn phase(&self) -> RoundRobinPhase {
        self.phase
    }

    /// The search strategy, rebuilt over the last committed partition.
    pub fn search(&self) -> &dyn ProximitySearch {
        self.search.as_ref()
    }

    pub fn finalizer(&self) -> &F {
        &self.finalize
    }

    /// Run one full revolution and commit the resulting ghost partition.
    ///
    /// On success the store's master row sets are back to their initial
    /// owners, and the column sets hold every entity this rank needs for
    /// contact evaluation.
    ///
    /// # Errors
    /// Any ring, bookkeeping or finalize error aborts the run; the store is
    /// left in whatever intermediate state the failing round produced.
    pub fn detect_ghosting(
        &mut self,
        store: &mut InterfaceStore,
    ) -> Result<GhostingReport, ContactError> {
        let rank = self.comm.rank();
        let size = self.comm.size().max(1);
        if store.rank() != rank || store.size() != size {
            return Err(ContactError::InvalidConfig(format!(
                "store is for rank {} of {}, communicator is rank {rank} of {size}",
                store.rank(),
                store.size()
            )));
        }
        let mut report = GhostingReport {
            rounds: size,
            ..GhostingReport::default()
        };

        // 1) initial discovery on the partition as given
        self.accumulator.reset();
        self.set_phase(rank, RoundRobinPhase::Searching);
        self.search.rebuild(store)?;
        let (elements, nodes) = self.discover(store)?;
        self.accumulator.initialize(elements, nodes);
        report.discovered.push(self.accumulated());
        let baseline = Baseline::capture(store);

        // 2) one full revolution
        let exchanger = RingExchanger::new(self.comm);
        for round in 0..size {
            if rank == 0 {
                log::info!("Round-Robin-Iteration #{round}");
            }
            self.set_phase(rank, RoundRobinPhase::Exchanging);
            let stats =
                exchanger.run_round(store, round as u32, &self.committer, &mut self.finalize)?;
            report.round_stats.push(stats);
            self.search.rebuild(store)?;

            // the last rotation restores the initial replica, already searched
            if round + 1 < size {
                self.set_phase(rank, RoundRobinPhase::Searching);
                let (elements, nodes) = self.discover(store)?;
                self.accumulator.extend(elements, nodes)?;
                report.discovered.push(self.accumulated());
            }
        }
        if rank == 0 {
            log::info!("Round-Robin-loop done");
        }

        // 3) baseline ∪ discoveries becomes the column partition
        self.set_phase(rank, RoundRobinPhase::Finalizing);
        self.accumulator.union_baseline(&baseline)?;
        let ghosts = self.accumulator.drain()?;
        self.committer
            .commit_ghosts(store, ghosts, &mut self.finalize)?;
        self.search.rebuild(store)?;

        let view = store.view();
        report.final_col_elements = view.col_elements.len();
        report.final_col_nodes = view.col_nodes.len();
        self.set_phase(rank, RoundRobinPhase::Done);
        Ok(report)
    }

    /// Candidate master elements of the current search, plus their nodes.
    fn discover(
        &self,
        store: &InterfaceStore,
    ) -> Result<(BTreeSet<Gid>, BTreeSet<Gid>), ContactError> {
        let result = self.search.search(store)?;
        let elements = result.master_elements();
        let mut nodes = BTreeSet::new();
        for &eid in &elements {
            let element = store.element_or_err(Side::Master, eid)?;
            nodes.extend(element.node_ids.iter().copied());
        }
        log::debug!(
            "[rank {}] {} search: {} pairs, {} master elements, {} nodes",
            store.rank(),
            self.search.name(),
            result.pair_count(),
            elements.len(),
            nodes.len()
        );
        Ok((elements, nodes))
    }

    fn accumulated(&self) -> (usize, usize) {
        self.accumulator.sets().map_or((0, 0), |s| s.len())
    }

    fn set_phase(&mut self, rank: usize, phase: RoundRobinPhase) {
        log::trace!("[rank {rank}] round-robin: {} -> {phase}", self.phase);
        self.phase = phase;
    }
}

impl<C: Communicator, F: PartitionFinalize> fmt::Debug for RoundRobin<'_, C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundRobin")
            .field("rank", &self.comm.rank())
            .field("config", &self.config)
            .field("search", &self.search.name())
            .field("phase", &self.phase)
            .finish()
    }
}

/// Master element IDs visible on this rank after a completed run.
pub fn ghosted_master_elements(store: &InterfaceStore) -> BTreeSet<Gid> {
    store
        .partition(Side::Master, EntityKind::Element)
        .ghosts()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::commit::NoopFinalize;
    use crate::algs::communicator::{NoComm, ThreadComm};
    use crate::config::SearchStrategy;
    use crate::topology::entity::{Element, Node};
    use crate::topology::ownership::PartitionView;

    /// One slave segment over x in [0, 1] and master segments at x in
    /// [0, 1] (close) and [10, 11] (far).
    fn serial_store() -> InterfaceStore {
        let mut s = InterfaceStore::new(0, 1);
        for (id, x) in [(1u64, 0.0), (2, 1.0)] {
            s.add_node(Node::plain(id, 0, Side::Slave, [x, 0.05, 0.0])).unwrap();
        }
        s.add_element(Element::new(100u64, 0, Side::Slave, [1u64, 2])).unwrap();
        for (id, x) in [(11u64, 0.0), (12, 1.0), (13, 10.0), (14, 11.0)] {
            s.add_node(Node::plain(id, 0, Side::Master, [x, 0.0, 0.0])).unwrap();
        }
        s.add_element(Element::new(200u64, 0, Side::Master, [11u64, 12])).unwrap();
        s.add_element(Element::new(201u64, 0, Side::Master, [13u64, 14])).unwrap();
        s
    }

    #[test]
    fn single_rank_keeps_partition_and_runs_once() {
        let mut store = serial_store();
        let before = store.partition(Side::Master, EntityKind::Element).clone();
        let mut calls = 0usize;
        let finalize = |_: usize, _: &PartitionView| -> Result<(), ContactError> {
            calls += 1;
            Ok(())
        };
        let mut rr = RoundRobin::new(&NoComm, RoundRobinConfig::default(), finalize).unwrap();
        let report = rr.detect_ghosting(&mut store).unwrap();
        drop(rr);

        assert_eq!(report.rounds, 1);
        assert_eq!(report.discovered, vec![(1, 2)]);
        assert_eq!(report.round_stats, vec![RoundStats::default()]);
        assert_eq!(calls, 1);
        assert_eq!(store.partition(Side::Master, EntityKind::Element), &before);
        assert_eq!(report.final_col_elements, 3);
        assert_eq!(report.final_col_nodes, 6);
    }

    #[test]
    fn phase_ends_done() {
        let mut store = serial_store();
        let mut rr = RoundRobin::new(&NoComm, RoundRobinConfig::default(), NoopFinalize).unwrap();
        assert_eq!(rr.phase(), RoundRobinPhase::Searching);
        rr.detect_ghosting(&mut store).unwrap();
        assert_eq!(rr.phase(), RoundRobinPhase::Done);
        assert_eq!(rr.search().name(), "binarytree");
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let cfg = RoundRobinConfig {
            search_param: f64::NAN,
            ..RoundRobinConfig::default()
        };
        assert!(matches!(
            RoundRobin::new(&NoComm, cfg, NoopFinalize),
            Err(ContactError::InvalidConfig(_))
        ));
    }

    #[test]
    fn store_for_another_rank_is_rejected() {
        let comms = ThreadComm::universe(2);
        let mut store = InterfaceStore::new(0, 2);
        let mut rr = RoundRobin::new(&comms[1], RoundRobinConfig::default(), NoopFinalize).unwrap();
        assert!(matches!(
            rr.detect_ghosting(&mut store),
            Err(ContactError::InvalidConfig(_))
        ));
    }

    #[test]
    fn brute_force_and_tree_agree_serially() {
        let mut a = serial_store();
        let mut b = serial_store();
        let brute = RoundRobinConfig {
            search: SearchStrategy::BruteForce,
            ..RoundRobinConfig::default()
        };
        RoundRobin::new(&NoComm, brute, NoopFinalize)
            .unwrap()
            .detect_ghosting(&mut a)
            .unwrap();
        RoundRobin::new(&NoComm, RoundRobinConfig::default(), NoopFinalize)
            .unwrap()
            .detect_ghosting(&mut b)
            .unwrap();
        assert_eq!(a.view(), b.view());
    }
}
