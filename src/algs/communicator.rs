//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! The ring exchange needs exactly one primitive: post a message to the
//! successor and block until *some* message addressed to this rank arrives.
//! The receive matches any source and any tag; the caller checks the
//! [`Envelope`] against what the ring expects.

use crate::contact_error::ContactError;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;

/// Typed message tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
    /// Derive a sibling tag; wraps on overflow.
    pub const fn offset(self, by: u16) -> Self {
        Self(self.0.wrapping_add(by))
    }
}

/// A received message together with where it actually came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub source: usize,
    pub tag: CommTag,
    pub payload: Bytes,
}

/// Blocking point-to-point interface.
pub trait Communicator {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Send `buf` to `peer` under `tag`, then block until the next message
    /// addressed to this rank arrives, whatever its source or tag.
    ///
    /// The send is posted before the receive, so a ring of ranks calling this
    /// simultaneously cannot deadlock.
    fn send_recv_any(&self, peer: usize, tag: CommTag, buf: &[u8])
    -> Result<Envelope, ContactError>;

    /// Block until every rank has reached the barrier.
    fn barrier(&self);
}

/// Single-rank communicator: rank 0 of 1, messages to self are echoed back.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn send_recv_any(
        &self,
        peer: usize,
        tag: CommTag,
        buf: &[u8],
    ) -> Result<Envelope, ContactError> {
        if peer != 0 {
            return Err(ContactError::CommError {
                neighbor: peer,
                message: "NoComm has a single rank".into(),
            });
        }
        Ok(Envelope {
            source: 0,
            tag,
            payload: Bytes::copy_from_slice(buf),
        })
    }
    fn barrier(&self) {}
}

// --- ThreadComm: one thread per rank inside a single process ---

struct Shared {
    size: usize,
    /// Per-destination FIFO of undelivered messages.
    mailbox: DashMap<usize, VecDeque<Envelope>>,
    arrivals: Mutex<u64>,
    arrived: Condvar,
    barrier: Mutex<BarrierState>,
    released: Condvar,
}

#[derive(Default)]
struct BarrierState {
    waiting: usize,
    generation: u64,
}

/// In-process communicator; create all ranks at once with [`ThreadComm::universe`]
/// and move one handle into each rank's thread.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

impl ThreadComm {
    /// Handles for ranks `0..size`, all sharing one mailbox.
    pub fn universe(size: usize) -> Vec<ThreadComm> {
        let shared = Arc::new(Shared {
            size,
            mailbox: DashMap::new(),
            arrivals: Mutex::new(0),
            arrived: Condvar::new(),
            barrier: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: shared.clone(),
            })
            .collect()
    }

    fn try_pop(&self) -> Option<Envelope> {
        self.shared
            .mailbox
            .get_mut(&self.rank)
            .and_then(|mut q| q.pop_front())
    }

    /// Post without waiting for anything.
    pub fn send(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Result<(), ContactError> {
        if peer >= self.shared.size {
            return Err(ContactError::CommError {
                neighbor: peer,
                message: format!("rank out of range for a universe of {}", self.shared.size),
            });
        }
        self.shared.mailbox.entry(peer).or_default().push_back(Envelope {
            source: self.rank,
            tag,
            payload: Bytes::copy_from_slice(buf),
        });
        let mut n = self.shared.arrivals.lock();
        *n += 1;
        self.shared.arrived.notify_all();
        Ok(())
    }

    /// Block until a message for this rank is available.
    pub fn recv_any(&self) -> Envelope {
        let mut guard = self.shared.arrivals.lock();
        loop {
            if let Some(env) = self.try_pop() {
                return env;
            }
            self.shared.arrived.wait(&mut guard);
        }
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.shared.size
    }
    fn send_recv_any(
        &self,
        peer: usize,
        tag: CommTag,
        buf: &[u8],
    ) -> Result<Envelope, ContactError> {
        self.send(peer, tag, buf)?;
        Ok(self.recv_any())
    }
    fn barrier(&self) {
        let mut state = self.shared.barrier.lock();
        let generation = state.generation;
        state.waiting += 1;
        if state.waiting == self.shared.size {
            state.waiting = 0;
            state.generation += 1;
            self.shared.released.notify_all();
        } else {
            while state.generation == generation {
                self.shared.released.wait(&mut state);
            }
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{CommTag, Communicator, Envelope};
    use crate::contact_error::ContactError;
    use bytes::Bytes;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{
        Communicator as _, CommunicatorCollectives, Destination, MatchedReceiveVec, Source,
    };

    pub struct MpiComm {
        // dropped before the universe
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        _universe: Universe,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, ContactError> {
            let universe = mpi::initialize().ok_or_else(|| ContactError::CommError {
                neighbor: 0,
                message: "MPI was already initialized".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                _universe: universe,
            })
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }
        fn send_recv_any(
            &self,
            peer: usize,
            tag: CommTag,
            buf: &[u8],
        ) -> Result<Envelope, ContactError> {
            let dest = self.world.process_at_rank(peer as i32);
            let (data, status) = mpi::request::scope(|scope| {
                let req = dest.immediate_send_with_tag(scope, buf, tag.as_u16() as i32);
                let (data, status) = self
                    .world
                    .any_process()
                    .matched_probe()
                    .matched_receive_vec::<u8>();
                req.wait();
                (data, status)
            });
            Ok(Envelope {
                source: status.source_rank() as usize,
                tag: CommTag(status.tag() as u16),
                payload: Bytes::from(data),
            })
        }
        fn barrier(&self) {
            self.world.barrier();
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
