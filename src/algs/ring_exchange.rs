//! One round of master-side ownership rotation around the rank ring.
//!
//! Every rank sends its whole master-side replica to its successor and
//! receives its predecessor's replica in exchange. Entities the sender owned
//! are flagged, and ownership of exactly those moves one hop along the ring;
//! everything else arrives as a ghost. A rank gives up ownership (drops the
//! IDs from its row set) *before* the batch leaves, and the receiver takes it
//! up only on receipt, so no entity ever has two owners.
//!
//! Elements and nodes rotate through two independent exchanges with the same
//! logic. Node kind only affects the payload encoding.

use crate::algs::commit::{PartitionCommitter, PartitionFinalize};
use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::wire::{RingBatch, decode_entity, encode_entity};
use crate::contact_error::ContactError;
use crate::topology::entity::{Element, EntityKind, Node, Side};
use crate::topology::store::{InterfaceStore, StoredEntity};

/// The single tag used by every ring message.
pub const RING_TAG: CommTag = CommTag(1234);

/// Typed view of the two ring edges of one rank.
#[derive(Debug)]
pub struct RingChannel<'a, C: Communicator> {
    comm: &'a C,
    rank: usize,
    size: usize,
}

impl<'a, C: Communicator> RingChannel<'a, C> {
    pub fn new(comm: &'a C) -> Self {
        Self {
            comm,
            rank: comm.rank(),
            size: comm.size().max(1),
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// `(rank + 1) mod P`
    pub fn successor(&self) -> usize {
        (self.rank + 1) % self.size
    }

    /// `(rank - 1 + P) mod P`
    pub fn predecessor(&self) -> usize {
        (self.rank + self.size - 1) % self.size
    }

    /// A one-rank ring: successor and predecessor are this rank.
    pub fn is_trivial(&self) -> bool {
        self.size == 1
    }

    /// Send `batch` to the successor and return the predecessor's batch.
    ///
    /// # Errors
    /// A message from any rank but the predecessor, with any tag but
    /// [`RING_TAG`], or for another collection or round is a protocol
    /// violation.
    pub fn shift(&self, batch: &RingBatch) -> Result<RingBatch, ContactError> {
        let env = self
            .comm
            .send_recv_any(self.successor(), RING_TAG, &batch.encode()?)?;
        if env.source != self.predecessor() || env.tag != RING_TAG {
            return Err(ContactError::ProtocolViolation {
                expected_source: self.predecessor(),
                expected_tag: RING_TAG.as_u16(),
                from_rank: env.source,
                tag: env.tag.as_u16(),
            });
        }
        let incoming = RingBatch::decode(env.payload)?;
        if incoming.kind != batch.kind || incoming.round != batch.round {
            return Err(ContactError::UnexpectedBatch {
                expected_kind: batch.kind,
                expected_round: batch.round,
                kind: incoming.kind,
                round: incoming.round,
            });
        }
        Ok(incoming)
    }

    pub fn barrier(&self) {
        self.comm.barrier();
    }
}

/// Counts for one collection in one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub sent: usize,
    pub released: usize,
    pub received: usize,
    pub adopted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub elements: BatchStats,
    pub nodes: BatchStats,
}

#[derive(Debug)]
pub struct RingExchanger<'a, C: Communicator> {
    channel: RingChannel<'a, C>,
}

impl<'a, C: Communicator> RingExchanger<'a, C> {
    pub fn new(comm: &'a C) -> Self {
        Self {
            channel: RingChannel::new(comm),
        }
    }

    pub fn channel(&self) -> &RingChannel<'a, C> {
        &self.channel
    }

    /// Full round: rotate elements and nodes, then commit the merged
    /// partition and run the finalize hook. A no-op on a one-rank ring.
    pub fn run_round(
        &self,
        store: &mut InterfaceStore,
        round: u32,
        committer: &PartitionCommitter,
        finalize: &mut dyn PartitionFinalize,
    ) -> Result<RoundStats, ContactError> {
        if self.channel.is_trivial() {
            return Ok(RoundStats::default());
        }
        let stats = self.exchange_round(store, round)?;
        committer.commit_round(store, finalize)?;
        Ok(stats)
    }

    /// Rotate both master collections by one hop, elements first.
    ///
    /// Leaves the store with fresh master partitions but without a
    /// committed view; see [`run_round`](Self::run_round).
    pub fn exchange_round(
        &self,
        store: &mut InterfaceStore,
        round: u32,
    ) -> Result<RoundStats, ContactError> {
        if self.channel.is_trivial() {
            return Ok(RoundStats::default());
        }
        let elements = self.rotate::<Element>(store, round)?;
        self.channel.barrier();
        let nodes = self.rotate::<Node>(store, round)?;
        self.channel.barrier();
        log::debug!(
            "[rank {}] round {round}: elements {:?}, nodes {:?}",
            self.channel.rank(),
            elements,
            nodes
        );
        Ok(RoundStats { elements, nodes })
    }

    fn rotate<E: StoredEntity>(
        &self,
        store: &mut InterfaceStore,
        round: u32,
    ) -> Result<BatchStats, ContactError> {
        let kind = E::KIND;
        let me = self.channel.rank();

        // 1) serialize the full master replica, flagging what we own
        let mut batch = RingBatch::new(kind, round);
        {
            let part = store.partition(Side::Master, kind);
            for &gid in part.col() {
                let entity: &E = store.entity(gid).ok_or(ContactError::DanglingReference {
                    side: Side::Master,
                    kind,
                    gid,
                })?;
                batch.push(encode_entity(entity)?, part.is_owned(gid));
            }
        }

        // 2) give everything away before it leaves
        let released = store.take_master(kind);

        // 3) successor out, predecessor in
        let incoming = self.channel.shift(&batch)?;

        // 4) adopt flagged entities, ghost the rest
        store.advance_master_owners(kind);
        let mut adopted = 0;
        for rec in &incoming.records {
            let mut entity: E = decode_entity(&rec.payload)?;
            if entity.side() != Side::Master {
                return Err(ContactError::Wire(format!(
                    "{kind} {} in ring batch is not on the master side",
                    entity.gid()
                )));
            }
            let owner = (entity.owner() + 1) % self.channel.size();
            if rec.owned != (owner == me) {
                return Err(ContactError::OwnershipConflict {
                    gid: entity.gid(),
                    owner,
                    rank: me,
                });
            }
            entity.set_owner(owner);
            adopted += usize::from(rec.owned);
            store.apply_received(entity, rec.owned)?;
        }

        Ok(BatchStats {
            sent: batch.len(),
            released: released.row().len(),
            received: incoming.len(),
            adopted,
        })
    }
}

impl RoundStats {
    pub fn adopted(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Element => self.elements.adopted,
            EntityKind::Node => self.nodes.adopted,
        }
    }
}
