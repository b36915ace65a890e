//! ContactError: unified error type for the contact-ghosting public APIs.
//!
//! Every variant describes a defect, not a transient fault: the round-robin
//! protocol has no retry or degraded mode, so callers are expected to abort
//! the run on any `Err`.

use crate::topology::entity::{EntityKind, Side};
use crate::topology::gid::Gid;
use thiserror::Error;

/// Unified error type for contact-ghosting operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContactError {
    /// A ring receive did not come from the predecessor or carried the wrong tag.
    #[error(
        "ring protocol violation: expected message from rank {expected_source} with tag {expected_tag}, \
         got rank {from_rank} with tag {tag}"
    )]
    ProtocolViolation {
        expected_source: usize,
        expected_tag: u16,
        from_rank: usize,
        tag: u16,
    },
    /// The batch header does not match the collection/round the ring is in.
    #[error(
        "ring protocol violation: expected {expected_kind} batch for round {expected_round}, \
         got {kind} batch for round {round}"
    )]
    UnexpectedBatch {
        expected_kind: EntityKind,
        expected_round: u32,
        kind: EntityKind,
        round: u32,
    },
    /// An ID referenced by connectivity or partition bookkeeping is not resolvable locally.
    #[error("dangling reference: {side} {kind} {gid} cannot be resolved on this rank")]
    DanglingReference {
        side: Side,
        kind: EntityKind,
        gid: Gid,
    },
    /// An adopted entity's recorded owner disagrees with the adopting rank.
    #[error("ownership conflict: entity {gid} records owner {owner} but was adopted by rank {rank}")]
    OwnershipConflict { gid: Gid, owner: usize, rank: usize },
    /// A rank asked to ghost an element the interface does not contain.
    #[error("rank {rank} requested ghost element {gid}, which is not part of the interface")]
    UnknownGhost { rank: usize, gid: Gid },
    /// The same ID is registered on both sides of the interface.
    #[error("entity {0} is registered on both the slave and master side")]
    SideCollision(Gid),
    /// Unsupported search strategy or out-of-range parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Malformed ring batch (truncated, bad version, bad ownership flag).
    #[error("wire format error: {0}")]
    Wire(String),
    /// Entity payload could not be (de)serialized.
    #[error("entity codec error: {0}")]
    Codec(String),
    /// The accumulator was used before its first-round `initialize`.
    #[error("ghost accumulator used before initialize()")]
    AccumulatorNotInitialized,
    /// A communicator backend failed to deliver a message.
    #[error("communication error with rank {neighbor}: {message}")]
    CommError { neighbor: usize, message: String },
}

impl From<bincode::Error> for ContactError {
    fn from(err: bincode::Error) -> Self {
        ContactError::Codec(err.to_string())
    }
}
