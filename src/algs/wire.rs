//! Fixed, versioned, little-endian wire format for ring batches.
//!
//! One ring batch carries one entity collection of one round:
//!
//! ```text
//! WireBatchHdr | (WireRecordHdr | payload bytes)*
//! ```
//!
//! The payload of each record is the bincode encoding of a [`Node`] or
//! [`Element`](crate::topology::entity::Element); the ownership bit lives in
//! the record header, so the entity codec never sees it.
//!
//! [`Node`]: crate::topology::entity::Node

use crate::contact_error::ContactError;
use crate::topology::entity::EntityKind;
use bytemuck::{Pod, Zeroable};
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use static_assertions::const_assert_eq;
use std::mem::size_of;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// All multi-byte integers in these structs are **little-endian** on the wire.
/// We store them pre-LE with `.to_le()` and decode with `.from_le()`.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireBatchHdr {
    pub version_le: u16, // = WIRE_VERSION.to_le()
    pub kind_le: u16,    // EntityKind::to_wire()
    pub round_le: u32,
    pub count_le: u32, // number of following records
    pub reserved_le: u32,
}

impl WireBatchHdr {
    /// # Errors
    /// `Wire` if `count` does not fit the 32-bit count field.
    pub fn new(kind: EntityKind, round: u32, count: usize) -> Result<Self, ContactError> {
        Ok(Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_wire().to_le(),
            round_le: round.to_le(),
            count_le: wire_u32(count, "record count")?.to_le(),
            reserved_le: 0,
        })
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn round(&self) -> u32 {
        u32::from_le(self.round_le)
    }
    pub fn count(&self) -> usize {
        u32::from_le(self.count_le) as usize
    }
}

/// Per-record header: payload length plus the ownership bit.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireRecordHdr {
    pub len_le: u32,
    pub owned: u8,
    pub _pad: [u8; 3],
}

impl WireRecordHdr {
    /// # Errors
    /// `Wire` if `len` does not fit the 32-bit length field.
    pub fn new(len: usize, owned: bool) -> Result<Self, ContactError> {
        Ok(Self {
            len_le: wire_u32(len, "payload length")?.to_le(),
            owned: owned as u8,
            _pad: [0; 3],
        })
    }
    pub fn len(&self) -> usize {
        u32::from_le(self.len_le) as usize
    }
}

const_assert_eq!(size_of::<WireBatchHdr>(), 16);
const_assert_eq!(size_of::<WireRecordHdr>(), 8);

/// One serialized entity and whether the sender owned it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingRecord {
    pub payload: Bytes,
    pub owned: bool,
}

/// The message exchanged between ring neighbours in one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingBatch {
    pub kind: EntityKind,
    pub round: u32,
    pub records: Vec<RingRecord>,
}

impl RingBatch {
    pub fn new(kind: EntityKind, round: u32) -> Self {
        Self {
            kind,
            round,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, payload: impl Into<Bytes>, owned: bool) {
        self.records.push(RingRecord {
            payload: payload.into(),
            owned,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records flagged as owned by the sender.
    pub fn owned_count(&self) -> usize {
        self.records.iter().filter(|r| r.owned).count()
    }

    /// # Errors
    /// `Wire` if the record count or a payload length exceeds `u32::MAX`.
    pub fn encode(&self) -> Result<Vec<u8>, ContactError> {
        let body: usize = self
            .records
            .iter()
            .map(|r| size_of::<WireRecordHdr>() + r.payload.len())
            .sum();
        let mut out = Vec::with_capacity(size_of::<WireBatchHdr>() + body);
        let hdr = WireBatchHdr::new(self.kind, self.round, self.records.len())?;
        out.extend_from_slice(bytemuck::bytes_of(&hdr));
        for rec in &self.records {
            let rh = WireRecordHdr::new(rec.payload.len(), rec.owned)?;
            out.extend_from_slice(bytemuck::bytes_of(&rh));
            out.extend_from_slice(&rec.payload);
        }
        Ok(out)
    }

    /// Decode a batch; record payloads share `buf`'s allocation.
    pub fn decode(buf: Bytes) -> Result<Self, ContactError> {
        let hdr_len = size_of::<WireBatchHdr>();
        expect_at_least(buf.len(), hdr_len, "batch header")?;
        let hdr: WireBatchHdr = bytemuck::pod_read_unaligned(&buf[..hdr_len]);
        if hdr.version() != WIRE_VERSION {
            return Err(ContactError::Wire(format!(
                "wire version {} (expected {WIRE_VERSION})",
                hdr.version()
            )));
        }
        let kind = EntityKind::from_wire(hdr.kind())
            .ok_or_else(|| ContactError::Wire(format!("unknown batch kind {}", hdr.kind())))?;

        let rec_len = size_of::<WireRecordHdr>();
        let mut records = Vec::with_capacity(hdr.count().min(buf.len() / rec_len));
        let mut at = hdr_len;
        for i in 0..hdr.count() {
            expect_at_least(buf.len() - at, rec_len, "record header")?;
            let rh: WireRecordHdr = bytemuck::pod_read_unaligned(&buf[at..at + rec_len]);
            at += rec_len;
            let owned = match rh.owned {
                0 => false,
                1 => true,
                other => {
                    return Err(ContactError::Wire(format!(
                        "record {i}: ownership flag {other} is neither 0 nor 1"
                    )));
                }
            };
            expect_at_least(buf.len() - at, rh.len(), "record payload")?;
            records.push(RingRecord {
                payload: buf.slice(at..at + rh.len()),
                owned,
            });
            at += rh.len();
        }
        if at != buf.len() {
            return Err(ContactError::Wire(format!(
                "{} trailing bytes after {} records",
                buf.len() - at,
                hdr.count()
            )));
        }
        Ok(Self {
            kind,
            round: hdr.round(),
            records,
        })
    }
}

fn wire_u32(n: usize, what: &str) -> Result<u32, ContactError> {
    u32::try_from(n)
        .map_err(|_| ContactError::Wire(format!("{what} {n} exceeds the 32-bit wire field")))
}

fn expect_at_least(actual: usize, needed: usize, what: &str) -> Result<(), ContactError> {
    if actual >= needed {
        Ok(())
    } else {
        Err(ContactError::Wire(format!(
            "truncated {what}: need {needed} bytes, {actual} left"
        )))
    }
}

/// Serialize an entity (without ownership bit).
pub fn encode_entity<E: Serialize>(entity: &E) -> Result<Vec<u8>, ContactError> {
    Ok(bincode::serialize(entity)?)
}

/// Inverse of [`encode_entity`].
pub fn decode_entity<E: DeserializeOwned>(bytes: &[u8]) -> Result<E, ContactError> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::entity::{Element, FrictionState, Node, NodeKind, Side};
    use crate::topology::gid::Gid;

    #[test]
    fn batch_roundtrip_keeps_order_and_bits() {
        let mut b = RingBatch::new(EntityKind::Element, 3);
        b.push(vec![1u8, 2, 3], true);
        b.push(Vec::<u8>::new(), false);
        b.push(vec![9u8; 40], false);
        let back = RingBatch::decode(Bytes::from(b.encode().unwrap())).unwrap();
        assert_eq!(back, b);
        assert_eq!(back.owned_count(), 1);
    }

    #[test]
    fn empty_batch_is_header_only() {
        let b = RingBatch::new(EntityKind::Node, 0);
        let bytes = b.encode().unwrap();
        assert_eq!(bytes.len(), size_of::<WireBatchHdr>());
        assert!(RingBatch::decode(Bytes::from(bytes)).unwrap().is_empty());
    }

    #[test]
    fn truncated_batch_is_rejected() {
        let mut b = RingBatch::new(EntityKind::Node, 1);
        b.push(vec![7u8; 16], true);
        let mut bytes = b.encode().unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            RingBatch::decode(Bytes::from(bytes)),
            Err(ContactError::Wire(_))
        ));
    }

    #[test]
    fn bad_ownership_flag_is_rejected() {
        let mut b = RingBatch::new(EntityKind::Node, 1);
        b.push(vec![0u8; 2], true);
        let mut bytes = b.encode().unwrap();
        bytes[size_of::<WireBatchHdr>() + 4] = 2;
        assert!(matches!(
            RingBatch::decode(Bytes::from(bytes)),
            Err(ContactError::Wire(_))
        ));
    }

    #[test]
    fn version_guard() {
        let mut bytes = RingBatch::new(EntityKind::Node, 0).encode().unwrap();
        bytes[0] = 0xFF;
        assert!(RingBatch::decode(Bytes::from(bytes)).is_err());
        assert_eq!(WireBatchHdr::new(EntityKind::Node, 0, 0).unwrap().version(), WIRE_VERSION);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_fields_are_rejected() {
        let too_big = u32::MAX as usize + 1;
        assert!(matches!(
            WireRecordHdr::new(too_big, true),
            Err(ContactError::Wire(_))
        ));
        assert!(matches!(
            WireBatchHdr::new(EntityKind::Element, 0, too_big),
            Err(ContactError::Wire(_))
        ));
        let max = WireRecordHdr::new(u32::MAX as usize, false).unwrap();
        assert_eq!(max.len(), u32::MAX as usize);
    }

    #[test]
    fn friction_node_keeps_its_state() {
        let state = FrictionState {
            jump: [0.1, 0.0, -0.2],
            traction: [1.0, 2.0, 3.0],
            slip: true,
            active: true,
        };
        let n = Node::friction(42u64, 3, Side::Master, [1.0, 2.0, 3.0], state.clone());
        let back: Node = decode_entity(&encode_entity(&n).unwrap()).unwrap();
        assert_eq!(back.id, Gid::new(42));
        assert_eq!(back.kind, NodeKind::Friction(state));
    }

    #[test]
    fn element_connectivity_survives() {
        let e = Element::new(7u64, 1, Side::Master, [3u64, 1, 2]);
        let back: Element = decode_entity(&encode_entity(&e).unwrap()).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn garbage_payload_is_a_codec_error() {
        let err = decode_entity::<Element>(&[0xFF]).unwrap_err();
        assert!(matches!(err, ContactError::Codec(_)));
    }
}
