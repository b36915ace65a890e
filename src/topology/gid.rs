//! `Gid`: the global identifier of a contact interface entity.
//!
//! Node and element IDs share one global ID space per interface, so a single
//! newtype covers both. Unlike a mesh point handle, 0 is a valid ID.

use std::fmt;

/// Globally unique ID of a node or element on the contact interface.
///
/// # Memory layout
/// `repr(transparent)` over `u64`, so a slice of `Gid`s can be handed to
/// MPI or cast with `bytemuck` like a slice of `u64`.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
#[repr(transparent)]
pub struct Gid(u64);

impl Gid {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Gid(raw)
    }

    /// Returns the raw integer value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Gid {
    #[inline]
    fn from(raw: u64) -> Self {
        Gid(raw)
    }
}

impl fmt::Debug for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Gid").field(&self.0).finish()
    }
}

/// Prints only the raw integer.
impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "mpi-support")]
unsafe impl mpi::datatype::Equivalence for Gid {
    type Out = <u64 as mpi::datatype::Equivalence>::Out;

    fn equivalent_datatype() -> Self::Out {
        <u64 as mpi::datatype::Equivalence>::equivalent_datatype()
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    // If this fails, our repr(transparent) guarantee is broken!
    assert_eq_size!(Gid, u64);
    assert_eq_align!(Gid, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_a_valid_id() {
        assert_eq!(Gid::new(0).get(), 0);
    }

    #[test]
    fn debug_and_display() {
        let g = Gid::new(7);
        assert_eq!(format!("{:?}", g), "Gid(7)");
        assert_eq!(format!("{}", g), "7");
    }

    #[test]
    fn ordering_follows_raw_value() {
        let mut v = vec![Gid::new(12), Gid::new(3), Gid::new(7)];
        v.sort();
        assert_eq!(v, vec![Gid::new(3), Gid::new(7), Gid::new(12)]);
    }

    #[test]
    fn json_roundtrip() {
        let g = Gid::new(123);
        let s = serde_json::to_string(&g).unwrap();
        assert_eq!(s, "123");
        let back: Gid = serde_json::from_str(&s).unwrap();
        assert_eq!(back, g);
    }
}
