//! Brute-force candidate search: O(slave × master) box tests.

use super::{Aabb, ProximitySearch, SearchResult, column_boxes, inflated_slave_boxes};
use crate::contact_error::ContactError;
use crate::topology::entity::Side;
use crate::topology::gid::Gid;
use crate::topology::store::InterfaceStore;

#[derive(Debug, Clone)]
pub struct BruteForceSearch {
    search_param: f64,
}

impl BruteForceSearch {
    pub fn new(search_param: f64) -> Self {
        Self { search_param }
    }
}

impl ProximitySearch for BruteForceSearch {
    fn name(&self) -> &'static str {
        "bruteforce"
    }

    /// Nothing to rebuild; every search reads the store directly.
    fn rebuild(&mut self, _store: &InterfaceStore) -> Result<(), ContactError> {
        Ok(())
    }

    fn search(&self, store: &InterfaceStore) -> Result<SearchResult, ContactError> {
        let slaves = inflated_slave_boxes(store, self.search_param)?;
        let masters = column_boxes(store, Side::Master)?;

        let hits = |(sid, sbox): &(Gid, Aabb)| {
            (
                *sid,
                masters
                    .iter()
                    .filter(|(_, mbox)| sbox.intersects(mbox))
                    .map(|(mid, _)| *mid)
                    .collect::<Vec<_>>(),
            )
        };

        #[cfg(feature = "rayon")]
        let pairs: Vec<_> = {
            use rayon::prelude::*;
            slaves.par_iter().map(hits).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let pairs: Vec<_> = slaves.iter().map(hits).collect();

        let mut result = SearchResult::new();
        for (sid, mids) in pairs {
            result.insert(sid, mids);
        }
        Ok(result)
    }
}
