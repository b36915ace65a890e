//! Configuration of a round-robin ghosting run.

use crate::contact_error::ContactError;
use crate::search::{BinaryTreeSearch, BruteForceSearch, ProximitySearch};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which proximity search to run between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    BruteForce,
    BinaryTree,
}

impl SearchStrategy {
    /// Instantiate the strategy; done once per orchestrator.
    pub fn build(self, search_param: f64) -> Box<dyn ProximitySearch> {
        match self {
            SearchStrategy::BruteForce => Box::new(BruteForceSearch::new(search_param)),
            SearchStrategy::BinaryTree => Box::new(BinaryTreeSearch::new(search_param)),
        }
    }
}

impl FromStr for SearchStrategy {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bruteforce" | "brute_force" | "bfele" => Ok(SearchStrategy::BruteForce),
            "binarytree" | "binary_tree" => Ok(SearchStrategy::BinaryTree),
            other => Err(ContactError::InvalidConfig(format!(
                "unknown search strategy `{other}` (expected `bruteforce` or `binarytree`)"
            ))),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::BruteForce => f.write_str("bruteforce"),
            SearchStrategy::BinaryTree => f.write_str("binarytree"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundRobinConfig {
    pub search: SearchStrategy,
    /// Slave bounding boxes are inflated by this multiple of their diameter.
    pub search_param: f64,
    /// Validate store invariants after every commit.
    pub check_invariants: bool,
}

impl Default for RoundRobinConfig {
    fn default() -> Self {
        Self {
            search: SearchStrategy::BinaryTree,
            search_param: 0.3,
            check_invariants: cfg!(debug_assertions),
        }
    }
}

impl RoundRobinConfig {
    pub fn validate(&self) -> Result<(), ContactError> {
        if !self.search_param.is_finite() || self.search_param < 0.0 {
            return Err(ContactError::InvalidConfig(format!(
                "search_param must be finite and non-negative, got {}",
                self.search_param
            )));
        }
        Ok(())
    }
}
