//! Hammocks: single-entry single-exit regions of a Petri net
/// Covering pairs of nodes with disjoint hammocks
pub mod covering;
/// [`Hammock`] struct and boundary node types
pub mod hammock;
/// Minimal hammock covering a set of nodes
pub mod minimal_hammock;

pub use covering::{cover_pairs, cover_pairs_between};
pub use hammock::{Hammock, HammockConfig, NodeTypes};
pub use minimal_hammock::{find_minimal_hammock, HammockError};
