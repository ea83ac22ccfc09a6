#![warn(
    clippy::doc_markdown,
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs
)]

#![doc = include_str!("../README.md")]

///
/// Core data structures: [`PetriNet`]s, markings and event data
///
pub mod core;

///
/// Conformance analysis: detection of bad pairs
///
pub mod conformance;

///
/// Hammocks: finding minimal hammocks and covering node pairs with them
///
pub mod hammocks;

///
/// Net repair (hammock replacement, log-only move repair, repair pipeline)
///
pub mod repair;

/// Error classification
pub mod error;

/// Util module with smaller helper structs
pub mod utils;

#[doc(inline)]
pub use crate::core::{
    ActivityLog, AlignedTrace, AlignmentMove, Marking, NodeID, PetriNet, PlaceID, SubNet,
    TransitionID,
};

#[doc(inline)]
pub use conformance::{
    detect_bad_pairs, detect_bad_pairs_in_alignments, detect_bad_pairs_in_weighted_alignments,
    BadPairs,
};

#[doc(inline)]
pub use hammocks::{cover_pairs, find_minimal_hammock, Hammock, HammockConfig, NodeTypes};

#[doc(inline)]
pub use repair::{repair, replace_hammock, AlignmentOracle, RepairConfig, SubprocessMiner};

#[doc(inline)]
pub use error::ErrorKind;
