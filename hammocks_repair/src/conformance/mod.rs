//! Conformance-based localization of model deviations
/// Colored-token replay of alignments
pub mod bad_pairs;
#[doc(inline)]
pub use bad_pairs::{
    bad_pairs_by_name, detect_bad_pairs, detect_bad_pairs_in_alignments,
    detect_bad_pairs_in_weighted_alignments, BadPairs, BadPairsError,
};
