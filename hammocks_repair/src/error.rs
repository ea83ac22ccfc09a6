//! Error classification shared by all algorithms of this crate
use serde::{Deserialize, Serialize};

/// Coarse classification of the errors raised by the algorithms
///
/// Every error type of this crate maps onto one of these kinds via a `kind()` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A precondition on the input was violated (unknown node, malformed net, inconsistent alignment)
    InputConsistency,
    /// A search ran out of candidates (e.g., a boundary path was exhausted)
    AlgorithmicExhaustion,
    /// The result would have been empty
    EmptyResult,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InputConsistency => write!(f, "input consistency"),
            ErrorKind::AlgorithmicExhaustion => write!(f, "algorithmic exhaustion"),
            ErrorKind::EmptyResult => write!(f, "empty result"),
        }
    }
}
