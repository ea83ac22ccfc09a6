//! Net repair: splicing in sub-nets and the complete repair pipeline
/// Inserting transitions for log-only moves
pub mod naive_log_only;
/// Hammock replacement
pub mod replacement;
/// Repair of a net based on alignments with a log
pub mod pipeline;

#[doc(inline)]
pub use naive_log_only::{
    repair_log_only_moves, AlignmentsModificationMode, LogOnlyRepair, PrerepairConfig,
    PrerepairError,
};
#[doc(inline)]
pub use pipeline::{
    repair, AlignmentOracle, RepairConfig, RepairError, RepairReport, RepairedNet,
    ReplacedHammock, ReplacementOrigin, SubprocessMiner,
};
#[doc(inline)]
pub use replacement::{replace_hammock, ReplaceError, Splice};
