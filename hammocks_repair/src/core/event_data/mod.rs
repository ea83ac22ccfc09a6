//! Event data: activity logs and their alignments
/// Activity projection of event logs
pub mod activity_log;
/// Alignments and their move costs
pub mod alignment;

pub use activity_log::{ActivityLog, SubLog};
pub use alignment::{AlignedTrace, AlignmentCosts, AlignmentMove};
