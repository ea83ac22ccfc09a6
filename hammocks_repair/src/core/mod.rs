//! Core data structures: Petri nets and event data
pub mod event_data;

pub mod petri_net;

pub use event_data::{ActivityLog, AlignedTrace, AlignmentMove};
pub use petri_net::{Marking, NodeID, PetriNet, PlaceID, SubNet, TransitionID};
