//! Petri net
pub(crate) mod petri_net_struct;
pub use petri_net_struct::*;
/// [`SubNet`]: a net with explicit entry and exit place
pub mod sub_net;
pub use sub_net::SubNet;
