//! Splicing a replacement sub-net into the place of a hammock
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::petri_net::{
    ArcType, Marking, NodeID, PetriNet, PetriNetError, PlaceID, SubNet,
};
use crate::error::ErrorKind;
use crate::hammocks::Hammock;

///
/// Errors that can occur when replacing a hammock
///
/// On error, neither the net nor the markings were modified
///
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplaceError {
    /// A node of the hammock is not part of the net
    #[error("hammock node {0} does not exist in the Petri net")]
    UnknownHammockNode(NodeID),
    /// Entry or exit of the replacement is not a place of the replacement net
    #[error("{0} is not a place of the replacement net")]
    InvalidReplacementBoundary(NodeID),
    /// An arc of the surrounding net cannot be attached to the replacement
    #[error("cannot connect {from} with {to}")]
    IncompatibleBoundary {
        /// Start of the arc
        from: NodeID,
        /// End of the arc
        to: NodeID,
    },
    /// Modifying the net failed
    #[error(transparent)]
    PetriNet(#[from] PetriNetError),
}

impl ReplaceError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InputConsistency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Nodes of the net where a replacement was attached
pub struct Splice {
    /// Node that took over the incoming arcs of the hammock source
    pub entry: NodeID,
    /// Node that took over the outgoing arcs of the hammock sink
    pub exit: NodeID,
}

fn arc(from: NodeID, to: NodeID) -> Result<ArcType, ReplaceError> {
    ArcType::between(from, to).ok_or(ReplaceError::IncompatibleBoundary { from, to })
}

/// Make the entry of the replacement fit a transition boundary
///
/// The entry place is dropped if it leads to a single transition, otherwise a silent
/// transition is put in front of it.
fn transition_entry(sub: &mut SubNet) -> Result<NodeID, ReplaceError> {
    match sub.net.postset_of_place(sub.source).as_slice() {
        [t] if sub.source != sub.sink => {
            let t = *t;
            sub.net.remove_place(sub.source);
            Ok(t.into())
        }
        _ => {
            let tau = sub.net.add_transition(None, None);
            sub.net
                .add_arc(ArcType::transition_to_place(tau, sub.source), None)?;
            Ok(tau.into())
        }
    }
}

fn transition_exit(sub: &mut SubNet) -> Result<NodeID, ReplaceError> {
    match sub.net.preset_of_place(sub.sink).as_slice() {
        [t] if sub.source != sub.sink => {
            let t = *t;
            sub.net.remove_place(sub.sink);
            Ok(t.into())
        }
        _ => {
            let tau = sub.net.add_transition(None, None);
            sub.net
                .add_arc(ArcType::place_to_transition(sub.sink, tau), None)?;
            Ok(tau.into())
        }
    }
}

fn transfer_tokens(marking: &mut Marking, from: PlaceID, to: PlaceID) {
    if let Some(tokens) = marking.remove(&from) {
        marking.insert(to, tokens);
    }
}

///
/// Replace `hammock` in `net` by the `replacement` sub-net
///
/// The replacement is copied into the net, all arcs entering the hammock source from the
/// outside now enter the replacement entry and all arcs leaving the hammock sink to the
/// outside now leave the replacement exit. Afterwards, all hammock nodes are removed.
///
/// If a boundary of the hammock is a transition, the corresponding boundary place of the
/// replacement is either dropped (if it is connected to just one transition) or extended by
/// a silent transition, so the net stays bipartite.
/// Tokens of the markings on a boundary place move to the corresponding replacement place.
///
/// A hammock with the same source and sink is replaced like any other hammock.
///
pub fn replace_hammock(
    net: &mut PetriNet,
    initial_marking: &mut Marking,
    final_marking: &mut Marking,
    hammock: &Hammock,
    mut replacement: SubNet,
) -> Result<Splice, ReplaceError> {
    if let Some(n) = hammock.nodes.iter().find(|n| !net.contains_node(**n)) {
        return Err(ReplaceError::UnknownHammockNode(*n));
    }
    for boundary in [replacement.source, replacement.sink] {
        if replacement.net.place(boundary).is_none() {
            return Err(ReplaceError::InvalidReplacementBoundary(boundary.into()));
        }
    }

    let entry = if hammock.source.is_place() {
        replacement.source.into()
    } else {
        transition_entry(&mut replacement)?
    };
    let exit = if hammock.sink.is_place() {
        replacement.sink.into()
    } else {
        transition_exit(&mut replacement)?
    };

    // Everything is staged on copies, which replace the originals once all steps succeeded
    let mut staged = net.clone();
    let mut staged_im = initial_marking.clone();
    let mut staged_fm = final_marking.clone();

    let mapping: HashMap<NodeID, NodeID> = staged.add_net(&replacement.net);
    let entry = *mapping
        .get(&entry)
        .ok_or(ReplaceError::InvalidReplacementBoundary(entry))?;
    let exit = *mapping
        .get(&exit)
        .ok_or(ReplaceError::InvalidReplacementBoundary(exit))?;

    for pred in net.preset_of(hammock.source) {
        if hammock.contains(pred) {
            continue;
        }
        let weight = net.arc_weight(pred, hammock.source);
        staged.add_arc(arc(pred, entry)?, weight)?;
    }
    for succ in net.postset_of(hammock.sink) {
        if hammock.contains(succ) {
            continue;
        }
        let weight = net.arc_weight(hammock.sink, succ);
        staged.add_arc(arc(exit, succ)?, weight)?;
    }

    for (old, new) in [(hammock.source, entry), (hammock.sink, exit)] {
        if let (Some(old), Some(new)) = (old.as_place(), new.as_place()) {
            transfer_tokens(&mut staged_im, old, new);
            transfer_tokens(&mut staged_fm, old, new);
        }
    }
    for marking in [&mut staged_im, &mut staged_fm] {
        marking.retain(|p, _| !hammock.contains((*p).into()));
    }
    for n in &hammock.nodes {
        staged.remove_node(*n);
    }

    debug!(
        source = %hammock.source,
        sink = %hammock.sink,
        %entry,
        %exit,
        "replaced hammock"
    );
    *net = staged;
    *initial_marking = staged_im;
    *final_marking = staged_fm;
    Ok(Splice { entry, exit })
}
