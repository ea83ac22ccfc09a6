//! Minimal hammock covering a given set of nodes
//!
//! The search runs in `O(V + E)`: it grows a set of interior nodes (three colors: unseen,
//! _gray_ = pending, _black_ = confirmed) while moving the hammock's source backwards along a
//! shortest path to the net's source place and the hammock's sink forwards along a shortest
//! path to the net's sink place.
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use thiserror::Error;
use tracing::trace;

use super::hammock::{Hammock, HammockConfig, NodeTypes};
use crate::core::petri_net::{NodeID, PetriNet, PetriNetError, PlaceID};
use crate::error::ErrorKind;

///
/// Errors that can occur while searching for a hammock
///
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HammockError {
    /// No node to cover was given
    #[error("the set of nodes to cover is empty")]
    NothingToCover,
    /// A node to cover does not exist in the net
    #[error("node {0} does not exist in the Petri net")]
    UnknownNode(NodeID),
    /// A node to cover is not on a path from the net's source to its sink
    #[error("node {0} is not on any path from the net's source to its sink")]
    Disconnected(NodeID),
    /// The net's source/sink cannot be reached from the covered nodes
    #[error("{0} cannot be reached from the covered nodes")]
    Unreachable(NodeID),
    /// The expansion did not reach a fixed point within the node count
    #[error("hammock expansion did not converge after {0} iterations")]
    ExpansionDidNotConverge(usize),
    /// The net has no unique source and sink place
    #[error("not a workflow net: {0}")]
    NotAWorkflowNet(#[from] PetriNetError),
}

impl HammockError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            HammockError::NothingToCover => ErrorKind::EmptyResult,
            HammockError::UnknownNode(_)
            | HammockError::Disconnected(_)
            | HammockError::Unreachable(_)
            | HammockError::NotAWorkflowNet(_) => ErrorKind::InputConsistency,
            HammockError::ExpansionDidNotConverge(_) => ErrorKind::AlgorithmicExhaustion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Towards {
    Source,
    Sink,
}

fn step(net: &PetriNet, node: NodeID, towards: Towards) -> Vec<NodeID> {
    match towards {
        Towards::Source => net.preset_of(node),
        Towards::Sink => net.postset_of(node),
    }
}

/// Nodes reachable from `start` (moving against the arcs when going towards the source)
fn reachable(net: &PetriNet, start: NodeID, towards: Towards) -> HashSet<NodeID> {
    let mut seen: HashSet<NodeID> = HashSet::from([start]);
    let mut queue: VecDeque<NodeID> = VecDeque::from([start]);
    while let Some(u) = queue.pop_front() {
        for v in step(net, u, towards) {
            if seen.insert(v) {
                queue.push_back(v);
            }
        }
    }
    seen
}

/// Shortest path from one of `starts` to `target` (multi-source BFS)
///
/// The first node of the path is one of `starts`, the last one is `target`
fn shortest_path(
    net: &PetriNet,
    starts: &BTreeSet<NodeID>,
    target: NodeID,
    towards: Towards,
) -> Result<Vec<NodeID>, HammockError> {
    let mut parent: HashMap<NodeID, Option<NodeID>> =
        starts.iter().map(|s| (*s, None)).collect();
    let mut queue: VecDeque<NodeID> = starts.iter().copied().collect();
    while let Some(u) = queue.pop_front() {
        if u == target {
            break;
        }
        for v in step(net, u, towards) {
            if let std::collections::hash_map::Entry::Vacant(e) = parent.entry(v) {
                e.insert(Some(u));
                queue.push_back(v);
            }
        }
    }
    if !parent.contains_key(&target) {
        return Err(HammockError::Unreachable(target));
    }
    let mut path = vec![target];
    let mut cur = target;
    while let Some(Some(prev)) = parent.get(&cur) {
        path.push(*prev);
        cur = *prev;
    }
    path.reverse();
    Ok(path)
}

/// One of the two boundary searches (towards the net's source or towards its sink)
#[derive(Debug)]
struct BoundaryPath {
    path: Vec<NodeID>,
    position: HashMap<NodeID, usize>,
    permitted: NodeTypes,
    index: Option<usize>,
}

impl BoundaryPath {
    fn new(path: Vec<NodeID>, permitted: NodeTypes) -> Self {
        let position = path.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        Self {
            path,
            position,
            permitted,
            index: None,
        }
    }

    /// First position at or beyond the farthest of `nodes` (and the current index)
    /// whose node has a permitted type
    ///
    /// The last node of the path (the net's source or sink) is always accepted.
    fn next_index<'a>(&self, net: &PetriNet, nodes: impl Iterator<Item = &'a NodeID>) -> usize {
        let farthest = nodes
            .filter_map(|n| self.position.get(n).copied())
            .max()
            .max(self.index);
        let mut i = farthest.unwrap_or(0);
        while i + 1 < self.path.len() && !self.permitted.permits(net, self.path[i]) {
            i += 1;
        }
        i
    }
}

///
/// Find the minimal hammock covering all `covered` nodes
///
/// `net_source` and `net_sink` are the source and sink place of the WF-net.
/// The hammock's source is chosen on a shortest path from the covered nodes to `net_source`
/// (and its sink on a shortest path to `net_sink`), moving further away from the covered
/// nodes until a node of a permitted type (see [`HammockConfig`]) is found.
/// The net's own source and sink are accepted regardless of the configured types.
///
pub fn find_minimal_hammock(
    net: &PetriNet,
    covered: impl IntoIterator<Item = NodeID>,
    net_source: PlaceID,
    net_sink: PlaceID,
    config: &HammockConfig,
) -> Result<Hammock, HammockError> {
    let covered: BTreeSet<NodeID> = covered.into_iter().collect();
    if covered.is_empty() {
        return Err(HammockError::NothingToCover);
    }
    for boundary in [NodeID::from(net_source), NodeID::from(net_sink)] {
        if !net.contains_node(boundary) {
            return Err(HammockError::UnknownNode(boundary));
        }
    }
    if let Some(unknown) = covered.iter().find(|n| !net.contains_node(**n)) {
        return Err(HammockError::UnknownNode(*unknown));
    }
    let from_source = reachable(net, net_source.into(), Towards::Sink);
    let reaching_sink = reachable(net, net_sink.into(), Towards::Source);
    if let Some(disconnected) = covered
        .iter()
        .find(|n| !from_source.contains(*n) || !reaching_sink.contains(*n))
    {
        return Err(HammockError::Disconnected(*disconnected));
    }

    let mut to_source = BoundaryPath::new(
        shortest_path(net, &covered, net_source.into(), Towards::Source)?,
        config.source_node_types,
    );
    let mut to_sink = BoundaryPath::new(
        shortest_path(net, &covered, net_sink.into(), Towards::Sink)?,
        config.sink_node_types,
    );

    let mut black: HashSet<NodeID> = HashSet::new();
    let mut gray: HashSet<NodeID> = HashSet::new();
    let mut new_nodes: BTreeSet<NodeID> = covered;
    let mut ham_src = to_source.path[0];
    let mut ham_sink = to_sink.path[0];

    let max_iterations = net.node_ids().len() + 2;
    let mut iterations = 0;
    while !new_nodes.is_empty() {
        iterations += 1;
        if iterations > max_iterations {
            return Err(HammockError::ExpansionDidNotConverge(iterations));
        }

        // Move the boundaries past every new node lying on their paths
        let src_index = to_source.next_index(net, new_nodes.iter());
        let sink_index = to_sink.next_index(net, new_nodes.iter());
        ham_src = to_source.path[src_index];
        ham_sink = to_sink.path[sink_index];
        trace!(
            iterations,
            %ham_src,
            %ham_sink,
            new = new_nodes.len(),
            "expanding hammock"
        );

        gray.extend(
            std::mem::take(&mut new_nodes)
                .into_iter()
                .filter(|u| *u != ham_src && *u != ham_sink),
        );

        // Nodes passed by the boundaries become interior
        if to_source.index != Some(src_index) {
            let from = to_source.index.unwrap_or(0);
            gray.extend(to_source.path[from..src_index].iter().copied());
            if ham_src != ham_sink {
                new_nodes.extend(
                    net.postset_of(ham_src)
                        .into_iter()
                        .filter(|u| !black.contains(u) && !gray.contains(u)),
                );
            }
            to_source.index = Some(src_index);
        }
        if to_sink.index != Some(sink_index) {
            let from = to_sink.index.unwrap_or(0);
            gray.extend(to_sink.path[from..sink_index].iter().copied());
            if ham_src != ham_sink {
                new_nodes.extend(
                    net.preset_of(ham_sink)
                        .into_iter()
                        .filter(|u| !black.contains(u) && !gray.contains(u)),
                );
            }
            to_sink.index = Some(sink_index);
        }

        // Interior nodes pull in all of their neighbors
        let flushed = std::mem::take(&mut gray);
        for u in &flushed {
            for v in net.preset_of(*u).into_iter().chain(net.postset_of(*u)) {
                if !black.contains(&v) && !flushed.contains(&v) {
                    new_nodes.insert(v);
                }
            }
        }
        black.extend(flushed);
    }

    Ok(Hammock::new(ham_src, ham_sink, black))
}
