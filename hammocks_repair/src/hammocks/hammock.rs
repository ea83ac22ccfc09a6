use std::collections::BTreeSet;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::core::petri_net::{NodeID, PetriNet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Bitmask of node types
///
/// Used to restrict which nodes may become the source or sink of a [`Hammock`]
pub struct NodeTypes(u8);

impl NodeTypes {
    /// No node type at all
    pub const NONE: NodeTypes = NodeTypes(0);
    /// Places
    pub const PLACE: NodeTypes = NodeTypes(1 << 0);
    /// Transitions with a label
    pub const VISIBLE_TRANSITION: NodeTypes = NodeTypes(1 << 1);
    /// Silent transitions
    pub const HIDDEN_TRANSITION: NodeTypes = NodeTypes(1 << 2);
    /// Every node type
    pub const ALL: NodeTypes = NodeTypes(0b111);

    /// Raw bits
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether all types in `other` are also in `self`
    pub fn contains(self, other: NodeTypes) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share at least one type
    pub fn intersects(self, other: NodeTypes) -> bool {
        self.0 & other.0 != 0
    }

    /// Type of a single node of `net` (None if the node does not exist)
    pub fn of(net: &PetriNet, node: NodeID) -> Option<NodeTypes> {
        match node {
            NodeID::Place(p) => net.place(p).map(|_| NodeTypes::PLACE),
            NodeID::Transition(t) => net.transition(t).map(|t| {
                if t.is_hidden() {
                    NodeTypes::HIDDEN_TRANSITION
                } else {
                    NodeTypes::VISIBLE_TRANSITION
                }
            }),
        }
    }

    /// Whether `node` has one of the types in this mask
    pub fn permits(self, net: &PetriNet, node: NodeID) -> bool {
        NodeTypes::of(net, node).is_some_and(|t| self.intersects(t))
    }
}

impl Default for NodeTypes {
    fn default() -> Self {
        NodeTypes::PLACE
    }
}

impl BitOr for NodeTypes {
    type Output = NodeTypes;
    fn bitor(self, rhs: Self) -> Self::Output {
        NodeTypes(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeTypes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
/// Parameters for finding hammocks
pub struct HammockConfig {
    /// Permitted node types of a hammock's source
    pub source_node_types: NodeTypes,
    /// Permitted node types of a hammock's sink
    pub sink_node_types: NodeTypes,
}

impl HammockConfig {
    /// Same permitted node types for source and sink
    pub fn uniform(node_types: NodeTypes) -> Self {
        Self {
            source_node_types: node_types,
            sink_node_types: node_types,
        }
    }
    /// Serialize parameters to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
    /// Deserialize parameters from JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// A single-entry single-exit region of a [`PetriNet`]
///
/// All arcs entering the region end in `source` and all arcs leaving it start at `sink`.
/// `nodes` always contains both `source` and `sink`.
pub struct Hammock {
    /// Entry node
    pub source: NodeID,
    /// Exit node
    pub sink: NodeID,
    /// All nodes of the hammock
    pub nodes: BTreeSet<NodeID>,
}

impl Hammock {
    /// Create a new hammock; `source` and `sink` are added to `nodes`
    pub fn new(source: NodeID, sink: NodeID, nodes: impl IntoIterator<Item = NodeID>) -> Self {
        let mut nodes: BTreeSet<NodeID> = nodes.into_iter().collect();
        nodes.insert(source);
        nodes.insert(sink);
        Self {
            source,
            sink,
            nodes,
        }
    }

    /// Whether `node` belongs to the hammock
    pub fn contains(&self, node: NodeID) -> bool {
        self.nodes.contains(&node)
    }

    /// Number of visible transitions in the hammock
    pub fn size(&self, net: &PetriNet) -> usize {
        self.nodes
            .iter()
            .filter(|n| NodeTypes::of(net, **n) == Some(NodeTypes::VISIBLE_TRANSITION))
            .count()
    }

    /// Labels of all visible transitions in the hammock
    pub fn visible_labels(&self, net: &PetriNet) -> BTreeSet<String> {
        self.nodes
            .iter()
            .filter_map(|n| n.as_transition())
            .filter_map(|t| net.transition(t)?.label.clone())
            .collect()
    }
}
