use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Hash, Eq)]
/// Place in a Petri net
pub struct Place {
    /// Unique name of the place
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Hash, Eq)]
/// Transition in a Petri net
pub struct Transition {
    /// Unique name of the transition (used to refer to it from alignments)
    pub name: String,
    /// Transition label (None if this transition is _invisible_)
    pub label: Option<String>,
}

impl Transition {
    /// Whether this transition is silent (has no label)
    pub fn is_hidden(&self) -> bool {
        self.label.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Eq)]
/// Node (Place or Transition) stored in a [`PetriNet`]
pub enum PetriNetNode {
    /// A place
    Place(Place),
    /// A transition
    Transition(Transition),
}

impl PetriNetNode {
    /// Name of the node
    pub fn name(&self) -> &str {
        match self {
            PetriNetNode::Place(p) => &p.name,
            PetriNetNode::Transition(t) => &t.name,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialOrd, Ord)]
/// Place ID
pub struct PlaceID(pub NodeIndex);

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialOrd, Ord)]
/// Transition ID
pub struct TransitionID(pub NodeIndex);

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialOrd, Ord)]
#[serde(tag = "type", content = "index")]
/// ID of any node (Place or Transition) in a [`PetriNet`]
pub enum NodeID {
    /// Place node
    Place(PlaceID),
    /// Transition node
    Transition(TransitionID),
}

impl NodeID {
    /// Index of the node in the underlying graph
    pub fn index(self) -> NodeIndex {
        match self {
            NodeID::Place(p) => p.0,
            NodeID::Transition(t) => t.0,
        }
    }
    /// Returns the [`PlaceID`] if this node is a place
    pub fn as_place(self) -> Option<PlaceID> {
        match self {
            NodeID::Place(p) => Some(p),
            NodeID::Transition(_) => None,
        }
    }
    /// Returns the [`TransitionID`] if this node is a transition
    pub fn as_transition(self) -> Option<TransitionID> {
        match self {
            NodeID::Transition(t) => Some(t),
            NodeID::Place(_) => None,
        }
    }
    /// Whether this ID refers to a place
    pub fn is_place(self) -> bool {
        matches!(self, NodeID::Place(_))
    }
}

impl From<PlaceID> for NodeID {
    fn from(value: PlaceID) -> Self {
        NodeID::Place(value)
    }
}

impl From<TransitionID> for NodeID {
    fn from(value: TransitionID) -> Self {
        NodeID::Transition(value)
    }
}

impl std::fmt::Display for NodeID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeID::Place(p) => write!(f, "place#{}", p.0.index()),
            NodeID::Transition(t) => write!(f, "transition#{}", t.0.index()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Hash, PartialEq, Eq)]
#[serde(tag = "type", content = "nodes")]
/// Arc type in a Petri net
///
/// Arcs only ever connect a place with a transition, the constructors make that explicit
pub enum ArcType {
    /// From Place to Transition
    PlaceTransition(PlaceID, TransitionID),
    /// From Transition to Place
    TransitionPlace(TransitionID, PlaceID),
}

impl ArcType {
    /// Create new from place to transition
    pub fn place_to_transition(from: PlaceID, to: TransitionID) -> ArcType {
        ArcType::PlaceTransition(from, to)
    }
    /// Create new from transition to place
    pub fn transition_to_place(from: TransitionID, to: PlaceID) -> ArcType {
        ArcType::TransitionPlace(from, to)
    }
    /// Arc between two arbitrary nodes (None if both are of the same node type)
    pub fn between(from: NodeID, to: NodeID) -> Option<ArcType> {
        match (from, to) {
            (NodeID::Place(p), NodeID::Transition(t)) => Some(ArcType::PlaceTransition(p, t)),
            (NodeID::Transition(t), NodeID::Place(p)) => Some(ArcType::TransitionPlace(t, p)),
            _ => None,
        }
    }
    /// Start node of this arc
    pub fn from(&self) -> NodeID {
        match self {
            ArcType::PlaceTransition(p, _) => NodeID::Place(*p),
            ArcType::TransitionPlace(t, _) => NodeID::Transition(*t),
        }
    }
    /// End node of this arc
    pub fn to(&self) -> NodeID {
        match self {
            ArcType::PlaceTransition(_, t) => NodeID::Transition(*t),
            ArcType::TransitionPlace(_, p) => NodeID::Place(*p),
        }
    }
    /// Checks if a given node ID is start or end of this arc
    pub fn contains(&self, id: NodeID) -> bool {
        self.from() == id || self.to() == id
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Hash, PartialEq, Eq)]
/// Arc in a Petri net
///
/// Connecting a transition and a place (or the other way around)
pub struct Arc {
    /// Source and target of Arc
    pub from_to: ArcType,
    /// Weight (i.e., how many tokens this arc moves)
    pub weight: u32,
}

/// Marking of a Petri net: Assigning [`PlaceID`]s to a number of tokens
pub type Marking = HashMap<PlaceID, u64>;

///
/// Errors when querying or modifying a [`PetriNet`]
///
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PetriNetError {
    /// A referenced node does not exist (or has a different node type)
    #[error("node {0} does not exist in the Petri net")]
    UnknownNode(NodeID),
    /// No place without incoming arcs exists
    #[error("the Petri net has no source place")]
    NoSourcePlace,
    /// More than one place without incoming arcs exists
    #[error("the Petri net has {0} source places, expected exactly one")]
    AmbiguousSourcePlace(usize),
    /// No place without outgoing arcs exists
    #[error("the Petri net has no sink place")]
    NoSinkPlace,
    /// More than one place without outgoing arcs exists
    #[error("the Petri net has {0} sink places, expected exactly one")]
    AmbiguousSinkPlace(usize),
}

impl PetriNetError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InputConsistency
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
///
/// A Petri net of [`Place`]s and [`Transition`]s
///
/// Bipartite graph of [`Place`]s and [`Transition`]s with weighted [`Arc`]s connecting them.
/// Nodes live in an arena (a [`StableDiGraph`]), so their IDs stay valid while other nodes
/// are removed. IDs of removed nodes may be handed out again for nodes added later.
///
/// Markings are not part of the net and are passed alongside it.
pub struct PetriNet {
    graph: StableDiGraph<PetriNetNode, u32>,
}

impl PetriNet {
    /// Create new [`PetriNet`] with no places or transitions
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::default(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Add a place (with an optional name)
    ///
    /// If no name is passed, a new UUID will be used as name
    pub fn add_place(&mut self, name: Option<String>) -> PlaceID {
        let name = name.unwrap_or_else(|| Uuid::new_v4().to_string());
        PlaceID(self.graph.add_node(PetriNetNode::Place(Place { name })))
    }

    /// Add a transition with a label (and with an optional name)
    ///
    /// If no name is passed, a new UUID will be used as name
    pub fn add_transition(&mut self, label: Option<String>, name: Option<String>) -> TransitionID {
        let name = name.unwrap_or_else(|| Uuid::new_v4().to_string());
        TransitionID(
            self.graph
                .add_node(PetriNetNode::Transition(Transition { name, label })),
        )
    }

    /// Add an arc
    ///
    /// If the arc already exists, its weight is increased instead.
    /// The weight defaults to 1.
    pub fn add_arc(&mut self, from_to: ArcType, weight: Option<u32>) -> Result<(), PetriNetError> {
        let (from, to) = (from_to.from(), from_to.to());
        for node in [from, to] {
            if !self.contains_node(node) {
                return Err(PetriNetError::UnknownNode(node));
            }
        }
        let weight = weight.unwrap_or(1);
        match self.graph.find_edge(from.index(), to.index()) {
            Some(edge) => {
                if let Some(w) = self.graph.edge_weight_mut(edge) {
                    *w += weight;
                }
            }
            None => {
                self.graph.add_edge(from.index(), to.index(), weight);
            }
        }
        Ok(())
    }

    /// Remove an arc, returning its weight if it existed
    pub fn remove_arc(&mut self, from_to: ArcType) -> Option<u32> {
        let edge = self
            .graph
            .find_edge(from_to.from().index(), from_to.to().index())?;
        self.graph.remove_edge(edge)
    }

    /// Remove any node (Transition/Place) and all of its arcs from the Petri net
    ///
    /// Returns `false` if the node did not exist
    pub fn remove_node(&mut self, id: NodeID) -> bool {
        if !self.contains_node(id) {
            return false;
        }
        self.graph.remove_node(id.index()).is_some()
    }

    /// Remove a Place from the Petri net
    pub fn remove_place(&mut self, place_id: PlaceID) -> bool {
        self.remove_node(place_id.into())
    }

    /// Remove a Transition from the Petri net
    pub fn remove_transition(&mut self, transition_id: TransitionID) -> bool {
        self.remove_node(transition_id.into())
    }

    /// Check if a node with the given ID (and matching node type) exists
    pub fn contains_node(&self, id: NodeID) -> bool {
        matches!(
            (id, self.graph.node_weight(id.index())),
            (NodeID::Place(_), Some(PetriNetNode::Place(_)))
                | (NodeID::Transition(_), Some(PetriNetNode::Transition(_)))
        )
    }

    /// Get a place by its ID
    pub fn place(&self, id: PlaceID) -> Option<&Place> {
        match self.graph.node_weight(id.0) {
            Some(PetriNetNode::Place(p)) => Some(p),
            _ => None,
        }
    }

    /// Get a mutable place by its ID
    pub fn place_mut(&mut self, id: PlaceID) -> Option<&mut Place> {
        match self.graph.node_weight_mut(id.0) {
            Some(PetriNetNode::Place(p)) => Some(p),
            _ => None,
        }
    }

    /// Get a transition by its ID
    pub fn transition(&self, id: TransitionID) -> Option<&Transition> {
        match self.graph.node_weight(id.0) {
            Some(PetriNetNode::Transition(t)) => Some(t),
            _ => None,
        }
    }

    /// Get a mutable transition by its ID
    pub fn transition_mut(&mut self, id: TransitionID) -> Option<&mut Transition> {
        match self.graph.node_weight_mut(id.0) {
            Some(PetriNetNode::Transition(t)) => Some(t),
            _ => None,
        }
    }

    /// Name of any node
    pub fn node_name(&self, id: NodeID) -> Option<&str> {
        if !self.contains_node(id) {
            return None;
        }
        self.graph.node_weight(id.index()).map(PetriNetNode::name)
    }

    /// Resolve a raw graph index to a typed [`NodeID`]
    fn node_id(&self, index: NodeIndex) -> Option<NodeID> {
        match self.graph.node_weight(index)? {
            PetriNetNode::Place(_) => Some(NodeID::Place(PlaceID(index))),
            PetriNetNode::Transition(_) => Some(NodeID::Transition(TransitionID(index))),
        }
    }

    /// All node IDs, ordered by creation
    pub fn node_ids(&self) -> Vec<NodeID> {
        self.graph
            .node_indices()
            .filter_map(|i| self.node_id(i))
            .collect()
    }

    /// All places with their IDs, ordered by creation
    pub fn places(&self) -> impl Iterator<Item = (PlaceID, &Place)> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |i| match self.graph.node_weight(i) {
                Some(PetriNetNode::Place(p)) => Some((PlaceID(i), p)),
                _ => None,
            })
    }

    /// All transitions with their IDs, ordered by creation
    pub fn transitions(&self) -> impl Iterator<Item = (TransitionID, &Transition)> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |i| match self.graph.node_weight(i) {
                Some(PetriNetNode::Transition(t)) => Some((TransitionID(i), t)),
                _ => None,
            })
    }

    /// Number of places
    pub fn place_count(&self) -> usize {
        self.places().count()
    }

    /// Number of transitions
    pub fn transition_count(&self) -> usize {
        self.transitions().count()
    }

    /// All arcs of the net
    pub fn arcs(&self) -> Vec<Arc> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                let weight = *self.graph.edge_weight(e)?;
                let from_to = match (self.node_id(from)?, self.node_id(to)?) {
                    (NodeID::Place(p), NodeID::Transition(t)) => ArcType::PlaceTransition(p, t),
                    (NodeID::Transition(t), NodeID::Place(p)) => ArcType::TransitionPlace(t, p),
                    _ => return None,
                };
                Some(Arc { from_to, weight })
            })
            .collect()
    }

    /// Number of arcs
    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Weight of the arc between two nodes (if there is such an arc)
    pub fn arc_weight(&self, from: NodeID, to: NodeID) -> Option<u32> {
        let edge = self.graph.find_edge(from.index(), to.index())?;
        self.graph.edge_weight(edge).copied()
    }

    fn neighbors(&self, id: NodeID, direction: Direction) -> Vec<NodeID> {
        if !self.contains_node(id) {
            return Vec::new();
        }
        let mut res: Vec<NodeID> = self
            .graph
            .neighbors_directed(id.index(), direction)
            .filter_map(|i| self.node_id(i))
            .collect();
        res.sort();
        res.dedup();
        res
    }

    /// Get the preset of any node (ordered by node ID)
    pub fn preset_of(&self, id: NodeID) -> Vec<NodeID> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Get the postset of any node (ordered by node ID)
    pub fn postset_of(&self, id: NodeID) -> Vec<NodeID> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Get the preset of a [`PetriNet`] place
    pub fn preset_of_place(&self, p: PlaceID) -> Vec<TransitionID> {
        self.preset_of(p.into())
            .into_iter()
            .filter_map(NodeID::as_transition)
            .collect()
    }

    /// Get the preset of a [`PetriNet`] transition
    pub fn preset_of_transition(&self, t: TransitionID) -> Vec<PlaceID> {
        self.preset_of(t.into())
            .into_iter()
            .filter_map(NodeID::as_place)
            .collect()
    }

    /// Get the postset of a [`PetriNet`] place
    pub fn postset_of_place(&self, p: PlaceID) -> Vec<TransitionID> {
        self.postset_of(p.into())
            .into_iter()
            .filter_map(NodeID::as_transition)
            .collect()
    }

    /// Get the postset of a [`PetriNet`] transition
    pub fn postset_of_transition(&self, t: TransitionID) -> Vec<PlaceID> {
        self.postset_of(t.into())
            .into_iter()
            .filter_map(NodeID::as_place)
            .collect()
    }

    /// Input places of a transition together with the weights of their arcs
    pub fn input_arcs_of_transition(&self, t: TransitionID) -> Vec<(PlaceID, u32)> {
        self.preset_of_transition(t)
            .into_iter()
            .map(|p| (p, self.arc_weight(p.into(), t.into()).unwrap_or(1)))
            .collect()
    }

    /// Output places of a transition together with the weights of their arcs
    pub fn output_arcs_of_transition(&self, t: TransitionID) -> Vec<(PlaceID, u32)> {
        self.postset_of_transition(t)
            .into_iter()
            .map(|p| (p, self.arc_weight(t.into(), p.into()).unwrap_or(1)))
            .collect()
    }

    /// Find a place by its name
    pub fn place_by_name(&self, name: &str) -> Option<PlaceID> {
        self.places().find(|(_, p)| p.name == name).map(|(id, _)| id)
    }

    /// Find a transition by its name
    pub fn transition_by_name(&self, name: &str) -> Option<TransitionID> {
        self.transitions()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| id)
    }

    /// Find any node by its name (places are checked first)
    pub fn node_by_name(&self, name: &str) -> Option<NodeID> {
        self.place_by_name(name)
            .map(NodeID::from)
            .or_else(|| self.transition_by_name(name).map(NodeID::from))
    }

    /// All transitions carrying the given label
    pub fn transitions_by_label(&self, label: &str) -> Vec<TransitionID> {
        self.transitions()
            .filter(|(_, t)| t.label.as_deref() == Some(label))
            .map(|(id, _)| id)
            .collect()
    }

    /// Lookup table from transition names to their IDs
    pub fn transition_name_index(&self) -> HashMap<String, TransitionID> {
        self.transitions()
            .map(|(id, t)| (t.name.clone(), id))
            .collect()
    }

    /// The unique place without incoming arcs
    pub fn source_place(&self) -> Result<PlaceID, PetriNetError> {
        let sources: Vec<PlaceID> = self
            .places()
            .filter(|(id, _)| self.preset_of_place(*id).is_empty())
            .map(|(id, _)| id)
            .collect();
        match sources.as_slice() {
            [p] => Ok(*p),
            [] => Err(PetriNetError::NoSourcePlace),
            _ => Err(PetriNetError::AmbiguousSourcePlace(sources.len())),
        }
    }

    /// The unique place without outgoing arcs
    pub fn sink_place(&self) -> Result<PlaceID, PetriNetError> {
        let sinks: Vec<PlaceID> = self
            .places()
            .filter(|(id, _)| self.postset_of_place(*id).is_empty())
            .map(|(id, _)| id)
            .collect();
        match sinks.as_slice() {
            [p] => Ok(*p),
            [] => Err(PetriNetError::NoSinkPlace),
            _ => Err(PetriNetError::AmbiguousSinkPlace(sinks.len())),
        }
    }

    /// Copy all nodes and arcs of `other` into this net
    ///
    /// Returns the mapping from node IDs in `other` to the IDs of their copies
    pub fn add_net(&mut self, other: &PetriNet) -> HashMap<NodeID, NodeID> {
        let mut mapping: HashMap<NodeID, NodeID> = HashMap::new();
        for (id, p) in other.places() {
            let new_id = self.add_place(Some(p.name.clone()));
            mapping.insert(id.into(), new_id.into());
        }
        for (id, t) in other.transitions() {
            let new_id = self.add_transition(t.label.clone(), Some(t.name.clone()));
            mapping.insert(id.into(), new_id.into());
        }
        for arc in other.arcs() {
            if let (Some(from), Some(to)) = (
                mapping.get(&arc.from_to.from()),
                mapping.get(&arc.from_to.to()),
            ) {
                self.graph.add_edge(from.index(), to.index(), arc.weight);
            }
        }
        mapping
    }

    /// Rename all places to `p_1`, `p_2`, ... and all transitions to `t_1`, `t_2`, ...
    ///
    /// Keeps node names unique after nets with colliding names were combined
    pub fn enumerate_nodes_successively(&mut self) {
        let places: Vec<PlaceID> = self.places().map(|(id, _)| id).collect();
        for (i, id) in places.into_iter().enumerate() {
            if let Some(p) = self.place_mut(id) {
                p.name = format!("p_{}", i + 1);
            }
        }
        let transitions: Vec<TransitionID> = self.transitions().map(|(id, _)| id).collect();
        for (i, id) in transitions.into_iter().enumerate() {
            if let Some(t) = self.transition_mut(id) {
                t.name = format!("t_{}", i + 1);
            }
        }
    }
}
