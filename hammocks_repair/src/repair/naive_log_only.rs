//! Naive repair of log-only moves
//!
//! Every log-only move is turned into model behavior by adding a transition with the
//! activity as label that can fire (as a self-loop) in the places marked at that point.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::event_data::{AlignedTrace, AlignmentMove};
use crate::core::petri_net::{ArcType, Marking, PetriNet, PetriNetError, PlaceID, TransitionID};
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
/// How alignments are rewritten after log-only moves were repaired
pub enum AlignmentsModificationMode {
    /// Alignments stay as they are (and have to be recomputed)
    #[default]
    None,
    /// Log-only moves become synchronous moves on the inserted transitions
    LogToSync,
    /// Log-only moves become model-only moves on the inserted transitions
    LogToModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Configuration of the log-only move repair
pub struct PrerepairConfig {
    /// How passed alignments are rewritten
    pub alignments_modification: AlignmentsModificationMode,
}

impl PrerepairConfig {
    /// Whether the alignments fit the repaired net afterwards
    pub fn rewrites_alignments(&self) -> bool {
        self.alignments_modification != AlignmentsModificationMode::None
    }
}

///
/// Errors that can occur while repairing log-only moves
///
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrerepairError {
    /// An alignment refers to a transition that is not part of the net
    #[error("no transition named {0:?} in the Petri net: incorrect alignments")]
    UnknownTransition(String),
    /// A transition fired without being enabled
    #[error("transition {0:?} is not enabled: incorrect alignments")]
    NotEnabled(String),
    /// Modifying the net failed
    #[error(transparent)]
    PetriNet(#[from] PetriNetError),
}

impl PrerepairError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InputConsistency
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Transitions added by [`repair_log_only_moves`]
pub struct LogOnlyRepair {
    /// Labeled self-loop transitions, one per group of log-only move locations
    pub inserted: Vec<TransitionID>,
    /// Silent transitions added in front of initial places / after final places
    pub boundary: Vec<TransitionID>,
}

/// Position of a move: (trace index, move index)
type MovePosition = (usize, usize);

#[derive(Debug, Default)]
struct Locations {
    /// Distinct sets of marked places, in order of first occurrence
    locations: Vec<BTreeSet<PlaceID>>,
    moves: Vec<Vec<MovePosition>>,
    index: HashMap<BTreeSet<PlaceID>, usize>,
}

impl Locations {
    fn add(&mut self, location: BTreeSet<PlaceID>, position: MovePosition) {
        let i = match self.index.get(&location) {
            Some(i) => *i,
            None => {
                self.locations.push(location.clone());
                self.moves.push(Vec::new());
                self.index.insert(location, self.locations.len() - 1);
                self.locations.len() - 1
            }
        };
        self.moves[i].push(position);
    }

    /// Greedily group locations sharing the place that occurs in most of them
    ///
    /// Each group is represented by the intersection of its locations
    fn group(&self) -> Vec<(BTreeSet<PlaceID>, Vec<MovePosition>)> {
        let mut containing: BTreeMap<PlaceID, BTreeSet<usize>> = BTreeMap::new();
        for (i, location) in self.locations.iter().enumerate() {
            for p in location {
                containing.entry(*p).or_default().insert(i);
            }
        }

        let mut groups = Vec::new();
        loop {
            let best = containing
                .values()
                .fold(None, |best: Option<&BTreeSet<usize>>, locs| match best {
                    Some(b) if b.len() >= locs.len() => Some(b),
                    _ => Some(locs),
                });
            let Some(group) = best.filter(|g| !g.is_empty()).cloned() else {
                break;
            };

            let mut places: Option<BTreeSet<PlaceID>> = None;
            let mut moves = Vec::new();
            for i in &group {
                places = Some(match places {
                    None => self.locations[*i].clone(),
                    Some(ps) => ps.intersection(&self.locations[*i]).copied().collect(),
                });
                moves.extend(self.moves[*i].iter().copied());
            }
            groups.push((places.unwrap_or_default(), moves));

            for i in &group {
                for p in &self.locations[*i] {
                    if let Some(locs) = containing.get_mut(p) {
                        locs.remove(i);
                    }
                }
            }
        }
        groups
    }
}

fn fire(
    net: &PetriNet,
    transitions: &HashMap<String, TransitionID>,
    marking: &mut Marking,
    name: &str,
) -> Result<(), PrerepairError> {
    let t = *transitions
        .get(name)
        .ok_or_else(|| PrerepairError::UnknownTransition(name.to_string()))?;
    for (p, w) in net.input_arcs_of_transition(t) {
        let tokens = marking
            .get_mut(&p)
            .filter(|tokens| **tokens >= u64::from(w))
            .ok_or_else(|| PrerepairError::NotEnabled(name.to_string()))?;
        *tokens -= u64::from(w);
        if *tokens == 0 {
            marking.remove(&p);
        }
    }
    for (p, w) in net.output_arcs_of_transition(t) {
        *marking.entry(p).or_insert(0) += u64::from(w);
    }
    Ok(())
}

/// Locations of all log-only moves per activity (activities in order of first occurrence)
fn log_only_locations(
    net: &PetriNet,
    initial_marking: &Marking,
    alignments: &[AlignedTrace],
) -> Result<Vec<(String, Locations)>, PrerepairError> {
    let transitions = net.transition_name_index();
    let mut per_activity: Vec<(String, Locations)> = Vec::new();
    let mut activity_index: HashMap<String, usize> = HashMap::new();

    for (trace_index, trace) in alignments.iter().enumerate() {
        let mut marking = initial_marking.clone();
        for (move_index, mv) in trace.moves.iter().enumerate() {
            match mv {
                AlignmentMove::LogOnly { activity } => {
                    let i = *activity_index.entry(activity.clone()).or_insert_with(|| {
                        per_activity.push((activity.clone(), Locations::default()));
                        per_activity.len() - 1
                    });
                    let location = marking.keys().copied().collect();
                    per_activity[i].1.add(location, (trace_index, move_index));
                }
                AlignmentMove::ModelOnly { transition }
                | AlignmentMove::Synchronous { transition, .. } => {
                    fire(net, &transitions, &mut marking, transition)?;
                }
            }
        }
    }
    Ok(per_activity)
}

///
/// Insert a transition for the log-only moves in `alignments`
///
/// For every activity with log-only moves, the places marked at these moves ("locations")
/// are grouped greedily: the place contained in most locations selects the group, which is
/// represented by the intersection of its locations. For each group, a transition labeled
/// with the activity is added, with arcs from and back to every place of the intersection.
///
/// The alignments are rewritten as configured. If an initial place now has incoming arcs (or
/// a final place outgoing arcs), a new initial (final) place is added and connected to the
/// old one by a silent transition; a model-only move on it is added to every alignment.
///
pub fn repair_log_only_moves(
    net: &mut PetriNet,
    initial_marking: &mut Marking,
    final_marking: &mut Marking,
    alignments: &mut [AlignedTrace],
    config: &PrerepairConfig,
) -> Result<LogOnlyRepair, PrerepairError> {
    let per_activity = log_only_locations(net, initial_marking, alignments)?;
    let mut result = LogOnlyRepair::default();

    for (activity, locations) in per_activity {
        for (places, moves) in locations.group() {
            let t = net.add_transition(Some(activity.clone()), None);
            for p in &places {
                net.add_arc(ArcType::place_to_transition(*p, t), None)?;
                net.add_arc(ArcType::transition_to_place(t, *p), None)?;
            }
            debug!(
                activity = activity.as_str(),
                places = places.len(),
                moves = moves.len(),
                "inserted transition for log-only moves"
            );
            let name = net
                .transition(t)
                .map(|t| t.name.clone())
                .unwrap_or_default();
            for (trace_index, move_index) in moves {
                let replacement = match config.alignments_modification {
                    AlignmentsModificationMode::None => continue,
                    AlignmentsModificationMode::LogToSync => {
                        AlignmentMove::synchronous(activity.clone(), name.clone())
                    }
                    AlignmentsModificationMode::LogToModel => {
                        AlignmentMove::model_only(name.clone())
                    }
                };
                if let Some(mv) = alignments
                    .get_mut(trace_index)
                    .and_then(|trace| trace.moves.get_mut(move_index))
                {
                    *mv = replacement;
                }
            }
            result.inserted.push(t);
        }
    }

    let mut initial_places: Vec<PlaceID> = initial_marking.keys().copied().collect();
    initial_places.sort();
    for old_start in initial_places {
        if net.preset_of_place(old_start).is_empty() {
            continue;
        }
        let new_start = net.add_place(None);
        let tau = net.add_transition(None, None);
        net.add_arc(ArcType::place_to_transition(new_start, tau), None)?;
        net.add_arc(ArcType::transition_to_place(tau, old_start), None)?;
        let name = net
            .transition(tau)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        for trace in alignments.iter_mut() {
            if trace.moves.first().and_then(AlignmentMove::transition) != Some(name.as_str()) {
                trace.moves.insert(0, AlignmentMove::model_only(name.clone()));
            }
        }
        if let Some(tokens) = initial_marking.remove(&old_start) {
            initial_marking.insert(new_start, tokens);
        }
        result.boundary.push(tau);
    }

    let mut final_places: Vec<PlaceID> = final_marking.keys().copied().collect();
    final_places.sort();
    for old_end in final_places {
        if net.postset_of_place(old_end).is_empty() {
            continue;
        }
        let new_end = net.add_place(None);
        let tau = net.add_transition(None, None);
        net.add_arc(ArcType::place_to_transition(old_end, tau), None)?;
        net.add_arc(ArcType::transition_to_place(tau, new_end), None)?;
        let name = net
            .transition(tau)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        for trace in alignments.iter_mut() {
            if trace.moves.last().and_then(AlignmentMove::transition) != Some(name.as_str()) {
                trace.moves.push(AlignmentMove::model_only(name.clone()));
            }
        }
        if let Some(tokens) = final_marking.remove(&old_end) {
            final_marking.insert(new_end, tokens);
        }
        result.boundary.push(tau);
    }

    info!(
        inserted = result.inserted.len(),
        boundary = result.boundary.len(),
        "repaired log-only moves"
    );
    Ok(result)
}
