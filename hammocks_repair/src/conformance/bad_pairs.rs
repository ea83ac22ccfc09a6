//! Detection of "bad pairs" of nodes by replaying alignments with colored tokens
//!
//! Every token remembers which nodes it was produced by while the model and the log agreed
//! (_green_ ancestors) and which nodes it passed since the model deviated from the log
//! (_red_ ancestors). When a synchronous move consumes a token with red ancestors, each red
//! ancestor forms a bad pair with the fired transition: somewhere between them the model
//! does not describe the observed behavior.
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, trace};

use crate::core::event_data::{AlignedTrace, AlignmentMove};
use crate::core::petri_net::{Marking, NodeID, PetriNet, PlaceID, TransitionID};
use crate::error::ErrorKind;

/// Bad pairs of nodes with the number of times they were detected
pub type BadPairs = HashMap<(NodeID, NodeID), u64>;

///
/// Errors that can occur while detecting bad pairs
///
/// All of them indicate that the alignments do not fit the Petri net
///
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BadPairsError {
    /// An alignment refers to a transition that is not part of the net
    #[error("no transition named {0:?} in the Petri net: incorrect alignments")]
    UnknownTransition(String),
    /// A transition fired without enough tokens in one of its input places
    #[error("transition {transition:?} fired without a token in {place}: incorrect alignments")]
    MissingToken {
        /// Name of the fired transition
        transition: String,
        /// Input place lacking a token
        place: NodeID,
    },
    /// A marking refers to a place that is not part of the net
    #[error("marking refers to {0}, which is not a place of the Petri net")]
    UnknownPlace(NodeID),
}

impl BadPairsError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InputConsistency
    }
}

#[derive(Debug, Clone, Default)]
struct ColoredToken {
    green: HashSet<NodeID>,
    red: HashSet<NodeID>,
}

fn add_bad_pair(bad_pairs: &mut BadPairs, pair: (NodeID, NodeID), count: u64) {
    *bad_pairs.entry(pair).or_insert(0) += count;
}

fn merge_bad_pairs(mut m1: BadPairs, mut m2: BadPairs) -> BadPairs {
    if m1.len() < m2.len() {
        std::mem::swap(&mut m1, &mut m2);
    }
    for (k, v) in m2 {
        add_bad_pair(&mut m1, k, v);
    }
    m1
}

fn check_marking(net: &PetriNet, marking: &Marking) -> Result<(), BadPairsError> {
    match marking.keys().find(|p| net.place(**p).is_none()) {
        Some(p) => Err(BadPairsError::UnknownPlace((*p).into())),
        None => Ok(()),
    }
}

fn replay(
    net: &PetriNet,
    transitions: &HashMap<String, TransitionID>,
    initial_marking: &Marking,
    final_marking: &Marking,
    aligned_trace: &AlignedTrace,
) -> Result<BadPairs, BadPairsError> {
    let mut bad_pairs = BadPairs::new();
    let mut tokens: HashMap<PlaceID, VecDeque<ColoredToken>> = HashMap::new();

    let init_token = ColoredToken {
        green: initial_marking.keys().map(|p| NodeID::from(*p)).collect(),
        red: HashSet::new(),
    };
    for (place, count) in initial_marking {
        let queue = tokens.entry(*place).or_default();
        for _ in 0..*count {
            queue.push_back(init_token.clone());
        }
    }

    for mv in &aligned_trace.moves {
        let Some(name) = mv.transition() else {
            continue;
        };
        let fired = *transitions
            .get(name)
            .ok_or_else(|| BadPairsError::UnknownTransition(name.to_string()))?;
        let fired_node = NodeID::from(fired);

        let mut consumed = ColoredToken::default();
        for (place, weight) in net.input_arcs_of_transition(fired) {
            for _ in 0..weight {
                let token = tokens
                    .get_mut(&place)
                    .and_then(VecDeque::pop_front)
                    .ok_or_else(|| BadPairsError::MissingToken {
                        transition: name.to_string(),
                        place: place.into(),
                    })?;
                consumed.green.extend(token.green);
                consumed.red.extend(token.red);
            }
        }

        let produced = match mv {
            AlignmentMove::LogOnly { .. } => continue,
            AlignmentMove::ModelOnly { .. } => {
                let hidden = net.transition(fired).is_some_and(|t| t.is_hidden());
                if hidden {
                    consumed
                } else {
                    let mut red = consumed.red;
                    red.extend(consumed.green);
                    ColoredToken {
                        green: HashSet::new(),
                        red,
                    }
                }
            }
            AlignmentMove::Synchronous { .. } => {
                for red_ancestor in consumed.red {
                    trace!(%red_ancestor, transition = name, "bad pair");
                    add_bad_pair(&mut bad_pairs, (red_ancestor, fired_node), 1);
                }
                ColoredToken {
                    green: HashSet::from([fired_node]),
                    red: HashSet::new(),
                }
            }
        };

        for (place, weight) in net.output_arcs_of_transition(fired) {
            let queue = tokens.entry(place).or_default();
            for _ in 0..weight {
                queue.push_back(produced.clone());
            }
        }
    }

    // Deviations that were never resolved are attributed to the end of the process
    for token in tokens.values().flatten() {
        for red_ancestor in &token.red {
            for end_place in final_marking.keys() {
                add_bad_pair(&mut bad_pairs, (*red_ancestor, (*end_place).into()), 1);
            }
        }
    }
    Ok(bad_pairs)
}

///
/// Detect bad pairs in a single aligned trace
///
/// Log-only moves are skipped. Model-only moves on visible transitions turn all ancestors of
/// the consumed tokens red, model-only moves on silent transitions just pass them on.
/// Synchronous moves report every red ancestor together with the fired transition.
/// Red ancestors of tokens that remain after the trace are paired with every place of the
/// final marking.
///
pub fn detect_bad_pairs(
    net: &PetriNet,
    initial_marking: &Marking,
    final_marking: &Marking,
    aligned_trace: &AlignedTrace,
) -> Result<BadPairs, BadPairsError> {
    check_marking(net, initial_marking)?;
    check_marking(net, final_marking)?;
    let transitions = net.transition_name_index();
    replay(
        net,
        &transitions,
        initial_marking,
        final_marking,
        aligned_trace,
    )
}

///
/// Detect bad pairs in all aligned traces, summing up their counts
///
/// Traces are replayed in parallel
///
pub fn detect_bad_pairs_in_alignments(
    net: &PetriNet,
    initial_marking: &Marking,
    final_marking: &Marking,
    aligned_traces: &[AlignedTrace],
) -> Result<BadPairs, BadPairsError> {
    replay_all(
        net,
        initial_marking,
        final_marking,
        aligned_traces.par_iter().map(|trace| (trace, 1)),
    )
}

///
/// Detect bad pairs in aligned trace variants, each paired with its number of occurrences
///
/// The bad pairs of a variant are counted once per occurrence.
///
pub fn detect_bad_pairs_in_weighted_alignments(
    net: &PetriNet,
    initial_marking: &Marking,
    final_marking: &Marking,
    aligned_variants: &[(AlignedTrace, u64)],
) -> Result<BadPairs, BadPairsError> {
    replay_all(
        net,
        initial_marking,
        final_marking,
        aligned_variants
            .par_iter()
            .map(|(trace, weight)| (trace, *weight)),
    )
}

fn replay_all<'a>(
    net: &PetriNet,
    initial_marking: &Marking,
    final_marking: &Marking,
    traces: impl ParallelIterator<Item = (&'a AlignedTrace, u64)>,
) -> Result<BadPairs, BadPairsError> {
    check_marking(net, initial_marking)?;
    check_marking(net, final_marking)?;
    let transitions = net.transition_name_index();
    let (bad_pairs, num_traces) = traces
        .map(|(trace, weight)| -> Result<(BadPairs, u64), BadPairsError> {
            let pairs = replay(net, &transitions, initial_marking, final_marking, trace)?;
            let scaled: BadPairs = pairs
                .into_iter()
                .filter(|_| weight > 0)
                .map(|(pair, count)| (pair, count * weight))
                .collect();
            Ok((scaled, weight))
        })
        .try_reduce(
            || (BadPairs::new(), 0),
            |(m1, n1), (m2, n2)| Ok((merge_bad_pairs(m1, m2), n1 + n2)),
        )?;
    debug!(
        traces = num_traces,
        pairs = bad_pairs.len(),
        "detected bad pairs"
    );
    Ok(bad_pairs)
}

/// Bad pairs keyed by node names instead of IDs (sorted, e.g., for reporting)
pub fn bad_pairs_by_name(net: &PetriNet, bad_pairs: &BadPairs) -> BTreeMap<(String, String), u64> {
    bad_pairs
        .iter()
        .filter_map(|((a, b), count)| {
            Some((
                (net.node_name(*a)?.to_string(), net.node_name(*b)?.to_string()),
                *count,
            ))
        })
        .collect()
}
