//! Repairing a Petri net by replacing hammocks around deviations with re-discovered sub-nets
use std::collections::HashSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::naive_log_only::{repair_log_only_moves, PrerepairConfig, PrerepairError};
use super::replacement::{replace_hammock, ReplaceError};
use crate::conformance::{
    bad_pairs_by_name, detect_bad_pairs_in_weighted_alignments, BadPairsError,
};
use crate::core::event_data::{ActivityLog, AlignedTrace, AlignmentCosts};
use crate::core::petri_net::{Marking, NodeID, PetriNet, SubNet};
use crate::error::ErrorKind;
use crate::hammocks::{cover_pairs, Hammock, HammockConfig, HammockError};

/// Computes alignments of a log and a Petri net
pub trait AlignmentOracle {
    /// The error type returned if no alignments could be computed
    type Error: std::error::Error + Send + Sync + 'static;

    /// Align every trace variant of `log` (in the order of `log.traces`)
    ///
    /// If `costs` are passed, they replace the standard cost function.
    fn align(
        &self,
        net: &PetriNet,
        initial_marking: &Marking,
        final_marking: &Marking,
        log: &ActivityLog,
        costs: Option<&AlignmentCosts>,
    ) -> Result<Vec<AlignedTrace>, Self::Error>;
}

/// Discovers a sub-net from a (projected) log
pub trait SubprocessMiner {
    /// The error type returned if discovery failed
    type Error: std::error::Error + Send + Sync + 'static;

    /// Discover a net with a single entry and exit place
    fn discover(&self, log: &ActivityLog) -> Result<SubNet, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Parameters of [`repair`]
pub struct RepairConfig {
    /// Permitted boundary node types of replaced hammocks
    pub hammock: HammockConfig,
    /// Repair log-only moves before searching for hammocks (skipped if `None`)
    pub prerepair: Option<PrerepairConfig>,
    /// Recompute alignments with costs that make log-only moves practically impossible
    pub suppress_log_only_moves: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            hammock: HammockConfig::default(),
            prerepair: Some(PrerepairConfig::default()),
            suppress_log_only_moves: true,
        }
    }
}

impl RepairConfig {
    /// Serialize parameters to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
    /// Deserialize parameters from JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

///
/// Errors that can occur during [`repair`]
///
#[derive(Debug, Error)]
pub enum RepairError {
    /// Alignments could not be computed
    #[error("alignment oracle failed: {0}")]
    Oracle(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The oracle did not return one alignment per trace variant
    #[error("expected {expected} alignments (one per trace variant), got {found}")]
    AlignmentCount {
        /// Number of trace variants in the log
        expected: usize,
        /// Number of returned alignments
        found: usize,
    },
    /// A sub-net could not be discovered
    #[error("subprocess miner failed: {0}")]
    Miner(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Repairing log-only moves failed
    #[error(transparent)]
    Prerepair(#[from] PrerepairError),
    /// Bad pairs could not be detected
    #[error(transparent)]
    BadPairs(#[from] BadPairsError),
    /// Bad pairs could not be covered by hammocks
    #[error(transparent)]
    Hammock(#[from] HammockError),
    /// A hammock could not be replaced
    #[error(transparent)]
    Replace(#[from] ReplaceError),
}

impl RepairError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepairError::Oracle(_)
            | RepairError::AlignmentCount { .. }
            | RepairError::Miner(_) => ErrorKind::InputConsistency,
            RepairError::Prerepair(e) => e.kind(),
            RepairError::BadPairs(e) => e.kind(),
            RepairError::Hammock(e) => e.kind(),
            RepairError::Replace(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Where the replacement of a hammock came from
pub enum ReplacementOrigin {
    /// Discovered by the subprocess miner
    Mined,
    /// The projected log had no events, so a single silent transition is used
    NoEvents,
    /// The miner returned a net without transitions, so a single silent transition is used
    EmptyModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A hammock that was replaced (node names refer to the net before the replacement)
pub struct ReplacedHammock {
    /// Name of the hammock source
    pub source: String,
    /// Name of the hammock sink
    pub sink: String,
    /// Number of nodes in the hammock
    pub nodes: usize,
    /// Labels of the visible transitions of the hammock
    pub visible_labels: Vec<String>,
    /// Where the replacement came from
    pub origin: ReplacementOrigin,
    /// Whether a silent transition skipping the replacement was added
    pub skip_added: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Summary of a [`repair`]
pub struct RepairReport {
    /// Number of transitions inserted for log-only moves
    pub inserted_log_only_transitions: usize,
    /// Detected bad pairs as (from, to, count), by node names
    pub bad_pairs: Vec<(String, String, u64)>,
    /// Replaced hammocks
    pub hammocks: Vec<ReplacedHammock>,
}

#[derive(Debug, Clone)]
/// Result of [`repair`]
pub struct RepairedNet {
    /// The repaired net
    pub net: PetriNet,
    /// Initial marking of the repaired net
    pub initial_marking: Marking,
    /// Final marking of the repaired net
    pub final_marking: Marking,
    /// What was changed
    pub report: RepairReport,
}

fn oracle_error(e: impl std::error::Error + Send + Sync + 'static) -> RepairError {
    RepairError::Oracle(Box::new(e))
}

/// Sub-net replacing `hammock`, discovered from the log projected onto its visible labels
fn discover_replacement<M: SubprocessMiner>(
    net: &PetriNet,
    hammock: &Hammock,
    log: &ActivityLog,
    miner: &M,
) -> Result<(SubNet, ReplacementOrigin, bool), RepairError> {
    let labels: HashSet<String> = hammock.visible_labels(net).into_iter().collect();
    let sub_log = log.project_onto(&labels);
    if sub_log.has_no_events() {
        warn!(
            source = %hammock.source,
            sink = %hammock.sink,
            labels = %labels.iter().sorted().join(", "),
            "no events for hammock, replacing it by a silent transition"
        );
        return Ok((SubNet::silent(), ReplacementOrigin::NoEvents, false));
    }

    let mut sub = miner
        .discover(&sub_log.log)
        .map_err(|e| RepairError::Miner(Box::new(e)))?;
    if sub.net.transition_count() == 0 {
        warn!(
            source = %hammock.source,
            sink = %hammock.sink,
            "discovered sub-net is empty, replacing hammock by a silent transition"
        );
        return Ok((SubNet::silent(), ReplacementOrigin::EmptyModel, false));
    }
    let skip = sub_log.empty_traces > 0;
    if skip {
        sub.add_skip().map_err(|e| RepairError::Miner(Box::new(e)))?;
    }
    Ok((sub, ReplacementOrigin::Mined, skip))
}

fn name_of(net: &PetriNet, id: NodeID) -> String {
    net.node_name(id).unwrap_or_default().to_string()
}

///
/// Repair `net` so that it better fits `log`
///
/// 1. Optionally insert transitions for log-only moves (see [`repair_log_only_moves`]).
/// 2. Detect bad pairs in the alignments (recomputed unless the prerepair rewrote them).
/// 3. Cover the bad pairs with disjoint hammocks.
/// 4. Replace every hammock by a sub-net discovered from the log projected onto the hammock's
///    visible labels.
/// 5. Rename all nodes successively (`p_1`, ..., `t_1`, ...).
///
/// The passed net and markings are not modified.
///
pub fn repair<O: AlignmentOracle, M: SubprocessMiner>(
    net: &PetriNet,
    initial_marking: &Marking,
    final_marking: &Marking,
    log: &ActivityLog,
    oracle: &O,
    miner: &M,
    config: &RepairConfig,
) -> Result<RepairedNet, RepairError> {
    let mut net = net.clone();
    let mut im = initial_marking.clone();
    let mut fm = final_marking.clone();
    let mut report = RepairReport::default();

    let mut rewritten_alignments = None;
    if let Some(prerepair) = &config.prerepair {
        let mut alignments = oracle
            .align(&net, &im, &fm, log, None)
            .map_err(oracle_error)?;
        let res = repair_log_only_moves(&mut net, &mut im, &mut fm, &mut alignments, prerepair)?;
        report.inserted_log_only_transitions = res.inserted.len();
        if prerepair.rewrites_alignments() {
            rewritten_alignments = Some(alignments);
        }
    }
    let alignments = match rewritten_alignments {
        Some(alignments) => alignments,
        None => {
            let costs = config
                .suppress_log_only_moves
                .then(|| AlignmentCosts::suppressing_log_moves(&net, log.max_trace_len()));
            oracle
                .align(&net, &im, &fm, log, costs.as_ref())
                .map_err(oracle_error)?
        }
    };

    if alignments.len() != log.traces.len() {
        return Err(RepairError::AlignmentCount {
            expected: log.traces.len(),
            found: alignments.len(),
        });
    }
    let aligned_variants: Vec<(AlignedTrace, u64)> = alignments
        .into_iter()
        .zip(log.traces.iter().map(|(_, count)| *count))
        .collect();
    let bad_pairs = detect_bad_pairs_in_weighted_alignments(&net, &im, &fm, &aligned_variants)?;
    report.bad_pairs = bad_pairs_by_name(&net, &bad_pairs)
        .into_iter()
        .map(|((from, to), count)| (from, to, count))
        .collect();
    let mut pairs: Vec<(NodeID, NodeID)> = bad_pairs.keys().copied().collect();
    pairs.sort();
    let hammocks = cover_pairs(&net, pairs, &config.hammock)?;
    info!(
        bad_pairs = bad_pairs.len(),
        hammocks = hammocks.len(),
        "covered bad pairs"
    );

    for hammock in &hammocks {
        let (replacement, origin, skip_added) = discover_replacement(&net, hammock, log, miner)?;
        let replaced = ReplacedHammock {
            source: name_of(&net, hammock.source),
            sink: name_of(&net, hammock.sink),
            nodes: hammock.nodes.len(),
            visible_labels: hammock.visible_labels(&net).into_iter().collect(),
            origin,
            skip_added,
        };
        let splice = replace_hammock(&mut net, &mut im, &mut fm, hammock, replacement)?;
        debug!(
            source = replaced.source.as_str(),
            sink = replaced.sink.as_str(),
            entry = %splice.entry,
            exit = %splice.exit,
            "spliced in replacement"
        );
        report.hammocks.push(replaced);
    }
    net.enumerate_nodes_successively();

    Ok(RepairedNet {
        net,
        initial_marking: im,
        final_marking: fm,
        report,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::convert::Infallible;

    use super::*;
    use crate::core::event_data::AlignmentMove;
    use crate::core::petri_net::{ArcType, PetriNetError};
    use crate::hammocks::NodeTypes;
    use crate::repair::naive_log_only::AlignmentsModificationMode;
    use crate::utils::test_utils::{add_visible, linear_net, node, nodes};

    struct FixedOracle {
        alignments: Vec<AlignedTrace>,
        calls: Cell<usize>,
        calls_with_costs: Cell<usize>,
    }

    impl FixedOracle {
        fn new(alignments: Vec<AlignedTrace>) -> Self {
            Self {
                alignments,
                calls: Cell::new(0),
                calls_with_costs: Cell::new(0),
            }
        }
    }

    impl AlignmentOracle for FixedOracle {
        type Error = Infallible;

        fn align(
            &self,
            _net: &PetriNet,
            _initial_marking: &Marking,
            _final_marking: &Marking,
            _log: &ActivityLog,
            costs: Option<&AlignmentCosts>,
        ) -> Result<Vec<AlignedTrace>, Self::Error> {
            self.calls.set(self.calls.get() + 1);
            if costs.is_some() {
                self.calls_with_costs.set(self.calls_with_costs.get() + 1);
            }
            Ok(self.alignments.clone())
        }
    }

    struct FailingOracle;

    impl AlignmentOracle for FailingOracle {
        type Error = std::io::Error;

        fn align(
            &self,
            _net: &PetriNet,
            _initial_marking: &Marking,
            _final_marking: &Marking,
            _log: &ActivityLog,
            _costs: Option<&AlignmentCosts>,
        ) -> Result<Vec<AlignedTrace>, Self::Error> {
            Err(std::io::Error::other("no alignments"))
        }
    }

    /// Discovers a sequence of the most frequent trace variant
    struct SequenceMiner;

    impl SubprocessMiner for SequenceMiner {
        type Error = PetriNetError;

        fn discover(&self, log: &ActivityLog) -> Result<SubNet, Self::Error> {
            let mut net = PetriNet::new();
            let mut last = net.add_place(None);
            let variant = log
                .trace_variants()
                .max_by_key(|(_, w)| *w)
                .map(|(t, _)| t)
                .unwrap_or_default();
            for label in variant {
                let t = add_visible(&mut net, label);
                let next = net.add_place(None);
                net.add_arc(ArcType::place_to_transition(last, t), None)?;
                net.add_arc(ArcType::transition_to_place(t, next), None)?;
                last = next;
            }
            SubNet::from_wf_net(net)
        }
    }

    fn sync(name: &str) -> AlignmentMove {
        AlignmentMove::synchronous(name.trim_end_matches("_t"), name)
    }

    fn labels(net: &PetriNet) -> BTreeSet<String> {
        net.transitions()
            .filter_map(|(_, t)| t.label.clone())
            .collect()
    }

    fn assert_wf_net(repaired: &RepairedNet) {
        let source = repaired.net.source_place().unwrap();
        let sink = repaired.net.sink_place().unwrap();
        assert_eq!(repaired.initial_marking, Marking::from([(source, 1)]));
        assert_eq!(repaired.final_marking, Marking::from([(sink, 1)]));
    }

    #[test]
    fn skipped_activity_is_removed() {
        let (net, im, fm) = linear_net();
        let log = ActivityLog::from_traces([["a", "c"]]);
        let oracle = FixedOracle::new(vec![AlignedTrace::new(vec![
            sync("a_t"),
            AlignmentMove::model_only("b_t"),
            sync("c_t"),
        ])]);
        let config = RepairConfig {
            prerepair: None,
            ..Default::default()
        };
        let repaired = repair(&net, &im, &fm, &log, &oracle, &SequenceMiner, &config).unwrap();

        assert_eq!(oracle.calls.get(), 1);
        assert_eq!(oracle.calls_with_costs.get(), 1);
        assert_eq!(
            repaired.report.bad_pairs,
            vec![("a_t".to_string(), "c_t".to_string(), 1)]
        );
        assert_eq!(repaired.report.hammocks.len(), 1);
        assert_eq!(repaired.report.hammocks[0].origin, ReplacementOrigin::Mined);
        assert!(!repaired.report.hammocks[0].skip_added);
        assert_eq!(labels(&repaired.net), BTreeSet::from(["a", "c"].map(String::from)));
        assert_wf_net(&repaired);
        assert!(repaired
            .net
            .places()
            .all(|(_, p)| p.name.starts_with("p_")));
        // The passed net is left untouched
        assert_eq!(net.transition_count(), 3);
    }

    #[test]
    fn bad_pairs_count_every_trace_of_a_variant() {
        let (net, im, fm) = linear_net();
        let log = ActivityLog::from_traces([["a", "c"], ["a", "c"], ["a", "c"]]);
        assert_eq!(log.traces.len(), 1);
        let oracle = FixedOracle::new(vec![AlignedTrace::new(vec![
            sync("a_t"),
            AlignmentMove::model_only("b_t"),
            sync("c_t"),
        ])]);
        let config = RepairConfig {
            prerepair: None,
            ..Default::default()
        };
        let repaired = repair(&net, &im, &fm, &log, &oracle, &SequenceMiner, &config).unwrap();
        assert_eq!(
            repaired.report.bad_pairs,
            vec![("a_t".to_string(), "c_t".to_string(), 3)]
        );
    }

    #[test]
    fn one_alignment_per_variant_is_required() {
        let (net, im, fm) = linear_net();
        let log = ActivityLog::from_traces([vec!["a", "c"], vec!["a", "b", "c"]]);
        let oracle = FixedOracle::new(vec![AlignedTrace::new(vec![
            sync("a_t"),
            sync("b_t"),
            sync("c_t"),
        ])]);
        let config = RepairConfig {
            prerepair: None,
            ..Default::default()
        };
        let err = repair(&net, &im, &fm, &log, &oracle, &SequenceMiner, &config).unwrap_err();
        assert!(matches!(
            err,
            RepairError::AlignmentCount {
                expected: 2,
                found: 1
            }
        ));
        assert_eq!(err.kind(), ErrorKind::InputConsistency);
    }

    #[test]
    fn log_only_moves_are_repaired_first() {
        let (net, im, fm) = linear_net();
        let log = ActivityLog::from_traces([["a", "x", "b", "c"]]);
        let oracle = FixedOracle::new(vec![AlignedTrace::new(vec![
            sync("a_t"),
            AlignmentMove::log_only("x"),
            sync("b_t"),
            sync("c_t"),
        ])]);
        let config = RepairConfig {
            prerepair: Some(PrerepairConfig {
                alignments_modification: AlignmentsModificationMode::LogToModel,
            }),
            ..Default::default()
        };
        let repaired = repair(&net, &im, &fm, &log, &oracle, &SequenceMiner, &config).unwrap();

        assert_eq!(oracle.calls.get(), 1);
        assert_eq!(repaired.report.inserted_log_only_transitions, 1);
        assert_eq!(
            repaired.report.bad_pairs,
            vec![("a_t".to_string(), "b_t".to_string(), 1)]
        );
        assert_eq!(
            labels(&repaired.net),
            BTreeSet::from(["a", "b", "c", "x"].map(String::from))
        );
        assert_wf_net(&repaired);
    }

    #[test]
    fn fitting_alignments_change_nothing_but_names() {
        let (net, im, fm) = linear_net();
        let log = ActivityLog::from_traces([["a", "b", "c"]]);
        let oracle = FixedOracle::new(vec![AlignedTrace::new(vec![
            sync("a_t"),
            sync("b_t"),
            sync("c_t"),
        ])]);
        let repaired = repair(
            &net,
            &im,
            &fm,
            &log,
            &oracle,
            &SequenceMiner,
            &RepairConfig::default(),
        )
        .unwrap();

        assert_eq!(oracle.calls.get(), 2);
        assert_eq!(oracle.calls_with_costs.get(), 1);
        assert_eq!(repaired.report, RepairReport::default());
        assert_eq!(repaired.net.arc_count(), net.arc_count());
        let names: BTreeSet<&str> = repaired.net.transitions().map(|(_, t)| t.name.as_str()).collect();
        assert_eq!(names, BTreeSet::from(["t_1", "t_2", "t_3"]));
        assert_wf_net(&repaired);
    }

    #[test]
    fn replacement_discovery_policies() {
        let (net, _, _) = linear_net();
        let hammock = Hammock::new(node(&net, "p1"), node(&net, "p2"), nodes(&net, &["b_t"]));

        let log = ActivityLog::from_traces([vec!["a", "b"], vec!["a"]]);
        let (sub, origin, skip) = discover_replacement(&net, &hammock, &log, &SequenceMiner).unwrap();
        assert_eq!(origin, ReplacementOrigin::Mined);
        assert!(skip);
        assert_eq!(sub.net.transition_count(), 2);

        let log = ActivityLog::from_traces([["a", "c"]]);
        let (sub, origin, skip) = discover_replacement(&net, &hammock, &log, &SequenceMiner).unwrap();
        assert_eq!(origin, ReplacementOrigin::NoEvents);
        assert!(!skip);
        assert_eq!(sub.net.transition_count(), 1);
    }

    #[test]
    fn oracle_errors_are_reported() {
        let (net, im, fm) = linear_net();
        let log = ActivityLog::from_traces([["a"]]);
        let err = repair(
            &net,
            &im,
            &fm,
            &log,
            &FailingOracle,
            &SequenceMiner,
            &RepairConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RepairError::Oracle(_)));
        assert_eq!(err.kind(), ErrorKind::InputConsistency);
    }

    #[test]
    fn config_json() {
        let config = RepairConfig {
            hammock: HammockConfig::uniform(NodeTypes::PLACE | NodeTypes::VISIBLE_TRANSITION),
            prerepair: None,
            suppress_log_only_moves: false,
        };
        let json = config.to_json().unwrap();
        assert_eq!(RepairConfig::from_json(&json).unwrap(), config);
    }
}
