use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::petri_net::{PetriNet, TransitionID};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
/// One step of an alignment between a trace and a [`PetriNet`]
///
/// Transitions are referred to by their (unique) name
pub enum AlignmentMove {
    /// The log contains an event the model cannot mimic
    LogOnly {
        /// Activity of the event
        activity: String,
    },
    /// The model fires a transition without a matching event
    ModelOnly {
        /// Name of the fired transition
        transition: String,
    },
    /// Log and model move together
    Synchronous {
        /// Activity of the event
        activity: String,
        /// Name of the fired transition
        transition: String,
    },
}

impl AlignmentMove {
    /// Log-only move on `activity`
    pub fn log_only(activity: impl Into<String>) -> Self {
        AlignmentMove::LogOnly {
            activity: activity.into(),
        }
    }
    /// Model-only move firing the transition named `transition`
    pub fn model_only(transition: impl Into<String>) -> Self {
        AlignmentMove::ModelOnly {
            transition: transition.into(),
        }
    }
    /// Synchronous move of `activity` and the transition named `transition`
    pub fn synchronous(activity: impl Into<String>, transition: impl Into<String>) -> Self {
        AlignmentMove::Synchronous {
            activity: activity.into(),
            transition: transition.into(),
        }
    }
    /// Name of the fired transition (None for log-only moves)
    pub fn transition(&self) -> Option<&str> {
        match self {
            AlignmentMove::LogOnly { .. } => None,
            AlignmentMove::ModelOnly { transition }
            | AlignmentMove::Synchronous { transition, .. } => Some(transition),
        }
    }
    /// Activity of the log event (None for model-only moves)
    pub fn activity(&self) -> Option<&str> {
        match self {
            AlignmentMove::LogOnly { activity } | AlignmentMove::Synchronous { activity, .. } => {
                Some(activity)
            }
            AlignmentMove::ModelOnly { .. } => None,
        }
    }
    /// Whether this is a log-only move
    pub fn is_log_only(&self) -> bool {
        matches!(self, AlignmentMove::LogOnly { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Alignment of a single trace: a sequence of [`AlignmentMove`]s
pub struct AlignedTrace {
    /// Moves in order of execution
    pub moves: Vec<AlignmentMove>,
}

impl AlignedTrace {
    /// Create a new aligned trace
    pub fn new(moves: Vec<AlignmentMove>) -> Self {
        Self { moves }
    }
    /// Number of moves
    pub fn len(&self) -> usize {
        self.moves.len()
    }
    /// Whether the alignment contains no moves
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl From<Vec<AlignmentMove>> for AlignedTrace {
    fn from(moves: Vec<AlignmentMove>) -> Self {
        Self::new(moves)
    }
}

/// Cost of log-only moves, large enough that any model detour is cheaper
pub const SUPPRESSED_LOG_MOVE_COST: u32 = 10_000;
/// Cost of a model-only move on a visible transition when log-only moves are suppressed
pub const VISIBLE_MODEL_MOVE_COST: u32 = 100;
/// Cost of a model-only move on a silent transition when log-only moves are suppressed
pub const SILENT_MODEL_MOVE_COST: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Custom move costs handed to an alignment oracle
pub struct AlignmentCosts {
    /// Cost of a model-only move per transition
    pub model_move: HashMap<TransitionID, u32>,
    /// Cost of a synchronous move per (visible) transition
    pub sync_move: HashMap<TransitionID, u32>,
    /// Cost of a log-only move per trace position
    pub log_move: Vec<u32>,
}

impl AlignmentCosts {
    /// Costs that make log-only moves practically impossible
    ///
    /// Deviations then show up as model-only moves, which the bad-pair detection can use
    pub fn suppressing_log_moves(net: &PetriNet, max_trace_len: usize) -> Self {
        let mut model_move = HashMap::new();
        let mut sync_move = HashMap::new();
        for (id, t) in net.transitions() {
            if t.is_hidden() {
                model_move.insert(id, SILENT_MODEL_MOVE_COST);
            } else {
                model_move.insert(id, VISIBLE_MODEL_MOVE_COST);
                sync_move.insert(id, 0);
            }
        }
        Self {
            model_move,
            sync_move,
            log_move: vec![SUPPRESSED_LOG_MOVE_COST; max_trace_len],
        }
    }
}
