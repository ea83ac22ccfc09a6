use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Event log projected on just activity labels
///
/// Identical traces are stored once, together with their frequency
pub struct ActivityLog {
    /// All activities, indexed by their position
    pub activities: Vec<String>,
    /// Reverse lookup of `activities`
    pub act_to_index: HashMap<String, usize>,
    /// Trace variants (as activity indices) with their number of occurrences
    pub traces: Vec<(Vec<usize>, u64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Result of projecting an [`ActivityLog`] onto a set of activities
pub struct SubLog {
    /// Projected log (without traces that became empty)
    pub log: ActivityLog,
    /// Number of traces that became empty through the projection
    pub empty_traces: u64,
}

impl SubLog {
    /// Whether the projection kept no event at all
    pub fn has_no_events(&self) -> bool {
        self.log.num_events() == 0
    }
}

impl ActivityLog {
    /// Build a log from traces given as sequences of activity names
    pub fn from_traces<I, T, S>(traces: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut log = Self::default();
        let mut variant_index: HashMap<Vec<usize>, usize> = HashMap::new();
        for trace in traces {
            let acts: Vec<usize> = trace
                .into_iter()
                .map(|act| log.activity_index(act.as_ref()))
                .collect();
            log.add_trace_variant(&mut variant_index, acts, 1);
        }
        log
    }

    fn activity_index(&mut self, act: &str) -> usize {
        if let Some(index) = self.act_to_index.get(act) {
            return *index;
        }
        let new_act_index = self.activities.len();
        self.activities.push(act.to_string());
        self.act_to_index.insert(act.to_string(), new_act_index);
        new_act_index
    }

    /// Count `weight` more occurrences of `acts`; `variant_index` maps variants to their position in `traces`
    fn add_trace_variant(
        &mut self,
        variant_index: &mut HashMap<Vec<usize>, usize>,
        acts: Vec<usize>,
        weight: u64,
    ) {
        match variant_index.get(&acts) {
            Some(&i) => self.traces[i].1 += weight,
            None => {
                variant_index.insert(acts.clone(), self.traces.len());
                self.traces.push((acts, weight));
            }
        }
    }

    /// Total number of traces (counting duplicates)
    pub fn num_traces(&self) -> u64 {
        self.traces.iter().map(|(_, w)| w).sum()
    }

    /// Total number of events (counting duplicates)
    pub fn num_events(&self) -> u64 {
        self.traces.iter().map(|(t, w)| t.len() as u64 * w).sum()
    }

    /// Length of the longest trace
    pub fn max_trace_len(&self) -> usize {
        self.traces.iter().map(|(t, _)| t.len()).max().unwrap_or(0)
    }

    /// Trace variants as activity names with their frequency
    pub fn trace_variants(&self) -> impl Iterator<Item = (Vec<&str>, u64)> + '_ {
        self.traces.iter().map(|(t, w)| {
            (
                t.iter().map(|a| self.activities[*a].as_str()).collect(),
                *w,
            )
        })
    }

    /// Keep only events whose activity is contained in `activities`
    pub fn project_onto(&self, activities: &HashSet<String>) -> SubLog {
        let kept: HashSet<usize> = activities
            .iter()
            .filter_map(|a| self.act_to_index.get(a).copied())
            .collect();
        let projected: Vec<(Vec<usize>, u64)> = self
            .traces
            .par_iter()
            .map(|(t, w)| {
                (
                    t.iter().copied().filter(|a| kept.contains(a)).collect(),
                    *w,
                )
            })
            .collect();

        let mut sub_log = SubLog::default();
        let mut variant_index: HashMap<Vec<usize>, usize> = HashMap::new();
        for (trace, w) in projected {
            if trace.is_empty() {
                sub_log.empty_traces += w;
                continue;
            }
            let acts: Vec<usize> = trace
                .into_iter()
                .map(|a| sub_log.log.activity_index(&self.activities[a]))
                .collect();
            sub_log.log.add_trace_variant(&mut variant_index, acts, w);
        }
        sub_log
    }
}
