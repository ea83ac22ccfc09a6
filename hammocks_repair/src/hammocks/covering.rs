//! Covering groups of linked nodes with disjoint hammocks
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::hammock::{Hammock, HammockConfig};
use super::minimal_hammock::{find_minimal_hammock, HammockError};
use crate::core::petri_net::{NodeID, PetriNet, PlaceID};
use crate::utils::dsu::DisjointSets;

/// Build the "must be covered together" relation
///
/// Every pair is linked; additionally every visible transition is linked with all transitions
/// of the net carrying the same label.
fn link_nodes(
    net: &PetriNet,
    pairs: impl IntoIterator<Item = (NodeID, NodeID)>,
) -> Result<DisjointSets<NodeID>, HammockError> {
    let mut dsu = DisjointSets::new();
    for (a, b) in pairs {
        for n in [a, b] {
            if !net.contains_node(n) {
                return Err(HammockError::UnknownNode(n));
            }
        }
        dsu.union(a, b);
    }
    let constrained: Vec<NodeID> = dsu.components().into_iter().flatten().collect();
    for node in constrained {
        let label = node
            .as_transition()
            .and_then(|t| net.transition(t))
            .and_then(|t| t.label.as_deref());
        if let Some(label) = label {
            for same_label in net.transitions_by_label(label) {
                dsu.union(node, same_label.into());
            }
        }
    }
    Ok(dsu)
}

///
/// Cover every pair of nodes with a common hammock
///
/// Overlapping hammocks are merged, so the returned hammocks are pairwise disjoint.
/// The net has to be a WF-net (unique source and sink place).
///
pub fn cover_pairs(
    net: &PetriNet,
    pairs: impl IntoIterator<Item = (NodeID, NodeID)>,
    config: &HammockConfig,
) -> Result<Vec<Hammock>, HammockError> {
    let net_source = net.source_place()?;
    let net_sink = net.sink_place()?;
    cover_pairs_between(net, pairs, net_source, net_sink, config)
}

///
/// Same as [`cover_pairs`], with explicitly given source and sink places of the net
///
pub fn cover_pairs_between(
    net: &PetriNet,
    pairs: impl IntoIterator<Item = (NodeID, NodeID)>,
    net_source: PlaceID,
    net_sink: PlaceID,
    config: &HammockConfig,
) -> Result<Vec<Hammock>, HammockError> {
    let mut dsu = link_nodes(net, pairs)?;
    let components = dsu.components();
    let component_of: HashMap<NodeID, usize> = components
        .iter()
        .enumerate()
        .flat_map(|(i, c)| c.iter().map(move |n| (*n, i)))
        .collect();
    let mut processed = vec![false; components.len()];

    let mut hammocks: Vec<Option<Hammock>> = Vec::new();
    let mut owner: HashMap<NodeID, usize> = HashMap::new();

    for (c, component) in components.iter().enumerate() {
        if processed[c] {
            continue;
        }
        processed[c] = true;
        let owners: BTreeSet<Option<usize>> =
            component.iter().map(|n| owner.get(n).copied()).collect();
        if owners.len() == 1 && !owners.contains(&None) {
            continue;
        }

        let mut working: BTreeSet<NodeID> = component.iter().copied().collect();
        loop {
            let hammock =
                find_minimal_hammock(net, working.iter().copied(), net_source, net_sink, config)?;
            let mut absorbed = false;
            for node in &hammock.nodes {
                if let Some(h) = owner.get(node).copied() {
                    if let Some(other) = hammocks[h].take() {
                        debug!(
                            source = %other.source,
                            sink = %other.sink,
                            "merging overlapping hammock"
                        );
                        for n in &other.nodes {
                            owner.remove(n);
                        }
                        working.extend(other.nodes);
                        absorbed = true;
                    }
                }
                if let Some(&c2) = component_of.get(node) {
                    if !processed[c2] {
                        processed[c2] = true;
                        working.extend(components[c2].iter().copied());
                        absorbed = true;
                    }
                }
            }
            if !absorbed {
                let slot = hammocks.len();
                for n in &hammock.nodes {
                    owner.insert(*n, slot);
                }
                debug!(
                    source = %hammock.source,
                    sink = %hammock.sink,
                    nodes = hammock.nodes.len(),
                    "hammock covers component"
                );
                hammocks.push(Some(hammock));
                break;
            }
            working.extend(hammock.nodes);
        }
    }

    Ok(hammocks.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::core::petri_net::ArcType;
    use crate::hammocks::hammock::NodeTypes;
    use crate::utils::test_utils::{linear_net, node, nodes, repair_shop_net};

    fn pairs(net: &PetriNet, names: &[(&str, &str)]) -> Vec<(NodeID, NodeID)> {
        names
            .iter()
            .map(|(a, b)| (node(net, a), node(net, b)))
            .collect()
    }

    fn expected(net: &PetriNet, source: &str, sink: &str, names: &[&str]) -> Hammock {
        Hammock::new(node(net, source), node(net, sink), nodes(net, names))
    }

    const VENDORS: [&str; 10] = [
        "order_parts_t",
        "1st_vendor_t",
        "2nd_vendor_t",
        "no_1st_vendor_hidden_t",
        "no_2nd_vendor_hidden_t",
        "finished_order_hidden_t",
        "p7",
        "p8",
        "p10",
        "p11",
    ];

    #[test]
    fn non_intersecting_hammocks() {
        let (net, _, _) = repair_shop_net();
        let linked = pairs(
            &net,
            &[("order_parts_t", "1st_vendor_t"), ("complete_repair_t", "p9")],
        );
        let res = cover_pairs(&net, linked, &HammockConfig::uniform(NodeTypes::ALL)).unwrap();
        let expected_hammocks = HashSet::from([
            expected(&net, "order_parts_t", "finished_order_hidden_t", &VENDORS),
            expected(&net, "complete_repair_t", "p9", &[]),
        ]);
        assert_eq!(res.len(), 2);
        assert_eq!(res.into_iter().collect::<HashSet<_>>(), expected_hammocks);
    }

    #[test]
    fn intersecting_hammocks() {
        let (net, _, _) = repair_shop_net();
        let linked = pairs(
            &net,
            &[("order_parts_t", "1st_vendor_t"), ("complete_repair_t", "p9")],
        );
        let res = cover_pairs(&net, linked, &HammockConfig::uniform(NodeTypes::PLACE)).unwrap();
        let mut names = VENDORS.to_vec();
        names.extend(["complete_repair_t", "no_parts_hidden_t", "p6", "p9", "p17"]);
        assert_eq!(res, vec![expected(&net, "p6", "p9", &names)]);
    }

    #[test]
    fn absorbs_earlier_hammock() {
        let (net, _, _) = repair_shop_net();
        let linked = pairs(
            &net,
            &[
                ("1st_vendor_t", "2nd_vendor_t"),
                ("no_parts_hidden_t", "finished_order_hidden_t"),
            ],
        );
        let res = cover_pairs(&net, linked, &HammockConfig::uniform(NodeTypes::ALL)).unwrap();
        let mut names = VENDORS.to_vec();
        names.extend(["no_parts_hidden_t", "p6", "p17"]);
        assert_eq!(res, vec![expected(&net, "p6", "p17", &names)]);
    }

    #[test]
    fn covering_is_idempotent() {
        let (net, _, _) = repair_shop_net();
        let config = HammockConfig::uniform(NodeTypes::ALL);
        let linked = pairs(
            &net,
            &[
                ("order_parts_t", "1st_vendor_t"),
                ("complete_repair_t", "p9"),
                ("client_came_t", "sell_device_t"),
            ],
        );
        let first: HashSet<Hammock> = cover_pairs(&net, linked, &config)
            .unwrap()
            .into_iter()
            .collect();
        let again: HashSet<Hammock> =
            cover_pairs(&net, first.iter().map(|h| (h.source, h.sink)), &config)
                .unwrap()
                .into_iter()
                .collect();
        assert_eq!(first, again);
    }

    #[test]
    fn same_labels_are_covered_together() {
        let (mut net, _, _) = linear_net();
        let c = net.transition_by_name("c_t").unwrap();
        if let Some(t) = net.transition_mut(c) {
            t.label = Some("a".into());
        }
        let linked = pairs(&net, &[("a_t", "p1")]);
        let res = cover_pairs(&net, linked, &HammockConfig::default()).unwrap();
        assert_eq!(res.len(), 1);
        assert!(res[0].contains(c.into()));
        assert_eq!(res[0].source, node(&net, "start"));
        assert_eq!(res[0].sink, node(&net, "end"));
    }

    #[test]
    fn requires_wf_net() {
        let (mut net, _, _) = linear_net();
        let extra = net.add_place(None);
        let b = net.transition_by_name("b_t").unwrap();
        net.add_arc(ArcType::transition_to_place(b, extra), None)
            .unwrap();
        let linked = pairs(&net, &[("a_t", "b_t")]);
        let err = cover_pairs(&net, linked, &HammockConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InputConsistency);
        assert!(cover_pairs(&net, Vec::<(NodeID, NodeID)>::new(), &HammockConfig::default()).is_err());
    }
}
