//! Sample nets shared by the tests of this crate
use crate::core::petri_net::{ArcType, Marking, NodeID, PetriNet, PlaceID, TransitionID};

/// Add a visible transition named `{label}_t` (spaces replaced by underscores)
pub fn add_visible(net: &mut PetriNet, label: &str) -> TransitionID {
    net.add_transition(
        Some(label.to_string()),
        Some(format!("{}_t", label.replace(' ', "_"))),
    )
}

/// Add a silent transition named `{alias}_hidden_t`
pub fn add_hidden(net: &mut PetriNet, alias: &str) -> TransitionID {
    net.add_transition(None, Some(format!("{}_hidden_t", alias.replace(' ', "_"))))
}

/// Connect two nodes by name, one of them must be a place and the other a transition
pub fn connect(net: &mut PetriNet, from: &str, to: &str) {
    let from_to = ArcType::between(node(net, from), node(net, to))
        .unwrap_or_else(|| panic!("cannot connect {from} and {to}"));
    net.add_arc(from_to, None).unwrap();
}

/// Look up a node by its name
pub fn node(net: &PetriNet, name: &str) -> NodeID {
    net.node_by_name(name)
        .unwrap_or_else(|| panic!("no node named {name}"))
}

/// Look up several nodes by their names
pub fn nodes(net: &PetriNet, names: &[&str]) -> Vec<NodeID> {
    names.iter().map(|n| node(net, n)).collect()
}

/// Look up a place by its name
pub fn place(net: &PetriNet, name: &str) -> PlaceID {
    net.place_by_name(name)
        .unwrap_or_else(|| panic!("no place named {name}"))
}

fn marking_of(place: PlaceID) -> Marking {
    Marking::from([(place, 1)])
}

/// Repair shop process with 17 inner places
///
/// A device is taken, inspected and registered; the repair possibly orders parts from
/// two vendors, is tested, and afterwards the client is informed and either pays,
/// causes trouble (court) or never shows up (device is sold).
pub fn repair_shop_net() -> (PetriNet, Marking, Marking) {
    let mut net = PetriNet::new();
    let start = net.add_place(Some("start".into()));
    for i in 1..=17 {
        net.add_place(Some(format!("p{i}")));
    }
    let end = net.add_place(Some("end".into()));

    for label in [
        "take device",
        "inspect",
        "add to the db",
        "start repair",
        "order parts",
        "1st vendor",
        "2nd vendor",
        "complete repair",
        "test repair",
        "repair finished",
        "inform client",
        "client came",
        "client didnt come",
        "troubles with client",
        "received payment",
        "court",
        "sell device",
    ] {
        add_visible(&mut net, label);
    }
    for alias in [
        "admit helplessness",
        "no 1st vendor",
        "no 2nd vendor",
        "no parts",
        "finished order",
    ] {
        add_hidden(&mut net, alias);
    }

    for (from, to) in [
        ("start", "take_device_t"),
        ("take_device_t", "p1"),
        ("take_device_t", "p4"),
        ("p1", "inspect_t"),
        ("inspect_t", "p2"),
        ("p4", "add_to_the_db_t"),
        ("add_to_the_db_t", "p5"),
        ("p2", "start_repair_t"),
        ("p2", "admit_helplessness_hidden_t"),
        ("admit_helplessness_hidden_t", "p12"),
        ("start_repair_t", "p6"),
        ("p6", "order_parts_t"),
        ("p6", "no_parts_hidden_t"),
        ("no_parts_hidden_t", "p17"),
        ("order_parts_t", "p7"),
        ("order_parts_t", "p8"),
        ("p7", "1st_vendor_t"),
        ("p7", "no_1st_vendor_hidden_t"),
        ("1st_vendor_t", "p10"),
        ("no_1st_vendor_hidden_t", "p10"),
        ("p8", "2nd_vendor_t"),
        ("p8", "no_2nd_vendor_hidden_t"),
        ("2nd_vendor_t", "p11"),
        ("no_2nd_vendor_hidden_t", "p11"),
        ("p10", "finished_order_hidden_t"),
        ("p11", "finished_order_hidden_t"),
        ("finished_order_hidden_t", "p17"),
        ("p17", "complete_repair_t"),
        ("complete_repair_t", "p9"),
        ("p9", "test_repair_t"),
        ("test_repair_t", "p12"),
        ("p5", "repair_finished_t"),
        ("p12", "repair_finished_t"),
        ("repair_finished_t", "p13"),
        ("p13", "inform_client_t"),
        ("inform_client_t", "p14"),
        ("p14", "client_came_t"),
        ("p14", "client_didnt_come_t"),
        ("client_came_t", "p16"),
        ("client_didnt_come_t", "p15"),
        ("p16", "troubles_with_client_t"),
        ("p16", "received_payment_t"),
        ("troubles_with_client_t", "p3"),
        ("p3", "court_t"),
        ("court_t", "end"),
        ("received_payment_t", "end"),
        ("p15", "sell_device_t"),
        ("sell_device_t", "end"),
    ] {
        connect(&mut net, from, to);
    }

    (net, marking_of(start), marking_of(end))
}

/// Net with a self-loop (`b`), a cycle between `p2` and `p4` (`e`, `f`) and a silent start (`a`)
pub fn loop_net() -> (PetriNet, Marking, Marking) {
    let mut net = PetriNet::new();
    let start = net.add_place(Some("start".into()));
    for i in 1..=4 {
        net.add_place(Some(format!("p{i}")));
    }
    let end = net.add_place(Some("end".into()));
    add_hidden(&mut net, "a");
    for label in ["b", "c", "d", "e", "f"] {
        add_visible(&mut net, label);
    }
    for (from, to) in [
        ("start", "a_hidden_t"),
        ("a_hidden_t", "p1"),
        ("p1", "b_t"),
        ("b_t", "p1"),
        ("p1", "c_t"),
        ("c_t", "p2"),
        ("c_t", "p3"),
        ("p2", "e_t"),
        ("e_t", "p4"),
        ("p4", "f_t"),
        ("f_t", "p2"),
        ("p2", "d_t"),
        ("p3", "d_t"),
        ("d_t", "end"),
    ] {
        connect(&mut net, from, to);
    }
    (net, marking_of(start), marking_of(end))
}

/// Sequence `start -> a -> p1 -> b -> p2 -> c -> end`
pub fn linear_net() -> (PetriNet, Marking, Marking) {
    let mut net = PetriNet::new();
    let start = net.add_place(Some("start".into()));
    net.add_place(Some("p1".into()));
    net.add_place(Some("p2".into()));
    let end = net.add_place(Some("end".into()));
    for label in ["a", "b", "c"] {
        add_visible(&mut net, label);
    }
    for (from, to) in [
        ("start", "a_t"),
        ("a_t", "p1"),
        ("p1", "b_t"),
        ("b_t", "p2"),
        ("p2", "c_t"),
        ("c_t", "end"),
    ] {
        connect(&mut net, from, to);
    }
    (net, marking_of(start), marking_of(end))
}
