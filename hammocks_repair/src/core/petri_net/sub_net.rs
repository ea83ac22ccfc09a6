use serde::{Deserialize, Serialize};

use super::petri_net_struct::{ArcType, PetriNet, PetriNetError, PlaceID, TransitionID};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A [`PetriNet`] with an explicit entry and exit place
///
/// Used as the replacement of a hammock
pub struct SubNet {
    /// The net itself
    pub net: PetriNet,
    /// Entry place
    pub source: PlaceID,
    /// Exit place
    pub sink: PlaceID,
}

impl SubNet {
    /// Wrap a WF-net, using its unique source and sink places as entry and exit
    pub fn from_wf_net(net: PetriNet) -> Result<Self, PetriNetError> {
        let source = net.source_place()?;
        let sink = net.sink_place()?;
        Ok(Self { net, source, sink })
    }

    /// Two places joined by a single silent transition
    pub fn silent() -> Self {
        let mut net = PetriNet::new();
        let source = net.add_place(None);
        let sink = net.add_place(None);
        let tau = net.add_transition(None, None);
        let mut sub = Self { net, source, sink };
        let connected = sub.connect(source, tau, sink);
        debug_assert!(connected.is_ok(), "nodes were created in this net");
        sub
    }

    /// Add a silent transition from the entry to the exit place
    ///
    /// Allows skipping the whole sub-net. Fails (without changing the net) if the entry or
    /// exit place is not part of the net.
    pub fn add_skip(&mut self) -> Result<TransitionID, PetriNetError> {
        for place in [self.source, self.sink] {
            if !self.net.contains_node(place.into()) {
                return Err(PetriNetError::UnknownNode(place.into()));
            }
        }
        let tau = self.net.add_transition(None, None);
        self.connect(self.source, tau, self.sink)?;
        Ok(tau)
    }

    fn connect(
        &mut self,
        from: PlaceID,
        t: TransitionID,
        to: PlaceID,
    ) -> Result<(), PetriNetError> {
        self.net.add_arc(ArcType::place_to_transition(from, t), None)?;
        self.net.add_arc(ArcType::transition_to_place(t, to), None)
    }
}
