use std::collections::BTreeSet;

use crate::{JunctionID, RoadID};

/// Receives change notifications after a batch of map operations. Rendering or other derived
/// state lives on the other side of this.
pub trait MapObserver {
    fn road_changed(&mut self, id: RoadID);
    fn junction_changed(&mut self, id: JunctionID);
}

/// What a map operation touched. Core operations return this instead of notifying anybody; the
/// caller decides when to forward it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditEffects {
    pub added_roads: BTreeSet<RoadID>,
    pub changed_roads: BTreeSet<RoadID>,
    pub added_junctions: BTreeSet<JunctionID>,
    pub changed_junctions: BTreeSet<JunctionID>,
}

impl EditEffects {
    pub fn new() -> EditEffects {
        EditEffects::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added_roads.is_empty()
            && self.changed_roads.is_empty()
            && self.added_junctions.is_empty()
            && self.changed_junctions.is_empty()
    }

    pub fn merge(&mut self, other: EditEffects) {
        self.added_roads.extend(other.added_roads);
        self.changed_roads.extend(other.changed_roads);
        self.added_junctions.extend(other.added_junctions);
        self.changed_junctions.extend(other.changed_junctions);
        // Something added in this batch is just added, even if it also changed later
        self.changed_roads.retain(|r| !self.added_roads.contains(r));
        self.changed_junctions
            .retain(|j| !self.added_junctions.contains(j));
    }

    /// Tells the observer about every added or changed object, each once.
    pub fn notify(&self, observer: &mut dyn MapObserver) {
        for r in self.added_roads.union(&self.changed_roads) {
            observer.road_changed(*r);
        }
        for j in self.added_junctions.union(&self.changed_junctions) {
            observer.junction_changed(*j);
        }
    }
}
