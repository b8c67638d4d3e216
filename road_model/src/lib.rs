//! Roads with curved reference lines and lane sections, the junctions joining them, and queries
//! between world and road coordinates.

#[macro_use]
mod macros;

mod edits;
mod error;
mod make;
mod map;
mod objects;
mod query;
pub mod raw;

pub use crate::edits::{EditEffects, MapObserver};
pub use crate::error::MapError;
pub use crate::make::{
    classify, collect_entries, collect_entry_batches, entries_for_road_end, synthesize,
    synthesize_all, JunctionEntry, ManeuverType, Synthesis, STRAIGHT_TOLERANCE_DEGS,
};
pub use crate::map::{DrivingSide, IdAllocator, IdKind, Map, MapConfig, SequentialIds};
pub use crate::objects::junction::{Junction, JunctionConnection, JunctionID, LaneLink};
pub use crate::objects::lane::{Lane, LaneSection, LaneSide, LaneType};
pub use crate::objects::road::{ContactPoint, CubicPoly, Road, RoadID, RoadLink};
pub use crate::query::{Direction, LaneRef, LaneView, RoadPosition};
