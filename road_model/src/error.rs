use std::{error, fmt};

use crate::{ContactPoint, JunctionID, RoadID};

/// Everything that can go wrong looking something up in or editing a `Map`. Not-found cases are
/// expected mid-edit, so they're values, never panics.
#[derive(Clone, Debug, PartialEq)]
pub enum MapError {
    RoadNotFound(RoadID),
    JunctionNotFound(JunctionID),
    LaneNotFoundAtS {
        road: RoadID,
        lane: i32,
        s: f64,
    },
    NoLaneSection {
        road: RoadID,
        s: f64,
    },
    InvalidGeometry {
        road: RoadID,
        reason: String,
    },
    DuplicateS {
        road: RoadID,
        s: f64,
    },
    DuplicateLaneId {
        road: RoadID,
        s: f64,
        lane: i32,
    },
    NonContiguousLanes {
        road: RoadID,
        s: f64,
        ids: Vec<i32>,
    },
    /// Road ends that should be merged into one junction already belong to different ones, or
    /// a road would be moved from one junction to another.
    DuplicateJunctionMembership {
        junctions: Vec<JunctionID>,
    },
    DuplicateConnection {
        junction: JunctionID,
        incoming: RoadID,
        connecting: RoadID,
        contact: ContactPoint,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MapError::RoadNotFound(r) => write!(f, "{} doesn't exist", r),
            MapError::JunctionNotFound(j) => write!(f, "{} doesn't exist", j),
            MapError::LaneNotFoundAtS { road, lane, s } => {
                write!(f, "{} has no lane {} at s={}", road, lane, s)
            }
            MapError::NoLaneSection { road, s } => {
                write!(f, "{} has no lane section covering s={}", road, s)
            }
            MapError::InvalidGeometry { road, reason } => {
                write!(f, "{} has invalid geometry: {}", road, reason)
            }
            MapError::DuplicateS { road, s } => {
                write!(f, "{} already has a lane section at s={}", road, s)
            }
            MapError::DuplicateLaneId { road, s, lane } => write!(
                f,
                "{} already has lane {} in the lane section at s={}",
                road, lane, s
            ),
            MapError::NonContiguousLanes { road, s, ids } => write!(
                f,
                "Lane ids {:?} of {} at s={} don't form contiguous runs from the center",
                ids, road, s
            ),
            MapError::DuplicateJunctionMembership { junctions } => {
                write!(f, "Road ends belong to multiple junctions: ")?;
                for (idx, j) in junctions.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", j)?;
                }
                write!(f, "; merge them manually")
            }
            MapError::DuplicateConnection {
                junction,
                incoming,
                connecting,
                contact,
            } => write!(
                f,
                "{} already connects {} via {} ({:?})",
                junction, incoming, connecting, contact
            ),
        }
    }
}

impl error::Error for MapError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_anyhow() {
        fn lookup() -> anyhow::Result<()> {
            Err(MapError::RoadNotFound(RoadID(7)))?;
            Ok(())
        }
        assert_eq!(lookup().unwrap_err().to_string(), "Road #7 doesn't exist");

        let ambiguous = MapError::DuplicateJunctionMembership {
            junctions: vec![JunctionID(1), JunctionID(2)],
        };
        assert_eq!(
            ambiguous.to_string(),
            "Road ends belong to multiple junctions: Junction #1, Junction #2; merge them manually"
        );
    }
}
