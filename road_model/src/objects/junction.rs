use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ContactPoint, MapError, RoadID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JunctionID(pub i64);

impl fmt::Display for JunctionID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Junction #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneLink {
    /// Lane on the incoming road
    pub from: i32,
    /// Lane on the connecting road
    pub to: i32,
}

/// How traffic from one incoming road enters a connecting road.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JunctionConnection {
    pub id: i64,
    pub incoming_road: RoadID,
    pub connecting_road: RoadID,
    /// The end of the connecting road attached to the incoming road.
    pub contact_point: ContactPoint,
    /// Where the connecting road leads, if known.
    pub outgoing_road: Option<RoadID>,
    lane_links: Vec<LaneLink>,
}

impl JunctionConnection {
    pub fn new(
        id: i64,
        incoming_road: RoadID,
        connecting_road: RoadID,
        contact_point: ContactPoint,
    ) -> JunctionConnection {
        JunctionConnection {
            id,
            incoming_road,
            connecting_road,
            contact_point,
            outgoing_road: None,
            lane_links: Vec::new(),
        }
    }

    pub fn lane_links(&self) -> &Vec<LaneLink> {
        &self.lane_links
    }

    /// Returns false and changes nothing if there's already a link from this lane.
    pub fn add_lane_link(&mut self, from: i32, to: i32) -> bool {
        if self.link_from(from).is_some() {
            return false;
        }
        self.lane_links.push(LaneLink { from, to });
        true
    }

    pub fn link_from(&self, from: i32) -> Option<LaneLink> {
        self.lane_links.iter().find(|l| l.from == from).cloned()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionID,
    pub name: String,
    connections: Vec<JunctionConnection>,
}

impl Junction {
    pub fn new<S: Into<String>>(id: JunctionID, name: S) -> Junction {
        Junction {
            id,
            name: name.into(),
            connections: Vec::new(),
        }
    }

    pub fn connections(&self) -> &Vec<JunctionConnection> {
        &self.connections
    }

    /// At most one connection per (incoming road, connecting road, contact point).
    pub fn add_connection(&mut self, conn: JunctionConnection) -> Result<(), MapError> {
        if self
            .find_connection(conn.incoming_road, conn.connecting_road, conn.contact_point)
            .is_some()
        {
            return Err(MapError::DuplicateConnection {
                junction: self.id,
                incoming: conn.incoming_road,
                connecting: conn.connecting_road,
                contact: conn.contact_point,
            });
        }
        self.connections.push(conn);
        Ok(())
    }

    pub(crate) fn set_outgoing_road(&mut self, connection: i64, road: RoadID) {
        for conn in &mut self.connections {
            if conn.id == connection {
                conn.outgoing_road = Some(road);
            }
        }
    }

    pub fn find_connection(
        &self,
        incoming: RoadID,
        connecting: RoadID,
        contact: ContactPoint,
    ) -> Option<&JunctionConnection> {
        self.connections.iter().find(|c| {
            c.incoming_road == incoming
                && c.connecting_road == connecting
                && c.contact_point == contact
        })
    }

    pub fn connections_between(
        &self,
        incoming: RoadID,
        outgoing: RoadID,
    ) -> impl Iterator<Item = &JunctionConnection> {
        self.connections
            .iter()
            .filter(move |c| c.incoming_road == incoming && c.outgoing_road == Some(outgoing))
    }

    /// Is there already a connection carrying this incoming lane to the outgoing road?
    pub fn has_lane_link(&self, incoming: RoadID, outgoing: RoadID, lane: i32) -> bool {
        self.connections_between(incoming, outgoing)
            .any(|c| c.link_from(lane).is_some())
    }

    pub fn connecting_roads(&self) -> Vec<RoadID> {
        let mut roads: Vec<RoadID> = self.connections.iter().map(|c| c.connecting_road).collect();
        roads.sort();
        roads.dedup();
        roads
    }
}
