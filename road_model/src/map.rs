use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use geom::{Bounds, CurveSegment, FindClosest, RoadSpline};

use crate::{
    ContactPoint, EditEffects, Junction, JunctionID, MapError, Road, RoadID, RoadLink,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrivingSide {
    Right,
    Left,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Which side of the road vehicles drive on. Decides which lane ends feed into a junction.
    pub driving_side: DrivingSide,
    /// Bezier handle length of synthesized connecting roads, as a fraction of the distance
    /// between their ends.
    pub connecting_road_handle: f64,
    /// Free road ends closer than this in meters get synthesized into the same junction.
    pub cluster_radius: f64,
    /// Coarse sampling step in meters when projecting a point onto a road.
    pub projection_step: f64,
}

impl Default for MapConfig {
    fn default() -> MapConfig {
        MapConfig {
            driving_side: DrivingSide::Right,
            connecting_road_handle: 0.3,
            cluster_radius: 25.0,
            projection_step: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdKind {
    Road,
    Junction,
    Connection,
}

/// Hands out fresh ids for objects created by the map itself, like connecting roads.
pub trait IdAllocator {
    fn next_unique_id(&mut self, kind: IdKind) -> i64;
}

/// Counts up from one past the largest id already in a map.
#[derive(Clone, Debug)]
pub struct SequentialIds {
    next_road: i64,
    next_junction: i64,
    next_connection: i64,
}

impl SequentialIds {
    pub fn for_map(map: &Map) -> SequentialIds {
        let next_road = map.roads.keys().last().map(|r| r.0 + 1).unwrap_or(1);
        let next_junction = map.junctions.keys().last().map(|j| j.0 + 1).unwrap_or(1);
        let next_connection = map
            .junctions
            .values()
            .flat_map(|j| j.connections().iter().map(|c| c.id + 1))
            .max()
            .unwrap_or(1);
        SequentialIds {
            next_road,
            next_junction,
            next_connection,
        }
    }
}

impl IdAllocator for SequentialIds {
    fn next_unique_id(&mut self, kind: IdKind) -> i64 {
        let counter = match kind {
            IdKind::Road => &mut self.next_road,
            IdKind::Junction => &mut self.next_junction,
            IdKind::Connection => &mut self.next_connection,
        };
        let id = *counter;
        *counter += 1;
        id
    }
}

/// All roads and junctions of one network. Objects refer to each other by id only; the map
/// resolves them. Create one per loaded network and pass it to every query.
pub struct Map {
    pub(crate) name: String,
    pub(crate) roads: BTreeMap<RoadID, Road>,
    pub(crate) junctions: BTreeMap<JunctionID, Junction>,
    pub(crate) config: MapConfig,

    // Bounding boxes of every reference line, expanded by the projection step
    closest: FindClosest<RoadID>,
}

impl Map {
    pub fn blank(config: MapConfig) -> Map {
        Map {
            name: String::new(),
            roads: BTreeMap::new(),
            junctions: BTreeMap::new(),
            config,
            closest: FindClosest::new(),
        }
    }

    pub fn get_name(&self) -> &String {
        &self.name
    }

    pub fn get_config(&self) -> &MapConfig {
        &self.config
    }

    pub fn all_roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    pub fn all_junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.values()
    }

    pub fn maybe_get_r(&self, id: RoadID) -> Option<&Road> {
        self.roads.get(&id)
    }

    pub fn maybe_get_j(&self, id: JunctionID) -> Option<&Junction> {
        self.junctions.get(&id)
    }

    pub fn get_r(&self, id: RoadID) -> Result<&Road, MapError> {
        self.roads.get(&id).ok_or(MapError::RoadNotFound(id))
    }

    pub fn get_j(&self, id: JunctionID) -> Result<&Junction, MapError> {
        self.junctions.get(&id).ok_or(MapError::JunctionNotFound(id))
    }

    /// For editing lanes and links. Change the reference line with `rebuild_road` instead, so
    /// the spatial index stays in sync.
    pub fn get_r_mut(&mut self, id: RoadID) -> Result<&mut Road, MapError> {
        self.roads.get_mut(&id).ok_or(MapError::RoadNotFound(id))
    }

    pub fn get_j_mut(&mut self, id: JunctionID) -> Result<&mut Junction, MapError> {
        self.junctions
            .get_mut(&id)
            .ok_or(MapError::JunctionNotFound(id))
    }

    /// Adds or replaces a road. Lane ids in every section must be contiguous.
    pub fn insert_road(&mut self, road: Road) -> Result<EditEffects, MapError> {
        road.validate()?;
        let mut effects = EditEffects::new();
        let id = road.id;
        if self.roads.insert(id, road).is_some() {
            effects.changed_roads.insert(id);
            self.reindex();
        } else {
            effects.added_roads.insert(id);
            self.index_road(id);
        }
        Ok(effects)
    }

    /// Replaces the road's reference line wholesale.
    pub fn rebuild_road(
        &mut self,
        id: RoadID,
        segments: Vec<CurveSegment>,
    ) -> Result<EditEffects, MapError> {
        let spline = RoadSpline::new(segments).map_err(|err| MapError::InvalidGeometry {
            road: id,
            reason: format!("{:#}", err),
        })?;
        self.get_r_mut(id)?.set_spline(spline);
        self.reindex();
        let mut effects = EditEffects::new();
        effects.changed_roads.insert(id);
        Ok(effects)
    }

    pub fn insert_junction(&mut self, junction: Junction) -> EditEffects {
        let mut effects = EditEffects::new();
        let id = junction.id;
        if self.junctions.insert(id, junction).is_some() {
            effects.changed_junctions.insert(id);
        } else {
            effects.added_junctions.insert(id);
        }
        effects
    }

    pub fn set_road_link(
        &mut self,
        id: RoadID,
        contact: ContactPoint,
        link: Option<RoadLink>,
    ) -> Result<EditEffects, MapError> {
        if let Some(RoadLink::Junction(j)) = link {
            self.get_j(j)?;
        }
        self.get_r_mut(id)?.set_link(contact, link);
        let mut effects = EditEffects::new();
        effects.changed_roads.insert(id);
        Ok(effects)
    }

    /// Makes a road part of a junction. A road can only belong to one.
    pub fn set_road_junction(
        &mut self,
        id: RoadID,
        junction: JunctionID,
    ) -> Result<EditEffects, MapError> {
        self.get_j(junction)?;
        let road = self.get_r_mut(id)?;
        match road.junction {
            Some(existing) if existing != junction => {
                return Err(MapError::DuplicateJunctionMembership {
                    junctions: vec![existing, junction],
                });
            }
            _ => {
                road.junction = Some(junction);
            }
        }
        let mut effects = EditEffects::new();
        effects.changed_roads.insert(id);
        Ok(effects)
    }

    /// The junction a road end is linked to, if any.
    pub fn junction_at_end(
        &self,
        id: RoadID,
        contact: ContactPoint,
    ) -> Result<Option<JunctionID>, MapError> {
        match self.get_r(id)?.link(contact) {
            Some(RoadLink::Junction(j)) => Ok(Some(j)),
            _ => Ok(None),
        }
    }

    pub(crate) fn road_candidates(
        &self,
        pt: geom::Pt2D,
    ) -> impl Iterator<Item = (RoadID, f64)> + '_ {
        self.closest.candidates(pt)
    }

    fn road_bounds(&self, road: &Road) -> Bounds {
        road.spline()
            .get_bounds(self.config.projection_step)
            .expanded(self.config.projection_step)
    }

    fn index_road(&mut self, id: RoadID) {
        if let Some(road) = self.roads.get(&id) {
            let bounds = self.road_bounds(road);
            self.closest.add(id, &bounds);
        }
    }

    pub(crate) fn reindex(&mut self) {
        let mut closest = FindClosest::new();
        for road in self.roads.values() {
            closest.add(road.id, &self.road_bounds(road));
        }
        self.closest = closest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JunctionConnection, Lane, LaneType};
    use geom::{Angle, CurveShape, Pose, Pt2D};

    fn road(id: i64, lanes: &[i32]) -> Road {
        let spline = RoadSpline::chain(
            Pose::new(Pt2D::new(0.0, id as f64 * 10.0), Angle::ZERO),
            vec![(CurveShape::Line, 50.0)],
        )
        .unwrap();
        let mut road = Road::new(RoadID(id), format!("road {}", id), spline);
        road.add_lane_section(0.0, false).unwrap();
        for lane in lanes {
            road.add_lane(0.0, Lane::new(*lane, LaneType::Driving))
                .unwrap();
        }
        road
    }

    #[test]
    fn insert_validates_lanes() {
        let mut map = Map::blank(MapConfig::default());
        let effects = map.insert_road(road(1, &[-1, -2])).unwrap();
        assert!(effects.added_roads.contains(&RoadID(1)));
        let effects = map.insert_road(road(1, &[-1])).unwrap();
        assert!(effects.changed_roads.contains(&RoadID(1)));

        assert!(matches!(
            map.insert_road(road(2, &[-2])),
            Err(MapError::NonContiguousLanes { .. })
        ));
        assert_eq!(map.get_r(RoadID(2)), Err(MapError::RoadNotFound(RoadID(2))));
        assert_eq!(map.all_roads().count(), 1);
    }

    #[test]
    fn sequential_ids_skip_existing() {
        let mut map = Map::blank(MapConfig::default());
        map.insert_road(road(4, &[-1])).unwrap();
        map.insert_road(road(2, &[-1])).unwrap();
        let mut junction = Junction::new(JunctionID(7), "j");
        junction
            .add_connection(JunctionConnection::new(
                11,
                RoadID(4),
                RoadID(2),
                ContactPoint::Start,
            ))
            .unwrap();
        map.insert_junction(junction);

        let mut ids = SequentialIds::for_map(&map);
        assert_eq!(ids.next_unique_id(IdKind::Road), 5);
        assert_eq!(ids.next_unique_id(IdKind::Road), 6);
        assert_eq!(ids.next_unique_id(IdKind::Junction), 8);
        assert_eq!(ids.next_unique_id(IdKind::Connection), 12);
    }

    #[test]
    fn junction_membership_is_exclusive() {
        let mut map = Map::blank(MapConfig::default());
        map.insert_road(road(1, &[-1])).unwrap();
        map.insert_junction(Junction::new(JunctionID(1), "a"));
        map.insert_junction(Junction::new(JunctionID(2), "b"));

        map.set_road_junction(RoadID(1), JunctionID(1)).unwrap();
        map.set_road_junction(RoadID(1), JunctionID(1)).unwrap();
        assert_eq!(
            map.set_road_junction(RoadID(1), JunctionID(2)),
            Err(MapError::DuplicateJunctionMembership {
                junctions: vec![JunctionID(1), JunctionID(2)]
            })
        );
        assert!(map
            .set_road_link(
                RoadID(1),
                ContactPoint::End,
                Some(RoadLink::Junction(JunctionID(3)))
            )
            .is_err());
    }

    #[test]
    fn config_fills_in_defaults() {
        let cfg: MapConfig = serde_json::from_str(r#"{"driving_side": "Left"}"#).unwrap();
        assert_eq!(cfg.driving_side, DrivingSide::Left);
        assert_eq!(cfg.cluster_radius, 25.0);
    }
}
