//! Building a `Map` from typed records and writing it back out.

mod junctions;

pub use self::junctions::{
    classify, collect_entries, collect_entry_batches, entries_for_road_end, synthesize,
    synthesize_all, JunctionEntry, ManeuverType, Synthesis, STRAIGHT_TOLERANCE_DEGS,
};

use geom::{Angle, CurveSegment, CurveShape, ParamRange, Pt2D};
use roadutil::{Timer, Warn};

use crate::raw::{
    ElementType, GeometryRecord, JunctionConnectionRecord, JunctionRecord, LaneLinkRecord,
    LaneRecord, LaneSectionRecord, LinkRecord, PRange, PolyRecord, RawMap, RoadRecord,
    ShapeRecord, WidthRecord,
};
use crate::{
    ContactPoint, CubicPoly, Junction, JunctionConnection, JunctionID, Lane, Map, MapConfig,
    MapError, Road, RoadID, RoadLink,
};

/// Stored offsets and lengths that disagree with the recomputed ones by more than this get a
/// warning.
const RECORD_TOLERANCE: f64 = 1e-3;

impl Map {
    /// Roads or connections that can't be built are skipped with a warning; the rest of the map
    /// is still usable.
    pub fn create_from_raw(raw: &RawMap, config: MapConfig, timer: &mut Timer) -> Map {
        let mut map = Map::blank(config);
        map.name = raw.name.clone();

        timer.start(format!("create {} junctions", raw.junctions.len()));
        for rec in &raw.junctions {
            let junction =
                junction_from_record(rec).with_context(timer, format!("junction {}", rec.id));
            if map.junctions.contains_key(&junction.id) {
                timer.warn(format!("Duplicate junction {}, keeping the first", rec.id));
                continue;
            }
            map.junctions.insert(junction.id, junction);
        }
        timer.stop(format!("create {} junctions", raw.junctions.len()));

        timer.start(format!("create {} roads", raw.roads.len()));
        for rec in &raw.roads {
            match road_from_record(rec) {
                Ok(road) => {
                    let road = road.with_context(timer, format!("road {}", rec.id));
                    if map.roads.contains_key(&road.id) {
                        timer.warn(format!("Duplicate road {}, keeping the first", rec.id));
                        continue;
                    }
                    map.roads.insert(road.id, road);
                }
                Err(err) => {
                    timer.warn(format!("Skipping road {}: {}", rec.id, err));
                }
            }
        }
        timer.stop(format!("create {} roads", raw.roads.len()));

        timer.start("resolve links");
        fill_outgoing_roads(&mut map);
        for warning in dangling_links(&map) {
            timer.warn(warning);
        }
        timer.stop("resolve links");

        timer.start("index roads");
        map.reindex();
        timer.stop("index roads");

        map
    }

    /// The inverse of `create_from_raw`. Everything a record can express round-trips.
    pub fn to_raw(&self) -> RawMap {
        RawMap {
            name: self.name.clone(),
            roads: self.roads.values().map(road_to_record).collect(),
            junctions: self.junctions.values().map(junction_to_record).collect(),
        }
    }
}

fn shape_from_record(shape: &ShapeRecord) -> CurveShape {
    match *shape {
        ShapeRecord::Line => CurveShape::Line,
        ShapeRecord::Arc { curvature } => CurveShape::Arc { curvature },
        ShapeRecord::Spiral {
            curv_start,
            curv_end,
        } => CurveShape::Spiral {
            curv_start,
            curv_end,
        },
        ShapeRecord::Poly3 { a, b, c, d } => CurveShape::Poly3 { a, b, c, d },
        ShapeRecord::ParamPoly3 {
            au,
            bu,
            cu,
            du,
            av,
            bv,
            cv,
            dv,
            p_range,
        } => CurveShape::ParamPoly3 {
            au,
            bu,
            cu,
            du,
            av,
            bv,
            cv,
            dv,
            p_range: match p_range {
                PRange::ArcLength => ParamRange::ArcLength,
                PRange::Normalized => ParamRange::Normalized,
            },
        },
    }
}

fn shape_to_record(shape: &CurveShape) -> ShapeRecord {
    match *shape {
        CurveShape::Line => ShapeRecord::Line,
        CurveShape::Arc { curvature } => ShapeRecord::Arc { curvature },
        CurveShape::Spiral {
            curv_start,
            curv_end,
        } => ShapeRecord::Spiral {
            curv_start,
            curv_end,
        },
        CurveShape::Poly3 { a, b, c, d } => ShapeRecord::Poly3 { a, b, c, d },
        CurveShape::ParamPoly3 {
            au,
            bu,
            cu,
            du,
            av,
            bv,
            cv,
            dv,
            p_range,
        } => ShapeRecord::ParamPoly3 {
            au,
            bu,
            cu,
            du,
            av,
            bv,
            cv,
            dv,
            p_range: match p_range {
                ParamRange::ArcLength => PRange::ArcLength,
                ParamRange::Normalized => PRange::Normalized,
            },
        },
    }
}

fn link_from_record(link: &LinkRecord) -> Option<RoadLink> {
    match link.element_type {
        ElementType::Junction => Some(RoadLink::Junction(JunctionID(link.element_id))),
        ElementType::Road => link.contact_point.map(|contact| RoadLink::Road {
            id: RoadID(link.element_id),
            contact,
        }),
    }
}

fn link_to_record(link: RoadLink) -> LinkRecord {
    match link {
        RoadLink::Road { id, contact } => LinkRecord {
            element_type: ElementType::Road,
            element_id: id.0,
            contact_point: Some(contact),
        },
        RoadLink::Junction(j) => LinkRecord {
            element_type: ElementType::Junction,
            element_id: j.0,
            contact_point: None,
        },
    }
}

fn poly_from_record(rec: &PolyRecord) -> CubicPoly {
    CubicPoly {
        s: rec.s,
        a: rec.a,
        b: rec.b,
        c: rec.c,
        d: rec.d,
    }
}

fn poly_to_record(poly: &CubicPoly) -> PolyRecord {
    PolyRecord {
        s: poly.s,
        a: poly.a,
        b: poly.b,
        c: poly.c,
        d: poly.d,
    }
}

fn road_from_record(rec: &RoadRecord) -> Result<Warn<Road>, MapError> {
    let id = RoadID(rec.id);
    let mut warnings = Vec::new();

    let mut segments = Vec::new();
    let mut expected_s = 0.0;
    for g in &rec.plan_view {
        if (g.s - expected_s).abs() > RECORD_TOLERANCE {
            warnings.push(format!(
                "geometry at s={} should start at s={}",
                g.s, expected_s
            ));
        }
        let seg = CurveSegment::new(
            g.s,
            Pt2D::new(g.x, g.y),
            Angle::new_rads(g.hdg),
            g.length,
            shape_from_record(&g.shape),
        )
        .map_err(|err| MapError::InvalidGeometry {
            road: id,
            reason: format!("geometry at s={}: {:#}", g.s, err),
        })?;
        expected_s += g.length;
        segments.push(seg);
    }
    let mut road = Road::from_segments(id, rec.name.clone(), segments)?;
    if (road.length() - rec.length).abs() > RECORD_TOLERANCE {
        warnings.push(format!(
            "length is {}, but the geometry adds up to {}",
            rec.length,
            road.length()
        ));
    } else {
        road.set_declared_length(rec.length);
    }

    road.junction = (rec.junction >= 0).then(|| JunctionID(rec.junction));
    for (contact, link) in [
        (ContactPoint::Start, &rec.predecessor),
        (ContactPoint::End, &rec.successor),
    ] {
        if let Some(link) = link {
            match link_from_record(link) {
                Some(link) => road.set_link(contact, Some(link)),
                None => warnings.push(format!(
                    "link at the {:?} to road {} has no contact point; dropping it",
                    contact, link.element_id
                )),
            }
        }
    }
    for poly in &rec.elevation {
        road.add_elevation(poly_from_record(poly));
    }
    for poly in &rec.lane_offset {
        road.add_lane_offset(poly_from_record(poly));
    }
    road.user_data = rec.user_data.clone();

    for sec in &rec.lane_sections {
        let idx = road.add_lane_section(sec.s, sec.single_side)?;
        let section = road
            .lane_section_mut(idx)
            .ok_or(MapError::NoLaneSection { road: id, s: sec.s })?;
        for l in &sec.lanes {
            let mut lane = Lane::new(l.id, l.lane_type);
            lane.level = l.level;
            lane.predecessor = l.predecessor;
            lane.successor = l.successor;
            lane.user_data = l.user_data.clone();
            for w in &l.width {
                lane.add_width(CubicPoly {
                    s: w.s_offset,
                    a: w.a,
                    b: w.b,
                    c: w.c,
                    d: w.d,
                });
            }
            section.add_lane(lane)?;
        }
    }
    road.validate()?;

    Ok(Warn::warnings(road, warnings))
}

fn road_to_record(road: &Road) -> RoadRecord {
    RoadRecord {
        id: road.id.0,
        name: road.name.clone(),
        length: road.declared_length(),
        junction: road.junction.map_or(-1, |j| j.0),
        predecessor: road.predecessor.map(link_to_record),
        successor: road.successor.map(link_to_record),
        plan_view: road
            .spline()
            .segments()
            .iter()
            .map(|seg| GeometryRecord {
                s: seg.s(),
                x: seg.start().x(),
                y: seg.start().y(),
                hdg: seg.heading().radians(),
                length: seg.length(),
                shape: shape_to_record(seg.shape()),
            })
            .collect(),
        elevation: road.elevations().iter().map(poly_to_record).collect(),
        lane_offset: road.lane_offsets().iter().map(poly_to_record).collect(),
        lane_sections: road
            .lane_sections()
            .iter()
            .map(|sec| LaneSectionRecord {
                s: sec.s,
                single_side: sec.single_sided,
                lanes: sec
                    .lanes()
                    .map(|l| LaneRecord {
                        id: l.id,
                        lane_type: l.lane_type,
                        level: l.level,
                        width: l
                            .widths()
                            .iter()
                            .map(|w| WidthRecord {
                                s_offset: w.s,
                                a: w.a,
                                b: w.b,
                                c: w.c,
                                d: w.d,
                            })
                            .collect(),
                        predecessor: l.predecessor,
                        successor: l.successor,
                        user_data: l.user_data.clone(),
                    })
                    .collect(),
            })
            .collect(),
        user_data: road.user_data.clone(),
    }
}

fn junction_from_record(rec: &JunctionRecord) -> Warn<Junction> {
    let mut junction = Junction::new(JunctionID(rec.id), rec.name.clone());
    let mut warnings = Vec::new();
    for c in &rec.connections {
        let mut conn = JunctionConnection::new(
            c.id,
            RoadID(c.incoming_road),
            RoadID(c.connecting_road),
            c.contact_point,
        );
        conn.outgoing_road = c.outgoing_road.map(RoadID);
        for link in &c.lane_links {
            if !conn.add_lane_link(link.from, link.to) {
                warnings.push(format!(
                    "connection {} links lane {} twice; keeping the first",
                    c.id, link.from
                ));
            }
        }
        if let Err(err) = junction.add_connection(conn) {
            warnings.push(format!("skipping connection {}: {}", c.id, err));
        }
    }
    Warn::warnings(junction, warnings)
}

pub(crate) fn connection_to_record(conn: &JunctionConnection) -> JunctionConnectionRecord {
    JunctionConnectionRecord {
        id: conn.id,
        incoming_road: conn.incoming_road.0,
        connecting_road: conn.connecting_road.0,
        contact_point: conn.contact_point,
        outgoing_road: conn.outgoing_road.map(|r| r.0),
        lane_links: conn
            .lane_links()
            .iter()
            .map(|l| LaneLinkRecord {
                from: l.from,
                to: l.to,
            })
            .collect(),
    }
}

fn junction_to_record(junction: &Junction) -> JunctionRecord {
    JunctionRecord {
        id: junction.id.0,
        name: junction.name.clone(),
        connections: junction
            .connections()
            .iter()
            .map(connection_to_record)
            .collect(),
    }
}

/// Files don't say where a connection leads; the far end of the connecting road does.
fn fill_outgoing_roads(map: &mut Map) {
    let roads = &map.roads;
    for junction in map.junctions.values_mut() {
        let mut outgoing = Vec::new();
        for conn in junction.connections() {
            if conn.outgoing_road.is_some() {
                continue;
            }
            if let Some(RoadLink::Road { id, .. }) = roads
                .get(&conn.connecting_road)
                .and_then(|r| r.link(conn.contact_point.other()))
            {
                outgoing.push((conn.id, id));
            }
        }
        for (conn_id, road) in outgoing {
            junction.set_outgoing_road(conn_id, road);
        }
    }
}

fn dangling_links(map: &Map) -> Vec<String> {
    let mut warnings = Vec::new();
    for road in map.all_roads() {
        for contact in [ContactPoint::Start, ContactPoint::End] {
            match road.link(contact) {
                Some(RoadLink::Road { id, .. }) if !map.roads.contains_key(&id) => {
                    warnings.push(format!("{} links to missing {}", road.id, id));
                }
                Some(RoadLink::Junction(j)) if !map.junctions.contains_key(&j) => {
                    warnings.push(format!("{} links to missing {}", road.id, j));
                }
                _ => {}
            }
        }
        if let Some(j) = road.junction {
            if !map.junctions.contains_key(&j) {
                warnings.push(format!("{} belongs to missing {}", road.id, j));
            }
        }
    }
    for junction in map.all_junctions() {
        for conn in junction.connections() {
            for r in [conn.incoming_road, conn.connecting_road] {
                if !map.roads.contains_key(&r) {
                    warnings.push(format!(
                        "connection {} of {} refers to missing {}",
                        conn.id, junction.id, r
                    ));
                }
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LaneType;

    fn record() -> RawMap {
        let json = r#"{
            "name": "two roads",
            "roads": [
                {
                    "id": 1,
                    "name": "main",
                    "length": 30.0,
                    "successor": {"elementType": "junction", "elementId": 100},
                    "planView": [
                        {"s": 0.0, "x": 0.0, "y": 0.0, "hdg": 0.0, "length": 10.0, "type": "line"},
                        {"s": 10.0, "x": 10.0, "y": 0.0, "hdg": 0.0, "length": 20.0,
                         "type": "arc", "curvature": 0.01}
                    ],
                    "elevation": [{"s": 0.0, "a": 1.0, "b": 0.0, "c": 0.0, "d": 0.0}],
                    "laneSections": [
                        {"s": 0.0, "lanes": [
                            {"id": -1, "type": "driving",
                             "width": [{"sOffset": 0.0, "a": 2.0, "b": 0.0, "c": 0.0, "d": 0.0},
                                       {"sOffset": 10.0, "a": 3.0, "b": 0.0, "c": 0.0, "d": 0.0}]},
                            {"id": 0, "type": "none"},
                            {"id": 1, "type": "sidewalk", "level": true,
                             "width": [{"sOffset": 0.0, "a": 1.5, "b": 0.0, "c": 0.0, "d": 0.0}],
                             "userData": {"sign_shape": "circle"}}
                        ]}
                    ]
                },
                {
                    "id": 2,
                    "length": 5.0,
                    "junction": 100,
                    "predecessor": {"elementType": "road", "elementId": 1, "contactPoint": "end"},
                    "successor": {"elementType": "road", "elementId": 3, "contactPoint": "start"},
                    "planView": [
                        {"s": 0.0, "x": 30.0, "y": 2.0, "hdg": 0.2, "length": 5.0,
                         "type": "paramPoly3", "aU": 0.0, "bU": 5.0, "cU": 0.0, "dU": 0.0,
                         "aV": 0.0, "bV": 0.0, "cV": 0.0, "dV": 0.0, "pRange": "normalized"}
                    ],
                    "laneSections": [
                        {"s": 0.0, "lanes": [
                            {"id": -1, "type": "driving", "predecessor": -1, "successor": -1,
                             "width": [{"sOffset": 0.0, "a": 3.0, "b": 0.0, "c": 0.0, "d": 0.0}]}
                        ]}
                    ]
                },
                {
                    "id": 3,
                    "length": 1.0,
                    "planView": [
                        {"s": 0.0, "x": 0.0, "y": 0.0, "hdg": 0.0, "length": -1.0, "type": "line"}
                    ],
                    "laneSections": []
                }
            ],
            "junctions": [
                {"id": 100, "name": "j", "connections": [
                    {"id": 1, "incomingRoad": 1, "connectingRoad": 2, "contactPoint": "start",
                     "laneLink": [{"from": -1, "to": -1}]}
                ]}
            ]
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn build_and_export() {
        let raw = record();
        let mut timer = Timer::throwaway();
        let map = Map::create_from_raw(&raw, MapConfig::default(), &mut timer);

        // Road 3 has a negative length
        assert_eq!(map.all_roads().count(), 2);
        assert!(timer
            .warnings()
            .iter()
            .any(|w| w.contains("Skipping road 3")));

        let main = map.get_r(RoadID(1)).unwrap();
        assert_eq!(main.width_at(-1, 5.0), Ok(2.0));
        assert_eq!(main.width_at(-1, 15.0), Ok(3.0));
        assert_eq!(main.elevation_at(12.0), 1.0);
        let sidewalk = main.lane_section_at(0.0).unwrap().get_lane(1).unwrap();
        assert_eq!(sidewalk.lane_type, LaneType::Sidewalk);
        assert!(sidewalk.level);
        assert_eq!(
            sidewalk.user_data.sign_shape(),
            Some(roadutil::SignShape::Circle)
        );

        let conn = &map.get_j(JunctionID(100)).unwrap().connections()[0];
        assert_eq!(conn.outgoing_road, Some(RoadID(3)));

        let exported = map.to_raw();
        assert_eq!(exported.roads[0], raw.roads[0]);
        assert_eq!(exported.roads[1], raw.roads[1]);
        assert_eq!(
            exported.junctions[0].connections[0].lane_links,
            raw.junctions[0].connections[0].lane_links
        );
    }

    #[test]
    fn declared_length_and_junction() {
        let mut raw = record();
        raw.roads.truncate(1);
        raw.junctions.clear();
        raw.roads[0].successor = None;
        // Within tolerance of the geometry, so it's kept as written
        raw.roads[0].length = 30.0004;
        let json = serde_json::to_string(&raw).unwrap();
        assert!(json.contains("\"junction\":-1"));

        let mut timer = Timer::throwaway();
        let mut map = Map::create_from_raw(&raw, MapConfig::default(), &mut timer);
        assert!(timer.warnings().is_empty());
        let exported = map.to_raw();
        assert_eq!(exported.roads[0].length, 30.0004);
        assert_eq!(exported.roads[0].junction, -1);
        assert_eq!(exported, raw);

        // A new reference line replaces the declared length
        let segments = map.get_r(RoadID(1)).unwrap().spline().segments()[..1].to_vec();
        map.rebuild_road(RoadID(1), segments).unwrap();
        assert_eq!(map.to_raw().roads[0].length, 10.0);

        // Too far off to keep
        raw.roads[0].length = 31.0;
        let mut timer = Timer::throwaway();
        let map = Map::create_from_raw(&raw, MapConfig::default(), &mut timer);
        assert!(timer
            .warnings()
            .iter()
            .any(|w| w.contains("geometry adds up to 30")));
        assert_eq!(map.to_raw().roads[0].length, 30.0);
    }

    #[test]
    fn geometry_offsets_are_recomputed() {
        let mut raw = record();
        raw.roads.truncate(1);
        raw.junctions.clear();
        raw.roads[0].plan_view[1].s = 11.0;
        raw.roads[0].successor = None;
        let mut timer = Timer::throwaway();
        let map = Map::create_from_raw(&raw, MapConfig::default(), &mut timer);
        assert_eq!(map.get_r(RoadID(1)).unwrap().spline().segments()[1].s(), 10.0);
        assert!(timer
            .warnings()
            .iter()
            .any(|w| w.contains("should start at s=10")));
    }
}
