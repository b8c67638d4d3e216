use geom::{Angle, CurveShape, Pose, Pt2D, RoadSpline};
use road_model::{
    collect_entries, collect_entry_batches, synthesize, synthesize_all, ContactPoint, CubicPoly,
    DrivingSide, Junction, JunctionID, Lane, LaneType, Map, MapConfig, Road, RoadID, RoadLink,
    SequentialIds,
};
use roadutil::Timer;

fn road(id: i64, start: Pt2D, heading_degs: f64, lanes: &[i32]) -> Road {
    road_of_length(id, start, heading_degs, 50.0, lanes)
}

fn road_of_length(id: i64, start: Pt2D, heading_degs: f64, length: f64, lanes: &[i32]) -> Road {
    let spline = RoadSpline::chain(
        Pose::new(start, Angle::degrees(heading_degs)),
        vec![(CurveShape::Line, length)],
    )
    .unwrap();
    let mut road = Road::new(RoadID(id), format!("road {}", id), spline);
    road.add_lane_section(0.0, false).unwrap();
    for id in lanes {
        let lane_type = if *id == 0 {
            LaneType::None
        } else {
            LaneType::Driving
        };
        let mut lane = Lane::new(*id, lane_type);
        if *id != 0 {
            lane.add_width(CubicPoly::constant(0.0, 3.5));
        }
        road.add_lane(0.0, lane).unwrap();
    }
    road
}

fn map_with(side: DrivingSide, roads: Vec<Road>) -> Map {
    let mut map = Map::blank(MapConfig {
        driving_side: side,
        ..Default::default()
    });
    for r in roads {
        map.insert_road(r).unwrap();
    }
    map
}

#[test]
fn straight_through() {
    // A ends at the origin heading east, B picks up 10m later
    let mut map = map_with(
        DrivingSide::Right,
        vec![
            road(1, Pt2D::new(-50.0, 0.0), 0.0, &[-1, 0]),
            road(2, Pt2D::new(10.0, 0.0), 0.0, &[-1, 0]),
        ],
    );
    let mut ids = SequentialIds::for_map(&map);
    let results = synthesize_all(&mut map, &mut ids, &mut Timer::throwaway());
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.connections.len(), 1);
    assert_eq!(result.new_roads, vec![RoadID(3)]);

    let j = result.junction.unwrap();
    let junction = map.get_j(j).unwrap();
    assert_eq!(junction.connections().len(), 1);
    let conn = &junction.connections()[0];
    assert_eq!(conn.incoming_road, RoadID(1));
    assert_eq!(conn.connecting_road, RoadID(3));
    assert_eq!(conn.contact_point, ContactPoint::Start);
    assert_eq!(conn.outgoing_road, Some(RoadID(2)));
    let links: Vec<(i32, i32)> = conn.lane_links().iter().map(|l| (l.from, l.to)).collect();
    assert_eq!(links, vec![(-1, -1)]);

    let connecting = map.get_r(RoadID(3)).unwrap();
    assert_eq!(connecting.junction, Some(j));
    assert_eq!(
        connecting.predecessor,
        Some(RoadLink::Road {
            id: RoadID(1),
            contact: ContactPoint::End
        })
    );
    assert_eq!(
        connecting.successor,
        Some(RoadLink::Road {
            id: RoadID(2),
            contact: ContactPoint::Start
        })
    );
    assert!((connecting.length() - 10.0).abs() < 1e-3);
    assert!(connecting
        .end_pose(ContactPoint::End)
        .pt
        .approx_eq(Pt2D::new(10.0, 0.0), 1e-6));
    let lane = connecting.lane_sections()[0].get_lane(-1).unwrap();
    assert_eq!(lane.lane_type, LaneType::Driving);
    assert_eq!(lane.predecessor, Some(-1));
    assert_eq!(lane.successor, Some(-1));
    assert!((lane.width_at(5.0) - 3.5).abs() < 1e-9);

    assert_eq!(
        map.get_r(RoadID(1)).unwrap().successor,
        Some(RoadLink::Junction(j))
    );
    assert_eq!(
        map.get_r(RoadID(2)).unwrap().predecessor,
        Some(RoadLink::Junction(j))
    );
    assert!(result.effects.added_roads.contains(&RoadID(3)));
    assert!(result.effects.added_junctions.contains(&j));
}

#[test]
fn second_run_changes_nothing() {
    let mut map = map_with(
        DrivingSide::Right,
        vec![
            road(1, Pt2D::new(-50.0, 0.0), 0.0, &[-1, 0, 1]),
            road(2, Pt2D::new(10.0, 0.0), 0.0, &[-1, 0, 1]),
        ],
    );
    let mut ids = SequentialIds::for_map(&map);
    let first = synthesize_all(&mut map, &mut ids, &mut Timer::throwaway());
    // One connecting road each way
    assert_eq!(first[0].new_roads.len(), 2);
    let roads_before = map.all_roads().count();
    let links_before: usize = map
        .all_junctions()
        .flat_map(|j| j.connections())
        .map(|c| c.lane_links().len())
        .sum();

    let second = synthesize_all(&mut map, &mut ids, &mut Timer::throwaway());
    assert_eq!(second.len(), 1);
    assert!(second[0].connections.is_empty());
    assert!(second[0].effects.is_empty());
    assert_eq!(second[0].junction, first[0].junction);
    assert_eq!(map.all_roads().count(), roads_before);
    assert_eq!(map.all_junctions().count(), 1);
    let links_after: usize = map
        .all_junctions()
        .flat_map(|j| j.connections())
        .map(|c| c.lane_links().len())
        .sum();
    assert_eq!(links_after, links_before);
}

#[test]
fn right_turn_from_outermost_lane() {
    // A heads east with two lanes; B leaves the junction heading south with one
    let mut map = map_with(
        DrivingSide::Right,
        vec![
            road(1, Pt2D::new(-50.0, 0.0), 0.0, &[-2, -1, 0]),
            road(2, Pt2D::new(10.0, -10.0), -90.0, &[-1, 0]),
        ],
    );
    let mut ids = SequentialIds::for_map(&map);
    let batches = collect_entry_batches(&map).unwrap();
    assert_eq!(batches.len(), 1);
    let result = synthesize(&mut map, &batches[0], &mut ids)
        .unwrap()
        .unwrap();

    assert_eq!(result.connections.len(), 1);
    let conn = &result.connections[0];
    assert_eq!(conn.incoming_road, 1);
    assert_eq!(conn.outgoing_road, Some(2));
    assert_eq!(conn.lane_links.len(), 1);
    assert_eq!(conn.lane_links[0].from, -2);
    assert_eq!(conn.lane_links[0].to, -1);

    let connecting = map.get_r(RoadID(conn.connecting_road)).unwrap();
    let lane = connecting.lane_sections()[0].get_lane(-1).unwrap();
    assert_eq!(lane.predecessor, Some(-2));
    assert_eq!(lane.successor, Some(-1));
    // Starts on the inner border of lane -2
    assert!(connecting
        .end_pose(ContactPoint::Start)
        .pt
        .approx_eq(Pt2D::new(0.0, -3.5), 1e-6));
}

#[test]
fn left_hand_traffic() {
    let mut map = map_with(
        DrivingSide::Left,
        vec![
            road(1, Pt2D::new(-50.0, 0.0), 0.0, &[0, 1]),
            road(2, Pt2D::new(10.0, 0.0), 0.0, &[0, 1]),
        ],
    );
    let mut ids = SequentialIds::for_map(&map);
    let results = synthesize_all(&mut map, &mut ids, &mut Timer::throwaway());
    assert_eq!(results[0].connections.len(), 1);
    let conn = &results[0].connections[0];
    assert_eq!(conn.incoming_road, 1);
    assert_eq!(conn.lane_links[0].from, 1);
    assert_eq!(conn.lane_links[0].to, 1);
    let connecting = map.get_r(RoadID(conn.connecting_road)).unwrap();
    assert!(connecting.lane_sections()[0].get_lane(1).is_some());
    assert!(connecting.lane_sections()[0].get_lane(-1).is_none());
}

#[test]
fn conflicting_junctions_are_skipped() {
    let mut a = road(1, Pt2D::new(-50.0, 0.0), 0.0, &[-1, 0]);
    let mut b = road(2, Pt2D::new(10.0, 0.0), 0.0, &[-1, 0]);
    a.successor = Some(RoadLink::Junction(JunctionID(1)));
    b.predecessor = Some(RoadLink::Junction(JunctionID(2)));
    let mut map = Map::blank(MapConfig::default());
    map.insert_junction(Junction::new(JunctionID(1), "one"));
    map.insert_junction(Junction::new(JunctionID(2), "two"));
    map.insert_road(a).unwrap();
    map.insert_road(b).unwrap();

    let entries = collect_entries(&map).unwrap();
    let mut ids = SequentialIds::for_map(&map);
    let result = synthesize(&mut map, &entries, &mut ids).unwrap();
    assert_eq!(result.list_warnings().len(), 1);
    assert!(result.value().connections.is_empty());
    assert_eq!(result.value().junction, None);
    assert_eq!(map.all_roads().count(), 2);
    assert!(map.all_junctions().all(|j| j.connections().is_empty()));
}

#[test]
fn roads_without_lanes_are_reported() {
    let spline = RoadSpline::chain(
        Pose::new(Pt2D::zero(), Angle::ZERO),
        vec![(CurveShape::Line, 20.0)],
    )
    .unwrap();
    let map = map_with(
        DrivingSide::Right,
        vec![Road::new(RoadID(7), "bare", spline)],
    );
    let entries = collect_entries(&map);
    assert!(entries.value().is_empty());
    assert_eq!(entries.list_warnings().len(), 1);
    assert!(entries.list_warnings()[0].contains("Road #7"));
}

#[test]
fn far_apart_ends_stay_separate() {
    let map = map_with(
        DrivingSide::Right,
        vec![
            road(1, Pt2D::new(-50.0, 0.0), 0.0, &[-1, 0]),
            road(2, Pt2D::new(200.0, 0.0), 0.0, &[-1, 0]),
        ],
    );
    assert!(collect_entry_batches(&map).unwrap().is_empty());
}

#[test]
fn roads_in_a_row_get_separate_junctions() {
    // The middle road is shorter than the cluster radius
    let mut map = map_with(
        DrivingSide::Right,
        vec![
            road(1, Pt2D::new(-50.0, 0.0), 0.0, &[-1, 0]),
            road_of_length(2, Pt2D::new(10.0, 0.0), 0.0, 20.0, &[-1, 0]),
            road(3, Pt2D::new(40.0, 0.0), 0.0, &[-1, 0]),
        ],
    );
    let batches = collect_entry_batches(&map).unwrap();
    assert_eq!(batches.len(), 2);

    let mut ids = SequentialIds::for_map(&map);
    let results = synthesize_all(&mut map, &mut ids, &mut Timer::throwaway());
    let mut pairs: Vec<(i64, Option<i64>)> = results
        .iter()
        .flat_map(|r| r.connections.iter())
        .map(|c| (c.incoming_road, c.outgoing_road))
        .collect();
    pairs.sort();
    assert_eq!(pairs, vec![(1, Some(2)), (2, Some(3))]);
    assert_eq!(map.all_junctions().count(), 2);
    assert_ne!(results[0].junction, results[1].junction);

    let middle = map.get_r(RoadID(2)).unwrap();
    assert_eq!(middle.predecessor, results[0].junction.map(RoadLink::Junction));
    assert_eq!(middle.successor, results[1].junction.map(RoadLink::Junction));
}

#[test]
fn t_junction() {
    // 1 and 3 run east through the junction, 2 leaves it heading north. 1 has two eastbound
    // lanes, but only the inner one continues or turns left.
    let mut map = map_with(
        DrivingSide::Right,
        vec![
            road(1, Pt2D::new(-50.0, 0.0), 0.0, &[-2, -1, 0, 1]),
            road(2, Pt2D::new(10.0, 10.0), 90.0, &[-1, 0, 1]),
            road(3, Pt2D::new(20.0, 0.0), 0.0, &[-1, 0, 1]),
        ],
    );
    let mut ids = SequentialIds::for_map(&map);
    let results = synthesize_all(&mut map, &mut ids, &mut Timer::throwaway());
    assert_eq!(results.len(), 1);

    let mut links: Vec<(i64, i64, i32, i32)> = results[0]
        .connections
        .iter()
        .map(|c| {
            assert_eq!(c.lane_links.len(), 1);
            (
                c.incoming_road,
                c.outgoing_road.unwrap(),
                c.lane_links[0].from,
                c.lane_links[0].to,
            )
        })
        .collect();
    links.sort();
    assert_eq!(
        links,
        vec![
            (1, 2, -1, -1),
            (1, 3, -1, -1),
            (2, 1, 1, -1),
            (2, 3, 1, -1),
            (3, 1, 1, -1),
            (3, 2, 1, -1),
        ]
    );

    // The left turn ends on 2's outgoing lane, heading north
    let left = results[0]
        .connections
        .iter()
        .find(|c| c.incoming_road == 1 && c.outgoing_road == Some(2))
        .unwrap();
    let connecting = map.get_r(RoadID(left.connecting_road)).unwrap();
    let lane = connecting.lane_sections()[0].get_lane(-1).unwrap();
    assert_eq!(lane.predecessor, Some(-1));
    assert_eq!(lane.successor, Some(-1));
    assert!(connecting
        .end_pose(ContactPoint::Start)
        .pt
        .approx_eq(Pt2D::zero(), 1e-6));
    let end = connecting.end_pose(ContactPoint::End);
    assert!(end.pt.approx_eq(Pt2D::new(10.0, 10.0), 1e-6));
    assert!((end.heading.normalized_degrees() - 90.0).abs() < 1e-6);
}
