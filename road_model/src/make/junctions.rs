//! Infers which lanes meeting at a road junction should be connected, and builds a connecting
//! road for every such pair.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use geom::{Angle, CurveSegment, Pose, Pt2D};
use roadutil::{Timer, Warn};

use crate::make::connection_to_record;
use crate::raw::JunctionConnectionRecord;
use crate::{
    ContactPoint, CubicPoly, DrivingSide, EditEffects, IdAllocator, IdKind, Junction,
    JunctionConnection, JunctionID, Lane, LaneType, Map, MapError, Road, RoadID, RoadLink,
};

/// Entry and exit headings within this many degrees of each other continue straight through.
pub const STRAIGHT_TOLERANCE_DEGS: f64 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManeuverType {
    Straight,
    Right,
    Left,
}

/// One driving lane at a road end that isn't linked to another road. Only lives during synthesis.
#[derive(Clone, Debug, PartialEq)]
pub struct JunctionEntry {
    pub road: RoadID,
    pub lane: i32,
    pub contact: ContactPoint,
    /// On the lane's inner border at the road end, with the reference line's heading
    pub pose: Pose,
    pub width: f64,
    /// The junction this road end was linked to at collection time
    pub junction: Option<JunctionID>,
}

impl JunctionEntry {
    /// Does traffic in this lane flow into the junction? Otherwise it flows out.
    pub fn is_entry(&self, side: DrivingSide) -> bool {
        let with_reference_line = match side {
            DrivingSide::Right => self.lane < 0,
            DrivingSide::Left => self.lane > 0,
        };
        match self.contact {
            ContactPoint::End => with_reference_line,
            ContactPoint::Start => !with_reference_line,
        }
    }

    /// Points from the road into the junction.
    pub fn heading_into_junction(&self) -> Angle {
        match self.contact {
            ContactPoint::End => self.pose.heading,
            ContactPoint::Start => self.pose.heading.opposite(),
        }
    }

    /// The direction traffic in this lane moves at the road end.
    pub fn travel_heading(&self, side: DrivingSide) -> Angle {
        if self.is_entry(side) {
            self.heading_into_junction()
        } else {
            self.heading_into_junction().opposite()
        }
    }
}

/// What kind of movement leads from `entry` to `exit`. U-turns and anything sharper than
/// `180 - STRAIGHT_TOLERANCE_DEGS` aren't synthesized. The exit also has to lie on the side the
/// turn goes towards, or ahead for straight movements.
pub fn classify(
    entry: &JunctionEntry,
    exit: &JunctionEntry,
    side: DrivingSide,
) -> Option<ManeuverType> {
    let heading = entry.travel_heading(side);
    let rotation = heading.shortest_rotation_towards(exit.travel_heading(side));
    // x is ahead of the entry, y to its left
    let local = Pose::new(entry.pose.pt, heading).to_local(exit.pose.pt);
    let sharpest = 180.0 - STRAIGHT_TOLERANCE_DEGS;
    if rotation.abs() <= STRAIGHT_TOLERANCE_DEGS {
        (local.x() > 0.0).then(|| ManeuverType::Straight)
    } else if rotation < 0.0 && rotation > -sharpest {
        (local.y() < 0.0).then(|| ManeuverType::Right)
    } else if rotation > 0.0 && rotation < sharpest {
        (local.y() > 0.0).then(|| ManeuverType::Left)
    } else {
        None
    }
}

/// Entries for every driving lane at one end of a road. Ends linked directly to another road and
/// connecting roads produce nothing.
pub fn entries_for_road_end(
    map: &Map,
    id: RoadID,
    contact: ContactPoint,
) -> Result<Warn<Vec<JunctionEntry>>, MapError> {
    let road = map.get_r(id)?;
    if road.is_connecting_road() {
        return Ok(Warn::ok(Vec::new()));
    }
    let junction = match road.link(contact) {
        Some(RoadLink::Road { .. }) => {
            return Ok(Warn::ok(Vec::new()));
        }
        Some(RoadLink::Junction(j)) => Some(j),
        None => None,
    };
    let section = match road.end_section(contact) {
        Some(sec) => sec,
        None => {
            return Ok(Warn::warn(
                Vec::new(),
                format!("{} has no lane sections", id),
            ));
        }
    };

    let s = road.contact_s(contact);
    let ds = (s - section.s).max(0.0);
    let offset = road.lane_offset_at(s);
    let mut entries = Vec::new();
    for lane in section.lanes() {
        if lane.id == 0 || !lane.is_driving() {
            continue;
        }
        let (inner, _) = section
            .border_t(lane.id, ds)
            .ok_or(MapError::LaneNotFoundAtS {
                road: id,
                lane: lane.id,
                s,
            })?;
        entries.push(JunctionEntry {
            road: id,
            lane: lane.id,
            contact,
            pose: road.evaluate_pose(s, inner + offset),
            width: lane.width_at(ds),
            junction,
        });
    }
    Ok(Warn::ok(entries))
}

/// Entries for both ends of every road in the map.
pub fn collect_entries(map: &Map) -> Warn<Vec<JunctionEntry>> {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    for road in map.all_roads() {
        for contact in [ContactPoint::Start, ContactPoint::End] {
            match entries_for_road_end(map, road.id, contact) {
                Ok(found) => {
                    let (found, more_warnings) = found.into_parts();
                    entries.extend(found);
                    warnings.extend(more_warnings);
                }
                Err(err) => warnings.push(err.to_string()),
            }
        }
    }
    warnings.dedup();
    Warn::warnings(entries, warnings)
}

/// Groups every entry in the map into batches, one per future junction. Road ends already linked
/// to the same junction end up together. Every other road end joins the nearest batch whose
/// first road end lies within the configured cluster radius, so a batch never spreads further
/// than that from where it started. Both ends of one road never share a batch, and batches
/// touching fewer than two roads are dropped.
pub fn collect_entry_batches(map: &Map) -> Warn<Vec<Vec<JunctionEntry>>> {
    let radius = map.get_config().cluster_radius;
    let (entries, warnings) = collect_entries(map).into_parts();

    let mut ends: Vec<(RoadID, ContactPoint)> =
        entries.iter().map(|e| (e.road, e.contact)).collect();
    ends.sort();
    ends.dedup();

    // The seed of each cluster is the position of its first road end
    let mut clusters: Vec<(Pt2D, Vec<(RoadID, ContactPoint)>)> = Vec::new();
    let mut by_junction: BTreeMap<JunctionID, usize> = BTreeMap::new();
    let mut free = Vec::new();
    for (road, contact) in ends {
        let pt = match map.maybe_get_r(road) {
            Some(r) => r.end_pose(contact).pt,
            None => continue,
        };
        match map.junction_at_end(road, contact).ok().flatten() {
            Some(j) => {
                let idx = *by_junction.entry(j).or_insert_with(|| {
                    clusters.push((pt, Vec::new()));
                    clusters.len() - 1
                });
                clusters[idx].1.push((road, contact));
            }
            None => free.push((road, contact, pt)),
        }
    }
    for (road, contact, pt) in free {
        let nearest = clusters
            .iter()
            .enumerate()
            .filter(|(_, (_, members))| members.iter().all(|(r, _)| *r != road))
            .map(|(idx, (seed, _))| (idx, seed.dist_to(pt)))
            .filter(|(_, dist)| *dist <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match nearest {
            Some((idx, _)) => clusters[idx].1.push((road, contact)),
            None => clusters.push((pt, vec![(road, contact)])),
        }
    }

    let mut cluster_of: BTreeMap<(RoadID, ContactPoint), usize> = BTreeMap::new();
    for (idx, (_, members)) in clusters.iter().enumerate() {
        for end in members {
            cluster_of.insert(*end, idx);
        }
    }
    let mut batches: Vec<Vec<JunctionEntry>> = vec![Vec::new(); clusters.len()];
    for entry in entries {
        if let Some(idx) = cluster_of.get(&(entry.road, entry.contact)) {
            batches[*idx].push(entry);
        }
    }
    let batches = batches
        .into_iter()
        .filter(|batch| {
            let roads: BTreeSet<RoadID> = batch.iter().map(|e| e.road).collect();
            roads.len() >= 2
        })
        .collect();
    Warn::warnings(batches, warnings)
}

/// The result of synthesizing one batch of entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Synthesis {
    /// None if nothing needed connecting and no junction existed yet, or the batch was skipped
    pub junction: Option<JunctionID>,
    /// Only the connections created by this run
    pub connections: Vec<JunctionConnectionRecord>,
    pub new_roads: Vec<RoadID>,
    pub effects: EditEffects,
}

/// Connects every compatible (entry, exit) lane pair in the batch through one junction, creating
/// the junction if none of the road ends belongs to one yet. Pairs that are already connected are
/// skipped, so running this twice changes nothing the second time. If the road ends belong to
/// different junctions, nothing happens and a warning explains why.
pub fn synthesize(
    map: &mut Map,
    entries: &[JunctionEntry],
    ids: &mut dyn IdAllocator,
) -> Result<Warn<Synthesis>, MapError> {
    let side = map.get_config().driving_side;
    let mut result = Synthesis::default();
    let mut warnings = Vec::new();

    // Earlier runs may have linked these road ends since the entries were collected
    let mut junctions = BTreeSet::new();
    for e in entries {
        if let Some(j) = map.junction_at_end(e.road, e.contact)? {
            junctions.insert(j);
        }
    }
    if junctions.len() > 1 {
        let err = MapError::DuplicateJunctionMembership {
            junctions: junctions.into_iter().collect(),
        };
        return Ok(Warn::warn(result, err.to_string()));
    }
    let mut junction = junctions.into_iter().next();

    for (entry, exit, maneuver) in find_pairs(entries, side) {
        let j = match junction {
            Some(j) => j,
            None => {
                let j = JunctionID(ids.next_unique_id(IdKind::Junction));
                result
                    .effects
                    .merge(map.insert_junction(Junction::new(j, format!("junction {}", j.0))));
                junction = Some(j);
                j
            }
        };
        if map.get_j(j)?.has_lane_link(entry.road, exit.road, entry.lane) {
            debug!(
                "{} lane {} already reaches {} through {}",
                entry.road, entry.lane, exit.road, j
            );
            continue;
        }

        let id = RoadID(ids.next_unique_id(IdKind::Road));
        let road = match connecting_road(id, j, entry, exit, map.get_config()) {
            Ok(road) => road,
            Err(err) => {
                warnings.push(format!("Can't connect {:?} to {:?}: {}", entry, exit, err));
                continue;
            }
        };
        let lane = connecting_lane_id(side);
        result.effects.merge(map.insert_road(road)?);

        let mut conn = JunctionConnection::new(
            ids.next_unique_id(IdKind::Connection),
            entry.road,
            id,
            ContactPoint::Start,
        );
        conn.outgoing_road = Some(exit.road);
        conn.add_lane_link(entry.lane, lane);
        result.connections.push(connection_to_record(&conn));
        map.get_j_mut(j)?.add_connection(conn)?;
        let mut changed = EditEffects::new();
        changed.changed_junctions.insert(j);
        result.effects.merge(changed);

        for e in [entry, exit] {
            if map.junction_at_end(e.road, e.contact)? != Some(j) {
                result.effects.merge(map.set_road_link(
                    e.road,
                    e.contact,
                    Some(RoadLink::Junction(j)),
                )?);
            }
        }
        result.new_roads.push(id);
        debug!(
            "{:?} from {} lane {} to {} lane {} via {}",
            maneuver, entry.road, entry.lane, exit.road, exit.lane, id
        );
    }

    if let Some(j) = junction {
        if !result.new_roads.is_empty() {
            info!("{} gained {} connecting roads", j, result.new_roads.len());
        }
    }
    result.junction = junction;
    Ok(Warn::warnings(result, warnings))
}

/// Collects entries from the whole map, clusters them, and synthesizes every batch. A batch that
/// fails is reported and skipped; the others still happen.
pub fn synthesize_all(
    map: &mut Map,
    ids: &mut dyn IdAllocator,
    timer: &mut Timer,
) -> Vec<Synthesis> {
    timer.start("collect junction entries");
    let batches = collect_entry_batches(map).get(timer);
    timer.stop("collect junction entries");

    timer.start(format!("synthesize {} junctions", batches.len()));
    let mut results = Vec::new();
    for batch in batches {
        match synthesize(map, &batch, ids) {
            Ok(synthesis) => {
                results.push(synthesis.get(timer));
            }
            Err(err) => {
                timer.warn(format!("Skipping a batch of {} entries: {}", batch.len(), err));
            }
        }
    }
    timer.stop(format!("synthesize {} junctions", results.len()));
    results
}

/// Every (entry, exit) pair that should get a connecting road, straight-through pairs first.
fn find_pairs(
    entries: &[JunctionEntry],
    side: DrivingSide,
) -> Vec<(&JunctionEntry, &JunctionEntry, ManeuverType)> {
    let mut pairs = Vec::new();

    // Straight through keeps lane counts: lane n continues as lane n
    for (idx, a) in entries.iter().enumerate() {
        for b in &entries[idx + 1..] {
            if a.road == b.road {
                continue;
            }
            let (entry, exit) = match (a.is_entry(side), b.is_entry(side)) {
                (true, false) => (a, b),
                (false, true) => (b, a),
                _ => continue,
            };
            if entry.lane.abs() == exit.lane.abs()
                && classify(entry, exit, side) == Some(ManeuverType::Straight)
            {
                pairs.push((entry, exit, ManeuverType::Straight));
            }
        }
    }

    // Turns only come from the lane at the matching edge of the road: the outermost lane turns
    // towards the curb, the innermost lane across traffic. They lead to the same edge of the
    // exit.
    let (curb_turn, crossing_turn) = match side {
        DrivingSide::Right => (ManeuverType::Right, ManeuverType::Left),
        DrivingSide::Left => (ManeuverType::Left, ManeuverType::Right),
    };
    let mut ends: BTreeMap<(RoadID, ContactPoint), Vec<&JunctionEntry>> = BTreeMap::new();
    for e in entries {
        ends.entry((e.road, e.contact)).or_insert_with(Vec::new).push(e);
    }
    for (from_end, from_lanes) in &ends {
        for (to_end, to_lanes) in &ends {
            if from_end.0 == to_end.0 {
                continue;
            }
            let incoming: Vec<&JunctionEntry> = from_lanes
                .iter()
                .filter(|e| e.is_entry(side))
                .cloned()
                .collect();
            let outgoing: Vec<&JunctionEntry> = to_lanes
                .iter()
                .filter(|e| !e.is_entry(side))
                .cloned()
                .collect();

            for (turn, outermost) in [(curb_turn, true), (crossing_turn, false)] {
                if let (Some(entry), Some(exit)) = (
                    edge_lane(&incoming, outermost),
                    edge_lane(&outgoing, outermost),
                ) {
                    if classify(entry, exit, side) == Some(turn) {
                        pairs.push((entry, exit, turn));
                    }
                }
            }
        }
    }

    pairs
}

fn edge_lane<'a>(lanes: &[&'a JunctionEntry], outermost: bool) -> Option<&'a JunctionEntry> {
    if outermost {
        lanes.iter().max_by_key(|e| e.lane.abs()).cloned()
    } else {
        lanes.iter().min_by_key(|e| e.lane.abs()).cloned()
    }
}

fn connecting_lane_id(side: DrivingSide) -> i32 {
    match side {
        DrivingSide::Right => -1,
        DrivingSide::Left => 1,
    }
}

/// A one-lane road inside the junction, from the entry lane's inner border to the exit lane's.
fn connecting_road(
    id: RoadID,
    junction: JunctionID,
    entry: &JunctionEntry,
    exit: &JunctionEntry,
    cfg: &crate::MapConfig,
) -> Result<Road, MapError> {
    let side = cfg.driving_side;
    let from = Pose::new(entry.pose.pt, entry.travel_heading(side));
    let to = Pose::new(exit.pose.pt, exit.travel_heading(side));
    let segment = CurveSegment::bridge(from, to, cfg.connecting_road_handle).map_err(|err| {
        MapError::InvalidGeometry {
            road: id,
            reason: format!("{:#}", err),
        }
    })?;

    let mut road = Road::from_segments(
        id,
        format!(
            "{} lane {} to {} lane {}",
            entry.road, entry.lane, exit.road, exit.lane
        ),
        vec![segment],
    )?;
    road.junction = Some(junction);
    road.predecessor = Some(RoadLink::Road {
        id: entry.road,
        contact: entry.contact,
    });
    road.successor = Some(RoadLink::Road {
        id: exit.road,
        contact: exit.contact,
    });

    road.add_lane_section(0.0, true)?;
    road.add_lane(0.0, Lane::new(0, LaneType::None))?;
    let mut lane = Lane::new(connecting_lane_id(side), LaneType::Driving);
    lane.add_width(CubicPoly::constant(0.0, entry.width));
    lane.predecessor = Some(entry.lane);
    lane.successor = Some(exit.lane);
    road.add_lane(0.0, lane)?;
    Ok(road)
}
