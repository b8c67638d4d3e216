//! Mapping between curvilinear `(road, s, t)` coordinates and the world, plus stepping from lane
//! to lane.

use serde::{Deserialize, Serialize};

use geom::{PolyLine, Pose, Pt2D};

use crate::{ContactPoint, JunctionID, LaneType, Map, MapError, RoadID, RoadLink};

/// Projections this close are considered equally good.
const TIE_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadPosition {
    pub road: RoadID,
    pub s: f64,
    pub t: f64,
    /// Distance from the query point to the reference line.
    pub dist: f64,
}

/// Travel along a road's reference line: towards increasing or decreasing `s`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Fwd,
    Back,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Fwd => Direction::Back,
            Direction::Back => Direction::Fwd,
        }
    }
}

/// One lane inside one lane section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaneRef {
    pub road: RoadID,
    pub section: usize,
    pub lane: i32,
}

/// Everything about a lane at one `s`, for things moving along it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LaneView {
    pub lane: LaneRef,
    pub s: f64,
    pub section_start: f64,
    pub section_end: f64,
    pub lane_type: LaneType,
    pub level: bool,
    pub width: f64,
    /// Signed offsets of the inner and outer borders from the road reference line
    pub inner_t: f64,
    pub outer_t: f64,
    /// On the middle of the lane, with the reference line's heading
    pub center: Pose,
    pub z: f64,
    pub predecessor: Option<i32>,
    pub successor: Option<i32>,
}

impl Map {
    /// The globally closest projection of `pt` onto any road's reference line. Ties are broken
    /// by the smallest `|t|`. None only for an empty map.
    pub fn world_to_road(&self, pt: Pt2D) -> Option<RoadPosition> {
        let mut best: Option<RoadPosition> = None;
        for (id, bbox_dist) in self.road_candidates(pt) {
            // Bounding boxes are visited in increasing distance, and nothing inside a box is
            // closer than the box itself.
            if let Some(ref b) = best {
                if bbox_dist > b.dist + TIE_EPSILON {
                    break;
                }
            }
            let road = match self.maybe_get_r(id) {
                Some(r) => r,
                None => continue,
            };
            let proj = road.project_point(pt, self.config.projection_step);
            let candidate = RoadPosition {
                road: id,
                s: proj.s,
                t: proj.t,
                dist: proj.dist,
            };
            best = Some(match best {
                None => candidate,
                Some(b) => {
                    if candidate.dist < b.dist - TIE_EPSILON
                        || ((candidate.dist - b.dist).abs() <= TIE_EPSILON
                            && candidate.t.abs() < b.t.abs())
                    {
                        candidate
                    } else {
                        b
                    }
                }
            });
        }
        best
    }

    /// The pose `t` to the left of the reference line at `s`. With `with_lane_offset`, `t` is
    /// measured from the lane reference line instead.
    pub fn road_to_world(
        &self,
        road: RoadID,
        s: f64,
        t: f64,
        with_lane_offset: bool,
    ) -> Result<Pose, MapError> {
        let road = self.get_r(road)?;
        let offset = if with_lane_offset {
            road.lane_offset_at(s)
        } else {
            0.0
        };
        Ok(road.evaluate_pose(s, t + offset))
    }

    /// The middle of a lane at `s`.
    pub fn lane_to_world(&self, road: RoadID, lane: i32, s: f64) -> Result<Pt2D, MapError> {
        Ok(self.lane_pose(road, lane, s)?.pt)
    }

    pub fn lane_pose(&self, road: RoadID, lane: i32, s: f64) -> Result<Pose, MapError> {
        let r = self.get_r(road)?;
        let (inner, outer) = r.lane_border_t(lane, s)?;
        Ok(r.evaluate_pose(s, (inner + outer) / 2.0))
    }

    pub fn query_lane_at(&self, road: RoadID, lane: i32, s: f64) -> Result<LaneView, MapError> {
        let r = self.get_r(road)?;
        let section_idx = r.lane_section_idx_at(s)?;
        let section = &r.lane_sections()[section_idx];
        let l = section.get_lane(lane).ok_or(MapError::LaneNotFoundAtS { road, lane, s })?;
        let (section_start, section_end) = r
            .section_range(section_idx)
            .ok_or(MapError::NoLaneSection { road, s })?;
        let (inner_t, outer_t) = r.lane_border_t(lane, s)?;
        Ok(LaneView {
            lane: LaneRef {
                road,
                section: section_idx,
                lane,
            },
            s,
            section_start,
            section_end,
            lane_type: l.lane_type,
            level: l.level,
            width: (outer_t - inner_t).abs(),
            inner_t,
            outer_t,
            center: r.evaluate_pose(s, (inner_t + outer_t) / 2.0),
            z: r.elevation_at(s),
            predecessor: l.predecessor,
            successor: l.successor,
        })
    }

    /// The middle of a lane across its whole lane section, sampled at most `step` apart along
    /// the reference line.
    pub fn lane_center_line(&self, at: LaneRef, step: f64) -> Result<PolyLine, MapError> {
        let road = self.get_r(at.road)?;
        let (start, end) = road.section_range(at.section).ok_or(MapError::NoLaneSection {
            road: at.road,
            s: 0.0,
        })?;
        let section = &road.lane_sections()[at.section];
        section.get_lane(at.lane).ok_or(MapError::LaneNotFoundAtS {
            road: at.road,
            lane: at.lane,
            s: start,
        })?;

        let mut stations: Vec<f64> = road
            .spline()
            .sample(step)
            .into_iter()
            .map(|(s, _)| s)
            .filter(|s| *s > start && *s < end)
            .collect();
        stations.insert(0, start);
        stations.push(end);

        let mut pts = Vec::new();
        for s in stations {
            // Evaluate with this section, even at its end where the next one takes over
            let ds = s - start;
            let (inner, outer) = section.border_t(at.lane, ds).unwrap_or((0.0, 0.0));
            let offset = road.lane_offset_at(s);
            pts.push(road.evaluate_pose(s, offset + (inner + outer) / 2.0).pt);
        }
        PolyLine::new(pts).map_err(|err| MapError::InvalidGeometry {
            road: at.road,
            reason: format!("{:#}", err),
        })
    }

    /// Where traffic moving in `dir` can go after this lane, and which way it then moves. Broken
    /// or missing links just produce nothing.
    pub fn next_lanes(&self, at: LaneRef, dir: Direction) -> Vec<(LaneRef, Direction)> {
        let road = match self.maybe_get_r(at.road) {
            Some(r) => r,
            None => return Vec::new(),
        };
        let lane = match road
            .lane_sections()
            .get(at.section)
            .and_then(|sec| sec.get_lane(at.lane))
        {
            Some(l) => l,
            None => return Vec::new(),
        };
        let linked_lane = match dir {
            Direction::Fwd => lane.successor,
            Direction::Back => lane.predecessor,
        };

        let next_section = match dir {
            Direction::Fwd => Some(at.section + 1).filter(|idx| *idx < road.lane_sections().len()),
            Direction::Back => at.section.checked_sub(1),
        };
        if let Some(section) = next_section {
            return linked_lane
                .filter(|id| road.lane_sections()[section].get_lane(*id).is_some())
                .map(|id| {
                    vec![(
                        LaneRef {
                            road: at.road,
                            section,
                            lane: id,
                        },
                        dir,
                    )]
                })
                .unwrap_or_default();
        }

        let contact = match dir {
            Direction::Fwd => ContactPoint::End,
            Direction::Back => ContactPoint::Start,
        };
        match road.link(contact) {
            None => Vec::new(),
            Some(RoadLink::Road { id, contact }) => linked_lane
                .and_then(|lane| self.enter_road(id, contact, lane))
                .into_iter()
                .collect(),
            Some(RoadLink::Junction(j)) => self.through_junction(j, at.road, contact, at.lane),
        }
    }

    /// The first of `next_lanes`, in connection order.
    pub fn next_lane(&self, at: LaneRef, dir: Direction) -> Option<(LaneRef, Direction)> {
        self.next_lanes(at, dir).into_iter().next()
    }

    /// Steps against the direction of travel. The returned direction is still the direction of
    /// travel on the previous lane.
    pub fn prev_lane(&self, at: LaneRef, dir: Direction) -> Option<(LaneRef, Direction)> {
        self.next_lane(at, dir.opposite())
            .map(|(lane, d)| (lane, d.opposite()))
    }

    fn enter_road(
        &self,
        id: RoadID,
        contact: ContactPoint,
        lane: i32,
    ) -> Option<(LaneRef, Direction)> {
        let road = self.maybe_get_r(id)?;
        let section = match contact {
            ContactPoint::Start => 0,
            ContactPoint::End => road.lane_sections().len().checked_sub(1)?,
        };
        road.lane_sections().get(section)?.get_lane(lane)?;
        let dir = match contact {
            ContactPoint::Start => Direction::Fwd,
            ContactPoint::End => Direction::Back,
        };
        Some((LaneRef { road: id, section, lane }, dir))
    }

    fn through_junction(
        &self,
        junction: JunctionID,
        from_road: RoadID,
        from_contact: ContactPoint,
        lane: i32,
    ) -> Vec<(LaneRef, Direction)> {
        let junction = match self.maybe_get_j(junction) {
            Some(j) => j,
            None => return Vec::new(),
        };
        let here = RoadLink::Road {
            id: from_road,
            contact: from_contact,
        };
        let mut result = Vec::new();

        for conn in junction.connections() {
            if conn.incoming_road != from_road {
                continue;
            }
            let touches = self
                .maybe_get_r(conn.connecting_road)
                .map(|r| r.link(conn.contact_point).map(|l| l == here).unwrap_or(true))
                .unwrap_or(false);
            if !touches {
                continue;
            }
            if let Some(link) = conn.link_from(lane) {
                if let Some(next) = self.enter_road(conn.connecting_road, conn.contact_point, link.to)
                {
                    result.push(next);
                }
            }
        }

        // Connections are only listed for incoming roads. Lanes on connecting roads also name
        // their neighbors, which covers moving against that flow.
        for id in junction.connecting_roads() {
            let road = match self.maybe_get_r(id) {
                Some(r) => r,
                None => continue,
            };
            for contact in [ContactPoint::Start, ContactPoint::End] {
                if road.link(contact) != Some(here) {
                    continue;
                }
                let section = match road.end_section(contact) {
                    Some(sec) => sec,
                    None => continue,
                };
                for l in section.lanes() {
                    let neighbor = match contact {
                        ContactPoint::Start => l.predecessor,
                        ContactPoint::End => l.successor,
                    };
                    if neighbor != Some(lane) {
                        continue;
                    }
                    if let Some(next) = self.enter_road(id, contact, l.id) {
                        if !result.contains(&next) {
                            result.push(next);
                        }
                    }
                }
            }
        }
        result
    }
}
