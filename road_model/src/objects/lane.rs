use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use roadutil::Tags;

use crate::objects::road::{eval_piecewise, insert_piece};
use crate::{CubicPoly, MapError, RoadID};

/// Lane types, named the way OpenDRIVE files spell them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LaneType {
    None,
    Driving,
    Stop,
    Shoulder,
    Biking,
    Sidewalk,
    Border,
    Restricted,
    Parking,
    Bidirectional,
    Median,
    Special1,
    Special2,
    Special3,
    RoadWorks,
    Tram,
    Rail,
    Entry,
    Exit,
    OffRamp,
    OnRamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneSide {
    Left,
    Center,
    Right,
}

impl LaneSide {
    pub fn of(id: i32) -> LaneSide {
        if id > 0 {
            LaneSide::Left
        } else if id < 0 {
            LaneSide::Right
        } else {
            LaneSide::Center
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    /// Negative on the right of the reference line, positive on the left, 0 for the center lane.
    pub id: i32,
    pub lane_type: LaneType,
    /// Excluded from superelevation and the like.
    pub level: bool,
    /// Lane id in the previous lane section, or across the road's predecessor link.
    pub predecessor: Option<i32>,
    pub successor: Option<i32>,
    pub user_data: Tags,

    // Sorted by s, which is relative to the start of the lane section
    widths: Vec<CubicPoly>,
}

impl Lane {
    pub fn new(id: i32, lane_type: LaneType) -> Lane {
        Lane {
            id,
            lane_type,
            level: false,
            predecessor: None,
            successor: None,
            user_data: Tags::empty(),
            widths: Vec::new(),
        }
    }

    pub fn side(&self) -> LaneSide {
        LaneSide::of(self.id)
    }

    pub fn is_driving(&self) -> bool {
        self.lane_type == LaneType::Driving
    }

    pub fn widths(&self) -> &Vec<CubicPoly> {
        &self.widths
    }

    pub fn add_width(&mut self, width: CubicPoly) {
        insert_piece(&mut self.widths, width);
    }

    /// `ds` is relative to the start of the lane section. The last record with `s <= ds` is
    /// used; before the first record, the width is 0.
    pub fn width_at(&self, ds: f64) -> f64 {
        if self.id == 0 {
            return 0.0;
        }
        eval_piecewise(&self.widths, ds)
    }
}

/// A span of a road with a fixed set of lanes, valid from `s` until the next section.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneSection {
    pub road: RoadID,
    pub s: f64,
    /// Only lanes on one side of the reference line.
    pub single_sided: bool,
    lanes: BTreeMap<i32, Lane>,
}

impl LaneSection {
    pub(crate) fn new(road: RoadID, s: f64, single_sided: bool) -> LaneSection {
        LaneSection {
            road,
            s,
            single_sided,
            lanes: BTreeMap::new(),
        }
    }

    pub fn add_lane(&mut self, lane: Lane) -> Result<(), MapError> {
        if self.lanes.contains_key(&lane.id) {
            return Err(MapError::DuplicateLaneId {
                road: self.road,
                s: self.s,
                lane: lane.id,
            });
        }
        self.lanes.insert(lane.id, lane);
        Ok(())
    }

    pub fn get_lane(&self, id: i32) -> Option<&Lane> {
        self.lanes.get(&id)
    }

    /// All lanes, from the rightmost to the leftmost.
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    /// Right lanes from the center outward: -1, -2, ...
    pub fn right_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.range(..0).rev().map(|(_, l)| l)
    }

    /// Left lanes from the center outward: 1, 2, ...
    pub fn left_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.range(1..).map(|(_, l)| l)
    }

    pub fn set_predecessor(&mut self, lane: i32, other: Option<i32>) -> Result<(), MapError> {
        self.lane_mut_or_err(lane)?.predecessor = other;
        Ok(())
    }

    pub fn set_successor(&mut self, lane: i32, other: Option<i32>) -> Result<(), MapError> {
        self.lane_mut_or_err(lane)?.successor = other;
        Ok(())
    }

    fn lane_mut_or_err(&mut self, lane: i32) -> Result<&mut Lane, MapError> {
        let (road, s) = (self.road, self.s);
        self.lanes
            .get_mut(&lane)
            .ok_or(MapError::LaneNotFoundAtS { road, lane, s })
    }

    /// Each side must be exactly `±1, ±2, ... ±n`.
    pub fn check_contiguous(&self) -> Result<(), MapError> {
        let right_ok = self
            .right_lanes()
            .enumerate()
            .all(|(idx, l)| l.id == -(idx as i32) - 1);
        let left_ok = self
            .left_lanes()
            .enumerate()
            .all(|(idx, l)| l.id == (idx as i32) + 1);
        if right_ok && left_ok {
            Ok(())
        } else {
            Err(MapError::NonContiguousLanes {
                road: self.road,
                s: self.s,
                ids: self.lanes.keys().cloned().collect(),
            })
        }
    }

    /// Signed offsets of a lane's inner and outer borders from the lane reference line, `ds`
    /// into the section.
    pub fn border_t(&self, lane: i32, ds: f64) -> Option<(f64, f64)> {
        self.lanes.get(&lane)?;
        let (inner_ids, sign) = if lane < 0 {
            ((lane + 1)..=-1, -1.0)
        } else if lane > 0 {
            (1..=(lane - 1), 1.0)
        } else {
            return Some((0.0, 0.0));
        };
        let mut inner = 0.0;
        for id in inner_ids {
            inner += self.lanes.get(&id).map(|l| l.width_at(ds)).unwrap_or(0.0);
        }
        let width = self.lanes[&lane].width_at(ds);
        Some((sign * inner, sign * (inner + width)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(ids: &[i32]) -> LaneSection {
        let mut sec = LaneSection::new(RoadID(3), 0.0, false);
        for id in ids {
            sec.add_lane(Lane::new(*id, LaneType::Driving)).unwrap();
        }
        sec
    }

    #[test]
    fn width_records() {
        let mut lane = Lane::new(-1, LaneType::Driving);
        lane.add_width(CubicPoly::constant(10.0, 3.0));
        lane.add_width(CubicPoly::constant(0.0, 2.0));
        assert_eq!(lane.width_at(5.0), 2.0);
        assert_eq!(lane.width_at(15.0), 3.0);
        assert_eq!(lane.width_at(10.0), 3.0);

        let mut late = Lane::new(2, LaneType::Sidewalk);
        late.add_width(CubicPoly {
            s: 4.0,
            a: 1.0,
            b: 0.5,
            c: 0.0,
            d: 0.0,
        });
        assert_eq!(late.width_at(2.0), 0.0);
        assert_eq!(late.width_at(6.0), 2.0);
    }

    #[test]
    fn contiguity() {
        assert!(section(&[0, -1, -2, 1]).check_contiguous().is_ok());
        assert!(section(&[-1]).check_contiguous().is_ok());
        assert!(section(&[]).check_contiguous().is_ok());
        assert_eq!(
            section(&[0, -1, -3]).check_contiguous(),
            Err(MapError::NonContiguousLanes {
                road: RoadID(3),
                s: 0.0,
                ids: vec![-3, -1, 0],
            })
        );
        assert!(section(&[2, 3]).check_contiguous().is_err());
    }

    #[test]
    fn duplicate_ids() {
        let mut sec = section(&[-1]);
        assert_eq!(
            sec.add_lane(Lane::new(-1, LaneType::Shoulder)),
            Err(MapError::DuplicateLaneId {
                road: RoadID(3),
                s: 0.0,
                lane: -1
            })
        );
    }

    #[test]
    fn links_need_the_lane() {
        let mut sec = section(&[-1, 1]);
        sec.set_successor(-1, Some(-2)).unwrap();
        assert_eq!(sec.get_lane(-1).unwrap().successor, Some(-2));
        // The other road's lane isn't checked
        sec.set_predecessor(1, Some(7)).unwrap();
        assert!(sec.set_successor(-2, Some(-1)).is_err());
    }

    #[test]
    fn sides_are_ordered_from_the_center() {
        let sec = section(&[2, -2, 0, 1, -1]);
        let right: Vec<i32> = sec.right_lanes().map(|l| l.id).collect();
        let left: Vec<i32> = sec.left_lanes().map(|l| l.id).collect();
        assert_eq!(right, vec![-1, -2]);
        assert_eq!(left, vec![1, 2]);
    }
}
