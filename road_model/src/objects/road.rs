use std::fmt;

use serde::{Deserialize, Serialize};

use geom::{eval_cubic, CurveSegment, Pose, Pt2D, RoadSpline, SplineProjection};
use roadutil::Tags;

use crate::{JunctionID, Lane, LaneSection, MapError};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadID(pub i64);

impl fmt::Display for RoadID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Road #{}", self.0)
    }
}

/// Which end of a road participates in a link.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPoint {
    Start,
    End,
}

impl ContactPoint {
    pub fn other(self) -> ContactPoint {
        match self {
            ContactPoint::Start => ContactPoint::End,
            ContactPoint::End => ContactPoint::Start,
        }
    }
}

/// What a road end is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadLink {
    Road { id: RoadID, contact: ContactPoint },
    Junction(JunctionID),
}

/// One piece of a piecewise cubic along `s`: `a + b*ds + c*ds^2 + d*ds^3` with `ds` measured
/// from `s`. Lane widths use the same shape, with `s` relative to their lane section.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicPoly {
    pub s: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl CubicPoly {
    pub fn constant(s: f64, a: f64) -> CubicPoly {
        CubicPoly {
            s,
            a,
            b: 0.0,
            c: 0.0,
            d: 0.0,
        }
    }

    pub fn eval(&self, s: f64) -> f64 {
        eval_cubic(self.a, self.b, self.c, self.d, s - self.s)
    }
}

/// The last piece starting at or before `s` wins. Before the first piece, the value is 0.
pub(crate) fn eval_piecewise(pieces: &[CubicPoly], s: f64) -> f64 {
    let idx = pieces.partition_point(|p| p.s <= s);
    if idx == 0 {
        0.0
    } else {
        pieces[idx - 1].eval(s)
    }
}

/// Keeps pieces sorted by `s`; a piece with an equal `s` goes after the existing ones.
pub(crate) fn insert_piece(pieces: &mut Vec<CubicPoly>, piece: CubicPoly) {
    let idx = pieces.partition_point(|p| p.s <= piece.s);
    pieces.insert(idx, piece);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Road {
    pub id: RoadID,
    pub name: String,
    /// Set for connecting roads inside a junction.
    pub junction: Option<JunctionID>,
    pub predecessor: Option<RoadLink>,
    pub successor: Option<RoadLink>,
    pub user_data: Tags,

    spline: RoadSpline,
    // The length a file declared, kept while the reference line is unchanged
    declared_length: Option<f64>,
    // Sorted by s
    lane_sections: Vec<LaneSection>,
    lane_offsets: Vec<CubicPoly>,
    elevations: Vec<CubicPoly>,
}

impl Road {
    pub fn new<S: Into<String>>(id: RoadID, name: S, spline: RoadSpline) -> Road {
        Road {
            id,
            name: name.into(),
            junction: None,
            predecessor: None,
            successor: None,
            user_data: Tags::empty(),
            spline,
            declared_length: None,
            lane_sections: Vec::new(),
            lane_offsets: Vec::new(),
            elevations: Vec::new(),
        }
    }

    /// Rebuilds the reference line from scratch.
    pub fn from_segments<S: Into<String>>(
        id: RoadID,
        name: S,
        segments: Vec<CurveSegment>,
    ) -> Result<Road, MapError> {
        let spline = RoadSpline::new(segments).map_err(|err| MapError::InvalidGeometry {
            road: id,
            reason: format!("{:#}", err),
        })?;
        Ok(Road::new(id, name, spline))
    }

    pub fn length(&self) -> f64 {
        self.spline.length()
    }

    pub fn spline(&self) -> &RoadSpline {
        &self.spline
    }

    /// The length to write out: what the road was loaded with, unless the reference line has
    /// been rebuilt since.
    pub fn declared_length(&self) -> f64 {
        self.declared_length.unwrap_or_else(|| self.length())
    }

    pub(crate) fn set_declared_length(&mut self, length: f64) {
        self.declared_length = Some(length);
    }

    pub(crate) fn set_spline(&mut self, spline: RoadSpline) {
        self.spline = spline;
        self.declared_length = None;
    }

    pub fn is_connecting_road(&self) -> bool {
        self.junction.is_some()
    }

    pub fn link(&self, contact: ContactPoint) -> Option<RoadLink> {
        match contact {
            ContactPoint::Start => self.predecessor,
            ContactPoint::End => self.successor,
        }
    }

    pub fn set_link(&mut self, contact: ContactPoint, link: Option<RoadLink>) {
        match contact {
            ContactPoint::Start => self.predecessor = link,
            ContactPoint::End => self.successor = link,
        }
    }

    pub fn contact_s(&self, contact: ContactPoint) -> f64 {
        match contact {
            ContactPoint::Start => 0.0,
            ContactPoint::End => self.length(),
        }
    }

    pub fn lane_sections(&self) -> &Vec<LaneSection> {
        &self.lane_sections
    }

    pub fn lane_section_mut(&mut self, idx: usize) -> Option<&mut LaneSection> {
        self.lane_sections.get_mut(idx)
    }

    /// Inserts an empty lane section, keeping sections sorted by `s`. Returns its index. Only an
    /// exact duplicate `s` is rejected.
    pub fn add_lane_section(&mut self, s: f64, single_sided: bool) -> Result<usize, MapError> {
        if !s.is_finite() {
            return Err(MapError::InvalidGeometry {
                road: self.id,
                reason: format!("lane section at s={}", s),
            });
        }
        if self.lane_sections.iter().any(|sec| sec.s == s) {
            return Err(MapError::DuplicateS { road: self.id, s });
        }
        let idx = self.lane_sections.partition_point(|sec| sec.s < s);
        self.lane_sections
            .insert(idx, LaneSection::new(self.id, s, single_sided));
        Ok(idx)
    }

    /// Adds a lane to the lane section active at `s`.
    pub fn add_lane(&mut self, s: f64, lane: Lane) -> Result<(), MapError> {
        let idx = self.lane_section_idx_at(s)?;
        self.lane_sections[idx].add_lane(lane)
    }

    /// The index of the last lane section starting at or before `s`. `s` is first clamped to the
    /// road.
    pub fn lane_section_idx_at(&self, s: f64) -> Result<usize, MapError> {
        let s = self.clamp_s(s);
        let idx = self.lane_sections.partition_point(|sec| sec.s <= s);
        if idx == 0 {
            return Err(MapError::NoLaneSection { road: self.id, s });
        }
        Ok(idx - 1)
    }

    pub fn lane_section_at(&self, s: f64) -> Result<&LaneSection, MapError> {
        let idx = self.lane_section_idx_at(s)?;
        Ok(&self.lane_sections[idx])
    }

    /// A section is valid from its own `s` until the next section's, or the end of the road.
    pub fn section_range(&self, idx: usize) -> Option<(f64, f64)> {
        let start = self.lane_sections.get(idx)?.s;
        let end = self
            .lane_sections
            .get(idx + 1)
            .map(|next| next.s)
            .unwrap_or_else(|| self.length());
        Some((start, end))
    }

    /// The lane section at one end of the road.
    pub fn end_section(&self, contact: ContactPoint) -> Option<&LaneSection> {
        match contact {
            ContactPoint::Start => self.lane_sections.first(),
            ContactPoint::End => self.lane_sections.last(),
        }
    }

    pub fn lane_offsets(&self) -> &Vec<CubicPoly> {
        &self.lane_offsets
    }

    pub fn add_lane_offset(&mut self, poly: CubicPoly) {
        insert_piece(&mut self.lane_offsets, poly);
    }

    pub fn elevations(&self) -> &Vec<CubicPoly> {
        &self.elevations
    }

    pub fn add_elevation(&mut self, poly: CubicPoly) {
        insert_piece(&mut self.elevations, poly);
    }

    /// Lateral shift of the lane reference line away from the road reference line.
    pub fn lane_offset_at(&self, s: f64) -> f64 {
        eval_piecewise(&self.lane_offsets, self.clamp_s(s))
    }

    pub fn elevation_at(&self, s: f64) -> f64 {
        eval_piecewise(&self.elevations, self.clamp_s(s))
    }

    pub fn width_at(&self, lane: i32, s: f64) -> Result<f64, MapError> {
        let s = self.clamp_s(s);
        let section = self.lane_section_at(s)?;
        section
            .get_lane(lane)
            .map(|l| l.width_at(s - section.s))
            .ok_or(MapError::LaneNotFoundAtS {
                road: self.id,
                lane,
                s,
            })
    }

    /// The signed lateral offsets of a lane's inner and outer borders at `s`, relative to the
    /// road reference line. Includes the lane offset. The center lane has zero width.
    pub fn lane_border_t(&self, lane: i32, s: f64) -> Result<(f64, f64), MapError> {
        let s = self.clamp_s(s);
        let section = self.lane_section_at(s)?;
        let (inner, outer) = section
            .border_t(lane, s - section.s)
            .ok_or(MapError::LaneNotFoundAtS {
                road: self.id,
                lane,
                s,
            })?;
        let offset = self.lane_offset_at(s);
        Ok((inner + offset, outer + offset))
    }

    /// The reference line pose at `s`, shifted `t` along the left normal. The heading stays the
    /// reference line's.
    pub fn evaluate_pose(&self, s: f64, t: f64) -> Pose {
        self.spline.evaluate(s).pose().lateral_offset(t)
    }

    /// The pose at one end of the reference line.
    pub fn end_pose(&self, contact: ContactPoint) -> Pose {
        match contact {
            ContactPoint::Start => self.spline.start_pose(),
            ContactPoint::End => self.spline.end_pose(),
        }
    }

    pub fn project_point(&self, pt: Pt2D, step: f64) -> SplineProjection {
        self.spline.project(pt, step)
    }

    /// Checks lane id contiguity in every section.
    pub fn validate(&self) -> Result<(), MapError> {
        for section in &self.lane_sections {
            section.check_contiguous()?;
        }
        Ok(())
    }

    fn clamp_s(&self, s: f64) -> f64 {
        s.max(0.0).min(self.length())
    }
}
