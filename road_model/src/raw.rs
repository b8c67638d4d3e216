//! Typed records of a road network, as a document reader hands them over and as they're written
//! back out. Field names follow the OpenDRIVE attributes.

use serde::{Deserialize, Serialize};

use roadutil::Tags;

use crate::{ContactPoint, LaneType};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMap {
    #[serde(default)]
    pub name: String,
    pub roads: Vec<RoadRecord>,
    #[serde(default)]
    pub junctions: Vec<JunctionRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadRecord {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub length: f64,
    /// -1 for roads outside any junction. A missing value means the same.
    #[serde(default = "no_junction")]
    pub junction: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<LinkRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor: Option<LinkRecord>,
    pub plan_view: Vec<GeometryRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elevation: Vec<PolyRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lane_offset: Vec<PolyRecord>,
    pub lane_sections: Vec<LaneSectionRecord>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub user_data: Tags,
}

fn no_junction() -> i64 {
    -1
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Road,
    Junction,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub element_type: ElementType,
    pub element_id: i64,
    /// Only meaningful when linking to a road.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_point: Option<ContactPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    pub s: f64,
    pub x: f64,
    pub y: f64,
    pub hdg: f64,
    pub length: f64,
    #[serde(flatten)]
    pub shape: ShapeRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShapeRecord {
    Line,
    Arc {
        curvature: f64,
    },
    Spiral {
        #[serde(rename = "curvStart")]
        curv_start: f64,
        #[serde(rename = "curvEnd")]
        curv_end: f64,
    },
    Poly3 {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    },
    ParamPoly3 {
        #[serde(rename = "aU")]
        au: f64,
        #[serde(rename = "bU")]
        bu: f64,
        #[serde(rename = "cU")]
        cu: f64,
        #[serde(rename = "dU")]
        du: f64,
        #[serde(rename = "aV")]
        av: f64,
        #[serde(rename = "bV")]
        bv: f64,
        #[serde(rename = "cV")]
        cv: f64,
        #[serde(rename = "dV")]
        dv: f64,
        #[serde(rename = "pRange")]
        p_range: PRange,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PRange {
    ArcLength,
    Normalized,
}

/// `elevation` and `laneOffset` entries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolyRecord {
    pub s: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneSectionRecord {
    pub s: f64,
    #[serde(default)]
    pub single_side: bool,
    pub lanes: Vec<LaneRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneRecord {
    pub id: i32,
    #[serde(rename = "type")]
    pub lane_type: LaneType,
    #[serde(default)]
    pub level: bool,
    #[serde(default)]
    pub width: Vec<WidthRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor: Option<i32>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub user_data: Tags,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidthRecord {
    pub s_offset: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JunctionRecord {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connections: Vec<JunctionConnectionRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JunctionConnectionRecord {
    pub id: i64,
    pub incoming_road: i64,
    pub connecting_road: i64,
    pub contact_point: ContactPoint,
    /// Not part of the file format; filled in when it's known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outgoing_road: Option<i64>,
    #[serde(rename = "laneLink", default)]
    pub lane_links: Vec<LaneLinkRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLinkRecord {
    pub from: i32,
    pub to: i32,
}
