//! Planar geometry for road reference lines: points, headings, parametric curve segments and the
//! splines built from them.

mod angle;
mod bounds;
mod curve;
mod find_closest;
mod integrate;
mod polyline;
mod pose;
mod pt;
mod spline;

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::curve::{CurveKind, CurvePoint, CurveSegment, CurveShape, ParamRange};
pub use crate::find_closest::FindClosest;
pub use crate::integrate::gauss_legendre;
pub use crate::polyline::PolyLine;
pub use crate::pose::Pose;
pub use crate::pt::Pt2D;
pub use crate::spline::{RoadSpline, SplineProjection};

/// Two points closer than this are the same point.
pub const EPSILON_DIST: f64 = 1e-6;

/// A cubic `a + b*x + c*x^2 + d*x^3`, the building block of widths, offsets and elevations.
pub fn eval_cubic(a: f64, b: f64, c: f64, d: f64, x: f64) -> f64 {
    a + x * (b + x * (c + x * d))
}
