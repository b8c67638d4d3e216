use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::integrate::invert_monotonic;
use crate::{eval_cubic, gauss_legendre, Angle, Pose, Pt2D};

/// Below this, an arc is a line.
const MIN_CURVATURE: f64 = 1e-12;

/// How finely spirals and polynomials are integrated, in meters per quadrature piece.
const QUADRATURE_STEP: f64 = 2.0;

/// Upper bound on quadrature pieces for one spiral evaluation. Still exact to well under a
/// micrometer for spirals winding through dozens of radians.
const MAX_SPIRAL_PIECES: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurveKind {
    Line,
    Arc,
    Spiral,
    Poly3,
    ParamPoly3,
}

/// How the parameter `p` of a parametric cubic relates to arclength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamRange {
    /// `p` runs over `[0, length]` and is the arclength itself.
    ArcLength,
    /// `p` runs over `[0, 1]`.
    Normalized,
}

/// The kind-specific coefficients of a segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CurveShape {
    Line,
    Arc {
        curvature: f64,
    },
    /// Curvature changes linearly from `curv_start` to `curv_end` over the segment.
    Spiral {
        curv_start: f64,
        curv_end: f64,
    },
    /// `v = a + b*u + c*u^2 + d*u^3` in the local frame of the start pose.
    Poly3 {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    },
    /// `u(p)` and `v(p)` as independent cubics in the local frame of the start pose.
    ParamPoly3 {
        au: f64,
        bu: f64,
        cu: f64,
        du: f64,
        av: f64,
        bv: f64,
        cv: f64,
        dv: f64,
        p_range: ParamRange,
    },
}

impl CurveShape {
    pub fn kind(&self) -> CurveKind {
        match self {
            CurveShape::Line => CurveKind::Line,
            CurveShape::Arc { .. } => CurveKind::Arc,
            CurveShape::Spiral { .. } => CurveKind::Spiral,
            CurveShape::Poly3 { .. } => CurveKind::Poly3,
            CurveShape::ParamPoly3 { .. } => CurveKind::ParamPoly3,
        }
    }

    fn coefficients(&self) -> Vec<f64> {
        match self {
            CurveShape::Line => Vec::new(),
            CurveShape::Arc { curvature } => vec![*curvature],
            CurveShape::Spiral {
                curv_start,
                curv_end,
            } => vec![*curv_start, *curv_end],
            CurveShape::Poly3 { a, b, c, d } => vec![*a, *b, *c, *d],
            CurveShape::ParamPoly3 {
                au,
                bu,
                cu,
                du,
                av,
                bv,
                cv,
                dv,
                ..
            } => vec![*au, *bu, *cu, *du, *av, *bv, *cv, *dv],
        }
    }
}

/// Position, heading and curvature at some point along a curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurvePoint {
    pub pt: Pt2D,
    pub heading: Angle,
    pub curvature: f64,
}

impl CurvePoint {
    pub fn pose(self) -> Pose {
        Pose::new(self.pt, self.heading)
    }
}

/// One parametric geometry primitive of a road's reference line, valid over `[s, s + length]`
/// of the owning spline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveSegment {
    s: f64,
    start: Pt2D,
    heading: Angle,
    length: f64,
    shape: CurveShape,
}

impl CurveSegment {
    pub fn new(
        s: f64,
        start: Pt2D,
        heading: Angle,
        length: f64,
        shape: CurveShape,
    ) -> Result<CurveSegment> {
        let seg = CurveSegment {
            s,
            start,
            heading,
            length,
            shape,
        };
        seg.validate()?;
        Ok(seg)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.length > 0.0) || !self.length.is_finite() {
            bail!("{:?} segment has non-positive length {}", self.kind(), self.length);
        }
        if !self.s.is_finite() || !self.start.is_finite() || !self.heading.radians().is_finite()
        {
            bail!(
                "{:?} segment has a non-finite start s={} {} {}",
                self.kind(),
                self.s,
                self.start,
                self.heading
            );
        }
        if self.shape.coefficients().iter().any(|x| !x.is_finite()) {
            bail!("{:?} segment has non-finite coefficients", self.kind());
        }
        Ok(())
    }

    /// A normalized parametric cubic leaving `from` and arriving at `to` with matching headings.
    /// The inner Bezier handles are `handle_fraction` of the distance between the two points.
    pub fn bridge(from: Pose, to: Pose, handle_fraction: f64) -> Result<CurveSegment> {
        let end = from.to_local(to.pt);
        let handle = handle_fraction * from.pt.dist_to(to.pt);
        if !(handle > 0.0) {
            bail!("Can't bridge {} and {}; they're the same point", from, to);
        }
        let end_dir = to.heading.rotate_rads(-from.heading.radians()).direction();

        // Cubic Bezier control points in the local frame, with p0 at the origin
        let p1 = (handle, 0.0);
        let p2 = (end.x() - handle * end_dir.0, end.y() - handle * end_dir.1);
        let p3 = (end.x(), end.y());

        let shape = CurveShape::ParamPoly3 {
            au: 0.0,
            bu: 3.0 * p1.0,
            cu: 3.0 * (p2.0 - 2.0 * p1.0),
            du: 3.0 * p1.0 - 3.0 * p2.0 + p3.0,
            av: 0.0,
            bv: 3.0 * p1.1,
            cv: 3.0 * (p2.1 - 2.0 * p1.1),
            dv: 3.0 * p1.1 - 3.0 * p2.1 + p3.1,
            p_range: ParamRange::Normalized,
        };
        let length = param_poly3_length(&shape, 1.0);
        CurveSegment::new(0.0, from.pt, from.heading, length, shape)
    }

    pub fn s(&self) -> f64 {
        self.s
    }

    pub(crate) fn set_s(&mut self, s: f64) {
        self.s = s;
    }

    pub fn start(&self) -> Pt2D {
        self.start
    }

    pub fn heading(&self) -> Angle {
        self.heading
    }

    pub fn start_pose(&self) -> Pose {
        Pose::new(self.start, self.heading)
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn shape(&self) -> &CurveShape {
        &self.shape
    }

    pub fn kind(&self) -> CurveKind {
        self.shape.kind()
    }

    pub fn end_point(&self) -> CurvePoint {
        self.point_at(self.length)
    }

    /// Evaluates the curve `ds` along the segment. Out-of-range values clamp to the ends.
    pub fn point_at(&self, ds: f64) -> CurvePoint {
        // f64::max maps NaN to 0
        let ds = ds.max(0.0).min(self.length);
        let (local, local_heading, curvature) = match self.shape {
            CurveShape::Line => ((ds, 0.0), 0.0, 0.0),
            CurveShape::Arc { curvature } => arc_local(curvature, ds),
            CurveShape::Spiral {
                curv_start,
                curv_end,
            } => spiral_local(curv_start, curv_end, self.length, ds),
            CurveShape::Poly3 { a, b, c, d } => poly3_local(a, b, c, d, ds),
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
            } => {
                let p = match p_range {
                    ParamRange::ArcLength => ds,
                    ParamRange::Normalized => ds / self.length,
                };
                param_poly3_local([au, bu, cu, du], [av, bv, cv, dv], p)
            }
        };

        CurvePoint {
            pt: self.start_pose().to_world(Pt2D::new(local.0, local.1)),
            heading: self.heading.rotate_rads(local_heading),
            curvature,
        }
    }
}

impl fmt::Display for CurveSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?} at s={} from {} {}, length {}",
            self.kind(),
            self.s,
            self.start,
            self.heading,
            self.length
        )
    }
}

type Local = ((f64, f64), f64, f64);

fn arc_local(curvature: f64, ds: f64) -> Local {
    if curvature.abs() < MIN_CURVATURE {
        return ((ds, 0.0), 0.0, curvature);
    }
    let theta = curvature * ds;
    (
        (theta.sin() / curvature, (1.0 - theta.cos()) / curvature),
        theta,
        curvature,
    )
}

/// Integrates the clothoid directly: heading is quadratic in arclength, so position is a pair of
/// Fresnel-type integrals.
fn spiral_local(curv_start: f64, curv_end: f64, length: f64, ds: f64) -> Local {
    let rate = (curv_end - curv_start) / length;
    let theta = |s: f64| curv_start * s + rate * s * s / 2.0;
    let pieces = spiral_pieces(curv_start.abs().max(curv_end.abs()), ds);

    let x = gauss_legendre(|s| theta(s).cos(), 0.0, ds, pieces);
    let y = gauss_legendre(|s| theta(s).sin(), 0.0, ds, pieces);
    ((x, y), theta(ds), curv_start + rate * ds)
}

/// Enough pieces that each turns through at most a quarter radian, up to `MAX_SPIRAL_PIECES`.
fn spiral_pieces(max_curvature: f64, ds: f64) -> usize {
    let wanted = (ds * (1.0 / QUADRATURE_STEP + 4.0 * max_curvature)).ceil();
    if wanted.is_finite() {
        (wanted as usize).clamp(1, MAX_SPIRAL_PIECES)
    } else {
        MAX_SPIRAL_PIECES
    }
}

/// `ds` is arclength, but the cubic is in terms of `u`, so invert the arclength integral first.
fn poly3_local(a: f64, b: f64, c: f64, d: f64, ds: f64) -> Local {
    let slope = |u: f64| b + u * (2.0 * c + 3.0 * d * u);
    let speed = |u: f64| (1.0 + slope(u).powi(2)).sqrt();
    let arclength = |u: f64| {
        gauss_legendre(
            speed,
            0.0,
            u,
            (u.abs() / QUADRATURE_STEP).ceil() as usize,
        )
    };
    // Since speed >= 1, u never exceeds ds
    let u = invert_monotonic(arclength, speed, ds, ds);

    let v = eval_cubic(a, b, c, d, u);
    let dv = slope(u);
    let ddv = 2.0 * c + 6.0 * d * u;
    ((u, v), dv.atan(), ddv / (1.0 + dv * dv).powf(1.5))
}

fn param_poly3_local(u: [f64; 4], v: [f64; 4], p: f64) -> Local {
    let x = eval_cubic(u[0], u[1], u[2], u[3], p);
    let y = eval_cubic(v[0], v[1], v[2], v[3], p);
    let (dx, dy) = (
        u[1] + p * (2.0 * u[2] + 3.0 * u[3] * p),
        v[1] + p * (2.0 * v[2] + 3.0 * v[3] * p),
    );
    let (ddx, ddy) = (2.0 * u[2] + 6.0 * u[3] * p, 2.0 * v[2] + 6.0 * v[3] * p);
    let speed_sq = dx * dx + dy * dy;
    let curvature = if speed_sq > 1e-18 {
        (dx * ddy - dy * ddx) / speed_sq.powf(1.5)
    } else {
        0.0
    };
    ((x, y), dy.atan2(dx), curvature)
}

/// The arclength of a parametric cubic over `p` in `[0, p_max]`.
fn param_poly3_length(shape: &CurveShape, p_max: f64) -> f64 {
    if let CurveShape::ParamPoly3 {
        bu,
        cu,
        du,
        bv,
        cv,
        dv,
        ..
    } = *shape
    {
        gauss_legendre(
            |p| {
                let dx = bu + p * (2.0 * cu + 3.0 * du * p);
                let dy = bv + p * (2.0 * cv + 3.0 * dv * p);
                (dx * dx + dy * dy).sqrt()
            },
            0.0,
            p_max,
            32,
        )
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn seg(length: f64, shape: CurveShape) -> CurveSegment {
        CurveSegment::new(0.0, Pt2D::new(1.0, 2.0), Angle::ZERO, length, shape).unwrap()
    }

    #[test]
    fn rejects_bad_length() {
        assert!(CurveSegment::new(0.0, Pt2D::zero(), Angle::ZERO, 0.0, CurveShape::Line).is_err());
        assert!(
            CurveSegment::new(0.0, Pt2D::zero(), Angle::ZERO, -3.0, CurveShape::Line).is_err()
        );
        assert!(CurveSegment::new(
            0.0,
            Pt2D::zero(),
            Angle::ZERO,
            f64::NAN,
            CurveShape::Line
        )
        .is_err());
    }

    #[test]
    fn line_clamps() {
        let line = seg(10.0, CurveShape::Line);
        assert!(line.point_at(4.0).pt.approx_eq(Pt2D::new(5.0, 2.0), 1e-12));
        assert!(line.point_at(12.0).pt.approx_eq(Pt2D::new(11.0, 2.0), 1e-12));
        assert!(line.point_at(-1.0).pt.approx_eq(Pt2D::new(1.0, 2.0), 1e-12));
    }

    #[test]
    fn quarter_circle() {
        let radius = 10.0;
        let arc = seg(
            PI * radius / 2.0,
            CurveShape::Arc {
                curvature: 1.0 / radius,
            },
        );
        let end = arc.end_point();
        assert!(end.pt.approx_eq(Pt2D::new(11.0, 12.0), 1e-9));
        assert!((end.heading.normalized_degrees() - 90.0).abs() < 1e-9);
        assert!((end.curvature - 0.1).abs() < 1e-12);
    }

    #[test]
    fn spiral_with_constant_curvature_is_an_arc() {
        let k = 0.05;
        let spiral = seg(
            20.0,
            CurveShape::Spiral {
                curv_start: k,
                curv_end: k,
            },
        );
        let arc = seg(20.0, CurveShape::Arc { curvature: k });
        for ds in [0.0, 3.3, 10.0, 20.0] {
            assert!(spiral.point_at(ds).pt.approx_eq(arc.point_at(ds).pt, 1e-9));
        }
    }

    #[test]
    fn spiral_heading_and_curvature() {
        let spiral = seg(
            30.0,
            CurveShape::Spiral {
                curv_start: 0.0,
                curv_end: 0.02,
            },
        );
        let end = spiral.end_point();
        // theta = k_end * L / 2
        assert!((end.heading.radians() - 0.3).abs() < 1e-12);
        assert!((end.curvature - 0.02).abs() < 1e-12);
        // A gentle clothoid stays close to, but short of, its chord length
        let chord = spiral.start().dist_to(end.pt);
        assert!(chord < 30.0 && chord > 29.8);
    }

    #[test]
    fn tightly_wound_spiral() {
        // 400 radians of turning; integrating a quarter radian at a time would take 1700 pieces
        let k = 2.0;
        assert_eq!(spiral_pieces(k, 200.0), MAX_SPIRAL_PIECES);
        assert_eq!(spiral_pieces(0.0, 0.0), 1);
        assert_eq!(spiral_pieces(f64::INFINITY, 10.0), MAX_SPIRAL_PIECES);

        let spiral = seg(
            200.0,
            CurveShape::Spiral {
                curv_start: k,
                curv_end: k,
            },
        );
        let arc = seg(200.0, CurveShape::Arc { curvature: k });
        for ds in [17.0, 123.4, 200.0] {
            assert!(spiral.point_at(ds).pt.approx_eq(arc.point_at(ds).pt, 1e-6));
        }
    }

    #[test]
    fn poly3_flat_is_a_line() {
        let poly = seg(
            10.0,
            CurveShape::Poly3 {
                a: 0.0,
                b: 0.0,
                c: 0.0,
                d: 0.0,
            },
        );
        assert!(poly.point_at(7.0).pt.approx_eq(Pt2D::new(8.0, 2.0), 1e-9));
    }

    #[test]
    fn poly3_respects_arclength() {
        // v = u, a 45 degree line
        let poly = seg(
            10.0,
            CurveShape::Poly3 {
                a: 0.0,
                b: 1.0,
                c: 0.0,
                d: 0.0,
            },
        );
        let pt = poly.point_at(2.0_f64.sqrt() * 3.0);
        assert!(pt.pt.approx_eq(Pt2D::new(4.0, 5.0), 1e-9));
        assert!((pt.heading.normalized_degrees() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn param_poly3_ranges() {
        let normalized = seg(
            10.0,
            CurveShape::ParamPoly3 {
                au: 0.0,
                bu: 10.0,
                cu: 0.0,
                du: 0.0,
                av: 0.0,
                bv: 0.0,
                cv: 0.0,
                dv: 0.0,
                p_range: ParamRange::Normalized,
            },
        );
        let arclength = seg(
            10.0,
            CurveShape::ParamPoly3 {
                au: 0.0,
                bu: 1.0,
                cu: 0.0,
                du: 0.0,
                av: 0.0,
                bv: 0.0,
                cv: 0.0,
                dv: 0.0,
                p_range: ParamRange::ArcLength,
            },
        );
        for ds in [0.0, 2.5, 10.0] {
            assert!(normalized
                .point_at(ds)
                .pt
                .approx_eq(arclength.point_at(ds).pt, 1e-12));
        }
    }

    #[test]
    fn bridge_hits_both_ends() {
        let from = Pose::new(Pt2D::new(0.0, 0.0), Angle::ZERO);
        let to = Pose::new(Pt2D::new(10.0, -10.0), Angle::degrees(-90.0));
        let bridge = CurveSegment::bridge(from, to, 0.3).unwrap();
        assert!(bridge.point_at(0.0).pt.approx_eq(from.pt, 1e-9));
        let end = bridge.end_point();
        assert!(end.pt.approx_eq(to.pt, 1e-9));
        assert!(end.heading.approx_eq(to.heading, 1e-6));
        // Longer than the chord, shorter than going around the corner
        assert!(bridge.length() > 200.0_f64.sqrt() && bridge.length() < 20.0);
    }

    #[test]
    fn bridge_needs_distinct_points() {
        let pose = Pose::new(Pt2D::new(3.0, 3.0), Angle::ZERO);
        assert!(CurveSegment::bridge(pose, pose, 0.3).is_err());
    }
}
