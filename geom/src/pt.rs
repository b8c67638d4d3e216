use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Angle, EPSILON_DIST};

/// This represents world-space in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        Pt2D { x, y }
    }

    pub fn zero() -> Pt2D {
        Pt2D::new(0.0, 0.0)
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Moves `dist` along `theta`. A negative distance moves backwards.
    pub fn project_away(self, dist: f64, theta: Angle) -> Pt2D {
        let (sin, cos) = theta.normalized_radians().sin_cos();
        Pt2D::new(self.x + dist * cos, self.y + dist * sin)
    }

    pub fn angle_to(self, to: Pt2D) -> Angle {
        Angle::new_rads((to.y - self.y).atan2(to.x - self.x))
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt2D {
        Pt2D::new(self.x + dx, self.y + dy)
    }

    pub fn dist_to(self, to: Pt2D) -> f64 {
        ((self.x - to.x).powi(2) + (self.y - to.y).powi(2)).sqrt()
    }

    pub fn approx_eq(self, other: Pt2D, threshold: f64) -> bool {
        self.dist_to(other) <= threshold
    }

    pub fn approx_same(self, other: Pt2D) -> bool {
        self.approx_eq(other, EPSILON_DIST)
    }

    /// The average of the points.
    pub fn center(pts: &[Pt2D]) -> Pt2D {
        if pts.is_empty() {
            return Pt2D::zero();
        }
        let n = pts.len() as f64;
        Pt2D::new(
            pts.iter().map(|pt| pt.x).sum::<f64>() / n,
            pts.iter().map(|pt| pt.y).sum::<f64>() / n,
        )
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({0}, {1})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_away_both_directions() {
        let pt = Pt2D::new(1.0, 1.0);
        let fwd = pt.project_away(2.0, Angle::degrees(90.0));
        assert!(fwd.approx_eq(Pt2D::new(1.0, 3.0), 1e-12));
        let back = pt.project_away(-2.0, Angle::degrees(90.0));
        assert!(back.approx_eq(Pt2D::new(1.0, -1.0), 1e-12));
    }

    #[test]
    fn center_of_points() {
        let c = Pt2D::center(&[Pt2D::new(0.0, 0.0), Pt2D::new(4.0, 2.0)]);
        assert!(c.approx_same(Pt2D::new(2.0, 1.0)));
    }
}
