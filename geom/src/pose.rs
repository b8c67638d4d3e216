use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Angle, Pt2D};

/// A position with a heading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub pt: Pt2D,
    pub heading: Angle,
}

impl Pose {
    pub fn new(pt: Pt2D, heading: Angle) -> Pose {
        Pose { pt, heading }
    }

    /// Moves along the heading. Negative distances move backwards.
    pub fn move_forward(self, dist: f64) -> Pose {
        Pose::new(self.pt.project_away(dist, self.heading), self.heading)
    }

    /// Moves along the left normal of the heading. Negative offsets go to the right.
    pub fn lateral_offset(self, t: f64) -> Pose {
        Pose::new(
            self.pt.project_away(t, self.heading.rotate_degs(90.0)),
            self.heading,
        )
    }

    /// Same position, facing the other way.
    pub fn reversed(self) -> Pose {
        Pose::new(self.pt, self.heading.opposite())
    }

    /// Expresses a world-space point in this pose's frame: x along the heading, y to the left.
    pub fn to_local(self, pt: Pt2D) -> Pt2D {
        let (cos, sin) = self.heading.direction();
        let dx = pt.x() - self.pt.x();
        let dy = pt.y() - self.pt.y();
        Pt2D::new(dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    /// The inverse of `to_local`.
    pub fn to_world(self, local: Pt2D) -> Pt2D {
        let (cos, sin) = self.heading.direction();
        Pt2D::new(
            self.pt.x() + local.x() * cos - local.y() * sin,
            self.pt.y() + local.x() * sin + local.y() * cos,
        )
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pose({}, {})", self.pt, self.heading)
    }
}
