use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An angle, stored in radians. Not normalized until asked to be.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn new_rads(rads: f64) -> Angle {
        Angle(rads)
    }

    pub fn degrees(degs: f64) -> Angle {
        Angle(degs.to_radians())
    }

    pub fn opposite(self) -> Angle {
        Angle(self.0 + PI)
    }

    pub fn rotate_degs(self, degrees: f64) -> Angle {
        Angle(self.0 + degrees.to_radians())
    }

    pub fn rotate_rads(self, rads: f64) -> Angle {
        Angle(self.0 + rads)
    }

    /// The raw value, not normalized.
    pub fn radians(self) -> f64 {
        self.0
    }

    /// [0, 2pi)
    pub fn normalized_radians(self) -> f64 {
        let r = self.0.rem_euclid(2.0 * PI);
        // rem_euclid can round up to exactly 2pi
        if r >= 2.0 * PI {
            0.0
        } else {
            r
        }
    }

    /// [0, 360)
    pub fn normalized_degrees(self) -> f64 {
        self.normalized_radians().to_degrees()
    }

    /// The signed rotation from this angle to `target`, in (-180, 180] degrees. Positive is
    /// counter-clockwise.
    pub fn shortest_rotation_towards(self, target: Angle) -> f64 {
        let mut diff = target.normalized_degrees() - self.normalized_degrees();
        if diff > 180.0 {
            diff -= 360.0;
        } else if diff <= -180.0 {
            diff += 360.0;
        }
        diff
    }

    /// True if the two angles are within `within_degrees` of each other.
    pub fn approx_eq(self, other: Angle, within_degrees: f64) -> bool {
        self.shortest_rotation_towards(other).abs() <= within_degrees
    }

    /// Unit vector pointing along this angle.
    pub fn direction(self) -> (f64, f64) {
        let (sin, cos) = self.0.sin_cos();
        (cos, sin)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizing() {
        assert!((Angle::degrees(-90.0).normalized_degrees() - 270.0).abs() < 1e-9);
        assert!((Angle::degrees(720.0).normalized_degrees()).abs() < 1e-9);
    }

    #[test]
    fn shortest_rotation() {
        let east = Angle::degrees(0.0);
        assert!((east.shortest_rotation_towards(Angle::degrees(-90.0)) + 90.0).abs() < 1e-9);
        assert!((east.shortest_rotation_towards(Angle::degrees(270.0)) + 90.0).abs() < 1e-9);
        assert!((Angle::degrees(350.0).shortest_rotation_towards(Angle::degrees(10.0)) - 20.0).abs() < 1e-9);
        assert!((east.shortest_rotation_towards(Angle::degrees(180.0)) - 180.0).abs() < 1e-9);
    }
}
