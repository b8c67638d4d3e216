use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::{Bounds, Pt2D, EPSILON_DIST};

/// A sampled approximation of some curve, used for export and coarse searches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolyLine {
    pts: Vec<Pt2D>,
    length: f64,
}

impl PolyLine {
    /// Consecutive duplicate points are collapsed. Fails if fewer than two distinct points
    /// remain.
    pub fn new(pts: Vec<Pt2D>) -> Result<PolyLine> {
        let mut deduped: Vec<Pt2D> = Vec::with_capacity(pts.len());
        for pt in pts {
            if !pt.is_finite() {
                bail!("PolyLine has a non-finite point {}", pt);
            }
            if deduped
                .last()
                .map(|last| last.approx_eq(pt, EPSILON_DIST))
                .unwrap_or(false)
            {
                continue;
            }
            deduped.push(pt);
        }
        if deduped.len() < 2 {
            bail!("PolyLine needs at least two distinct points");
        }
        let length = deduped.windows(2).map(|pair| pair[0].dist_to(pair[1])).sum();
        Ok(PolyLine {
            pts: deduped,
            length,
        })
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.pts
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn first_pt(&self) -> Pt2D {
        self.pts[0]
    }

    pub fn last_pt(&self) -> Pt2D {
        self.pts[self.pts.len() - 1]
    }

    pub fn reversed(&self) -> PolyLine {
        let mut pts = self.pts.clone();
        pts.reverse();
        PolyLine {
            pts,
            length: self.length,
        }
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.pts)
    }
}

impl fmt::Display for PolyLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "PolyLine::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_points() {
        let pl = PolyLine::new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(0.0, 0.0),
            Pt2D::new(3.0, 4.0),
            Pt2D::new(3.0, 4.0),
        ])
        .unwrap();
        assert_eq!(pl.points().len(), 2);
        assert_eq!(pl.length(), 5.0);
        assert_eq!(pl.reversed().first_pt(), Pt2D::new(3.0, 4.0));

        assert!(PolyLine::new(vec![Pt2D::new(1.0, 1.0), Pt2D::new(1.0, 1.0)]).is_err());
        assert!(PolyLine::new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(f64::NAN, 1.0)]).is_err());
    }
}
