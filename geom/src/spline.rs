use anyhow::{bail, Context, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{Bounds, CurvePoint, CurveSegment, CurveShape, PolyLine, Pose, Pt2D};

/// Golden-section iterations when refining a projection; shrinks the bracket by ~1e-13.
const REFINE_ITERATIONS: usize = 64;

/// An ordered sequence of curve segments forming one continuous reference line. Segment `i`
/// starts at the summed length of segments `0..i`.
///
/// There's no incremental editing; any change rebuilds the whole spline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadSpline {
    segments: Vec<CurveSegment>,
    length: f64,
}

/// The closest point on a spline to some query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplineProjection {
    pub s: f64,
    /// Signed lateral offset; positive is left of the reference line.
    pub t: f64,
    pub dist: f64,
}

impl RoadSpline {
    /// Takes segments in arclength order and recomputes their start offsets.
    pub fn new(mut segments: Vec<CurveSegment>) -> Result<RoadSpline> {
        if segments.is_empty() {
            bail!("A spline needs at least one segment");
        }
        let mut length = 0.0;
        for (idx, seg) in segments.iter_mut().enumerate() {
            seg.validate()
                .with_context(|| format!("segment {} of the spline", idx))?;
            seg.set_s(length);
            length += seg.length();
        }
        Ok(RoadSpline { segments, length })
    }

    /// Builds a spline where every piece starts exactly where the previous one ended.
    pub fn chain(start: Pose, pieces: Vec<(CurveShape, f64)>) -> Result<RoadSpline> {
        let mut segments = Vec::new();
        let mut pose = start;
        for (shape, length) in pieces {
            let seg = CurveSegment::new(0.0, pose.pt, pose.heading, length, shape)?;
            pose = seg.end_point().pose();
            segments.push(seg);
        }
        RoadSpline::new(segments)
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn segments(&self) -> &Vec<CurveSegment> {
        &self.segments
    }

    /// The segment active at `s`, after clamping.
    pub fn segment_at(&self, s: f64) -> &CurveSegment {
        let s = self.clamp(s);
        let idx = self
            .segments
            .partition_point(|seg| seg.s() <= s)
            .saturating_sub(1);
        &self.segments[idx]
    }

    fn clamp(&self, s: f64) -> f64 {
        s.max(0.0).min(self.length)
    }

    /// Evaluates the reference line at `s`. Out-of-range values clamp to the ends.
    pub fn evaluate(&self, s: f64) -> CurvePoint {
        let s = self.clamp(s);
        let seg = self.segment_at(s);
        seg.point_at(s - seg.s())
    }

    pub fn start_pose(&self) -> Pose {
        self.evaluate(0.0).pose()
    }

    pub fn end_pose(&self) -> Pose {
        self.evaluate(self.length).pose()
    }

    /// Samples at most `step` apart, always including both ends and every segment boundary.
    pub fn sample(&self, step: f64) -> Vec<(f64, Pt2D)> {
        let step = if step > 0.0 { step } else { 1.0 };
        let mut result = Vec::new();
        for seg in &self.segments {
            let pieces = (seg.length() / step).ceil().max(1.0) as usize;
            for i in 0..pieces {
                let ds = seg.length() * (i as f64) / (pieces as f64);
                result.push((seg.s() + ds, seg.point_at(ds).pt));
            }
        }
        result.push((self.length, self.end_pose().pt));
        result
    }

    pub fn to_polyline(&self, step: f64) -> Result<PolyLine> {
        PolyLine::new(self.sample(step).into_iter().map(|(_, pt)| pt).collect())
    }

    pub fn get_bounds(&self, step: f64) -> Bounds {
        let pts: Vec<Pt2D> = self.sample(step).into_iter().map(|(_, pt)| pt).collect();
        Bounds::from(&pts)
    }

    /// Finds the closest point on the spline to `pt`: a coarse pass every `step`, then a
    /// golden-section search between the neighbors of the best sample.
    pub fn project(&self, pt: Pt2D, step: f64) -> SplineProjection {
        let samples = self.sample(step);
        let dist_at = |s: f64| self.evaluate(s).pt.dist_to(pt);

        let best = samples
            .iter()
            .enumerate()
            .min_by_key(|(_, (_, sample))| OrderedFloat(sample.dist_to(pt)))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let mut lo = samples[best.saturating_sub(1)].0;
        let mut hi = samples[(best + 1).min(samples.len() - 1)].0;

        let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
        let mut a = hi - ratio * (hi - lo);
        let mut b = lo + ratio * (hi - lo);
        let (mut fa, mut fb) = (dist_at(a), dist_at(b));
        for _ in 0..REFINE_ITERATIONS {
            if fa < fb {
                hi = b;
                b = a;
                fb = fa;
                a = hi - ratio * (hi - lo);
                fa = dist_at(a);
            } else {
                lo = a;
                a = b;
                fa = fb;
                b = lo + ratio * (hi - lo);
                fb = dist_at(b);
            }
        }
        let mut s = (lo + hi) / 2.0;
        // The bracket ends may still win; golden-section never evaluates them.
        for candidate in [samples[best].0, lo, hi] {
            if dist_at(candidate) < dist_at(s) {
                s = candidate;
            }
        }

        let on_line = self.evaluate(s);
        let local = on_line.pose().to_local(pt);
        SplineProjection {
            s,
            t: local.y(),
            dist: on_line.pt.dist_to(pt),
        }
    }
}
