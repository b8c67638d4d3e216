// 5-point Gauss-Legendre nodes and weights on [-1, 1]
const NODES: [f64; 5] = [
    0.0,
    -0.538_469_310_105_683_1,
    0.538_469_310_105_683_1,
    -0.906_179_845_938_664,
    0.906_179_845_938_664,
];
const WEIGHTS: [f64; 5] = [
    0.568_888_888_888_888_9,
    0.478_628_670_499_366_5,
    0.478_628_670_499_366_5,
    0.236_926_885_056_189_1,
    0.236_926_885_056_189_1,
];

/// Integrates `f` over `[a, b]` with composite 5-point Gauss-Legendre quadrature on `pieces`
/// equal subintervals. Exact for polynomials up to degree 9 on each piece.
pub fn gauss_legendre<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, pieces: usize) -> f64 {
    let pieces = pieces.max(1);
    let step = (b - a) / pieces as f64;
    let half = step / 2.0;
    let mut total = 0.0;
    for i in 0..pieces {
        let mid = a + step * (i as f64) + half;
        let mut piece = 0.0;
        for (x, w) in NODES.iter().zip(WEIGHTS.iter()) {
            piece += w * f(mid + half * x);
        }
        total += piece * half;
    }
    total
}

/// Finds `x` in `[0, max_x]` such that `integral(0, x) == target`, where `integral` is monotonic
/// with derivative `speed`. Newton steps, falling back to bisection when a step leaves the
/// bracket.
pub(crate) fn invert_monotonic<I, S>(integral: I, speed: S, target: f64, max_x: f64) -> f64
where
    I: Fn(f64) -> f64,
    S: Fn(f64) -> f64,
{
    if target <= 0.0 {
        return 0.0;
    }
    let mut lo = 0.0;
    let mut hi = max_x;
    let mut x = target.min(max_x);
    for _ in 0..50 {
        let err = integral(x) - target;
        if err.abs() < 1e-12 {
            break;
        }
        if err > 0.0 {
            hi = x;
        } else {
            lo = x;
        }
        let v = speed(x);
        let next = if v > 1e-12 { x - err / v } else { f64::NAN };
        x = if next.is_finite() && next > lo && next < hi {
            next
        } else {
            (lo + hi) / 2.0
        };
    }
    x
}
