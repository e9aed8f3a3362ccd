//! Smooth cubic splines through a list of knots.
//!
//! The open (non-cyclic) spline is C¹-continuous at every interior knot. The
//! first control points come out of a tridiagonal system solved by a single
//! forward sweep and back substitution; the second control points follow from
//! them directly.

use super::path::PathData;
use super::point::{Point, pt};
use crate::errors::GeometryError;

/// One cubic segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicBezier {
    pub const fn new(start: Point, control1: Point, control2: Point, end: Point) -> Self {
        CubicBezier {
            start,
            control1,
            control2,
            end,
        }
    }

    /// Point at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        pt(
            a * self.start.x + b * self.control1.x + c * self.control2.x + d * self.end.x,
            a * self.start.y + b * self.control1.y + c * self.control2.y + d * self.end.y,
        )
    }

    /// Split at `t` (de Casteljau).
    pub fn divide(&self, t: f64) -> (CubicBezier, CubicBezier) {
        let p01 = self.start.lerp(self.control1, t);
        let p12 = self.control1.lerp(self.control2, t);
        let p23 = self.control2.lerp(self.end, t);
        let p012 = p01.lerp(p12, t);
        let p123 = p12.lerp(p23, t);
        let mid = p012.lerp(p123, t);
        (
            CubicBezier::new(self.start, p01, p012, mid),
            CubicBezier::new(mid, p123, p23, self.end),
        )
    }

    /// Approximate the curve with `segments + 1` points.
    pub fn flatten(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect()
    }

    /// Arc length, approximated by flattening.
    pub fn length(&self) -> f64 {
        self.flatten(32).windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// Path data for a smooth curve through `points`: one move plus one cubic
/// segment per pair of consecutive points.
pub fn curve_through_points(points: &[Point]) -> Result<PathData, GeometryError> {
    let (first, second) = curve_control_points(points)?;
    let mut path = PathData::new().m(points[0].x, points[0].y);
    for (i, (c1, c2)) in first.iter().zip(&second).enumerate() {
        let end = points[i + 1];
        path = path.c(c1.x, c1.y, c2.x, c2.y, end.x, end.y);
    }
    Ok(path)
}

/// The cubic segments of the smooth curve through `points`.
pub fn curve_segments(points: &[Point]) -> Result<Vec<CubicBezier>, GeometryError> {
    let (first, second) = curve_control_points(points)?;
    Ok(first
        .iter()
        .zip(&second)
        .enumerate()
        .map(|(i, (c1, c2))| CubicBezier::new(points[i], *c1, *c2, points[i + 1]))
        .collect())
}

/// First and second control points for each of the `knots.len() - 1`
/// segments.
pub fn curve_control_points(knots: &[Point]) -> Result<(Vec<Point>, Vec<Point>), GeometryError> {
    if knots.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            needed: 2,
            got: knots.len(),
        });
    }
    if knots.iter().any(|k| !k.is_finite()) {
        return Err(GeometryError::NonFinite { what: "curve knots" });
    }

    let n = knots.len() - 1;

    // Straight line: 3·P1 = 2·P0 + P3, P2 = 2·P1 − P0
    if n == 1 {
        let c1 = pt(
            (2.0 * knots[0].x + knots[1].x) / 3.0,
            (2.0 * knots[0].y + knots[1].y) / 3.0,
        );
        let c2 = pt(2.0 * c1.x - knots[0].x, 2.0 * c1.y - knots[0].y);
        return Ok((vec![c1], vec![c2]));
    }

    let mut rhs = vec![0.0; n];

    for i in 1..n - 1 {
        rhs[i] = 4.0 * knots[i].x + 2.0 * knots[i + 1].x;
    }
    rhs[0] = knots[0].x + 2.0 * knots[1].x;
    rhs[n - 1] = (8.0 * knots[n - 1].x + knots[n].x) / 2.0;
    let x = first_control_points(&rhs);

    for i in 1..n - 1 {
        rhs[i] = 4.0 * knots[i].y + 2.0 * knots[i + 1].y;
    }
    rhs[0] = knots[0].y + 2.0 * knots[1].y;
    rhs[n - 1] = (8.0 * knots[n - 1].y + knots[n].y) / 2.0;
    let y = first_control_points(&rhs);

    let mut first = Vec::with_capacity(n);
    let mut second = Vec::with_capacity(n);
    for i in 0..n {
        first.push(pt(x[i], y[i]));
        if i < n - 1 {
            second.push(pt(
                2.0 * knots[i + 1].x - x[i + 1],
                2.0 * knots[i + 1].y - y[i + 1],
            ));
        } else {
            second.push(pt((knots[n].x + x[n - 1]) / 2.0, (knots[n].y + y[n - 1]) / 2.0));
        }
    }
    Ok((first, second))
}

/// Solve the tridiagonal system for one coordinate of the first control
/// points. Diagonal is `2` on the first row, `4` inside and `3.5` on the last.
pub fn first_control_points(rhs: &[f64]) -> Vec<f64> {
    let n = rhs.len();
    if n == 0 {
        return Vec::new();
    }
    let mut x = vec![0.0; n];
    let mut tmp = vec![0.0; n];
    let mut b = 2.0;
    x[0] = rhs[0] / b;

    // decomposition and forward substitution
    for i in 1..n {
        tmp[i] = 1.0 / b;
        b = if i < n - 1 { 4.0 } else { 3.5 } - tmp[i];
        x[i] = (rhs[i] - x[i - 1]) / b;
    }
    for i in 1..n {
        x[n - i - 1] -= tmp[n - i] * x[n - i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point_eq(actual: Point, expected: Point) {
        assert!(
            actual.distance(expected) < 1e-9,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_too_few_points() {
        assert_eq!(
            curve_through_points(&[pt(1.0, 1.0)]).unwrap_err(),
            GeometryError::TooFewPoints { needed: 2, got: 1 }
        );
        assert!(curve_through_points(&[]).is_err());
    }

    #[test]
    fn test_two_points_are_a_straight_segment() {
        let a = pt(0.0, 0.0);
        let b = pt(90.0, 30.0);
        let (first, second) = curve_control_points(&[a, b]).unwrap();
        assert_point_eq(first[0], pt(30.0, 10.0));
        assert_point_eq(second[0], pt(60.0, 20.0));

        let seg = CubicBezier::new(a, first[0], second[0], b);
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            // every point on the curve sits on the segment, uniformly spaced
            assert_point_eq(seg.point_at(t), a.lerp(b, t));
        }
    }

    #[test]
    fn test_two_point_path_data() {
        let path = curve_through_points(&[pt(0.0, 0.0), pt(90.0, 30.0)]).unwrap();
        insta::assert_snapshot!(path.to_string(), @"M 0 0 C 30 10 60 20 90 30");
    }

    #[test]
    fn test_interior_knots_are_smooth() {
        let knots = [pt(0.0, 0.0), pt(50.0, 80.0), pt(120.0, 10.0), pt(200.0, 60.0)];
        let segs = curve_segments(&knots).unwrap();
        assert_eq!(segs.len(), 3);
        for pair in segs.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            assert_point_eq(left.end, right.start);
            // C1: the knot is the midpoint of its neighbouring control points
            assert_point_eq(left.control2.lerp(right.control1, 0.5), left.end);
        }
    }

    #[test]
    fn test_collinear_knots_stay_on_the_line() {
        let knots = [pt(0.0, 0.0), pt(10.0, 0.0), pt(30.0, 0.0)];
        let (first, second) = curve_control_points(&knots).unwrap();
        assert!(first.iter().chain(&second).all(|p| p.y.abs() < 1e-12));
    }

    #[test]
    fn test_divide() {
        let seg = CubicBezier::new(pt(0.0, 0.0), pt(0.0, 100.0), pt(100.0, 100.0), pt(100.0, 0.0));
        let (l, r) = seg.divide(0.5);
        assert_point_eq(l.end, seg.point_at(0.5));
        assert_point_eq(r.start, pt(50.0, 75.0));
        assert_point_eq(l.point_at(0.5), seg.point_at(0.25));
    }

    #[test]
    fn test_first_control_points_single_row() {
        assert_eq!(first_control_points(&[4.0]), vec![2.0]);
        assert!(first_control_points(&[]).is_empty());
    }
}
