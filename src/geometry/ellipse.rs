//! Axis-aligned ellipses given by center and radii.

use serde::{Deserialize, Serialize};

use super::point::{Point, pt};
use super::rect::{ANGLE_PRECISION, Rect};
use crate::types::{normalize_angle, round_to};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ellipse {
    pub x: f64,
    pub y: f64,
    pub rx: f64,
    pub ry: f64,
}

impl Ellipse {
    pub const fn new(x: f64, y: f64, rx: f64, ry: f64) -> Self {
        Ellipse { x, y, rx, ry }
    }

    /// The ellipse inscribed in `rect`.
    pub fn from_rect(rect: &Rect) -> Self {
        let c = rect.center();
        Ellipse::new(c.x, c.y, rect.width / 2.0, rect.height / 2.0)
    }

    pub fn center(&self) -> Point {
        pt(self.x, self.y)
    }

    pub fn bbox(&self) -> Rect {
        Rect::new(self.x - self.rx, self.y - self.ry, 2.0 * self.rx, 2.0 * self.ry)
    }

    pub fn contains_point(&self, p: Point) -> bool {
        if self.rx <= 0.0 || self.ry <= 0.0 {
            return p == self.center();
        }
        let dx = (p.x - self.x) / self.rx;
        let dy = (p.y - self.y) / self.ry;
        dx * dx + dy * dy <= 1.0
    }

    /// Where the ray from the center through `p` crosses the boundary.
    ///
    /// `angle` rotates the ellipse about its center, in degrees. A vertical ray
    /// lands on the top or bottom apex; `p` at the center (or a degenerate
    /// ellipse) yields the center.
    pub fn intersection_with_line_from_center_to_point(
        &self,
        p: Point,
        angle: Option<f64>,
    ) -> Point {
        let center = self.center();
        let angle = angle
            .map(|a| round_to(normalize_angle(a), ANGLE_PRECISION))
            .filter(|a| *a != 0.0 && *a != 360.0);
        let p = match angle {
            Some(a) => p.rotate(center, -a),
            None => p,
        };
        let dx = p.x - self.x;
        let dy = p.y - self.y;
        if self.rx <= 0.0 || self.ry <= 0.0 || (dx == 0.0 && dy == 0.0) {
            return center;
        }

        let result = if dx == 0.0 {
            pt(self.x, self.y + self.ry.copysign(dy))
        } else {
            let m = dy / dx;
            let x = (1.0 / (1.0 / (self.rx * self.rx) + (m * m) / (self.ry * self.ry))).sqrt();
            let x = if dx < 0.0 { -x } else { x };
            pt(self.x + x, self.y + m * x)
        };
        match angle {
            Some(a) => result.rotate(center, a),
            None => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point_eq(actual: Point, expected: Point) {
        assert!(
            actual.distance(expected) < 1e-6,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_axis_hits() {
        let e = Ellipse::new(0.0, 0.0, 50.0, 30.0);
        assert_point_eq(
            e.intersection_with_line_from_center_to_point(pt(200.0, 0.0), None),
            pt(50.0, 0.0),
        );
        assert_point_eq(
            e.intersection_with_line_from_center_to_point(pt(-200.0, 0.0), None),
            pt(-50.0, 0.0),
        );
        assert_point_eq(
            e.intersection_with_line_from_center_to_point(pt(0.0, -5.0), None),
            pt(0.0, -30.0),
        );
    }

    #[test]
    fn test_diagonal_hit_is_on_boundary() {
        let e = Ellipse::new(10.0, 10.0, 50.0, 30.0);
        let hit = e.intersection_with_line_from_center_to_point(pt(100.0, 80.0), None);
        let nx = (hit.x - 10.0) / 50.0;
        let ny = (hit.y - 10.0) / 30.0;
        assert!((nx * nx + ny * ny - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_center_falls_back() {
        let e = Ellipse::new(10.0, 10.0, 50.0, 30.0);
        assert_eq!(
            e.intersection_with_line_from_center_to_point(pt(10.0, 10.0), None),
            pt(10.0, 10.0)
        );
    }

    #[test]
    fn test_rotated() {
        // 50x30 radii turned a quarter: the long axis is vertical
        let e = Ellipse::new(0.0, 0.0, 50.0, 30.0);
        let hit = e.intersection_with_line_from_center_to_point(pt(0.0, 100.0), Some(90.0));
        assert_point_eq(hit, pt(0.0, 50.0));
    }

    #[test]
    fn test_from_rect() {
        let e = Ellipse::from_rect(&Rect::new(0.0, 0.0, 100.0, 60.0));
        assert_eq!(e, Ellipse::new(50.0, 30.0, 50.0, 30.0));
        assert_eq!(e.bbox(), Rect::new(0.0, 0.0, 100.0, 60.0));
        assert!(e.contains_point(pt(50.0, 30.0)));
        assert!(!e.contains_point(pt(1.0, 1.0)));
    }
}
