//! Axis-aligned rectangles.

use serde::{Deserialize, Serialize};

use super::line::Line;
use super::point::{Point, pt};
use crate::types::{normalize_angle, round_to};

/// Decimal places kept before deciding that an angle is zero.
pub(crate) const ANGLE_PRECISION: i32 = 10;

/// One of the four sides of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// A rectangle given by its top-left corner and its extent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing every point. `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Rect> {
        let first = points.first()?;
        let (mut min, mut max) = (first.to_vec(), first.to_vec());
        for p in &points[1..] {
            min = min.min(p.to_vec());
            max = max.max(p.to_vec());
        }
        Some(Rect::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn origin(&self) -> Point {
        pt(self.x, self.y)
    }

    pub fn corner(&self) -> Point {
        pt(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        pt(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_right(&self) -> Point {
        pt(self.x + self.width, self.y)
    }

    pub fn bottom_left(&self) -> Point {
        pt(self.x, self.y + self.height)
    }

    pub fn top_middle(&self) -> Point {
        pt(self.x + self.width / 2.0, self.y)
    }

    pub fn bottom_middle(&self) -> Point {
        pt(self.x + self.width / 2.0, self.y + self.height)
    }

    pub fn left_middle(&self) -> Point {
        pt(self.x, self.y + self.height / 2.0)
    }

    pub fn right_middle(&self) -> Point {
        pt(self.x + self.width, self.y + self.height / 2.0)
    }

    pub fn top_line(&self) -> Line {
        Line::new(self.origin(), self.top_right())
    }

    pub fn right_line(&self) -> Line {
        Line::new(self.top_right(), self.corner())
    }

    pub fn bottom_line(&self) -> Line {
        Line::new(self.corner(), self.bottom_left())
    }

    pub fn left_line(&self) -> Line {
        Line::new(self.bottom_left(), self.origin())
    }

    // ------------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------------

    /// Inclusive containment: points on the boundary are inside.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x
            && p.x <= self.x + self.width
            && p.y >= self.y
            && p.y <= self.y + self.height
    }

    /// Whether `other` lies entirely inside. Empty rectangles contain nothing
    /// and are contained by nothing.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        if self.width == 0.0 || self.height == 0.0 || other.width == 0.0 || other.height == 0.0 {
            return false;
        }
        self.x <= other.x
            && other.x + other.width <= self.x + self.width
            && self.y <= other.y
            && other.y + other.height <= self.y + self.height
    }

    // ------------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------------

    /// Overlapping area. Rectangles that only share an edge do not intersect.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let (o1, c1) = (self.origin(), self.corner());
        let (o2, c2) = (other.origin(), other.corner());
        if c2.x <= o1.x || c2.y <= o1.y || o2.x >= c1.x || o2.y >= c1.y {
            return None;
        }
        let x = o1.x.max(o2.x);
        let y = o1.y.max(o2.y);
        Some(Rect::new(x, y, c1.x.min(c2.x) - x, c1.y.min(c2.y) - y))
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let cx = (self.x + self.width).max(other.x + other.width);
        let cy = (self.y + self.height).max(other.y + other.height);
        Rect::new(x, y, cx - x, cy - y)
    }

    /// Grow by `dx` on the left and right and by `dy` on the top and bottom.
    pub fn inflate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2.0 * dx,
            self.height + 2.0 * dy,
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Bounding box of this rectangle rotated by `angle` degrees about its
    /// center.
    pub fn rotated_bbox(&self, angle: f64) -> Rect {
        if round_to(normalize_angle(angle), ANGLE_PRECISION) == 0.0 {
            return *self;
        }
        let (sin, cos) = angle.to_radians().sin_cos();
        let (st, ct) = (sin.abs(), cos.abs());
        let w = self.width * ct + self.height * st;
        let h = self.width * st + self.height * ct;
        Rect::new(
            self.x + (self.width - w) / 2.0,
            self.y + (self.height - h) / 2.0,
            w,
            h,
        )
    }

    // ------------------------------------------------------------------------
    // Boundary queries
    // ------------------------------------------------------------------------

    /// Side closest to `p`. Ties resolve in the order left, right, top, bottom.
    pub fn side_nearest_to_point(&self, p: Point) -> Side {
        let candidates = [
            (Side::Right, self.x + self.width - p.x),
            (Side::Top, p.y - self.y),
            (Side::Bottom, self.y + self.height - p.y),
        ];
        let mut side = Side::Left;
        let mut closest = p.x - self.x;
        for (candidate, distance) in candidates {
            if distance < closest {
                closest = distance;
                side = candidate;
            }
        }
        side
    }

    /// Boundary point nearest to `p` for points inside; outside points are
    /// clamped onto the rectangle.
    pub fn point_nearest_to_point(&self, p: Point) -> Point {
        if self.contains_point(p) {
            return match self.side_nearest_to_point(p) {
                Side::Left => pt(self.x, p.y),
                Side::Right => pt(self.x + self.width, p.y),
                Side::Top => pt(p.x, self.y),
                Side::Bottom => pt(p.x, self.y + self.height),
            };
        }
        p.adhere_to_rect(self)
    }

    /// Where the segment from the center to `p` crosses the boundary.
    ///
    /// With an `angle` the rectangle is treated as rotated by that many
    /// degrees about its center. Sides are checked clockwise starting at the
    /// top; the first hit wins. Returns the center when no side is hit, which
    /// happens for `p` inside the rectangle or a degenerate rectangle.
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
        let connector = Line::new(center, p);
        let sides = [
            self.top_line(),
            self.right_line(),
            self.bottom_line(),
            self.left_line(),
        ];
        let hit = sides.iter().find_map(|side| side.intersection(&connector));
        match (hit, angle) {
            (Some(hit), Some(a)) => hit.rotate(center, a),
            (Some(hit), None) => hit,
            (None, _) => center,
        }
    }
}
