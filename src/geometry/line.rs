//! Line segments.

use serde::{Deserialize, Serialize};

use super::point::{Point, pt};

/// Compass bearing of a segment, screen up is north.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bearing {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

/// A segment from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    #[inline]
    pub const fn new(start: Point, end: Point) -> Self {
        Line { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn squared_length(&self) -> f64 {
        self.start.squared_distance(self.end)
    }

    pub fn midpoint(&self) -> Point {
        self.point_at(0.5)
    }

    /// Point at ratio `t` along the segment (0 is `start`, 1 is `end`).
    pub fn point_at(&self, t: f64) -> Point {
        self.start.lerp(self.end, t)
    }

    /// Intersection point of two segments.
    ///
    /// `None` when the segments are parallel or cross outside their extents.
    /// Touching at an endpoint counts as an intersection.
    pub fn intersection(&self, other: &Line) -> Option<Point> {
        let d1 = self.end - self.start;
        let d2 = other.end - other.start;
        let det = d1.x * d2.y - d1.y * d2.x;
        let delta = other.start - self.start;
        let alpha = delta.x * d2.y - delta.y * d2.x;
        let beta = delta.x * d1.y - delta.y * d1.x;

        if det == 0.0 || alpha * det < 0.0 || beta * det < 0.0 {
            return None;
        }
        if det > 0.0 {
            if alpha > det || beta > det {
                return None;
            }
        } else if alpha < det || beta < det {
            return None;
        }
        Some(pt(
            self.start.x + alpha * d1.x / det,
            self.start.y + alpha * d1.y / det,
        ))
    }

    /// Eight-way compass bearing from `start` toward `end`.
    pub fn bearing(&self) -> Bearing {
        const SECTORS: [Bearing; 8] = [
            Bearing::East,
            Bearing::NorthEast,
            Bearing::North,
            Bearing::NorthWest,
            Bearing::West,
            Bearing::SouthWest,
            Bearing::South,
            Bearing::SouthEast,
        ];
        let theta = self.start.theta(self.end);
        let index = ((theta + 22.5) / 45.0).floor() as usize % 8;
        SECTORS[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_segments() {
        let a = Line::new(pt(0.0, 0.0), pt(10.0, 10.0));
        let b = Line::new(pt(0.0, 10.0), pt(10.0, 0.0));
        assert_eq!(a.intersection(&b), Some(pt(5.0, 5.0)));
    }

    #[test]
    fn test_disjoint_and_parallel() {
        let a = Line::new(pt(0.0, 0.0), pt(10.0, 0.0));
        let b = Line::new(pt(0.0, 5.0), pt(10.0, 5.0));
        assert_eq!(a.intersection(&b), None);
        // would cross if extended
        let c = Line::new(pt(20.0, -5.0), pt(20.0, 5.0));
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_touching_endpoint() {
        let a = Line::new(pt(0.0, 0.0), pt(10.0, 0.0));
        let b = Line::new(pt(10.0, 0.0), pt(10.0, 10.0));
        assert_eq!(a.intersection(&b), Some(pt(10.0, 0.0)));
    }

    #[test]
    fn test_length_and_midpoint() {
        let l = Line::new(pt(0.0, 0.0), pt(6.0, 8.0));
        assert_eq!(l.length(), 10.0);
        assert_eq!(l.squared_length(), 100.0);
        assert_eq!(l.midpoint(), pt(3.0, 4.0));
    }

    #[test]
    fn test_bearing() {
        let o = pt(0.0, 0.0);
        assert_eq!(Line::new(o, pt(10.0, 0.0)).bearing(), Bearing::East);
        assert_eq!(Line::new(o, pt(0.0, -10.0)).bearing(), Bearing::North);
        assert_eq!(Line::new(o, pt(10.0, 10.0)).bearing(), Bearing::SouthEast);
        assert_eq!(Line::new(o, pt(10.0, -1.0)).bearing(), Bearing::East);
    }
}
