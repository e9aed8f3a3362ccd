//! Points in screen space (y grows downward).

use std::fmt;
use std::ops::{Add, Mul, Sub};

use glam::{DVec2, dvec2};
use serde::{Deserialize, Serialize};

use super::rect::{ANGLE_PRECISION, Rect};
use crate::types::{normalize_angle, round_to};

/// A 2-D point. Copied freely; every operation returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Shorthand constructor, in the spirit of `glam::dvec2`.
#[inline]
pub const fn pt(x: f64, y: f64) -> Point {
    Point { x, y }
}

impl Point {
    pub const ORIGIN: Point = pt(0.0, 0.0);

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    #[inline]
    pub fn to_vec(self) -> DVec2 {
        dvec2(self.x, self.y)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn offset(self, dx: f64, dy: f64) -> Point {
        pt(self.x + dx, self.y + dy)
    }

    /// Distance from the origin.
    #[inline]
    pub fn magnitude(self) -> f64 {
        self.to_vec().length()
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        self.to_vec().distance(other.to_vec())
    }

    #[inline]
    pub fn squared_distance(self, other: Point) -> f64 {
        self.to_vec().distance_squared(other.to_vec())
    }

    #[inline]
    pub fn manhattan_distance(self, other: Point) -> f64 {
        (other.x - self.x).abs() + (other.y - self.y).abs()
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        self.to_vec().lerp(other.to_vec(), t).into()
    }

    /// Angle in degrees, `[0, 360)`, of the vector from `self` to `p`.
    ///
    /// The y axis is inverted so that the angle grows counter-clockwise on
    /// screen. A vector that rounds to zero has angle `0`.
    pub fn theta(self, p: Point) -> f64 {
        let y = -(p.y - self.y);
        let x = p.x - self.x;
        // atan2(0, 0) is 0, but atan2(-0.0, -0.0) is -pi
        if round_to(x, ANGLE_PRECISION) == 0.0 && round_to(y, ANGLE_PRECISION) == 0.0 {
            return 0.0;
        }
        let mut rad = y.atan2(x);
        if rad < 0.0 {
            rad += 2.0 * std::f64::consts::PI;
        }
        let deg = rad.to_degrees();
        if deg >= 360.0 { 0.0 } else { deg }
    }

    /// Angle in degrees at `self` between the rays toward `p1` and `p2`.
    pub fn angle_between(self, p1: Point, p2: Point) -> f64 {
        let mut angle = self.theta(p2) - self.theta(p1);
        if angle < 0.0 {
            angle += 360.0;
        }
        angle
    }

    /// How much the angle of `self` around `reference` changes when `self` is
    /// translated by `(dx, dy)` to reach its current position.
    pub fn change_in_angle(self, dx: f64, dy: f64, reference: Point) -> f64 {
        self.offset(-dx, -dy).theta(reference) - self.theta(reference)
    }

    /// Move along the ray from `reference` through `self` by `distance`.
    ///
    /// Positive distances move away from `reference`.
    pub fn move_along(self, reference: Point, distance: f64) -> Point {
        let theta = reference.theta(self).to_radians();
        self.offset(theta.cos() * distance, -theta.sin() * distance)
    }

    /// Rotate about `origin` by `angle` degrees, clockwise on screen (the SVG
    /// `rotate()` convention).
    pub fn rotate(self, origin: Point, angle: f64) -> Point {
        if angle == 0.0 {
            return self;
        }
        let (sin, cos) = angle.to_radians().sin_cos();
        let d = self.to_vec() - origin.to_vec();
        pt(
            origin.x + d.x * cos - d.y * sin,
            origin.y + d.x * sin + d.y * cos,
        )
    }

    /// Polar coordinates relative to `origin`: `(radius, angle in radians)`.
    ///
    /// The angle follows [`Point::theta`].
    pub fn to_polar(self, origin: Point) -> (f64, f64) {
        (self.distance(origin), origin.theta(self).to_radians())
    }

    /// Inverse of [`Point::to_polar`].
    pub fn from_polar(distance: f64, angle: f64, origin: Point) -> Point {
        let (sin, cos) = angle.sin_cos();
        pt(origin.x + distance * cos, origin.y - distance * sin)
    }

    /// Clamp into `rect`. Points already inside are returned unchanged.
    pub fn adhere_to_rect(self, rect: &Rect) -> Point {
        if rect.contains_point(self) {
            return self;
        }
        pt(
            self.x.clamp(rect.x, rect.x + rect.width),
            self.y.clamp(rect.y, rect.y + rect.height),
        )
    }

    /// Snap each coordinate to a multiple of `grid`.
    pub fn snap_to_grid(self, grid: f64) -> Point {
        if grid <= 0.0 {
            return self;
        }
        pt(
            (self.x / grid).round() * grid,
            (self.y / grid).round() * grid,
        )
    }

    /// The angle of `self` seen from `origin`, normalized to `[0, 360)`.
    pub fn bearing_from(self, origin: Point) -> f64 {
        normalize_angle(origin.theta(self))
    }
}

impl From<DVec2> for Point {
    #[inline]
    fn from(v: DVec2) -> Self {
        pt(v.x, v.y)
    }
}

impl From<Point> for DVec2 {
    #[inline]
    fn from(p: Point) -> Self {
        p.to_vec()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        pt(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        pt(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        pt(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.x, self.y)
    }
}
