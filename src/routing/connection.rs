//! Where a link visually touches its end shapes.
//!
//! An end is either a free point or a shape with a boundary. Resolution never
//! fails: when a ray misses the boundary (the reference sits inside the shape,
//! or one shape contains the other's center) the shape's center is used.

use enum_dispatch::enum_dispatch;

use crate::geometry::{Ellipse, Point, Rect, Side, pt};
use crate::log::debug;

/// Anything a link can attach to.
#[enum_dispatch]
pub trait Boundary {
    fn center(&self) -> Point;

    /// Axis-aligned bounding box in paper coordinates.
    fn bbox(&self) -> Rect;

    /// Where the segment from the center toward `p` leaves the shape; the
    /// center when it never does.
    fn intersection_from_center(&self, p: Point) -> Point;
}

/// A rectangle rotated about its own center, clockwise, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub rect: Rect,
    pub angle: f64,
}

impl RotatedRect {
    pub const fn new(rect: Rect, angle: f64) -> Self {
        RotatedRect { rect, angle }
    }
}

impl Boundary for Rect {
    fn center(&self) -> Point {
        Rect::center(self)
    }

    fn bbox(&self) -> Rect {
        *self
    }

    fn intersection_from_center(&self, p: Point) -> Point {
        self.intersection_with_line_from_center_to_point(p, None)
    }
}

impl Boundary for Ellipse {
    fn center(&self) -> Point {
        Ellipse::center(self)
    }

    fn bbox(&self) -> Rect {
        Ellipse::bbox(self)
    }

    fn intersection_from_center(&self, p: Point) -> Point {
        self.intersection_with_line_from_center_to_point(p, None)
    }
}

impl Boundary for RotatedRect {
    fn center(&self) -> Point {
        self.rect.center()
    }

    fn bbox(&self) -> Rect {
        self.rect.rotated_bbox(self.angle)
    }

    fn intersection_from_center(&self, p: Point) -> Point {
        self.rect
            .intersection_with_line_from_center_to_point(p, Some(self.angle))
    }
}

#[enum_dispatch(Boundary)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect,
    Ellipse,
    RotatedRect,
}

/// One end of a connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    Point(Point),
    Shape(Shape),
}

impl Anchor {
    /// The point a router should start from: the free point or the shape
    /// center.
    pub fn center(&self) -> Point {
        match self {
            Anchor::Point(p) => *p,
            Anchor::Shape(s) => s.center(),
        }
    }

    pub fn bbox(&self) -> Rect {
        match self {
            Anchor::Point(p) => Rect::new(p.x, p.y, 0.0, 0.0),
            Anchor::Shape(s) => s.bbox(),
        }
    }
}

impl From<Point> for Anchor {
    fn from(p: Point) -> Self {
        Anchor::Point(p)
    }
}

impl From<Shape> for Anchor {
    fn from(s: Shape) -> Self {
        Anchor::Shape(s)
    }
}

impl From<Rect> for Anchor {
    fn from(r: Rect) -> Self {
        Anchor::Shape(r.into())
    }
}

impl From<Ellipse> for Anchor {
    fn from(e: Ellipse) -> Self {
        Anchor::Shape(e.into())
    }
}

impl From<RotatedRect> for Anchor {
    fn from(r: RotatedRect) -> Self {
        Anchor::Shape(r.into())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolveOptions {
    /// Snap perpendicular to the nearest side when the reference point is
    /// level with the end shape.
    pub orthogonal: bool,
}

/// The point the other end is aimed at, as seen from `end`.
///
/// A free reference is used as is. For a shape reference this is where the
/// ray from its center toward `end`'s center leaves it.
pub fn reference_point(end: &Anchor, reference: &Anchor) -> Point {
    match reference {
        Anchor::Point(p) => *p,
        Anchor::Shape(shape) => shape.intersection_from_center(end.center()),
    }
}

/// Resolve where a link touches `end`, aiming at `reference`.
pub fn resolve(end: &Anchor, reference: &Anchor, options: ResolveOptions) -> Point {
    let shape = match end {
        Anchor::Point(p) => return *p,
        Anchor::Shape(shape) => shape,
    };
    let reference = reference_point(end, reference);
    resolve_toward(shape, reference, options)
}

/// Resolve against a known reference point.
pub fn resolve_toward(shape: &Shape, reference: Point, options: ResolveOptions) -> Point {
    let bbox = shape.bbox();
    if options.orthogonal {
        if let Some(snapped) = orthogonal_snap(&bbox, reference) {
            return snapped;
        }
    }
    let hit = shape.intersection_from_center(reference);
    if hit == shape.center() {
        debug!(?reference, "connection ray missed the boundary, using the center");
    }
    hit
}

/// Perpendicular projection onto the nearest side, when a horizontal or
/// vertical line through `reference` crosses `bbox`.
fn orthogonal_snap(bbox: &Rect, reference: Point) -> Option<Point> {
    let origin = bbox.origin();
    let corner = bbox.corner();
    let center = bbox.center();

    if origin.y <= reference.y && reference.y <= corner.y {
        return Some(match bbox.side_nearest_to_point(reference) {
            Side::Left => pt(origin.x, reference.y),
            Side::Right => pt(corner.x, reference.y),
            _ => center,
        });
    }
    if origin.x <= reference.x && reference.x <= corner.x {
        return Some(match bbox.side_nearest_to_point(reference) {
            Side::Top => pt(reference.x, origin.y),
            Side::Bottom => pt(reference.x, corner.y),
            _ => center,
        });
    }
    None
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

    fn a() -> Anchor {
        Rect::new(0.0, 0.0, 100.0, 60.0).into()
    }

    fn b() -> Anchor {
        Rect::new(300.0, 0.0, 100.0, 60.0).into()
    }

    #[test]
    fn test_free_point_is_unchanged() {
        let end = Anchor::Point(pt(7.0, 9.0));
        assert_eq!(resolve(&end, &a(), ResolveOptions::default()), pt(7.0, 9.0));
    }

    #[test]
    fn test_two_boxes_side_by_side() {
        let opts = ResolveOptions::default();
        assert_point_eq(resolve(&a(), &b(), opts), pt(100.0, 30.0));
        assert_point_eq(resolve(&b(), &a(), opts), pt(300.0, 30.0));
    }

    #[test]
    fn test_free_reference() {
        let end = a();
        let hit = resolve(&end, &Anchor::Point(pt(50.0, 200.0)), ResolveOptions::default());
        assert_point_eq(hit, pt(50.0, 60.0));
    }

    #[test]
    fn test_orthogonal_snap_horizontal() {
        // reference level with the box, off-center: project straight across
        let end = b();
        let reference = Anchor::Point(pt(0.0, 10.0));
        let opts = ResolveOptions { orthogonal: true };
        assert_point_eq(resolve(&end, &reference, opts), pt(300.0, 10.0));
        // the general case would aim at the center instead
        let general = resolve(&end, &reference, ResolveOptions::default());
        assert!(general.y > 10.0);
    }

    #[test]
    fn test_orthogonal_snap_vertical() {
        let end = a();
        let opts = ResolveOptions { orthogonal: true };
        let hit = resolve(&end, &Anchor::Point(pt(20.0, 500.0)), opts);
        assert_point_eq(hit, pt(20.0, 60.0));
    }

    #[test]
    fn test_orthogonal_falls_through_for_diagonal_reference() {
        let end = a();
        let opts = ResolveOptions { orthogonal: true };
        let hit = resolve(&end, &Anchor::Point(pt(300.0, 300.0)), opts);
        let general = resolve(&end, &Anchor::Point(pt(300.0, 300.0)), ResolveOptions::default());
        assert_point_eq(hit, general);
    }

    #[test]
    fn test_nested_shapes_fall_back_to_center() {
        // the reference shape contains the end's center, so its ray never
        // leaves it and its center is used as the reference point
        let outer: Anchor = Rect::new(0.0, 0.0, 400.0, 400.0).into();
        let inner: Anchor = Rect::new(150.0, 150.0, 100.0, 100.0).into();
        assert_eq!(reference_point(&inner, &outer), pt(200.0, 200.0));
        // and the inner center coincides with it: the end resolves to its center
        let hit = resolve(&inner, &outer, ResolveOptions::default());
        assert_eq!(hit, pt(200.0, 200.0));
    }

    #[test]
    fn test_ellipse_end() {
        let end: Anchor = Ellipse::new(50.0, 30.0, 50.0, 30.0).into();
        let hit = resolve(&end, &b(), ResolveOptions::default());
        assert_point_eq(hit, pt(100.0, 30.0));
    }

    #[test]
    fn test_rotated_end() {
        let end: Anchor = RotatedRect::new(Rect::new(0.0, 0.0, 100.0, 20.0), 90.0).into();
        assert_point_eq(end.bbox().center(), pt(50.0, 10.0));
        let hit = resolve(&end, &Anchor::Point(pt(50.0, 300.0)), ResolveOptions::default());
        assert_point_eq(hit, pt(50.0, 60.0));
    }
}
