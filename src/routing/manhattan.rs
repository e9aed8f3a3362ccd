//! Orthogonal ("Manhattan") routing.
//!
//! Between every pair of consecutive waypoints at most one bend is inserted,
//! chosen so the route keeps its previous heading where it can and never
//! doubles straight back on itself (which would draw a spike). This is a
//! heuristic: the result is orthogonal, not shortest, and obstacles are not
//! considered.

use crate::errors::GeometryError;
use crate::geometry::{Point, Rect, pt};

/// Heading of an axis-aligned segment, screen up is `Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// Heading of the axis-aligned segment from `p1` to `p2`. `None` when the
/// points coincide or the segment is diagonal.
pub fn direction(p1: Point, p2: Point) -> Option<Direction> {
    if p1.x == p2.x && p1.y < p2.y {
        Some(Direction::Down)
    } else if p1.x == p2.x && p1.y > p2.y {
        Some(Direction::Up)
    } else if p1.y == p2.y && p1.x < p2.x {
        Some(Direction::Right)
    } else if p1.y == p2.y && p1.x > p2.x {
        Some(Direction::Left)
    } else {
        None
    }
}

/// Pick the heading for leaving `p1` toward `p2`.
///
/// The candidates are the one or two headings that make progress toward
/// `p2`. `preferred` wins when it is a candidate; otherwise the first
/// candidate, unless that is the exact reverse of `preferred`.
pub fn best_direction(p1: Point, p2: Point, preferred: Option<Direction>) -> Direction {
    let vertical = if p1.y > p2.y {
        Some(Direction::Up)
    } else if p1.y < p2.y {
        Some(Direction::Down)
    } else {
        None
    };
    let candidates: Vec<Direction> = if p1.x < p2.x {
        vertical.into_iter().chain([Direction::Right]).collect()
    } else if p1.x > p2.x {
        vertical.into_iter().chain([Direction::Left]).collect()
    } else {
        vec![vertical.unwrap_or(Direction::Down)]
    };

    if let Some(preferred) = preferred {
        if candidates.contains(&preferred) {
            return preferred;
        }
    }
    let first = candidates[0];
    match preferred {
        Some(preferred) if first == preferred.opposite() => {
            candidates[candidates.len() - 1]
        }
        _ => first,
    }
}

/// The bend between `p1` and `p2` for the heading picked by
/// [`best_direction`], with that heading.
pub fn middle_vertex(p1: Point, p2: Point, preferred: Option<Direction>) -> (Point, Direction) {
    let d = best_direction(p1, p2, preferred);
    if d.is_vertical() {
        (pt(p1.x, p2.y), d)
    } else {
        (pt(p2.x, p1.y), d)
    }
}

/// Route through `vertices` from `source_center` to `target_center`.
///
/// Returns the waypoints strictly between the two centers: the original
/// vertices, in order, with bends inserted so that every segment of
/// `source_center, ..., target_center` is horizontal or vertical.
pub fn route(vertices: &[Point], source_center: Point, target_center: Point) -> Vec<Point> {
    let mut waypoints = Vec::with_capacity(vertices.len() + 2);
    waypoints.push(source_center);
    waypoints.extend_from_slice(vertices);
    waypoints.push(target_center);

    // each entry remembers the heading taken to reach it
    let mut route: Vec<(Point, Option<Direction>)> = Vec::new();

    for i in 0..waypoints.len() - 1 {
        let vertex = waypoints[i];
        let next = waypoints[i + 1];

        if i > 0 {
            let heading = route.last().and_then(|(last, _)| direction(*last, vertex));
            route.push((vertex, heading));
        }

        let preferred = route.last().and_then(|(_, d)| *d);
        let (bend, heading) = middle_vertex(vertex, next, preferred);
        if bend != vertex && bend != next {
            route.push((bend, Some(heading)));
        }
    }
    route.into_iter().map(|(p, _)| p).collect()
}

/// Route a full polyline: the first and last points are the ends, the rest
/// are waypoints. The result includes both ends.
pub fn route_polyline(points: &[Point]) -> Result<Vec<Point>, GeometryError> {
    let (first, last) = match points {
        [first, .., last] => (*first, *last),
        _ => {
            return Err(GeometryError::TooFewPoints {
                needed: 2,
                got: points.len(),
            });
        }
    };
    let inner = &points[1..points.len() - 1];
    let mut out = Vec::with_capacity(points.len() * 2);
    out.push(first);
    out.extend(route(inner, first, last));
    out.push(last);
    Ok(out)
}

/// Route between two boxes.
///
/// With no vertices and the centers within half the source box of each other
/// on either axis, a waypoint is seeded halfway between the centers. Centers
/// already level on an axis need no seed.
pub fn route_between(vertices: &[Point], source_bbox: &Rect, target_bbox: &Rect) -> Vec<Point> {
    let sc = source_bbox.center();
    let tc = target_bbox.center();
    let dx = (sc.x - tc.x).abs();
    let dy = (sc.y - tc.y).abs();

    let seeded;
    let vertices = if vertices.is_empty()
        && (dx < source_bbox.width / 2.0 || dy < source_bbox.height / 2.0)
        && sc.x != tc.x
        && sc.y != tc.y
    {
        seeded = [pt(sc.x.min(tc.x) + dx / 2.0, sc.y.min(tc.y) + dy / 2.0)];
        &seeded[..]
    } else {
        vertices
    };
    route(vertices, sc, tc)
}
