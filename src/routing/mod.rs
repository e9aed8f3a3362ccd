//! Link geometry: where links touch their ends and how they get there.

pub mod connection;
pub mod manhattan;

pub use connection::{
    Anchor, Boundary, ResolveOptions, RotatedRect, Shape, reference_point, resolve, resolve_toward,
};
pub use manhattan::{Direction, best_direction, route, route_between, route_polyline};
