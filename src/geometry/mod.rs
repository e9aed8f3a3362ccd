//! Geometry kit: value types and the math the routers and views share.
//!
//! All coordinates are screen coordinates (y grows downward) and all angles
//! are degrees. Rotations are clockwise on screen, like SVG `rotate()`.

pub mod bezier;
pub mod ellipse;
pub mod line;
pub mod matrix;
pub mod path;
pub mod point;
pub mod rect;

pub use bezier::{CubicBezier, curve_control_points, curve_through_points};
pub use ellipse::Ellipse;
pub use line::{Bearing, Line};
pub use matrix::{Decomposition, Matrix};
pub use path::{PathCommand, PathData, fmt_num};
pub use point::{Point, pt};
pub use rect::{Rect, Side};
