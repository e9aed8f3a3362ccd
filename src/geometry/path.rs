//! Path data: the `d` attribute of a drawable path.
//!
//! Only absolute move, line, cubic and close commands are produced by the
//! router and the connectors, so that is all this type models. Numbers are
//! written with six significant figures and trailing zeros trimmed.

use std::fmt;

use super::bezier::CubicBezier;
use super::point::{Point, pt};
use super::rect::Rect;
use crate::errors::GeometryError;

/// Segments used when flattening a cubic for length queries.
const FLATTEN_SEGMENTS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
    Close,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathData {
    commands: Vec<PathCommand>,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to (x, y)
    pub fn m(mut self, x: f64, y: f64) -> Self {
        self.commands.push(PathCommand::MoveTo(pt(x, y)));
        self
    }

    /// Line to (x, y)
    pub fn l(mut self, x: f64, y: f64) -> Self {
        self.commands.push(PathCommand::LineTo(pt(x, y)));
        self
    }

    /// Cubic curve through two control points to (x, y)
    pub fn c(mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) -> Self {
        self.commands
            .push(PathCommand::CurveTo(pt(x1, y1), pt(x2, y2), pt(x, y)));
        self
    }

    /// Close the current subpath
    pub fn z(mut self) -> Self {
        self.commands.push(PathCommand::Close);
        self
    }

    /// Polyline through `points`.
    pub fn polyline(points: &[Point]) -> Self {
        let mut path = PathData::new();
        for (i, p) in points.iter().enumerate() {
            path = if i == 0 { path.m(p.x, p.y) } else { path.l(p.x, p.y) };
        }
        path
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Parse the subset written by `Display`: absolute `M`, `L`, `C`, `Z`,
    /// separated by whitespace or commas.
    pub fn parse(d: &str) -> Result<PathData, GeometryError> {
        let tokens: Vec<&str> = d
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect();
        let mut path = PathData::new();
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            let arity = match token {
                "M" | "L" => 2,
                "C" => 6,
                "Z" | "z" => 0,
                _ => {
                    return Err(GeometryError::InvalidPathData {
                        token: token.to_string(),
                    });
                }
            };
            let mut args = [0.0; 6];
            for (k, slot) in args.iter_mut().take(arity).enumerate() {
                let raw = tokens.get(i + 1 + k).ok_or_else(|| GeometryError::InvalidPathData {
                    token: token.to_string(),
                })?;
                *slot = raw.parse().map_err(|_| GeometryError::InvalidPathData {
                    token: raw.to_string(),
                })?;
            }
            path = match token {
                "M" => path.m(args[0], args[1]),
                "L" => path.l(args[0], args[1]),
                "C" => path.c(args[0], args[1], args[2], args[3], args[4], args[5]),
                _ => path.z(),
            };
            i += 1 + arity;
        }
        Ok(path)
    }

    /// Walk the path as straight pieces, flattening curves.
    fn pieces(&self) -> Vec<(Point, Point)> {
        let mut pieces = Vec::new();
        let mut current = Point::ORIGIN;
        let mut subpath_start = Point::ORIGIN;
        for command in &self.commands {
            match *command {
                PathCommand::MoveTo(p) => {
                    current = p;
                    subpath_start = p;
                }
                PathCommand::LineTo(p) => {
                    pieces.push((current, p));
                    current = p;
                }
                PathCommand::CurveTo(c1, c2, p) => {
                    let curve = CubicBezier::new(current, c1, c2, p);
                    let points = curve.flatten(FLATTEN_SEGMENTS);
                    pieces.extend(points.windows(2).map(|w| (w[0], w[1])));
                    current = p;
                }
                PathCommand::Close => {
                    pieces.push((current, subpath_start));
                    current = subpath_start;
                }
            }
        }
        pieces
    }

    /// Total length of the drawn path.
    pub fn length(&self) -> f64 {
        self.pieces().iter().map(|(a, b)| a.distance(*b)).sum()
    }

    /// Point at `distance` along the path, clamped to its ends.
    ///
    /// `None` for an empty path.
    pub fn point_at_length(&self, distance: f64) -> Option<Point> {
        let pieces = self.pieces();
        let start = match (pieces.first(), self.commands.first()) {
            (Some((a, _)), _) => *a,
            (None, Some(PathCommand::MoveTo(p))) => return Some(*p),
            (None, _) => return None,
        };
        if distance <= 0.0 {
            return Some(start);
        }
        let mut remaining = distance;
        for (a, b) in &pieces {
            let len = a.distance(*b);
            if remaining <= len && len > 0.0 {
                return Some(a.lerp(*b, remaining / len));
            }
            remaining -= len;
        }
        pieces.last().map(|(_, b)| *b)
    }

    /// Unit direction of travel at `distance` along the path.
    ///
    /// `None` when the path has no extent.
    pub fn tangent_at_length(&self, distance: f64) -> Option<Point> {
        let pieces: Vec<(Point, Point)> = self
            .pieces()
            .into_iter()
            .filter(|(a, b)| a.distance(*b) > 0.0)
            .collect();
        let mut remaining = distance.max(0.0);
        let mut piece = pieces.last()?;
        for candidate in &pieces {
            let len = candidate.0.distance(candidate.1);
            if remaining <= len {
                piece = candidate;
                break;
            }
            remaining -= len;
        }
        let (a, b) = *piece;
        let len = a.distance(b);
        Some(Point::new((b.x - a.x) / len, (b.y - a.y) / len))
    }

    /// Bounding box of all points and control points.
    pub fn bbox(&self) -> Option<Rect> {
        let points: Vec<Point> = self
            .commands
            .iter()
            .flat_map(|c| match *c {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => vec![p],
                PathCommand::CurveTo(c1, c2, p) => vec![c1, c2, p],
                PathCommand::Close => vec![],
            })
            .collect();
        Rect::from_points(&points)
    }
}

impl fmt::Display for PathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match command {
                PathCommand::MoveTo(p) => write!(f, "M {} {}", fmt_num(p.x), fmt_num(p.y))?,
                PathCommand::LineTo(p) => write!(f, "L {} {}", fmt_num(p.x), fmt_num(p.y))?,
                PathCommand::CurveTo(c1, c2, p) => write!(
                    f,
                    "C {} {} {} {} {} {}",
                    fmt_num(c1.x),
                    fmt_num(c1.y),
                    fmt_num(c2.x),
                    fmt_num(c2.y),
                    fmt_num(p.x),
                    fmt_num(p.y)
                )?,
                PathCommand::Close => f.write_str("Z")?,
            }
        }
        Ok(())
    }
}

/// Format a number with 6 significant figures, trailing zeros trimmed.
///
/// Values within 1e-9 of zero print as `0`, so rotation noise such as
/// `6.1e-15` never reaches an attribute.
pub fn fmt_num(value: f64) -> String {
    fmt_num_precision(value, 6)
}

fn fmt_num_precision(value: f64, sig_figs: i32) -> String {
    if value.abs() < 1e-9 {
        return "0".to_string();
    }

    // Round to specified significant figures
    let abs_val = value.abs();
    let magnitude = abs_val.log10().floor() as i32;
    let scale = 10_f64.powi(sig_figs - 1 - magnitude);
    let rounded = (value * scale).round() / scale;

    // Format with enough decimal places, then trim
    let decimals = (sig_figs - 1 - magnitude).max(0) as usize;
    let s = format!("{:.prec$}", rounded, prec = decimals);
    if !s.contains('.') {
        return s;
    }
    let s = s.trim_end_matches('0');
    let s = s.trim_end_matches('.');
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(0.0), "0");
        assert_eq!(fmt_num(100.0), "100");
        assert_eq!(fmt_num(33.333333333), "33.3333");
        assert_eq!(fmt_num(-2.5), "-2.5");
        assert_eq!(fmt_num(6.123e-15), "0");
        assert_eq!(fmt_num(1234567.0), "1234570");
    }

    #[test]
    fn test_display() {
        let path = PathData::new().m(0.0, 0.0).l(10.0, 0.0).c(1.0, 2.0, 3.0, 4.0, 5.5, 6.0).z();
        insta::assert_snapshot!(path.to_string(), @"M 0 0 L 10 0 C 1 2 3 4 5.5 6 Z");
    }

    #[test]
    fn test_parse_display_output() {
        let path = PathData::new().m(0.0, 0.0).l(10.0, 0.0).l(10.0, 5.5);
        let parsed = PathData::parse(&path.to_string()).unwrap();
        assert_eq!(parsed, path);
        let marker = PathData::parse("M 10 0 L 0 5 L 10 10 z").unwrap();
        assert_eq!(marker.commands().len(), 4);
    }

    #[test]
    fn test_parse_rejects_unknown_commands() {
        let err = PathData::parse("M 0 0 Q 1 1 2 2").unwrap_err();
        assert_eq!(
            err,
            GeometryError::InvalidPathData {
                token: "Q".to_string()
            }
        );
        assert!(PathData::parse("M 0").is_err());
        assert!(PathData::parse("L a b").is_err());
    }

    #[test]
    fn test_length_and_point_at_length() {
        let path = PathData::polyline(&[pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 50.0)]);
        assert_eq!(path.length(), 150.0);
        assert_eq!(path.point_at_length(50.0), Some(pt(50.0, 0.0)));
        assert_eq!(path.point_at_length(125.0), Some(pt(100.0, 25.0)));
        assert_eq!(path.point_at_length(-5.0), Some(pt(0.0, 0.0)));
        assert_eq!(path.point_at_length(1000.0), Some(pt(100.0, 50.0)));
        assert_eq!(PathData::new().point_at_length(1.0), None);
    }

    #[test]
    fn test_tangent_at_length() {
        let path = PathData::polyline(&[pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 50.0)]);
        assert_eq!(path.tangent_at_length(20.0), Some(pt(1.0, 0.0)));
        assert_eq!(path.tangent_at_length(120.0), Some(pt(0.0, 1.0)));
        assert_eq!(path.tangent_at_length(500.0), Some(pt(0.0, 1.0)));
        assert_eq!(PathData::new().m(5.0, 5.0).tangent_at_length(0.0), None);
    }

    #[test]
    fn test_closed_marker_bbox() {
        let marker = PathData::parse("M 10 0 L 0 5 L 10 10 z").unwrap();
        assert_eq!(marker.bbox(), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(marker.length(), 2.0 * 125f64.sqrt() + 10.0);
    }
}
