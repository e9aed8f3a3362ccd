//! 2-D affine transforms and their decomposition.
//!
//! A [`Matrix`] holds the six SVG coefficients `a b c d e f`:
//!
//! ```text
//! | a c e |
//! | b d f |
//! | 0 0 1 |
//! ```
//!
//! Composition and inversion are delegated to `glam::DAffine2`.

use std::fmt;
use std::ops::Mul;

use glam::{DAffine2, DVec2, dvec2};

use super::path::fmt_num;
use super::point::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(DAffine2);

/// Independent components recovered from a composed matrix. Angles are in
/// degrees, clockwise on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposition {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub rotation: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix(DAffine2::IDENTITY);

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Matrix(DAffine2::from_cols_array(&[a, b, c, d, e, f]))
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix(DAffine2::from_translation(dvec2(tx, ty)))
    }

    /// Rotation by `angle` degrees about the origin, clockwise on screen.
    pub fn rotate(angle: f64) -> Self {
        Matrix(DAffine2::from_angle(angle.to_radians()))
    }

    /// Rotation by `angle` degrees about `(cx, cy)`.
    pub fn rotate_about(angle: f64, cx: f64, cy: f64) -> Self {
        Matrix::translate(cx, cy) * Matrix::rotate(angle) * Matrix::translate(-cx, -cy)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Matrix(DAffine2::from_scale(dvec2(sx, sy)))
    }

    /// The six coefficients `[a, b, c, d, e, f]`.
    pub fn coefficients(&self) -> [f64; 6] {
        self.0.to_cols_array()
    }

    /// `self · other`: `other` is applied first.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix(self.0 * other.0)
    }

    /// `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Matrix> {
        if self.0.matrix2.determinant().abs() < f64::EPSILON {
            return None;
        }
        Some(Matrix(self.0.inverse()))
    }

    pub fn apply(&self, p: Point) -> Point {
        self.0.transform_point2(p.to_vec()).into()
    }

    /// Apply the linear part only.
    pub fn delta_transform(&self, x: f64, y: f64) -> DVec2 {
        self.0.transform_vector2(dvec2(x, y))
    }

    /// Split into translation, scale, skew and rotation.
    ///
    /// Scale is the norm of each column of the linear part; skew comes from the
    /// angles of the transformed basis vectors, and the rotation is the x skew.
    pub fn decompose(&self) -> Decomposition {
        let [a, b, c, d, e, f] = self.coefficients();
        // transformed y basis
        let px = self.delta_transform(0.0, 1.0);
        // transformed x basis
        let py = self.delta_transform(1.0, 0.0);

        let skew_x = px.y.atan2(px.x).to_degrees() - 90.0;
        let skew_y = py.y.atan2(py.x).to_degrees();

        Decomposition {
            translate_x: e,
            translate_y: f,
            scale_x: (a * a + b * b).sqrt(),
            scale_y: (c * c + d * d).sqrt(),
            skew_x,
            skew_y,
            rotation: skew_x,
        }
    }

    /// Current scale factors (column norms).
    pub fn scale_factors(&self) -> (f64, f64) {
        let d = self.decompose();
        (d.scale_x, d.scale_y)
    }
}

impl Mul for Matrix {
    type Output = Matrix;
    fn mul(self, rhs: Matrix) -> Matrix {
        self.multiply(&rhs)
    }
}

impl From<DAffine2> for Matrix {
    fn from(m: DAffine2) -> Self {
        Matrix(m)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.coefficients();
        write!(
            f,
            "matrix({},{},{},{},{},{})",
            fmt_num(a),
            fmt_num(b),
            fmt_num(c),
            fmt_num(d),
            fmt_num(e),
            fmt_num(g)
        )
    }
}

impl Decomposition {
    /// Rebuild the matrix from translate, rotate and scale, ignoring skew.
    pub fn recompose(&self) -> Matrix {
        Matrix::translate(self.translate_x, self.translate_y)
            * Matrix::rotate(self.rotation)
            * Matrix::scale(self.scale_x, self.scale_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::pt;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_decomposition() {
        let d = Matrix::IDENTITY.decompose();
        assert!(close(d.scale_x, 1.0) && close(d.scale_y, 1.0));
        assert!(close(d.rotation, 0.0));
        assert!(close(d.skew_x, 0.0) && close(d.skew_y, 0.0));
    }

    #[test]
    fn test_translate_rotate_scale_round_trip() {
        let m = Matrix::translate(40.0, -7.0) * Matrix::rotate(30.0) * Matrix::scale(2.0, 2.0);
        let d = m.decompose();
        assert!(close(d.translate_x, 40.0));
        assert!(close(d.translate_y, -7.0));
        assert!(close(d.scale_x, 2.0) && close(d.scale_y, 2.0));
        assert!(close(d.rotation, 30.0));
        assert!(close(d.skew_y, 30.0));

        let back = d.recompose();
        let p = pt(3.0, 5.0);
        assert!(back.apply(p).distance(m.apply(p)) < 1e-9);
    }

    #[test]
    fn test_rotation_is_clockwise_on_screen() {
        let p = Matrix::rotate(90.0).apply(pt(10.0, 0.0));
        assert!(p.distance(pt(0.0, 10.0)) < 1e-9);
    }

    #[test]
    fn test_rotate_about() {
        let p = Matrix::rotate_about(180.0, 5.0, 5.0).apply(pt(0.0, 5.0));
        assert!(p.distance(pt(10.0, 5.0)) < 1e-9);
    }

    #[test]
    fn test_inverse() {
        let m = Matrix::translate(5.0, 6.0) * Matrix::scale(2.0, 4.0);
        let inv = m.inverse().unwrap();
        assert!(inv.apply(m.apply(pt(1.0, 1.0))).distance(pt(1.0, 1.0)) < 1e-12);
        assert_eq!(Matrix::scale(0.0, 1.0).inverse(), None);
    }

    #[test]
    fn test_display() {
        let m = Matrix::new(1.0, 0.0, 0.0, 1.0, 10.0, 20.5);
        assert_eq!(m.to_string(), "matrix(1,0,0,1,10,20.5)");
    }
}
