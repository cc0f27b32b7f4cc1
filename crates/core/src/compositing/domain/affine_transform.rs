use thiserror::Error;

use crate::shared::geometry::Point;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AffineError {
    #[error("alignment points are collinear")]
    CollinearPoints,
    #[error("transform is not invertible")]
    Singular,
}

/// 2x3 affine map `[a b c; d e f]`: `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    m: [[f64; 3]; 2],
}

impl AffineTransform {
    pub const fn new(m: [[f64; 3]; 2]) -> Self {
        Self { m }
    }

    pub const fn identity() -> Self {
        Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    pub fn coefficients(&self) -> [[f64; 3]; 2] {
        self.m
    }

    /// The unique transform taking each `src[i]` to `dst[i]`.
    pub fn from_triads(src: &[Point; 3], dst: &[Point; 3]) -> Result<Self, AffineError> {
        // Solving [x y 1] * [a b c]^T = x' per row; the system matrix is
        // shared by both output rows.
        let [p0, p1, p2] = *src;
        let det = p0.x * (p1.y - p2.y) + p1.x * (p2.y - p0.y) + p2.x * (p0.y - p1.y);
        let scale = (p1 - p0).norm().max((p2 - p0).norm()).max(1.0);
        if det.abs() <= 1e-9 * scale * scale {
            return Err(AffineError::CollinearPoints);
        }

        let solve = |v0: f64, v1: f64, v2: f64| -> [f64; 3] {
            let a = (v0 * (p1.y - p2.y) + v1 * (p2.y - p0.y) + v2 * (p0.y - p1.y)) / det;
            let b = (p0.x * (v1 - v2) + p1.x * (v2 - v0) + p2.x * (v0 - v1)) / det;
            let c = (p0.x * (p1.y * v2 - p2.y * v1)
                + p1.x * (p2.y * v0 - p0.y * v2)
                + p2.x * (p0.y * v1 - p1.y * v0))
                / det;
            [a, b, c]
        };

        Ok(Self::new([
            solve(dst[0].x, dst[1].x, dst[2].x),
            solve(dst[0].y, dst[1].y, dst[2].y),
        ]))
    }

    pub fn inverse(&self) -> Result<Self, AffineError> {
        let [[a, b, c], [d, e, f]] = self.m;
        let det = a * e - b * d;
        if det.abs() <= f64::EPSILON {
            return Err(AffineError::Singular);
        }
        let (ia, ib, id, ie) = (e / det, -b / det, -d / det, a / det);
        Ok(Self::new([
            [ia, ib, -(ia * c + ib * f)],
            [id, ie, -(id * c + ie * f)],
        ]))
    }

    pub fn apply(&self, p: Point) -> Point {
        let [[a, b, c], [d, e, f]] = self.m;
        Point::new(a * p.x + b * p.y + c, d * p.x + e * p.y + f)
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        let id = Self::identity().m;
        self.m
            .iter()
            .flatten()
            .zip(id.iter().flatten())
            .all(|(v, i)| (v - i).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn assert_point_eq(a: Point, b: Point) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-7);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-7);
    }

    fn triad(pts: [(f64, f64); 3]) -> [Point; 3] {
        pts.map(|(x, y)| Point::new(x, y))
    }

    #[test]
    fn test_maps_triad_onto_triad() {
        let src = triad([(50.0, 95.0), (25.0, 40.0), (75.0, 40.0)]);
        let dst = triad([(210.0, 120.0), (180.0, 52.0), (243.0, 61.0)]);
        let t = AffineTransform::from_triads(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_point_eq(t.apply(*s), *d);
        }
    }

    #[test]
    fn test_identical_triads_give_identity() {
        let pts = triad([(50.0, 95.0), (25.0, 40.0), (75.0, 40.0)]);
        let t = AffineTransform::from_triads(&pts, &pts).unwrap();
        assert!(t.is_identity(1e-9));
    }

    #[test]
    fn test_pure_translation() {
        let src = triad([(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        let dst = triad([(5.0, -3.0), (15.0, -3.0), (5.0, 7.0)]);
        let t = AffineTransform::from_triads(&src, &dst).unwrap();
        let [[a, b, c], [d, e, f]] = t.coefficients();
        assert_relative_eq!(a, 1.0, epsilon = 1e-12);
        assert_relative_eq!(b, 0.0, epsilon = 1e-12);
        assert_relative_eq!(c, 5.0, epsilon = 1e-12);
        assert_relative_eq!(d, 0.0, epsilon = 1e-12);
        assert_relative_eq!(e, 1.0, epsilon = 1e-12);
        assert_relative_eq!(f, -3.0, epsilon = 1e-12);
    }

    #[rstest]
    #[case::same_point([(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)])]
    #[case::horizontal_line([(0.0, 5.0), (10.0, 5.0), (20.0, 5.0)])]
    #[case::diagonal_line([(0.0, 0.0), (3.0, 3.0), (100.0, 100.0)])]
    fn test_collinear_source_rejected(#[case] pts: [(f64, f64); 3]) {
        let dst = triad([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        assert_eq!(
            AffineTransform::from_triads(&triad(pts), &dst),
            Err(AffineError::CollinearPoints)
        );
    }

    #[test]
    fn test_inverse_round_trip_on_arbitrary_points() {
        let src = triad([(50.0, 95.0), (25.0, 40.0), (75.0, 40.0)]);
        let dst = triad([(130.0, 88.0), (101.0, 30.0), (160.0, 35.0)]);
        let forward = AffineTransform::from_triads(&src, &dst).unwrap();
        let inverse = forward.inverse().unwrap();

        for x in (-50..300).step_by(37) {
            for y in (-20..200).step_by(23) {
                let p = Point::new(x as f64 + 0.25, y as f64 - 0.5);
                assert_point_eq(inverse.apply(forward.apply(p)), p);
                assert_point_eq(forward.apply(inverse.apply(p)), p);
            }
        }
    }

    #[test]
    fn test_inverse_matches_reverse_solve() {
        let a = triad([(50.0, 95.0), (25.0, 40.0), (75.0, 40.0)]);
        let b = triad([(130.0, 88.0), (101.0, 30.0), (160.0, 35.0)]);
        let inverse = AffineTransform::from_triads(&a, &b).unwrap().inverse().unwrap();
        let reverse = AffineTransform::from_triads(&b, &a).unwrap();
        for (i, r) in inverse
            .coefficients()
            .iter()
            .flatten()
            .zip(reverse.coefficients().iter().flatten())
        {
            assert_relative_eq!(i, r, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_singular_inverse() {
        let flat = AffineTransform::new([[1.0, 2.0, 0.0], [2.0, 4.0, 0.0]]);
        assert_eq!(flat.inverse(), Err(AffineError::Singular));
    }
}
