use crate::linalg::{invert3x3, solve_checked};
use nalgebra::{DMatrix, DVector, Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Projective denominators below this magnitude map to infinity.
pub const INFINITY_EPS: f64 = 1e-6;

/// Twice the triangle area of any three corners, relative to the squared
/// extent of the quad, must exceed this for the quad to be usable.
const COLLINEAR_REL_EPS: f64 = 1e-9;

/// Which side of a correspondence a degenerate point belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointSet {
    Source,
    Target,
}

impl std::fmt::Display for PointSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointSet::Source => f.write_str("source"),
            PointSet::Target => f.write_str("target"),
        }
    }
}

/// Reasons a 4-point correspondence cannot produce a usable homography.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    #[error("{set} point {index} is not finite")]
    NonFinite { set: PointSet, index: usize },
    #[error("{set} points {a} and {b} coincide")]
    DuplicatePoints { set: PointSet, a: usize, b: usize },
    #[error("{set} points {a}, {b} and {c} are collinear")]
    CollinearPoints {
        set: PointSet,
        a: usize,
        b: usize,
        c: usize,
    },
    #[error("DLT system is singular")]
    SingularSystem,
    #[error("homography is not invertible")]
    NotInvertible,
}

/// A 3×3 projective transform, serialized as row-major nested arrays.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 3]; 3]", into = "[[f64; 3]; 3]")]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Map `p`, or `None` when it lands at (or numerically near) infinity.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if !(w.abs() >= INFINITY_EPS) {
            return None;
        }
        let out = Point2::new(v[0] / w, v[1] / w);
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }

    #[inline]
    pub fn apply_xy(&self, x: f64, y: f64) -> Option<Point2<f64>> {
        self.apply(Point2::new(x, y))
    }

    /// Matrix inverse via [`invert3x3`].
    pub fn inverse(&self) -> Option<Self> {
        invert3x3(&self.h).map(Self::new)
    }
}

impl From<[[f64; 3]; 3]> for Homography {
    fn from(rows: [[f64; 3]; 3]) -> Self {
        Self::from_array(rows)
    }
}

impl From<Homography> for [[f64; 3]; 3] {
    fn from(h: Homography) -> Self {
        h.to_array()
    }
}

fn check_quad(pts: &[Point2<f64>; 4], set: PointSet) -> Result<(), HomographyError> {
    if let Some(index) = pts.iter().position(|p| !(p.x.is_finite() && p.y.is_finite())) {
        return Err(HomographyError::NonFinite { set, index });
    }

    let mut extent2 = 0.0_f64;
    for a in 0..4 {
        for b in a + 1..4 {
            extent2 = extent2.max((pts[a] - pts[b]).norm_squared());
        }
    }
    for a in 0..4 {
        for b in a + 1..4 {
            let d2 = (pts[a] - pts[b]).norm_squared();
            if d2 <= extent2 * COLLINEAR_REL_EPS * COLLINEAR_REL_EPS {
                return Err(HomographyError::DuplicatePoints { set, a, b });
            }
        }
    }

    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    for (a, b, c) in TRIPLES {
        let ab = pts[b] - pts[a];
        let ac = pts[c] - pts[a];
        let cross = ab.x * ac.y - ab.y * ac.x;
        if cross.abs() <= extent2 * COLLINEAR_REL_EPS {
            return Err(HomographyError::CollinearPoints { set, a, b, c });
        }
    }
    Ok(())
}

/// Compute H such that `dst ~ H * src` from exactly four correspondences.
///
/// Unknowns are `h0..h7` with `h8 = 1`. For each `(x,y) -> (u,v)`:
/// ```text
/// [x y 1 0 0 0 -u·x -u·y] · h = u
/// [0 0 0 x y 1 -v·x -v·y] · h = v
/// ```
/// Four correspondences make the system exactly determined, so no
/// least-squares fit is involved. Corner order must match between `src` and
/// `dst`.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn compute_homography(
    src: &[Point2<f64>; 4],
    dst: &[Point2<f64>; 4],
) -> Result<Homography, HomographyError> {
    check_quad(src, PointSet::Source)?;
    check_quad(dst, PointSet::Target)?;

    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DVector::<f64>::zeros(8);

    for k in 0..4 {
        let (x, y) = (src[k].x, src[k].y);
        let (u, v) = (dst[k].x, dst[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = solve_checked(&a, &b).ok_or(HomographyError::SingularSystem)?;

    let h = Matrix3::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );
    log::debug!("computed homography {:?}", h);

    Ok(Homography::new(h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.9},{:.9}) ~ ({:.9},{:.9}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn court() -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(18.0, 0.0),
            Point2::new(18.0, 9.0),
            Point2::new(0.0, 9.0),
        ]
    }

    fn clicks() -> [Point2<f64>; 4] {
        // Broadcast-style view: near baseline wide, far baseline narrow.
        [
            Point2::new(212.0, 901.0),
            Point2::new(1702.0, 894.0),
            Point2::new(1391.0, 402.0),
            Point2::new(531.0, 410.0),
        ]
    }

    #[test]
    fn four_points_map_exactly() {
        let h = compute_homography(&clicks(), &court()).expect("homography");
        assert_eq!(h.h[(2, 2)], 1.0);
        for (src, dst) in clicks().iter().zip(court()) {
            assert_close(h.apply(*src).expect("finite"), dst, 1e-6);
        }
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = compute_homography(&clicks(), &court()).expect("homography");
        let inv = h.inverse().expect("invertible");

        let mut samples = clicks().to_vec();
        samples.extend([
            Point2::new(960.0, 650.0),
            Point2::new(700.0, 500.0),
            Point2::new(1300.0, 820.0),
        ]);
        for p in samples {
            let q = h.apply(p).expect("forward");
            let back = inv.apply(q).expect("inverse");
            assert_close(back, p, 1e-6);
        }
    }

    #[test]
    fn recovers_known_transform() {
        let ground_truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));
        let src = court();
        let dst = src.map(|p| ground_truth.apply(p).expect("finite"));

        let recovered = compute_homography(&src, &dst).expect("recoverable");
        for p in [Point2::new(3.0, 2.0), Point2::new(9.0, 4.5), Point2::new(15.0, 7.0)] {
            assert_close(
                recovered.apply(p).expect("finite"),
                ground_truth.apply(p).expect("finite"),
                1e-6,
            );
        }
    }

    #[test]
    fn duplicate_points_are_degenerate() {
        let mut src = clicks();
        src[3] = src[2];
        let err = compute_homography(&src, &court()).unwrap_err();
        assert_eq!(
            err,
            HomographyError::DuplicatePoints {
                set: PointSet::Source,
                a: 2,
                b: 3
            }
        );
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let src = [
            Point2::new(100.0, 100.0),
            Point2::new(200.0, 200.0),
            Point2::new(300.0, 300.0),
            Point2::new(100.0, 400.0),
        ];
        let err = compute_homography(&src, &court()).unwrap_err();
        assert!(matches!(err, HomographyError::CollinearPoints { .. }));
    }

    #[test]
    fn non_finite_points_are_rejected() {
        let mut src = clicks();
        src[1].x = f64::NAN;
        let err = compute_homography(&src, &court()).unwrap_err();
        assert_eq!(
            err,
            HomographyError::NonFinite {
                set: PointSet::Source,
                index: 1
            }
        );
    }

    #[test]
    fn points_on_the_vanishing_line_are_unmappable() {
        let h = Homography::new(Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.01, 1.0,
        ));
        // denominator = 0.01 * y + 1 vanishes at y = -100
        assert!(h.apply_xy(5.0, -100.0).is_none());
        assert!(h.apply_xy(5.0, 10.0).is_some());
    }

    #[test]
    fn serializes_as_row_major_rows() {
        let h = Homography::from_array([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 1.0]]);
        assert_eq!(h.h[(0, 2)], 3.0);
        assert_eq!(h.h[(2, 0)], 7.0);
        let rows: [[f64; 3]; 3] = h.into();
        assert_eq!(rows[1], [4.0, 5.0, 6.0]);
    }
}
