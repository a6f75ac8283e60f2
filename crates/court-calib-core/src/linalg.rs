//! Dense Gauss-Jordan elimination with partial pivoting.
//!
//! The homography estimator solves an exactly-determined 8×8 system and the
//! inverse mapping needs a 3×3 inverse. Both go through [`eliminate`], which
//! reports the columns it could not pivot instead of failing outright, so a
//! caller can decide whether a rank-deficient result is acceptable.

use nalgebra::{DMatrix, DVector, Matrix3};

/// Pivots with a smaller magnitude are treated as zero.
pub const PIVOT_EPS: f64 = 1e-9;

/// Bookkeeping returned by [`eliminate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Elimination {
    /// Columns whose best remaining pivot was below [`PIVOT_EPS`].
    pub skipped_columns: Vec<usize>,
}

impl Elimination {
    pub fn is_full_rank(&self) -> bool {
        self.skipped_columns.is_empty()
    }
}

/// Reduce the first `cols` columns of the augmented matrix `aug` in place.
///
/// For column `c` the pivot is the row with the largest absolute value among
/// rows `c..`. A pivot below [`PIVOT_EPS`] marks the column as skipped and the
/// elimination moves on. Accepted pivot rows are normalized and the pivot
/// column is cleared from every other row, so non-skipped columns end up as
/// unit vectors and the trailing columns hold the solution.
pub fn eliminate(aug: &mut DMatrix<f64>, cols: usize) -> Elimination {
    let rows = aug.nrows();
    let width = aug.ncols();
    let cols = cols.min(width);
    let mut skipped = Vec::new();

    for col in 0..cols {
        if col >= rows {
            skipped.push(col);
            continue;
        }

        let mut pivot = col;
        let mut best = aug[(col, col)].abs();
        for r in col + 1..rows {
            let v = aug[(r, col)].abs();
            if v > best {
                best = v;
                pivot = r;
            }
        }

        // `!(>=)` also rejects NaN.
        if !(best >= PIVOT_EPS) {
            skipped.push(col);
            continue;
        }

        if pivot != col {
            aug.swap_rows(pivot, col);
        }

        let div = aug[(col, col)];
        for c in col..width {
            aug[(col, c)] /= div;
        }

        for r in 0..rows {
            if r == col {
                continue;
            }
            let factor = aug[(r, col)];
            if factor == 0.0 {
                continue;
            }
            for c in col..width {
                aug[(r, c)] -= factor * aug[(col, c)];
            }
        }
    }

    Elimination {
        skipped_columns: skipped,
    }
}

fn solve_augmented(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<(DVector<f64>, Elimination)> {
    let (n, m) = a.shape();
    if m == 0 || n < m || b.len() != n {
        return None;
    }

    let mut aug = DMatrix::<f64>::zeros(n, m + 1);
    aug.view_mut((0, 0), (n, m)).copy_from(a);
    aug.set_column(m, b);

    let elim = eliminate(&mut aug, m);
    let x = DVector::from_fn(m, |i, _| aug[(i, m)]);
    Some((x, elim))
}

/// Solve `A x = b` for an `n×m` matrix with `n >= m`.
///
/// Skipped (near-zero pivot) columns leave their unknown at whatever the
/// reduced right-hand side holds, which is a valid solution for consistent
/// rank-deficient systems. Malformed shapes yield the zero vector.
pub fn solve(a: &DMatrix<f64>, b: &DVector<f64>) -> DVector<f64> {
    solve_augmented(a, b)
        .map(|(x, _)| x)
        .unwrap_or_else(|| DVector::zeros(a.ncols()))
}

/// Like [`solve`], but returns `None` unless every column found a pivot.
pub fn solve_checked(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let (x, elim) = solve_augmented(a, b)?;
    if !elim.is_full_rank() {
        log::debug!(
            "linear system is rank deficient, skipped columns {:?}",
            elim.skipped_columns
        );
        return None;
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Invert a 3×3 matrix by eliminating `[M | I]`.
///
/// Returns `None` when any pivot falls below [`PIVOT_EPS`].
pub fn invert3x3(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let mut aug = DMatrix::<f64>::zeros(3, 6);
    for r in 0..3 {
        for c in 0..3 {
            aug[(r, c)] = m[(r, c)];
        }
        aug[(r, 3 + r)] = 1.0;
    }

    if !eliminate(&mut aug, 3).is_full_rank() {
        return None;
    }

    Some(Matrix3::from_fn(|r, c| aug[(r, 3 + c)]))
}
