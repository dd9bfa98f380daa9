//! Relaxation solvers for `A · x = b`.
//!
//! Jacobi, Gauss-Seidel, and SOR share one contract: `x` carries the initial
//! guess in and the final estimate out, the caller fixes the iteration count
//! (convergence never exits early), and an optional residual buffer receives
//! one Euclidean norm of `b − A·x` per iteration, measured before that
//! iteration's update is committed.
//!
//! A zero diagonal entry means "do not divide": the row's estimate is left
//! unchanged for that pass instead of producing inf/NaN. Dirichlet
//! elimination can legitimately produce such rows, so this is recovery, not
//! an error.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::error::{Result, SolverError};

/// Per-component initial guess `b_i / A_ii`, falling back to zero where the
/// diagonal vanishes. Usually closer to the solution than an all-zero start.
pub fn initial_guess(a: &DMatrix<f64>, b: &DVector<f64>) -> DVector<f64> {
    DVector::from_fn(b.len(), |i, _| {
        let diag = a[(i, i)];
        if diag != 0.0 { b[i] / diag } else { 0.0 }
    })
}

/// Check row-wise diagonal dominance: `|A_ii| ≥ Σ_{j≠i} |A_ij|` for every
/// row. Jacobi convergence is guaranteed under dominance; stiffness matrices
/// frequently violate it, which degrades but does not forbid the solve.
pub fn diagonally_dominant(a: &DMatrix<f64>) -> bool {
    (0..a.nrows()).all(|i| {
        let off_diagonal: f64 = (0..a.ncols())
            .filter(|&j| j != i)
            .map(|j| a[(i, j)].abs())
            .sum();
        a[(i, i)].abs() >= off_diagonal
    })
}

/// Residual norm `‖b − A·x‖₂`, accumulated as a sum of squares so the value
/// is independent of row evaluation order.
pub fn residual_norm(a: &DMatrix<f64>, b: &DVector<f64>, x: &DVector<f64>) -> f64 {
    let sum_of_squares: f64 = (0..a.nrows())
        .map(|i| {
            let row_product: f64 = (0..a.ncols()).map(|j| a[(i, j)] * x[j]).sum();
            let r = b[i] - row_product;
            r * r
        })
        .sum();
    sum_of_squares.sqrt()
}

pub(crate) fn check_residual_buffer(residuals: &Option<&mut [f64]>, iterations: usize) -> Result<()> {
    if let Some(buffer) = residuals {
        if buffer.len() < iterations {
            return Err(SolverError::ResidualBufferTooShort {
                len: buffer.len(),
                iterations,
            });
        }
    }
    Ok(())
}

/// Jacobi relaxation: every row's update reads only the previous iteration's
/// vector, alternating between two buffers.
pub fn solve_jacobi(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    x: &mut DVector<f64>,
    iterations: usize,
    mut residuals: Option<&mut [f64]>,
) -> Result<()> {
    check_residual_buffer(&residuals, iterations)?;
    let n = b.len();
    let mut next = x.clone();

    for iteration in 0..iterations {
        if let Some(buffer) = residuals.as_deref_mut() {
            buffer[iteration] = residual_norm(a, b, x);
        }

        for i in 0..n {
            next[i] = jacobi_row(a, b, x, i);
        }
        std::mem::swap(x, &mut next);
    }
    Ok(())
}

/// Jacobi relaxation with row updates spread across the rayon thread pool.
/// Produces the same result as [`solve_jacobi`] for the same input: every
/// row reads only the previous buffer, so scheduling order cannot matter.
pub fn solve_jacobi_parallel(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    x: &mut DVector<f64>,
    iterations: usize,
    mut residuals: Option<&mut [f64]>,
) -> Result<()> {
    check_residual_buffer(&residuals, iterations)?;
    let n = b.len();
    let mut next = x.clone();

    for iteration in 0..iterations {
        if let Some(buffer) = residuals.as_deref_mut() {
            let sum_of_squares: f64 = (0..n)
                .into_par_iter()
                .map(|i| {
                    let row_product: f64 = (0..n).map(|j| a[(i, j)] * x[j]).sum();
                    let r = b[i] - row_product;
                    r * r
                })
                .sum();
            buffer[iteration] = sum_of_squares.sqrt();
        }

        {
            let previous = &*x;
            next.as_mut_slice()
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, value)| {
                    *value = jacobi_row(a, b, previous, i);
                });
        }
        std::mem::swap(x, &mut next);
    }
    Ok(())
}

/// Gauss-Seidel relaxation, equivalent to SOR with factor 1
pub fn solve_gauss_seidel(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    x: &mut DVector<f64>,
    iterations: usize,
    residuals: Option<&mut [f64]>,
) -> Result<()> {
    solve_sor(a, b, x, iterations, 1.0, residuals)
}

/// Successive over-relaxation: each row blends the Gauss-Seidel estimate with
/// the previous value, `x_i ← ω·x_gs + (1−ω)·x_i`. Rows before `i` are
/// already updated within the pass.
///
/// `omega` outside `(0, 2)` voids every convergence guarantee and is
/// rejected.
pub fn solve_sor(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    x: &mut DVector<f64>,
    iterations: usize,
    omega: f64,
    mut residuals: Option<&mut [f64]>,
) -> Result<()> {
    if !(omega > 0.0 && omega < 2.0) {
        return Err(SolverError::InvalidRelaxationFactor { omega });
    }
    check_residual_buffer(&residuals, iterations)?;
    let n = b.len();

    for iteration in 0..iterations {
        if let Some(buffer) = residuals.as_deref_mut() {
            buffer[iteration] = residual_norm(a, b, x);
        }

        for i in 0..n {
            let diag = a[(i, i)];
            if diag == 0.0 {
                continue;
            }
            let mut sum = b[i];
            for j in 0..n {
                if j != i {
                    sum -= a[(i, j)] * x[j];
                }
            }
            x[i] = omega * (sum / diag) + (1.0 - omega) * x[i];
        }
    }
    Ok(())
}

/// One Jacobi row update against the previous-iteration vector
fn jacobi_row(a: &DMatrix<f64>, b: &DVector<f64>, previous: &DVector<f64>, i: usize) -> f64 {
    let diag = a[(i, i)];
    if diag == 0.0 {
        return previous[i];
    }
    let mut sum = b[i];
    for j in 0..b.len() {
        if j != i {
            sum -= a[(i, j)] * previous[j];
        }
    }
    sum / diag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dominant_system() -> (DMatrix<f64>, DVector<f64>) {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, -1.0, 0.0, -1.0, 4.0, -1.0, 0.0, -1.0, 4.0]);
        let b = DVector::from_column_slice(&[3.0, 2.0, 3.0]);
        (a, b)
    }

    #[test]
    fn jacobi_converges_on_dominant_system() {
        let (a, b) = dominant_system();
        assert!(diagonally_dominant(&a));

        let mut x = initial_guess(&a, &b);
        solve_jacobi(&a, &b, &mut x, 60, None).unwrap();

        let exact = a.clone().lu().solve(&b).unwrap();
        assert!((x - exact).norm() < 1e-10);
    }

    #[test]
    fn residuals_decrease_monotonically_here() {
        let (a, b) = dominant_system();
        let mut x = DVector::zeros(3);
        let mut residuals = [0.0; 20];
        solve_jacobi(&a, &b, &mut x, 20, Some(&mut residuals)).unwrap();

        assert!((residuals[0] - b.norm()).abs() < 1e-12);
        for pair in residuals.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn parallel_jacobi_matches_sequential() {
        let (a, b) = dominant_system();

        let mut sequential = DVector::zeros(3);
        let mut parallel = DVector::zeros(3);
        let mut res_seq = [0.0; 15];
        let mut res_par = [0.0; 15];
        solve_jacobi(&a, &b, &mut sequential, 15, Some(&mut res_seq)).unwrap();
        solve_jacobi_parallel(&a, &b, &mut parallel, 15, Some(&mut res_par)).unwrap();

        assert_eq!(sequential, parallel);
        for (s, p) in res_seq.iter().zip(&res_par) {
            assert!((s - p).abs() <= 1e-12 * s.max(1.0));
        }
    }

    #[test]
    fn sor_with_unit_factor_is_gauss_seidel() {
        let (a, b) = dominant_system();

        let mut gs = DVector::zeros(3);
        let mut sor = DVector::zeros(3);
        solve_gauss_seidel(&a, &b, &mut gs, 10, None).unwrap();
        solve_sor(&a, &b, &mut sor, 10, 1.0, None).unwrap();

        assert_eq!(gs, sor);
    }

    #[test]
    fn zero_diagonal_row_is_left_unchanged() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 3.0, 1.0, 2.0]);
        let b = DVector::from_column_slice(&[1.0, 1.0]);

        let mut x = DVector::from_column_slice(&[0.5, 0.5]);
        solve_jacobi(&a, &b, &mut x, 1, None).unwrap();
        assert_eq!(x[0], 0.5);
        assert!(x.iter().all(|v| v.is_finite()));

        let mut x = DVector::from_column_slice(&[0.5, 0.5]);
        solve_gauss_seidel(&a, &b, &mut x, 1, None).unwrap();
        assert_eq!(x[0], 0.5);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rejects_out_of_range_relaxation_factor() {
        let (a, b) = dominant_system();
        let mut x = DVector::zeros(3);

        for omega in [0.0, -0.5, 2.0, 2.5] {
            let err = solve_sor(&a, &b, &mut x, 5, omega, None).unwrap_err();
            assert!(matches!(err, SolverError::InvalidRelaxationFactor { .. }));
        }
    }

    #[test]
    fn rejects_short_residual_buffer() {
        let (a, b) = dominant_system();
        let mut x = DVector::zeros(3);
        let mut residuals = [0.0; 3];

        let err = solve_jacobi(&a, &b, &mut x, 5, Some(&mut residuals)).unwrap_err();
        assert!(matches!(
            err,
            SolverError::ResidualBufferTooShort { len: 3, iterations: 5 }
        ));
    }

    #[test]
    fn initial_guess_divides_by_diagonal() {
        let (a, b) = dominant_system();
        let guess = initial_guess(&a, &b);
        assert_eq!(guess[0], 3.0 / 4.0);

        let singular = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 2.0]);
        let guess = initial_guess(&singular, &DVector::from_column_slice(&[5.0, 4.0]));
        assert_eq!(guess[0], 0.0);
        assert_eq!(guess[1], 2.0);
    }

    #[test]
    fn non_dominant_matrix_is_detected() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 3.0, 1.0]);
        assert!(!diagonally_dominant(&a));
    }
}
