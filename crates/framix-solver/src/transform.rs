//! Local coordinate frames for beam elements.
//!
//! Each element defines an orthonormal local basis with x̂ along the element
//! axis. The basis is expanded to a 6×6 rotation (translation and rotation
//! blocks share the same 3×3) and applied to element stiffness blocks as
//! `K_global = Rᵀ · K_local · R`.

use nalgebra::{Matrix3, SMatrix, Vector3};

pub type Matrix6 = SMatrix<f64, 6, 6>;

/// Build the local orthonormal basis for an element running from `p1` to
/// `p2`. Rows of the returned matrix are the local x̂, ŷ, ẑ axes expressed in
/// global coordinates.
///
/// The second basis vector is derived from global Y when the axis is far from
/// it, otherwise from global Z. Crossing with a near-parallel reference loses
/// precision, so the reference flips at |x̂·ŷ_global| = 0.5.
///
/// Callers must guarantee distinct positions; a zero-length axis leaves the
/// basis undefined.
pub fn local_basis(p1: &Vector3<f64>, p2: &Vector3<f64>) -> Matrix3<f64> {
    let ex = (p2 - p1).normalize();

    let global_y = Vector3::new(0.0, 1.0, 0.0);
    let global_z = Vector3::new(0.0, 0.0, 1.0);

    let (ey, ez) = if ex.dot(&global_y).abs() < 0.5 {
        let ez = ex.cross(&global_y).normalize();
        (ez.cross(&ex), ez)
    } else {
        let ey = global_z.cross(&ex).normalize();
        (ey, ex.cross(&ey))
    };

    Matrix3::from_rows(&[ex.transpose(), ey.transpose(), ez.transpose()])
}

/// Expand a 3×3 rotation into the 6×6 applied to one stiffness sub-block:
/// the translation DOFs and the rotation DOFs rotate with the same 3×3.
pub fn expand_rotation(r: &Matrix3<f64>) -> Matrix6 {
    let mut r6 = Matrix6::zeros();
    r6.fixed_view_mut::<3, 3>(0, 0).copy_from(r);
    r6.fixed_view_mut::<3, 3>(3, 3).copy_from(r);
    r6
}

/// Transform a local stiffness sub-block to global coordinates
pub fn rotate_block(block: &Matrix6, r6: &Matrix6) -> Matrix6 {
    r6.transpose() * block * r6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(basis: &Matrix3<f64>) {
        let identity = basis * basis.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (identity[(i, j)] - expected).abs() < 1e-12,
                    "basis not orthonormal at ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn basis_along_x_axis() {
        let basis = local_basis(&Vector3::zeros(), &Vector3::new(2.0, 0.0, 0.0));
        assert_orthonormal(&basis);
        assert!((basis[(0, 0)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn basis_along_y_axis_uses_fallback_reference() {
        // x̂·(0,1,0) = 1, so the reference must flip to global Z
        let basis = local_basis(&Vector3::zeros(), &Vector3::new(0.0, 3.0, 0.0));
        assert_orthonormal(&basis);
        assert!((basis[(0, 1)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn basis_is_right_handed_for_skew_axis() {
        let basis = local_basis(&Vector3::new(1.0, 2.0, 3.0), &Vector3::new(-2.0, 0.5, 1.0));
        assert_orthonormal(&basis);

        let ex = basis.row(0).transpose();
        let ey = basis.row(1).transpose();
        let ez = basis.row(2).transpose();
        assert!((ex.cross(&ey) - ez).norm() < 1e-12);
    }

    #[test]
    fn expanded_rotation_is_block_diagonal() {
        let basis = local_basis(&Vector3::zeros(), &Vector3::new(1.0, 1.0, 0.0));
        let r6 = expand_rotation(&basis);

        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(r6[(i, j)], basis[(i, j)]);
                assert_eq!(r6[(i + 3, j + 3)], basis[(i, j)]);
                assert_eq!(r6[(i, j + 3)], 0.0);
                assert_eq!(r6[(i + 3, j)], 0.0);
            }
        }
    }

    #[test]
    fn rotating_identity_block_preserves_it() {
        let basis = local_basis(&Vector3::zeros(), &Vector3::new(0.3, -0.6, 0.9));
        let r6 = expand_rotation(&basis);
        let rotated = rotate_block(&Matrix6::identity(), &r6);

        for i in 0..6 {
            for j in 0..6 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((rotated[(i, j)] - expected).abs() < 1e-12);
            }
        }
    }
}
