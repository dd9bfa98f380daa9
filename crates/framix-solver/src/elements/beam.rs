//! 2-node 3D Euler-Bernoulli beam element.
//!
//! Each element couples the 6 DOFs at its two end nodes through four 6×6
//! stiffness sub-blocks: `k11` relates forces at node 1 to displacements at
//! node 1, `k12` to displacements at node 2, and so on. The blocks combine
//! axial stiffness `EA/L`, bending about both transverse axes
//! (`12EI/L³`, `6EI/L²`, `4EI/L`, `2EI/L`), and torsion `GJ/L`, and are
//! transformed from the element's local frame to global coordinates before
//! assembly.
//!
//! DOF order per node: [ux, uy, uz, θx, θy, θz].

use nalgebra::Vector3;

use framix_model::Element;

use crate::error::{Result, SolverError};
use crate::transform::{expand_rotation, local_basis, rotate_block, Matrix6};

/// Smallest element length treated as non-degenerate
const MIN_LENGTH: f64 = 1e-12;

/// Section properties of a circular cross-section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamSection {
    /// Cross-sectional area A = πr²
    pub area: f64,
    /// Second moment of area about both transverse axes, I = πr⁴/4
    pub second_moment: f64,
    /// Torsional constant J = πr⁴/2
    pub torsion_constant: f64,
}

impl BeamSection {
    /// Section properties for a solid circular cross-section of `radius`
    pub fn circular(radius: f64) -> Self {
        let area = std::f64::consts::PI * radius.powi(2);
        let second_moment = std::f64::consts::PI * radius.powi(4) / 4.0;
        let torsion_constant = std::f64::consts::PI * radius.powi(4) / 2.0;

        Self {
            area,
            second_moment,
            torsion_constant,
        }
    }
}

/// The four global-frame stiffness sub-blocks of one element
#[derive(Debug, Clone)]
pub struct StiffnessBlocks {
    pub k11: Matrix6,
    pub k12: Matrix6,
    pub k21: Matrix6,
    pub k22: Matrix6,
}

/// Compute the four global 6×6 stiffness sub-blocks for `element` spanning
/// positions `p1` to `p2`.
///
/// `element_index` is used only for diagnostics. Fails if the two positions
/// coincide, since the local frame (and every 1/L term) is undefined.
pub fn stiffness_blocks(
    element_index: usize,
    element: &Element,
    p1: &Vector3<f64>,
    p2: &Vector3<f64>,
) -> Result<StiffnessBlocks> {
    let length = (p2 - p1).norm();
    if length < MIN_LENGTH {
        return Err(SolverError::DegenerateElement {
            element: element_index,
            node1: element.node1,
            node2: element.node2,
        });
    }

    let section = BeamSection::circular(element.radius);
    let e = element.elastic_modulus;
    let g = element.shear_modulus;

    let axial = e * section.area / length;
    let torsion = g * section.torsion_constant / length;

    // Both transverse axes share I for a circular section
    let i = section.second_moment;
    let bend_shear = 12.0 * e * i / length.powi(3);
    let bend_couple = 6.0 * e * i / length.powi(2);
    let bend_rot = 4.0 * e * i / length;
    let bend_rot_far = 2.0 * e * i / length;

    let mut k11 = Matrix6::zeros();
    let mut k12 = Matrix6::zeros();
    let mut k22 = Matrix6::zeros();

    // Axial (ux) and torsion (θx)
    k11[(0, 0)] = axial;
    k22[(0, 0)] = axial;
    k12[(0, 0)] = -axial;
    k11[(3, 3)] = torsion;
    k22[(3, 3)] = torsion;
    k12[(3, 3)] = -torsion;

    // Bending in the local x-y plane: uy coupled with θz
    k11[(1, 1)] = bend_shear;
    k11[(1, 5)] = bend_couple;
    k11[(5, 1)] = bend_couple;
    k11[(5, 5)] = bend_rot;

    k22[(1, 1)] = bend_shear;
    k22[(1, 5)] = -bend_couple;
    k22[(5, 1)] = -bend_couple;
    k22[(5, 5)] = bend_rot;

    k12[(1, 1)] = -bend_shear;
    k12[(1, 5)] = bend_couple;
    k12[(5, 1)] = -bend_couple;
    k12[(5, 5)] = bend_rot_far;

    // Bending in the local x-z plane: uz coupled with θy (opposite sign
    // convention to the x-y plane)
    k11[(2, 2)] = bend_shear;
    k11[(2, 4)] = -bend_couple;
    k11[(4, 2)] = -bend_couple;
    k11[(4, 4)] = bend_rot;

    k22[(2, 2)] = bend_shear;
    k22[(2, 4)] = bend_couple;
    k22[(4, 2)] = bend_couple;
    k22[(4, 4)] = bend_rot;

    k12[(2, 2)] = -bend_shear;
    k12[(2, 4)] = -bend_couple;
    k12[(4, 2)] = bend_couple;
    k12[(4, 4)] = bend_rot_far;

    let k21 = k12.transpose();

    // Transform every block to global coordinates
    let r6 = expand_rotation(&local_basis(p1, p2));

    Ok(StiffnessBlocks {
        k11: rotate_block(&k11, &r6),
        k12: rotate_block(&k12, &r6),
        k21: rotate_block(&k21, &r6),
        k22: rotate_block(&k22, &r6),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_element() -> Element {
        Element::new(0, 1, 200e9, 80e9, 0.05)
    }

    #[test]
    fn circular_section_constants() {
        let radius: f64 = 0.05;
        let section = BeamSection::circular(radius);

        assert!((section.area - std::f64::consts::PI * radius.powi(2)).abs() < 1e-12);
        assert!((section.second_moment - std::f64::consts::PI * radius.powi(4) / 4.0).abs() < 1e-12);
        assert!((section.torsion_constant - std::f64::consts::PI * radius.powi(4) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn axial_stiffness_along_x() {
        let element = unit_element();
        let blocks = stiffness_blocks(
            0,
            &element,
            &Vector3::zeros(),
            &Vector3::new(1.0, 0.0, 0.0),
        )
        .unwrap();

        let expected = element.elastic_modulus * BeamSection::circular(element.radius).area;
        assert!((blocks.k11[(0, 0)] - expected).abs() / expected < 1e-10);
        assert!((blocks.k12[(0, 0)] + expected).abs() / expected < 1e-10);
        assert!((blocks.k22[(0, 0)] - expected).abs() / expected < 1e-10);
    }

    #[test]
    fn torsion_stiffness_along_x() {
        let element = unit_element();
        let blocks = stiffness_blocks(
            0,
            &element,
            &Vector3::zeros(),
            &Vector3::new(2.0, 0.0, 0.0),
        )
        .unwrap();

        let section = BeamSection::circular(element.radius);
        let expected = element.shear_modulus * section.torsion_constant / 2.0;
        assert!((blocks.k11[(3, 3)] - expected).abs() / expected < 1e-10);
        assert!((blocks.k12[(3, 3)] + expected).abs() / expected < 1e-10);
    }

    #[test]
    fn assembled_pair_is_symmetric() {
        // The 12x12 [[k11 k12] [k21 k22]] must be symmetric, which pins the
        // cross-block sign conventions
        let element = unit_element();
        let blocks = stiffness_blocks(
            0,
            &element,
            &Vector3::new(0.5, -1.0, 2.0),
            &Vector3::new(-1.5, 0.25, 0.75),
        )
        .unwrap();

        let mut k = nalgebra::SMatrix::<f64, 12, 12>::zeros();
        k.fixed_view_mut::<6, 6>(0, 0).copy_from(&blocks.k11);
        k.fixed_view_mut::<6, 6>(0, 6).copy_from(&blocks.k12);
        k.fixed_view_mut::<6, 6>(6, 0).copy_from(&blocks.k21);
        k.fixed_view_mut::<6, 6>(6, 6).copy_from(&blocks.k22);

        let scale = k.abs().max();
        for i in 0..12 {
            for j in 0..12 {
                assert!(
                    (k[(i, j)] - k[(j, i)]).abs() <= scale * 1e-12,
                    "not symmetric at ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn rigid_translation_produces_no_force() {
        // Summing k11 + k12 applies the same displacement to both nodes;
        // a rigid translation must produce zero force
        let element = unit_element();
        let blocks = stiffness_blocks(
            0,
            &element,
            &Vector3::zeros(),
            &Vector3::new(1.0, 2.0, -0.5),
        )
        .unwrap();

        let translation =
            nalgebra::SVector::<f64, 6>::from_column_slice(&[0.1, -0.2, 0.3, 0.0, 0.0, 0.0]);
        let force = (blocks.k11 + blocks.k12) * translation;
        let scale = blocks.k11.abs().max();
        assert!(force.norm() <= scale * 1e-12);
    }

    #[test]
    fn rejects_zero_length_element() {
        let element = unit_element();
        let p = Vector3::new(1.0, 1.0, 1.0);
        let err = stiffness_blocks(7, &element, &p, &p).unwrap_err();
        assert!(matches!(err, SolverError::DegenerateElement { element: 7, .. }));
    }
}
