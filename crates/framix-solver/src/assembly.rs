//! Global equation assembly for frame models.
//!
//! Builds the dense global system `K · u = f` from per-element stiffness
//! blocks:
//!
//! 1. Allocate a zero (6N)×(6N) stiffness matrix for N nodes.
//! 2. Scatter-add each element's four 6×6 blocks at the offsets of its two
//!    nodes; shared nodes accumulate contributions from every incident
//!    element.
//! 3. Copy the matrix, then apply boundary conditions to the copy: loads are
//!    written into the force vector, homogeneous displacement/rotation
//!    constraints are eliminated row-and-column with a unit diagonal.
//!
//! The unconstrained matrix is kept untouched so nodal forces can be
//! back-substituted from the solved displacements.

use nalgebra::{DMatrix, DVector, Vector3};

use framix_model::{BoundaryKind, Frame};

use crate::elements::stiffness_blocks;
use crate::error::{ModelWarning, Result, SolverError};
use crate::transform::Matrix6;

/// The assembled linear system for one frame.
///
/// `stiffness` is the raw assembled matrix; `stiffness_bc` is the copy with
/// Dirichlet elimination applied and is what the iterative solvers operate
/// on. `displacements` doubles as the solver's in/out estimate vector.
#[derive(Debug, Clone)]
pub struct EquationSet {
    /// Assembled stiffness matrix, no boundary conditions applied
    pub stiffness: DMatrix<f64>,
    /// Stiffness copy with constrained rows/columns eliminated
    pub stiffness_bc: DMatrix<f64>,
    /// Load vector (forces at +0..2, moments at +3..5 per node)
    pub forces: DVector<f64>,
    /// Displacement estimate / solution vector
    pub displacements: DVector<f64>,
}

impl EquationSet {
    /// Number of scalar equations (6 per node)
    pub fn dof_count(&self) -> usize {
        self.forces.len()
    }
}

/// Assemble the global equation set for `frame`.
///
/// Precondition violations (out-of-range node indices, zero-length elements)
/// abort with an error identifying the offending item. Unsupported boundary
/// conditions are skipped and reported in the returned warning list.
pub fn assemble(frame: &Frame) -> Result<(EquationSet, Vec<ModelWarning>)> {
    let node_count = frame.nodes.len();
    let dofs = 6 * node_count;

    let mut stiffness = DMatrix::zeros(dofs, dofs);

    for (index, element) in frame.elements.iter().enumerate() {
        for node in [element.node1, element.node2] {
            if node >= node_count {
                return Err(SolverError::NodeOutOfRange {
                    element: index,
                    node,
                    node_count,
                });
            }
        }

        let p1 = Vector3::from_column_slice(&frame.nodes[element.node1].position);
        let p2 = Vector3::from_column_slice(&frame.nodes[element.node2].position);
        let blocks = stiffness_blocks(index, element, &p1, &p2)?;

        add_block(&mut stiffness, &blocks.k11, element.node1, element.node1);
        add_block(&mut stiffness, &blocks.k12, element.node1, element.node2);
        add_block(&mut stiffness, &blocks.k21, element.node2, element.node1);
        add_block(&mut stiffness, &blocks.k22, element.node2, element.node2);
    }

    let mut eqset = EquationSet {
        stiffness_bc: stiffness.clone(),
        stiffness,
        forces: DVector::zeros(dofs),
        displacements: DVector::zeros(dofs),
    };

    let warnings = apply_boundary_conditions(frame, &mut eqset)?;

    Ok((eqset, warnings))
}

/// Add one 6×6 element block into the global matrix at the block offsets of
/// nodes `row_node` / `col_node`. Contributions accumulate.
fn add_block(global: &mut DMatrix<f64>, block: &Matrix6, row_node: usize, col_node: usize) {
    let row0 = 6 * row_node;
    let col0 = 6 * col_node;
    for j in 0..6 {
        for i in 0..6 {
            global[(row0 + i, col0 + j)] += block[(i, j)];
        }
    }
}

fn apply_boundary_conditions(frame: &Frame, eqset: &mut EquationSet) -> Result<Vec<ModelWarning>> {
    let node_count = frame.nodes.len();
    let mut warnings = Vec::new();

    for (bc_index, bc) in frame.boundary_conditions.iter().enumerate() {
        if bc.node >= node_count {
            return Err(SolverError::BoundaryNodeOutOfRange {
                index: bc_index,
                node: bc.node,
                node_count,
            });
        }

        let base = 6 * bc.node;
        match bc.kind {
            // Loads overwrite the three components at their DOF offsets.
            // Duplicate Force/Moment conditions on one node override earlier
            // ones rather than summing.
            BoundaryKind::Force => {
                for axis in 0..3 {
                    eqset.forces[base + axis] = bc.value[axis];
                }
            }
            BoundaryKind::Moment => {
                for axis in 0..3 {
                    eqset.forces[base + 3 + axis] = bc.value[axis];
                }
            }
            // Only homogeneous constraints are supported; a non-zero value
            // cannot be applied by plain row/column elimination
            BoundaryKind::Displacement | BoundaryKind::Rotation => {
                if bc.value != [0.0; 3] {
                    let warning = ModelWarning::NonHomogeneousConstraint {
                        bc_index,
                        node: bc.node,
                        kind: bc.kind,
                        value: bc.value,
                    };
                    eprintln!("Warning: {warning}");
                    warnings.push(warning);
                    continue;
                }

                let offset = if bc.kind == BoundaryKind::Displacement { 0 } else { 3 };
                for axis in 0..3 {
                    eliminate_dof(eqset, base + offset + axis, 0.0);
                }
            }
            BoundaryKind::Joint => {
                // Code 0 is the fixed-joint default and needs no equation
                // changes; anything else is unimplemented
                let code = bc.value[0] as i32;
                if code != 0 {
                    let warning = ModelWarning::UnhandledJointCode {
                        bc_index,
                        node: bc.node,
                        code,
                    };
                    eprintln!("Warning: {warning}");
                    warnings.push(warning);
                }
            }
        }
    }

    Ok(warnings)
}

/// Dirichlet elimination of one DOF: zero its row and column in the
/// constrained matrix, set the diagonal to 1, and fix the load entry to the
/// prescribed value so relaxation converges the DOF to it.
fn eliminate_dof(eqset: &mut EquationSet, dof: usize, prescribed: f64) {
    let n = eqset.stiffness_bc.nrows();
    for i in 0..n {
        eqset.stiffness_bc[(dof, i)] = 0.0;
        eqset.stiffness_bc[(i, dof)] = 0.0;
    }
    eqset.stiffness_bc[(dof, dof)] = 1.0;
    eqset.forces[dof] = prescribed;
    eqset.displacements[dof] = prescribed;
}

/// Back-substitute solved displacements into per-node results.
///
/// Computes `f = K · u` with the unconstrained stiffness matrix and writes
/// force, moment, displacement, and rotation vectors into each node.
pub fn update_results(frame: &mut Frame, eqset: &EquationSet) {
    let forces = &eqset.stiffness * &eqset.displacements;

    for (index, node) in frame.nodes.iter_mut().enumerate() {
        let base = 6 * index;
        for axis in 0..3 {
            node.force[axis] = forces[base + axis];
            node.moment[axis] = forces[base + 3 + axis];
            node.displacement[axis] = eqset.displacements[base + axis];
            node.rotation[axis] = eqset.displacements[base + 3 + axis];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framix_model::{BoundaryCondition, Element, Node};

    fn cantilever() -> Frame {
        let mut frame = Frame::new();
        frame.nodes.push(Node::new(0.0, 0.0, 0.0));
        frame.nodes.push(Node::new(1.0, 0.0, 0.0));
        frame.elements.push(Element::new(0, 1, 200.0, 80.0, 1.0));
        frame
            .boundary_conditions
            .push(BoundaryCondition::new(0, BoundaryKind::Displacement, [0.0; 3]));
        frame
            .boundary_conditions
            .push(BoundaryCondition::new(0, BoundaryKind::Rotation, [0.0; 3]));
        frame
            .boundary_conditions
            .push(BoundaryCondition::new(1, BoundaryKind::Force, [700.0, 0.0, 0.0]));
        frame
    }

    #[test]
    fn assembles_expected_dimensions() {
        let (eqset, warnings) = assemble(&cantilever()).unwrap();
        assert_eq!(eqset.dof_count(), 12);
        assert_eq!(eqset.stiffness.nrows(), 12);
        assert_eq!(eqset.stiffness_bc.ncols(), 12);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unconstrained_matrix_is_symmetric() {
        let (eqset, _) = assemble(&Frame::sample()).unwrap();
        let n = eqset.dof_count();
        let scale = eqset.stiffness.abs().max();
        for i in 0..n {
            for j in 0..n {
                assert!(
                    (eqset.stiffness[(i, j)] - eqset.stiffness[(j, i)]).abs() <= scale * 1e-12,
                    "not symmetric at ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn shared_node_accumulates_contributions() {
        // Two colinear elements meeting at node 1: the axial diagonal at the
        // shared node must be the sum of both EA/L terms
        let mut frame = Frame::new();
        frame.nodes.push(Node::new(0.0, 0.0, 0.0));
        frame.nodes.push(Node::new(1.0, 0.0, 0.0));
        frame.nodes.push(Node::new(2.0, 0.0, 0.0));
        frame.elements.push(Element::new(0, 1, 200.0, 80.0, 1.0));
        frame.elements.push(Element::new(1, 2, 200.0, 80.0, 1.0));

        let (eqset, _) = assemble(&frame).unwrap();
        let axial = 200.0 * std::f64::consts::PI;
        let shared = eqset.stiffness[(6, 6)];
        assert!((shared - 2.0 * axial).abs() / axial < 1e-10);
    }

    #[test]
    fn dirichlet_rows_have_unit_diagonal() {
        let (eqset, _) = assemble(&cantilever()).unwrap();

        // Node 0 is fully constrained: DOFs 0..6
        for dof in 0..6 {
            for i in 0..12 {
                let expected = if i == dof { 1.0 } else { 0.0 };
                assert_eq!(eqset.stiffness_bc[(dof, i)], expected);
                assert_eq!(eqset.stiffness_bc[(i, dof)], expected);
            }
        }

        // Unconstrained matrix must be untouched by elimination
        assert!(eqset.stiffness[(0, 0)] != 1.0);
    }

    #[test]
    fn force_bc_overwrites_rather_than_sums() {
        let mut frame = cantilever();
        frame
            .boundary_conditions
            .push(BoundaryCondition::new(1, BoundaryKind::Force, [100.0, 0.0, 0.0]));

        let (eqset, _) = assemble(&frame).unwrap();
        assert_eq!(eqset.forces[6], 100.0);
    }

    #[test]
    fn moment_bc_lands_in_rotation_slots() {
        let mut frame = cantilever();
        frame
            .boundary_conditions
            .push(BoundaryCondition::new(1, BoundaryKind::Moment, [0.0, 5.0, 0.0]));

        let (eqset, _) = assemble(&frame).unwrap();
        assert_eq!(eqset.forces[10], 5.0);
    }

    #[test]
    fn non_homogeneous_constraint_is_skipped_with_warning() {
        let mut frame = cantilever();
        frame
            .boundary_conditions
            .push(BoundaryCondition::new(1, BoundaryKind::Displacement, [0.1, 0.0, 0.0]));

        let (eqset, warnings) = assemble(&frame).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            ModelWarning::NonHomogeneousConstraint { bc_index: 3, node: 1, .. }
        ));

        // Node 1 DOFs must not have been eliminated
        assert!(eqset.stiffness_bc[(6, 6)] != 1.0);
    }

    #[test]
    fn joint_code_zero_is_noop_other_codes_warn() {
        let mut frame = cantilever();
        frame
            .boundary_conditions
            .push(BoundaryCondition::new(1, BoundaryKind::Joint, [0.0; 3]));
        let (_, warnings) = assemble(&frame).unwrap();
        assert!(warnings.is_empty());

        frame
            .boundary_conditions
            .push(BoundaryCondition::new(1, BoundaryKind::Joint, [2.0, 0.0, 0.0]));
        let (_, warnings) = assemble(&frame).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ModelWarning::UnhandledJointCode { code: 2, .. }));
    }

    #[test]
    fn rejects_out_of_range_element_node() {
        let mut frame = cantilever();
        frame.elements.push(Element::new(0, 9, 200.0, 80.0, 1.0));
        let err = assemble(&frame).unwrap_err();
        assert!(matches!(err, SolverError::NodeOutOfRange { element: 1, node: 9, .. }));
    }

    #[test]
    fn rejects_zero_length_element() {
        let mut frame = cantilever();
        frame.nodes.push(Node::new(1.0, 0.0, 0.0));
        frame.elements.push(Element::new(1, 2, 200.0, 80.0, 1.0));
        let err = assemble(&frame).unwrap_err();
        assert!(matches!(err, SolverError::DegenerateElement { element: 1, .. }));
    }

    #[test]
    fn update_results_populates_nodes() {
        let mut frame = cantilever();
        let (mut eqset, _) = assemble(&frame).unwrap();

        // Fake a solved state: unit axial displacement at node 1
        eqset.displacements[6] = 1.0;
        update_results(&mut frame, &eqset);

        assert_eq!(frame.nodes[1].displacement, [1.0, 0.0, 0.0]);
        let axial = 200.0 * std::f64::consts::PI;
        assert!((frame.nodes[1].force[0] - axial).abs() / axial < 1e-10);
        assert!((frame.nodes[0].force[0] + axial).abs() / axial < 1e-10);
    }
}
