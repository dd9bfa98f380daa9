//! Error and warning types for the solver.
//!
//! Errors abort the current phase (assembly preconditions, invalid solver
//! parameters, broken distributed coordination). Warnings describe items that
//! were skipped or relaxed while processing continued; callers receive them
//! as values so a degraded result is inspectable rather than inferred from
//! logs.

use framix_model::BoundaryKind;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

/// Fatal solver errors
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("element {element}: nodes {node1} and {node2} coincide (zero-length element)")]
    DegenerateElement {
        element: usize,
        node1: usize,
        node2: usize,
    },

    #[error("element {element}: node index {node} out of range ({node_count} nodes)")]
    NodeOutOfRange {
        element: usize,
        node: usize,
        node_count: usize,
    },

    #[error("boundary condition {index}: node index {node} out of range ({node_count} nodes)")]
    BoundaryNodeOutOfRange {
        index: usize,
        node: usize,
        node_count: usize,
    },

    #[error("relaxation factor {omega} outside (0, 2): convergence is not defined")]
    InvalidRelaxationFactor { omega: f64 },

    #[error("residual buffer holds {len} entries but {iterations} iterations were requested")]
    ResidualBufferTooShort { len: usize, iterations: usize },

    #[error("no available color for node {node} with {num_colors} colors (adjacency is inconsistent)")]
    ColoringExhausted { node: usize, num_colors: u32 },

    #[error("system of {rows} rows cannot be partitioned across {procs} processes")]
    InvalidPartition { rows: usize, procs: usize },

    #[error("distributed solve failed: {0}")]
    Distributed(String),
}

/// Non-fatal conditions: the offending item was skipped or the result may
/// converge poorly, but the solve proceeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ModelWarning {
    /// A Displacement/Rotation BC carried a non-zero value; only homogeneous
    /// constraints are supported, so the BC was skipped.
    NonHomogeneousConstraint {
        bc_index: usize,
        node: usize,
        kind: BoundaryKind,
        value: [f64; 3],
    },
    /// A Joint BC carried a code other than the fixed-joint default
    UnhandledJointCode { bc_index: usize, node: usize, code: i32 },
    /// A node's adjacency slots overflowed; the extra edge was dropped
    AdjacencyOverflow { node: usize, neighbor: usize },
    /// The constrained stiffness matrix is not diagonally dominant, so
    /// Jacobi-family convergence is not guaranteed
    NotDiagonallyDominant,
}

impl std::fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelWarning::NonHomogeneousConstraint {
                bc_index,
                node,
                kind,
                value,
            } => write!(
                f,
                "boundary condition {bc_index}: non-zero {kind:?} constraint {value:?} on node {node} is unsupported, skipped"
            ),
            ModelWarning::UnhandledJointCode { bc_index, node, code } => write!(
                f,
                "boundary condition {bc_index}: unhandled joint code {code} on node {node}, skipped"
            ),
            ModelWarning::AdjacencyOverflow { node, neighbor } => write!(
                f,
                "adjacency list for node {node} is full, dropped edge to node {neighbor}"
            ),
            ModelWarning::NotDiagonallyDominant => {
                write!(f, "stiffness matrix is not diagonally dominant, convergence not guaranteed")
            }
        }
    }
}
