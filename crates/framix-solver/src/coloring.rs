//! Multicolor ordering of frame nodes.
//!
//! Builds a bounded-degree adjacency list from element connectivity and
//! greedily colors nodes so that no element connects two same-colored nodes.
//! Same-color nodes have no direct stiffness coupling, so their equation rows
//! can be updated concurrently while neighbor values stay read-only.
//!
//! Color `0` means "unassigned"; assigned colors are in `[1, max_degree + 1]`.

use framix_model::Frame;
use nalgebra::{DMatrix, DVector};

use crate::assembly::EquationSet;
use crate::error::{ModelWarning, Result, SolverError};

/// Maximum recorded neighbors per node. Frame joints rarely connect more
/// than a handful of beams; edges beyond this are dropped with a warning.
pub const MAX_NEIGHBORS: usize = 8;

/// Outcome of a coloring pass
#[derive(Debug, Clone)]
pub struct ColoringReport {
    /// Largest recorded node degree
    pub max_degree: usize,
    /// Number of distinct colors assigned
    pub num_colors: u32,
    pub warnings: Vec<ModelWarning>,
}

/// Fixed-capacity neighbor list for one node
#[derive(Debug, Clone, Copy)]
struct Neighbors {
    slots: [usize; MAX_NEIGHBORS],
    len: usize,
}

impl Neighbors {
    fn new() -> Self {
        Self {
            slots: [0; MAX_NEIGHBORS],
            len: 0,
        }
    }

    fn contains(&self, node: usize) -> bool {
        self.slots[..self.len].contains(&node)
    }

    /// Record `node` as a neighbor; false once the slots are full
    fn push(&mut self, node: usize) -> bool {
        if self.len == MAX_NEIGHBORS {
            return false;
        }
        self.slots[self.len] = node;
        self.len += 1;
        true
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots[..self.len].iter().copied()
    }
}

/// Assign a color to every node of `frame` such that no element connects two
/// same-colored nodes.
///
/// Node indices must already be validated against the node count. Edges that
/// overflow a node's neighbor slots are dropped and reported; the affected
/// nodes may then share a color with the dropped neighbor.
pub fn assign_colors(frame: &mut Frame) -> Result<ColoringReport> {
    let node_count = frame.nodes.len();
    let mut adjacency = vec![Neighbors::new(); node_count];
    let mut warnings = Vec::new();

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

        for (node, neighbor) in [
            (element.node1, element.node2),
            (element.node2, element.node1),
        ] {
            if adjacency[node].contains(neighbor) {
                continue;
            }
            if !adjacency[node].push(neighbor) {
                let warning = ModelWarning::AdjacencyOverflow { node, neighbor };
                eprintln!("Warning: {warning}");
                warnings.push(warning);
            }
        }
    }

    let max_degree = adjacency.iter().map(|n| n.len).max().unwrap_or(0);
    let num_colors = (max_degree + 1) as u32;

    for node in &mut frame.nodes {
        node.color = 0;
    }

    for index in 0..node_count {
        let mut assigned = 0;
        'palette: for candidate in 1..=num_colors {
            for neighbor in adjacency[index].iter() {
                if frame.nodes[neighbor].color == candidate {
                    continue 'palette;
                }
            }
            assigned = candidate;
            break;
        }

        // max_degree + 1 colors always suffice for a graph of that degree,
        // so exhaustion means the adjacency itself is inconsistent
        if assigned == 0 {
            return Err(SolverError::ColoringExhausted {
                node: index,
                num_colors,
            });
        }
        frame.nodes[index].color = assigned;
    }

    let used = frame.nodes.iter().map(|n| n.color).max().unwrap_or(0);

    Ok(ColoringReport {
        max_degree,
        num_colors: used,
        warnings,
    })
}

/// Node permutation grouping same-colored nodes contiguously, ordered by
/// ascending color and original index within a color. Entry `i` gives the new
/// position of node `i`.
pub fn color_permutation(frame: &Frame) -> Vec<usize> {
    let mut order: Vec<usize> = (0..frame.nodes.len()).collect();
    order.sort_by_key(|&i| (frame.nodes[i].color, i));

    let mut permutation = vec![0; order.len()];
    for (new_index, &old_index) in order.iter().enumerate() {
        permutation[old_index] = new_index;
    }
    permutation
}

/// Symmetrically permute an equation set by a node permutation: all 6 DOFs of
/// a node move together, and the stiffness matrices are permuted on both rows
/// and columns so the system stays equivalent.
pub fn reorder_equations(eqset: &mut EquationSet, node_permutation: &[usize]) {
    let dof_perm = dof_permutation(node_permutation);
    let n = dof_perm.len();

    eqset.stiffness = permute_matrix(&eqset.stiffness, &dof_perm);
    eqset.stiffness_bc = permute_matrix(&eqset.stiffness_bc, &dof_perm);

    let mut forces = DVector::zeros(n);
    let mut displacements = DVector::zeros(n);
    for i in 0..n {
        forces[dof_perm[i]] = eqset.forces[i];
        displacements[dof_perm[i]] = eqset.displacements[i];
    }
    eqset.forces = forces;
    eqset.displacements = displacements;
}

/// Undo a [`reorder_equations`] call made with the same node permutation
pub fn restore_equations(eqset: &mut EquationSet, node_permutation: &[usize]) {
    let mut inverse = vec![0; node_permutation.len()];
    for (old_index, &new_index) in node_permutation.iter().enumerate() {
        inverse[new_index] = old_index;
    }
    reorder_equations(eqset, &inverse);
}

fn dof_permutation(node_permutation: &[usize]) -> Vec<usize> {
    let mut dof_perm = vec![0; 6 * node_permutation.len()];
    for (old_node, &new_node) in node_permutation.iter().enumerate() {
        for axis in 0..6 {
            dof_perm[6 * old_node + axis] = 6 * new_node + axis;
        }
    }
    dof_perm
}

fn permute_matrix(matrix: &DMatrix<f64>, dof_perm: &[usize]) -> DMatrix<f64> {
    let n = dof_perm.len();
    let mut permuted = DMatrix::zeros(n, n);
    for j in 0..n {
        for i in 0..n {
            permuted[(dof_perm[i], dof_perm[j])] = matrix[(i, j)];
        }
    }
    permuted
}
