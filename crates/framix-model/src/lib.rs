//! Core data model for 3D frame structures.
//!
//! A [`Frame`] is the aggregate unit of a structural model: nodes positioned
//! in 3D space, beam elements connecting pairs of nodes, and boundary
//! conditions fixing loads or displacements at nodes. Frames are constructed
//! by an importer (or [`Frame::sample`]), consumed by the equation assembler,
//! and mutated only when solved results are written back into the nodes.

use serde::{Deserialize, Serialize};

/// A point in the frame where elements connect.
///
/// The position is fixed at model-load time. The solved fields (force,
/// moment, displacement, rotation) start at zero and are populated by the
/// result back-substitution step after a solve. `color` is assigned by the
/// graph colorer; 0 means unassigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Position in 3D space
    pub position: [f64; 3],
    /// Net force at the node (solved)
    pub force: [f64; 3],
    /// Net moment at the node (solved)
    pub moment: [f64; 3],
    /// Translational displacement (solved)
    pub displacement: [f64; 3],
    /// Rotational displacement (solved)
    pub rotation: [f64; 3],
    /// Multicolor group index assigned by the graph colorer (0 = unassigned)
    pub color: u32,
}

impl Node {
    /// Create a node at the given position with zeroed solution fields
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: [x, y, z],
            force: [0.0; 3],
            moment: [0.0; 3],
            displacement: [0.0; 3],
            rotation: [0.0; 3],
            color: 0,
        }
    }
}

/// A beam element between two nodes.
///
/// Indices refer into the owning frame's node array. The element implicitly
/// defines a local coordinate frame from the two node positions; coincident
/// positions leave that frame undefined and are rejected during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Index of the start node
    pub node1: usize,
    /// Index of the end node
    pub node2: usize,
    /// Elastic modulus E
    pub elastic_modulus: f64,
    /// Shear modulus G
    pub shear_modulus: f64,
    /// Circular cross-section radius
    pub radius: f64,
}

impl Element {
    /// Create an element between two node indices with material properties
    pub fn new(node1: usize, node2: usize, elastic_modulus: f64, shear_modulus: f64, radius: f64) -> Self {
        Self {
            node1,
            node2,
            elastic_modulus,
            shear_modulus,
            radius,
        }
    }
}

/// Which nodal property a boundary condition fixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryKind {
    /// Applied force (written into the load vector)
    Force,
    /// Applied moment (written into the load vector)
    Moment,
    /// Prescribed translational displacement (homogeneous only)
    Displacement,
    /// Prescribed rotation (homogeneous only)
    Rotation,
    /// Joint code (0 = fixed joint, others unhandled)
    Joint,
}

/// A boundary condition applied to one node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCondition {
    /// Index of the node the condition applies to
    pub node: usize,
    /// Which property is fixed
    pub kind: BoundaryKind,
    /// The fixed value (must be zero for Displacement/Rotation kinds)
    pub value: [f64; 3],
}

impl BoundaryCondition {
    /// Create a boundary condition
    pub fn new(node: usize, kind: BoundaryKind, value: [f64; 3]) -> Self {
        Self { node, kind, value }
    }
}

/// A complete structural model: nodes, elements, and boundary conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub nodes: Vec<Node>,
    pub elements: Vec<Element>,
    pub boundary_conditions: Vec<BoundaryCondition>,
}

impl Frame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Total degrees of freedom: 6 per node (3 translations + 3 rotations)
    pub fn dof_count(&self) -> usize {
        6 * self.nodes.len()
    }

    /// Check that every element and boundary condition references a valid
    /// node index. Returns the first offending element index on failure.
    pub fn validate_indices(&self) -> Result<(), String> {
        for (i, element) in self.elements.iter().enumerate() {
            if element.node1 >= self.nodes.len() || element.node2 >= self.nodes.len() {
                return Err(format!(
                    "element {} references node out of range ({} nodes)",
                    i,
                    self.nodes.len()
                ));
            }
        }
        for (i, bc) in self.boundary_conditions.iter().enumerate() {
            if bc.node >= self.nodes.len() {
                return Err(format!(
                    "boundary condition {} references node {} out of range ({} nodes)",
                    i,
                    bc.node,
                    self.nodes.len()
                ));
            }
        }
        Ok(())
    }

    /// Built-in demo frame: three elements meeting at a loaded center node,
    /// outer nodes pinned. Material is 1040 mild steel (annealed).
    pub fn sample() -> Self {
        let elastic_modulus = 200.0; // GPa
        let shear_modulus = 80.0; // GPa
        let radius = 1.0; // meters

        let mut frame = Frame::new();

        frame.nodes.push(Node::new(0.0, 0.0, 0.0));
        frame.nodes.push(Node::new(-1.0, 0.0, 0.0));
        frame.nodes.push(Node::new(0.0, -1.0, 0.0));
        frame.nodes.push(Node::new(1.0, 0.0, 0.0));

        frame.elements.push(Element::new(0, 1, elastic_modulus, shear_modulus, radius));
        frame.elements.push(Element::new(0, 2, elastic_modulus, shear_modulus, radius));
        frame.elements.push(Element::new(0, 3, elastic_modulus, shear_modulus, radius));

        // Applied force at the center node, outer nodes held in position
        frame
            .boundary_conditions
            .push(BoundaryCondition::new(0, BoundaryKind::Force, [700.0, 0.0, 0.0]));
        for node in 1..4 {
            frame
                .boundary_conditions
                .push(BoundaryCondition::new(node, BoundaryKind::Displacement, [0.0; 3]));
        }

        frame
    }
}
