//! Element formulations.
//!
//! Frame models use 2-node 3D beam elements with 6 DOFs per node
//! (3 translations + 3 rotations).

pub mod beam;

pub use beam::{stiffness_blocks, BeamSection, StiffnessBlocks};
