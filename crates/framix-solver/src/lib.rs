//! Static finite element solver for 3D frame structures.
//!
//! The solve pipeline: beam element stiffness blocks are assembled into a
//! dense global system, boundary conditions are eliminated into a copy of
//! the matrix, the node graph is multicolored for conflict-free parallel
//! updates, and the system is relaxed with Jacobi, Gauss-Seidel, or SOR —
//! either in-process or chunked across a process group that synchronizes
//! once per iteration.

pub mod analysis;
pub mod assembly;
pub mod coloring;
pub mod distributed;
pub mod elements;
pub mod error;
pub mod relaxation;
pub mod transform;

pub use analysis::{
    AnalysisConfig, AnalysisResults, EquationSolver, LocalSolver, SolveMethod, StaticAnalysis,
};
pub use assembly::{assemble, update_results, EquationSet};
pub use coloring::{
    assign_colors, color_permutation, reorder_equations, restore_equations, ColoringReport,
    MAX_NEIGHBORS,
};
pub use distributed::{
    ChannelCommunicator, Communicator, DistributedContext, DistributedSolver, EquationChunk,
    Message, MessageTag, WorkerPhase,
};
pub use elements::{stiffness_blocks, BeamSection, StiffnessBlocks};
pub use error::{ModelWarning, Result, SolverError};
pub use relaxation::{
    diagonally_dominant, initial_guess, residual_norm, solve_gauss_seidel, solve_jacobi,
    solve_jacobi_parallel, solve_sor,
};
pub use transform::{expand_rotation, local_basis, rotate_block, Matrix6};
