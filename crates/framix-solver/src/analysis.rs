//! Static analysis pipeline.
//!
//! Chains the solve phases in order: color the node graph, assemble the
//! global equations, optionally reorder them by color, relax with the chosen
//! solver, and back-substitute nodal results. Warnings gathered along the way
//! are part of the returned results so callers can tell a clean solve from a
//! degraded one without reading logs.

use serde::Serialize;

use framix_model::Frame;

use crate::assembly::{assemble, update_results, EquationSet};
use crate::coloring::{assign_colors, color_permutation, reorder_equations, restore_equations};
use crate::distributed::DistributedSolver;
use crate::error::{ModelWarning, Result, SolverError};
use crate::relaxation::{
    diagonally_dominant, initial_guess, solve_gauss_seidel, solve_jacobi, solve_jacobi_parallel,
    solve_sor,
};

/// One solve strategy over an assembled equation set. Lets the pipeline pick
/// between in-process and distributed execution without caring which.
pub trait EquationSolver {
    fn name(&self) -> &'static str;

    /// Relax `eqset.displacements` in place for a fixed iteration count
    fn solve(
        &self,
        eqset: &mut EquationSet,
        iterations: usize,
        residuals: Option<&mut [f64]>,
    ) -> Result<()>;
}

/// Relaxation strategy for the solve phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveMethod {
    /// Two-buffer Jacobi on one thread
    Jacobi,
    /// Jacobi with row updates on the rayon pool
    ParallelJacobi,
    /// In-place Gauss-Seidel
    GaussSeidel,
    /// Successive over-relaxation with the given factor
    Sor { omega: f64 },
    /// Chunked Jacobi across a process group of the given size
    Distributed { procs: usize },
}

impl SolveMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SolveMethod::Jacobi => "jacobi",
            SolveMethod::ParallelJacobi => "parallel-jacobi",
            SolveMethod::GaussSeidel => "gauss-seidel",
            SolveMethod::Sor { .. } => "sor",
            SolveMethod::Distributed { .. } => "distributed",
        }
    }

    /// The solver realizing this method
    pub fn solver(&self) -> Box<dyn EquationSolver> {
        match *self {
            SolveMethod::Distributed { procs } => Box::new(DistributedSolver::new(procs)),
            method => Box::new(LocalSolver { method }),
        }
    }
}

/// In-process relaxation over the full equation set
#[derive(Debug, Clone, Copy)]
pub struct LocalSolver {
    pub method: SolveMethod,
}

impl EquationSolver for LocalSolver {
    fn name(&self) -> &'static str {
        self.method.name()
    }

    fn solve(
        &self,
        eqset: &mut EquationSet,
        iterations: usize,
        residuals: Option<&mut [f64]>,
    ) -> Result<()> {
        let (a, b, x) = (&eqset.stiffness_bc, &eqset.forces, &mut eqset.displacements);
        match self.method {
            SolveMethod::Jacobi => solve_jacobi(a, b, x, iterations, residuals),
            SolveMethod::ParallelJacobi => solve_jacobi_parallel(a, b, x, iterations, residuals),
            SolveMethod::GaussSeidel => solve_gauss_seidel(a, b, x, iterations, residuals),
            SolveMethod::Sor { omega } => solve_sor(a, b, x, iterations, omega, residuals),
            SolveMethod::Distributed { .. } => Err(SolverError::Distributed(
                "distributed method requires the distributed solver".to_string(),
            )),
        }
    }
}

impl EquationSolver for DistributedSolver {
    fn name(&self) -> &'static str {
        "distributed"
    }

    fn solve(
        &self,
        eqset: &mut EquationSet,
        iterations: usize,
        residuals: Option<&mut [f64]>,
    ) -> Result<()> {
        DistributedSolver::solve(self, eqset, iterations, residuals)
    }
}

/// Analysis configuration and control
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub method: SolveMethod,
    /// Fixed relaxation iteration count; there is no early exit
    pub iterations: usize,
    /// Group same-colored equation rows contiguously before solving
    pub reorder_by_color: bool,
    /// Record one residual norm per iteration
    pub record_residuals: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            method: SolveMethod::Jacobi,
            iterations: 500,
            reorder_by_color: false,
            record_residuals: true,
        }
    }
}

/// Outcome of one static solve
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResults {
    pub solver: &'static str,
    pub iterations: usize,
    pub num_dofs: usize,
    /// Distinct node colors assigned during preprocessing
    pub num_colors: u32,
    /// Whether Jacobi-family convergence is guaranteed for this system
    pub diagonally_dominant: bool,
    /// Residual norm per iteration, empty unless recording was requested
    pub residuals: Vec<f64>,
    /// Conditions that degraded the solve; empty means fully trustworthy
    pub warnings: Vec<ModelWarning>,
    /// Final displacement vector, 6 values per node
    pub displacements: Vec<f64>,
}

impl AnalysisResults {
    /// True when no feature was skipped or relaxed during the solve
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Linear static analysis of a frame model
pub struct StaticAnalysis {
    config: AnalysisConfig,
}

impl StaticAnalysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn jacobi(iterations: usize) -> Self {
        Self::new(AnalysisConfig {
            method: SolveMethod::Jacobi,
            iterations,
            ..Default::default()
        })
    }

    pub fn gauss_seidel(iterations: usize) -> Self {
        Self::new(AnalysisConfig {
            method: SolveMethod::GaussSeidel,
            iterations,
            ..Default::default()
        })
    }

    pub fn sor(iterations: usize, omega: f64) -> Self {
        Self::new(AnalysisConfig {
            method: SolveMethod::Sor { omega },
            iterations,
            ..Default::default()
        })
    }

    pub fn distributed(iterations: usize, procs: usize) -> Self {
        Self::new(AnalysisConfig {
            method: SolveMethod::Distributed { procs },
            iterations,
            reorder_by_color: true,
            ..Default::default()
        })
    }

    /// Run the full pipeline, writing solved displacements, rotations,
    /// forces, and moments back into the frame's nodes.
    pub fn run(&self, frame: &mut Frame) -> Result<AnalysisResults> {
        let coloring = assign_colors(frame)?;
        let (mut eqset, mut warnings) = assemble(frame)?;
        warnings.extend(coloring.warnings);

        let dominant = diagonally_dominant(&eqset.stiffness_bc);
        if !dominant {
            let warning = ModelWarning::NotDiagonallyDominant;
            eprintln!("Warning: {warning}");
            warnings.push(warning);
        }

        let permutation = if self.config.reorder_by_color {
            let permutation = color_permutation(frame);
            reorder_equations(&mut eqset, &permutation);
            Some(permutation)
        } else {
            None
        };

        eqset.displacements = initial_guess(&eqset.stiffness_bc, &eqset.forces);

        let iterations = self.config.iterations;
        let mut residuals = if self.config.record_residuals {
            vec![0.0; iterations]
        } else {
            Vec::new()
        };
        let residual_buffer = if self.config.record_residuals {
            Some(residuals.as_mut_slice())
        } else {
            None
        };

        let solver = self.config.method.solver();
        solver.solve(&mut eqset, iterations, residual_buffer)?;

        if let Some(permutation) = permutation {
            restore_equations(&mut eqset, &permutation);
        }

        update_results(frame, &eqset);

        Ok(AnalysisResults {
            solver: self.config.method.name(),
            iterations,
            num_dofs: eqset.dof_count(),
            num_colors: coloring.num_colors,
            diagonally_dominant: dominant,
            residuals,
            warnings,
            displacements: eqset.displacements.as_slice().to_vec(),
        })
    }
}
