//! Chunked Jacobi relaxation across a process group.
//!
//! The coordinator (rank 0) owns the assembled equation set, scatters
//! row-contiguous chunks of the constrained stiffness matrix and force vector
//! to the workers, and drives the iteration loop. Each iteration: every rank
//! relaxes its own rows against the full previous displacement vector, the
//! coordinator gathers the partial results in rank order, broadcasts the
//! merged vector, and a barrier keeps the group in lockstep. After the fixed
//! iteration count the coordinator writes the final vector back into the
//! equation set.
//!
//! Dense coupling means every rank needs the whole displacement vector even
//! though it owns only a slice of the matrix. Coordination failures are
//! fatal for the whole group; there is no partial recovery.

use nalgebra::{DMatrix, DVector};

use crate::assembly::EquationSet;
use crate::distributed::channel::{ChannelCommunicator, Communicator, Message, MessageTag};
use crate::distributed::context::DistributedContext;
use crate::error::{Result, SolverError};
use crate::relaxation::{check_residual_buffer, residual_norm};

/// Lifecycle of one worker through a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    /// Chunk received, waiting for the iteration loop
    Partitioned,
    /// Relaxing the local row range
    Iterating,
    /// Holding at the end-of-iteration barrier
    Synchronized,
    Finalizing,
}

/// One rank's owned slice of the equation system: a contiguous band of
/// stiffness rows with the matching force entries.
#[derive(Debug, Clone)]
pub struct EquationChunk {
    pub stiffness: DMatrix<f64>,
    pub forces: DVector<f64>,
    pub row_offset: usize,
}

impl EquationChunk {
    pub fn rows(&self) -> usize {
        self.stiffness.nrows()
    }

    pub fn cols(&self) -> usize {
        self.stiffness.ncols()
    }

    /// One Jacobi pass over the chunk's rows against the full previous
    /// vector `x`, returning the updated values for this row range. Rows
    /// with a zero diagonal keep their previous estimate.
    pub fn relax(&self, x: &DVector<f64>) -> Vec<f64> {
        (0..self.rows())
            .map(|local| {
                let global = self.row_offset + local;
                let diag = self.stiffness[(local, global)];
                if diag == 0.0 {
                    return x[global];
                }
                let mut sum = self.forces[local];
                for j in 0..self.cols() {
                    if j != global {
                        sum -= self.stiffness[(local, j)] * x[j];
                    }
                }
                sum / diag
            })
            .collect()
    }
}

/// Jacobi relaxation partitioned across `procs` in-process ranks.
///
/// Rank 0 runs on the calling thread; the remaining ranks run on scoped
/// threads connected by a channel mesh. With one process the protocol
/// degenerates to plain Jacobi and produces identical results.
#[derive(Debug, Clone, Copy)]
pub struct DistributedSolver {
    procs: usize,
}

impl DistributedSolver {
    pub fn new(procs: usize) -> Self {
        Self { procs }
    }

    pub fn procs(&self) -> usize {
        self.procs
    }

    pub fn solve(
        &self,
        eqset: &mut EquationSet,
        iterations: usize,
        residuals: Option<&mut [f64]>,
    ) -> Result<()> {
        let rows = eqset.forces.len();
        if self.procs == 0 || self.procs > rows {
            return Err(SolverError::InvalidPartition {
                rows,
                procs: self.procs,
            });
        }
        check_residual_buffer(&residuals, iterations)?;

        let mut endpoints = ChannelCommunicator::mesh(self.procs);
        let root_endpoint = endpoints.remove(0);
        let procs = self.procs;

        std::thread::scope(|scope| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|endpoint| {
                    scope.spawn(move || {
                        let context = DistributedContext::new(endpoint.rank(), procs)?;
                        run_worker(endpoint, &context, iterations)
                    })
                })
                .collect();

            let context = DistributedContext::new(0, procs)?;
            let root_result = run_root(root_endpoint, &context, eqset, iterations, residuals);

            let mut worker_results = Vec::with_capacity(handles.len());
            for handle in handles {
                worker_results.push(handle.join().map_err(|_| {
                    SolverError::Distributed("worker thread panicked".to_string())
                })?);
            }
            root_result?;
            for result in worker_results {
                result?;
            }
            Ok(())
        })
    }
}

fn extract_chunk(eqset: &EquationSet, context: &DistributedContext, rank: usize) -> EquationChunk {
    let n = eqset.forces.len();
    let range = context.chunk_range(rank, n);
    EquationChunk {
        stiffness: eqset.stiffness_bc.rows(range.start, range.len()).into_owned(),
        forces: eqset.forces.rows(range.start, range.len()).into_owned(),
        row_offset: range.start,
    }
}

fn run_root(
    mut comm: ChannelCommunicator,
    context: &DistributedContext,
    eqset: &mut EquationSet,
    iterations: usize,
    mut residuals: Option<&mut [f64]>,
) -> Result<()> {
    let n = eqset.forces.len();
    let root = context.root();

    // Scatter: size handshake, then each worker's matrix and force rows
    for rank in 1..context.procs() {
        let chunk = extract_chunk(eqset, context, rank);
        comm.send(
            rank,
            Message {
                tag: MessageTag::RowCount,
                from: root,
                data: vec![n as f64],
            },
        )?;
        comm.send(
            rank,
            Message {
                tag: MessageTag::StiffnessChunk,
                from: root,
                data: flatten_rows(&chunk.stiffness),
            },
        )?;
        comm.send(
            rank,
            Message {
                tag: MessageTag::ForceChunk,
                from: root,
                data: chunk.forces.as_slice().to_vec(),
            },
        )?;
    }

    let own_chunk = extract_chunk(eqset, context, root);
    let mut x = eqset.displacements.clone();
    broadcast_displacements(&mut comm, context, &x)?;

    for iteration in 0..iterations {
        if let Some(buffer) = residuals.as_deref_mut() {
            buffer[iteration] = residual_norm(&eqset.stiffness_bc, &eqset.forces, &x);
        }

        let mut merged = x.clone();
        let own_values = own_chunk.relax(&x);
        merged
            .rows_mut(own_chunk.row_offset, own_values.len())
            .copy_from_slice(&own_values);

        // Gather partial chunks in rank order
        for rank in 1..context.procs() {
            let range = context.chunk_range(rank, n);
            let message = comm.recv(rank, MessageTag::DisplacementChunk)?;
            if message.data.len() != range.len() {
                return Err(SolverError::Distributed(format!(
                    "rank {rank} sent {} displacement rows, expected {}",
                    message.data.len(),
                    range.len()
                )));
            }
            merged
                .rows_mut(range.start, range.len())
                .copy_from_slice(&message.data);
        }

        x = merged;
        broadcast_displacements(&mut comm, context, &x)?;
        barrier_root(&mut comm, context)?;
    }

    eqset.displacements = x;
    Ok(())
}

fn run_worker(
    mut comm: ChannelCommunicator,
    context: &DistributedContext,
    iterations: usize,
) -> Result<()> {
    let mut phase = WorkerPhase::Idle;
    let root = context.root();
    let rank = context.rank();

    let result = (|| -> Result<()> {
        let handshake = comm.recv(root, MessageTag::RowCount)?;
        let n = handshake.data.first().copied().unwrap_or(0.0) as usize;
        let range = context.chunk_range(rank, n);

        let stiffness = comm.recv(root, MessageTag::StiffnessChunk)?;
        if stiffness.data.len() != range.len() * n {
            return Err(SolverError::Distributed(format!(
                "stiffness chunk holds {} values, expected {}",
                stiffness.data.len(),
                range.len() * n
            )));
        }
        let forces = comm.recv(root, MessageTag::ForceChunk)?;
        if forces.data.len() != range.len() {
            return Err(SolverError::Distributed(format!(
                "force chunk holds {} values, expected {}",
                forces.data.len(),
                range.len()
            )));
        }

        let chunk = EquationChunk {
            stiffness: DMatrix::from_row_slice(range.len(), n, &stiffness.data),
            forces: DVector::from_column_slice(&forces.data),
            row_offset: range.start,
        };

        let full = comm.recv(root, MessageTag::DisplacementFull)?;
        let mut x = DVector::from_column_slice(&full.data);
        phase = WorkerPhase::Partitioned;

        for _ in 0..iterations {
            phase = WorkerPhase::Iterating;
            let values = chunk.relax(&x);
            comm.send(
                root,
                Message {
                    tag: MessageTag::DisplacementChunk,
                    from: rank,
                    data: values,
                },
            )?;

            let full = comm.recv(root, MessageTag::DisplacementFull)?;
            x = DVector::from_column_slice(&full.data);
            phase = WorkerPhase::Synchronized;
            barrier_worker(&mut comm, context)?;
        }

        phase = WorkerPhase::Finalizing;
        Ok(())
    })();

    result.map_err(|err| {
        SolverError::Distributed(format!("worker {rank} failed while {phase:?}: {err}"))
    })
}

fn broadcast_displacements(
    comm: &mut ChannelCommunicator,
    context: &DistributedContext,
    x: &DVector<f64>,
) -> Result<()> {
    for rank in 1..context.procs() {
        comm.send(
            rank,
            Message {
                tag: MessageTag::DisplacementFull,
                from: context.root(),
                data: x.as_slice().to_vec(),
            },
        )?;
    }
    Ok(())
}

/// Root side of the barrier: collect a marker from every worker, then
/// release them all. No worker passes until every worker has arrived.
fn barrier_root(comm: &mut ChannelCommunicator, context: &DistributedContext) -> Result<()> {
    for rank in 1..context.procs() {
        comm.recv(rank, MessageTag::Barrier)?;
    }
    for rank in 1..context.procs() {
        comm.send(
            rank,
            Message {
                tag: MessageTag::Barrier,
                from: context.root(),
                data: Vec::new(),
            },
        )?;
    }
    Ok(())
}

fn barrier_worker(comm: &mut ChannelCommunicator, context: &DistributedContext) -> Result<()> {
    comm.send(
        context.root(),
        Message {
            tag: MessageTag::Barrier,
            from: context.rank(),
            data: Vec::new(),
        },
    )?;
    comm.recv(context.root(), MessageTag::Barrier)?;
    Ok(())
}

/// Flatten matrix rows into the row-major wire layout
fn flatten_rows(matrix: &DMatrix<f64>) -> Vec<f64> {
    let mut data = Vec::with_capacity(matrix.nrows() * matrix.ncols());
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            data.push(matrix[(i, j)]);
        }
    }
    data
}
