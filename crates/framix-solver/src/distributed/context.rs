//! Process topology for one distributed solve.
//!
//! Rank and process count are carried explicitly in a context value handed to
//! every distributed call; nothing reads them from ambient global state. The
//! topology is fixed for the duration of one solve.

use std::ops::Range;

use crate::error::{Result, SolverError};

/// One participant's view of the process group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributedContext {
    rank: usize,
    procs: usize,
    root: usize,
}

impl DistributedContext {
    /// Context for process `rank` in a group of `procs`, with rank 0
    /// coordinating
    pub fn new(rank: usize, procs: usize) -> Result<Self> {
        if procs == 0 || rank >= procs {
            return Err(SolverError::Distributed(format!(
                "rank {rank} invalid for a group of {procs} processes"
            )));
        }
        Ok(Self {
            rank,
            procs,
            root: 0,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn procs(&self) -> usize {
        self.procs
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn is_root(&self) -> bool {
        self.rank == self.root
    }

    /// Rows per chunk for an `n`-row system: ⌈n / procs⌉
    pub fn chunk_rows(&self, n: usize) -> usize {
        n.div_ceil(self.procs)
    }

    /// Contiguous row range owned by `rank`. The last chunk may be shorter;
    /// every row belongs to exactly one rank.
    pub fn chunk_range(&self, rank: usize, n: usize) -> Range<usize> {
        let chunk = self.chunk_rows(n);
        let start = (rank * chunk).min(n);
        let end = (start + chunk).min(n);
        start..end
    }
}
