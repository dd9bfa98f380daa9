//! Distributed solve: explicit process topology, message transport, and the
//! chunked relaxation protocol.

mod channel;
mod context;
mod coordinator;

pub use channel::{ChannelCommunicator, Communicator, Message, MessageTag};
pub use context::DistributedContext;
pub use coordinator::{DistributedSolver, EquationChunk, WorkerPhase};
