//! Message transport between solve participants.
//!
//! The wire contract is a flat float buffer tagged by purpose; there is no
//! schema or versioning. [`Communicator`] abstracts the transport so the
//! coordinator logic stays independent of how processes are connected; the
//! in-process [`ChannelCommunicator`] realizes it as a full mesh of mpsc
//! channels, one endpoint per rank, with each endpoint running on its own
//! thread.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::{Result, SolverError};

/// Purpose tag of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    /// Size handshake: total row count of the system
    RowCount,
    /// A rank's stiffness rows, flattened row-major
    StiffnessChunk,
    /// A rank's slice of the force vector
    ForceChunk,
    /// A rank's updated displacement slice, gathered by the coordinator
    DisplacementChunk,
    /// The merged full displacement vector, broadcast by the coordinator
    DisplacementFull,
    /// Barrier round-trip marker, no payload
    Barrier,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub tag: MessageTag,
    pub from: usize,
    pub data: Vec<f64>,
}

/// Point-to-point transport between ranks of one solve group.
///
/// `recv` is selective: it returns the next message matching both sender and
/// tag, holding earlier-arrived non-matching messages until they are asked
/// for. A disconnected peer is a fatal coordination failure.
pub trait Communicator {
    fn send(&self, to: usize, message: Message) -> Result<()>;
    fn recv(&mut self, from: usize, tag: MessageTag) -> Result<Message>;
}

/// mpsc-mesh endpoint for one rank
pub struct ChannelCommunicator {
    rank: usize,
    peers: Vec<Sender<Message>>,
    incoming: Receiver<Message>,
    /// Messages received while waiting for a different (sender, tag) pair
    held: Vec<Message>,
}

impl ChannelCommunicator {
    /// Build a fully connected mesh of `procs` endpoints. Endpoint `r` is
    /// moved to the thread acting as rank `r`.
    pub fn mesh(procs: usize) -> Vec<ChannelCommunicator> {
        let mut senders = Vec::with_capacity(procs);
        let mut receivers = Vec::with_capacity(procs);
        for _ in 0..procs {
            let (sender, receiver) = channel();
            senders.push(sender);
            receivers.push(receiver);
        }

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, incoming)| ChannelCommunicator {
                rank,
                peers: senders.clone(),
                incoming,
                held: Vec::new(),
            })
            .collect()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl Communicator for ChannelCommunicator {
    fn send(&self, to: usize, message: Message) -> Result<()> {
        let sender = self.peers.get(to).ok_or_else(|| {
            SolverError::Distributed(format!("rank {} addressed unknown rank {to}", self.rank))
        })?;
        sender.send(message).map_err(|_| {
            SolverError::Distributed(format!("rank {to} is gone, send from rank {} failed", self.rank))
        })
    }

    fn recv(&mut self, from: usize, tag: MessageTag) -> Result<Message> {
        if let Some(position) = self
            .held
            .iter()
            .position(|m| m.from == from && m.tag == tag)
        {
            return Ok(self.held.remove(position));
        }

        loop {
            let message = self.incoming.recv().map_err(|_| {
                SolverError::Distributed(format!(
                    "rank {} waiting for {tag:?} from rank {from}: all peers disconnected",
                    self.rank
                ))
            })?;
            if message.from == from && message.tag == tag {
                return Ok(message);
            }
            self.held.push(message);
        }
    }
}
