//! Asynchronous status events delivered by the Engine.
//!
//! Every event carries the identity of the originating node; the monitor
//! attributes errors strictly by that identity.

use crate::{NodeId, NodeState, PortId, StreamInfo};

/// Status event emitted by the Engine's internal workers.
///
/// Delivered through a single subscription channel and dispatched on the
/// event-loop task; handlers never run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Error raised by a node's processing
    Error { node: NodeId, message: String },

    /// End-of-stream reached somewhere in the graph
    EndOfStream { node: NodeId },

    /// A node attained or left the running state
    StateChanged { node: NodeId, state: NodeState },

    /// The node discovered a new output port after negotiation
    PortAdded {
        node: NodeId,
        port: PortId,
        stream: StreamInfo,
    },
}
