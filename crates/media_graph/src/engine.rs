//! Media engine abstraction
//!
//! Defines the trait the orchestrator needs from the external processing
//! engine, supporting a real backend and mock testing through one interface.

use std::collections::HashMap;
use std::future::Future;

use contracts::{EngineEvent, LinkId, NodeId, NodeKind, NodeState, PortId};
use tokio::sync::mpsc;

use crate::error::Result;

/// Media engine trait
///
/// Abstracts the engine's control surface: typed node creation, port
/// linking, state control, atomic input selection and asynchronous status
/// delivery. Control calls are synchronous from the caller's perspective and
/// may block briefly on internal engine state changes; none of them are
/// cancellable once issued.
pub trait MediaEngine: Send + Sync {
    /// Instantiate a typed processing node
    ///
    /// # Arguments
    /// * `kind` - Node type
    /// * `name` - Unique human-readable name (used in logs and errors)
    /// * `attrs` - Engine-specific attributes (caps, uri, bitrate, ...)
    fn create_node(
        &self,
        kind: NodeKind,
        name: &str,
        attrs: &HashMap<String, String>,
    ) -> impl Future<Output = Result<NodeId>> + Send;

    /// Destroy a node and everything linked to it
    ///
    /// Idempotent operation: returns Ok if the node doesn't exist
    fn remove_node(&self, node: NodeId) -> impl Future<Output = Result<()>> + Send;

    /// Check if a node exists
    fn node_exists(&self, node: NodeId) -> impl Future<Output = Result<bool>> + Send;

    /// Request a new input port on a multiplexing node (Selector)
    fn request_input_port(&self, node: NodeId) -> impl Future<Output = Result<PortId>> + Send;

    /// Request a new output port on a replicating node (FanOut)
    fn request_output_port(&self, node: NodeId) -> impl Future<Output = Result<PortId>> + Send;

    /// Link two nodes through their static ports
    fn link(&self, src: NodeId, dst: NodeId) -> impl Future<Output = Result<LinkId>> + Send;

    /// Link a specific output port (discovered or requested) to a node's
    /// static input
    fn link_from_port(
        &self,
        src: NodeId,
        src_port: PortId,
        dst: NodeId,
    ) -> impl Future<Output = Result<LinkId>> + Send;

    /// Link a node's static output to a specific requested input port
    fn link_to_port(
        &self,
        src: NodeId,
        dst: NodeId,
        dst_port: PortId,
    ) -> impl Future<Output = Result<LinkId>> + Send;

    /// Remove a link
    ///
    /// Idempotent operation: returns Ok if the link doesn't exist
    fn unlink(&self, link: LinkId) -> impl Future<Output = Result<()>> + Send;

    /// Force a single node to idle or running
    fn set_node_state(
        &self,
        node: NodeId,
        state: NodeState,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Atomically switch the selected input of a multiplexing node
    ///
    /// Downstream consumers observe no frame duplication and no gap wider
    /// than one frame boundary.
    fn select_input(
        &self,
        selector: NodeId,
        port: PortId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Start running the whole graph
    fn start(&self) -> impl Future<Output = Result<()>> + Send;

    /// Stop the whole graph, forcing every node to idle
    ///
    /// Idempotent; safe to call from the shutdown path more than once.
    fn stop(&self) -> impl Future<Output = Result<()>> + Send;

    /// Take the engine's status event subscription
    ///
    /// There is exactly one subscription per engine; subsequent calls return
    /// None. Events are delivered in emission order.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<EngineEvent>>;
}
