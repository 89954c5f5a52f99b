//! SessionGraph - Graph Builder output
//!
//! Plain topology record for one streaming session: node handles, selector
//! port bookkeeping and the live-lineage set used for error attribution.

use std::collections::HashSet;

use crate::{ActiveInput, LinkId, NodeId, PortId, Profile};

/// Selector port bookkeeping.
///
/// Explicit named fields; the fallback port exists from construction, the
/// live port only while a decode chain is linked.
#[derive(Debug, Clone, Copy)]
pub struct SelectorPorts {
    pub fallback_port: PortId,
    pub live_port: Option<PortId>,
}

/// One packaged quality rendition: the ordered node chain between the
/// fan-out and the Engine's packaging sink.
#[derive(Debug, Clone)]
pub struct ProfileBranch {
    pub profile: Profile,
    /// scale, rate, encoder, packager - in link order
    pub nodes: Vec<NodeId>,
    /// Fan-out output port feeding this branch
    pub fanout_port: PortId,
}

/// The dynamically built live decode sub-chain.
///
/// Created when the live source discovers its video port, destroyed on every
/// disconnect-and-retry cycle.
#[derive(Debug, Clone)]
pub struct DecodeChain {
    /// depacketize, parse, decode, normalize - in link order
    pub nodes: Vec<NodeId>,
    pub links: Vec<LinkId>,
}

/// Runtime topology of one streaming session.
///
/// Static nodes live for the whole session; only the decode chain is
/// rebuilt. Structural mutation happens exclusively on the event-loop task.
#[derive(Debug, Clone)]
pub struct SessionGraph {
    pub live_source: NodeId,
    /// fallback source, normalize - in link order
    pub fallback_nodes: Vec<NodeId>,
    pub selector: NodeId,
    pub fanout: NodeId,
    pub profile_branches: Vec<ProfileBranch>,
    pub selector_ports: SelectorPorts,
    pub active_input: ActiveInput,
    pub decode_chain: Option<DecodeChain>,

    /// Live source plus every decode-chain node ever registered for the
    /// current chain. Errors from these nodes are source errors; everything
    /// else is pipeline-fatal.
    lineage: HashSet<NodeId>,
}

impl SessionGraph {
    pub fn new(
        live_source: NodeId,
        fallback_nodes: Vec<NodeId>,
        selector: NodeId,
        fanout: NodeId,
        profile_branches: Vec<ProfileBranch>,
        fallback_port: PortId,
    ) -> Self {
        let mut lineage = HashSet::new();
        lineage.insert(live_source);

        Self {
            live_source,
            fallback_nodes,
            selector,
            fanout,
            profile_branches,
            selector_ports: SelectorPorts {
                fallback_port,
                live_port: None,
            },
            active_input: ActiveInput::Fallback,
            decode_chain: None,
            lineage,
        }
    }

    /// Whether an error from `node` attributes to the live source.
    ///
    /// Chain nodes are registered before they are linked, so errors raised
    /// during chain construction attribute correctly.
    pub fn is_live_lineage(&self, node: NodeId) -> bool {
        self.lineage.contains(&node)
    }

    /// Add a decode-chain node to the live lineage.
    pub fn register_lineage(&mut self, node: NodeId) {
        self.lineage.insert(node);
    }

    /// Drop a node from the lineage again (chain construction rollback).
    pub fn unregister_lineage(&mut self, node: NodeId) {
        if node != self.live_source {
            self.lineage.remove(&node);
        }
    }

    /// Forget the decode chain and its lineage entries; the live source
    /// itself stays in the lineage for the whole session.
    pub fn clear_decode_chain(&mut self) -> Option<DecodeChain> {
        let chain = self.decode_chain.take();
        if let Some(ref chain) = chain {
            for node in &chain.nodes {
                self.lineage.remove(node);
            }
        }
        self.selector_ports.live_port = None;
        chain
    }

    /// Every node currently in the graph, decode chain included.
    pub fn all_nodes(&self) -> Vec<NodeId> {
        let mut nodes = vec![self.live_source, self.selector, self.fanout];
        nodes.extend(&self.fallback_nodes);
        for branch in &self.profile_branches {
            nodes.extend(&branch.nodes);
        }
        if let Some(ref chain) = self.decode_chain {
            nodes.extend(&chain.nodes);
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_graph() -> SessionGraph {
        SessionGraph::new(1, vec![2, 3], 4, 5, vec![], 100)
    }

    #[test]
    fn test_live_source_in_lineage() {
        let graph = test_graph();
        assert!(graph.is_live_lineage(1));
        assert!(!graph.is_live_lineage(4));
    }

    #[test]
    fn test_lineage_survives_registration_before_linking() {
        let mut graph = test_graph();
        // A chain node is registered before any link exists.
        graph.register_lineage(10);
        assert!(graph.is_live_lineage(10));
        assert!(graph.decode_chain.is_none());
    }

    #[test]
    fn test_clear_decode_chain_keeps_source_lineage() {
        let mut graph = test_graph();
        graph.register_lineage(10);
        graph.register_lineage(11);
        graph.decode_chain = Some(DecodeChain {
            nodes: vec![10, 11],
            links: vec![900],
        });
        graph.selector_ports.live_port = Some(101);

        let chain = graph.clear_decode_chain().unwrap();
        assert_eq!(chain.nodes, vec![10, 11]);
        assert!(!graph.is_live_lineage(10));
        assert!(graph.is_live_lineage(1));
        assert!(graph.selector_ports.live_port.is_none());
    }

    #[test]
    fn test_all_nodes_includes_chain() {
        let mut graph = test_graph();
        graph.decode_chain = Some(DecodeChain {
            nodes: vec![10, 11],
            links: vec![],
        });
        let nodes = graph.all_nodes();
        assert!(nodes.contains(&10));
        assert!(nodes.contains(&2));
        assert!(nodes.contains(&5));
    }
}
