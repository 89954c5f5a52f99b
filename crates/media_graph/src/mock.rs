//! Mock 媒体引擎
//!
//! 进程内引擎实现，用于测试和无引擎运行。
//! 支持注入节点创建失败，以及脚本化 live 源的网络协商结果。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use contracts::{EngineEvent, LinkId, NodeId, NodeKind, NodeState, PortId, StreamInfo};
use tokio::sync::mpsc;
use tracing::instrument;

use crate::engine::MediaEngine;
use crate::error::{EngineError, Result};

/// Mock 引擎配置
#[derive(Debug, Clone)]
pub struct MockEngineConfig {
    /// 创建时应该失败的节点名称
    pub fail_nodes: Vec<String>,

    /// live 源协商是否成功。LiveSource 进入 running 时：
    /// true 为每个发现的流发出一个 PortAdded，
    /// false 发出归属于该节点的 Error。
    pub source_available: bool,

    /// 协商成功时发现的流
    pub discovered_streams: Vec<StreamInfo>,
}

impl Default for MockEngineConfig {
    fn default() -> Self {
        Self {
            fail_nodes: Vec::new(),
            source_available: false,
            discovered_streams: vec![StreamInfo::video("h264"), StreamInfo::audio("aac")],
        }
    }
}

#[derive(Debug)]
struct MockNode {
    kind: NodeKind,
    name: String,
    state: NodeState,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: HashMap<NodeId, MockNode>,
    ports: HashMap<PortId, NodeId>,
    links: HashMap<LinkId, (NodeId, NodeId)>,
    selected: HashMap<NodeId, PortId>,
    select_calls: u64,
    source_available: bool,
    started: bool,
    next_node: NodeId,
    next_port: PortId,
    next_link: LinkId,
}

/// Mock 媒体引擎
///
/// clone 共享内部状态：交给 builder 的实例和测试持有的实例
/// 观察到同一张图。
#[derive(Clone)]
pub struct MockEngine {
    config: MockEngineConfig,
    inner: Arc<Mutex<Inner>>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<EngineEvent>>>>,
}

impl MockEngine {
    /// 创建默认 mock 引擎
    pub fn new() -> Self {
        Self::with_config(MockEngineConfig::default())
    }

    /// 使用脚本化配置创建 mock 引擎
    pub fn with_config(config: MockEngineConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inner = Inner {
            source_available: config.source_available,
            next_node: 1000, // start high so ids are easy to spot in logs
            next_port: 5000,
            next_link: 9000,
            ..Default::default()
        };

        Self {
            config,
            inner: Arc::new(Mutex::new(inner)),
            events_tx,
            events_rx: Arc::new(Mutex::new(Some(events_rx))),
        }
    }

    // ===== test support =====

    /// Change live-source reachability; takes effect on the next negotiation
    pub fn set_source_available(&self, available: bool) {
        self.inner.lock().unwrap().source_available = available;
    }

    /// Inject a raw engine event
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Number of nodes currently alive
    pub fn node_count(&self) -> usize {
        self.inner.lock().unwrap().nodes.len()
    }

    /// All node ids of a given kind
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<NodeId> = inner
            .nodes
            .iter()
            .filter(|(_, n)| n.kind == kind)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Current state of a node
    pub fn node_state(&self, node: NodeId) -> Option<NodeState> {
        self.inner.lock().unwrap().nodes.get(&node).map(|n| n.state)
    }

    /// Currently selected input port of a selector node
    pub fn selected_input(&self, selector: NodeId) -> Option<PortId> {
        self.inner.lock().unwrap().selected.get(&selector).copied()
    }

    /// How many select_input calls were issued
    pub fn select_call_count(&self) -> u64 {
        self.inner.lock().unwrap().select_calls
    }

    /// Node a port belongs to
    pub fn port_owner(&self, port: PortId) -> Option<NodeId> {
        self.inner.lock().unwrap().ports.get(&port).copied()
    }

    /// Number of live links
    pub fn link_count(&self) -> usize {
        self.inner.lock().unwrap().links.len()
    }

    // ===== internals =====

    fn allocate_port(inner: &mut Inner, node: NodeId) -> PortId {
        let port = inner.next_port;
        inner.next_port += 1;
        inner.ports.insert(port, node);
        port
    }

    fn allocate_link(inner: &mut Inner, src: NodeId, dst: NodeId) -> LinkId {
        let link = inner.next_link;
        inner.next_link += 1;
        inner.links.insert(link, (src, dst));
        link
    }

    fn ensure_node(inner: &Inner, node: NodeId) -> Result<()> {
        if inner.nodes.contains_key(&node) {
            Ok(())
        } else {
            Err(EngineError::NodeNotFound { node })
        }
    }

    /// 模拟进入 running 的 live 源的网络协商
    fn negotiate(&self, inner: &mut Inner, node: NodeId) {
        if inner.source_available {
            for stream in &self.config.discovered_streams {
                let port = Self::allocate_port(inner, node);
                let _ = self.events_tx.send(EngineEvent::PortAdded {
                    node,
                    port,
                    stream: stream.clone(),
                });
            }
        } else {
            let _ = self.events_tx.send(EngineEvent::Error {
                node,
                message: "could not connect to source".to_string(),
            });
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for MockEngine {
    #[instrument(name = "mock_engine_create_node", skip(self, attrs))]
    async fn create_node(
        &self,
        kind: NodeKind,
        name: &str,
        attrs: &HashMap<String, String>,
    ) -> Result<NodeId> {
        let _ = attrs;
        if self.config.fail_nodes.iter().any(|n| n == name) {
            return Err(EngineError::NodeCreate {
                name: name.to_string(),
                message: "mock failure".to_string(),
            });
        }

        let mut inner = self.inner.lock().unwrap();
        let node = inner.next_node;
        inner.next_node += 1;
        inner.nodes.insert(
            node,
            MockNode {
                kind,
                name: name.to_string(),
                state: NodeState::Idle,
            },
        );
        Ok(node)
    }

    #[instrument(name = "mock_engine_remove_node", skip(self))]
    async fn remove_node(&self, node: NodeId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        // Idempotent: removing an unknown node is fine.
        inner.nodes.remove(&node);
        inner.ports.retain(|_, owner| *owner != node);
        inner
            .links
            .retain(|_, (src, dst)| *src != node && *dst != node);
        inner.selected.remove(&node);
        Ok(())
    }

    async fn node_exists(&self, node: NodeId) -> Result<bool> {
        Ok(self.inner.lock().unwrap().nodes.contains_key(&node))
    }

    async fn request_input_port(&self, node: NodeId) -> Result<PortId> {
        let mut inner = self.inner.lock().unwrap();
        Self::ensure_node(&inner, node)?;
        Ok(Self::allocate_port(&mut inner, node))
    }

    async fn request_output_port(&self, node: NodeId) -> Result<PortId> {
        let mut inner = self.inner.lock().unwrap();
        Self::ensure_node(&inner, node)?;
        Ok(Self::allocate_port(&mut inner, node))
    }

    async fn link(&self, src: NodeId, dst: NodeId) -> Result<LinkId> {
        let mut inner = self.inner.lock().unwrap();
        Self::ensure_node(&inner, src)?;
        Self::ensure_node(&inner, dst)?;
        Ok(Self::allocate_link(&mut inner, src, dst))
    }

    async fn link_from_port(&self, src: NodeId, src_port: PortId, dst: NodeId) -> Result<LinkId> {
        let mut inner = self.inner.lock().unwrap();
        Self::ensure_node(&inner, src)?;
        Self::ensure_node(&inner, dst)?;
        if inner.ports.get(&src_port) != Some(&src) {
            return Err(EngineError::Link {
                message: format!("port {src_port} does not belong to node {src}"),
            });
        }
        Ok(Self::allocate_link(&mut inner, src, dst))
    }

    async fn link_to_port(&self, src: NodeId, dst: NodeId, dst_port: PortId) -> Result<LinkId> {
        let mut inner = self.inner.lock().unwrap();
        Self::ensure_node(&inner, src)?;
        Self::ensure_node(&inner, dst)?;
        if inner.ports.get(&dst_port) != Some(&dst) {
            return Err(EngineError::Link {
                message: format!("port {dst_port} does not belong to node {dst}"),
            });
        }
        Ok(Self::allocate_link(&mut inner, src, dst))
    }

    async fn unlink(&self, link: LinkId) -> Result<()> {
        // Idempotent.
        self.inner.lock().unwrap().links.remove(&link);
        Ok(())
    }

    #[instrument(name = "mock_engine_set_node_state", skip(self))]
    async fn set_node_state(&self, node: NodeId, state: NodeState) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::ensure_node(&inner, node)?;

        let mock_node = inner.nodes.get_mut(&node).expect("checked above");
        let was = mock_node.state;
        mock_node.state = state;
        let kind = mock_node.kind;
        let name = mock_node.name.clone();

        if kind == NodeKind::LiveSource && state == NodeState::Running && was != NodeState::Running
        {
            tracing::debug!(name = %name, "mock live source negotiating");
            self.negotiate(&mut inner, node);
        }
        Ok(())
    }

    #[instrument(name = "mock_engine_select_input", skip(self))]
    async fn select_input(&self, selector: NodeId, port: PortId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::ensure_node(&inner, selector)?;
        if inner.ports.get(&port) != Some(&selector) {
            return Err(EngineError::SelectInput {
                message: format!("port {port} is not an input of selector {selector}"),
            });
        }
        inner.selected.insert(selector, port);
        inner.select_calls += 1;
        Ok(())
    }

    #[instrument(name = "mock_engine_start", skip(self))]
    async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.started = true;

        let live_sources: Vec<NodeId> = inner
            .nodes
            .iter_mut()
            .filter_map(|(id, n)| {
                let was = n.state;
                n.state = NodeState::Running;
                (n.kind == NodeKind::LiveSource && was != NodeState::Running).then_some(*id)
            })
            .collect();

        for node in live_sources {
            self.negotiate(&mut inner, node);
        }
        Ok(())
    }

    #[instrument(name = "mock_engine_stop", skip(self))]
    async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.started = false;
        for node in inner.nodes.values_mut() {
            node.state = NodeState::Idle;
        }
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        self.events_rx.lock().unwrap().take()
    }
}
