//! 连接监视器
//!
//! 拥有连接状态机：根据引擎事件维护 live 分支的状态，
//! 负责故障切换、解码链重建与重连调度。
//! 所有处理都在事件循环任务上串行执行，不存在并发修改。

use contracts::{
    ActiveInput, CanonicalFormat, ConnectionState, EngineEvent, NodeId, NodeState, PortId,
    SessionGraph, StreamInfo, TimingSettings,
};
use media_graph::{build_decode_chain, switch_to, teardown_decode_chain, MediaEngine};
use observability::metrics::{
    record_connection_state, record_engine_error, record_failover, record_reconnect_attempt,
    record_switch,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::event_loop::{LoopEvent, StopReason};
use crate::reconnect::ReconnectScheduler;
use crate::stats::SessionStats;
use crate::timer::OneShotTimer;

/// 连接监视器
///
/// 每个会话一个实例，由事件循环驱动。错误归属严格按节点身份判定：
/// live 谱系（源 + 解码链）的错误走重连路径，其余错误终止会话。
pub struct ConnectionMonitor<E: MediaEngine> {
    engine: E,
    graph: SessionGraph,
    canonical: CanonicalFormat,
    timing: TimingSettings,
    state: ConnectionState,
    scheduler: ReconnectScheduler,
    grace: OneShotTimer,
    tx: mpsc::UnboundedSender<LoopEvent>,
    stats: SessionStats,
}

impl<E: MediaEngine> ConnectionMonitor<E> {
    /// 创建监视器
    ///
    /// 初始状态为 Disconnected；首次协商结果（端口发现或源错误）
    /// 作为普通引擎事件进入同一条路径。
    pub fn new(
        engine: E,
        graph: SessionGraph,
        canonical: CanonicalFormat,
        timing: TimingSettings,
        tx: mpsc::UnboundedSender<LoopEvent>,
    ) -> Self {
        let scheduler = ReconnectScheduler::new(timing.reconnect_interval(), tx.clone());
        record_connection_state(ConnectionState::Disconnected);
        Self {
            engine,
            graph,
            canonical,
            timing,
            state: ConnectionState::Disconnected,
            scheduler,
            grace: OneShotTimer::new(),
            tx,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn graph(&self) -> &SessionGraph {
        &self.graph
    }

    /// 处理一个引擎事件
    ///
    /// 返回 Some(reason) 表示会话必须结束。
    #[instrument(name = "monitor_engine_event", skip(self, event), fields(state = %self.state))]
    pub async fn on_engine_event(&mut self, event: EngineEvent) -> Option<StopReason> {
        if self.state == ConnectionState::Terminated {
            return None;
        }

        match event {
            EngineEvent::Error { node, message } => {
                self.stats.engine_errors += 1;
                let from_live = self.graph.is_live_lineage(node);
                record_engine_error(from_live);
                if from_live {
                    warn!(node, %message, "live source error, falling back");
                    self.handle_source_loss(ConnectionState::Disconnected).await;
                    None
                } else {
                    error!(node, %message, "pipeline node failed");
                    Some(StopReason::PipelineFatal { node, message })
                }
            }
            EngineEvent::EndOfStream { node } => {
                // EOS 在任何地方都终止会话；断流以错误事件表现，不走这里
                info!(node, "end of stream");
                Some(StopReason::EndOfStream)
            }
            EngineEvent::StateChanged { node, state } => {
                // live 源在没有错误事件的情况下停转：降级而不是断开
                if node == self.graph.live_source
                    && state == NodeState::Idle
                    && self.state == ConnectionState::Live
                {
                    warn!(node, "live source stalled without error");
                    self.handle_source_loss(ConnectionState::Degraded).await;
                }
                None
            }
            EngineEvent::PortAdded { node, port, stream } => {
                self.on_port_added(node, port, &stream).await;
                None
            }
        }
    }

    /// 源协商出新端口：只有 live 源的视频端口会触发连接周期。
    async fn on_port_added(&mut self, node: NodeId, port: PortId, stream: &StreamInfo) {
        if node != self.graph.live_source {
            debug!(node, port, "ignoring port on non-source node");
            return;
        }
        if !stream.is_video() {
            debug!(port, media = ?stream.media, "ignoring non-video stream");
            return;
        }
        if !self.state.accepts_live_port() {
            debug!(port, state = %self.state, "ignoring video port in current state");
            return;
        }

        info!(port, encoding = %stream.encoding, "live video stream discovered");
        match build_decode_chain(&self.engine, &mut self.graph, port, stream, &self.canonical)
            .await
        {
            Ok(()) => {
                self.set_state(ConnectionState::Connecting);
                self.scheduler.cancel();
                self.grace
                    .arm(&self.tx, self.timing.grace_period(), LoopEvent::GraceElapsed);
                info!(
                    grace_ms = self.timing.grace_period_ms,
                    "decode chain ready, holding grace period before switch"
                );
            }
            Err(e) => {
                warn!(error = %e, "decode chain construction failed, scheduling reconnect");
                self.set_state(ConnectionState::Disconnected);
                self.scheduler.schedule();
            }
        }
    }

    /// 宽限期结束：提交切换到 live。
    #[instrument(name = "monitor_grace_elapsed", skip(self), fields(state = %self.state))]
    pub async fn on_grace_elapsed(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!("grace elapsed outside connecting state, ignoring");
            return;
        }

        match switch_to(&self.engine, &mut self.graph, ActiveInput::Live).await {
            Ok(switched) => {
                if switched {
                    self.stats.switches_to_live += 1;
                    record_switch(ActiveInput::Live);
                }
                self.set_state(ConnectionState::Live);
                info!("serving live feed");
            }
            Err(e) => {
                warn!(error = %e, "switch to live failed");
                self.handle_source_loss(ConnectionState::Disconnected).await;
            }
        }
    }

    /// 重连定时器到期：重启 live 源，结果以引擎事件形式返回。
    #[instrument(name = "monitor_reconnect_due", skip(self), fields(state = %self.state))]
    pub async fn on_reconnect_due(&mut self) {
        if !matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Degraded
        ) {
            debug!("reconnect due outside retry states, ignoring");
            return;
        }

        self.stats.reconnect_attempts += 1;
        record_reconnect_attempt(self.stats.reconnect_attempts);
        self.set_state(ConnectionState::Disconnected);
        info!(
            attempt = self.stats.reconnect_attempts,
            "attempting live source reconnect"
        );

        // 上一周期的残留解码链必须先拆掉
        teardown_decode_chain(&self.engine, &mut self.graph).await;

        if let Err(e) = self.restart_live_source().await {
            // 连协商都没发出去，直接安排下一轮
            warn!(error = %e, "live source restart failed, scheduling next attempt");
            self.scheduler.schedule();
        }
    }

    /// 终止会话：取消所有定时器并进入终态。幂等。
    #[instrument(name = "monitor_terminate", skip(self))]
    pub async fn terminate(&mut self) {
        if self.state == ConnectionState::Terminated {
            return;
        }
        self.grace.cancel();
        self.scheduler.cancel();
        self.set_state(ConnectionState::Terminated);
        info!("session terminated");
    }

    /// 拆出最终拓扑与统计
    pub fn into_parts(self) -> (SessionGraph, SessionStats) {
        (self.graph, self.stats)
    }

    /// 失去 live 源的统一路径：回落、拆链、调度重连。
    async fn handle_source_loss(&mut self, next: ConnectionState) {
        self.grace.cancel();

        if self.graph.active_input == ActiveInput::Live {
            match switch_to(&self.engine, &mut self.graph, ActiveInput::Fallback).await {
                Ok(_) => {
                    self.stats.failovers += 1;
                    record_failover();
                    record_switch(ActiveInput::Fallback);
                    info!("failed over to fallback source");
                }
                Err(e) => {
                    // 回落失败意味着观众黑屏，但会话仍可通过重连恢复
                    error!(error = %e, "failed to switch back to fallback");
                }
            }
        }

        teardown_decode_chain(&self.engine, &mut self.graph).await;
        self.set_state(next);
        self.scheduler.schedule();
    }

    async fn restart_live_source(&mut self) -> media_graph::Result<()> {
        self.engine
            .set_node_state(self.graph.live_source, NodeState::Idle)
            .await?;
        self.engine
            .set_node_state(self.graph.live_source, NodeState::Running)
            .await
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "connection state changed");
            self.state = next;
            record_connection_state(next);
        }
    }
}
