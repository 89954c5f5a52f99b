//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（无需真实媒体后端）
//! - 故障切换时序回归

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_default_plan_validates() {
        let plan = contracts::StreamPlan::with_defaults("rtsp://cam/stream", "/srv/dash");
        assert!(config_loader::ConfigLoader::validate(&plan).is_ok());
    }

    #[test]
    fn test_plan_toml_round_trip() {
        let plan = contracts::StreamPlan::with_defaults("rtsp://cam/stream", "/srv/dash");
        let toml = config_loader::ConfigLoader::to_toml(&plan).unwrap();
        let parsed =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(parsed.source.uri, plan.source.uri);
        assert_eq!(parsed.profiles, plan.profiles);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{ActiveInput, EngineEvent, NodeId, PortId, SessionGraph, StreamPlan};
    use failover::{EventLoop, LoopHandle, SessionOutcome, StopReason};
    use media_graph::{teardown_graph, GraphBuilder, MediaEngine, MockEngine, MockEngineConfig};
    use tokio::task::JoinHandle;
    use tokio::time::sleep;

    fn plan() -> StreamPlan {
        StreamPlan::with_defaults("rtsp://cam.local:8554/stream", "/srv/dash")
    }

    /// 记录断言所需的句柄后，把会话放到后台运行。
    struct RunningSession {
        engine: MockEngine,
        handle: LoopHandle,
        runner: JoinHandle<SessionOutcome>,
        live_source: NodeId,
        selector: NodeId,
        fallback_port: PortId,
    }

    async fn start_session(engine: MockEngine) -> RunningSession {
        let plan = plan();
        let graph: SessionGraph = GraphBuilder::new(&engine, &plan).build().await.unwrap();
        let live_source = graph.live_source;
        let selector = graph.selector;
        let fallback_port = graph.selector_ports.fallback_port;

        let (event_loop, handle) =
            EventLoop::new(engine.clone(), graph, plan.canonical, plan.timing);
        engine.start().await.unwrap();
        let runner = tokio::spawn(event_loop.run());

        RunningSession {
            engine,
            handle,
            runner,
            live_source,
            selector,
            fallback_port,
        }
    }

    impl RunningSession {
        fn serving_live(&self) -> bool {
            let selected = self.engine.selected_input(self.selector);
            selected.is_some() && selected != Some(self.fallback_port)
        }

        async fn stop(self) -> SessionOutcome {
            self.handle.shutdown();
            self.runner.await.unwrap()
        }
    }

    /// 端到端：可达的源在宽限期后上线
    ///
    /// 验证完整连接周期：
    /// 1. 协商发现视频端口
    /// 2. 解码链构建，宽限期hold住切换
    /// 3. 宽限期结束后选择器切到 live
    #[tokio::test(start_paused = true)]
    async fn test_e2e_connect_and_go_live() {
        let engine = MockEngine::with_config(MockEngineConfig {
            source_available: true,
            ..Default::default()
        });
        let session = start_session(engine).await;

        // 宽限期之前仍在回退源上
        sleep(Duration::from_millis(500)).await;
        assert!(!session.serving_live());

        // 默认宽限期 1s
        sleep(Duration::from_secs(1)).await;
        assert!(session.serving_live());

        let outcome = session.stop().await;
        assert_eq!(outcome.reason, StopReason::Requested);
        assert_eq!(outcome.stats.switches_to_live, 1);
        assert_eq!(outcome.stats.failovers, 0);
    }

    /// 端到端：不可达的源以固定间隔持续重试
    #[tokio::test(start_paused = true)]
    async fn test_e2e_unreachable_source_retries_forever() {
        let engine = MockEngine::new(); // source_available = false
        let session = start_session(engine).await;

        // 默认重连间隔 5s：16s 内应有 3 次尝试（t=5,10,15）
        sleep(Duration::from_secs(16)).await;
        assert!(!session.serving_live());

        let outcome = session.stop().await;
        assert_eq!(outcome.stats.reconnect_attempts, 3);
        assert_eq!(outcome.stats.switches_to_live, 0);
        assert_eq!(outcome.graph.active_input, ActiveInput::Fallback);
        // 每次失败的尝试都会以源错误形式回报
        assert!(outcome.stats.engine_errors >= 3);
    }

    /// 端到端：断流触发故障切换，恢复后重新上线
    #[tokio::test(start_paused = true)]
    async fn test_e2e_drop_failover_and_recover() {
        let engine = MockEngine::with_config(MockEngineConfig {
            source_available: true,
            ..Default::default()
        });
        let session = start_session(engine).await;

        sleep(Duration::from_secs(2)).await;
        assert!(session.serving_live());

        // 断流：输出立即回落，观众无中断
        session.engine.set_source_available(false);
        session.engine.emit(EngineEvent::Error {
            node: session.live_source,
            message: "connection reset by peer".to_string(),
        });
        sleep(Duration::from_millis(100)).await;
        assert!(!session.serving_live());

        // 一个重连周期内源恢复
        session.engine.set_source_available(true);
        sleep(Duration::from_secs(7)).await;
        assert!(session.serving_live());

        let outcome = session.stop().await;
        assert_eq!(outcome.stats.failovers, 1);
        assert_eq!(outcome.stats.switches_to_live, 2);
        assert!(outcome.stats.reconnect_attempts >= 1);
    }

    /// 端到端：错误风暴只产生一个待处理的重连
    #[tokio::test(start_paused = true)]
    async fn test_e2e_error_burst_is_debounced() {
        let engine = MockEngine::new();
        let session = start_session(engine).await;

        // 启动错误已经安排了一次重连；再注入一阵错误
        for _ in 0..5 {
            session.engine.emit(EngineEvent::Error {
                node: session.live_source,
                message: "network unreachable".to_string(),
            });
        }
        // 每次错误都重置定时器，所以到期时只触发一次尝试
        sleep(Duration::from_millis(5100)).await;

        let outcome = session.stop().await;
        assert_eq!(outcome.stats.reconnect_attempts, 1);
    }

    /// 端到端：live 谱系之外的错误终止会话
    #[tokio::test(start_paused = true)]
    async fn test_e2e_pipeline_error_is_fatal() {
        let engine = MockEngine::with_config(MockEngineConfig {
            source_available: true,
            ..Default::default()
        });
        let session = start_session(engine).await;
        sleep(Duration::from_secs(2)).await;

        let packagers = session.engine.nodes_of_kind(contracts::NodeKind::Packager);
        session.engine.emit(EngineEvent::Error {
            node: packagers[0],
            message: "disk full".to_string(),
        });

        let outcome = session.runner.await.unwrap();
        assert!(matches!(
            outcome.reason,
            StopReason::PipelineFatal { node, .. } if node == packagers[0]
        ));
    }

    /// 端到端：关闭幂等，拓扑完整拆除
    #[tokio::test(start_paused = true)]
    async fn test_e2e_shutdown_and_teardown() {
        let engine = MockEngine::with_config(MockEngineConfig {
            source_available: true,
            ..Default::default()
        });
        let session = start_session(engine).await;
        sleep(Duration::from_secs(2)).await;

        session.handle.shutdown();
        session.handle.shutdown();
        let engine = session.engine.clone();
        let outcome = session.runner.await.unwrap();
        assert_eq!(outcome.reason, StopReason::Requested);

        engine.stop().await.unwrap();
        teardown_graph(&engine, &outcome.graph).await.unwrap();
        assert_eq!(engine.node_count(), 0);
        // 再次拆除同样成功
        teardown_graph(&engine, &outcome.graph).await.unwrap();
    }

    /// 端到端：构建失败时引擎里不留任何节点
    #[tokio::test]
    async fn test_e2e_build_failure_leaves_engine_clean() {
        let engine = MockEngine::with_config(MockEngineConfig {
            fail_nodes: vec!["packager-hd".to_string()],
            ..Default::default()
        });
        let plan = plan();

        let result = GraphBuilder::new(&engine, &plan).build().await;
        assert!(result.is_err());
        assert_eq!(engine.node_count(), 0);
    }
}
