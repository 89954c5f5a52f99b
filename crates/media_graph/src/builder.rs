//! GraphBuilder 核心实现
//!
//! 从 StreamPlan 构建静态会话拓扑：两路源、选择器、分发器
//! 以及每个质量档位一条打包分支。

use std::collections::HashMap;

use contracts::{
    ActiveInput, CanonicalFormat, NodeId, NodeKind, Profile, ProfileBranch, SessionGraph,
    StreamPlan,
};
use tracing::{debug, info, instrument, warn};

use crate::engine::MediaEngine;
use crate::error::{BuildError, EngineError};

/// Graph Builder
///
/// 负责在引擎上实例化整个静态拓扑，
/// 并提供失败时的回滚能力。
pub struct GraphBuilder<'a, E: MediaEngine> {
    engine: &'a E,
    plan: &'a StreamPlan,
    /// 已创建节点（按创建顺序），驱动回滚
    created: Vec<NodeId>,
}

impl<'a, E: MediaEngine> GraphBuilder<'a, E> {
    pub fn new(engine: &'a E, plan: &'a StreamPlan) -> Self {
        Self {
            engine,
            plan,
            created: Vec::new(),
        }
    }

    /// 构建完整静态拓扑并激活回退路由
    ///
    /// # 原子性保证
    /// 任何一步失败都会销毁所有已创建的节点后返回错误。
    /// live 解码链不在这里构建，它跟随源的运行时端口发现。
    #[instrument(name = "graph_build", skip(self), fields(profiles = self.plan.profiles.len()))]
    pub async fn build(mut self) -> Result<SessionGraph, BuildError> {
        match self.build_inner().await {
            Ok(graph) => {
                info!(
                    nodes = graph.all_nodes().len(),
                    "session graph built, fallback route active"
                );
                Ok(graph)
            }
            Err(e) => {
                warn!(error = %e, created = self.created.len(), "build failed, rolling back");
                self.rollback().await;
                Err(e)
            }
        }
    }

    async fn build_inner(&mut self) -> Result<SessionGraph, BuildError> {
        let live_source = self
            .create(NodeKind::LiveSource, "live-source", self.live_source_attrs())
            .await?;

        // 回退分支：合成测试图样归一化到规范格式，
        // 让选择器两路输入的 caps 完全一致
        let fallback_source = self
            .create(
                NodeKind::FallbackSource,
                "fallback-source",
                attrs([("pattern", "smpte".into()), ("is-live", "true".into())]),
            )
            .await?;
        let fallback_normalize = self
            .create(
                NodeKind::Normalize,
                "fallback-normalize",
                canonical_attrs(&self.plan.canonical),
            )
            .await?;
        self.link(fallback_source, "fallback-source", fallback_normalize, "fallback-normalize")
            .await?;

        let selector = self
            .create(NodeKind::Selector, "selector", HashMap::new())
            .await?;
        let fallback_port = self
            .engine
            .request_input_port(selector)
            .await
            .map_err(|e| BuildError::PortRequest {
                name: "selector".to_string(),
                message: e.to_string(),
            })?;
        self.engine
            .link_to_port(fallback_normalize, selector, fallback_port)
            .await
            .map_err(|e| BuildError::Link {
                src: "fallback-normalize".to_string(),
                dst: "selector".to_string(),
                message: e.to_string(),
            })?;

        let fanout = self.create(NodeKind::FanOut, "fanout", HashMap::new()).await?;
        self.link(selector, "selector", fanout, "fanout").await?;

        let profiles = self.plan.profiles.clone();
        let mut profile_branches = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            let branch = self.build_profile_branch(fanout, profile).await?;
            profile_branches.push(branch);
        }

        // 在任何数据流动之前激活初始路由
        self.engine
            .select_input(selector, fallback_port)
            .await
            .map_err(|e| BuildError::Activate {
                message: e.to_string(),
            })?;

        let graph = SessionGraph::new(
            live_source,
            vec![fallback_source, fallback_normalize],
            selector,
            fanout,
            profile_branches,
            fallback_port,
        );
        debug_assert_eq!(graph.active_input, ActiveInput::Fallback);
        Ok(graph)
    }

    /// 一条打包分支：fan-out port -> scale -> rate -> encoder -> packager
    async fn build_profile_branch(
        &mut self,
        fanout: NodeId,
        profile: &Profile,
    ) -> Result<ProfileBranch, BuildError> {
        let result = self.build_profile_branch_inner(fanout, profile).await;
        result.map_err(|e| BuildError::ProfileBranch {
            profile_id: profile.id.clone(),
            message: e.to_string(),
        })
    }

    async fn build_profile_branch_inner(
        &mut self,
        fanout: NodeId,
        profile: &Profile,
    ) -> Result<ProfileBranch, BuildError> {
        let id = &profile.id;

        let scale = self
            .create(
                NodeKind::Scale,
                &format!("scale-{id}"),
                attrs([
                    ("width", profile.width.to_string()),
                    ("height", profile.height.to_string()),
                ]),
            )
            .await?;
        let rate = self
            .create(
                NodeKind::Rate,
                &format!("rate-{id}"),
                attrs([("framerate", self.plan.canonical.framerate.to_string())]),
            )
            .await?;
        let encoder = self
            .create(
                NodeKind::Encoder,
                &format!("encoder-{id}"),
                attrs([
                    ("bitrate-kbps", profile.bitrate_kbps.to_string()),
                    (
                        // 每个分片边界一个关键帧，保证分片可独立切割
                        "keyframe-interval",
                        (self.plan.canonical.framerate * profile.segment_duration_secs)
                            .to_string(),
                    ),
                ]),
            )
            .await?;
        let packager = self
            .create(
                NodeKind::Packager,
                &format!("packager-{id}"),
                self.packager_attrs(profile),
            )
            .await?;

        let fanout_port = self
            .engine
            .request_output_port(fanout)
            .await
            .map_err(|e| BuildError::PortRequest {
                name: "fanout".to_string(),
                message: e.to_string(),
            })?;
        self.engine
            .link_from_port(fanout, fanout_port, scale)
            .await
            .map_err(|e| BuildError::Link {
                src: "fanout".to_string(),
                dst: format!("scale-{id}"),
                message: e.to_string(),
            })?;
        self.link(scale, &format!("scale-{id}"), rate, &format!("rate-{id}"))
            .await?;
        self.link(rate, &format!("rate-{id}"), encoder, &format!("encoder-{id}"))
            .await?;
        self.link(
            encoder,
            &format!("encoder-{id}"),
            packager,
            &format!("packager-{id}"),
        )
        .await?;

        debug!(profile = %id, "profile branch linked");
        Ok(ProfileBranch {
            profile: profile.clone(),
            nodes: vec![scale, rate, encoder, packager],
            fanout_port,
        })
    }

    async fn create(
        &mut self,
        kind: NodeKind,
        name: &str,
        attrs: HashMap<String, String>,
    ) -> Result<NodeId, BuildError> {
        let node = self
            .engine
            .create_node(kind, name, &attrs)
            .await
            .map_err(|e| BuildError::NodeCreate {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        self.created.push(node);
        Ok(node)
    }

    async fn link(
        &self,
        src: NodeId,
        src_name: &str,
        dst: NodeId,
        dst_name: &str,
    ) -> Result<(), BuildError> {
        self.engine
            .link(src, dst)
            .await
            .map(|_| ())
            .map_err(|e| BuildError::Link {
                src: src_name.to_string(),
                dst: dst_name.to_string(),
                message: e.to_string(),
            })
    }

    /// 回滚：逆序销毁所有已创建的节点
    async fn rollback(&mut self) {
        for node in self.created.drain(..).rev() {
            if let Err(e) = self.engine.remove_node(node).await {
                warn!(node, error = %e, "rollback: failed to remove node");
            }
        }
    }

    fn live_source_attrs(&self) -> HashMap<String, String> {
        attrs([
            ("uri", self.plan.source.uri.clone()),
            ("latency-ms", self.plan.source.latency_ms.to_string()),
            ("timeout-secs", self.plan.source.timeout_secs.to_string()),
        ])
    }

    fn packager_attrs(&self, profile: &Profile) -> HashMap<String, String> {
        let dir = &self.plan.output.directory;
        attrs([
            (
                "manifest-path",
                self.plan.output.manifest_path().display().to_string(),
            ),
            (
                "init-segment",
                dir.join(format!("init-{}.m4s", profile.id)).display().to_string(),
            ),
            (
                "media-segment",
                dir.join(format!("segment-{}-%05d.m4s", profile.id))
                    .display()
                    .to_string(),
            ),
            (
                "segment-duration-secs",
                profile.segment_duration_secs.to_string(),
            ),
        ])
    }
}

/// Remove every node of a session graph, decode chain included.
///
/// Used on shutdown after the engine stopped; removal is idempotent so a
/// partially torn down graph is fine.
#[instrument(name = "graph_teardown", skip_all)]
pub async fn teardown_graph<E: MediaEngine>(
    engine: &E,
    graph: &SessionGraph,
) -> Result<(), EngineError> {
    for node in graph.all_nodes() {
        engine.remove_node(node).await?;
    }
    Ok(())
}

fn attrs<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn canonical_attrs(canonical: &CanonicalFormat) -> HashMap<String, String> {
    attrs([
        ("width", canonical.width.to_string()),
        ("height", canonical.height.to_string()),
        ("framerate", canonical.framerate.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEngine, MockEngineConfig};

    fn test_plan() -> StreamPlan {
        StreamPlan::with_defaults("rtsp://cam.local/stream", "/srv/dash")
    }

    #[tokio::test]
    async fn test_build_full_topology() {
        let engine = MockEngine::new();
        let plan = test_plan();
        let graph = GraphBuilder::new(&engine, &plan).build().await.unwrap();

        // 1 live source + 2 fallback + selector + fanout + 2 profiles * 4
        assert_eq!(engine.node_count(), 13);
        assert_eq!(graph.profile_branches.len(), 2);
        assert_eq!(graph.active_input, ActiveInput::Fallback);
        assert!(graph.decode_chain.is_none());
        assert!(graph.selector_ports.live_port.is_none());
        assert_eq!(
            engine.selected_input(graph.selector),
            Some(graph.selector_ports.fallback_port)
        );
    }

    #[tokio::test]
    async fn test_build_rolls_back_on_branch_failure() {
        let engine = MockEngine::with_config(MockEngineConfig {
            fail_nodes: vec!["encoder-hd".to_string()],
            ..Default::default()
        });
        let plan = test_plan();
        let err = GraphBuilder::new(&engine, &plan).build().await.unwrap_err();

        assert!(matches!(err, BuildError::ProfileBranch { ref profile_id, .. } if profile_id == "hd"));
        assert_eq!(engine.node_count(), 0);
    }

    #[tokio::test]
    async fn test_build_rolls_back_on_source_failure() {
        let engine = MockEngine::with_config(MockEngineConfig {
            fail_nodes: vec!["live-source".to_string()],
            ..Default::default()
        });
        let plan = test_plan();
        let err = GraphBuilder::new(&engine, &plan).build().await.unwrap_err();

        assert!(matches!(err, BuildError::NodeCreate { ref name, .. } if name == "live-source"));
        assert_eq!(engine.node_count(), 0);
    }

    #[tokio::test]
    async fn test_teardown_removes_everything() {
        let engine = MockEngine::new();
        let plan = test_plan();
        let graph = GraphBuilder::new(&engine, &plan).build().await.unwrap();

        teardown_graph(&engine, &graph).await.unwrap();
        assert_eq!(engine.node_count(), 0);
        // Teardown of an already empty engine is fine.
        teardown_graph(&engine, &graph).await.unwrap();
    }
}
