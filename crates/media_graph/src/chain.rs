//! Dynamic decode chain
//!
//! The live branch between the source's discovered video port and the
//! selector: depacketize -> parse -> decode -> normalize. Built when the
//! source announces its video stream, torn down on every disconnect, and
//! rebuilt from scratch on reconnect.

use contracts::{
    CanonicalFormat, DecodeChain, NodeId, NodeKind, NodeState, PortId, SessionGraph, StreamInfo,
};
use tracing::{debug, info, instrument, warn};

use crate::engine::MediaEngine;
use crate::error::BuildError;

/// Build and link the live decode chain.
///
/// `src_port` is the video output port the live source just announced.
/// Every chain node enters the live lineage before any link is made, so an
/// error raised mid-construction already attributes to the source. On
/// failure the partial chain is removed and the graph is left as it was.
///
/// On success the graph owns the chain and the selector has a live input
/// port; the switch itself is the caller's decision.
#[instrument(name = "decode_chain_build", skip(engine, graph, stream, canonical), fields(encoding = %stream.encoding))]
pub async fn build_decode_chain<E: MediaEngine>(
    engine: &E,
    graph: &mut SessionGraph,
    src_port: PortId,
    stream: &StreamInfo,
    canonical: &CanonicalFormat,
) -> Result<(), BuildError> {
    match build_inner(engine, graph, src_port, stream, canonical).await {
        Ok(()) => {
            info!("decode chain linked to selector");
            Ok(())
        }
        Err((created, e)) => {
            warn!(error = %e, "decode chain construction failed, removing partial chain");
            for node in created.into_iter().rev() {
                graph.unregister_lineage(node);
                if let Err(remove_err) = engine.remove_node(node).await {
                    warn!(node, error = %remove_err, "failed to remove partial chain node");
                }
            }
            Err(e)
        }
    }
}

async fn build_inner<E: MediaEngine>(
    engine: &E,
    graph: &mut SessionGraph,
    src_port: PortId,
    stream: &StreamInfo,
    canonical: &CanonicalFormat,
) -> Result<(), (Vec<NodeId>, BuildError)> {
    let mut created: Vec<NodeId> = Vec::with_capacity(4);

    macro_rules! create {
        ($kind:expr, $name:expr, $attrs:expr) => {{
            match engine.create_node($kind, $name, &$attrs).await {
                Ok(node) => {
                    graph.register_lineage(node);
                    created.push(node);
                    node
                }
                Err(e) => {
                    return Err((
                        created,
                        BuildError::NodeCreate {
                            name: $name.to_string(),
                            message: e.to_string(),
                        },
                    ));
                }
            }
        }};
    }

    let depacketize = create!(
        NodeKind::Depacketize,
        "live-depacketize",
        [("encoding".to_string(), stream.encoding.clone())].into()
    );
    let parse = create!(
        NodeKind::Parse,
        "live-parse",
        [("encoding".to_string(), stream.encoding.clone())].into()
    );
    let decode = create!(
        NodeKind::Decode,
        "live-decode",
        [("encoding".to_string(), stream.encoding.clone())].into()
    );
    let normalize = create!(
        NodeKind::Normalize,
        "live-normalize",
        [
            ("width".to_string(), canonical.width.to_string()),
            ("height".to_string(), canonical.height.to_string()),
            ("framerate".to_string(), canonical.framerate.to_string()),
        ]
        .into()
    );

    let mut links = Vec::with_capacity(5);
    macro_rules! try_link {
        ($fut:expr, $src:expr, $dst:expr) => {
            match $fut.await {
                Ok(link) => links.push(link),
                Err(e) => {
                    return Err((
                        created,
                        BuildError::Link {
                            src: $src.to_string(),
                            dst: $dst.to_string(),
                            message: e.to_string(),
                        },
                    ));
                }
            }
        };
    }

    try_link!(
        engine.link_from_port(graph.live_source, src_port, depacketize),
        "live-source",
        "live-depacketize"
    );
    try_link!(engine.link(depacketize, parse), "live-depacketize", "live-parse");
    try_link!(engine.link(parse, decode), "live-parse", "live-decode");
    try_link!(engine.link(decode, normalize), "live-decode", "live-normalize");

    let live_port = match engine.request_input_port(graph.selector).await {
        Ok(port) => port,
        Err(e) => {
            return Err((
                created,
                BuildError::PortRequest {
                    name: "selector".to_string(),
                    message: e.to_string(),
                },
            ));
        }
    };
    try_link!(
        engine.link_to_port(normalize, graph.selector, live_port),
        "live-normalize",
        "selector"
    );

    // New nodes must run before the switch; the rest of the graph is
    // already live.
    for i in 0..created.len() {
        let node = created[i];
        if let Err(e) = engine.set_node_state(node, NodeState::Running).await {
            return Err((created, BuildError::Engine(e)));
        }
    }

    graph.decode_chain = Some(DecodeChain {
        nodes: created,
        links,
    });
    graph.selector_ports.live_port = Some(live_port);
    debug!(live_port, "selector live input port ready");
    Ok(())
}

/// Tear the decode chain down and forget the selector's live port.
///
/// Idempotent: a graph without a chain is a no-op. Node removal drops the
/// chain's links with it, so explicit unlinking only covers the edge into
/// the surviving selector.
#[instrument(name = "decode_chain_teardown", skip_all)]
pub async fn teardown_decode_chain<E: MediaEngine>(engine: &E, graph: &mut SessionGraph) {
    let Some(chain) = graph.clear_decode_chain() else {
        return;
    };

    for link in chain.links {
        if let Err(e) = engine.unlink(link).await {
            warn!(link, error = %e, "failed to unlink decode chain edge");
        }
    }
    for node in chain.nodes.into_iter().rev() {
        graph.unregister_lineage(node);
        if let Err(e) = engine.remove_node(node).await {
            warn!(node, error = %e, "failed to remove decode chain node");
        }
    }
    debug!("decode chain removed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::mock::{MockEngine, MockEngineConfig};
    use contracts::StreamPlan;

    async fn built_graph(engine: &MockEngine) -> SessionGraph {
        let plan = StreamPlan::with_defaults("rtsp://cam/stream", "/out");
        GraphBuilder::new(engine, &plan).build().await.unwrap()
    }

    #[tokio::test]
    async fn test_chain_build_links_selector_port() {
        let engine = MockEngine::new();
        let mut graph = built_graph(&engine).await;
        let src_port = engine.request_output_port(graph.live_source).await.unwrap();
        let static_nodes = engine.node_count();

        build_decode_chain(
            &engine,
            &mut graph,
            src_port,
            &StreamInfo::video("h264"),
            &CanonicalFormat::default(),
        )
        .await
        .unwrap();

        assert_eq!(engine.node_count(), static_nodes + 4);
        let chain = graph.decode_chain.as_ref().unwrap();
        assert_eq!(chain.nodes.len(), 4);
        assert!(graph.selector_ports.live_port.is_some());
        for node in &chain.nodes {
            assert!(graph.is_live_lineage(*node));
            assert_eq!(engine.node_state(*node), Some(NodeState::Running));
        }
    }

    #[tokio::test]
    async fn test_chain_build_rolls_back_on_failure() {
        let engine = MockEngine::with_config(MockEngineConfig {
            fail_nodes: vec!["live-decode".to_string()],
            ..Default::default()
        });
        let mut graph = built_graph(&engine).await;
        let src_port = engine.request_output_port(graph.live_source).await.unwrap();
        let static_nodes = engine.node_count();

        let err = build_decode_chain(
            &engine,
            &mut graph,
            src_port,
            &StreamInfo::video("h264"),
            &CanonicalFormat::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BuildError::NodeCreate { ref name, .. } if name == "live-decode"));
        assert_eq!(engine.node_count(), static_nodes);
        assert!(graph.decode_chain.is_none());
        // Partial chain nodes must have left the lineage again.
        let depay_ids = engine.nodes_of_kind(NodeKind::Depacketize);
        assert!(depay_ids.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let engine = MockEngine::new();
        let mut graph = built_graph(&engine).await;
        let src_port = engine.request_output_port(graph.live_source).await.unwrap();
        build_decode_chain(
            &engine,
            &mut graph,
            src_port,
            &StreamInfo::video("h264"),
            &CanonicalFormat::default(),
        )
        .await
        .unwrap();
        let static_nodes = engine.node_count() - 4;

        teardown_decode_chain(&engine, &mut graph).await;
        assert_eq!(engine.node_count(), static_nodes);
        assert!(graph.decode_chain.is_none());
        assert!(graph.selector_ports.live_port.is_none());
        assert!(graph.is_live_lineage(graph.live_source));

        // Second teardown without a chain is a no-op.
        teardown_decode_chain(&engine, &mut graph).await;
        assert_eq!(engine.node_count(), static_nodes);
    }
}
