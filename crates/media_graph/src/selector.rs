//! Selector switching
//!
//! The single place that changes which source feeds the output ladder.

use contracts::{ActiveInput, SessionGraph};
use tracing::{info, instrument};

use crate::engine::MediaEngine;
use crate::error::EngineError;

/// Switch the selector to `target` if it isn't there already.
///
/// Returns `Ok(true)` when a switch was issued and `Ok(false)` when the
/// target was already active (no engine call is made, so redundant requests
/// from racing events are harmless). Switching to live requires a linked
/// decode chain; without one the request is rejected.
#[instrument(name = "selector_switch", skip(engine, graph), fields(from = %graph.active_input))]
pub async fn switch_to<E: MediaEngine>(
    engine: &E,
    graph: &mut SessionGraph,
    target: ActiveInput,
) -> Result<bool, EngineError> {
    if graph.active_input == target {
        return Ok(false);
    }

    let port = match target {
        ActiveInput::Fallback => graph.selector_ports.fallback_port,
        ActiveInput::Live => {
            graph
                .selector_ports
                .live_port
                .ok_or_else(|| EngineError::SelectInput {
                    message: "no live decode chain is linked".to_string(),
                })?
        }
    };

    engine.select_input(graph.selector, port).await?;
    graph.active_input = target;
    info!("selector switched");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::chain::build_decode_chain;
    use crate::mock::MockEngine;
    use contracts::{CanonicalFormat, StreamInfo, StreamPlan};

    async fn graph_with_chain(engine: &MockEngine) -> SessionGraph {
        let plan = StreamPlan::with_defaults("rtsp://cam/stream", "/out");
        let mut graph = GraphBuilder::new(engine, &plan).build().await.unwrap();
        let src_port = engine.request_output_port(graph.live_source).await.unwrap();
        build_decode_chain(
            engine,
            &mut graph,
            src_port,
            &StreamInfo::video("h264"),
            &CanonicalFormat::default(),
        )
        .await
        .unwrap();
        graph
    }

    #[tokio::test]
    async fn test_switch_to_live_and_back() {
        let engine = MockEngine::new();
        let mut graph = graph_with_chain(&engine).await;
        let live_port = graph.selector_ports.live_port.unwrap();

        assert!(switch_to(&engine, &mut graph, ActiveInput::Live).await.unwrap());
        assert_eq!(graph.active_input, ActiveInput::Live);
        assert_eq!(engine.selected_input(graph.selector), Some(live_port));

        assert!(switch_to(&engine, &mut graph, ActiveInput::Fallback).await.unwrap());
        assert_eq!(
            engine.selected_input(graph.selector),
            Some(graph.selector_ports.fallback_port)
        );
    }

    #[tokio::test]
    async fn test_switch_is_idempotent() {
        let engine = MockEngine::new();
        let mut graph = graph_with_chain(&engine).await;
        let calls_after_build = engine.select_call_count();

        // Already on fallback: no engine call.
        assert!(!switch_to(&engine, &mut graph, ActiveInput::Fallback).await.unwrap());
        assert_eq!(engine.select_call_count(), calls_after_build);

        assert!(switch_to(&engine, &mut graph, ActiveInput::Live).await.unwrap());
        assert!(!switch_to(&engine, &mut graph, ActiveInput::Live).await.unwrap());
        assert_eq!(engine.select_call_count(), calls_after_build + 1);
    }

    #[tokio::test]
    async fn test_switch_to_live_without_chain_fails() {
        let engine = MockEngine::new();
        let plan = StreamPlan::with_defaults("rtsp://cam/stream", "/out");
        let mut graph = GraphBuilder::new(&engine, &plan).build().await.unwrap();

        let err = switch_to(&engine, &mut graph, ActiveInput::Live).await.unwrap_err();
        assert!(matches!(err, EngineError::SelectInput { .. }));
        assert_eq!(graph.active_input, ActiveInput::Fallback);
    }
}
