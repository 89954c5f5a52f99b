//! # Media Graph
//!
//! The processing-graph side of the orchestrator:
//!
//! - `MediaEngine` trait abstracting the external media engine
//! - `MockEngine` for tests and engine-less runs
//! - `GraphBuilder` wiring the static topology with rollback on failure
//! - dynamic decode-chain construction and teardown
//! - the idempotent selector switch

mod builder;
mod chain;
mod engine;
mod error;
mod mock;
mod selector;

pub use builder::{teardown_graph, GraphBuilder};
pub use chain::{build_decode_chain, teardown_decode_chain};
pub use engine::MediaEngine;
pub use error::{BuildError, EngineError, Result};
pub use mock::{MockEngine, MockEngineConfig};
pub use selector::switch_to;
