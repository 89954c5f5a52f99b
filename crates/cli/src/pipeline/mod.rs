//! Session orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Session, SessionConfig};
pub use stats::SessionReport;
