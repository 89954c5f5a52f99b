//! # Contracts
//!
//! Frozen interface contracts, defining the data structures shared across the
//! workspace. All business crates can only depend on this crate, reverse
//! dependencies are prohibited.
//!
//! ## Graph Model
//! - Node, port and link identities are allocated by the Engine and opaque here
//! - `SessionGraph` records the topology of one streaming session
//! - `StreamPlan` is the immutable session configuration produced at startup

mod error;
mod event;
mod node;
mod plan;
mod session;
mod state;

pub use error::*;
pub use event::*;
pub use node::*;
pub use plan::*;
pub use session::*;
pub use state::*;
