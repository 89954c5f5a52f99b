//! Engine and graph-construction error types.

use contracts::NodeId;
use thiserror::Error;

/// Failure of a single Engine control call
#[derive(Debug, Error)]
pub enum EngineError {
    /// Node instantiation failed
    #[error("failed to create node '{name}': {message}")]
    NodeCreate { name: String, message: String },

    /// Referenced node does not exist
    #[error("node {node} not found")]
    NodeNotFound { node: NodeId },

    /// Port request failed
    #[error("port request on node {node} failed: {message}")]
    PortRequest { node: NodeId, message: String },

    /// Linking two ports failed
    #[error("link failed: {message}")]
    Link { message: String },

    /// Node state change failed
    #[error("state change on node {node} failed: {message}")]
    StateChange { node: NodeId, message: String },

    /// Selector input switch failed
    #[error("select input failed: {message}")]
    SelectInput { message: String },
}

/// Fatal graph construction error; any variant aborts startup.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Creating a static node failed
    #[error("build: failed to create node '{name}': {message}")]
    NodeCreate { name: String, message: String },

    /// Requesting a selector/fan-out port failed
    #[error("build: port request for '{name}' failed: {message}")]
    PortRequest { name: String, message: String },

    /// Linking two stages failed
    #[error("build: failed to link {src} -> {dst}: {message}")]
    Link {
        src: String,
        dst: String,
        message: String,
    },

    /// A profile branch could not be completed; profiles are not
    /// independently optional, so this fails the whole build
    #[error("build: profile branch '{profile_id}' failed: {message}")]
    ProfileBranch { profile_id: String, message: String },

    /// Activating the initial routing failed
    #[error("build: initial activation failed: {message}")]
    Activate { message: String },

    /// Raw engine failure outside the cases above
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
