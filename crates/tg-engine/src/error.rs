//! Error types for graph wiring, initialization and execution.

use thiserror::Error;
use tg_graph::GraphError;

use crate::context::ExecutionState;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for transform implementations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Failure to resolve a configuration reference.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReferenceError {
    #[error("malformed reference '{refid}'")]
    Malformed { refid: String },

    #[error("unknown node '{node_id}'")]
    UnknownPeer { node_id: String },

    #[error("node '{node_id}' exposes no property '{property}' (available: {})", name_list(.available))]
    UnknownProperty {
        node_id: String,
        property: String,
        available: Vec<String>,
    },

    #[error("unknown external parameter '{name}'")]
    UnknownExternal { name: String },

    #[error("node '{node_id}' has already been disposed")]
    PeerDisposed { node_id: String },
}

/// Errors raised by transform implementations.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("missing parameter '{name}'")]
    MissingParameter { name: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("missing source '{role}'")]
    MissingSource { role: String },

    #[error("incompatible sources: {reason}")]
    IncompatibleSources { reason: String },

    #[error("parameter reference failed")]
    Reference(#[from] ReferenceError),

    #[error("source tile unavailable")]
    SourceTile(#[source] Box<TileError>),

    #[error("{0}")]
    Failed(String),
}

impl TransformError {
    /// Create a generic failure with a message.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<TileError> for TransformError {
    fn from(err: TileError) -> Self {
        TransformError::SourceTile(Box::new(err))
    }
}

/// Errors raised by a tile engine while forcing or reading tiles.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("channel {channel} out of range for '{producer}' ({count} channels)")]
    ChannelOutOfRange {
        producer: String,
        channel: usize,
        count: usize,
    },

    #[error("tile ({tile_x}, {tile_y}) lies outside '{producer}'")]
    OutOfBounds {
        producer: String,
        tile_x: u32,
        tile_y: u32,
    },

    #[error("'{producer}' failed to compute tile ({tile_x}, {tile_y})")]
    Compute {
        producer: String,
        tile_x: u32,
        tile_y: u32,
        #[source]
        source: TransformError,
    },

    #[error("'{producer}' produced {actual} samples, expected {expected}")]
    SampleCount {
        producer: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while wiring, initializing or executing a graph.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph '{graph_id}' has no nodes")]
    EmptyGraph { graph_id: String },

    #[error("invalid graph")]
    Graph(#[from] GraphError),

    #[error(
        "node '{consumer_id}' names source '{source_node_id}', which is neither a node nor an external input"
    )]
    MissingSource {
        consumer_id: String,
        source_node_id: String,
    },

    #[error("node '{node_id}' is part of a dependency cycle")]
    CyclicDependency { node_id: String },

    #[error("node '{node_id}': unknown transform '{transform}'")]
    UnknownTransform { node_id: String, transform: String },

    #[error("node '{node_id}': source '{role}' asks for unknown output '{output}' of '{producer_id}'")]
    UnknownOutput {
        node_id: String,
        role: String,
        producer_id: String,
        output: String,
    },

    #[error("node '{node_id}': cannot resolve parameter '{parameter}'")]
    ReferenceResolution {
        node_id: String,
        parameter: String,
        #[source]
        source: ReferenceError,
    },

    #[error("node '{node_id}': transform initialization failed")]
    TransformInit {
        node_id: String,
        #[source]
        source: TransformError,
    },

    #[error("node '{node_id}': tile ({tile_x}, {tile_y}) failed after {tiles_completed} completed tiles")]
    TileCompute {
        node_id: String,
        tile_x: u32,
        tile_y: u32,
        tiles_completed: usize,
        #[source]
        source: TileError,
    },

    #[error("transform '{name}' is already registered")]
    DuplicateTransform { name: String },

    #[error("invalid context state: expected {expected:?}, found {actual:?}")]
    InvalidState {
        expected: ExecutionState,
        actual: ExecutionState,
    },
}

impl EngineError {
    /// Id of the node the error originates from, when there is one.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            EngineError::MissingSource { consumer_id, .. } => Some(consumer_id.as_str()),
            EngineError::CyclicDependency { node_id }
            | EngineError::UnknownTransform { node_id, .. }
            | EngineError::UnknownOutput { node_id, .. }
            | EngineError::ReferenceResolution { node_id, .. }
            | EngineError::TransformInit { node_id, .. }
            | EngineError::TileCompute { node_id, .. } => Some(node_id.as_str()),
            _ => None,
        }
    }
}

fn name_list(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn wrapped_errors_keep_node_and_cause() {
        let err = EngineError::TransformInit {
            node_id: "baz".into(),
            source: TransformError::MissingParameter {
                name: "threshold".into(),
            },
        };
        assert_eq!(err.node_id(), Some("baz"));
        assert!(err.to_string().contains("baz"));
        let cause = err.source().map(|e| e.to_string()).unwrap_or_default();
        assert!(cause.contains("threshold"));
    }

    #[test]
    fn tile_error_converts_into_transform_error() {
        let err: TransformError = TileError::ChannelOutOfRange {
            producer: "a".into(),
            channel: 3,
            count: 1,
        }
        .into();
        assert!(matches!(err, TransformError::SourceTile(_)));
    }
}
