//! Graph-specific error types.

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction and validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node with the same id (compared case-insensitively) already exists.
    DuplicateNodeId { id: String },

    /// A node has an empty or whitespace-only id.
    BlankNodeId { position: usize },

    /// A node names no transform.
    BlankTransform { node: String },

    /// A node source has an empty role name or an empty producer id.
    BlankSource { node: String, position: usize },

    /// Two sources of the same node use the same role name.
    DuplicateRole { node: String, role: String },

    /// Lookup of a node id that is not part of the graph.
    NodeNotFound { id: String },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::DuplicateNodeId { id } => {
                write!(f, "Duplicate node id '{}'", id)
            }
            GraphError::BlankNodeId { position } => {
                write!(f, "Node at position {} has a blank id", position)
            }
            GraphError::BlankTransform { node } => {
                write!(f, "Node '{}' does not name a transform", node)
            }
            GraphError::BlankSource { node, position } => {
                write!(
                    f,
                    "Source {} of node '{}' has a blank role or producer id",
                    position, node
                )
            }
            GraphError::DuplicateRole { node, role } => {
                write!(f, "Node '{}' declares source role '{}' twice", node, role)
            }
            GraphError::NodeNotFound { id } => {
                write!(f, "Node '{}' not found", id)
            }
        }
    }
}

impl std::error::Error for GraphError {}
