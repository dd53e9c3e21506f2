//! Resolved node index.
//!
//! Maps case-insensitive node ids to contiguous [`NodeId`] handles once, so
//! later phases work with O(1) indices instead of repeated string search.

use std::collections::HashMap;
use tg_core::NodeId;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

/// Case-insensitive id comparison used throughout the graph layer.
pub fn same_id(a: &str, b: &str) -> bool {
    a == b || normalize_id(a) == normalize_id(b)
}

/// Canonical lookup key for a node id.
pub fn normalize_id(id: &str) -> String {
    id.to_lowercase()
}

/// Index map from node ids to contiguous handles (graph insertion order).
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    /// Contiguous list of node ids as written in the graph (index -> id).
    ids: Vec<String>,

    /// Reverse lookup: normalized id -> handle.
    lookup: HashMap<String, NodeId>,
}

impl NodeIndex {
    /// Build an index from a graph, rejecting duplicate ids.
    pub fn from_graph(graph: &Graph) -> GraphResult<Self> {
        let mut ids = Vec::with_capacity(graph.node_count());
        let mut lookup = HashMap::with_capacity(graph.node_count());

        for (i, node) in graph.nodes().iter().enumerate() {
            let handle = NodeId::from_usize(i);
            if lookup.insert(normalize_id(&node.id), handle).is_some() {
                return Err(GraphError::DuplicateNodeId {
                    id: node.id.clone(),
                });
            }
            ids.push(node.id.clone());
        }

        Ok(Self { ids, lookup })
    }

    /// Number of nodes in the index.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolve an id (case-insensitive) to its handle.
    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.lookup.get(&normalize_id(id)).copied()
    }

    /// Resolve an id or fail with [`GraphError::NodeNotFound`].
    pub fn require(&self, id: &str) -> GraphResult<NodeId> {
        self.get(id).ok_or_else(|| GraphError::NodeNotFound { id: id.to_string() })
    }

    /// Get the id written in the graph for a handle (panics if out of bounds).
    pub fn id(&self, handle: NodeId) -> &str {
        &self.ids[handle.slot()]
    }

    /// Iterate over all handles in graph order.
    pub fn handles(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.ids.len()).map(NodeId::from_usize)
    }
}
