//! Incremental graph builder.

use crate::config::ConfigElement;
use crate::error::GraphResult;
use crate::graph::{Graph, Node};
use crate::header::Header;
use crate::validate;

/// Builder for constructing a graph incrementally.
///
/// Use `add_node` to collect nodes, then call `build()` to validate them and
/// freeze them into a `Graph`.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    id: String,
    header: Option<Header>,
    nodes: Vec<Node>,
    application_data: Vec<(String, ConfigElement)>,
}

impl GraphBuilder {
    /// Create a new empty builder.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Add a node; duplicates are reported by `build()`.
    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn header(&mut self, header: Header) -> &mut Self {
        self.header = Some(header);
        self
    }

    pub fn application_data(&mut self, id: impl Into<String>, data: ConfigElement) -> &mut Self {
        self.application_data.push((id.into(), data));
        self
    }

    /// Number of nodes collected so far.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Build and validate the graph.
    pub fn build(self) -> GraphResult<Graph> {
        let mut graph = Graph::new(self.id);
        if let Some(header) = self.header {
            graph.set_header(header);
        }
        for (id, data) in self.application_data {
            graph.set_application_data(id, data);
        }
        for node in self.nodes {
            graph.add_node(node)?;
        }
        validate::validate_graph(&graph)?;
        Ok(graph)
    }
}
