//! Core graph data structures.

use crate::config::ConfigElement;
use crate::error::{GraphError, GraphResult};
use crate::header::Header;
use crate::indexing::same_id;

/// A named input slot of a node, fed by another node or by an external source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSource {
    /// Input slot name on the consuming node.
    pub role: String,
    /// Id of the producing node, or the name of an external source.
    pub source_node_id: String,
    /// Named output of the producer; `None` selects its primary output.
    pub output: Option<String>,
}

impl NodeSource {
    pub fn new(role: impl Into<String>, source_node_id: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            source_node_id: source_node_id.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// A single processing step: a transform, its inputs and its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    /// Registry name of the transform to instantiate.
    pub transform: String,
    pub sources: Vec<NodeSource>,
    pub config: ConfigElement,
}

impl Node {
    pub fn new(id: impl Into<String>, transform: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transform: transform.into(),
            sources: Vec::new(),
            config: ConfigElement::parameters(),
        }
    }

    /// Add a source fed by the primary output of `source_node_id`.
    pub fn with_source(mut self, role: impl Into<String>, source_node_id: impl Into<String>) -> Self {
        self.sources.push(NodeSource::new(role, source_node_id));
        self
    }

    /// Add a literal parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.add_child(ConfigElement::leaf(name, value));
        self
    }

    /// Add a parameter whose value is resolved at initialization time.
    pub fn with_reference(mut self, name: impl Into<String>, refid: impl Into<String>) -> Self {
        self.config.add_child(ConfigElement::reference(name, refid));
        self
    }

    pub fn with_config(mut self, config: ConfigElement) -> Self {
        self.config = config;
        self
    }

    pub fn add_source(&mut self, source: NodeSource) {
        self.sources.push(source);
    }

    /// Source bound to `role`, if any.
    pub fn source(&self, role: &str) -> Option<&NodeSource> {
        self.sources.iter().find(|s| s.role == role)
    }
}

/// A processing graph: an ordered collection of nodes plus header and
/// application data.
///
/// Node order is preserved and used as the default iteration order; it is not
/// an execution order. Ids are unique when compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Graph {
    id: String,
    header: Option<Header>,
    nodes: Vec<Node>,
    application_data: Vec<(String, ConfigElement)>,
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return all nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a node.
    ///
    /// Fails with [`GraphError::DuplicateNodeId`] when a node with the same id
    /// already exists, compared case-insensitively.
    pub fn add_node(&mut self, node: Node) -> GraphResult<()> {
        if self.contains(&node.id) {
            return Err(GraphError::DuplicateNodeId { id: node.id });
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| same_id(&n.id, id))
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| same_id(&n.id, id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Position of a node in insertion order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| same_id(&n.id, id))
    }

    /// Remove a node by id. Removing an absent node is a no-op.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let position = self.position(id)?;
        Some(self.nodes.remove(position))
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn set_header(&mut self, header: Header) {
        self.header = Some(header);
    }

    /// Free-form data attached by an application, e.g. a graph editor layout.
    pub fn application_data(&self, id: &str) -> Option<&ConfigElement> {
        self.application_data
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v)
    }

    pub fn application_data_entries(&self) -> &[(String, ConfigElement)] {
        &self.application_data
    }

    pub fn set_application_data(&mut self, id: impl Into<String>, data: ConfigElement) {
        let id = id.into();
        match self.application_data.iter_mut().find(|(k, _)| *k == id) {
            Some(slot) => slot.1 = data,
            None => self.application_data.push((id, data)),
        }
    }

    /// Check structural invariants. See [`crate::validate_graph`].
    pub fn validate(&self) -> GraphResult<()> {
        crate::validate::validate_graph(self)
    }

    #[cfg(test)]
    pub(crate) fn push_unchecked(&mut self, node: Node) {
        self.nodes.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_rejects_case_insensitive_duplicate() {
        let mut graph = Graph::new("g");
        graph.add_node(Node::new("node1", "Op1")).unwrap();
        let err = graph.add_node(Node::new("NODE1", "Op2")).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateNodeId {
                id: "NODE1".to_string()
            }
        );
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut graph = Graph::new("g");
        graph.add_node(Node::new("Grunt", "Op1")).unwrap();
        assert_eq!(graph.node("grunt").map(|n| n.transform.as_str()), Some("Op1"));
        assert!(graph.node("missing").is_none());
    }

    #[test]
    fn remove_node_is_idempotent() {
        let mut graph = Graph::new("g");
        graph.add_node(Node::new("a", "Op1")).unwrap();
        assert!(graph.remove_node("A").is_some());
        assert!(graph.remove_node("a").is_none());
        assert!(graph.is_empty());
    }

    #[test]
    fn node_builders() {
        let node = Node::new("baz", "Op2")
            .with_source("input", "grunt")
            .with_parameter("threshold", "0.86")
            .with_reference("expression", "regex");
        assert_eq!(node.source("input").map(|s| s.source_node_id.as_str()), Some("grunt"));
        assert_eq!(node.config.child_count(), 2);
        assert_eq!(node.config.child("expression").and_then(|c| c.refid()), Some("regex"));
    }

    #[test]
    fn application_data_is_replaced_by_id() {
        let mut graph = Graph::new("g");
        graph.set_application_data("foo", ConfigElement::leaf("font", "big"));
        graph.set_application_data("foo", ConfigElement::leaf("font", "small"));
        assert_eq!(graph.application_data_entries().len(), 1);
        assert_eq!(graph.application_data("foo").and_then(|d| d.value()), Some("small"));
    }
}
