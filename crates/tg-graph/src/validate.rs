//! Graph validation logic.

use std::collections::HashSet;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::indexing::normalize_id;

/// Validate the graph structure: ids present and unique, every node names a
/// transform, source roles are present and unique per node.
///
/// Dangling sources are not checked here; they may name external inputs and are
/// resolved when the graph is wired.
pub fn validate_graph(graph: &Graph) -> GraphResult<()> {
    let mut seen: HashSet<String> = HashSet::with_capacity(graph.node_count());

    for (position, node) in graph.nodes().iter().enumerate() {
        if node.id.trim().is_empty() {
            return Err(GraphError::BlankNodeId { position });
        }

        if !seen.insert(normalize_id(&node.id)) {
            return Err(GraphError::DuplicateNodeId {
                id: node.id.clone(),
            });
        }

        if node.transform.trim().is_empty() {
            return Err(GraphError::BlankTransform {
                node: node.id.clone(),
            });
        }

        let mut roles: HashSet<&str> = HashSet::with_capacity(node.sources.len());
        for (i, source) in node.sources.iter().enumerate() {
            if source.role.trim().is_empty() || source.source_node_id.trim().is_empty() {
                return Err(GraphError::BlankSource {
                    node: node.id.clone(),
                    position: i,
                });
            }
            if !roles.insert(source.role.as_str()) {
                return Err(GraphError::DuplicateRole {
                    node: node.id.clone(),
                    role: source.role.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeSource};

    #[test]
    fn validate_empty_graph() {
        assert!(validate_graph(&Graph::new("empty")).is_ok());
    }

    #[test]
    fn validate_blank_id() {
        let mut graph = Graph::new("g");
        graph.push_unchecked(Node::new("  ", "Op1"));
        assert_eq!(
            validate_graph(&graph),
            Err(GraphError::BlankNodeId { position: 0 })
        );
    }

    #[test]
    fn validate_duplicate_after_unchecked_insert() {
        let mut graph = Graph::new("g");
        graph.push_unchecked(Node::new("n", "Op1"));
        graph.push_unchecked(Node::new("N", "Op1"));
        assert!(matches!(
            validate_graph(&graph),
            Err(GraphError::DuplicateNodeId { .. })
        ));
    }

    #[test]
    fn validate_blank_transform() {
        let mut graph = Graph::new("g");
        graph.push_unchecked(Node::new("n", ""));
        assert!(matches!(
            validate_graph(&graph),
            Err(GraphError::BlankTransform { .. })
        ));
    }

    #[test]
    fn validate_duplicate_role() {
        let mut graph = Graph::new("g");
        let mut node = Node::new("c", "Op3");
        node.add_source(NodeSource::new("input", "a"));
        node.add_source(NodeSource::new("input", "b"));
        graph.push_unchecked(node);
        assert_eq!(
            validate_graph(&graph),
            Err(GraphError::DuplicateRole {
                node: "c".to_string(),
                role: "input".to_string()
            })
        );
    }

    #[test]
    fn dangling_sources_are_allowed_here() {
        let mut graph = Graph::new("g");
        graph
            .add_node(Node::new("c", "Op3").with_source("input", "externalProduct"))
            .unwrap();
        assert!(validate_graph(&graph).is_ok());
    }
}
