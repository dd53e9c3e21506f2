//! Integration tests for tg-graph.

use tg_graph::{
    ConfigElement, Graph, GraphBuilder, GraphError, Header, HeaderParameter, HeaderSource, Node,
    NodeIndex, NodeSource,
};

#[test]
fn empty_graph() {
    let graph = GraphBuilder::new("myEmptyChain").build().unwrap();

    assert_eq!(graph.id(), "myEmptyChain");
    assert_eq!(graph.node_count(), 0);
    assert!(graph.is_empty());

    let index = NodeIndex::from_graph(&graph).unwrap();
    assert!(index.is_empty());
}

#[test]
fn one_node_graph() {
    let mut graph = Graph::new("myOneNodeGraph");
    graph.add_node(Node::new("node1", "Op1")).unwrap();

    let node = graph.node("node1").unwrap();
    assert_eq!(node.transform, "Op1");
    assert!(node.sources.is_empty());
    assert!(node.config.is_empty());
}

#[test]
fn three_node_graph_preserves_order_and_sources() {
    // grunt -> baz -> bar, grunt -> bar
    let mut builder = GraphBuilder::new("foo");
    builder
        .add_node(Node::new("grunt", "Op1"))
        .add_node(
            Node::new("baz", "Op2")
                .with_source("input", "grunt")
                .with_parameter("threshold", "0.86"),
        )
        .add_node(
            Node::new("bar", "Op3")
                .with_source("input1", "grunt")
                .with_source("input2", "baz")
                .with_parameter("ignoreSign", "true")
                .with_parameter("expression", "A+B"),
        );
    let graph = builder.build().unwrap();

    let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["grunt", "baz", "bar"]);

    let bar = graph.node("bar").unwrap();
    let producers: Vec<&str> = bar
        .sources
        .iter()
        .map(|s| s.source_node_id.as_str())
        .collect();
    assert_eq!(producers, vec!["grunt", "baz"]);
    assert_eq!(
        bar.config.child("expression").and_then(|c| c.value()),
        Some("A+B")
    );

    let index = NodeIndex::from_graph(&graph).unwrap();
    assert_eq!(index.get("BAZ").unwrap().index(), 1);
}

#[test]
fn header_describes_external_interface() {
    let header = Header {
        target: Some("node1".into()),
        sources: vec![
            HeaderSource::new("input1").optional(),
            HeaderSource {
                location: Some("C:\\data\\x.dim".into()),
                ..HeaderSource::new("input2")
            },
        ],
        parameters: vec![
            HeaderParameter::new("ignore").with_default("true"),
            HeaderParameter {
                interval: Some("(0,1]".into()),
                param_type: Some("double".into()),
                ..HeaderParameter::new("threshold")
            },
        ],
    };
    let mut builder = GraphBuilder::new("myOneNodeGraph");
    builder.header(header).add_node(
        Node::new("node1", "Op1")
            .with_source("toa", "input1")
            .with_source("chris", "input2")
            .with_reference("ignoreSign", "ignore"),
    );
    let graph = builder.build().unwrap();

    let header = graph.header().unwrap();
    assert_eq!(header.target.as_deref(), Some("node1"));
    assert!(header.source("input1").unwrap().optional);
    assert!(!header.source("input2").unwrap().optional);
    assert_eq!(
        header.parameter("ignore").unwrap().default_value.as_deref(),
        Some("true")
    );
    assert_eq!(header.parameter("threshold").unwrap().interval.as_deref(), Some("(0,1]"));
}

#[test]
fn named_outputs_on_sources() {
    let mut node = Node::new("c", "Sum");
    node.add_source(NodeSource::new("a", "split").with_output("high"));
    assert_eq!(node.source("a").unwrap().output.as_deref(), Some("high"));
}

#[test]
fn duplicate_insert_leaves_graph_unchanged() {
    let mut graph = Graph::new("g");
    graph.add_node(Node::new("A", "Op1")).unwrap();
    let before = graph.clone();

    let err = graph.add_node(Node::new("a", "Op2")).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateNodeId { .. }));
    assert_eq!(graph, before);
}

#[test]
fn application_data_round_trip() {
    let mut graph = Graph::new("g");
    let data = ConfigElement::new("")
        .with_child(ConfigElement::leaf("font", "Big"))
        .with_child(ConfigElement::leaf("colour", "red"));
    graph.set_application_data("foo", data);
    let foo = graph.application_data("foo").unwrap();
    assert_eq!(foo.child_count(), 2);
    assert_eq!(foo.child("font").and_then(|c| c.value()), Some("Big"));
}

#[test]
fn large_graph() {
    let mut builder = GraphBuilder::new("chain");
    builder.add_node(Node::new("n0", "Constant"));
    for i in 1..100 {
        builder.add_node(Node::new(format!("n{}", i), "Scale").with_source("source", format!("n{}", i - 1)));
    }
    let graph = builder.build().unwrap();
    assert_eq!(graph.node_count(), 100);

    let index = NodeIndex::from_graph(&graph).unwrap();
    for (i, node) in graph.nodes().iter().enumerate().take(10) {
        assert_eq!(index.get(&node.id).unwrap().slot(), i);
    }
}
