use tg_graph::{Graph, Header, HeaderParameter, HeaderSource, Node, NodeSource};
use tg_project::{
    Format, GraphDocument, LATEST_VERSION, ProjectError, TemplateVars, ValidationError, load_document, load_json,
    load_yaml, parse_document, save_json, save_yaml,
};

fn sample_graph() -> Graph {
    let mut graph = Graph::new("ndvi-chain");
    graph.set_header(Header {
        target: Some("mask".to_string()),
        sources: vec![HeaderSource::new("scene"), HeaderSource::new("aux").optional()],
        parameters: vec![HeaderParameter::new("limit").with_default("0.3")],
    });
    graph
        .add_node(Node::new("scaled", "Scale").with_source("source", "scene").with_parameter("factor", "0.0001"))
        .unwrap();
    let mut mask = Node::new("mask", "Threshold").with_reference("threshold", "limit");
    mask.add_source(NodeSource::new("source", "scaled"));
    graph.add_node(mask).unwrap();
    let mut view = Node::new("view", "Scale");
    view.add_source(NodeSource::new("source", "mask").with_output("masked"));
    graph.add_node(view).unwrap();
    graph.set_application_data(
        "viewer",
        tg_graph::ConfigElement::new("applicationData").with_child(tg_graph::ConfigElement::leaf("zoom", "2")),
    );
    graph
}

#[test]
fn roundtrip_yaml_graph() {
    let graph = sample_graph();
    let document = GraphDocument::from_graph(&graph);

    let path = std::env::temp_dir().join("tg_project_roundtrip.yaml");
    save_yaml(&path, &document).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(loaded, document);
    let rebuilt = loaded.to_graph().unwrap();
    assert_eq!(rebuilt.node_count(), 3);
    assert_eq!(rebuilt.header(), graph.header());
    assert_eq!(
        rebuilt.node("mask").unwrap().config.child("threshold").and_then(|c| c.refid()),
        Some("limit")
    );
    assert_eq!(
        rebuilt.node("view").unwrap().sources[0].output.as_deref(),
        Some("masked")
    );
    assert_eq!(
        rebuilt.application_data("viewer").and_then(|d| d.child("zoom")).and_then(|z| z.value()),
        Some("2")
    );
}

#[test]
fn roundtrip_json_graph() {
    let document = GraphDocument::from_graph(&sample_graph());
    let path = std::env::temp_dir().join("tg_project_roundtrip.json");
    save_json(&path, &document).unwrap();
    assert_eq!(load_json(&path).unwrap(), document);
    assert_eq!(load_document(&path, &TemplateVars::new()).unwrap(), document);
}

#[test]
fn yaml_document_with_template_variables() {
    let text = r#"
version: 1
id: templated
nodes:
  - id: ramp
    operator: Ramp
    parameters:
      - name: width
        value: "${size}"
      - name: height
        value: "${size}"
execution:
  tile_width: ${tile}
  tile_height: ${tile}
"#;
    let vars: TemplateVars = [("size", "300"), ("tile", "128")].into_iter().collect();
    let document = parse_document(text, Format::Yaml, &vars).unwrap();

    assert_eq!(document.nodes[0].parameters[0].value.as_deref(), Some("300"));
    assert_eq!(document.tile_size().unwrap().map(|t| t.width), Some(128));

    let err = parse_document(text, Format::Yaml, &TemplateVars::new()).unwrap_err();
    assert!(matches!(err, ProjectError::UnknownVariable { .. }));
}

#[test]
fn missing_version_is_rejected() {
    let text = "id: g\nnodes: []\n";
    assert!(matches!(
        parse_document(text, Format::Yaml, &TemplateVars::new()),
        Err(ProjectError::Yaml(_))
    ));
}

#[test]
fn future_version_is_rejected() {
    let text = format!("version: {}\nid: g\n", LATEST_VERSION + 1);
    assert!(matches!(
        parse_document(&text, Format::Yaml, &TemplateVars::new()),
        Err(ProjectError::Validation(ValidationError::UnsupportedVersion { .. }))
    ));
}

#[test]
fn format_follows_extension() {
    assert_eq!(Format::from_path(std::path::Path::new("g.JSON")), Format::Json);
    assert_eq!(Format::from_path(std::path::Path::new("g.yml")), Format::Yaml);
    assert_eq!(Format::from_path(std::path::Path::new("graph")), Format::Yaml);
}
