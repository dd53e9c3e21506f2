//! Conversion between documents and in-memory graphs.

use tg_core::TileSize;
use tg_graph::{
    ConfigElement, Graph, Header, HeaderParameter, HeaderSource, Node, NodeSource, REFID_ATTRIBUTE,
};

use crate::ProjectResult;
use crate::migrate::LATEST_VERSION;
use crate::schema::{
    AppDataDef, ExecutionDef, GraphDocument, HeaderDef, HeaderParameterDef, HeaderSourceDef, NodeDef,
    ParameterDef, SourceDef,
};

const APPLICATION_DATA_ELEMENT: &str = "applicationData";

impl GraphDocument {
    /// Build the graph described by this document.
    pub fn to_graph(&self) -> ProjectResult<Graph> {
        let mut graph = Graph::new(self.id.clone());
        for def in &self.nodes {
            graph.add_node(node_from_def(def))?;
        }
        if let Some(header) = &self.header {
            graph.set_header(header_from_def(header));
        }
        for data in &self.application_data {
            let element = data
                .parameters
                .iter()
                .fold(ConfigElement::new(APPLICATION_DATA_ELEMENT), |e, p| {
                    e.with_child(element_from_def(p))
                });
            graph.set_application_data(data.id.clone(), element);
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Describe `graph` as a document of the latest version.
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            version: LATEST_VERSION,
            id: graph.id().to_string(),
            header: graph.header().map(header_to_def),
            nodes: graph.nodes().iter().map(node_to_def).collect(),
            application_data: graph
                .application_data_entries()
                .iter()
                .map(|(id, element)| AppDataDef {
                    id: id.clone(),
                    parameters: element.children().iter().map(element_to_def).collect(),
                })
                .collect(),
            execution: None,
        }
    }

    pub fn with_tile_size(mut self, tile_size: TileSize) -> Self {
        self.execution = Some(ExecutionDef {
            tile_width: tile_size.width,
            tile_height: tile_size.height,
        });
        self
    }

    /// Tile size requested by the `execution` section, if any.
    pub fn tile_size(&self) -> ProjectResult<Option<TileSize>> {
        match &self.execution {
            Some(execution) => Ok(Some(TileSize::new(execution.tile_width, execution.tile_height)?)),
            None => Ok(None),
        }
    }
}

fn node_from_def(def: &NodeDef) -> Node {
    let mut node = Node::new(def.id.clone(), def.operator.clone());
    for source in &def.sources {
        let mut node_source = NodeSource::new(source.role.clone(), source.node.clone());
        node_source.output = source.output.clone();
        node.add_source(node_source);
    }
    for parameter in &def.parameters {
        node.config.add_child(element_from_def(parameter));
    }
    node
}

fn node_to_def(node: &Node) -> NodeDef {
    NodeDef {
        id: node.id.clone(),
        operator: node.transform.clone(),
        sources: node
            .sources
            .iter()
            .map(|s| SourceDef {
                role: s.role.clone(),
                node: s.source_node_id.clone(),
                output: s.output.clone(),
            })
            .collect(),
        parameters: node.config.children().iter().map(element_to_def).collect(),
    }
}

fn element_from_def(def: &ParameterDef) -> ConfigElement {
    let mut element = ConfigElement::new(def.name.clone());
    if let Some(value) = &def.value {
        element.set_value(value.clone());
    }
    for (name, value) in &def.attributes {
        element.set_attribute(name.clone(), value.clone());
    }
    if let Some(refid) = &def.refid {
        element.set_attribute(REFID_ATTRIBUTE, refid.clone());
    }
    for child in &def.children {
        element.add_child(element_from_def(child));
    }
    element
}

fn element_to_def(element: &ConfigElement) -> ParameterDef {
    ParameterDef {
        name: element.name().to_string(),
        value: element.value().map(str::to_string),
        refid: element.refid().map(str::to_string),
        attributes: element
            .attributes()
            .iter()
            .filter(|(name, _)| name != REFID_ATTRIBUTE)
            .cloned()
            .collect(),
        children: element.children().iter().map(element_to_def).collect(),
    }
}

fn header_from_def(def: &HeaderDef) -> Header {
    Header {
        target: def.target.clone(),
        sources: def
            .sources
            .iter()
            .map(|s| HeaderSource {
                name: s.name.clone(),
                optional: s.optional,
                description: s.description.clone(),
                location: s.location.clone(),
            })
            .collect(),
        parameters: def
            .parameters
            .iter()
            .map(|p| HeaderParameter {
                name: p.name.clone(),
                param_type: p.param_type.clone(),
                default_value: p.default_value.clone(),
                description: p.description.clone(),
                interval: p.interval.clone(),
                value_set: p.value_set.clone(),
            })
            .collect(),
    }
}

fn header_to_def(header: &Header) -> HeaderDef {
    HeaderDef {
        target: header.target.clone(),
        sources: header
            .sources
            .iter()
            .map(|s| HeaderSourceDef {
                name: s.name.clone(),
                optional: s.optional,
                description: s.description.clone(),
                location: s.location.clone(),
            })
            .collect(),
        parameters: header
            .parameters
            .iter()
            .map(|p| HeaderParameterDef {
                name: p.name.clone(),
                param_type: p.param_type.clone(),
                default_value: p.default_value.clone(),
                description: p.description.clone(),
                interval: p.interval.clone(),
                value_set: p.value_set.clone(),
            })
            .collect(),
    }
}
