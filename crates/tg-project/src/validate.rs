//! Document validation logic.
//!
//! Checks what the graph layer cannot see: versions, header consistency and
//! execution settings. Node-level rules are enforced again when the document
//! is converted into a [`tg_graph::Graph`].

use std::collections::HashSet;

use tg_graph::normalize_id;

use crate::schema::{ExecutionDef, GraphDocument, HeaderDef, NodeDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_document(document: &GraphDocument) -> Result<(), ValidationError> {
    if document.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: document.version,
        });
    }

    let mut node_ids = HashSet::new();
    for node in &document.nodes {
        validate_node(node)?;
        if !node_ids.insert(normalize_id(&node.id)) {
            return Err(ValidationError::DuplicateId {
                id: node.id.clone(),
                context: format!("graph '{}' nodes", document.id),
            });
        }
    }

    if let Some(header) = &document.header {
        validate_header(header, &node_ids)?;
    }

    let mut app_ids = HashSet::new();
    for data in &document.application_data {
        if !app_ids.insert(&data.id) {
            return Err(ValidationError::DuplicateId {
                id: data.id.clone(),
                context: "application data".to_string(),
            });
        }
    }

    if let Some(execution) = &document.execution {
        validate_execution(execution)?;
    }

    Ok(())
}

fn validate_node(node: &NodeDef) -> Result<(), ValidationError> {
    if node.id.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "node id".to_string(),
            value: node.id.clone(),
            reason: "must not be blank".to_string(),
        });
    }
    if node.operator.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: format!("node '{}' operator", node.id),
            value: node.operator.clone(),
            reason: "must not be blank".to_string(),
        });
    }
    Ok(())
}

fn validate_header(header: &HeaderDef, node_ids: &HashSet<String>) -> Result<(), ValidationError> {
    if let Some(target) = &header.target {
        if !node_ids.contains(&normalize_id(target)) {
            return Err(ValidationError::MissingReference {
                id: target.clone(),
                context: "header target".to_string(),
            });
        }
    }

    let mut names = HashSet::new();
    for source in &header.sources {
        if node_ids.contains(&normalize_id(&source.name)) {
            return Err(ValidationError::InvalidValue {
                field: "header source".to_string(),
                value: source.name.clone(),
                reason: "shadows a node with the same id".to_string(),
            });
        }
        if !names.insert(normalize_id(&source.name)) {
            return Err(ValidationError::DuplicateId {
                id: source.name.clone(),
                context: "header sources".to_string(),
            });
        }
    }

    let mut names = HashSet::new();
    for parameter in &header.parameters {
        if !names.insert(normalize_id(&parameter.name)) {
            return Err(ValidationError::DuplicateId {
                id: parameter.name.clone(),
                context: "header parameters".to_string(),
            });
        }
        if let Some(default) = &parameter.default_value {
            if !parameter.value_set.is_empty() && !parameter.value_set.contains(default) {
                return Err(ValidationError::InvalidValue {
                    field: format!("header parameter '{}' default", parameter.name),
                    value: default.clone(),
                    reason: format!("not one of {:?}", parameter.value_set),
                });
            }
        }
    }

    Ok(())
}

fn validate_execution(execution: &ExecutionDef) -> Result<(), ValidationError> {
    for (field, value) in [("tile_width", execution.tile_width), ("tile_height", execution.tile_height)] {
        if value == 0 {
            return Err(ValidationError::InvalidValue {
                field: format!("execution {field}"),
                value: value.to_string(),
                reason: "must be positive".to_string(),
            });
        }
    }
    Ok(())
}
