//! tg-project: graph document format, templating and validation.

pub mod convert;
pub mod migrate;
pub mod schema;
pub mod template;
pub mod validate;

use std::path::Path;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use template::{TemplateVars, substitute};
pub use validate::{ValidationError, validate_document};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Template error: {what}")]
    Template { what: String },

    #[error("Unknown template variable: {name}")]
    UnknownVariable { name: String },

    #[error("Graph error: {0}")]
    Graph(#[from] tg_graph::GraphError),

    #[error("Invalid setting: {0}")]
    Core(#[from] tg_core::TgError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Document encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// `.json` is JSON, anything else is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// Parse, migrate and validate document text after template substitution.
pub fn parse_document(content: &str, format: Format, vars: &TemplateVars) -> ProjectResult<GraphDocument> {
    let content = substitute(content, vars)?;
    let mut document: GraphDocument = match format {
        Format::Yaml => serde_yaml::from_str(&content)?,
        Format::Json => serde_json::from_str(&content)?,
    };
    document = migrate_to_latest(document)?;
    validate_document(&document)?;
    Ok(document)
}

pub fn load_yaml(path: &Path) -> ProjectResult<GraphDocument> {
    load_yaml_with_vars(path, &TemplateVars::new())
}

pub fn load_yaml_with_vars(path: &Path, vars: &TemplateVars) -> ProjectResult<GraphDocument> {
    let content = std::fs::read_to_string(path)?;
    parse_document(&content, Format::Yaml, vars)
}

pub fn save_yaml(path: &Path, document: &GraphDocument) -> ProjectResult<()> {
    validate_document(document)?;
    let content = serde_yaml::to_string(document)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<GraphDocument> {
    load_json_with_vars(path, &TemplateVars::new())
}

pub fn load_json_with_vars(path: &Path, vars: &TemplateVars) -> ProjectResult<GraphDocument> {
    let content = std::fs::read_to_string(path)?;
    parse_document(&content, Format::Json, vars)
}

pub fn save_json(path: &Path, document: &GraphDocument) -> ProjectResult<()> {
    validate_document(document)?;
    let content = serde_json::to_string_pretty(document)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a document in the format its extension names.
pub fn load_document(path: &Path, vars: &TemplateVars) -> ProjectResult<GraphDocument> {
    match Format::from_path(path) {
        Format::Yaml => load_yaml_with_vars(path, vars),
        Format::Json => load_json_with_vars(path, vars),
    }
}
