//! Graph header: the graph's declared external interface.

use crate::indexing::same_id;

/// An external source the graph expects to be supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderSource {
    pub name: String,
    pub optional: bool,
    pub description: Option<String>,
    /// Default location hint for the caller, e.g. a file path.
    pub location: Option<String>,
}

impl HeaderSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// An external parameter the graph's configuration may reference by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderParameter {
    pub name: String,
    pub param_type: Option<String>,
    pub default_value: Option<String>,
    pub description: Option<String>,
    pub interval: Option<String>,
    pub value_set: Vec<String>,
}

impl HeaderParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    /// Id of the node whose output is the graph's primary product.
    pub target: Option<String>,
    pub sources: Vec<HeaderSource>,
    pub parameters: Vec<HeaderParameter>,
}

impl Header {
    /// Declared source by name, case-insensitive like node ids.
    pub fn source(&self, name: &str) -> Option<&HeaderSource> {
        self.sources.iter().find(|s| same_id(&s.name, name))
    }

    /// Declared parameter by name, case-insensitive like node ids.
    pub fn parameter(&self, name: &str) -> Option<&HeaderParameter> {
        self.parameters.iter().find(|p| same_id(&p.name, name))
    }
}
