//! Opaque per-node configuration tree.
//!
//! A node's configuration is an element whose top-level children are its
//! parameters. A child carrying the [`REFID_ATTRIBUTE`] attribute is a
//! placeholder resolved when the graph is initialized.

/// Attribute marking a configuration entry as a reference.
pub const REFID_ATTRIBUTE: &str = "refid";

/// Name of the root element of a node configuration.
pub const PARAMETERS_ELEMENT: &str = "parameters";

/// A named element with an optional text value, attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigElement {
    name: String,
    value: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<ConfigElement>,
}

impl ConfigElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Empty parameter root for a node.
    pub fn parameters() -> Self {
        Self::new(PARAMETERS_ELEMENT)
    }

    /// Leaf element holding a text value.
    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name).with_value(value)
    }

    /// Leaf element pointing at an external parameter or a peer property.
    pub fn reference(name: impl Into<String>, refid: impl Into<String>) -> Self {
        Self::new(name).with_attribute(REFID_ATTRIBUTE, refid)
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: ConfigElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Set an attribute, replacing an existing one of the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// The `refid` marker, if this element is a reference.
    pub fn refid(&self) -> Option<&str> {
        self.attribute(REFID_ATTRIBUTE)
    }

    pub fn children(&self) -> &[ConfigElement] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&ConfigElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn add_child(&mut self, child: ConfigElement) {
        self.children.push(child);
    }

    /// Remove every child with the given name, returning how many were removed.
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|c| c.name != name);
        before - self.children.len()
    }

    /// True when the element has neither a value nor children.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }
}
