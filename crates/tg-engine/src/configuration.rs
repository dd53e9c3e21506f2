//! Resolution of `refid` references in node configurations.
//!
//! A top-level parameter carrying a `refid` attribute is a placeholder:
//!
//! - `refid="threshold"` substitutes an external value (or the graph header's
//!   default for that parameter);
//! - `refid="stats.mean"` installs a deferred read of property `mean` of the
//!   transform of node `stats`.
//!
//! Parameters without the attribute pass through unchanged.

use std::sync::{Arc, Weak};

use tg_core::ParamValue;
use tg_graph::ConfigElement;

use crate::error::{EngineError, EngineResult, ReferenceError, TransformError, TransformResult};
use crate::transform::Transform;

/// A parsed `refid` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    External {
        parameter: String,
        name: String,
    },
    PeerProperty {
        parameter: String,
        node_id: String,
        property: String,
    },
}

impl Reference {
    /// Parse the `refid` of `parameter`. The first `.` separates peer and property.
    pub fn parse(parameter: &str, refid: &str) -> Result<Self, ReferenceError> {
        let malformed = || ReferenceError::Malformed {
            refid: refid.to_string(),
        };
        let refid_trimmed = refid.trim();
        if refid_trimmed.is_empty() {
            return Err(malformed());
        }
        match refid_trimmed.split_once('.') {
            Some((node_id, property)) => {
                if node_id.is_empty() || property.is_empty() {
                    return Err(malformed());
                }
                Ok(Reference::PeerProperty {
                    parameter: parameter.to_string(),
                    node_id: node_id.to_string(),
                    property: property.to_string(),
                })
            }
            None => Ok(Reference::External {
                parameter: parameter.to_string(),
                name: refid_trimmed.to_string(),
            }),
        }
    }

    /// Name of the parameter the reference stands in for.
    pub fn parameter(&self) -> &str {
        match self {
            Reference::External { parameter, .. } | Reference::PeerProperty { parameter, .. } => parameter,
        }
    }

    pub fn peer(&self) -> Option<&str> {
        match self {
            Reference::PeerProperty { node_id, .. } => Some(node_id),
            Reference::External { .. } => None,
        }
    }
}

/// References among the top-level parameters of `config`, in order.
pub fn references(config: &ConfigElement) -> Vec<Result<Reference, ReferenceError>> {
    config
        .children()
        .iter()
        .filter_map(|child| child.refid().map(|refid| Reference::parse(child.name(), refid)))
        .collect()
}

/// What the resolver needs from the surrounding graph.
pub trait ReferenceLookup {
    /// Value of external parameter `name`.
    fn external_value(&self, name: &str) -> Option<ParamValue>;

    /// Transform of an initialized peer node.
    fn peer_transform(&self, node_id: &str) -> Result<Arc<dyn Transform>, ReferenceError>;
}

/// Deferred read of a peer's target property.
#[derive(Clone)]
pub struct PropertyRef {
    node_id: String,
    property: String,
    transform: Weak<dyn Transform>,
}

impl PropertyRef {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Read the property now. Fails once the peer has been disposed.
    pub fn read(&self) -> Result<ParamValue, ReferenceError> {
        let transform = self.transform.upgrade().ok_or_else(|| ReferenceError::PeerDisposed {
            node_id: self.node_id.clone(),
        })?;
        transform
            .target_property(&self.property)
            .ok_or_else(|| ReferenceError::UnknownProperty {
                node_id: self.node_id.clone(),
                property: self.property.clone(),
                available: transform.target_property_names(),
            })
    }
}

impl std::fmt::Debug for PropertyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PropertyRef({}.{})", self.node_id, self.property)
    }
}

/// A top-level parameter after resolution.
#[derive(Debug, Clone)]
pub enum ResolvedParam {
    Element(ConfigElement),
    Value(ParamValue),
    Property(PropertyRef),
}

impl ResolvedParam {
    /// Current scalar value, if the parameter has one.
    pub fn value(&self) -> Result<Option<ParamValue>, ReferenceError> {
        match self {
            ResolvedParam::Element(element) => Ok(element.value().map(ParamValue::from)),
            ResolvedParam::Value(value) => Ok(Some(value.clone())),
            ResolvedParam::Property(property) => property.read().map(Some),
        }
    }
}

/// A node's configuration with every reference resolved.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    params: Vec<(String, ResolvedParam)>,
}

impl ResolvedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, param: ResolvedParam) {
        let name = name.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = param,
            None => self.params.push((name, param)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, ResolvedParam::Value(value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedParam> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Nested configuration element, for structured parameters.
    pub fn element(&self, name: &str) -> Option<&ConfigElement> {
        match self.get(name)? {
            ResolvedParam::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Current value of a parameter; property references are read now.
    pub fn value(&self, name: &str) -> TransformResult<Option<ParamValue>> {
        match self.get(name) {
            Some(param) => Ok(param.value()?),
            None => Ok(None),
        }
    }

    pub fn require(&self, name: &str) -> TransformResult<ParamValue> {
        self.value(name)?.ok_or_else(|| TransformError::MissingParameter { name: name.to_string() })
    }

    pub fn f64(&self, name: &str) -> TransformResult<f64> {
        self.require(name)?.as_f64().map_err(|e| invalid(name, e))
    }

    pub fn f64_or(&self, name: &str, default: f64) -> TransformResult<f64> {
        match self.value(name)? {
            Some(v) => v.as_f64().map_err(|e| invalid(name, e)),
            None => Ok(default),
        }
    }

    pub fn u32_or(&self, name: &str, default: u32) -> TransformResult<u32> {
        match self.value(name)? {
            Some(v) => {
                let n = v.as_i64().map_err(|e| invalid(name, e))?;
                u32::try_from(n).map_err(|_| TransformError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("{n} is not a valid size"),
                })
            }
            None => Ok(default),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> TransformResult<bool> {
        match self.value(name)? {
            Some(v) => v.as_bool().map_err(|e| invalid(name, e)),
            None => Ok(default),
        }
    }

    pub fn text(&self, name: &str) -> TransformResult<Option<String>> {
        Ok(self.value(name)?.map(|v| v.as_text()))
    }
}

fn invalid(name: &str, err: tg_core::TgError) -> TransformError {
    TransformError::InvalidParameter {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

/// Resolve the configuration of node `node_id`.
///
/// Peers named by property references must already be initialized.
pub fn resolve_config(node_id: &str, config: &ConfigElement, lookup: &dyn ReferenceLookup) -> EngineResult<ResolvedConfig> {
    let mut resolved = ResolvedConfig::new();
    for child in config.children() {
        let Some(refid) = child.refid() else {
            resolved.insert(child.name(), ResolvedParam::Element(child.clone()));
            continue;
        };
        let fail = |source| EngineError::ReferenceResolution {
            node_id: node_id.to_string(),
            parameter: child.name().to_string(),
            source,
        };
        let param = match Reference::parse(child.name(), refid).map_err(fail)? {
            Reference::External { name, .. } => {
                let value = lookup
                    .external_value(&name)
                    .ok_or_else(|| fail(ReferenceError::UnknownExternal { name }))?;
                ResolvedParam::Value(value)
            }
            Reference::PeerProperty { node_id: peer, property, .. } => {
                let transform = lookup.peer_transform(&peer).map_err(fail)?;
                if transform.target_property(&property).is_none() {
                    return Err(fail(ReferenceError::UnknownProperty {
                        node_id: peer,
                        property,
                        available: transform.target_property_names(),
                    }));
                }
                ResolvedParam::Property(PropertyRef {
                    node_id: peer,
                    property,
                    transform: Arc::downgrade(&transform),
                })
            }
        };
        resolved.insert(child.name(), param);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::ConstantTransform;
    use std::collections::HashMap;

    struct Lookup {
        externals: HashMap<String, ParamValue>,
        peers: HashMap<String, Arc<dyn Transform>>,
    }

    impl ReferenceLookup for Lookup {
        fn external_value(&self, name: &str) -> Option<ParamValue> {
            self.externals.get(name).cloned()
        }

        fn peer_transform(&self, node_id: &str) -> Result<Arc<dyn Transform>, ReferenceError> {
            self.peers.get(node_id).cloned().ok_or_else(|| ReferenceError::UnknownPeer {
                node_id: node_id.to_string(),
            })
        }
    }

    fn lookup() -> Lookup {
        let mut constant = ConstantTransform::new(4, 4, 3.142);
        constant.initialize().unwrap();
        let mut peers: HashMap<String, Arc<dyn Transform>> = HashMap::new();
        peers.insert("bert".into(), Arc::new(constant));
        let mut externals = HashMap::new();
        externals.insert("threshold".into(), ParamValue::Float(0.5));
        Lookup { externals, peers }
    }

    #[test]
    fn parse_splits_at_first_dot() {
        let r = Reference::parse("p", "node.prop.sub").unwrap();
        assert_eq!(
            r,
            Reference::PeerProperty {
                parameter: "p".into(),
                node_id: "node".into(),
                property: "prop.sub".into(),
            }
        );
        assert!(matches!(Reference::parse("p", "name").unwrap(), Reference::External { .. }));
        assert!(Reference::parse("p", ".prop").is_err());
        assert!(Reference::parse("p", "node.").is_err());
        assert!(Reference::parse("p", "  ").is_err());
    }

    #[test]
    fn resolves_externals_properties_and_plain_values() {
        let config = ConfigElement::parameters()
            .with_child(ConfigElement::leaf("factor", "2"))
            .with_child(ConfigElement::reference("threshold", "threshold"))
            .with_child(ConfigElement::reference("pi", "bert.value"));
        let lookup = lookup();
        let resolved = resolve_config("ernie", &config, &lookup).unwrap();

        assert_eq!(resolved.f64("factor").unwrap(), 2.0);
        assert_eq!(resolved.f64("threshold").unwrap(), 0.5);
        assert!((resolved.f64("pi").unwrap() - 3.142).abs() < 1e-12);
        assert_eq!(resolved.names().collect::<Vec<_>>(), ["factor", "threshold", "pi"]);
    }

    #[test]
    fn unknown_references_fail_with_parameter_name() {
        let lookup = lookup();
        let config = ConfigElement::parameters().with_child(ConfigElement::reference("x", "nope"));
        let err = resolve_config("ernie", &config, &lookup).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ReferenceResolution { ref node_id, ref parameter, source: ReferenceError::UnknownExternal { .. } }
                if node_id == "ernie" && parameter == "x"
        ));

        let config = ConfigElement::parameters().with_child(ConfigElement::reference("x", "bert.missing"));
        let err = resolve_config("ernie", &config, &lookup).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ReferenceResolution { source: ReferenceError::UnknownProperty { .. }, .. }
        ));

        let config = ConfigElement::parameters().with_child(ConfigElement::reference("x", "oscar.value"));
        let err = resolve_config("ernie", &config, &lookup).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ReferenceResolution { source: ReferenceError::UnknownPeer { .. }, .. }
        ));
    }

    #[test]
    fn property_read_fails_after_peer_dropped() {
        let mut lookup = lookup();
        let config = ConfigElement::parameters().with_child(ConfigElement::reference("pi", "bert.value"));
        let resolved = resolve_config("ernie", &config, &lookup).unwrap();
        lookup.peers.clear();
        let err = resolved.f64("pi").unwrap_err();
        assert!(matches!(
            err,
            TransformError::Reference(ReferenceError::PeerDisposed { .. })
        ));
    }

    #[test]
    fn typed_accessors_report_bad_values() {
        let config = ResolvedConfig::new().with("width", "wide").with("flag", true);
        assert!(matches!(config.u32_or("width", 1), Err(TransformError::InvalidParameter { .. })));
        assert_eq!(config.u32_or("height", 7).unwrap(), 7);
        assert!(config.bool_or("flag", false).unwrap());
        assert!(matches!(config.f64("absent"), Err(TransformError::MissingParameter { .. })));
    }
}
