//! Name to factory table consulted during initialization.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::configuration::ResolvedConfig;
use crate::error::{EngineError, EngineResult, TransformResult};
use crate::transform::{FnTransformFactory, SourceImages, Transform, TransformFactory};

/// Registered transform factories, keyed by name.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    factories: BTreeMap<String, Arc<dyn TransformFactory>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in transforms.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for factory in crate::builtin::factories() {
            registry.factories.insert(factory.name().to_string(), factory);
        }
        registry
    }

    /// Register a factory under its own name. Names must be unique.
    pub fn register(&mut self, factory: Arc<dyn TransformFactory>) -> EngineResult<()> {
        let name = factory.name().to_string();
        if self.factories.contains_key(&name) {
            return Err(EngineError::DuplicateTransform { name });
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, create: F) -> EngineResult<()>
    where
        F: Fn(&ResolvedConfig, &SourceImages) -> TransformResult<Box<dyn Transform>> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnTransformFactory::new(name, create)))
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn TransformFactory>> {
        self.factories.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TransformFactory>> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn factories(&self) -> impl Iterator<Item = &Arc<dyn TransformFactory>> {
        self.factories.values()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::ConstantTransform;

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = TransformRegistry::new();
        registry
            .register_fn("Const", |_, _| Ok(Box::new(ConstantTransform::new(1, 1, 0.0))))
            .unwrap();
        let err = registry
            .register_fn("Const", |_, _| Ok(Box::new(ConstantTransform::new(1, 1, 0.0))))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTransform { name } if name == "Const"));
    }

    #[test]
    fn builtins_are_listed_sorted() {
        let registry = TransformRegistry::with_builtins();
        let names: Vec<_> = registry.names().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(registry.contains("Constant"));
        assert!(registry.contains("Sum"));
    }

    #[test]
    fn unregister_removes_factory() {
        let mut registry = TransformRegistry::with_builtins();
        let before = registry.len();
        assert!(registry.unregister("Ramp").is_some());
        assert_eq!(registry.len(), before - 1);
        assert!(registry.get("Ramp").is_none());
    }
}
