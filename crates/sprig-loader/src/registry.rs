//! Registry of imported, failed and defined components.

use std::sync::Arc;

use indexmap::IndexMap;
use sprig_core::{Element, LoadError, RegistryError};
use sprig_parser::CustomElementLookup;
use sprig_synth::{ElementInstance, SynthesizedType};
use tracing::{info, warn};

/// Component state for one document.
///
/// All three maps only grow until [`reset`](Registry::reset).
#[derive(Debug, Default)]
pub struct Registry {
    imported: IndexMap<String, Element>,
    failed: IndexMap<String, LoadError>,
    defined: IndexMap<String, Arc<SynthesizedType>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synthesized type. The first registration of a tag wins.
    pub fn define(&mut self, ty: SynthesizedType) -> Result<Arc<SynthesizedType>, RegistryError> {
        let tag = ty.tag_name().to_ascii_lowercase();
        if self.defined.contains_key(&tag) {
            warn!(tag = %tag, "element already defined");
            return Err(RegistryError::AlreadyDefined { tag });
        }
        let ty = Arc::new(ty);
        self.defined.insert(tag, Arc::clone(&ty));
        info!(tag = %ty.tag_name(), class = %ty.class_name(), "registered element");
        Ok(ty)
    }

    pub fn get(&self, tag: &str) -> Option<Arc<SynthesizedType>> {
        self.defined.get(&tag.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.defined.contains_key(&tag.to_ascii_lowercase())
    }

    /// Defined tag names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defined.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }

    /// Instantiate a defined element.
    pub fn create_element(&self, tag: &str) -> Result<ElementInstance, RegistryError> {
        self.get(tag)
            .map(ElementInstance::new)
            .ok_or_else(|| RegistryError::NotDefined {
                tag: tag.to_ascii_lowercase(),
            })
    }

    /// Remember the source definition a tag was loaded from.
    pub fn record_import(&mut self, tag: &str, definition: Element) {
        self.imported.insert(tag.to_ascii_lowercase(), definition);
    }

    pub fn imported(&self, tag: &str) -> Option<&Element> {
        self.imported.get(&tag.to_ascii_lowercase())
    }

    pub fn imported_tags(&self) -> impl Iterator<Item = &str> {
        self.imported.keys().map(String::as_str)
    }

    /// Record a failed load under its source key.
    pub fn record_failure(&mut self, source_key: impl Into<String>, error: LoadError) {
        self.failed.insert(source_key.into(), error);
    }

    pub fn failure(&self, source_key: &str) -> Option<&LoadError> {
        self.failed.get(source_key)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &LoadError)> {
        self.failed.iter().map(|(key, err)| (key.as_str(), err))
    }

    /// Drop all state, e.g. on document teardown.
    pub fn reset(&mut self) {
        self.imported.clear();
        self.failed.clear();
        self.defined.clear();
    }
}

impl CustomElementLookup for Registry {
    fn is_defined(&self, tag: &str) -> bool {
        self.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_parser::{parse_definition, parse_first_element, NoCustomElements};
    use sprig_script::MiniScript;
    use sprig_synth::synthesize;

    fn synthesized(markup: &str) -> SynthesizedType {
        let engine = MiniScript::new();
        let element = parse_first_element(markup).unwrap();
        synthesize(parse_definition(element, &NoCustomElements, &engine).unwrap(), &engine).unwrap()
    }

    #[test]
    fn test_registry_new() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("my-widget").is_none());
    }

    #[test]
    fn test_registry_define() {
        let mut registry = Registry::new();
        registry.define(synthesized("<my-widget></my-widget>")).unwrap();

        assert!(registry.contains("my-widget"));
        assert!(registry.contains("MY-WIDGET"));
        assert!(registry.is_defined("my-widget"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["my-widget"]);
        assert_eq!(registry.get("my-widget").unwrap().class_name(), "MyWidget");
    }

    #[test]
    fn test_registry_duplicate_keeps_first() {
        let mut registry = Registry::new();
        registry
            .define(synthesized("<my-widget><first>1</first></my-widget>"))
            .unwrap();
        let err = registry
            .define(synthesized("<my-widget><second>2</second></my-widget>"))
            .unwrap_err();

        assert_eq!(
            err,
            RegistryError::AlreadyDefined {
                tag: "my-widget".into()
            }
        );
        let ty = registry.get("my-widget").unwrap();
        assert!(ty.member("first").is_some());
        assert!(ty.member("second").is_none());
    }

    #[test]
    fn test_registry_create_element() {
        let mut registry = Registry::new();
        registry.define(synthesized("<x-box><size>3</size></x-box>")).unwrap();

        let el = registry.create_element("x-box").unwrap();
        assert_eq!(el.tag_name(), "x-box");
        assert_eq!(el.field("size"), Some(&sprig_core::Value::Number(3.0)));

        assert_eq!(
            registry.create_element("y-box").unwrap_err(),
            RegistryError::NotDefined { tag: "y-box".into() }
        );
    }

    #[test]
    fn test_registry_reset() {
        let mut registry = Registry::new();
        registry.define(synthesized("<x-box></x-box>")).unwrap();
        registry.record_import("x-box", Element::new("x-box"));
        registry.record_failure(
            "inline#0",
            LoadError::InvalidDefinitionShape {
                reason: "empty".into(),
            },
        );
        assert!(registry.imported("x-box").is_some());
        assert!(registry.failure("inline#0").is_some());

        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.imported("x-box").is_none());
        assert_eq!(registry.failures().count(), 0);
    }
}
