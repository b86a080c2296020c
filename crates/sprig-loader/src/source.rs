//! Definition sources and payload shapes.
//!
//! A `<component>` either names an external source with `src` (or `href`) or
//! carries its definition inline. Either way the payload must start with a
//! named `<template>` or a hyphenated element.

use sprig_core::{Element, LoadError, Node};
use url::Url;

/// Where a definition's markup comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionSource {
    Inline,
    External(Url),
}

/// The raw `src`, falling back to `href`. Empty values count as absent.
pub fn source_attribute(component: &Element) -> Option<&str> {
    ["src", "href"]
        .into_iter()
        .filter_map(|name| component.get_attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Whether the definition opts in to cross-origin loading.
pub fn allows_cross_origin(component: &Element) -> bool {
    ["cors", "allow-cors"].into_iter().any(|name| {
        component
            .get_attr(name)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    })
}

/// Resolve a definition's source against the document URL.
pub fn resolve_source(
    component: &Element,
    base_url: Option<&Url>,
) -> Result<DefinitionSource, LoadError> {
    let Some(src) = source_attribute(component) else {
        return Ok(DefinitionSource::Inline);
    };

    let parsed = match base_url {
        Some(base) => base.join(src),
        None => Url::parse(src),
    };
    let url = parsed.map_err(|err| LoadError::InvalidSourceUrl {
        src: src.to_string(),
        reason: err.to_string(),
    })?;

    let same_origin = base_url.is_some_and(|base| base.origin() == url.origin());
    if !same_origin && !allows_cross_origin(component) {
        return Err(LoadError::CrossOriginBlocked {
            url: url.to_string(),
        });
    }
    Ok(DefinitionSource::External(url))
}

/// Find the definition root in a payload.
///
/// The first element node decides: a `<template>` named by `id` (or, failing
/// that, `name`) becomes an element of that name with the template's
/// attributes and children; any other element must have a hyphenated tag.
pub fn resolve_definition_root(nodes: &[Node]) -> Result<Element, LoadError> {
    let Some(first) = nodes.iter().find_map(Node::as_element) else {
        return Err(invalid_shape("definition contains no element"));
    };

    if first.tag.eq_ignore_ascii_case("template") {
        let name = first
            .get_attr("id")
            .or_else(|| first.get_attr("name"))
            .unwrap_or_default();
        if !name.contains('-') {
            return Err(invalid_shape(
                "a template definition needs an id or name containing a hyphen",
            ));
        }
        return Ok(Element {
            tag: name.to_ascii_lowercase(),
            attributes: first.attributes.clone(),
            children: first.children.clone(),
        });
    }

    if !first.tag.contains('-') {
        return Err(invalid_shape(format!(
            "<{}> is neither a named template nor a hyphenated element",
            first.tag
        )));
    }
    Ok(first.clone())
}

fn invalid_shape(reason: impl Into<String>) -> LoadError {
    LoadError::InvalidDefinitionShape {
        reason: reason.into(),
    }
}
