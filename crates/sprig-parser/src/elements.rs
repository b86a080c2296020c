//! Known element names.
//!
//! A definition child is a declaration only when its tag is unknown to the
//! host: neither a standard HTML element nor an already registered custom
//! element.

use std::collections::{BTreeSet, HashSet};

/// Tags the host recognizes as HTML elements (including obsolete ones it
/// still maps to a dedicated element interface).
pub const STANDARD_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "address", "area", "article", "aside", "audio", "b", "base", "basefont",
    "bdi", "bdo", "big", "blockquote", "body", "br", "button", "canvas", "caption", "center",
    "cite", "code", "col", "colgroup", "data", "datalist", "dd", "del", "details", "dfn", "dialog",
    "dir", "div", "dl", "dt", "em", "embed", "fieldset", "figcaption", "figure", "font", "footer",
    "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup",
    "hr", "html", "i", "iframe", "img", "input", "ins", "kbd", "label", "legend", "li", "link",
    "main", "map", "mark", "marquee", "menu", "meta", "meter", "nav", "noscript", "object", "ol",
    "optgroup", "option", "output", "p", "param", "picture", "pre", "progress", "q", "rp", "rt",
    "ruby", "s", "samp", "script", "search", "section", "select", "slot", "small", "source",
    "span", "strike", "strong", "style", "sub", "summary", "sup", "svg", "math", "table", "tbody",
    "td", "template", "textarea", "tfoot", "th", "thead", "time", "title", "tr", "track", "tt",
    "u", "ul", "var", "video", "wbr",
];

pub fn is_standard_element(tag: &str) -> bool {
    STANDARD_ELEMENTS.iter().any(|s| s.eq_ignore_ascii_case(tag))
}

/// Answers whether a custom element name is already registered.
pub trait CustomElementLookup {
    fn is_defined(&self, tag: &str) -> bool;
}

/// Lookup for contexts with no registered custom elements.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCustomElements;

impl CustomElementLookup for NoCustomElements {
    fn is_defined(&self, _tag: &str) -> bool {
        false
    }
}

impl CustomElementLookup for HashSet<String> {
    fn is_defined(&self, tag: &str) -> bool {
        self.contains(tag)
    }
}

impl CustomElementLookup for BTreeSet<String> {
    fn is_defined(&self, tag: &str) -> bool {
        self.contains(tag)
    }
}

impl<L: CustomElementLookup + ?Sized> CustomElementLookup for &L {
    fn is_defined(&self, tag: &str) -> bool {
        (**self).is_defined(tag)
    }
}
