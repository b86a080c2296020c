//! Parser for sprig component definitions.
//!
//! This crate turns markup into a tree and a definition element into its
//! cleaned template plus the declared members:
//!
//! - [`markup`]: lenient markup tokenizer and tree builder
//! - [`arguments`]: the `(a, b, c)` argument-list grammar
//! - [`walker`]: classifies a definition's direct children
//! - [`extractor`]: builds declaration records and cleans the definition

pub mod arguments;
pub mod elements;
pub mod extractor;
pub mod markup;
pub mod walker;

pub use arguments::parse_argument_list;
pub use elements::{is_standard_element, CustomElementLookup, NoCustomElements};
pub use extractor::extract_declarations;
pub use markup::{parse_first_element, parse_fragment};
pub use walker::{classify_children, Classification};

use sprig_core::{DeclarationMap, Element, ParseError, ScriptEngine};
use tracing::debug;

/// A definition after extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDefinition {
    /// The definition root with method declarations and invalid blocks removed.
    pub element: Element,
    pub declarations: DeclarationMap,
}

impl ParsedDefinition {
    pub fn tag_name(&self) -> &str {
        &self.element.tag
    }
}

/// Parse a component definition.
///
/// # Example
///
/// ```ignore
/// use sprig_parser::{parse_definition, parse_first_element, NoCustomElements};
/// use sprig_script::MiniScript;
///
/// let root = parse_first_element("<my-widget><count>0</count></my-widget>").unwrap();
/// let parsed = parse_definition(root, &NoCustomElements, &MiniScript::new())?;
/// assert!(parsed.declarations.contains_key("count"));
/// ```
pub fn parse_definition(
    mut element: Element,
    lookup: &dyn CustomElementLookup,
    engine: &dyn ScriptEngine,
) -> Result<ParsedDefinition, ParseError> {
    let declarations = extract_declarations(&mut element, lookup, engine)?;
    debug!(
        tag = %element.tag,
        declarations = declarations.len(),
        "parsed definition"
    );
    Ok(ParsedDefinition {
        element,
        declarations,
    })
}
