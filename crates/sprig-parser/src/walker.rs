//! The definition walker.
//!
//! Walks the direct children of a definition and classifies each one. The
//! host parser turns an invalid block such as
//!
//! ```html
//! <@click (e)>console.log(e)</@click>
//! ```
//!
//! into a text node followed by the comment `@click`; the walker pairs those
//! two nodes back up.

use sprig_core::{Element, Node};
use tracing::debug;

use crate::elements::{is_standard_element, CustomElementLookup};

/// Prefix of a comment that closes an invalid declaration block.
pub const MARKER_PREFIX: char = '@';

/// How one definition child (or pair of children) is treated.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification<'a> {
    /// Whitespace-only text.
    Blank { index: usize },
    /// Ordinary content, left untouched.
    Structural { index: usize },
    /// Text immediately followed by a marker comment.
    DeclarationPair {
        text_index: usize,
        comment_index: usize,
        text: &'a str,
        marker: &'a str,
    },
    /// An element whose tag the host does not recognize.
    DeclarationElement { index: usize, element: &'a Element },
}

impl Classification<'_> {
    /// Child indices covered by this classification.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let (first, second) = match *self {
            Classification::Blank { index }
            | Classification::Structural { index }
            | Classification::DeclarationElement { index, .. } => (index, None),
            Classification::DeclarationPair {
                text_index,
                comment_index,
                ..
            } => (text_index, Some(comment_index)),
        };
        std::iter::once(first).chain(second)
    }
}

/// Closing-tag hint for a marker comment: `@click` → `</on-click>`.
pub fn closing_hint(marker: &str) -> String {
    let name = marker.strip_prefix(MARKER_PREFIX).unwrap_or(marker);
    format!("</on-{name}>")
}

#[derive(Debug, Clone, Copy)]
enum PendingState<'a> {
    None,
    SawText { index: usize, text: &'a str },
    SawComment {
        text_index: usize,
        text: &'a str,
        comment_index: usize,
        marker: &'a str,
    },
}

/// Whether an element is declaration-shaped.
pub fn is_declaration_element(element: &Element, lookup: &dyn CustomElementLookup) -> bool {
    !is_standard_element(&element.tag) && !lookup.is_defined(&element.tag)
}

/// Classify the direct children of a definition.
pub fn classify_children<'a>(
    definition: &'a Element,
    lookup: &dyn CustomElementLookup,
) -> Vec<Classification<'a>> {
    let mut out = Vec::with_capacity(definition.children.len());
    let mut state = PendingState::None;

    for (index, child) in definition.children.iter().enumerate() {
        if child.is_blank_text() {
            out.push(Classification::Blank { index });
            continue;
        }

        if let PendingState::SawText {
            index: text_index,
            text,
        } = state
        {
            match child {
                Node::Comment(marker) if marker.starts_with(MARKER_PREFIX) => {
                    debug!(marker = %marker, closing = %closing_hint(marker), "declaration block closed");
                    state = PendingState::SawComment {
                        text_index,
                        text,
                        comment_index: index,
                        marker,
                    };
                }
                _ => {
                    out.push(Classification::Structural { index: text_index });
                    state = PendingState::None;
                }
            }
        }

        if let PendingState::None = state {
            match child {
                Node::Text(text) => state = PendingState::SawText { index, text },
                Node::Element(element) if is_declaration_element(element, lookup) => {
                    debug!(tag = %element.tag, "declaration element");
                    out.push(Classification::DeclarationElement { index, element });
                }
                _ => out.push(Classification::Structural { index }),
            }
        }

        if let PendingState::SawComment {
            text_index,
            text,
            comment_index,
            marker,
        } = state
        {
            out.push(Classification::DeclarationPair {
                text_index,
                comment_index,
                text,
                marker,
            });
            state = PendingState::None;
        }
    }

    if let PendingState::SawText { index, .. } = state {
        out.push(Classification::Structural { index });
    }

    out
}
