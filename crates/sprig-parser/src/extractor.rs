//! Property and method extraction.
//!
//! Turns each declaration-shaped child found by the walker into a
//! [`DeclarationRecord`]. Method declarations and invalid-syntax blocks are
//! removed from the definition; property elements stay in place.

use std::collections::BTreeSet;

use sprig_core::{
    canonical_name, is_reserved_name, DeclarationMap, DeclarationRecord, Element, Lifecycle,
    Parameters, ParseError, ScriptEngine,
};
use tracing::{debug, warn};

use crate::arguments::parse_argument_list;
use crate::elements::CustomElementLookup;
use crate::walker::{classify_children, Classification, MARKER_PREFIX};

/// Re-join argument groups the host split at whitespace.
///
/// `<m (a, b)>` arrives as the attribute names `(a,` and `b)`; this yields
/// `(a, b)`. Names outside a group pass through unchanged.
pub fn coalesce_markers<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out = Vec::new();
    let mut group: Option<String> = None;

    for name in names {
        match group.as_mut() {
            Some(open) => {
                open.push(' ');
                open.push_str(name);
                if name.ends_with(')') {
                    out.extend(group.take());
                }
            }
            None if name.starts_with('(') && !name.ends_with(')') => {
                group = Some(name.to_string());
            }
            None => out.push(name.to_string()),
        }
    }

    // An unterminated group is still reported, and fails as unbalanced.
    out.extend(group);
    out
}

/// Parse every marker among `names`, failing on the first malformed one.
fn collect_markers<'a>(
    declaration: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<Parameters>, ParseError> {
    let mut markers = Vec::new();
    for name in coalesce_markers(names) {
        let parsed =
            parse_argument_list(&name).map_err(|reason| ParseError::MalformedArgumentList {
                marker: declaration.to_string(),
                reason,
            })?;
        markers.extend(parsed);
    }
    Ok(markers)
}

/// Build the record for one declaration once its markers are known.
fn build_record(
    name: String,
    mut markers: Vec<Parameters>,
    body: &str,
    engine: &dyn ScriptEngine,
) -> Result<DeclarationRecord, ParseError> {
    if markers.len() > 1 {
        return Err(ParseError::AmbiguousDeclarationShape {
            name,
            markers: markers.len(),
        });
    }

    if let Some(hook) = Lifecycle::from_name(&name) {
        let parameters = markers.pop().unwrap_or_else(|| {
            hook.default_parameters()
                .iter()
                .map(|p| p.to_string())
                .collect()
        });
        return Ok(DeclarationRecord::method(name, parameters, body));
    }

    match markers.pop() {
        Some(parameters) => Ok(DeclarationRecord::method(name, parameters, body)),
        None => {
            let value = engine
                .evaluate(body)
                .map_err(|source| ParseError::PropertyEvaluation {
                    name: name.clone(),
                    source,
                })?;
            Ok(DeclarationRecord::property(name, value))
        }
    }
}

fn checked_name(tag: &str) -> Result<String, ParseError> {
    let name = canonical_name(tag);
    if is_reserved_name(&name) {
        return Err(ParseError::ReservedNameCollision { name });
    }
    Ok(name)
}

/// Extract a record from a declaration element.
fn extract_element(
    element: &Element,
    engine: &dyn ScriptEngine,
) -> Result<DeclarationRecord, ParseError> {
    let name = checked_name(&element.tag)?;
    let markers = collect_markers(&element.tag, element.attribute_names())?;
    let body = element.text_content();
    build_record(name, markers, body.trim(), engine)
}

/// The parts of an invalid `<@name (args)>body` block.
struct InvalidBlock<'a> {
    name: &'a str,
    attributes: Vec<&'a str>,
    body: &'a str,
}

fn split_invalid_block(text: &str) -> Option<InvalidBlock<'_>> {
    let text = text.trim_start();
    let rest = text.strip_prefix('<')?.strip_prefix(MARKER_PREFIX)?;
    let close = rest.find('>')?;
    let (header, body) = (&rest[..close], &rest[close + 1..]);
    let mut parts = header.split_ascii_whitespace();
    let name = parts.next()?;
    Some(InvalidBlock {
        name,
        attributes: parts.collect(),
        body: body.trim(),
    })
}

/// Extract a record from a text + marker-comment pair.
///
/// Returns `Ok(None)` when the text is not an invalid block opening, in which
/// case both nodes are left alone.
fn extract_pair(
    text: &str,
    marker: &str,
    engine: &dyn ScriptEngine,
) -> Result<Option<DeclarationRecord>, ParseError> {
    let Some(block) = split_invalid_block(text) else {
        debug!(marker = %marker, "text before marker comment is not a declaration block");
        return Ok(None);
    };

    let closing = marker.strip_prefix(MARKER_PREFIX).unwrap_or(marker).trim();
    if !block.name.eq_ignore_ascii_case(closing) {
        return Err(ParseError::MismatchedDeclarationBlock {
            opening: format!("{MARKER_PREFIX}{}", block.name),
            closing: marker.to_string(),
        });
    }

    let tag = format!("on-{}", block.name);
    let name = checked_name(&tag)?;
    let markers = collect_markers(&tag, block.attributes.iter().copied())?;
    build_record(name, markers, block.body, engine).map(Some)
}

fn insert(declarations: &mut DeclarationMap, record: DeclarationRecord) {
    debug!(name = %record.name, kind = ?record.kind(), "declaration");
    if let Some(previous) = declarations.insert(record.name.clone(), record) {
        warn!(name = %previous.name, "duplicate declaration replaces an earlier one");
    }
}

/// Extract every declaration from `definition`, removing method declarations
/// and invalid blocks from its children.
pub fn extract_declarations(
    definition: &mut Element,
    lookup: &dyn CustomElementLookup,
    engine: &dyn ScriptEngine,
) -> Result<DeclarationMap, ParseError> {
    let mut declarations = DeclarationMap::new();
    let mut removed = BTreeSet::new();

    for class in classify_children(definition, lookup) {
        match class {
            Classification::DeclarationElement { index, element } => {
                let record = extract_element(element, engine)?;
                if record.parameters().is_some() {
                    removed.insert(index);
                }
                insert(&mut declarations, record);
            }
            Classification::DeclarationPair {
                text_index,
                comment_index,
                text,
                marker,
            } => {
                if let Some(record) = extract_pair(text, marker, engine)? {
                    removed.insert(text_index);
                    removed.insert(comment_index);
                    insert(&mut declarations, record);
                }
            }
            Classification::Blank { .. } | Classification::Structural { .. } => {}
        }
    }

    let mut index = 0;
    definition.children.retain(|_| {
        let keep = !removed.contains(&index);
        index += 1;
        keep
    });

    Ok(declarations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::NoCustomElements;
    use crate::markup::parse_first_element;
    use sprig_core::{ArgumentListError, CompiledFunction, DeclarationKind, Member, ScriptError, Value};
    use std::sync::Arc;

    /// Evaluates integer literals and `a + b`, enough for extraction tests.
    struct Arithmetic;

    impl ScriptEngine for Arithmetic {
        fn evaluate(&self, source: &str) -> Result<Value, ScriptError> {
            let sum: Result<f64, _> = source
                .split('+')
                .map(|term| term.trim().parse::<f64>())
                .sum();
            sum.map(Value::Number).map_err(|_| ScriptError::Syntax {
                offset: 0,
                message: format!("cannot evaluate '{source}'"),
            })
        }

        fn compile(
            &self,
            _parameters: &[String],
            _body: &str,
        ) -> Result<Arc<dyn CompiledFunction>, ScriptError> {
            unimplemented!("extraction never compiles")
        }
    }

    fn extract(inner: &str) -> Result<(Element, DeclarationMap), ParseError> {
        let mut def = parse_first_element(&format!("<my-widget>{inner}</my-widget>")).unwrap();
        let decls = extract_declarations(&mut def, &NoCustomElements, &Arithmetic)?;
        Ok((def, decls))
    }

    #[test]
    fn test_coalesce_markers() {
        assert_eq!(
            coalesce_markers(["(a,", "b,", "c)"]),
            vec!["(a, b, c)".to_string()]
        );
        assert_eq!(
            coalesce_markers(["class", "(e)", "id"]),
            vec!["class", "(e)", "id"]
        );
        assert_eq!(coalesce_markers(["(a,", "b"]), vec!["(a, b".to_string()]);
    }

    #[test]
    fn test_property_is_evaluated_and_kept() {
        let (def, decls) = extract("<count>5 + 5</count>").unwrap();
        let record = &decls["count"];
        assert_eq!(record.member, Member::Property(Value::Number(10.0)));
        assert_eq!(def.inner_html(), "<count>5 + 5</count>");
    }

    #[test]
    fn test_method_is_recorded_and_removed() {
        let (def, decls) =
            extract("<p>hi</p><on-click (e)>console.log(e)</on-click>").unwrap();
        let record = &decls["onClick"];
        assert_eq!(record.kind(), DeclarationKind::Method);
        assert_eq!(record.parameters(), Some(&["e".to_string()][..]));
        assert_eq!(
            record.member,
            Member::Method {
                parameters: ["e".to_string()].into_iter().collect(),
                body: "console.log(e)".into(),
            }
        );
        assert_eq!(def.inner_html(), "<p>hi</p>");
    }

    #[test]
    fn test_split_argument_group() {
        let (_, decls) = extract(
            "<print-two-numbers (num1, num2)>console.log(num1, num2)</print-two-numbers>",
        )
        .unwrap();
        assert_eq!(
            decls["printTwoNumbers"].parameters(),
            Some(&["num1".to_string(), "num2".to_string()][..])
        );
    }

    #[test]
    fn test_reserved_name() {
        for source in ["<constructor>1</constructor>", "<constructor ()>x</constructor>"] {
            match extract(source) {
                Err(ParseError::ReservedNameCollision { name }) => assert_eq!(name, "constructor"),
                other => panic!("Expected reserved name collision, got {other:?}"),
            }
        }
        assert!(matches!(
            extract("<shadow-root>1</shadow-root>"),
            Err(ParseError::ReservedNameCollision { .. })
        ));
        for source in [
            "<shadowroot>1</shadowroot>",
            "<connectedcallback ()>x</connectedcallback>",
        ] {
            assert!(matches!(
                extract(source),
                Err(ParseError::ReservedNameCollision { .. })
            ));
        }
    }

    #[test]
    fn test_ambiguous_shape() {
        match extract("<go (a) (b)>x</go>") {
            Err(ParseError::AmbiguousDeclarationShape { name, markers }) => {
                assert_eq!(name, "go");
                assert_eq!(markers, 2);
            }
            other => panic!("Expected ambiguous shape, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_marker() {
        match extract("<go (a,,b)>x</go>") {
            Err(ParseError::MalformedArgumentList { marker, reason }) => {
                assert_eq!(marker, "go");
                assert_eq!(reason, ArgumentListError::EmptyArgument);
            }
            other => panic!("Expected malformed argument list, got {other:?}"),
        }
    }

    #[test]
    fn test_lifecycle_is_never_evaluated() {
        let (def, decls) =
            extract("<connected>this.hidden = false</connected><attribute>x</attribute>").unwrap();
        assert_eq!(
            decls["connected"].member,
            Member::Method {
                parameters: Parameters::new(),
                body: "this.hidden = false".into(),
            }
        );
        assert_eq!(
            decls["attribute"].parameters(),
            Some(&["name".to_string(), "oldValue".to_string(), "newValue".to_string()][..])
        );
        assert!(def.children.is_empty());
    }

    #[test]
    fn test_property_evaluation_failure() {
        assert!(matches!(
            extract("<count>nope</count>"),
            Err(ParseError::PropertyEvaluation { .. })
        ));
    }

    #[test]
    fn test_invalid_block_pair() {
        let (def, decls) = extract("<p>a</p><@click (e)>console.log(e)</@click>").unwrap();
        let record = &decls["onClick"];
        assert_eq!(record.parameters(), Some(&["e".to_string()][..]));
        assert_eq!(
            record.member,
            Member::Method {
                parameters: ["e".to_string()].into_iter().collect(),
                body: "console.log(e)".into(),
            }
        );
        assert_eq!(def.inner_html(), "<p>a</p>");
    }

    #[test]
    fn test_invalid_block_mismatch() {
        match extract("<@click (e)>x</@clack>") {
            Err(ParseError::MismatchedDeclarationBlock { opening, closing }) => {
                assert_eq!(opening, "@click");
                assert_eq!(closing, "@clack");
            }
            other => panic!("Expected mismatched block, got {other:?}"),
        }
    }

    #[test]
    fn test_later_duplicate_replaces() {
        let (_, decls) = extract("<count>1</count><count>2</count>").unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls["count"].member, Member::Property(Value::Number(2.0)));
    }
}
