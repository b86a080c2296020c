//! The argument-list micro-grammar.
//!
//! A method declaration marks itself with a valueless attribute shaped like a
//! parameter list: `<print-two-numbers (num1, num2)>`. This module decides
//! whether one attribute name is such a marker and extracts its identifiers.

use nom::{
    bytes::complete::take_while,
    character::complete::satisfy,
    combinator::{all_consuming, recognize},
    sequence::pair,
    IResult,
};
use sprig_core::{ArgumentListError, Parameters};

/// Whether an attribute name has the shape of an argument-list marker.
pub fn is_marker(name: &str) -> bool {
    name.starts_with('(') || name.ends_with(')')
}

/// Parse a script identifier: `[A-Za-z_$][A-Za-z0-9_$]*`.
pub fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
    ))(input)
}

fn validate(token: &str) -> Result<String, ArgumentListError> {
    let token = token.trim_end();
    all_consuming(identifier)(token)
        .map(|(_, id)| id.to_string())
        .map_err(|_| ArgumentListError::InvalidIdentifier(token.to_string()))
}

/// Parse one attribute name as an argument list.
///
/// Returns `Ok(None)` when the name is not marker-shaped (a property
/// candidate), and the ordered parameter names otherwise. One trailing comma
/// is tolerated.
pub fn parse_argument_list(name: &str) -> Result<Option<Parameters>, ArgumentListError> {
    if !is_marker(name) {
        return Ok(None);
    }

    let mut parameters = Parameters::new();
    let mut buffer = String::new();
    let mut depth = 0usize;
    let mut closed = false;

    for c in name.chars() {
        if closed {
            if c.is_ascii_whitespace() {
                continue;
            }
            return Err(ArgumentListError::TrailingInput);
        }

        match c {
            '(' if depth > 0 => return Err(ArgumentListError::NestedOpening),
            '(' => depth += 1,
            _ if depth == 0 => {
                if c.is_ascii_whitespace() {
                    continue;
                }
                return Err(ArgumentListError::MissingOpening);
            }
            ',' => {
                if buffer.is_empty() {
                    return Err(ArgumentListError::EmptyArgument);
                }
                parameters.push(validate(&buffer)?);
                buffer.clear();
            }
            ')' => {
                if !buffer.is_empty() {
                    parameters.push(validate(&buffer)?);
                    buffer.clear();
                }
                closed = true;
            }
            // Whitespace only matters inside a token, where it makes the token invalid.
            c if c.is_ascii_whitespace() => {
                if !buffer.is_empty() {
                    buffer.push(c);
                }
            }
            c => buffer.push(c),
        }
    }

    if !closed {
        return Err(if depth == 0 {
            ArgumentListError::MissingOpening
        } else {
            ArgumentListError::Unbalanced
        });
    }

    Ok(Some(parameters))
}
