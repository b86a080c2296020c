//! Lenient markup tokenizer and tree builder.
//!
//! This is not a conforming HTML parser. It reproduces the handful of host
//! behaviours the definition walker relies on:
//!
//! - `<` that does not start a tag name is literal text, so `<@click (e)>`
//!   survives as a text node.
//! - An end tag whose name does not start with a letter is a bogus comment,
//!   so `</@click>` becomes the comment `@click`.
//! - Attribute names are split at whitespace and keep their case, so
//!   `(a, b)` arrives as the two names `(a,` and `b)`.
//!
//! Tag names are lowercased. Unclosed elements are closed at the end of input,
//! and stray end tags are dropped. Elements opened deeper than [`MAX_DEPTH`]
//! are kept as empty children of the deepest open element.

use std::borrow::Cow;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until, take_while, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{map, opt, recognize, rest},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use sprig_core::{is_raw_text_element, is_void_element, Attribute, Element, Node};

/// A lexical unit of markup.
#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag(String),
    Text(&'a str),
    RawText(&'a str),
    Comment(&'a str),
    Ignored,
}

/// Consume up to and including the next `>`, or to the end of input.
fn until_close(input: &str) -> IResult<&str, &str> {
    alt((terminated(take_until(">"), char('>')), rest))(input)
}

fn tag_name(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            satisfy(|c| c.is_ascii_alphabetic()),
            take_while(|c: char| !c.is_whitespace() && c != '/' && c != '>'),
        )),
        str::to_ascii_lowercase,
    )(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
    map(
        preceded(
            tag("<!--"),
            alt((terminated(take_until("-->"), tag("-->")), rest)),
        ),
        Token::Comment,
    )(input)
}

fn doctype(input: &str) -> IResult<&str, Token<'_>> {
    map(preceded(tag_no_case("<!doctype"), until_close), |_| {
        Token::Ignored
    })(input)
}

fn end_tag(input: &str) -> IResult<&str, Token<'_>> {
    map(terminated(preceded(tag("</"), tag_name), until_close), Token::EndTag)(input)
}

/// `<!x>`, `<?x>` and `</@x>` all become comments.
fn bogus_comment(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(preceded(tag("<!"), until_close), Token::Comment),
        map(
            delimited(
                char('<'),
                recognize(preceded(char('?'), take_until(">"))),
                char('>'),
            ),
            Token::Comment,
        ),
        map(preceded(tag("</"), until_close), |body: &str| {
            if body.is_empty() {
                Token::Ignored
            } else {
                Token::Comment(body)
            }
        }),
    ))(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), opt(char('"'))),
        delimited(char('\''), take_while(|c: char| c != '\''), opt(char('\''))),
        take_while(|c: char| !c.is_whitespace() && c != '>'),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, Attribute> {
    let (input, name) = recognize(pair(
        opt(char('=')),
        take_while(|c: char| !c.is_whitespace() && !matches!(c, '/' | '>' | '=')),
    ))(input)?;
    let (input, value) = opt(preceded(
        tuple((multispace0, char('='), multispace0)),
        attribute_value,
    ))(input)?;
    Ok((
        input,
        Attribute::new(name, value.map(|v| decode_entities(v).into_owned())),
    ))
}

fn start_tag(input: &str) -> IResult<&str, Token<'_>> {
    let (mut input, name) = preceded(char('<'), tag_name)(input)?;
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut self_closing = false;

    loop {
        let (remaining, _) = multispace0(input)?;
        input = remaining;

        if input.is_empty() {
            break;
        }
        if let Some(remaining) = input.strip_prefix("/>") {
            input = remaining;
            self_closing = true;
            break;
        }
        if let Some(remaining) = input.strip_prefix('>') {
            input = remaining;
            break;
        }
        if let Some(remaining) = input.strip_prefix('/') {
            input = remaining;
            continue;
        }

        let (remaining, attr) = attribute(input)?;
        input = remaining;
        // Later duplicates are dropped, as the host does.
        if !attributes
            .iter()
            .any(|a| a.name.eq_ignore_ascii_case(&attr.name))
        {
            attributes.push(attr);
        }
    }

    Ok((
        input,
        Token::StartTag {
            name,
            attributes,
            self_closing,
        },
    ))
}

fn text(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(take_while1(|c: char| c != '<'), Token::Text),
        // A `<` that starts nothing else is literal text.
        map(tag("<"), Token::Text),
    ))(input)
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((comment, doctype, end_tag, bogus_comment, start_tag, text))(input)
}

/// Iterator over the tokens of a markup string.
struct Tokenizer<'a> {
    input: &'a str,
    raw_text_end: Option<String>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            raw_text_end: None,
        }
    }

    /// Raw text runs until `</name` (ASCII case-insensitive).
    fn raw_text(&mut self, closing: &str) -> Option<Token<'a>> {
        let haystack = self.input.to_ascii_lowercase();
        let end = haystack.find(closing).unwrap_or(self.input.len());
        let (body, remaining) = self.input.split_at(end);
        self.input = remaining;
        (!body.is_empty()).then_some(Token::RawText(body))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(closing) = self.raw_text_end.take() {
            if let Some(body) = self.raw_text(&closing) {
                return Some(body);
            }
        }

        if self.input.is_empty() {
            return None;
        }

        match token(self.input) {
            Ok((remaining, token)) => {
                self.input = remaining;
                if let Token::StartTag {
                    name, self_closing, ..
                } = &token
                {
                    if !self_closing && is_raw_text_element(name) {
                        self.raw_text_end = Some(format!("</{name}"));
                    }
                }
                Some(token)
            }
            // `text` always accepts a leading `<`, so this is unreachable in
            // practice; treat the rest as text rather than looping.
            Err(_) => {
                let remaining = std::mem::take(&mut self.input);
                Some(Token::Text(remaining))
            }
        }
    }
}

/// Deepest element nesting the tree builder produces.
pub const MAX_DEPTH: usize = 512;

/// Parse a markup fragment into a list of top-level nodes.
pub fn parse_fragment(input: &str) -> Vec<Node> {
    let mut stack: Vec<Element> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();

    for token in Tokenizer::new(input) {
        match token {
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let elem = Element {
                    tag: name,
                    attributes,
                    children: Vec::new(),
                };
                if self_closing || is_void_element(&elem.tag) || stack.len() >= MAX_DEPTH {
                    attach(&mut stack, &mut roots, Node::Element(elem));
                } else {
                    stack.push(elem);
                }
            }
            Token::EndTag(name) => {
                if let Some(idx) = stack.iter().rposition(|e| e.tag == name) {
                    while stack.len() > idx {
                        if let Some(elem) = stack.pop() {
                            attach(&mut stack, &mut roots, Node::Element(elem));
                        }
                    }
                }
            }
            Token::Text(text) => push_text(&mut stack, &mut roots, &decode_entities(text)),
            Token::RawText(text) => push_text(&mut stack, &mut roots, text),
            Token::Comment(body) => {
                attach(&mut stack, &mut roots, Node::Comment(body.to_string()));
            }
            Token::Ignored => {}
        }
    }

    while let Some(elem) = stack.pop() {
        attach(&mut stack, &mut roots, Node::Element(elem));
    }

    roots
}

/// Parse markup and return its first top-level element, if any.
pub fn parse_first_element(input: &str) -> Option<Element> {
    parse_fragment(input).into_iter().find_map(|node| match node {
        Node::Element(e) => Some(e),
        _ => None,
    })
}

fn attach(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Append text, merging with a preceding text node.
fn push_text(stack: &mut [Element], roots: &mut Vec<Node>, text: &str) {
    let siblings = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => roots,
    };
    match siblings.last_mut() {
        Some(Node::Text(existing)) => existing.push_str(text),
        _ => siblings.push(Node::Text(text.to_string())),
    }
}

/// Decode the common named entities and numeric character references.
/// Unknown entities are left as written.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut remaining = input;
    while let Some(amp) = remaining.find('&') {
        out.push_str(&remaining[..amp]);
        remaining = &remaining[amp..];

        let decoded = remaining.find(';').and_then(|semi| {
            let entity = &remaining[1..semi];
            decode_entity(entity).map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                remaining = &remaining[consumed..];
            }
            None => {
                out.push('&');
                remaining = &remaining[1..];
            }
        }
    }
    out.push_str(remaining);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_element(input: &str) -> Element {
        parse_first_element(input).expect("Expected an element")
    }

    #[test]
    fn test_parse_nested_elements() {
        let elem = single_element("<div id=\"a\"><span class=x>hi</span></div>");
        assert_eq!(elem.tag, "div");
        assert_eq!(elem.get_attr("id"), Some("a"));
        let span = elem.first_element_child().unwrap();
        assert_eq!(span.get_attr("class"), Some("x"));
        assert_eq!(span.text_content(), "hi");
    }

    #[test]
    fn test_nesting_is_capped() {
        let levels = 200_000;
        let input = format!("{}deep{}", "<div>".repeat(levels), "</div>".repeat(levels));
        let root = single_element(&input);

        let mut depth = 1;
        let mut current = &root;
        while let Some(child) = current.first_element_child() {
            depth += 1;
            current = child;
        }
        assert_eq!(depth, MAX_DEPTH + 1);
        assert_eq!(current.text_content(), "");
        assert!(root.text_content().ends_with("deep"));
    }

    #[test]
    fn test_tag_names_lowercased_attribute_names_kept() {
        let elem = single_element("<MY-Widget (numA, numB)></MY-WIDGET>");
        assert_eq!(elem.tag, "my-widget");
        let names: Vec<_> = elem.attribute_names().collect();
        assert_eq!(names, vec!["(numA,", "numB)"]);
        assert!(elem.children.is_empty());
    }

    #[test]
    fn test_invalid_block_becomes_text_and_comment() {
        let nodes = parse_fragment("<@click (e)>console.log(e)</@click>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].as_text(), Some("<@click (e)>console.log(e)"));
        assert_eq!(nodes[1].as_comment(), Some("@click"));
    }

    #[test]
    fn test_comments_and_doctype() {
        let nodes = parse_fragment("<!DOCTYPE html><!-- hello --><!bogus>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].as_comment(), Some(" hello "));
        assert_eq!(nodes[1].as_comment(), Some("bogus"));
    }

    #[test]
    fn test_void_and_self_closing() {
        let elem = single_element("<p>a<br>b<count/>c</p>");
        let tags: Vec<_> = elem.child_elements().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["br", "count"]);
        assert_eq!(elem.text_content(), "abc");
    }

    #[test]
    fn test_raw_text_elements() {
        let elem = single_element("<style>p > a { color: red }</style>");
        assert_eq!(elem.text_content(), "p > a { color: red }");

        let elem = single_element("<script>if (a < b) { x() }</SCRIPT>");
        assert_eq!(elem.text_content(), "if (a < b) { x() }");
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let nodes = parse_fragment("</b><div><span>x");
        assert_eq!(nodes.len(), 1);
        let div = nodes[0].as_element().unwrap();
        assert_eq!(div.first_element_child().unwrap().text_content(), "x");
    }

    #[test]
    fn test_duplicate_attributes_dropped() {
        let elem = single_element("<a x=1 X=2 y='3'>");
        assert_eq!(elem.attributes.len(), 2);
        assert_eq!(elem.get_attr("x"), Some("1"));
        assert_eq!(elem.get_attr("y"), Some("3"));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let nodes = parse_fragment("a < b");
        assert_eq!(nodes, vec![Node::Text("a < b".into())]);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt; b &amp;&amp; c"), "a < b && c");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("&unknown; &"), "&unknown; &");
    }
}
