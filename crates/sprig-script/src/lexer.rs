//! Tokenizer for the script subset.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{char, digit0, digit1, multispace1, one_of, satisfy},
    combinator::{map, map_res, opt, recognize, rest},
    error::{Error, ErrorKind},
    sequence::{pair, terminated, tuple},
    IResult,
};
use sprig_core::ScriptError;

/// Punctuators, longest first so that `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "+", "-", "*", "/", "%", "<",
    ">", "!", "=", "?", ":", ".", ",", ";", "(", ")", "[", "]", "{", "}",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

/// A token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Skip whitespace, `// line` and `/* block */` comments.
fn trivia(input: &str) -> IResult<&str, ()> {
    let mut input = input;
    loop {
        let (remaining, skipped) = opt(alt((
            multispace1,
            recognize(pair(tag("//"), take_while(|c: char| c != '\n'))),
            recognize(tuple((
                tag("/*"),
                alt((terminated(take_until("*/"), tag("*/")), rest)),
            ))),
        )))(input)?;
        input = remaining;
        if skipped.is_none() {
            return Ok((input, ()));
        }
    }
}

pub fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))(input)
}

/// Decimal numbers with an optional fraction and exponent.
pub fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        )),
        str::parse::<f64>,
    )(input)
}

/// Single- or double-quoted string with the common escapes.
pub fn string(input: &str) -> IResult<&str, String> {
    let (body, quote) = one_of("\"'")(input)?;
    let mut out = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&body[i + 1..], out)),
            '\n' => break,
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '0')) => out.push('\0'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c => out.push(c),
        }
    }

    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

fn punctuator(input: &str) -> IResult<&str, &'static str> {
    PUNCTUATORS
        .iter()
        .find(|p| input.starts_with(**p))
        .map(|p| (&input[p.len()..], *p))
        .ok_or_else(|| nom::Err::Error(Error::new(input, ErrorKind::Tag)))
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        map(number, Token::Number),
        map(string, Token::Str),
        map(identifier, |s: &str| Token::Ident(s.to_string())),
        map(punctuator, Token::Punct),
    ))(input)
}

/// Split source text into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ScriptError> {
    let offset_of = |remaining: &str| source.len() - remaining.len();
    let mut tokens = Vec::new();
    let mut input = source;

    loop {
        let (remaining, ()) =
            trivia(input).map_err(|_| syntax(offset_of(input), "invalid input"))?;
        input = remaining;
        if input.is_empty() {
            return Ok(tokens);
        }

        match token(input) {
            Ok((remaining, token)) => {
                tokens.push(Spanned {
                    token,
                    offset: offset_of(input),
                });
                input = remaining;
            }
            Err(nom::Err::Failure(_)) => {
                return Err(syntax(offset_of(input), "unterminated string literal"));
            }
            Err(_) => {
                let found = input.chars().next().unwrap_or_default();
                return Err(syntax(
                    offset_of(input),
                    &format!("unexpected character '{found}'"),
                ));
            }
        }
    }
}

pub(crate) fn syntax(offset: usize, message: &str) -> ScriptError {
    ScriptError::Syntax {
        offset,
        message: message.to_string(),
    }
}
