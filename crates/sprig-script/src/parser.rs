//! Recursive-descent parser for the script subset.

use sprig_core::ScriptError;

use crate::ast::*;
use crate::lexer::{syntax, tokenize, Spanned, Token};

/// Parse a program or function body.
pub fn parse_program(source: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, source.len());
    parser.parse_program()
}

/// Deepest statement or expression nesting accepted before parsing fails.
pub const MAX_NESTING: usize = 128;

/// Stateful parser that tracks position in the token list.
struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            depth: 0,
        }
    }

    /// Count one more level of nesting, failing past [`MAX_NESTING`].
    fn enter(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(syntax(self.offset(), "expression nested too deeply"));
        }
        Ok(())
    }

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.current();
        self.pos += 1;
        token
    }

    fn at_punct(&self, punct: &str) -> bool {
        matches!(self.current(), Some(Token::Punct(p)) if *p == punct)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.current(), Some(Token::Ident(id)) if id == keyword)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.at_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), ScriptError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{punct}'")))
        }
    }

    fn unexpected(&self, expected: &str) -> ScriptError {
        let found = match self.current() {
            Some(Token::Number(n)) => n.to_string(),
            Some(Token::Str(s)) => format!("{s:?}"),
            Some(Token::Ident(id)) => id.clone(),
            Some(Token::Punct(p)) => (*p).to_string(),
            None => "end of input".to_string(),
        };
        syntax(self.offset(), &format!("expected {expected}, found {found}"))
    }

    fn parse_program(&mut self) -> Result<Program, ScriptError> {
        let mut body = Vec::new();
        while self.current().is_some() {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    fn parse_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.enter()?;
        let stmt = self.parse_statement_inner();
        self.depth -= 1;
        stmt
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }
        if self.eat_punct("{") {
            let mut body = Vec::new();
            while !self.at_punct("}") {
                if self.current().is_none() {
                    return Err(self.unexpected("'}'"));
                }
                body.push(self.parse_statement()?);
            }
            self.pos += 1;
            return Ok(Stmt::Block(body));
        }

        let stmt = if let Some(kind) = self.declaration_kind() {
            self.pos += 1;
            self.parse_declaration(kind)?
        } else if self.at_keyword("if") {
            self.pos += 1;
            return self.parse_if();
        } else if self.at_keyword("return") {
            self.pos += 1;
            if self.current().is_none() || self.at_punct(";") || self.at_punct("}") {
                Stmt::Return(None)
            } else {
                Stmt::Return(Some(self.parse_expression()?))
            }
        } else {
            Stmt::Expr(self.parse_expression()?)
        };

        self.eat_punct(";");
        Ok(stmt)
    }

    fn declaration_kind(&self) -> Option<DeclKind> {
        match self.current() {
            Some(Token::Ident(id)) => match id.as_str() {
                "let" => Some(DeclKind::Let),
                "const" => Some(DeclKind::Const),
                "var" => Some(DeclKind::Var),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_declaration(&mut self, kind: DeclKind) -> Result<Stmt, ScriptError> {
        let mut declarations = Vec::new();
        loop {
            let name = match self.advance() {
                Some(Token::Ident(id)) if !is_reserved_word(id) => id.clone(),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("a variable name"));
                }
            };
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else if kind == DeclKind::Const {
                return Err(self.unexpected("'=' after const declaration"));
            } else {
                None
            };
            declarations.push((name, init));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::Declare { kind, declarations })
    }

    fn parse_if(&mut self) -> Result<Stmt, ScriptError> {
        self.expect_punct("(")?;
        let test = self.parse_expression()?;
        self.expect_punct(")")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.at_keyword("else") {
            self.pos += 1;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, ScriptError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ScriptError> {
        self.enter()?;
        let expr = self.parse_assignment_inner();
        self.depth -= 1;
        expr
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, ScriptError> {
        let start = self.offset();
        let left = self.parse_conditional()?;

        let op = if self.eat_punct("=") {
            AssignOp::Assign
        } else if self.eat_punct("+=") {
            AssignOp::Add
        } else if self.eat_punct("-=") {
            AssignOp::Sub
        } else {
            return Ok(left);
        };

        let target = match left {
            Expr::Ident(name) => AssignTarget::Variable(name),
            Expr::Member { object, property } => AssignTarget::Member { object, property },
            _ => return Err(syntax(start, "invalid assignment target")),
        };
        let value = Box::new(self.parse_assignment()?);
        Ok(Expr::Assign { target, op, value })
    }

    fn parse_conditional(&mut self) -> Result<Expr, ScriptError> {
        let test = self.parse_binary(1)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect_punct(":")?;
        let alternate = self.parse_assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// Precedence climbing over left-associative binary operators.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ScriptError> {
        let mut left = self.parse_unary()?;
        let entered = self.depth;
        loop {
            let op = match self.current() {
                Some(Token::Punct(p)) => match BinaryOp::from_punct(p) {
                    Some(op) if op.precedence() >= min_precedence => op,
                    _ => break,
                },
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            let right = self.parse_binary(op.precedence() + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = entered;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        let op = if self.eat_punct("!") {
            UnaryOp::Not
        } else if self.eat_punct("-") {
            UnaryOp::Neg
        } else if self.eat_punct("+") {
            UnaryOp::Plus
        } else if self.at_keyword("typeof") {
            self.pos += 1;
            UnaryOp::TypeOf
        } else {
            return self.parse_postfix();
        };
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.parse_primary()?;
        let entered = self.depth;
        loop {
            if self.at_punct(".") || self.at_punct("[") || self.at_punct("(") {
                self.enter()?;
            }
            if self.eat_punct(".") {
                let property = match self.advance() {
                    Some(Token::Ident(id)) => id.clone(),
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected("a property name"));
                    }
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat_punct("[") {
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat_punct("(") {
                let args = self.parse_list(")")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.depth = entered;
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: &str) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        while !self.eat_punct(close) {
            items.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                self.expect_punct(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, ScriptError> {
        let expr = match self.current() {
            Some(Token::Number(n)) => Expr::Number(*n),
            Some(Token::Str(s)) => Expr::String(s.clone()),
            Some(Token::Ident(id)) => match id.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" => Expr::Null,
                "undefined" => Expr::Undefined,
                "this" => Expr::This,
                "NaN" => Expr::Number(f64::NAN),
                "Infinity" => Expr::Number(f64::INFINITY),
                id if is_reserved_word(id) => return Err(self.unexpected("an expression")),
                _ => Expr::Ident(id.clone()),
            },
            Some(Token::Punct("(")) => {
                self.pos += 1;
                let inner = self.parse_expression()?;
                self.expect_punct(")")?;
                return Ok(inner);
            }
            Some(Token::Punct("[")) => {
                self.pos += 1;
                return Ok(Expr::Array(self.parse_list("]")?));
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.pos += 1;
        Ok(expr)
    }
}

fn is_reserved_word(word: &str) -> bool {
    matches!(
        word,
        "let" | "const" | "var" | "if" | "else" | "return" | "typeof" | "function" | "new"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        match parse_program(source).unwrap().body.as_slice() {
            [Stmt::Expr(e)] => e.clone(),
            other => panic!("Expected a single expression, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        match expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. })),
            other => panic!("Expected addition, got {other:?}"),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let within = format!("{}x{}", "[".repeat(MAX_NESTING / 2), "]".repeat(MAX_NESTING / 2));
        assert!(parse_program(&within).is_ok());

        for source in [
            format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1)),
            format!("{}1{}", "{".repeat(MAX_NESTING + 1), "}".repeat(MAX_NESTING + 1)),
            format!("{}x", "!".repeat(10 * MAX_NESTING)),
            format!("a{}", ".b".repeat(10 * MAX_NESTING)),
            vec!["1"; 10 * MAX_NESTING].join(" + "),
        ] {
            match parse_program(&source) {
                Err(ScriptError::Syntax { message, .. }) => {
                    assert_eq!(message, "expression nested too deeply")
                }
                other => panic!("Expected a nesting error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_left_associative() {
        match expr("10 - 4 - 3") {
            Expr::Binary {
                op: BinaryOp::Sub,
                left,
                right,
            } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Sub, .. }));
                assert_eq!(*right, Expr::Number(3.0));
            }
            other => panic!("Expected subtraction, got {other:?}"),
        }
    }

    #[test]
    fn test_member_assignment() {
        match expr("this.hidden = false") {
            Expr::Assign {
                target: AssignTarget::Member { object, property },
                op: AssignOp::Assign,
                value,
            } => {
                assert_eq!(*object, Expr::This);
                assert_eq!(property, "hidden");
                assert_eq!(*value, Expr::Bool(false));
            }
            other => panic!("Expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_call_chain() {
        match expr("console.log(a, [1, 2,], b[0])") {
            Expr::Call { callee, args } => {
                assert_eq!(callee.describe(), "console.log");
                assert_eq!(args.len(), 3);
            }
            other => panic!("Expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_statements() {
        let program = parse_program(
            "let a = 1, b; const c = 2\nif (a < c) { b = a } else b = c\nreturn b",
        )
        .unwrap();
        assert_eq!(program.body.len(), 4);
        assert!(matches!(program.body[0], Stmt::Declare { kind: DeclKind::Let, .. }));
        assert!(matches!(program.body[2], Stmt::If { alternate: Some(_), .. }));
        assert!(matches!(program.body[3], Stmt::Return(Some(_))));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(matches!(
            parse_program("1 = 2"),
            Err(ScriptError::Syntax { offset: 0, .. })
        ));
    }

    #[test]
    fn test_unterminated_block() {
        match parse_program("if (x) { y") {
            Err(ScriptError::Syntax { message, .. }) => assert!(message.contains("end of input")),
            other => panic!("Expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_program() {
        assert!(parse_program("  // nothing\n").unwrap().body.is_empty());
    }
}
