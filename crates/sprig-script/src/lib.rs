//! A small script engine for sprig component definitions.
//!
//! [`MiniScript`] implements [`ScriptEngine`] for a fixed subset of
//! JavaScript-like syntax, enough for property initializers and short method
//! bodies:
//!
//! - statements: expressions, `let`/`const`/`var`, `if`/`else`, blocks, `return`
//! - assignment with `=`, `+=` and `-=` to variables and `this.member`
//! - literals, arrays, member access, indexing, calls, `?:`
//! - operators `! - + typeof`, arithmetic, comparison, equality, `&&`, `||`
//! - builtins `console.log`, `Math.*` and `.length`
//!
//! Method calls on `this` are delegated to the [`ScriptReceiver`] the function
//! is invoked with.

pub mod ast;
pub mod console;
pub mod interpreter;
pub mod lexer;
pub mod parser;

pub use console::Console;
pub use parser::parse_program;

use std::sync::Arc;

use sprig_core::{CompiledFunction, Detached, ScriptEngine, ScriptError, ScriptReceiver, Value};

use crate::ast::Program;
use crate::interpreter::Interpreter;

/// The built-in script engine.
#[derive(Debug, Clone, Default)]
pub struct MiniScript {
    console: Console,
}

impl MiniScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing console, e.g. one shared with a test.
    pub fn with_console(console: Console) -> Self {
        Self { console }
    }

    pub fn console(&self) -> &Console {
        &self.console
    }
}

impl ScriptEngine for MiniScript {
    fn evaluate(&self, source: &str) -> Result<Value, ScriptError> {
        let program = parse_program(source)?;
        Interpreter::new(&mut Detached, &self.console).run(&program)
    }

    fn compile(
        &self,
        parameters: &[String],
        body: &str,
    ) -> Result<Arc<dyn CompiledFunction>, ScriptError> {
        let program = parse_program(body)?;
        Ok(Arc::new(ScriptFunction {
            parameters: parameters.to_vec(),
            program,
            console: self.console.clone(),
        }))
    }
}

/// A compiled method body.
#[derive(Debug)]
pub struct ScriptFunction {
    parameters: Vec<String>,
    program: Program,
    console: Console,
}

impl CompiledFunction for ScriptFunction {
    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn call(
        &self,
        receiver: &mut dyn ScriptReceiver,
        args: Vec<Value>,
    ) -> Result<Value, ScriptError> {
        Interpreter::new(receiver, &self.console).call(&self.parameters, args, &self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn eval(source: &str) -> Value {
        MiniScript::new().evaluate(source).unwrap()
    }

    /// A receiver with plain fields and a `double` method.
    #[derive(Default)]
    struct Fields {
        values: HashMap<String, Value>,
        calls: Vec<(String, Vec<Value>)>,
    }

    impl ScriptReceiver for Fields {
        fn get_member(&self, name: &str) -> Option<Value> {
            self.values.get(name).cloned()
        }

        fn set_member(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
            self.values.insert(name.to_string(), value);
            Ok(())
        }

        fn call_member(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
            self.calls.push((name.to_string(), args.clone()));
            match name {
                "double" => Ok(Value::Number(args.first().map_or(0.0, Value::to_number) * 2.0)),
                _ => Err(ScriptError::NotCallable {
                    callee: format!("this.{name}"),
                }),
            }
        }
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("5 + 5"), Value::Number(10.0));
        assert_eq!(eval("2 + 3 * 4 - 1"), Value::Number(13.0));
        assert_eq!(eval("(2 + 3) * 4 % 7"), Value::Number(6.0));
        assert_eq!(eval("1 / 0"), Value::Number(f64::INFINITY));
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("'a' + 1"), Value::String("a1".into()));
        assert_eq!(eval("[1, 'x', null]"), Value::Array(vec![1.into(), "x".into(), Value::Null]));
        assert_eq!(eval("[1, 2, 3].length"), Value::Number(3.0));
        assert_eq!(eval("\"hello\"[1]"), Value::String("e".into()));
        assert_eq!(eval(""), Value::Undefined);
    }

    #[test]
    fn test_evaluate_logic() {
        assert_eq!(eval("0 || 'fallback'"), Value::String("fallback".into()));
        assert_eq!(eval("1 && 2"), Value::Number(2.0));
        assert_eq!(eval("!0"), Value::Bool(true));
        assert_eq!(eval("'0' == 0"), Value::Bool(true));
        assert_eq!(eval("'0' === 0"), Value::Bool(false));
        assert_eq!(eval("'b' > 'a' ? 'yes' : 'no'"), Value::String("yes".into()));
        assert_eq!(eval("typeof null"), Value::String("object".into()));
    }

    #[test]
    fn test_evaluate_statements() {
        assert_eq!(eval("let a = 2; a += 3; a * 2"), Value::Number(10.0));
        assert_eq!(
            eval("let x = 1; if (x > 0) { x = 'pos' } else { x = 'neg' } x"),
            Value::String("pos".into())
        );
        assert_eq!(eval("Math.max(1, 7, 3) + Math.floor(2.7)"), Value::Number(9.0));
        assert_eq!(eval("Math.round(-2.5)"), Value::Number(-2.0));
    }

    #[test]
    fn test_evaluate_errors() {
        let engine = MiniScript::new();
        assert_eq!(
            engine.evaluate("missing + 1"),
            Err(ScriptError::UndefinedVariable {
                name: "missing".into()
            })
        );
        assert_eq!(
            engine.evaluate("const a = 1; a = 2"),
            Err(ScriptError::ConstAssignment { name: "a".into() })
        );
        assert_eq!(
            engine.evaluate("alert(1)"),
            Err(ScriptError::NotCallable {
                callee: "alert".into()
            })
        );
        assert_eq!(engine.evaluate("this.x = 1"), Err(ScriptError::MissingReceiver));
        assert!(matches!(
            engine.evaluate("let o; o.x"),
            Err(ScriptError::InvalidMember { .. })
        ));
        assert!(matches!(engine.evaluate("1 +"), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_block_scoping() {
        let engine = MiniScript::new();
        assert_eq!(
            engine.evaluate("if (true) { let inner = 1 } inner"),
            Err(ScriptError::UndefinedVariable {
                name: "inner".into()
            })
        );
        assert_eq!(
            engine.evaluate("let a = 1; { let a = 2 } a"),
            Ok(Value::Number(1.0))
        );
    }

    #[test]
    fn test_console_log() {
        let engine = MiniScript::with_console(Console::capturing());
        engine.evaluate("console.log('sum', 1 + 1)").unwrap();
        assert_eq!(engine.console().lines(), vec!["sum 2"]);
    }

    #[test]
    fn test_default_engine_does_not_retain_console_output() {
        let engine = MiniScript::new();
        engine.evaluate("console.log('sum', 1 + 1)").unwrap();
        assert!(engine.console().lines().is_empty());
    }

    #[test]
    fn test_large_integers_concatenate_exactly() {
        assert_eq!(
            eval("'' + 100000000000000000000"),
            Value::String("100000000000000000000".into())
        );
        assert_eq!(eval("1e20 + ''"), Value::String("100000000000000000000".into()));
    }

    #[test]
    fn test_strings_index_by_utf16_unit() {
        assert_eq!(eval("'\u{1F600}a'.length"), Value::Number(3.0));
        assert_eq!(eval("'\u{1F600}a'[2]"), Value::String("a".into()));
        assert_eq!(eval("'h\u{e9}llo'[1]"), Value::String("\u{e9}".into()));
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let depth = 2000;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(matches!(
            MiniScript::new().evaluate(&source),
            Err(ScriptError::Syntax { .. })
        ));
        let negations = format!("{}1", "-".repeat(depth));
        assert!(matches!(
            MiniScript::new().evaluate(&negations),
            Err(ScriptError::Syntax { .. })
        ));
        let nested = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(eval(&nested), Value::Number(1.0));
    }

    #[test]
    fn test_compiled_function_binds_this() {
        let engine = MiniScript::new();
        let params = vec!["amount".to_string()];
        let func = engine
            .compile(&params, "this.count += amount; return this.double(this.count)")
            .unwrap();
        assert_eq!(func.parameters(), &["amount".to_string()]);

        let mut receiver = Fields::default();
        receiver.values.insert("count".into(), Value::Number(1.0));

        let result = func.call(&mut receiver, vec![Value::Number(4.0)]).unwrap();
        assert_eq!(result, Value::Number(10.0));
        assert_eq!(receiver.values["count"], Value::Number(5.0));
        assert_eq!(receiver.calls, vec![("double".to_string(), vec![Value::Number(5.0)])]);
    }

    #[test]
    fn test_missing_arguments_are_undefined() {
        let engine = MiniScript::new();
        let params = vec!["a".to_string(), "b".to_string()];
        let func = engine.compile(&params, "return typeof b").unwrap();
        let result = func.call(&mut Detached, vec![Value::Number(1.0)]).unwrap();
        assert_eq!(result, Value::String("undefined".into()));
    }

    #[test]
    fn test_compile_rejects_syntax_errors() {
        let engine = MiniScript::new();
        assert!(matches!(
            engine.compile(&[], "if (x {"),
            Err(ScriptError::Syntax { .. })
        ));
    }

    #[test]
    fn test_function_without_return_yields_undefined() {
        let engine = MiniScript::new();
        let func = engine.compile(&[], "1 + 1").unwrap();
        assert_eq!(func.call(&mut Detached, vec![]), Ok(Value::Undefined));
    }

    proptest! {
        #[test]
        fn integer_arithmetic_matches(a in -1000i32..1000, b in -1000i32..1000, c in 1i32..50) {
            let expected = f64::from(a) + f64::from(b) * f64::from(c);
            prop_assert_eq!(eval(&format!("{a} + {b} * {c}")), Value::Number(expected));
        }

        #[test]
        fn parser_never_panics(source in "\\PC{0,40}") {
            let _ = parse_program(&source);
        }
    }
}
