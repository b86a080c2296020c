//! The injected script capability.
//!
//! Property values and method bodies are opaque source text. The loader never
//! interprets them itself; it hands them to a [`ScriptEngine`] supplied by the
//! host, which evaluates property initializers and compiles method bodies into
//! [`CompiledFunction`]s. A compiled function runs against a [`ScriptReceiver`],
//! the instance that `this` refers to.

use std::fmt;
use std::sync::Arc;

use crate::errors::ScriptError;
use crate::value::Value;

/// The object `this` is bound to while a compiled function runs.
pub trait ScriptReceiver {
    /// Read a field. `None` means the member does not exist.
    fn get_member(&self, name: &str) -> Option<Value>;

    /// Write a field, creating it if absent.
    fn set_member(&mut self, name: &str, value: Value) -> Result<(), ScriptError>;

    /// Invoke a method on the receiver.
    fn call_member(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ScriptError>;
}

/// Receiver used when no instance is bound, e.g. for property initializers.
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl ScriptReceiver for Detached {
    fn get_member(&self, _name: &str) -> Option<Value> {
        None
    }

    fn set_member(&mut self, _name: &str, _value: Value) -> Result<(), ScriptError> {
        Err(ScriptError::MissingReceiver)
    }

    fn call_member(&mut self, _name: &str, _args: Vec<Value>) -> Result<Value, ScriptError> {
        Err(ScriptError::MissingReceiver)
    }
}

/// A method body compiled with its parameter list.
pub trait CompiledFunction: fmt::Debug + Send + Sync {
    fn parameters(&self) -> &[String];

    /// Run the body with `this` bound to `receiver`. Missing arguments are
    /// `undefined`; extra arguments are ignored.
    fn call(&self, receiver: &mut dyn ScriptReceiver, args: Vec<Value>)
        -> Result<Value, ScriptError>;
}

/// Evaluates property initializers and compiles method bodies.
pub trait ScriptEngine: Send + Sync {
    /// Evaluate an expression in an unbound context.
    fn evaluate(&self, source: &str) -> Result<Value, ScriptError>;

    /// Compile a function body with the given positional parameters.
    fn compile(
        &self,
        parameters: &[String],
        body: &str,
    ) -> Result<Arc<dyn CompiledFunction>, ScriptError>;
}

impl<E: ScriptEngine + ?Sized> ScriptEngine for Arc<E> {
    fn evaluate(&self, source: &str) -> Result<Value, ScriptError> {
        (**self).evaluate(source)
    }

    fn compile(
        &self,
        parameters: &[String],
        body: &str,
    ) -> Result<Arc<dyn CompiledFunction>, ScriptError> {
        (**self).compile(parameters, body)
    }
}
