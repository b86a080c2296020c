//! Tree-walking evaluator.

use std::cell::Cell;
use std::collections::HashMap;

use sprig_core::{ScriptError, ScriptReceiver, Value};

use crate::ast::*;
use crate::console::Console;

/// Nested calls allowed per thread before evaluation is aborted.
pub const MAX_CALL_DEPTH: usize = 256;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Tracks nesting of compiled-function calls on the current thread.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<Self, ScriptError> {
        CALL_DEPTH.with(|depth| {
            if depth.get() >= MAX_CALL_DEPTH {
                return Err(ScriptError::CallDepthExceeded {
                    limit: MAX_CALL_DEPTH,
                });
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

enum Flow {
    Normal(Value),
    Return(Value),
}

/// Evaluates one program against a receiver.
pub struct Interpreter<'r> {
    receiver: &'r mut dyn ScriptReceiver,
    console: &'r Console,
    scopes: Vec<HashMap<String, Binding>>,
}

impl<'r> Interpreter<'r> {
    pub fn new(receiver: &'r mut dyn ScriptReceiver, console: &'r Console) -> Self {
        Self {
            receiver,
            console,
            scopes: vec![HashMap::new()],
        }
    }

    /// Run a program and return its completion value: the value of the last
    /// expression statement, or the returned value.
    pub fn run(&mut self, program: &Program) -> Result<Value, ScriptError> {
        match self.exec_all(&program.body)? {
            Flow::Normal(value) | Flow::Return(value) => Ok(value),
        }
    }

    /// Run a function body with positional arguments bound to `parameters`.
    pub fn call(
        &mut self,
        parameters: &[String],
        args: Vec<Value>,
        body: &Program,
    ) -> Result<Value, ScriptError> {
        let _guard = DepthGuard::enter()?;
        let mut args = args.into_iter();
        for name in parameters {
            self.declare(name, args.next().unwrap_or_default(), false);
        }
        match self.exec_all(&body.body)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(_) => Ok(Value::Undefined),
        }
    }

    fn declare(&mut self, name: &str, value: Value, constant: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Binding { value, constant });
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn exec_all(&mut self, stmts: &[Stmt]) -> Result<Flow, ScriptError> {
        let mut last = Value::Undefined;
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal(value) => {
                    if !matches!(stmt, Stmt::Declare { .. } | Stmt::Empty) {
                        last = value;
                    }
                }
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, ScriptError> {
        self.scopes.push(HashMap::new());
        let result = self.exec_all(stmts);
        self.scopes.pop();
        result
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, ScriptError> {
        match stmt {
            Stmt::Expr(expr) => self.eval(expr).map(Flow::Normal),
            Stmt::Declare { kind, declarations } => {
                for (name, init) in declarations {
                    let value = match init {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Undefined,
                    };
                    self.declare(name, value, *kind == DeclKind::Const);
                }
                Ok(Flow::Normal(Value::Undefined))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.truthy() {
                    self.exec_scoped(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec_scoped(alternate)
                } else {
                    Ok(Flow::Normal(Value::Undefined))
                }
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Block(stmts) => self.exec_block(stmts),
            Stmt::Empty => Ok(Flow::Normal(Value::Undefined)),
        }
    }

    fn exec_scoped(&mut self, stmt: &Stmt) -> Result<Flow, ScriptError> {
        match stmt {
            Stmt::Block(stmts) => self.exec_block(stmts),
            other => self.exec_block(std::slice::from_ref(other)),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::This => Err(ScriptError::Unsupported {
                construct: "'this' used as a value".to_string(),
            }),
            Expr::Ident(name) => self
                .lookup(name)
                .map(|b| b.value.clone())
                .ok_or_else(|| ScriptError::UndefinedVariable { name: name.clone() }),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Member { object, property } => self.eval_member(object, property),
            Expr::Index { object, index } => {
                let target = self.eval(object)?;
                let index = self.eval(index)?;
                index_value(&target, &index, object)
            }
            Expr::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.eval_call(callee, args)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::String(type_of(&value).to_string()),
                })
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let left = self.eval(left)?;
                    if left.truthy() {
                        self.eval(right)
                    } else {
                        Ok(left)
                    }
                }
                BinaryOp::Or => {
                    let left = self.eval(left)?;
                    if left.truthy() {
                        Ok(left)
                    } else {
                        self.eval(right)
                    }
                }
                _ => {
                    let left = self.eval(left)?;
                    let right = self.eval(right)?;
                    Ok(eval_binary(*op, &left, &right))
                }
            },
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Assign { target, op, value } => self.eval_assign(target, *op, value),
        }
    }

    fn eval_member(&mut self, object: &Expr, property: &str) -> Result<Value, ScriptError> {
        match object {
            Expr::This => Ok(self.receiver.get_member(property).unwrap_or_default()),
            Expr::Ident(name) if name == "Math" && self.lookup(name).is_none() => {
                Ok(match property {
                    "PI" => Value::Number(std::f64::consts::PI),
                    "E" => Value::Number(std::f64::consts::E),
                    _ => Value::Undefined,
                })
            }
            _ => {
                let target = self.eval(object)?;
                member_of(&target, property, object)
            }
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: Vec<Value>) -> Result<Value, ScriptError> {
        if let Expr::Member { object, property } = callee {
            match object.as_ref() {
                Expr::This => return self.receiver.call_member(property, args),
                Expr::Ident(name) if self.lookup(name).is_none() => match name.as_str() {
                    "console" if property == "log" => {
                        self.console.log(&args);
                        return Ok(Value::Undefined);
                    }
                    "Math" => {
                        if let Some(value) = math(property, &args) {
                            return Ok(value);
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        Err(ScriptError::NotCallable {
            callee: callee.describe(),
        })
    }

    fn eval_assign(
        &mut self,
        target: &AssignTarget,
        op: AssignOp,
        value: &Expr,
    ) -> Result<Value, ScriptError> {
        let rhs = self.eval(value)?;
        match target {
            AssignTarget::Variable(name) => {
                let current = match self.lookup(name) {
                    Some(binding) if binding.constant => {
                        return Err(ScriptError::ConstAssignment { name: name.clone() })
                    }
                    Some(binding) => binding.value.clone(),
                    None => return Err(ScriptError::UndefinedVariable { name: name.clone() }),
                };
                let next = apply_assign(op, &current, rhs);
                if let Some(binding) = self
                    .scopes
                    .iter_mut()
                    .rev()
                    .find_map(|scope| scope.get_mut(name))
                {
                    binding.value = next.clone();
                }
                Ok(next)
            }
            AssignTarget::Member { object, property } => {
                if !matches!(object.as_ref(), Expr::This) {
                    return Err(ScriptError::InvalidAssignment);
                }
                let next = match op {
                    AssignOp::Assign => rhs,
                    _ => {
                        let current = self.receiver.get_member(property).unwrap_or_default();
                        apply_assign(op, &current, rhs)
                    }
                };
                self.receiver.set_member(property, next.clone())?;
                Ok(next)
            }
        }
    }
}

fn apply_assign(op: AssignOp, current: &Value, rhs: Value) -> Value {
    match op {
        AssignOp::Assign => rhs,
        AssignOp::Add => eval_binary(BinaryOp::Add, current, &rhs),
        AssignOp::Sub => eval_binary(BinaryOp::Sub, current, &rhs),
    }
}

/// `typeof` result.
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Array(_) => "object",
        other => other.type_name(),
    }
}

/// Evaluate a non-short-circuit binary operator.
pub fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::String(_) | Value::Array(_), _) | (_, Value::String(_) | Value::Array(_)) => {
                Value::String(format!("{left}{right}"))
            }
            _ => Value::Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt => Value::Bool(compare(left, right, |o| o.is_lt())),
        BinaryOp::Gt => Value::Bool(compare(left, right, |o| o.is_gt())),
        BinaryOp::Le => Value::Bool(compare(left, right, |o| o.is_le())),
        BinaryOp::Ge => Value::Bool(compare(left, right, |o| o.is_ge())),
        BinaryOp::And => {
            if left.truthy() {
                right.clone()
            } else {
                left.clone()
            }
        }
        BinaryOp::Or => {
            if left.truthy() {
                left.clone()
            } else {
                right.clone()
            }
        }
    }
}

/// Strings compare lexicographically, everything else numerically. NaN is
/// never ordered.
fn compare(left: &Value, right: &Value, test: fn(std::cmp::Ordering) -> bool) -> bool {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    ordering.is_some_and(test)
}

fn member_of(target: &Value, property: &str, object: &Expr) -> Result<Value, ScriptError> {
    match (target, property) {
        (Value::Undefined | Value::Null, _) => Err(ScriptError::InvalidMember {
            member: property.to_string(),
            target: format!("{target} ({})", object.describe()),
        }),
        (Value::String(s), "length") => Ok(Value::Number(s.encode_utf16().count() as f64)),
        (Value::Array(items), "length") => Ok(Value::Number(items.len() as f64)),
        _ => Ok(Value::Undefined),
    }
}

fn index_value(target: &Value, index: &Value, object: &Expr) -> Result<Value, ScriptError> {
    let position = index.to_number();
    let position = (position >= 0.0 && position.fract() == 0.0).then_some(position as usize);
    match target {
        Value::Undefined | Value::Null => Err(ScriptError::InvalidMember {
            member: index.to_string(),
            target: format!("{target} ({})", object.describe()),
        }),
        Value::Array(items) => Ok(position
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        // Indexes by UTF-16 unit, matching `.length`.
        Value::String(s) => Ok(position
            .and_then(|i| s.encode_utf16().nth(i))
            .map(|unit| Value::String(String::from_utf16_lossy(&[unit])))
            .unwrap_or_default()),
        _ => match index {
            Value::String(name) => member_of(target, name, object),
            _ => Ok(Value::Undefined),
        },
    }
}

fn math(function: &str, args: &[Value]) -> Option<Value> {
    let arg = |i: usize| args.get(i).map_or(f64::NAN, Value::to_number);
    let n = match function {
        "max" => args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, |acc, x| {
            if acc.is_nan() || x.is_nan() {
                f64::NAN
            } else {
                acc.max(x)
            }
        }),
        "min" => args.iter().map(Value::to_number).fold(f64::INFINITY, |acc, x| {
            if acc.is_nan() || x.is_nan() {
                f64::NAN
            } else {
                acc.min(x)
            }
        }),
        "floor" => arg(0).floor(),
        "ceil" => arg(0).ceil(),
        "abs" => arg(0).abs(),
        "round" => (arg(0) + 0.5).floor(),
        "sqrt" => arg(0).sqrt(),
        "pow" => arg(0).powf(arg(1)),
        _ => return None,
    };
    Some(Value::Number(n))
}
