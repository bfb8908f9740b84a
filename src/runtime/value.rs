//! Runtime value representation
//!
//! This module defines runtime values for Buildfiles.

use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

use super::environment::Scope;
use crate::error::{KeelResult, SourceLocation};
use crate::parser::ast::{Stmt, ToolOption};

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Named-argument bag passed as the last argument of a call
    Object(IndexMap<String, Value>),
    NativeFunction(NativeFunction),
    Task(Rc<TaskValue>),
    Tool(Rc<ToolValue>),
}

/// Signature every host builtin implements. Receives the expanded
/// argument list and the calling scope.
pub type NativeFn = dyn Fn(&[Value], &Scope) -> KeelResult<Value>;

/// Native function value (built-in functions)
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Value], &Scope) -> KeelResult<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: &[Value], scope: &Scope) -> KeelResult<Value> {
        (self.func)(args, scope)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A declared task, frozen at load time
#[derive(Debug)]
pub struct TaskValue {
    pub name: String,
    pub dependencies: Vec<String>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// A declared tool with its per-platform options, frozen at load time
#[derive(Debug)]
pub struct ToolValue {
    pub name: String,
    pub options: Vec<ToolOption>,
    pub location: SourceLocation,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::NativeFunction(_) => "native function",
            Value::Task(_) => "task",
            Value::Tool(_) => "tool",
        }
    }

    /// Strings, numbers and booleans; the kinds that can be mirrored into
    /// an environment variable.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::String(_) | Value::Number(_) | Value::Boolean(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::NativeFunction(func) => write!(f, "<native fn {}>", func.name),
            Value::Task(task) => write!(f, "<task {}>", task.name),
            Value::Tool(tool) => write!(f, "<tool {}>", tool.name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(&a.func, &b.func),
            (Value::Task(a), Value::Task(b)) => Rc::ptr_eq(a, b),
            (Value::Tool(a), Value::Tool(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_display_drops_trailing_zero() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
        assert_eq!(Value::Number(-12.25).to_string(), "-12.25");
    }

    #[test]
    fn test_compound_display() {
        let array = Value::Array(vec!["a".into(), 1.0.into(), true.into()]);
        assert_eq!(array.to_string(), "a,1,true");

        let mut fields = IndexMap::new();
        fields.insert("force".to_string(), Value::Boolean(true));
        fields.insert("cwd".to_string(), Value::from("out"));
        assert_eq!(Value::Object(fields).to_string(), "{force: true, cwd: out}");

        assert_eq!(Value::Nil.to_string(), "nil");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::Array(vec![]).type_name(), "array");
        let native = NativeFunction::new("noop", |_, _| Ok(Value::Nil));
        assert_eq!(Value::NativeFunction(native).type_name(), "native function");
    }

    #[test]
    fn test_primitives() {
        assert!(Value::from("x").is_primitive());
        assert!(Value::Number(1.0).is_primitive());
        assert!(Value::Boolean(false).is_primitive());
        assert!(!Value::Nil.is_primitive());
        assert!(!Value::Array(vec![]).is_primitive());
    }

    #[test]
    fn test_native_equality_is_identity() {
        let a = NativeFunction::new("a", |_, _| Ok(Value::Nil));
        let b = NativeFunction::new("a", |_, _| Ok(Value::Nil));
        assert_eq!(Value::NativeFunction(a.clone()), Value::NativeFunction(a.clone()));
        assert_ne!(Value::NativeFunction(a), Value::NativeFunction(b));
    }
}
