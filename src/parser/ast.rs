//! Abstract Syntax Tree definitions
//!
//! This module defines the AST node types for Buildfiles.

use std::fmt;

use crate::error::SourceLocation;

/// Root AST node representing a complete Buildfile
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let x = 1`, `const X = "a"`, `env PATH_EXTRA = "bin"`
    VarDecl {
        name: String,
        is_const: bool,
        is_env: bool,
        initializer: Option<Expr>,
        location: SourceLocation,
    },

    /// `task build depends (clean, fmt) { ... }`
    TaskDecl {
        name: String,
        dependencies: Vec<String>,
        body: Vec<Stmt>,
        location: SourceLocation,
    },

    /// `tool python { windows: "py", unix: "python3" }`
    ToolDecl {
        name: String,
        options: Vec<ToolOption>,
        location: SourceLocation,
    },

    /// `plat windows { ... } else { ... }` or `arch arm64 { ... }`
    PlatformBlock {
        kind: BlockKind,
        selector: String,
        body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        location: SourceLocation,
    },

    /// Expression statement
    Expression {
        expr: Expr,
        location: SourceLocation,
    },
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier {
        name: String,
        location: SourceLocation,
    },

    /// Raw string contents; `${name}` is substituted at evaluation time
    String {
        raw: String,
        location: SourceLocation,
    },

    Number {
        value: f64,
        location: SourceLocation,
    },

    Boolean {
        value: bool,
        location: SourceLocation,
    },

    Array {
        elements: Vec<ArrayElement>,
        location: SourceLocation,
    },

    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        location: SourceLocation,
    },

    Assign {
        target: String,
        value: Box<Expr>,
        location: SourceLocation,
    },

    Call {
        callee: Box<Expr>,
        arguments: Vec<Argument>,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Expr::Identifier { location, .. }
            | Expr::String { location, .. }
            | Expr::Number { location, .. }
            | Expr::Boolean { location, .. }
            | Expr::Array { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Assign { location, .. }
            | Expr::Call { location, .. } => location,
        }
    }
}

/// A single argument at a call site
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Positional(Expr),
    /// `name: value`, gathered into the trailing object argument
    Named { name: String, value: Expr },
    /// `...expr`
    Spread(Expr),
}

/// An element of an array literal
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Item(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Which host property a platform block tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Plat,
    Arch,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Plat => f.write_str("plat"),
            BlockKind::Arch => f.write_str("arch"),
        }
    }
}

/// Platform half of a tool option key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformKey {
    /// `any`: every platform
    Any,
    /// `unix`: every platform except windows
    Unix,
    Named(String),
}

impl PlatformKey {
    pub fn from_name(name: &str) -> Self {
        match name {
            "any" => PlatformKey::Any,
            "unix" => PlatformKey::Unix,
            other => PlatformKey::Named(other.to_string()),
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKey::Any => f.write_str("any"),
            PlatformKey::Unix => f.write_str("unix"),
            PlatformKey::Named(name) => f.write_str(name),
        }
    }
}

/// One `key: value` entry of a tool declaration. The value stays
/// unevaluated until the tool is called.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOption {
    pub platform: PlatformKey,
    pub arch: Option<String>,
    pub value: Expr,
}
