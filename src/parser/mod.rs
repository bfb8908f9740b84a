//! Parser module
//!
//! This module handles parsing tokens into an Abstract Syntax Tree (AST).

pub mod ast;
pub mod parser;

pub use ast::{Argument, ArrayElement, BinaryOp, BlockKind, Expr, PlatformKey, Program, Stmt, ToolOption};
pub use parser::Parser;
