//! Lexical analysis module
//!
//! This module handles tokenization of Buildfile source code.

pub mod scanner;
pub mod token;

pub use scanner::Lexer;
pub use token::{Keyword, Token, TokenType};
