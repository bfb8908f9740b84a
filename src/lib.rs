//! # Keel
//!
//! A small interpreted build-automation language. A `Buildfile` declares
//! variables, platform-dependent tools and tasks with dependencies; the
//! engine runs a requested task after its dependencies, each at most once.
//!
//! ## Architecture
//!
//! - `lexer`: Tokenization of Buildfile source
//! - `parser`: Recursive-descent parsing into an AST
//! - `runtime`: Values, scopes, platform detection and the task engine
//! - `builtins`: Host functions (`path`, `glob`, `rm`, `mkdir`, `echo`, `warn`, `exec`)
//! - `discovery`: Locating the Buildfile for a working directory
//! - `error`: Error handling and diagnostics

pub mod builtins;
pub mod discovery;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;

use std::path::Path;

// Re-export commonly used types
pub use error::{Diagnostic, KeelError, KeelResult, SourceLocation};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::{Parser, Program};
pub use runtime::{Engine, EnvVars, MemoryEnv, Platform, ProcessEnv, Value};

/// Version of the keel tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn tokenize(source: &str, filename: Option<&str>) -> KeelResult<Vec<Token>> {
    Lexer::new(source, filename).tokenize()
}

pub fn parse(source: &str, filename: Option<&str>) -> KeelResult<Program> {
    Parser::new(tokenize(source, filename)?).parse()
}

/// Parse `source` and load it into an engine for the host platform with
/// the builtins installed, resolving relative paths against `base_dir`.
pub fn load_source(source: &str, filename: Option<&str>, base_dir: &Path) -> KeelResult<Engine> {
    let program = parse(source, filename)?;
    let mut engine = Engine::host();
    builtins::install(engine.root(), base_dir)?;
    engine.load(&program)?;
    Ok(engine)
}

/// Load `source` and run `task`.
pub fn run_source(source: &str, filename: Option<&str>, base_dir: &Path, task: &str) -> KeelResult<()> {
    load_source(source, filename, base_dir)?.run(task)
}
