//! Runtime module
//!
//! Values, scopes, platform detection and the task engine.

pub mod engine;
pub mod environment;
pub mod platform;
pub mod value;

pub use engine::Engine;
pub use environment::{EnvVars, MemoryEnv, ProcessEnv, Scope};
pub use platform::Platform;
pub use value::{NativeFunction, TaskValue, ToolValue, Value};
