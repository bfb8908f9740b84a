//! Lexical scopes and the environment-variable capability
//!
//! Scopes form a parent-linked chain of reference-counted frames. The root
//! frame belongs to the engine; every task run gets a fresh child of the
//! root. Names declared with `env` are mirrored into an [`EnvVars`] store
//! injected at construction.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::value::Value;
use crate::error::{KeelError, KeelResult};

/// External environment-variable table
pub trait EnvVars {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str) -> KeelResult<()>;
}

/// Reject what the operating system cannot store in its environment.
fn check_exportable(name: &str, value: &str) -> KeelResult<()> {
    if name.is_empty() || name.contains(['=', '\0']) {
        return Err(KeelError::runtime_error(
            format!("Cannot export '{}': not a valid environment variable name", name),
            None,
        ));
    }
    if value.contains('\0') {
        return Err(KeelError::runtime_error(
            format!("Cannot export '{}': value contains a NUL character", name),
            None,
        ));
    }
    Ok(())
}

/// The real process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvVars for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set(&self, name: &str, value: &str) -> KeelResult<()> {
        check_exportable(name, value)?;
        std::env::set_var(name, value);
        Ok(())
    }
}

/// In-memory table for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: RefCell<HashMap<String, String>>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: RefCell::new(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }
}

impl EnvVars for MemoryEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.borrow().get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> KeelResult<()> {
        check_exportable(name, value)?;
        self.vars.borrow_mut().insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug)]
struct Binding {
    value: Value,
    is_const: bool,
    is_env: bool,
}

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, Binding>,
    parent: Option<Rc<RefCell<Frame>>>,
}

/// Handle to one frame of the scope chain. Cloning the handle shares the
/// frame.
#[derive(Clone)]
pub struct Scope {
    frame: Rc<RefCell<Frame>>,
    env: Rc<dyn EnvVars>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.depth())
            .field("names", &self.frame.borrow().bindings.len())
            .finish()
    }
}

impl Scope {
    /// Create a root scope backed by the given environment-variable table.
    pub fn root(env: Rc<dyn EnvVars>) -> Self {
        Self {
            frame: Rc::new(RefCell::new(Frame::default())),
            env,
        }
    }

    /// Create a child frame whose lookups fall back to this one.
    pub fn child(&self) -> Self {
        Self {
            frame: Rc::new(RefCell::new(Frame {
                bindings: HashMap::new(),
                parent: Some(Rc::clone(&self.frame)),
            })),
            env: Rc::clone(&self.env),
        }
    }

    pub fn env(&self) -> &Rc<dyn EnvVars> {
        &self.env
    }

    /// Number of frames from here to the root, inclusive.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut parent = self.frame.borrow().parent.clone();
        while let Some(frame) = parent {
            depth += 1;
            parent = frame.borrow().parent.clone();
        }
        depth
    }

    /// Declare `name` in this frame and return the value actually bound.
    ///
    /// For env-linked names a non-empty external value replaces `value`;
    /// otherwise a primitive `value` is written out to the table.
    pub fn declare(&self, name: &str, value: Value, is_const: bool, is_env: bool) -> KeelResult<Value> {
        let mut frame = self.frame.borrow_mut();
        if frame.bindings.contains_key(name) {
            return Err(KeelError::runtime_error(
                format!("'{}' is already declared in this scope", name),
                None,
            ));
        }

        let value = if is_env {
            match self.env.get(name) {
                Some(external) if !external.is_empty() => Value::String(external),
                _ => {
                    self.sync_env(name, &value)?;
                    value
                }
            }
        } else {
            value
        };

        frame.bindings.insert(
            name.to_string(),
            Binding {
                value: value.clone(),
                is_const,
                is_env,
            },
        );
        Ok(value)
    }

    /// Rebind the nearest declaration of `name`.
    pub fn assign(&self, name: &str, value: Value) -> KeelResult<()> {
        let mut frame = Rc::clone(&self.frame);
        loop {
            let parent = {
                let mut current = frame.borrow_mut();
                if let Some(binding) = current.bindings.get_mut(name) {
                    if binding.is_const {
                        return Err(KeelError::runtime_error(
                            format!("Cannot assign to constant '{}'", name),
                            None,
                        ));
                    }
                    if binding.is_env {
                        self.sync_env(name, &value)?;
                    }
                    binding.value = value;
                    return Ok(());
                }
                current.parent.clone()
            };

            match parent {
                Some(next) => frame = next,
                None => {
                    return Err(KeelError::runtime_error(
                        format!("Cannot assign to undeclared variable '{}'", name),
                        None,
                    ))
                }
            }
        }
    }

    /// Resolve `name` through the chain.
    pub fn lookup(&self, name: &str) -> KeelResult<Value> {
        self.get(name).ok_or_else(|| {
            KeelError::runtime_error(format!("Undefined variable '{}'", name), None)
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut frame = Rc::clone(&self.frame);
        loop {
            let parent = {
                let current = frame.borrow();
                if let Some(binding) = current.bindings.get(name) {
                    return Some(binding.value.clone());
                }
                current.parent.clone()
            };
            frame = parent?;
        }
    }

    /// Whether `name` is declared in this frame itself.
    pub fn contains_local(&self, name: &str) -> bool {
        self.frame.borrow().bindings.contains_key(name)
    }

    fn sync_env(&self, name: &str, value: &Value) -> KeelResult<()> {
        if value.is_primitive() {
            self.env.set(name, &value.to_string())?;
        }
        Ok(())
    }
}
