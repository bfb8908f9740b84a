//! Tree-walking evaluator and task orchestrator
//!
//! `load` declares every top-level binding into the root scope; `run`
//! executes a task after its dependencies, depth-first, each at most once
//! per engine.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info};

use super::environment::{EnvVars, ProcessEnv, Scope};
use super::platform::{self, Platform};
use super::value::{TaskValue, ToolValue, Value};
use crate::error::{KeelError, KeelResult, SourceLocation};
use crate::parser::ast::{Argument, ArrayElement, BinaryOp, BlockKind, Expr, Program, Stmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Visiting,
    Completed,
}

pub struct Engine {
    root: Scope,
    platform: Platform,
    tasks: Vec<Rc<TaskValue>>,
    states: HashMap<String, TaskState>,
}

impl Engine {
    pub fn new(platform: Platform, env: Rc<dyn EnvVars>) -> Self {
        Self {
            root: Scope::root(env),
            platform,
            tasks: Vec::new(),
            states: HashMap::new(),
        }
    }

    /// Engine for the machine it runs on, wired to the process environment.
    pub fn host() -> Self {
        Self::new(Platform::current(), Rc::new(ProcessEnv))
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Declared tasks in source order.
    pub fn tasks(&self) -> &[Rc<TaskValue>] {
        &self.tasks
    }

    /// Declare every top-level statement of `program` in the root scope.
    pub fn load(&mut self, program: &Program) -> KeelResult<()> {
        for stmt in &program.body {
            match stmt {
                Stmt::TaskDecl {
                    name,
                    dependencies,
                    body,
                    location,
                } => {
                    let task = Rc::new(TaskValue {
                        name: name.clone(),
                        dependencies: dependencies.clone(),
                        body: body.clone(),
                        location: location.clone(),
                    });
                    self.root
                        .declare(name, Value::Task(Rc::clone(&task)), true, false)
                        .map_err(|e| e.or_at(location))?;
                    self.tasks.push(task);
                }
                Stmt::ToolDecl {
                    name,
                    options,
                    location,
                } => {
                    let tool = ToolValue {
                        name: name.clone(),
                        options: options.clone(),
                        location: location.clone(),
                    };
                    self.root
                        .declare(name, Value::Tool(Rc::new(tool)), true, false)
                        .map_err(|e| e.or_at(location))?;
                }
                Stmt::VarDecl { .. } => {
                    let root = self.root.clone();
                    self.execute(stmt, &root)?;
                }
                Stmt::PlatformBlock { .. } | Stmt::Expression { .. } => {
                    return Err(KeelError::internal_error(
                        "executable statement reached the top level of a program",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Run `name` after its dependencies. Completed tasks are skipped.
    ///
    /// A failed task is forgotten, so a later `run` retries it instead of
    /// reporting a cycle.
    pub fn run(&mut self, name: &str) -> KeelResult<()> {
        match self.states.get(name) {
            Some(TaskState::Completed) => {
                debug!(task = %name, "already completed, skipping");
                return Ok(());
            }
            Some(TaskState::Visiting) => {
                return Err(KeelError::runtime_error(
                    format!("Circular dependency detected: task '{}' depends on itself through its dependencies", name),
                    None,
                ));
            }
            None => {}
        }

        let task = match self.root.get(name) {
            Some(Value::Task(task)) => task,
            Some(other) => {
                return Err(KeelError::runtime_error(
                    format!("'{}' is a {}, not a task", name, other.type_name()),
                    None,
                ))
            }
            None => {
                return Err(KeelError::runtime_error(format!("Undefined task '{}'", name), None));
            }
        };

        self.states.insert(name.to_string(), TaskState::Visiting);
        match self.run_task(&task) {
            Ok(()) => {
                self.states.insert(name.to_string(), TaskState::Completed);
                Ok(())
            }
            Err(err) => {
                self.states.remove(name);
                Err(err.in_task(name))
            }
        }
    }

    fn run_task(&mut self, task: &TaskValue) -> KeelResult<()> {
        for dependency in &task.dependencies {
            self.run(dependency).map_err(|e| e.or_at(&task.location))?;
        }

        info!(task = %task.name, "running task");
        let scope = self.root.child();
        for stmt in &task.body {
            self.execute(stmt, &scope)?;
        }
        Ok(())
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.states.get(name) == Some(&TaskState::Completed)
    }

    // ===== Statements =====

    pub fn execute(&self, stmt: &Stmt, scope: &Scope) -> KeelResult<()> {
        match stmt {
            Stmt::VarDecl {
                name,
                is_const,
                is_env,
                initializer,
                location,
            } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, scope)?,
                    None => Value::Nil,
                };
                scope
                    .declare(name, value, *is_const, *is_env)
                    .map_err(|e| e.or_at(location))?;
                Ok(())
            }

            Stmt::PlatformBlock {
                kind,
                selector,
                body,
                else_body,
                ..
            } => {
                let matched = match kind {
                    BlockKind::Plat => self.platform.matches_plat(selector),
                    BlockKind::Arch => self.platform.matches_arch(selector),
                };
                debug!(block = %kind, selector = %selector, platform = %self.platform, matched, "platform block");

                let chosen = if matched { Some(body) } else { else_body.as_ref() };
                for stmt in chosen.into_iter().flatten() {
                    self.execute(stmt, scope)?;
                }
                Ok(())
            }

            Stmt::Expression { expr, .. } => {
                self.evaluate(expr, scope)?;
                Ok(())
            }

            Stmt::TaskDecl { name, .. } | Stmt::ToolDecl { name, .. } => Err(KeelError::internal_error(format!(
                "declaration of '{}' reached the statement evaluator",
                name
            ))),
        }
    }

    // ===== Expressions =====

    pub fn evaluate(&self, expr: &Expr, scope: &Scope) -> KeelResult<Value> {
        match expr {
            Expr::Identifier { name, location } => scope.lookup(name).map_err(|e| e.or_at(location)),

            Expr::String { raw, location } => Ok(Value::String(self.interpolate(raw, scope, location)?)),

            Expr::Number { value, .. } => Ok(Value::Number(*value)),

            Expr::Boolean { value, .. } => Ok(Value::Boolean(*value)),

            Expr::Array { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        ArrayElement::Item(expr) => items.push(self.evaluate(expr, scope)?),
                        ArrayElement::Spread(expr) => self.spread_into(&mut items, expr, scope)?,
                    }
                }
                Ok(Value::Array(items))
            }

            Expr::Binary {
                left,
                operator,
                right,
                location,
            } => {
                let left_val = self.evaluate(left, scope)?;
                let right_val = self.evaluate(right, scope)?;
                self.eval_binary(left_val, *operator, right_val, location)
            }

            Expr::Assign { target, value, location } => {
                let val = self.evaluate(value, scope)?;
                scope
                    .assign(target, val.clone())
                    .map_err(|e| e.or_at(location))?;
                Ok(val)
            }

            Expr::Call {
                callee,
                arguments,
                location,
            } => {
                let func = self.evaluate(callee, scope)?;
                let args = self.evaluate_arguments(arguments, scope)?;
                self.call_value(func, args, scope, location)
            }
        }
    }

    /// Replace each `${name}` in `raw` with the stringified binding.
    fn interpolate(&self, raw: &str, scope: &Scope, location: &SourceLocation) -> KeelResult<String> {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            match after.find('}') {
                Some(end) if is_identifier(after[..end].trim()) => {
                    let name = after[..end].trim();
                    let value = scope.get(name).ok_or_else(|| {
                        KeelError::runtime_error(
                            format!("Undefined variable '{}' in string interpolation", name),
                            Some(location.clone()),
                        )
                    })?;
                    out.push_str(&value.to_string());
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push_str("${");
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    fn spread_into(&self, items: &mut Vec<Value>, expr: &Expr, scope: &Scope) -> KeelResult<()> {
        match self.evaluate(expr, scope)? {
            Value::Array(values) => {
                items.extend(values);
                Ok(())
            }
            other => Err(KeelError::runtime_error(
                format!("Cannot spread a {}; only arrays can be spread", other.type_name()),
                Some(expr.location().clone()),
            )),
        }
    }

    /// Positional and spread arguments in order, then one object holding
    /// every named argument if there were any.
    fn evaluate_arguments(&self, arguments: &[Argument], scope: &Scope) -> KeelResult<Vec<Value>> {
        let mut values = Vec::with_capacity(arguments.len());
        let mut named = IndexMap::new();

        for argument in arguments {
            match argument {
                Argument::Positional(expr) => values.push(self.evaluate(expr, scope)?),
                Argument::Spread(expr) => self.spread_into(&mut values, expr, scope)?,
                Argument::Named { name, value } => {
                    let value = self.evaluate(value, scope)?;
                    named.insert(name.clone(), value);
                }
            }
        }

        if !named.is_empty() {
            values.push(Value::Object(named));
        }
        Ok(values)
    }

    fn eval_binary(&self, left: Value, op: BinaryOp, right: Value, location: &SourceLocation) -> KeelResult<Value> {
        match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Divide => a / b,
                BinaryOp::Modulo => a % b,
            })),
            _ if op == BinaryOp::Add => Ok(Value::String(format!("{}{}", left, right))),
            _ => Err(KeelError::runtime_error(
                format!(
                    "Cannot apply '{}' to {} and {}",
                    op,
                    left.type_name(),
                    right.type_name()
                ),
                Some(location.clone()),
            )),
        }
    }

    fn call_value(&self, func: Value, args: Vec<Value>, scope: &Scope, location: &SourceLocation) -> KeelResult<Value> {
        match func {
            Value::NativeFunction(native) => native.call(&args, scope),

            Value::Tool(tool) => {
                let path = self.resolve_tool(&tool, scope, location)?;
                let exec = match scope.get("exec") {
                    Some(Value::NativeFunction(exec)) => exec,
                    _ => {
                        return Err(KeelError::runtime_error(
                            format!("Cannot run tool '{}': no 'exec' builtin is available", tool.name),
                            Some(location.clone()),
                        ))
                    }
                };

                let mut exec_args = Vec::with_capacity(args.len() + 1);
                exec_args.push(Value::String(path));
                exec_args.extend(args);
                exec.call(&exec_args, scope)
            }

            other => Err(KeelError::runtime_error(
                format!("Cannot call a {} value", other.type_name()),
                Some(location.clone()),
            )),
        }
    }

    /// Evaluate the best-scoring option of `tool` for this platform.
    fn resolve_tool(&self, tool: &ToolValue, scope: &Scope, location: &SourceLocation) -> KeelResult<String> {
        let Some((option, score)) = platform::resolve(&tool.options, &self.platform) else {
            return Err(KeelError::runtime_error(
                format!(
                    "Tool '{}' has no entry for platform '{}' on architecture '{}'",
                    tool.name, self.platform.os, self.platform.arch
                ),
                Some(location.clone()),
            ));
        };

        let path = self.evaluate(&option.value, scope)?.to_string();
        debug!(
            tool = %tool.name,
            platform = %option.platform,
            arch = option.arch.as_deref().unwrap_or("*"),
            score,
            path = %path,
            "resolved tool"
        );
        Ok(path)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}
