//! Host builtins available to every Buildfile
//!
//! `install` binds `path`, `glob`, `rm`, `mkdir`, `echo`, `warn` and `exec`
//! as constants in a scope. Relative paths resolve against the directory
//! passed to `install`, normally the one holding the Buildfile.

mod exec;
mod fs;

use colored::*;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{KeelError, KeelResult};
use crate::runtime::{NativeFunction, Scope, Value};

pub use fs::{glob_to_regex, normalize};

/// Bind every builtin in `scope`.
pub fn install(scope: &Scope, base_dir: impl Into<PathBuf>) -> KeelResult<()> {
    let base_dir: Rc<Path> = Rc::from(base_dir.into());

    let natives = [
        native("path", &base_dir, fs::path),
        native("glob", &base_dir, fs::glob),
        native("rm", &base_dir, fs::rm),
        native("mkdir", &base_dir, fs::mkdir),
        native("exec", &base_dir, exec::exec),
        NativeFunction::new("echo", |args, _| {
            println!("{}", join_line(args));
            Ok(Value::Nil)
        }),
        NativeFunction::new("warn", |args, _| {
            eprintln!("{}", format!("warning: {}", join_line(args)).yellow().bold());
            Ok(Value::Nil)
        }),
    ];

    for func in natives {
        let name = func.name.clone();
        scope.declare(&name, Value::NativeFunction(func), true, false)?;
    }
    Ok(())
}

fn native(
    name: &'static str,
    base_dir: &Rc<Path>,
    func: fn(&Path, &[Value], &Scope) -> KeelResult<Value>,
) -> NativeFunction {
    let base_dir = Rc::clone(base_dir);
    NativeFunction::new(name, move |args, scope| func(&base_dir, args, scope))
}

/// Separate a trailing named-argument object from the positional arguments.
pub(crate) fn split_options(args: &[Value]) -> (&[Value], Option<&IndexMap<String, Value>>) {
    match args.split_last() {
        Some((Value::Object(options), rest)) => (rest, Some(options)),
        _ => (args, None),
    }
}

/// Stringify arguments, flattening arrays one element at a time.
pub(crate) fn string_args(args: &[Value]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        flatten_into(arg, &mut out);
    }
    out
}

fn flatten_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        other => out.push(other.to_string()),
    }
}

pub(crate) fn resolve(base_dir: &Path, target: &str) -> PathBuf {
    normalize(&base_dir.join(target))
}

pub(crate) fn usage(name: &str, expected: &str) -> KeelError {
    KeelError::runtime_error(format!("{}() expects {}", name, expected), None)
}

fn join_line(args: &[Value]) -> String {
    args.iter().map(Value::to_string).collect::<Vec<_>>().join(" ")
}
