//! `exec`: run an external command with inherited stdio

use std::path::Path;
use std::process::Command;
use tracing::debug;

use super::{resolve, split_options, string_args, usage};
use crate::error::{KeelError, KeelResult};
use crate::runtime::{Scope, Value};

pub(super) fn exec(base_dir: &Path, args: &[Value], scope: &Scope) -> KeelResult<Value> {
    let (positional, options) = split_options(args);
    let mut argv = string_args(positional);
    if argv.is_empty() {
        return Err(usage("exec", "a command"));
    }
    let program = argv.remove(0);

    let mut cwd = base_dir.to_path_buf();
    if let Some(options) = options {
        match options.get("args") {
            Some(extra @ Value::Array(_)) => argv.extend(string_args(std::slice::from_ref(extra))),
            Some(other) => {
                return Err(KeelError::runtime_error(
                    format!("exec(): 'args' must be an array, got {}", other.type_name()),
                    None,
                ))
            }
            None => {}
        }
        if let Some(dir) = options.get("cwd") {
            cwd = resolve(base_dir, &dir.to_string());
        }
    }

    // The scope's env table wins so `env PATH = ...` takes effect.
    let search_path = scope.env().get("PATH").or_else(|| std::env::var("PATH").ok());
    let binary = which::which_in(&program, search_path, &cwd).map_err(|_| {
        KeelError::runtime_error(format!("exec(): command '{}' not found", program), None)
    })?;

    debug!(command = %binary.display(), args = ?argv, cwd = %cwd.display(), "spawning");
    let status = Command::new(&binary)
        .args(&argv)
        .current_dir(&cwd)
        .status()
        .map_err(|e| KeelError::runtime_error(format!("exec(): failed to start '{}': {}", program, e), None))?;

    if !status.success() {
        let code = status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "a signal".to_string());
        return Err(KeelError::runtime_error(
            format!("exec(): '{}' exited with {}", program, code),
            None,
        ));
    }
    Ok(Value::Nil)
}

#[cfg(all(test, unix))]
mod tests {
    use crate::builtins::tests::{call, scope_in};
    use crate::runtime::Value;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exec_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let scope = scope_in(dir.path());

        assert_eq!(call(&scope, "exec", &["true".into()]).unwrap(), Value::Nil);

        let err = call(&scope, "exec", &["false".into()]).unwrap_err();
        assert_eq!(err.message(), "exec(): 'false' exited with 1");
    }

    #[test]
    fn test_exec_unknown_command() {
        let dir = tempfile::tempdir().unwrap();
        let scope = scope_in(dir.path());
        let err = call(&scope, "exec", &["keel-no-such-command".into()]).unwrap_err();
        assert!(err.message().contains("not found"));
        assert!(call(&scope, "exec", &[]).is_err());
    }

    #[test]
    fn test_exec_flattens_arguments_and_runs_in_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let scope = scope_in(dir.path());
        let script = Value::Array(vec!["-c".into(), "echo \"$0 $1\" > out.txt".into()]);
        call(&scope, "exec", &["sh".into(), script, "a".into(), "b".into()]).unwrap();

        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "a b");
    }

    #[test]
    fn test_exec_named_args_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let scope = scope_in(dir.path());

        let mut options = IndexMap::new();
        options.insert(
            "args".to_string(),
            Value::Array(vec!["-c".into(), "touch marker".into()]),
        );
        options.insert("cwd".to_string(), Value::from("sub"));
        call(&scope, "exec", &["sh".into(), Value::Object(options)]).unwrap();

        assert!(dir.path().join("sub/marker").exists());
    }
}
