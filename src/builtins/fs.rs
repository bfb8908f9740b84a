//! Filesystem builtins: `path`, `glob`, `rm`, `mkdir`

use regex::Regex;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{resolve, split_options, string_args, usage};
use crate::error::{KeelError, KeelResult};
use crate::runtime::{Scope, Value};

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

pub(super) fn path(base_dir: &Path, args: &[Value], _: &Scope) -> KeelResult<Value> {
    let (positional, _) = split_options(args);
    let mut joined = base_dir.to_path_buf();
    for segment in string_args(positional) {
        joined.push(segment);
    }
    Ok(Value::String(normalize(&joined).to_string_lossy().into_owned()))
}

/// Translate a glob pattern to an anchored regex over `/`-separated paths.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }

    out.push('$');
    out
}

fn is_wild(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

pub(super) fn glob(base_dir: &Path, args: &[Value], _: &Scope) -> KeelResult<Value> {
    let pattern = match split_options(args).0 {
        [Value::String(pattern)] => pattern.replace('\\', "/"),
        _ => return Err(usage("glob", "a single pattern string")),
    };

    // Walk from the longest wildcard-free directory prefix.
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal = segments
        .iter()
        .position(|segment| is_wild(segment))
        .unwrap_or(segments.len().saturating_sub(1));
    let prefix = segments[..literal].join("/");
    let root = if pattern.starts_with('/') {
        PathBuf::from("/").join(prefix)
    } else if prefix.is_empty() {
        base_dir.to_path_buf()
    } else {
        base_dir.join(prefix)
    };
    let rest = segments[literal..].join("/");

    let matcher = Regex::new(&glob_to_regex(&rest)).map_err(|e| {
        KeelError::runtime_error(format!("glob(): invalid pattern '{}': {}", pattern, e), None)
    })?;

    let mut matches = Vec::new();
    for entry in WalkDir::new(&root).min_depth(1).into_iter().filter_map(Result::ok) {
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if matcher.is_match(&relative) {
            matches.push(normalize(entry.path()).to_string_lossy().into_owned());
        }
    }
    matches.sort();

    debug!(pattern = %pattern, root = %root.display(), count = matches.len(), "glob");
    Ok(Value::Array(matches.into_iter().map(Value::String).collect()))
}

pub(super) fn rm(base_dir: &Path, args: &[Value], _: &Scope) -> KeelResult<Value> {
    let (positional, options) = split_options(args);
    let (target, force) = match positional {
        [Value::String(target)] => (target, false),
        [Value::String(target), flag] => (target, *flag == Value::Boolean(true)),
        _ => return Err(usage("rm", "a path and an optional force flag")),
    };
    let force = force || options.and_then(|o| o.get("force")) == Some(&Value::Boolean(true));
    let path = resolve(base_dir, target);

    let metadata = match std::fs::symlink_metadata(&path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "rm: nothing to remove");
            return Ok(Value::Nil);
        }
        Err(e) => return Err(fs_error("rm", &path, e)),
    };

    let result = if !metadata.is_dir() {
        std::fs::remove_file(&path)
    } else if force {
        std::fs::remove_dir_all(&path)
    } else {
        std::fs::remove_dir(&path)
    };
    result.map_err(|e| fs_error("rm", &path, e))?;

    debug!(path = %path.display(), force, "removed");
    Ok(Value::Nil)
}

pub(super) fn mkdir(base_dir: &Path, args: &[Value], _: &Scope) -> KeelResult<Value> {
    let target = match split_options(args).0 {
        [Value::String(target)] => target,
        _ => return Err(usage("mkdir", "a single path")),
    };
    let path = resolve(base_dir, target);
    std::fs::create_dir_all(&path).map_err(|e| fs_error("mkdir", &path, e))?;
    Ok(Value::Nil)
}

fn fs_error(op: &str, path: &Path, err: std::io::Error) -> KeelError {
    KeelError::runtime_error(format!("{}(): '{}': {}", op, path.display(), err), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::tests::{call, scope_in};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn strings(value: Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.into_iter().map(|v| v.to_string()).collect(),
            other => panic!("expected array, got {:?}", other),
        }
    }

    fn force() -> Value {
        let mut options = IndexMap::new();
        options.insert("force".to_string(), Value::Boolean(true));
        Value::Object(options)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_path_joins_onto_base_dir() {
        let scope = scope_in(Path::new("/work/app"));
        let joined = call(&scope, "path", &["dist".into(), "bin".into()]).unwrap();
        assert_eq!(joined, Value::from("/work/app/dist/bin"));

        let up = call(&scope, "path", &["../shared".into()]).unwrap();
        assert_eq!(up, Value::from("/work/shared"));

        let absolute = call(&scope, "path", &["dist".into(), "/opt/tool".into()]).unwrap();
        assert_eq!(absolute, Value::from("/opt/tool"));

        assert_eq!(call(&scope, "path", &[]).unwrap(), Value::from("/work/app"));
    }

    #[test]
    fn test_glob_to_regex() {
        assert_eq!(glob_to_regex("*.rs"), r"^[^/]*\.rs$");
        assert_eq!(glob_to_regex("**/*.c"), r"^(?:.*/)?[^/]*\.c$");
        assert_eq!(glob_to_regex("a?"), "^a[^/]$");
        assert_eq!(glob_to_regex("src/**"), "^src/.*$");
    }

    #[test]
    fn test_glob_matches_sorted_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join("src/b.c"), "").unwrap();
        fs::write(root.join("src/a.c"), "").unwrap();
        fs::write(root.join("src/nested/c.c"), "").unwrap();
        fs::write(root.join("src/notes.txt"), "").unwrap();

        let scope = scope_in(root);
        let shallow = strings(call(&scope, "glob", &["src/*.c".into()]).unwrap());
        let expected: Vec<String> = ["src/a.c", "src/b.c"]
            .iter()
            .map(|p| root.join(p).to_string_lossy().into_owned())
            .collect();
        assert_eq!(shallow, expected);

        let deep = strings(call(&scope, "glob", &["**/*.c".into()]).unwrap());
        assert_eq!(deep.len(), 3);
        assert!(deep.windows(2).all(|w| w[0] <= w[1]));
        assert!(deep.iter().all(|p| Path::new(p).is_absolute()));
    }

    #[test]
    fn test_glob_without_matches_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scope = scope_in(dir.path());
        assert_eq!(call(&scope, "glob", &["missing/*.c".into()]).unwrap(), Value::Array(vec![]));
        assert!(call(&scope, "glob", &[]).is_err());
    }

    #[test]
    fn test_mkdir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let scope = scope_in(dir.path());
        call(&scope, "mkdir", &["out/a/b".into()]).unwrap();
        assert!(dir.path().join("out/a/b").is_dir());
        call(&scope, "mkdir", &["out/a/b".into()]).unwrap();
    }

    #[test]
    fn test_rm() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("dist/sub")).unwrap();
        fs::write(root.join("dist/sub/file"), "x").unwrap();
        fs::write(root.join("loose"), "x").unwrap();
        let scope = scope_in(root);

        call(&scope, "rm", &["loose".into()]).unwrap();
        assert!(!root.join("loose").exists());

        assert!(call(&scope, "rm", &["dist".into()]).is_err());
        assert!(root.join("dist").exists());

        call(&scope, "rm", &["dist".into(), force()]).unwrap();
        assert!(!root.join("dist").exists());

        call(&scope, "rm", &["dist".into(), true.into()]).unwrap();
    }
}
