//! End-to-end behavior of loading and running Buildfiles.

use keel_lang::runtime::NativeFunction;
use keel_lang::{parse, Engine, EnvVars, KeelError, MemoryEnv, Platform, Value};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

/// Engine with `exec` and `log` natives that record their calls.
struct Harness {
    engine: Engine,
    calls: Rc<RefCell<Vec<String>>>,
    env: Rc<MemoryEnv>,
}

impl Harness {
    fn new(source: &str) -> Self {
        Self::on(source, Platform::new("linux", "x86_64"), MemoryEnv::new())
    }

    fn on(source: &str, platform: Platform, env: MemoryEnv) -> Self {
        let env = Rc::new(env);
        let mut engine = Engine::new(platform, env.clone());
        let calls = Rc::new(RefCell::new(Vec::new()));

        for name in ["exec", "log"] {
            let sink = Rc::clone(&calls);
            let native = NativeFunction::new(name, move |args, _| {
                let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
                sink.borrow_mut().push(format!("{}({})", name, rendered.join(" ")));
                Ok(Value::Nil)
            });
            engine
                .root()
                .declare(name, Value::NativeFunction(native), true, false)
                .unwrap();
        }

        let program = parse(source, Some("Buildfile")).unwrap();
        engine.load(&program).unwrap();
        Self { engine, calls, env }
    }

    fn run(&mut self, task: &str) -> Result<Vec<String>, KeelError> {
        self.engine.run(task)?;
        Ok(self.calls.borrow().clone())
    }
}

#[test]
fn dependencies_run_first_in_declared_order() {
    let mut h = Harness::new(
        r#"
        task clean { log("clean") }
        task fetch { log("fetch") }
        task compile depends (clean, fetch) { log("compile") }
        task default depends compile { log("default") }
        "#,
    );
    assert_eq!(
        h.run("default").unwrap(),
        vec!["log(clean)", "log(fetch)", "log(compile)", "log(default)"]
    );
}

#[test]
fn shared_dependency_runs_once() {
    let mut h = Harness::new(
        r#"
        task setup { log("setup") }
        task a depends setup { log("a") }
        task b depends setup { log("b") }
        task all depends (a, b) { log("all") }
        "#,
    );
    assert_eq!(h.run("all").unwrap(), vec!["log(setup)", "log(a)", "log(b)", "log(all)"]);

    // A second request on the same engine is memoized.
    assert_eq!(h.run("all").unwrap().len(), 4);
    assert_eq!(h.run("setup").unwrap().len(), 4);
    assert!(h.engine.is_completed("setup"));
}

#[test]
fn cycle_fails_before_any_body_runs() {
    let mut h = Harness::new(
        r#"
        task a depends b { log("a") }
        task b depends a { log("b") }
        "#,
    );
    let err = h.engine.run("a").unwrap_err();
    assert!(matches!(err, KeelError::RuntimeError { .. }));
    assert!(err.message().contains("Circular dependency"));
    assert!(err.message().contains("'a'"));
    assert!(h.calls.borrow().is_empty());
}

#[test]
fn dependency_failure_stops_dependent() {
    let mut h = Harness::new(
        r#"
        task broken { log(missing) }
        task default depends broken { log("never") }
        "#,
    );
    let err = h.run("default").unwrap_err();
    assert_eq!(err.message(), "Undefined variable 'missing'");
    assert_eq!(err.location().map(|l| (l.line, l.column)), Some((2, 27)));
    assert!(h.calls.borrow().is_empty());
}

#[test]
fn tool_resolves_per_platform_and_calls_exec() {
    let source = r#"
        tool python {
            windows: "py",
            [linux, arm64]: "python3-arm",
            unix: "python3",
        }
        task default { python("-m", "build", args: ["--wheel"]) }
    "#;

    let mut arm = Harness::on(source, Platform::new("linux", "aarch64"), MemoryEnv::new());
    assert_eq!(arm.run("default").unwrap(), vec!["exec(python3-arm -m build {args: --wheel})"]);

    let mut x64 = Harness::on(source, Platform::new("linux", "x86_64"), MemoryEnv::new());
    assert_eq!(x64.run("default").unwrap(), vec!["exec(python3 -m build {args: --wheel})"]);

    let mut win = Harness::on(source, Platform::new("win32", "x86_64"), MemoryEnv::new());
    assert_eq!(win.run("default").unwrap(), vec!["exec(py -m build {args: --wheel})"]);
}

#[test]
fn tool_path_can_use_bindings() {
    let mut h = Harness::new(
        r#"
        const SDK = "/opt/sdk"
        tool cc { any: "${SDK}/bin/cc" }
        task default { cc("main.c") }
        "#,
    );
    assert_eq!(h.run("default").unwrap(), vec!["exec(/opt/sdk/bin/cc main.c)"]);
}

#[test]
fn unresolvable_tool_is_an_error() {
    let mut h = Harness::on(
        r#"
        tool make { windows: "nmake.exe" }
        task default { make() }
        "#,
        Platform::new("linux", "x64"),
        MemoryEnv::new(),
    );
    let err = h.run("default").unwrap_err();
    assert_eq!(
        err.message(),
        "Tool 'make' has no entry for platform 'linux' on architecture 'x64'"
    );
    assert!(h.calls.borrow().is_empty());
}

#[test]
fn spread_arguments_match_explicit_arguments() {
    let mut h = Harness::new(
        r#"
        const FLAGS = ["-rf", "/tmp"]
        task default {
            exec("rm", ...FLAGS)
            exec("rm", "-rf", "/tmp")
        }
        "#,
    );
    let calls = h.run("default").unwrap();
    assert_eq!(calls[0], calls[1]);
}

#[test]
fn named_arguments_trail_as_object() {
    let mut h = Harness::new(r#"task default { log("dir", force: true) }"#);
    assert_eq!(h.run("default").unwrap(), vec!["log(dir {force: true})"]);
}

#[test]
fn const_reassignment_fails() {
    let mut h = Harness::new(
        r#"
        const OUT = "dist"
        task default { OUT = "build" }
        "#,
    );
    let err = h.run("default").unwrap_err();
    assert_eq!(err.message(), "Cannot assign to constant 'OUT'");
    assert_eq!(err.location().map(|l| l.line), Some(3));
}

#[test]
fn let_reassignment_is_visible_to_later_tasks() {
    let mut h = Harness::new(
        r#"
        let mode = "debug"
        task configure { mode = "release" }
        task default depends configure {
            let suffix = "-" + mode
            suffix = suffix + "!"
            log(mode, suffix)
        }
        "#,
    );
    assert_eq!(h.run("default").unwrap(), vec!["log(release -release!)"]);
}

#[test]
fn env_declaration_adopts_external_value() {
    let env = MemoryEnv::with_vars([("PROFILE", "ci")]);
    let mut h = Harness::on(
        r#"
        env PROFILE = "local"
        env TARGET = "x64"
        task default { log(PROFILE, TARGET) }
        "#,
        Platform::new("linux", "x64"),
        env,
    );
    assert_eq!(h.run("default").unwrap(), vec!["log(ci x64)"]);
    assert_eq!(h.env.get("TARGET").as_deref(), Some("x64"));
}

#[test]
fn env_assignment_updates_table() {
    let mut h = Harness::new(
        r#"
        env CC = "gcc"
        task default { CC = "clang" }
        "#,
    );
    h.run("default").unwrap();
    assert_eq!(h.env.get("CC").as_deref(), Some("clang"));
}

#[test]
fn platform_blocks_select_by_host() {
    let source = r#"
        task default {
            plat windows { log("copy") } else plat unix { log("cp") }
            arch arm64 { log("neon") }
        }
    "#;
    let mut mac = Harness::on(source, Platform::new("macos", "aarch64"), MemoryEnv::new());
    assert_eq!(mac.run("default").unwrap(), vec!["log(cp)", "log(neon)"]);

    let mut win = Harness::on(source, Platform::new("windows", "x86_64"), MemoryEnv::new());
    assert_eq!(win.run("default").unwrap(), vec!["log(copy)"]);
}

#[test]
fn unsupported_operator_reports_types() {
    let mut h = Harness::new(r#"task default { log([1] * 2) }"#);
    let err = h.run("default").unwrap_err();
    assert_eq!(err.message(), "Cannot apply '*' to array and number");
}

#[test]
fn interpolation_and_concatenation() {
    let mut h = Harness::new(
        r#"
        const NAME = "app"
        const VERSION = 2
        task default { log("${NAME}-v" + VERSION + ".tar") }
        "#,
    );
    assert_eq!(h.run("default").unwrap(), vec!["log(app-v2.tar)"]);
}

#[test]
fn tasks_are_listed_in_declaration_order() {
    let h = Harness::new(
        r#"
        task b {}
        task a depends b {}
        "#,
    );
    let listed: Vec<(String, Vec<String>)> = h
        .engine
        .tasks()
        .iter()
        .map(|t| (t.name.clone(), t.dependencies.clone()))
        .collect();
    assert_eq!(
        listed,
        vec![("b".to_string(), vec![]), ("a".to_string(), vec!["b".to_string()])]
    );
}

#[test]
fn failed_task_can_be_run_again() {
    let mut h = Harness::new(
        r#"
        task broken { log(missing) }
        task default depends broken { log("never") }
        "#,
    );
    for _ in 0..2 {
        let err = h.run("default").unwrap_err();
        assert_eq!(err.message(), "Undefined variable 'missing'");
    }
    assert!(!h.engine.is_completed("broken"));
    assert!(!h.engine.is_completed("default"));
}

#[test]
fn undefined_task_stays_undefined() {
    let mut h = Harness::new("task build {}");
    for _ in 0..2 {
        let err = h.run("nope").unwrap_err();
        assert_eq!(err.message(), "Undefined task 'nope'");
        assert_eq!(err.task(), None);
    }
    let err = h.run("log").unwrap_err();
    assert_eq!(err.message(), "'log' is a native function, not a task");
    assert!(h.run("build").is_ok());
}

#[test]
fn completed_dependencies_survive_a_failed_sibling() {
    let mut h = Harness::new(
        r#"
        task fetch { log("fetch") }
        task broken { log(missing) }
        task default depends (fetch, broken) {}
        "#,
    );
    assert!(h.run("default").is_err());
    assert!(h.engine.is_completed("fetch"));
    assert!(h.run("default").is_err());
    assert_eq!(*h.calls.borrow(), vec!["log(fetch)"]);
}

#[test]
fn runtime_errors_name_the_innermost_task() {
    let mut h = Harness::new(
        r#"
        task broken { log(missing) }
        task default depends broken {}
        "#,
    );
    let err = h.run("default").unwrap_err();
    assert_eq!(err.task(), Some("broken"));

    let mut h = Harness::new(
        r#"
        task a depends b {}
        task b depends a {}
        "#,
    );
    let err = h.run("a").unwrap_err();
    assert!(err.message().contains("Circular dependency"));
    assert_eq!(err.task(), Some("b"));
}

#[test]
fn nul_in_env_value_is_a_runtime_error() {
    let program = parse("env FLAGS = \"-O2\u{0}\"\ntask default {}", None).unwrap();
    let mut engine = Engine::new(Platform::new("linux", "x64"), Rc::new(MemoryEnv::new()));
    let err = engine.load(&program).unwrap_err();
    assert!(matches!(err, KeelError::RuntimeError { .. }));
    assert_eq!(err.message(), "Cannot export 'FLAGS': value contains a NUL character");
    assert_eq!(err.location().map(|l| l.line), Some(1));
}

#[test]
fn engine_reports_its_platform() {
    let h = Harness::on("", Platform::new("darwin", "aarch64"), MemoryEnv::new());
    assert_eq!(h.engine.platform(), &Platform::new("macos", "arm64"));
    assert_eq!(h.engine.platform().to_string(), "macos/arm64");
}
