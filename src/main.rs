//! Keel CLI
//!
//! Locates a Buildfile and runs one of its tasks.

use anyhow::Context;
use clap::Parser as ClapParser;
use colored::*;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keel_lang::discovery::{find_buildfile, BUILDFILE_NAME};
use keel_lang::{load_source, tokenize, Diagnostic, Engine, KeelResult};

#[derive(ClapParser, Debug)]
#[command(name = "keel", version, about = "Run tasks from a Buildfile")]
struct Cli {
    /// Task to run
    #[arg(default_value = "default")]
    task: String,

    /// Buildfile to use instead of searching upwards from the working directory
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Print the token stream and exit
    #[arg(short, long)]
    tokens: bool,

    /// List declared tasks and exit
    #[arg(short, long)]
    list: bool,

    /// Increase log verbosity (-v info, -vv debug); KEEL_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// A located Buildfile and its contents
struct Buildfile {
    path: PathBuf,
    dir: PathBuf,
    source: String,
}

impl Buildfile {
    fn locate(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let cwd = env::current_dir().context("cannot read the current directory")?;
                find_buildfile(&cwd).with_context(|| {
                    format!("no {} found in {} or any parent directory", BUILDFILE_NAME, cwd.display())
                })?
            }
        };

        let source = fs::read_to_string(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let absolute = fs::canonicalize(&path)
            .with_context(|| format!("failed to resolve '{}'", path.display()))?;
        let dir = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        Ok(Self { path, dir, source })
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// Print a failure with its source line; map the outcome to an exit code.
    fn report(&self, result: KeelResult<()>) -> ExitCode {
        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprint!("{}", Diagnostic::new(&err).with_source(&self.source));
                ExitCode::FAILURE
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn install_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("KEEL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let buildfile = Buildfile::locate(cli.file.as_deref())?;
    let name = buildfile.name();

    if cli.tokens {
        return Ok(buildfile.report(show_tokens(&buildfile.source, &name)));
    }

    let result = load_source(&buildfile.source, Some(&name), &buildfile.dir).and_then(|mut engine| {
        info!(buildfile = %name, platform = %engine.platform(), tasks = engine.tasks().len(), "loaded");
        if cli.list {
            list_tasks(&engine);
            Ok(())
        } else {
            engine.run(&cli.task)
        }
    });
    Ok(buildfile.report(result))
}

fn show_tokens(source: &str, name: &str) -> KeelResult<()> {
    let tokens = tokenize(source, Some(name))?;

    println!("Tokens for '{}':", name);
    println!("{}", "=".repeat(60));
    for (i, token) in tokens.iter().enumerate() {
        println!("{:4}: {:20} | {:?}", i, format!("{:?}", token.token_type), token.lexeme);
    }
    println!("{}", "=".repeat(60));
    println!("Total tokens: {}", tokens.len());

    Ok(())
}

fn list_tasks(engine: &Engine) {
    for task in engine.tasks() {
        if task.dependencies.is_empty() {
            println!("{}", task.name.green().bold());
        } else {
            println!(
                "{} {} {}",
                task.name.green().bold(),
                "depends".dimmed(),
                task.dependencies.join(", ")
            );
        }
    }
}
