//! linux-shell CLI entry point.
//!
//! Usage:
//!   linux-shell                 # Interactive shell
//!   linux-shell -c <line>       # Run one pipeline line and exit
//!   linux-shell script.lsh      # Run each line of a script

use std::env;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // Logs go to stderr so stage reports on stdout stay clean (RUST_LOG)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None => lsh_repl::run(),

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("linux-shell {} ({} {})",
                     env!("CARGO_PKG_VERSION"),
                     env!("LSH_GIT_HASH"),
                     env!("LSH_BUILD_DATE"));
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            let line = args.get(2)
                .context("-c requires a command argument")?;
            lsh_repl::run_command(line)
        }

        Some(path) if !path.starts_with('-') => {
            lsh_repl::run_script(Path::new(path))
        }

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'linux-shell --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(r#"linux-shell v{}

Usage:
  linux-shell                  Interactive shell
  linux-shell -c <line>        Run one command line and exit
  linux-shell <script>         Run a script, one pipeline per line

Options:
  -c <line>                    Execute command line and exit
  -h, --help                   Show this help
  -V, --version                Show version

Keywords:
  exit                         Leave the shell
  timeX <pipeline>             Run the pipeline and report each stage's CPU usage

Examples:
  linux-shell -c 'ls -l | wc -l'
  linux-shell -c 'timeX sort data.txt | uniq -c'
"#, env!("CARGO_PKG_VERSION"));
}
