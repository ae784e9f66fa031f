//! linux-shell REPL: interactive front end for the pipeline kernel.
//!
//! This REPL provides an interactive interface to the kernel.
//! It handles:
//! - Keywords: `exit` and the `timeX` usage-report prefix
//! - Pipeline execution via the Kernel
//! - Diagnostics prefixed with the shell name
//! - Command history via rustyline
//!
//! Keywords are recognised as whole first words only: `exitfoo` runs a
//! program named `exitfoo` and `timeXls` runs `timeXls`, not a timed `ls`.

pub mod config;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use lsh_kernel::{Kernel, ShellError};

pub use config::ShellConfig;

/// Keyword that ends the session.
pub const EXIT_KEYWORD: &str = "exit";

/// Keyword prefix that turns on per-stage usage reporting.
pub const USAGE_KEYWORD: &str = "timeX";

/// Outcome of processing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineResult {
    /// Read the next line, after printing the optional message.
    Continue(Option<String>),
    /// Leave the shell, after printing the optional message.
    Exit(Option<String>),
}

/// REPL state: the kernel plus where stage reports go.
pub struct Repl {
    kernel: Kernel,
    config: ShellConfig,
    out: Box<dyn Write>,
    last_code: i32,
}

impl Repl {
    /// Create a REPL from the user's configuration file.
    pub fn new() -> Result<Self> {
        Self::with_config(ShellConfig::load()?)
    }

    /// Create a REPL with an explicit configuration.
    pub fn with_config(config: ShellConfig) -> Result<Self> {
        let kernel = Kernel::new(config.kernel_config()).context("Failed to create kernel")?;
        Ok(Self {
            kernel,
            config,
            out: Box::new(io::stdout()),
            last_code: 0,
        })
    }

    /// Send stage reports and messages somewhere other than stdout.
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Exit code of the last pipeline (1 after a diagnostic).
    pub fn last_code(&self) -> i32 {
        self.last_code
    }

    /// Process a single line of input.
    ///
    /// Only fatal kernel errors (process creation failure) come back as
    /// `Err`; everything else becomes a message to print.
    pub fn process_line(&mut self, line: &str) -> Result<LineResult, ShellError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(LineResult::Continue(None));
        }

        let (word, rest) = split_first_word(trimmed);
        match word {
            EXIT_KEYWORD if rest.is_empty() => {
                Ok(LineResult::Exit(Some(self.diagnostic("Terminated"))))
            }
            EXIT_KEYWORD => {
                self.last_code = 1;
                Ok(LineResult::Continue(Some(
                    self.diagnostic("'exit' with other arguments!!!"),
                )))
            }
            USAGE_KEYWORD if rest.is_empty() => {
                self.last_code = 1;
                Ok(LineResult::Continue(Some(
                    self.diagnostic("'timeX' cannot be a standalone command"),
                )))
            }
            USAGE_KEYWORD => self.execute(rest, true),
            _ => self.execute(trimmed, false),
        }
    }

    fn execute(&mut self, line: &str, report_usage: bool) -> Result<LineResult, ShellError> {
        match self.kernel.execute(line, report_usage, &mut self.out) {
            Ok(outcome) => {
                self.last_code = outcome.code();
                Ok(LineResult::Continue(None))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.last_code = 1;
                Ok(LineResult::Continue(Some(self.diagnostic(&e.to_string()))))
            }
        }
    }

    fn diagnostic(&self, message: &str) -> String {
        format!("{}: {}", self.config.name, message)
    }

    /// Print a message on the REPL's output.
    fn print(&mut self, message: &str) {
        if let Err(e) = writeln!(self.out, "{message}").and_then(|()| self.out.flush()) {
            tracing::warn!("Failed to write output: {}", e);
        }
    }

    /// Run lines non-interactively until they run out or one asks to exit.
    ///
    /// Blank lines and `#` comments are skipped. Returns the exit code of the
    /// last pipeline, 0 on `exit`, or 255 on a fatal error.
    pub fn run_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> ExitCode {
        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match self.process_line(trimmed) {
                Ok(LineResult::Continue(message)) => {
                    if let Some(message) = message {
                        self.print(&message);
                    }
                }
                Ok(LineResult::Exit(message)) => {
                    if let Some(message) = message {
                        self.print(&message);
                    }
                    return ExitCode::SUCCESS;
                }
                Err(e) => {
                    let message = self.diagnostic(&e.to_string());
                    self.print(&message);
                    return ExitCode::from(e.exit_code());
                }
            }
        }
        ExitCode::from(self.last_code.clamp(0, 255) as u8)
    }
}

/// Split off the first whitespace-delimited word.
fn split_first_word(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line, ""),
    }
}

/// Execute a single command line and exit.
pub fn run_command(line: &str) -> Result<ExitCode> {
    let mut repl = Repl::new()?;
    Ok(repl.run_lines([line]))
}

/// Run a script file, one pipeline per line.
pub fn run_script(path: &Path) -> Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;

    let mut repl = Repl::new()?;
    Ok(repl.run_lines(source.lines()))
}

/// Save REPL history to disk.
fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Option<PathBuf>) {
    if let Some(path) = history_path {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create history directory: {}", e);
            }
        }
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("Failed to save history: {}", e);
        }
    }
}

/// Run the interactive REPL.
pub fn run() -> Result<ExitCode> {
    let mut repl = Repl::new()?;

    let mut rl: Editor<(), DefaultHistory> =
        Editor::new().context("Failed to create editor")?;

    // Load history if it exists
    let history_path = repl.config().history_path();
    if let Some(ref path) = history_path {
        if let Err(e) = rl.load_history(path) {
            // Only log if it's not a "file not found" error (expected on first run)
            let is_not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
            if !is_not_found {
                tracing::warn!("Failed to load history: {}", e);
            }
        }
    }

    let prompt = repl.config().prompt.clone();
    repl.kernel.interrupts().set_prompt(&prompt);

    let code = loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = rl.add_history_entry(line.as_str()) {
                        tracing::warn!("Failed to add history entry: {}", e);
                    }
                }

                match repl.process_line(&line) {
                    Ok(LineResult::Continue(message)) => {
                        if let Some(message) = message {
                            repl.print(&message);
                        }
                    }
                    Ok(LineResult::Exit(message)) => {
                        if let Some(message) = message {
                            repl.print(&message);
                        }
                        break ExitCode::SUCCESS;
                    }
                    Err(e) => {
                        // Process creation failed: no partial pipeline may keep going.
                        let message = repl.diagnostic(&e.to_string());
                        repl.print(&message);
                        save_history(&mut rl, &history_path);
                        return Ok(ExitCode::from(e.exit_code()));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C at the prompt: just prompt again
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                let message = repl.diagnostic("Terminated");
                repl.print(&message);
                break ExitCode::SUCCESS;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break ExitCode::FAILURE;
            }
        }
    };

    save_history(&mut rl, &history_path);

    Ok(code)
}
