//! The Kernel (核): parses a command line and runs it as a process pipeline.
//!
//! The kernel is the execution facade the REPL talks to:
//!
//! - Validates a line into a [`Pipeline`] before anything is created
//! - Runs it through the [`PipelineRunner`]
//! - Owns the [`InterruptState`] shared with the SIGINT handler
//!
//! # Example
//!
//! ```no_run
//! use lsh_kernel::{Kernel, KernelConfig};
//!
//! let kernel = Kernel::new(KernelConfig::default())?;
//! let outcome = kernel.execute("ls -la | wc -l", false, &mut std::io::stdout())?;
//! assert_eq!(outcome.reports.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::Write;
use std::sync::Arc;

use crate::error::{ShellError, ShellResult};
use crate::interrupt::InterruptState;
use crate::parser::Pipeline;
use crate::scheduler::{PipelineOutcome, PipelineRunner};

/// Default name used in diagnostics.
pub const DEFAULT_SHELL_NAME: &str = "linux-shell";

/// Configuration for creating a kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Shell name used as the prefix of every diagnostic.
    pub name: String,

    /// Whether to install the SIGINT handler.
    ///
    /// The interactive shell wants it; embedders that manage signals
    /// themselves can turn it off.
    pub handle_interrupts: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SHELL_NAME.to_string(),
            handle_interrupts: true,
        }
    }
}

impl KernelConfig {
    /// Create a config with the given shell name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Set whether the SIGINT handler is installed.
    pub fn with_interrupts(mut self, handle: bool) -> Self {
        self.handle_interrupts = handle;
        self
    }
}

/// The execution kernel.
pub struct Kernel {
    name: String,
    interrupts: Arc<InterruptState>,
    runner: PipelineRunner,
}

impl Kernel {
    /// Create a new kernel.
    pub fn new(config: KernelConfig) -> ShellResult<Self> {
        let interrupts = if config.handle_interrupts {
            InterruptState::install().map_err(ShellError::Signal)?
        } else {
            Arc::new(InterruptState::default())
        };

        let runner = PipelineRunner::new(config.name.clone(), interrupts.clone());
        Ok(Self {
            name: config.name,
            interrupts,
            runner,
        })
    }

    /// The shell name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interrupt state shared with the SIGINT handler.
    pub fn interrupts(&self) -> &Arc<InterruptState> {
        &self.interrupts
    }

    /// Parse and execute one command line.
    ///
    /// Syntax errors are returned before any process is created.
    pub fn execute(
        &self,
        line: &str,
        report_usage: bool,
        out: &mut dyn Write,
    ) -> ShellResult<PipelineOutcome> {
        let pipeline = Pipeline::parse(line)?;
        self.execute_pipeline(&pipeline, report_usage, out)
    }

    /// Execute an already parsed pipeline.
    pub fn execute_pipeline(
        &self,
        pipeline: &Pipeline,
        report_usage: bool,
        out: &mut dyn Write,
    ) -> ShellResult<PipelineOutcome> {
        tracing::debug!(stages = pipeline.len(), report_usage, "executing pipeline");
        self.runner.run(pipeline, report_usage, out)
    }
}
