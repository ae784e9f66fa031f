//! lsh-kernel: the pipeline execution engine of linux-shell.
//!
//! This crate provides:
//!
//! - **Lexer**: splits a stage's command string into program and arguments
//! - **Parser**: validates a line and splits it into pipeline stages
//! - **Scheduler**: pipe topology, process launch, readiness gate, reaping
//! - **Interrupt**: SIGINT handling shared between handler and executor
//! - **Kernel**: the facade the REPL drives

pub mod error;
pub mod interrupt;
pub mod kernel;
pub mod lexer;
pub mod parser;
pub mod scheduler;

pub use error::{ShellError, ShellResult};
pub use interrupt::InterruptState;
pub use kernel::{Kernel, KernelConfig, DEFAULT_SHELL_NAME};
pub use lexer::{split_words, Words};
pub use parser::{Pipeline, Stage, SyntaxError};
pub use scheduler::{CpuUsage, PipelineOutcome, PipelineRunner, StageReport, StageStatus};
