//! Error types for pipeline execution.

use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

use crate::parser::SyntaxError;

/// Result type for kernel operations.
pub type ShellResult<T> = Result<T, ShellError>;

/// Everything that can go wrong between reading a line and reaping its stages.
///
/// Display strings carry no shell-name prefix; the REPL adds it.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The line is not a well-formed pipeline. No process was created.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A word contains an interior NUL byte and cannot be passed to exec.
    #[error("'{word}': argument contains a NUL byte")]
    InvalidWord { word: String },

    /// The OS refused to allocate a pipe.
    #[error("pipe: {}", .0.desc())]
    Pipe(Errno),

    /// The OS refused to create a process. Fatal to the shell.
    #[error("fork: {}", .0.desc())]
    Fork(Errno),

    /// The proceed token could not be handed to a freshly created child.
    #[error("gate: {}", .0.desc())]
    Gate(Errno),

    /// The SIGINT handler could not be installed.
    #[error("sigaction: {}", .0.desc())]
    Signal(Errno),

    /// Waiting on a child failed.
    #[error("wait ({pid}): {}", .source.desc())]
    Wait { pid: Pid, source: Errno },
}

impl ShellError {
    /// True when the shell must terminate instead of reading the next line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Fork(_))
    }

    /// Exit status the shell uses when it terminates on this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ShellError::Fork(_) => 255,
            _ => 1,
        }
    }
}
