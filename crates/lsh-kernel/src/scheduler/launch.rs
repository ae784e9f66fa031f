//! Process launcher: one fork per stage, descriptor rewiring, gated exec.
//!
//! Everything the child needs is built in the parent before forking. Between
//! fork and exec the child only makes async-signal-safe libc calls: no
//! allocation, no locks, no `std::io`.

use std::ffi::CString;
use std::os::raw::c_char;

use nix::errno::Errno;
use nix::unistd::{fork, ForkResult, Pid};

use crate::error::{ShellError, ShellResult};
use crate::parser::Stage;

use super::gate::{readiness_gate, GateHold, GateRelease};
use super::pipes::PipeTopology;

/// Exit status of a child whose program could not be executed.
pub const EXIT_EXEC_FAILED: i32 = 127;

/// Exit status of a child that never got released or failed to rewire.
pub const EXIT_SETUP_FAILED: i32 = 126;

/// A stage's program and argv as C strings, ready for `execvp`.
pub(crate) struct ExecImage {
    program: CString,
    // argv owns the strings; argv_ptrs points into them and ends with NULL.
    _argv: Vec<CString>,
    argv_ptrs: Vec<*const c_char>,
    failure_prefix: Vec<u8>,
}

impl ExecImage {
    /// Prepare a stage for exec. `shell_name` prefixes the exec-failure message.
    pub fn new(stage: &Stage, shell_name: &str) -> ShellResult<Self> {
        let argv = stage
            .words()
            .argv()
            .map(|word| {
                CString::new(word).map_err(|_| ShellError::InvalidWord {
                    word: word.replace('\0', "\\0"),
                })
            })
            .collect::<ShellResult<Vec<_>>>()?;

        let program = argv[0].clone();
        let mut argv_ptrs: Vec<*const c_char> = argv.iter().map(|a| a.as_ptr()).collect();
        argv_ptrs.push(std::ptr::null());

        let failure_prefix = format!("{}: '{}': ", shell_name, stage.program()).into_bytes();

        Ok(Self {
            program,
            _argv: argv,
            argv_ptrs,
            failure_prefix,
        })
    }
}

/// A launch that went wrong part way.
///
/// `pid` is set when the fork succeeded but the release did not: that child
/// exists, will exit without exec, and still has to be reaped.
#[derive(Debug)]
pub(crate) struct LaunchError {
    pub pid: Option<Pid>,
    pub source: ShellError,
}

impl From<ShellError> for LaunchError {
    fn from(source: ShellError) -> Self {
        Self { pid: None, source }
    }
}

/// Fork stage `index`, release it, and return its pid.
///
/// The child rewires its stdio to the adjacent pipes, closes every pipe
/// descriptor, waits for the proceed token, then execs. The parent hands the
/// token over immediately after the fork, without waiting for siblings.
pub(crate) fn spawn_stage(
    index: usize,
    image: &ExecImage,
    pipes: &PipeTopology,
) -> Result<Pid, LaunchError> {
    let (release, hold) = readiness_gate()?;

    match unsafe { fork() } {
        Ok(ForkResult::Child) => unsafe { become_stage(index, image, pipes, &release, &hold) },
        Ok(ForkResult::Parent { child }) => {
            tracing::debug!(stage = index, pid = %child, "forked stage");
            // hold stays open until the token is written, so no EPIPE here
            let released = release.release();
            drop(hold);
            match released {
                Ok(()) => {
                    tracing::debug!(stage = index, pid = %child, "released stage");
                    Ok(child)
                }
                Err(source) => Err(LaunchError {
                    pid: Some(child),
                    source,
                }),
            }
        }
        Err(errno) => Err(ShellError::Fork(errno).into()),
    }
}

/// Child half of `spawn_stage`. Never returns.
///
/// # Safety
///
/// Must only be called in a freshly forked child. Uses raw descriptors owned
/// by structures it never drops.
unsafe fn become_stage(
    index: usize,
    image: &ExecImage,
    pipes: &PipeTopology,
    release: &GateRelease,
    hold: &GateHold,
) -> ! {
    unsafe {
        if let Some(fd) = pipes.stdin_for(index)
            && libc::dup2(fd, libc::STDIN_FILENO) < 0
        {
            libc::_exit(EXIT_SETUP_FAILED);
        }
        if let Some(fd) = pipes.stdout_for(index)
            && libc::dup2(fd, libc::STDOUT_FILENO) < 0
        {
            libc::_exit(EXIT_SETUP_FAILED);
        }
        for fd in pipes.raw_fds() {
            libc::close(fd);
        }

        libc::close(release.as_raw_fd());
        if !hold.wait() {
            libc::_exit(EXIT_SETUP_FAILED);
        }
        libc::close(hold.as_raw_fd());

        // Rust ignores SIGPIPE; exec'd programs expect the default.
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);

        libc::execvp(image.program.as_ptr(), image.argv_ptrs.as_ptr());

        let desc = Errno::last().desc();
        write_stderr(&image.failure_prefix);
        write_stderr(desc.as_bytes());
        write_stderr(b"\n");
        libc::_exit(EXIT_EXEC_FAILED)
    }
}

/// Best-effort write to fd 2 using only `write(2)`.
unsafe fn write_stderr(mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            if Errno::last() == Errno::EINTR {
                continue;
            }
            return;
        }
        bytes = &bytes[n as usize..];
    }
}
