//! Readiness gate: a per-child proceed token.
//!
//! A child must finish rewiring its descriptors before it execs. Each child
//! gets its own close-on-exec pipe, created just before the fork:
//!
//! - the child closes its copy of the write end, then blocks reading one byte;
//! - the parent writes that byte right after the fork and closes both ends.
//!
//! The byte sits in the pipe buffer until read, so a release that lands
//! before the child reaches its wait is never lost. EOF without a byte means
//! the parent gave up on the child.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::{pipe2, write};

use crate::error::{ShellError, ShellResult};

const TOKEN: [u8; 1] = [b'!'];

/// Parent side: hands the proceed token to one child.
#[derive(Debug)]
pub(crate) struct GateRelease {
    fd: OwnedFd,
}

/// Child side: blocks until the token arrives.
#[derive(Debug)]
pub(crate) struct GateHold {
    fd: OwnedFd,
}

/// Create the gate for the next child.
pub(crate) fn readiness_gate() -> ShellResult<(GateRelease, GateHold)> {
    let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?;
    Ok((GateRelease { fd: write }, GateHold { fd: read }))
}

impl GateRelease {
    /// Let the child proceed. Consumes the write end, closing it.
    pub fn release(self) -> ShellResult<()> {
        loop {
            match write(&self.fd, &TOKEN) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(ShellError::Gate(e)),
            }
        }
    }

    pub(crate) fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl GateHold {
    /// Block until the token arrives.
    ///
    /// Returns `false` if the write end closed without a token. Uses only
    /// `read(2)`, so it is safe to call between fork and exec.
    pub fn wait(&self) -> bool {
        let mut buf = [0u8; 1];
        loop {
            let n = unsafe { libc::read(self.fd.as_raw_fd(), buf.as_mut_ptr().cast(), 1) };
            if n == 1 {
                return true;
            }
            if n < 0 && Errno::last() == Errno::EINTR {
                continue;
            }
            return false;
        }
    }

    pub(crate) fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
