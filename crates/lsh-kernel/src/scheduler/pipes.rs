//! Pipe topology for one pipeline execution.
//!
//! An N-stage pipeline needs N-1 pipes. Pipe `i` connects stage `i`'s stdout
//! to stage `i+1`'s stdin:
//!
//! ```text
//!   stage0 ──w[0]──▶ pipe0 ──r[0]──▶ stage1 ──w[1]──▶ pipe1 ──r[1]──▶ stage2
//! ```
//!
//! Every descriptor is close-on-exec. Children `dup2` their boundary ends
//! onto 0/1 (which clears the flag on the copy) and close the originals.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::OFlag;
use nix::unistd::pipe2;

use crate::error::{ShellError, ShellResult};

/// Read and write ends of one pipe.
#[derive(Debug)]
struct PipePair {
    read: OwnedFd,
    write: OwnedFd,
}

/// All pipes of one pipeline execution. Dropping it closes every descriptor.
#[derive(Debug)]
pub(crate) struct PipeTopology {
    pairs: Vec<PipePair>,
}

impl PipeTopology {
    /// Allocate the pipes for a pipeline of `stages` stages.
    ///
    /// On failure, pipes allocated so far are closed before returning.
    pub fn new(stages: usize) -> ShellResult<Self> {
        let count = stages.saturating_sub(1);
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?;
            pairs.push(PipePair { read, write });
        }
        Ok(Self { pairs })
    }

    /// Number of pipe pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }


    /// Descriptor stage `index` should read from, if it is not the first stage.
    pub fn stdin_for(&self, index: usize) -> Option<RawFd> {
        index
            .checked_sub(1)
            .and_then(|prev| self.pairs.get(prev))
            .map(|pair| pair.read.as_raw_fd())
    }

    /// Descriptor stage `index` should write to, if it is not the last stage.
    pub fn stdout_for(&self, index: usize) -> Option<RawFd> {
        self.pairs.get(index).map(|pair| pair.write.as_raw_fd())
    }

    /// Every descriptor, both ends of every pair.
    ///
    /// Does not allocate, so it is usable between fork and exec.
    pub fn raw_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.pairs
            .iter()
            .flat_map(|pair| [pair.read.as_raw_fd(), pair.write.as_raw_fd()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_stage_needs_no_pipes() {
        let pipes = PipeTopology::new(1).unwrap();
        assert_eq!(pipes.len(), 0);
        assert_eq!(pipes.stdin_for(0), None);
        assert_eq!(pipes.stdout_for(0), None);
    }

    #[test]
    fn n_stages_need_n_minus_one_pipes() {
        for n in 1..8 {
            let pipes = PipeTopology::new(n).unwrap();
            assert_eq!(pipes.len(), n - 1);
            assert_eq!(pipes.raw_fds().count(), 2 * (n - 1));
        }
    }

    #[test]
    fn stages_wire_to_adjacent_pipes() {
        let pipes = PipeTopology::new(3).unwrap();
        // raw_fds yields read then write for each pipe in boundary order
        let fds: Vec<RawFd> = pipes.raw_fds().collect();
        let (r0, w0, r1, w1) = (fds[0], fds[1], fds[2], fds[3]);

        // first stage: shell's stdin, writes pipe 0
        assert_eq!(pipes.stdin_for(0), None);
        assert_eq!(pipes.stdout_for(0), Some(w0));

        // middle stage: reads pipe 0, writes pipe 1
        assert_eq!(pipes.stdin_for(1), Some(r0));
        assert_eq!(pipes.stdout_for(1), Some(w1));

        // last stage: reads pipe 1, shell's stdout
        assert_eq!(pipes.stdin_for(2), Some(r1));
        assert_eq!(pipes.stdout_for(2), None);
    }

    #[test]
    fn descriptors_are_close_on_exec() {
        let pipes = PipeTopology::new(2).unwrap();
        for fd in pipes.raw_fds() {
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
            assert!(flags >= 0);
            assert_ne!(flags & libc::FD_CLOEXEC, 0, "fd {fd} lacks FD_CLOEXEC");
        }
    }
}
