//! SIGINT handling for the shell process.
//!
//! At the prompt an interrupt prints a newline and a fresh prompt. While a
//! pipeline runs it is a no-op for the shell: stages are not cancelled. The
//! stages sit in the terminal's foreground process group and get the signal
//! themselves, with whatever disposition their program chose.
//!
//! The handler touches atomics and calls `write(2)` on a prompt rendered
//! ahead of time. It finds the state through a single registration slot
//! because a signal handler cannot capture anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

static REGISTERED: OnceLock<Arc<InterruptState>> = OnceLock::new();

/// Flags shared between the SIGINT handler and the execution path.
#[derive(Debug, Default)]
pub struct InterruptState {
    in_progress: AtomicBool,
    pending: AtomicBool,
    // "\n" + prompt, written by the handler when idle
    reprint: OnceLock<Box<[u8]>>,
}

impl InterruptState {
    /// Install the SIGINT handler and return the process-wide state.
    ///
    /// Idempotent: later calls return the same state without reinstalling.
    pub fn install() -> nix::Result<Arc<Self>> {
        if let Some(state) = REGISTERED.get() {
            return Ok(state.clone());
        }
        let state = REGISTERED.get_or_init(|| Arc::new(Self::default())).clone();

        let action = SigAction::new(
            SigHandler::Handler(on_sigint),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        unsafe { sigaction(Signal::SIGINT, &action) }?;
        tracing::debug!("installed SIGINT handler");
        Ok(state)
    }

    /// Set the prompt the handler reprints on an idle interrupt.
    ///
    /// Only the first call takes effect.
    pub fn set_prompt(&self, prompt: &str) {
        let rendered = format!("\n{prompt}").into_bytes().into_boxed_slice();
        if self.reprint.set(rendered).is_err() {
            tracing::debug!("interrupt prompt already set");
        }
    }

    /// Mark a pipeline as running until the returned guard is dropped.
    pub fn begin_pipeline(&self) -> PipelineGuard<'_> {
        self.in_progress.store(true, Ordering::SeqCst);
        PipelineGuard { state: self }
    }

    /// Whether a pipeline is currently executing.
    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Consume a pending idle-time interrupt.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }

    fn note_interrupt(&self) {
        if self.in_progress.load(Ordering::SeqCst) {
            return;
        }
        self.pending.store(true, Ordering::SeqCst);
        if let Some(bytes) = self.reprint.get() {
            write_stdout(bytes);
        }
    }
}

/// `write(2)` loop that leaves `errno` as it found it.
fn write_stdout(mut bytes: &[u8]) {
    let saved = Errno::last_raw();
    while !bytes.is_empty() {
        let n = unsafe { libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            if Errno::last() == Errno::EINTR {
                continue;
            }
            break;
        }
        bytes = &bytes[n as usize..];
    }
    Errno::set_raw(saved);
}

/// Clears the in-progress flag when dropped.
#[must_use = "the pipeline counts as running only while the guard lives"]
pub struct PipelineGuard<'a> {
    state: &'a InterruptState,
}

impl Drop for PipelineGuard<'_> {
    fn drop(&mut self) {
        self.state.in_progress.store(false, Ordering::SeqCst);
    }
}

extern "C" fn on_sigint(_: libc::c_int) {
    if let Some(state) = REGISTERED.get() {
        state.note_interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_scopes_in_progress() {
        let state = InterruptState::default();
        assert!(!state.in_progress());
        {
            let _guard = state.begin_pipeline();
            assert!(state.in_progress());
        }
        assert!(!state.in_progress());
    }

    #[test]
    fn interrupt_during_pipeline_is_ignored() {
        let state = InterruptState::default();
        let guard = state.begin_pipeline();
        state.note_interrupt();
        drop(guard);
        assert!(!state.take_pending());
    }

    #[test]
    fn idle_interrupt_is_pending_once() {
        let state = InterruptState::default();
        state.note_interrupt();
        assert!(state.take_pending());
        assert!(!state.take_pending());
    }

    #[test]
    fn prompt_is_set_once() {
        let state = InterruptState::default();
        state.set_prompt("$ ");
        state.set_prompt("% ");
        assert_eq!(state.reprint.get().map(|b| &b[..]), Some(&b"\n$ "[..]));
    }

    #[test]
    fn install_is_idempotent() {
        let a = InterruptState::install().unwrap();
        let b = InterruptState::install().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
