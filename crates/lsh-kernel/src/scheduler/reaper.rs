//! Reaping: wait for each stage, collect status and CPU usage.

use std::ffi::CStr;
use std::fmt;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::error::{ShellError, ShellResult};

/// How a stage terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Normal exit with a status code.
    Exited(i32),
    /// Killed by an uncaught signal.
    Signaled(Signal),
}

impl StageStatus {
    /// Shell-style exit code: the status, or 128 + signal number.
    pub fn code(&self) -> i32 {
        match self {
            StageStatus::Exited(code) => *code,
            StageStatus::Signaled(sig) => 128 + *sig as i32,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, StageStatus::Exited(0))
    }
}

/// User and system CPU time consumed by a stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuUsage {
    pub user: Duration,
    pub system: Duration,
}

impl CpuUsage {
    fn from_rusage(usage: &libc::rusage) -> Self {
        Self {
            user: timeval_to_duration(usage.ru_utime),
            system: timeval_to_duration(usage.ru_stime),
        }
    }
}

fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

/// Everything known about a stage once it has been reaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub pid: Pid,
    pub program: String,
    pub status: StageStatus,
    pub usage: CpuUsage,
}

impl StageReport {
    /// The per-stage usage line.
    pub fn usage_line(&self) -> UsageLine<'_> {
        UsageLine(self)
    }

    /// Description of the terminating signal, if the stage was killed.
    pub fn signal_description(&self) -> Option<String> {
        match self.status {
            StageStatus::Signaled(sig) => Some(describe_signal(sig)),
            StageStatus::Exited(_) => None,
        }
    }
}

/// Display adapter for the usage line:
/// `(PID)<pid>  (CMD)<program>    (user)<s.mmm> s  (sys)<s.mmm> s`
pub struct UsageLine<'a>(&'a StageReport);

impl fmt::Display for UsageLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        write!(
            f,
            "(PID){}  (CMD){}    (user){:.3} s  (sys){:.3} s",
            r.pid,
            r.program,
            r.usage.user.as_secs_f64(),
            r.usage.system.as_secs_f64(),
        )
    }
}

/// Human-readable description of a signal, as `strsignal(3)` gives it.
pub fn describe_signal(sig: Signal) -> String {
    let ptr = unsafe { libc::strsignal(sig as libc::c_int) };
    if ptr.is_null() {
        return sig.as_str().to_string();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Block until `pid` terminates and return its status and resource usage.
///
/// Waits on that specific child, so callers control report order.
pub(crate) fn reap(pid: Pid, program: &str) -> ShellResult<StageReport> {
    let mut raw_status: libc::c_int = 0;
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

    loop {
        let rc = unsafe { libc::wait4(pid.as_raw(), &mut raw_status, 0, &mut usage) };
        if rc >= 0 {
            break;
        }
        match Errno::last() {
            Errno::EINTR => continue,
            source => return Err(ShellError::Wait { pid, source }),
        }
    }

    let status = match WaitStatus::from_raw(pid, raw_status) {
        Ok(WaitStatus::Exited(_, code)) => StageStatus::Exited(code),
        Ok(WaitStatus::Signaled(_, sig, _)) => StageStatus::Signaled(sig),
        other => {
            // Without WUNTRACED we only see terminations.
            tracing::warn!(%pid, ?other, "unexpected wait status");
            StageStatus::Exited(raw_status)
        }
    };

    let report = StageReport {
        pid,
        program: program.to_string(),
        status,
        usage: CpuUsage::from_rusage(&usage),
    };
    tracing::debug!(%pid, program, status = ?report.status, "reaped stage");
    Ok(report)
}
