//! Pipeline execution for linux-shell.
//!
//! Launches every stage of a pipeline as its own process, connected by OS
//! pipes, then reaps them in stage order and writes per-stage reports.

use std::io::Write;
use std::sync::Arc;

use nix::unistd::Pid;

use crate::error::{ShellError, ShellResult};
use crate::interrupt::InterruptState;
use crate::parser::Pipeline;

use super::launch::{spawn_stage, ExecImage, LaunchError};
use super::pipes::PipeTopology;
use super::reaper::{reap, StageReport};

/// Result of a pipeline that launched and was fully reaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// One report per stage, in stage order.
    pub reports: Vec<StageReport>,
}

impl PipelineOutcome {
    /// Exit code of the last stage, shell style.
    pub fn code(&self) -> i32 {
        self.reports.last().map(|r| r.status.code()).unwrap_or(0)
    }

    /// True if the last stage exited with status 0.
    pub fn ok(&self) -> bool {
        self.code() == 0
    }
}

/// Runs pipelines of external programs.
pub struct PipelineRunner {
    shell_name: String,
    interrupts: Arc<InterruptState>,
}

impl PipelineRunner {
    /// Create a runner. `shell_name` prefixes exec-failure messages.
    pub fn new(shell_name: impl Into<String>, interrupts: Arc<InterruptState>) -> Self {
        Self {
            shell_name: shell_name.into(),
            interrupts,
        }
    }

    /// Execute a pipeline and wait for every stage.
    ///
    /// Signal descriptions, and usage lines when `report_usage` is set, are
    /// written to `out` as each stage is reaped, always in stage order.
    ///
    /// A fork failure returns at once without reaping: the caller is
    /// expected to terminate the shell.
    pub fn run(
        &self,
        pipeline: &Pipeline,
        report_usage: bool,
        out: &mut dyn Write,
    ) -> ShellResult<PipelineOutcome> {
        let images = pipeline
            .stages()
            .iter()
            .map(|stage| ExecImage::new(stage, &self.shell_name))
            .collect::<ShellResult<Vec<_>>>()?;

        let pipes = PipeTopology::new(pipeline.len())?;
        let _running = self.interrupts.begin_pipeline();
        tracing::debug!(stages = images.len(), pipes = pipes.len(), "launching pipeline");

        let mut pids: Vec<Pid> = Vec::with_capacity(pipeline.len());
        let mut launch_error = None;
        for (index, image) in images.iter().enumerate() {
            match spawn_stage(index, image, &pipes) {
                Ok(pid) => pids.push(pid),
                Err(LaunchError { pid, source }) => {
                    tracing::warn!(stage = index, error = %source, "stage launch failed");
                    pids.extend(pid);
                    launch_error = Some(source);
                    break;
                }
            }
        }

        // Parent copies must go before waiting, or readers never see EOF.
        drop(pipes);

        if let Some(err @ ShellError::Fork(_)) = launch_error {
            return Err(err);
        }

        let mut reports = Vec::with_capacity(pids.len());
        let mut wait_error = None;
        for (pid, stage) in pids.iter().zip(pipeline.stages()) {
            let report = match reap(*pid, stage.program()) {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(%pid, error = %e, "failed to reap stage");
                    wait_error.get_or_insert(e);
                    continue;
                }
            };

            if let Some(desc) = report.signal_description() {
                emit(out, format_args!("{desc}"));
            }
            if report_usage {
                emit(out, format_args!("{}", report.usage_line()));
            }
            reports.push(report);
        }

        match launch_error.or(wait_error) {
            Some(err) => Err(err),
            None => Ok(PipelineOutcome { reports }),
        }
    }
}

fn emit(out: &mut dyn Write, line: std::fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        tracing::warn!(error = %e, "failed to write stage report");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::StageStatus;

    fn runner() -> PipelineRunner {
        PipelineRunner::new("linux-shell", Arc::new(InterruptState::default()))
    }

    fn run(line: &str, report_usage: bool) -> (ShellResult<PipelineOutcome>, String) {
        let pipeline = Pipeline::parse(line).unwrap();
        let mut out = Vec::new();
        let result = runner().run(&pipeline, report_usage, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn true_and_false() {
        let (result, _) = run("true", false);
        assert!(result.unwrap().ok());
        let (result, _) = run("false", false);
        assert_eq!(result.unwrap().reports[0].status, StageStatus::Exited(1));
    }

    #[test]
    fn data_flows_through_every_stage() {
        let (result, _) = run("echo needle | cat | grep -q needle", false);
        assert!(result.unwrap().ok());
        let (result, _) = run("echo hay | cat | grep -q needle", false);
        assert_eq!(result.unwrap().code(), 1);
    }

    #[test]
    fn usage_lines_follow_stage_order() {
        // first stage finishes last
        let (result, out) = run("sleep 0.2 | true | true", true);
        let outcome = result.unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("(CMD)sleep "));
        assert!(lines[1].contains("(CMD)true "));
        assert!(lines[2].contains("(CMD)true "));
        for (line, report) in lines.iter().zip(&outcome.reports) {
            assert!(line.starts_with(&format!("(PID){}  ", report.pid)));
        }
    }

    #[test]
    fn missing_middle_stage_still_reaps_all() {
        let (result, out) = run("true | no_such_program_lsh_test | true", false);
        let outcome = result.unwrap();
        assert_eq!(outcome.reports.len(), 3);
        assert_eq!(
            outcome.reports[1].status,
            StageStatus::Exited(crate::scheduler::EXIT_EXEC_FAILED)
        );
        assert!(outcome.reports[0].status.success());
        assert!(outcome.reports[2].status.success());
        assert!(out.is_empty());
    }

    #[test]
    fn signal_termination_is_described() {
        // yes dies of SIGPIPE once head has exited
        let (result, out) = run("yes | head -c 0", false);
        let outcome = result.unwrap();
        assert_eq!(
            outcome.reports[0].status,
            StageStatus::Signaled(nix::sys::signal::Signal::SIGPIPE)
        );
        assert!(outcome.ok());
        assert_eq!(out.trim_end(), crate::scheduler::describe_signal(nix::sys::signal::Signal::SIGPIPE));
    }

    #[test]
    fn in_progress_flag_cleared_after_run() {
        let interrupts = Arc::new(InterruptState::default());
        let runner = PipelineRunner::new("linux-shell", interrupts.clone());
        let pipeline = Pipeline::parse("true | true").unwrap();
        runner.run(&pipeline, false, &mut std::io::sink()).unwrap();
        assert!(!interrupts.in_progress());
    }
}
