//! Scheduler module for linux-shell: running one pipeline of external programs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         PipelineRunner                           │
//! │                                                                  │
//! │  PipeTopology::new(N)        N-1 close-on-exec pipes             │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  for i in 0..N:  readiness_gate() ─▶ fork ─▶ release token       │
//! │                          child: dup2 ─▶ close all ─▶ wait ─▶ exec │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  drop(PipeTopology)          parent closes every pipe end        │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  for pid in stage order: wait4 ─▶ StageReport ─▶ report sink     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod gate;
mod launch;
mod pipeline;
mod pipes;
mod reaper;

pub use launch::{EXIT_EXEC_FAILED, EXIT_SETUP_FAILED};
pub use pipeline::{PipelineOutcome, PipelineRunner};
pub use reaper::{describe_signal, CpuUsage, StageReport, StageStatus, UsageLine};
