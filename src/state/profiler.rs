//! Command Profiler
//!
//! When `!FILE_PROFILER` is set, the executor records one entry per
//! dispatched command. Writing the records anywhere is the caller's
//! business; the engine only collects them.

use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ProfilerRecord {
    /// 1-based macro line of the command.
    pub line: usize,
    /// Command keyword, e.g. `TAG`.
    pub command: String,
    /// Wall-clock start of the dispatch.
    pub started_at: DateTime<Local>,
    /// Dispatch duration in milliseconds.
    pub elapsed_ms: u64,
    /// Whether the command succeeded.
    pub ok: bool,
}
