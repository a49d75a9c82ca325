//! Execution state module

pub mod execution_state;
pub mod profiler;
pub mod stopwatch;

pub use execution_state::{ExecutionState, CleanupFn, DEFAULT_TAG_TIMEOUT, DEFAULT_TIMEOUT, EXTRACT_DELIMITER};
pub use profiler::ProfilerRecord;
pub use stopwatch::{Stopwatch, StopwatchMap};
