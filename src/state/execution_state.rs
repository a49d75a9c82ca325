//! Execution State
//!
//! Per-run mutable state owned exclusively by one executor: the variable
//! store, loop position, extract accumulator, stopwatches, profiler
//! records, cleanup callbacks and the pending-async-error slot.

use tracing::warn;

use crate::bridge::types::ElementInfo;
use crate::executor::types::CommandResult;
use crate::state::profiler::ProfilerRecord;
use crate::state::stopwatch::StopwatchMap;
use crate::vars::{SetOutcome, VariableStore, VariableValue};

/// Delimiter of the joined extract view.
pub const EXTRACT_DELIMITER: &str = "[EXTRACT]";

/// Default element wait when `!TIMEOUT_TAG` is unset.
pub const DEFAULT_TAG_TIMEOUT: f64 = 6.0;

/// Default whole-page timeout when `!TIMEOUT` is unset or invalid.
pub const DEFAULT_TIMEOUT: f64 = 60.0;

pub type CleanupFn = Box<dyn FnOnce() -> Result<(), String> + Send>;

pub struct ExecutionState {
    pub store: VariableStore,
    /// 1-based loop index of the running iteration.
    pub loop_index: u32,
    pub max_loops: u32,
    /// 0-based index the `TAB T=<n>` offset is computed from.
    pub start_tab_index: usize,
    /// Anchor for `POS=R<k>`, recorded by the previous TAG of this loop
    /// iteration.
    pub tag_anchor: Option<ElementInfo>,
    pub stopwatches: StopwatchMap,
    pub profiler_records: Vec<ProfilerRecord>,
    extract_data: Vec<String>,
    cleanup: Vec<CleanupFn>,
    pending_error: Option<CommandResult>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self {
            store: VariableStore::new(),
            loop_index: 1,
            max_loops: 1,
            start_tab_index: 0,
            tag_anchor: None,
            stopwatches: StopwatchMap::new(),
            profiler_records: Vec::new(),
            extract_data: Vec::new(),
            cleanup: Vec::new(),
            pending_error: None,
        }
    }

    /// Reset run-scoped state at the start of `execute()`. Cleanup
    /// callbacks registered before the run survive so they still fire at
    /// run end, and a queued pending error stays queued for the next
    /// command boundary.
    pub fn reset(&mut self) {
        self.store = VariableStore::new();
        self.loop_index = 1;
        self.start_tab_index = 0;
        self.tag_anchor = None;
        self.stopwatches = StopwatchMap::new();
        self.profiler_records = Vec::new();
        self.extract_data = Vec::new();
    }

    // ---- Variables ----

    pub fn set_variable(&mut self, name: &str, value: VariableValue) -> SetOutcome {
        self.store.set_variable(name, value)
    }

    pub fn get_variable(&self, name: &str) -> Option<String> {
        self.store.get_str(name)
    }

    // ---- Extract accumulator ----

    /// Append a value to the extract list. `!EXTRACT` tracks the latest
    /// appended value, not the joined form.
    pub fn add_extract(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.store.set_system("!EXTRACT", value.clone().into());
        self.extract_data.push(value);
    }

    pub fn extract_data(&self) -> &[String] {
        &self.extract_data
    }

    pub fn extract_string(&self) -> String {
        self.extract_data.join(EXTRACT_DELIMITER)
    }

    pub fn take_extract_data(&mut self) -> Vec<String> {
        std::mem::take(&mut self.extract_data)
    }

    // ---- Cleanup ----

    pub fn register_cleanup(&mut self, callback: CleanupFn) {
        self.cleanup.push(callback);
    }

    /// Run every cleanup callback in registration order. A failing
    /// callback is logged and does not stop the rest; cleanup never
    /// changes the macro's final result.
    pub fn run_cleanup(&mut self) {
        for callback in self.cleanup.drain(..) {
            if let Err(message) = callback() {
                warn!(error = %message, "cleanup callback failed");
            }
        }
    }

    // ---- Pending async error ----

    /// Record an error produced between command boundaries. Only the
    /// first one is kept.
    pub fn set_pending_error(&mut self, result: CommandResult) {
        if self.pending_error.is_none() {
            self.pending_error = Some(result);
        }
    }

    /// Fetch-and-clear the pending error slot.
    pub fn consume_pending_error(&mut self) -> Option<CommandResult> {
        self.pending_error.take()
    }

    // ---- Error-mode flags ----

    pub fn error_ignore(&self) -> bool {
        self.store.is_yes("!ERRORIGNORE")
    }

    pub fn error_loop(&self) -> bool {
        self.store.is_yes("!ERRORLOOP")
    }

    // ---- Timeouts (seconds) ----

    /// `!TIMEOUT`, falling back to 60.
    pub fn timeout(&self) -> f64 {
        positive(self.store.get_number("!TIMEOUT")).unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Element wait for TAG: `!TIMEOUT_TAG`, falling back to 6.
    pub fn tag_timeout(&self) -> f64 {
        positive(self.store.get_number("!TIMEOUT_TAG")).unwrap_or(DEFAULT_TAG_TIMEOUT)
    }

    /// Tab retry budget: `!TIMEOUT_TAG`, else `!TIMEOUT`/10, else 6.
    /// The 10x reduction against the page timeout is long-standing
    /// behavior and is kept as-is.
    pub fn tab_retry_timeout(&self) -> f64 {
        positive(self.store.get_number("!TIMEOUT_TAG"))
            .or_else(|| positive(self.store.get_number("!TIMEOUT")).map(|t| t / 10.0))
            .unwrap_or(DEFAULT_TAG_TIMEOUT)
    }

    /// FRAME retry budget: `!TIMEOUT_STEP`, or `None` for a single
    /// attempt.
    pub fn step_timeout(&self) -> Option<f64> {
        positive(self.store.get_number("!TIMEOUT_STEP"))
    }

    pub fn profiler_enabled(&self) -> bool {
        self.store
            .get_str("!FILE_PROFILER")
            .map(|v| !v.is_empty() && !v.eq_ignore_ascii_case("NO"))
            .unwrap_or(false)
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v >= 0.0)
}
