//! Executor
//!
//! The command dispatch loop: load a macro, run it loop by loop and
//! command by command, honoring pause/stop/step, the error-mode
//! variables, pending async errors and cleanup callbacks.

use std::time::Instant;
use tracing::{debug, warn};

use crate::datasource;
use crate::errors::{EngineError, ErrorCode};
use crate::executor::context::{Bridges, CommandContext};
use crate::executor::control::{BoundaryAction, ControlHandle};
use crate::executor::registry::{CommandHandler, HandlerRegistry};
use crate::executor::types::{CommandResult, MacroResult};
use crate::handlers;
use crate::parser::{parse_macro, CommandKind, ParsedCommand, ParsedMacro};
use crate::state::{CleanupFn, ExecutionState};
use crate::state::profiler::ProfilerRecord;
use crate::vars::VariableValue;

pub struct Executor {
    registry: HandlerRegistry,
    bridges: Bridges,
    state: ExecutionState,
    control: ControlHandle,
    loaded: Option<ParsedMacro>,
    max_loops: u32,
    initial_variables: Vec<(String, VariableValue)>,
}

impl Executor {
    /// A new executor wired to the given bridges, with the default
    /// handler set registered.
    pub fn new(bridges: Bridges) -> Self {
        let mut registry = HandlerRegistry::new();
        handlers::register_default_handlers(&mut registry);
        Self {
            registry,
            bridges,
            state: ExecutionState::new(),
            control: ControlHandle::new(),
            loaded: None,
            max_loops: 1,
            initial_variables: Vec::new(),
        }
    }

    /// Parse and load a macro for execution. Parse diagnostics are
    /// non-fatal; they are logged and the macro stays runnable.
    pub fn load_macro(&mut self, text: &str) -> &ParsedMacro {
        let parsed = parse_macro(text);
        for diag in &parsed.errors {
            warn!(line = diag.line, code = diag.code.code(), "{}", diag.message);
        }
        self.loaded = Some(parsed);
        self.loaded.as_ref().unwrap()
    }

    /// Load an already-parsed macro.
    pub fn load_parsed(&mut self, parsed: ParsedMacro) {
        self.loaded = Some(parsed);
    }

    pub fn set_max_loops(&mut self, max_loops: u32) {
        self.max_loops = max_loops.max(1);
    }

    /// Variables applied at the start of every loop iteration.
    pub fn set_initial_variables(&mut self, variables: Vec<(String, VariableValue)>) {
        self.initial_variables = variables;
    }

    /// Replace or add a handler for one command kind.
    pub fn register_handler(
        &mut self,
        kind: CommandKind,
        handler: std::sync::Arc<dyn CommandHandler>,
    ) {
        self.registry.register(kind, handler);
    }

    pub fn register_cleanup(&mut self, callback: CleanupFn) {
        self.state.register_cleanup(callback);
    }

    /// Queue an error produced by a background collaborator. The next
    /// command boundary consumes it.
    pub fn set_pending_error(&mut self, result: CommandResult) {
        self.state.set_pending_error(result);
    }

    pub fn set_error_ignore(&mut self, ignore: bool) {
        self.state
            .store
            .set("!ERRORIGNORE", if ignore { "YES" } else { "NO" }.into());
    }

    /// Handle for pausing, resuming, stopping and stepping this executor
    /// from other tasks.
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn step(&self) {
        self.control.step();
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ExecutionState {
        &mut self.state
    }

    /// Run the loaded macro to completion and aggregate the outcome.
    /// Cleanup callbacks fire on every exit path.
    pub async fn execute(&mut self) -> Result<MacroResult, EngineError> {
        let parsed = self.loaded.clone().ok_or(EngineError::NoMacroLoaded)?;

        self.state.reset();
        self.control.reset();
        let started = Instant::now();

        let mut loops_completed = 0u32;
        let mut failure: Option<(CommandResult, Option<usize>)> = None;
        let mut stopped = false;

        'run: for loop_index in 1..=self.max_loops {
            self.state.loop_index = loop_index;
            self.state.tag_anchor = None;
            self.state
                .store
                .set_system("!LOOP", VariableValue::Number(loop_index as f64));
            for (name, value) in &self.initial_variables {
                self.state.store.set(name, value.clone());
            }

            // Datasource columns for this iteration. Errors are treated
            // like a failure of the iteration's first command.
            if let Err(result) =
                datasource::load_columns(&mut self.state, self.bridges.datasource.as_deref())
            {
                let line = parsed.commands.first().map(|c| c.line_number);
                if self.state.error_ignore() {
                    warn!("ignoring datasource error: {:?}", result.error_message);
                } else if self.state.error_loop() {
                    warn!("datasource error, advancing to next loop");
                    continue 'run;
                } else {
                    failure = Some((result, line));
                    break 'run;
                }
            }

            for command in &parsed.commands {
                if self.control.wait_at_boundary().await == BoundaryAction::Stopped {
                    stopped = true;
                    break 'run;
                }

                let (result, was_pending) = match self.state.consume_pending_error() {
                    Some(pending) => (pending, true),
                    None => (self.dispatch(command).await, false),
                };

                if self.control.is_stopped() {
                    stopped = true;
                    break 'run;
                }

                if !result.success {
                    if self.state.error_ignore() {
                        warn!(
                            line = command.line_number,
                            code = result.error_code.code(),
                            pending = was_pending,
                            "command failed, continuing (!ERRORIGNORE)"
                        );
                        continue;
                    }
                    if self.state.error_loop() {
                        warn!(
                            line = command.line_number,
                            code = result.error_code.code(),
                            "command failed, advancing to next loop (!ERRORLOOP)"
                        );
                        continue 'run;
                    }
                    failure = Some((result, Some(command.line_number)));
                    break 'run;
                }

                loops_completed = loop_index;
            }

            loops_completed = loop_index;
        }

        self.state.run_cleanup();

        let execution_time_ms = started.elapsed().as_millis() as u64;
        let extract_data = self.state.take_extract_data();
        let variables = self.state.store.snapshot();
        let profiler_records = if self.state.profiler_enabled() {
            Some(std::mem::take(&mut self.state.profiler_records))
        } else {
            None
        };

        let result = if stopped {
            MacroResult {
                success: false,
                error_code: ErrorCode::UserAbort,
                error_message: Some(ErrorCode::UserAbort.default_message().to_string()),
                error_line: None,
                loops_completed,
                execution_time_ms,
                extract_data,
                variables,
                profiler_records,
            }
        } else if let Some((command_result, line)) = failure {
            MacroResult {
                success: false,
                error_code: command_result.error_code,
                error_message: command_result.error_message,
                error_line: line,
                loops_completed,
                execution_time_ms,
                extract_data,
                variables,
                profiler_records,
            }
        } else {
            MacroResult {
                success: true,
                error_code: ErrorCode::Ok,
                error_message: None,
                error_line: None,
                loops_completed,
                execution_time_ms,
                extract_data,
                variables,
                profiler_records,
            }
        };
        Ok(result)
    }

    async fn dispatch(&mut self, command: &ParsedCommand) -> CommandResult {
        debug!(
            line = command.line_number,
            command = command.keyword.as_str(),
            "dispatch"
        );
        let handler = self.registry.get(command.kind);
        let started_at = chrono::Local::now();
        let started = Instant::now();

        let mut ctx = CommandContext {
            command,
            state: &mut self.state,
            bridges: &self.bridges,
            control: &self.control,
        };
        let result = handler.execute(&mut ctx).await;

        if self.state.profiler_enabled() {
            self.state.profiler_records.push(ProfilerRecord {
                line: command.line_number,
                command: command.keyword.clone(),
                started_at,
                elapsed_ms: started.elapsed().as_millis() as u64,
                ok: result.success,
            });
        }
        result
    }
}
