//! STOPWATCH Handler
//!
//! Named stopwatches. A bare `STOPWATCH ID=x` toggles: it starts a
//! stopped watch and stops a running one, recording the elapsed time in
//! the read-only `!STOPWATCH_<ID>` variable. START, STOP, LAP and RESET
//! may also be given explicitly.

use async_trait::async_trait;

use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::vars::VariableValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Start,
    Stop,
    Lap,
    Reset,
    Toggle,
}

fn requested_action(ctx: &CommandContext<'_>) -> Action {
    let explicit = ctx
        .param("ACTION")
        .map(|a| a.to_uppercase())
        .or_else(|| {
            ["START", "STOP", "LAP", "RESET"]
                .into_iter()
                .find(|flag| ctx.has_flag(flag))
                .map(|flag| flag.to_string())
        });
    match explicit.as_deref() {
        Some("START") => Action::Start,
        Some("STOP") => Action::Stop,
        Some("LAP") => Action::Lap,
        Some("RESET") => Action::Reset,
        _ => Action::Toggle,
    }
}

/// The read-only variable a watch reports into.
fn watch_variable(id: &str) -> String {
    if id.is_empty() {
        "!STOPWATCH".to_string()
    } else {
        format!("!STOPWATCH_{}", id.to_uppercase())
    }
}

pub struct StopwatchHandler;

#[async_trait]
impl CommandHandler for StopwatchHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let id = ctx.param("ID").unwrap_or_default();
        let mut action = requested_action(ctx);
        if action == Action::Toggle {
            action = if ctx.state.stopwatches.is_running(&id) {
                Action::Stop
            } else {
                Action::Start
            };
        }

        match action {
            Action::Start => match ctx.state.stopwatches.start(&id) {
                Ok(()) => CommandResult::ok(),
                Err(code) => CommandResult::fail(code),
            },
            Action::Stop => match ctx.state.stopwatches.stop(&id) {
                Ok(elapsed) => {
                    let rounded = (elapsed * 1000.0).round() / 1000.0;
                    ctx.state
                        .store
                        .set_system(&watch_variable(&id), VariableValue::Number(rounded));
                    CommandResult::with_output(format!("{:.3}", elapsed))
                }
                Err(code) => CommandResult::fail(code),
            },
            Action::Lap => match ctx.state.stopwatches.lap(&id) {
                Ok(elapsed) => CommandResult::with_output(format!("{:.3}", elapsed)),
                Err(code) => CommandResult::fail(code),
            },
            Action::Reset => {
                ctx.state.stopwatches.reset(&id);
                CommandResult::ok()
            }
            Action::Toggle => unreachable!("toggle resolved above"),
        }
    }
}
