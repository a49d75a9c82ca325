//! Command Context
//!
//! The short-lived view a handler gets for one dispatch: the parsed
//! command, the run state, the bridges and the control handle. No handler
//! keeps it past its call.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bridge::browser::BrowserBridge;
use crate::bridge::cmdline::CmdlineExecutor;
use crate::bridge::content::ContentScriptSender;
use crate::bridge::dialog::DialogBridge;
use crate::bridge::eval::ExpressionEvaluator;
use crate::bridge::network::NetworkManager;
use crate::datasource::DataSourceProvider;
use crate::errors::ErrorCode;
use crate::executor::control::ControlHandle;
use crate::executor::types::CommandResult;
use crate::parser::{Parameter, ParsedCommand};
use crate::state::ExecutionState;

/// The engine's collaborators. Every slot is optional; handlers that need
/// a missing bridge fail with a descriptive SCRIPT_ERROR (or a stub code).
#[derive(Clone, Default)]
pub struct Bridges {
    pub browser: Option<Arc<dyn BrowserBridge>>,
    pub content: Option<Arc<dyn ContentScriptSender>>,
    pub dialog: Option<Arc<dyn DialogBridge>>,
    pub cmdline: Option<Arc<dyn CmdlineExecutor>>,
    pub network: Option<Arc<dyn NetworkManager>>,
    pub evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    pub datasource: Option<Arc<dyn DataSourceProvider>>,
}

/// Log levels a handler can emit through the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

pub struct CommandContext<'a> {
    pub command: &'a ParsedCommand,
    pub state: &'a mut ExecutionState,
    pub bridges: &'a Bridges,
    pub control: &'a ControlHandle,
}

impl<'a> CommandContext<'a> {
    /// Case-insensitive parameter lookup, value expanded through the
    /// store.
    pub fn param(&self, key: &str) -> Option<String> {
        self.command
            .param(key)
            .map(|p| self.state.store.expand(&p.value).expanded)
    }

    /// The parameter record as parsed, expansion untouched.
    pub fn raw_param(&self, key: &str) -> Option<&Parameter> {
        self.command.param(key)
    }

    /// Expanded value of a required parameter, or a ready-made
    /// MISSING_PARAMETER failure naming the key.
    pub fn required_param(&self, key: &str) -> Result<String, CommandResult> {
        self.param(key).ok_or_else(|| {
            CommandResult::fail_with(
                ErrorCode::MissingParameter,
                format!("{} requires {}=", self.command.keyword, key.to_uppercase()),
            )
        })
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.command.has_flag(name)
    }

    /// Expanded literal of the n-th positional parameter (0-based).
    pub fn positional(&self, index: usize) -> Option<String> {
        self.raw_positional(index)
            .map(|text| self.state.store.expand(&text).expanded)
    }

    /// Unexpanded literal of the n-th positional parameter (0-based).
    pub fn raw_positional(&self, index: usize) -> Option<String> {
        self.command
            .parameters
            .iter()
            .filter(|p| p.is_positional())
            .nth(index)
            .map(|p| p.literal())
    }

    pub fn expand(&self, text: &str) -> String {
        self.state.store.expand(text).expanded
    }

    /// Structured log line attributed to the current command.
    pub fn log(&self, level: LogLevel, message: &str) {
        let line = self.command.line_number;
        let command = self.command.keyword.as_str();
        match level {
            LogLevel::Debug => debug!(line, command, "{}", message),
            LogLevel::Info => info!(line, command, "{}", message),
            LogLevel::Warn => warn!(line, command, "{}", message),
            LogLevel::Error => error!(line, command, "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn make_state() -> ExecutionState {
        let mut state = ExecutionState::new();
        state.store.set("!VAR1", "world".into());
        state
    }

    #[test]
    fn test_param_is_expanded() {
        let command = parse_line("URL GOTO=https://{{!VAR1}}.example", 1);
        let mut state = make_state();
        let bridges = Bridges::default();
        let control = ControlHandle::new();
        let ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control: &control,
        };
        assert_eq!(
            ctx.param("goto").as_deref(),
            Some("https://world.example")
        );
    }

    #[test]
    fn test_required_param_missing() {
        let command = parse_line("URL", 3);
        let mut state = make_state();
        let bridges = Bridges::default();
        let control = ControlHandle::new();
        let ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control: &control,
        };
        let err = ctx.required_param("GOTO").unwrap_err();
        assert_eq!(err.error_code, ErrorCode::MissingParameter);
        assert!(err.error_message.unwrap().contains("GOTO"));
    }

    #[test]
    fn test_positional_expansion() {
        let command = parse_line("SET !VAR2 {{!VAR1}}", 1);
        let mut state = make_state();
        let bridges = Bridges::default();
        let control = ControlHandle::new();
        let ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control: &control,
        };
        assert_eq!(ctx.positional(0).as_deref(), Some("!VAR2"));
        assert_eq!(ctx.positional(1).as_deref(), Some("world"));
        assert_eq!(ctx.positional(2), None);
    }
}
