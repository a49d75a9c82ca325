//! Stub and OS-Level Handlers
//!
//! OS-level commands the engine does not implement itself. CMDLINE runs
//! only when the embedder injects a `CmdlineExecutor`; everything else
//! reports `UNSUPPORTED_COMMAND`.

use async_trait::async_trait;

use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::vars::VariableValue;

/// Fixed `UNSUPPORTED_COMMAND` answer, naming the command.
pub struct UnsupportedHandler;

#[async_trait]
impl CommandHandler for UnsupportedHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        CommandResult::fail_with(
            ErrorCode::UnsupportedCommand,
            format!("{} is not supported", ctx.command.keyword),
        )
    }
}

/// `CMDLINE CMD=<command>` (or a positional command line). Runs through
/// the injected executor and records exit code and output in the
/// `!CMDLINE_*` variables; without one it is a stub.
pub struct CmdlineHandler;

#[async_trait]
impl CommandHandler for CmdlineHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let Some(executor) = ctx.bridges.cmdline.clone() else {
            return CommandResult::fail_with(
                ErrorCode::UnsupportedCommand,
                "CMDLINE is not supported",
            );
        };

        let command_line = match ctx.param("CMD").or_else(|| ctx.positional(0)) {
            Some(cmd) if !cmd.is_empty() => cmd,
            _ => {
                return CommandResult::fail_with(
                    ErrorCode::MissingParameter,
                    "CMDLINE requires a command",
                )
            }
        };

        match executor.run(&command_line).await {
            Ok(output) => {
                ctx.state.store.set_system(
                    "!CMDLINE_EXITCODE",
                    VariableValue::Number(output.exit_code as f64),
                );
                ctx.state
                    .store
                    .set_system("!CMDLINE_STDOUT", output.stdout.clone().into());
                ctx.state
                    .store
                    .set_system("!CMDLINE_STDERR", output.stderr.into());
                if output.exit_code == 0 {
                    CommandResult::with_output(output.stdout)
                } else {
                    CommandResult::fail_with(
                        ErrorCode::ScriptError,
                        format!("command exited with {}", output.exit_code),
                    )
                }
            }
            Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::cmdline::CmdlineExecutor;
    use crate::bridge::types::{BridgeError, CmdlineOutput};
    use crate::executor::context::Bridges;
    use crate::executor::control::ControlHandle;
    use crate::parser::parse_line;
    use crate::state::ExecutionState;
    use std::sync::Arc;

    struct EchoExecutor;

    #[async_trait]
    impl CmdlineExecutor for EchoExecutor {
        async fn run(&self, command: &str) -> Result<CmdlineOutput, BridgeError> {
            Ok(CmdlineOutput {
                exit_code: 0,
                stdout: command.to_string(),
                stderr: String::new(),
            })
        }
    }

    async fn run_line(
        line: &str,
        cmdline: Option<Arc<dyn CmdlineExecutor>>,
        state: &mut ExecutionState,
    ) -> CommandResult {
        let command = parse_line(line, 1);
        let bridges = Bridges {
            cmdline,
            ..Bridges::default()
        };
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state,
            bridges: &bridges,
            control: &control,
        };
        if command.kind == crate::parser::CommandKind::Cmdline {
            CmdlineHandler.execute(&mut ctx).await
        } else {
            UnsupportedHandler.execute(&mut ctx).await
        }
    }

    #[tokio::test]
    async fn test_unsupported_names_the_command() {
        let mut state = ExecutionState::new();
        let result = run_line("REDIAL", None, &mut state).await;
        assert_eq!(result.error_code, ErrorCode::UnsupportedCommand);
        assert!(result.error_message.unwrap().contains("REDIAL"));
    }

    #[tokio::test]
    async fn test_cmdline_without_executor_is_915() {
        let mut state = ExecutionState::new();
        let result = run_line("CMDLINE CMD=ls", None, &mut state).await;
        assert_eq!(result.error_code, ErrorCode::UnsupportedCommand);
    }

    #[tokio::test]
    async fn test_cmdline_with_executor_sets_variables() {
        let mut state = ExecutionState::new();
        let result = run_line("CMDLINE CMD=hello", Some(Arc::new(EchoExecutor)), &mut state).await;
        assert!(result.success);
        assert_eq!(state.get_variable("!CMDLINE_EXITCODE").as_deref(), Some("0"));
        assert_eq!(state.get_variable("!CMDLINE_STDOUT").as_deref(), Some("hello"));
    }
}
