//! WAIT and PAUSE Handlers

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::ErrorCode;
use crate::executor::context::{CommandContext, LogLevel};
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;

/// `WAIT SECONDS=<n>`: non-busy sleep that honors stop().
pub struct WaitHandler;

#[async_trait]
impl CommandHandler for WaitHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let seconds = match ctx.required_param("SECONDS") {
            Ok(value) => value,
            Err(result) => return result,
        };
        let seconds = match seconds.parse::<f64>() {
            Ok(s) if s >= 0.0 => s,
            _ => {
                return CommandResult::fail_with(
                    ErrorCode::InvalidParameter,
                    format!("WAIT SECONDS must be a non-negative number, got {}", seconds),
                )
            }
        };
        if ctx
            .control
            .sleep_cancellable(Duration::from_secs_f64(seconds))
            .await
        {
            return CommandResult::fail(ErrorCode::UserAbort);
        }
        CommandResult::ok()
    }
}

/// `PAUSE`: the executor gates itself until resume(), step() or stop().
pub struct PauseHandler;

#[async_trait]
impl CommandHandler for PauseHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.log(LogLevel::Info, "macro paused, waiting for resume");
        ctx.control.pause();
        if ctx.control.wait_at_boundary().await == crate::executor::control::BoundaryAction::Stopped
        {
            return CommandResult::fail(ErrorCode::UserAbort);
        }
        CommandResult::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::context::Bridges;
    use crate::executor::control::ControlHandle;
    use crate::parser::parse_line;
    use crate::state::ExecutionState;
    use std::time::Instant;

    async fn run_wait(line: &str, control: &ControlHandle) -> CommandResult {
        let command = parse_line(line, 1);
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let mut ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control,
        };
        WaitHandler.execute(&mut ctx).await
    }

    #[tokio::test]
    async fn test_wait_sleeps_roughly_requested_time() {
        let control = ControlHandle::new();
        let started = Instant::now();
        let result = run_wait("WAIT SECONDS=0.2", &control).await;
        assert!(result.success);
        assert!(started.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_wait_missing_seconds() {
        let control = ControlHandle::new();
        let result = run_wait("WAIT", &control).await;
        assert_eq!(result.error_code, ErrorCode::MissingParameter);
    }

    #[tokio::test]
    async fn test_wait_invalid_seconds() {
        let control = ControlHandle::new();
        let result = run_wait("WAIT SECONDS=soon", &control).await;
        assert_eq!(result.error_code, ErrorCode::InvalidParameter);
    }

    #[tokio::test]
    async fn test_wait_aborts_on_stop() {
        let control = ControlHandle::new();
        let stopper = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            stopper.stop();
        });
        let started = Instant::now();
        let result = run_wait("WAIT SECONDS=30", &control).await;
        assert_eq!(result.error_code, ErrorCode::UserAbort);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_pause_waits_for_resume() {
        let command = parse_line("PAUSE", 1);
        let control = ControlHandle::new();
        let resumer = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            resumer.resume();
        });
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let mut ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control: &control,
        };
        let result = PauseHandler.execute(&mut ctx).await;
        assert!(result.success);
        assert!(!control.is_paused());
    }
}
