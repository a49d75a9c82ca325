//! FRAME Handler
//!
//! Frame selection by index (`F=0` is the main document) or name.
//! Retries every 500 ms up to `!TIMEOUT_STEP`; with that unset it makes a
//! single attempt. On exhaustion the selection is reset to the main
//! frame.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::bridge::types::FrameTarget;
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::handlers::navigation::browser_bridge;

const RETRY_INTERVAL: Duration = Duration::from_millis(500);

pub struct FrameHandler;

#[async_trait]
impl CommandHandler for FrameHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let browser = match browser_bridge(ctx) {
            Ok(b) => b,
            Err(result) => return result,
        };

        let (target, describe) = if let Some(f) = ctx.param("F") {
            match f.parse::<i64>() {
                Ok(n) if n >= 0 => (
                    FrameTarget::Index(n as usize),
                    format!("Frame {} not found", n),
                ),
                _ => {
                    return CommandResult::fail_with(
                        ErrorCode::InvalidParameter,
                        format!("FRAME F must be a non-negative integer, got {}", f),
                    )
                }
            }
        } else if let Some(name) = ctx.param("NAME") {
            let describe = format!("Frame \"{}\" not found", name);
            (FrameTarget::Name(name), describe)
        } else {
            return CommandResult::fail_with(
                ErrorCode::MissingParameter,
                "FRAME requires F=<n> or NAME=<name>",
            );
        };

        let deadline = ctx
            .state
            .step_timeout()
            .map(|t| Instant::now() + Duration::from_secs_f64(t));

        let mut last_error = None;
        loop {
            match browser.select_frame(&target).await {
                Ok(()) => return CommandResult::ok(),
                Err(e) => {
                    last_error = Some(e.message);
                    match deadline {
                        Some(deadline) if Instant::now() < deadline => {
                            if ctx.control.sleep_cancellable(RETRY_INTERVAL).await {
                                return CommandResult::fail(ErrorCode::UserAbort);
                            }
                        }
                        _ => break,
                    }
                }
            }
        }

        // Never leave a half-selected frame behind
        let _ = browser.select_frame(&FrameTarget::Index(0)).await;

        let message = last_error.filter(|m| !m.is_empty()).unwrap_or(describe);
        CommandResult::fail_with(ErrorCode::FrameNotFound, message)
    }
}
