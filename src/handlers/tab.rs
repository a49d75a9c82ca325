//! TAB Handler
//!
//! Tab selection and lifecycle. Parameter precedence, first match wins:
//! CLOSEALLOTHERS, CLOSE, OPEN/NEW, T. `T=<n>` retries every 500 ms until
//! the tab retry budget runs out.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::handlers::navigation::browser_bridge;

const RETRY_INTERVAL: Duration = Duration::from_millis(500);

pub struct TabHandler;

#[async_trait]
impl CommandHandler for TabHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let browser = match browser_bridge(ctx) {
            Ok(b) => b,
            Err(result) => return result,
        };

        if ctx.has_flag("CLOSEALLOTHERS") {
            return match browser.close_other_tabs().await {
                Ok(()) => {
                    ctx.state.start_tab_index = 0;
                    CommandResult::ok()
                }
                Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
            };
        }

        if ctx.has_flag("CLOSE") {
            return match browser.close_tab().await {
                Ok(()) => CommandResult::ok(),
                Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
            };
        }

        if ctx.has_flag("OPEN") || ctx.has_flag("NEW") {
            let url = ctx.param("URL");
            return match browser.open_tab(url.as_deref()).await {
                Ok(_tab_index) => CommandResult::ok(),
                Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
            };
        }

        let Some(t) = ctx.param("T") else {
            return CommandResult::fail_with(
                ErrorCode::MissingParameter,
                "TAB requires one of T, OPEN, NEW, CLOSE, CLOSEALLOTHERS",
            );
        };

        let n = match t.parse::<i64>() {
            Ok(n) if n >= 1 => n,
            _ => {
                return CommandResult::fail_with(
                    ErrorCode::InvalidParameter,
                    format!("TAB T must be >= 1, got {}", t),
                )
            }
        };
        let absolute = ctx.state.start_tab_index + (n as usize) - 1;

        let budget = Duration::from_secs_f64(ctx.state.tab_retry_timeout());
        let deadline = Instant::now() + budget;
        loop {
            match browser.switch_tab(absolute).await {
                Ok(()) => return CommandResult::ok(),
                Err(_) if Instant::now() < deadline => {
                    if ctx.control.sleep_cancellable(RETRY_INTERVAL).await {
                        return CommandResult::fail(ErrorCode::UserAbort);
                    }
                }
                Err(_) => break,
            }
        }

        if ctx.state.error_ignore() {
            return CommandResult::ok();
        }
        CommandResult::fail_with(
            ErrorCode::ScriptException,
            format!("Tab {} does not exist", n),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::browser::BrowserBridge;
    use crate::bridge::in_memory::InMemoryBrowser;
    use crate::executor::context::Bridges;
    use crate::executor::control::ControlHandle;
    use crate::parser::parse_line;
    use crate::state::ExecutionState;
    use crate::vars::VariableValue;
    use std::sync::Arc;

    async fn run_tab(
        line: &str,
        browser: Arc<InMemoryBrowser>,
        state: &mut ExecutionState,
    ) -> CommandResult {
        let command = parse_line(line, 1);
        let bridges = Bridges {
            browser: Some(browser as Arc<dyn BrowserBridge>),
            ..Bridges::default()
        };
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state,
            bridges: &bridges,
            control: &control,
        };
        TabHandler.execute(&mut ctx).await
    }

    #[tokio::test]
    async fn test_switch_to_existing_tab() {
        let browser = Arc::new(InMemoryBrowser::new());
        browser.open_tab(None).await.unwrap();
        let mut state = ExecutionState::new();
        let result = run_tab("TAB T=2", browser.clone(), &mut state).await;
        assert!(result.success);
        assert_eq!(browser.calls().last().unwrap(), "switchTab 1");
    }

    #[tokio::test]
    async fn test_give_up_after_single_attempt_with_zero_budget() {
        let browser = Arc::new(InMemoryBrowser::new());
        let mut state = ExecutionState::new();
        state
            .store
            .set("!TIMEOUT_TAG", VariableValue::Number(0.0));
        let result = run_tab("TAB T=5", browser.clone(), &mut state).await;
        assert!(!result.success);
        assert_eq!(result.error_code, ErrorCode::ScriptException);
        assert_eq!(result.error_message.as_deref(), Some("Tab 5 does not exist"));
        assert_eq!(browser.call_count("switchTab"), 1);
    }

    #[tokio::test]
    async fn test_retries_until_budget() {
        let browser = Arc::new(InMemoryBrowser::new());
        let mut state = ExecutionState::new();
        state
            .store
            .set("!TIMEOUT_TAG", VariableValue::Number(1.0));
        let result = run_tab("TAB T=3", browser.clone(), &mut state).await;
        assert!(!result.success);
        assert!(browser.call_count("switchTab") >= 2);
    }

    #[tokio::test]
    async fn test_error_ignore_turns_failure_into_ok() {
        let browser = Arc::new(InMemoryBrowser::new());
        let mut state = ExecutionState::new();
        state.store.set("!TIMEOUT_TAG", VariableValue::Number(0.0));
        state.store.set("!ERRORIGNORE", "YES".into());
        let result = run_tab("TAB T=9", browser, &mut state).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_invalid_index_is_912() {
        let browser = Arc::new(InMemoryBrowser::new());
        let mut state = ExecutionState::new();
        let result = run_tab("TAB T=0", browser, &mut state).await;
        assert_eq!(result.error_code, ErrorCode::InvalidParameter);
    }

    #[tokio::test]
    async fn test_close_all_others_resets_start_index() {
        let browser = Arc::new(InMemoryBrowser::new());
        browser.open_tab(None).await.unwrap();
        let mut state = ExecutionState::new();
        state.start_tab_index = 3;
        let result = run_tab("TAB CLOSEALLOTHERS", browser, &mut state).await;
        assert!(result.success);
        assert_eq!(state.start_tab_index, 0);
    }

    #[tokio::test]
    async fn test_open_with_url() {
        let browser = Arc::new(InMemoryBrowser::new());
        let mut state = ExecutionState::new();
        let result = run_tab("TAB OPEN URL=https://example.com", browser.clone(), &mut state).await;
        assert!(result.success);
        assert_eq!(browser.tab_count(), 2);
    }
}
