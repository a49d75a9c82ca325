//! Navigation Handlers
//!
//! URL (GOTO / CURRENT), BACK, REFRESH and CLEAR.

use async_trait::async_trait;
use std::sync::Arc;

use crate::bridge::browser::BrowserBridge;
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::vars::UrlKind;

/// Fetch the browser bridge or fail the command.
pub(crate) fn browser_bridge(
    ctx: &CommandContext<'_>,
) -> Result<Arc<dyn BrowserBridge>, CommandResult> {
    ctx.bridges.browser.clone().ok_or_else(|| {
        CommandResult::fail_with(ErrorCode::ScriptError, "no browser bridge configured")
    })
}

/// Prefix `http://` when the URL has no scheme (no `:` before any `/`).
fn ensure_scheme(url: &str) -> String {
    let colon = url.find(':');
    let slash = url.find('/');
    let has_scheme = match (colon, slash) {
        (Some(c), Some(s)) => c < s,
        (Some(_), None) => true,
        _ => false,
    };
    if has_scheme {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

/// Minimal structural check: a scheme followed by something. http(s) URLs
/// additionally need a non-empty host.
fn is_valid_url(url: &str) -> bool {
    let Some(colon) = url.find(':') else {
        return false;
    };
    let scheme = &url[..colon];
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    {
        return false;
    }
    if let Some(rest) = url.strip_prefix("http://").or_else(|| url.strip_prefix("https://")) {
        let host = rest.split(['/', '?', '#']).next().unwrap_or("");
        return !host.is_empty();
    }
    url.len() > colon + 1
}

pub struct UrlHandler;

#[async_trait]
impl CommandHandler for UrlHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let browser = match browser_bridge(ctx) {
            Ok(b) => b,
            Err(result) => return result,
        };

        if let Some(raw) = ctx.param("GOTO") {
            let url = ensure_scheme(&raw);
            if !is_valid_url(&url) {
                return CommandResult::fail_with(
                    ErrorCode::InvalidParameter,
                    format!("invalid URL {}", raw),
                );
            }
            return match browser.navigate(&url).await {
                Ok(info) => {
                    ctx.state.store.set_url(UrlKind::Current, &info.url);
                    if let Some(title) = info.title.filter(|t| !t.is_empty()) {
                        ctx.state.store.set_system("!DOCUMENT_TITLE", title.into());
                    }
                    CommandResult::ok()
                }
                Err(e) => {
                    let message = if e.message.is_empty() {
                        format!("Failed to navigate to {}", url)
                    } else {
                        e.message
                    };
                    CommandResult::fail_with(ErrorCode::PageTimeout, message)
                }
            };
        }

        if ctx.has_flag("CURRENT") {
            return match browser.get_current_url().await {
                Ok(info) => {
                    ctx.state.store.set_url(UrlKind::Current, &info.url);
                    if let Some(title) = info.title.filter(|t| !t.is_empty()) {
                        ctx.state.store.set_system("!DOCUMENT_TITLE", title.into());
                    }
                    CommandResult::with_output(info.url)
                }
                Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
            };
        }

        CommandResult::fail_with(
            ErrorCode::MissingParameter,
            "URL requires GOTO=<url> or CURRENT",
        )
    }
}

pub struct BackHandler;

#[async_trait]
impl CommandHandler for BackHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let browser = match browser_bridge(ctx) {
            Ok(b) => b,
            Err(result) => return result,
        };
        match browser.go_back().await {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
        }
    }
}

pub struct RefreshHandler;

#[async_trait]
impl CommandHandler for RefreshHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let browser = match browser_bridge(ctx) {
            Ok(b) => b,
            Err(result) => return result,
        };
        match browser.refresh().await {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
        }
    }
}

pub struct ClearHandler;

#[async_trait]
impl CommandHandler for ClearHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let browser = match browser_bridge(ctx) {
            Ok(b) => b,
            Err(result) => return result,
        };
        match browser.clear_browsing_data().await {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::in_memory::{InMemoryBrowser, SimPage};
    use crate::executor::context::Bridges;
    use crate::executor::control::ControlHandle;
    use crate::parser::parse_line;
    use crate::state::ExecutionState;

    fn bridges_with(browser: Arc<InMemoryBrowser>) -> Bridges {
        Bridges {
            browser: Some(browser as Arc<dyn BrowserBridge>),
            ..Bridges::default()
        }
    }

    async fn run_url(line: &str, browser: Arc<InMemoryBrowser>) -> (CommandResult, ExecutionState) {
        let command = parse_line(line, 1);
        let mut state = ExecutionState::new();
        let bridges = bridges_with(browser);
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control: &control,
        };
        let result = UrlHandler.execute(&mut ctx).await;
        (result, state)
    }

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(ensure_scheme("example.com/a"), "http://example.com/a");
        assert_eq!(ensure_scheme("https://example.com"), "https://example.com");
        assert_eq!(ensure_scheme("about:blank"), "about:blank");
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("about:blank"));
        assert!(!is_valid_url("http://"));
        assert!(!is_valid_url("no-scheme"));
    }

    #[tokio::test]
    async fn test_goto_navigates_and_updates_urlcurrent() {
        let browser = Arc::new(InMemoryBrowser::new());
        browser.register_page(SimPage::new("https://example.com/page2", "Page Two"));
        let (result, state) =
            run_url("URL GOTO=https://example.com/page2", browser.clone()).await;
        assert!(result.success);
        assert_eq!(browser.calls()[0], "navigate https://example.com/page2");
        assert_eq!(
            state.get_variable("!URLCURRENT").as_deref(),
            Some("https://example.com/page2")
        );
        assert_eq!(
            state.get_variable("!DOCUMENT_TITLE").as_deref(),
            Some("Page Two")
        );
    }

    #[tokio::test]
    async fn test_goto_defaults_scheme() {
        let browser = Arc::new(InMemoryBrowser::new());
        let (result, state) = run_url("URL GOTO=example.com", browser.clone()).await;
        assert!(result.success);
        assert_eq!(
            state.get_variable("!URLCURRENT").as_deref(),
            Some("http://example.com")
        );
    }

    #[tokio::test]
    async fn test_goto_invalid_url_is_912() {
        let browser = Arc::new(InMemoryBrowser::new());
        let (result, _) = run_url("URL GOTO=http://", browser).await;
        assert_eq!(result.error_code, ErrorCode::InvalidParameter);
    }

    #[tokio::test]
    async fn test_goto_bridge_failure_is_page_timeout() {
        let browser = Arc::new(InMemoryBrowser::new());
        browser.set_offline(true);
        let (result, _) = run_url("URL GOTO=https://example.com", browser).await;
        assert_eq!(result.error_code, ErrorCode::PageTimeout);
    }

    #[tokio::test]
    async fn test_current_returns_url_as_output() {
        let browser = Arc::new(InMemoryBrowser::new());
        browser.register_page(SimPage::new("https://example.com", "T"));
        browser.navigate("https://example.com").await.unwrap();
        let (result, _) = run_url("URL CURRENT", browser).await;
        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn test_current_failure_is_script_error() {
        let browser = Arc::new(InMemoryBrowser::new());
        let (result, _) = run_url("URL CURRENT", browser).await;
        assert_eq!(result.error_code, ErrorCode::ScriptError);
    }

    #[tokio::test]
    async fn test_neither_form_is_missing_parameter() {
        let browser = Arc::new(InMemoryBrowser::new());
        let (result, _) = run_url("URL", browser).await;
        assert_eq!(result.error_code, ErrorCode::MissingParameter);
    }
}
