//! Network Handlers
//!
//! FILTER (content filtering) and PROXY, forwarded to the network
//! manager.

use async_trait::async_trait;

use crate::bridge::types::{ContentFilter, FilterKind, ProxyConfig};
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;

/// `FILTER TYPE=IMAGES STATUS=ON|OFF`
pub struct FilterHandler;

#[async_trait]
impl CommandHandler for FilterHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let kind = match ctx.required_param("TYPE") {
            Ok(t) => t,
            Err(result) => return result,
        };
        if !kind.eq_ignore_ascii_case("IMAGES") {
            return CommandResult::fail_with(
                ErrorCode::InvalidParameter,
                format!("unknown filter type {}", kind),
            );
        }
        let status = ctx.param("STATUS").unwrap_or_else(|| "ON".to_string());
        let enabled = match status.to_uppercase().as_str() {
            "ON" | "YES" => true,
            "OFF" | "NO" => false,
            other => {
                return CommandResult::fail_with(
                    ErrorCode::InvalidParameter,
                    format!("FILTER STATUS must be ON or OFF, got {}", other),
                )
            }
        };

        let Some(network) = ctx.bridges.network.clone() else {
            return CommandResult::fail_with(
                ErrorCode::ScriptError,
                "no network manager configured",
            );
        };
        let filter = ContentFilter {
            kind: FilterKind::Images,
            enabled,
        };
        match network.set_content_filter(&filter).await {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
        }
    }
}

/// `PROXY ADDRESS=<host:port> [BYPASS=<list>]`
pub struct ProxyHandler;

#[async_trait]
impl CommandHandler for ProxyHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let address = match ctx.required_param("ADDRESS") {
            Ok(a) => a,
            Err(result) => return result,
        };
        let Some(network) = ctx.bridges.network.clone() else {
            return CommandResult::fail_with(
                ErrorCode::ScriptError,
                "no network manager configured",
            );
        };
        let config = ProxyConfig {
            address,
            bypass: ctx.param("BYPASS"),
        };
        match network.set_proxy(&config).await {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail_with(ErrorCode::ScriptError, e.message),
        }
    }
}
