//! CLICK and EVENT Handlers
//!
//! Coordinate clicks and synthesized DOM events, forwarded to the content
//! script sender.

use async_trait::async_trait;

use crate::bridge::types::{
    ClickRequest, ContentResponse, CoordinateMode, EventRequest, MouseButton, Point,
};
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;

fn content_error(response: ContentResponse) -> CommandResult {
    let code = response
        .error_code
        .map(ErrorCode::from_code)
        .unwrap_or(ErrorCode::ScriptError);
    let message = response
        .error
        .unwrap_or_else(|| code.default_message().to_string());
    CommandResult::fail_with(code, message)
}

fn parse_point(value: &str) -> Option<Point> {
    let trimmed = value.trim().trim_start_matches('(').trim_end_matches(')');
    let (x, y) = trimmed.split_once(',')?;
    Some(Point {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
    })
}

pub struct ClickHandler;

#[async_trait]
impl CommandHandler for ClickHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let Some(sender) = ctx.bridges.content.clone() else {
            return CommandResult::fail_with(
                ErrorCode::ScriptError,
                "no content script sender configured",
            );
        };

        let x = match ctx.required_param("X") {
            Ok(v) => v,
            Err(result) => return result,
        };
        let y = match ctx.required_param("Y") {
            Ok(v) => v,
            Err(result) => return result,
        };
        let (Ok(x), Ok(y)) = (x.parse::<i32>(), y.parse::<i32>()) else {
            return CommandResult::fail_with(
                ErrorCode::InvalidParameter,
                "CLICK X and Y must be integers",
            );
        };

        let button = match ctx
            .param("BUTTON")
            .map(|b| b.to_uppercase())
            .as_deref()
            .unwrap_or("LEFT")
        {
            "LEFT" => MouseButton::Left,
            "MIDDLE" => MouseButton::Middle,
            "RIGHT" => MouseButton::Right,
            other => {
                return CommandResult::fail_with(
                    ErrorCode::InvalidParameter,
                    format!("unknown mouse button {}", other),
                )
            }
        };
        let click_count = ctx
            .param("CLICKCOUNT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        let modifiers = ctx
            .param("MODIFIERS")
            .map(|m| m.split('+').map(|s| s.trim().to_uppercase()).collect())
            .unwrap_or_default();
        let coordinate_mode = match ctx
            .param("COORDMODE")
            .map(|m| m.to_uppercase())
            .as_deref()
        {
            Some("PAGE") => CoordinateMode::Page,
            _ => CoordinateMode::Viewport,
        };

        let request = ClickRequest {
            x,
            y,
            button,
            click_count,
            modifiers,
            coordinate_mode,
        };
        let response = sender.click(&request).await;
        if response.success {
            CommandResult::ok()
        } else {
            content_error(response)
        }
    }
}

pub struct EventHandler;

#[async_trait]
impl CommandHandler for EventHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let Some(sender) = ctx.bridges.content.clone() else {
            return CommandResult::fail_with(
                ErrorCode::ScriptError,
                "no content script sender configured",
            );
        };

        let event_type = match ctx.required_param("TYPE") {
            Ok(v) => v.to_uppercase(),
            Err(result) => return result,
        };

        let request = EventRequest {
            event_type,
            selector: ctx.param("SELECTOR").or_else(|| ctx.param("XPATH")),
            key: ctx.param("KEY"),
            keys: ctx
                .param("KEYS")
                .map(|k| k.split(',').map(|s| s.trim().to_string()).collect()),
            chars: ctx.param("CHARS").or_else(|| ctx.param("CHAR")),
            point: ctx.param("POINT").as_deref().and_then(parse_point),
            points: ctx.param("POINTS").map(|list| {
                list.split(')')
                    .map(|part| part.trim_start_matches([',', ' ', '(']))
                    .filter(|part| !part.is_empty())
                    .filter_map(parse_point)
                    .collect()
            }),
            modifiers: ctx
                .param("MODIFIERS")
                .map(|m| m.split('+').map(|s| s.trim().to_uppercase()).collect())
                .unwrap_or_default(),
            bubbles: true,
            cancelable: true,
            timeout_seconds: ctx.state.tag_timeout(),
        };

        let response = sender.event(&request).await;
        if response.success {
            CommandResult::ok()
        } else {
            content_error(response)
        }
    }
}
