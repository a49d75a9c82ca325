//! TAG Handler
//!
//! Element selection plus one of: fill (CONTENT), extract (EXTRACT) or
//! click. Selector precedence is XPATH, then CSS, then POS/TYPE/ATTR.

use async_trait::async_trait;

use crate::bridge::types::{
    AttrCondition, ExtractKind, FillValue, SelectBy, TagAction, TagPosition, TagRequest,
    TagSelector,
};
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;

/// Sentinel appended to the extract list when an EXTRACT target is
/// missing, so loops keep their column alignment.
pub const EANF: &str = "#EANF#";

/// Decode the reserved escapes of parameter values.
pub fn decode_escapes(value: &str) -> String {
    value
        .replace("<SP>", " ")
        .replace("<BR>", "\n")
        .replace("<ENTER>", "\n")
        .replace("<TAB>", "\t")
}

/// Parse an `ATTR=` compound: `KEY:value` conditions joined with `&&`.
/// A bare `*` means no constraint.
fn parse_attr(value: &str) -> Result<Vec<AttrCondition>, CommandResult> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Ok(Vec::new());
    }
    let mut conditions = Vec::new();
    for part in trimmed.split("&&") {
        let Some((key, pattern)) = part.split_once(':') else {
            return Err(CommandResult::fail_with(
                ErrorCode::InvalidParameter,
                format!("malformed ATTR condition {}", part),
            ));
        };
        conditions.push(AttrCondition {
            name: key.trim().to_uppercase(),
            pattern: decode_escapes(pattern),
        });
    }
    Ok(conditions)
}

/// Parse `POS=`: an integer (negative counts from the end) or `R<k>`
/// relative to the anchor recorded by the previous TAG.
fn parse_pos(
    value: &str,
    anchor: Option<crate::bridge::types::ElementInfo>,
) -> Result<TagPosition, CommandResult> {
    let invalid = || {
        CommandResult::fail_with(
            ErrorCode::InvalidParameter,
            format!("invalid POS value {}", value),
        )
    };
    if let Some(rest) = value.strip_prefix(['R', 'r']) {
        let offset = rest.parse::<i64>().map_err(|_| invalid())?;
        if offset == 0 {
            return Err(invalid());
        }
        return Ok(TagPosition::Relative { offset, anchor });
    }
    let pos = value.parse::<i64>().map_err(|_| invalid())?;
    if pos == 0 {
        return Err(invalid());
    }
    Ok(TagPosition::Absolute(pos))
}

/// Parse a `CONTENT=` value into its action. `%` selects options by
/// value, `$` by visible text; colon-separated entries feed multi-selects.
fn parse_content(value: &str) -> TagAction {
    if value.eq_ignore_ascii_case("<SUBMIT>") {
        return TagAction::Submit;
    }
    if value.eq_ignore_ascii_case("<RESET>") {
        return TagAction::Reset;
    }
    let (by, strip): (SelectBy, char) = match value.chars().next() {
        Some('%') => (SelectBy::Value, '%'),
        Some('$') => (SelectBy::Text, '$'),
        _ => {
            return TagAction::Fill(vec![FillValue {
                by: SelectBy::Plain,
                text: decode_escapes(value),
            }])
        }
    };
    let values = value
        .split(':')
        .map(|entry| FillValue {
            by,
            text: decode_escapes(entry.trim_start_matches(strip)),
        })
        .collect();
    TagAction::Fill(values)
}

pub struct TagHandler;

#[async_trait]
impl CommandHandler for TagHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let Some(sender) = ctx.bridges.content.clone() else {
            return CommandResult::fail_with(
                ErrorCode::ScriptError,
                "no content script sender configured",
            );
        };

        // Selector, in precedence order
        let selector = if let Some(xpath) = ctx.param("XPATH") {
            TagSelector::Xpath(xpath)
        } else if let Some(css) = ctx.param("CSS") {
            TagSelector::Css(css)
        } else if let Some(tag_type) = ctx.param("TYPE") {
            let upper = tag_type.to_uppercase();
            let (tag, input_type) = match upper.split_once(':') {
                Some((tag, sub)) => (tag.to_string(), Some(sub.to_string())),
                None => (upper, None),
            };
            let pos = match parse_pos(
                &ctx.param("POS").unwrap_or_else(|| "1".to_string()),
                ctx.state.tag_anchor.clone(),
            ) {
                Ok(pos) => pos,
                Err(result) => return result,
            };
            let mut attributes = match parse_attr(&ctx.param("ATTR").unwrap_or_default()) {
                Ok(attrs) => attrs,
                Err(result) => return result,
            };
            // Recorded macros use the compound-key form: ATTR:ID=username
            for p in &ctx.command.parameters {
                if let Some(name) = p.key.strip_prefix("ATTR:") {
                    attributes.push(AttrCondition {
                        name: name.to_string(),
                        pattern: decode_escapes(&ctx.state.store.expand(&p.value).expanded),
                    });
                }
            }
            TagSelector::Position {
                pos,
                tag_type: tag,
                input_type,
                attributes,
            }
        } else {
            return CommandResult::fail_with(
                ErrorCode::MissingParameter,
                "TAG requires XPATH=, CSS= or TYPE=",
            );
        };

        // Action: extract, fill, or click
        let action = if let Some(extract) = ctx.param("EXTRACT") {
            match ExtractKind::parse(&extract) {
                Some(kind) => TagAction::Extract(kind),
                None => {
                    return CommandResult::fail_with(
                        ErrorCode::InvalidParameter,
                        format!("unknown extract type {}", extract),
                    )
                }
            }
        } else if let Some(content) = ctx.param("CONTENT") {
            parse_content(&content)
        } else {
            TagAction::Click
        };
        let is_extract = matches!(action, TagAction::Extract(_));

        let request = TagRequest {
            selector,
            action,
            timeout_seconds: ctx.state.tag_timeout(),
            wait_visible: true,
        };
        let response = sender.tag(&request).await;

        if response.success {
            ctx.state.tag_anchor = response.element_info;
            if is_extract {
                let data = response.extracted_data.unwrap_or_default();
                ctx.state.add_extract(data.clone());
                return CommandResult::with_output(data);
            }
            return CommandResult::ok();
        }

        // A missing EXTRACT target keeps the loop going: record the
        // sentinel and report success. Under !ERRORIGNORE the failure is
        // simply skipped instead, leaving the extract list untouched.
        if is_extract
            && response.error_code == Some(ErrorCode::ElementNotFound.code())
            && !ctx.state.error_ignore()
        {
            ctx.state.add_extract(EANF);
            return CommandResult::ok();
        }

        let code = match response.error_code {
            Some(c) => ErrorCode::from_code(c),
            None => ErrorCode::ElementNotFound,
        };
        let message = response
            .error
            .unwrap_or_else(|| code.default_message().to_string());
        CommandResult::fail_with(code, message)
    }
}
