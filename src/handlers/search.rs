//! SEARCH and EXTRACT Handlers
//!
//! SEARCH runs a plain-text (wildcard) or regex pattern against the page,
//! preferring the content-script sender and falling back to the value of
//! `!URLCURRENT`. The standalone EXTRACT command appends a literal to the
//! extract list.

use async_trait::async_trait;
use regex_lite::Regex;

use crate::bridge::types::{ContentResponse, SearchRequest, SearchSource};
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::handlers::tag::decode_escapes;

pub struct SearchHandler;

#[async_trait]
impl CommandHandler for SearchHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let source = match ctx.required_param("SOURCE") {
            Ok(source) => source,
            Err(result) => return result,
        };

        let search_source = if let Some(pattern) = strip_prefix_ci(&source, "TXT:") {
            SearchSource::Txt(decode_escapes(pattern))
        } else if let Some(pattern) = strip_prefix_ci(&source, "REGEXP:") {
            SearchSource::Regexp(decode_escapes(pattern))
        } else {
            return CommandResult::fail_with(
                ErrorCode::InvalidParameter,
                format!("SEARCH SOURCE must be TXT:<pattern> or REGEXP:<pattern>, got {}", source),
            );
        };

        let extract_pattern = ctx.param("EXTRACT");
        if extract_pattern.is_some() && !matches!(search_source, SearchSource::Regexp(_)) {
            return CommandResult::fail_with(
                ErrorCode::InvalidParameter,
                "SEARCH EXTRACT requires SOURCE=REGEXP:",
            );
        }

        let request = SearchRequest {
            source: search_source,
            ignore_case: ctx
                .param("IGNORE_CASE")
                .map(|v| v.eq_ignore_ascii_case("YES"))
                .unwrap_or(false),
            extract_pattern,
        };

        let response = match ctx.bridges.content.clone() {
            Some(sender) => {
                let response = sender.search(&request).await;
                if response.success {
                    response
                } else {
                    match response.error_code {
                        // Not-found and bad-pattern answers are final;
                        // other failures fall back to the local search.
                        Some(-920) | Some(-910) => response,
                        _ => local_search(
                            &ctx.state.store.get_str("!URLCURRENT").unwrap_or_default(),
                            &request,
                        ),
                    }
                }
            }
            None => local_search(
                &ctx.state.store.get_str("!URLCURRENT").unwrap_or_default(),
                &request,
            ),
        };

        if response.success {
            if let Some(data) = response.extracted_data {
                ctx.state.add_extract(data.clone());
                return CommandResult::with_output(data);
            }
            return CommandResult::ok();
        }
        match response.error_code {
            Some(-910) => CommandResult::fail_with(
                ErrorCode::SyntaxError,
                response.error.unwrap_or_else(|| "invalid pattern".to_string()),
            ),
            _ => CommandResult::fail_with(ErrorCode::ElementNotFound, "pattern not found"),
        }
    }
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    match text.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&text[prefix.len()..]),
        _ => None,
    }
}

/// Engine-side search used when no content-script sender can answer.
fn local_search(text: &str, request: &SearchRequest) -> ContentResponse {
    let (pattern, is_regexp) = match &request.source {
        SearchSource::Txt(p) => (txt_pattern_to_regex(p), false),
        SearchSource::Regexp(p) => (p.clone(), true),
    };
    let full = if request.ignore_case {
        format!("(?i){}", pattern)
    } else {
        pattern
    };
    let re = match Regex::new(&full) {
        Ok(re) => re,
        Err(e) => return ContentResponse::fail(-910, format!("invalid pattern: {}", e)),
    };
    let Some(caps) = re.captures(text) else {
        return ContentResponse::fail(-920, "pattern not found");
    };
    if is_regexp {
        if let Some(template) = &request.extract_pattern {
            return ContentResponse::extracted(apply_template(template, &caps));
        }
    }
    ContentResponse::ok()
}

/// Replace `$1`, `$2`, … in the template with capture groups.
fn apply_template(template: &str, caps: &regex_lite::Captures<'_>) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                chars.next();
                out.push_str(caps.get(d as usize).map(|m| m.as_str()).unwrap_or(""));
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// `*` matches anything across lines; whitespace matches any whitespace
/// run; everything else is literal.
fn txt_pattern_to_regex(pattern: &str) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            out.push_str("(?s).*");
        } else if c.is_whitespace() {
            while chars.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
                chars.next();
            }
            out.push_str(r"\s+");
        } else {
            out.push_str(&regex_lite::escape(&c.to_string()));
        }
    }
    out
}

/// Standalone EXTRACT: expand the literal and append it.
pub struct ExtractHandler;

#[async_trait]
impl CommandHandler for ExtractHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let raw = ctx.command.raw.as_str();
        let rest = raw
            .find(char::is_whitespace)
            .map(|i| raw[i..].trim())
            .unwrap_or("");
        let literal = ctx.expand(&crate::parser::unquote(rest));
        ctx.state.add_extract(literal.clone());
        CommandResult::with_output(literal)
    }
}
