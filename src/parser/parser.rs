//! Macro Parser
//!
//! Turns macro text into a `ParsedMacro`: one `ParsedCommand` per
//! non-blank, non-comment line, with typed parameters, recorded
//! `{{NAME}}` references and non-fatal validation diagnostics.

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::errors::ErrorCode;
use crate::parser::lexer::{scan_lines, scan_tokens};
use crate::parser::types::{
    key_value_split, unquote, CommandKind, Parameter, ParseDiagnostic, ParsedCommand, ParsedMacro,
    VariableReference, MAX_INPUT_SIZE,
};

lazy_static! {
    static ref VARIABLE_RE: Regex = Regex::new(r"\{\{([!A-Za-z0-9_:]+)\}\}").unwrap();
}

/// Extract types accepted by `TAG … EXTRACT=`. `ATTR:<name>` forms are
/// accepted separately.
pub const EXTRACT_TYPES: &[&str] = &[
    "TXT", "HTM", "HREF", "TITLE", "ALT", "VALUE", "SRC", "ID", "CLASS", "NAME", "TXTALL",
    "CHECKED",
];

/// Parse a full macro. Parsing never fails hard on a bad line: problems are
/// recorded as diagnostics and the line still yields a command where
/// possible, so a macro keeps its line numbering intact.
pub fn parse_macro(text: &str) -> ParsedMacro {
    let mut parsed = ParsedMacro::default();

    if text.len() > MAX_INPUT_SIZE {
        parsed.errors.push(ParseDiagnostic {
            line: 0,
            code: ErrorCode::SyntaxError,
            message: format!(
                "macro too large: {} bytes (limit {})",
                text.len(),
                MAX_INPUT_SIZE
            ),
        });
        return parsed;
    }

    for line in scan_lines(text) {
        let command = parse_line(&line.text, line.number);

        if command.kind == CommandKind::Version {
            if parsed.version.is_none() {
                if let Some(build) = command.param("BUILD") {
                    parsed.version = Some(build.value.clone());
                }
            }
        }

        if let Some(diag) = validate_command(&command) {
            parsed.errors.push(diag);
        }

        parsed.variables.extend(command.variables.iter().cloned());
        parsed.commands.push(command);
    }

    parsed
}

/// Parse a single trimmed command line.
pub fn parse_line(line: &str, line_number: usize) -> ParsedCommand {
    let keyword_end = line
        .find(|c: char| c.is_whitespace())
        .unwrap_or(line.len());
    let keyword = line[..keyword_end].to_uppercase();
    let kind = CommandKind::from_keyword(&keyword);

    let mut parameters = Vec::new();
    if keyword_end < line.len() {
        for token in scan_tokens(&line[keyword_end..], keyword_end) {
            parameters.push(build_parameter(&token.text, line_number, token.column));
        }
    }

    let variables = scan_variables(line, line_number, 0);

    ParsedCommand {
        kind,
        keyword,
        parameters,
        raw: line.to_string(),
        line_number,
        variables,
    }
}

/// Split a raw token into a `Parameter`. A `KEY=VALUE` token splits at the
/// first `=`; an `ATTR:KEY=VAL` compound keeps `ATTR:KEY` as the key. A
/// token with no `=` (or one that opens with a quote) is positional and
/// carries its literal text in `key`.
fn build_parameter(token: &str, line: usize, column: usize) -> Parameter {
    match key_value_split(token) {
        Some(eq) => {
            let key = token[..eq].to_uppercase();
            let raw_after = &token[eq + 1..];
            let value = unquote(raw_after);
            let variables = scan_variables(token, line, column - 1);
            Parameter {
                key,
                value,
                raw_value: token.to_string(),
                variables,
            }
        }
        None => {
            let literal = unquote(token);
            Parameter {
                key: literal.to_uppercase(),
                value: String::new(),
                raw_value: token.to_string(),
                variables: scan_variables(token, line, column - 1),
            }
        }
    }
}

/// Record every `{{NAME}}` occurrence in `text`. `offset` is the 0-based
/// position of `text` within its source line.
fn scan_variables(text: &str, line: usize, offset: usize) -> Vec<VariableReference> {
    VARIABLE_RE
        .captures_iter(text)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            VariableReference {
                name: caps.get(1).unwrap().as_str().to_uppercase(),
                line,
                column: offset + whole.start() + 1,
            }
        })
        .collect()
}

/// Command-specific validation. Returns a non-fatal diagnostic; execution
/// may still dispatch the command (unknown kinds run the default no-op).
fn validate_command(cmd: &ParsedCommand) -> Option<ParseDiagnostic> {
    let diag = |code: ErrorCode, message: String| {
        Some(ParseDiagnostic {
            line: cmd.line_number,
            code,
            message,
        })
    };

    match cmd.kind {
        CommandKind::Unknown => diag(
            ErrorCode::InvalidCommand,
            format!("unknown command {}", cmd.keyword),
        ),
        CommandKind::Url => {
            if cmd.param("GOTO").is_none() && !cmd.has_flag("CURRENT") {
                diag(
                    ErrorCode::MissingParameter,
                    "URL requires GOTO=<url> or CURRENT".to_string(),
                )
            } else {
                None
            }
        }
        CommandKind::Tab => {
            let mut selected = 0;
            if cmd.param("T").is_some() {
                selected += 1;
            }
            for flag in ["OPEN", "NEW", "CLOSE", "CLOSEALLOTHERS"] {
                if cmd.has_flag(flag) || cmd.param(flag).is_some() {
                    selected += 1;
                }
            }
            match selected {
                0 => diag(
                    ErrorCode::MissingParameter,
                    "TAB requires one of T, OPEN, NEW, CLOSE, CLOSEALLOTHERS".to_string(),
                ),
                1 => None,
                _ => diag(
                    ErrorCode::InvalidParameter,
                    "TAB accepts exactly one of T, OPEN, NEW, CLOSE, CLOSEALLOTHERS".to_string(),
                ),
            }
        }
        CommandKind::Frame => {
            if let Some(f) = cmd.param("F") {
                if !f.value.contains("{{") && f.value.parse::<i64>().map_or(true, |n| n < 0) {
                    diag(
                        ErrorCode::InvalidParameter,
                        format!("FRAME F must be a non-negative integer, got {}", f.raw_value),
                    )
                } else {
                    None
                }
            } else if cmd.param("NAME").is_some() {
                None
            } else {
                diag(
                    ErrorCode::MissingParameter,
                    "FRAME requires F=<n> or NAME=<name>".to_string(),
                )
            }
        }
        CommandKind::Tag => {
            if cmd.param("XPATH").is_none()
                && cmd.param("CSS").is_none()
                && cmd.param("TYPE").is_none()
            {
                return diag(
                    ErrorCode::MissingParameter,
                    "TAG requires XPATH=, CSS= or TYPE=".to_string(),
                );
            }
            if let Some(extract) = cmd.param("EXTRACT") {
                let value = extract.value.to_uppercase();
                if !value.contains("{{")
                    && !value.starts_with("ATTR:")
                    && !EXTRACT_TYPES.contains(&value.as_str())
                {
                    return diag(
                        ErrorCode::InvalidParameter,
                        format!("unknown extract type {}", extract.raw_value),
                    );
                }
            }
            None
        }
        CommandKind::Set | CommandKind::Add => {
            let positionals = cmd.parameters.iter().filter(|p| p.is_positional()).count();
            let has_assignment = cmd.parameters.iter().any(|p| !p.is_positional());
            if positionals >= 2 || has_assignment {
                None
            } else {
                diag(
                    ErrorCode::MissingParameter,
                    format!("{} requires a variable name and a value", cmd.keyword),
                )
            }
        }
        CommandKind::Wait => match cmd.param("SECONDS") {
            None => diag(
                ErrorCode::MissingParameter,
                "WAIT requires SECONDS=<n>".to_string(),
            ),
            Some(p) if !p.value.contains("{{") && p.value.parse::<f64>().is_err() => diag(
                ErrorCode::InvalidParameter,
                format!("WAIT SECONDS must be numeric, got {}", p.raw_value),
            ),
            Some(_) => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_count_matches_effective_lines() {
        let text = "' comment\nURL GOTO=https://example.com\n\nTAB T=2\n' another\nWAIT SECONDS=1";
        let parsed = parse_macro(text);
        assert_eq!(parsed.commands.len(), 3);
    }

    #[test]
    fn test_line_numbers_are_source_positions() {
        let text = "' comment\nURL GOTO=https://example.com\n\nTAB T=2";
        let parsed = parse_macro(text);
        assert_eq!(parsed.commands[0].line_number, 2);
        assert_eq!(parsed.commands[1].line_number, 4);
    }

    #[test]
    fn test_bom_stripped() {
        let plain = parse_macro("URL GOTO=https://example.com");
        let bommed = parse_macro("\u{feff}URL GOTO=https://example.com");
        assert_eq!(plain.commands, bommed.commands);
    }

    #[test]
    fn test_keyword_uppercased() {
        let parsed = parse_macro("url goto=https://example.com");
        assert_eq!(parsed.commands[0].kind, CommandKind::Url);
        assert_eq!(parsed.commands[0].keyword, "URL");
        assert_eq!(parsed.commands[0].param("GOTO").unwrap().value, "https://example.com");
    }

    #[test]
    fn test_param_case_insensitive_lookup() {
        let parsed = parse_macro("TAG pos=1 Type=H1");
        let cmd = &parsed.commands[0];
        assert_eq!(cmd.param("POS").unwrap().value, "1");
        assert_eq!(cmd.param("type").unwrap().value, "H1");
    }

    #[test]
    fn test_quoted_value_with_spaces() {
        let parsed = parse_macro("TAG POS=1 TYPE=INPUT:TEXT CONTENT=\"John Doe\"");
        let cmd = &parsed.commands[0];
        assert_eq!(cmd.param("CONTENT").unwrap().value, "John Doe");
        assert_eq!(cmd.param("CONTENT").unwrap().raw_value, "CONTENT=\"John Doe\"");
    }

    #[test]
    fn test_escaped_quote_in_value() {
        let parsed = parse_macro("TAG POS=1 TYPE=A CONTENT=\"say \\\"hi\\\"\"");
        assert_eq!(
            parsed.commands[0].param("CONTENT").unwrap().value,
            "say \"hi\""
        );
    }

    #[test]
    fn test_attr_compound_key_preserved() {
        let parsed = parse_macro("TAG POS=1 TYPE=INPUT:TEXT ATTR:ID=username");
        let cmd = &parsed.commands[0];
        assert_eq!(cmd.param("ATTR:ID").unwrap().value, "username");
    }

    #[test]
    fn test_variables_not_substituted_at_parse_time() {
        let parsed = parse_macro("URL GOTO={{!VAR1}}");
        let cmd = &parsed.commands[0];
        assert_eq!(cmd.param("GOTO").unwrap().value, "{{!VAR1}}");
        assert_eq!(cmd.variables.len(), 1);
        assert_eq!(cmd.variables[0].name, "!VAR1");
    }

    #[test]
    fn test_variable_reference_positions() {
        let parsed = parse_macro("TAG POS={{!LOOP}} TYPE=SPAN ATTR=CLASS:{{NAME}}");
        let cmd = &parsed.commands[0];
        assert_eq!(cmd.variables.len(), 2);
        assert_eq!(cmd.variables[0].name, "!LOOP");
        assert_eq!(cmd.variables[0].line, 1);
        assert_eq!(cmd.variables[0].column, 9);
        assert_eq!(cmd.variables[1].name, "NAME");
    }

    #[test]
    fn test_same_variable_recorded_per_occurrence() {
        let parsed = parse_macro("SET !VAR1 {{X}}\nURL GOTO={{X}}");
        assert_eq!(parsed.variables.len(), 2);
    }

    #[test]
    fn test_version_recorded() {
        let parsed = parse_macro("VERSION BUILD=8970419\nURL GOTO=https://example.com");
        assert_eq!(parsed.version.as_deref(), Some("8970419"));
    }

    #[test]
    fn test_unknown_command_parses_with_diagnostic() {
        let parsed = parse_macro("FLY TO=moon");
        assert_eq!(parsed.commands[0].kind, CommandKind::Unknown);
        assert_eq!(parsed.commands[0].keyword, "FLY");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].code, ErrorCode::InvalidCommand);
    }

    #[test]
    fn test_url_without_goto_or_current_diagnosed() {
        let parsed = parse_macro("URL");
        assert_eq!(parsed.errors[0].code, ErrorCode::MissingParameter);
    }

    #[test]
    fn test_url_current_flag_ok() {
        let parsed = parse_macro("URL CURRENT");
        assert!(parsed.errors.is_empty());
        assert!(parsed.commands[0].has_flag("CURRENT"));
    }

    #[test]
    fn test_tab_exactly_one_selector() {
        assert!(parse_macro("TAB T=1").errors.is_empty());
        assert!(parse_macro("TAB OPEN").errors.is_empty());
        assert_eq!(
            parse_macro("TAB").errors[0].code,
            ErrorCode::MissingParameter
        );
        assert_eq!(
            parse_macro("TAB T=1 CLOSE").errors[0].code,
            ErrorCode::InvalidParameter
        );
    }

    #[test]
    fn test_frame_negative_index_diagnosed() {
        let parsed = parse_macro("FRAME F=-1");
        assert_eq!(parsed.errors[0].code, ErrorCode::InvalidParameter);
    }

    #[test]
    fn test_frame_name_ok() {
        assert!(parse_macro("FRAME NAME=main").errors.is_empty());
    }

    #[test]
    fn test_tag_requires_selector() {
        let parsed = parse_macro("TAG CONTENT=x");
        assert_eq!(parsed.errors[0].code, ErrorCode::MissingParameter);
    }

    #[test]
    fn test_tag_unknown_extract_type_diagnosed() {
        let parsed = parse_macro("TAG POS=1 TYPE=H1 EXTRACT=BOGUS");
        assert_eq!(parsed.errors[0].code, ErrorCode::InvalidParameter);
    }

    #[test]
    fn test_tag_attr_extract_type_accepted() {
        assert!(parse_macro("TAG POS=1 TYPE=H1 EXTRACT=ATTR:data-id")
            .errors
            .is_empty());
    }

    #[test]
    fn test_set_requires_name_and_value() {
        assert!(parse_macro("SET !VAR1 hello").errors.is_empty());
        assert_eq!(
            parse_macro("SET !VAR1").errors[0].code,
            ErrorCode::MissingParameter
        );
    }

    #[test]
    fn test_wait_requires_numeric_seconds() {
        assert!(parse_macro("WAIT SECONDS=2").errors.is_empty());
        assert!(parse_macro("WAIT SECONDS={{!VAR1}}").errors.is_empty());
        assert_eq!(
            parse_macro("WAIT").errors[0].code,
            ErrorCode::MissingParameter
        );
        assert_eq!(
            parse_macro("WAIT SECONDS=soon").errors[0].code,
            ErrorCode::InvalidParameter
        );
    }

    #[test]
    fn test_render_parse_render_is_stable() {
        let sources = [
            "URL GOTO=https://example.com/page2",
            "TAG POS=1 TYPE=INPUT:TEXT ATTR:ID=username CONTENT=\"John Doe\"",
            "TAB T=2",
            "SET !VAR1 hello",
            "SEARCH SOURCE=REGEXP:<h1>(.*?)</h1> EXTRACT=$1",
        ];
        for source in sources {
            let first = parse_macro(source).commands.remove(0);
            let rendered = first.to_line();
            let second = parse_macro(&rendered).commands.remove(0);
            assert_eq!(second.to_line(), rendered, "unstable render for {source}");
            assert_eq!(second.kind, first.kind);
            assert_eq!(second.parameters.len(), first.parameters.len());
        }
    }

    #[test]
    fn test_input_size_cap() {
        let big = "X".repeat(MAX_INPUT_SIZE + 1);
        let parsed = parse_macro(&big);
        assert!(parsed.commands.is_empty());
        assert_eq!(parsed.errors[0].code, ErrorCode::SyntaxError);
    }
}
