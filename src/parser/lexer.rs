//! Macro Line Lexer
//!
//! Splits macro text into logical lines and command lines into raw tokens.
//! Tokens are whitespace-separated; a double-quoted region suppresses the
//! whitespace delimiter and `\"` escapes an embedded quote. The lexer keeps
//! the raw token text (quotes included) so the parser can report parameters
//! exactly as written.

/// A physical source line that survived comment/blank filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Trimmed line text.
    pub text: String,
    /// 1-based line number in the original input.
    pub number: usize,
}

/// A raw token of a command line, before key/value splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    /// Token text as written, quotes and escapes preserved.
    pub text: String,
    /// 1-based column of the token's first character.
    pub column: usize,
}

/// Strip a single leading UTF-8 byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Split macro text into non-blank, non-comment lines, preserving the
/// 1-based line numbers of the original input. Lines are separated by LF
/// or CRLF; a line whose first non-whitespace character is `'` is a
/// comment.
pub fn scan_lines(text: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    for (idx, raw) in strip_bom(text).split('\n').enumerate() {
        let trimmed = raw.trim_end_matches('\r').trim();
        if trimmed.is_empty() || trimmed.starts_with('\'') {
            continue;
        }
        lines.push(SourceLine {
            text: trimmed.to_string(),
            number: idx + 1,
        });
    }
    lines
}

/// Split a command line's parameter region into raw tokens. `offset` is the
/// 0-based character position of `region` within the full line, used to
/// report 1-based token columns.
pub fn scan_tokens(region: &str, offset: usize) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = region.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let start = i;
        let mut in_quotes = false;
        let mut text = String::new();
        while i < chars.len() {
            let c = chars[i];
            if c == '\\' && in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                text.push('\\');
                text.push('"');
                i += 2;
                continue;
            }
            if c == '"' {
                in_quotes = !in_quotes;
                text.push(c);
                i += 1;
                continue;
            }
            if c.is_whitespace() && !in_quotes {
                break;
            }
            text.push(c);
            i += 1;
        }

        tokens.push(RawToken {
            text,
            column: offset + start + 1,
        });
    }

    tokens
}
