//! Parser Types
//!
//! Shared types for the macro parser: the closed command enumeration,
//! parsed command/parameter records and parse diagnostics.

use crate::errors::ErrorCode;
use serde::Serialize;
use std::fmt;

// Parse limits to prevent hangs on pathological input
pub const MAX_INPUT_SIZE: usize = 1_000_000; // 1MB max macro text

/// Every command keyword the engine knows. Unrecognized keywords parse to
/// `Unknown` and dispatch to the default no-op handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandKind {
    Url,
    Tab,
    Frame,
    Tag,
    Click,
    Event,
    Events,
    Search,
    Extract,
    Set,
    Add,
    Wait,
    Pause,
    Prompt,
    OnDialog,
    OnLogin,
    OnCertificateDialog,
    OnDownload,
    OnErrorDialog,
    OnPrint,
    OnSecurityDialog,
    OnWebPageDialog,
    Stopwatch,
    Version,
    Back,
    Refresh,
    Clear,
    Filter,
    Proxy,
    SaveAs,
    SaveItem,
    Screenshot,
    Print,
    Cmdline,
    Disconnect,
    Redial,
    ImageClick,
    ImageSearch,
    Size,
    FileDelete,
    Ds,
    Tray,
    WinClick,
    Unknown,
}

impl CommandKind {
    /// Match an upper-cased keyword to its command kind.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "URL" => Self::Url,
            "TAB" => Self::Tab,
            "FRAME" => Self::Frame,
            "TAG" => Self::Tag,
            "CLICK" => Self::Click,
            "EVENT" => Self::Event,
            "EVENTS" => Self::Events,
            "SEARCH" => Self::Search,
            "EXTRACT" => Self::Extract,
            "SET" => Self::Set,
            "ADD" => Self::Add,
            "WAIT" => Self::Wait,
            "PAUSE" => Self::Pause,
            "PROMPT" => Self::Prompt,
            "ONDIALOG" => Self::OnDialog,
            "ONLOGIN" => Self::OnLogin,
            "ONCERTIFICATEDIALOG" => Self::OnCertificateDialog,
            "ONDOWNLOAD" => Self::OnDownload,
            "ONERRORDIALOG" => Self::OnErrorDialog,
            "ONPRINT" => Self::OnPrint,
            "ONSECURITYDIALOG" => Self::OnSecurityDialog,
            "ONWEBPAGEDIALOG" => Self::OnWebPageDialog,
            "STOPWATCH" => Self::Stopwatch,
            "VERSION" => Self::Version,
            "BACK" => Self::Back,
            "REFRESH" => Self::Refresh,
            "CLEAR" => Self::Clear,
            "FILTER" => Self::Filter,
            "PROXY" => Self::Proxy,
            "SAVEAS" => Self::SaveAs,
            "SAVEITEM" => Self::SaveItem,
            "SCREENSHOT" => Self::Screenshot,
            "PRINT" => Self::Print,
            "CMDLINE" => Self::Cmdline,
            "DISCONNECT" => Self::Disconnect,
            "REDIAL" => Self::Redial,
            "IMAGECLICK" => Self::ImageClick,
            "IMAGESEARCH" => Self::ImageSearch,
            "SIZE" => Self::Size,
            "FILEDELETE" => Self::FileDelete,
            "DS" => Self::Ds,
            "TRAY" => Self::Tray,
            "WINCLICK" => Self::WinClick,
            _ => Self::Unknown,
        }
    }
}

/// A `{{NAME}}` occurrence with its source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableReference {
    /// Upper-cased variable name (lookup is case-insensitive).
    pub name: String,
    /// 1-based source line.
    pub line: usize,
    /// 1-based column of the opening brace.
    pub column: usize,
}

/// One `KEY=VALUE` or positional token of a command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Upper-cased key. Positional tokens carry their literal text here.
    pub key: String,
    /// Value after `=`, unquoted. Empty for positional tokens.
    pub value: String,
    /// Original token text as written, for error messages.
    pub raw_value: String,
    /// `{{NAME}}` references inside the value.
    pub variables: Vec<VariableReference>,
}

/// Position of the `=` separating a plausible KEY from the value. A token
/// that opens with a quote, or whose prefix before `=` is not a key shape
/// (`EVAL("1+2=3")` for instance), is positional.
pub(crate) fn key_value_split(token: &str) -> Option<usize> {
    if token.starts_with('"') {
        return None;
    }
    let eq = token.find('=')?;
    let key = &token[..eq];
    if !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '!' | '_' | ':' | '-' | '.'))
    {
        Some(eq)
    } else {
        None
    }
}

impl Parameter {
    /// True for a positional token (no `KEY=` prefix).
    pub fn is_positional(&self) -> bool {
        key_value_split(&self.raw_value).is_none()
    }

    /// The token text with surrounding quotes removed and `\"` unescaped.
    /// For positional parameters this is the text the handler consumes;
    /// for `KEY=VALUE` parameters it equals `value`.
    pub fn literal(&self) -> String {
        if self.is_positional() {
            unquote(&self.raw_value)
        } else {
            self.value.clone()
        }
    }
}

/// Strip one pair of surrounding double quotes and unescape `\"`.
pub fn unquote(text: &str) -> String {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text[1..text.len() - 1].replace("\\\"", "\"")
    } else {
        text.to_string()
    }
}

/// A single parsed macro line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCommand {
    pub kind: CommandKind,
    /// Upper-cased keyword as written (meaningful for `Unknown`).
    pub keyword: String,
    pub parameters: Vec<Parameter>,
    /// The original source line.
    pub raw: String,
    /// 1-based line number in the macro text.
    pub line_number: usize,
    /// Every `{{NAME}}` reference on this line, in order.
    pub variables: Vec<VariableReference>,
}

impl ParsedCommand {
    /// Case-insensitive parameter lookup by key.
    pub fn param(&self, key: &str) -> Option<&Parameter> {
        let key = key.to_uppercase();
        self.parameters.iter().find(|p| p.key == key)
    }

    /// True when a bare positional flag like `CURRENT` or `OPEN` is present.
    pub fn has_flag(&self, name: &str) -> bool {
        let name = name.to_uppercase();
        self.parameters
            .iter()
            .any(|p| p.is_positional() && p.key == name)
    }

    /// Render the command back to a canonical macro line. Re-parsing the
    /// rendered line yields an equal command.
    pub fn to_line(&self) -> String {
        let mut out = self.keyword.clone();
        for p in &self.parameters {
            out.push(' ');
            if p.is_positional() {
                if p.raw_value.starts_with('"') {
                    out.push_str(&quote_value(&p.literal()));
                } else {
                    out.push_str(&p.key);
                }
            } else {
                out.push_str(&p.key);
                out.push('=');
                out.push_str(&quote_value(&p.value));
            }
        }
        out
    }
}

/// Quote a parameter value when it needs it (embedded whitespace or quotes).
pub fn quote_value(value: &str) -> String {
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"') {
        let escaped = value.replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

/// A non-fatal problem found while parsing or validating a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// The parse result: commands in source order plus everything the executor
/// and tooling need to know about the macro as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedMacro {
    pub commands: Vec<ParsedCommand>,
    /// Value of the first `VERSION BUILD=…` line, when present.
    pub version: Option<String>,
    /// Every `{{NAME}}` reference in the macro, in source order.
    pub variables: Vec<VariableReference>,
    /// Non-fatal diagnostics. Parsing keeps going past these.
    pub errors: Vec<ParseDiagnostic>,
}
