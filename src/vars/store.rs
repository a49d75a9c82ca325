//! Variable Store
//!
//! Named values with read-only protection for reserved names, one-pass
//! `{{NAME}}` expansion and `!NOW:<format>` rendering. Lookup is
//! case-insensitive; names are stored upper-cased.

use chrono::Local;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex_lite::Regex;
use serde::Serialize;
use std::fmt;

use crate::vars::reserved;

lazy_static! {
    static ref VARIABLE_RE: Regex = Regex::new(r"\{\{([!A-Za-z0-9_:]+)\}\}").unwrap();
}

/// A stored variable value: string, number or boolean.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl VariableValue {
    /// Infer the value type from raw macro text. Numeric literals become
    /// numbers, TRUE/FALSE become booleans, everything else stays text
    /// (including YES/NO, which config comparisons expect verbatim).
    /// A numeric literal that would not render back to the same text
    /// (leading zeros, exponents, precision-losing ids) stays text.
    pub fn infer(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<f64>() {
            let number = Self::Number(n);
            if number.to_string() == raw {
                return number;
            }
        }
        match raw.to_uppercase().as_str() {
            "TRUE" => Self::Boolean(true),
            "FALSE" => Self::Boolean(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Boolean(_) => None,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Self::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for VariableValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for VariableValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Outcome of a user-path write.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOutcome {
    pub success: bool,
    /// `Some("read-only")` when the write was rejected.
    pub reason: Option<&'static str>,
    pub previous: Option<VariableValue>,
    pub new: Option<VariableValue>,
}

/// URL slots the executor updates through the privileged path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Current,
    Start,
}

/// Result of `expand`: the substituted text plus the names that were
/// referenced, in order of occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandResult {
    pub expanded: String,
    pub variables: Vec<String>,
}

/// The per-executor variable map.
#[derive(Debug, Clone)]
pub struct VariableStore {
    values: IndexMap<String, VariableValue>,
}

impl VariableStore {
    pub fn new() -> Self {
        let mut store = Self {
            values: IndexMap::new(),
        };
        // Defaults every run starts from
        store.put("!TIMEOUT", VariableValue::Number(60.0));
        store.put("!ERRORIGNORE", "NO".into());
        store.put("!ERRORLOOP", "NO".into());
        store.put("!ENCRYPTION", "NO".into());
        store.put("!DATASOURCE_LINE", VariableValue::Number(1.0));
        store.put("!DATASOURCE_COLUMNS", VariableValue::Number(0.0));
        store.put("!VERSION", env!("CARGO_PKG_VERSION").into());
        store.put("!PLATFORM", std::env::consts::OS.into());
        store.put("!EXTRACT", "".into());
        store.put("!URLCURRENT", "".into());
        store
    }

    fn put(&mut self, name: &str, value: VariableValue) {
        self.values.insert(name.to_uppercase(), value);
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.values.get(&name.to_uppercase())
    }

    /// Lookup rendered to a string.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.to_string())
    }

    /// Numeric view of a variable, tolerating numeric strings. `None` when
    /// unset or not a number.
    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.as_number())
    }

    /// True when the variable renders to `YES` or `TRUE`.
    pub fn is_yes(&self, name: &str) -> bool {
        self.get_str(name)
            .map(|v| {
                let v = v.to_uppercase();
                v == "YES" || v == "TRUE"
            })
            .unwrap_or(false)
    }

    /// User-path write. Read-only names are rejected and keep their stored
    /// value; setting an unknown name creates a user variable.
    pub fn set(&mut self, name: &str, value: VariableValue) -> SetOutcome {
        let name = name.to_uppercase();
        let previous = self.values.get(&name).cloned();
        if reserved::is_read_only(&name) {
            return SetOutcome {
                success: false,
                reason: Some("read-only"),
                previous,
                new: None,
            };
        }
        self.values.insert(name, value.clone());
        SetOutcome {
            success: true,
            reason: None,
            previous,
            new: Some(value),
        }
    }

    /// Synonym for the user path, used by handlers.
    pub fn set_variable(&mut self, name: &str, value: VariableValue) -> SetOutcome {
        self.set(name, value)
    }

    /// Privileged write used when the executor itself updates system-set
    /// names. Bypasses the read-only check.
    pub fn set_system(&mut self, name: &str, value: VariableValue) {
        self.put(name, value);
    }

    /// Privileged URL update path.
    pub fn set_url(&mut self, kind: UrlKind, url: &str) {
        let name = match kind {
            UrlKind::Current => "!URLCURRENT",
            UrlKind::Start => "!URLSTART",
        };
        self.put(name, url.into());
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        reserved::is_read_only(&name.to_uppercase())
    }

    /// Replace every `{{NAME}}` with the current value in a single pass.
    /// Undefined names expand to the empty string. `{{!NOW:<format>}}`
    /// renders the current local time with the tokens yyyy, mm, dd, hh,
    /// nn, ss.
    pub fn expand(&self, text: &str) -> ExpandResult {
        let mut expanded = String::with_capacity(text.len());
        let mut variables = Vec::new();
        let mut last = 0;

        for caps in VARIABLE_RE.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str().to_uppercase();
            expanded.push_str(&text[last..whole.start()]);
            if let Some(format) = name.strip_prefix("!NOW:") {
                expanded.push_str(&render_now(format));
            } else {
                expanded.push_str(&self.get_str(&name).unwrap_or_default());
            }
            variables.push(name);
            last = whole.end();
        }
        expanded.push_str(&text[last..]);

        ExpandResult {
            expanded,
            variables,
        }
    }

    /// Insertion-ordered snapshot of every variable, rendered to strings.
    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a `!NOW` format string. Tokens (case-insensitive): yyyy, mm,
/// dd, hh, nn, ss. Unrecognized characters pass through untouched.
fn render_now(format: &str) -> String {
    let now = Local::now();
    render_time_format(format, &now)
}

fn render_time_format(format: &str, at: &chrono::DateTime<Local>) -> String {
    use chrono::{Datelike, Timelike};

    let chars: Vec<char> = format.chars().collect();
    let lower: Vec<char> = chars.iter().map(|c| c.to_ascii_lowercase()).collect();
    let matches_at = |i: usize, token: &str| {
        token
            .chars()
            .enumerate()
            .all(|(k, c)| lower.get(i + k) == Some(&c))
    };

    let mut out = String::with_capacity(format.len());
    let mut i = 0;
    while i < chars.len() {
        if matches_at(i, "yyyy") {
            out.push_str(&format!("{:04}", at.year()));
            i += 4;
        } else if matches_at(i, "mm") {
            out.push_str(&format!("{:02}", at.month()));
            i += 2;
        } else if matches_at(i, "dd") {
            out.push_str(&format!("{:02}", at.day()));
            i += 2;
        } else if matches_at(i, "hh") {
            out.push_str(&format!("{:02}", at.hour()));
            i += 2;
        } else if matches_at(i, "nn") {
            out.push_str(&format!("{:02}", at.minute()));
            i += 2;
        } else if matches_at(i, "ss") {
            out.push_str(&format!("{:02}", at.second()));
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
