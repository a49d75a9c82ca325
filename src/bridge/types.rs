//! Bridge Payload Types
//!
//! The engine talks to its collaborators through narrow capability traits;
//! these are the message payloads and responses that cross that boundary.
//! Everything here is plain data so real transports can serialize it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Failure reported by a bridge. `code` carries the bridge's own numeric
/// error code when it has one; handlers propagate it unless they have
/// stronger local information.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct BridgeError {
    pub message: String,
    pub code: Option<i32>,
}

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

/// What navigation-style calls return: the page the browser ended up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: Option<String>,
}

/// Frame addressing for `selectFrame`. Index 0 is the main document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameTarget {
    Index(usize),
    Name(String),
}

/// A summary of a matched element, echoed back by the content script. The
/// `dom_index` is the element's document-order position and anchors
/// `POS=R<k>` relative selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    pub dom_index: usize,
    pub text: String,
    pub attributes: HashMap<String, String>,
}

/// One `KEY:value` condition of a TAG `ATTR=` parameter. `pattern` may use
/// `*` as a wildcard; escape sequences are already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrCondition {
    /// Upper-cased attribute key: TXT, ID, NAME, CLASS, HREF, SRC, ALT,
    /// TITLE, VALUE, TYPE, PLACEHOLDER, or a generic attribute name.
    pub name: String,
    pub pattern: String,
}

/// Element position inside a POS/TYPE/ATTR selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagPosition {
    /// 1-based index among matches; negative counts from the end
    /// (−1 is the last match).
    Absolute(i64),
    /// `POS=R<k>`: k-th match after (k > 0) or before (k < 0) the anchor
    /// element recorded by the previous TAG in this loop iteration.
    Relative {
        offset: i64,
        anchor: Option<ElementInfo>,
    },
}

/// The element-addressing portion of a TAG command, in precedence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagSelector {
    Xpath(String),
    Css(String),
    Position {
        pos: TagPosition,
        /// Upper-cased tag name or `*`.
        tag_type: String,
        /// Input subtype from `TYPE=INPUT:TEXT` style parameters.
        input_type: Option<String>,
        attributes: Vec<AttrCondition>,
    },
}

/// How a matched `<select>`/input value is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectBy {
    /// `%value`: match the option's VALUE attribute.
    Value,
    /// `$text`: match the option's visible text.
    Text,
    /// Unprefixed: treated as text.
    Plain,
}

/// One value of a CONTENT parameter (multi-selects take several,
/// colon-separated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillValue {
    pub by: SelectBy,
    pub text: String,
}

/// What `TAG … EXTRACT=` pulls out of the matched element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractKind {
    Txt,
    Htm,
    Href,
    Title,
    Alt,
    Value,
    Src,
    Id,
    Class,
    Name,
    TxtAll,
    Checked,
    Attr(String),
}

impl ExtractKind {
    /// Parse an EXTRACT parameter value (already upper-cased except the
    /// `ATTR:` payload).
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(name) = value.strip_prefix("ATTR:").or_else(|| value.strip_prefix("attr:")) {
            if name.is_empty() {
                return None;
            }
            return Some(Self::Attr(name.to_string()));
        }
        match value.to_uppercase().as_str() {
            "TXT" => Some(Self::Txt),
            "HTM" => Some(Self::Htm),
            "HREF" => Some(Self::Href),
            "TITLE" => Some(Self::Title),
            "ALT" => Some(Self::Alt),
            "VALUE" => Some(Self::Value),
            "SRC" => Some(Self::Src),
            "ID" => Some(Self::Id),
            "CLASS" => Some(Self::Class),
            "NAME" => Some(Self::Name),
            "TXTALL" => Some(Self::TxtAll),
            "CHECKED" => Some(Self::Checked),
            _ => None,
        }
    }
}

/// The action half of a TAG command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagAction {
    /// No CONTENT or EXTRACT: click the element.
    Click,
    /// `CONTENT=<SUBMIT>`: submit the containing form.
    Submit,
    /// `CONTENT=<RESET>`: reset the containing form.
    Reset,
    /// Set a form element's value(s).
    Fill(Vec<FillValue>),
    Extract(ExtractKind),
}

/// TAG_COMMAND payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRequest {
    pub selector: TagSelector,
    pub action: TagAction,
    /// Element wait budget in seconds.
    pub timeout_seconds: f64,
    pub wait_visible: bool,
}

/// Mouse button for CLICK_COMMAND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// How CLICK coordinates are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateMode {
    Viewport,
    Page,
}

/// CLICK_COMMAND payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRequest {
    pub x: i32,
    pub y: i32,
    pub button: MouseButton,
    pub click_count: u32,
    pub modifiers: Vec<String>,
    pub coordinate_mode: CoordinateMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// EVENT_COMMAND payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    pub event_type: String,
    pub selector: Option<String>,
    pub key: Option<String>,
    pub keys: Option<Vec<String>>,
    pub chars: Option<String>,
    pub point: Option<Point>,
    pub points: Option<Vec<Point>>,
    pub modifiers: Vec<String>,
    pub bubbles: bool,
    pub cancelable: bool,
    pub timeout_seconds: f64,
}

/// Where SEARCH looks and how the pattern is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchSource {
    /// Plain text with iMacros wildcards: `*` matches anything across
    /// lines, whitespace matches any whitespace run.
    Txt(String),
    /// A real regular expression.
    Regexp(String),
}

/// SEARCH_COMMAND payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub source: SearchSource,
    pub ignore_case: bool,
    /// `$1`-style extraction template (REGEXP only).
    pub extract_pattern: Option<String>,
}

/// What content-script calls return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub success: bool,
    pub error: Option<String>,
    pub error_code: Option<i32>,
    pub extracted_data: Option<String>,
    pub element_info: Option<ElementInfo>,
}

impl ContentResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn extracted(data: impl Into<String>) -> Self {
        Self {
            success: true,
            extracted_data: Some(data.into()),
            ..Self::default()
        }
    }

    pub fn fail(code: i32, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            error_code: Some(code),
            ..Self::default()
        }
    }
}

/// Dialog families ONDIALOG-style commands configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogKind {
    Script,
    Certificate,
    Error,
    Security,
    WebPage,
    Print,
}

/// Which button a configured dialog presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogButton {
    Ok,
    Cancel,
    Yes,
    No,
}

impl DialogButton {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "YES" => Some(Self::Yes),
            "CANCEL" => Some(Self::Cancel),
            "NO" => Some(Self::No),
            _ => None,
        }
    }
}

/// Pre-answer for an upcoming dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogConfig {
    pub kind: DialogKind,
    /// 1-based position among queued dialogs.
    pub pos: Option<u32>,
    pub button: DialogButton,
    /// Text to type into a prompt-style dialog.
    pub content: Option<String>,
}

/// Output of a CMDLINE execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdlineOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// PROXY command payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub address: String,
    pub bypass: Option<String>,
}

/// FILTER command payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilter {
    pub kind: FilterKind,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Images,
}

/// SAVEAS/SAVEITEM/SCREENSHOT payload. The engine only forwards the
/// request; storage is the bridge's business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub save_type: SaveType,
    pub folder: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveType {
    Cpl,
    Htm,
    Txt,
    Png,
    Jpeg,
    Pdf,
    Item,
    Other(String),
}

impl SaveType {
    pub fn parse(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "CPL" => Self::Cpl,
            "HTM" => Self::Htm,
            "TXT" => Self::Txt,
            "PNG" => Self::Png,
            "JPEG" | "JPG" => Self::Jpeg,
            "PDF" => Self::Pdf,
            _ => Self::Other(value.to_uppercase()),
        }
    }
}

/// ONDOWNLOAD configuration forwarded to the browser bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub folder: Option<String>,
    pub file: Option<String>,
    pub wait: bool,
}
