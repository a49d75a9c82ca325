//! Error Catalog
//!
//! Wire-compatible numeric error codes shared by the parser, the executor
//! and every command handler. The catalog is closed: handlers must pick a
//! code from this enum, and every code carries a default human-readable
//! message the surrounding UI may localize.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Numeric result codes understood by iMacros-compatible callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok,
    UserAbort,
    UserPause,
    SyntaxError,
    InvalidCommand,
    InvalidParameter,
    MissingParameter,
    UnsupportedCommand,
    ElementNotFound,
    ElementNotVisible,
    FrameNotFound,
    Timeout,
    PageTimeout,
    TagTimeout,
    DownloadFailed,
    DownloadTimeout,
    DownloadCancelled,
    DownloadNoFolder,
    DownloadNoFile,
    DownloadAccessDenied,
    FileNotFound,
    FileAccessDenied,
    FileReadError,
    FileWriteError,
    ScriptError,
    ScriptException,
    DatasourceNotFound,
    DatasourceLineNotFound,
    DatasourceColumnNotFound,
    DatasourceReadError,
    LoopOutOfRange,
    LoopAborted,
    UnhandledDialog,
    StopwatchAlreadyRunning,
    StopwatchNotRunning,
    UnknownError,
}

impl ErrorCode {
    /// The numeric wire value.
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserAbort => -100,
            Self::UserPause => -101,
            Self::SyntaxError => -910,
            Self::InvalidCommand => -911,
            Self::InvalidParameter => -912,
            Self::MissingParameter => -913,
            Self::UnsupportedCommand => -915,
            Self::ElementNotFound => -920,
            Self::ElementNotVisible => -921,
            Self::FrameNotFound => -922,
            Self::Timeout => -930,
            Self::PageTimeout => -931,
            Self::TagTimeout => -932,
            Self::DownloadFailed => -950,
            Self::DownloadTimeout => -951,
            Self::DownloadCancelled => -952,
            Self::DownloadNoFolder => -953,
            Self::DownloadNoFile => -954,
            Self::DownloadAccessDenied => -955,
            Self::FileNotFound => -960,
            Self::FileAccessDenied => -961,
            Self::FileReadError => -962,
            Self::FileWriteError => -963,
            Self::ScriptError => -970,
            Self::ScriptException => -971,
            Self::DatasourceNotFound => -980,
            Self::DatasourceLineNotFound => -981,
            Self::DatasourceColumnNotFound => -982,
            Self::DatasourceReadError => -983,
            Self::LoopOutOfRange => -990,
            Self::LoopAborted => -991,
            Self::UnhandledDialog => -1450,
            Self::StopwatchAlreadyRunning => -1961,
            Self::StopwatchNotRunning => -1962,
            Self::UnknownError => -999,
        }
    }

    /// Default message for the code. Handlers usually attach a more
    /// specific message; the UI falls back to this one.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::UserAbort => "Macro stopped by user",
            Self::UserPause => "Macro paused by user",
            Self::SyntaxError => "Syntax error",
            Self::InvalidCommand => "Invalid command",
            Self::InvalidParameter => "Invalid parameter",
            Self::MissingParameter => "Missing required parameter",
            Self::UnsupportedCommand => "Command not supported",
            Self::ElementNotFound => "Element not found",
            Self::ElementNotVisible => "Element not visible",
            Self::FrameNotFound => "Frame not found",
            Self::Timeout => "Timeout",
            Self::PageTimeout => "Page load timeout",
            Self::TagTimeout => "Element wait timeout",
            Self::DownloadFailed => "Download failed",
            Self::DownloadTimeout => "Download timed out",
            Self::DownloadCancelled => "Download cancelled",
            Self::DownloadNoFolder => "Download folder not available",
            Self::DownloadNoFile => "Download file name not available",
            Self::DownloadAccessDenied => "Download access denied",
            Self::FileNotFound => "File not found",
            Self::FileAccessDenied => "File access denied",
            Self::FileReadError => "File read error",
            Self::FileWriteError => "File write error",
            Self::ScriptError => "Script error",
            Self::ScriptException => "Script exception",
            Self::DatasourceNotFound => "Data source not found",
            Self::DatasourceLineNotFound => "Data source line not found",
            Self::DatasourceColumnNotFound => "Data source column not found",
            Self::DatasourceReadError => "Data source read error",
            Self::LoopOutOfRange => "Loop value out of range",
            Self::LoopAborted => "Loop aborted",
            Self::UnhandledDialog => "Unhandled dialog",
            Self::StopwatchAlreadyRunning => "Stopwatch is already running",
            Self::StopwatchNotRunning => "Stopwatch is not running",
            Self::UnknownError => "Unknown error",
        }
    }

    /// Map a numeric wire value back to its code. Unknown values collapse
    /// to `UnknownError`.
    pub fn from_code(code: i32) -> Self {
        ALL_CODES
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .unwrap_or(Self::UnknownError)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.default_message(), self.code())
    }
}

// On the wire the code is the bare number.
impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Every member of the catalog, for table lookups and uniqueness checks.
pub const ALL_CODES: &[ErrorCode] = &[
    ErrorCode::Ok,
    ErrorCode::UserAbort,
    ErrorCode::UserPause,
    ErrorCode::SyntaxError,
    ErrorCode::InvalidCommand,
    ErrorCode::InvalidParameter,
    ErrorCode::MissingParameter,
    ErrorCode::UnsupportedCommand,
    ErrorCode::ElementNotFound,
    ErrorCode::ElementNotVisible,
    ErrorCode::FrameNotFound,
    ErrorCode::Timeout,
    ErrorCode::PageTimeout,
    ErrorCode::TagTimeout,
    ErrorCode::DownloadFailed,
    ErrorCode::DownloadTimeout,
    ErrorCode::DownloadCancelled,
    ErrorCode::DownloadNoFolder,
    ErrorCode::DownloadNoFile,
    ErrorCode::DownloadAccessDenied,
    ErrorCode::FileNotFound,
    ErrorCode::FileAccessDenied,
    ErrorCode::FileReadError,
    ErrorCode::FileWriteError,
    ErrorCode::ScriptError,
    ErrorCode::ScriptException,
    ErrorCode::DatasourceNotFound,
    ErrorCode::DatasourceLineNotFound,
    ErrorCode::DatasourceColumnNotFound,
    ErrorCode::DatasourceReadError,
    ErrorCode::LoopOutOfRange,
    ErrorCode::LoopAborted,
    ErrorCode::UnhandledDialog,
    ErrorCode::StopwatchAlreadyRunning,
    ErrorCode::StopwatchNotRunning,
    ErrorCode::UnknownError,
];

/// Failures surfaced by the engine facade itself (as opposed to command
/// failures, which travel inside `MacroResult`).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no macro loaded")]
    NoMacroLoaded,

    #[error("macro too large: {size} bytes (limit {limit})")]
    InputTooLarge { size: usize, limit: usize },

    #[error("executor is already running")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_pairwise_unique() {
        let mut seen = HashSet::new();
        for c in ALL_CODES {
            assert!(seen.insert(c.code()), "duplicate code {}", c.code());
        }
    }

    #[test]
    fn test_every_code_has_message() {
        for c in ALL_CODES {
            assert!(!c.default_message().is_empty());
        }
    }

    #[test]
    fn test_from_code_round_trip() {
        for c in ALL_CODES {
            assert_eq!(ErrorCode::from_code(c.code()), *c);
        }
    }

    #[test]
    fn test_from_code_unknown() {
        assert_eq!(ErrorCode::from_code(-12345), ErrorCode::UnknownError);
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(ErrorCode::Ok.code(), 0);
        assert_eq!(ErrorCode::ElementNotFound.code(), -920);
        assert_eq!(ErrorCode::PageTimeout.code(), -931);
        assert_eq!(ErrorCode::ScriptException.code(), -971);
        assert_eq!(ErrorCode::UnhandledDialog.code(), -1450);
    }

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::ElementNotFound).unwrap(),
            "-920"
        );
    }
}
