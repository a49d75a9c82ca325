//! Executor Result Types

use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::ErrorCode;
use crate::state::profiler::ProfilerRecord;

/// What a command handler returns. `error_code` is `Ok` exactly when
/// `success` is true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub error_code: ErrorCode,
    pub error_message: Option<String>,
    /// Command-specific payload, e.g. the URL returned by `URL CURRENT`.
    pub output: Option<String>,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_code: ErrorCode::Ok,
            error_message: None,
            output: None,
        }
    }

    pub fn with_output(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::ok()
        }
    }

    /// Failure with the catalog's default message.
    pub fn fail(code: ErrorCode) -> Self {
        Self {
            success: false,
            error_code: code,
            error_message: Some(code.default_message().to_string()),
            output: None,
        }
    }

    /// Failure with a command-specific message.
    pub fn fail_with(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: code,
            error_message: Some(message.into()),
            output: None,
        }
    }
}

/// The aggregate outcome of one `execute()` run.
#[derive(Debug, Clone, Serialize)]
pub struct MacroResult {
    pub success: bool,
    pub error_code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// 1-based macro line of the failing command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_line: Option<usize>,
    pub loops_completed: u32,
    pub execution_time_ms: u64,
    pub extract_data: Vec<String>,
    /// Snapshot of every variable at run end.
    pub variables: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiler_records: Option<Vec<ProfilerRecord>>,
}
