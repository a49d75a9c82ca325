//! Reserved Variable Catalog
//!
//! Names beginning with `!` have engine-controlled semantics. The catalog
//! is closed and known at construction: read-only names reject user `SET`,
//! config names are user-writable, everything else a `SET` touches becomes
//! an ordinary user variable.

use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// System-set names. Writable only through the privileged store path.
    static ref READ_ONLY: HashSet<&'static str> = [
        "!URLCURRENT",
        "!DOCUMENT_TITLE",
        "!LOOP",
        "!VERSION",
        "!PLATFORM",
        "!EXTRACT",
        "!CMDLINE_EXITCODE",
        "!CMDLINE_STDOUT",
        "!CMDLINE_STDERR",
        "!LOGIN_USER",
        "!LOGIN_PASSWORD",
    ]
    .into_iter()
    .collect();

    /// User-writable configuration names.
    static ref CONFIG: HashSet<&'static str> = [
        "!TIMEOUT",
        "!TIMEOUT_PAGE",
        "!TIMEOUT_TAG",
        "!TIMEOUT_STEP",
        "!ERRORIGNORE",
        "!ERRORLOOP",
        "!ENCRYPTION",
        "!DATASOURCE",
        "!DATASOURCE_LINE",
        "!DATASOURCE_COLUMNS",
        "!FILE_PROFILER",
        "!FOLDER_DATASOURCE",
        "!DIALOG_POS",
        "!DIALOG_BUTTON",
        "!DIALOG_CONTENT",
        "!CERTIFICATE_BUTTON",
        "!SECURITY_BUTTON",
        "!WEBPAGE_BUTTON",
        "!ERRORDIALOG_BUTTON",
        "!DOWNLOAD_FOLDER",
        "!DOWNLOAD_FILE",
    ]
    .into_iter()
    .collect();
}

/// True when `name` (upper-cased) rejects writes through the user path.
/// `!STOPWATCH` and every `!STOPWATCH_<ID>` view are read-only.
pub fn is_read_only(name: &str) -> bool {
    READ_ONLY.contains(name) || name.starts_with("!STOPWATCH")
}

/// True for a user-writable configuration name.
pub fn is_config(name: &str) -> bool {
    CONFIG.contains(name)
}

/// True for the built-in numbered user variables `!VAR0..!VAR9` and the
/// datasource columns `!COL1..!COL8`.
pub fn is_builtin_user(name: &str) -> bool {
    if let Some(digit) = name.strip_prefix("!VAR") {
        return digit.len() == 1 && digit.chars().all(|c| c.is_ascii_digit());
    }
    if let Some(digit) = name.strip_prefix("!COL") {
        return matches!(digit.parse::<u8>(), Ok(1..=8));
    }
    false
}
