//! Data Sources
//!
//! `SET !DATASOURCE` selects a named CSV source; the engine loads one row
//! per loop iteration into `!COL1..!COL8`. File access stays outside the
//! core: a `DataSourceProvider` hands over the source text by name.

use csv::ReaderBuilder;

use crate::errors::ErrorCode;
use crate::executor::types::CommandResult;
use crate::state::ExecutionState;
use crate::vars::VariableValue;

/// Supplies datasource text by name. Implementations typically read files
/// relative to `!FOLDER_DATASOURCE`; tests register strings.
pub trait DataSourceProvider: Send + Sync {
    /// The raw CSV text, or `None` when no source with that name exists.
    fn load(&self, name: &str) -> Option<String>;
}

/// A provider backed by an in-memory name → text map.
#[derive(Debug, Default)]
pub struct StaticDataSourceProvider {
    sources: std::collections::HashMap<String, String>,
}

impl StaticDataSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, name: &str, text: &str) -> Self {
        self.sources.insert(name.to_string(), text.to_string());
        self
    }
}

impl DataSourceProvider for StaticDataSourceProvider {
    fn load(&self, name: &str) -> Option<String> {
        self.sources.get(name).cloned()
    }
}

/// Parse CSV text and return the 1-based `line` as a list of column
/// values.
pub fn read_row(text: &str, line: usize) -> Result<Vec<String>, ErrorCode> {
    if line == 0 {
        return Err(ErrorCode::DatasourceLineNotFound);
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|_| ErrorCode::DatasourceReadError)?;
        if idx + 1 == line {
            return Ok(record.iter().map(|f| f.to_string()).collect());
        }
    }
    Err(ErrorCode::DatasourceLineNotFound)
}

/// Load the selected datasource row into `!COL1..!COL8`. A no-op when no
/// `!DATASOURCE` is set. Runs at the start of every loop iteration and
/// again when SET touches the datasource variables.
pub fn load_columns(
    state: &mut ExecutionState,
    provider: Option<&dyn DataSourceProvider>,
) -> Result<(), CommandResult> {
    let name = match state.store.get_str("!DATASOURCE") {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(()),
    };

    let provider = provider.ok_or_else(|| {
        CommandResult::fail_with(
            ErrorCode::DatasourceNotFound,
            "no data source provider configured",
        )
    })?;
    let text = provider.load(&name).ok_or_else(|| {
        CommandResult::fail_with(
            ErrorCode::DatasourceNotFound,
            format!("data source {} not found", name),
        )
    })?;

    let line = state
        .store
        .get_number("!DATASOURCE_LINE")
        .filter(|n| *n >= 1.0 && n.fract() == 0.0)
        .map(|n| n as usize)
        .ok_or_else(|| {
            CommandResult::fail_with(
                ErrorCode::DatasourceLineNotFound,
                format!(
                    "invalid !DATASOURCE_LINE {}",
                    state.store.get_str("!DATASOURCE_LINE").unwrap_or_default()
                ),
            )
        })?;

    let row = read_row(&text, line).map_err(|code| {
        CommandResult::fail_with(code, format!("data source {} line {}", name, line))
    })?;

    for column in 1..=8usize {
        let value = row.get(column - 1).cloned().unwrap_or_default();
        state.store.set(&format!("!COL{}", column), value.into());
    }
    state
        .store
        .set("!DATASOURCE_COLUMNS", VariableValue::Number(row.len() as f64));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "alice,30,berlin\nbob,25,\"paris, france\"\n";

    #[test]
    fn test_read_row_fields() {
        let row = read_row(CSV, 1).unwrap();
        assert_eq!(row, vec!["alice", "30", "berlin"]);
    }

    #[test]
    fn test_read_row_quoted_comma() {
        let row = read_row(CSV, 2).unwrap();
        assert_eq!(row[2], "paris, france");
    }

    #[test]
    fn test_read_row_out_of_range() {
        assert_eq!(read_row(CSV, 3), Err(ErrorCode::DatasourceLineNotFound));
        assert_eq!(read_row(CSV, 0), Err(ErrorCode::DatasourceLineNotFound));
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticDataSourceProvider::new().with_source("users.csv", CSV);
        assert!(provider.load("users.csv").is_some());
        assert!(provider.load("other.csv").is_none());
    }

    #[test]
    fn test_load_columns_fills_cols() {
        let provider = StaticDataSourceProvider::new().with_source("users.csv", CSV);
        let mut state = ExecutionState::new();
        state.store.set("!DATASOURCE", "users.csv".into());
        state.store.set("!DATASOURCE_LINE", VariableValue::Number(2.0));
        load_columns(&mut state, Some(&provider)).unwrap();
        assert_eq!(state.get_variable("!COL1").as_deref(), Some("bob"));
        assert_eq!(state.get_variable("!COL3").as_deref(), Some("paris, france"));
        assert_eq!(state.get_variable("!COL4").as_deref(), Some(""));
        assert_eq!(state.get_variable("!DATASOURCE_COLUMNS").as_deref(), Some("3"));
    }

    #[test]
    fn test_load_columns_without_datasource_is_noop() {
        let mut state = ExecutionState::new();
        assert!(load_columns(&mut state, None).is_ok());
    }

    #[test]
    fn test_load_columns_missing_source() {
        let provider = StaticDataSourceProvider::new();
        let mut state = ExecutionState::new();
        state.store.set("!DATASOURCE", "gone.csv".into());
        let err = load_columns(&mut state, Some(&provider)).unwrap_err();
        assert_eq!(err.error_code, ErrorCode::DatasourceNotFound);
    }

    #[test]
    fn test_load_columns_row_out_of_range() {
        let provider = StaticDataSourceProvider::new().with_source("users.csv", CSV);
        let mut state = ExecutionState::new();
        state.store.set("!DATASOURCE", "users.csv".into());
        state.store.set("!DATASOURCE_LINE", VariableValue::Number(9.0));
        let err = load_columns(&mut state, Some(&provider)).unwrap_err();
        assert_eq!(err.error_code, ErrorCode::DatasourceLineNotFound);
    }
}
