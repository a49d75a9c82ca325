//! SET and ADD Handlers
//!
//! Variable assignment. Values expand at execution time; an `EVAL("…")`
//! value expands the quoted expression and delegates to the pluggable
//! evaluator. ADD sums numeric operands and concatenates everything else;
//! `ADD !EXTRACT <v>` appends to the extract list.

use async_trait::async_trait;

use crate::datasource;
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::parser::unquote;
use crate::vars::VariableValue;

/// Pull the `(name, raw value)` pair out of a SET/ADD command: either two
/// positionals (`SET !VAR1 hello`) or an assignment parameter
/// (`SET !VAR1=hello`). Extra positionals join the value with spaces.
fn name_and_value(ctx: &CommandContext<'_>) -> Option<(String, String)> {
    if let (Some(name), Some(first)) = (ctx.positional(0), ctx.raw_positional(1)) {
        let mut value = first;
        let mut index = 2;
        while let Some(more) = ctx.raw_positional(index) {
            value.push(' ');
            value.push_str(&more);
            index += 1;
        }
        return Some((name, value));
    }
    ctx.command
        .parameters
        .iter()
        .find(|p| !p.is_positional())
        .map(|p| (p.key.clone(), p.value.clone()))
}

/// Resolve a raw value: `EVAL("…")` goes through the evaluator, anything
/// else expands through the store.
fn resolve_value(ctx: &CommandContext<'_>, raw: &str) -> Result<String, CommandResult> {
    let trimmed = raw.trim();
    let is_eval = trimmed.len() > 6
        && trimmed
            .get(..5)
            .map(|head| head.eq_ignore_ascii_case("EVAL("))
            .unwrap_or(false)
        && trimmed.ends_with(')');
    if !is_eval {
        return Ok(ctx.expand(raw));
    }

    let inner = unquote(trimmed[5..trimmed.len() - 1].trim());
    let expression = ctx.expand(&inner);
    let Some(evaluator) = &ctx.bridges.evaluator else {
        return Err(CommandResult::fail_with(
            ErrorCode::UnsupportedCommand,
            "no expression evaluator configured",
        ));
    };
    evaluator
        .evaluate(&expression)
        .map_err(|e| CommandResult::fail_with(ErrorCode::ScriptError, e))
}

pub struct SetHandler;

#[async_trait]
impl CommandHandler for SetHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let Some((name, raw)) = name_and_value(ctx) else {
            return CommandResult::fail_with(
                ErrorCode::MissingParameter,
                "SET requires a variable name and a value",
            );
        };
        let value = match resolve_value(ctx, &raw) {
            Ok(value) => value,
            Err(result) => return result,
        };

        let outcome = ctx
            .state
            .set_variable(&name, VariableValue::infer(&value));
        if !outcome.success {
            return CommandResult::fail_with(
                ErrorCode::InvalidParameter,
                format!("variable {} is read-only", name.to_uppercase()),
            );
        }

        // Column variables track the datasource selection immediately
        let upper = name.to_uppercase();
        if upper == "!DATASOURCE" || upper == "!DATASOURCE_LINE" {
            if let Err(result) =
                datasource::load_columns(ctx.state, ctx.bridges.datasource.as_deref())
            {
                return result;
            }
        }
        CommandResult::ok()
    }
}

pub struct AddHandler;

#[async_trait]
impl CommandHandler for AddHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let Some((name, raw)) = name_and_value(ctx) else {
            return CommandResult::fail_with(
                ErrorCode::MissingParameter,
                "ADD requires a variable name and a value",
            );
        };
        let value = match resolve_value(ctx, &raw) {
            Ok(value) => value,
            Err(result) => return result,
        };

        if name.eq_ignore_ascii_case("!EXTRACT") {
            ctx.state.add_extract(value);
            return CommandResult::ok();
        }

        let current = ctx.state.get_variable(&name).unwrap_or_default();
        let combined = match (current.trim().parse::<f64>(), value.trim().parse::<f64>()) {
            (Ok(a), Ok(b)) => VariableValue::Number(a + b),
            _ => VariableValue::Text(format!("{}{}", current, value)),
        };

        let outcome = ctx.state.set_variable(&name, combined);
        if !outcome.success {
            return CommandResult::fail_with(
                ErrorCode::InvalidParameter,
                format!("variable {} is read-only", name.to_uppercase()),
            );
        }
        CommandResult::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::eval::{ArithmeticEvaluator, ExpressionEvaluator};
    use crate::datasource::{DataSourceProvider, StaticDataSourceProvider};
    use crate::executor::context::Bridges;
    use crate::executor::control::ControlHandle;
    use crate::parser::parse_line;
    use crate::state::ExecutionState;
    use std::sync::Arc;

    async fn run_set(line: &str, state: &mut ExecutionState, bridges: &Bridges) -> CommandResult {
        let command = parse_line(line, 1);
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state,
            bridges,
            control: &control,
        };
        SetHandler.execute(&mut ctx).await
    }

    async fn run_add(line: &str, state: &mut ExecutionState, bridges: &Bridges) -> CommandResult {
        let command = parse_line(line, 1);
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state,
            bridges,
            control: &control,
        };
        AddHandler.execute(&mut ctx).await
    }

    #[tokio::test]
    async fn test_set_positional() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let result = run_set("SET !VAR1 https://example.com/page2", &mut state, &bridges).await;
        assert!(result.success);
        assert_eq!(
            state.get_variable("!VAR1").as_deref(),
            Some("https://example.com/page2")
        );
    }

    #[tokio::test]
    async fn test_set_assignment_form() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let result = run_set("SET !VAR2=42", &mut state, &bridges).await;
        assert!(result.success);
        assert_eq!(state.get_variable("!VAR2").as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_set_expands_value() {
        let mut state = ExecutionState::new();
        state.store.set("BASE", "https://example.com".into());
        let bridges = Bridges::default();
        run_set("SET !VAR1 {{BASE}}/page2", &mut state, &bridges).await;
        assert_eq!(
            state.get_variable("!VAR1").as_deref(),
            Some("https://example.com/page2")
        );
    }

    #[tokio::test]
    async fn test_set_read_only_rejected() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let result = run_set("SET !LOOP 9", &mut state, &bridges).await;
        assert_eq!(result.error_code, ErrorCode::InvalidParameter);
    }

    #[tokio::test]
    async fn test_set_multi_word_value() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        run_set("SET GREETING hello wide world", &mut state, &bridges).await;
        assert_eq!(
            state.get_variable("GREETING").as_deref(),
            Some("hello wide world")
        );
    }

    #[tokio::test]
    async fn test_set_eval_through_evaluator() {
        let mut state = ExecutionState::new();
        state.store.set("!VAR1", VariableValue::Number(6.0));
        let bridges = Bridges {
            evaluator: Some(Arc::new(ArithmeticEvaluator) as Arc<dyn ExpressionEvaluator>),
            ..Bridges::default()
        };
        let result = run_set("SET !VAR2 EVAL(\"{{!VAR1}} * 7\")", &mut state, &bridges).await;
        assert!(result.success);
        assert_eq!(state.get_variable("!VAR2").as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_set_eval_without_evaluator_is_915() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let result = run_set("SET !VAR2 EVAL(\"1+2\")", &mut state, &bridges).await;
        assert_eq!(result.error_code, ErrorCode::UnsupportedCommand);
    }

    #[tokio::test]
    async fn test_set_datasource_loads_columns() {
        let mut state = ExecutionState::new();
        let provider =
            StaticDataSourceProvider::new().with_source("users.csv", "alice,30\nbob,25\n");
        let bridges = Bridges {
            datasource: Some(Arc::new(provider) as Arc<dyn DataSourceProvider>),
            ..Bridges::default()
        };
        let result = run_set("SET !DATASOURCE users.csv", &mut state, &bridges).await;
        assert!(result.success);
        assert_eq!(state.get_variable("!COL1").as_deref(), Some("alice"));

        run_set("SET !DATASOURCE_LINE 2", &mut state, &bridges).await;
        assert_eq!(state.get_variable("!COL1").as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_add_numeric_sum() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        run_set("SET !VAR1 10", &mut state, &bridges).await;
        let result = run_add("ADD !VAR1 5", &mut state, &bridges).await;
        assert!(result.success);
        assert_eq!(state.get_variable("!VAR1").as_deref(), Some("15"));
    }

    #[tokio::test]
    async fn test_add_concatenates_text() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        run_set("SET NAME John", &mut state, &bridges).await;
        run_add("ADD NAME <SP>Doe", &mut state, &bridges).await;
        // escapes are not decoded by ADD; the literal text is appended
        assert_eq!(state.get_variable("NAME").as_deref(), Some("John<SP>Doe"));
    }

    #[tokio::test]
    async fn test_add_extract_appends_to_list() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let result = run_add("ADD !EXTRACT constant", &mut state, &bridges).await;
        assert!(result.success);
        assert_eq!(state.extract_data(), ["constant"]);
    }

    #[tokio::test]
    async fn test_add_read_only_rejected() {
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let result = run_add("ADD !URLCURRENT x", &mut state, &bridges).await;
        assert_eq!(result.error_code, ErrorCode::InvalidParameter);
    }
}
