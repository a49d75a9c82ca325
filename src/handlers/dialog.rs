//! Dialog Handlers
//!
//! PROMPT, ONLOGIN and the ONDIALOG family. Dialog configuration is kept
//! in the dialog config variables and forwarded to the dialog bridge when
//! one is attached.

use async_trait::async_trait;

use crate::bridge::types::{DialogButton, DialogConfig, DialogKind};
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::parser::CommandKind;

/// `PROMPT <text> [var [default]]`
pub struct PromptHandler;

#[async_trait]
impl CommandHandler for PromptHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let Some(message) = ctx.positional(0) else {
            return CommandResult::fail_with(
                ErrorCode::MissingParameter,
                "PROMPT requires a message",
            );
        };
        let variable = ctx.positional(1);
        let default = ctx.positional(2);

        match ctx.bridges.dialog.clone() {
            Some(dialog) => match dialog.prompt(&message, default.as_deref()).await {
                Ok(Some(answer)) => {
                    if let Some(name) = variable {
                        ctx.state.set_variable(&name, answer.into());
                    }
                    CommandResult::ok()
                }
                // cancel leaves the variable untouched
                Ok(None) => CommandResult::ok(),
                Err(e) => CommandResult::fail_with(ErrorCode::UnhandledDialog, e.message),
            },
            None => match (variable, default) {
                (Some(name), Some(default)) => {
                    ctx.state.set_variable(&name, default.into());
                    CommandResult::ok()
                }
                _ => CommandResult::fail_with(
                    ErrorCode::UnhandledDialog,
                    "no dialog bridge to show PROMPT",
                ),
            },
        }
    }
}

/// `ONLOGIN USER=<u> PASSWORD=<p>`: credentials for the next HTTP auth
/// dialog. The login variables are system-set.
pub struct OnLoginHandler;

#[async_trait]
impl CommandHandler for OnLoginHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let user = match ctx.required_param("USER") {
            Ok(v) => v,
            Err(result) => return result,
        };
        let password = match ctx.required_param("PASSWORD") {
            Ok(v) => v,
            Err(result) => return result,
        };

        ctx.state.store.set_system("!LOGIN_USER", user.clone().into());
        ctx.state
            .store
            .set_system("!LOGIN_PASSWORD", password.clone().into());

        if let Some(dialog) = ctx.bridges.dialog.clone() {
            if let Err(e) = dialog.set_credentials(&user, &password).await {
                return CommandResult::fail_with(ErrorCode::ScriptError, e.message);
            }
        }
        CommandResult::ok()
    }
}

/// ONDIALOG / ONCERTIFICATEDIALOG / ONERRORDIALOG / ONSECURITYDIALOG /
/// ONWEBPAGEDIALOG / ONPRINT, all sharing the POS/BUTTON/CONTENT shape.
pub struct DialogConfigHandler;

fn dialog_kind(kind: CommandKind) -> DialogKind {
    match kind {
        CommandKind::OnCertificateDialog => DialogKind::Certificate,
        CommandKind::OnErrorDialog => DialogKind::Error,
        CommandKind::OnSecurityDialog => DialogKind::Security,
        CommandKind::OnWebPageDialog => DialogKind::WebPage,
        CommandKind::OnPrint => DialogKind::Print,
        _ => DialogKind::Script,
    }
}

/// The config variable each dialog family's BUTTON lands in.
fn button_variable(kind: DialogKind) -> &'static str {
    match kind {
        DialogKind::Script => "!DIALOG_BUTTON",
        DialogKind::Certificate => "!CERTIFICATE_BUTTON",
        DialogKind::Error => "!ERRORDIALOG_BUTTON",
        DialogKind::Security => "!SECURITY_BUTTON",
        DialogKind::WebPage => "!WEBPAGE_BUTTON",
        DialogKind::Print => "!DIALOG_BUTTON",
    }
}

#[async_trait]
impl CommandHandler for DialogConfigHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let kind = dialog_kind(ctx.command.kind);

        let button_raw = ctx.param("BUTTON").unwrap_or_else(|| "OK".to_string());
        let Some(button) = DialogButton::parse(&button_raw) else {
            return CommandResult::fail_with(
                ErrorCode::InvalidParameter,
                format!("unknown dialog button {}", button_raw),
            );
        };
        let pos = match ctx.param("POS") {
            Some(value) => match value.parse::<u32>() {
                Ok(n) if n >= 1 => Some(n),
                _ => {
                    return CommandResult::fail_with(
                        ErrorCode::InvalidParameter,
                        format!("dialog POS must be >= 1, got {}", value),
                    )
                }
            },
            None => None,
        };
        let content = ctx.param("CONTENT");

        ctx.state
            .set_variable(button_variable(kind), button_raw.to_uppercase().into());
        if kind == DialogKind::Script {
            if let Some(pos) = pos {
                ctx.state
                    .set_variable("!DIALOG_POS", crate::vars::VariableValue::Number(pos as f64));
            }
            if let Some(content) = &content {
                ctx.state.set_variable("!DIALOG_CONTENT", content.clone().into());
            }
        }

        if let Some(dialog) = ctx.bridges.dialog.clone() {
            let config = DialogConfig {
                kind,
                pos,
                button,
                content,
            };
            if let Err(e) = dialog.configure(&config).await {
                return CommandResult::fail_with(ErrorCode::ScriptError, e.message);
            }
        }
        CommandResult::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::dialog::DialogBridge;
    use crate::bridge::types::BridgeError;
    use crate::executor::context::Bridges;
    use crate::executor::control::ControlHandle;
    use crate::parser::parse_line;
    use crate::state::ExecutionState;
    use std::sync::{Arc, Mutex};

    /// Scripted dialog bridge double.
    #[derive(Default)]
    struct ScriptedDialog {
        answer: Option<String>,
        configs: Mutex<Vec<DialogConfig>>,
        credentials: Mutex<Option<(String, String)>>,
    }

    #[async_trait]
    impl DialogBridge for ScriptedDialog {
        async fn prompt(
            &self,
            _message: &str,
            _default: Option<&str>,
        ) -> Result<Option<String>, BridgeError> {
            Ok(self.answer.clone())
        }

        async fn configure(&self, config: &DialogConfig) -> Result<(), BridgeError> {
            self.configs.lock().unwrap().push(config.clone());
            Ok(())
        }

        async fn set_credentials(&self, user: &str, password: &str) -> Result<(), BridgeError> {
            *self.credentials.lock().unwrap() = Some((user.to_string(), password.to_string()));
            Ok(())
        }
    }

    async fn run<H: CommandHandler>(
        handler: H,
        line: &str,
        state: &mut ExecutionState,
        dialog: Option<Arc<ScriptedDialog>>,
    ) -> CommandResult {
        let command = parse_line(line, 1);
        let bridges = Bridges {
            dialog: dialog.map(|d| d as Arc<dyn DialogBridge>),
            ..Bridges::default()
        };
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state,
            bridges: &bridges,
            control: &control,
        };
        handler.execute(&mut ctx).await
    }

    #[tokio::test]
    async fn test_prompt_stores_answer() {
        let dialog = Arc::new(ScriptedDialog {
            answer: Some("Jane".to_string()),
            ..ScriptedDialog::default()
        });
        let mut state = ExecutionState::new();
        let result = run(
            PromptHandler,
            "PROMPT \"Your name?\" !VAR1 Anonymous",
            &mut state,
            Some(dialog),
        )
        .await;
        assert!(result.success);
        assert_eq!(state.get_variable("!VAR1").as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn test_prompt_without_bridge_uses_default() {
        let mut state = ExecutionState::new();
        let result = run(
            PromptHandler,
            "PROMPT \"Your name?\" !VAR1 Anonymous",
            &mut state,
            None,
        )
        .await;
        assert!(result.success);
        assert_eq!(state.get_variable("!VAR1").as_deref(), Some("Anonymous"));
    }

    #[tokio::test]
    async fn test_prompt_without_bridge_or_default_is_1450() {
        let mut state = ExecutionState::new();
        let result = run(PromptHandler, "PROMPT \"Hello\"", &mut state, None).await;
        assert_eq!(result.error_code, ErrorCode::UnhandledDialog);
    }

    #[tokio::test]
    async fn test_onlogin_sets_system_variables() {
        let dialog = Arc::new(ScriptedDialog::default());
        let mut state = ExecutionState::new();
        let result = run(
            OnLoginHandler,
            "ONLOGIN USER=admin PASSWORD=hunter2",
            &mut state,
            Some(dialog.clone()),
        )
        .await;
        assert!(result.success);
        assert_eq!(state.get_variable("!LOGIN_USER").as_deref(), Some("admin"));
        assert_eq!(
            state.get_variable("!LOGIN_PASSWORD").as_deref(),
            Some("hunter2")
        );
        assert_eq!(
            dialog.credentials.lock().unwrap().clone(),
            Some(("admin".to_string(), "hunter2".to_string()))
        );
    }

    #[tokio::test]
    async fn test_onlogin_requires_password() {
        let mut state = ExecutionState::new();
        let result = run(OnLoginHandler, "ONLOGIN USER=admin", &mut state, None).await;
        assert_eq!(result.error_code, ErrorCode::MissingParameter);
    }

    #[tokio::test]
    async fn test_ondialog_stores_config_and_forwards() {
        let dialog = Arc::new(ScriptedDialog::default());
        let mut state = ExecutionState::new();
        let result = run(
            DialogConfigHandler,
            "ONDIALOG POS=1 BUTTON=OK CONTENT=hello",
            &mut state,
            Some(dialog.clone()),
        )
        .await;
        assert!(result.success);
        assert_eq!(state.get_variable("!DIALOG_BUTTON").as_deref(), Some("OK"));
        assert_eq!(state.get_variable("!DIALOG_POS").as_deref(), Some("1"));
        assert_eq!(
            state.get_variable("!DIALOG_CONTENT").as_deref(),
            Some("hello")
        );
        let configs = dialog.configs.lock().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].button, DialogButton::Ok);
    }

    #[tokio::test]
    async fn test_oncertificate_uses_its_button_variable() {
        let mut state = ExecutionState::new();
        let command = parse_line("ONCERTIFICATEDIALOG BUTTON=CANCEL", 1);
        let bridges = Bridges::default();
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control: &control,
        };
        let result = DialogConfigHandler.execute(&mut ctx).await;
        assert!(result.success);
        assert_eq!(
            state.get_variable("!CERTIFICATE_BUTTON").as_deref(),
            Some("CANCEL")
        );
    }

    #[tokio::test]
    async fn test_ondialog_bad_button_is_912() {
        let mut state = ExecutionState::new();
        let result = run(
            DialogConfigHandler,
            "ONDIALOG BUTTON=MAYBE",
            &mut state,
            None,
        )
        .await;
        assert_eq!(result.error_code, ErrorCode::InvalidParameter);
    }
}
