//! Command Registry
//!
//! Maps command kinds to handlers. Kinds without a registered handler run
//! a default no-op that succeeds, so an unknown future command does not
//! abort a macro.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::executor::context::CommandContext;
use crate::executor::types::CommandResult;
use crate::parser::CommandKind;

/// One command family's logic. Handlers are stateless; everything they
/// need arrives in the context.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult;
}

/// Default handler: succeed without doing anything.
struct NoOpHandler;

#[async_trait]
impl CommandHandler for NoOpHandler {
    async fn execute(&self, _ctx: &mut CommandContext<'_>) -> CommandResult {
        CommandResult::ok()
    }
}

pub struct HandlerRegistry {
    handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
    default_handler: Arc<dyn CommandHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            default_handler: Arc::new(NoOpHandler),
        }
    }

    pub fn register(&mut self, kind: CommandKind, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// The handler for a kind, or the default no-op.
    pub fn get(&self, kind: CommandKind) -> Arc<dyn CommandHandler> {
        self.handlers
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| self.default_handler.clone())
    }

    pub fn contains(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::context::Bridges;
    use crate::executor::control::ControlHandle;
    use crate::parser::parse_line;
    use crate::state::ExecutionState;

    struct FixedHandler(CommandResult);

    #[async_trait]
    impl CommandHandler for FixedHandler {
        async fn execute(&self, _ctx: &mut CommandContext<'_>) -> CommandResult {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_unregistered_kind_runs_default_noop() {
        let registry = HandlerRegistry::new();
        let command = parse_line("FLY TO=moon", 1);
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control: &control,
        };
        let result = registry.get(CommandKind::Unknown).execute(&mut ctx).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_registered_handler_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register(
            CommandKind::Wait,
            Arc::new(FixedHandler(CommandResult::with_output("waited"))),
        );
        assert!(registry.contains(CommandKind::Wait));
        let command = parse_line("WAIT SECONDS=1", 1);
        let mut state = ExecutionState::new();
        let bridges = Bridges::default();
        let control = ControlHandle::new();
        let mut ctx = CommandContext {
            command: &command,
            state: &mut state,
            bridges: &bridges,
            control: &control,
        };
        let result = registry.get(CommandKind::Wait).execute(&mut ctx).await;
        assert_eq!(result.output.as_deref(), Some("waited"));
    }
}
