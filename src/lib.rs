//! webmacro - an iMacros-compatible macro automation engine
//!
//! This library parses line-oriented `.iim` macros and executes them
//! against abstract browser bridges. It ships an in-memory browser so
//! macros can be replayed and tested without a real browser attached.

pub mod bridge;
pub mod datasource;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod recorder;
pub mod state;
pub mod vars;

pub use bridge::{
    ArithmeticEvaluator, BrowserBridge, CmdlineExecutor, ContentScriptSender, DialogBridge,
    ExpressionEvaluator, InMemoryBrowser, NetworkManager, SimElement, SimPage,
};
pub use datasource::{DataSourceProvider, StaticDataSourceProvider};
pub use engine::{Engine, EngineOptions};
pub use errors::{EngineError, ErrorCode};
pub use executor::{Bridges, CommandContext, CommandHandler, CommandResult, ControlHandle, Executor, MacroResult};
pub use parser::{parse_macro, CommandKind, ParsedCommand, ParsedMacro};
pub use recorder::{DomEvent, DomEventKind, ElementDescriptor, RecordedEvent, Recorder};
pub use state::ExecutionState;
pub use vars::{VariableStore, VariableValue};
