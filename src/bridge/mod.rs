//! Bridge module
//!
//! Capability boundaries between the engine and the outside world, plus
//! the in-memory browser used by tests and the CLI.

pub mod browser;
pub mod cmdline;
pub mod content;
pub mod dialog;
pub mod eval;
pub mod in_memory;
pub mod network;
pub mod types;

pub use browser::BrowserBridge;
pub use cmdline::CmdlineExecutor;
pub use content::ContentScriptSender;
pub use dialog::DialogBridge;
pub use eval::{ArithmeticEvaluator, ExpressionEvaluator};
pub use in_memory::{InMemoryBrowser, SimElement, SimPage};
pub use network::NetworkManager;
pub use types::*;
