//! Variable store module

pub mod reserved;
pub mod store;

pub use store::{ExpandResult, SetOutcome, UrlKind, VariableStore, VariableValue};
