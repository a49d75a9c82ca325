//! Cmdline Executor
//!
//! OS command execution boundary. The engine ships no implementation; the
//! CMDLINE handler reports `UNSUPPORTED_COMMAND` unless the embedder
//! provides one.

use async_trait::async_trait;

use crate::bridge::types::{BridgeError, CmdlineOutput};

#[async_trait]
pub trait CmdlineExecutor: Send + Sync {
    async fn run(&self, command: &str) -> Result<CmdlineOutput, BridgeError>;
}
