//! Dialog Bridge
//!
//! Prompts and pre-answered browser dialogs.

use async_trait::async_trait;

use crate::bridge::types::{BridgeError, DialogConfig};

#[async_trait]
pub trait DialogBridge: Send + Sync {
    /// Show a prompt and return the user's answer, or `None` on cancel.
    async fn prompt(
        &self,
        message: &str,
        default: Option<&str>,
    ) -> Result<Option<String>, BridgeError>;

    /// Pre-answer the next dialog of the given kind.
    async fn configure(&self, config: &DialogConfig) -> Result<(), BridgeError>;

    /// ONLOGIN: credentials for the next HTTP auth dialog.
    async fn set_credentials(&self, user: &str, password: &str) -> Result<(), BridgeError>;
}
