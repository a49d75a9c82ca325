//! Network Manager
//!
//! Proxy and content-filter configuration (PROXY, FILTER commands).

use async_trait::async_trait;

use crate::bridge::types::{BridgeError, ContentFilter, ProxyConfig};

#[async_trait]
pub trait NetworkManager: Send + Sync {
    async fn set_proxy(&self, config: &ProxyConfig) -> Result<(), BridgeError>;

    async fn set_content_filter(&self, filter: &ContentFilter) -> Result<(), BridgeError>;
}
