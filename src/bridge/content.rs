//! Content Script Sender
//!
//! DOM interaction boundary: TAG, CLICK, EVENT and SEARCH requests are
//! executed inside the page by the content script (or a test double).

use async_trait::async_trait;

use crate::bridge::types::{ClickRequest, ContentResponse, EventRequest, SearchRequest, TagRequest};

#[async_trait]
pub trait ContentScriptSender: Send + Sync {
    async fn tag(&self, request: &TagRequest) -> ContentResponse;

    async fn click(&self, request: &ClickRequest) -> ContentResponse;

    async fn event(&self, request: &EventRequest) -> ContentResponse;

    async fn search(&self, request: &SearchRequest) -> ContentResponse;
}
