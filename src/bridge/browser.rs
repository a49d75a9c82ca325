//! Browser Bridge
//!
//! Navigation and tab/frame control. One method per message family; the
//! engine serializes calls per executor, the bridge decides its own
//! concurrency.

use async_trait::async_trait;

use crate::bridge::types::{
    BridgeError, DownloadConfig, FrameTarget, PageInfo, SaveRequest,
};

#[async_trait]
pub trait BrowserBridge: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<PageInfo, BridgeError>;

    async fn get_current_url(&self) -> Result<PageInfo, BridgeError>;

    async fn go_back(&self) -> Result<(), BridgeError>;

    async fn refresh(&self) -> Result<(), BridgeError>;

    /// Open a tab (optionally at a URL) and make it active. Returns the
    /// new tab's 0-based index.
    async fn open_tab(&self, url: Option<&str>) -> Result<usize, BridgeError>;

    /// Switch to the 0-based absolute tab index.
    async fn switch_tab(&self, tab_index: usize) -> Result<(), BridgeError>;

    /// Close the active tab.
    async fn close_tab(&self) -> Result<(), BridgeError>;

    /// Close every tab except the active one.
    async fn close_other_tabs(&self) -> Result<(), BridgeError>;

    /// Select the frame later content-script calls address. Index 0 is
    /// the main document.
    async fn select_frame(&self, target: &FrameTarget) -> Result<(), BridgeError>;

    /// CLEAR: drop cookies and cached data.
    async fn clear_browsing_data(&self) -> Result<(), BridgeError>;

    /// SAVEAS/SAVEITEM/SCREENSHOT: persist the current page or item.
    async fn save_page(&self, request: &SaveRequest) -> Result<(), BridgeError>;

    /// ONDOWNLOAD: configure how the next download is handled.
    async fn configure_download(&self, config: &DownloadConfig) -> Result<(), BridgeError>;
}
