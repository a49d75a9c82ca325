//! Download and Save Handlers
//!
//! ONDOWNLOAD, SAVEAS, SAVEITEM and SCREENSHOT. The engine only forwards
//! requests to the browser bridge; where the bytes land is the bridge's
//! business.

use async_trait::async_trait;

use crate::bridge::types::{DownloadConfig, SaveRequest, SaveType};
use crate::errors::ErrorCode;
use crate::executor::context::CommandContext;
use crate::executor::registry::CommandHandler;
use crate::executor::types::CommandResult;
use crate::handlers::navigation::browser_bridge;
use crate::parser::CommandKind;

/// `ONDOWNLOAD FOLDER=<f> FILE=<f> [WAIT=YES]`
pub struct OnDownloadHandler;

#[async_trait]
impl CommandHandler for OnDownloadHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let browser = match browser_bridge(ctx) {
            Ok(b) => b,
            Err(result) => return result,
        };

        // `*` keeps the browser default
        let folder = ctx.param("FOLDER").filter(|f| f != "*");
        let file = ctx.param("FILE").filter(|f| f != "*");
        let wait = ctx
            .param("WAIT")
            .map(|w| w.eq_ignore_ascii_case("YES"))
            .unwrap_or(false);

        if let Some(folder) = &folder {
            ctx.state.set_variable("!DOWNLOAD_FOLDER", folder.clone().into());
        }
        if let Some(file) = &file {
            ctx.state.set_variable("!DOWNLOAD_FILE", file.clone().into());
        }

        let config = DownloadConfig { folder, file, wait };
        match browser.configure_download(&config).await {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail_with(ErrorCode::DownloadFailed, e.message),
        }
    }
}

/// SAVEAS, SAVEITEM and SCREENSHOT share the TYPE/FOLDER/FILE shape.
pub struct SaveAsHandler;

#[async_trait]
impl CommandHandler for SaveAsHandler {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let browser = match browser_bridge(ctx) {
            Ok(b) => b,
            Err(result) => return result,
        };

        let save_type = match ctx.command.kind {
            CommandKind::SaveItem => SaveType::Item,
            CommandKind::Screenshot => ctx
                .param("TYPE")
                .map(|t| SaveType::parse(&t))
                .unwrap_or(SaveType::Png),
            _ => match ctx.required_param("TYPE") {
                Ok(t) => SaveType::parse(&t),
                Err(result) => return result,
            },
        };

        let request = SaveRequest {
            save_type,
            folder: ctx.param("FOLDER").filter(|f| f != "*"),
            file: ctx.param("FILE").filter(|f| f != "*"),
        };
        match browser.save_page(&request).await {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail_with(ErrorCode::DownloadFailed, e.message),
        }
    }
}
