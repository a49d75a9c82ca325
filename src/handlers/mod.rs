//! Command handlers
//!
//! One module per command family, registered into the handler registry.

pub mod click;
pub mod dialog;
pub mod download;
pub mod frame;
pub mod navigation;
pub mod network;
pub mod search;
pub mod setvar;
pub mod stopwatch;
pub mod stubs;
pub mod tab;
pub mod tag;
pub mod wait;

use std::sync::Arc;

use crate::executor::registry::HandlerRegistry;
use crate::parser::CommandKind;

/// Register the built-in handler for every command the engine implements.
/// VERSION and other inert commands fall through to the default no-op.
pub fn register_default_handlers(registry: &mut HandlerRegistry) {
    registry.register(CommandKind::Url, Arc::new(navigation::UrlHandler));
    registry.register(CommandKind::Back, Arc::new(navigation::BackHandler));
    registry.register(CommandKind::Refresh, Arc::new(navigation::RefreshHandler));
    registry.register(CommandKind::Clear, Arc::new(navigation::ClearHandler));

    registry.register(CommandKind::Tab, Arc::new(tab::TabHandler));
    registry.register(CommandKind::Frame, Arc::new(frame::FrameHandler));
    registry.register(CommandKind::Tag, Arc::new(tag::TagHandler));
    registry.register(CommandKind::Click, Arc::new(click::ClickHandler));
    registry.register(CommandKind::Event, Arc::new(click::EventHandler));
    registry.register(CommandKind::Search, Arc::new(search::SearchHandler));
    registry.register(CommandKind::Extract, Arc::new(search::ExtractHandler));

    registry.register(CommandKind::Set, Arc::new(setvar::SetHandler));
    registry.register(CommandKind::Add, Arc::new(setvar::AddHandler));
    registry.register(CommandKind::Wait, Arc::new(wait::WaitHandler));
    registry.register(CommandKind::Pause, Arc::new(wait::PauseHandler));
    registry.register(CommandKind::Stopwatch, Arc::new(stopwatch::StopwatchHandler));

    registry.register(CommandKind::Prompt, Arc::new(dialog::PromptHandler));
    registry.register(CommandKind::OnLogin, Arc::new(dialog::OnLoginHandler));
    for kind in [
        CommandKind::OnDialog,
        CommandKind::OnCertificateDialog,
        CommandKind::OnErrorDialog,
        CommandKind::OnSecurityDialog,
        CommandKind::OnWebPageDialog,
        CommandKind::OnPrint,
    ] {
        registry.register(kind, Arc::new(dialog::DialogConfigHandler));
    }

    registry.register(CommandKind::OnDownload, Arc::new(download::OnDownloadHandler));
    for kind in [
        CommandKind::SaveAs,
        CommandKind::SaveItem,
        CommandKind::Screenshot,
    ] {
        registry.register(kind, Arc::new(download::SaveAsHandler));
    }

    registry.register(CommandKind::Filter, Arc::new(network::FilterHandler));
    registry.register(CommandKind::Proxy, Arc::new(network::ProxyHandler));

    registry.register(CommandKind::Cmdline, Arc::new(stubs::CmdlineHandler));
    for kind in [
        CommandKind::Disconnect,
        CommandKind::Redial,
        CommandKind::ImageClick,
        CommandKind::ImageSearch,
        CommandKind::Print,
        CommandKind::FileDelete,
        CommandKind::Size,
        CommandKind::Ds,
        CommandKind::Tray,
        CommandKind::WinClick,
        CommandKind::Events,
    ] {
        registry.register(kind, Arc::new(stubs::UnsupportedHandler));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_kinds_are_registered() {
        let mut registry = HandlerRegistry::new();
        register_default_handlers(&mut registry);
        for kind in [
            CommandKind::Url,
            CommandKind::Tab,
            CommandKind::Frame,
            CommandKind::Tag,
            CommandKind::Search,
            CommandKind::Extract,
            CommandKind::Set,
            CommandKind::Add,
            CommandKind::Wait,
        ] {
            assert!(registry.contains(kind), "missing handler for {:?}", kind);
        }
        // VERSION stays a no-op
        assert!(!registry.contains(CommandKind::Version));
    }
}
