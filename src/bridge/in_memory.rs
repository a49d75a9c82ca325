//! In-Memory Browser
//!
//! A simulated browser backing both bridge traits. Pages are registered by
//! URL with a flat element list; TAG selectors, CONTENT actions, extracts
//! and SEARCH run against that model. This is the engine's standard test
//! double and the replay target of the CLI.

use async_trait::async_trait;
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::bridge::browser::BrowserBridge;
use crate::bridge::content::ContentScriptSender;
use crate::bridge::types::{
    AttrCondition, BridgeError, ClickRequest, ContentResponse, DownloadConfig, ElementInfo,
    EventRequest, ExtractKind, FrameTarget, PageInfo, SaveRequest, SearchRequest, SearchSource,
    TagAction, TagPosition, TagRequest, TagSelector,
};

/// One element of a simulated page. Attribute keys are lower-cased.
#[derive(Debug, Clone, Default)]
pub struct SimElement {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub visible: bool,
    pub checked: bool,
    /// `(value, visible text)` pairs for `<select>` elements.
    pub options: Vec<(String, String)>,
    /// Exact XPATH/CSS strings this element answers to, for tests that
    /// address elements directly.
    pub xpath: Option<String>,
    pub css: Option<String>,
}

impl SimElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_uppercase(),
            visible: true,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_lowercase(), value.to_string());
        self
    }

    pub fn with_option(mut self, value: &str, text: &str) -> Self {
        self.options.push((value.to_string(), text.to_string()));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn with_xpath(mut self, xpath: &str) -> Self {
        self.xpath = Some(xpath.to_string());
        self
    }

    pub fn with_css(mut self, css: &str) -> Self {
        self.css = Some(css.to_string());
        self
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(&key.to_lowercase()).map(|s| s.as_str())
    }

    fn info(&self, dom_index: usize) -> ElementInfo {
        ElementInfo {
            tag: self.tag.clone(),
            dom_index,
            text: self.text.clone(),
            attributes: self.attributes.clone(),
        }
    }

    fn outer_html(&self) -> String {
        let mut attrs = String::new();
        let mut keys: Vec<&String> = self.attributes.keys().collect();
        keys.sort();
        for key in keys {
            attrs.push_str(&format!(" {}=\"{}\"", key, self.attributes[key]));
        }
        format!(
            "<{tag}{attrs}>{text}</{tag}>",
            tag = self.tag.to_lowercase(),
            attrs = attrs,
            text = self.text
        )
    }
}

/// A registered page: title, elements in document order, optional frames
/// and a text body for SEARCH.
#[derive(Debug, Clone, Default)]
pub struct SimPage {
    pub url: String,
    pub title: String,
    pub elements: Vec<SimElement>,
    pub frames: Vec<String>,
    /// Page text searched by SEARCH. Defaults to the element texts joined
    /// with newlines.
    pub text: Option<String>,
}

impl SimPage {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn with_element(mut self, element: SimElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_frame(mut self, name: &str) -> Self {
        self.frames.push(name.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    fn body_text(&self) -> String {
        match &self.text {
            Some(t) => t.clone(),
            None => self
                .elements
                .iter()
                .map(|e| e.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Default)]
struct BrowserState {
    pages: HashMap<String, SimPage>,
    tabs: Vec<Option<String>>,
    active_tab: usize,
    history: Vec<String>,
    selected_frame: usize,
}

impl BrowserState {
    fn active_url(&self) -> Option<&String> {
        self.tabs.get(self.active_tab).and_then(|t| t.as_ref())
    }

    fn active_page(&self) -> Option<&SimPage> {
        self.active_url().and_then(|url| self.pages.get(url))
    }

    fn active_page_mut(&mut self) -> Option<&mut SimPage> {
        let url = self.active_url()?.clone();
        self.pages.get_mut(&url)
    }
}

/// The simulated browser. Cheap to share: every bridge method takes `&self`.
#[derive(Default)]
pub struct InMemoryBrowser {
    state: Mutex<BrowserState>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl InMemoryBrowser {
    pub fn new() -> Self {
        let browser = Self::default();
        browser.state.lock().unwrap().tabs.push(None);
        browser
    }

    pub fn register_page(&self, page: SimPage) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(page.url.clone(), page);
    }

    /// When offline, navigation calls fail the way a dead transport would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every bridge call so far, oldest first, rendered as `name payload`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn tab_count(&self) -> usize {
        self.state.lock().unwrap().tabs.len()
    }

    /// Current value of an element attribute, for asserting CONTENT fills.
    pub fn element_attr(&self, url: &str, index: usize, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .pages
            .get(url)?
            .elements
            .get(index)?
            .attr(key)
            .map(|s| s.to_string())
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_online(&self) -> Result<(), BridgeError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BridgeError::new("network unreachable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserBridge for InMemoryBrowser {
    async fn navigate(&self, url: &str) -> Result<PageInfo, BridgeError> {
        self.record(format!("navigate {}", url));
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        if let Some(previous) = state.active_url().cloned() {
            state.history.push(previous);
        }
        let active = state.active_tab;
        if let Some(tab) = state.tabs.get_mut(active) {
            *tab = Some(url.to_string());
        }
        state.selected_frame = 0;
        let title = state.pages.get(url).map(|p| p.title.clone());
        Ok(PageInfo {
            url: url.to_string(),
            title,
        })
    }

    async fn get_current_url(&self) -> Result<PageInfo, BridgeError> {
        self.record("getCurrentUrl".to_string());
        self.check_online()?;
        let state = self.state.lock().unwrap();
        let url = state
            .active_url()
            .cloned()
            .ok_or_else(|| BridgeError::new("no page loaded"))?;
        let title = state.pages.get(&url).map(|p| p.title.clone());
        Ok(PageInfo { url, title })
    }

    async fn go_back(&self) -> Result<(), BridgeError> {
        self.record("goBack".to_string());
        let mut state = self.state.lock().unwrap();
        let previous = state
            .history
            .pop()
            .ok_or_else(|| BridgeError::new("no history"))?;
        let active = state.active_tab;
        if let Some(tab) = state.tabs.get_mut(active) {
            *tab = Some(previous);
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<(), BridgeError> {
        self.record("refresh".to_string());
        let state = self.state.lock().unwrap();
        if state.active_url().is_none() {
            return Err(BridgeError::new("no page loaded"));
        }
        Ok(())
    }

    async fn open_tab(&self, url: Option<&str>) -> Result<usize, BridgeError> {
        self.record(format!("openTab {}", url.unwrap_or("-")));
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        state.tabs.push(url.map(|u| u.to_string()));
        state.active_tab = state.tabs.len() - 1;
        state.selected_frame = 0;
        Ok(state.active_tab)
    }

    async fn switch_tab(&self, tab_index: usize) -> Result<(), BridgeError> {
        self.record(format!("switchTab {}", tab_index));
        let mut state = self.state.lock().unwrap();
        if tab_index >= state.tabs.len() {
            return Err(BridgeError::new(format!(
                "tab index {} out of range",
                tab_index
            )));
        }
        state.active_tab = tab_index;
        state.selected_frame = 0;
        Ok(())
    }

    async fn close_tab(&self) -> Result<(), BridgeError> {
        self.record("closeTab".to_string());
        let mut state = self.state.lock().unwrap();
        let active = state.active_tab;
        state.tabs.remove(active);
        if state.tabs.is_empty() {
            state.tabs.push(None);
        }
        if state.active_tab >= state.tabs.len() {
            state.active_tab = state.tabs.len() - 1;
        }
        Ok(())
    }

    async fn close_other_tabs(&self) -> Result<(), BridgeError> {
        self.record("closeOtherTabs".to_string());
        let mut state = self.state.lock().unwrap();
        let keep = state.tabs.get(state.active_tab).cloned().unwrap_or(None);
        state.tabs = vec![keep];
        state.active_tab = 0;
        Ok(())
    }

    async fn select_frame(&self, target: &FrameTarget) -> Result<(), BridgeError> {
        self.record(format!("selectFrame {:?}", target));
        let mut state = self.state.lock().unwrap();
        let frame_count = state.active_page().map(|p| p.frames.len()).unwrap_or(0);
        match target {
            FrameTarget::Index(0) => {
                state.selected_frame = 0;
                Ok(())
            }
            FrameTarget::Index(n) => {
                if *n <= frame_count {
                    state.selected_frame = *n;
                    Ok(())
                } else {
                    Err(BridgeError::new(format!("frame {} not found", n)))
                }
            }
            FrameTarget::Name(name) => {
                let found = state
                    .active_page()
                    .and_then(|p| p.frames.iter().position(|f| f == name));
                match found {
                    Some(idx) => {
                        state.selected_frame = idx + 1;
                        Ok(())
                    }
                    None => Err(BridgeError::new(format!("frame \"{}\" not found", name))),
                }
            }
        }
    }

    async fn clear_browsing_data(&self) -> Result<(), BridgeError> {
        self.record("clearBrowsingData".to_string());
        let mut state = self.state.lock().unwrap();
        state.history.clear();
        Ok(())
    }

    async fn save_page(&self, request: &SaveRequest) -> Result<(), BridgeError> {
        self.record(format!("savePage {:?}", request.save_type));
        let state = self.state.lock().unwrap();
        if state.active_url().is_none() {
            return Err(BridgeError::new("no page loaded"));
        }
        Ok(())
    }

    async fn configure_download(&self, config: &DownloadConfig) -> Result<(), BridgeError> {
        self.record(format!(
            "configureDownload {}/{}",
            config.folder.as_deref().unwrap_or("*"),
            config.file.as_deref().unwrap_or("*")
        ));
        Ok(())
    }
}

#[async_trait]
impl ContentScriptSender for InMemoryBrowser {
    async fn tag(&self, request: &TagRequest) -> ContentResponse {
        self.record(format!("tag {:?}", request.selector));
        let mut state = self.state.lock().unwrap();
        let page = match state.active_page() {
            Some(p) => p.clone(),
            None => return ContentResponse::fail(-920, "no page loaded"),
        };

        let index = match resolve_selector(&page, &request.selector) {
            Ok(i) => i,
            Err(resp) => return resp,
        };
        let element = &page.elements[index];

        if request.wait_visible && !element.visible && !matches!(request.action, TagAction::Extract(_))
        {
            return ContentResponse::fail(-921, "element is not visible");
        }

        let mut response = match &request.action {
            TagAction::Click | TagAction::Submit | TagAction::Reset => ContentResponse::ok(),
            TagAction::Fill(values) => {
                match fill_element(state.active_page_mut().unwrap(), index, values) {
                    Ok(()) => ContentResponse::ok(),
                    Err(resp) => return resp,
                }
            }
            TagAction::Extract(kind) => match extract_from(&page, index, kind) {
                Ok(data) => ContentResponse::extracted(data),
                Err(resp) => return resp,
            },
        };
        response.element_info = Some(element.info(index));
        response
    }

    async fn click(&self, request: &ClickRequest) -> ContentResponse {
        self.record(format!("click {},{}", request.x, request.y));
        let state = self.state.lock().unwrap();
        if state.active_page().is_none() {
            return ContentResponse::fail(-920, "no page loaded");
        }
        ContentResponse::ok()
    }

    async fn event(&self, request: &EventRequest) -> ContentResponse {
        self.record(format!("event {}", request.event_type));
        let state = self.state.lock().unwrap();
        if state.active_page().is_none() {
            return ContentResponse::fail(-920, "no page loaded");
        }
        ContentResponse::ok()
    }

    async fn search(&self, request: &SearchRequest) -> ContentResponse {
        self.record("search".to_string());
        let state = self.state.lock().unwrap();
        let page = match state.active_page() {
            Some(p) => p,
            None => return ContentResponse::fail(-920, "no page loaded"),
        };
        run_search(&page.body_text(), request)
    }
}

/// Resolve a selector to an element index, or a failure response.
fn resolve_selector(page: &SimPage, selector: &TagSelector) -> Result<usize, ContentResponse> {
    match selector {
        TagSelector::Xpath(xpath) => page
            .elements
            .iter()
            .position(|e| e.xpath.as_deref() == Some(xpath.as_str()))
            .ok_or_else(|| ContentResponse::fail(-920, format!("no element for xpath {}", xpath))),
        TagSelector::Css(css) => page
            .elements
            .iter()
            .position(|e| e.css.as_deref() == Some(css.as_str()))
            .ok_or_else(|| ContentResponse::fail(-920, format!("no element for css {}", css))),
        TagSelector::Position {
            pos,
            tag_type,
            input_type,
            attributes,
        } => {
            let matches: Vec<usize> = page
                .elements
                .iter()
                .enumerate()
                .filter(|(_, e)| element_matches(e, tag_type, input_type.as_deref(), attributes))
                .map(|(i, _)| i)
                .collect();
            if matches.is_empty() {
                return Err(ContentResponse::fail(-920, "no matching element"));
            }
            match pos {
                TagPosition::Absolute(n) => {
                    let idx = if *n > 0 {
                        (*n as usize).checked_sub(1)
                    } else if *n < 0 {
                        matches.len().checked_sub(n.unsigned_abs() as usize)
                    } else {
                        None
                    };
                    idx.and_then(|i| matches.get(i).copied())
                        .ok_or_else(|| ContentResponse::fail(-920, "position out of range"))
                }
                TagPosition::Relative { offset, anchor } => {
                    let anchor = anchor
                        .as_ref()
                        .ok_or_else(|| ContentResponse::fail(-912, "no anchor element"))?;
                    let picked = if *offset > 0 {
                        matches
                            .iter()
                            .filter(|i| **i > anchor.dom_index)
                            .nth(*offset as usize - 1)
                    } else {
                        matches
                            .iter()
                            .rev()
                            .filter(|i| **i < anchor.dom_index)
                            .nth(offset.unsigned_abs() as usize - 1)
                    };
                    picked
                        .copied()
                        .ok_or_else(|| ContentResponse::fail(-920, "no element at relative position"))
                }
            }
        }
    }
}

fn element_matches(
    element: &SimElement,
    tag_type: &str,
    input_type: Option<&str>,
    attributes: &[AttrCondition],
) -> bool {
    if tag_type != "*" && !element.tag.eq_ignore_ascii_case(tag_type) {
        return false;
    }
    if let Some(wanted) = input_type {
        let actual = element.attr("type").unwrap_or("text");
        if !actual.eq_ignore_ascii_case(wanted) {
            return false;
        }
    }
    attributes.iter().all(|cond| {
        let actual = match cond.name.as_str() {
            "TXT" => Some(element.text.as_str()),
            other => element.attr(other),
        };
        match actual {
            Some(value) => wildcard_match(&cond.pattern, value),
            None => false,
        }
    })
}

/// Full-string match where `*` matches any run of characters.
fn wildcard_match(pattern: &str, value: &str) -> bool {
    let mut regex = String::from("^");
    for c in pattern.chars() {
        if c == '*' {
            regex.push_str("(?s).*");
        } else {
            regex.push_str(&regex_lite::escape(&c.to_string()));
        }
    }
    regex.push('$');
    Regex::new(&regex)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

fn fill_element(
    page: &mut SimPage,
    index: usize,
    values: &[crate::bridge::types::FillValue],
) -> Result<(), ContentResponse> {
    use crate::bridge::types::SelectBy;

    let element = &mut page.elements[index];
    if element.tag == "SELECT" {
        let mut selected = Vec::new();
        for fill in values {
            let found = element.options.iter().find(|(value, text)| match fill.by {
                SelectBy::Value => wildcard_match(&fill.text, value),
                SelectBy::Text | SelectBy::Plain => wildcard_match(&fill.text, text),
            });
            match found {
                Some((value, _)) => selected.push(value.clone()),
                None => {
                    return Err(ContentResponse::fail(
                        -912,
                        format!("no option matching {}", fill.text),
                    ))
                }
            }
        }
        element
            .attributes
            .insert("value".to_string(), selected.join(","));
    } else {
        let joined = values
            .iter()
            .map(|v| v.text.as_str())
            .collect::<Vec<_>>()
            .join(":");
        element.attributes.insert("value".to_string(), joined);
    }
    Ok(())
}

fn extract_from(
    page: &SimPage,
    index: usize,
    kind: &ExtractKind,
) -> Result<String, ContentResponse> {
    let element = &page.elements[index];
    let attr_or_empty = |key: &str| element.attr(key).unwrap_or("").to_string();
    Ok(match kind {
        ExtractKind::Txt => element.text.clone(),
        ExtractKind::Htm => element.outer_html(),
        ExtractKind::Href => attr_or_empty("href"),
        ExtractKind::Title => attr_or_empty("title"),
        ExtractKind::Alt => attr_or_empty("alt"),
        ExtractKind::Value => attr_or_empty("value"),
        ExtractKind::Src => attr_or_empty("src"),
        ExtractKind::Id => attr_or_empty("id"),
        ExtractKind::Class => attr_or_empty("class"),
        ExtractKind::Name => attr_or_empty("name"),
        ExtractKind::TxtAll => {
            if element.tag == "SELECT" {
                element
                    .options
                    .iter()
                    .map(|(_, text)| text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                element.text.clone()
            }
        }
        ExtractKind::Checked => {
            let input_type = element.attr("type").unwrap_or("");
            if element.tag == "INPUT" && (input_type == "checkbox" || input_type == "radio") {
                if element.checked { "YES" } else { "NO" }.to_string()
            } else {
                return Err(ContentResponse::fail(
                    -912,
                    "CHECKED applies to checkboxes and radios only",
                ));
            }
        }
        ExtractKind::Attr(name) => attr_or_empty(name),
    })
}

/// Run a SEARCH request against page text.
fn run_search(text: &str, request: &SearchRequest) -> ContentResponse {
    let (pattern, is_regexp) = match &request.source {
        SearchSource::Txt(p) => (txt_pattern_to_regex(p), false),
        SearchSource::Regexp(p) => (p.clone(), true),
    };
    let full_pattern = if request.ignore_case {
        format!("(?i){}", pattern)
    } else {
        pattern
    };
    let re = match Regex::new(&full_pattern) {
        Ok(re) => re,
        Err(e) => return ContentResponse::fail(-910, format!("invalid pattern: {}", e)),
    };
    let caps = match re.captures(text) {
        Some(caps) => caps,
        None => return ContentResponse::fail(-920, "pattern not found"),
    };

    if is_regexp {
        if let Some(template) = &request.extract_pattern {
            let mut out = String::new();
            let mut chars = template.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '$' {
                    if let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                        chars.next();
                        out.push_str(caps.get(d as usize).map(|m| m.as_str()).unwrap_or(""));
                        continue;
                    }
                }
                out.push(c);
            }
            return ContentResponse::extracted(out);
        }
    }
    ContentResponse::ok()
}

/// Convert an iMacros plain-text search pattern to a regex: `*` matches
/// anything across lines, whitespace matches any whitespace run, all other
/// characters are literal.
fn txt_pattern_to_regex(pattern: &str) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            out.push_str("(?s).*");
        } else if c.is_whitespace() {
            while chars.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
                chars.next();
            }
            out.push_str(r"\s+");
        } else {
            out.push_str(&regex_lite::escape(&c.to_string()));
        }
    }
    out
}
