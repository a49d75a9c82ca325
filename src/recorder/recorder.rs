//! Recorder
//!
//! Subscribes to DOM click and change events and emits equivalent TAG
//! commands in chronological order. Clicks on text-style inputs are
//! skipped; their change events carry the final value.

use crate::parser::quote_value;
use crate::recorder::selector::preferred_attribute;

/// Input types whose clicks are covered by the later change event.
const TEXT_INPUT_TYPES: &[&str] = &[
    "text", "password", "email", "number", "tel", "url", "search",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomEventKind {
    Click,
    Change,
}

/// What the embedder's event listener saw on the target element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementDescriptor {
    pub tag: String,
    /// `type` attribute of inputs, lower-cased.
    pub input_type: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub href: Option<String>,
    pub class: Option<String>,
    pub text: Option<String>,
    /// Current value, for change events.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub kind: DomEventKind,
    pub element: ElementDescriptor,
    pub timestamp_ms: u64,
}

/// One recorded macro line.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub line: String,
    pub timestamp_ms: u64,
}

pub type EventCallback = Box<dyn Fn(&RecordedEvent) + Send + Sync>;

pub struct Recorder {
    recording: bool,
    events: Vec<RecordedEvent>,
    page_url: String,
    on_event: Option<EventCallback>,
    last_timestamp: u64,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            recording: false,
            events: Vec::new(),
            page_url: String::new(),
            on_event: None,
            last_timestamp: 0,
        }
    }

    /// Begin recording. Idempotent.
    pub fn start(&mut self) {
        self.recording = true;
    }

    /// Detach from events; recorded lines stay.
    pub fn stop(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Drop recorded lines but keep recording.
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.last_timestamp = 0;
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn set_page_url(&mut self, url: &str) {
        self.page_url = url.to_string();
    }

    /// Observe each recorded event in real time.
    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.on_event = Some(callback);
    }

    /// Feed one DOM event. Returns the recorded line, if the event
    /// produced one.
    pub fn handle_event(&mut self, event: DomEvent) -> Option<&RecordedEvent> {
        if !self.recording {
            return None;
        }
        let line = render_line(&event)?;

        // Timestamps never go backwards
        let timestamp_ms = event.timestamp_ms.max(self.last_timestamp);
        self.last_timestamp = timestamp_ms;

        let recorded = RecordedEvent { line, timestamp_ms };
        if let Some(callback) = &self.on_event {
            callback(&recorded);
        }
        self.events.push(recorded);
        self.events.last()
    }

    /// The finished macro: header comment block plus one line per event
    /// in insertion order.
    pub fn generate_macro(&self) -> String {
        let mut out = String::from("' iMacros Recorded Macro\n");
        out.push_str(&format!("' URL: {}\n", self.page_url));
        for event in &self.events {
            out.push_str(&event.line);
            out.push('\n');
        }
        out
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a DOM event as a TAG line, or `None` when the event is not
/// recordable.
fn render_line(event: &DomEvent) -> Option<String> {
    let element = &event.element;
    let tag = element.tag.to_uppercase();
    let input_type = element.input_type.as_deref().map(|t| t.to_lowercase());

    if event.kind == DomEventKind::Click
        && (tag == "TEXTAREA"
            || (tag == "INPUT"
                && TEXT_INPUT_TYPES
                    .contains(&input_type.as_deref().unwrap_or("text"))))
    {
        return None;
    }

    let type_param = match &input_type {
        Some(t) if tag == "INPUT" => format!("{}:{}", tag, t.to_uppercase()),
        _ => tag.clone(),
    };

    let mut line = format!("TAG POS=1 TYPE={}", type_param);
    if let Some((key, value)) = preferred_attribute(element) {
        line.push_str(&format!(" ATTR:{}={}", key, quote_value(&value)));
    }

    if event.kind == DomEventKind::Change {
        let value = element.value.clone().unwrap_or_default();
        let content = if tag == "SELECT" {
            format!("%{}", value)
        } else {
            value
        };
        line.push_str(&format!(" CONTENT={}", quote_value(&content)));
    }

    Some(line)
}
