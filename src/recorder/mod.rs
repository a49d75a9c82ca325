//! Recorder module

#[allow(clippy::module_inception)]
pub mod recorder;
pub mod selector;

pub use recorder::{DomEvent, DomEventKind, ElementDescriptor, EventCallback, RecordedEvent, Recorder};
pub use selector::preferred_attribute;
