//! Recorded Selector Preference
//!
//! A recorded TAG line carries exactly one `ATTR:<KEY>=<VALUE>` selector.
//! Preference order: ID, NAME, HREF (anchors only), CLASS, visible text.

use crate::recorder::recorder::ElementDescriptor;

/// Pick the attribute a recorded command addresses the element by.
pub fn preferred_attribute(element: &ElementDescriptor) -> Option<(&'static str, String)> {
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

    if let Some(id) = non_empty(&element.id) {
        return Some(("ID", id));
    }
    if let Some(name) = non_empty(&element.name) {
        return Some(("NAME", name));
    }
    if element.tag.eq_ignore_ascii_case("A") {
        if let Some(href) = non_empty(&element.href) {
            return Some(("HREF", href));
        }
    }
    if let Some(class) = non_empty(&element.class) {
        return Some(("CLASS", class));
    }
    if let Some(text) = non_empty(&element.text) {
        return Some(("TXT", text));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str) -> ElementDescriptor {
        ElementDescriptor {
            tag: tag.to_string(),
            ..ElementDescriptor::default()
        }
    }

    #[test]
    fn test_id_wins() {
        let mut e = element("INPUT");
        e.id = Some("user".into());
        e.name = Some("username".into());
        assert_eq!(preferred_attribute(&e), Some(("ID", "user".to_string())));
    }

    #[test]
    fn test_name_before_class() {
        let mut e = element("INPUT");
        e.name = Some("username".into());
        e.class = Some("field".into());
        assert_eq!(preferred_attribute(&e), Some(("NAME", "username".to_string())));
    }

    #[test]
    fn test_href_only_for_anchors() {
        let mut anchor = element("A");
        anchor.href = Some("https://example.com".into());
        assert_eq!(
            preferred_attribute(&anchor),
            Some(("HREF", "https://example.com".to_string()))
        );

        let mut button = element("BUTTON");
        button.href = Some("https://example.com".into());
        button.text = Some("Go".into());
        assert_eq!(preferred_attribute(&button), Some(("TXT", "Go".to_string())));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let mut e = element("A");
        e.id = Some(String::new());
        e.text = Some("Link".into());
        assert_eq!(preferred_attribute(&e), Some(("TXT", "Link".to_string())));
    }

    #[test]
    fn test_nothing_usable() {
        assert_eq!(preferred_attribute(&element("DIV")), None);
    }
}
