//! Queryable document snapshot contract.
//!
//! Hosts adapt their live markup to [`DocumentSnapshot`]; the core never parses
//! markup itself. [`StaticDocument`] is a flat, in-memory snapshot used by hosts
//! that pre-collect elements and by tests.

use std::collections::BTreeMap;

/// One element of a rendered document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name, e.g. `a`, `div`.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Concatenated text content of the element and its descendants.
    pub text: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Read-only query surface over a rendered document.
///
/// Implementations must return elements in document order.
pub trait DocumentSnapshot {
    /// First element whose `attribute` value contains `needle`.
    fn first_with_attribute_containing(&self, attribute: &str, needle: &str) -> Option<&Element>;

    /// Up to `limit` elements whose tag is one of `tags`.
    fn elements_by_tag(&self, tags: &[&str], limit: usize) -> Vec<&Element>;
}

/// Flat snapshot holding elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDocument {
    elements: Vec<Element>,
}

impl StaticDocument {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl DocumentSnapshot for StaticDocument {
    fn first_with_attribute_containing(&self, attribute: &str, needle: &str) -> Option<&Element> {
        self.elements.iter().find(|element| {
            element
                .attribute(attribute)
                .is_some_and(|value| value.contains(needle))
        })
    }

    fn elements_by_tag(&self, tags: &[&str], limit: usize) -> Vec<&Element> {
        self.elements
            .iter()
            .filter(|element| tags.iter().any(|tag| element.tag.eq_ignore_ascii_case(tag)))
            .take(limit)
            .collect()
    }
}
