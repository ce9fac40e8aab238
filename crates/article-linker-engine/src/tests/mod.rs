//! Shared fixtures for unit tests.

use crate::document::{Container, Document};
use crate::ids::ContainerId;

pub fn c(id: &str) -> ContainerId {
    ContainerId::new(id)
}

/// Three containers: plain text, a leading span, and nested spans.
///
/// ```text
/// c1  say hello world
/// c2  <span>first</span> line
/// c3  intro <b>bold <i>deep</i> text</b> outro
/// ```
pub fn sample_document() -> Document {
    Document::new([
        Container::new("c1", "say hello world"),
        Container::new("c2", "<span>first</span> line"),
        Container::new("c3", "intro <b>bold <i>deep</i> text</b> outro"),
    ])
}
