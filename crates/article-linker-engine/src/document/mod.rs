//! The container content model.
//!
//! A [`Document`] is an ordered list of [`Container`]s, each holding its live
//! raw markup. Marker markup is only ever written through
//! [`MarkupAnchorWriter`](crate::anchoring::MarkupAnchorWriter), which keeps
//! the container's marker ledger and the document's
//! [`OffsetTracker`] in step with the markup text.

pub mod markup;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::anchoring::offsets::{Edge, OffsetTracker};
pub use crate::ids::ContainerId;
use crate::ids::{GroupId, ResourceId};
use crate::links::Rgb;

/// Whether a marker is awaiting a resource or attached to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerState {
    Pending,
    Committed {
        resource: ResourceId,
        color: Option<Rgb>,
    },
}

impl MarkerState {
    pub fn is_pending(&self) -> bool {
        matches!(self, MarkerState::Pending)
    }
}

/// A marker currently written into a container, in original offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRecord {
    pub group: GroupId,
    pub begin: usize,
    pub end: usize,
    pub state: MarkerState,
}

impl MarkerRecord {
    pub fn contains(&self, begin: usize, end: usize) -> bool {
        self.begin <= begin && end <= self.end
    }
}

/// An addressable unit of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub(crate) id: ContainerId,
    pub(crate) markup: String,
    pub(crate) original_len: usize,
    pub(crate) markers: Vec<MarkerRecord>,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>, markup: impl Into<String>) -> Self {
        let markup = markup.into();
        Self {
            id: id.into(),
            original_len: markup.len(),
            markup,
            markers: Vec::new(),
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Live markup, including any markers.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Length of the marker-free content.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Markers ordered by original begin offset.
    pub fn markers(&self) -> &[MarkerRecord] {
        &self.markers
    }

    pub fn has_markers(&self) -> bool {
        !self.markers.is_empty()
    }
}

/// Finds containers from stored locator strings and back.
pub trait ContainerResolver {
    fn resolve(&self, locator: &str) -> Option<&Container>;

    fn locate(&self, container: &Container) -> ContainerId {
        container.id().clone()
    }

    /// Reading-order position of the container.
    fn position(&self, locator: &str) -> Option<usize>;
}

/// Serialized form of a container as read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSource {
    pub id: ContainerId,
    pub markup: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSource {
    pub containers: Vec<ContainerSource>,
}

/// Ordered containers plus the offset bookkeeping for their markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    containers: Vec<Container>,
    index: HashMap<ContainerId, usize>,
    pub(crate) tracker: OffsetTracker,
}

impl Document {
    pub fn new(containers: impl IntoIterator<Item = Container>) -> Self {
        let containers: Vec<Container> = containers.into_iter().collect();
        let index = containers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Self {
            containers,
            index,
            tracker: OffsetTracker::new(),
        }
    }

    pub fn from_source(source: DocumentSource) -> Self {
        Self::new(
            source
                .containers
                .into_iter()
                .map(|c| Container::new(c.id, c.markup)),
        )
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.index.get(id).map(|&i| &self.containers[i])
    }

    pub(crate) fn container_mut(&mut self, id: &ContainerId) -> Option<&mut Container> {
        self.index.get(id).map(|&i| &mut self.containers[i])
    }

    pub fn position(&self, id: &ContainerId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn tracker(&self) -> &OffsetTracker {
        &self.tracker
    }

    /// Live markup offset of an original offset in `container`.
    pub fn to_live(&self, container: &ContainerId, original: usize) -> usize {
        self.tracker.live_offset(container, original, Edge::Open)
    }

    /// Original offset of a live markup offset in `container`.
    pub fn to_original(&self, container: &ContainerId, live: usize) -> usize {
        self.tracker.original_offset(container, live)
    }

    /// The container's markup with every marker tag stripped.
    pub fn original_markup(&self, id: &ContainerId) -> Option<String> {
        let container = self.container(id)?;
        let mut original = String::with_capacity(container.original_len);
        let mut cursor = 0;
        for shift in self.tracker.shifts(id) {
            let start = self.tracker.live_offset(id, shift.at, shift.edge);
            original.push_str(&container.markup[cursor..start]);
            cursor = start + shift.len;
        }
        original.push_str(&container.markup[cursor..]);
        Some(original)
    }

    /// Every container with its live markup, in reading order.
    pub fn to_source(&self) -> DocumentSource {
        DocumentSource {
            containers: self
                .containers
                .iter()
                .map(|c| ContainerSource {
                    id: c.id.clone(),
                    markup: c.markup.clone(),
                })
                .collect(),
        }
    }
}

impl ContainerResolver for Document {
    fn resolve(&self, locator: &str) -> Option<&Container> {
        self.container(&ContainerId::new(locator))
    }

    fn position(&self, locator: &str) -> Option<usize> {
        Document::position(self, &ContainerId::new(locator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_containers_keep_reading_order() {
        let doc = sample_document();
        let ids: Vec<&str> = doc.containers().iter().map(|c| c.id().as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(doc.position(&ContainerId::new("c2")), Some(1));
        assert_eq!(doc.position(&ContainerId::new("nope")), None);
    }

    #[test]
    fn test_resolver_finds_by_locator() {
        let doc = sample_document();
        let container = doc.resolve("c1").unwrap();
        assert_eq!(container.markup(), "say hello world");
        assert_eq!(doc.locate(container), ContainerId::new("c1"));
        assert!(doc.resolve("missing").is_none());
    }

    #[test]
    fn test_original_markup_without_markers_is_live_markup() {
        let doc = sample_document();
        let id = ContainerId::new("c2");
        assert_eq!(
            doc.original_markup(&id).unwrap(),
            doc.container(&id).unwrap().markup()
        );
    }
}
