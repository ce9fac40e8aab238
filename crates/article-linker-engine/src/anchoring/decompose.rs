//! Splitting a raw selection into anchors.
//!
//! A selection is given as two live markup positions, possibly in different
//! containers. Every container it touches contributes a segment; segments
//! that start or end inside an inline span are split further so that no
//! anchor straddles a tag boundary it does not fully contain.

use std::ops::Range;

use crate::document::markup::{is_balanced, tag_containing, text_runs, tokenize};
use crate::document::{Container, Document};
use crate::error::{InvalidSelection, LinkError};
use crate::ids::ContainerId;
use crate::links::{Anchor, LinkStateStore};

/// A position in a container's live markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub container: ContainerId,
    /// Live markup offset. [`Boundary::END`] addresses the end of the
    /// container whatever its current length.
    pub offset: usize,
}

impl Boundary {
    pub const END: usize = usize::MAX;

    pub fn new(container: impl Into<ContainerId>, offset: usize) -> Self {
        Self {
            container: container.into(),
            offset,
        }
    }
}

/// A user selection as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSelection {
    pub start: Boundary,
    pub end: Boundary,
}

impl RawSelection {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Select the whole of one container.
    pub fn container(id: impl Into<ContainerId>) -> Self {
        let id = id.into();
        Self {
            start: Boundary::new(id.clone(), 0),
            end: Boundary::new(id, Boundary::END),
        }
    }
}

/// Bounds on the serialized length of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    /// Minimum number of non-whitespace characters.
    pub min_chars: usize,
    /// Maximum number of characters.
    pub max_chars: usize,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            min_chars: 1,
            max_chars: 20_000,
        }
    }
}

/// A resolved endpoint: reading-order position plus live offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Position {
    container: usize,
    offset: usize,
}

#[derive(Debug, Default)]
pub struct SelectionDecomposer {
    limits: SelectionLimits,
}

impl SelectionDecomposer {
    pub fn new(limits: SelectionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SelectionLimits {
        &self.limits
    }

    /// Turn `selection` into anchors in original offsets, in reading order.
    ///
    /// Fails without side effects if the selection is invalid or touches
    /// any committed link in `store`.
    pub fn decompose(
        &self,
        document: &Document,
        store: &LinkStateStore,
        selection: &RawSelection,
    ) -> Result<Vec<Anchor>, LinkError> {
        let mut start = resolve(document, &selection.start)?;
        let mut end = resolve(document, &selection.end)?;
        if end < start {
            std::mem::swap(&mut start, &mut end);
        }
        if start == end {
            return Err(InvalidSelection::Empty.into());
        }

        let segments = segments(document, start, end);
        self.check_length(&segments)?;

        let mut anchors = Vec::new();
        for (container, range) in &segments {
            for piece in split_segment(container.markup(), range.clone()) {
                let begin = document.to_original(container.id(), piece.start);
                let end = document.to_original(container.id(), piece.end);
                if begin < end {
                    log::debug!("selection piece {}:{begin}..{end}", container.id());
                    anchors.push(Anchor::new(container.id().clone(), begin, end));
                }
            }
        }
        if anchors.is_empty() {
            return Err(InvalidSelection::Empty.into());
        }

        check_overlap(store, &anchors)?;
        Ok(anchors)
    }

    fn check_length(&self, segments: &[(&Container, Range<usize>)]) -> Result<(), LinkError> {
        let text = || {
            segments
                .iter()
                .flat_map(|(container, range)| container.markup()[range.clone()].chars())
        };
        let found = text().count();
        if found > self.limits.max_chars {
            return Err(InvalidSelection::TooLong {
                found,
                max: self.limits.max_chars,
            }
            .into());
        }
        let visible = text().filter(|c| !c.is_whitespace()).count();
        if visible == 0 {
            return Err(InvalidSelection::Empty.into());
        }
        if visible < self.limits.min_chars {
            return Err(InvalidSelection::TooShort {
                found: visible,
                min: self.limits.min_chars,
            }
            .into());
        }
        Ok(())
    }
}

fn resolve(document: &Document, boundary: &Boundary) -> Result<Position, LinkError> {
    let unknown = || InvalidSelection::UnknownContainer(boundary.container.clone());
    let container = document.container(&boundary.container).ok_or_else(unknown)?;
    let index = document.position(&boundary.container).ok_or_else(unknown)?;

    let markup = container.markup();
    let offset = if boundary.offset == Boundary::END {
        markup.len()
    } else {
        boundary.offset
    };
    if offset > markup.len() || !markup.is_char_boundary(offset) {
        return Err(InvalidSelection::OffsetOutOfRange {
            container: boundary.container.clone(),
            offset: boundary.offset,
        }
        .into());
    }
    Ok(Position {
        container: index,
        offset,
    })
}

/// Live ranges covered by the selection, one per container.
fn segments(document: &Document, start: Position, end: Position) -> Vec<(&Container, Range<usize>)> {
    document.containers()[start.container..=end.container]
        .iter()
        .enumerate()
        .map(|(i, container)| {
            let index = start.container + i;
            let from = if index == start.container { start.offset } else { 0 };
            let to = if index == end.container {
                end.offset
            } else {
                container.markup().len()
            };
            (container, from..to)
        })
        .filter(|(_, range)| range.start < range.end)
        .collect()
}

/// Split one container segment at span boundaries.
fn split_segment(markup: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let tokens = tokenize(markup);

    let mut range = range;
    if let Some(tag) = tag_containing(&tokens, range.start) {
        range.start = tag.span.end;
    }
    if let Some(tag) = tag_containing(&tokens, range.end) {
        range.end = tag.span.start;
    }
    if range.start >= range.end {
        return Vec::new();
    }

    if is_balanced(&tokens, &range) {
        vec![range]
    } else {
        text_runs(&tokens, &range)
    }
}

/// Reject pieces that sit inside, or cut into, committed links.
fn check_overlap(store: &LinkStateStore, anchors: &[Anchor]) -> Result<(), LinkError> {
    let covering = |anchor: &Anchor| {
        store
            .state()
            .anchors_with_groups()
            .find(|(_, existing)| existing.covers(&anchor.container_id, anchor.begin, anchor.end))
            .map(|(group, _)| group.clone())
    };
    let covered: Option<Vec<_>> = anchors.iter().map(covering).collect();
    if let Some(group) = covered.and_then(|groups| groups.into_iter().next()) {
        return Err(InvalidSelection::AlreadyLinked(group).into());
    }

    for anchor in anchors {
        if let Some(existing) = store.find_overlap(&anchor.container_id, anchor.begin, anchor.end)
        {
            return Err(LinkError::Overlap {
                container: anchor.container_id.clone(),
                begin: anchor.begin,
                end: anchor.end,
                existing: existing.clone(),
            });
        }
    }
    Ok(())
}
