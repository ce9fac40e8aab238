//! Writes and strips marker markup.
//!
//! All edits are splices at positions derived from the
//! [`OffsetTracker`](super::offsets::OffsetTracker); the writer never searches
//! the markup text for marker literals, so content that happens to look like
//! a marker cannot confuse it.

use html_escape::encode_double_quoted_attribute;

use crate::anchoring::offsets::{Edge, Shift};
use crate::document::{Container, Document, MarkerRecord, MarkerState};
use crate::error::{Corruption, LinkError, NotFound};
use crate::ids::{ContainerId, GroupId, ResourceId};
use crate::links::{Anchor, Rgb};

pub const PENDING_CLASS: &str = "resource-anchor-pending";
pub const COMMITTED_CLASS: &str = "resource-anchor";
const CLOSE_TAG: &str = "</a>";

/// Attributes carried by a marker's opening tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerAttrs {
    pub group: GroupId,
    pub state: MarkerState,
}

impl MarkerAttrs {
    pub fn pending(group: GroupId) -> Self {
        Self {
            group,
            state: MarkerState::Pending,
        }
    }

    pub fn committed(group: GroupId, resource: ResourceId, color: Option<Rgb>) -> Self {
        Self {
            group,
            state: MarkerState::Committed { resource, color },
        }
    }
}

/// Render the opening tag of a marker over original range `begin..end`.
pub fn open_tag(attrs: &MarkerAttrs, begin: usize, end: usize) -> String {
    let group = encode_double_quoted_attribute(attrs.group.as_str());
    match &attrs.state {
        MarkerState::Pending => format!(
            r#"<a class="{PENDING_CLASS} groupId-{group}" data-beg="{begin}" data-end="{end}">"#
        ),
        MarkerState::Committed { resource, color } => {
            let resource = encode_double_quoted_attribute(resource.as_str());
            let style = color
                .map(|c| format!(r#" style="border-bottom-color: {c}""#))
                .unwrap_or_default();
            format!(
                r#"<a class="{COMMITTED_CLASS} groupId-{group} resourceId-{resource}" data-beg="{begin}" data-end="{end}"{style}>"#
            )
        }
    }
}

/// Mutates container markup on behalf of the linker.
pub struct MarkupAnchorWriter<'a> {
    document: &'a mut Document,
}

impl<'a> MarkupAnchorWriter<'a> {
    pub fn new(document: &'a mut Document) -> Self {
        Self { document }
    }

    /// Wrap original range `begin..end` of `container` in a marker.
    ///
    /// Returns the serialized length added to the container.
    pub fn insert_marker(
        &mut self,
        container: &ContainerId,
        begin: usize,
        end: usize,
        attrs: MarkerAttrs,
    ) -> Result<usize, LinkError> {
        let (live_begin, live_end) = self.live_range(container, begin, end, &attrs.group)?;

        let open = open_tag(&attrs, begin, end);
        let open_len = open.len();
        let target = self
            .document
            .container_mut(container)
            .ok_or_else(|| NotFound::Container(container.clone()))?;

        // Close first so the open position stays valid.
        target.markup.insert_str(live_end, CLOSE_TAG);
        target.markup.insert_str(live_begin, &open);
        let index = target.markers.partition_point(|m| m.begin < begin);
        target.markers.insert(
            index,
            MarkerRecord {
                group: attrs.group.clone(),
                begin,
                end,
                state: attrs.state,
            },
        );

        let tracker = &mut self.document.tracker;
        tracker.advance(
            container,
            Shift {
                at: begin,
                edge: Edge::Open,
                len: open_len,
                group: attrs.group.clone(),
            },
        );
        tracker.advance(
            container,
            Shift {
                at: end,
                edge: Edge::Close,
                len: CLOSE_TAG.len(),
                group: attrs.group.clone(),
            },
        );

        log::debug!(
            "inserted marker {} in {container} at {begin}..{end} (live {live_begin}..{live_end})",
            attrs.group
        );
        Ok(open_len + CLOSE_TAG.len())
    }

    /// Strip every marker of `group` from `container`, keeping inner content.
    ///
    /// Returns the number of bytes removed.
    pub fn remove_marker(
        &mut self,
        container: &ContainerId,
        group: &GroupId,
    ) -> Result<usize, LinkError> {
        let tracker = &self.document.tracker;
        let mut spans: Vec<(usize, usize)> = tracker
            .shifts(container)
            .iter()
            .filter(|s| &s.group == group)
            .map(|s| (tracker.live_offset(container, s.at, s.edge), s.len))
            .collect();
        if spans.is_empty() {
            return Err(NotFound::Marker {
                container: container.clone(),
                group: group.clone(),
            }
            .into());
        }

        let target = self
            .document
            .container_mut(container)
            .ok_or_else(|| NotFound::Container(container.clone()))?;
        spans.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        for &(start, len) in &spans {
            target.markup.replace_range(start..start + len, "");
        }
        target.markers.retain(|m| &m.group != group);

        let removed = self.document.tracker.release(container, group);
        log::debug!("removed marker {group} from {container} ({removed} bytes)");
        Ok(removed)
    }

    /// Attach `resource` to every pending marker, turning them committed.
    ///
    /// Returns the anchors that were committed, in reading order.
    pub fn commit_pending(
        &mut self,
        resource: &ResourceId,
        color: Option<Rgb>,
    ) -> Result<Vec<Anchor>, LinkError> {
        let mut committed = Vec::new();
        for id in self.containers_with_pending() {
            let tracker = &self.document.tracker;
            let container = self
                .document
                .container(&id)
                .ok_or_else(|| NotFound::Container(id.clone()))?;

            // (live start, old len, original begin, new tag), last first
            let mut rewrites: Vec<(usize, usize, usize, String)> = container
                .markers
                .iter()
                .filter(|m| m.state.is_pending())
                .map(|m| {
                    let shift_len = tracker
                        .shifts(&id)
                        .iter()
                        .find(|s| s.group == m.group && s.edge == Edge::Open)
                        .map(|s| s.len)
                        .unwrap_or(0);
                    let attrs = MarkerAttrs::committed(m.group.clone(), resource.clone(), color);
                    (
                        tracker.live_offset(&id, m.begin, Edge::Open),
                        shift_len,
                        m.begin,
                        open_tag(&attrs, m.begin, m.end),
                    )
                })
                .collect();
            rewrites.sort_unstable_by(|a, b| b.0.cmp(&a.0));

            let target = self
                .document
                .container_mut(&id)
                .ok_or_else(|| NotFound::Container(id.clone()))?;
            for (start, old_len, _, tag) in &rewrites {
                target.markup.replace_range(*start..*start + *old_len, tag);
            }
            for marker in target.markers.iter_mut().filter(|m| m.state.is_pending()) {
                marker.state = MarkerState::Committed {
                    resource: resource.clone(),
                    color,
                };
                committed.push(Anchor::new(id.clone(), marker.begin, marker.end));
            }
            for (_, _, begin, tag) in rewrites {
                self.document.tracker.resize(&id, begin, Edge::Open, tag.len());
            }
        }
        log::debug!("committed {} pending anchors to {resource}", committed.len());
        Ok(committed)
    }

    /// Remove every pending marker, restoring the pre-selection markup.
    pub fn discard_pending(&mut self) -> Result<usize, LinkError> {
        let mut removed = 0;
        for id in self.containers_with_pending() {
            let groups: Vec<GroupId> = self
                .document
                .container(&id)
                .map(|c| {
                    let mut groups: Vec<GroupId> = c
                        .markers
                        .iter()
                        .filter(|m| m.state.is_pending())
                        .map(|m| m.group.clone())
                        .collect();
                    groups.dedup();
                    groups
                })
                .unwrap_or_default();
            for group in groups {
                removed += self.remove_marker(&id, &group)?;
            }
        }
        Ok(removed)
    }

    /// Strip every marker from every container, pending or committed.
    ///
    /// Returns the number of bytes removed.
    pub fn clear_markers(&mut self) -> usize {
        let marked: Vec<ContainerId> = self
            .document
            .containers()
            .iter()
            .filter(|c| c.has_markers())
            .map(Container::id)
            .cloned()
            .collect();

        let mut removed = 0;
        for id in marked {
            let Some(original) = self.document.original_markup(&id) else {
                continue;
            };
            if let Some(target) = self.document.container_mut(&id) {
                removed += target.markup.len() - original.len();
                target.markup = original;
                target.markers.clear();
            }
            self.document.tracker.reset(&id);
        }
        removed
    }

    fn containers_with_pending(&self) -> Vec<ContainerId> {
        self.document
            .containers()
            .iter()
            .filter(|c| c.markers.iter().any(|m| m.state.is_pending()))
            .map(Container::id)
            .cloned()
            .collect()
    }

    /// Validate an original range and translate it to live offsets.
    fn live_range(
        &self,
        container: &ContainerId,
        begin: usize,
        end: usize,
        group: &GroupId,
    ) -> Result<(usize, usize), LinkError> {
        let corrupt = |reason| LinkError::CorruptState {
            group: group.clone(),
            reason,
        };
        let target = self
            .document
            .container(container)
            .ok_or_else(|| corrupt(Corruption::UnknownContainer(container.clone())))?;
        if begin >= end {
            return Err(corrupt(Corruption::EmptyRange {
                container: container.clone(),
                begin,
                end,
            }));
        }
        if end > target.original_len {
            return Err(corrupt(Corruption::OffsetOutOfRange {
                container: container.clone(),
                begin,
                end,
                len: target.original_len,
            }));
        }

        let tracker = &self.document.tracker;
        let live_begin = tracker.live_offset(container, begin, Edge::Open);
        let live_end = tracker.live_offset(container, end, Edge::Close);
        for (offset, live) in [(begin, live_begin), (end, live_end)] {
            if !target.markup.is_char_boundary(live) {
                return Err(corrupt(Corruption::SplitsCharacter {
                    container: container.clone(),
                    offset,
                }));
            }
        }
        Ok((live_begin, live_end))
    }
}
