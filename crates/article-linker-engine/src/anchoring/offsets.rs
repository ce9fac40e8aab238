//! Translation between original (marker-free) offsets and live markup
//! offsets.
//!
//! Every marker tag written into a container is recorded here as a
//! [`Shift`]: the original offset it sits at, which edge of the marker it is,
//! and its serialized length. Shifts are kept ordered by `(at, edge)` with
//! closing tags before opening tags at the same offset, which is exactly the
//! order the tags appear in the live markup.

use std::collections::HashMap;

use crate::ids::{ContainerId, GroupId};

/// Which side of a marker a tag belongs to.
///
/// The derived order puts `Close` first: at a shared offset a finished
/// marker closes before the next one opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Edge {
    Close,
    Open,
}

/// One inserted tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    /// Original offset the tag sits at.
    pub at: usize,
    pub edge: Edge,
    /// Serialized length of the tag.
    pub len: usize,
    pub group: GroupId,
}

impl Shift {
    fn key(&self) -> (usize, Edge) {
        (self.at, self.edge)
    }
}

/// Per-container lag bookkeeping. Pure data, no markup access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTracker {
    shifts: HashMap<ContainerId, Vec<Shift>>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Net length currently inserted into `container`.
    pub fn lag(&self, container: &ContainerId) -> usize {
        self.shifts
            .get(container)
            .map(|shifts| shifts.iter().map(|s| s.len).sum())
            .unwrap_or(0)
    }

    /// Record a tag insertion.
    pub fn advance(&mut self, container: &ContainerId, shift: Shift) {
        let shifts = self.shifts.entry(container.clone()).or_default();
        let index = shifts.partition_point(|s| s.key() < shift.key());
        shifts.insert(index, shift);
    }

    /// Change the recorded length of the tag at `(at, edge)`.
    ///
    /// Returns the signed length delta, or `None` if no such tag exists.
    pub fn resize(
        &mut self,
        container: &ContainerId,
        at: usize,
        edge: Edge,
        len: usize,
    ) -> Option<isize> {
        let shift = self
            .shifts
            .get_mut(container)?
            .iter_mut()
            .find(|s| s.at == at && s.edge == edge)?;
        let delta = len as isize - shift.len as isize;
        shift.len = len;
        Some(delta)
    }

    /// Drop every tag of `group` in `container`, returning the removed length.
    pub fn release(&mut self, container: &ContainerId, group: &GroupId) -> usize {
        let Some(shifts) = self.shifts.get_mut(container) else {
            return 0;
        };
        let before: usize = shifts.iter().map(|s| s.len).sum();
        shifts.retain(|s| &s.group != group);
        let after: usize = shifts.iter().map(|s| s.len).sum();
        if shifts.is_empty() {
            self.shifts.remove(container);
        }
        before - after
    }

    /// Forget everything recorded for `container`.
    pub fn reset(&mut self, container: &ContainerId) {
        self.shifts.remove(container);
    }

    pub fn shifts(&self, container: &ContainerId) -> &[Shift] {
        self.shifts.get(container).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Live offset of a tag with the given edge placed at original offset `at`.
    ///
    /// For a tag already recorded this is where its text starts.
    pub fn live_offset(&self, container: &ContainerId, at: usize, edge: Edge) -> usize {
        let key = (at, edge);
        at + self
            .shifts(container)
            .iter()
            .take_while(|s| s.key() < key)
            .map(|s| s.len)
            .sum::<usize>()
    }

    /// Original offset of live offset `live`.
    ///
    /// A live offset that falls inside a tag maps to the original offset the
    /// tag sits at.
    pub fn original_offset(&self, container: &ContainerId, live: usize) -> usize {
        let mut lag = 0;
        for shift in self.shifts(container) {
            let tag_start = shift.at + lag;
            if live <= tag_start {
                break;
            }
            if live < tag_start + shift.len {
                return shift.at;
            }
            lag += shift.len;
        }
        live - lag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shift(at: usize, edge: Edge, len: usize, group: &str) -> Shift {
        Shift {
            at,
            edge,
            len,
            group: GroupId::new(group),
        }
    }

    fn c1() -> ContainerId {
        ContainerId::new("c1")
    }

    #[test]
    fn test_empty_tracker_is_identity() {
        let tracker = OffsetTracker::new();
        assert_eq!(tracker.lag(&c1()), 0);
        assert_eq!(tracker.live_offset(&c1(), 7, Edge::Open), 7);
        assert_eq!(tracker.original_offset(&c1(), 7), 7);
    }

    #[test]
    fn test_later_marker_is_shifted_by_earlier_one() {
        // "say hello world" with [4,9) wrapped by a 10 byte open and 4 byte close
        let mut tracker = OffsetTracker::new();
        tracker.advance(&c1(), shift(4, Edge::Open, 10, "a"));
        tracker.advance(&c1(), shift(9, Edge::Close, 4, "a"));

        assert_eq!(tracker.lag(&c1()), 14);
        assert_eq!(tracker.live_offset(&c1(), 2, Edge::Open), 2);
        assert_eq!(tracker.live_offset(&c1(), 10, Edge::Open), 24);
        // a marker opening where another closes goes after the close tag
        assert_eq!(tracker.live_offset(&c1(), 9, Edge::Open), 23);
        // a marker closing where another opens goes before the open tag
        assert_eq!(tracker.live_offset(&c1(), 4, Edge::Close), 4);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut forward = OffsetTracker::new();
        forward.advance(&c1(), shift(0, Edge::Open, 5, "a"));
        forward.advance(&c1(), shift(3, Edge::Close, 4, "a"));
        forward.advance(&c1(), shift(3, Edge::Open, 5, "b"));
        forward.advance(&c1(), shift(6, Edge::Close, 4, "b"));

        let mut backward = OffsetTracker::new();
        backward.advance(&c1(), shift(6, Edge::Close, 4, "b"));
        backward.advance(&c1(), shift(3, Edge::Open, 5, "b"));
        backward.advance(&c1(), shift(3, Edge::Close, 4, "a"));
        backward.advance(&c1(), shift(0, Edge::Open, 5, "a"));

        assert_eq!(forward.shifts(&c1()), backward.shifts(&c1()));
    }

    #[test]
    fn test_original_offset_inverts_live_offset() {
        let mut tracker = OffsetTracker::new();
        tracker.advance(&c1(), shift(4, Edge::Open, 10, "a"));
        tracker.advance(&c1(), shift(9, Edge::Close, 4, "a"));

        assert_eq!(tracker.original_offset(&c1(), 3), 3);
        assert_eq!(tracker.original_offset(&c1(), 4), 4);
        // inside the open tag
        assert_eq!(tracker.original_offset(&c1(), 8), 4);
        // first byte of wrapped text
        assert_eq!(tracker.original_offset(&c1(), 14), 4);
        assert_eq!(tracker.original_offset(&c1(), 19), 9);
        // inside the close tag
        assert_eq!(tracker.original_offset(&c1(), 21), 9);
        assert_eq!(tracker.original_offset(&c1(), 23), 9);
        assert_eq!(tracker.original_offset(&c1(), 29), 15);
    }

    #[test]
    fn test_release_and_resize() {
        let mut tracker = OffsetTracker::new();
        tracker.advance(&c1(), shift(0, Edge::Open, 5, "a"));
        tracker.advance(&c1(), shift(2, Edge::Close, 4, "a"));
        tracker.advance(&c1(), shift(5, Edge::Open, 5, "b"));
        tracker.advance(&c1(), shift(8, Edge::Close, 4, "b"));

        assert_eq!(tracker.resize(&c1(), 5, Edge::Open, 9), Some(4));
        assert_eq!(tracker.lag(&c1()), 22);
        assert_eq!(tracker.release(&c1(), &GroupId::new("a")), 9);
        assert_eq!(tracker.lag(&c1()), 13);
        assert_eq!(tracker.live_offset(&c1(), 5, Edge::Open), 5);

        tracker.reset(&c1());
        assert_eq!(tracker.lag(&c1()), 0);
        assert!(tracker.shifts(&c1()).is_empty());
    }
}
