//! Authoritative link bookkeeping.
//!
//! [`LinkStateStore`] owns the [`LinkState`] and the single pending link.
//! A link moves through `Idle -> Pending -> Committed | Cancelled`, after
//! which the store is idle again. The store never touches markup; the
//! [`Linker`](crate::Linker) issues the matching writer calls.

use crate::error::{LinkError, NotFound};
use crate::ids::{ContainerId, GroupId, ResourceId};
use crate::links::{Anchor, Link, LinkState};

/// Where the pending-link state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Idle,
    Pending,
}

#[derive(Debug, Clone, Default)]
enum Pending {
    #[default]
    Idle,
    Awaiting {
        group: GroupId,
        anchors: Vec<Anchor>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct LinkStateStore {
    state: LinkState,
    pending: Pending,
}

impl LinkStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn phase(&self) -> LinkPhase {
        match self.pending {
            Pending::Idle => LinkPhase::Idle,
            Pending::Awaiting { .. } => LinkPhase::Pending,
        }
    }

    pub fn pending_group(&self) -> Option<&GroupId> {
        match &self.pending {
            Pending::Idle => None,
            Pending::Awaiting { group, .. } => Some(group),
        }
    }

    pub fn pending_anchors(&self) -> &[Anchor] {
        match &self.pending {
            Pending::Idle => &[],
            Pending::Awaiting { anchors, .. } => anchors,
        }
    }

    /// Hold `anchors` under a freshly allocated group until a resource is
    /// chosen.
    ///
    /// Only one link may be pending; any previous pending group is dropped.
    pub fn begin_pending(&mut self, anchors: Vec<Anchor>) -> GroupId {
        let group = GroupId::generate();
        if let Some(previous) = self.pending_group() {
            log::debug!("dropping pending group {previous} for {group}");
        }
        self.pending = Pending::Awaiting {
            group: group.clone(),
            anchors,
        };
        group
    }

    /// Move the pending anchors of `group` under `resource`.
    pub fn confirm(&mut self, group: &GroupId, resource: &ResourceId) -> Result<Link, LinkError> {
        match std::mem::take(&mut self.pending) {
            Pending::Awaiting {
                group: pending,
                anchors,
            } if &pending == group => {
                self.state.insert(resource, pending.clone(), anchors.clone());
                Ok(Link {
                    resource: resource.clone(),
                    group: pending,
                    anchors,
                })
            }
            other => {
                self.pending = other;
                Err(NotFound::Group(group.clone()).into())
            }
        }
    }

    /// Drop the pending group without touching the link state.
    pub fn cancel_pending(&mut self) -> Option<(GroupId, Vec<Anchor>)> {
        match std::mem::take(&mut self.pending) {
            Pending::Idle => None,
            Pending::Awaiting { group, anchors } => Some((group, anchors)),
        }
    }

    /// Register a resource that has no links yet.
    pub fn add_resource(&mut self, resource: &ResourceId) {
        self.state.ensure_resource(resource);
    }

    /// Record a link as-is, without overlap detection.
    pub fn register(&mut self, link: Link) {
        self.state.insert(&link.resource, link.group, link.anchors);
    }

    pub fn remove_link(&mut self, group: &GroupId) -> Result<Link, LinkError> {
        let (resource, anchors) = self
            .state
            .remove_group(group)
            .ok_or_else(|| NotFound::Group(group.clone()))?;
        Ok(Link {
            resource,
            group: group.clone(),
            anchors,
        })
    }

    /// Remove every group under `resource`, then the resource itself.
    pub fn remove_resource(&mut self, resource: &ResourceId) -> Result<Vec<Link>, LinkError> {
        let groups: Vec<GroupId> = self
            .state
            .groups(resource)
            .ok_or_else(|| NotFound::Resource(resource.clone()))?
            .keys()
            .cloned()
            .collect();

        let removed = groups
            .iter()
            .map(|group| self.remove_link(group))
            .collect::<Result<Vec<_>, _>>()?;
        self.state.remove_resource(resource);
        Ok(removed)
    }

    /// Whether any committed anchor in `container` intersects `[begin, end)`.
    pub fn overlaps(&self, container: &ContainerId, begin: usize, end: usize) -> bool {
        self.find_overlap(container, begin, end).is_some()
    }

    pub fn find_overlap(&self, container: &ContainerId, begin: usize, end: usize) -> Option<&GroupId> {
        self.state
            .anchors_with_groups()
            .find(|(_, anchor)| anchor.intersects(container, begin, end))
            .map(|(group, _)| group)
    }

    /// Drop every link and the pending group.
    pub fn clear(&mut self) {
        self.state = LinkState::new();
        self.pending = Pending::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn r1() -> ResourceId {
        ResourceId::new("r1")
    }

    #[test]
    fn test_confirm_moves_pending_into_state() {
        let mut store = LinkStateStore::new();
        let group = store.begin_pending(vec![Anchor::new("c1", 4, 9)]);
        assert_eq!(store.phase(), LinkPhase::Pending);
        assert!(store.state().is_empty());

        let link = store.confirm(&group, &r1()).unwrap();

        assert_eq!(store.phase(), LinkPhase::Idle);
        assert_eq!(link.anchors, vec![Anchor::new("c1", 4, 9)]);
        assert_eq!(store.state().resource_of(&group), Some(&r1()));
    }

    #[test]
    fn test_confirm_wrong_group_keeps_pending() {
        let mut store = LinkStateStore::new();
        let group = store.begin_pending(vec![Anchor::new("c1", 0, 2)]);

        let result = store.confirm(&GroupId::new("other"), &r1());

        assert!(matches!(result, Err(LinkError::NotFound(_))));
        assert_eq!(store.pending_group(), Some(&group));
    }

    #[test]
    fn test_cancel_leaves_state_untouched() {
        let mut store = LinkStateStore::new();
        let group = store.begin_pending(vec![Anchor::new("c1", 0, 2)]);

        let (cancelled, anchors) = store.cancel_pending().unwrap();

        assert_eq!(cancelled, group);
        assert_eq!(anchors.len(), 1);
        assert_eq!(store.phase(), LinkPhase::Idle);
        assert!(store.state().is_empty());
        assert!(store.cancel_pending().is_none());
    }

    #[test]
    fn test_new_pending_replaces_previous() {
        let mut store = LinkStateStore::new();
        let first = store.begin_pending(vec![Anchor::new("c1", 0, 2)]);
        let second = store.begin_pending(vec![Anchor::new("c1", 3, 5)]);

        assert_ne!(first, second);
        assert_eq!(store.pending_group(), Some(&second));
        assert_eq!(store.pending_anchors(), &[Anchor::new("c1", 3, 5)]);
    }

    #[test]
    fn test_overlap_ignores_pending_and_touching_ranges() {
        let mut store = LinkStateStore::new();
        let group = store.begin_pending(vec![Anchor::new("c1", 4, 9)]);
        let c1 = ContainerId::new("c1");
        assert!(!store.overlaps(&c1, 4, 9));

        store.confirm(&group, &r1()).unwrap();

        assert!(store.overlaps(&c1, 4, 9));
        assert!(store.overlaps(&c1, 0, 5));
        assert!(!store.overlaps(&c1, 9, 12));
        assert!(!store.overlaps(&ContainerId::new("c2"), 4, 9));
    }

    #[test]
    fn test_remove_link_unknown_group() {
        let mut store = LinkStateStore::new();
        let err = store.remove_link(&GroupId::new("ghost")).unwrap_err();
        assert_eq!(err, LinkError::NotFound(NotFound::Group(GroupId::new("ghost"))));
    }

    #[test]
    fn test_remove_resource_cascades() {
        let mut store = LinkStateStore::new();
        for range in [(0, 2), (5, 7)] {
            let group = store.begin_pending(vec![Anchor::new("c1", range.0, range.1)]);
            store.confirm(&group, &r1()).unwrap();
        }
        let other = store.begin_pending(vec![Anchor::new("c2", 0, 1)]);
        store.confirm(&other, &ResourceId::new("r2")).unwrap();

        let removed = store.remove_resource(&r1()).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!store.state().contains_resource(&r1()));
        assert_eq!(store.state().link_count(), 1);
        assert!(matches!(
            store.remove_resource(&r1()),
            Err(LinkError::NotFound(NotFound::Resource(_)))
        ));
    }

    #[test]
    fn test_registered_empty_resource_can_be_removed() {
        let mut store = LinkStateStore::new();
        store.add_resource(&r1());
        assert!(store.remove_resource(&r1()).unwrap().is_empty());
    }
}
