use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::{ContainerId, GroupId, ResourceId};

/// An offset range in a container's original (marker-free) content.
///
/// Invariant: `begin < end <= original length of the container`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    #[serde(alias = "id")]
    pub container_id: ContainerId,
    #[serde(alias = "beg")]
    pub begin: usize,
    pub end: usize,
}

impl Anchor {
    pub fn new(container_id: impl Into<ContainerId>, begin: usize, end: usize) -> Self {
        Self {
            container_id: container_id.into(),
            begin,
            end,
        }
    }

    /// Whether `[begin, end)` intersects this anchor in the same container.
    pub fn intersects(&self, container: &ContainerId, begin: usize, end: usize) -> bool {
        &self.container_id == container && self.begin < end && begin < self.end
    }

    pub fn covers(&self, container: &ContainerId, begin: usize, end: usize) -> bool {
        &self.container_id == container && self.begin <= begin && end <= self.end
    }
}

/// A resource-to-selection association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub resource: ResourceId,
    pub group: GroupId,
    pub anchors: Vec<Anchor>,
}

/// `resource -> group -> anchors`, the only persisted entity.
///
/// Serializes as the plain nested mapping, e.g.
/// `{"r1": {"g": [{"containerId": "c1", "begin": 4, "end": 9}]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkState {
    resources: BTreeMap<ResourceId, BTreeMap<GroupId, Vec<Anchor>>>,
}

impl LinkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.values().all(BTreeMap::is_empty)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceId> {
        self.resources.keys()
    }

    pub fn contains_resource(&self, resource: &ResourceId) -> bool {
        self.resources.contains_key(resource)
    }

    pub fn groups(&self, resource: &ResourceId) -> Option<&BTreeMap<GroupId, Vec<Anchor>>> {
        self.resources.get(resource)
    }

    pub fn anchors(&self, group: &GroupId) -> Option<&[Anchor]> {
        self.resources
            .values()
            .find_map(|groups| groups.get(group))
            .map(Vec::as_slice)
    }

    pub fn resource_of(&self, group: &GroupId) -> Option<&ResourceId> {
        self.resources
            .iter()
            .find(|(_, groups)| groups.contains_key(group))
            .map(|(resource, _)| resource)
    }

    /// Every link, ordered by resource then group.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.resources.iter().flat_map(|(resource, groups)| {
            groups.iter().map(move |(group, anchors)| Link {
                resource: resource.clone(),
                group: group.clone(),
                anchors: anchors.clone(),
            })
        })
    }

    /// Every anchor with its owning group.
    pub fn anchors_with_groups(&self) -> impl Iterator<Item = (&GroupId, &Anchor)> {
        self.resources
            .values()
            .flat_map(|groups| groups.iter())
            .flat_map(|(group, anchors)| anchors.iter().map(move |a| (group, a)))
    }

    pub fn link_count(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    pub(crate) fn ensure_resource(&mut self, resource: &ResourceId) {
        self.resources.entry(resource.clone()).or_default();
    }

    pub(crate) fn insert(&mut self, resource: &ResourceId, group: GroupId, anchors: Vec<Anchor>) {
        self.resources
            .entry(resource.clone())
            .or_default()
            .insert(group, anchors);
    }

    pub(crate) fn remove_group(&mut self, group: &GroupId) -> Option<(ResourceId, Vec<Anchor>)> {
        let resource = self.resource_of(group)?.clone();
        let anchors = self.resources.get_mut(&resource)?.remove(group)?;
        Some((resource, anchors))
    }

    pub(crate) fn remove_resource(&mut self, resource: &ResourceId) -> bool {
        self.resources.remove(resource).is_some()
    }
}
