//! Exporting link state and replaying it onto a document.
//!
//! The exported form is the [`LinkState`] mapping itself. Replay rebuilds
//! marker markup from scratch: every marker is removed, each stored link is
//! validated against the current content, and the valid anchors are written
//! as committed markers in container order before the links are registered
//! again. A link that cannot be replayed is skipped whole and reported; it
//! never leaves some of its markers behind.

use std::collections::{BTreeMap, BTreeSet};

use crate::anchoring::{MarkerAttrs, MarkupAnchorWriter};
use crate::document::markup::{tag_containing, tokenize};
use crate::document::{ContainerResolver, Document};
use crate::error::{Corruption, LinkError};
use crate::ids::{GroupId, ResourceId};
use crate::links::{Anchor, Link, LinkState, LinkStateStore, ResourceRegistry};

/// Outcome of a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Groups whose markers were written and registered, in replay order.
    pub restored: Vec<GroupId>,
    /// Groups that were skipped, with the reason.
    pub failed: Vec<(GroupId, LinkError)>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct PersistenceCodec;

impl PersistenceCodec {
    /// The persisted form of `state`.
    pub fn serialize(state: &LinkState) -> LinkState {
        state.clone()
    }

    pub fn to_json(state: &LinkState) -> serde_json::Result<String> {
        serde_json::to_string_pretty(state)
    }

    pub fn from_json(json: &str) -> serde_json::Result<LinkState> {
        serde_json::from_str(json)
    }

    /// Replace every link in `document` and `store` with those in `state`.
    pub fn restore(
        document: &mut Document,
        store: &mut LinkStateStore,
        state: &LinkState,
        registry: &dyn ResourceRegistry,
    ) -> RestoreReport {
        let cleared = MarkupAnchorWriter::new(document).clear_markers();
        store.clear();
        log::debug!("cleared {cleared} bytes of marker markup before restore");

        let mut report = RestoreReport::default();
        let mut valid: Vec<Link> = Vec::new();
        let mut owners: BTreeMap<GroupId, ResourceId> = BTreeMap::new();
        for link in state.links() {
            let checked = match owners.get(&link.group) {
                Some(owner) => Err(Corruption::DuplicateGroup(owner.clone())),
                None => validate(document, &link),
            };
            match checked {
                Ok(()) => {
                    owners.insert(link.group.clone(), link.resource.clone());
                    valid.push(link);
                }
                Err(reason) => {
                    log::warn!("skipping link {}: {reason}", link.group);
                    report.failed.push((
                        link.group.clone(),
                        LinkError::CorruptState {
                            group: link.group,
                            reason,
                        },
                    ));
                }
            }
        }

        let mut planned: Vec<(usize, &Anchor, &Link)> = valid
            .iter()
            .flat_map(|link| link.anchors.iter().map(move |a| (a, link)))
            .filter_map(|(anchor, link)| {
                let position = document.position(&anchor.container_id)?;
                Some((position, anchor, link))
            })
            .collect();
        planned.sort_by_key(|(position, anchor, _)| (*position, anchor.begin));

        let mut broken: BTreeSet<GroupId> = BTreeSet::new();
        let mut writer = MarkupAnchorWriter::new(document);
        for (_, anchor, link) in planned {
            if broken.contains(&link.group) {
                continue;
            }
            let attrs = MarkerAttrs::committed(
                link.group.clone(),
                link.resource.clone(),
                registry.color(&link.resource),
            );
            if let Err(err) = writer.insert_marker(&anchor.container_id, anchor.begin, anchor.end, attrs)
            {
                log::warn!("skipping link {}: {err}", link.group);
                broken.insert(link.group.clone());
                report.failed.push((link.group.clone(), err));
            }
        }

        // Drop whatever a broken link managed to write before it failed.
        for link in valid.iter().filter(|l| broken.contains(&l.group)) {
            let containers: BTreeSet<_> = link.anchors.iter().map(|a| &a.container_id).collect();
            for container in containers {
                // a container the link never reached has nothing to remove
                let _ = writer.remove_marker(container, &link.group);
            }
        }

        for resource in state.resources() {
            store.add_resource(resource);
        }
        for link in valid.into_iter().filter(|l| !broken.contains(&l.group)) {
            report.restored.push(link.group.clone());
            store.register(link);
        }

        log::info!(
            "restored {} links, skipped {}",
            report.restored.len(),
            report.failed.len()
        );
        report
    }
}

/// Check a stored link against the marker-free content it points into.
fn validate(document: &Document, link: &Link) -> Result<(), Corruption> {
    for anchor in &link.anchors {
        let id = &anchor.container_id;
        let container = document
            .resolve(id.as_str())
            .ok_or_else(|| Corruption::UnknownContainer(id.clone()))?;
        if anchor.begin >= anchor.end {
            return Err(Corruption::EmptyRange {
                container: id.clone(),
                begin: anchor.begin,
                end: anchor.end,
            });
        }
        if anchor.end > container.original_len() {
            return Err(Corruption::OffsetOutOfRange {
                container: id.clone(),
                begin: anchor.begin,
                end: anchor.end,
                len: container.original_len(),
            });
        }
        for offset in [anchor.begin, anchor.end] {
            if !container.markup().is_char_boundary(offset) {
                return Err(Corruption::SplitsCharacter {
                    container: id.clone(),
                    offset,
                });
            }
        }
        let tokens = tokenize(container.markup());
        for offset in [anchor.begin, anchor.end] {
            if tag_containing(&tokens, offset).is_some() {
                return Err(Corruption::SplitsTag {
                    container: id.clone(),
                    offset,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ContainerId;
    use crate::links::Rgb;
    use crate::tests::sample_document;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn state(json: &str) -> LinkState {
        PersistenceCodec::from_json(json).unwrap()
    }

    fn registry() -> BTreeMap<ResourceId, Rgb> {
        BTreeMap::from([(ResourceId::new("r1"), Rgb::new(200, 40, 40))])
    }

    #[test]
    fn test_serialize_is_identity() {
        let stored = state(r#"{"r1":{"g":[{"containerId":"c1","begin":4,"end":9}]}}"#);
        assert_eq!(PersistenceCodec::serialize(&stored), stored);
        let json = PersistenceCodec::to_json(&stored).unwrap();
        assert_eq!(PersistenceCodec::from_json(&json).unwrap(), stored);
    }

    #[test]
    fn test_restore_writes_committed_markers() {
        let mut doc = sample_document();
        let mut store = LinkStateStore::new();
        let stored = state(r#"{"r1":{"g":[{"containerId":"c1","begin":4,"end":9}]}}"#);

        let report = PersistenceCodec::restore(&mut doc, &mut store, &stored, &registry());

        assert!(report.is_clean());
        assert_eq!(report.restored, vec![GroupId::new("g")]);
        assert_eq!(store.state(), &stored);
        insta::assert_snapshot!(
            doc.container(&ContainerId::new("c1")).unwrap().markup(),
            @r#"say <a class="resource-anchor groupId-g resourceId-r1" data-beg="4" data-end="9" style="border-bottom-color: rgb(200, 40, 40)">hello</a> world"#
        );
    }

    #[test]
    fn test_restore_skips_corrupt_links_only() {
        let mut doc = sample_document();
        let mut store = LinkStateStore::new();
        let stored = state(
            r#"{
                "r1": {
                    "ok": [{"containerId": "c1", "begin": 0, "end": 3}],
                    "gone": [{"containerId": "c1", "begin": 4, "end": 9},
                             {"containerId": "missing", "begin": 0, "end": 1}],
                    "long": [{"containerId": "c2", "begin": 6, "end": 400}]
                }
            }"#,
        );

        let report = PersistenceCodec::restore(&mut doc, &mut store, &stored, &registry());

        assert_eq!(report.restored, vec![GroupId::new("ok")]);
        let failed: Vec<&str> = report.failed.iter().map(|(g, _)| g.as_str()).collect();
        assert_eq!(failed, vec!["gone", "long"]);
        assert!(matches!(
            report.failed[0].1,
            LinkError::CorruptState {
                reason: Corruption::UnknownContainer(_),
                ..
            }
        ));
        assert_eq!(store.state().link_count(), 1);
        // "gone" wrote nothing into c1
        assert_eq!(doc.container(&ContainerId::new("c1")).unwrap().markers().len(), 1);
    }

    #[test]
    fn test_restore_rejects_anchor_inside_tag() {
        let mut doc = sample_document();
        let mut store = LinkStateStore::new();
        let stored = state(r#"{"r1":{"g":[{"containerId":"c2","begin":2,"end":12}]}}"#);

        let report = PersistenceCodec::restore(&mut doc, &mut store, &stored, &registry());

        assert_eq!(
            report.failed,
            vec![(
                GroupId::new("g"),
                LinkError::CorruptState {
                    group: GroupId::new("g"),
                    reason: Corruption::SplitsTag {
                        container: ContainerId::new("c2"),
                        offset: 2,
                    },
                }
            )]
        );
        assert_eq!(doc, sample_document());
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_restore_rejects_group_stored_twice() {
        let mut doc = sample_document();
        let mut store = LinkStateStore::new();
        let stored = state(
            r#"{
                "r1": {"g": [{"containerId": "c1", "begin": 0, "end": 3}]},
                "r2": {"g": [{"containerId": "c1", "begin": 4, "end": 9}]}
            }"#,
        );

        let report = PersistenceCodec::restore(&mut doc, &mut store, &stored, &registry());

        assert_eq!(report.restored, vec![GroupId::new("g")]);
        assert_eq!(
            report.failed,
            vec![(
                GroupId::new("g"),
                LinkError::CorruptState {
                    group: GroupId::new("g"),
                    reason: Corruption::DuplicateGroup(ResourceId::new("r1")),
                }
            )]
        );
        assert_eq!(
            store.state().anchors(&GroupId::new("g")),
            Some(&[Anchor::new("c1", 0, 3)][..])
        );
        assert_eq!(store.state().resource_of(&GroupId::new("g")), Some(&ResourceId::new("r1")));
        assert_eq!(doc.container(&ContainerId::new("c1")).unwrap().markers().len(), 1);
    }

    #[test]
    fn test_restore_replaces_previous_links() {
        let mut doc = sample_document();
        let mut store = LinkStateStore::new();
        let first = state(r#"{"r1":{"a":[{"containerId":"c1","begin":0,"end":3}]}}"#);
        let second = state(r#"{"r2":{"b":[{"containerId":"c1","begin":10,"end":15}]}}"#);

        PersistenceCodec::restore(&mut doc, &mut store, &first, &registry());
        PersistenceCodec::restore(&mut doc, &mut store, &second, &registry());

        assert_eq!(store.state(), &second);
        let markers = doc.container(&ContainerId::new("c1")).unwrap().markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].group, GroupId::new("b"));
        assert_eq!(
            doc.original_markup(&ContainerId::new("c1")).unwrap(),
            "say hello world"
        );
    }

    #[test]
    fn test_restore_keeps_resources_without_links() {
        let mut doc = sample_document();
        let mut store = LinkStateStore::new();
        let stored = state(r#"{"r1":{}}"#);

        let report = PersistenceCodec::restore(&mut doc, &mut store, &stored, &registry());

        assert!(report.restored.is_empty());
        assert!(store.state().contains_resource(&ResourceId::new("r1")));
    }
}
