//! The linker facade.
//!
//! [`Linker`] owns the document, the link store and the tab overlay and is
//! the only thing that writes marker markup. Every public mutation either
//! completes or leaves markup and link state exactly as they were.
//!
//! ```
//! use article_linker_engine::{
//!     Boundary, Container, Document, Linker, LinkerSettings, RawSelection, ResourceId,
//!     StaticLayout,
//! };
//!
//! let document = Document::new([Container::new("c1", "say hello world")]);
//! let layout = StaticLayout::uniform(&document, 20.0, 400.0);
//! let mut linker = Linker::new(document, layout, LinkerSettings::default());
//!
//! let selection = RawSelection::new(Boundary::new("c1", 4), Boundary::new("c1", 9));
//! linker.begin_selection(&selection).unwrap();
//! let link = linker.confirm(&ResourceId::new("r1"), None).unwrap();
//!
//! assert_eq!(link.anchors[0].begin, 4);
//! assert_eq!(linker.tabs().len(), 1);
//! ```

use std::collections::BTreeSet;

use crate::anchoring::{
    Boundary, MarkerAttrs, MarkupAnchorWriter, RawSelection, SelectionDecomposer,
    SelectionLimits,
};
use crate::document::{ContainerId, Document};
use crate::error::{LinkError, NotFound};
use crate::events::{LinkEvent, LinkEventCallback};
use crate::ids::{GroupId, ResourceId};
use crate::links::{Anchor, Link, LinkPhase, LinkState, LinkStateStore, ResourceRegistry, Rgb};
use crate::overlay::{LayoutSource, OverlaySettings, Tab, TabOverlay, TrackWindow};
use crate::persistence::{PersistenceCodec, RestoreReport};

/// Everything the linker can be tuned with.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkerSettings {
    pub limits: SelectionLimits,
    pub overlay: OverlaySettings,
    /// Reject every mutation except [`Linker::restore`].
    pub read_only: bool,
}

pub struct Linker {
    document: Document,
    store: LinkStateStore,
    decomposer: SelectionDecomposer,
    overlay: TabOverlay,
    layout: Box<dyn LayoutSource>,
    read_only: bool,
    callbacks: Vec<LinkEventCallback>,
}

impl Linker {
    pub fn new(
        document: Document,
        layout: impl LayoutSource + 'static,
        settings: LinkerSettings,
    ) -> Self {
        Self {
            document,
            store: LinkStateStore::new(),
            decomposer: SelectionDecomposer::new(settings.limits),
            overlay: TabOverlay::new(settings.overlay),
            layout: Box::new(layout),
            read_only: settings.read_only,
            callbacks: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn link_state(&self) -> &LinkState {
        self.store.state()
    }

    pub fn phase(&self) -> LinkPhase {
        self.store.phase()
    }

    pub fn pending_group(&self) -> Option<&GroupId> {
        self.store.pending_group()
    }

    pub fn tabs(&self) -> &[Tab] {
        self.overlay.tabs()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether `[begin, end)` of `container` intersects any committed link.
    pub fn overlaps(&self, container: &ContainerId, begin: usize, end: usize) -> bool {
        self.store.overlaps(container, begin, end)
    }

    /// Register a callback for link events.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&LinkEvent) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Start a pending link over `selection`.
    ///
    /// Any link still pending is discarded first. On success the selection
    /// is wrapped in pending markers until [`confirm`](Self::confirm) or
    /// [`cancel`](Self::cancel).
    pub fn begin_selection(&mut self, selection: &RawSelection) -> Result<GroupId, LinkError> {
        self.ensure_writable()?;

        let selection = if self.store.phase() == LinkPhase::Pending {
            let start = self.to_original(&selection.start);
            let end = self.to_original(&selection.end);
            self.cancel();
            RawSelection::new(self.to_live(start), self.to_live(end))
        } else {
            selection.clone()
        };

        let anchors = self
            .decomposer
            .decompose(&self.document, &self.store, &selection)
            .inspect_err(|err| log::warn!("selection rejected: {err}"))?;

        let group = self.store.begin_pending(anchors.clone());
        let mut writer = MarkupAnchorWriter::new(&mut self.document);
        for anchor in &anchors {
            let attrs = MarkerAttrs::pending(group.clone());
            if let Err(err) =
                writer.insert_marker(&anchor.container_id, anchor.begin, anchor.end, attrs)
            {
                writer.discard_pending()?;
                self.store.cancel_pending();
                return Err(err);
            }
        }
        log::debug!("pending link {group} over {} anchors", anchors.len());
        Ok(group)
    }

    /// Start a pending link over the whole of `container`.
    pub fn link_container(&mut self, container: &ContainerId) -> Result<GroupId, LinkError> {
        self.begin_selection(&RawSelection::container(container.clone()))
    }

    /// Attach the pending link to `resource`.
    pub fn confirm(&mut self, resource: &ResourceId, color: Option<Rgb>) -> Result<Link, LinkError> {
        self.ensure_writable()?;
        let group = self
            .store
            .pending_group()
            .cloned()
            .ok_or(LinkError::NoPendingLink)?;

        MarkupAnchorWriter::new(&mut self.document).commit_pending(resource, color)?;
        let link = self.store.confirm(&group, resource)?;
        self.overlay.place(&link, color, self.layout.as_ref());

        log::info!("linked group {group} to {resource}");
        self.emit(LinkEvent::Created {
            group,
            resource: resource.clone(),
            anchors: link.anchors.clone(),
        });
        self.emit_state();
        Ok(link)
    }

    /// Drop the pending link, if any, restoring the markup it touched.
    pub fn cancel(&mut self) -> Option<GroupId> {
        let (group, _) = self.store.cancel_pending()?;
        if let Err(err) = MarkupAnchorWriter::new(&mut self.document).discard_pending() {
            log::warn!("discarding pending markers of {group}: {err}");
        }
        log::debug!("cancelled pending link {group}");
        Some(group)
    }

    pub fn remove_link(&mut self, group: &GroupId) -> Result<Link, LinkError> {
        self.ensure_writable()?;
        let anchors = self
            .store
            .state()
            .anchors(group)
            .ok_or_else(|| NotFound::Group(group.clone()))?
            .to_vec();

        self.strip_markers(group, &anchors)?;
        let link = self.store.remove_link(group)?;
        self.overlay.remove(group);

        log::info!("removed link {group} from {}", link.resource);
        self.emit(LinkEvent::Removed {
            group: group.clone(),
            resource: link.resource.clone(),
        });
        self.emit_state();
        Ok(link)
    }

    /// Register `resource` without any links.
    ///
    /// Registering a known resource changes nothing.
    pub fn add_resource(&mut self, resource: &ResourceId) -> Result<(), LinkError> {
        self.ensure_writable()?;
        self.store.add_resource(resource);
        log::info!("added resource {resource}");
        self.emit_state();
        Ok(())
    }

    /// Remove `resource` and every link attached to it.
    pub fn remove_resource(&mut self, resource: &ResourceId) -> Result<Vec<Link>, LinkError> {
        self.ensure_writable()?;
        let links: Vec<(GroupId, Vec<Anchor>)> = self
            .store
            .state()
            .groups(resource)
            .ok_or_else(|| NotFound::Resource(resource.clone()))?
            .iter()
            .map(|(group, anchors)| (group.clone(), anchors.clone()))
            .collect();

        for (group, anchors) in &links {
            self.check_markers(group, anchors)?;
        }
        for (group, anchors) in &links {
            self.strip_markers(group, anchors)?;
            self.overlay.remove(group);
        }
        let removed = self.store.remove_resource(resource)?;

        log::info!("removed resource {resource} with {} links", removed.len());
        for link in &removed {
            self.emit(LinkEvent::Removed {
                group: link.group.clone(),
                resource: resource.clone(),
            });
        }
        self.emit_state();
        Ok(removed)
    }

    /// Replace every link with those in `state`.
    ///
    /// Allowed on read-only linkers.
    pub fn restore(&mut self, state: &LinkState, registry: &dyn ResourceRegistry) -> RestoreReport {
        self.store.cancel_pending();
        self.overlay.clear();
        let report = PersistenceCodec::restore(&mut self.document, &mut self.store, state, registry);

        let links: Vec<Link> = self.store.state().links().collect();
        for link in &links {
            let color = registry.color(&link.resource);
            self.overlay.place(link, color, self.layout.as_ref());
        }
        self.emit_state();
        report
    }

    pub fn serialize(&self) -> LinkState {
        PersistenceCodec::serialize(self.store.state())
    }

    /// Highlight the tabs under the current scroll window.
    pub fn on_scroll(&mut self, scroll_top: f64, viewport_height: f64) -> usize {
        let window = TrackWindow::from_scroll(
            scroll_top,
            viewport_height,
            &self.layout.metrics(),
            self.overlay.settings(),
        );
        self.overlay.refresh_active(window)
    }

    /// Rescale every tab to the layout's current track height.
    pub fn on_resize(&mut self) {
        self.overlay.rescale(self.layout.as_ref());
    }

    /// Swap in fresh layout measurements and rescale.
    pub fn set_layout(&mut self, layout: impl LayoutSource + 'static) {
        self.layout = Box::new(layout);
        self.on_resize();
    }

    fn ensure_writable(&self) -> Result<(), LinkError> {
        if self.read_only {
            return Err(LinkError::ReadOnly);
        }
        Ok(())
    }

    /// Every container `anchors` point into must hold a marker of `group`.
    fn check_markers(&self, group: &GroupId, anchors: &[Anchor]) -> Result<(), LinkError> {
        for anchor in anchors {
            let container = &anchor.container_id;
            let marked = self
                .document
                .container(container)
                .is_some_and(|c| c.markers().iter().any(|m| &m.group == group));
            if !marked {
                return Err(NotFound::Marker {
                    container: container.clone(),
                    group: group.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn strip_markers(&mut self, group: &GroupId, anchors: &[Anchor]) -> Result<(), LinkError> {
        self.check_markers(group, anchors)?;
        let containers: BTreeSet<&ContainerId> = anchors.iter().map(|a| &a.container_id).collect();
        let mut writer = MarkupAnchorWriter::new(&mut self.document);
        for container in containers {
            writer.remove_marker(container, group)?;
        }
        Ok(())
    }

    /// Express a live boundary in original offsets.
    fn to_original(&self, boundary: &Boundary) -> Boundary {
        if boundary.offset == Boundary::END {
            return boundary.clone();
        }
        let offset = self.document.to_original(&boundary.container, boundary.offset);
        Boundary::new(boundary.container.clone(), offset)
    }

    fn to_live(&self, boundary: Boundary) -> Boundary {
        if boundary.offset == Boundary::END {
            return boundary;
        }
        let offset = self.document.to_live(&boundary.container, boundary.offset);
        Boundary::new(boundary.container, offset)
    }

    fn emit_state(&mut self) {
        let state = self.store.state().clone();
        self.emit(LinkEvent::StateChanged(state));
    }

    fn emit(&mut self, event: LinkEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }
}
