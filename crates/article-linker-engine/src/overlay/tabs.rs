//! Link tabs on the indicator track.
//!
//! A tab maps a link's vertical extent in the document onto the track with
//! the ratio `usable track height / document scroll height`. The pre-scale
//! inputs are kept on the tab so a resize can rescale it without going back
//! to the layout.

use crate::ids::{GroupId, ResourceId};
use crate::links::{Link, Rgb};

use super::{Extent, LayoutMetrics, LayoutSource, OverlaySettings};

/// The part of the track covered by the scroll thumb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackWindow {
    pub top: f64,
    pub height: f64,
}

impl TrackWindow {
    pub fn from_scroll(
        scroll_top: f64,
        viewport_height: f64,
        metrics: &LayoutMetrics,
        settings: &OverlaySettings,
    ) -> Self {
        let ratio = ratio(metrics, settings);
        Self {
            top: settings.scrollbar_pad + scroll_top * ratio,
            height: viewport_height * ratio,
        }
    }
}

fn ratio(metrics: &LayoutMetrics, settings: &OverlaySettings) -> f64 {
    if metrics.scroll_height > 0.0 {
        settings.usable(metrics) / metrics.scroll_height
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub group: GroupId,
    pub resource: ResourceId,
    pub top: f64,
    pub height: f64,
    /// css `rgba(..)` colour, if the resource has one.
    pub color: Option<String>,
    pub highlighted: bool,
    bar_ref: f64,
    top_ref: f64,
    height_ref: f64,
}

impl Tab {
    /// Place a tab for `link`, or `None` if none of its containers are laid
    /// out.
    pub fn compute(
        link: &Link,
        color: Option<Rgb>,
        layout: &dyn LayoutSource,
        settings: &OverlaySettings,
    ) -> Option<Tab> {
        let extent = link
            .anchors
            .iter()
            .filter_map(|a| layout.container_extent(&a.container_id))
            .reduce(Extent::union)?;

        let metrics = layout.metrics();
        let ratio = ratio(&metrics, settings);
        let top_ref = extent.top * ratio;
        let height_ref = extent.height() * ratio;
        Some(Tab {
            group: link.group.clone(),
            resource: link.resource.clone(),
            top: settings.scrollbar_pad + top_ref,
            height: height_ref.max(settings.min_tab_height),
            color: color.map(|c| c.with_alpha(settings.tab_alpha)),
            highlighted: false,
            bar_ref: settings.usable(&metrics),
            top_ref,
            height_ref,
        })
    }

    /// Scale the tab to a track whose usable height is now `usable`.
    pub fn rescale(&mut self, usable: f64, settings: &OverlaySettings) {
        let r = if self.bar_ref > 0.0 {
            usable / self.bar_ref
        } else {
            1.0
        };
        self.top = settings.scrollbar_pad + self.top_ref * r;
        self.height = (self.height_ref * r).max(settings.min_tab_height);
    }

    pub fn intersects(&self, window: &TrackWindow) -> bool {
        window.top < self.top + self.height && window.top + window.height > self.top
    }
}

/// All tabs currently on the track, in placement order.
#[derive(Debug, Clone, Default)]
pub struct TabOverlay {
    settings: OverlaySettings,
    tabs: Vec<Tab>,
    window: Option<TrackWindow>,
}

impl TabOverlay {
    pub fn new(settings: OverlaySettings) -> Self {
        Self {
            settings,
            tabs: Vec::new(),
            window: None,
        }
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, group: &GroupId) -> Option<&Tab> {
        self.tabs.iter().find(|t| &t.group == group)
    }

    /// Place or replace the tab for `link`.
    pub fn place(
        &mut self,
        link: &Link,
        color: Option<Rgb>,
        layout: &dyn LayoutSource,
    ) -> Option<&Tab> {
        self.remove(&link.group);
        let mut tab = Tab::compute(link, color, layout, &self.settings)?;
        if let Some(window) = &self.window {
            tab.highlighted = tab.intersects(window);
        }
        self.tabs.push(tab);
        self.tabs.last()
    }

    pub fn remove(&mut self, group: &GroupId) -> Option<Tab> {
        let index = self.tabs.iter().position(|t| &t.group == group)?;
        Some(self.tabs.remove(index))
    }

    pub fn clear(&mut self) {
        self.tabs.clear();
    }

    /// Rescale every tab to the current track.
    pub fn rescale(&mut self, layout: &dyn LayoutSource) {
        let usable = self.settings.usable(&layout.metrics());
        for tab in &mut self.tabs {
            tab.rescale(usable, &self.settings);
        }
        if let Some(window) = self.window {
            self.refresh_active(window);
        }
    }

    /// Highlight the tabs under `window`. Returns how many are highlighted.
    pub fn refresh_active(&mut self, window: TrackWindow) -> usize {
        self.window = Some(window);
        for tab in &mut self.tabs {
            tab.highlighted = tab.intersects(&window);
        }
        self.tabs.iter().filter(|t| t.highlighted).count()
    }
}
