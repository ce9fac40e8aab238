//! Screen-space overlays derived from layout: merged selection highlights
//! and the per-link tabs drawn beside the scroll track.
//!
//! Nothing here is persisted. Geometry comes from a [`LayoutSource`] and is
//! recomputed whenever it changes.

pub mod highlight;
pub mod tabs;

use std::collections::HashMap;

use crate::document::Document;
use crate::ids::ContainerId;

pub use highlight::recompute_highlights;
pub use tabs::{Tab, TabOverlay, TrackWindow};

/// An axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Scroll state of the document pane.
///
/// Client rectangles are relative to the window; subtracting the pane
/// origin and adding the scroll offset places them in document space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub origin_top: f64,
    pub origin_left: f64,
}

/// Vertical extent of a container in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub top: f64,
    pub bottom: f64,
}

impl Extent {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn union(self, other: Extent) -> Extent {
        Extent {
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Sizes the tab geometry is proportional to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    /// Full scrollable height of the document.
    pub scroll_height: f64,
    /// Height of the indicator track beside the document.
    pub track_height: f64,
}

/// Live layout, as measured by the host.
pub trait LayoutSource {
    fn container_extent(&self, container: &ContainerId) -> Option<Extent>;
    fn metrics(&self) -> LayoutMetrics;
}

/// Tunables for overlay geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySettings {
    /// Gap kept free at each end of the indicator track.
    pub scrollbar_pad: f64,
    pub min_tab_height: f64,
    /// Opacity applied to a resource colour when drawing its tabs.
    pub tab_alpha: f64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            scrollbar_pad: 12.0,
            min_tab_height: 5.0,
            tab_alpha: 0.4,
        }
    }
}

impl OverlaySettings {
    /// Track height available to tabs.
    pub fn usable(&self, metrics: &LayoutMetrics) -> f64 {
        (metrics.track_height - 2.0 * self.scrollbar_pad).max(0.0)
    }
}

/// A fixed layout, for headless use and tests.
#[derive(Debug, Clone)]
pub struct StaticLayout {
    extents: HashMap<ContainerId, Extent>,
    metrics: LayoutMetrics,
}

impl StaticLayout {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            extents: HashMap::new(),
            metrics,
        }
    }

    /// Stack every container of `document` with the same height, in
    /// reading order.
    pub fn uniform(document: &Document, row_height: f64, track_height: f64) -> Self {
        let extents: HashMap<ContainerId, Extent> = document
            .containers()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let top = i as f64 * row_height;
                (c.id().clone(), Extent::new(top, top + row_height))
            })
            .collect();
        let scroll_height = extents.len() as f64 * row_height;
        Self {
            extents,
            metrics: LayoutMetrics {
                scroll_height,
                track_height,
            },
        }
    }

    pub fn with_extent(mut self, container: impl Into<ContainerId>, extent: Extent) -> Self {
        self.extents.insert(container.into(), extent);
        self
    }

    pub fn set_metrics(&mut self, metrics: LayoutMetrics) {
        self.metrics = metrics;
    }
}

impl LayoutSource for StaticLayout {
    fn container_extent(&self, container: &ContainerId) -> Option<Extent> {
        self.extents.get(container).copied()
    }

    fn metrics(&self) -> LayoutMetrics {
        self.metrics
    }
}
