pub mod anchoring;
pub mod document;
pub mod error;
pub mod events;
pub mod ids;
pub mod io;
pub mod linker;
pub mod links;
pub mod overlay;
pub mod persistence;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use anchoring::{Boundary, RawSelection, SelectionLimits};
pub use document::{Container, ContainerId, ContainerResolver, Document, DocumentSource};
pub use error::{Corruption, InvalidSelection, LinkError, NotFound};
pub use events::LinkEvent;
pub use ids::{GroupId, ResourceId};
pub use linker::{Linker, LinkerSettings};
pub use links::{Anchor, Link, LinkPhase, LinkState, ResourceRegistry, Rgb};
pub use overlay::{
    Extent, LayoutMetrics, LayoutSource, OverlaySettings, Rect, StaticLayout, Tab, Viewport,
    recompute_highlights,
};
pub use persistence::{PersistenceCodec, RestoreReport};
