//! Anchoring: decomposing selections, translating offsets and writing marker
//! markup.

pub mod decompose;
pub mod offsets;
pub mod writer;

pub use decompose::{Boundary, RawSelection, SelectionDecomposer, SelectionLimits};
pub use offsets::{Edge, OffsetTracker, Shift};
pub use writer::{MarkerAttrs, MarkupAnchorWriter, COMMITTED_CLASS, PENDING_CLASS};
