//! Link bookkeeping: anchors, the persisted link state, the pending-link
//! state machine and resource classification.

pub mod resource;
pub mod state;
pub mod store;

pub use crate::ids::{GroupId, ResourceId};
pub use resource::{ColorParseError, ResourceRegistry, Rgb};
pub use state::{Anchor, Link, LinkState};
pub use store::{LinkPhase, LinkStateStore};
