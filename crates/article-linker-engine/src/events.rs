use crate::ids::{GroupId, ResourceId};
use crate::links::{Anchor, LinkState};

/// Notifications emitted by the [`Linker`](crate::Linker) after a
/// successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Created {
        group: GroupId,
        resource: ResourceId,
        anchors: Vec<Anchor>,
    },
    Removed {
        group: GroupId,
        resource: ResourceId,
    },
    /// The full link state after any change, for persistence triggers.
    StateChanged(LinkState),
}

/// Subscriber callback type
pub type LinkEventCallback = Box<dyn FnMut(&LinkEvent) + Send>;
