use crate::document::ContainerId;
use crate::links::{GroupId, ResourceId};

/// Everything a linker operation can fail with.
///
/// All mutating entry points are all-or-nothing per link: when one of these
/// is returned, no partial set of anchors has been left committed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(#[from] InvalidSelection),

    #[error("Selection overlaps link {existing} in {container} at {begin}..{end}")]
    Overlap {
        container: ContainerId,
        begin: usize,
        end: usize,
        existing: GroupId,
    },

    #[error("Not found: {0}")]
    NotFound(#[from] NotFound),

    #[error("Corrupt link state for group {group}: {reason}")]
    CorruptState { group: GroupId, reason: Corruption },

    #[error("Linker is read-only")]
    ReadOnly,

    #[error("No pending link to confirm")]
    NoPendingLink,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSelection {
    #[error("selection is empty")]
    Empty,
    #[error("selection has {found} non-whitespace characters, at least {min} required")]
    TooShort { found: usize, min: usize },
    #[error("selection is {found} characters long, at most {max} allowed")]
    TooLong { found: usize, max: usize },
    #[error("unknown container {0}")]
    UnknownContainer(ContainerId),
    #[error("offset {offset} is outside {container} or splits a character")]
    OffsetOutOfRange { container: ContainerId, offset: usize },
    #[error("selection is already linked by group {0}")]
    AlreadyLinked(GroupId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("link group {0}")]
    Group(GroupId),
    #[error("resource {0}")]
    Resource(ResourceId),
    #[error("container {0}")]
    Container(ContainerId),
    #[error("marker for group {group} in {container}")]
    Marker {
        container: ContainerId,
        group: GroupId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
    #[error("container {0} cannot be resolved")]
    UnknownContainer(ContainerId),
    #[error("range {begin}..{end} exceeds {container} content length {len}")]
    OffsetOutOfRange {
        container: ContainerId,
        begin: usize,
        end: usize,
        len: usize,
    },
    #[error("empty range {begin}..{end} in {container}")]
    EmptyRange {
        container: ContainerId,
        begin: usize,
        end: usize,
    },
    #[error("offset {offset} splits a character in {container}")]
    SplitsCharacter { container: ContainerId, offset: usize },
    #[error("offset {offset} falls inside a tag in {container}")]
    SplitsTag { container: ContainerId, offset: usize },
    #[error("group is already stored under resource {0}")]
    DuplicateGroup(ResourceId),
}
