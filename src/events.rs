use crate::content::ContentRef;
use crate::media::{MediaItem, MediaKind};

/// Requests handled by the library task, in the order received.
#[derive(Debug, Clone)]
pub enum LibraryCommand {
    Refresh,
    Select(MediaItem),
    Import {
        refs: Vec<ContentRef>,
        kind: MediaKind,
    },
    Delete(MediaItem),
    ClearAll(MediaKind),
}

/// Fire-and-forget change signal addressed to a fixed identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChanged {
    pub uri: String,
}
