pub mod config;
pub mod content;
pub mod convert;
pub mod error;
pub mod events;
pub mod fsutil;
pub mod import;
pub mod library;
pub mod locale;
pub mod media;
pub mod notifier;
pub mod scan;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod tasks {
    pub mod config_watch;
    pub mod library;
    pub mod service;
}

pub use crate::error::{Error, Result};
pub use crate::library::MediaLibrary;
pub use crate::media::{MediaItem, MediaKind};
pub use crate::snapshot::{LibrarySnapshot, LibraryState};
