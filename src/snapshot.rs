//! Immutable library views and their derived statistics.

use serde::Serialize;

use crate::media::{MediaItem, MediaKind};
use crate::scan::ScanOutput;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A fully computed view of the managed directory plus current selections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibrarySnapshot {
    pub videos: Vec<MediaItem>,
    pub images: Vec<MediaItem>,
    pub audios: Vec<MediaItem>,
    pub total_video_size_mb: f64,
    pub total_image_size_mb: f64,
    pub total_audio_size_mb: f64,
    pub total_video_duration: String,
    pub selected_video: Option<String>,
    pub selected_image: Option<String>,
    pub selected_audio: Option<String>,
}

impl Default for LibrarySnapshot {
    fn default() -> Self {
        Self::aggregate(ScanOutput::default(), Selections::default())
    }
}

/// Selected file name per kind, as read from the Config Store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    pub video: Option<String>,
    pub image: Option<String>,
    pub audio: Option<String>,
}

impl Selections {
    pub fn get(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Video => self.video.as_deref(),
            MediaKind::Image => self.image.as_deref(),
            MediaKind::Audio => self.audio.as_deref(),
        }
    }
}

impl LibrarySnapshot {
    /// Combine one scan with the selections read alongside it.
    pub fn aggregate(scan: ScanOutput, selections: Selections) -> Self {
        let ScanOutput {
            videos,
            images,
            audios,
        } = scan;
        let total_video_ms: u64 = videos.iter().map(|v| v.duration_ms).sum();
        Self {
            total_video_size_mb: size_mb(&videos),
            total_image_size_mb: size_mb(&images),
            total_audio_size_mb: size_mb(&audios),
            total_video_duration: format_duration(total_video_ms),
            videos,
            images,
            audios,
            selected_video: selections.video,
            selected_image: selections.image,
            selected_audio: selections.audio,
        }
    }

    pub fn items(&self, kind: MediaKind) -> &[MediaItem] {
        match kind {
            MediaKind::Video => &self.videos,
            MediaKind::Image => &self.images,
            MediaKind::Audio => &self.audios,
        }
    }

    pub fn selected(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Video => self.selected_video.as_deref(),
            MediaKind::Image => self.selected_image.as_deref(),
            MediaKind::Audio => self.selected_audio.as_deref(),
        }
    }

    pub(crate) fn set_selected(&mut self, kind: MediaKind, name: Option<String>) {
        match kind {
            MediaKind::Video => self.selected_video = name,
            MediaKind::Image => self.selected_image = name,
            MediaKind::Audio => self.selected_audio = name,
        }
    }

    pub fn find(&self, kind: MediaKind, name: &str) -> Option<&MediaItem> {
        self.items(kind).iter().find(|item| item.name == name)
    }
}

/// What observers of the library see: the latest snapshot and whether a
/// scan or import is running.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibraryState {
    pub snapshot: LibrarySnapshot,
    pub is_loading: bool,
}

fn size_mb(items: &[MediaItem]) -> f64 {
    let bytes: u64 = items.iter().map(|i| i.size_bytes).sum();
    bytes as f64 / BYTES_PER_MB
}

/// `H:MM:SS` when at least one hour, else `MM:SS`. Milliseconds are truncated.
pub fn format_duration(total_ms: u64) -> String {
    let secs = total_ms / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
