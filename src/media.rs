//! Media kinds, library items and extension classification.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;

pub const VIDEO_EXTS: &[&str] = &["mp4", "mov", "avi", "mkv"];
pub const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "bmp"];
pub const AUDIO_EXTS: &[&str] = &["mp3", "wav", "aac", "m4a", "ogg", "flac"];

/// Extensions treated as still images when an import targets the video slot.
/// Wider than [`IMAGE_EXTS`]: webp is accepted for conversion but never scanned.
pub const CONVERTIBLE_IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Audio,
}

impl MediaKind {
    pub const ALL: [Self; 3] = [Self::Video, Self::Image, Self::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// Allowed extensions (lowercase, without dot) for this kind.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Video => VIDEO_EXTS,
            Self::Image => IMAGE_EXTS,
            Self::Audio => AUDIO_EXTS,
        }
    }

    /// Whether files of this kind carry a playback duration.
    pub fn is_timed(&self) -> bool {
        !matches!(self, Self::Image)
    }

    /// Classify a path by its extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = lower_extension(path)?;
        Self::ALL
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" | "videos" => Ok(Self::Video),
            "image" | "images" => Ok(Self::Image),
            "audio" | "audios" => Ok(Self::Audio),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// One file in the managed library, as seen by the most recent scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    pub path: PathBuf,
    pub name: String,
    pub display_name: String,
    /// Reserved for entries without a backing file; scans always set `false`.
    pub is_virtual: bool,
    pub size_bytes: u64,
    /// Zero for images and whenever duration extraction failed.
    pub duration_ms: u64,
    pub kind: MediaKind,
}

impl MediaItem {
    pub fn from_file(path: PathBuf, kind: MediaKind, size_bytes: u64, duration_ms: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            display_name: name.clone(),
            name,
            path,
            is_virtual: false,
            size_bytes,
            duration_ms,
            kind,
        }
    }
}

/// Longest file-name stem kept for staged and converted files.
pub const MAX_BASE_NAME_CHARS: usize = 30;

/// Replace anything outside `[A-Za-z0-9_-]` with `_` and keep at most
/// [`MAX_BASE_NAME_CHARS`] characters.
pub fn sanitize_base_name(base: &str) -> String {
    base.chars()
        .take(MAX_BASE_NAME_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split a file name into `(stem, extension)`. The extension is `None` when
/// the name has no dot.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    }
}

pub(crate) fn lower_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
}
