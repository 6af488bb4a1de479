//! Directory scanning: classify managed files and read their durations.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fsutil::make_world_readable;
use crate::media::{MediaItem, MediaKind};

/// Reads playback duration for time-based media.
pub trait MetadataReader: Send + Sync {
    /// Duration in milliseconds, or `None` when it cannot be determined.
    fn duration_ms(&self, path: &Path) -> Option<u64>;
}

/// Duration probe backed by `ffprobe -show_format`.
#[derive(Debug, Clone)]
pub struct FfprobeReader {
    program: PathBuf,
}

impl FfprobeReader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeReader {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MetadataReader for FfprobeReader {
    fn duration_ms(&self, path: &Path) -> Option<u64> {
        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .ok()?;
        if !output.status.success() {
            debug!(path = %path.display(), status = %output.status, "ffprobe failed");
            return None;
        }
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
        parse_format_duration(&json)
    }
}

/// Reader for hosts without a probe tool: every duration is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataReader for NoMetadata {
    fn duration_ms(&self, _path: &Path) -> Option<u64> {
        None
    }
}

fn parse_format_duration(json: &serde_json::Value) -> Option<u64> {
    let secs: f64 = match &json["format"]["duration"] {
        serde_json::Value::String(s) => s.trim().parse().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0) as u64)
}

/// Items found by one scan, per kind, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub videos: Vec<MediaItem>,
    pub images: Vec<MediaItem>,
    pub audios: Vec<MediaItem>,
}

impl ScanOutput {
    pub fn items(&self, kind: MediaKind) -> &[MediaItem] {
        match kind {
            MediaKind::Video => &self.videos,
            MediaKind::Image => &self.images,
            MediaKind::Audio => &self.audios,
        }
    }

    fn push(&mut self, item: MediaItem) {
        match item.kind {
            MediaKind::Video => self.videos.push(item),
            MediaKind::Image => self.images.push(item),
            MediaKind::Audio => self.audios.push(item),
        }
    }
}

/// Scan the flat managed directory `dir`, creating it first if absent.
///
/// Entries that vanish or cannot be stat'ed mid-scan are skipped; duration
/// failures yield `0`. Video files are marked world-readable as a side effect.
///
/// # Errors
/// Returns [`Error::BadDir`] if `dir` exists but is not a directory, or an IO
/// error if it cannot be created.
pub fn scan_dir(dir: &Path, reader: &dyn MetadataReader) -> Result<ScanOutput> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::BadDir(dir.to_path_buf()));
    }
    fs::create_dir_all(dir)?;

    let mut out = ScanOutput::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().to_path_buf();
        let Some(kind) = MediaKind::from_path(&path) else {
            trace!(path = %path.display(), "scan: unsupported extension");
            continue;
        };
        let Ok(md) = entry.metadata() else {
            debug!(path = %path.display(), "scan: metadata unavailable; skipping");
            continue;
        };

        if kind == MediaKind::Video {
            make_world_readable(&path);
        }
        let duration_ms = if kind.is_timed() {
            reader.duration_ms(&path).unwrap_or(0)
        } else {
            0
        };
        out.push(MediaItem::from_file(path, kind, md.len(), duration_ms));
    }

    debug!(
        dir = %dir.display(),
        videos = out.videos.len(),
        images = out.images.len(),
        audios = out.audios.len(),
        "scan complete"
    );
    Ok(out)
}
