//! Per-reference import pipeline: name resolution, re-classification,
//! staging, conversion and commit into the managed directory.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::content::{ContentRef, ContentResolver};
use crate::convert::Converter;
use crate::error::{Error, Result};
use crate::fsutil::{delete_if_exists, make_world_readable};
use crate::media::{CONVERTIBLE_IMAGE_EXTS, MediaKind, sanitize_base_name, split_name};

/// Result of importing one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Bytes were copied into the managed directory as-is.
    Copied { content: ContentRef, path: PathBuf },
    /// An image was converted; the produced video was auto-selected.
    Converted { content: ContentRef, path: PathBuf },
    /// The reference was skipped; the rest of the batch continued.
    Skipped { content: ContentRef, reason: String },
}

impl ImportOutcome {
    pub fn content(&self) -> &ContentRef {
        match self {
            Self::Copied { content, .. }
            | Self::Converted { content, .. }
            | Self::Skipped { content, .. } => content,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Copied { path, .. } | Self::Converted { path, .. } => Some(path),
            Self::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Outcomes of one batch, in the order the references were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    pub fn imported(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.iter().filter_map(ImportOutcome::path)
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }
}

/// What a successful single import produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Imported {
    Copied(PathBuf),
    Converted(PathBuf),
}

pub(crate) struct Importer<'a> {
    pub media_dir: &'a Path,
    pub staging_dir: &'a Path,
    pub resolver: &'a dyn ContentResolver,
    pub converter: &'a dyn Converter,
}

impl Importer<'_> {
    pub fn import_one(&self, content: &ContentRef, declared: MediaKind) -> Result<Imported> {
        let original_name = resolve_name(self.resolver, content);
        let mime = self.resolver.mime_type(content);
        let kind = effective_kind(declared, mime.as_deref(), original_name.as_deref());
        debug!(
            %content, %declared, effective = %kind,
            name = original_name.as_deref().unwrap_or("<unresolved>"),
            mime = mime.as_deref().unwrap_or("<unknown>"),
            "import: resolved"
        );

        match kind {
            MediaKind::Image => self.convert_image(content, original_name.as_deref()),
            MediaKind::Video | MediaKind::Audio => {
                self.copy_direct(content, original_name.as_deref(), declared)
            }
        }
    }

    fn convert_image(&self, content: &ContentRef, original: Option<&str>) -> Result<Imported> {
        fs::create_dir_all(self.staging_dir)?;
        let staged = StagedFile(self.staging_dir.join(staged_file_name(original)));
        let written = copy_content(self.resolver, content, &staged.0)?;
        debug!(staged = %staged.0.display(), bytes = written, "import: staged");

        let len = fs::metadata(&staged.0).map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            return Err(Error::EmptyStage(staged.0.clone()));
        }

        fs::create_dir_all(self.media_dir)?;
        let produced = self.converter.convert(&staged.0, self.media_dir)?;
        let produced_len = fs::metadata(&produced).map(|m| m.len()).unwrap_or(0);
        if produced_len == 0 {
            return Err(Error::Conversion {
                path: staged.0.clone(),
                reason: format!("missing or empty output {}", produced.display()),
            });
        }
        info!(output = %produced.display(), bytes = produced_len, "import: converted");
        Ok(Imported::Converted(produced))
    }

    fn copy_direct(
        &self,
        content: &ContentRef,
        original: Option<&str>,
        declared: MediaKind,
    ) -> Result<Imported> {
        fs::create_dir_all(self.media_dir)?;
        let name = destination_name(original, declared);
        let dest = self.media_dir.join(&name);
        // `dest` is only touched once the whole stream is on disk.
        let partial = StagedFile(self.media_dir.join(partial_file_name(&name)));
        let written = copy_content(self.resolver, content, &partial.0)?;
        fs::rename(&partial.0, &dest)?;
        make_world_readable(&dest);
        info!(dest = %dest.display(), bytes = written, "import: saved");
        Ok(Imported::Copied(dest))
    }
}

/// Temporary copy removed on drop, whatever the outcome.
struct StagedFile(PathBuf);

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(err) = delete_if_exists(&self.0) {
            warn!(path = %self.0.display(), error = %err, "import: could not remove staged file");
        }
    }
}

fn copy_content(resolver: &dyn ContentResolver, content: &ContentRef, dest: &Path) -> Result<u64> {
    let mut input = resolver
        .open(content)
        .map_err(|e| Error::Unreadable(format!("{content}: {e}")))?;
    let mut output = File::create(dest)?;
    Ok(io::copy(&mut input, &mut output)?)
}

/// Provider display name, else the reference's trailing path segment.
pub fn resolve_name(resolver: &dyn ContentResolver, content: &ContentRef) -> Option<String> {
    resolver
        .display_name(content)
        .filter(|n| !n.is_empty())
        .or_else(|| content.last_segment().map(str::to_string))
}

/// Images routed into the video slot are handled as images.
pub fn effective_kind(declared: MediaKind, mime: Option<&str>, name: Option<&str>) -> MediaKind {
    if declared != MediaKind::Video {
        return declared;
    }
    let image_mime = mime.is_some_and(|m| m.starts_with("image/"));
    let image_ext = name
        .and_then(|n| split_name(n).1)
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| CONVERTIBLE_IMAGE_EXTS.contains(&ext.as_str()));
    if image_mime || image_ext {
        MediaKind::Image
    } else {
        declared
    }
}

/// `<sanitized base>.<ext>` for a staged image; base defaults to `img`,
/// extension to `jpg`.
pub fn staged_file_name(original: Option<&str>) -> String {
    let (base, ext) = match original {
        Some(name) => split_name(name),
        None => ("img", None),
    };
    let ext = ext.filter(|e| !e.is_empty()).unwrap_or("jpg");
    format!("{}.{}", sanitize_base_name(base), sanitize_base_name(ext))
}

/// Hidden in-progress name for `name`; the scanner skips its extension.
pub fn partial_file_name(name: &str) -> String {
    format!(".{name}.part")
}

/// Final name for a directly copied file: the resolved name's last path
/// component, or `media_<unix-millis>.<ext>` when unresolved.
pub fn destination_name(original: Option<&str>, declared: MediaKind) -> String {
    let resolved = original
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty());
    if let Some(name) = resolved {
        return name;
    }
    let ext = if declared == MediaKind::Audio { "mp3" } else { "mp4" };
    format!("media_{}.{ext}", chrono::Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_slot_images_are_reclassified() {
        use MediaKind::*;
        assert_eq!(effective_kind(Video, Some("image/png"), None), Image);
        assert_eq!(effective_kind(Video, None, Some("photo.WEBP")), Image);
        assert_eq!(effective_kind(Video, Some("video/mp4"), Some("clip.mp4")), Video);
        assert_eq!(effective_kind(Video, None, None), Video);
        // Only the video slot is re-routed.
        assert_eq!(effective_kind(Audio, Some("image/jpeg"), Some("x.jpg")), Audio);
        assert_eq!(effective_kind(Image, None, Some("x.mp4")), Image);
    }

    #[test]
    fn staged_names() {
        assert_eq!(staged_file_name(Some("Beach day!.png")), "Beach_day_.png");
        assert_eq!(staged_file_name(Some("noext")), "noext.jpg");
        assert_eq!(staged_file_name(None), "img.jpg");
        let long = format!("{}.jpeg", "x".repeat(40));
        assert_eq!(staged_file_name(Some(&long)), format!("{}.jpeg", "x".repeat(30)));
    }

    #[test]
    fn destination_names() {
        assert_eq!(destination_name(Some("clip.mov"), MediaKind::Video), "clip.mov");
        assert_eq!(destination_name(Some("../../etc/evil.mp4"), MediaKind::Video), "evil.mp4");

        let v = destination_name(None, MediaKind::Video);
        assert!(v.starts_with("media_") && v.ends_with(".mp4"), "{v}");
        let a = destination_name(None, MediaKind::Audio);
        assert!(a.ends_with(".mp3"), "{a}");
    }

    #[test]
    fn partial_names_are_hidden_and_unscanned() {
        let part = partial_file_name("clip.mp4");
        assert_eq!(part, ".clip.mp4.part");
        assert_eq!(MediaKind::from_path(Path::new(&part)), None);
    }
}
