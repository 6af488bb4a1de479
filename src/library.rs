//! The media library: scan/aggregate cycles, selection, import and deletion
//! over one managed directory.
//!
//! Every operation re-reads the filesystem and the Config Store; nothing is
//! cached between calls except the last published [`LibraryState`]. Blocking
//! work runs on the tokio blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tokio::task;
use tracing::{info, instrument, warn};

use crate::config::Configuration;
use crate::content::{ContentRef, ContentResolver, FsContentResolver};
use crate::convert::{Converter, FfmpegConverter};
use crate::error::Result;
use crate::fsutil::delete_if_exists;
use crate::import::{ImportOutcome, ImportReport, Imported, Importer};
use crate::media::{MediaItem, MediaKind};
use crate::notifier::{
    CONFIG_CHANGE_URI, ChangeNotifier, NullNotifier, StampFileNotifier, notify_quietly,
};
use crate::scan::{FfprobeReader, MetadataReader, NoMetadata, scan_dir};
use crate::snapshot::{LibrarySnapshot, LibraryState, Selections};
use crate::store::{ConfigStore, JsonConfigStore, selection_key};

#[derive(Clone)]
pub struct MediaLibrary {
    inner: Arc<Inner>,
}

struct Inner {
    media_dir: PathBuf,
    staging_dir: PathBuf,
    store: Arc<dyn ConfigStore>,
    reader: Arc<dyn MetadataReader>,
    converter: Arc<dyn Converter>,
    resolver: Arc<dyn ContentResolver>,
    notifier: Arc<dyn ChangeNotifier>,
    state: watch::Sender<LibraryState>,
    in_flight: AtomicUsize,
}

impl std::fmt::Debug for MediaLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaLibrary")
            .field("media_dir", &self.inner.media_dir)
            .field("staging_dir", &self.inner.staging_dir)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`MediaLibrary`] from its collaborators.
pub struct LibraryBuilder {
    media_dir: PathBuf,
    staging_dir: Option<PathBuf>,
    store: Option<Arc<dyn ConfigStore>>,
    reader: Option<Arc<dyn MetadataReader>>,
    converter: Option<Arc<dyn Converter>>,
    resolver: Option<Arc<dyn ContentResolver>>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
}

impl LibraryBuilder {
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn metadata_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> MediaLibrary {
        let media_dir = self.media_dir;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(JsonConfigStore::in_dir(&media_dir)));
        let (state, _) = watch::channel(LibraryState::default());
        MediaLibrary {
            inner: Arc::new(Inner {
                staging_dir: self
                    .staging_dir
                    .unwrap_or_else(|| std::env::temp_dir().join("camswap")),
                store,
                reader: self.reader.unwrap_or_else(|| Arc::new(FfprobeReader::default())),
                converter: self
                    .converter
                    .unwrap_or_else(|| Arc::new(FfmpegConverter::new(Default::default()))),
                resolver: self.resolver.unwrap_or_else(|| Arc::new(FsContentResolver)),
                notifier: self.notifier.unwrap_or_else(|| Arc::new(NullNotifier)),
                state,
                in_flight: AtomicUsize::new(0),
                media_dir,
            }),
        }
    }
}

/// Marks the library as loading for as long as it is alive.
struct Loading<'a>(&'a Inner);

impl<'a> Loading<'a> {
    fn begin(inner: &'a Inner) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        inner.publish_loading();
        Self(inner)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.publish_loading();
    }
}

impl MediaLibrary {
    pub fn builder(media_dir: impl Into<PathBuf>) -> LibraryBuilder {
        LibraryBuilder {
            media_dir: media_dir.into(),
            staging_dir: None,
            store: None,
            reader: None,
            converter: None,
            resolver: None,
            notifier: None,
        }
    }

    /// Library wired to the on-disk store, ffprobe/ffmpeg and the filesystem
    /// resolver described by `cfg`, sharing `store` with other components.
    pub fn from_config(cfg: &Configuration, store: Arc<dyn ConfigStore>) -> Self {
        let reader: Arc<dyn MetadataReader> = if cfg.probe_durations {
            Arc::new(FfprobeReader::new(&cfg.ffprobe_path))
        } else {
            Arc::new(NoMetadata)
        };
        let notifier: Arc<dyn ChangeNotifier> = match &cfg.notify_stamp_file {
            Some(path) => Arc::new(StampFileNotifier::new(path)),
            None => Arc::new(NullNotifier),
        };
        Self::builder(&cfg.media_dir)
            .staging_dir(cfg.staging_dir())
            .store(store)
            .metadata_reader(reader)
            .converter(Arc::new(FfmpegConverter::new(cfg.converter.clone())))
            .notifier(notifier)
            .build()
    }

    pub fn media_dir(&self) -> &Path {
        &self.inner.media_dir
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.inner.store
    }

    pub fn subscribe(&self) -> watch::Receiver<LibraryState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> LibraryState {
        self.inner.state.borrow().clone()
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        self.inner.state.borrow().snapshot.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Rescan the directory, re-read selections and publish a new snapshot.
    #[instrument(skip(self), fields(dir = %self.inner.media_dir.display()))]
    pub async fn refresh(&self) -> Result<LibrarySnapshot> {
        let _loading = Loading::begin(&self.inner);
        let inner = self.inner.clone();
        let snapshot = task::spawn_blocking(move || -> Result<LibrarySnapshot> {
            let scan = scan_dir(&inner.media_dir, inner.reader.as_ref())?;
            inner.store.reload();
            let selections = Selections {
                video: inner.store.selected(MediaKind::Video),
                image: inner.store.selected(MediaKind::Image),
                audio: inner.store.selected(MediaKind::Audio),
            };
            Ok(LibrarySnapshot::aggregate(scan, selections))
        })
        .await??;
        self.inner
            .state
            .send_modify(|s| s.snapshot = snapshot.clone());
        info!(
            videos = snapshot.videos.len(),
            images = snapshot.images.len(),
            audios = snapshot.audios.len(),
            duration = %snapshot.total_video_duration,
            "library refreshed"
        );
        Ok(snapshot)
    }

    /// Toggle `item` as the active file of its kind and return the new
    /// selection.
    ///
    /// Video and audio reload the store before comparing and rescan
    /// afterwards; video also emits a change notification. Image selection
    /// only updates the store and the published state.
    #[instrument(skip(self, item), fields(kind = %item.kind, name = %item.name))]
    pub async fn select(&self, item: &MediaItem) -> Result<Option<String>> {
        let kind = item.kind;
        let name = item.name.clone();
        let selected = match kind {
            MediaKind::Image => {
                let current = self.snapshot().selected_image;
                let next = toggled(current.as_deref(), &name);
                let inner = self.inner.clone();
                let value = next.clone().unwrap_or_default();
                task::spawn_blocking(move || {
                    inner.store.set_string(selection_key(MediaKind::Image), &value)
                })
                .await??;
                next
            }
            MediaKind::Video | MediaKind::Audio => {
                let inner = self.inner.clone();
                task::spawn_blocking(move || -> Result<Option<String>> {
                    inner.store.reload();
                    let current = inner.store.selected(kind);
                    let next = toggled(current.as_deref(), &name);
                    inner
                        .store
                        .set_string(selection_key(kind), next.as_deref().unwrap_or(""))?;
                    Ok(next)
                })
                .await??
            }
        };

        self.inner
            .state
            .send_modify(|s| s.snapshot.set_selected(kind, selected.clone()));
        info!(selected = selected.as_deref().unwrap_or("<none>"), "selection changed");

        if kind == MediaKind::Video {
            notify_quietly(self.inner.notifier.as_ref(), CONFIG_CHANGE_URI);
        }
        if kind != MediaKind::Image {
            self.refresh().await?;
        }
        Ok(selected)
    }

    /// Import `refs` declared as `kind`, one at a time and in order, then
    /// rescan. A failing reference is logged and skipped.
    #[instrument(skip(self, refs), fields(count = refs.len()))]
    pub async fn add_media(&self, refs: Vec<ContentRef>, kind: MediaKind) -> Result<ImportReport> {
        let loading = Loading::begin(&self.inner);
        let inner = self.inner.clone();
        let report = task::spawn_blocking(move || {
            let importer = Importer {
                media_dir: &inner.media_dir,
                staging_dir: &inner.staging_dir,
                resolver: inner.resolver.as_ref(),
                converter: inner.converter.as_ref(),
            };
            let mut report = ImportReport::default();
            for content in refs {
                let outcome = match importer.import_one(&content, kind) {
                    Ok(Imported::Copied(path)) => ImportOutcome::Copied { content, path },
                    Ok(Imported::Converted(path)) => {
                        inner.auto_select_video(&path);
                        ImportOutcome::Converted { content, path }
                    }
                    Err(err) => {
                        warn!(%content, error = %err, "import failed; skipping");
                        ImportOutcome::Skipped {
                            content,
                            reason: err.to_string(),
                        }
                    }
                };
                report.outcomes.push(outcome);
            }
            report
        })
        .await?;

        info!(
            imported = report.outcomes.len() - report.skipped(),
            skipped = report.skipped(),
            "import batch finished"
        );
        let refreshed = self.refresh().await;
        drop(loading);
        refreshed?;
        Ok(report)
    }

    /// Remove `item` from disk if still present, then rescan.
    #[instrument(skip(self, item), fields(name = %item.name))]
    pub async fn delete(&self, item: &MediaItem) -> Result<LibrarySnapshot> {
        let path = item.path.clone();
        task::spawn_blocking(move || remove_quietly(&path)).await?;
        self.refresh().await
    }

    /// Remove every file of `kind` known to the current snapshot, then rescan.
    #[instrument(skip(self))]
    pub async fn clear_all(&self, kind: MediaKind) -> Result<LibrarySnapshot> {
        let paths: Vec<PathBuf> = self
            .snapshot()
            .items(kind)
            .iter()
            .map(|i| i.path.clone())
            .collect();
        info!(count = paths.len(), "clearing library kind");
        task::spawn_blocking(move || paths.iter().for_each(|p| remove_quietly(p))).await?;
        self.refresh().await
    }
}

impl Inner {
    /// Recompute `is_loading` from the in-flight counter under the watch lock.
    fn publish_loading(&self) {
        self.state.send_if_modified(|s| {
            let busy = self.in_flight.load(Ordering::SeqCst) > 0;
            std::mem::replace(&mut s.is_loading, busy) != busy
        });
    }

    fn auto_select_video(&self, path: &Path) {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return;
        };
        if let Err(err) = self.store.set_string(selection_key(MediaKind::Video), &name) {
            warn!(name, error = %err, "could not persist converted video selection");
        }
        self.state
            .send_modify(|s| s.snapshot.selected_video = Some(name.clone()));
        notify_quietly(self.notifier.as_ref(), CONFIG_CHANGE_URI);
    }
}

fn toggled(current: Option<&str>, name: &str) -> Option<String> {
    if current == Some(name) {
        None
    } else {
        Some(name.to_string())
    }
}

fn remove_quietly(path: &Path) {
    if let Err(err) = delete_if_exists(path) {
        warn!(path = %path.display(), error = %err, "delete failed");
    }
}
