use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc::{self, Sender};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::events::LibraryCommand;
use crate::store::ConfigStore;

/// Watch the directory holding `config_file` for writes by other processes.
///
/// Each burst of `.json` create/modify/rename events is settled for `settle`,
/// then the store is force-reloaded and a [`LibraryCommand::Refresh`] is queued.
#[instrument(
    skip(config_file, store, to_library, cancel),
    fields(config = %config_file.display())
)]
pub async fn run(
    config_file: PathBuf,
    store: Arc<dyn ConfigStore>,
    to_library: Sender<LibraryCommand>,
    settle: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let dir = config_file
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    // Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(watching = %dir.display(), "config watcher initialized");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting config watcher");
                break;
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) => {
                    if !is_config_write(&event) {
                        debug!(kind = ?event.kind, "config watch: ignored");
                        continue;
                    }
                    debug!(kind = ?event.kind, paths = ?event.paths, "config watch: change");
                    sleep(settle).await;
                    // Coalesce whatever arrived while settling.
                    while watch_rx.try_recv().is_ok() {}

                    let reload_store = store.clone();
                    tokio::task::spawn_blocking(move || reload_store.force_reload())
                        .await
                        .context("config reload worker failed")?;
                    info!("config changed on disk; refreshing library");
                    if to_library.send(LibraryCommand::Refresh).await.is_err() {
                        info!("library task gone; exiting config watcher");
                        break;
                    }
                }
                Err(err) => error!("watch error: {err}"),
            }
        }
    }
    Ok(())
}

fn is_config_write(event: &Event) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    );
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.extension().and_then(OsStr::to_str) == Some("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_json_writes_count() {
        let data = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(is_config_write(&event(data, "/m/cs_config.json")));
        assert!(is_config_write(&event(EventKind::Create(CreateKind::File), "/m/x.json")));
        assert!(!is_config_write(&event(data, "/m/clip.mp4")));
        assert!(!is_config_write(&event(EventKind::Remove(RemoveKind::File), "/m/cs_config.json")));
    }
}
