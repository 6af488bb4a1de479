use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::Configuration;
use crate::events::LibraryCommand;
use crate::library::MediaLibrary;
use crate::tasks::{config_watch, library};

/// Long-running mode: the library task plus, when enabled, the config
/// watcher. Returns once `cancel` fires or a worker fails.
///
/// The command sender stays owned here until shutdown, so the library task
/// keeps serving even when no watcher holds a clone.
#[instrument(skip_all, fields(dir = %lib.media_dir().display()))]
pub async fn run(cfg: &Configuration, lib: MediaLibrary, cancel: CancellationToken) -> Result<()> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<LibraryCommand>(cfg.command_queue);
    let mut workers = JoinSet::new();

    workers.spawn({
        let lib = lib.clone();
        let cancel = cancel.clone();
        async move {
            library::run(lib, cmd_rx, cancel)
                .await
                .context("library task failed")
        }
    });

    if cfg.watch_config {
        workers.spawn({
            let config_file = cfg.config_file();
            let store = lib.store().clone();
            let cmd_tx = cmd_tx.clone();
            let cancel = cancel.clone();
            let settle = cfg.watch_settle;
            async move {
                config_watch::run(config_file, store, cmd_tx, settle, cancel)
                    .await
                    .context("config watcher failed")
            }
        });
    } else {
        info!("config watcher disabled");
    }

    while let Some(res) = workers.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                cancel.cancel();
                return Err(err);
            }
            Err(err) => {
                cancel.cancel();
                bail!("task panicked: {err}");
            }
        }
    }
    drop(cmd_tx);
    Ok(())
}
