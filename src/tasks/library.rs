use anyhow::Result;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::events::LibraryCommand;
use crate::library::MediaLibrary;

/// Single writer for one managed directory.
///
/// Commands are executed strictly one after another in arrival order, so two
/// requests sent back-to-back never touch the directory concurrently. A failed
/// command is logged and the loop keeps going. Performs an initial refresh
/// before accepting commands.
#[instrument(skip_all, fields(dir = %library.media_dir().display()))]
pub async fn run(
    library: MediaLibrary,
    mut commands: Receiver<LibraryCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    if let Err(err) = library.refresh().await {
        warn!(error = %err, "initial scan failed");
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting library task");
                break;
            }

            maybe_cmd = commands.recv() => {
                let Some(cmd) = maybe_cmd else {
                    debug!("command channel closed; exiting library task");
                    break;
                };
                execute(&library, cmd).await;
            }
        }
    }
    Ok(())
}

async fn execute(library: &MediaLibrary, cmd: LibraryCommand) {
    debug!(?cmd, "library command");
    let outcome = match cmd {
        LibraryCommand::Refresh => library.refresh().await.map(drop),
        LibraryCommand::Select(item) => library.select(&item).await.map(drop),
        LibraryCommand::Import { refs, kind } => library.add_media(refs, kind).await.map(drop),
        LibraryCommand::Delete(item) => library.delete(&item).await.map(drop),
        LibraryCommand::ClearAll(kind) => library.clear_all(kind).await.map(drop),
    };
    if let Err(err) = outcome {
        warn!(error = %err, "library command failed");
    }
}
