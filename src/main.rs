//! Binary entrypoint for camswap.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use camswap::config::Configuration;
use camswap::content::ContentRef;
use camswap::store::{ConfigStore, JsonConfigStore};
use camswap::{LibrarySnapshot, MediaKind, MediaLibrary, locale, settings, tasks};
use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "camswap", version, about = "Manage the camera swap media library")]
struct Cli {
    /// Path to YAML config file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the managed media directory
    #[arg(long, value_name = "DIR")]
    media_dir: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan the library and print the snapshot
    Scan {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Toggle the active file for a kind
    Select { kind: MediaKind, name: String },
    /// Import files into the library
    Import {
        kind: MediaKind,
        #[arg(required = true)]
        sources: Vec<String>,
    },
    /// Delete one library file
    Delete { kind: MediaKind, name: String },
    /// Delete every library file of a kind
    Clear { kind: MediaKind },
    /// Inspect or change feature toggles
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show, set or clear the UI language
    Locale {
        lang: Option<String>,
        #[arg(long, conflicts_with = "lang")]
        clear: bool,
    },
    /// Keep the library task and config watcher running until ctrl-c
    Run,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    Set { key: String, value: String },
    AddPackage { package: String },
    RemovePackage { package: String },
    Export,
    Import { file: PathBuf },
    Reset,
    /// Convert legacy marker files into toggles
    Migrate,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(format!("camswap={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Configuration> {
    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(dir) = &cli.media_dir {
        cfg.media_dir = dir.clone();
    }
    cfg.validated().context("validating configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    let cfg = load_config(&cli)?;

    let store: Arc<dyn ConfigStore> = Arc::new(JsonConfigStore::open(cfg.config_file()));
    let library = MediaLibrary::from_config(&cfg, store.clone());

    match cli.command {
        Command::Scan { json } => {
            let snapshot = library.refresh().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
        }
        Command::Select { kind, name } => {
            let snapshot = library.refresh().await?;
            let item = snapshot
                .find(kind, &name)
                .ok_or_else(|| anyhow!("no {kind} named {name} in {}", cfg.media_dir.display()))?;
            match library.select(item).await? {
                Some(active) => println!("selected {kind}: {active}"),
                None => println!("cleared {kind} selection"),
            }
        }
        Command::Import { kind, sources } => {
            let refs = sources.into_iter().map(ContentRef::new).collect();
            let report = library.add_media(refs, kind).await?;
            for outcome in &report.outcomes {
                match outcome.path() {
                    Some(path) => println!("imported {} -> {}", outcome.content(), path.display()),
                    None => println!("skipped {}", outcome.content()),
                }
            }
            if report.skipped() > 0 {
                warn!(skipped = report.skipped(), "some sources were not imported");
            }
        }
        Command::Delete { kind, name } => {
            let snapshot = library.refresh().await?;
            match snapshot.find(kind, &name) {
                Some(item) => {
                    library.delete(item).await?;
                    println!("deleted {name}");
                }
                None => println!("{name} not in library; nothing to delete"),
            }
        }
        Command::Clear { kind } => {
            library.refresh().await?;
            let after = library.clear_all(kind).await?;
            println!("{kind} files remaining: {}", after.items(kind).len());
        }
        Command::Settings { action } => run_settings(action, store.as_ref(), &cfg)?,
        Command::Locale { lang, clear } => {
            if clear {
                locale::set_language(store.as_ref(), None)?;
            } else if let Some(lang) = lang {
                locale::set_language(store.as_ref(), Some(&lang))?;
            }
            match locale::language(store.as_ref()) {
                Some(lang) => println!("{lang} ({})", locale::locale_for(&lang)),
                None => println!("system default"),
            }
        }
        Command::Run => run_service(cfg, library).await?,
    }
    Ok(())
}

fn run_settings(action: SettingsAction, store: &dyn ConfigStore, cfg: &Configuration) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let current = settings::Settings::load(store);
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        SettingsAction::Set { key, value } => settings::set_from_str(store, &key, &value)?,
        SettingsAction::AddPackage { package } => settings::add_target_package(store, &package)?,
        SettingsAction::RemovePackage { package } => {
            settings::remove_target_package(store, &package)?
        }
        SettingsAction::Export => println!("{}", store.export_json()?),
        SettingsAction::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            store.import_json(&json).context("importing settings")?;
        }
        SettingsAction::Reset => store.reset_to_default()?,
        SettingsAction::Migrate => {
            if settings::migrate_legacy_markers(store, &cfg.media_dir)? {
                println!("legacy markers migrated");
            } else {
                println!("nothing to migrate");
            }
        }
    }
    Ok(())
}

async fn run_service(cfg: Configuration, library: MediaLibrary) -> Result<()> {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    {
        let mut state_rx = library.subscribe();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = state_rx.borrow_and_update().clone();
                        if !state.is_loading {
                            info!(
                                videos = state.snapshot.videos.len(),
                                images = state.snapshot.images.len(),
                                audios = state.snapshot.audios.len(),
                                selected_video = state.snapshot.selected_video.as_deref().unwrap_or("-"),
                                "library state"
                            );
                        }
                    }
                }
            }
        });
    }

    tasks::service::run(&cfg, library, cancel).await
}

fn print_snapshot(snapshot: &LibrarySnapshot) {
    for kind in MediaKind::ALL {
        let selected = snapshot.selected(kind);
        let total_mb = match kind {
            MediaKind::Video => snapshot.total_video_size_mb,
            MediaKind::Image => snapshot.total_image_size_mb,
            MediaKind::Audio => snapshot.total_audio_size_mb,
        };
        println!("{kind} ({} files, {total_mb:.2} MB)", snapshot.items(kind).len());
        for item in snapshot.items(kind) {
            let marker = if selected == Some(item.name.as_str()) { '*' } else { ' ' };
            let duration = humantime::format_duration(Duration::from_millis(item.duration_ms));
            if kind.is_timed() {
                println!(" {marker} {:<40} {:>10} B  {duration}", item.display_name, item.size_bytes);
            } else {
                println!(" {marker} {:<40} {:>10} B", item.display_name, item.size_bytes);
            }
        }
    }
    println!("total video duration: {}", snapshot.total_video_duration);
}
