// treeplay - fold your library into a tree, queue whole albums at a keystroke

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use treeplay::{
    catalog::{load_catalog, save_catalog, CatalogScanner, ScanProgress},
    history::{HistoryDatabase, HistoryWriter},
    logging::{init_logging, redirect_stderr_to_null},
    playback::{PlaybackEngine, PlayerUpdate, RodioBackend},
    ui::App,
    Config, TrackTree,
};

#[derive(Parser)]
#[command(name = "treeplay")]
#[command(about = "A terminal music browser: artist -> album -> track, one keystroke to queue")]
struct Args {
    /// Rescan the music directory instead of loading the saved catalog
    #[arg(long)]
    scan: bool,

    /// Music directory to scan (overrides the config)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Don't capture the mouse wheel for scrolling
    #[arg(long)]
    no_scroll: bool,

    /// Show the view debug line under the progress bar
    #[arg(long)]
    debug: bool,

    /// Enable developer logging (debug level, stderr left alone)
    #[arg(long)]
    dev: bool,
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(root) = &args.root {
        config.music_directory = root.clone();
    }
    if args.no_scroll {
        config.ui.scroll_input = false;
    }
    if args.debug {
        config.ui.debug_overlay = true;
    }
}

fn scan_library(config: &Config, database: &mut HistoryDatabase) -> Result<TrackTree> {
    println!("Scanning {} ...", config.music_directory.display());

    let report = CatalogScanner::new()
        .scan(&config.music_directory, database, |progress: ScanProgress| {
            // Update every 50 files for smooth feedback
            if (progress.loaded + progress.skipped) % 50 == 0 {
                print!("\r  {} loaded, {} skipped", progress.loaded, progress.skipped);
                let _ = io::stdout().flush();
            }
        })
        .context("Library scan failed")?;
    println!(
        "\r  {} loaded, {} skipped",
        report.loaded, report.skipped
    );

    save_catalog(&config.catalog_path, &report.root).context("Failed to save catalog")?;
    Ok(TrackTree::new(report.root))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load()?;
    apply_overrides(&mut config, &args);

    init_logging(&config.log_directory, args.dev)?;
    info!("treeplay starting up");

    let mut database = HistoryDatabase::new(&config.database_path).with_context(|| {
        format!("Failed to open history database {}", config.database_path.display())
    })?;

    let tree = if args.scan {
        scan_library(&config, &mut database)?
    } else {
        let root = load_catalog(&config.catalog_path).with_context(|| {
            format!(
                "Could not load catalog {} (run with --scan to build it)",
                config.catalog_path.display()
            )
        })?;
        TrackTree::new(root)
    };

    // Only redirect stderr if NOT in dev mode (ALSA likes to talk)
    let stderr_redirect = if args.dev {
        None
    } else {
        debug!("Redirecting stderr to suppress audio stack noise");
        match redirect_stderr_to_null() {
            Ok(redirect) => Some(redirect),
            Err(e) => {
                warn!("Keeping stderr: {}", e);
                None
            }
        }
    };

    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let failures = updates_tx.clone();
    let (history, history_worker) = HistoryWriter::spawn(database, move |e| {
        let _ = failures.send(PlayerUpdate::HistoryFailed(e.to_string()));
    });

    let engine = PlaybackEngine::spawn(
        RodioBackend::new,
        history,
        updates_tx,
        config.playback_settings(),
    )
    .await
    .context("Failed to start audio output")?;

    let result = match App::new(tree, engine, updates_rx, config.ui_settings()) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    // The engine went down with the app, so the last plays are queued; wait for them
    history_worker.join();

    // Terminal and audio are torn down by now; give stderr back for the exit message
    drop(stderr_redirect);
    if let Err(e) = &result {
        error!("Session ended with error: {:#}", e);
    }
    info!("treeplay shut down");
    result
}
