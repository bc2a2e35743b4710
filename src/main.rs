//! padlab - configuration editor for HayBox-style controller firmware

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use padlab::cli::Repl;
use padlab::haybox::EmulatedConnector;
use padlab::layout::{LayoutCatalog, LayoutWatcher};
use padlab::manager::ConnectionManager;

/// padlab - edit HayBox-style controller configurations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding index.json and layout files
    #[arg(short, long, default_value = "layouts")]
    layouts: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'v', long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Backing file for the emulated device
    #[arg(long)]
    emulated_store: Option<PathBuf>,

    /// Reload the layout catalog when files change
    #[arg(long)]
    watch_layouts: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting padlab...");
    info!("Layouts directory: {}", args.layouts.display());

    let (watcher, catalog) = if args.watch_layouts {
        let (watcher, catalog) = LayoutWatcher::new(&args.layouts).await?;
        (Some(watcher), catalog)
    } else {
        (None, LayoutCatalog::load(&args.layouts).await?)
    };
    info!("Loaded {} layouts", catalog.layouts().len());

    let store = args
        .emulated_store
        .unwrap_or_else(EmulatedConnector::default_path);
    info!("Emulated device store: {}", store.display());
    let connector = EmulatedConnector::new(store);

    let manager = ConnectionManager::new(Box::new(connector), catalog);
    let mut repl = Repl::new(manager);
    if let Some(watcher) = watcher {
        repl.set_layout_watcher(watcher);
    }

    repl.run().await?;

    info!("padlab shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
