//! Layouts directory watcher for hot-reload support

use super::LayoutCatalog;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watches the layouts directory and sends a freshly loaded catalog whenever
/// its contents change
pub struct LayoutWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<LayoutCatalog>,
}

impl LayoutWatcher {
    /// Create a watcher for the given layouts directory.
    ///
    /// Returns the watcher and the initially loaded catalog.
    pub async fn new(dir: impl AsRef<Path>) -> Result<(Self, LayoutCatalog)> {
        let dir = dir.as_ref().to_path_buf();
        let (tx, rx) = mpsc::channel(4);

        let initial = LayoutCatalog::load(&dir)
            .await
            .context("Failed to load initial layout catalog")?;

        let reload_dir = dir.clone();
        // notify callbacks run on their own OS thread, not in Tokio context;
        // capture the runtime handle up front.
        let runtime_handle = tokio::runtime::Handle::current();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) {
                        debug!("layouts changed: {:?}", event.paths);

                        let dir = reload_dir.clone();
                        let tx = tx.clone();

                        runtime_handle.spawn(async move {
                            // Debounce: wait for file writes to complete
                            tokio::time::sleep(Duration::from_millis(100)).await;

                            match LayoutCatalog::load(&dir).await {
                                Ok(catalog) => {
                                    info!("layout catalog reloaded ({} layouts)", catalog.layouts().len());
                                    if let Err(e) = tx.send(catalog).await {
                                        error!("failed to send catalog update: {e}");
                                    }
                                }
                                Err(e) => {
                                    warn!("failed to reload layout catalog (keeping old one): {e:#}");
                                }
                            }
                        });
                    }
                }
                Err(e) => {
                    error!("layout watch error: {e}");
                }
            })?;

        watcher
            .watch(&dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch layouts directory: {}", dir.display()))?;

        info!("layout watcher started for: {}", dir.display());

        Ok((Self { _watcher: watcher, rx }, initial))
    }

    /// Wait for the next catalog reload; `None` when the watcher closed
    pub async fn next_catalog(&mut self) -> Option<LayoutCatalog> {
        self.rx.recv().await
    }

    /// Drain a pending catalog reload without blocking
    pub fn try_next_catalog(&mut self) -> Option<LayoutCatalog> {
        self.rx.try_recv().ok()
    }
}
