//! Layout catalog
//!
//! Lifecycle-scoped registry of every known hardware layout, loaded from a
//! directory holding an `index.json` plus one JSON document per layout.
//! Constructed once at startup and passed by reference to consumers.

use super::{derive_id, Layout, LayoutExport};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info};

/// One entry of the catalog index file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutIndexEntry {
    pub name: String,
    pub path: String,
}

/// Ordered collection of loaded layouts
///
/// Iteration order is load order (the index file's order), which also
/// defines auto-detection precedence.
#[derive(Debug, Clone, Default)]
pub struct LayoutCatalog {
    dir: PathBuf,
    layouts: Vec<Layout>,
}

impl LayoutCatalog {
    /// Load the catalog from a layouts directory.
    ///
    /// A failure loading one entry is logged and that entry skipped; only a
    /// missing or malformed index is fatal to the batch.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let index_path = dir.join("index.json");

        let index_text = fs::read_to_string(&index_path)
            .await
            .with_context(|| format!("Failed to read layout index: {}", index_path.display()))?;
        let index: Vec<LayoutIndexEntry> = serde_json::from_str(&index_text)
            .with_context(|| format!("Failed to parse layout index: {}", index_path.display()))?;

        let mut layouts = Vec::with_capacity(index.len());
        for entry in &index {
            match load_layout(&dir, entry).await {
                Ok(layout) => {
                    debug!("loaded layout {} ({})", layout.name, layout.id);
                    layouts.push(layout);
                }
                Err(e) => {
                    error!("failed to load layout {}: {e:#}", entry.path);
                }
            }
        }

        info!("layout catalog ready ({} layouts)", layouts.len());
        Ok(Self { dir, layouts })
    }

    /// Directory the catalog was loaded from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.id == id)
    }

    /// Auto-detect the layout for a device by its reported name.
    ///
    /// First match wins, in load order.
    pub fn match_device(&self, device_name: &str) -> Option<&Layout> {
        let found = self.layouts.iter().find(|l| l.matches_device(device_name));
        if found.is_none() {
            debug!(
                "no layout matched {device_name:?}; tested {:?}",
                self.layouts
                    .iter()
                    .map(|l| (l.device_name.as_deref(), l.pattern_source.as_deref()))
                    .collect::<Vec<_>>()
            );
        }
        found
    }

    /// Build a catalog directly from in-memory layouts
    pub fn from_layouts(layouts: Vec<Layout>) -> Self {
        Self {
            dir: PathBuf::new(),
            layouts,
        }
    }
}

async fn load_layout(dir: &Path, entry: &LayoutIndexEntry) -> Result<Layout> {
    let path = dir.join(&entry.path);
    let text = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read layout file: {}", path.display()))?;

    let export: LayoutExport = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse layout file: {}", path.display()))?;

    let mut layout = Layout::from_export(export);
    // Ids derive from the index path (`a/b/c.json` -> `a_b_c`) so two files
    // sharing a display name stay distinct in the catalog.
    layout.id = derive_id(entry.path.trim_end_matches(".json"));
    Ok(layout)
}
