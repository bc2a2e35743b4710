//! Author-time layout editor state
//!
//! A mutable working copy of a layout being authored, distinct from profile
//! state (which mirrors a live device's config). Persisted locally as the
//! export JSON form so a session can be resumed or shared.

use crate::bindings::{Binding, PhysicalButton};
use crate::layout::{derive_id, parse_pattern, ImportError, Layout, LayoutModeConfig};
use crate::modes::GameMode;
use crate::socd::SocdType;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

/// Layout under construction
#[derive(Debug, Clone)]
pub struct EditorState {
    layout: Layout,
    selected_mode: GameMode,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorState {
    /// Fresh empty layout
    pub fn new() -> Self {
        Self::from_layout(Layout::from_export(crate::layout::LayoutExport {
            name: "New Layout".into(),
            device_name: None,
            pattern: None,
            viewport: (
                crate::layout::DEFAULT_VIEWPORT_WIDTH,
                crate::layout::DEFAULT_VIEWPORT_HEIGHT,
            ),
            buttons: Vec::new(),
            modes: Default::default(),
            options: Default::default(),
        }))
    }

    /// Start editing an existing layout
    pub fn from_layout(layout: Layout) -> Self {
        Self {
            layout,
            selected_mode: GameMode::Melee,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn selected_mode(&self) -> GameMode {
        self.selected_mode
    }

    pub fn select_mode(&mut self, mode: GameMode) {
        self.selected_mode = mode;
    }

    /// Rename; the id re-derives from the new name
    pub fn set_name(&mut self, name: &str) {
        self.layout.name = name.to_string();
        self.layout.id = derive_id(name);
    }

    pub fn set_device_name(&mut self, device_name: Option<String>) {
        self.layout.device_name = device_name;
    }

    /// Set the `/<body>/<flags>` matcher; an unparsable pattern clears it
    pub fn set_pattern(&mut self, pattern: Option<String>) {
        self.layout.pattern = pattern.as_deref().and_then(parse_pattern);
        self.layout.pattern_source = if self.layout.pattern.is_some() {
            pattern
        } else {
            None
        };
    }

    /// Resize the canvas; existing buttons are pulled inside the new bounds
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.layout.viewport = (width.max(1.0), height.max(1.0));
        let (w, h) = self.layout.viewport;
        for (_, x, y) in &mut self.layout.buttons {
            *x = x.clamp(0.0, w);
            *y = y.clamp(0.0, h);
        }
    }

    fn clamp_position(&self, x: f64, y: f64) -> (f64, f64) {
        let (w, h) = self.layout.viewport;
        (x.clamp(0.0, w), y.clamp(0.0, h))
    }

    /// Place a new button; its slot number is the lowest unused one.
    /// Returns `None` when every slot code is taken.
    pub fn add_button(&mut self, x: f64, y: f64) -> Option<PhysicalButton> {
        let slot = (1..=u8::MAX).find(|&slot| {
            !self
                .layout
                .buttons
                .iter()
                .any(|(p, _, _)| *p == PhysicalButton::Slot(slot))
        })?;
        let physical = PhysicalButton::Slot(slot);
        let (x, y) = self.clamp_position(x, y);
        self.layout.buttons.push((physical, x, y));
        debug!("placed {physical} at ({x}, {y})");
        Some(physical)
    }

    pub fn move_button(&mut self, physical: PhysicalButton, x: f64, y: f64) -> bool {
        let (x, y) = self.clamp_position(x, y);
        match self
            .layout
            .buttons
            .iter_mut()
            .find(|(p, _, _)| *p == physical)
        {
            Some((_, bx, by)) => {
                *bx = x;
                *by = y;
                true
            }
            None => false,
        }
    }

    /// Remove a button and every mode assignment referencing it
    pub fn remove_button(&mut self, physical: PhysicalButton) -> bool {
        let before = self.layout.buttons.len();
        self.layout.buttons.retain(|(p, _, _)| *p != physical);
        if self.layout.buttons.len() == before {
            return false;
        }
        for mode in self.layout.modes.values_mut() {
            mode.bindings.retain(|slot| slot.physical != physical);
        }
        true
    }

    fn mode_config(&mut self, mode: GameMode) -> &mut LayoutModeConfig {
        self.layout.modes.entry(mode).or_default()
    }

    /// Assign a binding to a physical button in the selected mode
    pub fn assign_binding(&mut self, physical: PhysicalButton, binding: Binding) -> bool {
        if !self.layout.buttons.iter().any(|(p, _, _)| *p == physical) {
            return false;
        }
        let mode = self.selected_mode;
        let config = self.mode_config(mode);
        match config
            .bindings
            .iter_mut()
            .find(|slot| slot.physical == physical && !slot.hidden)
        {
            Some(slot) => slot.binding = binding,
            None => config.bindings.push(crate::layout::BindingSlot {
                physical,
                binding,
                hidden: false,
            }),
        }
        true
    }

    /// Add a virtual (hidden) binding to the selected mode
    pub fn add_virtual(&mut self, binding: Binding) -> bool {
        let mode = self.selected_mode;
        let config = self.mode_config(mode);
        if config
            .bindings
            .iter()
            .any(|slot| slot.hidden && slot.binding == binding)
        {
            return false;
        }
        // A virtual binding has no physical slot.
        let Some(slot) = (100..=u8::MAX).find(|&slot| {
            !config
                .bindings
                .iter()
                .any(|s| s.physical == PhysicalButton::Slot(slot))
        }) else {
            return false;
        };
        config.bindings.push(crate::layout::BindingSlot {
            physical: PhysicalButton::Slot(slot),
            binding,
            hidden: true,
        });
        true
    }

    pub fn remove_virtual(&mut self, binding: Binding) -> bool {
        let mode = self.selected_mode;
        let config = self.mode_config(mode);
        let before = config.bindings.len();
        config
            .bindings
            .retain(|slot| !(slot.hidden && slot.binding == binding));
        config.bindings.len() != before
    }

    /// Add a SOCD pair in the selected mode.
    ///
    /// At most one pair may reference a given binding; any prior pair
    /// mention of `a` or `b` is cleared to unspecified first.
    pub fn add_socd(&mut self, a: Binding, b: Binding, kind: SocdType) {
        let mode = self.selected_mode;
        let config = self.mode_config(mode);
        for (pa, pb, _) in &mut config.socd {
            if *pa == a || *pa == b {
                *pa = Binding::Unspecified;
            }
            if *pb == a || *pb == b {
                *pb = Binding::Unspecified;
            }
        }
        config.socd.push((a, b, kind));
    }

    pub fn remove_socd(&mut self, index: usize) -> bool {
        let mode = self.selected_mode;
        let config = self.mode_config(mode);
        if index >= config.socd.len() {
            return false;
        }
        config.socd.remove(index);
        true
    }

    /// Throw away the working copy
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Replace the working copy from a user-supplied export document.
    ///
    /// Invalid input leaves the current state untouched.
    pub fn import(&mut self, text: &str) -> Result<(), ImportError> {
        let layout = Layout::import(text)?;
        info!("imported layout {:?}", layout.name);
        self.layout = layout;
        Ok(())
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(&self.layout.to_export())?;
        tokio::fs::write(path, text)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!("layout saved to {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let layout = Layout::import(&text)
            .with_context(|| format!("importing {}", path.display()))?;
        Ok(Self::from_layout(layout))
    }
}
