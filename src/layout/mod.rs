//! Hardware layout model
//!
//! A layout describes one piece of controller hardware: ordered physical
//! button slots with 2D positions, a device-name matcher for auto-detection,
//! and per-game-mode default binding tables plus SOCD pair definitions.
//! Layouts import from / export to a persistable JSON form.

use crate::bindings::{Binding, PhysicalButton};
use crate::config::{MeleeOptions, ProjectMOptions};
use crate::modes::GameMode;
use crate::socd::SocdType;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

pub mod catalog;
pub mod watcher;

pub use catalog::LayoutCatalog;
pub use watcher::LayoutWatcher;

pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1000.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 600.0;

/// One entry of a mode's binding table
///
/// Hidden entries are *virtual* buttons: bindings reachable only through a
/// non-physical input path. They are never drawn as placeable buttons but
/// must survive import/export and transcoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BindingSlotRepr", into = "BindingSlotRepr")]
pub struct BindingSlot {
    pub physical: PhysicalButton,
    pub binding: Binding,
    pub hidden: bool,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
enum HiddenTag {
    #[serde(rename = "hidden")]
    Hidden,
}

// Export form: 2-tuples are visible bindings, 3-tuples tagged "hidden" are
// virtual. Try the 3-tuple first; untagged matching is order-sensitive.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BindingSlotRepr {
    Hidden(PhysicalButton, Binding, HiddenTag),
    Visible(PhysicalButton, Binding),
}

impl From<BindingSlotRepr> for BindingSlot {
    fn from(repr: BindingSlotRepr) -> Self {
        match repr {
            BindingSlotRepr::Hidden(physical, binding, _) => BindingSlot {
                physical,
                binding,
                hidden: true,
            },
            BindingSlotRepr::Visible(physical, binding) => BindingSlot {
                physical,
                binding,
                hidden: false,
            },
        }
    }
}

impl From<BindingSlot> for BindingSlotRepr {
    fn from(slot: BindingSlot) -> Self {
        if slot.hidden {
            BindingSlotRepr::Hidden(slot.physical, slot.binding, HiddenTag::Hidden)
        } else {
            BindingSlotRepr::Visible(slot.physical, slot.binding)
        }
    }
}

/// Per-mode section of a layout: default bindings and SOCD pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutModeConfig {
    pub bindings: Vec<BindingSlot>,
    pub socd: Vec<(Binding, Binding, SocdType)>,
}

/// Layout-declared defaults for the per-game option blocks, used when a
/// device's wire config never customized them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptionDefaults {
    pub melee: MeleeOptions,
    pub project_m: ProjectMOptions,
}

/// Persistable JSON form of a layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutExport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// `/<body>/<flags>` regular-expression matcher
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default = "default_viewport")]
    pub viewport: (f64, f64),
    #[serde(default)]
    pub buttons: Vec<(PhysicalButton, f64, f64)>,
    #[serde(default)]
    pub modes: BTreeMap<GameMode, LayoutModeConfig>,
    #[serde(default, skip_serializing_if = "is_default_options")]
    pub options: LayoutOptionDefaults,
}

fn default_viewport() -> (f64, f64) {
    (DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
}

fn is_default_options(options: &LayoutOptionDefaults) -> bool {
    *options == LayoutOptionDefaults::default()
}

/// In-memory layout
///
/// `buttons` order defines the stable indices referenced by profile state;
/// reordering invalidates saved button-index references.
#[derive(Debug, Clone)]
pub struct Layout {
    pub id: String,
    pub name: String,
    pub device_name: Option<String>,
    pub pattern: Option<Regex>,
    /// Verbatim pattern string, kept so exports don't lose regex flags
    pub pattern_source: Option<String>,
    pub viewport: (f64, f64),
    pub buttons: Vec<(PhysicalButton, f64, f64)>,
    pub modes: BTreeMap<GameMode, LayoutModeConfig>,
    pub options: LayoutOptionDefaults,
}

/// One field-level problem found while validating an export document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Import failure taxonomy; malformed JSON and schema violations are
/// reported distinctly so the caller can message them apart
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layout failed validation: {}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),
    #[error("could not import layout: {0}")]
    Other(anyhow::Error),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Derive a stable id from a layout name: trim, lowercase, runs of
/// non-alphanumerics collapsed to `_`
pub fn derive_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !id.is_empty() {
                id.push('_');
            }
            pending_sep = false;
            id.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    id
}

/// Parse a `/<body>/<flags>` pattern string
///
/// Only the `i` flag is honored. Invalid patterns degrade to `None` with a
/// warning, never an error.
pub fn parse_pattern(s: &str) -> Option<Regex> {
    let rest = s.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = rest.split_at(close);
    if body.is_empty() {
        return None;
    }
    let flags = &flags[1..];

    match RegexBuilder::new(body)
        .case_insensitive(flags.contains('i'))
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("invalid layout pattern {s:?}: {e}");
            None
        }
    }
}

/// Validate a raw export document before typed parsing.
///
/// Returns `None` when valid, otherwise the *full* list of violations so a
/// caller can present all problems at once.
pub fn validate(doc: &serde_json::Value) -> Option<Vec<ValidationIssue>> {
    use serde_json::Value;

    let mut issues = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Some(vec![ValidationIssue {
            field: "$".into(),
            reason: "expected an object".into(),
        }]);
    };

    match obj.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => {}
        Some(Value::String(_)) => issues.push(ValidationIssue {
            field: "name".into(),
            reason: "must not be empty".into(),
        }),
        Some(_) => issues.push(ValidationIssue {
            field: "name".into(),
            reason: "must be a string".into(),
        }),
        None => issues.push(ValidationIssue {
            field: "name".into(),
            reason: "is required".into(),
        }),
    }

    for field in ["deviceName", "pattern"] {
        if let Some(v) = obj.get(field) {
            if !v.is_string() {
                issues.push(ValidationIssue {
                    field: field.into(),
                    reason: "must be a string".into(),
                });
            }
        }
    }

    if let Some(v) = obj.get("buttons") {
        if !v.is_array() {
            issues.push(ValidationIssue {
                field: "buttons".into(),
                reason: "must be an array".into(),
            });
        }
    }

    if let Some(v) = obj.get("modes") {
        if !v.is_object() {
            issues.push(ValidationIssue {
                field: "modes".into(),
                reason: "must be an object".into(),
            });
        }
    }

    if let Some(v) = obj.get("viewport") {
        let ok = v
            .as_array()
            .map(|a| a.len() == 2 && a.iter().all(Value::is_number))
            .unwrap_or(false);
        if !ok {
            issues.push(ValidationIssue {
                field: "viewport".into(),
                reason: "must be a [width, height] pair".into(),
            });
        }
    }

    if issues.is_empty() {
        None
    } else {
        Some(issues)
    }
}

impl Layout {
    /// Build a layout from its persistable form; `id` derives from `name`
    pub fn from_export(export: LayoutExport) -> Self {
        let pattern = export.pattern.as_deref().and_then(parse_pattern);
        let pattern_source = if pattern.is_some() { export.pattern } else { None };
        Layout {
            id: derive_id(&export.name),
            name: export.name,
            device_name: export.device_name,
            pattern,
            pattern_source,
            viewport: export.viewport,
            buttons: export.buttons,
            modes: export.modes,
            options: export.options,
        }
    }

    /// Inverse of [`Layout::from_export`]
    pub fn to_export(&self) -> LayoutExport {
        LayoutExport {
            name: self.name.clone(),
            device_name: self.device_name.clone(),
            pattern: self.pattern_source.clone(),
            viewport: self.viewport,
            buttons: self.buttons.clone(),
            modes: self.modes.clone(),
            options: self.options.clone(),
        }
    }

    /// Parse a user-supplied export document.
    ///
    /// Never partially applies: malformed JSON, validation failures and
    /// unknown parse failures each surface as their own [`ImportError`]
    /// variant and leave the caller's state untouched.
    pub fn import(text: &str) -> Result<Self, ImportError> {
        let doc: serde_json::Value = serde_json::from_str(text)?;

        if let Some(issues) = validate(&doc) {
            return Err(ImportError::Validation(issues));
        }

        let export: LayoutExport = serde_json::from_value(doc)
            .map_err(|e| ImportError::Other(anyhow::anyhow!(e)))?;

        Ok(Layout::from_export(export))
    }

    /// Test a device's reported name against this layout's matcher.
    ///
    /// An exact `device_name` takes precedence over `pattern`.
    pub fn matches_device(&self, name: &str) -> bool {
        if let Some(exact) = &self.device_name {
            return exact == name;
        }
        if let Some(pattern) = &self.pattern {
            return pattern.is_match(name);
        }
        false
    }

    /// Virtual (hidden) bindings of a mode
    pub fn virtual_bindings(&self, mode: GameMode) -> Vec<&BindingSlot> {
        self.modes
            .get(&mode)
            .map(|m| m.bindings.iter().filter(|b| b.hidden).collect())
            .unwrap_or_default()
    }
}

/// Small fixed layout mirroring the shipped GRAM Slim Smash description,
/// aligned with the default wire config so SOCD pairs resolve to stick
/// directions.
#[cfg(test)]
pub fn test_layout() -> Layout {
    let text = include_str!("../../layouts/gram_slim_smash.json");
    Layout::import(text).expect("bundled test layout is valid")
}
